//! Conversion of remote property primitives into tagged field values.
//!
//! The remote store reports almost everything as strings. The field's declared type decides
//! which variant a value is captured as; this is the load-time counterpart of
//! [`crate::normalize`], and it is lossy for dates (day precision).

use super::{DateValue, FieldValue, FormState, OptionSet, SelectOption};
use crate::schema::{FieldSchema, FieldType};
use ahash::AHashMap;
use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::Value as JsonValue;

impl FieldValue {
    /// Captures a remote primitive as the variant the field type calls for.
    ///
    /// Returns `None` for null and empty-string values, which the form treats as unset.
    pub fn from_remote(
        field_type: &FieldType,
        raw: &JsonValue,
        options: &[SelectOption],
    ) -> Option<FieldValue> {
        let text = match raw {
            JsonValue::Null => return None,
            JsonValue::String(s) if s.is_empty() => return None,
            JsonValue::String(s) => s.clone(),
            JsonValue::Bool(b) if matches!(field_type, FieldType::Checkbox) => {
                return Some(FieldValue::Bool(*b));
            }
            JsonValue::Number(n) if matches!(field_type, FieldType::Number) => {
                return n.as_f64().map(FieldValue::Number);
            }
            other => other.to_string(),
        };

        let value = match field_type {
            FieldType::Checkbox => match text.to_ascii_lowercase().as_str() {
                "true" => FieldValue::Bool(true),
                "false" => FieldValue::Bool(false),
                _ => FieldValue::Text(text),
            },
            FieldType::Number => match text.trim().parse::<f64>() {
                Ok(n) => FieldValue::Number(n),
                Err(_) => FieldValue::Text(text),
            },
            FieldType::Date => match parse_date(&text) {
                Some(date) => FieldValue::Date(date),
                None => FieldValue::Text(text),
            },
            FieldType::Dropdown => {
                let label = options
                    .iter()
                    .find(|o| o.value == text)
                    .map(|o| o.label.clone())
                    .unwrap_or_else(|| text.clone());
                FieldValue::Choice(SelectOption { label, value: text })
            }
            FieldType::MultiSelect => FieldValue::List(
                text.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            FieldType::Text
            | FieldType::Multiline
            | FieldType::FileReference
            | FieldType::ReadOnly
            | FieldType::Action
            | FieldType::Unrecognized(_) => FieldValue::Text(text),
        };
        Some(value)
    }
}

impl FormState {
    /// Builds a fresh state from the property map returned by the gateway.
    ///
    /// Only keys declared in the schema are kept; remote bookkeeping properties are dropped.
    pub fn from_remote(
        schema: &FieldSchema,
        values: &AHashMap<String, JsonValue>,
        options: &OptionSet,
    ) -> Self {
        schema
            .fields()
            .filter_map(|field| {
                let raw = values.get(&field.key)?;
                let value =
                    FieldValue::from_remote(&field.field_type, raw, field.resolve_options(options))?;
                Some((field.key.clone(), value))
            })
            .collect()
    }
}

/// Parses `YYYY-MM-DD`, an RFC 3339 timestamp, or epoch milliseconds.
fn parse_date(text: &str) -> Option<DateValue> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(to_date_value(date));
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(to_date_value(stamp.date_naive()));
    }
    text.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|stamp| to_date_value(stamp.date_naive()))
}

fn to_date_value(date: NaiveDate) -> DateValue {
    DateValue::new(date.year(), date.month(), date.day())
}
