//! Conversion of captured field values into the primitives the remote API accepts.
//!
//! Normalization happens at save time only; the form keeps the tagged values in memory.

use crate::schema::FieldSchema;
use crate::value::{DateValue, FieldValue, FormState};
use chrono::NaiveDate;
use itertools::Itertools;
use serde_json::{Map, Value as JsonValue};

/// Separator the remote system uses for multi-valued properties.
pub const LIST_SEPARATOR: &str = ";";

/// The body of an outbound patch: property key to normalized value.
pub type PatchPayload = Map<String, JsonValue>;

/// Converts a field value into its remote-ready primitive.
pub fn normalize(value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Text(s) => JsonValue::String(s.clone()),
        FieldValue::Number(n) => normalize_number(*n),
        FieldValue::Bool(b) => JsonValue::Bool(*b),
        FieldValue::Date(date) => normalize_date(date)
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null),
        FieldValue::Choice(option) => JsonValue::String(option.value.clone()),
        FieldValue::List(items) => JsonValue::String(items.iter().join(LIST_SEPARATOR)),
    }
}

/// Formats a date as `YYYY-MM-DD`, or `None` when the components name no calendar day.
pub fn normalize_date(date: &DateValue) -> Option<String> {
    NaiveDate::from_ymd_opt(date.year, date.month, date.day)
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn normalize_number(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

/// Builds the patch for the given keys.
///
/// Keys that are not writable in the schema are skipped. A writable key with no value in the
/// state was cleared by the user and is sent as the empty string, which clears the remote
/// property.
pub fn build_patch<'a>(
    schema: &FieldSchema,
    state: &FormState,
    keys: impl IntoIterator<Item = &'a str>,
) -> PatchPayload {
    let writable = schema.writable_keys();
    keys.into_iter()
        .filter(|key| writable.iter().any(|w| w == key))
        .sorted()
        .dedup()
        .map(|key| {
            let value = state
                .get(key)
                .map(normalize)
                .unwrap_or_else(|| JsonValue::String(String::new()));
            (key.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_numbers_are_sent_as_integers() {
        assert_eq!(normalize(&FieldValue::Number(1500.0)), json!(1500));
        assert_eq!(normalize(&FieldValue::Number(12.5)), json!(12.5));
    }

    #[test]
    fn nan_becomes_null() {
        assert_eq!(normalize(&FieldValue::Number(f64::NAN)), JsonValue::Null);
    }

    #[test]
    fn leap_days_are_validated() {
        assert_eq!(
            normalize_date(&DateValue::new(2024, 2, 29)).as_deref(),
            Some("2024-02-29")
        );
        assert_eq!(normalize_date(&DateValue::new(2023, 2, 29)), None);
    }
}
