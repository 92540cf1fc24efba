use super::definition::{Field, FieldSchema, FieldType, Operator, Section, VisibilityCondition};
use crate::error::SchemaError;
use crate::value::SelectOption;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// A trait for field documents that can be converted into a [`FieldSchema`].
///
/// [`RawSchema`] implements it for the JSON field-config format; other formats can provide
/// their own translation layer.
pub trait IntoSchema {
    /// Consumes the document and converts it into a validated schema.
    fn into_schema(self) -> Result<FieldSchema, SchemaError>;
}

/// The field-config document: either a bare list of sections or `{ "sections": [...] }`.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum RawSchema {
    Sections(Vec<RawSection>),
    Wrapped { sections: Vec<RawSection> },
}

/// A section as written in the field config.
#[derive(Debug, Deserialize, Clone)]
pub struct RawSection {
    #[serde(alias = "section", alias = "title")]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<RawField>,
    #[serde(default, alias = "visibleWhen", alias = "visibility")]
    pub condition: Option<RawCondition>,
}

/// A field as written in the field config.
#[derive(Debug, Deserialize, Clone)]
pub struct RawField {
    #[serde(alias = "name", alias = "property")]
    pub key: String,
    pub label: String,
    #[serde(rename = "type", alias = "fieldType")]
    pub field_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<SelectOption>>,
    #[serde(default, alias = "modalField", alias = "modal")]
    pub nested: Option<Box<RawField>>,
}

/// A visibility condition, either `{ key, operator, value }` or the shorthand
/// `{ key, equals: ... }` form.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawCondition {
    #[serde(alias = "field", alias = "property")]
    pub key: String,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub value: Option<JsonValue>,
    #[serde(default)]
    pub equals: Option<JsonValue>,
    #[serde(default, alias = "not-equals")]
    pub not_equals: Option<JsonValue>,
    #[serde(default, alias = "greater-than")]
    pub greater_than: Option<JsonValue>,
    #[serde(default, alias = "less-than")]
    pub less_than: Option<JsonValue>,
    #[serde(default, rename = "in", alias = "memberOf", alias = "member-of")]
    pub member_of: Option<JsonValue>,
    #[serde(default)]
    pub include_when_unset: bool,
}

impl RawCondition {
    fn convert(self, section: &str) -> Result<VisibilityCondition, SchemaError> {
        let invalid = |message: &str| SchemaError::InvalidCondition {
            section: section.to_string(),
            message: message.to_string(),
        };

        let (operator, operand) = match self.operator {
            Some(name) => {
                let operand = self
                    .value
                    .ok_or_else(|| invalid("an explicit operator needs a `value`"))?;
                (Operator::from_name(&name), operand)
            }
            None => [
                (Operator::Equals, self.equals),
                (Operator::NotEquals, self.not_equals),
                (Operator::GreaterThan, self.greater_than),
                (Operator::LessThan, self.less_than),
                (Operator::MemberOf, self.member_of),
            ]
            .into_iter()
            .find_map(|(op, operand)| operand.map(|v| (op, v)))
            .ok_or_else(|| invalid("no operator given"))?,
        };

        Ok(VisibilityCondition {
            field: self.key,
            operator,
            operand,
            include_when_unset: self.include_when_unset,
        })
    }
}

impl RawField {
    fn convert(self) -> Field {
        Field {
            key: self.key,
            label: self.label,
            field_type: FieldType::from_name(&self.field_type),
            description: self.description,
            options: self.options,
            nested: self.nested.map(|nested| Box::new(nested.convert())),
        }
    }
}

impl IntoSchema for RawSchema {
    fn into_schema(self) -> Result<FieldSchema, SchemaError> {
        let raw_sections = match self {
            RawSchema::Sections(sections) | RawSchema::Wrapped { sections } => sections,
        };

        let sections = raw_sections
            .into_iter()
            .map(|raw| {
                let condition = raw
                    .condition
                    .map(|c| c.convert(&raw.name))
                    .transpose()?;
                Ok(Section {
                    fields: raw.fields.into_iter().map(RawField::convert).collect(),
                    name: raw.name,
                    condition,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        FieldSchema::new(sections)
    }
}

impl FieldSchema {
    /// Parses and validates a field-config JSON document.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let raw: RawSchema = serde_json::from_str(json)
            .map_err(|e| SchemaError::JsonParseError(e.to_string()))?;
        raw.into_schema()
    }
}
