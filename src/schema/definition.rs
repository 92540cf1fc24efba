use crate::error::SchemaError;
use crate::value::{OptionSet, SelectOption};
use ahash::AHashSet;
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::warn;

/// The declared type of a field, deciding which control renders it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Multiline,
    Number,
    Checkbox,
    Date,
    Dropdown,
    MultiSelect,
    FileReference,
    ReadOnly,
    /// A button that opens a modal holding the field's nested field.
    Action,
    /// A type name the engine does not know. Rendered as a placeholder.
    Unrecognized(String),
}

impl FieldType {
    /// Maps a config type name, including the spellings used by older field documents.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "single-line text" | "string" => FieldType::Text,
            "multiline" | "multi-line text" | "textarea" => FieldType::Multiline,
            "number" => FieldType::Number,
            "checkbox" | "boolean" | "booleancheckbox" => FieldType::Checkbox,
            "date" => FieldType::Date,
            "dropdown" | "select" => FieldType::Dropdown,
            "multi-select" | "multiselect" | "multi_select" | "multiple checkboxes" => {
                FieldType::MultiSelect
            }
            "file" | "file-reference" | "file_reference" => FieldType::FileReference,
            "read-only" | "readonly" | "read_only" => FieldType::ReadOnly,
            "action" | "button" => FieldType::Action,
            _ => FieldType::Unrecognized(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Multiline => "multiline",
            FieldType::Number => "number",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Dropdown => "dropdown",
            FieldType::MultiSelect => "multi-select",
            FieldType::FileReference => "file-reference",
            FieldType::ReadOnly => "read-only",
            FieldType::Action => "action",
            FieldType::Unrecognized(name) => name,
        }
    }

    /// Read-only and action fields never appear in an outbound patch.
    pub fn is_writable(&self) -> bool {
        !matches!(
            self,
            FieldType::ReadOnly | FieldType::Action | FieldType::Unrecognized(_)
        )
    }

    /// Only enumerated types ask the gateway for option lists.
    pub fn uses_options(&self) -> bool {
        matches!(self, FieldType::Dropdown | FieldType::MultiSelect)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The comparison a visibility condition applies to the referenced value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    MemberOf,
    Unrecognized(String),
}

impl Operator {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "equals" | "eq" | "==" | "===" => Operator::Equals,
            "not-equals" | "notEquals" | "not_equals" | "neq" | "!=" | "!==" => {
                Operator::NotEquals
            }
            "greater-than" | "greaterThan" | "greater_than" | "gt" | ">" => Operator::GreaterThan,
            "less-than" | "lessThan" | "less_than" | "lt" | "<" => Operator::LessThan,
            "member-of" | "in" | "memberOf" | "member_of" | "oneOf" => Operator::MemberOf,
            other => Operator::Unrecognized(other.to_string()),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::MemberOf => "in",
            Operator::Unrecognized(name) => name,
        }
    }
}

/// A predicate over the current form values controlling whether a section renders.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityCondition {
    pub field: String,
    pub operator: Operator,
    pub operand: JsonValue,
    pub include_when_unset: bool,
}

/// A single input of the form.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    pub description: Option<String>,
    /// Static choices from the schema. When present, no options are fetched for the field.
    pub options: Option<Vec<SelectOption>>,
    /// The field edited inside the modal of an action field.
    pub nested: Option<Box<Field>>,
}

impl Field {
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            description: None,
            options: None,
            nested: None,
        }
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_nested(mut self, nested: Field) -> Self {
        self.nested = Some(Box::new(nested));
        self
    }

    /// The choices to offer: static ones win over fetched ones.
    pub fn resolve_options<'a>(&'a self, fetched: &'a OptionSet) -> &'a [SelectOption] {
        match &self.options {
            Some(options) => options,
            None => fetched.get(&self.key).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// True when the gateway must supply this field's choices.
    pub fn needs_fetched_options(&self) -> bool {
        self.field_type.uses_options() && self.options.is_none()
    }
}

/// A titled group of fields with an optional visibility condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub fields: Vec<Field>,
    pub condition: Option<VisibilityCondition>,
}

/// The static, validated field schema of a form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSchema {
    sections: Vec<Section>,
}

impl FieldSchema {
    /// Validates the sections and builds a schema.
    ///
    /// Keys must be unique across the whole schema (nested fields included) and action fields
    /// must carry a nested field. A condition on an undeclared key is kept; its value is never
    /// set, so it evaluates as unset.
    pub fn new(sections: Vec<Section>) -> Result<Self, SchemaError> {
        let mut seen = AHashSet::new();
        for section in &sections {
            for field in &section.fields {
                validate_field(field, &mut seen)?;
            }
        }

        for section in &sections {
            if let Some(condition) = &section.condition {
                if !seen.contains(condition.field.as_str()) {
                    warn!(
                        section = %section.name,
                        field = %condition.field,
                        "visibility condition references an undeclared field"
                    );
                }
            }
        }

        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// All fields in declaration order, each action field followed by its nested field.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|s| s.fields.iter()).flat_map(|field| {
            std::iter::once(field).chain(field.nested.as_deref())
        })
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields().find(|f| f.key == key)
    }

    /// Keys whose values are read at mount: every field that holds a value.
    pub fn value_keys(&self) -> Vec<String> {
        self.fields()
            .filter(|f| !matches!(f.field_type, FieldType::Action))
            .map(|f| f.key.clone())
            .collect()
    }

    /// Keys allowed in an outbound patch.
    pub fn writable_keys(&self) -> Vec<String> {
        self.fields()
            .filter(|f| f.field_type.is_writable())
            .map(|f| f.key.clone())
            .collect()
    }

    /// Keys whose option lists must be fetched from the gateway.
    pub fn option_keys(&self) -> Vec<String> {
        self.fields()
            .filter(|f| f.needs_fetched_options())
            .map(|f| f.key.clone())
            .collect()
    }
}

fn validate_field<'a>(field: &'a Field, seen: &mut AHashSet<&'a str>) -> Result<(), SchemaError> {
    if !seen.insert(field.key.as_str()) {
        return Err(SchemaError::DuplicateKey(field.key.clone()));
    }
    match (&field.field_type, &field.nested) {
        (FieldType::Action, None) => Err(SchemaError::MissingNestedField(field.key.clone())),
        (FieldType::Action, Some(nested)) => {
            if matches!(nested.field_type, FieldType::Action) || nested.nested.is_some() {
                return Err(SchemaError::InvalidNestedField {
                    key: field.key.clone(),
                    type_name: nested.field_type.name().to_string(),
                });
            }
            validate_field(nested, seen)
        }
        (_, Some(nested)) => Err(SchemaError::InvalidNestedField {
            key: field.key.clone(),
            type_name: nested.field_type.name().to_string(),
        }),
        (_, None) => Ok(()),
    }
}
