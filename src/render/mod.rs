//! Field rendering dispatch.
//!
//! The host owns the actual widgets. This module describes *what* to render: one [`Control`]
//! per field, chosen by a total match over [`FieldType`]. Each control carries its field key
//! as the edit binding, and captures raw host input into a tagged [`FieldValue`].

use crate::condition::{self, ConditionTrace};
use crate::schema::{Field, FieldSchema, FieldType};
use crate::value::{DateValue, FieldValue, FormState, OptionSet, SelectOption};

mod capture;
mod display;

pub use capture::ControlInput;

/// A rendered input bound to a field key.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub key: String,
    pub label: String,
    pub kind: ControlKind,
}

/// The widget to show, with its current value.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    TextInput {
        value: String,
    },
    TextArea {
        value: String,
    },
    NumberInput {
        value: Option<f64>,
    },
    Checkbox {
        checked: bool,
    },
    DateInput {
        value: Option<DateValue>,
    },
    Select {
        options: Vec<SelectOption>,
        selected: Option<String>,
    },
    MultiSelect {
        options: Vec<SelectOption>,
        selected: Vec<String>,
    },
    FileReference {
        url: Option<String>,
    },
    ReadOnly {
        text: String,
    },
    /// A button opening a modal around the nested field's control.
    Action {
        modal: Box<Control>,
    },
    /// Shown for field types the engine does not know.
    Placeholder {
        type_name: String,
    },
}

impl ControlKind {
    pub fn name(&self) -> &'static str {
        match self {
            ControlKind::TextInput { .. } => "text input",
            ControlKind::TextArea { .. } => "text area",
            ControlKind::NumberInput { .. } => "number input",
            ControlKind::Checkbox { .. } => "checkbox",
            ControlKind::DateInput { .. } => "date input",
            ControlKind::Select { .. } => "select",
            ControlKind::MultiSelect { .. } => "multi-select",
            ControlKind::FileReference { .. } => "file reference",
            ControlKind::ReadOnly { .. } => "read-only text",
            ControlKind::Action { .. } => "action",
            ControlKind::Placeholder { .. } => "placeholder",
        }
    }
}

/// Renders one field. Total over the field types: unknown types become a placeholder.
pub fn render_field(field: &Field, value: Option<&FieldValue>, options: &OptionSet) -> Control {
    let text = || value.map(|v| v.to_string()).unwrap_or_default();

    let kind = match &field.field_type {
        FieldType::Text => ControlKind::TextInput { value: text() },
        FieldType::Multiline => ControlKind::TextArea { value: text() },
        FieldType::Number => ControlKind::NumberInput {
            value: value.and_then(FieldValue::as_number),
        },
        FieldType::Checkbox => ControlKind::Checkbox {
            checked: matches!(value, Some(FieldValue::Bool(true))),
        },
        FieldType::Date => ControlKind::DateInput {
            value: match value {
                Some(FieldValue::Date(date)) => Some(*date),
                _ => None,
            },
        },
        FieldType::Dropdown => ControlKind::Select {
            options: field.resolve_options(options).to_vec(),
            selected: match value {
                Some(FieldValue::Choice(option)) => Some(option.value.clone()),
                Some(FieldValue::Text(s)) => Some(s.clone()),
                _ => None,
            },
        },
        FieldType::MultiSelect => ControlKind::MultiSelect {
            options: field.resolve_options(options).to_vec(),
            selected: match value {
                Some(FieldValue::List(items)) => items.clone(),
                Some(FieldValue::Text(s)) => vec![s.clone()],
                _ => Vec::new(),
            },
        },
        FieldType::FileReference => ControlKind::FileReference {
            url: value.map(|v| v.to_string()),
        },
        FieldType::ReadOnly => ControlKind::ReadOnly { text: text() },
        FieldType::Action => match &field.nested {
            Some(nested) => ControlKind::Action {
                modal: Box::new(render_field(nested, None, options)),
            },
            None => ControlKind::Placeholder {
                type_name: field.field_type.name().to_string(),
            },
        },
        FieldType::Unrecognized(name) => ControlKind::Placeholder {
            type_name: name.clone(),
        },
    };

    Control {
        key: field.key.clone(),
        label: field.label.clone(),
        kind,
    }
}

/// A section that passed its visibility condition, with its controls.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSection {
    pub name: String,
    pub reason: ConditionTrace,
    pub controls: Vec<Control>,
}

/// The save affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveButton {
    pub enabled: bool,
    pub pending_changes: usize,
}

/// Everything the host needs to draw the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub sections: Vec<RenderedSection>,
    pub save: SaveButton,
}

/// Renders the visible sections of a schema against the current state.
///
/// Visibility is recomputed for every section on every call.
pub fn render_sections(
    schema: &FieldSchema,
    state: &FormState,
    options: &OptionSet,
) -> Vec<RenderedSection> {
    schema
        .sections()
        .iter()
        .filter_map(|section| {
            let reason = condition::explain(section.condition.as_ref(), state);
            if !reason.outcome().is_visible() {
                return None;
            }
            let controls = section
                .fields
                .iter()
                .map(|field| {
                    let mut control = render_field(field, state.get(&field.key), options);
                    if let ControlKind::Action { modal } = &mut control.kind {
                        if let Some(current) = render_modal(field, state, options) {
                            **modal = current;
                        }
                    }
                    control
                })
                .collect();
            Some(RenderedSection {
                name: section.name.clone(),
                reason,
                controls,
            })
        })
        .collect()
}

/// Renders an action field's modal with the nested field's current value.
pub fn render_modal(field: &Field, state: &FormState, options: &OptionSet) -> Option<Control> {
    let nested = field.nested.as_deref()?;
    Some(render_field(nested, state.get(&nested.key), options))
}
