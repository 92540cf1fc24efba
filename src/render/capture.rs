use super::{Control, ControlKind};
use crate::error::FormError;
use crate::value::{DateValue, FieldValue, SelectOption};
use serde::{Deserialize, Serialize};

/// Raw input reported by the host for a control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", content = "value", rename_all = "snake_case")]
pub enum ControlInput {
    Text(String),
    Number(f64),
    Checked(bool),
    Date(DateValue),
    Selected(String),
    SelectedMany(Vec<String>),
    /// The user emptied the control.
    Cleared,
}

impl Control {
    /// Captures host input as the tagged value this control produces.
    ///
    /// `Ok(None)` means the value was cleared. Input that does not fit the control, and input
    /// sent to controls that hold no editable value, is rejected.
    pub fn capture(&self, input: ControlInput) -> Result<Option<FieldValue>, FormError> {
        let mismatch = |expected: &'static str| FormError::InputMismatch {
            key: self.key.clone(),
            expected,
        };

        if matches!(input, ControlInput::Cleared) {
            return match &self.kind {
                ControlKind::ReadOnly { .. }
                | ControlKind::Action { .. }
                | ControlKind::Placeholder { .. } => Err(FormError::NotWritable(self.key.clone())),
                _ => Ok(None),
            };
        }

        let value = match (&self.kind, input) {
            (ControlKind::TextInput { .. } | ControlKind::TextArea { .. }, ControlInput::Text(s)) => {
                FieldValue::Text(s)
            }
            (ControlKind::TextInput { .. } | ControlKind::TextArea { .. }, _) => {
                return Err(mismatch("text"));
            }
            (ControlKind::NumberInput { .. }, ControlInput::Number(n)) => FieldValue::Number(n),
            (ControlKind::NumberInput { .. }, ControlInput::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(FieldValue::Number)
                .map_err(|_| mismatch("numeric"))?,
            (ControlKind::NumberInput { .. }, _) => return Err(mismatch("numeric")),
            (ControlKind::Checkbox { .. }, ControlInput::Checked(b)) => FieldValue::Bool(b),
            (ControlKind::Checkbox { .. }, _) => return Err(mismatch("checked")),
            (ControlKind::DateInput { .. }, ControlInput::Date(date)) => FieldValue::Date(date),
            (ControlKind::DateInput { .. }, _) => return Err(mismatch("date")),
            (ControlKind::Select { options, .. }, ControlInput::Selected(value)) => {
                FieldValue::Choice(choice_for(options, value))
            }
            (ControlKind::Select { .. }, _) => return Err(mismatch("a single selection")),
            (ControlKind::MultiSelect { .. }, ControlInput::SelectedMany(values)) => {
                FieldValue::List(values)
            }
            (ControlKind::MultiSelect { .. }, ControlInput::Selected(value)) => {
                FieldValue::List(vec![value])
            }
            (ControlKind::MultiSelect { .. }, _) => return Err(mismatch("a list of selections")),
            (ControlKind::FileReference { .. }, ControlInput::Text(url)) => FieldValue::Text(url),
            (ControlKind::FileReference { .. }, _) => return Err(mismatch("a file url")),
            (
                ControlKind::ReadOnly { .. }
                | ControlKind::Action { .. }
                | ControlKind::Placeholder { .. },
                _,
            ) => return Err(FormError::NotWritable(self.key.clone())),
        };
        Ok(Some(value))
    }
}

/// Resolves the label of a selected value; unknown values keep the value as their label.
fn choice_for(options: &[SelectOption], value: String) -> SelectOption {
    let label = options
        .iter()
        .find(|o| o.value == value)
        .map(|o| o.label.clone())
        .unwrap_or_else(|| value.clone());
    SelectOption { label, value }
}
