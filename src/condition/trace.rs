use super::Visibility;
use crate::value::field::format_number;
use serde_json::Value as JsonValue;
use std::fmt;

/// A record of how a section's visibility was decided.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionTrace {
    /// The section has no condition.
    Unconditional,
    /// The referenced value was missing, null or the empty string.
    Unset {
        field: String,
        include_when_unset: bool,
    },
    Compared {
        field: String,
        op_symbol: String,
        stored: JsonValue,
        operand: JsonValue,
        outcome: bool,
    },
    /// Unknown operators fail open.
    UnrecognizedOperator { operator: String },
}

impl ConditionTrace {
    pub fn outcome(&self) -> Visibility {
        match self {
            ConditionTrace::Unconditional | ConditionTrace::UnrecognizedOperator { .. } => {
                Visibility::Visible
            }
            ConditionTrace::Unset {
                include_when_unset, ..
            } => Visibility::from_bool(*include_when_unset),
            ConditionTrace::Compared { outcome, .. } => Visibility::from_bool(*outcome),
        }
    }
}

impl fmt::Display for ConditionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionTrace::Unconditional => write!(f, "always visible"),
            ConditionTrace::Unset {
                field,
                include_when_unset,
            } => write!(
                f,
                "${} is unset (include when unset: {})",
                field, include_when_unset
            ),
            ConditionTrace::Compared {
                field,
                op_symbol,
                stored,
                operand,
                ..
            } => write!(
                f,
                "${} (was {}) {} {}",
                field,
                format_operand(stored),
                op_symbol,
                format_operand(operand)
            ),
            ConditionTrace::UnrecognizedOperator { operator } => {
                write!(f, "unrecognized operator '{}'", operator)
            }
        }
    }
}

/// Formats an operand for display, without JSON quoting.
fn format_operand(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        JsonValue::Array(items) => {
            let inner: Vec<String> = items.iter().map(format_operand).collect();
            format!("[{}]", inner.join(", "))
        }
        other => other.to_string(),
    }
}
