//! Section visibility.
//!
//! Visibility is a pure derivation from the current [`FormState`]: nothing is cached between
//! evaluations, so a section flips as soon as the referenced value changes.

use crate::schema::{Operator, VisibilityCondition};
use crate::value::FormState;
use serde_json::Value as JsonValue;

mod trace;

pub use trace::ConditionTrace;

/// The two observable states of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn from_bool(visible: bool) -> Self {
        if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }

    pub fn is_visible(self) -> bool {
        matches!(self, Visibility::Visible)
    }
}

/// Decides whether a section with the given condition is visible.
pub fn evaluate(condition: Option<&VisibilityCondition>, state: &FormState) -> Visibility {
    explain(condition, state).outcome()
}

/// Evaluates a condition and records how the decision was reached.
pub fn explain(condition: Option<&VisibilityCondition>, state: &FormState) -> ConditionTrace {
    match condition {
        None => ConditionTrace::Unconditional,
        Some(condition) => ConditionEngine::new(condition, state).evaluate(),
    }
}

/// Evaluates a single condition against a borrowed state.
struct ConditionEngine<'a> {
    condition: &'a VisibilityCondition,
    state: &'a FormState,
}

impl<'a> ConditionEngine<'a> {
    fn new(condition: &'a VisibilityCondition, state: &'a FormState) -> Self {
        Self { condition, state }
    }

    fn evaluate(&self) -> ConditionTrace {
        let condition = self.condition;
        let stored = match self.state.get(&condition.field) {
            Some(value) if !value.is_blank() => value.as_operand(),
            _ => {
                return ConditionTrace::Unset {
                    field: condition.field.clone(),
                    include_when_unset: condition.include_when_unset,
                };
            }
        };
        if stored.is_null() {
            return ConditionTrace::Unset {
                field: condition.field.clone(),
                include_when_unset: condition.include_when_unset,
            };
        }

        let operand = &condition.operand;
        let outcome = match &condition.operator {
            Operator::Equals => strict_eq(&stored, operand),
            Operator::NotEquals => !strict_eq(&stored, operand),
            Operator::GreaterThan => self.compare_numeric(operand, |a, b| a > b),
            Operator::LessThan => self.compare_numeric(operand, |a, b| a < b),
            Operator::MemberOf => member_of(&stored, operand),
            Operator::Unrecognized(name) => {
                return ConditionTrace::UnrecognizedOperator {
                    operator: name.clone(),
                };
            }
        };

        ConditionTrace::Compared {
            field: condition.field.clone(),
            op_symbol: condition.operator.symbol().to_string(),
            stored,
            operand: operand.clone(),
            outcome,
        }
    }

    /// Ordering comparisons coerce the stored value to a number; anything that does not
    /// coerce compares false.
    fn compare_numeric(&self, operand: &JsonValue, op: impl Fn(f64, f64) -> bool) -> bool {
        let stored = self
            .state
            .get(&self.condition.field)
            .and_then(|value| value.as_number());
        match (stored, operand_number(operand)) {
            (Some(a), Some(b)) => op(a, b),
            _ => false,
        }
    }
}

/// Equality without coercion between strings and numbers.
fn strict_eq(stored: &JsonValue, operand: &JsonValue) -> bool {
    match (stored, operand) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

/// Membership of the stored value in the operand list. A list value matches when any of its
/// items is a member; a scalar operand acts as a one-item list.
fn member_of(stored: &JsonValue, operand: &JsonValue) -> bool {
    let candidates = match operand {
        JsonValue::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    match stored {
        JsonValue::Array(values) => values
            .iter()
            .any(|v| candidates.iter().any(|c| strict_eq(v, c))),
        value => candidates.iter().any(|c| strict_eq(value, c)),
    }
}

fn operand_number(operand: &JsonValue) -> Option<f64> {
    match operand {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;
    use serde_json::json;

    fn condition(operator: Operator, operand: JsonValue) -> VisibilityCondition {
        VisibilityCondition {
            field: "amount".to_string(),
            operator,
            operand,
            include_when_unset: false,
        }
    }

    #[test]
    fn strict_equality_does_not_coerce() {
        let state = FormState::from_iter([("amount", FieldValue::Text("5".to_string()))]);
        let cond = condition(Operator::Equals, json!(5));
        assert_eq!(evaluate(Some(&cond), &state), Visibility::Hidden);
    }

    #[test]
    fn integer_and_float_operands_compare_equal() {
        let state = FormState::from_iter([("amount", FieldValue::Number(5.0))]);
        let cond = condition(Operator::Equals, json!(5));
        assert_eq!(evaluate(Some(&cond), &state), Visibility::Visible);
    }

    #[test]
    fn non_numeric_values_fail_ordering() {
        let state = FormState::from_iter([("amount", FieldValue::Text("lots".to_string()))]);
        let cond = condition(Operator::GreaterThan, json!(1));
        assert_eq!(evaluate(Some(&cond), &state), Visibility::Hidden);
    }

    #[test]
    fn trace_reads_like_the_comparison() {
        let state = FormState::from_iter([("amount", FieldValue::Number(1200.0))]);
        let cond = condition(Operator::GreaterThan, json!(1000));
        let trace = explain(Some(&cond), &state);
        assert_eq!(trace.to_string(), "$amount (was 1200) > 1000");
    }
}
