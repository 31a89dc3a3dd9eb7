use crate::context::EvalContext;
use crate::value::{eval_value, render};
use core::cmp::Ordering;
use less_tree::{Condition, LessError, Value};

/// Evaluate a guard to a boolean.
pub fn eval_condition(context: &mut EvalContext, condition: &Condition) -> Result<bool, LessError> {
    match condition {
        Condition::And(left, right) => {
            let left = eval_condition(context, left)?;
            let right = eval_condition(context, right)?;
            Ok(left && right)
        }
        Condition::Or(left, right) => {
            let left = eval_condition(context, left)?;
            let right = eval_condition(context, right)?;
            Ok(left || right)
        }
        Condition::Not(inner) => Ok(!eval_condition(context, inner)?),
        Condition::Truthy(value) => {
            let value = eval_value(context, value)?;
            Ok(matches!(&value, Value::Keyword(keyword) if keyword == "true"))
        }
        Condition::Compare { op, left, right } => {
            let left = eval_value(context, left)?;
            let right = eval_value(context, right)?;
            Ok(compare(&left, &right).is_some_and(|ordering| op.accepts(ordering)))
        }
    }
}

/// Order two evaluated values. `None` when they cannot be compared.
pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (
            Value::Dimension {
                value: left_value,
                unit: left_unit,
            },
            Value::Dimension {
                value: right_value,
                unit: right_unit,
            },
        ) => {
            if !left_unit.is_empty() && !right_unit.is_empty() && left_unit != right_unit {
                return None;
            }
            left_value.partial_cmp(right_value)
        }
        (
            Value::Quoted {
                content: left_content,
                escaped: false,
                ..
            },
            Value::Quoted {
                content: right_content,
                escaped: false,
                ..
            },
        ) => Some(left_content.cmp(right_content)),
        _ => (render(left) == render(right)).then_some(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use less_tree::{CompareOp, CompileOptions, FunctionRegistry};
    use std::rc::Rc;

    fn holds(condition: &Condition) -> Result<bool, LessError> {
        let options = CompileOptions::default();
        let mut context = EvalContext::new(&options, Rc::new(FunctionRegistry::new()));
        eval_condition(&mut context, condition)
    }

    #[test]
    fn mismatched_units_never_compare() -> Result<(), LessError> {
        let guard = Condition::compare(
            CompareOp::Greater,
            Value::dimension(2.0, "px"),
            Value::dimension(1.0, "em"),
        );
        assert!(!holds(&guard)?);
        let unitless = Condition::compare(
            CompareOp::Greater,
            Value::dimension(2.0, "px"),
            Value::number(1.0),
        );
        assert!(holds(&unitless)?);
        Ok(())
    }

    #[test]
    fn keywords_only_compare_equal() -> Result<(), LessError> {
        let equal = Condition::compare(CompareOp::Equal, Value::keyword("dark"), Value::keyword("dark"));
        assert!(holds(&equal)?);
        let ordered = Condition::compare(CompareOp::Less, Value::keyword("a"), Value::keyword("b"));
        assert!(!holds(&ordered)?);
        assert!(holds(&ordered.negate())?);
        Ok(())
    }

    #[test]
    fn truthy_needs_the_true_keyword() -> Result<(), LessError> {
        assert!(holds(&Condition::Truthy(Value::keyword("true")))?);
        assert!(!holds(&Condition::Truthy(Value::number(1.0)))?);
        Ok(())
    }
}
