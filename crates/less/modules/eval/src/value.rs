//! Evaluation of declaration values: variables, properties, math and calls.

use crate::context::EvalContext;
use less_tree::{
    Call, CssContext, GenCss as _, LessError, MathMode, Node, Operator, Value, merge_rules,
};
use log::{trace, warn};

/// Render a value the way it appears in the output, for comparisons and interpolation.
pub(crate) fn render(value: &Value) -> String {
    value.to_css(&mut CssContext::default())
}

/// Text a value contributes when spliced into a string or selector.
fn interpolated_text(value: &Value) -> String {
    match value {
        Value::Quoted { content, .. } => content.clone(),
        other => render(other),
    }
}

pub fn eval_value(context: &mut EvalContext, value: &Value) -> Result<Value, LessError> {
    match value {
        Value::Keyword(_)
        | Value::Anonymous(_)
        | Value::Dimension { .. }
        | Value::DetachedRuleset(_) => Ok(value.clone()),
        Value::Variable(name) => eval_variable(context, name),
        Value::Property(name) => eval_property(context, name),
        Value::Quoted {
            quote,
            content,
            escaped,
        } => {
            let variables = interpolate(context, content, '@')?;
            let content = interpolate(context, &variables, '$')?;
            Ok(Value::Quoted {
                quote: *quote,
                content,
                escaped: *escaped,
            })
        }
        Value::Operation {
            operator,
            operands,
            is_spaced,
        } => {
            let (left, right) = &**operands;
            let left = eval_value(context, left)?;
            let right = eval_value(context, right)?;
            eval_operation(context, *operator, left, right, *is_spaced)
        }
        Value::Negative(inner) => match eval_value(context, inner)? {
            Value::Dimension { value, unit } if context.is_math_on(Operator::Multiply) => {
                Ok(Value::Dimension {
                    value: -value,
                    unit,
                })
            }
            other => Ok(Value::Negative(Box::new(other))),
        },
        Value::Paren(inner) => {
            let mut scope = context.push_parens();
            match eval_value(&mut scope, inner)? {
                dimension @ Value::Dimension { .. } => Ok(dimension),
                other => Ok(Value::paren(other)),
            }
        }
        Value::Expression(items) => {
            let items = eval_items(context, items)?;
            Ok(match <[Value; 1]>::try_from(items) {
                Ok([single]) => single,
                Err(items) => Value::Expression(items),
            })
        }
        Value::List(items) => {
            let items = eval_items(context, items)?;
            Ok(match <[Value; 1]>::try_from(items) {
                Ok([single]) => single,
                Err(items) => Value::List(items),
            })
        }
        Value::Call(call) => eval_call(context, call),
    }
}

fn eval_items(context: &mut EvalContext, items: &[Value]) -> Result<Vec<Value>, LessError> {
    items.iter().map(|item| eval_value(context, item)).collect()
}

/// Resolve `@name` (or `@@name`) through the frames and evaluate what it holds.
pub(crate) fn eval_variable(context: &mut EvalContext, name: &str) -> Result<Value, LessError> {
    let name = match name.strip_prefix("@@") {
        Some(inner) => {
            let named = eval_variable(context, &format!("@{inner}"))?;
            format!("@{}", interpolated_text(&named))
        }
        None => name.to_owned(),
    };
    if context.is_evaluating(&name) {
        return Err(LessError::runtime(format!(
            "Recursive variable definition for {name}"
        )));
    }
    let Some(declaration) = context.find_variable(&name) else {
        return Err(LessError::name(format!("variable {name} is undefined")));
    };
    if declaration.important {
        context.mark_important();
    }
    trace!("resolving {name}");
    let mut scope = context.push_variable(&name);
    eval_value(&mut scope, &declaration.value)
}

/// Resolve `$name` to the value of the last (merged) declaration of that property.
fn eval_property(context: &mut EvalContext, name: &str) -> Result<Value, LessError> {
    if context.is_evaluating(name) {
        return Err(LessError::runtime(format!(
            "Recursive property reference for {name}"
        )));
    }
    let undefined = || LessError::name(format!("Property '{name}' is undefined"));
    let declarations = context.find_property(name).ok_or_else(undefined)?;
    let mut rules: Vec<Node> = declarations.into_iter().map(Node::Declaration).collect();
    merge_rules(&mut rules);
    let Some(Node::Declaration(last)) = rules.pop() else {
        return Err(undefined());
    };
    if last.important {
        context.mark_important();
    }
    let mut scope = context.push_variable(name);
    eval_value(&mut scope, &last.value)
}

/// Replace every `@{name}` (or `${name}` for `sigil` `$`) until nothing changes.
pub(crate) fn interpolate(
    context: &mut EvalContext,
    text: &str,
    sigil: char,
) -> Result<String, LessError> {
    let mut current = text.to_owned();
    loop {
        let replaced = replace_references(context, &current, sigil)?;
        if replaced == current {
            return Ok(current);
        }
        current = replaced;
    }
}

const fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

fn replace_references(
    context: &mut EvalContext,
    text: &str,
    sigil: char,
) -> Result<String, LessError> {
    let opener = format!("{sigil}{{");
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(&opener) {
        let (before, reference) = rest.split_at(start);
        output.push_str(before);
        let after = reference.get(opener.len()..).unwrap_or_default();
        let name_len = after.bytes().take_while(|&byte| is_name_byte(byte)).count();
        let (name, tail) = after.split_at(name_len);
        match tail.strip_prefix('}') {
            Some(remaining) if !name.is_empty() => {
                let reference = format!("{sigil}{name}");
                let value = if sigil == '$' {
                    eval_property(context, &reference)?
                } else {
                    eval_variable(context, &reference)?
                };
                output.push_str(&interpolated_text(&value));
                rest = remaining;
            }
            _ => {
                output.push_str(&opener);
                rest = after;
            }
        }
    }
    output.push_str(rest);
    Ok(output)
}

fn eval_operation(
    context: &EvalContext,
    operator: Operator,
    left: Value,
    right: Value,
    is_spaced: bool,
) -> Result<Value, LessError> {
    let unevaluated = |left: Value, right: Value| Value::Operation {
        operator,
        operands: Box::new((left, right)),
        is_spaced,
    };
    if !context.is_math_on(operator) {
        return Ok(unevaluated(left, right));
    }
    if let (
        Value::Dimension {
            value: left_value,
            unit: left_unit,
        },
        Value::Dimension {
            value: right_value,
            unit: right_unit,
        },
    ) = (&left, &right)
    {
        return operate(operator, (*left_value, left_unit), (*right_value, right_unit));
    }
    if operator == Operator::Divide
        && context.math() == MathMode::ParensDivision
        && (is_division(&left) || is_division(&right))
    {
        return Ok(unevaluated(left, right));
    }
    Err(LessError::operation("Operation on an invalid type"))
}

fn is_division(value: &Value) -> bool {
    matches!(
        value,
        Value::Operation {
            operator: Operator::Divide,
            ..
        }
    )
}

/// Dimension arithmetic. The unit comes from the first operand that has one.
fn operate(
    operator: Operator,
    (left, left_unit): (f64, &str),
    (right, right_unit): (f64, &str),
) -> Result<Value, LessError> {
    let result = match operator {
        Operator::Add => left + right,
        Operator::Subtract => left - right,
        Operator::Multiply => left * right,
        Operator::Divide => {
            if right == 0.0 {
                return Err(LessError::operation("Division by zero"));
            }
            left / right
        }
    };
    let unit = if operator == Operator::Divide && left_unit.eq_ignore_ascii_case(right_unit) {
        ""
    } else if left_unit.is_empty() {
        right_unit
    } else {
        left_unit
    };
    Ok(Value::dimension(result, unit))
}

/// Evaluate the arguments, then call the registered function. Unknown functions are
/// kept as plain CSS calls.
pub(crate) fn eval_call(context: &mut EvalContext, call: &Call) -> Result<Value, LessError> {
    let args = {
        let mut scope = context.enter_call(call.is_calc());
        eval_items(&mut scope, &call.args)?
    };
    if let Some(function) = context.function(&call.name) {
        trace!("calling function {}", call.name);
        return function(&args).map_err(|error| error.at(&call.info));
    }
    if !call.is_calc() {
        warn!("unknown function `{}` is kept as a CSS call", call.name);
    }
    Ok(Value::Call(Call {
        name: call.name.clone(),
        args,
        info: call.info.clone(),
    }))
}
