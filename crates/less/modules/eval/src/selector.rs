use crate::condition::eval_condition;
use crate::context::EvalContext;
use crate::value::interpolate;
use less_selectors::parse_selectors;
use less_tree::{
    CssContext, Element, ElementValue, GenCss as _, LessError, NodeInfo, Selector,
};
use log::trace;

/// Evaluate a selector: run its guard and resolve `@{name}` interpolations.
pub fn eval_selector(context: &mut EvalContext, selector: &Selector) -> Result<Selector, LessError> {
    let evald_condition = match &selector.condition {
        Some(condition) => eval_condition(context, condition)?,
        None => selector.evald_condition,
    };
    let elements = selector
        .elements
        .iter()
        .map(|element| eval_element(context, element))
        .collect::<Result<Vec<_>, _>>()?;
    let extend_list = selector
        .extend_list
        .iter()
        .map(|extend| {
            let mut evaluated = extend.clone();
            evaluated.selector = eval_selector(context, &extend.selector)?;
            Ok(evaluated)
        })
        .collect::<Result<Vec<_>, LessError>>()?;
    Ok(selector.create_derived(elements, Some(extend_list), Some(evald_condition)))
}

fn eval_element(context: &mut EvalContext, element: &Element) -> Result<Element, LessError> {
    let value = match &element.value {
        ElementValue::Text(text) => ElementValue::Text(text.clone()),
        ElementValue::Interpolation(raw) => {
            ElementValue::Text(interpolate(context, raw, '@')?.trim().to_owned())
        }
        ElementValue::Paren(nested) => ElementValue::Paren(Box::new(eval_selector(context, nested)?)),
    };
    Ok(Element {
        value,
        ..element.clone()
    })
}

/// Evaluate a selector list. When interpolation produced selector text, the list is
/// printed and parsed again so the new text is split into real elements.
pub fn eval_selectors(
    context: &mut EvalContext,
    selectors: &[Selector],
) -> Result<Vec<Selector>, LessError> {
    let evaluated = selectors
        .iter()
        .map(|selector| eval_selector(context, selector))
        .collect::<Result<Vec<_>, _>>()?;
    if !evaluated.iter().any(Selector::has_variable) {
        return Ok(evaluated);
    }
    let text = evaluated
        .iter()
        .map(|selector| {
            selector.to_css(&mut CssContext {
                first_selector: true,
                ..CssContext::default()
            })
        })
        .collect::<Vec<_>>()
        .join(",");
    trace!("re-parsing interpolated selectors `{text}`");
    let info = evaluated
        .first()
        .map_or_else(NodeInfo::default, |selector| selector.info.clone());
    let mut reparsed =
        parse_selectors(&text).map_err(|error| LessError::from(error).at(&info))?;
    for (selector, original) in reparsed.iter_mut().zip(&evaluated) {
        selector.info = original.info.clone();
        selector.evald_condition = original.evald_condition;
        selector.extend_list.clone_from(&original.extend_list);
    }
    Ok(reparsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use less_tree::{
        Combinator, CompareOp, CompileOptions, Condition, Declaration, FunctionRegistry, Node,
        Ruleset, Value,
    };
    use std::rc::Rc;

    fn context() -> EvalContext {
        let options = CompileOptions::default();
        EvalContext::new(&options, Rc::new(FunctionRegistry::new()))
    }

    #[test]
    fn interpolated_selectors_are_split_again() -> Result<(), LessError> {
        let mut root = context();
        let frame = Ruleset::new(
            Vec::new(),
            vec![Node::Declaration(Declaration::new("@names", Value::quoted(".a, .b")))],
        );
        let mut scope = root.push_frame(Rc::new(RefCell::new(frame)));
        let selector = Selector::new([Element::interpolation(Combinator::None, "@{names}")]);
        let evaluated = eval_selectors(&mut scope, &[selector])?;
        assert_eq!(evaluated.len(), 2);
        assert!(evaluated.iter().all(|selector| !selector.has_variable()));
        Ok(())
    }

    #[test]
    fn guards_decide_output() -> Result<(), LessError> {
        let mut root = context();
        let guarded = Selector::new([Element::new(Combinator::None, ".a")]).with_condition(
            Condition::compare(CompareOp::Equal, Value::number(1.0), Value::number(2.0)),
        );
        assert!(!eval_selector(&mut root, &guarded)?.is_output());
        Ok(())
    }
}
