//! The recursive ruleset evaluator.

use crate::context::{EvalContext, Frame, into_ruleset};
use crate::import::splice_imports;
use crate::mixin::{eval_mixin_call, eval_variable_call};
use crate::node::eval_node;
use crate::selector::eval_selectors;
use core::cell::RefCell;
use less_selectors::join_selectors;
use less_tree::{
    ErrorKind, FunctionRegistry, LessError, MixinCall, Node, Ruleset, Selector, VariableCall,
};
use log::{debug, trace};
use std::rc::Rc;

/// Evaluate a ruleset and everything nested in it.
///
/// Errors raised by members keep their own position. Errors without one are attributed
/// to this ruleset.
pub fn eval_ruleset(context: &mut EvalContext, ruleset: Ruleset) -> Result<Ruleset, LessError> {
    let info = ruleset.info.clone();
    evaluate(context, ruleset).map_err(|error| error.at(&info))
}

fn evaluate(context: &mut EvalContext, mut ruleset: Ruleset) -> Result<Ruleset, LessError> {
    if !ruleset.root && !context.has_frames() && !context.has_path_context() {
        return Err(LessError::new(
            ErrorKind::Context,
            "ruleset evaluated outside of any scope",
        ));
    }
    ruleset.strict_imports |= context.options.strict_imports;

    let has_selectors = !ruleset.selectors.is_empty();
    if has_selectors {
        ruleset.selectors = eval_selectors(context, &ruleset.selectors)?;
        if !ruleset.selectors.iter().any(Selector::is_output) {
            trace!("no selector guard holds, the body is dropped");
            ruleset.set_rules(Vec::new());
        }
    }
    ruleset.function_registry = Some(Rc::new(FunctionRegistry::inherit(
        &context.function_registry(),
    )));

    let child_paths = if ruleset.root {
        ruleset.paths = Vec::new();
        Vec::new()
    } else if has_selectors {
        let output: Vec<Selector> = ruleset
            .selectors
            .iter()
            .filter(|selector| selector.is_output())
            .cloned()
            .collect();
        let mut paths = Vec::new();
        join_selectors(&mut paths, context.path_context(), &output);
        ruleset.paths = paths;
        ruleset.paths.clone()
    } else {
        ruleset.paths = Vec::new();
        context.path_context().to_vec()
    };

    let frame = Rc::new(RefCell::new(ruleset));
    {
        let mut framed = context.push_frame(Rc::clone(&frame));
        let mut scope = framed.push_paths(child_paths);
        eval_members(&mut scope, &frame)?;
    }
    let mut evaluated = into_ruleset(frame);
    fold_parent_rulesets(&mut evaluated);
    Ok(evaluated)
}

/// Splice imports and calls, then evaluate every remaining member in place.
fn eval_members(context: &mut EvalContext, frame: &Frame) -> Result<(), LessError> {
    let imports_allowed = {
        let ruleset = frame.borrow();
        ruleset.root || ruleset.allow_imports || !ruleset.strict_imports
    };
    if imports_allowed {
        splice_imports(context, frame)?;
    }
    expand_calls(context, frame)?;

    let count = frame.borrow().rules().len();
    for index in 0..count {
        let rule = match frame.borrow().rules().get(index) {
            Some(Node::MixinDefinition(_)) | None => continue,
            Some(rule) => rule.clone(),
        };
        let evaluated = eval_node(context, rule)?;
        if let Some(slot) = frame.borrow_mut().rules_mut().get_mut(index) {
            *slot = evaluated;
        }
    }
    Ok(())
}

enum Expansion {
    Mixin(MixinCall),
    Variable(VariableCall),
}

/// Replace every mixin call and variable call with the rules it produces.
fn expand_calls(context: &mut EvalContext, frame: &Frame) -> Result<(), LessError> {
    let mut index = 0;
    loop {
        let expansion = match frame.borrow().rules().get(index) {
            None => break,
            Some(Node::MixinCall(call)) => Expansion::Mixin(call.clone()),
            Some(Node::VariableCall(call)) => Expansion::Variable(call.clone()),
            Some(_) => {
                index += 1;
                continue;
            }
        };
        let output: Vec<Node> = match expansion {
            Expansion::Mixin(call) => {
                let rules = eval_mixin_call(context, &call)?;
                let ruleset = frame.borrow();
                // Variables the caller already has stay the caller's.
                rules
                    .into_iter()
                    .filter(|rule| {
                        rule.as_declaration().is_none_or(|declaration| {
                            !declaration.variable || ruleset.variable(&declaration.name).is_none()
                        })
                    })
                    .collect()
            }
            Expansion::Variable(call) => eval_variable_call(context, &call)?
                .into_iter()
                .filter(|rule| !rule.is_variable_declaration())
                .collect(),
        };
        debug!("call at {index} expanded into {} rules", output.len());
        index += splice_rules(frame, index, output);
    }
    Ok(())
}

/// Replace the rule at `index` with `output`, returning how many rules were inserted.
pub(crate) fn splice_rules(frame: &Frame, index: usize, output: Vec<Node>) -> usize {
    let added = output.len();
    let mut ruleset = frame.borrow_mut();
    let rules = ruleset.rules_mut();
    let tail = rules.split_off(index.saturating_add(1));
    rules.truncate(index);
    rules.extend(output);
    rules.extend(tail);
    added
}

fn is_parent_only(ruleset: &Ruleset) -> bool {
    match ruleset.selectors.as_slice() {
        [selector] => selector.is_just_parent_selector(),
        _ => false,
    }
}

/// Splice the members of `& { ... }` children into their parent.
fn fold_parent_rulesets(ruleset: &mut Ruleset) {
    let foldable = |rule: &Node| matches!(rule, Node::Ruleset(nested) if is_parent_only(nested));
    if !ruleset.rules().iter().any(foldable) {
        return;
    }
    let rules = ruleset.take_rules();
    let mut folded = Vec::with_capacity(rules.len());
    for rule in rules {
        match rule {
            Node::Ruleset(mut nested) if is_parent_only(&nested) => {
                let visibility = nested.info.visibility();
                for mut child in nested.take_rules() {
                    if child.is_variable_declaration() {
                        continue;
                    }
                    child.info_mut().copy_visibility_info(visibility);
                    folded.push(child);
                }
            }
            other => folded.push(other),
        }
    }
    ruleset.set_rules(folded);
}
