//! Mixin calls and detached-ruleset calls.
//!
//! A call is resolved frame by frame from the innermost outwards. In the first frame
//! where some candidate accepts the arguments, every candidate whose guards hold is
//! expanded and the results are concatenated.
//!
//! Mixin bodies see the scope they were defined in. That scope is rebuilt at call time
//! from the frame where the definition was found, the frames enclosing it, and the
//! namespaces the call went through.

use crate::condition::eval_condition;
use crate::context::{EvalContext, Frame};
use crate::ruleset::eval_ruleset;
use crate::selector::eval_selector;
use crate::value::{eval_value, eval_variable, render};
use core::cell::RefCell;
use less_tree::{
    CssContext, Declaration, GenCss as _, LessError, MixinArg, MixinCall, MixinDefinition, Node,
    Ruleset, Selector, Value, VariableCall, Visibility,
};
use log::{debug, trace};
use smallvec::SmallVec;
use std::rc::Rc;

/// An evaluated call argument.
#[derive(Clone, Debug)]
struct CallArg {
    name: Option<String>,
    value: Value,
}

/// A ruleset or mixin definition a call selector resolved to.
#[derive(Debug)]
struct Candidate {
    node: Node,
    /// Rulesets and definitions the lookup descended through, outermost first.
    namespaces: SmallVec<Node, 2>,
    /// Position in the frame stack of the frame the candidate was found in.
    frame: usize,
}

/// Expand a mixin call into the rules it produces.
pub fn eval_mixin_call(context: &mut EvalContext, call: &MixinCall) -> Result<Vec<Node>, LessError> {
    resolve_call(context, call).map_err(|error| error.at(&call.info))
}

fn resolve_call(context: &mut EvalContext, call: &MixinCall) -> Result<Vec<Node>, LessError> {
    let selector = eval_selector(context, &call.selector)?;
    let args = eval_args(context, &call.args)?;
    let mut found_any = false;

    for frame_index in (0..context.frame_stack().len()).rev() {
        let candidates = find_candidates(context, frame_index, &selector);
        if candidates.is_empty() {
            continue;
        }
        found_any = true;
        let mut matched = false;
        let mut output = Vec::new();
        for candidate in &candidates {
            if is_recursive(context, candidate) {
                trace!("skipping a ruleset that is already being evaluated");
                continue;
            }
            if !matches_args(context, &candidate.node, &args)? {
                continue;
            }
            matched = true;
            if guards_hold(context, candidate, &args)? {
                output.extend(call_candidate(context, candidate, &args, call)?);
            }
        }
        if matched {
            if call.info.blocks_visibility() {
                for rule in &mut output {
                    rule.info_mut().add_visibility_block();
                }
            }
            return Ok(output);
        }
    }

    let name = selector_text(&selector);
    if found_any {
        Err(LessError::runtime(format!(
            "No matching definition was found for `{}`",
            describe_call(&name, &args)
        )))
    } else {
        Err(LessError::name(format!("{name} is undefined")))
    }
}

fn eval_args(context: &mut EvalContext, args: &[MixinArg]) -> Result<Vec<CallArg>, LessError> {
    let mut evaluated = Vec::with_capacity(args.len());
    for arg in args {
        let value = eval_value(context, &arg.value)?;
        if arg.expand
            && let Value::List(items) | Value::Expression(items) = &value
        {
            evaluated.extend(items.iter().map(|item| CallArg {
                name: None,
                value: item.clone(),
            }));
        } else {
            evaluated.push(CallArg {
                name: arg.name.clone(),
                value,
            });
        }
    }
    Ok(evaluated)
}

fn selector_text(selector: &Selector) -> String {
    selector.to_css(&mut CssContext::default()).trim().to_owned()
}

/// `.m(@a:1, 2)` style rendering for error messages.
fn describe_call(name: &str, args: &[CallArg]) -> String {
    let args = args
        .iter()
        .map(|arg| match &arg.name {
            Some(arg_name) => format!("{arg_name}:{}", render(&arg.value)),
            None => render(&arg.value),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{name}({args})")
}

fn find_candidates(
    context: &EvalContext,
    frame_index: usize,
    selector: &Selector,
) -> Vec<Candidate> {
    let Some(frame) = context.frame_stack().get(frame_index) else {
        return Vec::new();
    };
    let frame = frame.borrow();
    frame
        .find(selector)
        .into_iter()
        .filter_map(|path| {
            let node = frame.resolve(&path)?.clone();
            let namespaces = (1..path.len())
                .filter_map(|end| frame.resolve(path.get(..end)?).cloned())
                .collect();
            Some(Candidate {
                node,
                namespaces,
                frame: frame_index,
            })
        })
        .collect()
}

/// A ruleset used as a mixin must not be expanded inside itself.
fn is_recursive(context: &EvalContext, candidate: &Candidate) -> bool {
    let Node::Ruleset(ruleset) = &candidate.node else {
        return false;
    };
    context
        .frames()
        .any(|frame| frame.borrow().info.same_origin(&ruleset.info))
}

/// Argument count and pattern check.
fn matches_args(
    context: &mut EvalContext,
    node: &Node,
    args: &[CallArg],
) -> Result<bool, LessError> {
    let definition = match node {
        Node::Ruleset(_) => return Ok(args.is_empty()),
        Node::MixinDefinition(definition) => definition,
        _ => return Ok(false),
    };
    let optional = definition.optional_parameters();
    let required_args = args
        .iter()
        .filter(|arg| {
            arg.name
                .as_deref()
                .is_none_or(|name| !optional.contains(&name))
        })
        .count();
    let required = definition.required();
    if definition.variadic {
        if required_args < required.saturating_sub(1) {
            return Ok(false);
        }
    } else if required_args < required || args.len() > definition.arity() {
        return Ok(false);
    }

    let checked = required_args.min(definition.arity());
    for (param, arg) in definition.params.iter().zip(args).take(checked) {
        if param.name.is_some() || param.variadic {
            continue;
        }
        if let Some(pattern) = &param.value {
            let pattern = render(&eval_value(context, pattern)?);
            if render(&arg.value) != pattern {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Scope a candidate's body is evaluated in, innermost last.
fn lexical_frames(stack: &[Frame], candidate: &Candidate) -> Vec<Frame> {
    let found = candidate.frame.saturating_add(1).min(stack.len());
    let (outer, callers) = stack.split_at(found);
    let mut frames: Vec<Frame> = callers.iter().map(Rc::clone).collect();
    frames.extend(outer.iter().map(Rc::clone));
    frames.extend(
        candidate
            .namespaces
            .iter()
            .map(|namespace| Rc::new(RefCell::new(scope_of(namespace)))),
    );
    frames
}

/// The rules of a candidate as a selectorless ruleset carrying the candidate's origin.
fn scope_of(node: &Node) -> Ruleset {
    match node {
        Node::Ruleset(ruleset) => {
            let mut scope = Ruleset::new(Vec::new(), ruleset.rules().to_vec());
            scope.info = ruleset.info.clone();
            scope
        }
        Node::MixinDefinition(definition) => {
            let mut scope = Ruleset::new(Vec::new(), definition.rules.clone());
            scope.info = definition.info.clone();
            scope
        }
        _ => Ruleset::default(),
    }
}

fn guards_hold(
    context: &mut EvalContext,
    candidate: &Candidate,
    args: &[CallArg],
) -> Result<bool, LessError> {
    for namespace in &candidate.namespaces {
        if !condition_holds(context, namespace, candidate, &[])? {
            return Ok(false);
        }
    }
    condition_holds(context, &candidate.node, candidate, args)
}

fn condition_holds(
    context: &mut EvalContext,
    node: &Node,
    candidate: &Candidate,
    args: &[CallArg],
) -> Result<bool, LessError> {
    match node {
        Node::Ruleset(ruleset) => {
            let Some(last) = ruleset.selectors.last() else {
                return Ok(true);
            };
            last.condition
                .as_ref()
                .map_or(Ok(last.evald_condition), |condition| {
                    eval_condition(context, condition)
                })
        }
        Node::MixinDefinition(definition) => {
            let Some(condition) = &definition.condition else {
                return Ok(true);
            };
            let lexical = lexical_frames(context.frame_stack(), candidate);
            let mut scope = context.swap_frames(lexical);
            let (params, _) = eval_params(&mut scope, definition, args)?;
            let mut params_scope = scope.push_frame(params);
            eval_condition(&mut params_scope, condition)
        }
        _ => Ok(false),
    }
}

/// Bind the arguments to the parameters.
///
/// Returns the frame holding one variable per named parameter, and the values that make
/// up `@arguments`.
fn eval_params(
    context: &mut EvalContext,
    definition: &MixinDefinition,
    args: &[CallArg],
) -> Result<(Frame, Vec<Value>), LessError> {
    let frame: Frame = Rc::new(RefCell::new(Ruleset::default()));
    let mut bound: Vec<Option<Value>> = vec![None; definition.params.len()];
    let mut positional = Vec::new();

    for arg in args {
        let Some(name) = &arg.name else {
            positional.push(&arg.value);
            continue;
        };
        let slot = definition
            .params
            .iter()
            .zip(bound.iter_mut())
            .find(|(param, slot)| slot.is_none() && param.name.as_deref() == Some(name.as_str()));
        let Some((_, slot)) = slot else {
            return Err(LessError::runtime(format!(
                "Named argument for {} {name} not found",
                definition.name
            )));
        };
        *slot = Some(arg.value.clone());
        frame
            .borrow_mut()
            .prepend_rule(Node::Declaration(Declaration::new(name, arg.value.clone())));
    }

    let mut remaining = positional.into_iter();
    let mut arguments = Vec::with_capacity(definition.params.len());
    for (param, slot) in definition.params.iter().zip(bound) {
        if let Some(value) = slot {
            arguments.push(value);
            continue;
        }
        if param.variadic {
            let rest: Vec<Value> = remaining.by_ref().cloned().collect();
            if let Some(name) = &param.name {
                frame.borrow_mut().prepend_rule(Node::Declaration(Declaration::new(
                    name,
                    Value::Expression(rest.clone()),
                )));
            }
            arguments.extend(rest);
            continue;
        }
        let arg = remaining.next();
        let Some(name) = &param.name else {
            continue;
        };
        let value = match (arg, &param.value) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => eval_value(&mut context.push_frame(Rc::clone(&frame)), default)?,
            (None, None) => {
                return Err(LessError::runtime(format!(
                    "wrong number of arguments for {} ({} for {})",
                    definition.name,
                    args.len(),
                    definition.arity()
                )));
            }
        };
        frame
            .borrow_mut()
            .prepend_rule(Node::Declaration(Declaration::new(name, value.clone())));
        arguments.push(value);
    }
    Ok((frame, arguments))
}

fn call_candidate(
    context: &mut EvalContext,
    candidate: &Candidate,
    args: &[CallArg],
    call: &MixinCall,
) -> Result<Vec<Node>, LessError> {
    let limit = context.options.mixin_depth_limit;
    if context.mixin_depth() >= limit {
        return Err(LessError::runtime(format!(
            "Mixin call depth limit of {limit} exceeded"
        )));
    }
    let mut depth = context.push_mixin();
    let mut body = scope_of(&candidate.node);
    body.info.copy_visibility_info(Visibility::default());

    let evaluated = match &candidate.node {
        Node::MixinDefinition(definition) => {
            debug!("expanding mixin {}", definition.name);
            let lexical = lexical_frames(depth.frame_stack(), candidate);
            let mut scope = depth.swap_frames(lexical);
            let (params, arguments) = eval_params(&mut scope, definition, args)?;
            params.borrow_mut().prepend_rule(Node::Declaration(Declaration::new(
                "@arguments",
                Value::Expression(arguments),
            )));
            let mut params_scope = scope.push_frame(params);
            eval_ruleset(&mut params_scope, body)?
        }
        _ => {
            debug!("expanding a ruleset as a mixin");
            eval_ruleset(&mut depth, body)?
        }
    };
    let mut evaluated = if call.important {
        evaluated.make_important()
    } else {
        evaluated
    };
    Ok(evaluated.take_rules())
}

/// Expand `@detached();` into the rules of the detached ruleset.
pub fn eval_variable_call(
    context: &mut EvalContext,
    call: &VariableCall,
) -> Result<Vec<Node>, LessError> {
    resolve_variable_call(context, call).map_err(|error| error.at(&call.info))
}

fn resolve_variable_call(
    context: &mut EvalContext,
    call: &VariableCall,
) -> Result<Vec<Node>, LessError> {
    let Value::DetachedRuleset(body) = eval_variable(context, &call.variable)? else {
        return Err(LessError::runtime(format!(
            "Could not evaluate variable call {}",
            call.variable
        )));
    };
    debug!("calling detached ruleset {}", call.variable);
    let evaluated = eval_ruleset(context, *body)?;
    let mut evaluated = if call.important {
        evaluated.make_important()
    } else {
        evaluated
    };
    let mut rules = evaluated.take_rules();
    if call.info.blocks_visibility() {
        for rule in &mut rules {
            rule.info_mut().add_visibility_block();
        }
    }
    Ok(rules)
}
