//! Media and container bubbling, and generic at-rules.
//!
//! A `@media` nested inside another one is merged into a single block whose features
//! are every combination of the enclosing features. The outermost block collects the
//! merged blocks and returns them together.

use crate::context::{EvalContext, MediaBlock};
use crate::node::eval_node;
use crate::ruleset::eval_ruleset;
use crate::value::eval_value;
use core::cell::RefCell;
use core::mem::take;
use less_tree::{AtRule, LessError, NestableAtRule, Node, NodeInfo, Ruleset, Selector, Value};
use log::debug;
use std::rc::Rc;

pub fn eval_nestable(
    context: &mut EvalContext,
    nestable: NestableAtRule,
) -> Result<Node, LessError> {
    let NestableAtRule {
        kind,
        features,
        rules,
        debug_info,
        info,
    } = nestable;
    let features = eval_value(context, &features)?;
    let mut body = body_of(rules, &info);
    body.debug_info.clone_from(&debug_info);

    let node = Rc::new(RefCell::new(NestableAtRule {
        kind,
        features,
        rules: Vec::new(),
        debug_info,
        info,
    }));
    {
        let mut scope = context.push_media(Rc::clone(&node));
        body.root = scope.path_context().is_empty();
        let evaluated = eval_ruleset(&mut scope, body)?;
        node.borrow_mut().rules = vec![Node::Ruleset(evaluated)];
    }

    if context.media_path.is_empty() {
        Ok(eval_top(context, node))
    } else {
        Ok(eval_nested(context, node))
    }
}

/// The body as a single ruleset, wrapping loose rules in a `&` ruleset.
fn body_of(rules: Vec<Node>, info: &NodeInfo) -> Ruleset {
    let rules = match <[Node; 1]>::try_from(rules) {
        Ok([Node::Ruleset(ruleset)]) => return ruleset,
        Ok([other]) => vec![other],
        Err(rules) => rules,
    };
    let mut selectors = Selector::empty_selectors();
    for selector in &mut selectors {
        selector.info = info.clone();
    }
    let mut body = Ruleset::new(selectors, rules);
    body.allow_imports = true;
    body
}

fn into_at_rule(block: MediaBlock) -> NestableAtRule {
    Rc::try_unwrap(block).map_or_else(|shared| shared.borrow().clone(), RefCell::into_inner)
}

/// Back at the outermost block: hand out every block collected on the way.
fn eval_top(context: &mut EvalContext, node: MediaBlock) -> Node {
    let blocks = take(&mut context.media_blocks);
    context.media_path.clear();
    if blocks.len() > 1 {
        debug!("{} media blocks bubbled to the top", blocks.len());
        let visibility = node.borrow().info.visibility();
        drop(node);
        let rules = blocks
            .into_iter()
            .map(|block| Node::NestableAtRule(into_at_rule(block)))
            .collect();
        let mut wrapper = Ruleset::new(Selector::empty_selectors(), rules);
        wrapper.multi_media = true;
        wrapper.info.copy_visibility_info(visibility);
        return Node::Ruleset(wrapper);
    }
    drop(blocks);
    Node::NestableAtRule(into_at_rule(node))
}

/// Inside another block: take on the combined features of every enclosing block and
/// leave an empty ruleset behind.
fn eval_nested(context: &mut EvalContext, node: MediaBlock) -> Node {
    let mut path = context.media_path.clone();
    path.push(Rc::clone(&node));
    let kind = node.borrow().kind;

    let mut branches = Vec::with_capacity(path.len());
    for (index, block) in path.iter().enumerate() {
        let block = block.borrow();
        if block.kind != kind {
            debug!(
                "{} nested in {}, not merged",
                kind.name(),
                block.kind.name()
            );
            if index < context.media_blocks.len() {
                context.media_blocks.remove(index);
            }
            return Node::NestableAtRule(into_at_rule(node));
        }
        branches.push(match &block.features {
            Value::List(items) => items.clone(),
            single => vec![single.clone()],
        });
    }
    drop(path);

    let combinations: Vec<Value> = permute(branches)
        .into_iter()
        .map(|parts| {
            let mut fragments = Vec::with_capacity(parts.len().saturating_mul(2));
            for part in parts {
                if !fragments.is_empty() {
                    fragments.push(Value::anonymous("and"));
                }
                fragments.push(part);
            }
            Value::Expression(fragments)
        })
        .collect();
    debug!("nested {} merged into {} queries", kind.name(), combinations.len());
    node.borrow_mut().features = Value::List(combinations);
    Node::Ruleset(Ruleset::new(Vec::new(), Vec::new()))
}

/// Every combination taking one item from each list.
///
/// Items of the first list vary fastest.
fn permute(mut lists: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    if lists.is_empty() {
        return Vec::new();
    }
    let first = lists.remove(0);
    if lists.is_empty() {
        return first.into_iter().map(|item| vec![item]).collect();
    }
    let rest = permute(lists);
    let mut combinations = Vec::with_capacity(rest.len().saturating_mul(first.len()));
    for tail in &rest {
        for item in &first {
            let mut combination = Vec::with_capacity(tail.len().saturating_add(1));
            combination.push(item.clone());
            combination.extend(tail.iter().cloned());
            combinations.push(combination);
        }
    }
    combinations
}

/// Generic at-rules evaluate their body with a fresh media state.
pub fn eval_at_rule(context: &mut EvalContext, at_rule: AtRule) -> Result<Node, LessError> {
    let mut scope = context.isolate_media();
    let value = at_rule
        .value
        .as_ref()
        .map(|value| eval_value(&mut scope, value))
        .transpose()?;
    let rules = match at_rule.rules {
        Some(rules) => {
            let root = at_rule.is_rooted || scope.path_context().is_empty();
            let evaluated = rules
                .into_iter()
                .map(|rule| match rule {
                    Node::Ruleset(mut body) => {
                        body.root = root;
                        eval_ruleset(&mut scope, body).map(Node::Ruleset)
                    }
                    other => eval_node(&mut scope, other),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(evaluated)
        }
        None => None,
    };
    Ok(Node::AtRule(AtRule {
        value,
        rules,
        ..at_rule
    }))
}
