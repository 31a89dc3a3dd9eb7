#![cfg(test)]

use less_selectors::parse_selector;
use less_tree::{
    CompileOptions, CssContext, Declaration, GenCss as _, LessError, NestableAtRule, Node, Ruleset,
    Value,
};
use less_visitors::{SetTreeVisibility, ToCssVisitor};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `.x { color: red; }` with its path already joined.
fn rule_x() -> Result<Ruleset, LessError> {
    let selector = parse_selector(".x")?;
    let mut ruleset = Ruleset::new(
        vec![selector.clone()],
        vec![Node::Declaration(Declaration::new("color", Value::keyword("red")))],
    );
    ruleset.paths = vec![vec![selector]];
    Ok(ruleset)
}

fn referenced_media(inner: Ruleset) -> Node {
    let mut body = Ruleset::new(Vec::new(), vec![Node::Ruleset(inner)]);
    body.root = true;
    let mut media = NestableAtRule::media(Value::keyword("print"), vec![Node::Ruleset(body)]);
    media.info.add_visibility_block();
    Node::NestableAtRule(media)
}

fn emit(mut root: Ruleset) -> Result<String, LessError> {
    let options = CompileOptions::default();
    let mut rules = root.take_rules();
    SetTreeVisibility::new(true).run_all(&mut rules)?;
    root.set_rules(rules);
    ToCssVisitor::new(&options).run(&mut root)?;
    Ok(root.to_css(&mut CssContext::new(&options)))
}

#[test]
fn blocked_media_without_visible_content_is_dropped() -> Result<(), LessError> {
    init();
    let root = Ruleset::stylesheet(vec![referenced_media(rule_x()?)]);
    assert_eq!(emit(root)?, "");
    Ok(())
}

#[test]
fn blocked_media_with_visible_content_is_unblocked() -> Result<(), LessError> {
    init();
    let mut inner = rule_x()?;
    for selector in inner.paths.iter_mut().flatten() {
        selector.info.ensure_visibility();
    }
    let root = Ruleset::stylesheet(vec![referenced_media(inner)]);
    assert_eq!(emit(root)?, "@media print {\n  .x {\n    color: red;\n  }\n}\n");
    Ok(())
}

#[test]
fn visibility_walk_stops_at_blocked_nodes() -> Result<(), LessError> {
    init();
    let mut open = rule_x()?;
    let mut closed = rule_x()?;
    closed.info.add_visibility_block();
    open.info.add_visibility_block();
    open.info.remove_visibility_block();
    let mut rules = vec![Node::Ruleset(open), Node::Ruleset(closed)];
    SetTreeVisibility::new(true).run_all(&mut rules)?;

    let [Node::Ruleset(shown), Node::Ruleset(hidden)] = rules.as_slice() else {
        return Err(LessError::runtime("rules changed shape"));
    };
    assert_eq!(shown.info.is_visible(), Some(true));
    assert!(
        shown.paths
            .iter()
            .flatten()
            .all(|selector| selector.info.is_visible() == Some(true))
    );
    assert_eq!(hidden.info.is_visible(), None);
    assert!(
        hidden
            .paths
            .iter()
            .flatten()
            .all(|selector| selector.info.is_visible().is_none())
    );
    Ok(())
}

#[test]
fn blocked_ruleset_is_emitted_once_unblocked() -> Result<(), LessError> {
    init();
    let mut blocked = rule_x()?;
    blocked.info.add_visibility_block();
    blocked.info.ensure_visibility();
    for selector in blocked.paths.iter_mut().flatten() {
        selector.info.ensure_visibility();
    }
    let mut unblocked = blocked.clone();
    unblocked.info.remove_visibility_block();
    assert!(!unblocked.info.blocks_visibility());

    let hidden = Ruleset::stylesheet(vec![Node::Ruleset(blocked)]);
    assert_eq!(emit(hidden)?, "");
    let shown = Ruleset::stylesheet(vec![Node::Ruleset(unblocked)]);
    assert_eq!(emit(shown)?, ".x {\n  color: red;\n}\n");
    Ok(())
}
