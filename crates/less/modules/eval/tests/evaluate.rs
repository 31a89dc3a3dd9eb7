#![cfg(test)]

use less_eval::eval_stylesheet;
use less_selectors::{parse_selector, parse_selectors};
use less_tree::{
    CompileOptions, CssContext, Declaration, ErrorKind, FunctionRegistry, GenCss as _, LessError,
    MixinCall, MixinDefinition, NestableAtRule, Node, Path, Ruleset, Selector, Value,
};
use std::rc::Rc;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn evaluate(root: Ruleset, options: &CompileOptions) -> Result<Ruleset, LessError> {
    eval_stylesheet(root, options, Rc::new(FunctionRegistry::new()))
}

fn rule(selectors: &str, rules: Vec<Node>) -> Result<Node, LessError> {
    Ok(Node::Ruleset(Ruleset::new(parse_selectors(selectors)?, rules)))
}

fn color(value: &str) -> Node {
    Node::Declaration(Declaration::new("color", Value::keyword(value)))
}

fn render_paths(paths: &[Path]) -> Vec<String> {
    let mut context = CssContext::default();
    paths
        .iter()
        .map(|path| {
            path.iter()
                .enumerate()
                .map(|(position, selector)| {
                    context.first_selector = position == 0;
                    selector.to_css(&mut context)
                })
                .collect::<String>()
        })
        .collect()
}

fn rulesets(rules: &[Node]) -> Vec<&Ruleset> {
    rules.iter().filter_map(Node::as_ruleset).collect()
}

#[test]
fn nested_paths_cross_selector_lists() -> Result<(), LessError> {
    init();
    let root = Ruleset::stylesheet(vec![rule(
        ".a, .b",
        vec![rule(".c", vec![rule("&:hover", vec![color("red")])?])?],
    )?]);
    let evaluated = evaluate(root, &CompileOptions::default())?;

    let [outer] = rulesets(evaluated.rules())[..] else {
        return Err(LessError::runtime("expected one top-level ruleset"));
    };
    assert_eq!(render_paths(&outer.paths), vec![".a", ".b"]);
    let [middle] = rulesets(outer.rules())[..] else {
        return Err(LessError::runtime("expected one nested ruleset"));
    };
    assert_eq!(render_paths(&middle.paths), vec![".a .c", ".b .c"]);
    let [inner] = rulesets(middle.rules())[..] else {
        return Err(LessError::runtime("expected one hover ruleset"));
    };
    assert_eq!(render_paths(&inner.paths), vec![".a .c:hover", ".b .c:hover"]);
    Ok(())
}

#[test]
fn interpolated_selectors_are_parsed_again() -> Result<(), LessError> {
    init();
    let root = Ruleset::stylesheet(vec![
        Node::Declaration(Declaration::new("@name", Value::keyword("banner"))),
        rule(".@{name}-title", vec![color("red")])?,
    ]);
    let evaluated = evaluate(root, &CompileOptions::default())?;
    let [banner] = rulesets(evaluated.rules())[..] else {
        return Err(LessError::runtime("expected one ruleset"));
    };
    assert_eq!(render_paths(&banner.paths), vec![".banner-title"]);
    assert!(!banner.selectors.iter().any(Selector::has_variable));
    Ok(())
}

#[test]
fn nested_media_features_are_permuted() -> Result<(), LessError> {
    init();
    let list = |words: &[&str]| Value::List(words.iter().map(|word| Value::keyword(*word)).collect());
    let inner = NestableAtRule::media(list(&["c", "d", "e"]), vec![color("red")]);
    let outer = NestableAtRule::media(list(&["a", "b"]), vec![Node::NestableAtRule(inner)]);
    let root = Ruleset::stylesheet(vec![rule(".x", vec![Node::NestableAtRule(outer)])?]);
    let evaluated = evaluate(root, &CompileOptions::default())?;

    let [scope] = rulesets(evaluated.rules())[..] else {
        return Err(LessError::runtime("expected the .x ruleset"));
    };
    let [wrapper] = rulesets(scope.rules())[..] else {
        return Err(LessError::runtime("expected the bubbled media container"));
    };
    assert!(wrapper.multi_media);
    let blocks: Vec<&NestableAtRule> = wrapper
        .rules()
        .iter()
        .filter_map(|rule| match rule {
            Node::NestableAtRule(block) => Some(block),
            _ => None,
        })
        .collect();
    assert_eq!(blocks.len(), 2);

    let Some(Value::List(queries)) = blocks.get(1).map(|block| &block.features) else {
        return Err(LessError::runtime("merged block has no query list"));
    };
    let rendered: Vec<String> = queries
        .iter()
        .map(|query| query.to_css(&mut CssContext::default()))
        .collect();
    assert_eq!(
        rendered,
        vec!["a and c", "b and c", "a and d", "b and d", "a and e", "b and e"]
    );
    Ok(())
}

#[test]
fn non_root_stylesheet_has_no_scope() -> Result<(), LessError> {
    init();
    let detached = Ruleset::new(parse_selectors(".a")?, vec![color("red")]);
    let kind = evaluate(detached, &CompileOptions::default())
        .err()
        .map(|error| error.kind);
    assert_eq!(kind, Some(ErrorKind::Context));
    Ok(())
}

#[test]
fn mixin_recursion_stops_at_the_depth_limit() -> Result<(), LessError> {
    init();
    let looping = MixinDefinition::new(
        ".loop",
        Vec::new(),
        vec![Node::MixinCall(MixinCall::new(parse_selector(".loop")?, Vec::new()))],
        None,
    );
    let root = Ruleset::stylesheet(vec![
        Node::MixinDefinition(looping),
        rule(
            ".x",
            vec![Node::MixinCall(MixinCall::new(parse_selector(".loop")?, Vec::new()))],
        )?,
    ]);
    let options = CompileOptions {
        mixin_depth_limit: 16,
        ..CompileOptions::default()
    };
    let message = evaluate(root, &options).err().map(|error| error.message);
    assert_eq!(
        message.as_deref(),
        Some("Mixin call depth limit of 16 exceeded")
    );
    Ok(())
}

#[test]
fn rulesets_do_not_mix_into_themselves() -> Result<(), LessError> {
    init();
    let root = Ruleset::stylesheet(vec![rule(
        ".a",
        vec![
            color("red"),
            Node::MixinCall(MixinCall::new(parse_selector(".a")?, Vec::new())),
        ],
    )?]);
    let error = evaluate(root, &CompileOptions::default()).err();
    assert_eq!(
        error.map(|error| (error.kind, error.message)),
        Some((
            ErrorKind::Runtime,
            "No matching definition was found for `.a()`".to_owned()
        ))
    );
    Ok(())
}

#[test]
fn undefined_variables_are_name_errors() -> Result<(), LessError> {
    init();
    let root = Ruleset::stylesheet(vec![rule(
        ".a",
        vec![Node::Declaration(Declaration::new("width", Value::variable("missing")))],
    )?]);
    let error = evaluate(root, &CompileOptions::default()).err();
    assert_eq!(
        error.map(|error| (error.kind, error.message)),
        Some((ErrorKind::Name, "variable @missing is undefined".to_owned()))
    );
    Ok(())
}
