//! Less stylesheet compiler core.
//!
//! Takes a parsed stylesheet tree, evaluates it and turns the result into CSS text:
//!
//! 1. [`less_eval::eval_stylesheet`] resolves variables, mixins, imports and nesting.
//! 2. [`SetTreeVisibility`] marks everything outside referenced imports as visible.
//! 3. [`ProcessExtends`] adds extending selectors to the rulesets they extend.
//! 4. [`ToCssVisitor`] hoists nested rulesets and drops what must not be printed.
//! 5. The root is rendered with a [`CssContext`] built from the same options.
//!
//! The individual stages are re-exported for callers that need to run them apart.

#![allow(clippy::missing_errors_doc, reason = "Internal crate")]

pub use less_eval as eval;
pub use less_selectors as selectors;
pub use less_tree as tree;
pub use less_visitors as visitors;

use anyhow::{Context as _, Result as AnyResult};
use less_eval::eval_stylesheet;
use less_tree::{CompileOptions, CssContext, FunctionRegistry, GenCss as _, Ruleset};
use less_visitors::{ProcessExtends, SetTreeVisibility, ToCssVisitor};
use log::{debug, info};
use std::rc::Rc;

/// Compile a parsed stylesheet with no user functions.
pub fn compile(root: Ruleset, options: &CompileOptions) -> AnyResult<String> {
    compile_with(root, options, Rc::new(FunctionRegistry::new()))
}

/// Compile a parsed stylesheet, reading the options from a JSON document.
pub fn compile_json(root: Ruleset, options: &str) -> AnyResult<String> {
    let options = CompileOptions::from_json(options).context("Failed to read compile options")?;
    compile(root, &options)
}

/// Compile a parsed stylesheet. Calls to names in `functions` are evaluated, every
/// other call is printed as written.
pub fn compile_with(
    root: Ruleset,
    options: &CompileOptions,
    functions: Rc<FunctionRegistry>,
) -> AnyResult<String> {
    let mut evaluated =
        eval_stylesheet(root, options, functions).context("Failed to evaluate stylesheet")?;

    let mut rules = evaluated.take_rules();
    SetTreeVisibility::new(true)
        .run_all(&mut rules)
        .context("Failed to mark visible rules")?;
    evaluated.set_rules(rules);

    ProcessExtends::new()
        .run(&mut evaluated)
        .context("Failed to apply extends")?;

    ToCssVisitor::new(options)
        .run(&mut evaluated)
        .context("Failed to prepare tree for output")?;
    debug!("{} top-level rules left for output", evaluated.rules().len());

    let css = evaluated.to_css(&mut CssContext::new(options));
    info!("Compiled stylesheet into {} bytes of CSS", css.len());
    Ok(css)
}
