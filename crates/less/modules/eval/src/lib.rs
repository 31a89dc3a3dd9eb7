//! Evaluation of parsed Less trees.
//!
//! [`eval_stylesheet`] walks the root ruleset once, resolving variables, expanding mixin
//! and variable calls, splicing imports, bubbling nested `@media` and `@container` blocks
//! and joining every nested selector against its parents. The result is a tree the
//! visitors in `less_visitors` can turn into CSS.
//!
//! All state lives in an [`EvalContext`] passed by `&mut`. Every push onto it returns a
//! [`Scope`] guard that pops again on drop, so an error returned with `?` leaves the
//! context as it was before the failing call.

#![allow(clippy::missing_errors_doc, reason = "Internal crate")]

mod condition;
mod context;
mod import;
mod media;
mod mixin;
mod node;
mod ruleset;
mod selector;
mod value;

pub use condition::eval_condition;
pub use context::{EvalContext, Frame, MediaBlock, Scope};
pub use media::{eval_at_rule, eval_nestable};
pub use mixin::{eval_mixin_call, eval_variable_call};
pub use node::{eval_declaration, eval_node};
pub use ruleset::eval_ruleset;
pub use selector::{eval_selector, eval_selectors};
pub use value::eval_value;

use less_tree::{CompileOptions, FunctionRegistry, LessError, Ruleset};
use log::debug;
use std::rc::Rc;

/// Evaluate a parsed stylesheet root.
///
/// `functions` is the registry every ruleset's own registry inherits from.
pub fn eval_stylesheet(
    root: Ruleset,
    options: &CompileOptions,
    functions: Rc<FunctionRegistry>,
) -> Result<Ruleset, LessError> {
    debug!("evaluating stylesheet with {} rules", root.rules().len());
    let mut context = EvalContext::new(options, functions);
    eval_ruleset(&mut context, root)
}
