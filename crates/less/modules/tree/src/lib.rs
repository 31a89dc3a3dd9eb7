//! Less stylesheet tree.
//!
//! This crate holds the closed set of node kinds produced by the Less parser, the
//! selector and element model, the value model, compile options, the shared error type,
//! and CSS text generation for every node kind.
//!
//! - [`Node`] is the rule-level enum that evaluation and the visitors work on.
//! - [`Value`] covers declaration values, media features and mixin arguments.
//! - [`GenCss`] renders any of them into a [`CssOutput`] sink.

mod at_rule;
mod declaration;
mod element;
mod error;
mod function;
mod import;
mod merge;
mod mixin;
mod node;
mod options;
mod output;
mod ruleset;
mod selector;
mod value;

pub use at_rule::{AtRule, NestableAtRule, NestableKind};
pub use declaration::{Comment, Declaration, Extend, Merge};
pub use element::{Combinator, Element, ElementValue};
pub use error::{ErrorKind, LessError};
pub use function::{FunctionRegistry, LessFunction};
pub use import::{Import, ImportOptions, ImportedContent};
pub use merge::merge_rules;
pub use mixin::{MixinArg, MixinCall, MixinDefinition, MixinParam, VariableCall};
pub use node::{Anonymous, DebugInfo, FileInfo, Location, Node, NodeInfo, Visibility};
pub use options::{CompileOptions, DumpLineNumbers, MathMode};
pub use output::{CssContext, CssOutput, GenCss, StringOutput, debug_info_banner};
pub use ruleset::{Path, Ruleset};
pub use selector::Selector;
pub use value::{Call, CompareOp, Condition, Operator, Value};
