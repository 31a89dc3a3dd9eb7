//! Tree walkers over evaluated Less trees.
//!
//! - [`Visitor`] is the generic dispatch framework: one handler per node kind,
//!   optional replacement of the visited node and controlled descent.
//! - [`SetTreeVisibility`] marks every node outside referenced content as visible.
//! - [`ProcessExtends`] adds the paths of extending selectors to the rulesets they extend.
//! - [`ToCssVisitor`] prepares an evaluated tree for output: it flattens nested
//!   rulesets, drops invisible and non-output nodes and merges declarations.

#![allow(clippy::missing_errors_doc, reason = "Internal crate")]

mod extend;
mod set_tree_visibility;
mod to_css;
mod visitor;

pub use extend::ProcessExtends;
pub use set_tree_visibility::SetTreeVisibility;
pub use to_css::ToCssVisitor;
pub use visitor::{
    Replacement, Visit, VisitArgs, Visitor, accept, accept_ruleset, accept_selector, dispatch,
    dispatch_out, visit, visit_array,
};
