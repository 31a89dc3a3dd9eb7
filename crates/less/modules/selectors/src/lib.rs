//! Less selector text parsing and selector joining.
//!
//! - [`parse_selectors`] turns selector text (as produced by interpolation) back into
//!   [`Selector`](less_tree::Selector) values.
//! - [`join_selectors`] resolves nested selectors against the enclosing paths,
//!   replacing `&` parent references.

mod error;
mod join;
mod parser;

pub use error::SelectorParseError;
pub use join::{join_selector, join_selectors};
pub use parser::{parse_selector, parse_selectors};
