use core::error::Error;
use core::fmt::{self, Display, Formatter};
use less_tree::{ErrorKind, LessError};

/// Selector text that could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorParseError {
    pub message: String,
    /// Byte offset into the parsed text.
    pub index: usize,
}

impl SelectorParseError {
    pub(crate) fn new(message: impl Into<String>, index: usize) -> Self {
        Self {
            message: message.into(),
            index,
        }
    }
}

impl Display for SelectorParseError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} at index {}", self.message, self.index)
    }
}

impl Error for SelectorParseError {}

impl From<SelectorParseError> for LessError {
    fn from(error: SelectorParseError) -> Self {
        Self::new(ErrorKind::SelectorParse, error.message)
    }
}
