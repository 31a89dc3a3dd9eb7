use crate::NodeInfo;
use core::error::Error;
use core::fmt::{self, Display, Formatter};

/// Category of a compilation error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A node was evaluated without the scope it needs.
    Context,
    /// Arithmetic on incompatible operands, or division by zero.
    InvalidOperation,
    /// A node ended up somewhere CSS cannot hold it.
    InvalidRootPlacement,
    /// A selector produced by interpolation could not be parsed.
    SelectorParse,
    /// An undefined variable, property or mixin.
    Name,
    /// Anything else raised while evaluating.
    Runtime,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Context => "ContextError",
            Self::InvalidOperation => "InvalidOperationError",
            Self::InvalidRootPlacement => "InvalidRootPlacementError",
            Self::SelectorParse => "SelectorParseError",
            Self::Name => "NameError",
            Self::Runtime => "RuntimeError",
        }
    }
}

/// Error raised while evaluating or emitting a stylesheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LessError {
    pub kind: ErrorKind,
    pub message: String,
    pub index: Option<usize>,
    pub filename: Option<String>,
}

impl LessError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            index: None,
            filename: None,
        }
    }

    #[inline]
    pub fn name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Name, message)
    }

    #[inline]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    #[inline]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperation, message)
    }

    /// Attach the position of `info` unless the error already carries one.
    #[must_use]
    pub fn at(mut self, info: &NodeInfo) -> Self {
        if self.index.is_none() {
            self.index = info.index();
        }
        if self.filename.is_none() {
            self.filename = info.filename();
        }
        self
    }
}

impl Display for LessError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.kind.label(), self.message)?;
        if let Some(filename) = &self.filename {
            write!(formatter, " in {filename}")?;
        }
        if let Some(index) = self.index {
            write!(formatter, " at index {index}")?;
        }
        Ok(())
    }
}

impl Error for LessError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileInfo;

    #[test]
    fn display_includes_known_position() {
        let bare = LessError::name("variable @x is undefined");
        assert_eq!(bare.to_string(), "NameError: variable @x is undefined");

        let file = FileInfo::new("main.less");
        let placed = bare.at(&NodeInfo::at(42, &file));
        assert_eq!(
            placed.to_string(),
            "NameError: variable @x is undefined in main.less at index 42"
        );
    }

    #[test]
    fn existing_position_is_kept() {
        let mut error = LessError::runtime("boom");
        error.index = Some(1);
        let placed = error.at(&NodeInfo::new(Some(9), None));
        assert_eq!(placed.index, Some(1));
    }
}
