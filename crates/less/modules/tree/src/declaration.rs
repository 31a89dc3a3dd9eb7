use crate::{DebugInfo, NodeInfo, Selector, Value};

/// Merge flag of a declaration written as `name+:` or `name+_:`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Merge {
    #[default]
    None,
    /// `+`: values are joined with commas.
    Comma,
    /// `+_`: values are joined with spaces.
    Space,
}

/// `name: value` inside a block, or a variable definition `@name: value`.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: String,
    pub value: Value,
    pub important: bool,
    pub merge: Merge,
    /// True for `@name: value`.
    pub variable: bool,
    /// Declarations written inline in a `style` attribute have no trailing semicolon.
    pub inline: bool,
    pub info: NodeInfo,
}

impl Declaration {
    /// A property or variable declaration. Names starting with `@` are variables.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        Self {
            variable: name.starts_with('@'),
            name,
            value,
            important: false,
            merge: Merge::None,
            inline: false,
            info: NodeInfo::default(),
        }
    }

    #[must_use]
    pub const fn important(mut self) -> Self {
        self.important = true;
        self
    }

    #[must_use]
    pub const fn merged(mut self, merge: Merge) -> Self {
        self.merge = merge;
        self
    }
}

/// A comment kept in the tree.
#[derive(Clone, Debug)]
pub struct Comment {
    /// Full text including the delimiters.
    pub value: String,
    /// `// ...` comments never reach the output.
    pub is_line_comment: bool,
    pub debug_info: Option<DebugInfo>,
    pub info: NodeInfo,
}

impl Comment {
    #[inline]
    pub fn block(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_line_comment: false,
            debug_info: None,
            info: NodeInfo::default(),
        }
    }

    #[inline]
    pub fn line(value: impl Into<String>) -> Self {
        Self {
            is_line_comment: true,
            ..Self::block(value)
        }
    }

    /// Line comments are silent, and so are block comments under compression unless
    /// they start with `/*!`.
    pub fn is_silent(&self, compress: bool) -> bool {
        let important = self.value.as_bytes().get(2) == Some(&b'!');
        self.is_line_comment || (compress && !important)
    }
}

/// `&:extend(.target all);` or an extend attached to a selector.
#[derive(Clone, Debug)]
pub struct Extend {
    pub selector: Selector,
    pub all: bool,
    pub info: NodeInfo,
}

impl Extend {
    #[inline]
    pub fn new(selector: Selector, all: bool) -> Self {
        Self {
            selector,
            all,
            info: NodeInfo::default(),
        }
    }
}
