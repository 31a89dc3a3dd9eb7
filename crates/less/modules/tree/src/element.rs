use crate::{NodeInfo, Selector};

/// Relationship between an element and the element before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// No combinator: the element is glued onto the previous one (`.a.b`, `a:hover`).
    #[default]
    None,
    /// Whitespace between compounds.
    Descendant,
    /// `>`
    Child,
    /// `+`
    Sibling,
    /// `~`
    GeneralSibling,
    /// `|`
    Namespace,
}

impl Combinator {
    /// Parse the textual combinator. Anything unrecognised after trimming is [`Self::None`].
    pub fn parse(text: &str) -> Self {
        if text == " " {
            return Self::Descendant;
        }
        match text.trim() {
            ">" => Self::Child,
            "+" => Self::Sibling,
            "~" => Self::GeneralSibling,
            "|" => Self::Namespace,
            _ if !text.is_empty() && text.trim().is_empty() => Self::Descendant,
            _ => Self::None,
        }
    }

    /// Textual value as stored by the parser.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Descendant => " ",
            Self::Child => ">",
            Self::Sibling => "+",
            Self::GeneralSibling => "~",
            Self::Namespace => "|",
        }
    }

    #[inline]
    pub const fn is_empty_or_whitespace(self) -> bool {
        matches!(self, Self::None | Self::Descendant)
    }

    /// Combinators rendered without surrounding spaces.
    #[inline]
    pub const fn is_unspaced(self) -> bool {
        matches!(self, Self::None | Self::Descendant | Self::Namespace)
    }
}

/// What an element holds.
#[derive(Clone, Debug)]
pub enum ElementValue {
    /// Trimmed selector text such as `.btn`, `&`, `:hover` or `[type=text]`.
    Text(String),
    /// A parenthesised selector, as in `:not(&.active)`.
    Paren(Box<Selector>),
    /// Raw text containing `@{name}` interpolations, resolved during evaluation.
    Interpolation(String),
}

impl ElementValue {
    /// The plain text of this value, if it is not a nested selector.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Interpolation(text) => Some(text),
            Self::Paren(_) => None,
        }
    }
}

/// One compound piece of a selector together with its leading combinator.
#[derive(Clone, Debug)]
pub struct Element {
    pub combinator: Combinator,
    pub value: ElementValue,
    /// True when the value came from a variable interpolation.
    pub is_variable: bool,
    pub info: NodeInfo,
}

impl Element {
    #[inline]
    pub fn new(combinator: Combinator, value: impl Into<String>) -> Self {
        Self {
            combinator,
            value: ElementValue::Text(value.into().trim().to_owned()),
            is_variable: false,
            info: NodeInfo::default(),
        }
    }

    /// The parent reference element `&`.
    #[inline]
    pub fn parent_ref(combinator: Combinator) -> Self {
        Self::new(combinator, "&")
    }

    #[inline]
    pub fn interpolation(combinator: Combinator, raw: impl Into<String>) -> Self {
        Self {
            combinator,
            value: ElementValue::Interpolation(raw.into()),
            is_variable: true,
            info: NodeInfo::default(),
        }
    }

    #[inline]
    pub fn paren(combinator: Combinator, selector: Selector) -> Self {
        Self {
            combinator,
            value: ElementValue::Paren(Box::new(selector)),
            is_variable: false,
            info: NodeInfo::default(),
        }
    }

    /// True when this element is a parent reference.
    #[inline]
    pub fn is_parent_ref(&self) -> bool {
        matches!(&self.value, ElementValue::Text(text) if text == "&")
    }

    /// Copy of this element with another combinator, keeping the value and origin.
    #[inline]
    #[must_use]
    pub fn with_combinator(&self, combinator: Combinator) -> Self {
        Self {
            combinator,
            ..self.clone()
        }
    }
}
