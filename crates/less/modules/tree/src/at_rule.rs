use crate::{DebugInfo, Node, NodeInfo, Ruleset, Selector, Value};

/// A generic at-rule such as `@charset`, `@font-face` or `@supports`.
#[derive(Clone, Debug)]
pub struct AtRule {
    /// Name including the `@`.
    pub name: String,
    pub value: Option<Value>,
    /// Body, holding a single ruleset when present.
    pub rules: Option<Vec<Node>>,
    /// Rooted at-rules (`@font-face`, `@page`) never join the enclosing selectors.
    pub is_rooted: bool,
    pub debug_info: Option<DebugInfo>,
    pub info: NodeInfo,
}

impl AtRule {
    /// An at-rule without a body, like `@charset "utf-8";`.
    pub fn statement(name: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            name: name.into(),
            value,
            rules: None,
            is_rooted: false,
            debug_info: None,
            info: NodeInfo::default(),
        }
    }

    /// An at-rule with a body. The rules are wrapped in a selectorless `&` ruleset.
    pub fn with_body(name: impl Into<String>, value: Option<Value>, rules: Vec<Node>) -> Self {
        let mut body = Ruleset::new(Selector::empty_selectors(), rules);
        body.allow_imports = true;
        Self {
            rules: Some(vec![Node::Ruleset(body)]),
            ..Self::statement(name, value)
        }
    }

    #[must_use]
    pub const fn rooted(mut self) -> Self {
        self.is_rooted = true;
        self
    }

    #[inline]
    pub fn is_charset(&self) -> bool {
        self.name == "@charset"
    }

    /// The body ruleset, when the body is in its usual single-ruleset shape.
    pub fn body(&self) -> Option<&Ruleset> {
        self.rules
            .as_ref()
            .and_then(|rules| rules.first())
            .and_then(Node::as_ruleset)
    }

    pub fn body_mut(&mut self) -> Option<&mut Ruleset> {
        match self.rules.as_mut().and_then(|rules| rules.first_mut()) {
            Some(Node::Ruleset(ruleset)) => Some(ruleset),
            _ => None,
        }
    }
}

/// Which conditional group rule a [`NestableAtRule`] is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NestableKind {
    Media,
    Container,
}

impl NestableKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Media => "Media",
            Self::Container => "Container",
        }
    }

    /// Keyword written in the output, with its trailing space.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Media => "@media ",
            Self::Container => "@container ",
        }
    }
}

/// `@media` or `@container`: conditional blocks that bubble out of nested rulesets.
#[derive(Clone, Debug)]
pub struct NestableAtRule {
    pub kind: NestableKind,
    /// Conditions, as a comma list of query expressions.
    pub features: Value,
    /// Body: a single ruleset until emission.
    pub rules: Vec<Node>,
    pub debug_info: Option<DebugInfo>,
    pub info: NodeInfo,
}

impl NestableAtRule {
    pub fn new(kind: NestableKind, features: Value, rules: Vec<Node>) -> Self {
        let mut body = Ruleset::new(Selector::empty_selectors(), rules);
        body.allow_imports = true;
        Self {
            kind,
            features,
            rules: vec![Node::Ruleset(body)],
            debug_info: None,
            info: NodeInfo::default(),
        }
    }

    #[inline]
    pub fn media(features: Value, rules: Vec<Node>) -> Self {
        Self::new(NestableKind::Media, features, rules)
    }

    #[inline]
    pub fn container(features: Value, rules: Vec<Node>) -> Self {
        Self::new(NestableKind::Container, features, rules)
    }

    /// The body ruleset.
    pub fn body(&self) -> Option<&Ruleset> {
        self.rules.first().and_then(Node::as_ruleset)
    }

    pub fn body_mut(&mut self) -> Option<&mut Ruleset> {
        match self.rules.first_mut() {
            Some(Node::Ruleset(ruleset)) => Some(ruleset),
            _ => None,
        }
    }
}
