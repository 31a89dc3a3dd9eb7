use core::cmp::Ordering;
use crate::{NodeInfo, Ruleset};

/// Arithmetic operator of an [`Value::Operation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

/// A function call, either inside a value or standing alone at rule level.
#[derive(Clone, Debug)]
pub struct Call {
    pub name: String,
    pub args: Vec<Value>,
    pub info: NodeInfo,
}

impl Call {
    #[inline]
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
            info: NodeInfo::default(),
        }
    }

    /// `calc()` keeps its arguments unevaluated by math.
    #[inline]
    pub fn is_calc(&self) -> bool {
        self.name.eq_ignore_ascii_case("calc")
    }
}

/// Declaration values, media features, mixin arguments and guard operands.
#[derive(Clone, Debug)]
pub enum Value {
    /// Bare identifier such as `red`, `and` or `true`.
    Keyword(String),
    /// Text passed through unchanged.
    Anonymous(String),
    /// Number with an optional unit (`10px`, `50%`, `1.5`).
    Dimension { value: f64, unit: String },
    /// Quoted string. Escaped strings (`~"..."`) render without quotes.
    Quoted {
        quote: char,
        content: String,
        escaped: bool,
    },
    /// `@name` reference, stored with its sigil. `@@name` is a variable-named variable.
    Variable(String),
    /// `$name` property reference, stored with its sigil.
    Property(String),
    Operation {
        operator: Operator,
        operands: Box<(Self, Self)>,
        is_spaced: bool,
    },
    Negative(Box<Self>),
    Paren(Box<Self>),
    /// Space separated items.
    Expression(Vec<Self>),
    /// Comma separated items.
    List(Vec<Self>),
    Call(Call),
    /// A ruleset held in a variable, called with `@name();`.
    DetachedRuleset(Box<Ruleset>),
}

impl Value {
    #[inline]
    pub fn keyword(text: impl Into<String>) -> Self {
        Self::Keyword(text.into())
    }

    #[inline]
    pub fn anonymous(text: impl Into<String>) -> Self {
        Self::Anonymous(text.into())
    }

    #[inline]
    pub fn number(value: f64) -> Self {
        Self::Dimension {
            value,
            unit: String::new(),
        }
    }

    #[inline]
    pub fn dimension(value: f64, unit: impl Into<String>) -> Self {
        Self::Dimension {
            value,
            unit: unit.into(),
        }
    }

    #[inline]
    pub fn quoted(content: impl Into<String>) -> Self {
        Self::Quoted {
            quote: '"',
            content: content.into(),
            escaped: false,
        }
    }

    /// `~"..."`
    #[inline]
    pub fn escaped(content: impl Into<String>) -> Self {
        Self::Quoted {
            quote: '"',
            content: content.into(),
            escaped: true,
        }
    }

    /// Variable reference. The leading `@` is added when missing.
    pub fn variable(name: &str) -> Self {
        if name.starts_with('@') {
            Self::Variable(name.to_owned())
        } else {
            Self::Variable(format!("@{name}"))
        }
    }

    /// Property reference. The leading `$` is added when missing.
    pub fn property(name: &str) -> Self {
        if name.starts_with('$') {
            Self::Property(name.to_owned())
        } else {
            Self::Property(format!("${name}"))
        }
    }

    #[inline]
    pub fn operation(operator: Operator, left: Self, right: Self) -> Self {
        Self::Operation {
            operator,
            operands: Box::new((left, right)),
            is_spaced: true,
        }
    }

    #[inline]
    pub fn paren(inner: Self) -> Self {
        Self::Paren(Box::new(inner))
    }

    #[inline]
    pub fn call(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Call(Call::new(name, args))
    }

    #[inline]
    pub fn detached(ruleset: Ruleset) -> Self {
        Self::DetachedRuleset(Box::new(ruleset))
    }

    /// Items of a list-like value, or the value itself as a single item.
    pub fn items(&self) -> Vec<Self> {
        match self {
            Self::List(items) | Self::Expression(items) => items.clone(),
            other => vec![other.clone()],
        }
    }
}

/// Comparison operator of a guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
}

impl CompareOp {
    /// Whether an ordering satisfies this operator.
    pub const fn accepts(self, ordering: Ordering) -> bool {
        match ordering {
            Ordering::Less => matches!(self, Self::Less | Self::LessOrEqual),
            Ordering::Equal => {
                matches!(self, Self::Equal | Self::LessOrEqual | Self::GreaterOrEqual)
            }
            Ordering::Greater => matches!(self, Self::Greater | Self::GreaterOrEqual),
        }
    }
}

/// Guard expression of a mixin definition or a CSS guard.
#[derive(Clone, Debug)]
pub enum Condition {
    Compare {
        op: CompareOp,
        left: Value,
        right: Value,
    },
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Not(Box<Self>),
    /// `when (@flag)`: holds when the value is the keyword `true`.
    Truthy(Value),
}

impl Condition {
    #[inline]
    pub fn compare(op: CompareOp, left: Value, right: Value) -> Self {
        Self::Compare { op, left, right }
    }

    #[inline]
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    #[inline]
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    #[inline]
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}
