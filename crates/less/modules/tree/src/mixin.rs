use crate::{Combinator, Condition, Element, Node, NodeInfo, Selector, Value};

/// One argument of a mixin call.
#[derive(Clone, Debug)]
pub struct MixinArg {
    /// `@name` for named arguments.
    pub name: Option<String>,
    pub value: Value,
    /// `@list...`: the evaluated list is spread into positional arguments.
    pub expand: bool,
}

impl MixinArg {
    #[inline]
    pub const fn positional(value: Value) -> Self {
        Self {
            name: None,
            value,
            expand: false,
        }
    }

    #[inline]
    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value,
            expand: false,
        }
    }
}

/// `.mixin(args);` or `#ns > .mixin();`
#[derive(Clone, Debug)]
pub struct MixinCall {
    pub selector: Selector,
    pub args: Vec<MixinArg>,
    pub important: bool,
    pub info: NodeInfo,
}

impl MixinCall {
    #[inline]
    pub fn new(selector: Selector, args: Vec<MixinArg>) -> Self {
        Self {
            selector,
            args,
            important: false,
            info: NodeInfo::default(),
        }
    }
}

/// One parameter of a mixin definition.
#[derive(Clone, Debug)]
pub struct MixinParam {
    /// `@name`. Unnamed parameters are patterns matched against the argument.
    pub name: Option<String>,
    /// Default value, or the pattern for an unnamed parameter.
    pub value: Option<Value>,
    /// `...` or `@rest...`
    pub variadic: bool,
}

impl MixinParam {
    #[inline]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: None,
            variadic: false,
        }
    }

    #[inline]
    pub fn with_default(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value),
            variadic: false,
        }
    }

    #[inline]
    pub const fn pattern(value: Value) -> Self {
        Self {
            name: None,
            value: Some(value),
            variadic: false,
        }
    }

    /// `@name...`, or bare `...` when `name` is `None`.
    #[inline]
    pub const fn rest(name: Option<String>) -> Self {
        Self {
            name,
            value: None,
            variadic: true,
        }
    }
}

/// `.mixin(@a; @b: 2) when (@a > 0) { ... }`
#[derive(Clone, Debug)]
pub struct MixinDefinition {
    pub name: String,
    /// The single selector built from the name, used for lookups.
    pub selectors: Vec<Selector>,
    pub params: Vec<MixinParam>,
    pub rules: Vec<Node>,
    pub condition: Option<Condition>,
    pub variadic: bool,
    pub info: NodeInfo,
}

impl MixinDefinition {
    pub fn new(
        name: impl Into<String>,
        params: Vec<MixinParam>,
        rules: Vec<Node>,
        condition: Option<Condition>,
    ) -> Self {
        let name = name.into();
        let variadic = params.last().is_some_and(|param| param.variadic);
        Self {
            selectors: vec![Selector::new([Element::new(Combinator::None, &name)])],
            name,
            params,
            rules,
            condition,
            variadic,
            info: NodeInfo::default(),
        }
    }

    /// Parameters without a default. A trailing rest parameter is counted too.
    pub fn required(&self) -> usize {
        self.params
            .iter()
            .filter(|param| param.name.is_none() || param.value.is_none())
            .count()
    }

    #[inline]
    pub const fn arity(&self) -> usize {
        self.params.len()
    }

    /// Names of the parameters that have a default.
    pub fn optional_parameters(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|param| param.value.is_some())
            .filter_map(|param| param.name.as_deref())
            .collect()
    }

    /// Whether a call without arguments could match, which decides if lookups may
    /// descend into this definition as a namespace.
    pub fn matches_no_args(&self) -> bool {
        let required = self.required();
        if self.variadic {
            required <= 1
        } else {
            required == 0
        }
    }
}

/// `@detached();`
#[derive(Clone, Debug)]
pub struct VariableCall {
    /// Variable name including the `@`.
    pub variable: String,
    pub important: bool,
    pub info: NodeInfo,
}

impl VariableCall {
    #[inline]
    pub fn new(variable: &str) -> Self {
        let variable = if variable.starts_with('@') {
            variable.to_owned()
        } else {
            format!("@{variable}")
        };
        Self {
            variable,
            important: false,
            info: NodeInfo::default(),
        }
    }
}
