use crate::{LessError, Value};
use core::fmt::{self, Debug, Formatter};
use std::collections::HashMap;
use std::rc::Rc;

/// A function callable from Less values, like `darken(@c, 10%)`.
pub type LessFunction = Rc<dyn Fn(&[Value]) -> Result<Value, LessError>>;

/// Name-keyed functions with an optional parent registry to fall back on.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, LessFunction>,
    parent: Option<Rc<Self>>,
}

impl FunctionRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry that falls back to `parent`.
    #[inline]
    pub fn inherit(parent: &Rc<Self>) -> Self {
        Self {
            functions: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }
    }

    /// Register `function` under `name`. Names are case-insensitive.
    pub fn add<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, LessError> + 'static,
    {
        self.functions
            .insert(name.to_ascii_lowercase(), Rc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<LessFunction> {
        let key = name.to_ascii_lowercase();
        self.functions.get(&key).map(Rc::clone).or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.get(&key))
        })
    }
}

impl Debug for FunctionRegistry {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        formatter
            .debug_struct("FunctionRegistry")
            .field("functions", &names)
            .field("parent", &self.parent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_back_to_parent() {
        let mut root = FunctionRegistry::new();
        root.add("Double", |args: &[Value]| match args.first() {
            Some(Value::Dimension { value, unit }) => Ok(Value::dimension(value * 2.0, unit.clone())),
            _ => Ok(Value::keyword("none")),
        });
        let root = Rc::new(root);
        let child = FunctionRegistry::inherit(&root);
        assert!(child.get("double").is_some());
        assert!(child.get("triple").is_none());
    }
}
