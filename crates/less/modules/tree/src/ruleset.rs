//! Rulesets and the lookups evaluation performs on them.

use crate::selector::match_elements;
use crate::{Declaration, DebugInfo, Element, FunctionRegistry, Node, NodeInfo, Selector};
use core::cell::{OnceCell, RefCell};
use core::mem::take;
use std::collections::HashMap;
use std::rc::Rc;

/// A fully joined selector chain, outermost selector first.
pub type Path = Vec<Selector>;

/// A block of rules guarded by selectors, or the stylesheet root.
#[derive(Clone, Debug, Default)]
pub struct Ruleset {
    pub selectors: Vec<Selector>,
    rules: Vec<Node>,
    /// Joined selector paths, filled in by evaluation.
    pub paths: Vec<Path>,
    pub root: bool,
    /// The stylesheet root. Only the first root prints the final newline.
    pub first_root: bool,
    pub strict_imports: bool,
    pub allow_imports: bool,
    /// Synthetic container for media blocks bubbled out of a nested at-rule.
    pub multi_media: bool,
    pub debug_info: Option<DebugInfo>,
    pub function_registry: Option<Rc<FunctionRegistry>>,
    pub info: NodeInfo,
    variables: OnceCell<HashMap<String, usize>>,
    properties: OnceCell<HashMap<String, Vec<usize>>>,
    rulesets: OnceCell<Vec<usize>>,
    lookups: RefCell<HashMap<String, Vec<Vec<usize>>>>,
}

impl Ruleset {
    pub fn new(selectors: Vec<Selector>, rules: Vec<Node>) -> Self {
        Self {
            selectors,
            rules,
            ..Self::default()
        }
    }

    /// The root of a parsed stylesheet.
    pub fn stylesheet(rules: Vec<Node>) -> Self {
        Self {
            root: true,
            first_root: true,
            ..Self::new(Vec::new(), rules)
        }
    }

    #[inline]
    pub fn rules(&self) -> &[Node] {
        &self.rules
    }

    /// Mutable access to the rule list. Every cached lookup is dropped.
    #[inline]
    pub fn rules_mut(&mut self) -> &mut Vec<Node> {
        self.reset_cache();
        &mut self.rules
    }

    #[inline]
    pub fn set_rules(&mut self, rules: Vec<Node>) {
        self.reset_cache();
        self.rules = rules;
    }

    #[inline]
    pub fn take_rules(&mut self) -> Vec<Node> {
        self.reset_cache();
        take(&mut self.rules)
    }

    pub fn reset_cache(&mut self) {
        self.variables = OnceCell::new();
        self.properties = OnceCell::new();
        self.rulesets = OnceCell::new();
        self.lookups.get_mut().clear();
    }

    pub fn prepend_rule(&mut self, rule: Node) {
        self.rules_mut().insert(0, rule);
    }

    fn variables(&self) -> &HashMap<String, usize> {
        self.variables.get_or_init(|| {
            self.rules
                .iter()
                .enumerate()
                .filter_map(|(index, rule)| match rule {
                    Node::Declaration(declaration) if declaration.variable => {
                        Some((declaration.name.clone(), index))
                    }
                    _ => None,
                })
                .collect()
        })
    }

    fn properties(&self) -> &HashMap<String, Vec<usize>> {
        self.properties.get_or_init(|| {
            let mut properties: HashMap<String, Vec<usize>> = HashMap::new();
            for (index, rule) in self.rules.iter().enumerate() {
                if let Node::Declaration(declaration) = rule
                    && !declaration.variable
                {
                    properties
                        .entry(format!("${}", declaration.name))
                        .or_default()
                        .push(index);
                }
            }
            properties
        })
    }

    /// The last declaration of the variable `name` (with its `@`) in this ruleset.
    pub fn variable(&self, name: &str) -> Option<&Declaration> {
        self.variables()
            .get(name)
            .and_then(|&index| self.rules.get(index))
            .and_then(Node::as_declaration)
    }

    /// Every declaration of the property `name` (with its `$`), in source order.
    pub fn property(&self, name: &str) -> Vec<&Declaration> {
        self.properties()
            .get(name)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&index| self.rules.get(index).and_then(Node::as_declaration))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Indices of the nested rulesets and mixin definitions.
    pub fn rulesets(&self) -> &[usize] {
        self.rulesets.get_or_init(|| {
            self.rules
                .iter()
                .enumerate()
                .filter(|(_, rule)| matches!(rule, Node::Ruleset(_) | Node::MixinDefinition(_)))
                .map(|(index, _)| index)
                .collect()
        })
    }

    /// Find the rulesets and mixin definitions a mixin call selector names.
    ///
    /// Each result is a path of rule indices starting from this ruleset. Lookups descend
    /// into namespaces only when those could be called without arguments.
    pub fn find(&self, selector: &Selector) -> Vec<Vec<usize>> {
        let key = lookup_key(&selector.elements);
        if let Some(found) = self.lookups.borrow().get(&key) {
            return found.clone();
        }
        let found = find_in(&self.rules, &selector.elements);
        self.lookups.borrow_mut().insert(key, found.clone());
        found
    }

    /// The node at a path returned by [`Self::find`].
    pub fn resolve(&self, path: &[usize]) -> Option<&Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.rules.get(first)?;
        for &index in rest {
            node = child_rules(node).get(index)?;
        }
        Some(node)
    }

    /// Copy with every declaration, including nested ones, marked `!important`.
    #[must_use]
    pub fn make_important(&self) -> Self {
        let mut important = self.clone();
        important.set_rules(self.rules.iter().map(make_rule_important).collect());
        important
    }
}

fn make_rule_important(rule: &Node) -> Node {
    match rule {
        Node::Declaration(declaration) => Node::Declaration(declaration.clone().important()),
        Node::Ruleset(ruleset) => Node::Ruleset(ruleset.make_important()),
        other => other.clone(),
    }
}

fn child_rules(node: &Node) -> &[Node] {
    match node {
        Node::Ruleset(ruleset) => ruleset.rules(),
        Node::MixinDefinition(definition) => &definition.rules,
        _ => &[],
    }
}

fn lookup_key(elements: &[Element]) -> String {
    let mut key = String::new();
    for element in elements {
        key.push_str(element.combinator.as_str());
        key.push_str(element.value.text().unwrap_or("()"));
    }
    key
}

fn find_in(rules: &[Node], elements: &[Element]) -> Vec<Vec<usize>> {
    let mut found = Vec::new();
    for (index, rule) in rules.iter().enumerate() {
        let (selectors, namespace) = match rule {
            Node::Ruleset(ruleset) => (&ruleset.selectors, true),
            Node::MixinDefinition(definition) => {
                (&definition.selectors, definition.matches_no_args())
            }
            _ => continue,
        };
        for selector in selectors {
            let matched = match_elements(elements, &selector.mixin_elements());
            if matched == 0 {
                continue;
            }
            if elements.len() > matched {
                if namespace {
                    let rest = elements.get(matched..).unwrap_or(&[]);
                    for mut path in find_in(child_rules(rule), rest) {
                        path.insert(0, index);
                        found.push(path);
                    }
                }
            } else {
                found.push(vec![index]);
            }
            break;
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Combinator, MixinDefinition, MixinParam, Value};

    fn class(name: &str) -> Selector {
        Selector::new([Element::new(Combinator::None, name)])
    }

    #[test]
    fn last_variable_wins_and_cache_resets() {
        let mut ruleset = Ruleset::new(
            vec![class(".a")],
            vec![
                Node::Declaration(Declaration::new("@x", Value::number(1.0))),
                Node::Declaration(Declaration::new("@x", Value::number(2.0))),
            ],
        );
        assert!(matches!(
            ruleset.variable("@x").map(|declaration| &declaration.value),
            Some(Value::Dimension { value, .. }) if (*value - 2.0).abs() < f64::EPSILON
        ));
        ruleset
            .rules_mut()
            .push(Node::Declaration(Declaration::new("@y", Value::number(3.0))));
        assert!(ruleset.variable("@y").is_some());
        assert!(ruleset.variable("@z").is_none());
    }

    #[test]
    fn properties_are_keyed_with_dollar() {
        let ruleset = Ruleset::new(
            vec![class(".a")],
            vec![
                Node::Declaration(Declaration::new("color", Value::keyword("red"))),
                Node::Declaration(Declaration::new("color", Value::keyword("blue"))),
            ],
        );
        assert_eq!(ruleset.property("$color").len(), 2);
        assert!(ruleset.property("color").is_empty());
    }

    #[test]
    fn find_descends_into_namespaces() {
        let mixin = MixinDefinition::new(".m", Vec::new(), Vec::new(), None);
        let namespace = Ruleset::new(vec![class("#ns")], vec![Node::MixinDefinition(mixin)]);
        let root = Ruleset::stylesheet(vec![Node::Ruleset(namespace)]);
        let call = Selector::new([
            Element::new(Combinator::None, "#ns"),
            Element::new(Combinator::Child, ".m"),
        ]);
        let found = root.find(&call);
        assert_eq!(found, vec![vec![0, 0]]);
        assert!(matches!(
            root.resolve(&found[0]),
            Some(Node::MixinDefinition(definition)) if definition.name == ".m"
        ));
    }

    #[test]
    fn find_skips_namespaces_needing_arguments() {
        let inner = MixinDefinition::new(".m", Vec::new(), Vec::new(), None);
        let namespace = MixinDefinition::new(
            "#ns",
            vec![MixinParam::named("@a")],
            vec![Node::MixinDefinition(inner)],
            None,
        );
        let root = Ruleset::stylesheet(vec![Node::MixinDefinition(namespace)]);
        let call = Selector::new([
            Element::new(Combinator::None, "#ns"),
            Element::new(Combinator::Descendant, ".m"),
        ]);
        assert!(root.find(&call).is_empty());
    }
}
