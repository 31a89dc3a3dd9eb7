use core::mem::take;
use less_tree::{
    Anonymous, AtRule, Call, Comment, Declaration, Element, ElementValue, Extend, Import,
    LessError, MixinCall, MixinDefinition, NestableAtRule, Node, Ruleset, Selector, VariableCall,
};
use log::trace;

/// Per-visit flags a handler may change.
#[derive(Clone, Copy, Debug)]
pub struct VisitArgs {
    /// Clear to stop the framework from descending into the visited node.
    pub visit_deeper: bool,
}

impl Default for VisitArgs {
    fn default() -> Self {
        Self { visit_deeper: true }
    }
}

/// What replaces a visited node.
#[derive(Debug)]
pub enum Replacement {
    Node(Node),
    /// A list of replacements, flattened into the enclosing rule list.
    List(Vec<Self>),
}

impl Replacement {
    /// Append every node of this replacement to `out`, flattening nested lists.
    pub fn flatten_into(self, out: &mut Vec<Node>) {
        match self {
            Self::Node(node) => out.push(node),
            Self::List(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

impl From<Vec<Node>> for Replacement {
    fn from(nodes: Vec<Node>) -> Self {
        Self::List(nodes.into_iter().map(Self::Node).collect())
    }
}

/// Outcome of a handler.
#[derive(Debug)]
pub enum Visit {
    /// Keep the node, possibly mutated in place.
    Keep,
    Drop,
    Replace(Replacement),
}

/// A tree walker with one handler per node kind.
///
/// Every handler defaults to keeping the node. Exit handlers run after the
/// descent. Only replacing visitors may drop or replace nodes; the outcome of a
/// non-replacing visitor is ignored.
pub trait Visitor {
    fn is_replacing(&self) -> bool {
        false
    }

    /// Entry point for every node. Defaults to the per-kind handlers.
    fn visit_node(&mut self, node: &mut Node, args: &mut VisitArgs) -> Result<Visit, LessError> {
        dispatch(self, node, args)
    }

    /// Exit point for every node. Defaults to the per-kind exit handlers.
    fn visit_node_out(&mut self, node: &mut Node) -> Result<(), LessError> {
        dispatch_out(self, node)
    }

    fn visit_ruleset(&mut self, _ruleset: &mut Ruleset, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_ruleset_out(&mut self, _ruleset: &mut Ruleset) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_declaration(
        &mut self,
        _declaration: &mut Declaration,
        _args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_declaration_out(&mut self, _declaration: &mut Declaration) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_at_rule(&mut self, _at_rule: &mut AtRule, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_at_rule_out(&mut self, _at_rule: &mut AtRule) -> Result<(), LessError> {
        Ok(())
    }

    /// Handler for `@media` and `@container`.
    fn visit_nestable_at_rule(
        &mut self,
        _at_rule: &mut NestableAtRule,
        _args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_nestable_at_rule_out(&mut self, _at_rule: &mut NestableAtRule) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_comment(&mut self, _comment: &mut Comment, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_comment_out(&mut self, _comment: &mut Comment) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_import(&mut self, _import: &mut Import, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_import_out(&mut self, _import: &mut Import) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_mixin_call(&mut self, _call: &mut MixinCall, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_mixin_call_out(&mut self, _call: &mut MixinCall) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_mixin_definition(
        &mut self,
        _definition: &mut MixinDefinition,
        _args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_mixin_definition_out(&mut self, _definition: &mut MixinDefinition) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_variable_call(
        &mut self,
        _call: &mut VariableCall,
        _args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_variable_call_out(&mut self, _call: &mut VariableCall) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_extend(&mut self, _extend: &mut Extend, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_extend_out(&mut self, _extend: &mut Extend) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_call(&mut self, _call: &mut Call, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_call_out(&mut self, _call: &mut Call) -> Result<(), LessError> {
        Ok(())
    }

    fn visit_anonymous(
        &mut self,
        _anonymous: &mut Anonymous,
        _args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        Ok(Visit::Keep)
    }

    fn visit_anonymous_out(&mut self, _anonymous: &mut Anonymous) -> Result<(), LessError> {
        Ok(())
    }

    /// Selectors are not rule-level nodes, so their hooks cannot replace them.
    fn visit_selector(&mut self, _selector: &mut Selector, _args: &mut VisitArgs) {}

    fn visit_element(&mut self, _element: &mut Element, _args: &mut VisitArgs) {}
}

/// Route a node to its kind's handler.
pub fn dispatch<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &mut Node,
    args: &mut VisitArgs,
) -> Result<Visit, LessError> {
    match node {
        Node::Ruleset(ruleset) => visitor.visit_ruleset(ruleset, args),
        Node::Declaration(declaration) => visitor.visit_declaration(declaration, args),
        Node::AtRule(at_rule) => visitor.visit_at_rule(at_rule, args),
        Node::NestableAtRule(at_rule) => visitor.visit_nestable_at_rule(at_rule, args),
        Node::Comment(comment) => visitor.visit_comment(comment, args),
        Node::Import(import) => visitor.visit_import(import, args),
        Node::MixinCall(call) => visitor.visit_mixin_call(call, args),
        Node::MixinDefinition(definition) => visitor.visit_mixin_definition(definition, args),
        Node::VariableCall(call) => visitor.visit_variable_call(call, args),
        Node::Extend(extend) => visitor.visit_extend(extend, args),
        Node::Call(call) => visitor.visit_call(call, args),
        Node::Anonymous(anonymous) => visitor.visit_anonymous(anonymous, args),
    }
}

/// Route a node to its kind's exit handler.
pub fn dispatch_out<V: Visitor + ?Sized>(visitor: &mut V, node: &mut Node) -> Result<(), LessError> {
    match node {
        Node::Ruleset(ruleset) => visitor.visit_ruleset_out(ruleset),
        Node::Declaration(declaration) => visitor.visit_declaration_out(declaration),
        Node::AtRule(at_rule) => visitor.visit_at_rule_out(at_rule),
        Node::NestableAtRule(at_rule) => visitor.visit_nestable_at_rule_out(at_rule),
        Node::Comment(comment) => visitor.visit_comment_out(comment),
        Node::Import(import) => visitor.visit_import_out(import),
        Node::MixinCall(call) => visitor.visit_mixin_call_out(call),
        Node::MixinDefinition(definition) => visitor.visit_mixin_definition_out(definition),
        Node::VariableCall(call) => visitor.visit_variable_call_out(call),
        Node::Extend(extend) => visitor.visit_extend_out(extend),
        Node::Call(call) => visitor.visit_call_out(call),
        Node::Anonymous(anonymous) => visitor.visit_anonymous_out(anonymous),
    }
}

/// Visit one node: handler, descent, exit handler.
///
/// A kept node descends into itself and a single replacement node descends into the
/// replacement. Dropped nodes and list replacements are not descended into.
pub fn visit<V: Visitor + ?Sized>(visitor: &mut V, node: &mut Node) -> Result<Visit, LessError> {
    let mut args = VisitArgs::default();
    trace!("visiting {}", node.kind_name());
    let outcome = visitor.visit_node(node, &mut args)?;
    let outcome = if visitor.is_replacing() {
        outcome
    } else {
        Visit::Keep
    };
    match outcome {
        Visit::Keep => {
            if args.visit_deeper {
                accept(visitor, node)?;
            }
            visitor.visit_node_out(node)?;
            Ok(Visit::Keep)
        }
        Visit::Replace(Replacement::Node(mut replaced)) => {
            if args.visit_deeper {
                accept(visitor, &mut replaced)?;
            }
            visitor.visit_node_out(&mut replaced)?;
            Ok(Visit::Replace(Replacement::Node(replaced)))
        }
        other @ (Visit::Drop | Visit::Replace(Replacement::List(_))) => Ok(other),
    }
}

/// Visit every node of a rule list, applying drops and flattening replacements.
pub fn visit_array<V: Visitor + ?Sized>(visitor: &mut V, nodes: &mut Vec<Node>) -> Result<(), LessError> {
    if !visitor.is_replacing() {
        for node in nodes.iter_mut() {
            visit(visitor, node)?;
        }
        return Ok(());
    }
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in take(nodes) {
        match visit(visitor, &mut node)? {
            Visit::Keep => out.push(node),
            Visit::Drop => {}
            Visit::Replace(replacement) => replacement.flatten_into(&mut out),
        }
    }
    *nodes = out;
    Ok(())
}

/// Visit a selector and then, unless stopped, its elements and nested selectors.
pub fn accept_selector<V: Visitor + ?Sized>(visitor: &mut V, selector: &mut Selector) {
    let mut args = VisitArgs::default();
    visitor.visit_selector(selector, &mut args);
    if !args.visit_deeper {
        return;
    }
    for element in &mut selector.elements {
        let mut element_args = VisitArgs::default();
        visitor.visit_element(element, &mut element_args);
        if element_args.visit_deeper
            && let ElementValue::Paren(nested) = &mut element.value
        {
            accept_selector(visitor, nested);
        }
    }
}

/// Descend into a node's children.
pub fn accept<V: Visitor + ?Sized>(visitor: &mut V, node: &mut Node) -> Result<(), LessError> {
    match node {
        Node::Ruleset(ruleset) => accept_ruleset(visitor, ruleset),
        Node::AtRule(at_rule) => match at_rule.rules.as_mut() {
            Some(rules) => visit_array(visitor, rules),
            None => Ok(()),
        },
        Node::NestableAtRule(at_rule) => visit_array(visitor, &mut at_rule.rules),
        Node::MixinDefinition(definition) => visit_array(visitor, &mut definition.rules),
        Node::Extend(extend) => {
            accept_selector(visitor, &mut extend.selector);
            Ok(())
        }
        Node::MixinCall(call) => {
            accept_selector(visitor, &mut call.selector);
            Ok(())
        }
        Node::Declaration(_)
        | Node::Comment(_)
        | Node::Import(_)
        | Node::VariableCall(_)
        | Node::Call(_)
        | Node::Anonymous(_) => Ok(()),
    }
}

/// Ruleset children: the paths (or the selectors before joining), then the rules.
pub fn accept_ruleset<V: Visitor + ?Sized>(visitor: &mut V, ruleset: &mut Ruleset) -> Result<(), LessError> {
    if ruleset.paths.is_empty() {
        for selector in &mut ruleset.selectors {
            accept_selector(visitor, selector);
        }
    } else {
        for selector in ruleset.paths.iter_mut().flatten() {
            accept_selector(visitor, selector);
        }
    }
    if ruleset.rules().is_empty() {
        return Ok(());
    }
    visit_array(visitor, ruleset.rules_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use less_tree::{Combinator, Value};

    /// Drops comments and turns every `a` declaration into two.
    struct Rewriter {
        exits: usize,
    }

    impl Visitor for Rewriter {
        fn is_replacing(&self) -> bool {
            true
        }

        fn visit_comment(&mut self, _comment: &mut Comment, _args: &mut VisitArgs) -> Result<Visit, LessError> {
            Ok(Visit::Drop)
        }

        fn visit_declaration(
            &mut self,
            declaration: &mut Declaration,
            _args: &mut VisitArgs,
        ) -> Result<Visit, LessError> {
            if declaration.name != "a" {
                return Ok(Visit::Keep);
            }
            let first = Node::Declaration(Declaration::new("a1", declaration.value.clone()));
            let second = Node::Declaration(Declaration::new("a2", declaration.value.clone()));
            Ok(Visit::Replace(Replacement::List(vec![
                Replacement::Node(first),
                Replacement::List(vec![Replacement::Node(second)]),
            ])))
        }

        fn visit_declaration_out(&mut self, _declaration: &mut Declaration) -> Result<(), LessError> {
            self.exits = self.exits.saturating_add(1);
            Ok(())
        }
    }

    fn names(rules: &[Node]) -> Vec<String> {
        rules
            .iter()
            .filter_map(Node::as_declaration)
            .map(|declaration| declaration.name.clone())
            .collect()
    }

    #[test]
    fn replacements_are_flattened_and_drops_applied() -> Result<(), LessError> {
        let mut rules = vec![
            Node::Comment(Comment::block("/* x */")),
            Node::Declaration(Declaration::new("a", Value::keyword("1"))),
            Node::Declaration(Declaration::new("b", Value::keyword("2"))),
        ];
        let mut rewriter = Rewriter { exits: 0 };
        visit_array(&mut rewriter, &mut rules)?;
        assert_eq!(names(&rules), vec!["a1", "a2", "b"]);
        // List replacements skip the exit handler.
        assert_eq!(rewriter.exits, 1);
        Ok(())
    }

    #[test]
    fn descends_into_ruleset_rules() -> Result<(), LessError> {
        let inner = Ruleset::new(
            vec![Selector::parent()],
            vec![Node::Declaration(Declaration::new("a", Value::keyword("1")))],
        );
        let mut rules = vec![Node::Ruleset(inner)];
        visit_array(&mut Rewriter { exits: 0 }, &mut rules)?;
        let Some(Node::Ruleset(ruleset)) = rules.first() else {
            return Err(LessError::runtime("ruleset disappeared"));
        };
        assert_eq!(names(ruleset.rules()), vec!["a1", "a2"]);
        Ok(())
    }

    /// Counts elements, never replacing anything.
    struct Counter {
        elements: usize,
    }

    impl Visitor for Counter {
        fn visit_comment(&mut self, _comment: &mut Comment, _args: &mut VisitArgs) -> Result<Visit, LessError> {
            Ok(Visit::Drop)
        }

        fn visit_element(&mut self, _element: &mut Element, _args: &mut VisitArgs) {
            self.elements = self.elements.saturating_add(1);
        }
    }

    #[test]
    fn non_replacing_visitor_keeps_nodes() -> Result<(), LessError> {
        let mut rules = vec![
            Node::Comment(Comment::block("/* kept */")),
            Node::MixinCall(MixinCall::new(
                Selector::new([
                    Element::new(Combinator::None, "#ns"),
                    Element::new(Combinator::Child, ".m"),
                ]),
                Vec::new(),
            )),
        ];
        let mut counter = Counter { elements: 0 };
        visit_array(&mut counter, &mut rules)?;
        assert_eq!(rules.len(), 2);
        assert_eq!(counter.elements, 2);
        Ok(())
    }
}
