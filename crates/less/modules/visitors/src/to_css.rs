use core::mem::take;
use crate::{Replacement, Visit, VisitArgs, Visitor, accept_ruleset, visit, visit_array};
use less_tree::{
    AtRule, Combinator, Comment, CompileOptions, CssContext, Declaration, ErrorKind, Extend,
    GenCss, Import, LessError, MixinDefinition, NestableAtRule, Node, NodeInfo, Ruleset,
    merge_rules,
};
use log::{debug, trace};
use std::collections::HashMap;

/// Prepares an evaluated tree for output.
///
/// Nested rulesets are hoisted next to their parents, invisible and non-output nodes
/// are dropped, merged declarations are combined and duplicates removed.
#[derive(Debug)]
pub struct ToCssVisitor {
    css: CssContext,
    charset_seen: bool,
}

impl ToCssVisitor {
    pub fn new(options: &CompileOptions) -> Self {
        Self {
            css: CssContext::new(options),
            charset_seen: false,
        }
    }

    /// Run over a root ruleset.
    pub fn run(&mut self, root: &mut Ruleset) -> Result<(), LessError> {
        let mut args = VisitArgs::default();
        self.visit_ruleset(root, &mut args)?;
        Ok(())
    }

    fn placement_error(message: String, info: &NodeInfo) -> LessError {
        LessError::new(ErrorKind::InvalidRootPlacement, message).at(info)
    }

    /// Reject rule kinds that cannot be output where they ended up.
    fn check_valid_nodes(rules: &[Node], is_root: bool) -> Result<(), LessError> {
        for rule in rules {
            if is_root
                && let Node::Declaration(declaration) = rule
                && !declaration.variable
            {
                return Err(Self::placement_error(
                    "Properties must be inside selector blocks. They cannot be in the root"
                        .to_owned(),
                    &declaration.info,
                ));
            }
            if let Node::Call(call) = rule {
                return Err(Self::placement_error(
                    format!("Function '{}' did not return a root node", call.name),
                    &call.info,
                ));
            }
            if !rule.allows_root() {
                return Err(Self::placement_error(
                    format!(
                        "{} node returned by a function is not valid here",
                        rule.kind_name()
                    ),
                    rule.info(),
                ));
            }
        }
        Ok(())
    }

    /// Keep only paths with a visible output selector. A leading descendant
    /// combinator is dropped.
    fn compile_paths(ruleset: &mut Ruleset) {
        ruleset.paths.retain_mut(|path| {
            if let Some(first) = path.first_mut()
                && let Some(element) = first.elements.first_mut()
                && element.combinator == Combinator::Descendant
            {
                element.combinator = Combinator::None;
            }
            path.iter()
                .any(|selector| selector.info.is_visible() == Some(true) && selector.is_output())
        });
    }

    /// Remove declarations whose rendered text repeats a later one of the same name.
    fn remove_duplicates(&self, rules: &mut Vec<Node>) {
        let mut context = self.css.clone();
        let mut seen: HashMap<String, Vec<String>> = HashMap::new();
        let mut keep = vec![true; rules.len()];
        for (position, rule) in rules.iter().enumerate().rev() {
            let Node::Declaration(declaration) = rule else {
                continue;
            };
            let rendered = declaration.to_css(&mut context);
            let variants = seen.entry(declaration.name.clone()).or_default();
            if variants.contains(&rendered) {
                trace!("removing duplicate declaration `{rendered}`");
                if let Some(flag) = keep.get_mut(position) {
                    *flag = false;
                }
            } else {
                variants.push(rendered);
            }
        }
        let mut flags = keep.into_iter();
        rules.retain(|_| flags.next().unwrap_or(true));
    }

    fn is_visible_ruleset(ruleset: &Ruleset) -> bool {
        if ruleset.first_root {
            return true;
        }
        if ruleset.info.blocks_visibility() || ruleset.rules().is_empty() {
            return false;
        }
        ruleset.root || !ruleset.paths.is_empty()
    }

    fn contains_silent_unblocked(&self, body: Option<&Ruleset>) -> bool {
        body.is_some_and(|ruleset| {
            ruleset.rules().iter().any(|rule| {
                matches!(rule, Node::Comment(comment)
                    if comment.is_silent(self.css.compress) && !comment.info.blocks_visibility())
            })
        })
    }

    /// Decide whether a visited body-owning at-rule survives.
    ///
    /// `rules` is the at-rule's body list and `had_silent` whether the body held a
    /// silent unblocked comment before visiting.
    fn resolve_visibility(info: &mut NodeInfo, rules: &mut [Node], had_silent: bool) -> bool {
        if !info.blocks_visibility() {
            return !rules.is_empty() || had_silent;
        }
        let Some(Node::Ruleset(body)) = rules.first_mut() else {
            return false;
        };
        let visible: Vec<Node> = body
            .take_rules()
            .into_iter()
            .filter(|rule| rule.info().is_visible() == Some(true))
            .collect();
        if visible.is_empty() {
            return false;
        }
        body.set_rules(visible);
        info.ensure_visibility();
        info.remove_visibility_block();
        !info.blocks_visibility()
    }
}

impl Visitor for ToCssVisitor {
    fn is_replacing(&self) -> bool {
        true
    }

    fn visit_declaration(
        &mut self,
        declaration: &mut Declaration,
        _args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        if declaration.info.blocks_visibility() || declaration.variable {
            return Ok(Visit::Drop);
        }
        Ok(Visit::Keep)
    }

    fn visit_mixin_definition(
        &mut self,
        _definition: &mut MixinDefinition,
        args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        args.visit_deeper = false;
        Ok(Visit::Drop)
    }

    fn visit_extend(&mut self, _extend: &mut Extend, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        Ok(Visit::Drop)
    }

    fn visit_comment(&mut self, comment: &mut Comment, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        if comment.info.blocks_visibility() || comment.is_silent(self.css.compress) {
            return Ok(Visit::Drop);
        }
        Ok(Visit::Keep)
    }

    fn visit_import(&mut self, import: &mut Import, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        if import.info.blocks_visibility() {
            return Ok(Visit::Drop);
        }
        Ok(Visit::Keep)
    }

    fn visit_nestable_at_rule(
        &mut self,
        at_rule: &mut NestableAtRule,
        args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        args.visit_deeper = false;
        let had_silent = self.contains_silent_unblocked(at_rule.body());
        visit_array(self, &mut at_rule.rules)?;
        if Self::resolve_visibility(&mut at_rule.info, &mut at_rule.rules, had_silent) {
            Ok(Visit::Keep)
        } else {
            trace!("dropping invisible {}", at_rule.kind.name());
            Ok(Visit::Drop)
        }
    }

    fn visit_at_rule(&mut self, at_rule: &mut AtRule, args: &mut VisitArgs) -> Result<Visit, LessError> {
        if at_rule.rules.as_ref().is_some_and(|rules| !rules.is_empty()) {
            args.visit_deeper = false;
            let had_silent = self.contains_silent_unblocked(at_rule.body());
            if let Some(rules) = at_rule.rules.as_mut() {
                visit_array(self, rules)?;
            }
            if let Some(body) = at_rule.body_mut() {
                merge_rules(body.rules_mut());
            }
            let Some(rules) = at_rule.rules.as_mut() else {
                return Ok(Visit::Drop);
            };
            if Self::resolve_visibility(&mut at_rule.info, rules, had_silent) {
                return Ok(Visit::Keep);
            }
            return Ok(Visit::Drop);
        }

        if at_rule.info.blocks_visibility() {
            return Ok(Visit::Drop);
        }
        if at_rule.is_charset() {
            if self.charset_seen {
                debug!("dropping repeated @charset");
                let Some(debug_info) = at_rule.debug_info.clone() else {
                    return Ok(Visit::Drop);
                };
                let rendered = at_rule.to_css(&mut self.css).replace('\n', "");
                let mut comment = Comment::block(format!("/* {rendered} */\n"));
                comment.debug_info = Some(debug_info);
                comment.info = at_rule.info.clone();
                let mut node = Node::Comment(comment);
                return match visit(self, &mut node)? {
                    Visit::Keep => Ok(Visit::Replace(Replacement::Node(node))),
                    other @ (Visit::Drop | Visit::Replace(_)) => Ok(other),
                };
            }
            self.charset_seen = true;
        }
        Ok(Visit::Keep)
    }

    fn visit_ruleset(&mut self, ruleset: &mut Ruleset, args: &mut VisitArgs) -> Result<Visit, LessError> {
        args.visit_deeper = false;
        Self::check_valid_nodes(ruleset.rules(), ruleset.first_root)?;

        let mut hoisted: Vec<Node> = Vec::new();
        if ruleset.root {
            visit_array(self, ruleset.rules_mut())?;
        } else {
            Self::compile_paths(ruleset);
            let mut kept = Vec::with_capacity(ruleset.rules().len());
            for mut rule in ruleset.take_rules() {
                if !rule.has_rules() {
                    kept.push(rule);
                    continue;
                }
                match visit(self, &mut rule)? {
                    Visit::Keep => hoisted.push(rule),
                    Visit::Drop => {}
                    Visit::Replace(replacement) => replacement.flatten_into(&mut hoisted),
                }
            }
            ruleset.set_rules(kept);
            accept_ruleset(self, ruleset)?;
        }

        let rules = ruleset.rules_mut();
        merge_rules(rules);
        self.remove_duplicates(rules);

        let mut out: Vec<Node> = Vec::with_capacity(hoisted.len().saturating_add(1));
        if Self::is_visible_ruleset(ruleset) {
            ruleset.info.ensure_visibility();
            if hoisted.is_empty() {
                return Ok(Visit::Keep);
            }
            out.push(Node::Ruleset(take(ruleset)));
        } else if hoisted.is_empty() {
            return Ok(Visit::Drop);
        }
        out.append(&mut hoisted);
        Ok(Visit::Replace(Replacement::from(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use less_tree::{Element, Selector, Value};

    fn visible_selector(text: &str) -> Selector {
        let mut selector = Selector::new([Element::new(Combinator::None, text)]);
        selector.info.ensure_visibility();
        selector
    }

    fn ruleset(text: &str, rules: Vec<Node>) -> Ruleset {
        let selector = visible_selector(text);
        let mut ruleset = Ruleset::new(vec![selector.clone()], rules);
        ruleset.paths = vec![vec![selector]];
        ruleset
    }

    fn declaration(name: &str, value: &str) -> Node {
        Node::Declaration(Declaration::new(name, Value::keyword(value)))
    }

    #[test]
    fn duplicates_keep_the_later_declaration() -> Result<(), LessError> {
        let mut root = Ruleset::stylesheet(vec![Node::Ruleset(ruleset(
            ".a",
            vec![
                declaration("color", "red"),
                declaration("color", "blue"),
                declaration("color", "red"),
            ],
        ))]);
        ToCssVisitor::new(&CompileOptions::default()).run(&mut root)?;
        let Some(Node::Ruleset(inner)) = root.rules().first() else {
            return Err(LessError::runtime("ruleset missing"));
        };
        let values: Vec<String> = inner
            .rules()
            .iter()
            .map(|rule| rule.to_css(&mut CssContext::default()))
            .collect();
        assert_eq!(values, vec!["color: blue;", "color: red;"]);
        Ok(())
    }

    #[test]
    fn property_at_root_is_rejected() {
        let mut root = Ruleset::stylesheet(vec![declaration("color", "red")]);
        let error = ToCssVisitor::new(&CompileOptions::default()).run(&mut root).err();
        assert_eq!(
            error.map(|error| (error.kind, error.message)),
            Some((
                ErrorKind::InvalidRootPlacement,
                "Properties must be inside selector blocks. They cannot be in the root".to_owned()
            ))
        );
    }

    #[test]
    fn invisible_paths_are_removed() -> Result<(), LessError> {
        let hidden = Selector::new([Element::new(Combinator::None, ".hidden")]);
        let mut inner = Ruleset::new(vec![hidden.clone()], vec![declaration("top", "0")]);
        inner.paths = vec![vec![hidden]];
        let mut root = Ruleset::stylesheet(vec![Node::Ruleset(inner)]);
        ToCssVisitor::new(&CompileOptions::default()).run(&mut root)?;
        assert!(root.rules().is_empty());
        Ok(())
    }
}
