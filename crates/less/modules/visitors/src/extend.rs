use crate::{Visit, VisitArgs, Visitor, accept_ruleset};
use less_tree::{
    Combinator, CssContext, Declaration, Element, ElementValue, Extend, GenCss as _, LessError,
    MixinDefinition, Node, Path, Ruleset, Selector,
};
use log::{debug, trace};
use std::collections::{HashSet, VecDeque};

/// One `:extend` request: paths matching `target` also get `extender`.
#[derive(Clone, Debug)]
struct ExtendEntry {
    /// Rendered target, compared against rendered paths.
    key: String,
    target: Selector,
    all: bool,
    extender: Path,
}

/// Collects every extend of the tree, both rule-level `&:extend(...)` and the
/// extend lists carried by joined selectors.
#[derive(Debug, Default)]
struct ExtendFinder {
    entries: Vec<ExtendEntry>,
}

impl Visitor for ExtendFinder {
    fn visit_declaration(
        &mut self,
        _declaration: &mut Declaration,
        args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        args.visit_deeper = false;
        Ok(Visit::Keep)
    }

    fn visit_mixin_definition(
        &mut self,
        _definition: &mut MixinDefinition,
        args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        args.visit_deeper = false;
        Ok(Visit::Keep)
    }

    fn visit_ruleset(&mut self, ruleset: &mut Ruleset, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        if ruleset.root {
            return Ok(Visit::Keep);
        }
        let rule_extends: Vec<&Extend> = ruleset
            .rules()
            .iter()
            .filter_map(|rule| match rule {
                Node::Extend(extend) => Some(extend),
                _ => None,
            })
            .collect();
        for path in &ruleset.paths {
            let own = path
                .last()
                .map_or(&[][..], |selector| selector.extend_list.as_slice());
            for extend in rule_extends.iter().copied().chain(own) {
                self.entries.push(ExtendEntry {
                    key: selector_css(&extend.selector),
                    target: extend.selector.clone(),
                    all: extend.all,
                    extender: path.clone(),
                });
            }
        }
        Ok(Visit::Keep)
    }
}

/// Applies `:extend` before output.
///
/// A ruleset whose path renders exactly like an extend target gains the extending
/// path. With `all`, every occurrence of the target's elements inside a path is
/// replaced by the extending selector, giving one extra path per occurrence.
/// Extends chain: a path added by one extend is matched against the others.
#[derive(Debug, Default)]
pub struct ProcessExtends {
    entries: Vec<ExtendEntry>,
}

impl ProcessExtends {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Run over a root ruleset.
    pub fn run(&mut self, root: &mut Ruleset) -> Result<(), LessError> {
        let mut finder = ExtendFinder::default();
        accept_ruleset(&mut finder, root)?;
        if finder.entries.is_empty() {
            return Ok(());
        }
        debug!("applying {} extends", finder.entries.len());
        self.entries = finder.entries;
        accept_ruleset(self, root)
    }

    /// Paths to add for `paths`, in discovery order.
    ///
    /// A chain never applies more extends than there are, which stops circular chains.
    fn extended_paths(&self, paths: &[Path]) -> Vec<Path> {
        let mut seen: HashSet<String> = paths.iter().map(|path| path_css(path)).collect();
        let mut pending: VecDeque<(Path, usize)> =
            paths.iter().map(|path| (path.clone(), 0)).collect();
        let mut added = Vec::new();
        while let Some((path, depth)) = pending.pop_front() {
            if depth >= self.entries.len() {
                continue;
            }
            let rendered = path_css(&path);
            for entry in &self.entries {
                let derived = if rendered == entry.key {
                    vec![entry.extender.clone()]
                } else if entry.all && rendered.contains(&entry.key) {
                    replace_matches(&path, &entry.target, &entry.extender)
                } else {
                    continue;
                };
                for candidate in derived {
                    let css = path_css(&candidate);
                    if seen.insert(css) {
                        pending.push_back((candidate.clone(), depth.saturating_add(1)));
                        added.push(candidate);
                    }
                }
            }
        }
        added
    }
}

impl Visitor for ProcessExtends {
    fn visit_declaration(
        &mut self,
        _declaration: &mut Declaration,
        args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        args.visit_deeper = false;
        Ok(Visit::Keep)
    }

    fn visit_mixin_definition(
        &mut self,
        _definition: &mut MixinDefinition,
        args: &mut VisitArgs,
    ) -> Result<Visit, LessError> {
        args.visit_deeper = false;
        Ok(Visit::Keep)
    }

    fn visit_ruleset(&mut self, ruleset: &mut Ruleset, _args: &mut VisitArgs) -> Result<Visit, LessError> {
        if ruleset.root {
            return Ok(Visit::Keep);
        }
        let added = self.extended_paths(&ruleset.paths);
        if !added.is_empty() {
            trace!("extend adds {} paths", added.len());
            ruleset.paths.extend(added);
        }
        Ok(Visit::Keep)
    }
}

fn selector_css(selector: &Selector) -> String {
    let mut context = CssContext {
        first_selector: true,
        ..CssContext::default()
    };
    selector.to_css(&mut context).trim().to_owned()
}

/// A path rendered the way ruleset output prints it.
fn path_css(path: &[Selector]) -> String {
    let mut context = CssContext::default();
    let mut css = String::new();
    for (position, selector) in path.iter().enumerate() {
        context.first_selector = position == 0;
        css.push_str(&selector.to_css(&mut context));
    }
    css.trim().to_owned()
}

/// The elements of a whole path as one run. Selectors after the first are descendants.
fn flatten_path(path: &[Selector]) -> Vec<Element> {
    let mut elements = Vec::new();
    for (position, selector) in path.iter().enumerate() {
        for (index, element) in selector.elements.iter().enumerate() {
            if position > 0 && index == 0 && element.combinator == Combinator::None {
                elements.push(element.with_combinator(Combinator::Descendant));
            } else {
                elements.push(element.clone());
            }
        }
    }
    elements
}

fn same_value(left: &Element, right: &Element) -> bool {
    match (&left.value, &right.value) {
        (ElementValue::Paren(outer), ElementValue::Paren(inner)) => {
            selector_css(outer) == selector_css(inner)
        }
        (value, other) => value.text().is_some() && value.text() == other.text(),
    }
}

/// A target element without a combinator matches any combinator.
fn elements_match(window: &[Element], find: &[Element]) -> bool {
    window.iter().zip(find).all(|(element, wanted)| {
        same_value(element, wanted)
            && (wanted.combinator == Combinator::None || wanted.combinator == element.combinator)
    })
}

/// One new path per occurrence of `target`'s elements in a selector of `path`.
fn replace_matches(path: &[Selector], target: &Selector, extender: &[Selector]) -> Vec<Path> {
    let find = target.elements.as_slice();
    if find.is_empty() {
        return Vec::new();
    }
    let replacement = flatten_path(extender);
    let mut derived = Vec::new();
    for (position, selector) in path.iter().enumerate() {
        for (start, window) in selector.elements.windows(find.len()).enumerate() {
            if !elements_match(window, find) {
                continue;
            }
            let combinator = window
                .first()
                .map_or(Combinator::None, |element| element.combinator);
            let inserted = replacement.iter().enumerate().map(|(index, element)| {
                if index == 0 {
                    element.with_combinator(combinator)
                } else {
                    element.clone()
                }
            });
            let elements: Vec<Element> = selector
                .elements
                .iter()
                .take(start)
                .cloned()
                .chain(inserted)
                .chain(
                    selector
                        .elements
                        .iter()
                        .skip(start.saturating_add(find.len()))
                        .cloned(),
                )
                .collect();
            let mut extended = path.to_vec();
            if let Some(slot) = extended.get_mut(position) {
                *slot = selector.create_derived(elements, Some(Vec::new()), None);
            }
            derived.push(extended);
        }
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(parts: &[(Combinator, &str)]) -> Selector {
        Selector::new(
            parts
                .iter()
                .map(|&(combinator, text)| Element::new(combinator, text)),
        )
    }

    #[test]
    fn every_occurrence_gets_its_own_path() {
        let path = vec![selector(&[
            (Combinator::None, ".b"),
            (Combinator::Descendant, ".b"),
        ])];
        let target = selector(&[(Combinator::None, ".b")]);
        let extender = vec![selector(&[(Combinator::None, ".a")])];
        let rendered: Vec<String> = replace_matches(&path, &target, &extender)
            .iter()
            .map(|path| path_css(path))
            .collect();
        assert_eq!(rendered, vec![".a .b", ".b .a"]);
    }

    #[test]
    fn target_combinators_must_line_up() {
        let path = vec![selector(&[
            (Combinator::None, ".x"),
            (Combinator::Child, ".y"),
        ])];
        let child = selector(&[(Combinator::None, ".x"), (Combinator::Child, ".y")]);
        let descendant = selector(&[(Combinator::None, ".x"), (Combinator::Descendant, ".y")]);
        let extender = vec![selector(&[(Combinator::None, ".z")])];
        assert_eq!(replace_matches(&path, &child, &extender).len(), 1);
        assert!(replace_matches(&path, &descendant, &extender).is_empty());
    }

    #[test]
    fn nested_extenders_are_flattened() {
        let extender = vec![
            selector(&[(Combinator::None, ".p")]),
            selector(&[(Combinator::None, ".q")]),
        ];
        let path = vec![selector(&[
            (Combinator::None, ".b"),
            (Combinator::None, ":hover"),
        ])];
        let target = selector(&[(Combinator::None, ".b")]);
        let derived = replace_matches(&path, &target, &extender);
        let rendered: Vec<String> = derived.iter().map(|path| path_css(path)).collect();
        assert_eq!(rendered, vec![".p .q:hover"]);
    }

    #[test]
    fn circular_chains_stop() {
        let a = vec![selector(&[(Combinator::None, ".a")])];
        let b = vec![selector(&[(Combinator::None, ".b")])];
        let target = |text: &str| selector(&[(Combinator::None, text)]);
        let process = ProcessExtends {
            entries: vec![
                ExtendEntry {
                    key: ".b".to_owned(),
                    target: target(".b"),
                    all: false,
                    extender: a,
                },
                ExtendEntry {
                    key: ".a".to_owned(),
                    target: target(".a"),
                    all: true,
                    extender: vec![selector(&[
                        (Combinator::None, ".a"),
                        (Combinator::Descendant, ".a"),
                    ])],
                },
            ],
        };
        let rendered: Vec<String> = process
            .extended_paths(&[b])
            .iter()
            .map(|path| path_css(path))
            .collect();
        assert_eq!(rendered, vec![".a", ".a .a"]);
    }
}
