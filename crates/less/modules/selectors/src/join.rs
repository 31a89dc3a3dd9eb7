use core::mem::take;
use less_tree::{Combinator, Element, ElementValue, Path, Selector};
use log::trace;

/// Join every selector against the enclosing paths, appending the results to `paths`.
pub fn join_selectors(paths: &mut Vec<Path>, context: &[Path], selectors: &[Selector]) {
    for selector in selectors {
        join_selector(paths, context, selector);
    }
}

/// Join one selector against the enclosing paths.
///
/// Without a parent reference the selector is appended to every context path. Each `&`
/// multiplies the output by the number of context paths.
pub fn join_selector(paths: &mut Vec<Path>, context: &[Path], selector: &Selector) {
    if context.is_empty() {
        paths.push(vec![selector.clone()]);
        return;
    }

    let mut replaced = Vec::new();
    if replace_parent_selector(&mut replaced, context, selector) {
        trace!(
            "replaced parent references against {} context paths into {} paths",
            context.len(),
            replaced.len()
        );
        paths.extend(replaced);
        return;
    }

    for context_path in context {
        let mut path: Path = context_path
            .iter()
            .map(|parent| derive_selector(selector, parent))
            .collect();
        path.push(selector.clone());
        paths.push(path);
    }
}

/// Copy of a context selector that carries the joined selector's visibility.
fn derive_selector(visibility_from: &Selector, parent: &Selector) -> Selector {
    let mut derived = parent.create_derived(
        parent.elements.iter().cloned(),
        Some(parent.extend_list.clone()),
        Some(parent.evald_condition),
    );
    derived
        .info
        .copy_visibility_info(visibility_from.info.visibility());
    derived
}

/// Glue loose elements onto the last selector of every partial path.
fn merge_elements_onto_selectors(elements: Vec<Element>, selectors: &mut Vec<Path>) {
    if elements.is_empty() {
        return;
    }
    if selectors.is_empty() {
        selectors.push(vec![Selector::new(elements)]);
        return;
    }
    for path in selectors.iter_mut() {
        if let Some(last) = path.last_mut() {
            let merged = last.create_derived(
                last.elements.iter().chain(elements.iter()).cloned(),
                None,
                None,
            );
            *last = merged;
        } else {
            path.push(Selector::new(elements.iter().cloned()));
        }
    }
}

/// Splice `add_path` (a parent path) into a partial path at a replaced element.
fn add_replacement_into_path(
    beginning: &[Selector],
    add_path: &[Selector],
    replaced: &Element,
    original: &Selector,
) -> Path {
    let mut new_path: Path = beginning.to_vec();
    let mut joined = new_path.pop().map_or_else(
        || original.create_derived(Vec::<Element>::new(), None, None),
        |last| original.create_derived(last.elements, None, None),
    );

    if let Some(parent) = add_path.first()
        && let Some(parent_first) = parent.elements.first()
    {
        let combinator = if replaced.combinator.is_empty_or_whitespace()
            && !parent_first.combinator.is_empty_or_whitespace()
        {
            parent_first.combinator
        } else {
            replaced.combinator
        };
        let mut joined_element = parent_first.with_combinator(combinator);
        joined_element.is_variable = replaced.is_variable;
        joined_element.info = replaced.info.clone();
        joined.elements.push(joined_element);
        joined
            .elements
            .extend(parent.elements.iter().skip(1).cloned());
    }

    if !joined.elements.is_empty() {
        new_path.push(joined);
    }

    for rest in add_path.iter().skip(1) {
        new_path.push(rest.create_derived(rest.elements.iter().cloned(), Some(Vec::new()), None));
    }
    new_path
}

/// Wrap a resolved nested path in a parenthesised element.
///
/// The path is flattened into a single selector. Selectors after the first get a
/// descendant combinator when they start without one.
fn paren_selector(nested_path: Path, original: &Element) -> Selector {
    let mut flat: Vec<Element> = Vec::new();
    for (position, selector) in nested_path.into_iter().enumerate() {
        for (offset, mut element) in selector.elements.into_iter().enumerate() {
            if position > 0 && offset == 0 && element.combinator == Combinator::None {
                element.combinator = Combinator::Descendant;
            }
            flat.push(element);
        }
    }
    let mut paren = Element::paren(Combinator::None, Selector::new(flat));
    paren.is_variable = original.is_variable;
    paren.info = original.info.clone();
    let mut replacement = Selector::new([paren]);
    replacement.info = original.info.clone();
    replacement
}

/// Replace every `&` in `in_selector` with the context paths.
///
/// Returns whether a parent reference was found, including inside nested selectors.
fn replace_parent_selector(paths: &mut Vec<Path>, context: &[Path], in_selector: &Selector) -> bool {
    let mut had_parent = false;
    let mut current: Vec<Element> = Vec::new();
    let mut new_selectors: Vec<Path> = vec![Vec::new()];

    for element in &in_selector.elements {
        if element.is_parent_ref() {
            had_parent = true;
            merge_elements_onto_selectors(take(&mut current), &mut new_selectors);
            let mut multiplied = Vec::with_capacity(new_selectors.len().saturating_mul(context.len()));
            for partial in &new_selectors {
                for parent_path in context {
                    multiplied.push(add_replacement_into_path(
                        partial,
                        parent_path,
                        element,
                        in_selector,
                    ));
                }
            }
            new_selectors = multiplied;
            continue;
        }

        if let ElementValue::Paren(nested) = &element.value {
            merge_elements_onto_selectors(take(&mut current), &mut new_selectors);
            let mut nested_paths = Vec::new();
            had_parent |= replace_parent_selector(&mut nested_paths, context, nested);
            let mut replaced = Vec::new();
            for nested_path in nested_paths {
                let add_path = [paren_selector(nested_path, element)];
                for partial in &new_selectors {
                    replaced.push(add_replacement_into_path(
                        partial,
                        &add_path,
                        element,
                        in_selector,
                    ));
                }
            }
            new_selectors = replaced;
            continue;
        }

        current.push(element.clone());
    }

    // Elements after the last `&` (`.a& .b`).
    merge_elements_onto_selectors(current, &mut new_selectors);

    for mut path in new_selectors {
        if let Some(last) = path.last_mut() {
            let with_extends = last.create_derived(
                last.elements.iter().cloned(),
                Some(in_selector.extend_list.clone()),
                None,
            );
            *last = with_extends;
            paths.push(path);
        }
    }
    had_parent
}
