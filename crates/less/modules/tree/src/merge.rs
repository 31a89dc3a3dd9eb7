use core::mem::take;
use crate::{Merge, Node, Value};
use log::trace;
use std::collections::HashMap;

/// Fold declarations that carry a merge flag into the first declaration of their name.
///
/// `+` starts a new comma separated segment and `+_` extends the current space
/// separated one. The merged declaration keeps the first one's position and is
/// important when any part was.
pub fn merge_rules(rules: &mut Vec<Node>) {
    let mut groups: HashMap<String, usize> = HashMap::new();
    let mut parts: Vec<Vec<(Merge, Value, bool)>> = Vec::new();
    let mut kept = Vec::with_capacity(rules.len());

    for rule in rules.drain(..) {
        let Node::Declaration(declaration) = &rule else {
            kept.push(rule);
            continue;
        };
        if declaration.merge == Merge::None {
            kept.push(rule);
            continue;
        }
        let entry = (
            declaration.merge,
            declaration.value.clone(),
            declaration.important,
        );
        if let Some(&group) = groups.get(&declaration.name) {
            if let Some(group_parts) = parts.get_mut(group) {
                group_parts.push(entry);
            }
            continue;
        }
        groups.insert(declaration.name.clone(), parts.len());
        parts.push(vec![entry]);
        kept.push(rule);
    }

    for rule in &mut kept {
        let Node::Declaration(declaration) = rule else {
            continue;
        };
        if declaration.merge == Merge::None {
            continue;
        }
        let Some(group_parts) = groups
            .get(&declaration.name)
            .and_then(|&group| parts.get_mut(group))
        else {
            continue;
        };
        let mut comma: Vec<Value> = Vec::new();
        let mut space: Vec<Value> = Vec::new();
        for (merge, value, important) in group_parts.drain(..) {
            if merge == Merge::Comma && !space.is_empty() {
                comma.push(Value::Expression(take(&mut space)));
            }
            space.push(value);
            declaration.important |= important;
        }
        comma.push(Value::Expression(space));
        trace!("merged {} into {} segments", declaration.name, comma.len());
        declaration.value = Value::List(comma);
    }

    *rules = kept;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CssContext, Declaration, GenCss as _};

    fn merged(name: &str, value: &str, merge: Merge) -> Node {
        Node::Declaration(Declaration::new(name, Value::keyword(value)).merged(merge))
    }

    #[test]
    fn comma_and_space_segments() {
        let mut rules = vec![
            merged("transform", "scale(2)", Merge::Space),
            Node::Declaration(Declaration::new("color", Value::keyword("red"))),
            merged("transform", "rotate(15deg)", Merge::Space),
            merged("background", "url(1.png)", Merge::Comma),
            merged("background", "url(2.png)", Merge::Comma),
        ];
        merge_rules(&mut rules);
        assert_eq!(rules.len(), 3);
        let mut context = CssContext::default();
        let rendered: Vec<String> = rules
            .iter()
            .map(|rule| rule.to_css(&mut context))
            .collect();
        assert_eq!(rendered[0], "transform: scale(2) rotate(15deg);");
        assert_eq!(rendered[1], "color: red;");
        assert_eq!(rendered[2], "background: url(1.png), url(2.png);");
    }

    #[test]
    fn importance_is_combined() {
        let mut rules = vec![
            merged("a", "1", Merge::Comma),
            Node::Declaration(
                Declaration::new("a", Value::keyword("2"))
                    .merged(Merge::Comma)
                    .important(),
            ),
        ];
        merge_rules(&mut rules);
        assert!(matches!(&rules[..], [Node::Declaration(declaration)] if declaration.important));
    }
}
