use crate::context::EvalContext;
use crate::media::{eval_at_rule, eval_nestable};
use crate::ruleset::eval_ruleset;
use crate::selector::eval_selector;
use crate::value::{eval_call, eval_value, render};
use less_tree::{Anonymous, Declaration, LessError, MathMode, Node, Value};

/// Evaluate one member of a rule list.
pub fn eval_node(context: &mut EvalContext, node: Node) -> Result<Node, LessError> {
    let info = node.info().clone();
    dispatch(context, node).map_err(|error| error.at(&info))
}

fn dispatch(context: &mut EvalContext, node: Node) -> Result<Node, LessError> {
    match node {
        Node::Ruleset(ruleset) => eval_ruleset(context, ruleset).map(Node::Ruleset),
        Node::Declaration(declaration) => {
            eval_declaration(context, declaration).map(Node::Declaration)
        }
        Node::AtRule(at_rule) => eval_at_rule(context, at_rule),
        Node::NestableAtRule(nestable) => eval_nestable(context, nestable),
        Node::Import(mut import) => {
            if let Some(features) = &import.features {
                import.features = Some(eval_value(context, features)?);
            }
            import.path = eval_value(context, &import.path)?;
            Ok(Node::Import(import))
        }
        Node::Call(call) => match eval_call(context, &call)? {
            Value::Call(kept) => Ok(Node::Call(kept)),
            other => Ok(Node::Anonymous(Anonymous {
                text: render(&other),
                info: call.info,
            })),
        },
        Node::Extend(mut extend) => {
            extend.selector = eval_selector(context, &extend.selector)?;
            Ok(Node::Extend(extend))
        }
        other @ (Node::Comment(_)
        | Node::MixinCall(_)
        | Node::MixinDefinition(_)
        | Node::VariableCall(_)
        | Node::Anonymous(_)) => Ok(other),
    }
}

/// Evaluate a declaration's value.
///
/// `font` shorthands keep their `/` as written even when math is always on, and a
/// declaration becomes important when an `!important` variable was used in it.
pub fn eval_declaration(
    context: &mut EvalContext,
    declaration: Declaration,
) -> Result<Declaration, LessError> {
    let math = if declaration.name == "font" && context.math() == MathMode::Always {
        MathMode::ParensDivision
    } else {
        context.math()
    };
    let mut math_scope = context.set_math(math);
    let mut scope = math_scope.push_important();
    let value = eval_value(&mut scope, &declaration.value)?;
    if !declaration.variable && matches!(value, Value::DetachedRuleset(_)) {
        return Err(LessError::runtime(
            "Rulesets cannot be evaluated on a property.",
        ));
    }
    let important = declaration.important || scope.is_marked_important();
    Ok(Declaration {
        value,
        important,
        ..declaration
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use less_tree::{CompileOptions, FunctionRegistry, Ruleset};
    use std::rc::Rc;

    #[test]
    fn important_variables_mark_their_users() -> Result<(), LessError> {
        let options = CompileOptions::default();
        let mut context = EvalContext::new(&options, Rc::new(FunctionRegistry::new()));
        let frame = Ruleset::new(
            Vec::new(),
            vec![Node::Declaration(
                Declaration::new("@loud", Value::keyword("red")).important(),
            )],
        );
        let mut scope = context.push_frame(Rc::new(RefCell::new(frame)));
        let declaration = Declaration::new("color", Value::variable("@loud"));
        let evaluated = eval_declaration(&mut scope, declaration)?;
        assert!(evaluated.important);
        Ok(())
    }

    #[test]
    fn detached_rulesets_are_not_property_values() {
        let options = CompileOptions::default();
        let mut context = EvalContext::new(&options, Rc::new(FunctionRegistry::new()));
        let declaration = Declaration::new("color", Value::detached(Ruleset::default()));
        let message = eval_declaration(&mut context, declaration)
            .err()
            .map(|error| error.message);
        assert_eq!(
            message.as_deref(),
            Some("Rulesets cannot be evaluated on a property.")
        );
    }
}
