//! Splicing of pre-loaded imports into the importing rule list.

use crate::context::{EvalContext, Frame};
use crate::ruleset::splice_rules;
use crate::value::eval_value;
use core::cell::RefCell;
use less_tree::{
    Anonymous, Import, ImportedContent, LessError, NestableAtRule, Node, Ruleset, Value,
};
use log::debug;
use std::rc::Rc;

/// Replace every import in the frame with what it brings in.
pub(crate) fn splice_imports(context: &mut EvalContext, frame: &Frame) -> Result<(), LessError> {
    let mut index = 0;
    loop {
        let import = match frame.borrow().rules().get(index) {
            None => break,
            Some(Node::Import(import)) => import.clone(),
            Some(_) => {
                index += 1;
                continue;
            }
        };
        let info = import.info.clone();
        let output = eval_import(context, import).map_err(|error| error.at(&info))?;
        index += splice_rules(frame, index, output);
    }
    Ok(())
}

/// The rules an import contributes.
///
/// Reference imports and imports inside referenced content hide what they bring in.
fn eval_import(context: &mut EvalContext, import: Import) -> Result<Vec<Node>, LessError> {
    let blocked = import.options.reference || import.info.blocks_visibility();
    let mut output = if import.skip {
        debug!("skipping an import that was already included");
        Vec::new()
    } else if import.options.inline {
        eval_inline_import(import)
    } else if import.css {
        vec![Node::Import(eval_css_import(context, import)?)]
    } else {
        eval_less_import(context, import)?
    };
    if blocked {
        for node in &mut output {
            node.info_mut().add_visibility_block();
        }
    }
    Ok(output)
}

/// Inline imports put the loaded text in the output unchanged.
fn eval_inline_import(import: Import) -> Vec<Node> {
    let Some(ImportedContent::Inline(text)) = import.root else {
        debug!("inline import without loaded text contributes nothing");
        return Vec::new();
    };
    let contents = Node::Anonymous(Anonymous {
        text,
        info: import.info,
    });
    wrap_in_media(import.features, vec![contents])
}

fn eval_less_import(context: &mut EvalContext, import: Import) -> Result<Vec<Node>, LessError> {
    let Some(ImportedContent::Stylesheet(stylesheet)) = import.root else {
        debug!("import without a loaded stylesheet contributes nothing");
        return Ok(Vec::new());
    };
    debug!("splicing {} imported rules", stylesheet.rules().len());
    let imported = Rc::new(RefCell::new(Ruleset::new(
        Vec::new(),
        stylesheet.rules().to_vec(),
    )));
    splice_imports(context, &imported)?;
    let rules = imported.borrow_mut().take_rules();
    Ok(wrap_in_media(import.features, rules))
}

fn eval_css_import(context: &mut EvalContext, mut import: Import) -> Result<Import, LessError> {
    import.path = eval_value(context, &import.path)?;
    if let Some(features) = &import.features {
        import.features = Some(eval_value(context, features)?);
    }
    Ok(import)
}

/// Media-qualified imports put their rules in a `@media` block.
fn wrap_in_media(features: Option<Value>, rules: Vec<Node>) -> Vec<Node> {
    let Some(features) = features else {
        return rules;
    };
    vec![Node::NestableAtRule(NestableAtRule::media(features, rules))]
}
