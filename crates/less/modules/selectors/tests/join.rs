#![cfg(test)]

use less_selectors::{SelectorParseError, join_selectors, parse_selectors};
use less_tree::{CssContext, GenCss as _, Path};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn render(paths: &[Path]) -> Vec<String> {
    let mut context = CssContext::default();
    paths
        .iter()
        .map(|path| {
            path.iter()
                .enumerate()
                .map(|(position, selector)| {
                    context.first_selector = position == 0;
                    selector.to_css(&mut context)
                })
                .collect::<String>()
        })
        .collect()
}

/// Join `nested` under every path produced by `outer`.
fn join(outer: &str, nested: &str) -> Result<Vec<String>, SelectorParseError> {
    let mut context = Vec::new();
    join_selectors(&mut context, &[], &parse_selectors(outer)?);
    let mut paths = Vec::new();
    join_selectors(&mut paths, &context, &parse_selectors(nested)?);
    Ok(render(&paths))
}

#[test]
fn descendant_without_parent_reference() -> Result<(), SelectorParseError> {
    init();
    assert_eq!(join(".a", ".b")?, vec![".a .b"]);
    assert_eq!(join(".a", "> .b")?, vec![".a > .b"]);
    Ok(())
}

#[test]
fn cross_product_of_lists() -> Result<(), SelectorParseError> {
    init();
    let joined = join(".a, .b", ".x, .y, .z")?;
    assert_eq!(joined.len(), 6);
    assert_eq!(
        joined,
        vec![".a .x", ".b .x", ".a .y", ".b .y", ".a .z", ".b .z"]
    );
    Ok(())
}

#[test]
fn parent_reference_suffixes() -> Result<(), SelectorParseError> {
    init();
    assert_eq!(join(".btn", "&:hover")?, vec![".btn:hover"]);
    assert_eq!(join(".btn", "&-primary")?, vec![".btn-primary"]);
    assert_eq!(join(".a", "& + &")?, vec![".a + .a"]);
    Ok(())
}

#[test]
fn parent_reference_after_elements() -> Result<(), SelectorParseError> {
    init();
    assert_eq!(join(".a", ".b &")?, vec![".b .a"]);
    assert_eq!(join(".a .c", ".b &")?, vec![".b .a .c"]);
    Ok(())
}

#[test]
fn repeated_parent_multiplies() -> Result<(), SelectorParseError> {
    init();
    let joined = join(".a, .b", "& &")?;
    assert_eq!(joined, vec![".a .a", ".a .b", ".b .a", ".b .b"]);
    Ok(())
}

#[test]
fn parent_inside_pseudo_argument() -> Result<(), SelectorParseError> {
    init();
    assert_eq!(join(".a .b", ".c:not(&)")?, vec![".c:not(.a .b)"]);
    Ok(())
}

#[test]
fn empty_context_keeps_selector() -> Result<(), SelectorParseError> {
    init();
    let mut paths = Vec::new();
    join_selectors(&mut paths, &[], &parse_selectors("&:hover, .a")?);
    assert_eq!(render(&paths), vec!["&:hover", ".a"]);
    Ok(())
}
