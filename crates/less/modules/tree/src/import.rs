use crate::{NodeInfo, Ruleset, Value};

/// Options written in parentheses after `@import`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// `(reference)`: rules are available for mixins but hidden from output.
    pub reference: bool,
    /// `(inline)`: the file is emitted verbatim.
    pub inline: bool,
    /// `(less)` or `(css)`. `None` lets the path extension decide.
    pub less: Option<bool>,
    pub multiple: bool,
    pub optional: bool,
}

/// What the import manager loaded for an import before evaluation.
#[derive(Clone, Debug)]
pub enum ImportedContent {
    /// A parsed Less stylesheet.
    Stylesheet(Box<Ruleset>),
    /// Raw text for inline imports.
    Inline(String),
}

/// `@import (options) "path" features;`
#[derive(Clone, Debug)]
pub struct Import {
    pub path: Value,
    /// Media query list the imported rules are wrapped in.
    pub features: Option<Value>,
    pub options: ImportOptions,
    /// Plain CSS imports are kept in the output as `@import`.
    pub css: bool,
    pub root: Option<ImportedContent>,
    /// Set by the import manager for files imported once already.
    pub skip: bool,
    pub info: NodeInfo,
}

impl Import {
    pub fn new(path: Value, features: Option<Value>, options: ImportOptions) -> Self {
        let css = match options.less {
            Some(less) => !less || options.inline,
            None => options.inline || path_is_css(&path),
        };
        Self {
            path,
            features,
            options,
            css,
            root: None,
            skip: false,
            info: NodeInfo::default(),
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: ImportedContent) -> Self {
        self.root = Some(root);
        self
    }
}

/// Whether the import path names a CSS file, following `[#.&?]css([?;].*)?$`.
fn path_is_css(path: &Value) -> bool {
    let text = match path {
        Value::Quoted { content, .. } => content.as_str(),
        Value::Keyword(text) | Value::Anonymous(text) => text.as_str(),
        Value::Call(call) if call.name == "url" => match call.args.first() {
            Some(Value::Quoted { content, .. }) => content.as_str(),
            Some(Value::Keyword(text) | Value::Anonymous(text)) => text.as_str(),
            _ => return false,
        },
        _ => return false,
    };
    let bytes = text.as_bytes();
    bytes.windows(4).enumerate().any(|(start, window)| {
        let marker = window.first().is_some_and(|byte| b"#.&?".contains(byte));
        if !marker || window.get(1..) != Some(b"css".as_slice()) {
            return false;
        }
        let rest = bytes.get(start.saturating_add(4)..).unwrap_or(&[]);
        rest.first().is_none_or(|next| matches!(next, b'?' | b';'))
    })
}
