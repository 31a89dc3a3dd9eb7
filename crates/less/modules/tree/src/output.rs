//! CSS text generation.
//!
//! Every node kind writes itself into a [`CssOutput`] sink. Formatting state that flows
//! between nodes (indentation, whether a selector starts a path, whether a declaration
//! is the last one of its block) lives in [`CssContext`].

use crate::{
    Anonymous, AtRule, Call, Combinator, Comment, CompileOptions, Declaration, DebugInfo,
    DumpLineNumbers, Element, ElementValue, FileInfo, Import, NestableAtRule, Node, Ruleset,
    Selector, Value,
};

/// Destination of generated CSS fragments.
pub trait CssOutput {
    /// Append a fragment. `file` and `index` attribute it to its source when known.
    fn add(&mut self, chunk: &str, file: Option<&FileInfo>, index: Option<usize>);

    fn is_empty(&self) -> bool;
}

/// In-memory sink collecting the fragments into one string.
#[derive(Debug, Default)]
pub struct StringOutput {
    buffer: String,
}

impl StringOutput {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl CssOutput for StringOutput {
    #[inline]
    fn add(&mut self, chunk: &str, _file: Option<&FileInfo>, _index: Option<usize>) {
        self.buffer.push_str(chunk);
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Formatting state threaded through generation.
#[derive(Clone, Debug, Default)]
pub struct CssContext {
    pub compress: bool,
    pub dump_line_numbers: DumpLineNumbers,
    pub tab_level: usize,
    pub first_selector: bool,
    pub last_rule: bool,
}

impl CssContext {
    pub fn new(options: &CompileOptions) -> Self {
        Self {
            compress: options.compress,
            dump_line_numbers: options.dump_line_numbers,
            ..Self::default()
        }
    }

    fn indent(&self, level: usize) -> String {
        if self.compress {
            String::new()
        } else {
            "  ".repeat(level)
        }
    }
}

/// Types that render as CSS.
pub trait GenCss {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput);

    /// Render into a fresh string.
    fn to_css(&self, context: &mut CssContext) -> String {
        let mut output = StringOutput::default();
        self.gen_css(context, &mut output);
        output.into_string()
    }
}

/// Source banner for rulesets and comments, or `None` when banners are off.
///
/// In `all` mode the comment and the media query form are separated by `separator`.
pub fn debug_info_banner(
    context: &CssContext,
    debug_info: Option<&DebugInfo>,
    separator: &str,
) -> Option<String> {
    let debug_info = debug_info?;
    if context.compress {
        return None;
    }
    match context.dump_line_numbers {
        DumpLineNumbers::Off => None,
        DumpLineNumbers::Comments => Some(banner_comment(debug_info)),
        DumpLineNumbers::Mediaquery => Some(banner_media_query(debug_info)),
        DumpLineNumbers::All => Some(format!(
            "{}{separator}{}",
            banner_comment(debug_info),
            banner_media_query(debug_info)
        )),
    }
}

fn banner_comment(debug_info: &DebugInfo) -> String {
    format!("/* line {}, {} */\n", debug_info.line, debug_info.file_name)
}

fn banner_media_query(debug_info: &DebugInfo) -> String {
    let file_name = &debug_info.file_name;
    let has_scheme = file_name
        .split_once("://")
        .is_some_and(|(scheme, _)| {
            !scheme.is_empty() && scheme.bytes().all(|byte| byte.is_ascii_alphabetic())
        });
    let with_scheme = if has_scheme {
        file_name.clone()
    } else {
        format!("file://{file_name}")
    };
    let mut escaped = String::with_capacity(with_scheme.len());
    for character in with_scheme.chars() {
        match character {
            '\\' => escaped.push_str("\\/"),
            '.' | ':' | '/' => {
                escaped.push('\\');
                escaped.push(character);
            }
            other => escaped.push(other),
        }
    }
    format!(
        "@media -sass-debug-info{{filename{{font-family:{escaped}}}line{{font-family:\\00003{}}}}}\n",
        debug_info.line
    )
}

const LENGTH_UNITS: [&str; 14] = [
    "px", "em", "ex", "ch", "rem", "in", "cm", "mm", "pc", "pt", "vw", "vh", "vmin", "vmax",
];

/// Format a number the way the output expects: eight decimals at most, no `-0`.
fn format_number(value: f64) -> String {
    let rounded = ((value + 2e-16) * 1e8).round() / 1e8;
    if rounded == 0.0 {
        return "0".to_owned();
    }
    format!("{rounded}")
}

fn gen_dimension(value: f64, unit: &str, context: &CssContext, output: &mut dyn CssOutput) {
    let mut text = format_number(value);
    if context.compress {
        let is_length = LENGTH_UNITS
            .iter()
            .any(|length| length.eq_ignore_ascii_case(unit));
        if text == "0" && is_length {
            output.add(&text, None, None);
            return;
        }
        if let Some(fraction) = text.strip_prefix("0.") {
            text = format!(".{fraction}");
        }
    }
    output.add(&text, None, None);
    output.add(unit, None, None);
}

fn gen_separated(
    items: &[Value],
    separator: &str,
    context: &mut CssContext,
    output: &mut dyn CssOutput,
) {
    for (position, item) in items.iter().enumerate() {
        if position > 0 {
            output.add(separator, None, None);
        }
        item.gen_css(context, output);
    }
}

impl GenCss for Value {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        match self {
            Self::Keyword(text)
            | Self::Anonymous(text)
            | Self::Variable(text)
            | Self::Property(text) => {
                output.add(text, None, None);
            }
            Self::Dimension { value, unit } => gen_dimension(*value, unit, context, output),
            Self::Quoted {
                quote,
                content,
                escaped,
            } => {
                if *escaped {
                    output.add(content, None, None);
                } else {
                    output.add(&format!("{quote}{content}{quote}"), None, None);
                }
            }
            Self::Operation {
                operator,
                operands,
                is_spaced,
            } => {
                let spacing = if *is_spaced { " " } else { "" };
                operands.0.gen_css(context, output);
                output.add(&format!("{spacing}{}{spacing}", operator.as_str()), None, None);
                operands.1.gen_css(context, output);
            }
            Self::Negative(inner) => {
                output.add("-", None, None);
                inner.gen_css(context, output);
            }
            Self::Paren(inner) => {
                output.add("(", None, None);
                inner.gen_css(context, output);
                output.add(")", None, None);
            }
            Self::Expression(items) => gen_separated(items, " ", context, output),
            Self::List(items) => {
                let separator = if context.compress { "," } else { ", " };
                gen_separated(items, separator, context, output);
            }
            Self::Call(call) => call.gen_css(context, output),
            Self::DetachedRuleset(_) => {}
        }
    }
}

impl GenCss for Call {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        output.add(&self.name, self.info.file_info().as_deref(), self.info.index());
        output.add("(", None, None);
        let separator = if context.compress { "," } else { ", " };
        gen_separated(&self.args, separator, context, output);
        output.add(")", None, None);
    }
}

impl GenCss for Combinator {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        let value = self.as_str();
        if context.compress || self.is_unspaced() {
            output.add(value, None, None);
        } else {
            output.add(&format!(" {value} "), None, None);
        }
    }
}

impl GenCss for Element {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        let value = match &self.value {
            ElementValue::Text(text) | ElementValue::Interpolation(text) => text.clone(),
            ElementValue::Paren(selector) => {
                let first_selector = context.first_selector;
                context.first_selector = true;
                let nested = selector.to_css(context);
                context.first_selector = first_selector;
                format!("({nested})")
            }
        };
        if value.is_empty() && self.combinator == Combinator::None {
            return;
        }
        self.combinator.gen_css(context, output);
        output.add(&value, self.info.file_info().as_deref(), self.info.index());
    }
}

impl GenCss for Selector {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        let glued = self
            .elements
            .first()
            .is_some_and(|element| element.combinator == Combinator::None);
        if !context.first_selector && glued {
            output.add(" ", self.info.file_info().as_deref(), self.info.index());
        }
        for element in &self.elements {
            element.gen_css(context, output);
        }
    }
}

impl GenCss for Declaration {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        let colon = if context.compress { ":" } else { ": " };
        output.add(
            &format!("{}{colon}", self.name),
            self.info.file_info().as_deref(),
            self.info.index(),
        );
        self.value.gen_css(context, output);
        let important = if self.important { " !important" } else { "" };
        let terminator = if self.inline || (context.last_rule && context.compress) {
            ""
        } else {
            ";"
        };
        output.add(&format!("{important}{terminator}"), None, None);
    }
}

impl GenCss for Comment {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        if let Some(banner) = debug_info_banner(context, self.debug_info.as_ref(), "") {
            output.add(&banner, None, None);
        }
        output.add(&self.value, self.info.file_info().as_deref(), self.info.index());
    }
}

impl GenCss for Import {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        let file = self.info.file_info();
        if !self.css || file.as_ref().is_some_and(|file| file.reference) {
            return;
        }
        output.add("@import ", file.as_deref(), self.info.index());
        self.path.gen_css(context, output);
        if let Some(features) = &self.features {
            output.add(" ", None, None);
            features.gen_css(context, output);
        }
        output.add(";", None, None);
    }
}

impl GenCss for Anonymous {
    fn gen_css(&self, _context: &mut CssContext, output: &mut dyn CssOutput) {
        output.add(&self.text, self.info.file_info().as_deref(), self.info.index());
    }
}

/// Write an at-rule body: braces, one rule per line, indented one level deeper.
fn output_ruleset(rules: &[Node], context: &mut CssContext, output: &mut dyn CssOutput) {
    context.tab_level = context.tab_level.saturating_add(1);
    if context.compress {
        output.add("{", None, None);
        for rule in rules {
            rule.gen_css(context, output);
        }
        output.add("}", None, None);
    } else {
        let tab_set = format!("\n{}", context.indent(context.tab_level.saturating_sub(1)));
        let tab_rule = format!("{tab_set}  ");
        if let Some((first, rest)) = rules.split_first() {
            output.add(&format!(" {{{tab_rule}"), None, None);
            first.gen_css(context, output);
            for rule in rest {
                output.add(&tab_rule, None, None);
                rule.gen_css(context, output);
            }
            output.add(&format!("{tab_set}}}"), None, None);
        } else {
            output.add(&format!(" {{{tab_set}}}"), None, None);
        }
    }
    context.tab_level = context.tab_level.saturating_sub(1);
}

impl GenCss for AtRule {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        output.add(&self.name, self.info.file_info().as_deref(), self.info.index());
        if let Some(value) = &self.value {
            output.add(" ", None, None);
            value.gen_css(context, output);
        }
        match &self.rules {
            Some(rules) => output_ruleset(rules, context, output),
            None => output.add(";", None, None),
        }
    }
}

impl GenCss for NestableAtRule {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        output.add(
            self.kind.keyword(),
            self.info.file_info().as_deref(),
            self.info.index(),
        );
        self.features.gen_css(context, output);
        output_ruleset(&self.rules, context, output);
    }
}

impl Ruleset {
    /// Charset rules first, then imports (after any leading comments), then the rest.
    fn ordered_rules(&self) -> Vec<&Node> {
        let mut ordered: Vec<&Node> = Vec::with_capacity(self.rules().len());
        let mut charset_index = 0usize;
        let mut import_index = 0usize;
        for (position, rule) in self.rules().iter().enumerate() {
            match rule {
                Node::Comment(_) => {
                    if import_index == position {
                        import_index = import_index.saturating_add(1);
                    }
                    ordered.push(rule);
                }
                Node::AtRule(at_rule) if at_rule.is_charset() => {
                    ordered.insert(charset_index.min(ordered.len()), rule);
                    charset_index = charset_index.saturating_add(1);
                    import_index = import_index.saturating_add(1);
                }
                Node::Import(_) => {
                    ordered.insert(import_index.min(ordered.len()), rule);
                    import_index = import_index.saturating_add(1);
                }
                _ => ordered.push(rule),
            }
        }
        ordered
    }

    fn gen_paths(&self, tab_set: &str, context: &mut CssContext, output: &mut dyn CssOutput) {
        let separator = if context.compress {
            ",".to_owned()
        } else {
            format!(",\n{tab_set}")
        };
        for (position, path) in self.paths.iter().enumerate() {
            let Some((first, rest)) = path.split_first() else {
                continue;
            };
            if position > 0 {
                output.add(&separator, None, None);
            }
            context.first_selector = true;
            first.gen_css(context, output);
            context.first_selector = false;
            for selector in rest {
                selector.gen_css(context, output);
            }
        }
    }
}

impl GenCss for Ruleset {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        if !self.root {
            context.tab_level = context.tab_level.saturating_add(1);
        }
        let tab_rule = context.indent(context.tab_level);
        let tab_set = context.indent(context.tab_level.saturating_sub(1));

        if !self.root {
            if let Some(banner) = debug_info_banner(context, self.debug_info.as_ref(), &tab_set) {
                output.add(&banner, None, None);
                output.add(&tab_set, None, None);
            }
            self.gen_paths(&tab_set, context, output);
            let open = if context.compress { "{" } else { " {\n" };
            output.add(&format!("{open}{tab_rule}"), None, None);
        }

        let ordered = self.ordered_rules();
        let count = ordered.len();
        for (position, rule) in ordered.into_iter().enumerate() {
            let is_last = position.saturating_add(1) == count;
            context.last_rule = is_last && !rule.is_ruleset_like();
            rule.gen_css(context, output);
            context.last_rule = false;
            if !is_last && !context.compress && rule.info().is_visible() == Some(true) {
                output.add(&format!("\n{tab_rule}"), None, None);
            }
        }

        if !self.root {
            let close = if context.compress {
                "}".to_owned()
            } else {
                format!("\n{tab_set}}}")
            };
            output.add(&close, None, None);
            context.tab_level = context.tab_level.saturating_sub(1);
        }

        if self.first_root && !context.compress && !output.is_empty() {
            output.add("\n", None, None);
        }
    }
}

impl GenCss for Node {
    fn gen_css(&self, context: &mut CssContext, output: &mut dyn CssOutput) {
        match self {
            Self::Ruleset(ruleset) => ruleset.gen_css(context, output),
            Self::Declaration(declaration) => declaration.gen_css(context, output),
            Self::AtRule(at_rule) => at_rule.gen_css(context, output),
            Self::NestableAtRule(at_rule) => at_rule.gen_css(context, output),
            Self::Comment(comment) => comment.gen_css(context, output),
            Self::Import(import) => import.gen_css(context, output),
            Self::Call(call) => call.gen_css(context, output),
            Self::Anonymous(anonymous) => anonymous.gen_css(context, output),
            Self::MixinCall(_)
            | Self::MixinDefinition(_)
            | Self::VariableCall(_)
            | Self::Extend(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> Selector {
        Selector::new([Element::new(Combinator::None, name)])
    }

    fn visible(mut node: Node) -> Node {
        node.info_mut().ensure_visibility();
        node
    }

    #[test]
    fn numbers_round_and_compress() {
        let mut plain = CssContext::default();
        let mut compressed = CssContext {
            compress: true,
            ..CssContext::default()
        };
        assert_eq!(Value::dimension(0.5, "em").to_css(&mut plain), "0.5em");
        assert_eq!(Value::dimension(0.5, "em").to_css(&mut compressed), ".5em");
        assert_eq!(Value::dimension(0.0, "px").to_css(&mut compressed), "0");
        assert_eq!(Value::dimension(0.0, "%").to_css(&mut compressed), "0%");
        assert_eq!(Value::number(1.0 / 3.0).to_css(&mut plain), "0.33333333");
        assert_eq!(Value::number(-0.0).to_css(&mut plain), "0");
    }

    #[test]
    fn combinators_space_unless_compressed() {
        let selector = Selector::new([
            Element::new(Combinator::None, ".a"),
            Element::new(Combinator::Child, ".b"),
            Element::new(Combinator::Descendant, ".c"),
        ]);
        let mut plain = CssContext {
            first_selector: true,
            ..CssContext::default()
        };
        assert_eq!(selector.to_css(&mut plain), ".a > .b .c");
        let mut compressed = CssContext {
            compress: true,
            first_selector: true,
            ..CssContext::default()
        };
        assert_eq!(selector.to_css(&mut compressed), ".a>.b .c");
    }

    #[test]
    fn nested_paths_render_with_indentation() {
        let mut inner = Ruleset::new(
            vec![class(".b")],
            vec![visible(Node::Declaration(Declaration::new(
                "color",
                Value::keyword("red"),
            )))],
        );
        inner.paths = vec![vec![class(".a"), class(".b")]];
        let other = {
            let mut other = Ruleset::new(
                vec![class(".c")],
                vec![
                    visible(Node::Declaration(Declaration::new("top", Value::number(0.0)))),
                    visible(Node::Declaration(Declaration::new("left", Value::number(0.0)))),
                ],
            );
            other.paths = vec![vec![class(".c")], vec![class(".d")]];
            other
        };
        let root = Ruleset::stylesheet(vec![
            visible(Node::Ruleset(inner)),
            visible(Node::Ruleset(other)),
        ]);
        let mut context = CssContext::default();
        assert_eq!(
            root.to_css(&mut context),
            ".a .b {\n  color: red;\n}\n.c,\n.d {\n  top: 0;\n  left: 0;\n}\n"
        );
    }

    #[test]
    fn compressed_block_drops_last_semicolon() {
        let mut ruleset = Ruleset::new(
            vec![class(".a")],
            vec![
                visible(Node::Declaration(Declaration::new("color", Value::keyword("red")))),
                visible(Node::Declaration(Declaration::new(
                    "margin",
                    Value::dimension(0.0, "px"),
                ))),
            ],
        );
        ruleset.paths = vec![vec![class(".a")]];
        let root = Ruleset::stylesheet(vec![visible(Node::Ruleset(ruleset))]);
        let mut context = CssContext {
            compress: true,
            ..CssContext::default()
        };
        assert_eq!(root.to_css(&mut context), ".a{color:red;margin:0}");
    }

    #[test]
    fn media_body_is_indented() {
        let mut body = Ruleset::new(
            vec![class(".x")],
            vec![visible(Node::Declaration(Declaration::new(
                "color",
                Value::keyword("red"),
            )))],
        );
        body.paths = vec![vec![class(".x")]];
        let mut media = NestableAtRule::media(Value::anonymous("screen"), Vec::new());
        let mut media_body = Ruleset::new(Vec::new(), vec![visible(Node::Ruleset(body))]);
        media_body.root = true;
        media.rules = vec![Node::Ruleset(media_body)];
        let root = Ruleset::stylesheet(vec![visible(Node::NestableAtRule(media))]);
        let mut context = CssContext::default();
        assert_eq!(
            root.to_css(&mut context),
            "@media screen {\n  .x {\n    color: red;\n  }\n}\n"
        );
    }

    #[test]
    fn banners() {
        let debug_info = DebugInfo {
            line: 7,
            file_name: "/src/a.less".to_owned(),
        };
        let mut context = CssContext {
            dump_line_numbers: DumpLineNumbers::All,
            ..CssContext::default()
        };
        assert_eq!(
            debug_info_banner(&context, Some(&debug_info), "").as_deref(),
            Some(
                "/* line 7, /src/a.less */\n@media -sass-debug-info{filename{font-family:file\\:\\/\\/\\/src\\/a\\.less}line{font-family:\\000037}}\n"
            )
        );
        context.compress = true;
        assert!(debug_info_banner(&context, Some(&debug_info), "").is_none());
    }
}
