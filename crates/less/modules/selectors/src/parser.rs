//! Selector text to [`Selector`] values.
//!
//! Covers what interpolated selectors can produce: type, class, id and placeholder
//! names, `&`, `*`, pseudo classes and elements with their arguments, attribute
//! selectors, keyframe percentages, `@{name}` interpolation and the four combinators.

use crate::SelectorParseError;
use less_tree::{Combinator, Element, ElementValue, Selector};
use log::trace;

/// Internal tokenizer token kinds.
#[derive(Clone, Debug)]
enum Tok {
    /// An explicit combinator.
    Combinator(Combinator),
    /// Whitespace that implies a descendant combinator.
    DescendantWs,
    /// One element value, flagged when it holds an interpolation.
    Element(ElementValue, bool),
}

/// Tokenizer over one comma-free selector.
struct SelectorTokenizer<'src> {
    /// Underlying bytes of the selector.
    input_bytes: &'src [u8],
    /// Offset of `input_bytes` in the full text, for error positions.
    offset: usize,
    /// Current cursor index into `input_bytes`.
    index: usize,
    /// Whether a descendant whitespace token is owed on the next call.
    pending_whitespace: bool,
}

impl<'src> SelectorTokenizer<'src> {
    #[inline]
    const fn new(input_bytes: &'src [u8], offset: usize) -> Self {
        Self {
            input_bytes,
            offset,
            index: 0,
            pending_whitespace: false,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.input_bytes.get(self.index).copied()
    }

    #[inline]
    fn error(&self, message: &str) -> SelectorParseError {
        SelectorParseError::new(message, self.offset.saturating_add(self.index))
    }

    fn text(&self, start: usize) -> String {
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        String::from_utf8_lossy(slice).into_owned()
    }

    /// Return the next token, or `None` at the end of input.
    fn next(&mut self) -> Result<Option<Tok>, SelectorParseError> {
        self.skip_whitespace_descendant();
        let Some(current) = self.peek() else {
            return Ok(None);
        };
        if self.pending_whitespace {
            self.pending_whitespace = false;
            return Ok(Some(Tok::DescendantWs));
        }
        let combinator = match current {
            b'>' => Some(Combinator::Child),
            b'+' => Some(Combinator::Sibling),
            b'~' => Some(Combinator::GeneralSibling),
            b'|' => Some(Combinator::Namespace),
            _ => None,
        };
        if let Some(combinator) = combinator {
            self.index = self.index.saturating_add(1);
            return Ok(Some(Tok::Combinator(combinator)));
        }
        let start = self.index;
        match current {
            b'&' | b'*' => {
                self.index = self.index.saturating_add(1);
                Ok(Some(Tok::Element(ElementValue::Text(self.text(start)), false)))
            }
            b'.' | b'#' | b'%' => {
                self.index = self.index.saturating_add(1);
                self.consume_name(start)
            }
            b':' => self.consume_pseudo(start),
            b'[' => {
                self.consume_group(b'[', b']')?;
                Ok(Some(Tok::Element(ElementValue::Text(self.text(start)), false)))
            }
            b'(' => self.consume_paren_element(start),
            byte if byte.is_ascii_digit() => {
                self.consume_number();
                Ok(Some(Tok::Element(ElementValue::Text(self.text(start)), false)))
            }
            byte if is_name_byte(byte) || byte == b'\\' || byte == b'@' => self.consume_name(start),
            _ => Err(self.error("Unrecognised input in selector")),
        }
    }

    /// Skip whitespace and remember that a descendant combinator may follow.
    #[inline]
    fn skip_whitespace_descendant(&mut self) {
        let mut saw = false;
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            saw = true;
            self.index = self.index.saturating_add(1);
        }
        if saw {
            self.pending_whitespace = true;
        }
    }

    /// Consume name characters, escapes and `@{name}` interpolations.
    ///
    /// Returns whether an interpolation was seen.
    fn consume_ident(&mut self) -> Result<bool, SelectorParseError> {
        let mut interpolated = false;
        loop {
            match self.peek() {
                Some(byte) if is_name_byte(byte) => self.index = self.index.saturating_add(1),
                Some(b'\\') => {
                    self.index = self.index.saturating_add(1);
                    if self.peek().is_none() {
                        return Err(self.error("Unterminated escape in selector"));
                    }
                    self.index = self.index.saturating_add(1);
                }
                Some(b'@') if self.input_bytes.get(self.index.saturating_add(1)) == Some(&b'{') => {
                    self.consume_group(b'{', b'}')
                        .map_err(|_| self.error("Unclosed interpolation in selector"))?;
                    interpolated = true;
                }
                _ => break,
            }
        }
        Ok(interpolated)
    }

    fn consume_name(&mut self, start: usize) -> Result<Option<Tok>, SelectorParseError> {
        let name_start = self.index;
        let interpolated = self.consume_ident()?;
        if self.index == name_start {
            return Err(self.error("Expected a name in selector"));
        }
        let text = self.text(start);
        if interpolated {
            Ok(Some(Tok::Element(ElementValue::Interpolation(text), true)))
        } else {
            Ok(Some(Tok::Element(ElementValue::Text(text), false)))
        }
    }

    /// `:hover`, `::before`, `:nth-child(2n + 1)`, `:not(&.active)`.
    ///
    /// Arguments holding `&` become a separate parenthesised selector element so they
    /// can be joined. Other arguments stay part of the pseudo class text.
    fn consume_pseudo(&mut self, start: usize) -> Result<Option<Tok>, SelectorParseError> {
        while self.peek() == Some(b':') {
            self.index = self.index.saturating_add(1);
        }
        let name_start = self.index;
        let interpolated = self.consume_ident()?;
        if self.index == name_start {
            return Err(self.error("Expected a pseudo class name"));
        }
        if self.peek() == Some(b'(') {
            let group_start = self.index;
            self.consume_group(b'(', b')')?;
            let inner = self
                .input_bytes
                .get(group_start.saturating_add(1)..self.index.saturating_sub(1))
                .unwrap_or(&[]);
            if inner.contains(&b'&') {
                self.index = group_start;
            }
        }
        let text = self.text(start);
        if interpolated {
            Ok(Some(Tok::Element(ElementValue::Interpolation(text), true)))
        } else {
            Ok(Some(Tok::Element(ElementValue::Text(text), false)))
        }
    }

    /// A parenthesised group. Groups holding `&` are parsed as nested selectors.
    fn consume_paren_element(&mut self, start: usize) -> Result<Option<Tok>, SelectorParseError> {
        self.consume_group(b'(', b')')?;
        let inner_start = start.saturating_add(1);
        let inner = self
            .input_bytes
            .get(inner_start..self.index.saturating_sub(1))
            .unwrap_or(&[]);
        if inner.contains(&b'&') {
            let nested = parse_bytes(inner, self.offset.saturating_add(inner_start))?;
            return Ok(Some(Tok::Element(ElementValue::Paren(Box::new(nested)), false)));
        }
        Ok(Some(Tok::Element(ElementValue::Text(self.text(start)), false)))
    }

    /// Consume from an opening byte to its balanced closing byte, skipping quoted text.
    fn consume_group(&mut self, open: u8, close: u8) -> Result<(), SelectorParseError> {
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        while let Some(byte) = self.peek() {
            self.index = self.index.saturating_add(1);
            if let Some(active) = quote {
                if byte == b'\\' {
                    self.index = self.index.saturating_add(1);
                } else if byte == active {
                    quote = None;
                }
                continue;
            }
            match byte {
                b'"' | b'\'' => quote = Some(byte),
                _ if byte == open => depth = depth.saturating_add(1),
                _ if byte == close => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error("Unclosed group in selector"))
    }

    /// Keyframe selectors such as `50%` or `12.5%`.
    fn consume_number(&mut self) {
        while self
            .peek()
            .is_some_and(|byte| byte.is_ascii_digit() || byte == b'.')
        {
            self.index = self.index.saturating_add(1);
        }
        if self.peek() == Some(b'%') {
            self.index = self.index.saturating_add(1);
        }
    }
}

const fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
}

fn parse_bytes(input: &[u8], offset: usize) -> Result<Selector, SelectorParseError> {
    let mut tokens = SelectorTokenizer::new(input, offset);
    let mut elements: Vec<Element> = Vec::new();
    let mut pending: Option<Combinator> = None;
    while let Some(token) = tokens.next()? {
        match token {
            Tok::Combinator(combinator) => {
                if matches!(pending, Some(existing) if existing != Combinator::Descendant) {
                    return Err(tokens.error("Unexpected combinator in selector"));
                }
                pending = Some(combinator);
            }
            Tok::DescendantWs => {
                if pending.is_none() && !elements.is_empty() {
                    pending = Some(Combinator::Descendant);
                }
            }
            Tok::Element(value, is_variable) => {
                let mut element = Element::new(pending.take().unwrap_or_default(), "");
                element.value = value;
                element.is_variable = is_variable;
                elements.push(element);
            }
        }
    }
    if pending.is_some_and(|combinator| combinator != Combinator::Descendant) {
        return Err(tokens.error("Expected an element after the combinator"));
    }
    if elements.is_empty() {
        return Err(SelectorParseError::new("Expected a selector", offset));
    }
    Ok(Selector::new(elements))
}

/// Byte ranges of the comma separated parts of `input`, ignoring commas in groups.
fn split_top_level(input: &[u8]) -> Vec<(usize, usize)> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0usize;
    let mut escaped = false;
    for (index, &byte) in input.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        if byte == b'\\' {
            escaped = true;
            continue;
        }
        if let Some(active) = quote {
            if byte == active {
                quote = None;
            }
            continue;
        }
        match byte {
            b'"' | b'\'' => quote = Some(byte),
            b'(' | b'[' | b'{' => depth = depth.saturating_add(1),
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push((start, index));
                start = index.saturating_add(1);
            }
            _ => {}
        }
    }
    parts.push((start, input.len()));
    parts
}

/// Parse a comma separated selector list.
///
/// # Errors
/// Fails on empty list items, dangling combinators, unclosed groups and
/// characters that cannot start an element.
pub fn parse_selectors(input: &str) -> Result<Vec<Selector>, SelectorParseError> {
    trace!("parsing selectors `{input}`");
    let bytes = input.as_bytes();
    split_top_level(bytes)
        .into_iter()
        .map(|(start, end)| parse_bytes(bytes.get(start..end).unwrap_or(&[]), start))
        .collect()
}

/// Parse a single selector. Commas are not allowed.
///
/// # Errors
/// Same as [`parse_selectors`], and fails when the text holds more than one selector.
pub fn parse_selector(input: &str) -> Result<Selector, SelectorParseError> {
    let mut selectors = parse_selectors(input)?;
    if selectors.len() > 1 {
        let comma = split_top_level(input.as_bytes())
            .first()
            .map_or(0, |&(_, end)| end);
        return Err(SelectorParseError::new("Expected a single selector", comma));
    }
    selectors
        .pop()
        .ok_or_else(|| SelectorParseError::new("Expected a selector", 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(selector: &Selector) -> Vec<(Combinator, String)> {
        selector
            .elements
            .iter()
            .map(|element| {
                let text = match &element.value {
                    ElementValue::Text(text) | ElementValue::Interpolation(text) => text.clone(),
                    ElementValue::Paren(_) => "(..)".to_owned(),
                };
                (element.combinator, text)
            })
            .collect()
    }

    #[test]
    fn splits_compounds_and_combinators() -> Result<(), SelectorParseError> {
        let selector = parse_selector("ul > li.item:first-child  a[href^='x,y']")?;
        assert_eq!(
            shape(&selector),
            vec![
                (Combinator::None, "ul".to_owned()),
                (Combinator::Child, "li".to_owned()),
                (Combinator::None, ".item".to_owned()),
                (Combinator::None, ":first-child".to_owned()),
                (Combinator::Descendant, "a".to_owned()),
                (Combinator::None, "[href^='x,y']".to_owned()),
            ]
        );
        Ok(())
    }

    #[test]
    fn leading_combinator_is_kept() -> Result<(), SelectorParseError> {
        let selector = parse_selector("  + .next")?;
        assert_eq!(shape(&selector), vec![(Combinator::Sibling, ".next".to_owned())]);
        Ok(())
    }

    #[test]
    fn parent_references_and_suffixes() -> Result<(), SelectorParseError> {
        let selector = parse_selector("&-title &:hover")?;
        assert_eq!(
            shape(&selector),
            vec![
                (Combinator::None, "&".to_owned()),
                (Combinator::None, "-title".to_owned()),
                (Combinator::Descendant, "&".to_owned()),
                (Combinator::None, ":hover".to_owned()),
            ]
        );
        Ok(())
    }

    #[test]
    fn pseudo_arguments_with_parent_are_nested() -> Result<(), SelectorParseError> {
        let plain = parse_selector(":nth-child(2n + 1)")?;
        assert_eq!(shape(&plain), vec![(Combinator::None, ":nth-child(2n + 1)".to_owned())]);

        let nested = parse_selector(".a:not(&.b)")?;
        assert_eq!(
            shape(&nested),
            vec![
                (Combinator::None, ".a".to_owned()),
                (Combinator::None, ":not".to_owned()),
                (Combinator::None, "(..)".to_owned()),
            ]
        );
        assert!(nested.has_parent_ref());
        Ok(())
    }

    #[test]
    fn interpolation_marks_variable() -> Result<(), SelectorParseError> {
        let selector = parse_selector(".icon-@{name}")?;
        assert!(selector.has_variable());
        assert!(matches!(
            &selector.elements[0].value,
            ElementValue::Interpolation(raw) if raw == ".icon-@{name}"
        ));
        Ok(())
    }

    #[test]
    fn list_and_keyframes() -> Result<(), SelectorParseError> {
        let selectors = parse_selectors("from, 50%, .a .b")?;
        assert_eq!(selectors.len(), 3);
        assert_eq!(shape(&selectors[1]), vec![(Combinator::None, "50%".to_owned())]);
        Ok(())
    }

    #[test]
    fn errors_carry_positions() {
        let empty = parse_selectors(".a,,.b").err();
        assert_eq!(empty, Some(SelectorParseError::new("Expected a selector", 3)));
        let message = |text: &str| parse_selector(text).err().map(|error| error.message);
        assert_eq!(
            message(".a >"),
            Some("Expected an element after the combinator".to_owned())
        );
        assert_eq!(message(".a[href"), Some("Unclosed group in selector".to_owned()));
        assert_eq!(message(".a {"), Some("Unrecognised input in selector".to_owned()));
        assert_eq!(message(".a, .b"), Some("Expected a single selector".to_owned()));
    }
}
