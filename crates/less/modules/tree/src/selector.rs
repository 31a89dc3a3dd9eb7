use crate::{Combinator, Condition, Element, ElementValue, Extend, NodeInfo};
use smallvec::SmallVec;

/// A comma-free selector: an ordered run of elements.
#[derive(Clone, Debug)]
pub struct Selector {
    pub elements: SmallVec<Element, 4>,
    pub extend_list: Vec<Extend>,
    /// Guard attached with `when`, as in `.a when (@mode = dark)`.
    pub condition: Option<Condition>,
    /// Result of the guard. True when there is no guard.
    pub evald_condition: bool,
    /// Marks the synthetic `&` selector that wraps at-rule bodies.
    pub media_empty: bool,
    pub info: NodeInfo,
}

impl Selector {
    pub fn new(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
            extend_list: Vec::new(),
            condition: None,
            evald_condition: true,
            media_empty: false,
            info: NodeInfo::default(),
        }
    }

    /// Selector built from an optional element list. An absent list means `&`.
    pub fn from_elements(elements: Option<Vec<Element>>) -> Self {
        elements.map_or_else(Self::parent, Self::new)
    }

    /// The lone parent reference `&`.
    pub fn parent() -> Self {
        Self::new([Element::parent_ref(Combinator::None)])
    }

    /// Attach a guard. The selector is not output until the guard is evaluated to true.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self.evald_condition = false;
        self
    }

    /// A selector sharing this one's origin and flags but holding other elements.
    ///
    /// The extend list and the evaluated-condition flag are inherited unless given.
    #[must_use]
    pub fn create_derived(
        &self,
        elements: impl IntoIterator<Item = Element>,
        extend_list: Option<Vec<Extend>>,
        evald_condition: Option<bool>,
    ) -> Self {
        let mut derived = Self::new(elements);
        derived.extend_list = extend_list.unwrap_or_else(|| self.extend_list.clone());
        derived.evald_condition = evald_condition.unwrap_or(self.evald_condition);
        derived.media_empty = self.media_empty;
        derived.info = self.info.clone();
        derived
    }

    /// The `[&]` selector list used for at-rule bodies.
    pub fn empty_selectors() -> Vec<Self> {
        let mut selector = Self::parent();
        selector.media_empty = true;
        vec![selector]
    }

    /// Same as [`Self::empty_selectors`] but attributed to this selector's origin.
    pub fn create_empty_selectors(&self) -> Vec<Self> {
        let mut selectors = Self::empty_selectors();
        for selector in &mut selectors {
            selector.info = self.info.clone();
        }
        selectors
    }

    /// True for a bare `&` written by the user.
    pub fn is_just_parent_selector(&self) -> bool {
        !self.media_empty
            && self.elements.len() == 1
            && self
                .elements
                .first()
                .is_some_and(|element| {
                    element.is_parent_ref() && element.combinator.is_empty_or_whitespace()
                })
    }

    #[inline]
    pub const fn is_output(&self) -> bool {
        self.evald_condition
    }

    /// True when any element still needs interpolation or came from one.
    pub fn has_variable(&self) -> bool {
        self.elements.iter().any(|element| element.is_variable)
    }

    /// True when any element, including nested parenthesised selectors, is `&`.
    pub fn has_parent_ref(&self) -> bool {
        self.elements.iter().any(|element| match &element.value {
            ElementValue::Paren(nested) => nested.has_parent_ref(),
            ElementValue::Text(_) | ElementValue::Interpolation(_) => element.is_parent_ref(),
        })
    }

    /// Flattened signature used to match mixin calls against definitions.
    ///
    /// Tokens follow `[,&#*.\w-]([\w-]|\\.)*` over the concatenated combinators and
    /// values. A leading `&` is dropped.
    pub fn mixin_elements(&self) -> Vec<String> {
        let mut joined = String::new();
        for element in &self.elements {
            joined.push_str(element.combinator.as_str());
            match &element.value {
                ElementValue::Text(text) | ElementValue::Interpolation(text) => {
                    joined.push_str(text);
                }
                ElementValue::Paren(nested) => {
                    joined.push('(');
                    for token in nested.mixin_elements() {
                        joined.push_str(&token);
                    }
                    joined.push(')');
                }
            }
        }
        let mut tokens = signature_tokens(&joined);
        if tokens.first().is_some_and(|first| first == "&") {
            tokens.remove(0);
        }
        tokens
    }

    /// Number of leading elements that line up with `other`'s signature, or 0.
    pub fn match_count(&self, other: &Self) -> usize {
        match_elements(&self.elements, &other.mixin_elements())
    }
}

/// Match a run of call elements against a definition signature.
pub(crate) fn match_elements(elements: &[Element], signature: &[String]) -> usize {
    if signature.is_empty() || elements.len() < signature.len() {
        return 0;
    }
    let aligned = elements
        .iter()
        .zip(signature)
        .all(|(element, token)| element.value.text() == Some(token.as_str()));
    if aligned { signature.len() } else { 0 }
}

const fn is_word(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

fn signature_tokens(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut index = 0usize;
    while let Some(&byte) = bytes.get(index) {
        if !(is_word(byte) || matches!(byte, b',' | b'&' | b'#' | b'*' | b'.')) {
            index = index.saturating_add(1);
            continue;
        }
        let start = index;
        index = index.saturating_add(1);
        loop {
            match bytes.get(index) {
                Some(&next) if is_word(next) => index = index.saturating_add(1),
                Some(b'\\') if bytes.get(index.saturating_add(1)).is_some() => {
                    index = index.saturating_add(2);
                }
                _ => break,
            }
        }
        tokens.push(String::from_utf8_lossy(bytes.get(start..index).unwrap_or(&[])).into_owned());
    }
    tokens
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
    fn signature_splits_compound_and_drops_parent() {
        let call = selector(&[
            (Combinator::None, "&"),
            (Combinator::None, "#ns"),
            (Combinator::Child, ".mixin"),
        ]);
        assert_eq!(call.mixin_elements(), vec!["#ns", ".mixin"]);
    }

    #[test]
    fn signature_keeps_escapes() {
        assert_eq!(signature_tokens(".a\\:b .c"), vec![".a\\:b", ".c"]);
    }

    #[test]
    fn match_counts_prefix() {
        let call = selector(&[(Combinator::None, "#ns"), (Combinator::Child, ".m")]);
        let namespace = selector(&[(Combinator::None, "#ns")]);
        let other = selector(&[(Combinator::None, ".m")]);
        assert_eq!(call.match_count(&namespace), 1);
        assert_eq!(call.match_count(&other), 0);
        assert_eq!(namespace.match_count(&call), 0);
    }

    #[test]
    fn just_parent_selector() {
        assert!(Selector::parent().is_just_parent_selector());
        assert!(Selector::from_elements(None).is_just_parent_selector());
        assert!(
            !Selector::empty_selectors()
                .iter()
                .any(Selector::is_just_parent_selector)
        );
        let hover = selector(&[(Combinator::None, "&"), (Combinator::None, ":hover")]);
        assert!(!hover.is_just_parent_selector());
    }
}
