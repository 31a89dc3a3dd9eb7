//! Shared node bookkeeping: source attribution, parent linkage and visibility.
//!
//! Every tree node embeds a [`NodeInfo`]. Source locations are reference counted so that
//! clones of a node produced during evaluation keep pointing at the same origin, and the
//! parent link is a [`Weak`] reference that never owns anything.

use crate::{
    AtRule, Call, Comment, Declaration, Extend, Import, MixinCall, MixinDefinition,
    NestableAtRule, Ruleset, VariableCall,
};
use core::cell::RefCell;
use std::rc::{Rc, Weak};

/// File attribution carried by nodes that were parsed from a named source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Name of the source file as given to the parser.
    pub filename: String,
    /// True when the file was pulled in through a reference import.
    pub reference: bool,
}

impl FileInfo {
    #[inline]
    pub fn new(filename: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            filename: filename.into(),
            reference: false,
        })
    }
}

/// Where a node came from. Unset fields are resolved through the parent chain.
#[derive(Debug, Default)]
pub struct Location {
    index: Option<usize>,
    file: Option<Rc<FileInfo>>,
    parent: RefCell<Weak<Self>>,
}

impl Location {
    /// Source index of this node, falling back to the nearest ancestor that has one.
    pub fn index(&self) -> Option<usize> {
        self.index
            .or_else(|| self.parent.borrow().upgrade().and_then(|parent| parent.index()))
    }

    /// File attribution of this node, falling back to the nearest ancestor that has one.
    pub fn file(&self) -> Option<Rc<FileInfo>> {
        self.file.as_ref().map_or_else(
            || self.parent.borrow().upgrade().and_then(|parent| parent.file()),
            |file| Some(Rc::clone(file)),
        )
    }
}

/// Visibility state of a node.
///
/// While `blocks` is positive the node is suppressed from output no matter what
/// `visible` says.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    pub blocks: u32,
    pub visible: Option<bool>,
}

/// Per-node bookkeeping embedded in every tree node.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
    location: Rc<Location>,
    visibility: Visibility,
}

impl NodeInfo {
    #[inline]
    pub fn new(index: Option<usize>, file: Option<Rc<FileInfo>>) -> Self {
        Self {
            location: Rc::new(Location {
                index,
                file,
                parent: RefCell::new(Weak::new()),
            }),
            visibility: Visibility::default(),
        }
    }

    /// Info for a node at `index` in `file`.
    #[inline]
    pub fn at(index: usize, file: &Rc<FileInfo>) -> Self {
        Self::new(Some(index), Some(Rc::clone(file)))
    }

    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.location.index()
    }

    #[inline]
    pub fn file_info(&self) -> Option<Rc<FileInfo>> {
        self.location.file()
    }

    #[inline]
    pub fn filename(&self) -> Option<String> {
        self.location.file().map(|file| file.filename.clone())
    }

    /// Link this node to `parent` for index and file inheritance.
    ///
    /// The link is shared by every clone of this node and never keeps the parent alive.
    #[inline]
    pub fn set_parent(&self, parent: &Self) {
        if Rc::ptr_eq(&self.location, &parent.location) {
            return;
        }
        *self.location.parent.borrow_mut() = Rc::downgrade(&parent.location);
    }

    /// True when both infos describe the same source node.
    #[inline]
    pub fn same_origin(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.location, &other.location)
    }

    #[inline]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    pub const fn add_visibility_block(&mut self) {
        self.visibility.blocks = self.visibility.blocks.saturating_add(1);
    }

    #[inline]
    pub const fn remove_visibility_block(&mut self) {
        self.visibility.blocks = self.visibility.blocks.saturating_sub(1);
    }

    #[inline]
    pub const fn ensure_visibility(&mut self) {
        self.visibility.visible = Some(true);
    }

    #[inline]
    pub const fn ensure_invisibility(&mut self) {
        self.visibility.visible = Some(false);
    }

    #[inline]
    pub const fn is_visible(&self) -> Option<bool> {
        self.visibility.visible
    }

    #[inline]
    pub const fn blocks_visibility(&self) -> bool {
        self.visibility.blocks != 0
    }

    /// Overwrite both the block counter and the visible flag.
    #[inline]
    pub const fn copy_visibility_info(&mut self, from: Visibility) {
        self.visibility = from;
    }
}

/// Debug position recorded by the parser when line-number dumping is requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugInfo {
    pub line: usize,
    pub file_name: String,
}

/// Raw text emitted as-is, for example the contents of an inline import.
#[derive(Clone, Debug, Default)]
pub struct Anonymous {
    pub text: String,
    pub info: NodeInfo,
}

impl Anonymous {
    #[inline]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            info: NodeInfo::default(),
        }
    }
}

/// The closed set of rule-level node kinds.
#[derive(Clone, Debug)]
pub enum Node {
    Ruleset(Ruleset),
    Declaration(Declaration),
    AtRule(AtRule),
    NestableAtRule(NestableAtRule),
    Comment(Comment),
    Import(Import),
    MixinCall(MixinCall),
    MixinDefinition(MixinDefinition),
    VariableCall(VariableCall),
    Extend(Extend),
    Call(Call),
    Anonymous(Anonymous),
}

impl Node {
    pub const fn info(&self) -> &NodeInfo {
        match self {
            Self::Ruleset(node) => &node.info,
            Self::Declaration(node) => &node.info,
            Self::AtRule(node) => &node.info,
            Self::NestableAtRule(node) => &node.info,
            Self::Comment(node) => &node.info,
            Self::Import(node) => &node.info,
            Self::MixinCall(node) => &node.info,
            Self::MixinDefinition(node) => &node.info,
            Self::VariableCall(node) => &node.info,
            Self::Extend(node) => &node.info,
            Self::Call(node) => &node.info,
            Self::Anonymous(node) => &node.info,
        }
    }

    pub const fn info_mut(&mut self) -> &mut NodeInfo {
        match self {
            Self::Ruleset(node) => &mut node.info,
            Self::Declaration(node) => &mut node.info,
            Self::AtRule(node) => &mut node.info,
            Self::NestableAtRule(node) => &mut node.info,
            Self::Comment(node) => &mut node.info,
            Self::Import(node) => &mut node.info,
            Self::MixinCall(node) => &mut node.info,
            Self::MixinDefinition(node) => &mut node.info,
            Self::VariableCall(node) => &mut node.info,
            Self::Extend(node) => &mut node.info,
            Self::Call(node) => &mut node.info,
            Self::Anonymous(node) => &mut node.info,
        }
    }

    /// Human readable kind, used in diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Ruleset(_) => "Ruleset",
            Self::Declaration(_) => "Declaration",
            Self::AtRule(_) => "AtRule",
            Self::NestableAtRule(node) => node.kind.name(),
            Self::Comment(_) => "Comment",
            Self::Import(_) => "Import",
            Self::MixinCall(_) => "MixinCall",
            Self::MixinDefinition(_) => "MixinDefinition",
            Self::VariableCall(_) => "VariableCall",
            Self::Extend(_) => "Extend",
            Self::Call(_) => "Call",
            Self::Anonymous(_) => "Anonymous",
        }
    }

    /// True for nodes that own a rule list of their own.
    pub const fn has_rules(&self) -> bool {
        match self {
            Self::Ruleset(_) | Self::NestableAtRule(_) | Self::MixinDefinition(_) => true,
            Self::AtRule(node) => node.rules.is_some(),
            Self::Declaration(_)
            | Self::Comment(_)
            | Self::Import(_)
            | Self::MixinCall(_)
            | Self::VariableCall(_)
            | Self::Extend(_)
            | Self::Call(_)
            | Self::Anonymous(_) => false,
        }
    }

    /// Whether the node may legally appear in a rule list after evaluation.
    ///
    /// Calls are reported separately, so they count as allowed here.
    pub const fn allows_root(&self) -> bool {
        !matches!(self, Self::MixinCall(_) | Self::VariableCall(_))
    }

    /// Block-like nodes reset the "last rule" flag while rendering.
    pub fn is_ruleset_like(&self) -> bool {
        match self {
            Self::Ruleset(_) | Self::NestableAtRule(_) => true,
            Self::AtRule(node) => node.rules.is_some() || !node.is_charset(),
            Self::Declaration(_)
            | Self::Comment(_)
            | Self::Import(_)
            | Self::MixinCall(_)
            | Self::MixinDefinition(_)
            | Self::VariableCall(_)
            | Self::Extend(_)
            | Self::Call(_)
            | Self::Anonymous(_) => false,
        }
    }

    #[inline]
    pub fn as_declaration(&self) -> Option<&Declaration> {
        if let Self::Declaration(declaration) = self {
            Some(declaration)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_ruleset(&self) -> Option<&Ruleset> {
        if let Self::Ruleset(ruleset) = self {
            Some(ruleset)
        } else {
            None
        }
    }

    /// True for a variable declaration such as `@x: 1`.
    #[inline]
    pub fn is_variable_declaration(&self) -> bool {
        self.as_declaration()
            .is_some_and(|declaration| declaration.variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_file_fall_back_to_parent() {
        let file = FileInfo::new("main.less");
        let parent = NodeInfo::at(12, &file);
        let child = NodeInfo::default();
        assert_eq!(child.index(), None);
        child.set_parent(&parent);
        assert_eq!(child.index(), Some(12));
        assert_eq!(child.filename().as_deref(), Some("main.less"));
    }

    #[test]
    fn dropped_parent_is_tolerated() {
        let child = NodeInfo::default();
        {
            let parent = NodeInfo::new(Some(3), None);
            child.set_parent(&parent);
            assert_eq!(child.index(), Some(3));
        }
        assert_eq!(child.index(), None);
    }

    #[test]
    fn visibility_blocks_count() {
        let mut info = NodeInfo::default();
        info.add_visibility_block();
        info.add_visibility_block();
        info.ensure_visibility();
        assert!(info.blocks_visibility());
        info.remove_visibility_block();
        assert!(info.blocks_visibility());
        info.remove_visibility_block();
        info.remove_visibility_block();
        assert!(!info.blocks_visibility());
        assert_eq!(info.is_visible(), Some(true));
    }
}
