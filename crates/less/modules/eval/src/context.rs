//! Evaluation state and the guards that restore it.

use core::cell::RefCell;
use core::mem::{replace, take};
use core::ops::{Deref, DerefMut};
use less_tree::{
    CompileOptions, Declaration, FunctionRegistry, LessFunction, MathMode, NestableAtRule,
    Operator, Path, Ruleset,
};
use std::rc::Rc;

/// A ruleset pushed as a lookup scope while it is evaluated.
pub type Frame = Rc<RefCell<Ruleset>>;

/// Take the ruleset back out of a frame, cloning it if the frame is still shared.
pub(crate) fn into_ruleset(frame: Frame) -> Ruleset {
    Rc::try_unwrap(frame).map_or_else(|shared| shared.borrow().clone(), RefCell::into_inner)
}

/// Media or container block registered during bubbling.
pub type MediaBlock = Rc<RefCell<NestableAtRule>>;

/// State threaded through evaluation.
///
/// Every stack is pushed through a method returning a [`Scope`], which pops it
/// again when dropped, including when evaluation bails out with `?`.
#[derive(Debug)]
pub struct EvalContext {
    pub options: CompileOptions,
    /// Lookup scopes, innermost last.
    frames: Vec<Frame>,
    /// One entry per declaration being evaluated. Set when an `!important` variable is used.
    important_scope: Vec<bool>,
    parens: usize,
    math: MathMode,
    in_calc: bool,
    /// Selector paths of the enclosing rulesets, innermost last.
    paths: Vec<Vec<Path>>,
    pub(crate) media_path: Vec<MediaBlock>,
    pub(crate) media_blocks: Vec<MediaBlock>,
    /// Variables and properties currently being resolved.
    evaluating: Vec<String>,
    mixin_depth: usize,
    functions: Rc<FunctionRegistry>,
}

impl EvalContext {
    pub fn new(options: &CompileOptions, functions: Rc<FunctionRegistry>) -> Self {
        Self {
            math: options.math,
            options: options.clone(),
            frames: Vec::new(),
            important_scope: Vec::new(),
            parens: 0,
            in_calc: false,
            paths: Vec::new(),
            media_path: Vec::new(),
            media_blocks: Vec::new(),
            evaluating: Vec::new(),
            mixin_depth: 0,
            functions,
        }
    }

    /// Frames from the innermost outwards.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }

    #[inline]
    pub fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    #[inline]
    pub(crate) fn frame_stack(&self) -> &[Frame] {
        &self.frames
    }

    /// Registry of the innermost frame that has one, or the root registry.
    pub fn function_registry(&self) -> Rc<FunctionRegistry> {
        self.frames()
            .find_map(|frame| frame.borrow().function_registry.clone())
            .unwrap_or_else(|| Rc::clone(&self.functions))
    }

    pub fn function(&self, name: &str) -> Option<LessFunction> {
        self.function_registry().get(name)
    }

    /// The innermost declaration of variable `name`.
    pub fn find_variable(&self, name: &str) -> Option<Declaration> {
        self.frames()
            .find_map(|frame| frame.borrow().variable(name).cloned())
    }

    /// Declarations of property `name` in the innermost frame that has any.
    pub fn find_property(&self, name: &str) -> Option<Vec<Declaration>> {
        self.frames().find_map(|frame| {
            let frame = frame.borrow();
            let found = frame.property(name);
            (!found.is_empty()).then(|| found.into_iter().cloned().collect())
        })
    }

    /// Paths of the innermost enclosing ruleset. Empty at the root.
    pub fn path_context(&self) -> &[Path] {
        self.paths.last().map_or(&[], Vec::as_slice)
    }

    /// False until some ruleset has set up a selector context.
    #[inline]
    pub fn has_path_context(&self) -> bool {
        !self.paths.is_empty()
    }

    #[inline]
    pub const fn math(&self) -> MathMode {
        self.math
    }

    #[inline]
    pub const fn in_parens(&self) -> bool {
        self.parens > 0
    }

    /// Whether an operation with `operator` is evaluated here or kept as written.
    pub const fn is_math_on(&self, operator: Operator) -> bool {
        if self.in_calc {
            return false;
        }
        if matches!(operator, Operator::Divide)
            && !matches!(self.math, MathMode::Always)
            && !self.in_parens()
        {
            return false;
        }
        if matches!(self.math, MathMode::Parens) {
            return self.in_parens();
        }
        true
    }

    #[inline]
    pub fn is_evaluating(&self, name: &str) -> bool {
        self.evaluating.iter().any(|entry| entry == name)
    }

    #[inline]
    pub const fn mixin_depth(&self) -> usize {
        self.mixin_depth
    }

    /// Flag the innermost declaration as important.
    pub fn mark_important(&mut self) {
        if let Some(important) = self.important_scope.last_mut() {
            *important = true;
        }
    }

    /// Whether the innermost declaration was flagged by an important variable.
    pub fn is_marked_important(&self) -> bool {
        self.important_scope.last().copied().unwrap_or(false)
    }

    pub fn push_frame(&mut self, frame: Frame) -> Scope<'_> {
        self.frames.push(frame);
        Scope::new(self, Restore::Frame)
    }

    /// Replace the whole frame stack, for mixin bodies evaluated in their own scope.
    pub fn swap_frames(&mut self, frames: Vec<Frame>) -> Scope<'_> {
        let previous = replace(&mut self.frames, frames);
        Scope::new(self, Restore::Frames(previous))
    }

    pub fn push_important(&mut self) -> Scope<'_> {
        self.important_scope.push(false);
        Scope::new(self, Restore::Important)
    }

    pub fn push_parens(&mut self) -> Scope<'_> {
        self.parens = self.parens.saturating_add(1);
        Scope::new(self, Restore::Parens)
    }

    pub fn set_math(&mut self, math: MathMode) -> Scope<'_> {
        let previous = replace(&mut self.math, math);
        Scope::new(self, Restore::Math(previous))
    }

    /// Enter a function call. Inside `calc()` no math is done.
    pub fn enter_call(&mut self, calc: bool) -> Scope<'_> {
        let previous = replace(&mut self.in_calc, calc);
        Scope::new(self, Restore::Calc(previous))
    }

    pub fn push_paths(&mut self, paths: Vec<Path>) -> Scope<'_> {
        self.paths.push(paths);
        Scope::new(self, Restore::Paths)
    }

    pub fn push_variable(&mut self, name: &str) -> Scope<'_> {
        self.evaluating.push(name.to_owned());
        Scope::new(self, Restore::Variable)
    }

    pub fn push_mixin(&mut self) -> Scope<'_> {
        self.mixin_depth = self.mixin_depth.saturating_add(1);
        Scope::new(self, Restore::MixinDepth)
    }

    /// Register a media block in both the media path and the block list.
    ///
    /// The guard pops the path only. Blocks stay registered for the outermost block.
    pub fn push_media(&mut self, block: MediaBlock) -> Scope<'_> {
        self.media_blocks.push(Rc::clone(&block));
        self.media_path.push(block);
        Scope::new(self, Restore::MediaPath)
    }

    /// Start a fresh media state, restored when the guard drops.
    pub fn isolate_media(&mut self) -> Scope<'_> {
        let path = take(&mut self.media_path);
        let blocks = take(&mut self.media_blocks);
        Scope::new(self, Restore::Media { path, blocks })
    }
}

/// What a [`Scope`] undoes when dropped.
#[derive(Debug, Default)]
enum Restore {
    #[default]
    Nothing,
    Frame,
    Frames(Vec<Frame>),
    Important,
    Parens,
    Math(MathMode),
    Calc(bool),
    Paths,
    Variable,
    MixinDepth,
    MediaPath,
    Media {
        path: Vec<MediaBlock>,
        blocks: Vec<MediaBlock>,
    },
}

/// Guard over one push onto the [`EvalContext`].
///
/// Derefs to the context so nested evaluation goes through the guard.
#[derive(Debug)]
pub struct Scope<'ctx> {
    context: &'ctx mut EvalContext,
    restore: Restore,
}

impl<'ctx> Scope<'ctx> {
    const fn new(context: &'ctx mut EvalContext, restore: Restore) -> Self {
        Self { context, restore }
    }
}

impl Deref for Scope<'_> {
    type Target = EvalContext;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        let context = &mut *self.context;
        match take(&mut self.restore) {
            Restore::Nothing => {}
            Restore::Frame => {
                context.frames.pop();
            }
            Restore::Frames(frames) => context.frames = frames,
            Restore::Important => {
                context.important_scope.pop();
            }
            Restore::Parens => context.parens = context.parens.saturating_sub(1),
            Restore::Math(math) => context.math = math,
            Restore::Calc(in_calc) => context.in_calc = in_calc,
            Restore::Paths => {
                context.paths.pop();
            }
            Restore::Variable => {
                context.evaluating.pop();
            }
            Restore::MixinDepth => {
                context.mixin_depth = context.mixin_depth.saturating_sub(1);
            }
            Restore::MediaPath => {
                context.media_path.pop();
            }
            Restore::Media { path, blocks } => {
                context.media_path = path;
                context.media_blocks = blocks;
            }
        }
    }
}
