//! Scope frames and the handles that name them.

use core::fmt;
use smallvec::SmallVec;

use crate::action::CleanupAction;

/// Actions stored inline per scope before spilling to the heap.
/// Most scopes register one or two cleanups.
pub(crate) const INLINE_ACTIONS: usize = 4;

/// Handle to a scope on a [`ScopeStack`](crate::ScopeStack).
///
/// Handles are plain values. A handle to a closed scope stays stale even
/// after a later scope is entered at the same depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    pub(crate) depth: u32,
    pub(crate) serial: u64,
}

impl ScopeId {
    /// The sentinel root every stack starts with.
    pub(crate) const ROOT: ScopeId = ScopeId { depth: 0, serial: 0 };

    /// Nesting depth; the root is 0 and the first entered scope is 1.
    #[inline]
    pub fn depth(self) -> usize {
        self.depth as usize
    }

    #[inline]
    pub fn is_root(self) -> bool {
        self.depth == 0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.depth, self.serial)
    }
}

/// One live lexical block.
pub(crate) struct Scope<'a> {
    pub(crate) serial: u64,
    /// Registration order; executed back to front.
    pub(crate) actions: SmallVec<[CleanupAction<'a>; INLINE_ACTIONS]>,
    /// Monotonic: set once, never cleared.
    pub(crate) error_occurred: bool,
    pub(crate) parent: Option<ScopeId>,
}

impl<'a> Scope<'a> {
    pub(crate) fn root() -> Self {
        Self::new(ScopeId::ROOT.serial, None)
    }

    pub(crate) fn new(serial: u64, parent: Option<ScopeId>) -> Self {
        Self {
            serial,
            actions: SmallVec::new(),
            error_occurred: false,
            parent,
        }
    }

    #[inline]
    pub(crate) fn mark_error(&mut self) {
        self.error_occurred = true;
    }

    /// Run every applicable action, newest first.
    /// When `honor_errors` is false the error flag is ignored and only
    /// unconditional actions run (partial unwinds for break/continue).
    pub(crate) fn run(self, honor_errors: bool) -> (usize, usize) {
        let errored = honor_errors && self.error_occurred;
        let mut ran = 0;
        let mut skipped = 0;
        for action in self.actions.into_iter().rev() {
            if action.fire(errored) {
                ran += 1;
            } else {
                skipped += 1;
            }
        }
        (ran, skipped)
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("serial", &self.serial)
            .field("actions", &self.actions.len())
            .field("error_occurred", &self.error_occurred)
            .field("parent", &self.parent)
            .finish()
    }
}
