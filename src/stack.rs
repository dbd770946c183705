//! The scope stack - live scopes plus the active loop/switch constructs.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::action::{CleanupAction, When};
use crate::scope::{Scope, ScopeId};
use crate::{Result, ScopeError};

/// Active constructs stored inline before spilling to the heap.
const INLINE_CONSTRUCTS: usize = 4;

/// Kind of control construct a `break`/`continue` can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstructKind {
    /// `for`, `while`, `loop`, do-while: target of both break and continue.
    Loop,
    /// `switch`/`match`: target of break only.
    Switch,
}

/// Break and continue targets of one active construct.
///
/// A target is the scope that was innermost when the construct started, so an
/// unwind up to (excluding) it closes every scope of the construct's body.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Construct {
    pub(crate) kind: ConstructKind,
    pub(crate) break_target: ScopeId,
    /// Inherited from the enclosing construct when this one is a switch.
    pub(crate) continue_target: Option<ScopeId>,
}

/// Scope stack for a single activation.
///
/// Slot `n` of the frame vector holds the scope at depth `n`; slot 0 is the
/// sentinel root, which is never closed and never holds cleanups.
///
/// Cleanups may borrow anything that outlives `'a`. Dropping a stack that
/// still has live scopes closes them as a normal return would.
///
/// # Examples
///
/// ```
/// use scope_defer::ScopeStack;
/// use std::cell::RefCell;
///
/// let log = RefCell::new(Vec::new());
/// let mut stack = ScopeStack::new();
///
/// let scope = stack.enter_scope();
/// stack.defer_fn(scope, || log.borrow_mut().push("a")).unwrap();
/// stack.defer_fn(scope, || log.borrow_mut().push("b")).unwrap();
/// stack.close_scope(scope).unwrap();
///
/// assert_eq!(*log.borrow(), ["b", "a"]);
/// ```
pub struct ScopeStack<'a> {
    pub(crate) frames: Vec<Scope<'a>>,
    pub(crate) constructs: SmallVec<[Construct; INLINE_CONSTRUCTS]>,
    next_serial: u64,
}

impl<'a> ScopeStack<'a> {
    /// Create a stack holding only the root scope.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a stack with room for `depth` nested scopes before reallocating.
    pub fn with_capacity(depth: usize) -> Self {
        let mut frames = Vec::with_capacity(depth + 1);
        frames.push(Scope::root());
        Self {
            frames,
            constructs: SmallVec::new(),
            next_serial: 1,
        }
    }

    // ========================================
    // Inspection
    // ========================================

    /// Handle of the sentinel root.
    #[inline]
    pub fn root(&self) -> ScopeId {
        ScopeId::ROOT
    }

    /// Innermost live scope (the root when nothing was entered).
    #[inline]
    pub fn top(&self) -> ScopeId {
        let depth = self.depth();
        ScopeId {
            depth: depth as u32,
            serial: self.frames.last().map_or(0, |scope| scope.serial),
        }
    }

    /// Number of live scopes above the root.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Whether `id` names a scope that has not been closed yet.
    #[inline]
    pub fn is_live(&self, id: ScopeId) -> bool {
        self.frames
            .get(id.depth())
            .is_some_and(|scope| scope.serial == id.serial)
    }

    /// Whether the scope was marked by an error-return.
    pub fn is_errored(&self, id: ScopeId) -> Result<bool> {
        self.frame(id).map(|scope| scope.error_occurred)
    }

    /// Number of cleanups registered on a live scope.
    pub fn pending(&self, id: ScopeId) -> Result<usize> {
        self.frame(id).map(|scope| scope.actions.len())
    }

    /// Parent of a live scope; `None` for the root.
    pub fn parent(&self, id: ScopeId) -> Result<Option<ScopeId>> {
        self.frame(id).map(|scope| scope.parent)
    }

    pub(crate) fn frame(&self, id: ScopeId) -> Result<&Scope<'a>> {
        self.frames
            .get(id.depth())
            .filter(|scope| scope.serial == id.serial)
            .ok_or(ScopeError::StaleScope(id))
    }

    pub(crate) fn frame_mut(&mut self, id: ScopeId) -> Result<&mut Scope<'a>> {
        self.frames
            .get_mut(id.depth())
            .filter(|scope| scope.serial == id.serial)
            .ok_or(ScopeError::StaleScope(id))
    }

    /// Handle of the live scope at `depth`, if any.
    pub(crate) fn id_at(&self, depth: usize) -> Option<ScopeId> {
        self.frames.get(depth).map(|scope| ScopeId {
            depth: depth as u32,
            serial: scope.serial,
        })
    }

    // ========================================
    // Scopes
    // ========================================

    /// Enter a new scope whose parent is the current top.
    pub fn enter_scope(&mut self) -> ScopeId {
        let parent = self.top();
        let serial = self.next_serial;
        self.next_serial += 1;
        self.frames.push(Scope::new(serial, Some(parent)));
        let id = self.top();
        log::trace!("enter scope {} (parent {})", id, parent);
        id
    }

    // ========================================
    // Registration
    // ========================================

    /// Register `callback` to run with an alias of `arg` when `scope` exits.
    ///
    /// With [`When::OnError`] the callback only runs if the scope is errored
    /// when it closes. On failure nothing is registered.
    pub fn register_cleanup<A, F>(
        &mut self,
        scope: ScopeId,
        callback: F,
        arg: &'a A,
        when: When,
    ) -> Result<()>
    where
        A: ?Sized,
        F: FnOnce(&A) + 'a,
    {
        self.register(scope, CleanupAction::new(callback, arg, when))
    }

    /// Unconditional cleanup over an aliased argument.
    #[inline]
    pub fn defer<A, F>(&mut self, scope: ScopeId, arg: &'a A, callback: F) -> Result<()>
    where
        A: ?Sized,
        F: FnOnce(&A) + 'a,
    {
        self.register_cleanup(scope, callback, arg, When::Always)
    }

    /// Error-conditional cleanup over an aliased argument.
    #[inline]
    pub fn errdefer<A, F>(&mut self, scope: ScopeId, arg: &'a A, callback: F) -> Result<()>
    where
        A: ?Sized,
        F: FnOnce(&A) + 'a,
    {
        self.register_cleanup(scope, callback, arg, When::OnError)
    }

    /// Unconditional cleanup closure. Move owned resources into it to tie
    /// their release to the scope.
    #[inline]
    pub fn defer_fn<F>(&mut self, scope: ScopeId, callback: F) -> Result<()>
    where
        F: FnOnce() + 'a,
    {
        self.register(scope, CleanupAction::from_fn(callback, When::Always))
    }

    /// Error-conditional cleanup closure.
    #[inline]
    pub fn errdefer_fn<F>(&mut self, scope: ScopeId, callback: F) -> Result<()>
    where
        F: FnOnce() + 'a,
    {
        self.register(scope, CleanupAction::from_fn(callback, When::OnError))
    }

    /// Register a prebuilt action. Fails with [`ScopeError::Exhausted`] when
    /// its record cannot be allocated, leaving the scope unchanged.
    pub fn register(&mut self, scope: ScopeId, action: CleanupAction<'a>) -> Result<()> {
        if scope.is_root() {
            return Err(ScopeError::RootScope);
        }
        let frame = self.frame_mut(scope)?;
        frame
            .actions
            .try_reserve(1)
            .map_err(|_| ScopeError::Exhausted)?;
        log::trace!("register {:?} cleanup on scope {}", action.when(), scope);
        frame.actions.push(action);
        Ok(())
    }

    // ========================================
    // Loops and switches
    // ========================================

    /// Start a loop or switch nested in the current top scope.
    ///
    /// A loop retargets both `break` and `continue`; a switch only retargets
    /// `break` and keeps the enclosing `continue` target.
    pub fn push_loop_or_switch(&mut self, kind: ConstructKind) {
        let here = self.top();
        let continue_target = match kind {
            ConstructKind::Loop => Some(here),
            ConstructKind::Switch => self.continue_target(),
        };
        log::trace!("push {:?} targeting scope {}", kind, here);
        self.constructs.push(Construct {
            kind,
            break_target: here,
            continue_target,
        });
    }

    #[inline]
    pub fn push_loop(&mut self) {
        self.push_loop_or_switch(ConstructKind::Loop);
    }

    #[inline]
    pub fn push_switch(&mut self) {
        self.push_loop_or_switch(ConstructKind::Switch);
    }

    /// End the innermost construct, restoring the enclosing targets.
    pub fn pop_loop_or_switch(&mut self) -> Result<ConstructKind> {
        let construct = self.constructs.pop().ok_or(ScopeError::NoConstruct)?;
        log::trace!("pop {:?}", construct.kind);
        Ok(construct.kind)
    }

    /// Scope a `break` unwinds up to, if any construct is active.
    #[inline]
    pub fn break_target(&self) -> Option<ScopeId> {
        self.constructs.last().map(|c| c.break_target)
    }

    /// Scope a `continue` unwinds up to, if any loop is active.
    #[inline]
    pub fn continue_target(&self) -> Option<ScopeId> {
        self.constructs.last().and_then(|c| c.continue_target)
    }

    /// Number of active loops and switches.
    #[inline]
    pub fn constructs(&self) -> usize {
        self.constructs.len()
    }

    /// Forget constructs whose target scope has been closed underneath them:
    /// a `continue` or `return` leaves every switch and loop it jumps out of.
    pub(crate) fn discard_stale_constructs(&mut self) {
        let before = self.constructs.len();
        let frames = &self.frames;
        self.constructs.retain(|c| {
            frames
                .get(c.break_target.depth())
                .is_some_and(|scope| scope.serial == c.break_target.serial)
        });
        let dropped = before - self.constructs.len();
        if dropped > 0 {
            log::trace!("left {} loop/switch construct(s)", dropped);
        }
    }
}

impl Default for ScopeStack<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ScopeStack<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScopeStack")
            .field("frames", &self.frames)
            .field("constructs", &self.constructs)
            .finish()
    }
}

impl Drop for ScopeStack<'_> {
    fn drop(&mut self) {
        if self.depth() == 0 {
            return;
        }
        log::warn!("scope stack dropped with {} live scope(s); closing them", self.depth());
        let from = self.top();
        if let Err(e) = self.return_unwind(from) {
            log::warn!("closing live scopes failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};

    #[test]
    fn test_enter_links_parent() {
        let mut stack = ScopeStack::new();
        let outer = stack.enter_scope();
        let inner = stack.enter_scope();
        assert_eq!(outer.depth(), 1);
        assert_eq!(inner.depth(), 2);
        assert_eq!(stack.parent(inner), Ok(Some(outer)));
        assert_eq!(stack.parent(outer), Ok(Some(stack.root())));
        assert_eq!(stack.parent(stack.root()), Ok(None));
        assert_eq!(stack.top(), inner);
    }

    #[test]
    fn test_register_on_root_rejected() {
        let ran = Cell::new(false);
        let mut stack = ScopeStack::new();
        let root = stack.root();
        assert_eq!(stack.defer_fn(root, || ran.set(true)), Err(ScopeError::RootScope));
        assert_eq!(stack.pending(root), Ok(0));
    }

    #[test]
    fn test_register_on_stale_scope_rejected() {
        let log = RefCell::new(alloc::vec::Vec::new());
        let mut stack = ScopeStack::new();
        let first = stack.enter_scope();
        stack.close_scope(first).unwrap();
        let second = stack.enter_scope();
        assert_eq!(first.depth(), second.depth());
        assert!(!stack.is_live(first));
        assert_eq!(
            stack.defer_fn(first, || log.borrow_mut().push(1)),
            Err(ScopeError::StaleScope(first))
        );
        assert_eq!(stack.pending(second), Ok(0));
    }

    #[test]
    fn test_register_prebuilt_action() {
        let ran = Cell::new(0);
        let mut stack = ScopeStack::new();
        let scope = stack.enter_scope();
        let action = CleanupAction::from_fn(|| ran.set(ran.get() + 1), When::OnError);
        stack.register(scope, action).unwrap();
        assert_eq!(stack.pending(scope), Ok(1));
        stack.mark_error(scope).unwrap();
        stack.close_scope(scope).unwrap();
        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn test_loop_sets_both_targets() {
        let mut stack = ScopeStack::new();
        let outer = stack.enter_scope();
        stack.push_loop();
        assert_eq!(stack.break_target(), Some(outer));
        assert_eq!(stack.continue_target(), Some(outer));
    }

    #[test]
    fn test_switch_shadows_break_only() {
        let mut stack = ScopeStack::new();
        let function = stack.enter_scope();
        stack.push_loop();
        let body = stack.enter_scope();
        stack.push_switch();
        assert_eq!(stack.break_target(), Some(body));
        assert_eq!(stack.continue_target(), Some(function));

        assert_eq!(stack.pop_loop_or_switch(), Ok(ConstructKind::Switch));
        assert_eq!(stack.break_target(), Some(function));
        assert_eq!(stack.pop_loop_or_switch(), Ok(ConstructKind::Loop));
        assert_eq!(stack.break_target(), None);
        assert_eq!(stack.pop_loop_or_switch(), Err(ScopeError::NoConstruct));
    }

    #[test]
    fn test_switch_without_loop_has_no_continue_target() {
        let mut stack = ScopeStack::new();
        stack.enter_scope();
        stack.push_switch();
        assert!(stack.break_target().is_some());
        assert_eq!(stack.continue_target(), None);
    }

    #[test]
    fn test_drop_closes_live_scopes() {
        let log = RefCell::new(alloc::vec::Vec::new());
        {
            let mut stack = ScopeStack::new();
            let outer = stack.enter_scope();
            stack.defer_fn(outer, || log.borrow_mut().push("outer")).unwrap();
            let inner = stack.enter_scope();
            stack.defer_fn(inner, || log.borrow_mut().push("inner")).unwrap();
            stack.errdefer_fn(inner, || log.borrow_mut().push("rollback")).unwrap();
        }
        assert_eq!(*log.borrow(), ["inner", "outer"]);
    }
}
