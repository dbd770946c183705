//! Exit engine - closing scopes and the error flag.

use alloc::vec::Vec;

use crate::scope::ScopeId;
use crate::stack::ScopeStack;
use crate::{Result, ScopeError};

/// What happened when one scope closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExitReport {
    /// Depth the scope lived at.
    pub depth: usize,
    /// Whether error-conditional cleanups were eligible.
    pub errored: bool,
    /// Cleanups executed.
    pub ran: usize,
    /// Error-conditional cleanups that did not apply.
    pub skipped: usize,
}

/// Every scope closed by one unwind, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unwound {
    pub closed: Vec<ExitReport>,
}

impl Unwound {
    /// Total cleanups executed.
    pub fn ran(&self) -> usize {
        self.closed.iter().map(|r| r.ran).sum()
    }

    /// Total cleanups skipped.
    pub fn skipped(&self) -> usize {
        self.closed.iter().map(|r| r.skipped).sum()
    }

    /// Number of scopes closed.
    #[inline]
    pub fn len(&self) -> usize {
        self.closed.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.closed.is_empty()
    }
}

impl<'a> ScopeStack<'a> {
    /// Close the innermost scope at a normal block exit.
    ///
    /// Unconditional cleanups run newest first; error-conditional ones run
    /// too (in the same order) only if the scope is errored.
    pub fn close_scope(&mut self, id: ScopeId) -> Result<ExitReport> {
        self.check_innermost(id)?;
        self.pop_and_run(true).ok_or(ScopeError::RootScope)
    }

    /// Flag a scope as errored. Idempotent; the flag is never cleared.
    /// Marking the root does nothing, it stays error-free.
    pub fn mark_error(&mut self, id: ScopeId) -> Result<()> {
        if id.is_root() {
            return Ok(());
        }
        let scope = self.frame_mut(id)?;
        if !scope.error_occurred {
            log::debug!("scope {} marked errored", id);
        }
        scope.mark_error();
        Ok(())
    }

    /// `id` must be live, not the root, and the current top.
    pub(crate) fn check_innermost(&self, id: ScopeId) -> Result<()> {
        if id.is_root() {
            return Err(ScopeError::RootScope);
        }
        if !self.is_live(id) {
            return Err(ScopeError::StaleScope(id));
        }
        let innermost = self.top();
        if innermost != id {
            return Err(ScopeError::NotInnermost {
                scope: id,
                innermost,
            });
        }
        Ok(())
    }

    /// Pop the top scope and run its cleanups. `None` if only the root is left.
    pub(crate) fn pop_and_run(&mut self, honor_errors: bool) -> Option<ExitReport> {
        if self.depth() == 0 {
            return None;
        }
        let scope = self.frames.pop()?;
        let depth = self.frames.len();
        let errored = honor_errors && scope.error_occurred;
        self.discard_stale_constructs();
        let (ran, skipped) = scope.run(honor_errors);
        log::trace!(
            "closed scope at depth {} (errored: {}, ran: {}, skipped: {})",
            depth,
            errored,
            ran,
            skipped
        );
        Some(ExitReport {
            depth,
            errored,
            ran,
            skipped,
        })
    }

    /// Close `id` and everything above it, each by the ordinary rule.
    /// Does nothing if `id` was already closed.
    pub(crate) fn close_through(&mut self, id: ScopeId) -> Unwound {
        let mut unwound = Unwound::default();
        if id.is_root() || !self.is_live(id) {
            return unwound;
        }
        while self.depth() >= id.depth() {
            match self.pop_and_run(true) {
                Some(report) => unwound.closed.push(report),
                None => break,
            }
        }
        unwound
    }

    /// Mark `id` and everything above it errored, then close them.
    pub(crate) fn rollback_through(&mut self, id: ScopeId) -> Unwound {
        if id.is_root() || !self.is_live(id) {
            return Unwound::default();
        }
        for scope in &mut self.frames[id.depth()..] {
            scope.mark_error();
        }
        log::debug!("rolling back scopes {}..={}", id.depth(), self.depth());
        self.close_through(id)
    }
}
