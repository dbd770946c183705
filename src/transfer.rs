//! Control-transfer interceptor - partial unwinds for return, error-return,
//! break, continue and fallthrough.
//!
//! Every transfer closes scopes innermost first, from the scope it starts in
//! up to (excluding) a target:
//!
//! | Transfer | Target | Cleanups run |
//! |----------|--------|--------------|
//! | return | none (all scopes, root excluded) | each scope's own rule |
//! | error-return | none, after marking every scope errored | everything |
//! | break | innermost loop or switch | unconditional only |
//! | continue | innermost loop, through any switch | unconditional only |
//! | fallthrough | the case scope itself is closed | each scope's own rule |

use crate::exit::{ExitReport, Unwound};
use crate::scope::ScopeId;
use crate::stack::ScopeStack;
use crate::{Result, ScopeError};

impl<'a> ScopeStack<'a> {
    /// Close every scope from `from` up to, but excluding, `target`.
    ///
    /// `from` must be the innermost live scope. With `target == None` this
    /// is a function return: every scope above the root closes by the
    /// ordinary rule, so scopes already flagged errored still run their
    /// error-conditional cleanups. With `Some(target)` it is a partial unwind
    /// for `break`/`continue`: only unconditional cleanups run.
    ///
    /// Unwinding from the root (nothing entered) closes nothing.
    pub fn unwind_to(&mut self, from: ScopeId, target: Option<ScopeId>) -> Result<Unwound> {
        self.check_unwind_start(from)?;
        let stop = match target {
            None => 0,
            Some(target) => {
                if !self.is_live(target) {
                    return Err(ScopeError::StaleScope(target));
                }
                // `from` is the top of a strict stack, so any live scope no
                // deeper than it is one of its ancestors.
                if target.depth() > from.depth() {
                    return Err(ScopeError::NotAncestor { from, target });
                }
                target.depth()
            }
        };

        let honor_errors = target.is_none();
        let mut unwound = Unwound::default();
        while self.depth() > stop {
            match self.pop_and_run(honor_errors) {
                Some(report) => unwound.closed.push(report),
                None => break,
            }
        }
        log::trace!(
            "unwound {} scope(s) from {} ({} cleanup(s) ran)",
            unwound.len(),
            from,
            unwound.ran()
        );
        Ok(unwound)
    }

    /// Normal function return from `from`.
    #[inline]
    pub fn return_unwind(&mut self, from: ScopeId) -> Result<Unwound> {
        self.unwind_to(from, None)
    }

    /// Error-return from `from`.
    ///
    /// Every scope from `from` out to the outermost one is marked errored
    /// before anything runs, so error-conditional cleanups fire across the
    /// whole unwound chain and not only where the error was raised.
    pub fn error_return_unwind(&mut self, from: ScopeId) -> Result<Unwound> {
        self.check_unwind_start(from)?;
        log::debug!("error-return from scope {}", from);
        for depth in 1..=from.depth() {
            if let Some(id) = self.id_at(depth) {
                self.mark_error(id)?;
            }
        }
        self.unwind_to(from, None)
    }

    /// `break` from `from`: close scopes up to the innermost loop or switch.
    /// The caller performs the native `break` afterwards.
    pub fn break_unwind(&mut self, from: ScopeId) -> Result<Unwound> {
        let target = self.break_target().ok_or(ScopeError::NoEnclosingConstruct)?;
        self.unwind_to(from, Some(target))
    }

    /// `continue` from `from`: close scopes up to the innermost loop, seeing
    /// through any switch in between. The caller performs the native
    /// `continue` afterwards.
    pub fn continue_unwind(&mut self, from: ScopeId) -> Result<Unwound> {
        let target = self.continue_target().ok_or(ScopeError::NoEnclosingLoop)?;
        self.unwind_to(from, Some(target))
    }

    /// Fall through from a switch case into the next one.
    ///
    /// The case scope exits normally, so its cleanups have run before the
    /// next case enters its own scope and registers anything.
    pub fn fallthrough(&mut self, case: ScopeId) -> Result<ExitReport> {
        log::trace!("fallthrough out of scope {}", case);
        self.close_scope(case)
    }

    /// `from` is live and innermost; the root counts when nothing else is live.
    fn check_unwind_start(&self, from: ScopeId) -> Result<()> {
        if !self.is_live(from) {
            return Err(ScopeError::StaleScope(from));
        }
        let innermost = self.top();
        if innermost != from {
            return Err(ScopeError::NotInnermost {
                scope: from,
                innermost,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::ConstructKind;
    use alloc::{format, string::String, vec::Vec};
    use core::cell::RefCell;

    fn push(log: &RefCell<Vec<String>>, entry: String) {
        log.borrow_mut().push(entry);
    }

    #[test]
    fn test_return_unwinds_all_levels() {
        let log = RefCell::new(Vec::new());
        let mut stack = ScopeStack::new();
        for (name, value) in [("a", 10), ("b", 20), ("c", 30)] {
            let scope = stack.enter_scope();
            let log = &log;
            stack.defer_fn(scope, move || push(log, format!("{}:{}", name, value))).unwrap();
        }
        let unwound = stack.return_unwind(stack.top()).unwrap();
        assert_eq!(*log.borrow(), ["c:30", "b:20", "a:10"]);
        assert_eq!(unwound.len(), 3);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_error_return_marks_every_scope() {
        let log = RefCell::new(Vec::new());
        let mut stack = ScopeStack::new();
        let outer = stack.enter_scope();
        stack.errdefer_fn(outer, || push(&log, "outer-rollback".into())).unwrap();
        let inner = stack.enter_scope();
        stack.defer_fn(inner, || push(&log, "inner".into())).unwrap();
        stack.errdefer_fn(inner, || push(&log, "inner-rollback".into())).unwrap();

        let unwound = stack.error_return_unwind(inner).unwrap();
        assert_eq!(*log.borrow(), ["inner-rollback", "inner", "outer-rollback"]);
        assert!(unwound.closed.iter().all(|r| r.errored));
    }

    #[test]
    fn test_return_honors_earlier_marks() {
        let log = RefCell::new(Vec::new());
        let mut stack = ScopeStack::new();
        let outer = stack.enter_scope();
        stack.errdefer_fn(outer, || push(&log, "outer-rollback".into())).unwrap();
        let inner = stack.enter_scope();
        stack.errdefer_fn(inner, || push(&log, "inner-rollback".into())).unwrap();
        stack.mark_error(outer).unwrap();

        stack.return_unwind(inner).unwrap();
        assert_eq!(*log.borrow(), ["outer-rollback"]);
    }

    #[test]
    fn test_partial_unwind_runs_unconditional_only() {
        let log = RefCell::new(Vec::new());
        let mut stack = ScopeStack::new();
        let outer = stack.enter_scope();
        stack.push_loop();
        let body = stack.enter_scope();
        stack.defer_fn(body, || push(&log, "body".into())).unwrap();
        stack.errdefer_fn(body, || push(&log, "rollback".into())).unwrap();
        stack.mark_error(body).unwrap();

        let unwound = stack.break_unwind(body).unwrap();
        assert_eq!(*log.borrow(), ["body"]);
        assert_eq!(unwound.skipped(), 1);
        assert_eq!(stack.top(), outer);
        assert_eq!(stack.break_target(), Some(outer));
    }

    #[test]
    fn test_continue_sees_through_switch() {
        let log = RefCell::new(Vec::new());
        let mut stack = ScopeStack::new();
        let function = stack.enter_scope();
        stack.push_loop();
        let body = stack.enter_scope();
        stack.defer_fn(body, || push(&log, "body".into())).unwrap();
        stack.push_switch();
        let case = stack.enter_scope();
        stack.defer_fn(case, || push(&log, "case".into())).unwrap();

        stack.continue_unwind(case).unwrap();
        assert_eq!(*log.borrow(), ["case", "body"]);
        assert_eq!(stack.top(), function);
        // The switch was left by the jump; the loop is still active.
        assert_eq!(stack.constructs(), 1);
        assert_eq!(stack.pop_loop_or_switch(), Ok(ConstructKind::Loop));
    }

    #[test]
    fn test_break_in_switch_stops_at_switch() {
        let log = RefCell::new(Vec::new());
        let mut stack = ScopeStack::new();
        stack.enter_scope();
        stack.push_loop();
        let body = stack.enter_scope();
        stack.defer_fn(body, || push(&log, "body".into())).unwrap();
        stack.push_switch();
        let case = stack.enter_scope();
        stack.defer_fn(case, || push(&log, "case".into())).unwrap();

        stack.break_unwind(case).unwrap();
        assert_eq!(*log.borrow(), ["case"]);
        assert_eq!(stack.top(), body);
    }

    #[test]
    fn test_transfer_errors() {
        let mut stack = ScopeStack::new();
        let outer = stack.enter_scope();
        assert_eq!(stack.break_unwind(outer), Err(ScopeError::NoEnclosingConstruct));
        stack.push_switch();
        assert_eq!(stack.continue_unwind(outer), Err(ScopeError::NoEnclosingLoop));

        let inner = stack.enter_scope();
        assert_eq!(
            stack.unwind_to(outer, None),
            Err(ScopeError::NotInnermost { scope: outer, innermost: inner })
        );
        stack.close_scope(inner).unwrap();
        assert_eq!(stack.unwind_to(outer, Some(inner)), Err(ScopeError::StaleScope(inner)));
    }

    #[test]
    fn test_unwind_from_root_is_empty() {
        let mut stack = ScopeStack::new();
        let root = stack.root();
        assert!(stack.return_unwind(root).unwrap().is_empty());
        assert!(stack.error_return_unwind(root).unwrap().is_empty());
    }

    #[test]
    fn test_fallthrough_runs_case_before_next() {
        let log = RefCell::new(Vec::new());
        let mut stack = ScopeStack::new();
        stack.enter_scope();
        stack.push_switch();
        let first = stack.enter_scope();
        stack.defer_fn(first, || push(&log, "x".into())).unwrap();
        stack.fallthrough(first).unwrap();
        assert_eq!(*log.borrow(), ["x"]);

        let second = stack.enter_scope();
        stack.defer_fn(second, || push(&log, "y".into())).unwrap();
        stack.break_unwind(second).unwrap();
        stack.pop_loop_or_switch().unwrap();
        assert_eq!(*log.borrow(), ["x", "y"]);
    }
}
