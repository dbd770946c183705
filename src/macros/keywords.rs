//! `break`, `continue` and `return` that unwind the scope stack first.
//!
//! Each macro unwinds from the innermost live scope, then performs the
//! native transfer. Unwind failures propagate with `?`, so the enclosing
//! function must return a `Result` whose error type is `From<ScopeError>`.

/// Close scopes up to the innermost loop or switch, then `break`.
///
/// With a label, the native jump is `break 'label`. A switch is a `match`
/// inside a labeled block, so leaving it means breaking that block.
///
/// ```
/// use scope_defer::{scoped_break, ScopeError, ScopeStack};
/// use std::cell::Cell;
///
/// fn count(ran: &Cell<u32>) -> Result<u32, ScopeError> {
///     let mut stack = ScopeStack::new();
///     let function = stack.enter_scope();
///     stack.push_loop();
///     let mut i = 0;
///     loop {
///         let body = stack.enter_scope();
///         stack.defer_fn(body, || ran.set(ran.get() + 1))?;
///         i += 1;
///         if i == 3 {
///             scoped_break!(stack);
///         }
///         stack.close_scope(body)?;
///     }
///     stack.pop_loop_or_switch()?;
///     stack.close_scope(function)?;
///     Ok(i)
/// }
///
/// let ran = Cell::new(0);
/// assert_eq!(count(&ran), Ok(3));
/// assert_eq!(ran.get(), 3);
/// ```
#[macro_export]
macro_rules! scoped_break {
    ($stack:expr) => {{
        let __from = $stack.top();
        $stack.break_unwind(__from)?;
        break;
    }};
    ($stack:expr, $label:lifetime) => {{
        let __from = $stack.top();
        $stack.break_unwind(__from)?;
        break $label;
    }};
}

/// Close scopes up to the innermost loop (through any switch), then `continue`.
#[macro_export]
macro_rules! scoped_continue {
    ($stack:expr) => {{
        let __from = $stack.top();
        $stack.continue_unwind(__from)?;
        continue;
    }};
}

/// Close every live scope as a normal return, then `return $value`.
#[macro_export]
macro_rules! scoped_return {
    ($stack:expr, $value:expr) => {{
        let __from = $stack.top();
        $stack.return_unwind(__from)?;
        return $value;
    }};
}

/// Mark every live scope errored, close them all, then `return Err($err)`.
///
/// The error is converted with `From`, as `?` would.
#[macro_export]
macro_rules! scoped_return_err {
    ($stack:expr, $err:expr) => {{
        let __from = $stack.top();
        $stack.error_return_unwind(__from)?;
        return ::core::result::Result::Err(::core::convert::From::from($err));
    }};
}

#[cfg(test)]
mod tests {
    use crate::{ScopeError, ScopeStack};
    use alloc::{format, string::String, vec::Vec};
    use core::cell::RefCell;

    type Log = RefCell<Vec<String>>;

    fn note(log: &Log, entry: String) {
        log.borrow_mut().push(entry);
    }

    fn loop_with_break(log: &Log) -> Result<usize, ScopeError> {
        let mut stack = ScopeStack::new();
        let function = stack.enter_scope();
        stack.push_loop();
        let mut i = 0;
        while i < 10 {
            let body = stack.enter_scope();
            let n = i;
            stack.defer_fn(body, move || note(log, format!("a:{}", n)))?;
            if i == 3 {
                scoped_break!(stack);
            }
            i += 1;
            if i == 2 {
                scoped_continue!(stack);
            }
            stack.close_scope(body)?;
        }
        stack.pop_loop_or_switch()?;
        stack.close_scope(function)?;
        Ok(i)
    }

    #[test]
    fn test_break_and_continue() {
        let log = Log::default();
        assert_eq!(loop_with_break(&log), Ok(3));
        assert_eq!(*log.borrow(), ["a:0", "a:1", "a:2", "a:3"]);
    }

    fn nested_return(log: &Log) -> Result<i32, ScopeError> {
        let mut stack = ScopeStack::new();
        for (name, value) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            let scope = stack.enter_scope();
            stack.defer_fn(scope, move || note(log, format!("{}:{}", name, value)))?;
        }
        scoped_return!(stack, Ok(123));
    }

    #[test]
    fn test_return_from_nested_scope() {
        let log = Log::default();
        assert_eq!(nested_return(&log), Ok(123));
        assert_eq!(*log.borrow(), ["d:4", "c:3", "b:2", "a:1"]);
    }

    #[derive(Debug, PartialEq)]
    enum Failure {
        Scope(ScopeError),
        Code(i32),
    }

    impl From<ScopeError> for Failure {
        fn from(e: ScopeError) -> Self {
            Failure::Scope(e)
        }
    }

    impl From<i32> for Failure {
        fn from(code: i32) -> Self {
            Failure::Code(code)
        }
    }

    fn mixed(log: &Log) -> Result<i32, Failure> {
        let mut stack = ScopeStack::new();
        let scope = stack.enter_scope();
        stack.defer_fn(scope, || note(log, "a:1".into()))?;
        stack.errdefer_fn(scope, || note(log, "b:2".into()))?;
        stack.defer_fn(scope, || note(log, "c:3".into()))?;
        stack.errdefer_fn(scope, || note(log, "d:4".into()))?;
        scoped_return_err!(stack, -1);
    }

    #[test]
    fn test_return_err_runs_everything() {
        let log = Log::default();
        assert_eq!(mixed(&log), Err(Failure::Code(-1)));
        assert_eq!(*log.borrow(), ["d:4", "c:3", "b:2", "a:1"]);
    }
}
