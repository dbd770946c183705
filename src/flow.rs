//! Structured helpers - scopes around closures, with return, error-return,
//! break and continue carried as values.
//!
//! Control flow cannot escape a closure, so bodies report it instead:
//! `Err` from a body is an error-return, [`Signal::Break`] and
//! [`Signal::Continue`] ask the enclosing loop helper to transfer.

use crate::scope::ScopeId;
use crate::stack::ScopeStack;
use crate::ScopeError;

/// What a [`ScopeStack::for_each`] body asks the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal<T> {
    /// The body finished; its scope closes normally.
    Value(T),
    /// Close the body's scopes and start the next item.
    Continue,
    /// Close the body's scopes and stop iterating.
    Break,
}

impl<T> Signal<T> {
    /// Transform a finished body's payload; jumps pass through unchanged.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Signal<U> {
        match self {
            Signal::Value(v) => Signal::Value(f(v)),
            Signal::Continue => Signal::Continue,
            Signal::Break => Signal::Break,
        }
    }

    /// True for `Continue` and `Break`.
    #[inline]
    pub fn is_control_flow(&self) -> bool {
        !matches!(self, Signal::Value(_))
    }

    /// Payload of a finished body; `None` for a jump.
    #[inline]
    pub fn value(self) -> Option<T> {
        match self {
            Signal::Value(v) => Some(v),
            Signal::Continue | Signal::Break => None,
        }
    }
}

/// Run `body` as one function activation with its own scope stack.
///
/// The body receives the stack and the function's outermost scope. However
/// it leaves - falling off the end, an early `return`, or `?` - every scope
/// still live is unwound: `Ok` as a normal return, `Err` as an error-return,
/// which also fires the error-conditional cleanups of every live scope.
///
/// # Examples
///
/// ```
/// use scope_defer::activation;
/// use std::cell::RefCell;
///
/// let log = RefCell::new(Vec::new());
/// let result: Result<i32, &str> = activation(|stack, scope| {
///     stack.defer_fn(scope, || log.borrow_mut().push("release")).unwrap();
///     stack.errdefer_fn(scope, || log.borrow_mut().push("rollback")).unwrap();
///     Err("failed")
/// });
///
/// assert_eq!(result, Err("failed"));
/// assert_eq!(*log.borrow(), ["rollback", "release"]);
/// ```
pub fn activation<'a, T, E, F>(body: F) -> Result<T, E>
where
    F: FnOnce(&mut ScopeStack<'a>, ScopeId) -> Result<T, E>,
{
    let mut stack = ScopeStack::new();
    let entry = stack.enter_scope();
    let result = body(&mut stack, entry);

    let from = stack.top();
    let unwound = match &result {
        Ok(_) => stack.return_unwind(from),
        Err(_) => stack.error_return_unwind(from),
    };
    if let Err(e) = unwound {
        log::warn!("activation exit unwind failed: {}", e);
    }
    result
}

impl<'a> ScopeStack<'a> {
    /// Run `body` inside a fresh scope.
    ///
    /// `Ok` closes the scope normally, together with anything the body left
    /// open above it. `Err` marks all of those scopes errored and closes
    /// them, so their error-conditional cleanups roll back before the error
    /// propagates.
    pub fn block<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self, ScopeId) -> Result<T, E>,
    {
        let scope = self.enter_scope();
        match body(self, scope) {
            Ok(value) => {
                self.close_through(scope);
                Ok(value)
            }
            Err(e) => {
                self.rollback_through(scope);
                Err(e)
            }
        }
    }

    /// Loop over `iter`, giving each iteration its own body scope.
    ///
    /// The body's [`Signal`] picks the transfer: `Value` closes the body scope
    /// normally, `Continue` and `Break` close every scope the iteration opened,
    /// running unconditional cleanups only. Both target this loop even when
    /// the body left a switch or inner loop pushed. `Err` rolls back the body
    /// scope and propagates. Returns the number of iterations that were entered.
    pub fn for_each<I, E, F>(&mut self, iter: I, body: F) -> Result<usize, E>
    where
        I: IntoIterator,
        E: From<ScopeError>,
        F: FnMut(&mut Self, ScopeId, I::Item) -> Result<Signal<()>, E>,
    {
        let constructs = self.constructs.len();
        let target = self.top();
        self.push_loop();
        let result = self.run_loop(target, iter, body);
        self.constructs.truncate(constructs);
        result
    }

    fn run_loop<I, E, F>(&mut self, target: ScopeId, iter: I, mut body: F) -> Result<usize, E>
    where
        I: IntoIterator,
        E: From<ScopeError>,
        F: FnMut(&mut Self, ScopeId, I::Item) -> Result<Signal<()>, E>,
    {
        let mut entered = 0;
        for item in iter {
            entered += 1;
            let scope = self.enter_scope();
            let signal = match body(self, scope, item) {
                Ok(signal) => signal,
                Err(e) => {
                    self.rollback_through(scope);
                    return Err(e);
                }
            };
            let from = self.top();
            match signal {
                Signal::Value(()) => {
                    self.close_through(scope);
                }
                Signal::Continue => {
                    self.unwind_to(from, Some(target))?;
                }
                Signal::Break => {
                    self.unwind_to(from, Some(target))?;
                    break;
                }
            }
        }
        Ok(entered)
    }
}
