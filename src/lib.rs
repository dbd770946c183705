//! scope-defer - scoped deferred cleanup with defer/errdefer
//!
//! # Overview
//!
//! Cleanups registered against a scope run automatically, newest first, when
//! the scope is exited: by falling off its end, by a function return, or by a
//! `break`/`continue` out of an enclosing loop or switch. Error-conditional
//! cleanups (`errdefer`) only run when the function unwinds through an
//! error-return, giving rollback-only semantics next to always-run release.
//!
//! Every primitive takes an explicit [`ScopeId`]; one [`ScopeStack`] belongs to
//! one function activation.
//!
//! # Quick Start
//!
//! ```
//! use scope_defer::activation;
//! use std::cell::RefCell;
//!
//! let log = RefCell::new(Vec::new());
//! let result: Result<i32, &str> = activation(|stack, scope| {
//!     stack.defer_fn(scope, || log.borrow_mut().push("close file")).unwrap();
//!     stack.errdefer_fn(scope, || log.borrow_mut().push("delete partial output")).unwrap();
//!     Ok(42)
//! });
//!
//! assert_eq!(result, Ok(42));
//! assert_eq!(*log.borrow(), ["close file"]);
//! ```
//!
//! # Primitives
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | [`ScopeStack::enter_scope`] | New scope, child of the current top |
//! | [`ScopeStack::register_cleanup`] | Callback over an aliased argument, `Always` or `OnError` |
//! | [`ScopeStack::close_scope`] | Normal block exit |
//! | [`ScopeStack::unwind_to`] | Close scopes up to (excluding) a target |
//! | [`ScopeStack::mark_error`] | Flag a scope errored (monotonic) |
//! | [`ScopeStack::push_loop_or_switch`] | Shadow the break/continue targets |
//! | [`ScopeStack::pop_loop_or_switch`] | Restore the enclosing targets |
//!
//! ## Transfers
//!
//! | Transfer | Method | Macro |
//! |----------|--------|-------|
//! | return | [`ScopeStack::return_unwind`] | [`scoped_return!`] |
//! | error-return | [`ScopeStack::error_return_unwind`] | [`scoped_return_err!`] |
//! | break | [`ScopeStack::break_unwind`] | [`scoped_break!`] |
//! | continue | [`ScopeStack::continue_unwind`] | [`scoped_continue!`] |
//! | fallthrough | [`ScopeStack::fallthrough`] | - |
//!
//! `break` stops at the innermost loop *or* switch; `continue` always goes to
//! the innermost loop, closing any switch scopes on the way.
//!
//! ## Closures
//!
//! | Helper | Description |
//! |--------|-------------|
//! | [`activation`] | Function body; `Ok` returns, `Err` error-returns |
//! | [`ScopeStack::block`] | Scope around a closure; `Err` rolls it back |
//! | [`ScopeStack::for_each`] | Loop with a body scope per iteration, driven by [`Signal`] |
//!
//! # Features
//!
//! - `std` (default): without it the crate is `no_std` and needs `alloc`.
//! - `serde`: `Serialize`/`Deserialize` for [`ExitReport`], [`Unwound`],
//!   [`When`] and [`ConstructKind`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

// ============================================================
// Modules
// ============================================================

mod action;
mod error;
mod exit;
mod flow;
mod macros;
mod scope;
mod stack;
mod transfer;

// ============================================================
// Re-exports
// ============================================================

pub use action::{CleanupAction, When};
pub use error::ScopeError;
pub use exit::{ExitReport, Unwound};
pub use flow::{activation, Signal};
pub use scope::ScopeId;
pub use stack::{ConstructKind, ScopeStack};

// ============================================================
// Type aliases
// ============================================================

/// Result type alias.
///
/// - `Result<T>` = `core::result::Result<T, ScopeError>`
/// - `Result<T, E>` = any other error type
pub type Result<T, E = ScopeError> = core::result::Result<T, E>;
