//! Error type for scope-stack operations.

use thiserror::Error;

use crate::scope::ScopeId;

/// Failure of a scope-stack primitive.
///
/// None of these are raised by user-level error returns: an error-return is a
/// flag that changes which cleanups run, never a fault of the mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// The handle refers to a scope that has already been closed.
    #[error("scope {0} is no longer live")]
    StaleScope(ScopeId),

    /// The sentinel root scope cannot hold cleanups and is never closed.
    #[error("the root scope cannot be registered on or closed")]
    RootScope,

    /// A live scope sits above the one being closed or unwound from.
    #[error("scope {scope} is not innermost (innermost is {innermost})")]
    NotInnermost { scope: ScopeId, innermost: ScopeId },

    /// An unwind target must be an ancestor of (or equal to) its start.
    #[error("scope {target} is not an ancestor of {from}")]
    NotAncestor { from: ScopeId, target: ScopeId },

    /// `break` issued with no loop or switch active.
    #[error("break outside of any loop or switch")]
    NoEnclosingConstruct,

    /// `continue` issued with no loop active (switches do not count).
    #[error("continue outside of any loop")]
    NoEnclosingLoop,

    /// `pop_loop_or_switch` with nothing pushed.
    #[error("no loop or switch to pop")]
    NoConstruct,

    /// Storage for a cleanup record could not be allocated; nothing was registered.
    #[error("cannot allocate storage for a cleanup action")]
    Exhausted,
}
