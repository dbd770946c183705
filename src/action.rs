//! Cleanup actions - a callback plus the condition under which it runs.

use alloc::boxed::Box;
use core::fmt;

/// When a registered cleanup runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum When {
    /// `defer` - runs on every exit path.
    Always,
    /// `errdefer` - runs only when the owning scope is errored.
    OnError,
}

impl When {
    /// Whether an action with this condition runs when its scope closes.
    #[inline]
    pub fn applies(self, errored: bool) -> bool {
        match self {
            When::Always => true,
            When::OnError => errored,
        }
    }
}

/// A registered cleanup.
///
/// The argument is captured inside the callback as a shared borrow, so it is
/// an alias of caller storage rather than a snapshot: whatever the storage
/// holds when the action runs is what the callback sees.
pub struct CleanupAction<'a> {
    callback: Box<dyn FnOnce() + 'a>,
    when: When,
}

impl<'a> CleanupAction<'a> {
    /// Bind `callback` to an aliased argument.
    #[inline]
    pub fn new<A, F>(callback: F, arg: &'a A, when: When) -> Self
    where
        A: ?Sized,
        F: FnOnce(&A) + 'a,
    {
        Self::from_fn(move || callback(arg), when)
    }

    /// Wrap a closure that captures whatever it needs.
    #[inline]
    pub fn from_fn<F>(callback: F, when: When) -> Self
    where
        F: FnOnce() + 'a,
    {
        Self {
            callback: Box::new(callback),
            when,
        }
    }

    #[inline]
    pub fn when(&self) -> When {
        self.when
    }

    /// Run the callback if it applies, consuming the action either way.
    /// Returns whether it ran.
    #[inline]
    pub(crate) fn fire(self, errored: bool) -> bool {
        if self.when.applies(errored) {
            (self.callback)();
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for CleanupAction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupAction")
            .field("when", &self.when)
            .finish_non_exhaustive()
    }
}
