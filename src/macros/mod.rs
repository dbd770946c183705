//! Declarative macros binding the transfers onto native keywords.

// Exported at crate root via #[macro_export]
#[macro_use]
mod keywords;
