//! File system operations: exclusion matching and tree copying.

pub mod copier;
pub mod matcher;

pub use copier::TreeCopier;
pub use matcher::PathMatcher;
