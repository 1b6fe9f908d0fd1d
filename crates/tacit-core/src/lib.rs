//! Shared, dependency-minimized core types used across Tacit.

pub mod id;
pub mod name;
pub mod span;

pub use id::SymbolId;
pub use name::{Name, QualifiedTag, Signature, SuffixTag};
pub use span::Span;

/// The current Tacit version.
pub const TACIT_VERSION: &str = env!("CARGO_PKG_VERSION");
