//! Demand-driven loading of compiled roots.
//!
//! A [`Context`] owns the symbol table and a [`Loader`]. The loader builds the
//! package inventory once, registers placeholder class symbols per package on
//! first touch, and inspects a class's backing bytes only when that root is
//! actually requested. Decoders are collaborators behind the traits in
//! [`decode`]; they populate symbols and trees through a [`decode::RootScope`],
//! which can only exist while a class scan holds the [`LoadRoot`] capability.

pub mod context;
pub mod decode;
pub mod loader;

use thiserror::Error;

pub use context::Context;
pub use decode::{Classfiles, DecodeError, DefaultClassfiles, NoTastySupport, RootScope, TastyFile, TastyFormat};
pub use loader::{Entry, LoadRoot, Loader};

use tacit_trees::SymbolError;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// A class file declares a typed AST section, but the classpath carries
    /// no companion TASTy payload for it.
    #[error("class {0} declares a typed AST but has no TASTy payload")]
    MissingTopLevelTasty(String),
    /// A decoder collaborator failed; propagated verbatim.
    #[error(transparent)]
    Decoder(#[from] DecodeError),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
}
