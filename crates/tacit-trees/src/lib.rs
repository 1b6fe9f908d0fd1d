//! The typed tree model and the symbol table.
//!
//! Trees are immutable after construction except for two one-shot slots: the
//! memoized type on every node, and the symbol-to-defining-tree back-pointer.
//! Symbols live in an arena owned by [`symbols::Symbols`] and are referenced
//! everywhere by [`tacit_core::SymbolId`], so trees and symbols can point at
//! each other without ownership cycles.

pub mod symbols;
pub mod trees;

mod tpe;


pub use symbols::{SymbolError, SymbolKind, Symbols};
pub use trees::{
    DeclaredBounds, ParamsClause, Parent, Tree, TreeKind, TreeRef, TypeCase, TypeMemberDefinition,
    TypeTree, TypeTreeKind, TypeTreeRef,
};
