//! The symbol table: an arena of named, owned declarations.
//!
//! Symbols are addressed by [`SymbolId`]; slot 0 is the `NoSymbol` sentinel
//! and slot 1 the root package. Owner chains terminate at the root package.
//! Three slots are one-shot: the defining-tree back-pointer, the declared
//! type, and the `initialised` flag.

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use thiserror::Error;

use tacit_core::{Name, SymbolId};
use tacit_types::{Designator, TermLookup, Ty, Type};

use crate::trees::TreeRef;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("{owner} already declares a symbol named {name}")]
    AlreadyDeclared { owner: String, name: Name },
    #[error("defining tree already set for {0:?}")]
    TreeAlreadySet(SymbolId),
    #[error("declared type already set for {0:?}")]
    DeclaredTypeAlreadySet(SymbolId),
    #[error("symbol {0:?} is already initialised")]
    AlreadyInitialised(SymbolId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// The `NoSymbol` sentinel.
    None,
    /// A package; members are sub-packages and class symbols.
    Package,
    /// A class; populated when its root is scanned.
    Class {
        outer: SymbolId,
        /// Whether the class is directly owned by a package (i.e. is a root).
        in_package: bool,
    },
    /// Vals, defs, type members, type params, binds.
    Regular,
}

struct SymbolData {
    name: Name,
    owner: SymbolId,
    kind: SymbolKind,
    initialised: bool,
    members: HashMap<Name, SymbolId>,
    declared: OnceCell<Ty>,
    tree: OnceCell<TreeRef>,
}

impl SymbolData {
    fn new(name: Name, owner: SymbolId, kind: SymbolKind) -> Self {
        Self {
            name,
            owner,
            kind,
            initialised: false,
            members: HashMap::new(),
            declared: OnceCell::new(),
            tree: OnceCell::new(),
        }
    }
}

/// The arena of all symbols known to one loading session.
pub struct Symbols {
    data: Vec<SymbolData>,
}

impl Symbols {
    pub const NONE: SymbolId = SymbolId::from_raw(0);
    pub const ROOT_PACKAGE: SymbolId = SymbolId::from_raw(1);

    pub fn new() -> Self {
        let mut data = Vec::new();
        data.push(SymbolData::new(Name::empty(), Self::NONE, SymbolKind::None));
        data.push(SymbolData::new(
            Name::empty(),
            Self::NONE,
            SymbolKind::Package,
        ));
        Self { data }
    }

    fn get(&self, sym: SymbolId) -> &SymbolData {
        &self.data[sym.idx()]
    }

    fn get_mut(&mut self, sym: SymbolId) -> &mut SymbolData {
        &mut self.data[sym.idx()]
    }

    pub fn name(&self, sym: SymbolId) -> &Name {
        &self.get(sym).name
    }

    pub fn owner(&self, sym: SymbolId) -> SymbolId {
        self.get(sym).owner
    }

    pub fn kind(&self, sym: SymbolId) -> SymbolKind {
        self.get(sym).kind
    }

    pub fn is_package(&self, sym: SymbolId) -> bool {
        matches!(self.get(sym).kind, SymbolKind::Package)
    }

    pub fn is_class(&self, sym: SymbolId) -> bool {
        matches!(self.get(sym).kind, SymbolKind::Class { .. })
    }

    /// Whether `sym` is a root: a class symbol directly owned by a package.
    pub fn is_root(&self, sym: SymbolId) -> bool {
        matches!(self.get(sym).kind, SymbolKind::Class { in_package, .. } if in_package)
    }

    pub fn is_initialised(&self, sym: SymbolId) -> bool {
        self.get(sym).initialised
    }

    /// Flips the `initialised` latch; it may only ever transition once.
    pub fn mark_initialised(&mut self, sym: SymbolId) -> Result<(), SymbolError> {
        let data = self.get_mut(sym);
        if data.initialised {
            return Err(SymbolError::AlreadyInitialised(sym));
        }
        data.initialised = true;
        Ok(())
    }

    pub fn member(&self, owner: SymbolId, name: &Name) -> Option<SymbolId> {
        self.get(owner).members.get(name).copied()
    }

    pub fn members(&self, owner: SymbolId) -> impl Iterator<Item = (&Name, SymbolId)> {
        self.get(owner).members.iter().map(|(n, s)| (n, *s))
    }

    /// One-shot link from a symbol to its defining tree.
    pub fn set_tree(&self, sym: SymbolId, tree: TreeRef) -> Result<(), SymbolError> {
        self.get(sym)
            .tree
            .set(tree)
            .map_err(|_| SymbolError::TreeAlreadySet(sym))
    }

    pub fn tree_of(&self, sym: SymbolId) -> Option<&TreeRef> {
        self.get(sym).tree.get()
    }

    /// One-shot declared type of a regular symbol.
    pub fn set_declared_type(&self, sym: SymbolId, ty: Ty) -> Result<(), SymbolError> {
        self.get(sym)
            .declared
            .set(ty)
            .map_err(|_| SymbolError::DeclaredTypeAlreadySet(sym))
    }

    pub fn declared_type(&self, sym: SymbolId) -> Option<Ty> {
        self.get(sym).declared.get().cloned()
    }

    fn insert(
        &mut self,
        name: Name,
        owner: SymbolId,
        kind: SymbolKind,
    ) -> Result<SymbolId, SymbolError> {
        if self.get(owner).members.contains_key(&name) {
            return Err(SymbolError::AlreadyDeclared {
                owner: self.display_name(owner),
                name,
            });
        }
        let id = SymbolId::from_raw(self.data.len() as u32);
        self.data.push(SymbolData::new(name.clone(), owner, kind));
        self.get_mut(owner).members.insert(name, id);
        Ok(id)
    }

    /// Creates a regular symbol; fails if `owner` already declares `name`.
    pub fn create_symbol(&mut self, name: Name, owner: SymbolId) -> Result<SymbolId, SymbolError> {
        self.insert(name, owner, SymbolKind::Regular)
    }

    /// Creates a class symbol; fails if `owner` already declares `name`.
    /// `name` is expected to live in the type namespace.
    pub fn create_class_symbol(
        &mut self,
        name: Name,
        owner: SymbolId,
    ) -> Result<SymbolId, SymbolError> {
        let in_package = self.is_package(owner);
        self.insert(
            name,
            owner,
            SymbolKind::Class {
                outer: owner,
                in_package,
            },
        )
    }

    /// Creates a package symbol under `parent`, or returns the existing one.
    /// `name` is a simple segment name.
    pub fn create_package_symbol_if_new(&mut self, name: Name, parent: SymbolId) -> SymbolId {
        if let Some(existing) = self.member(parent, &name) {
            return existing;
        }
        self.insert(name, parent, SymbolKind::Package)
            .expect("absence just checked")
    }

    /// Enters the three symbols of a top-level root named `name` in package
    /// `pkg`: the term object symbol, the object-class symbol, and the class
    /// symbol proper (which is returned). All three are created or none.
    pub fn enter_root(&mut self, pkg: SymbolId, name: &str) -> Result<SymbolId, SymbolError> {
        let term = Name::simple(name);
        let object_class = term.clone().with_object_suffix().to_type_name();
        let class = term.clone().to_type_name();

        for candidate in [&term, &object_class, &class] {
            if self.get(pkg).members.contains_key(candidate) {
                return Err(SymbolError::AlreadyDeclared {
                    owner: self.display_name(pkg),
                    name: candidate.clone(),
                });
            }
        }

        self.create_symbol(term, pkg).expect("absence just checked");
        self.create_class_symbol(object_class, pkg)
            .expect("absence just checked");
        self.create_class_symbol(class, pkg)
    }

    /// The fully-qualified name of a package symbol (empty for the root).
    pub fn full_package_name(&self, sym: SymbolId) -> Name {
        let mut segments: Vec<Name> = Vec::new();
        let mut cur = sym;
        while cur != Self::ROOT_PACKAGE && cur != Self::NONE {
            segments.push(self.get(cur).name.clone());
            cur = self.get(cur).owner;
        }
        segments.reverse();
        let mut iter = segments.into_iter();
        let Some(first) = iter.next() else {
            return Name::empty();
        };
        iter.fold(first, |acc, seg| {
            Name::Qualified {
                tag: tacit_core::QualifiedTag::Package,
                prefix: Box::new(acc),
                suffix: smol_str_of(&seg),
            }
        })
    }

    fn display_name(&self, sym: SymbolId) -> String {
        if sym == Self::ROOT_PACKAGE {
            "<root>".to_string()
        } else {
            self.get(sym).name.to_string()
        }
    }

    /// Resolves a path type to the symbol it denotes, if the chain is loaded.
    pub fn resolve_path(&self, ty: &Ty) -> Option<SymbolId> {
        match &**ty {
            Type::NoPrefix => Some(Self::ROOT_PACKAGE),
            Type::PackageRef(name) | Type::PackageTypeRef(name) => self.find_package(name),
            Type::TypeRef(tref) => match &tref.designator {
                Designator::Symbol { id, .. } => Some(*id),
                Designator::Name(name) => {
                    let owner = self.resolve_path(&tref.prefix)?;
                    self.member(owner, name)
                }
            },
            Type::TermRef(tref) => {
                let owner = self.resolve_path(&tref.prefix)?;
                self.member(owner, &tref.name)
            }
            Type::This(inner) => self.resolve_path(inner),
            _ => None,
        }
    }

    /// Finds the package symbol for a (possibly qualified) package name.
    pub fn find_package(&self, name: &Name) -> Option<SymbolId> {
        let mut cur = Self::ROOT_PACKAGE;
        for segment in name.path_segments() {
            let next = self.member(cur, &Name::Simple(segment))?;
            if !self.is_package(next) {
                return None;
            }
            cur = next;
        }
        Some(cur)
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self::new()
    }
}

impl TermLookup for Symbols {
    fn member_types(&self, prefix: &Ty, name: &Name) -> Vec<Ty> {
        let Some(owner) = self.resolve_path(prefix) else {
            return Vec::new();
        };
        if let Some(sym) = self.member(owner, name) {
            return self.declared_type(sym).into_iter().collect();
        }
        // A simple name matches every signed overload sharing that base.
        self.get(owner)
            .members
            .iter()
            .filter(|(member_name, _)| match member_name {
                Name::Signed { base, .. } => **base == *name,
                _ => false,
            })
            .filter_map(|(_, sym)| self.declared_type(*sym))
            .collect()
    }
}

fn smol_str_of(name: &Name) -> smol_str::SmolStr {
    match name {
        Name::Simple(text) => text.clone(),
        other => smol_str::SmolStr::new(other.to_string()),
    }
}
