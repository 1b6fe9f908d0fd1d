//! The ambient context handed to consumers: symbol table, loader, and the
//! decoder collaborators, behind one entry point.

use tacit_classpath::Classpath;
use tacit_core::{Name, SymbolId};
use tacit_trees::{Symbols, TreeRef};

use crate::decode::{Classfiles, DefaultClassfiles, NoTastySupport, TastyFormat};
use crate::loader::Loader;
use crate::LoaderError;

pub struct Context {
    symbols: Symbols,
    loader: Loader,
    classfiles: Box<dyn Classfiles>,
    tasty: Box<dyn TastyFormat>,
}

impl Context {
    /// A context with the default class-file collaborator and no TASTy
    /// decoder. Suitable for plain JVM classpaths.
    pub fn new(classpath: Classpath) -> Context {
        Context::with_decoders(
            classpath,
            Box::new(DefaultClassfiles),
            Box::new(NoTastySupport),
        )
    }

    pub fn with_decoders(
        classpath: Classpath,
        classfiles: Box<dyn Classfiles>,
        tasty: Box<dyn TastyFormat>,
    ) -> Context {
        Context {
            symbols: Symbols::new(),
            loader: Loader::new(classpath),
            classfiles,
            tasty,
        }
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Builds the package inventory; a no-op after the first call.
    pub fn init_packages(&mut self) {
        self.loader.init_packages(&mut self.symbols);
    }

    /// Walks `path` from the root package, scanning packages and class roots
    /// on demand. Returns `None` when a segment does not resolve — including
    /// for roots whose earlier scan failed and consumed their entry.
    pub fn find_symbol(&mut self, path: &[Name]) -> Result<Option<SymbolId>, LoaderError> {
        self.loader.init_packages(&mut self.symbols);
        let mut cur = Symbols::ROOT_PACKAGE;
        for segment in path {
            if self.symbols.is_package(cur) {
                self.loader.scan_package(&mut self.symbols, cur)?;
            }
            let Some(next) = self.symbols.member(cur, segment) else {
                return Ok(None);
            };
            if self.loader.has_entry(next) {
                self.loader
                    .scan_class(&mut self.symbols, next, &*self.classfiles, &*self.tasty)?;
            }
            cur = next;
        }
        Ok(Some(cur))
    }

    /// Convenience lookup of a top-level class by dotted package path and
    /// simple name.
    pub fn find_class(
        &mut self,
        package: &str,
        class: &str,
    ) -> Result<Option<SymbolId>, LoaderError> {
        let mut path: Vec<Name> = Name::from_dotted_package(package)
            .path_segments()
            .into_iter()
            .map(Name::Simple)
            .collect();
        path.push(Name::simple(class).to_type_name());
        self.find_symbol(&path)
    }

    /// The top-level trees recorded for an initialised root.
    pub fn top_level_tasty(&self, cls: SymbolId) -> Option<&[TreeRef]> {
        self.loader.top_level_tasty(&self.symbols, cls)
    }
}
