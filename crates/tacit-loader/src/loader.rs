//! The loader: package inventory, root registration, and demand-driven class
//! scanning, with at-most-once discipline on every step.

use std::collections::{HashMap, HashSet};

use tacit_classfile::ClassKind;
use tacit_classpath::{
    is_module_class_name, is_nested_class_name, ClassData, Classpath, PackageData, TastyData,
};
use tacit_core::{Name, SymbolId};
use tacit_trees::{Symbols, TreeRef};

use crate::decode::{Classfiles, RootScope, TastyFormat};
use crate::LoaderError;

/// Capability required to install a root context.
///
/// Only [`Loader::scan_class`] can mint one, so any API that mutates a root's
/// symbols (via [`RootScope`]) is statically confined to a class scan.
pub struct LoadRoot {
    _private: (),
}

impl LoadRoot {
    fn acquire() -> LoadRoot {
        LoadRoot { _private: () }
    }
}

/// The backing bytes available for one registered root.
#[derive(Clone, Debug)]
pub enum Entry {
    ClassAndTasty { class: ClassData, tasty: TastyData },
    TastyOnly { tasty: TastyData },
    ClassOnly { class: ClassData },
}

/// Owns the classpath and the per-root loading state.
pub struct Loader {
    classpath: Classpath,
    searched: bool,
    packages: HashMap<SymbolId, Vec<PackageData>>,
    lookup: HashMap<SymbolId, Entry>,
    top_level_tastys: HashMap<SymbolId, Vec<TreeRef>>,
    package_names: HashMap<String, Name>,
}

impl Loader {
    pub fn new(classpath: Classpath) -> Self {
        Self {
            classpath,
            searched: false,
            packages: HashMap::new(),
            lookup: HashMap::new(),
            top_level_tastys: HashMap::new(),
            package_names: HashMap::new(),
        }
    }

    /// The interning cache for package names: equal dotted paths collapse to
    /// one structural name.
    pub fn to_package_name(&mut self, dotted: &str) -> Name {
        if let Some(name) = self.package_names.get(dotted) {
            return name.clone();
        }
        let name = Name::from_dotted_package(dotted);
        self.package_names
            .insert(dotted.to_string(), name.clone());
        name
    }

    /// Builds the package inventory: one symbol per package segment, with the
    /// loader remembering which `PackageData` feeds each package. A no-op
    /// after its first completion.
    pub fn init_packages(&mut self, symbols: &mut Symbols) {
        if self.searched {
            return;
        }
        self.searched = true;
        let datas: Vec<PackageData> = self.classpath.packages().to_vec();
        tracing::debug!(packages = datas.len(), "building package inventory");
        for data in datas {
            let name = self.to_package_name(&data.dotted_name);
            let mut cur = Symbols::ROOT_PACKAGE;
            for segment in name.path_segments() {
                cur = symbols.create_package_symbol_if_new(Name::Simple(segment), cur);
            }
            self.packages.entry(cur).or_default().push(data);
        }
    }

    /// Whether `init_packages` has completed.
    pub fn searched(&self) -> bool {
        self.searched
    }

    /// Registers placeholder roots for every top-level class of `pkg`.
    /// Removing the package from the map on entry makes this at-most-once; a
    /// second call is a no-op.
    pub fn scan_package(
        &mut self,
        symbols: &mut Symbols,
        pkg: SymbolId,
    ) -> Result<(), LoaderError> {
        let Some(datas) = self.packages.remove(&pkg) else {
            return Ok(());
        };
        tracing::debug!(package = %symbols.full_package_name(pkg), "scanning package");
        for data in datas {
            let class_names: HashSet<&str> =
                data.classes.iter().map(|c| c.name.as_str()).collect();
            for class in &data.classes {
                if is_nested_class_name(&class.name) || is_module_class_name(&class.name) {
                    continue;
                }
                let Some(root) = self.enter_root_once(symbols, pkg, &class.name)? else {
                    continue;
                };
                let entry = match data.tastys.iter().find(|t| t.name == class.name) {
                    Some(tasty) => Entry::ClassAndTasty {
                        class: class.clone(),
                        tasty: tasty.clone(),
                    },
                    None => Entry::ClassOnly {
                        class: class.clone(),
                    },
                };
                self.lookup.insert(root, entry);
            }
            for tasty in &data.tastys {
                if class_names.contains(tasty.name.as_str()) {
                    continue;
                }
                if is_nested_class_name(&tasty.name) || is_module_class_name(&tasty.name) {
                    continue;
                }
                let Some(root) = self.enter_root_once(symbols, pkg, &tasty.name)? else {
                    continue;
                };
                self.lookup.insert(
                    root,
                    Entry::TastyOnly {
                        tasty: tasty.clone(),
                    },
                );
            }
        }
        symbols.mark_initialised(pkg)?;
        Ok(())
    }

    /// Enters a root unless an earlier classpath entry already claimed the
    /// name (first entry wins).
    fn enter_root_once(
        &mut self,
        symbols: &mut Symbols,
        pkg: SymbolId,
        name: &str,
    ) -> Result<Option<SymbolId>, LoaderError> {
        if symbols
            .member(pkg, &Name::simple(name).to_type_name())
            .is_some()
        {
            tracing::trace!(class = name, "shadowed by an earlier classpath entry");
            return Ok(None);
        }
        Ok(Some(symbols.enter_root(pkg, name)?))
    }

    /// Inspects the backing bytes of `cls` and dispatches to the appropriate
    /// decoder. Returns whether the scan produced top-level trees. The entry
    /// is consumed on dispatch, so duplicate calls short-circuit — and a
    /// failed scan leaves the root permanently uninitialised.
    pub fn scan_class(
        &mut self,
        symbols: &mut Symbols,
        cls: SymbolId,
        classfiles: &dyn Classfiles,
        tasty: &dyn TastyFormat,
    ) -> Result<bool, LoaderError> {
        let Some(entry) = self.lookup.remove(&cls) else {
            return Ok(false);
        };
        let token = LoadRoot::acquire();
        let (class, companion) = match entry {
            Entry::TastyOnly { tasty: data } => {
                return self.unpickle(symbols, cls, &data, tasty, &token);
            }
            Entry::ClassAndTasty { class, tasty } => (class, Some(tasty)),
            Entry::ClassOnly { class } => (class, None),
        };

        match classfiles.read_kind(&class)? {
            ClassKind::Scala2 {
                structure,
                runtime_annot_start,
            } => {
                tracing::debug!(class = %structure.binary_name, "loading legacy-pickled class");
                let mut scope = RootScope::new(symbols, cls, &token);
                classfiles.load_scala2_class(&mut scope, &structure, runtime_annot_start)?;
                Ok(false)
            }
            ClassKind::Java {
                structure,
                signature,
            } => {
                tracing::debug!(class = %structure.binary_name, "loading JVM class");
                let mut scope = RootScope::new(symbols, cls, &token);
                classfiles.load_java_class(&mut scope, &structure, signature.as_deref())?;
                Ok(false)
            }
            ClassKind::Tasty => match companion {
                Some(data) => self.unpickle(symbols, cls, &data, tasty, &token),
                None => Err(LoaderError::MissingTopLevelTasty(
                    symbols.name(cls).to_string(),
                )),
            },
            ClassKind::Other => Ok(false),
        }
    }

    /// Unpickles a TASTy payload: position section first, then trees. If the
    /// root came out initialised, its top-level trees are recorded.
    fn unpickle(
        &mut self,
        symbols: &mut Symbols,
        cls: SymbolId,
        data: &TastyData,
        tasty: &dyn TastyFormat,
        token: &LoadRoot,
    ) -> Result<bool, LoaderError> {
        tracing::debug!(payload = %data.debug_path, "unpickling TASTy");
        let mut file = tasty.open(data)?;
        file.unpickle_positions()?;
        let trees = {
            let mut scope = RootScope::new(symbols, cls, token);
            file.unpickle_trees(&mut scope)?
        };
        if symbols.is_initialised(cls) {
            self.top_level_tastys.insert(cls, trees);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// The recorded top-level trees for `cls`: available only for an
    /// initialised root that is not the object-class shadow of its companion.
    pub fn top_level_tasty(&self, symbols: &Symbols, cls: SymbolId) -> Option<&[TreeRef]> {
        if !symbols.is_root(cls) || !symbols.is_initialised(cls) {
            return None;
        }
        if symbols.name(cls).is_object_class() {
            return None;
        }
        self.top_level_tastys.get(&cls).map(Vec::as_slice)
    }

    /// Whether `cls` still has a pending, unscanned entry.
    pub fn has_entry(&self, cls: SymbolId) -> bool {
        self.lookup.contains_key(&cls)
    }
}
