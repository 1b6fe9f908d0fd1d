//! Collaborator interfaces and the glue decoders build through.
//!
//! The TASTy byte decoder and the legacy-pickle decoder are external
//! collaborators: the loader hands them payload bytes and a [`RootScope`],
//! and they hand back trees while populating symbols through the scope. The
//! class-file side has a real default implementation built on
//! [`tacit_classfile`].

use thiserror::Error;

use tacit_classfile::descriptor::{self, BaseType, FieldType};
use tacit_classfile::{ClassKind, Structure};
use tacit_classpath::{ClassData, TastyData};
use tacit_core::{Name, Signature, SymbolId};
use tacit_types::Ty;
use tacit_trees::{SymbolError, Symbols, TreeRef};

use crate::loader::LoadRoot;

/// An error produced by a decoder collaborator, propagated verbatim.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DecodeError(String);

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<SymbolError> for DecodeError {
    fn from(value: SymbolError) -> Self {
        Self(value.to_string())
    }
}

impl From<tacit_classfile::Error> for DecodeError {
    fn from(value: tacit_classfile::Error) -> Self {
        Self(value.to_string())
    }
}

/// The surface through which a decoder populates one root's symbols.
///
/// A scope can only be constructed under a [`LoadRoot`] capability, which the
/// loader mints inside a class scan; nothing else can install a root context.
pub struct RootScope<'a> {
    symbols: &'a mut Symbols,
    root: SymbolId,
    _token: &'a LoadRoot,
}

impl<'a> RootScope<'a> {
    pub(crate) fn new(symbols: &'a mut Symbols, root: SymbolId, token: &'a LoadRoot) -> Self {
        Self {
            symbols,
            root,
            _token: token,
        }
    }

    /// The class symbol being loaded.
    pub fn root(&self) -> SymbolId {
        self.root
    }

    pub fn symbols(&self) -> &Symbols {
        self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut Symbols {
        self.symbols
    }

    /// Links a definition tree to its symbol (one-shot).
    pub fn register_def(&mut self, tree: &TreeRef) -> Result<(), SymbolError> {
        let Some(symbol) = tree.symbol() else {
            return Ok(());
        };
        self.symbols.set_tree(symbol, tree.clone())
    }

    /// Marks the root as initialised; flips the latch exactly once.
    pub fn mark_root_initialised(&mut self) -> Result<(), SymbolError> {
        self.symbols.mark_initialised(self.root)
    }
}

/// Class-file parsing collaborator.
pub trait Classfiles {
    fn read_kind(&self, class: &ClassData) -> Result<ClassKind, DecodeError>;

    /// Loads a legacy-pickled class; must leave the root initialised.
    fn load_scala2_class(
        &self,
        scope: &mut RootScope<'_>,
        structure: &Structure,
        runtime_annot_start: Option<usize>,
    ) -> Result<(), DecodeError>;

    /// Loads a plain JVM class; must leave the root initialised.
    fn load_java_class(
        &self,
        scope: &mut RootScope<'_>,
        structure: &Structure,
        signature: Option<&str>,
    ) -> Result<(), DecodeError>;
}

/// TASTy decoding collaborator: opens a payload into a two-stage unpickler.
pub trait TastyFormat {
    fn open(&self, tasty: &TastyData) -> Result<Box<dyn TastyFile>, DecodeError>;
}

/// The staged unpickler for one TASTy payload: the position section must be
/// consumed before the tree section.
pub trait TastyFile {
    fn unpickle_positions(&mut self) -> Result<(), DecodeError>;

    fn unpickle_trees(&mut self, scope: &mut RootScope<'_>) -> Result<Vec<TreeRef>, DecodeError>;
}

/// The default class-file collaborator, backed by [`tacit_classfile`].
#[derive(Debug, Default)]
pub struct DefaultClassfiles;

impl Classfiles for DefaultClassfiles {
    fn read_kind(&self, class: &ClassData) -> Result<ClassKind, DecodeError> {
        Ok(tacit_classfile::read_kind(&class.bytes)?)
    }

    fn load_scala2_class(
        &self,
        scope: &mut RootScope<'_>,
        structure: &Structure,
        _runtime_annot_start: Option<usize>,
    ) -> Result<(), DecodeError> {
        // Legacy pickles are not decoded here; the root becomes an opaque,
        // member-less class.
        tracing::debug!(class = %structure.binary_name, "legacy pickle left opaque");
        scope.mark_root_initialised()?;
        Ok(())
    }

    fn load_java_class(
        &self,
        scope: &mut RootScope<'_>,
        structure: &Structure,
        _signature: Option<&str>,
    ) -> Result<(), DecodeError> {
        let root = scope.root();
        for field in &structure.fields {
            let ty = field_type_to_ty(&descriptor::parse_field_descriptor(&field.descriptor)?);
            let sym = scope
                .symbols_mut()
                .create_symbol(Name::simple(field.name.as_str()), root)?;
            scope
                .symbols()
                .set_declared_type(sym, ty)
                .map_err(DecodeError::from)?;
        }
        for method in &structure.methods {
            let desc = descriptor::parse_method_descriptor(&method.descriptor)?;
            let name = Name::simple(method.name.as_str()).signed(
                descriptor_signature(&desc),
                method.name.as_str(),
            );
            let param_names: Vec<Name> = (0..desc.params.len())
                .map(|i| Name::simple(format!("x${i}")))
                .collect();
            let param_types: Vec<Ty> = desc.params.iter().map(field_type_to_ty).collect();
            let result = desc
                .result
                .as_ref()
                .map(field_type_to_ty)
                .unwrap_or_else(Ty::unit);
            let sym = scope.symbols_mut().create_symbol(name, root)?;
            scope
                .symbols()
                .set_declared_type(sym, Ty::method(param_names, param_types, result))
                .map_err(DecodeError::from)?;
        }
        scope.mark_root_initialised()?;
        Ok(())
    }
}

/// A TASTy collaborator for classpaths that are expected to carry none.
#[derive(Debug, Default)]
pub struct NoTastySupport;

impl TastyFormat for NoTastySupport {
    fn open(&self, tasty: &TastyData) -> Result<Box<dyn TastyFile>, DecodeError> {
        Err(DecodeError::new(format!(
            "no TASTy decoder installed (payload {})",
            tasty.debug_path
        )))
    }
}

fn scala_type(name: &str) -> Ty {
    Ty::package_ref(Name::simple("scala"))
        .select(&Name::simple(name).to_type_name())
        .expect("package refs are paths")
}

fn field_type_to_ty(ft: &FieldType) -> Ty {
    match ft {
        FieldType::Base(base) => scala_type(match base {
            BaseType::Byte => "Byte",
            BaseType::Char => "Char",
            BaseType::Double => "Double",
            BaseType::Float => "Float",
            BaseType::Int => "Int",
            BaseType::Long => "Long",
            BaseType::Short => "Short",
            BaseType::Boolean => "Boolean",
        }),
        FieldType::Object(internal) => {
            let binary = internal.replace('/', ".");
            match binary.rsplit_once('.') {
                Some((pkg, cls)) => Ty::package_ref(Name::from_dotted_package(pkg))
                    .select(&Name::simple(cls).to_type_name())
                    .expect("package refs are paths"),
                None => Ty::type_ref(Ty::no_prefix(), Name::simple(binary).to_type_name()),
            }
        }
        FieldType::Array(elem) => Ty::applied(scala_type("Array"), vec![field_type_to_ty(elem)]),
    }
}

fn descriptor_signature(desc: &descriptor::MethodDescriptor) -> Signature {
    let params = desc.params.iter().map(erased_name);
    let result = desc
        .result
        .as_ref()
        .map(erased_name)
        .unwrap_or_else(|| "scala.Unit".into());
    Signature::new(params, result)
}

fn erased_name(ft: &FieldType) -> smol_str::SmolStr {
    match ft {
        FieldType::Base(base) => match base {
            BaseType::Byte => "scala.Byte".into(),
            BaseType::Char => "scala.Char".into(),
            BaseType::Double => "scala.Double".into(),
            BaseType::Float => "scala.Float".into(),
            BaseType::Int => "scala.Int".into(),
            BaseType::Long => "scala.Long".into(),
            BaseType::Short => "scala.Short".into(),
            BaseType::Boolean => "scala.Boolean".into(),
        },
        FieldType::Object(internal) => internal.replace('/', ".").into(),
        FieldType::Array(elem) => format!("{}[]", erased_name(elem)).into(),
    }
}
