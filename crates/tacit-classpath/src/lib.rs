//! The package inventory consumed by the loader.
//!
//! A [`Classpath`] is an immutable, ordered sequence of [`PackageData`]: per
//! package, the class and TASTy payloads found for it. Payload bytes are
//! opaque here; deciding what they mean is the loader's job.

mod ingest;

use std::sync::Arc;

use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// The suffix of the synthetic class holding a package's top-level
/// definitions. Exempt from nested-class filtering.
pub const TOP_LEVEL_SUFFIX: &str = "$package";

/// Whether `name` is the class of a module value (`Foo$`).
pub fn is_module_class_name(name: &str) -> bool {
    name.len() > 1 && name.ends_with('$')
}

/// Whether `name` encodes a nested class: a `$` appears before the final
/// character, once the top-level suffix is set aside.
pub fn is_nested_class_name(name: &str) -> bool {
    let base = name.strip_suffix(TOP_LEVEL_SUFFIX).unwrap_or(name);
    match base.char_indices().last() {
        Some((last, _)) => base[..last].contains('$'),
        None => false,
    }
}

/// One class-file payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassData {
    /// Simple class name, without extension.
    pub name: SmolStr,
    /// Where the payload came from, for diagnostics only.
    pub debug_path: String,
    pub bytes: Arc<[u8]>,
}

/// One TASTy payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TastyData {
    pub name: SmolStr,
    pub debug_path: String,
    pub bytes: Arc<[u8]>,
}

/// All payloads found for one package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageData {
    /// Dotted package path; empty for the root package.
    pub dotted_name: String,
    pub classes: Vec<ClassData>,
    pub tastys: Vec<TastyData>,
}

impl PackageData {
    pub fn new(dotted_name: impl Into<String>) -> Self {
        Self {
            dotted_name: dotted_name.into(),
            classes: Vec::new(),
            tastys: Vec::new(),
        }
    }
}

/// An immutable, ordered package inventory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classpath {
    packages: Vec<PackageData>,
}

impl Classpath {
    pub fn new(packages: Vec<PackageData>) -> Self {
        Self { packages }
    }

    pub fn packages(&self) -> &[PackageData] {
        &self.packages
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Narrows the classpath to the requested `(package, class)` pairs.
    /// Applying the same filter twice yields the same classpath.
    pub fn with_filter(&self, fqns: &[(&str, &str)]) -> Classpath {
        let wanted = |pkg: &str, cls: &str| {
            fqns.iter()
                .any(|(p, c)| *p == pkg && *c == cls)
        };
        let packages = self
            .packages
            .iter()
            .filter_map(|pkg| {
                let classes: Vec<ClassData> = pkg
                    .classes
                    .iter()
                    .filter(|c| wanted(&pkg.dotted_name, &c.name))
                    .cloned()
                    .collect();
                let tastys: Vec<TastyData> = pkg
                    .tastys
                    .iter()
                    .filter(|t| wanted(&pkg.dotted_name, &t.name))
                    .cloned()
                    .collect();
                if classes.is_empty() && tastys.is_empty() {
                    None
                } else {
                    Some(PackageData {
                        dotted_name: pkg.dotted_name.clone(),
                        classes,
                        tastys,
                    })
                }
            })
            .collect();
        Classpath { packages }
    }
}
