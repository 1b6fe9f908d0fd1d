//! Structured names.
//!
//! Names are immutable trees rather than flat strings: a qualified name keeps
//! its prefix, a signed name keeps the signature that disambiguates an
//! overload, and a type-namespace name wraps the corresponding term name.
//! Simple-name text is backed by [`smol_str::SmolStr`], which stores short
//! strings inline.

use std::fmt;

use smol_str::SmolStr;

/// Separator tag for [`Name::Qualified`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QualifiedTag {
    /// `prefix.suffix`: selection of a member from a stable prefix.
    Member,
    /// `prefix.suffix` where the prefix is a package path.
    Package,
    /// `prefix$$suffix`: a compiler-expanded name.
    Expanded,
}

impl QualifiedTag {
    pub fn separator(self) -> &'static str {
        match self {
            QualifiedTag::Member | QualifiedTag::Package => ".",
            QualifiedTag::Expanded => "$$",
        }
    }
}

/// Suffix tag for [`Name::Suffixed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SuffixTag {
    /// The trailing `$` that marks the class of a module value.
    ObjectClass,
}

/// An overload-disambiguating signature: erased parameter type names plus the
/// erased result type name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<SmolStr>,
    pub result: SmolStr,
}

impl Signature {
    pub fn new(
        params: impl IntoIterator<Item = impl Into<SmolStr>>,
        result: impl Into<SmolStr>,
    ) -> Self {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            result: result.into(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            f.write_str(p)?;
        }
        write!(f, "){}", self.result)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

/// A structured identifier.
///
/// Term names and type names share this representation; a name belongs to the
/// type namespace iff its outermost constructor is [`Name::Type`]. Equality
/// and hashing are structural.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// A plain identifier.
    Simple(SmolStr),
    /// A name qualified by a prefix name, e.g. a package path segment.
    Qualified {
        tag: QualifiedTag,
        prefix: Box<Name>,
        suffix: SmolStr,
    },
    /// A name carrying the signature that picks one overload of `base`.
    Signed {
        base: Box<Name>,
        signature: Signature,
        /// The name actually targeted after resolution; usually equal to the
        /// rendering of `base`.
        target: SmolStr,
    },
    /// A compiler-synthesized unique name, rendered `{underlying}{prefix}{index}`.
    Unique {
        prefix: SmolStr,
        underlying: Box<Name>,
        index: u32,
    },
    /// A name with a structural suffix marker (the object-class `$`).
    Suffixed { tag: SuffixTag, base: Box<Name> },
    /// A marker lifting a term name into the type namespace.
    Type(Box<Name>),
}

impl Name {
    pub fn simple(text: impl Into<SmolStr>) -> Name {
        Name::Simple(text.into())
    }

    /// The empty term name (used e.g. by given selectors).
    pub fn empty() -> Name {
        Name::Simple(SmolStr::default())
    }

    /// The wildcard name `_`.
    pub fn wildcard() -> Name {
        Name::Simple(SmolStr::new_static("_"))
    }

    /// Builds the package name for a dotted path such as `a.b.c`.
    ///
    /// The result is a left-associated [`Name::Qualified`] chain; the empty
    /// string yields the empty name (the root package).
    pub fn from_dotted_package(path: &str) -> Name {
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let Some(first) = segments.next() else {
            return Name::empty();
        };
        let mut name = Name::simple(first);
        for seg in segments {
            name = Name::Qualified {
                tag: QualifiedTag::Package,
                prefix: Box::new(name),
                suffix: SmolStr::new(seg),
            };
        }
        name
    }

    /// Selection: `self.suffix`, as used when a member is picked off a path.
    pub fn select(&self, suffix: impl Into<SmolStr>) -> Name {
        Name::Qualified {
            tag: QualifiedTag::Member,
            prefix: Box::new(self.clone()),
            suffix: suffix.into(),
        }
    }

    pub fn signed(self, signature: Signature, target: impl Into<SmolStr>) -> Name {
        Name::Signed {
            base: Box::new(self),
            signature,
            target: target.into(),
        }
    }

    /// Wraps this name with the object-class suffix marker.
    pub fn with_object_suffix(self) -> Name {
        Name::Suffixed {
            tag: SuffixTag::ObjectClass,
            base: Box::new(self),
        }
    }

    /// Lifts this name into the type namespace. Idempotent.
    pub fn to_type_name(self) -> Name {
        match self {
            n @ Name::Type(_) => n,
            n => Name::Type(Box::new(n)),
        }
    }

    /// Drops a type-namespace wrapper, if any.
    pub fn to_term_name(self) -> Name {
        match self {
            Name::Type(inner) => *inner,
            n => n,
        }
    }

    pub fn is_type_name(&self) -> bool {
        matches!(self, Name::Type(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Name::Simple(text) => text.is_empty(),
            Name::Type(inner) => inner.is_empty(),
            _ => false,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        match self {
            Name::Simple(text) => text == "_",
            Name::Type(inner) => inner.is_wildcard(),
            _ => false,
        }
    }

    /// Whether this name (term or type namespace) carries the object-class
    /// suffix marker.
    pub fn is_object_class(&self) -> bool {
        match self {
            Name::Suffixed {
                tag: SuffixTag::ObjectClass,
                ..
            } => true,
            Name::Type(inner) => inner.is_object_class(),
            _ => false,
        }
    }

    /// The final path component, as a simple name.
    pub fn last(&self) -> Name {
        match self {
            Name::Simple(_) => self.clone(),
            Name::Qualified { suffix, .. } => Name::Simple(suffix.clone()),
            Name::Signed { base, .. } => base.last(),
            Name::Unique { underlying, .. } => underlying.last(),
            Name::Suffixed { base, .. } => base.last(),
            Name::Type(inner) => inner.last(),
        }
    }

    /// Left-associative prefix expansion of a package path: for `a.b.c`,
    /// yields `[a, a.b, a.b.c]`. A simple name yields itself.
    pub fn subnames(&self) -> Vec<Name> {
        match self {
            Name::Qualified {
                tag: QualifiedTag::Package,
                prefix,
                ..
            } => {
                let mut out = prefix.subnames();
                out.push(self.clone());
                out
            }
            n => vec![n.clone()],
        }
    }

    /// The dotted path components of a package-qualified name.
    pub fn path_segments(&self) -> Vec<SmolStr> {
        match self {
            Name::Simple(text) => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text.clone()]
                }
            }
            Name::Qualified { prefix, suffix, .. } => {
                let mut out = prefix.path_segments();
                out.push(suffix.clone());
                out
            }
            Name::Signed { base, .. } => base.path_segments(),
            Name::Unique { .. } | Name::Suffixed { .. } => vec![SmolStr::new(self.to_string())],
            Name::Type(inner) => inner.path_segments(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Simple(text) => f.write_str(text),
            Name::Qualified {
                tag,
                prefix,
                suffix,
            } => write!(f, "{prefix}{}{suffix}", tag.separator()),
            Name::Signed { base, .. } => write!(f, "{base}"),
            Name::Unique {
                prefix,
                underlying,
                index,
            } => write!(f, "{underlying}{prefix}{index}"),
            Name::Suffixed {
                tag: SuffixTag::ObjectClass,
                base,
            } => write!(f, "{base}$"),
            Name::Type(inner) => write!(f, "{inner}"),
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_type_name() {
            write!(f, "TypeName({self})")
        } else {
            write!(f, "Name({self})")
        }
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::simple(value)
    }
}
