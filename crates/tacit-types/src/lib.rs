//! The Tacit type algebra.
//!
//! Types are immutable terms shared behind [`Ty`] handles. Construction is
//! single-threaded (driven by the loader), but a fully-built forest is safe to
//! read from multiple threads: the only interior slots are one-shot
//! [`OnceCell`]s. Structural constants (`Any`, `Nothing`, `Unit`, the
//! `Nothing..Any` bounds) are process-wide singletons, so equality on them
//! reduces to pointer identity.

pub mod constant;
pub mod error;
mod format;

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use once_cell::sync::{Lazy, OnceCell};

use tacit_core::{Name, SymbolId};

pub use constant::Constant;
pub use error::{Result, TypeError};

/// A shared, immutable type term.
#[derive(Clone)]
pub struct Ty(Arc<Type>);

impl Ty {
    pub fn new(ty: Type) -> Ty {
        Ty(Arc::new(ty))
    }

    /// Pointer identity: whether two handles share one term.
    pub fn same(a: &Ty, b: &Ty) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for Ty {
    type Target = Type;

    fn deref(&self) -> &Type {
        &self.0
    }
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        Ty::same(self, other) || *self.0 == *other.0
    }
}

impl Eq for Ty {}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

/// What a `TypeRef` points at: a bare name to be found in the prefix, or an
/// already-known symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Designator {
    Name(Name),
    Symbol { id: SymbolId, name: Name },
}

impl Designator {
    pub fn name(&self) -> &Name {
        match self {
            Designator::Name(name) => name,
            Designator::Symbol { name, .. } => name,
        }
    }

    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            Designator::Name(_) => None,
            Designator::Symbol { id, .. } => Some(*id),
        }
    }
}

/// A term-member reference. The `underlying` slot caches the declared type of
/// the referenced member once it has been resolved; it does not take part in
/// equality.
#[derive(Debug)]
pub struct TermRef {
    pub prefix: Ty,
    pub name: Name,
    underlying: OnceCell<Ty>,
}

impl TermRef {
    pub fn resolved(&self) -> Option<&Ty> {
        self.underlying.get()
    }
}

impl PartialEq for TermRef {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix && self.name == other.name
    }
}

impl Eq for TermRef {}

/// A type-member reference.
#[derive(Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub prefix: Ty,
    pub designator: Designator,
}

impl TypeRef {
    pub fn name(&self) -> &Name {
        self.designator.name()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MethodType {
    pub param_names: Vec<Name>,
    pub param_types: Vec<Ty>,
    pub result: Ty,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PolyType {
    pub param_names: Vec<Name>,
    /// One bounds term (`Type::Bounds`) per parameter.
    pub param_bounds: Vec<Ty>,
    pub result: Ty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeLambdaParam {
    pub name: Name,
    pub bounds: Ty,
}

/// A type-level lambda. The result slot is filled right after allocation (see
/// [`Ty::type_lambda`]) so that the result may reference its binder through
/// [`Type::ParamRef`].
#[derive(Debug)]
pub struct TypeLambda {
    pub params: Vec<TypeLambdaParam>,
    result: OnceCell<Ty>,
}

impl TypeLambda {
    /// The lambda's result type. Panics only if the lambda escaped its
    /// constructor half-built, which [`Ty::type_lambda`] prevents.
    pub fn result_type(&self) -> &Ty {
        self.result.get().expect("type lambda result not installed")
    }
}

impl PartialEq for TypeLambda {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && self.result.get() == other.result.get()
    }
}

impl Eq for TypeLambda {}

/// A weak back-reference from a `ParamRef` to its binding lambda. Compares by
/// binder identity.
#[derive(Clone)]
pub struct LambdaRef(Weak<Type>);

impl LambdaRef {
    pub fn upgrade(&self) -> Option<Ty> {
        self.0.upgrade().map(Ty)
    }
}

impl PartialEq for LambdaRef {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for LambdaRef {}

impl fmt::Debug for LambdaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LambdaRef(..)")
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MatchTypeCase {
    pub pattern: Ty,
    pub body: Ty,
}

#[derive(Debug, PartialEq, Eq)]
pub struct MatchType {
    pub bound: Ty,
    pub scrutinee: Ty,
    pub cases: Vec<MatchTypeCase>,
}

/// A type term.
///
/// Terms are never mutated after construction; the `TermRef` resolution cache
/// and the `TypeLambda` result slot are one-shot and invisible to equality.
#[derive(Debug, PartialEq, Eq)]
pub enum Type {
    /// Absence of a type (definitions, the empty tree).
    NoType,
    /// The empty prefix of a root reference.
    NoPrefix,
    Any,
    Nothing,
    Unit,
    /// The type of a literal.
    Constant(Constant),
    /// A reference to a package, by fully-qualified name.
    PackageRef(Name),
    /// A type-namespace reference that denotes a package.
    PackageTypeRef(Name),
    TermRef(TermRef),
    TypeRef(TypeRef),
    /// The `C.this` type; wraps a `TypeRef`.
    This(Ty),
    Applied {
        tycon: Ty,
        args: Vec<Ty>,
    },
    And(Ty, Ty),
    Or(Ty, Ty),
    Refined {
        parent: Ty,
        member: Name,
        info: Ty,
    },
    /// A type alias `= target`, as the info of an aliased member.
    Alias(Ty),
    /// Real bounds `>: lo <: hi`.
    Bounds {
        lo: Ty,
        hi: Ty,
    },
    /// A by-name parameter type `=> result`.
    ByName(Ty),
    Method(MethodType),
    Poly(PolyType),
    Lambda(TypeLambda),
    /// A reference to a parameter of an enclosing type lambda.
    ParamRef {
        binder: LambdaRef,
        index: usize,
    },
    Match(MatchType),
}

static NO_TYPE: Lazy<Ty> = Lazy::new(|| Ty::new(Type::NoType));
static NO_PREFIX: Lazy<Ty> = Lazy::new(|| Ty::new(Type::NoPrefix));
static ANY: Lazy<Ty> = Lazy::new(|| Ty::new(Type::Any));
static NOTHING: Lazy<Ty> = Lazy::new(|| Ty::new(Type::Nothing));
static UNIT: Lazy<Ty> = Lazy::new(|| Ty::new(Type::Unit));
static NOTHING_ANY: Lazy<Ty> = Lazy::new(|| {
    Ty::new(Type::Bounds {
        lo: Ty::nothing(),
        hi: Ty::any(),
    })
});

impl Ty {
    pub fn no_type() -> Ty {
        NO_TYPE.clone()
    }

    pub fn no_prefix() -> Ty {
        NO_PREFIX.clone()
    }

    pub fn any() -> Ty {
        ANY.clone()
    }

    pub fn nothing() -> Ty {
        NOTHING.clone()
    }

    pub fn unit() -> Ty {
        UNIT.clone()
    }

    /// The shared `>: Nothing <: Any` bounds term.
    pub fn bounds_nothing_any() -> Ty {
        NOTHING_ANY.clone()
    }

    pub fn constant(value: Constant) -> Ty {
        Ty::new(Type::Constant(value))
    }

    pub fn package_ref(name: Name) -> Ty {
        Ty::new(Type::PackageRef(name))
    }

    pub fn package_type_ref(name: Name) -> Ty {
        Ty::new(Type::PackageTypeRef(name))
    }

    pub fn term_ref(prefix: Ty, name: Name) -> Ty {
        Ty::new(Type::TermRef(TermRef {
            prefix,
            name,
            underlying: OnceCell::new(),
        }))
    }

    /// A term reference whose declared type is already known (decoders use
    /// this when the referenced symbol is at hand).
    pub fn term_ref_resolved(prefix: Ty, name: Name, underlying: Ty) -> Ty {
        let cell = OnceCell::new();
        let _ = cell.set(underlying);
        Ty::new(Type::TermRef(TermRef {
            prefix,
            name,
            underlying: cell,
        }))
    }

    pub fn type_ref(prefix: Ty, name: Name) -> Ty {
        Ty::new(Type::TypeRef(TypeRef {
            prefix,
            designator: Designator::Name(name),
        }))
    }

    pub fn type_ref_symbol(prefix: Ty, id: SymbolId, name: Name) -> Ty {
        Ty::new(Type::TypeRef(TypeRef {
            prefix,
            designator: Designator::Symbol { id, name },
        }))
    }

    pub fn this_type(type_ref: Ty) -> Ty {
        Ty::new(Type::This(type_ref))
    }

    pub fn applied(tycon: Ty, args: Vec<Ty>) -> Ty {
        Ty::new(Type::Applied { tycon, args })
    }

    pub fn and(first: Ty, second: Ty) -> Ty {
        Ty::new(Type::And(first, second))
    }

    pub fn or(first: Ty, second: Ty) -> Ty {
        Ty::new(Type::Or(first, second))
    }

    pub fn refined(parent: Ty, member: Name, info: Ty) -> Ty {
        Ty::new(Type::Refined {
            parent,
            member,
            info,
        })
    }

    pub fn alias(target: Ty) -> Ty {
        Ty::new(Type::Alias(target))
    }

    pub fn bounds(lo: Ty, hi: Ty) -> Ty {
        Ty::new(Type::Bounds { lo, hi })
    }

    pub fn by_name(result: Ty) -> Ty {
        Ty::new(Type::ByName(result))
    }

    pub fn method(param_names: Vec<Name>, param_types: Vec<Ty>, result: Ty) -> Ty {
        Ty::new(Type::Method(MethodType {
            param_names,
            param_types,
            result,
        }))
    }

    pub fn poly(param_names: Vec<Name>, param_bounds: Vec<Ty>, result: Ty) -> Ty {
        Ty::new(Type::Poly(PolyType {
            param_names,
            param_bounds,
            result,
        }))
    }

    /// Allocates a type lambda, then computes its result with a handle to the
    /// freshly-allocated binder so the result may contain [`Type::ParamRef`]s
    /// pointing back at it.
    pub fn type_lambda(
        params: Vec<TypeLambdaParam>,
        mk_result: impl FnOnce(&Ty) -> Ty,
    ) -> Ty {
        let lambda = Ty::new(Type::Lambda(TypeLambda {
            params,
            result: OnceCell::new(),
        }));
        let result = mk_result(&lambda);
        match &*lambda {
            Type::Lambda(data) => {
                let _ = data.result.set(result);
            }
            _ => unreachable!(),
        }
        lambda
    }

    /// A reference to parameter `index` of `binder`, which must be a
    /// [`Type::Lambda`].
    pub fn param_ref(binder: &Ty, index: usize) -> Ty {
        debug_assert!(matches!(&**binder, Type::Lambda(_)));
        Ty::new(Type::ParamRef {
            binder: LambdaRef(Arc::downgrade(&binder.0)),
            index,
        })
    }

    pub fn match_type(bound: Ty, scrutinee: Ty, cases: Vec<MatchTypeCase>) -> Ty {
        Ty::new(Type::Match(MatchType {
            bound,
            scrutinee,
            cases,
        }))
    }
}

impl Type {
    /// Whether this type is a stable path usable as a selection prefix.
    pub fn is_path(&self) -> bool {
        matches!(
            self,
            Type::NoPrefix
                | Type::PackageRef(_)
                | Type::PackageTypeRef(_)
                | Type::TermRef(_)
                | Type::TypeRef(_)
                | Type::This(_)
        )
    }

    pub fn is_no_type(&self) -> bool {
        matches!(self, Type::NoType)
    }

    /// For a `ParamRef`, the name of the referenced lambda parameter.
    pub fn param_name(&self) -> Option<Name> {
        match self {
            Type::ParamRef { binder, index } => {
                let lambda = binder.upgrade()?;
                match &*lambda {
                    Type::Lambda(data) => data.params.get(*index).map(|p| p.name.clone()),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Declared-type lookup for term members, implemented by the symbol table.
///
/// A signed name matches only the overload carrying the same signature; a
/// simple name matches every overload sharing that base name.
pub trait TermLookup {
    fn member_types(&self, prefix: &Ty, name: &Name) -> Vec<Ty>;
}

/// A lookup that resolves nothing. Useful for operating on forests whose
/// references were fully resolved at construction time.
pub struct NoLookup;

impl TermLookup for NoLookup {
    fn member_types(&self, _prefix: &Ty, _name: &Name) -> Vec<Ty> {
        Vec::new()
    }
}

impl Ty {
    /// Selection of `name` from this type, which must be a path. The result
    /// is a `TypeRef` for type-namespace names and a `TermRef` otherwise.
    pub fn select(&self, name: &Name) -> Result<Ty> {
        if !self.is_path() {
            return Err(TypeError::BadSelection {
                qualifier: self.to_string(),
                name: name.clone(),
            });
        }
        if name.is_type_name() {
            Ok(Ty::type_ref(self.clone(), name.clone()))
        } else {
            Ok(Ty::term_ref(self.clone(), name.clone()))
        }
    }

    /// Like [`Ty::select`], but for a signed name with an explicit declaring
    /// owner: the reference is anchored at `owner` so overload resolution
    /// happens against the declaring class rather than the dynamic prefix.
    pub fn select_in(&self, name: &Name, owner: &Ty) -> Result<Ty> {
        if !owner.is_path() {
            return Err(TypeError::BadSelection {
                qualifier: owner.to_string(),
                name: name.clone(),
            });
        }
        Ok(Ty::term_ref(owner.clone(), name.clone()))
    }

    /// Resolves a term reference to the declared type of its target,
    /// disambiguating overloads; the identity on everything else, and on
    /// references `lookup` cannot resolve.
    pub fn widen_overloads(&self, lookup: &dyn TermLookup) -> Result<Ty> {
        let Type::TermRef(tref) = &**self else {
            return Ok(self.clone());
        };
        if let Some(underlying) = tref.underlying.get() {
            return Ok(underlying.clone());
        }
        let mut candidates = lookup.member_types(&tref.prefix, &tref.name);
        match candidates.len() {
            0 => Ok(self.clone()),
            1 => {
                let declared = candidates.pop().expect("len checked");
                let _ = tref.underlying.set(declared.clone());
                Ok(declared)
            }
            _ => Err(TypeError::AmbiguousOverload(tref.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pkg(path: &str) -> Ty {
        Ty::package_ref(Name::from_dotted_package(path))
    }

    #[test]
    fn ground_types_are_shared() {
        assert!(Ty::same(&Ty::any(), &Ty::any()));
        assert!(Ty::same(&Ty::bounds_nothing_any(), &Ty::bounds_nothing_any()));
        assert_eq!(
            Ty::bounds_nothing_any(),
            Ty::bounds(Ty::nothing(), Ty::any())
        );
    }

    #[test]
    fn select_builds_refs_by_namespace() {
        let scala = pkg("scala");
        let term = scala.select(&Name::simple("Predef")).unwrap();
        assert!(matches!(&*term, Type::TermRef(_)));

        let ty = scala.select(&Name::simple("Int").to_type_name()).unwrap();
        match &*ty {
            Type::TypeRef(tref) => assert_eq!(tref.name().to_string(), "Int"),
            other => panic!("expected TypeRef, got {other:?}"),
        }
    }

    #[test]
    fn select_rejects_non_paths() {
        let err = Ty::unit().select(&Name::simple("x")).unwrap_err();
        assert!(matches!(err, TypeError::BadSelection { .. }));
    }

    #[test]
    fn select_in_anchors_at_owner() {
        let owner = pkg("p").select(&Name::simple("C").to_type_name()).unwrap();
        let signed = Name::simple("f").signed(
            tacit_core::Signature::new(["scala.Int"], "scala.Int"),
            "f",
        );
        let selected = Ty::unit().select_in(&signed, &owner).unwrap();
        match &*selected {
            Type::TermRef(tref) => assert_eq!(tref.prefix, owner),
            other => panic!("expected TermRef, got {other:?}"),
        }
    }

    struct FixedLookup(Vec<Ty>);

    impl TermLookup for FixedLookup {
        fn member_types(&self, _prefix: &Ty, _name: &Name) -> Vec<Ty> {
            self.0.clone()
        }
    }

    #[test]
    fn widen_is_identity_on_non_references() {
        let unit = Ty::unit();
        assert_eq!(unit.widen_overloads(&NoLookup).unwrap(), unit);
    }

    #[test]
    fn widen_resolves_unique_members_and_caches() {
        let meth = Ty::method(vec![Name::simple("x")], vec![Ty::unit()], Ty::unit());
        let tref = pkg("p").select(&Name::simple("f")).unwrap();
        let lookup = FixedLookup(vec![meth.clone()]);

        let widened = tref.widen_overloads(&lookup).unwrap();
        assert_eq!(widened, meth);

        // Second widening reads the cache, even with an empty lookup.
        let again = tref.widen_overloads(&NoLookup).unwrap();
        assert!(Ty::same(&widened, &again));
    }

    #[test]
    fn widen_surfaces_ambiguous_overloads() {
        let m1 = Ty::method(vec![], vec![], Ty::unit());
        let m2 = Ty::method(vec![], vec![], Ty::any());
        let tref = pkg("p").select(&Name::simple("f")).unwrap();
        let err = tref.widen_overloads(&FixedLookup(vec![m1, m2])).unwrap_err();
        assert!(matches!(err, TypeError::AmbiguousOverload(_)));
    }

    #[test]
    fn widen_is_identity_on_unresolvable_references() {
        let tref = pkg("p").select(&Name::simple("f")).unwrap();
        assert_eq!(tref.widen_overloads(&NoLookup).unwrap(), tref);
    }

    #[test]
    fn type_lambda_result_can_reference_binder() {
        let lambda = Ty::type_lambda(
            vec![TypeLambdaParam {
                name: Name::simple("F").to_type_name(),
                bounds: Ty::bounds_nothing_any(),
            }],
            |binder| Ty::param_ref(binder, 0),
        );
        match &*lambda {
            Type::Lambda(data) => {
                let result = data.result_type();
                assert_eq!(result.param_name().unwrap().to_string(), "F");
            }
            other => panic!("expected Lambda, got {other:?}"),
        }
    }

    #[test]
    fn or_types_are_not_normalized() {
        let a = Ty::unit();
        let joined = Ty::or(a.clone(), a.clone());
        match &*joined {
            Type::Or(lhs, rhs) => {
                assert_eq!(lhs, rhs);
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }
}
