//! Per-node type computation.
//!
//! `Tree::tpe` and `TypeTree::to_type` are lazy and memoized write-once: a
//! successful computation is cached and every later call returns the same
//! shared term; a failed computation is not cached and may be retried.

use once_cell::sync::Lazy;

use tacit_core::Name;
use tacit_types::{Result, Ty, Type, TypeError, TypeLambdaParam};

use crate::symbols::Symbols;
use crate::trees::{
    DeclaredBounds, ParamsClause, Tree, TreeKind, TypeCase, TypeMemberDefinition, TypeTree,
    TypeTreeKind,
};

/// The type constructor applied to sequence-literal element types.
static SEQ: Lazy<Ty> = Lazy::new(|| {
    Ty::package_ref(Name::from_dotted_package("scala.collection.immutable"))
        .select(&Name::simple("Seq").to_type_name())
        .expect("package refs are paths")
});

impl Tree {
    /// The type of this tree, computing and memoizing it on first call.
    pub fn tpe(&self, symbols: &Symbols) -> Result<Ty> {
        if let Some(cached) = self.tpe.get() {
            return Ok(cached.clone());
        }
        let computed = self.calculate_type(symbols)?;
        Ok(self.tpe.get_or_init(|| computed).clone())
    }

    fn calculate_type(&self, symbols: &Symbols) -> Result<Ty> {
        match self.kind() {
            // Definitions and imports carry no type of their own.
            TreeKind::PackageDef { .. }
            | TreeKind::Import { .. }
            | TreeKind::Export { .. }
            | TreeKind::ImportSelector { .. }
            | TreeKind::ClassDef { .. }
            | TreeKind::Template { .. }
            | TreeKind::ValDef { .. }
            | TreeKind::DefDef { .. }
            | TreeKind::TypeMember { .. }
            | TreeKind::TypeParam { .. }
            | TreeKind::Bind { .. }
            | TreeKind::Empty => Ok(Ty::no_type()),

            TreeKind::Apply { fun, .. } => {
                let widened = fun.tpe(symbols)?.widen_overloads(symbols)?;
                match &*widened {
                    Type::Method(meth) => Ok(meth.result.clone()),
                    _ => Err(TypeError::NonMethodReference(widened.to_string())),
                }
            }
            TreeKind::TypeApply { fun, .. } => {
                let widened = fun.tpe(symbols)?.widen_overloads(symbols)?;
                match &*widened {
                    Type::Poly(poly) => Ok(poly.result.clone()),
                    _ => Err(TypeError::NonMethodReference(widened.to_string())),
                }
            }
            TreeKind::Select { qualifier, name } => qualifier.tpe(symbols)?.select(name),
            TreeKind::SelectIn { name, owner, .. } => owner.select_in(name, owner),
            TreeKind::If {
                then_part,
                else_part,
                ..
            }
            | TreeKind::InlineIf {
                then_part,
                else_part,
                ..
            } => Ok(Ty::or(then_part.tpe(symbols)?, else_part.tpe(symbols)?)),
            TreeKind::Match { cases, .. } | TreeKind::InlineMatch { cases, .. } => {
                join(cases.iter().map(|c| c.tpe(symbols)))
            }
            TreeKind::Try { expr, cases, .. } => join(
                std::iter::once(expr.tpe(symbols)).chain(cases.iter().map(|c| c.tpe(symbols))),
            ),
            TreeKind::This { qualifier } => {
                let qual = qualifier.to_type(symbols)?;
                match &*qual {
                    Type::PackageTypeRef(name) => Ok(Ty::package_ref(name.clone())),
                    Type::PackageRef(_) => Ok(qual),
                    _ => Ok(Ty::this_type(qual)),
                }
            }
            TreeKind::Throw { .. } | TreeKind::Return { .. } => Ok(Ty::nothing()),
            TreeKind::While { .. } | TreeKind::Assign { .. } => Ok(Ty::unit()),
            TreeKind::Literal { constant } => Ok(Ty::constant(constant.clone())),
            TreeKind::Inlined { expr, .. } => expr.tpe(symbols),
            TreeKind::Lambda { tpt, .. } => match tpt {
                Some(tpt) => tpt.to_type(symbols),
                None => Err(TypeError::Unsupported {
                    node: "Lambda without a type tree",
                    span: self.span,
                }),
            },
            TreeKind::New { tpt } | TreeKind::Typed { tpt, .. } => tpt.to_type(symbols),
            TreeKind::NamedArg { arg, .. } => arg.tpe(symbols),
            TreeKind::Block { expr, .. } => expr.tpe(symbols),
            TreeKind::CaseDef { body, .. } => body.tpe(symbols),
            TreeKind::SeqLiteral { elem_tpt, .. } => {
                Ok(Ty::applied(SEQ.clone(), vec![elem_tpt.to_type(symbols)?]))
            }
            TreeKind::FreeIdent { tpe, .. } | TreeKind::Ident { tpe, .. } => Ok(tpe.clone()),
            TreeKind::ReferencedPackage { name } => Ok(Ty::package_ref(name.clone())),

            TreeKind::Super { .. } => Err(TypeError::Unsupported {
                node: "Super",
                span: self.span,
            }),
            TreeKind::ImportIdent { .. } => Err(TypeError::Unsupported {
                node: "ImportIdent",
                span: self.span,
            }),
            TreeKind::Unapply { .. } => Err(TypeError::Unsupported {
                node: "Unapply",
                span: self.span,
            }),
            TreeKind::Alternative { .. } => Err(TypeError::Unsupported {
                node: "Alternative",
                span: self.span,
            }),
        }
    }
}

/// Joins branch types as a right-folded `Or`, without normalization. An empty
/// join is `Nothing`.
fn join(types: impl Iterator<Item = Result<Ty>>) -> Result<Ty> {
    let mut acc: Option<Ty> = None;
    for ty in types {
        let ty = ty?;
        acc = Some(match acc {
            None => ty,
            Some(prev) => Ty::or(prev, ty),
        });
    }
    Ok(acc.unwrap_or_else(Ty::nothing))
}

impl TypeTree {
    /// Projects this type tree to a type, computing and memoizing on first
    /// call.
    pub fn to_type(&self, symbols: &Symbols) -> Result<Ty> {
        if let Some(cached) = self.tpe.get() {
            return Ok(cached.clone());
        }
        let computed = self.calculate(symbols)?;
        Ok(self.tpe.get_or_init(|| computed).clone())
    }

    fn calculate(&self, symbols: &Symbols) -> Result<Ty> {
        match self.kind() {
            TypeTreeKind::Ident { tpe, .. } | TypeTreeKind::Wrapper { tpe } => Ok(tpe.clone()),
            TypeTreeKind::TermSelect { qualifier, name } => {
                let name = name.clone().to_type_name();
                qualifier.tpe(symbols)?.select(&name)
            }
            TypeTreeKind::TypeSelect { qualifier, name } => {
                let name = name.clone().to_type_name();
                qualifier.to_type(symbols)?.select(&name)
            }
            TypeTreeKind::Applied { tycon, args } => {
                let tycon = tycon.to_type(symbols)?;
                let args = args
                    .iter()
                    .map(|arg| arg.to_type(symbols))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Ty::applied(tycon, args))
            }
            TypeTreeKind::Refined { base, refinements } => {
                let mut parent = base.to_type(symbols)?;
                for refinement in refinements {
                    let (member, info) = refinement_info(refinement, symbols)?;
                    parent = Ty::refined(parent, member, info);
                }
                Ok(parent)
            }
            TypeTreeKind::ByName { result } => Ok(Ty::by_name(result.to_type(symbols)?)),
            TypeTreeKind::Bounds { lo, hi } => {
                Ok(Ty::bounds(lo.to_type(symbols)?, hi.to_type(symbols)?))
            }
            TypeTreeKind::Lambda { params, body } => {
                let params = params
                    .iter()
                    .map(|param| match param.kind() {
                        TreeKind::TypeParam { name, .. } => Ok(TypeLambdaParam {
                            name: name.clone(),
                            bounds: Ty::bounds_nothing_any(),
                        }),
                        _ => Err(TypeError::Unsupported {
                            node: "TypeLambdaTree with non-TypeParam parameter",
                            span: param.span,
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                let body = body.to_type(symbols)?;
                Ok(Ty::type_lambda(params, |_binder| body))
            }
            TypeTreeKind::Match {
                bound,
                scrutinee,
                cases,
            } => {
                let bound = match bound {
                    Some(tt) => tt.to_type(symbols)?,
                    None => Ty::any(),
                };
                let scrutinee = scrutinee.to_type(symbols)?;
                let cases = cases
                    .iter()
                    .map(|TypeCase { pattern, body }| {
                        Ok(tacit_types::MatchTypeCase {
                            pattern: pattern.to_type(symbols)?,
                            body: body.to_type(symbols)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Ty::match_type(bound, scrutinee, cases))
            }
            TypeTreeKind::Empty => Err(TypeError::Unsupported {
                node: "EmptyTypeTree",
                span: self.span,
            }),
        }
    }
}

/// The `(member, info)` contributed by one refinement statement.
fn refinement_info(refinement: &Tree, symbols: &Symbols) -> Result<(Name, Ty)> {
    match refinement.kind() {
        TreeKind::ValDef { name, tpt, .. } => Ok((name.clone(), tpt.to_type(symbols)?)),
        TreeKind::DefDef {
            name,
            params,
            result_tpt,
            ..
        } => {
            let result = result_tpt.to_type(symbols)?;
            if params.is_empty() {
                return Ok((name.clone(), result));
            }
            let mut info = result;
            for clause in params.iter().rev() {
                match clause {
                    ParamsClause::Term(vals) => {
                        let mut names = Vec::with_capacity(vals.len());
                        let mut types = Vec::with_capacity(vals.len());
                        for val in vals {
                            match val.kind() {
                                TreeKind::ValDef { name, tpt, .. } => {
                                    names.push(name.clone());
                                    types.push(tpt.to_type(symbols)?);
                                }
                                _ => {
                                    return Err(TypeError::Unsupported {
                                        node: "refinement parameter",
                                        span: val.span,
                                    })
                                }
                            }
                        }
                        info = Ty::method(names, types, info);
                    }
                    ParamsClause::Type(_) => {
                        return Err(TypeError::Unsupported {
                            node: "polymorphic refinement member",
                            span: refinement.span,
                        })
                    }
                }
            }
            Ok((name.clone(), info))
        }
        TreeKind::TypeMember { name, rhs, .. } => {
            let info = match rhs {
                TypeMemberDefinition::Alias(tt) => Ty::alias(tt.to_type(symbols)?),
                TypeMemberDefinition::Abstract(DeclaredBounds::Tree(tt)) => tt.to_type(symbols)?,
                TypeMemberDefinition::Abstract(DeclaredBounds::Computed(ty)) => ty.clone(),
            };
            Ok((name.clone(), info))
        }
        _ => Err(TypeError::Unsupported {
            node: "refinement statement",
            span: refinement.span,
        }),
    }
}
