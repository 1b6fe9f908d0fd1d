//! Tree node variants, their child projections, and generic traversals.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use tacit_core::{Name, Span, SymbolId};
use tacit_types::{Constant, Ty};

pub type TreeRef = Arc<Tree>;
pub type TypeTreeRef = Arc<TypeTree>;

/// A template parent: a constructor invocation for parameterized parents, or
/// a bare type tree.
#[derive(Clone, Debug)]
pub enum Parent {
    Term(TreeRef),
    Type(TypeTreeRef),
}

/// One parameter clause of a `DefDef`: either term parameters (`ValDef`s) or
/// type parameters (`TypeParam`s).
#[derive(Clone, Debug)]
pub enum ParamsClause {
    Term(Vec<TreeRef>),
    Type(Vec<TreeRef>),
}

impl ParamsClause {
    pub fn trees(&self) -> &[TreeRef] {
        match self {
            ParamsClause::Term(trees) | ParamsClause::Type(trees) => trees,
        }
    }
}

/// Bounds attached to a type parameter or abstract type member: either still
/// in tree form, or already computed by the decoder.
#[derive(Clone, Debug)]
pub enum DeclaredBounds {
    Tree(TypeTreeRef),
    Computed(Ty),
}

/// The right-hand side of a `TypeMember`.
#[derive(Clone, Debug)]
pub enum TypeMemberDefinition {
    /// `type T = rhs`
    Alias(TypeTreeRef),
    /// `type T >: lo <: hi`
    Abstract(DeclaredBounds),
}

/// One case of a `MatchTypeTree`.
#[derive(Clone, Debug)]
pub struct TypeCase {
    pub pattern: TypeTreeRef,
    pub body: TypeTreeRef,
}

/// A term- or definition-level tree node.
///
/// The node's type is computed lazily by [`Tree::tpe`] and memoized write-once;
/// a failed computation is not cached and may be retried.
pub struct Tree {
    pub span: Span,
    kind: TreeKind,
    pub(crate) tpe: OnceCell<Ty>,
}

impl Tree {
    pub fn new(kind: TreeKind, span: Span) -> TreeRef {
        Arc::new(Tree {
            span,
            kind,
            tpe: OnceCell::new(),
        })
    }

    pub fn kind(&self) -> &TreeKind {
        &self.kind
    }

    /// The defined symbol, for definition nodes.
    pub fn symbol(&self) -> Option<SymbolId> {
        match &self.kind {
            TreeKind::ClassDef { symbol, .. }
            | TreeKind::ValDef { symbol, .. }
            | TreeKind::DefDef { symbol, .. }
            | TreeKind::TypeMember { symbol, .. }
            | TreeKind::TypeParam { symbol, .. }
            | TreeKind::Bind { symbol, .. } => Some(*symbol),
            _ => None,
        }
    }

    /// Direct child trees, in visit order.
    pub fn subtrees(&self) -> Vec<&Tree> {
        let mut out: Vec<&Tree> = Vec::new();
        match &self.kind {
            TreeKind::PackageDef { stats, .. } => push_all(&mut out, stats),
            TreeKind::Import { expr, selectors } | TreeKind::Export { expr, selectors } => {
                out.push(expr);
                push_all(&mut out, selectors);
            }
            TreeKind::ImportSelector {
                imported, renamed, ..
            } => {
                out.push(imported);
                push_opt(&mut out, renamed);
            }
            TreeKind::ClassDef { rhs, .. } => out.push(rhs),
            TreeKind::Template {
                ctor,
                parents,
                self_def,
                body,
            } => {
                out.push(ctor);
                for parent in parents {
                    if let Parent::Term(tree) = parent {
                        out.push(tree);
                    }
                }
                push_opt(&mut out, self_def);
                push_all(&mut out, body);
            }
            TreeKind::ValDef { rhs, .. } => push_opt(&mut out, rhs),
            TreeKind::DefDef { params, rhs, .. } => {
                for clause in params {
                    push_all(&mut out, clause.trees());
                }
                push_opt(&mut out, rhs);
            }
            TreeKind::Select { qualifier, .. }
            | TreeKind::SelectIn { qualifier, .. }
            | TreeKind::Super { qualifier, .. } => out.push(qualifier),
            TreeKind::Apply { fun, args } => {
                out.push(fun);
                push_all(&mut out, args);
            }
            TreeKind::TypeApply { fun, .. } => out.push(fun),
            TreeKind::Typed { expr, .. } => out.push(expr),
            TreeKind::Assign { lhs, rhs } => {
                out.push(lhs);
                out.push(rhs);
            }
            TreeKind::NamedArg { arg, .. } => out.push(arg),
            TreeKind::Block { stats, expr } => {
                push_all(&mut out, stats);
                out.push(expr);
            }
            TreeKind::If {
                cond,
                then_part,
                else_part,
            }
            | TreeKind::InlineIf {
                cond,
                then_part,
                else_part,
            } => {
                out.push(cond);
                out.push(then_part);
                out.push(else_part);
            }
            TreeKind::Lambda { meth, .. } => out.push(meth),
            TreeKind::Match { selector, cases } => {
                out.push(selector);
                push_all(&mut out, cases);
            }
            TreeKind::InlineMatch { selector, cases } => {
                push_opt(&mut out, selector);
                push_all(&mut out, cases);
            }
            TreeKind::CaseDef {
                pattern,
                guard,
                body,
            } => {
                out.push(pattern);
                push_opt(&mut out, guard);
                out.push(body);
            }
            TreeKind::Bind { body, .. } => out.push(body),
            TreeKind::Alternative { trees } => push_all(&mut out, trees),
            TreeKind::Unapply {
                fun,
                implicits,
                patterns,
            } => {
                out.push(fun);
                push_all(&mut out, implicits);
                push_all(&mut out, patterns);
            }
            TreeKind::SeqLiteral { elems, .. } => push_all(&mut out, elems),
            TreeKind::While { cond, body } => {
                out.push(cond);
                out.push(body);
            }
            TreeKind::Throw { expr } => out.push(expr),
            TreeKind::Try {
                expr,
                cases,
                finalizer,
            } => {
                out.push(expr);
                push_all(&mut out, cases);
                push_opt(&mut out, finalizer);
            }
            TreeKind::Return { expr, from } => {
                push_opt(&mut out, expr);
                out.push(from);
            }
            TreeKind::Inlined { expr, bindings, .. } => {
                out.push(expr);
                push_all(&mut out, bindings);
            }
            TreeKind::Literal { .. }
            | TreeKind::New { .. }
            | TreeKind::TypeMember { .. }
            | TreeKind::TypeParam { .. }
            | TreeKind::This { .. }
            | TreeKind::FreeIdent { .. }
            | TreeKind::ImportIdent { .. }
            | TreeKind::Ident { .. }
            | TreeKind::ReferencedPackage { .. }
            | TreeKind::Empty => {}
        }
        out
    }

    /// Direct child type trees, in visit order.
    pub fn type_trees(&self) -> Vec<&TypeTree> {
        let mut out: Vec<&TypeTree> = Vec::new();
        match &self.kind {
            TreeKind::ImportSelector { bound, .. } => push_opt_tt(&mut out, bound),
            TreeKind::Template { parents, .. } => {
                for parent in parents {
                    if let Parent::Type(tt) = parent {
                        out.push(tt);
                    }
                }
            }
            TreeKind::ValDef { tpt, .. } => out.push(tpt),
            TreeKind::DefDef { result_tpt, .. } => out.push(result_tpt),
            TreeKind::TypeApply { args, .. } => push_all_tt(&mut out, args),
            TreeKind::Typed { tpt, .. } | TreeKind::New { tpt } => out.push(tpt),
            TreeKind::Lambda { tpt, .. } => push_opt_tt(&mut out, tpt),
            TreeKind::SeqLiteral { elem_tpt, .. } => out.push(elem_tpt),
            TreeKind::TypeMember { rhs, .. } => match rhs {
                TypeMemberDefinition::Alias(tt)
                | TypeMemberDefinition::Abstract(DeclaredBounds::Tree(tt)) => out.push(tt),
                TypeMemberDefinition::Abstract(DeclaredBounds::Computed(_)) => {}
            },
            TreeKind::TypeParam { bounds, .. } => match bounds {
                DeclaredBounds::Tree(tt) => out.push(tt),
                DeclaredBounds::Computed(_) => {}
            },
            TreeKind::This { qualifier } => out.push(qualifier),
            _ => {}
        }
        out
    }

    /// Pre-order walk: visits this node, then each subtree depth-first in
    /// projection order.
    pub fn walk(&self, op: &mut dyn FnMut(&Tree)) {
        op(self);
        for child in self.subtrees() {
            child.walk(op);
        }
    }

    /// Pre-order fold over the same traversal as [`Tree::walk`].
    pub fn fold<R>(&self, seed: R, op: &mut dyn FnMut(R, &Tree) -> R) -> R {
        let mut acc = op(seed, self);
        for child in self.subtrees() {
            acc = child.fold(acc, op);
        }
        acc
    }

    /// Applies `op` to every type tree discovered at every visited tree,
    /// including type trees nested inside other type trees.
    pub fn walk_type_trees(&self, op: &mut dyn FnMut(&TypeTree)) {
        for tt in self.type_trees() {
            tt.walk(op);
        }
        for child in self.subtrees() {
            child.walk_type_trees(op);
        }
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tree({:?})", self.kind)
    }
}

fn push_all<'a>(out: &mut Vec<&'a Tree>, trees: &'a [TreeRef]) {
    out.extend(trees.iter().map(|t| t.as_ref()));
}

fn push_opt<'a>(out: &mut Vec<&'a Tree>, tree: &'a Option<TreeRef>) {
    if let Some(tree) = tree {
        out.push(tree);
    }
}

fn push_all_tt<'a>(out: &mut Vec<&'a TypeTree>, trees: &'a [TypeTreeRef]) {
    out.extend(trees.iter().map(|t| t.as_ref()));
}

fn push_opt_tt<'a>(out: &mut Vec<&'a TypeTree>, tree: &'a Option<TypeTreeRef>) {
    if let Some(tree) = tree {
        out.push(tree);
    }
}

/// The closed family of term- and definition-level node variants.
#[derive(Debug)]
pub enum TreeKind {
    PackageDef {
        /// The referenced package identifier (not part of the subtree walk).
        pid: TreeRef,
        stats: Vec<TreeRef>,
    },
    Import {
        expr: TreeRef,
        selectors: Vec<TreeRef>,
    },
    Export {
        expr: TreeRef,
        selectors: Vec<TreeRef>,
    },
    ImportSelector {
        imported: TreeRef,
        renamed: Option<TreeRef>,
        bound: Option<TypeTreeRef>,
    },
    ClassDef {
        name: Name,
        /// The class template.
        rhs: TreeRef,
        symbol: SymbolId,
    },
    Template {
        ctor: TreeRef,
        parents: Vec<Parent>,
        self_def: Option<TreeRef>,
        body: Vec<TreeRef>,
    },
    ValDef {
        name: Name,
        tpt: TypeTreeRef,
        rhs: Option<TreeRef>,
        symbol: SymbolId,
    },
    DefDef {
        name: Name,
        params: Vec<ParamsClause>,
        result_tpt: TypeTreeRef,
        rhs: Option<TreeRef>,
        symbol: SymbolId,
    },
    Select {
        qualifier: TreeRef,
        name: Name,
    },
    SelectIn {
        qualifier: TreeRef,
        /// A signed name picking one overload.
        name: Name,
        /// The type of the class that declares the selected member.
        owner: Ty,
    },
    Super {
        qualifier: TreeRef,
        mix: Option<Name>,
    },
    Apply {
        fun: TreeRef,
        args: Vec<TreeRef>,
    },
    TypeApply {
        fun: TreeRef,
        args: Vec<TypeTreeRef>,
    },
    New {
        tpt: TypeTreeRef,
    },
    Typed {
        expr: TreeRef,
        tpt: TypeTreeRef,
    },
    Assign {
        lhs: TreeRef,
        rhs: TreeRef,
    },
    NamedArg {
        name: Name,
        arg: TreeRef,
    },
    Block {
        stats: Vec<TreeRef>,
        expr: TreeRef,
    },
    If {
        cond: TreeRef,
        then_part: TreeRef,
        else_part: TreeRef,
    },
    InlineIf {
        cond: TreeRef,
        then_part: TreeRef,
        else_part: TreeRef,
    },
    Match {
        selector: TreeRef,
        cases: Vec<TreeRef>,
    },
    InlineMatch {
        selector: Option<TreeRef>,
        cases: Vec<TreeRef>,
    },
    Lambda {
        meth: TreeRef,
        tpt: Option<TypeTreeRef>,
    },
    CaseDef {
        pattern: TreeRef,
        guard: Option<TreeRef>,
        body: TreeRef,
    },
    Bind {
        name: Name,
        body: TreeRef,
        symbol: SymbolId,
    },
    Alternative {
        trees: Vec<TreeRef>,
    },
    Unapply {
        fun: TreeRef,
        implicits: Vec<TreeRef>,
        patterns: Vec<TreeRef>,
    },
    SeqLiteral {
        elems: Vec<TreeRef>,
        elem_tpt: TypeTreeRef,
    },
    While {
        cond: TreeRef,
        body: TreeRef,
    },
    Throw {
        expr: TreeRef,
    },
    Try {
        expr: TreeRef,
        cases: Vec<TreeRef>,
        finalizer: Option<TreeRef>,
    },
    Return {
        expr: Option<TreeRef>,
        from: TreeRef,
    },
    Inlined {
        expr: TreeRef,
        caller: Option<Name>,
        bindings: Vec<TreeRef>,
    },
    Literal {
        constant: Constant,
    },
    TypeMember {
        name: Name,
        rhs: TypeMemberDefinition,
        symbol: SymbolId,
    },
    TypeParam {
        name: Name,
        bounds: DeclaredBounds,
        symbol: SymbolId,
    },
    This {
        qualifier: TypeTreeRef,
    },
    /// An identifier whose meaning is external to the current forest.
    FreeIdent {
        name: Name,
        tpe: Ty,
    },
    /// An identifier inside an import selector; has no computable type.
    ImportIdent {
        name: Name,
    },
    /// A term reference by simple name, resolved by the decoder.
    Ident {
        name: Name,
        tpe: Ty,
    },
    /// A reference to a package, by fully-qualified name.
    ReferencedPackage {
        name: Name,
    },
    Empty,
}

/// A tree in type position, projectable to a [`Ty`] via
/// [`TypeTree::to_type`]. The projection is memoized write-once.
pub struct TypeTree {
    pub span: Span,
    kind: TypeTreeKind,
    pub(crate) tpe: OnceCell<Ty>,
}

impl TypeTree {
    pub fn new(kind: TypeTreeKind, span: Span) -> TypeTreeRef {
        Arc::new(TypeTree {
            span,
            kind,
            tpe: OnceCell::new(),
        })
    }

    /// A type identifier resolved against its enclosing prefix.
    pub fn type_ident(name: Name, prefix: Ty, span: Span) -> TypeTreeRef {
        let name = name.to_type_name();
        let tpe = Ty::type_ref(prefix, name.clone());
        TypeTree::new(TypeTreeKind::Ident { name, tpe }, span)
    }

    /// A type identifier with an explicitly supplied type (used e.g. for
    /// package-typed qualifiers of `This`).
    pub fn type_ident_with(name: Name, tpe: Ty, span: Span) -> TypeTreeRef {
        TypeTree::new(TypeTreeKind::Ident { name, tpe }, span)
    }

    pub fn kind(&self) -> &TypeTreeKind {
        &self.kind
    }

    /// Direct child term trees.
    pub fn subtrees(&self) -> Vec<&Tree> {
        let mut out: Vec<&Tree> = Vec::new();
        match &self.kind {
            TypeTreeKind::TermSelect { qualifier, .. } => out.push(qualifier),
            TypeTreeKind::Refined { refinements, .. } => push_all(&mut out, refinements),
            TypeTreeKind::Lambda { params, .. } => push_all(&mut out, params),
            _ => {}
        }
        out
    }

    /// Direct child type trees.
    pub fn type_trees(&self) -> Vec<&TypeTree> {
        let mut out: Vec<&TypeTree> = Vec::new();
        match &self.kind {
            TypeTreeKind::TypeSelect { qualifier, .. } => out.push(qualifier),
            TypeTreeKind::Applied { tycon, args } => {
                out.push(tycon);
                push_all_tt(&mut out, args);
            }
            TypeTreeKind::Refined { base, .. } => out.push(base),
            TypeTreeKind::ByName { result } => out.push(result),
            TypeTreeKind::Bounds { lo, hi } => {
                out.push(lo);
                out.push(hi);
            }
            TypeTreeKind::Lambda { body, .. } => out.push(body),
            TypeTreeKind::Match {
                bound,
                scrutinee,
                cases,
            } => {
                push_opt_tt(&mut out, bound);
                out.push(scrutinee);
                for case in cases {
                    out.push(&case.pattern);
                    out.push(&case.body);
                }
            }
            TypeTreeKind::Ident { .. } | TypeTreeKind::Wrapper { .. } | TypeTreeKind::Empty => {}
            TypeTreeKind::TermSelect { .. } => {}
        }
        out
    }

    /// Pre-order walk over this type tree, its nested type trees, and the
    /// type trees of any term trees nested inside it.
    pub fn walk(&self, op: &mut dyn FnMut(&TypeTree)) {
        op(self);
        for tt in self.type_trees() {
            tt.walk(op);
        }
        for tree in self.subtrees() {
            tree.walk_type_trees(op);
        }
    }
}

impl fmt::Debug for TypeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTree({:?})", self.kind)
    }
}

/// The closed family of type-position node variants.
#[derive(Debug)]
pub enum TypeTreeKind {
    /// A type identifier; its type was resolved against the enclosing prefix
    /// when the tree was built.
    Ident {
        name: Name,
        tpe: Ty,
    },
    /// A type tree standing for an already-computed type.
    Wrapper {
        tpe: Ty,
    },
    /// A type selected from a term path, `qualifier.Name`.
    TermSelect {
        qualifier: TreeRef,
        name: Name,
    },
    /// A type selected from another type, `Qualifier.Name`.
    TypeSelect {
        qualifier: TypeTreeRef,
        name: Name,
    },
    Applied {
        tycon: TypeTreeRef,
        args: Vec<TypeTreeRef>,
    },
    /// A structural refinement `base { defs }`.
    Refined {
        base: TypeTreeRef,
        refinements: Vec<TreeRef>,
    },
    ByName {
        result: TypeTreeRef,
    },
    Bounds {
        lo: TypeTreeRef,
        hi: TypeTreeRef,
    },
    Lambda {
        /// `TypeParam` trees.
        params: Vec<TreeRef>,
        body: TypeTreeRef,
    },
    Match {
        bound: Option<TypeTreeRef>,
        scrutinee: TypeTreeRef,
        cases: Vec<TypeCase>,
    },
    Empty,
}
