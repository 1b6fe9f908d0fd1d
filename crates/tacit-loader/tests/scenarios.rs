//! End-to-end scenarios: a scripted TASTy collaborator builds the forests a
//! real decoder would produce, and the assertions walk the loaded trees.

use std::sync::Arc;

use tacit_classpath::{Classpath, PackageData, TastyData};
use tacit_core::{Name, Span, SymbolId};
use tacit_loader::{Context, DecodeError, DefaultClassfiles, RootScope, TastyFile, TastyFormat};
use tacit_trees::{
    DeclaredBounds, ParamsClause, Parent, Tree, TreeKind, TreeRef, TypeTree, TypeTreeKind,
    TypeTreeRef,
};
use tacit_types::{Constant, Ty, Type};

fn sp() -> Span {
    Span::NONE
}

fn scala() -> Ty {
    Ty::package_ref(Name::simple("scala"))
}

fn java_lang() -> Ty {
    Ty::package_ref(Name::from_dotted_package("java.lang"))
}

fn int_tpt() -> TypeTreeRef {
    TypeTree::type_ident(Name::simple("Int"), scala(), sp())
}

fn unit_tpt() -> TypeTreeRef {
    TypeTree::type_ident(Name::simple("Unit"), scala(), sp())
}

fn int_type() -> Ty {
    scala()
        .select(&Name::simple("Int").to_type_name())
        .unwrap()
}

/// `new java.lang.Object().<init>()` in parent position.
fn object_parent() -> Parent {
    let new = Tree::new(
        TreeKind::New {
            tpt: TypeTree::type_ident(Name::simple("Object"), java_lang(), sp()),
        },
        sp(),
    );
    let ctor = Tree::new(
        TreeKind::Select {
            qualifier: new,
            name: Name::simple("<init>"),
        },
        sp(),
    );
    Parent::Term(Tree::new(TreeKind::Apply { fun: ctor, args: vec![] }, sp()))
}

fn empty_ctor(scope: &mut RootScope<'_>, owner: SymbolId) -> Result<TreeRef, DecodeError> {
    let sym = scope
        .symbols_mut()
        .create_symbol(Name::simple("<init>"), owner)?;
    let ctor = Tree::new(
        TreeKind::DefDef {
            name: Name::simple("<init>"),
            params: vec![ParamsClause::Term(vec![])],
            result_tpt: unit_tpt(),
            rhs: None,
            symbol: sym,
        },
        sp(),
    );
    scope.register_def(&ctor)?;
    Ok(ctor)
}

fn class_def_with(
    scope: &mut RootScope<'_>,
    name: &str,
    ctor: TreeRef,
    body: Vec<TreeRef>,
) -> Result<TreeRef, DecodeError> {
    let template = Tree::new(
        TreeKind::Template {
            ctor,
            parents: vec![object_parent()],
            self_def: None,
            body,
        },
        sp(),
    );
    let class_def = Tree::new(
        TreeKind::ClassDef {
            name: Name::simple(name).to_type_name(),
            rhs: template,
            symbol: scope.root(),
        },
        sp(),
    );
    scope.register_def(&class_def)?;
    Ok(class_def)
}

fn class_def(
    scope: &mut RootScope<'_>,
    name: &str,
    body: Vec<TreeRef>,
) -> Result<TreeRef, DecodeError> {
    let root = scope.root();
    let ctor = empty_ctor(scope, root)?;
    class_def_with(scope, name, ctor, body)
}

fn package_def(path: &str, stats: Vec<TreeRef>) -> TreeRef {
    let pid = Tree::new(
        TreeKind::ReferencedPackage {
            name: Name::from_dotted_package(path),
        },
        sp(),
    );
    Tree::new(TreeKind::PackageDef { pid, stats }, sp())
}

// === The scripted decoder ===================================================

struct ScriptedTasty;

impl TastyFormat for ScriptedTasty {
    fn open(&self, tasty: &TastyData) -> Result<Box<dyn TastyFile>, DecodeError> {
        Ok(Box::new(ScriptedFile {
            key: String::from_utf8_lossy(&tasty.bytes).into_owned(),
            positions_read: false,
        }))
    }
}

struct ScriptedFile {
    key: String,
    positions_read: bool,
}

impl TastyFile for ScriptedFile {
    fn unpickle_positions(&mut self) -> Result<(), DecodeError> {
        self.positions_read = true;
        Ok(())
    }

    fn unpickle_trees(&mut self, scope: &mut RootScope<'_>) -> Result<Vec<TreeRef>, DecodeError> {
        assert!(self.positions_read, "tree section read before positions");
        let trees = match self.key.as_str() {
            "EmptyClass" => {
                let cd = class_def(scope, "EmptyClass", vec![])?;
                vec![package_def("empty_class", vec![cd])]
            }
            "InNestedPackage" => {
                let cd = class_def(scope, "InNestedPackage", vec![])?;
                let inner = package_def("simple_trees.nested", vec![cd]);
                vec![package_def("simple_trees", vec![inner])]
            }
            "MultipleImports" => {
                let selector = |name: &str| {
                    Tree::new(
                        TreeKind::ImportSelector {
                            imported: Tree::new(
                                TreeKind::ImportIdent {
                                    name: Name::simple(name),
                                },
                                sp(),
                            ),
                            renamed: None,
                            bound: None,
                        },
                        sp(),
                    )
                };
                let import = Tree::new(
                    TreeKind::Import {
                        expr: Tree::new(
                            TreeKind::ReferencedPackage {
                                name: Name::simple("imported_files"),
                            },
                            sp(),
                        ),
                        selectors: vec![selector("A"), selector("B")],
                    },
                    sp(),
                );
                let cd = class_def(scope, "MultipleImports", vec![])?;
                vec![package_def("imports", vec![import, cd])]
            }
            "IdentityMethod" => {
                let root = scope.root();
                let id_sym = scope
                    .symbols_mut()
                    .create_symbol(Name::simple("id"), root)?;
                let x_sym = scope
                    .symbols_mut()
                    .create_symbol(Name::simple("x"), id_sym)?;
                scope
                    .symbols()
                    .set_declared_type(x_sym, int_type())
                    .map_err(DecodeError::from)?;
                scope
                    .symbols()
                    .set_declared_type(
                        id_sym,
                        Ty::method(vec![Name::simple("x")], vec![int_type()], int_type()),
                    )
                    .map_err(DecodeError::from)?;

                let param = Tree::new(
                    TreeKind::ValDef {
                        name: Name::simple("x"),
                        tpt: int_tpt(),
                        rhs: None,
                        symbol: x_sym,
                    },
                    sp(),
                );
                scope.register_def(&param)?;
                let body = Tree::new(
                    TreeKind::Ident {
                        name: Name::simple("x"),
                        tpe: int_type(),
                    },
                    sp(),
                );
                let def = Tree::new(
                    TreeKind::DefDef {
                        name: Name::simple("id"),
                        params: vec![ParamsClause::Term(vec![param])],
                        result_tpt: int_tpt(),
                        rhs: Some(body),
                        symbol: id_sym,
                    },
                    sp(),
                );
                scope.register_def(&def)?;
                let cd = class_def(scope, "IdentityMethod", vec![def])?;
                vec![package_def("simple_trees", vec![cd])]
            }
            "Constants" => {
                let root = scope.root();
                let mut vals = Vec::new();
                for (name, constant) in scripted_constants() {
                    let sym = scope
                        .symbols_mut()
                        .create_symbol(Name::simple(name), root)?;
                    let val = Tree::new(
                        TreeKind::ValDef {
                            name: Name::simple(name),
                            tpt: TypeTree::new(
                                TypeTreeKind::Wrapper {
                                    tpe: Ty::constant(constant.clone()),
                                },
                                sp(),
                            ),
                            rhs: Some(Tree::new(TreeKind::Literal { constant }, sp())),
                            symbol: sym,
                        },
                        sp(),
                    );
                    scope.register_def(&val)?;
                    vals.push(val);
                }
                let cd = class_def(scope, "Constants", vals)?;
                vec![package_def("simple_trees", vec![cd])]
            }
            "HigherKinded" => {
                let root = scope.root();
                let ctor_sym = scope
                    .symbols_mut()
                    .create_symbol(Name::simple("<init>"), root)?;
                let a_sym = scope
                    .symbols_mut()
                    .create_symbol(Name::simple("A").to_type_name(), ctor_sym)?;
                let inner_sym = scope
                    .symbols_mut()
                    .create_symbol(Name::simple("_$1").to_type_name(), a_sym)?;

                let lambda_tt = TypeTree::new(
                    TypeTreeKind::Lambda {
                        params: vec![Tree::new(
                            TreeKind::TypeParam {
                                name: Name::simple("_$1").to_type_name(),
                                bounds: DeclaredBounds::Computed(Ty::bounds_nothing_any()),
                                symbol: inner_sym,
                            },
                            sp(),
                        )],
                        body: TypeTree::new(TypeTreeKind::Wrapper { tpe: Ty::any() }, sp()),
                    },
                    sp(),
                );
                let bounds_tt = TypeTree::new(
                    TypeTreeKind::Bounds {
                        lo: TypeTree::new(TypeTreeKind::Wrapper { tpe: Ty::nothing() }, sp()),
                        hi: lambda_tt,
                    },
                    sp(),
                );
                let a_param = Tree::new(
                    TreeKind::TypeParam {
                        name: Name::simple("A").to_type_name(),
                        bounds: DeclaredBounds::Tree(bounds_tt),
                        symbol: a_sym,
                    },
                    sp(),
                );
                scope.register_def(&a_param)?;

                let ctor = Tree::new(
                    TreeKind::DefDef {
                        name: Name::simple("<init>"),
                        params: vec![
                            ParamsClause::Type(vec![a_param]),
                            ParamsClause::Term(vec![]),
                        ],
                        result_tpt: unit_tpt(),
                        rhs: None,
                        symbol: ctor_sym,
                    },
                    sp(),
                );
                scope.register_def(&ctor)?;
                let cd = class_def_with(scope, "HigherKinded", ctor, vec![])?;
                vec![package_def("simple_trees", vec![cd])]
            }
            other => return Err(DecodeError::new(format!("no script for {other}"))),
        };
        scope.mark_root_initialised()?;
        Ok(trees)
    }
}

fn scripted_constants() -> Vec<(&'static str, Constant)> {
    vec![
        ("unitVal", Constant::Unit),
        ("falseVal", Constant::Boolean(false)),
        ("trueVal", Constant::Boolean(true)),
        ("intVal", Constant::Int(1)),
        ("charVal", Constant::Char('a')),
        ("floatVal", Constant::Float(1.1)),
        ("doubleVal", Constant::Double(1.1)),
        ("stringVal", Constant::String("string".into())),
        ("nullVal", Constant::Null),
    ]
}

// === Harness ================================================================

fn context_for(package: &str, class: &str) -> Context {
    let mut pkg = PackageData::new(package);
    pkg.tastys.push(TastyData {
        name: class.into(),
        debug_path: format!("{package}/{class}.tasty"),
        bytes: Arc::from(class.as_bytes()),
    });
    Context::with_decoders(
        Classpath::new(vec![pkg]),
        Box::new(DefaultClassfiles),
        Box::new(ScriptedTasty),
    )
}

fn load(package: &str, class: &str) -> (Context, SymbolId, Vec<TreeRef>) {
    let mut ctx = context_for(package, class);
    let cls = ctx
        .find_class(package, class)
        .unwrap()
        .expect("class resolves");
    let trees = ctx.top_level_tasty(cls).expect("trees recorded").to_vec();
    (ctx, cls, trees)
}

fn find_in<'a>(tree: &'a Tree, pred: &dyn Fn(&Tree) -> bool) -> Option<&'a Tree> {
    if pred(tree) {
        return Some(tree);
    }
    tree.subtrees().into_iter().find_map(|c| find_in(c, pred))
}

fn find<'a>(trees: &'a [TreeRef], pred: &dyn Fn(&Tree) -> bool) -> Option<&'a Tree> {
    trees.iter().find_map(|t| find_in(t, pred))
}

// === Scenarios ==============================================================

#[test]
fn empty_class_round_trip() {
    let (ctx, cls, trees) = load("empty_class", "EmptyClass");
    assert_eq!(trees.len(), 1);

    let TreeKind::PackageDef { pid, stats } = trees[0].kind() else {
        panic!("expected PackageDef at the top level");
    };
    let TreeKind::ReferencedPackage { name } = pid.kind() else {
        panic!("expected a referenced package pid");
    };
    assert_eq!(name.to_string(), "empty_class");
    assert_eq!(stats.len(), 1);

    let TreeKind::ClassDef { name, rhs, symbol } = stats[0].kind() else {
        panic!("expected ClassDef");
    };
    assert_eq!(name.to_string(), "EmptyClass");
    assert_eq!(*symbol, cls);
    assert!(std::sync::Arc::ptr_eq(
        ctx.symbols().tree_of(cls).unwrap(),
        &stats[0]
    ));

    let TreeKind::Template {
        ctor,
        parents,
        self_def,
        body,
    } = rhs.kind()
    else {
        panic!("expected Template");
    };
    assert!(matches!(ctor.kind(), TreeKind::DefDef { .. }));
    assert!(self_def.is_none());
    assert!(body.is_empty());
    assert_eq!(parents.len(), 1);
    match &parents[0] {
        Parent::Term(apply) => {
            let TreeKind::Apply { fun, args } = apply.kind() else {
                panic!("expected the object constructor call");
            };
            assert!(args.is_empty());
            let TreeKind::Select { qualifier, .. } = fun.kind() else {
                panic!("expected Select of <init>");
            };
            assert!(matches!(qualifier.kind(), TreeKind::New { .. }));
        }
        Parent::Type(_) => panic!("expected a term parent"),
    }
}

#[test]
fn nested_packages_nest_their_defs() {
    let (_ctx, _cls, trees) = load("simple_trees.nested", "InNestedPackage");

    let TreeKind::PackageDef { pid, stats } = trees[0].kind() else {
        panic!("expected outer PackageDef");
    };
    let TreeKind::ReferencedPackage { name } = pid.kind() else {
        panic!("expected pid");
    };
    assert_eq!(name.to_string(), "simple_trees");

    let TreeKind::PackageDef { pid: inner_pid, stats: inner_stats } = stats[0].kind() else {
        panic!("expected inner PackageDef");
    };
    let TreeKind::ReferencedPackage { name } = inner_pid.kind() else {
        panic!("expected inner pid");
    };
    assert_eq!(name.to_string(), "simple_trees.nested");
    assert!(matches!(
        inner_stats[0].kind(),
        TreeKind::ClassDef { name, .. } if name.to_string() == "InNestedPackage"
    ));
}

#[test]
fn imports_keep_their_selectors() {
    let (_ctx, _cls, trees) = load("imports", "MultipleImports");

    let import = find(&trees, &|t| matches!(t.kind(), TreeKind::Import { .. }))
        .expect("an Import subtree");
    let TreeKind::Import { expr, selectors } = import.kind() else {
        unreachable!()
    };
    assert!(matches!(
        expr.kind(),
        TreeKind::ReferencedPackage { name } if name.to_string() == "imported_files"
    ));
    assert_eq!(selectors.len(), 2);
    for (selector, expected) in selectors.iter().zip(["A", "B"]) {
        let TreeKind::ImportSelector {
            imported,
            renamed,
            bound,
        } = selector.kind()
        else {
            panic!("expected ImportSelector");
        };
        assert!(matches!(
            imported.kind(),
            TreeKind::ImportIdent { name } if name.to_string() == expected
        ));
        assert!(renamed.is_none());
        assert!(bound.is_none());
    }
}

#[test]
fn identity_method_links_its_symbol() {
    let (ctx, _cls, trees) = load("simple_trees", "IdentityMethod");

    let def = find(&trees, &|t| {
        matches!(t.kind(), TreeKind::DefDef { name, .. } if name.to_string() == "id")
    })
    .expect("the id DefDef");
    let TreeKind::DefDef {
        params,
        result_tpt,
        rhs,
        symbol,
        ..
    } = def.kind()
    else {
        unreachable!()
    };

    assert_eq!(params.len(), 1);
    let ParamsClause::Term(vals) = &params[0] else {
        panic!("expected a term clause");
    };
    let TreeKind::ValDef { name, symbol: x_sym, .. } = vals[0].kind() else {
        panic!("expected the x parameter");
    };
    assert_eq!(name.to_string(), "x");
    assert!(std::sync::Arc::ptr_eq(
        ctx.symbols().tree_of(*x_sym).unwrap(),
        &vals[0]
    ));

    match result_tpt.kind() {
        TypeTreeKind::Ident { name, .. } => assert_eq!(name.to_string(), "Int"),
        other => panic!("expected a TypeIdent result, got {other:?}"),
    }

    let body = rhs.as_ref().expect("a body");
    assert!(matches!(
        body.kind(),
        TreeKind::Ident { name, .. } if name.to_string() == "x"
    ));
    assert_eq!(body.tpe(ctx.symbols()).unwrap(), int_type());

    // The defining-tree back-pointer references this exact node.
    let linked = ctx.symbols().tree_of(*symbol).unwrap();
    assert!(std::ptr::eq(linked.as_ref(), def));
}

#[test]
fn constants_carry_their_literal_types() {
    let (ctx, _cls, trees) = load("simple_trees", "Constants");

    let expected = scripted_constants();
    let mut seen = Vec::new();
    for (name, constant) in &expected {
        let val = find(&trees, &|t| {
            matches!(t.kind(), TreeKind::ValDef { name: n, .. } if n.to_string() == *name)
        })
        .unwrap_or_else(|| panic!("missing val {name}"));
        let TreeKind::ValDef { rhs: Some(rhs), .. } = val.kind() else {
            panic!("expected an initialized val");
        };
        let TreeKind::Literal { constant: lit } = rhs.kind() else {
            panic!("expected a literal initializer for {name}");
        };
        assert_eq!(lit, constant);
        seen.push(lit.clone());

        match &*rhs.tpe(ctx.symbols()).unwrap() {
            Type::Constant(c) => assert_eq!(c, constant),
            other => panic!("expected ConstantType, got {other:?}"),
        }
    }
    assert_eq!(seen.len(), expected.len());
}

#[test]
fn higher_kinded_type_param_projects_to_a_lambda() {
    let (ctx, _cls, trees) = load("simple_trees", "HigherKinded");

    let param = find(&trees, &|t| {
        matches!(t.kind(), TreeKind::TypeParam { name, .. } if name.to_string() == "A")
    })
    .expect("the A type parameter");
    let TreeKind::TypeParam { bounds, .. } = param.kind() else {
        unreachable!()
    };
    let DeclaredBounds::Tree(bounds_tt) = bounds else {
        panic!("expected bounds still in tree form");
    };

    let projected = bounds_tt.to_type(ctx.symbols()).unwrap();
    let Type::Bounds { lo, hi } = &*projected else {
        panic!("expected RealTypeBounds, got {projected:?}");
    };
    assert_eq!(lo, &Ty::nothing());

    let Type::Lambda(lambda) = &**hi else {
        panic!("expected a TypeLambda upper bound, got {hi:?}");
    };
    assert_eq!(lambda.params.len(), 1);
    assert_eq!(lambda.params[0].name.to_string(), "_$1");
    assert!(Ty::same(
        &lambda.params[0].bounds,
        &Ty::bounds_nothing_any()
    ));
    assert_eq!(lambda.result_type(), &Ty::any());
}
