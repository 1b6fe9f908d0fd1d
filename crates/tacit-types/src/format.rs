//! Human-readable rendering of types, used by diagnostics.

use std::fmt;

use crate::{Type, Ty};

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::NoType => write!(f, "<no type>"),
            Type::NoPrefix => write!(f, "<root>"),
            Type::Any => write!(f, "Any"),
            Type::Nothing => write!(f, "Nothing"),
            Type::Unit => write!(f, "Unit"),
            Type::Constant(value) => write!(f, "{value}"),
            Type::PackageRef(name) | Type::PackageTypeRef(name) => write!(f, "{name}"),
            Type::TermRef(tref) => {
                fmt_prefix(&tref.prefix, f)?;
                write!(f, "{}", tref.name)
            }
            Type::TypeRef(tref) => {
                fmt_prefix(&tref.prefix, f)?;
                write!(f, "{}", tref.name())
            }
            Type::This(type_ref) => write!(f, "{type_ref}.this"),
            Type::Applied { tycon, args } => {
                write!(f, "{tycon}[")?;
                fmt_list(args, f)?;
                write!(f, "]")
            }
            Type::And(a, b) => write!(f, "({a} & {b})"),
            Type::Or(a, b) => write!(f, "({a} | {b})"),
            Type::Refined {
                parent,
                member,
                info,
            } => write!(f, "{parent} {{ {member}: {info} }}"),
            Type::Alias(target) => write!(f, "= {target}"),
            Type::Bounds { lo, hi } => write!(f, ">: {lo} <: {hi}"),
            Type::ByName(result) => write!(f, "=> {result}"),
            Type::Method(meth) => {
                write!(f, "(")?;
                for (i, (name, ty)) in meth.param_names.iter().zip(&meth.param_types).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, "){}", meth.result)
            }
            Type::Poly(poly) => {
                write!(f, "[")?;
                for (i, name) in poly.param_names.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}")?;
                    if let Some(bounds) = poly.param_bounds.get(i) {
                        if !Ty::same(bounds, &Ty::bounds_nothing_any()) {
                            write!(f, " {bounds}")?;
                        }
                    }
                }
                write!(f, "]{}", poly.result)
            }
            Type::Lambda(lambda) => {
                write!(f, "[")?;
                for (i, param) in lambda.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param.name)?;
                    if !Ty::same(&param.bounds, &Ty::bounds_nothing_any()) {
                        write!(f, " {}", param.bounds)?;
                    }
                }
                match lambda.result.get() {
                    Some(result) => write!(f, "] =>> {result}"),
                    None => write!(f, "] =>> <pending>"),
                }
            }
            Type::ParamRef { index, .. } => match self.param_name() {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "<param {index}>"),
            },
            Type::Match(mt) => {
                write!(f, "{} match {{ ", mt.scrutinee)?;
                for (i, case) in mt.cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "case {} => {}", case.pattern, case.body)?;
                }
                write!(f, " }}")
            }
        }
    }
}

fn fmt_prefix(prefix: &Ty, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &**prefix {
        Type::NoPrefix => Ok(()),
        _ => write!(f, "{prefix}."),
    }
}

fn fmt_list(items: &[Ty], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tacit_core::Name;

    use super::*;

    #[test]
    fn renders_nested_references() {
        let scala = Ty::package_ref(Name::from_dotted_package("scala"));
        let int = scala.select(&Name::simple("Int").to_type_name()).unwrap();
        assert_eq!(int.to_string(), "scala.Int");

        let applied = Ty::applied(int.clone(), vec![Ty::any()]);
        assert_eq!(applied.to_string(), "scala.Int[Any]");

        assert_eq!(Ty::or(int.clone(), Ty::unit()).to_string(), "(scala.Int | Unit)");
        assert_eq!(Ty::this_type(int).to_string(), "scala.Int.this");
    }

    #[test]
    fn renders_method_and_bounds() {
        let meth = Ty::method(
            vec![Name::simple("x")],
            vec![Ty::unit()],
            Ty::any(),
        );
        assert_eq!(meth.to_string(), "(x: Unit)Any");
        assert_eq!(Ty::bounds_nothing_any().to_string(), ">: Nothing <: Any");
    }
}
