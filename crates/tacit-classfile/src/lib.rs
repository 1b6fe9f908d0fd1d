//! Minimal class-file inspection.
//!
//! The loader does not need full class-file decoding; it needs to answer one
//! question per root — what kind of compiled class is this? — and, for plain
//! JVM classes, to recover member stubs and generic signatures. This crate
//! parses exactly that much: the constant pool (UTF-8 and class entries),
//! member tables, and the attributes that mark a class as TASTy-bearing or
//! legacy-pickled.

mod constant_pool;
mod error;

pub mod descriptor;

use constant_pool::{ClassBytes, ConstantPool};

pub use error::{Error, Result};

/// The attribute marking a class whose typed AST lives in a companion TASTy
/// section.
const TASTY_ATTRIBUTE: &str = "TASTY";

/// Attributes marking a legacy-pickled class.
const SCALA_ATTRIBUTES: [&str; 2] = ["Scala", "ScalaSig"];

/// A shallow structural view of a class file.
#[derive(Debug, Clone)]
pub struct Structure {
    pub access_flags: u16,
    /// Internal form, `p/q/C`.
    pub internal_name: String,
    /// Binary form, `p.q.C`.
    pub binary_name: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<MemberStub>,
    pub methods: Vec<MemberStub>,
}

#[derive(Debug, Clone)]
pub struct MemberStub {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
}

/// What a class file turned out to contain.
#[derive(Debug, Clone)]
pub enum ClassKind {
    /// A legacy-pickled class. `runtime_annot_start` is the byte offset of
    /// the `RuntimeVisibleAnnotations` payload, where the pickle annotation
    /// lives.
    Scala2 {
        structure: Structure,
        runtime_annot_start: Option<usize>,
    },
    /// A plain JVM class, with its generic signature if present.
    Java {
        structure: Structure,
        signature: Option<String>,
    },
    /// The class declares a companion TASTy section; tree data comes from
    /// there, not from the class file.
    Tasty,
    /// Synthetic payloads (module descriptors, package descriptors) that
    /// carry no declarations.
    Other,
}

/// Classifies a class file and extracts the structure the loader needs.
pub fn read_kind(bytes: &[u8]) -> Result<ClassKind> {
    let mut scan = ClassBytes::of(bytes);
    let magic = scan.u4()?;
    if magic != 0xCAFEBABE {
        return Err(Error::InvalidMagic(magic));
    }
    scan.skip(4)?; // minor and major version
    let cp = ConstantPool::parse(&mut scan)?;

    let access_flags = scan.u2()?;
    let internal_name = cp.class_name(scan.u2()?)?.to_string();
    let super_index = scan.u2()?;
    let super_class = if super_index == 0 {
        None
    } else {
        Some(cp.class_name(super_index)?.to_string())
    };

    let mut interfaces = Vec::new();
    for _ in 0..scan.count()? {
        interfaces.push(cp.class_name(scan.u2()?)?.to_string());
    }

    let mut fields = Vec::new();
    for _ in 0..scan.count()? {
        fields.push(read_member(&mut scan, &cp)?);
    }
    let mut methods = Vec::new();
    for _ in 0..scan.count()? {
        methods.push(read_member(&mut scan, &cp)?);
    }

    let mut has_tasty = false;
    let mut has_scala = false;
    let mut signature = None;
    let mut runtime_annot_start = None;

    for _ in 0..scan.count()? {
        let name_index = scan.u2()?;
        let length = scan.u4()? as usize;
        let payload_start = scan.offset();
        match cp.utf8(name_index)? {
            TASTY_ATTRIBUTE => {
                has_tasty = true;
                scan.skip(length)?;
            }
            name if SCALA_ATTRIBUTES.contains(&name) => {
                has_scala = true;
                scan.skip(length)?;
            }
            "Signature" => {
                signature = Some(signature_attribute(scan.take(length)?, &cp)?);
            }
            "RuntimeVisibleAnnotations" => {
                runtime_annot_start = Some(payload_start);
                scan.skip(length)?;
            }
            _ => scan.skip(length)?,
        }
    }

    if has_tasty {
        return Ok(ClassKind::Tasty);
    }

    let binary_name = internal_name.replace('/', ".");
    let structure = Structure {
        access_flags,
        internal_name,
        binary_name,
        super_class,
        interfaces,
        fields,
        methods,
    };

    if has_scala {
        return Ok(ClassKind::Scala2 {
            structure,
            runtime_annot_start,
        });
    }
    if is_synthetic_unit(&structure.internal_name) {
        return Ok(ClassKind::Other);
    }
    Ok(ClassKind::Java {
        structure,
        signature,
    })
}

fn is_synthetic_unit(internal_name: &str) -> bool {
    internal_name == "module-info"
        || internal_name == "package-info"
        || internal_name.ends_with("/package-info")
}

fn read_member(scan: &mut ClassBytes<'_>, cp: &ConstantPool) -> Result<MemberStub> {
    let access_flags = scan.u2()?;
    let name = cp.utf8(scan.u2()?)?.to_string();
    let descriptor = cp.utf8(scan.u2()?)?.to_string();

    let mut signature = None;
    for _ in 0..scan.count()? {
        let name_index = scan.u2()?;
        let length = scan.u4()? as usize;
        if cp.utf8(name_index)? == "Signature" {
            signature = Some(signature_attribute(scan.take(length)?, cp)?);
        } else {
            scan.skip(length)?;
        }
    }

    Ok(MemberStub {
        access_flags,
        name,
        descriptor,
        signature,
    })
}

/// A `Signature` attribute payload: one constant-pool index.
fn signature_attribute(payload: &[u8], cp: &ConstantPool) -> Result<String> {
    let mut sub = ClassBytes::of(payload);
    Ok(cp.utf8(sub.u2()?)?.to_string())
}
