use std::fmt;

use tacit_core::{Name, Span};

pub type Result<T> = std::result::Result<T, TypeError>;

/// Failures raised while computing or combining types.
///
/// These are recoverable at the call site: a failed computation is not cached,
/// so a caller may retry after supplying the missing information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// A selection whose qualifier is not a path type.
    BadSelection { qualifier: String, name: Name },
    /// `Apply`/`TypeApply` over something that is not a method/poly type.
    NonMethodReference(String),
    /// An overload reference that matches more than one declaration.
    AmbiguousOverload(Name),
    /// A tree whose type cannot be derived (unsupported node or missing
    /// information).
    Unsupported { node: &'static str, span: Span },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::BadSelection { qualifier, name } => {
                write!(f, "cannot select {name} from non-path type {qualifier}")
            }
            TypeError::NonMethodReference(what) => {
                write!(f, "reference does not denote a method: {what}")
            }
            TypeError::AmbiguousOverload(name) => {
                write!(f, "ambiguous overload reference: {name}")
            }
            TypeError::Unsupported { node, span } => {
                write!(f, "cannot compute the type of {node} at {span:?}")
            }
        }
    }
}

impl std::error::Error for TypeError {}
