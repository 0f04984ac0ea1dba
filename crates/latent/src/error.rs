//! error types
//!
//! [ErrorKind] describes what went wrong, [ResolveError] additionally tells where: it carries the path trace of
//! the node that was being resolved when the pass was aborted.

/// Everything that can go wrong while encoding or resolving deferred values
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("Unrecognized token key: {key}")]
    UnrecognizedTokenKey { key: String },

    #[error("Got a literal token value; cannot be encoded as a list")]
    InvalidTokenUse,

    #[error("Invalid characters in token hint: {hint:?}")]
    InvalidTokenHint { hint: String },

    #[error("Cannot add elements or text to a list token, got: {text}")]
    InvalidListConcatenation { text: String },

    #[error("Cannot concatenate tokens in a tokenized string array, got: {text}")]
    CannotConcatenateListToken { text: String },

    #[error("The key {key:?} has been resolved to {resolved} but must be resolvable to a string")]
    NonStringKey { key: String, resolved: String },

    #[error("Trying to resolve a construct ({node})")]
    CyclicStructure { node: String },

    #[error("Unable to resolve object tree with circular reference")]
    StructureTooDeep,

    #[error("Trying to resolve a non-data object. Only tokens are supported for lazy evaluation")]
    UnsupportedDeferred,

    #[error("A structure with a token in it cannot be serialized directly. Resolve it first")]
    UnsupportedSerialization,
}

impl ErrorKind {
    /// Attach a path trace
    pub fn at(self, path: impl Into<String>) -> ResolveError {
        ResolveError {
            kind: self,
            path: path.into(),
        }
    }
}

/// A failed resolution pass
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{kind}. Path: {path}")]
pub struct ResolveError {
    pub kind: ErrorKind,
    /// `/`-separated path of the failing node, `/` for the root
    pub path: String,
}
