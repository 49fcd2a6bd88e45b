//! Error types for interface declaration and COM calls.
//!
//! Declaration-time errors ([`FormatError`], [`SchemaError`], [`SignatureError`],
//! [`DeclError`]) reject a malformed interface before any object exists.
//! [`ComError`] covers everything that can go wrong once objects are in play.

use thiserror::Error;

use crate::com::HRESULT;

/// Result alias for operations on live COM objects.
pub type Result<T> = std::result::Result<T, ComError>;

/// Malformed GUID text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid GUID '{input}': {reason}")]
pub struct FormatError {
    pub input: String,
    pub reason: &'static str,
}

/// A struct field whose declared type has no native representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' of struct '{structure}' has no native type for '{ty}'")]
pub struct SchemaError {
    pub structure: String,
    pub field: String,
    pub ty: String,
}

/// A method parameter whose declared type has no native representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("parameter '{param}' has no native type for '{ty}'")]
    UnknownType { param: String, ty: String },

    #[error("parameter '{param}' declares an empty list of alternatives")]
    EmptyUnion { param: String },

    #[error("cannot parse type expression '{text}'")]
    Syntax { text: String },
}

/// Rejection of an interface declaration.
///
/// Cloneable so a failed declaration can be cached and reported on every use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclError {
    #[error("{interface}: multiple inheritance is not supported ({count} parents)")]
    MultipleInheritance { interface: String, count: usize },

    #[error("{interface}: method '{method}' is declared more than once")]
    DuplicateMethod { interface: String, method: String },

    #[error("{interface}::{method}: {source}")]
    Signature {
        interface: String,
        method: String,
        #[source]
        source: SignatureError,
    },
}

/// Failures raised while activating, binding or calling COM objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComError {
    #[error(transparent)]
    Declaration(#[from] DeclError),

    #[error("activation of {interface} failed with HRESULT {hresult:#010x}")]
    Activation { interface: &'static str, hresult: HRESULT },

    #[error("{interface} declares no class id and cannot be activated")]
    NoClassId { interface: &'static str },

    #[error("null pointer passed for {0}")]
    NullPointer(&'static str),

    #[error("object does not support {interface} (HRESULT {hresult:#010x})")]
    InterfaceNotSupported { interface: &'static str, hresult: HRESULT },

    #[error("{method} failed with HRESULT {hresult:#010x}")]
    NativeCallFailed { method: String, hresult: HRESULT },

    #[error("{interface} has no method named '{method}'")]
    UnknownMethod { interface: &'static str, method: String },

    #[error("{method} expects ({expected}), called with ({actual})")]
    ArgumentMismatch {
        method: String,
        expected: String,
        actual: String,
    },

    #[error("the object has already been released")]
    Released,

    #[error("path is too long or contains an interior NUL")]
    InvalidPath,
}
