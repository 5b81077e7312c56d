use thiserror::Error;

use crate::schema::{ScalarKind, TypeId};

/// Everything that can go wrong while assembling a schema, generating an
/// encoder or encoding a message.
///
/// Descriptors are trusted to be valid, so most variants point at a schema or
/// instance that was built inconsistently rather than at bad input data.
///
/// ## Generation errors
/// - [`Error::UnresolvedType`] - a message or group field without a resolved child type
/// - [`Error::InvalidMapKey`] - a map field keyed by a kind protobuf does not allow
///
/// ## Instance errors
/// - [`Error::TypeMismatch`] - a value that cannot be written as the field's kind
/// - [`Error::MapKey`] - a map key string that does not parse as the key kind
/// - [`Error::MissingRequired`] - a required field without a value
///
/// ## Schema errors
/// - [`Error::UnknownType`], [`Error::UnknownTypeName`], [`Error::UndefinedType`],
///   [`Error::DuplicateType`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A message or group field whose child type was never resolved.
    ///
    /// Fatal when generating an encoder for the owning type, so no encoder is
    /// cached for it.
    #[error("field `{field}` of type `{type_name}` has no resolved message type")]
    UnresolvedType {
        /// Name of the offending field
        field: String,
        /// The declared (unresolved) type name
        type_name: String,
    },

    /// A map field keyed by something other than an integer, bool or string.
    #[error("field `{field}` uses `{key}` as map key, only integer, bool and string keys are allowed")]
    InvalidMapKey { field: String, key: String },

    /// A map key that cannot be read as the field's key kind.
    #[error("map key {key:?} of field `{field}` is not a valid {kind}")]
    MapKey {
        field: String,
        key: String,
        kind: ScalarKind,
    },

    /// The value held by an instance does not fit the field.
    #[error("field `{field}` expects {expected} but holds {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("required field `{field}` is not set")]
    MissingRequired { field: String },

    #[error("no message type with id {0}")]
    UnknownType(TypeId),

    #[error("no message type named `{0}`")]
    UnknownTypeName(String),

    #[error("message type `{0}` was reserved but never defined")]
    UndefinedType(String),

    #[error("message type `{0}` is defined twice")]
    DuplicateType(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
