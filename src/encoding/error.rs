//! Error type and Return values used by the Serialization.

use serde::ser;

/// Represents all possible errors that can happen during Serialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The value contains a type without a canonical slot representation.
    ///
    /// Floating point numbers and maps are rejected: floats because hashing
    /// them invites rounding disagreements between participants, maps because
    /// their iteration order is not part of the type.
    #[error("type is not representable in slot encoding: {0}")]
    TypeNotRepresentable(&'static str),
    /// Sequences must know their length up front, it is written first.
    #[error("sequence length must be known before serializing")]
    UnknownLength,
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: core::fmt::Display,
    {
        Error::Custom(msg.to_string())
    }
}

/// Alias for `Result` using the [Error] returned by the Serializer.
pub type Result<T> = core::result::Result<T, Error>;
