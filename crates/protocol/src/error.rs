//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering every way a request can fail to decode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A trigger was present but a field it requires was not.
    #[error("{action}: missing field `{field}`")]
    MissingField {
        /// Trigger that selected the action.
        action: &'static str,
        /// Name of the absent field.
        field: &'static str,
    },

    /// A required field was present but empty.
    #[error("{action}: field `{field}` is empty")]
    EmptyField {
        /// Trigger that selected the action.
        action: &'static str,
        /// Name of the empty field.
        field: &'static str,
    },

    /// The upload trigger was present without a file part.
    #[error("upload: no file part in request")]
    MissingUpload,

    /// The multipart body could not be read.
    #[error("malformed multipart body: {0}")]
    Multipart(String),

    /// The urlencoded body could not be read.
    #[error("malformed form body: {0}")]
    Form(String),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
