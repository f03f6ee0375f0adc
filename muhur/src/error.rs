//! Error types for `muhur` operations.

use std::fmt;

/// Main error type for record encryption and decryption.
///
/// `DecryptionFailure` and `SignatureInvalid` deliberately carry no
/// detail: distinguishing *why* a record failed to open would hand an
/// attacker an oracle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Encryption-side operation failed (cipher setup, DEK wrapping, I/O)
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// The materials provider could not produce key material for the context
    #[error("no key material available for the given context")]
    KeyUnavailable,

    /// The caller-supplied configuration is inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The wrapped data key could not be unwrapped (wrong key or corrupted material)
    #[error("wrapped data key could not be unwrapped")]
    KeyUnwrapFailure,

    /// An encrypted attribute could not be decrypted
    #[error("decryption failed")]
    DecryptionFailure,

    /// Record signature verification failed
    #[error("signature verification failed")]
    SignatureInvalid,

    /// The input record uses an attribute name reserved by this library
    #[error("attribute name is reserved: {0}")]
    ReservedNameConflict(String),

    /// An attribute value could not be serialized or parsed
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Errors specific to materials provider operations.
#[derive(Debug)]
pub enum MaterialsError {
    /// No key material can be produced for the given context
    KeyUnavailable(String),

    /// DEK wrapping failed
    WrapFailed(String),

    /// DEK unwrapping failed
    UnwrapFailed(String),

    /// I/O operation failed
    Io(std::io::Error),
}

impl fmt::Display for MaterialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyUnavailable(msg) => write!(f, "key material unavailable: {msg}"),
            Self::WrapFailed(msg) => write!(f, "DEK wrap failed: {msg}"),
            Self::UnwrapFailed(msg) => write!(f, "DEK unwrap failed: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for MaterialsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MaterialsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<MaterialsError> for Error {
    fn from(err: MaterialsError) -> Self {
        match err {
            MaterialsError::KeyUnavailable(_) => Self::KeyUnavailable,
            MaterialsError::UnwrapFailed(_) => Self::KeyUnwrapFailure,
            MaterialsError::WrapFailed(msg) => Self::EncryptionFailed(msg),
            MaterialsError::Io(err) => Self::EncryptionFailed(err.to_string()),
        }
    }
}
