//! Materials provider abstraction.
//!
//! A [`MaterialsProvider`] supplies everything the record transform
//! needs from key management: wrapping and unwrapping of the per-record
//! data key, and signing/verification key material. Implementations
//! must be thread-safe (`Send + Sync`) so one provider can serve many
//! concurrent encrypt/decrypt calls.

use crate::context::EncryptionContext;
use crate::error::MaterialsError;
use crate::material::{SignatureAlgorithm, WrapAlgorithm};
use ed25519_dalek::{SigningKey, VerifyingKey};
use secrecy::SecretVec;

/// A data key wrapped by a provider, before it is combined with the
/// content cipher identifier into on-record material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    /// Provider identifier for the wrapping key (for example `wrap_v1`).
    pub key_id: String,
    /// Algorithm used to wrap the DEK.
    pub algorithm: WrapAlgorithm,
    /// The wrapped (encrypted) DEK bytes.
    pub bytes: Vec<u8>,
}

/// Signing key material returned by a provider.
pub enum SigningKeyMaterial {
    /// Shared-secret signing via HMAC-SHA256.
    Hmac(SecretVec<u8>),
    /// Asymmetric signing via Ed25519.
    Ed25519(SigningKey),
}

impl SigningKeyMaterial {
    /// Returns the algorithm this material signs with.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Hmac(_) => SignatureAlgorithm::HmacSha256,
            Self::Ed25519(_) => SignatureAlgorithm::Ed25519,
        }
    }
}

/// Verification key material returned by a provider.
pub enum VerificationKeyMaterial {
    /// Shared-secret verification via HMAC-SHA256.
    Hmac(SecretVec<u8>),
    /// Asymmetric verification via an Ed25519 public key.
    Ed25519(VerifyingKey),
}

/// Supplies key material for record encryption and signing.
///
/// The four methods correspond to the encryption, decryption, signing,
/// and verification sides of one record transform. Providers hold no
/// per-call mutable state; callers share one instance across records
/// and threads via `Arc`.
pub trait MaterialsProvider: Send + Sync {
    /// Wraps a freshly generated data key for the given context.
    ///
    /// # Errors
    ///
    /// Returns `MaterialsError::KeyUnavailable` if no wrapping key can
    /// be produced for the context, or `MaterialsError::WrapFailed` if
    /// wrapping itself fails.
    fn wrap_data_key(
        &self,
        data_key: &[u8],
        context: &EncryptionContext,
    ) -> Result<WrappedKey, MaterialsError>;

    /// Unwraps a previously wrapped data key.
    ///
    /// # Returns
    ///
    /// The plaintext DEK in a `SecretVec`, zeroed on drop.
    ///
    /// # Errors
    ///
    /// Returns `MaterialsError::UnwrapFailed` if the material was
    /// wrapped under a different key or has been corrupted.
    fn unwrap_data_key(
        &self,
        wrapped: &WrappedKey,
        context: &EncryptionContext,
    ) -> Result<SecretVec<u8>, MaterialsError>;

    /// Returns the signing key material for the given context.
    ///
    /// # Errors
    ///
    /// Returns `MaterialsError::KeyUnavailable` if no signing key can
    /// be produced.
    fn signing_key(
        &self,
        context: &EncryptionContext,
    ) -> Result<SigningKeyMaterial, MaterialsError>;

    /// Returns the verification key material for the given context.
    ///
    /// # Errors
    ///
    /// Returns `MaterialsError::KeyUnavailable` if no verification key
    /// can be produced.
    fn verification_key(
        &self,
        context: &EncryptionContext,
    ) -> Result<VerificationKeyMaterial, MaterialsError>;
}
