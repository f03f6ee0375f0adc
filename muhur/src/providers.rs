//! Materials provider implementations.
//!
//! Two variants ship with the core:
//! - [`WrappedMaterialsProvider`] holds a caller-supplied root wrapping
//!   secret and an Ed25519 signing keypair. The wrap KEK is derived per
//!   context with HKDF-SHA256, so records from different tables are
//!   wrapped under different keys.
//! - [`StaticMaterialsProvider`] is the fully symmetric variant: a
//!   fixed wrapping key and an HMAC-SHA256 signing secret.
//!
//! Both are stateless per call and shareable across threads.

use crate::context::EncryptionContext;
use crate::envelope::DATA_KEY_SIZE;
use crate::error::{Error, MaterialsError};
use crate::material::WrapAlgorithm;
use crate::materials::{
    MaterialsProvider, SigningKeyMaterial, VerificationKeyMaterial, WrappedKey,
};
use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    ChaCha20Poly1305, Nonce,
};
use ed25519_dalek::{SigningKey, VerifyingKey};
use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;

/// Nonce size for the ChaCha20-Poly1305 wrap (96 bits).
const WRAP_NONCE_SIZE: usize = 12;

fn wrap_with_kek(
    kek: &[u8],
    data_key: &[u8],
    context: &EncryptionContext,
) -> Result<Vec<u8>, MaterialsError> {
    let cipher = ChaCha20Poly1305::new_from_slice(kek)
        .map_err(|e| MaterialsError::WrapFailed(format!("invalid wrapping key: {e}")))?;

    let mut nonce_bytes = [0u8; WRAP_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from(nonce_bytes);

    let aad = context.to_string();
    let ciphertext = cipher
        .encrypt(&nonce, Payload { msg: data_key, aad: aad.as_bytes() })
        .map_err(|e| MaterialsError::WrapFailed(format!("DEK encryption failed: {e}")))?;

    let mut wrapped = Vec::with_capacity(WRAP_NONCE_SIZE + ciphertext.len());
    wrapped.extend_from_slice(&nonce_bytes);
    wrapped.extend_from_slice(&ciphertext);
    Ok(wrapped)
}

fn unwrap_with_kek(
    kek: &[u8],
    wrapped: &[u8],
    context: &EncryptionContext,
) -> Result<SecretVec<u8>, MaterialsError> {
    if wrapped.len() <= WRAP_NONCE_SIZE {
        return Err(MaterialsError::UnwrapFailed("wrapped DEK too short".to_string()));
    }

    let cipher = ChaCha20Poly1305::new_from_slice(kek)
        .map_err(|e| MaterialsError::UnwrapFailed(format!("invalid wrapping key: {e}")))?;

    let mut nonce_bytes = [0u8; WRAP_NONCE_SIZE];
    nonce_bytes.copy_from_slice(&wrapped[..WRAP_NONCE_SIZE]);
    let nonce = Nonce::from(nonce_bytes);

    let aad = context.to_string();
    let data_key = cipher
        .decrypt(&nonce, Payload { msg: &wrapped[WRAP_NONCE_SIZE..], aad: aad.as_bytes() })
        .map_err(|_| MaterialsError::UnwrapFailed("DEK authentication failed".to_string()))?;

    Ok(SecretVec::new(data_key))
}

/// Provider holding a root wrapping secret and an Ed25519 signing
/// keypair, the shape the classic wrapped-keys setup uses.
///
/// # Example
///
/// ```
/// use muhur::providers::WrappedMaterialsProvider;
///
/// // Fresh random keys; production callers load persisted ones.
/// let provider = WrappedMaterialsProvider::generate();
/// ```
pub struct WrappedMaterialsProvider {
    root: SecretVec<u8>,
    signing: SigningKey,
    key_id: String,
}

impl WrappedMaterialsProvider {
    /// Creates a provider from existing key material.
    ///
    /// # Arguments
    ///
    /// * `root` - Root secret the per-context wrap KEK is derived from
    /// * `signing` - Ed25519 signing key for record signatures
    #[must_use]
    pub fn new(root: SecretVec<u8>, signing: SigningKey) -> Self {
        Self { root, signing, key_id: "wrap_v1".to_string() }
    }

    /// Creates a provider with fresh random key material.
    #[must_use]
    pub fn generate() -> Self {
        let mut root = vec![0u8; DATA_KEY_SIZE];
        OsRng.fill_bytes(&mut root);
        Self::new(SecretVec::new(root), SigningKey::generate(&mut OsRng))
    }

    /// Returns the public verification key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Derives the per-context wrap KEK from the root secret.
    fn derive_wrap_key(&self, context: &EncryptionContext) -> Result<SecretVec<u8>, MaterialsError> {
        let hkdf = Hkdf::<Sha256>::new(None, self.root.expose_secret());
        let info = format!("{context}|wrap");

        let mut kek = vec![0u8; DATA_KEY_SIZE];
        hkdf.expand(info.as_bytes(), &mut kek)
            .map_err(|_| MaterialsError::KeyUnavailable("wrap key derivation failed".to_string()))?;
        Ok(SecretVec::new(kek))
    }
}

impl MaterialsProvider for WrappedMaterialsProvider {
    fn wrap_data_key(
        &self,
        data_key: &[u8],
        context: &EncryptionContext,
    ) -> Result<WrappedKey, MaterialsError> {
        let kek = self.derive_wrap_key(context)?;
        let bytes = wrap_with_kek(kek.expose_secret(), data_key, context)?;
        Ok(WrappedKey {
            key_id: self.key_id.clone(),
            algorithm: WrapAlgorithm::ChaCha20Poly1305,
            bytes,
        })
    }

    fn unwrap_data_key(
        &self,
        wrapped: &WrappedKey,
        context: &EncryptionContext,
    ) -> Result<SecretVec<u8>, MaterialsError> {
        if wrapped.key_id != self.key_id {
            return Err(MaterialsError::UnwrapFailed(format!(
                "unknown wrapping key: {}",
                wrapped.key_id
            )));
        }
        let WrapAlgorithm::ChaCha20Poly1305 = wrapped.algorithm;

        let kek = self.derive_wrap_key(context)?;
        unwrap_with_kek(kek.expose_secret(), &wrapped.bytes, context)
    }

    fn signing_key(
        &self,
        _context: &EncryptionContext,
    ) -> Result<SigningKeyMaterial, MaterialsError> {
        Ok(SigningKeyMaterial::Ed25519(self.signing.clone()))
    }

    fn verification_key(
        &self,
        _context: &EncryptionContext,
    ) -> Result<VerificationKeyMaterial, MaterialsError> {
        Ok(VerificationKeyMaterial::Ed25519(self.signing.verifying_key()))
    }
}

/// Fully symmetric provider: a static wrapping key and an HMAC signing
/// secret, for deployments where both sides share the same material.
pub struct StaticMaterialsProvider {
    wrap_key: SecretVec<u8>,
    mac_key: SecretVec<u8>,
    key_id: String,
}

impl StaticMaterialsProvider {
    /// Creates a provider from a 32-byte wrapping key and an HMAC
    /// signing secret.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if the wrapping key is not
    /// 32 bytes or the signing secret is empty.
    pub fn new(wrap_key: SecretVec<u8>, mac_key: SecretVec<u8>) -> Result<Self, Error> {
        if wrap_key.expose_secret().len() != DATA_KEY_SIZE {
            return Err(Error::InvalidConfiguration(format!(
                "wrapping key must be {DATA_KEY_SIZE} bytes, got {}",
                wrap_key.expose_secret().len()
            )));
        }
        if mac_key.expose_secret().is_empty() {
            return Err(Error::InvalidConfiguration("signing secret is empty".to_string()));
        }
        Ok(Self { wrap_key, mac_key, key_id: "static_v1".to_string() })
    }
}

impl MaterialsProvider for StaticMaterialsProvider {
    fn wrap_data_key(
        &self,
        data_key: &[u8],
        context: &EncryptionContext,
    ) -> Result<WrappedKey, MaterialsError> {
        let bytes = wrap_with_kek(self.wrap_key.expose_secret(), data_key, context)?;
        Ok(WrappedKey {
            key_id: self.key_id.clone(),
            algorithm: WrapAlgorithm::ChaCha20Poly1305,
            bytes,
        })
    }

    fn unwrap_data_key(
        &self,
        wrapped: &WrappedKey,
        context: &EncryptionContext,
    ) -> Result<SecretVec<u8>, MaterialsError> {
        if wrapped.key_id != self.key_id {
            return Err(MaterialsError::UnwrapFailed(format!(
                "unknown wrapping key: {}",
                wrapped.key_id
            )));
        }
        unwrap_with_kek(self.wrap_key.expose_secret(), &wrapped.bytes, context)
    }

    fn signing_key(
        &self,
        _context: &EncryptionContext,
    ) -> Result<SigningKeyMaterial, MaterialsError> {
        Ok(SigningKeyMaterial::Hmac(SecretVec::new(
            self.mac_key.expose_secret().clone(),
        )))
    }

    fn verification_key(
        &self,
        _context: &EncryptionContext,
    ) -> Result<VerificationKeyMaterial, MaterialsError> {
        Ok(VerificationKeyMaterial::Hmac(SecretVec::new(
            self.mac_key.expose_secret().clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::generate_data_key;

    fn test_context() -> EncryptionContext {
        EncryptionContext::new("inventory", "pk").with_sort_key("sk")
    }

    #[test]
    fn test_wrapped_provider_round_trip() {
        let provider = WrappedMaterialsProvider::generate();
        let ctx = test_context();
        let dek = generate_data_key();

        let wrapped = provider.wrap_data_key(dek.expose_secret(), &ctx).unwrap();
        assert_eq!(wrapped.key_id, "wrap_v1");

        let unwrapped = provider.unwrap_data_key(&wrapped, &ctx).unwrap();
        assert_eq!(unwrapped.expose_secret(), dek.expose_secret());
    }

    #[test]
    fn test_wrapped_provider_wrong_context_fails() {
        let provider = WrappedMaterialsProvider::generate();
        let dek = generate_data_key();

        let wrapped = provider.wrap_data_key(dek.expose_secret(), &test_context()).unwrap();
        let other = EncryptionContext::new("other_table", "pk");
        let result = provider.unwrap_data_key(&wrapped, &other);
        assert!(matches!(result, Err(MaterialsError::UnwrapFailed(_))));
    }

    #[test]
    fn test_wrapped_provider_wrong_root_fails() {
        let ctx = test_context();
        let dek = generate_data_key();

        let wrapped = WrappedMaterialsProvider::generate()
            .wrap_data_key(dek.expose_secret(), &ctx)
            .unwrap();
        let result = WrappedMaterialsProvider::generate().unwrap_data_key(&wrapped, &ctx);
        assert!(matches!(result, Err(MaterialsError::UnwrapFailed(_))));
    }

    #[test]
    fn test_wrapped_provider_unknown_key_id_fails() {
        let provider = WrappedMaterialsProvider::generate();
        let ctx = test_context();
        let dek = generate_data_key();

        let mut wrapped = provider.wrap_data_key(dek.expose_secret(), &ctx).unwrap();
        wrapped.key_id = "somebody_else".to_string();
        let result = provider.unwrap_data_key(&wrapped, &ctx);
        assert!(matches!(result, Err(MaterialsError::UnwrapFailed(_))));
    }

    #[test]
    fn test_wrapped_provider_signs_with_ed25519() {
        let provider = WrappedMaterialsProvider::generate();
        let key = provider.signing_key(&test_context()).unwrap();
        assert!(matches!(key, SigningKeyMaterial::Ed25519(_)));
    }

    #[test]
    fn test_static_provider_round_trip() {
        let provider = StaticMaterialsProvider::new(
            SecretVec::new(vec![3u8; 32]),
            SecretVec::new(vec![4u8; 32]),
        )
        .unwrap();
        let ctx = test_context();
        let dek = generate_data_key();

        let wrapped = provider.wrap_data_key(dek.expose_secret(), &ctx).unwrap();
        assert_eq!(wrapped.key_id, "static_v1");

        let unwrapped = provider.unwrap_data_key(&wrapped, &ctx).unwrap();
        assert_eq!(unwrapped.expose_secret(), dek.expose_secret());
    }

    #[test]
    fn test_static_provider_rejects_bad_wrap_key_length() {
        let result = StaticMaterialsProvider::new(
            SecretVec::new(vec![3u8; 16]),
            SecretVec::new(vec![4u8; 32]),
        );
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_static_provider_rejects_empty_mac_key() {
        let result = StaticMaterialsProvider::new(
            SecretVec::new(vec![3u8; 32]),
            SecretVec::new(Vec::new()),
        );
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    // RFC 5869 Test Vector (HKDF-SHA256), Test Case 1, confirming the
    // primitive the wrap KEK derivation is built on.
    // https://tools.ietf.org/html/rfc5869#appendix-A.1
    #[test]
    fn test_hkdf_rfc5869_test_case_1() {
        const IKM_HEX: &str = "0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b";
        const SALT_HEX: &str = "000102030405060708090a0b0c";
        const INFO_HEX: &str = "f0f1f2f3f4f5f6f7f8f9";
        const EXPECTED_OKM_HEX: &str =
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865";

        let ikm = hex::decode(IKM_HEX).unwrap();
        let salt = hex::decode(SALT_HEX).unwrap();
        let info = hex::decode(INFO_HEX).unwrap();
        let expected_okm = hex::decode(EXPECTED_OKM_HEX).unwrap();

        let hkdf = Hkdf::<Sha256>::new(Some(&salt), &ikm);
        let mut okm = vec![0u8; 42];
        hkdf.expand(&info, &mut okm).expect("HKDF expand failed");

        assert_eq!(okm, expected_okm);
    }

    #[test]
    fn test_wrap_produces_fresh_bytes() {
        let provider = WrappedMaterialsProvider::generate();
        let ctx = test_context();
        let dek = generate_data_key();

        let a = provider.wrap_data_key(dek.expose_secret(), &ctx).unwrap();
        let b = provider.wrap_data_key(dek.expose_secret(), &ctx).unwrap();
        assert_ne!(a.bytes, b.bytes);
    }
}
