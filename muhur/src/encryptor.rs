//! Record encryption and decryption façade.
//!
//! [`RecordEncryptor`] is the only entry point callers use. It resolves
//! per-attribute actions, runs the envelope engine, and signs or
//! verifies the canonical record form. On decrypt, verification runs
//! before any ciphertext is opened; a record that fails verification
//! yields no plaintext at all.

use crate::actions::{resolve_actions, AttributeAction, AttributeActions};
use crate::canonical::{canonicalize, sign, verify};
use crate::context::EncryptionContext;
use crate::envelope::{
    decrypt_attributes, encrypt_attributes, generate_data_key, ContentCipher,
};
use crate::error::Error;
use crate::material::{
    SignatureMaterial, WrappedDataKey, RESERVED_KEY_ATTR, RESERVED_SIG_ATTR,
};
use crate::materials::{MaterialsProvider, WrappedKey};
use crate::value::{AttributeValue, Record};
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Encrypts and decrypts whole records.
///
/// Stateless across calls; the provider is the only shared state and
/// may be reused across many records and threads.
///
/// # Example
///
/// ```
/// use muhur::prelude::*;
///
/// # fn main() -> Result<(), muhur::error::Error> {
/// let provider = WrappedMaterialsProvider::generate();
/// let encryptor = RecordEncryptor::new(provider, ContentCipher::default());
///
/// let context = EncryptionContext::new("inventory", "partition_attribute");
/// let actions = AttributeActions::new()
///     .with_default(AttributeAction::EncryptAndSign)
///     .with_attribute("partition_attribute", AttributeAction::SignOnly);
///
/// let mut record = Record::new();
/// record.insert("partition_attribute".into(), AttributeValue::string("is this"));
/// record.insert("example".into(), AttributeValue::string("data"));
///
/// let encrypted = encryptor.encrypt_record(&record, &actions, &context)?;
/// let decrypted = encryptor.decrypt_record(&encrypted, &actions, &context)?;
/// assert_eq!(decrypted, record);
/// # Ok(())
/// # }
/// ```
pub struct RecordEncryptor<P: MaterialsProvider> {
    provider: Arc<P>,
    cipher: ContentCipher,
}

impl<P: MaterialsProvider> RecordEncryptor<P> {
    /// Creates a new encryptor with the given provider and content cipher.
    pub fn new(provider: P, cipher: ContentCipher) -> Self {
        Self { provider: Arc::new(provider), cipher }
    }

    /// Encrypts a record.
    ///
    /// Attributes resolved to `EncryptAndSign` are replaced by
    /// ciphertext; the wrapped data key and the record signature are
    /// attached under the reserved attribute names.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedNameConflict` if the record already uses a
    ///   reserved attribute name
    /// - `Error::InvalidConfiguration` if a primary-key attribute is
    ///   explicitly configured for encryption
    /// - provider and cipher failures as described in [`Error`]
    pub fn encrypt_record(
        &self,
        record: &Record,
        actions: &AttributeActions,
        context: &EncryptionContext,
    ) -> Result<Record, Error> {
        for reserved in [RESERVED_KEY_ATTR, RESERVED_SIG_ATTR] {
            if record.contains_key(reserved) {
                return Err(Error::ReservedNameConflict(reserved.to_string()));
            }
        }

        let mut resolved = resolve_actions(record, actions, context)?;

        let dek = generate_data_key();
        let mut out = encrypt_attributes(record, &resolved, context, &dek, self.cipher)?;

        let wrapped = self.provider.wrap_data_key(dek.expose_secret(), context)?;
        let material =
            WrappedDataKey::new(wrapped.algorithm, self.cipher, wrapped.key_id, wrapped.bytes);
        drop(dek);

        // The wrapped key material is part of the signed view, so a
        // swapped key attribute is caught at verification time.
        out.insert(RESERVED_KEY_ATTR.to_string(), AttributeValue::Bin(material.to_bytes()?));
        resolved.insert(RESERVED_KEY_ATTR.to_string(), AttributeAction::SignOnly);

        let canonical = canonicalize(&out, &resolved, context)?;
        let signature = sign(&canonical, &self.provider.signing_key(context)?)?;
        out.insert(RESERVED_SIG_ATTR.to_string(), AttributeValue::Bin(signature.to_bytes()?));

        Ok(out)
    }

    /// Decrypts a record produced by [`encrypt_record`](Self::encrypt_record).
    ///
    /// The signature is verified over the received bytes before any
    /// attribute is decrypted. The call is atomic: on any failure no
    /// partial plaintext is returned.
    ///
    /// # Errors
    ///
    /// - `Error::SignatureInvalid` if the signature attribute is
    ///   missing, malformed, or does not verify
    /// - `Error::KeyUnwrapFailure` if the wrapped key attribute is
    ///   missing, malformed, or cannot be unwrapped
    /// - `Error::DecryptionFailure` if an encrypted attribute cannot be
    ///   opened
    pub fn decrypt_record(
        &self,
        record: &Record,
        actions: &AttributeActions,
        context: &EncryptionContext,
    ) -> Result<Record, Error> {
        let mut received = record.clone();

        let signature_bytes = match received.remove(RESERVED_SIG_ATTR) {
            Some(AttributeValue::Bin(bytes)) => bytes,
            _ => return Err(Error::SignatureInvalid),
        };
        let signature =
            SignatureMaterial::from_bytes(&signature_bytes).map_err(|_| Error::SignatureInvalid)?;

        let material = match received.get(RESERVED_KEY_ATTR) {
            Some(AttributeValue::Bin(bytes)) => {
                WrappedDataKey::from_bytes(bytes).map_err(|_| Error::KeyUnwrapFailure)?
            }
            _ => return Err(Error::KeyUnwrapFailure),
        };

        let mut body = received.clone();
        body.remove(RESERVED_KEY_ATTR);
        let mut resolved = resolve_actions(&body, actions, context)?;
        resolved.insert(RESERVED_KEY_ATTR.to_string(), AttributeAction::SignOnly);

        // Verify over the bytes exactly as received, before unwrapping
        // or decrypting anything.
        let canonical = canonicalize(&received, &resolved, context)?;
        verify(&canonical, &signature, &self.provider.verification_key(context)?)?;

        let wrapped = WrappedKey {
            key_id: material.key_id().to_string(),
            algorithm: material.wrap_algorithm(),
            bytes: material.wrapped().to_vec(),
        };
        let dek = self.provider.unwrap_data_key(&wrapped, context)?;

        decrypt_attributes(&body, &resolved, context, &dek, material.content_cipher())
    }
}

impl<P: MaterialsProvider> Clone for RecordEncryptor<P> {
    fn clone(&self) -> Self {
        Self { provider: Arc::clone(&self.provider), cipher: self.cipher }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MaterialsError;
    use crate::material::WrapAlgorithm;
    use crate::materials::{SigningKeyMaterial, VerificationKeyMaterial};
    use secrecy::SecretVec;

    // Mock provider: XOR "wrapping" and a fixed HMAC secret, enough to
    // exercise the orchestration without real key management.
    struct MockMaterialsProvider {
        kek: Vec<u8>,
        mac_key: Vec<u8>,
    }

    impl MockMaterialsProvider {
        fn new() -> Self {
            Self { kek: vec![42u8; 32], mac_key: vec![7u8; 32] }
        }
    }

    impl MaterialsProvider for MockMaterialsProvider {
        fn wrap_data_key(
            &self,
            data_key: &[u8],
            _context: &EncryptionContext,
        ) -> Result<WrappedKey, MaterialsError> {
            let bytes: Vec<u8> =
                data_key.iter().zip(self.kek.iter().cycle()).map(|(d, k)| d ^ k).collect();
            Ok(WrappedKey {
                key_id: "mock".to_string(),
                algorithm: WrapAlgorithm::ChaCha20Poly1305,
                bytes,
            })
        }

        fn unwrap_data_key(
            &self,
            wrapped: &WrappedKey,
            _context: &EncryptionContext,
        ) -> Result<SecretVec<u8>, MaterialsError> {
            if wrapped.key_id != "mock" {
                return Err(MaterialsError::UnwrapFailed("unknown key".to_string()));
            }
            let dek: Vec<u8> =
                wrapped.bytes.iter().zip(self.kek.iter().cycle()).map(|(w, k)| w ^ k).collect();
            Ok(SecretVec::new(dek))
        }

        fn signing_key(
            &self,
            _context: &EncryptionContext,
        ) -> Result<SigningKeyMaterial, MaterialsError> {
            Ok(SigningKeyMaterial::Hmac(SecretVec::new(self.mac_key.clone())))
        }

        fn verification_key(
            &self,
            _context: &EncryptionContext,
        ) -> Result<VerificationKeyMaterial, MaterialsError> {
            Ok(VerificationKeyMaterial::Hmac(SecretVec::new(self.mac_key.clone())))
        }
    }

    fn sample_record() -> Record {
        let mut record = Record::new();
        record.insert("partition_attribute".to_string(), AttributeValue::string("is this"));
        record.insert("sort_attribute".to_string(), AttributeValue::number(55));
        record.insert("example".to_string(), AttributeValue::string("data"));
        record.insert("leave me".to_string(), AttributeValue::string("alone"));
        record
    }

    fn sample_actions() -> AttributeActions {
        AttributeActions::new()
            .with_default(AttributeAction::EncryptAndSign)
            .with_attribute("partition_attribute", AttributeAction::SignOnly)
            .with_attribute("sort_attribute", AttributeAction::SignOnly)
            .with_attribute("leave me", AttributeAction::DoNothing)
    }

    fn sample_context() -> EncryptionContext {
        EncryptionContext::new("inventory", "partition_attribute").with_sort_key("sort_attribute")
    }

    fn encryptor() -> RecordEncryptor<MockMaterialsProvider> {
        RecordEncryptor::new(MockMaterialsProvider::new(), ContentCipher::default())
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let encryptor = encryptor();
        let record = sample_record();

        let encrypted =
            encryptor.encrypt_record(&record, &sample_actions(), &sample_context()).unwrap();
        let decrypted =
            encryptor.decrypt_record(&encrypted, &sample_actions(), &sample_context()).unwrap();

        assert_eq!(decrypted, record);
    }

    #[test]
    fn test_reserved_attributes_attached_and_removed() {
        let encryptor = encryptor();
        let encrypted = encryptor
            .encrypt_record(&sample_record(), &sample_actions(), &sample_context())
            .unwrap();

        assert!(encrypted.contains_key(RESERVED_KEY_ATTR));
        assert!(encrypted.contains_key(RESERVED_SIG_ATTR));

        let decrypted =
            encryptor.decrypt_record(&encrypted, &sample_actions(), &sample_context()).unwrap();
        assert!(!decrypted.contains_key(RESERVED_KEY_ATTR));
        assert!(!decrypted.contains_key(RESERVED_SIG_ATTR));
    }

    #[test]
    fn test_primary_keys_stay_plaintext() {
        let encryptor = encryptor();
        let record = sample_record();
        // Default action would encrypt the primary keys; they must be
        // downgraded, not encrypted.
        let actions = AttributeActions::new().with_default(AttributeAction::EncryptAndSign);

        let encrypted = encryptor.encrypt_record(&record, &actions, &sample_context()).unwrap();
        assert_eq!(encrypted["partition_attribute"], record["partition_attribute"]);
        assert_eq!(encrypted["sort_attribute"], record["sort_attribute"]);
        assert_ne!(encrypted["example"], record["example"]);
    }

    #[test]
    fn test_do_nothing_attribute_byte_identical() {
        let encryptor = encryptor();
        let record = sample_record();

        let encrypted =
            encryptor.encrypt_record(&record, &sample_actions(), &sample_context()).unwrap();
        assert_eq!(encrypted["leave me"], record["leave me"]);
    }

    #[test]
    fn test_fresh_ciphertext_per_call() {
        let encryptor = encryptor();
        let record = sample_record();

        let first =
            encryptor.encrypt_record(&record, &sample_actions(), &sample_context()).unwrap();
        let second =
            encryptor.encrypt_record(&record, &sample_actions(), &sample_context()).unwrap();

        assert_ne!(first["example"], second["example"]);
    }

    #[test]
    fn test_reserved_name_conflict_rejected() {
        let encryptor = encryptor();
        let mut record = sample_record();
        record.insert(RESERVED_SIG_ATTR.to_string(), AttributeValue::string("impostor"));

        let result = encryptor.encrypt_record(&record, &sample_actions(), &sample_context());
        assert!(matches!(result, Err(Error::ReservedNameConflict(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails_verification() {
        let encryptor = encryptor();
        let mut encrypted = encryptor
            .encrypt_record(&sample_record(), &sample_actions(), &sample_context())
            .unwrap();

        let Some(AttributeValue::Bin(bytes)) = encrypted.get_mut("example") else {
            panic!("example should be ciphertext");
        };
        bytes[0] ^= 0x01;

        let result = encryptor.decrypt_record(&encrypted, &sample_actions(), &sample_context());
        assert!(matches!(result, Err(Error::SignatureInvalid)));
    }

    #[test]
    fn test_tampered_signature_fails() {
        let encryptor = encryptor();
        let mut encrypted = encryptor
            .encrypt_record(&sample_record(), &sample_actions(), &sample_context())
            .unwrap();

        let Some(AttributeValue::Bin(bytes)) = encrypted.get_mut(RESERVED_SIG_ATTR) else {
            panic!("signature attribute missing");
        };
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let result = encryptor.decrypt_record(&encrypted, &sample_actions(), &sample_context());
        assert!(matches!(result, Err(Error::SignatureInvalid)));
    }

    #[test]
    fn test_missing_signature_fails() {
        let encryptor = encryptor();
        let mut encrypted = encryptor
            .encrypt_record(&sample_record(), &sample_actions(), &sample_context())
            .unwrap();
        encrypted.remove(RESERVED_SIG_ATTR);

        let result = encryptor.decrypt_record(&encrypted, &sample_actions(), &sample_context());
        assert!(matches!(result, Err(Error::SignatureInvalid)));
    }

    #[test]
    fn test_missing_wrapped_key_fails() {
        let encryptor = encryptor();
        let mut encrypted = encryptor
            .encrypt_record(&sample_record(), &sample_actions(), &sample_context())
            .unwrap();
        encrypted.remove(RESERVED_KEY_ATTR);

        let result = encryptor.decrypt_record(&encrypted, &sample_actions(), &sample_context());
        assert!(matches!(result, Err(Error::KeyUnwrapFailure)));
    }

    #[test]
    fn test_wrong_table_fails_verification() {
        let encryptor = encryptor();
        let encrypted = encryptor
            .encrypt_record(&sample_record(), &sample_actions(), &sample_context())
            .unwrap();

        let other = EncryptionContext::new("other_table", "partition_attribute")
            .with_sort_key("sort_attribute");
        let result = encryptor.decrypt_record(&encrypted, &sample_actions(), &other);
        assert!(matches!(result, Err(Error::SignatureInvalid)));
    }

    #[test]
    fn test_swapped_attribute_values_fail_verification() {
        let encryptor = encryptor();
        let mut encrypted = encryptor
            .encrypt_record(&sample_record(), &sample_actions(), &sample_context())
            .unwrap();

        let pk = encrypted["partition_attribute"].clone();
        let sk = encrypted["sort_attribute"].clone();
        encrypted.insert("partition_attribute".to_string(), sk);
        encrypted.insert("sort_attribute".to_string(), pk);

        let result = encryptor.decrypt_record(&encrypted, &sample_actions(), &sample_context());
        assert!(matches!(result, Err(Error::SignatureInvalid)));
    }

    #[test]
    fn test_aes_gcm_cipher_round_trip() {
        let encryptor =
            RecordEncryptor::new(MockMaterialsProvider::new(), ContentCipher::Aes256Gcm);
        let record = sample_record();

        let encrypted =
            encryptor.encrypt_record(&record, &sample_actions(), &sample_context()).unwrap();
        let decrypted =
            encryptor.decrypt_record(&encrypted, &sample_actions(), &sample_context()).unwrap();
        assert_eq!(decrypted, record);
    }

    #[test]
    fn test_clone_shares_provider() {
        let encryptor1 = encryptor();
        let encryptor2 = encryptor1.clone();

        let encrypted = encryptor1
            .encrypt_record(&sample_record(), &sample_actions(), &sample_context())
            .unwrap();
        let decrypted =
            encryptor2.decrypt_record(&encrypted, &sample_actions(), &sample_context()).unwrap();
        assert_eq!(decrypted, sample_record());
    }
}
