//! Envelope encryption engine for attribute contents.
//!
//! One fresh random data key (DEK) is generated per encrypt call. Each
//! attribute resolved to `EncryptAndSign` has its typed value
//! serialized and sealed under the DEK with an AEAD cipher and a fresh
//! random nonce, then stored as `Bin(nonce || ciphertext)`. The context
//! string and the attribute name form the associated data, so a sealed
//! value cannot be moved to another attribute or another table.

use crate::actions::AttributeAction;
use crate::context::EncryptionContext;
use crate::error::Error;
use crate::value::{AttributeValue, Record};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    ChaCha20Poly1305, Nonce,
};
use secrecy::{ExposeSecret, SecretVec};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Data key size in bytes (256 bits).
pub const DATA_KEY_SIZE: usize = 32;

/// Nonce size for both supported AEAD ciphers (96 bits).
const NONCE_SIZE: usize = 12;

/// AEAD cipher used for attribute contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCipher {
    /// ChaCha20-Poly1305 (default).
    ChaCha20Poly1305,
    /// AES-256-GCM.
    Aes256Gcm,
}

impl ContentCipher {
    /// Stable identifier byte, stored in the wrapped key material.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ChaCha20Poly1305 => 1,
            Self::Aes256Gcm => 2,
        }
    }

    /// Parses an identifier byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ChaCha20Poly1305),
            2 => Some(Self::Aes256Gcm),
            _ => None,
        }
    }
}

impl Default for ContentCipher {
    fn default() -> Self {
        Self::ChaCha20Poly1305
    }
}

/// Generates a fresh random data key for one encrypt call.
///
/// The key is wrapped by the materials provider before it travels with
/// the record; the plaintext copy is zeroed when dropped.
#[must_use]
pub fn generate_data_key() -> SecretVec<u8> {
    let mut dek = vec![0u8; DATA_KEY_SIZE];
    OsRng.fill_bytes(&mut dek);
    SecretVec::new(dek)
}

/// Associated data binding a sealed value to its context and attribute.
fn attribute_aad(context: &EncryptionContext, name: &str) -> Vec<u8> {
    let mut aad = context.to_string().into_bytes();
    aad.push(0);
    aad.extend_from_slice(name.as_bytes());
    aad
}

fn aead_seal(
    cipher: ContentCipher,
    key: &[u8],
    nonce_bytes: [u8; NONCE_SIZE],
    aad: &[u8],
    msg: &[u8],
) -> Result<Vec<u8>, Error> {
    let nonce = Nonce::from(nonce_bytes);
    let payload = Payload { msg, aad };
    match cipher {
        ContentCipher::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
            .map_err(|e| Error::EncryptionFailed(format!("invalid DEK: {e}")))?
            .encrypt(&nonce, payload)
            .map_err(|e| Error::EncryptionFailed(format!("AEAD encryption failed: {e}"))),
        ContentCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key)
            .map_err(|e| Error::EncryptionFailed(format!("invalid DEK: {e}")))?
            .encrypt(&nonce, payload)
            .map_err(|e| Error::EncryptionFailed(format!("AEAD encryption failed: {e}"))),
    }
}

fn aead_open(
    cipher: ContentCipher,
    key: &[u8],
    nonce_bytes: [u8; NONCE_SIZE],
    aad: &[u8],
    msg: &[u8],
) -> Result<Vec<u8>, Error> {
    let nonce = Nonce::from(nonce_bytes);
    let payload = Payload { msg, aad };
    let result = match cipher {
        ContentCipher::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| Error::DecryptionFailure)?
            .decrypt(&nonce, payload),
        ContentCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::DecryptionFailure)?
            .decrypt(&nonce, payload),
    };
    result.map_err(|_| Error::DecryptionFailure)
}

/// Seals one attribute value: serialize, encrypt, tag as binary.
fn seal_attribute(
    cipher: ContentCipher,
    dek: &SecretVec<u8>,
    context: &EncryptionContext,
    name: &str,
    value: &AttributeValue,
) -> Result<AttributeValue, Error> {
    let plaintext = Zeroizing::new(value.to_bytes()?);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let aad = attribute_aad(context, name);
    let ciphertext = aead_seal(cipher, dek.expose_secret(), nonce_bytes, &aad, &plaintext)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(AttributeValue::Bin(sealed))
}

/// Opens one sealed attribute value and restores the original variant.
fn open_attribute(
    cipher: ContentCipher,
    dek: &SecretVec<u8>,
    context: &EncryptionContext,
    name: &str,
    value: &AttributeValue,
) -> Result<AttributeValue, Error> {
    let sealed = value.as_bin().ok_or(Error::DecryptionFailure)?;
    if sealed.len() <= NONCE_SIZE {
        return Err(Error::DecryptionFailure);
    }

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(&sealed[..NONCE_SIZE]);

    let aad = attribute_aad(context, name);
    let plaintext = Zeroizing::new(aead_open(
        cipher,
        dek.expose_secret(),
        nonce_bytes,
        &aad,
        &sealed[NONCE_SIZE..],
    )?);

    // A decrypted value that does not parse back is treated the same as
    // a bad tag: the record is corrupt, nothing more is revealed.
    AttributeValue::from_bytes(&plaintext).map_err(|_| Error::DecryptionFailure)
}

/// Encrypts every `EncryptAndSign` attribute of `record` under `dek`.
///
/// `SignOnly` and `DoNothing` attributes pass through untouched.
pub(crate) fn encrypt_attributes(
    record: &Record,
    resolved: &BTreeMap<String, AttributeAction>,
    context: &EncryptionContext,
    dek: &SecretVec<u8>,
    cipher: ContentCipher,
) -> Result<Record, Error> {
    let mut out = Record::new();
    for (name, value) in record {
        let transformed = match resolved.get(name) {
            Some(AttributeAction::EncryptAndSign) => {
                seal_attribute(cipher, dek, context, name, value)?
            }
            _ => value.clone(),
        };
        out.insert(name.clone(), transformed);
    }
    Ok(out)
}

/// Decrypts every `EncryptAndSign` attribute of `record` under `dek`.
pub(crate) fn decrypt_attributes(
    record: &Record,
    resolved: &BTreeMap<String, AttributeAction>,
    context: &EncryptionContext,
    dek: &SecretVec<u8>,
    cipher: ContentCipher,
) -> Result<Record, Error> {
    let mut out = Record::new();
    for (name, value) in record {
        let restored = match resolved.get(name) {
            Some(AttributeAction::EncryptAndSign) => {
                open_attribute(cipher, dek, context, name, value)?
            }
            _ => value.clone(),
        };
        out.insert(name.clone(), restored);
    }
    Ok(out)
}
