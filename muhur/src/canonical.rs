//! Canonical record form and record signatures.
//!
//! The canonical form is a deterministic byte sequence covering the
//! record's origin (table name and primary-key attribute names) and,
//! for every attribute in name order, the attribute name, its resolved
//! action, and its value bytes exactly as they appear in the encrypted
//! record. Swapping values between attributes, changing an action,
//! tampering with ciphertext, or moving the record to a different
//! table all change these bytes and break the signature.

use crate::actions::AttributeAction;
use crate::context::EncryptionContext;
use crate::error::Error;
use crate::material::{SignatureAlgorithm, SignatureMaterial};
use crate::materials::{SigningKeyMaterial, VerificationKeyMaterial};
use crate::value::Record;
use ed25519_dalek::{Signature, Signer, Verifier};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Version prefix for the canonical form.
const CANONICAL_PREFIX: &[u8] = b"muhur/canonical/v1\0";

fn write_chunk(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), Error> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| Error::Serialization(format!("chunk exceeds u32 range: {}", bytes.len())))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Builds the canonical byte form of `record`.
///
/// `record` is the signed view: attribute values post-encryption,
/// including the wrapped-key reserved attribute, excluding the
/// signature attribute. `resolved` must hold an action for every
/// attribute present.
///
/// # Errors
///
/// Returns `Error::Serialization` if a value cannot be encoded or an
/// attribute has no resolved action.
pub fn canonicalize(
    record: &Record,
    resolved: &BTreeMap<String, AttributeAction>,
    context: &EncryptionContext,
) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    buf.extend_from_slice(CANONICAL_PREFIX);

    write_chunk(&mut buf, context.table_name().as_bytes())?;
    write_chunk(&mut buf, context.partition_key_name().as_bytes())?;
    match context.sort_key_name() {
        Some(sort_key) => {
            buf.push(1);
            write_chunk(&mut buf, sort_key.as_bytes())?;
        }
        None => buf.push(0),
    }

    let count = u32::try_from(record.len())
        .map_err(|_| Error::Serialization(format!("too many attributes: {}", record.len())))?;
    buf.extend_from_slice(&count.to_be_bytes());

    // BTreeMap iterates in name order, so the form is independent of
    // how the record was assembled.
    for (name, value) in record {
        let action = resolved.get(name).ok_or_else(|| {
            Error::Serialization(format!("no resolved action for attribute {name:?}"))
        })?;
        write_chunk(&mut buf, name.as_bytes())?;
        buf.push(action.as_byte());
        write_chunk(&mut buf, &value.to_bytes()?)?;
    }

    Ok(buf)
}

/// Signs canonical bytes with the given key material.
///
/// # Errors
///
/// Returns `Error::EncryptionFailed` if the signing key is unusable.
pub fn sign(canonical: &[u8], key: &SigningKeyMaterial) -> Result<SignatureMaterial, Error> {
    match key {
        SigningKeyMaterial::Hmac(secret) => {
            let mut mac = HmacSha256::new_from_slice(secret.expose_secret())
                .map_err(|e| Error::EncryptionFailed(format!("invalid signing key: {e}")))?;
            mac.update(canonical);
            let signature = mac.finalize().into_bytes().to_vec();
            Ok(SignatureMaterial::new(SignatureAlgorithm::HmacSha256, signature))
        }
        SigningKeyMaterial::Ed25519(signing_key) => {
            let signature = signing_key.sign(canonical).to_bytes().to_vec();
            Ok(SignatureMaterial::new(SignatureAlgorithm::Ed25519, signature))
        }
    }
}

/// Verifies a signature over canonical bytes.
///
/// Every failure mode, including an algorithm mismatch between the
/// material and the key, collapses to `Error::SignatureInvalid`.
///
/// # Errors
///
/// Returns `Error::SignatureInvalid` if the signature does not verify.
pub fn verify(
    canonical: &[u8],
    material: &SignatureMaterial,
    key: &VerificationKeyMaterial,
) -> Result<(), Error> {
    match (material.algorithm(), key) {
        (SignatureAlgorithm::HmacSha256, VerificationKeyMaterial::Hmac(secret)) => {
            let mut mac = HmacSha256::new_from_slice(secret.expose_secret())
                .map_err(|_| Error::SignatureInvalid)?;
            mac.update(canonical);
            // Constant-time comparison via the Mac trait
            mac.verify_slice(material.signature()).map_err(|_| Error::SignatureInvalid)
        }
        (SignatureAlgorithm::Ed25519, VerificationKeyMaterial::Ed25519(verifying_key)) => {
            let signature =
                Signature::from_slice(material.signature()).map_err(|_| Error::SignatureInvalid)?;
            verifying_key.verify(canonical, &signature).map_err(|_| Error::SignatureInvalid)
        }
        _ => Err(Error::SignatureInvalid),
    }
}
