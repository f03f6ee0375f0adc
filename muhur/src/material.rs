//! Reserved attribute materials and their binary formats.
//!
//! An encrypted record carries two reserved attributes:
//! - [`RESERVED_KEY_ATTR`] holds the [`WrappedDataKey`]: the wrapped
//!   per-record data key plus the algorithm identifiers needed to
//!   unwrap it and to decrypt attribute contents.
//! - [`RESERVED_SIG_ATTR`] holds the [`SignatureMaterial`]: the record
//!   signature and its algorithm identifier.
//!
//! Formats:
//! ```text
//! wrapped key:  [version:1][wrap_alg:1][cipher:1][key_id_len:1][key_id:N][wrapped_len:2 BE][wrapped:M]
//! signature:    [version:1][sig_alg:1][sig_len:2 BE][sig:N]
//! ```

use crate::envelope::ContentCipher;
use crate::error::Error;

/// Format version for both reserved materials.
pub const MATERIAL_VERSION: u8 = 1;

/// Reserved attribute name holding the wrapped data key material.
pub const RESERVED_KEY_ATTR: &str = "*muhur-key*";

/// Reserved attribute name holding the record signature material.
pub const RESERVED_SIG_ATTR: &str = "*muhur-sig*";

/// Algorithm used to wrap the per-record data key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapAlgorithm {
    /// ChaCha20-Poly1305 over the raw DEK, nonce prepended.
    ChaCha20Poly1305,
}

impl WrapAlgorithm {
    /// Stable identifier byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ChaCha20Poly1305 => 1,
        }
    }

    /// Parses an identifier byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// Algorithm used to sign the canonical record form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// HMAC-SHA256 with a shared secret.
    HmacSha256,
    /// Ed25519 with an asymmetric keypair.
    Ed25519,
}

impl SignatureAlgorithm {
    /// Stable identifier byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::HmacSha256 => 1,
            Self::Ed25519 => 2,
        }
    }

    /// Parses an identifier byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::HmacSha256),
            2 => Some(Self::Ed25519),
            _ => None,
        }
    }
}

/// The wrapped data key material stored in [`RESERVED_KEY_ATTR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedDataKey {
    version: u8,
    wrap_algorithm: WrapAlgorithm,
    content_cipher: ContentCipher,
    key_id: String,
    wrapped: Vec<u8>,
}

impl WrappedDataKey {
    /// Creates new wrapped key material.
    ///
    /// # Arguments
    ///
    /// * `wrap_algorithm` - Algorithm the provider used to wrap the DEK
    /// * `content_cipher` - Cipher used for attribute contents
    /// * `key_id` - Provider identifier for the wrapping key
    /// * `wrapped` - The wrapped (encrypted) DEK
    #[must_use]
    pub fn new(
        wrap_algorithm: WrapAlgorithm,
        content_cipher: ContentCipher,
        key_id: impl Into<String>,
        wrapped: Vec<u8>,
    ) -> Self {
        Self {
            version: MATERIAL_VERSION,
            wrap_algorithm,
            content_cipher,
            key_id: key_id.into(),
            wrapped,
        }
    }

    /// Returns the wrap algorithm.
    #[must_use]
    pub const fn wrap_algorithm(&self) -> WrapAlgorithm {
        self.wrap_algorithm
    }

    /// Returns the cipher used for attribute contents.
    #[must_use]
    pub const fn content_cipher(&self) -> ContentCipher {
        self.content_cipher
    }

    /// Returns the wrapping key identifier.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the wrapped DEK bytes.
    #[must_use]
    pub fn wrapped(&self) -> &[u8] {
        &self.wrapped
    }

    /// Serializes the material to bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the key id exceeds 255 bytes or
    /// the wrapped DEK exceeds 65535 bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        if self.key_id.len() > 255 {
            return Err(Error::Serialization(format!(
                "key id too long: {} bytes (max: 255)",
                self.key_id.len()
            )));
        }
        if self.wrapped.len() > 65535 {
            return Err(Error::Serialization(format!(
                "wrapped DEK too long: {} bytes (max: 65535)",
                self.wrapped.len()
            )));
        }

        let mut bytes = Vec::with_capacity(6 + self.key_id.len() + self.wrapped.len());
        bytes.push(self.version);
        bytes.push(self.wrap_algorithm.as_u8());
        bytes.push(self.content_cipher.as_u8());

        // Safe cast: length validated above (max 255)
        #[allow(clippy::cast_possible_truncation)]
        let key_id_len = self.key_id.len() as u8;
        bytes.push(key_id_len);
        bytes.extend_from_slice(self.key_id.as_bytes());

        // Safe cast: length validated above (max 65535)
        #[allow(clippy::cast_possible_truncation)]
        let wrapped_len = self.wrapped.len() as u16;
        bytes.extend_from_slice(&wrapped_len.to_be_bytes());
        bytes.extend_from_slice(&self.wrapped);

        Ok(bytes)
    }

    /// Deserializes the material from bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the data is truncated, the
    /// version is unknown, or any algorithm identifier is unknown.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 4 {
            return Err(Error::Serialization("wrapped key material truncated".to_string()));
        }

        let version = data[0];
        if version != MATERIAL_VERSION {
            return Err(Error::Serialization(format!(
                "unsupported material version: {version} (supported: {MATERIAL_VERSION})"
            )));
        }

        let wrap_algorithm = WrapAlgorithm::from_u8(data[1]).ok_or_else(|| {
            Error::Serialization(format!("unknown wrap algorithm: {}", data[1]))
        })?;
        let content_cipher = ContentCipher::from_u8(data[2]).ok_or_else(|| {
            Error::Serialization(format!("unknown content cipher: {}", data[2]))
        })?;

        let key_id_len = data[3] as usize;
        let mut pos = 4;
        if pos + key_id_len > data.len() {
            return Err(Error::Serialization("key id truncated".to_string()));
        }
        let key_id = String::from_utf8(data[pos..pos + key_id_len].to_vec())
            .map_err(|e| Error::Serialization(format!("invalid key id UTF-8: {e}")))?;
        pos += key_id_len;

        if pos + 2 > data.len() {
            return Err(Error::Serialization("missing wrapped DEK length".to_string()));
        }
        let wrapped_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        pos += 2;

        if pos + wrapped_len != data.len() {
            return Err(Error::Serialization("wrapped DEK length mismatch".to_string()));
        }
        let wrapped = data[pos..].to_vec();

        Ok(Self { version, wrap_algorithm, content_cipher, key_id, wrapped })
    }
}

/// The record signature material stored in [`RESERVED_SIG_ATTR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMaterial {
    version: u8,
    algorithm: SignatureAlgorithm,
    signature: Vec<u8>,
}

impl SignatureMaterial {
    /// Creates new signature material.
    #[must_use]
    pub fn new(algorithm: SignatureAlgorithm, signature: Vec<u8>) -> Self {
        Self { version: MATERIAL_VERSION, algorithm, signature }
    }

    /// Returns the signature algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Returns the raw signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Serializes the material to bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the signature exceeds 65535 bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        if self.signature.len() > 65535 {
            return Err(Error::Serialization(format!(
                "signature too long: {} bytes (max: 65535)",
                self.signature.len()
            )));
        }

        let mut bytes = Vec::with_capacity(4 + self.signature.len());
        bytes.push(self.version);
        bytes.push(self.algorithm.as_u8());

        // Safe cast: length validated above (max 65535)
        #[allow(clippy::cast_possible_truncation)]
        let sig_len = self.signature.len() as u16;
        bytes.extend_from_slice(&sig_len.to_be_bytes());
        bytes.extend_from_slice(&self.signature);

        Ok(bytes)
    }

    /// Deserializes the material from bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the data is truncated or any
    /// identifier is unknown.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 4 {
            return Err(Error::Serialization("signature material truncated".to_string()));
        }

        let version = data[0];
        if version != MATERIAL_VERSION {
            return Err(Error::Serialization(format!(
                "unsupported material version: {version} (supported: {MATERIAL_VERSION})"
            )));
        }

        let algorithm = SignatureAlgorithm::from_u8(data[1]).ok_or_else(|| {
            Error::Serialization(format!("unknown signature algorithm: {}", data[1]))
        })?;

        let sig_len = u16::from_be_bytes([data[2], data[3]]) as usize;
        if 4 + sig_len != data.len() {
            return Err(Error::Serialization("signature length mismatch".to_string()));
        }

        Ok(Self { version, algorithm, signature: data[4..].to_vec() })
    }
}
