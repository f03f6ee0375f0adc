//! File-based materials provider for `muhur`.
//!
//! This provider stores key material in the filesystem and is suitable
//! for development and testing environments.

#![warn(clippy::pedantic, clippy::nursery)]

use ed25519_dalek::SigningKey;
use muhur::context::EncryptionContext;
use muhur::error::MaterialsError;
use muhur::materials::{
    MaterialsProvider, SigningKeyMaterial, VerificationKeyMaterial, WrappedKey,
};
use muhur::providers::WrappedMaterialsProvider;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretVec;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Root wrapping secret file name.
const ROOT_KEY_FILE: &str = "root.key";

/// Ed25519 signing seed file name.
const SIGNING_KEY_FILE: &str = "signing.key";

/// Size of both key files in bytes.
const KEY_FILE_SIZE: usize = 32;

/// File-based materials provider for development and testing.
///
/// Key material is stored in a directory with the following structure:
/// ```text
/// keys/
/// ├── root.key      (32 bytes, 0600 permissions, wrap root secret)
/// └── signing.key   (32 bytes, 0600 permissions, Ed25519 seed)
/// ```
///
/// # Example
///
/// ```rust,ignore
/// use muhur_key_file::FileMaterialsProvider;
///
/// FileMaterialsProvider::init("./keys")?;
/// let provider = FileMaterialsProvider::new("./keys")?;
/// ```
pub struct FileMaterialsProvider {
    inner: WrappedMaterialsProvider,
}

impl FileMaterialsProvider {
    /// Loads a provider from an initialized key directory.
    ///
    /// # Errors
    ///
    /// Returns `MaterialsError::KeyUnavailable` if the directory or a
    /// key file is missing or has the wrong size.
    pub fn new(key_dir: impl Into<PathBuf>) -> Result<Self, MaterialsError> {
        let key_dir = key_dir.into();
        if !key_dir.exists() {
            return Err(MaterialsError::KeyUnavailable(format!(
                "key directory does not exist: {}",
                key_dir.display()
            )));
        }

        let root = Zeroizing::new(read_key_file(&key_dir.join(ROOT_KEY_FILE))?);
        let seed = Zeroizing::new(read_key_file(&key_dir.join(SIGNING_KEY_FILE))?);

        let mut seed_bytes = [0u8; KEY_FILE_SIZE];
        seed_bytes.copy_from_slice(&seed);
        let signing = SigningKey::from_bytes(&seed_bytes);
        seed_bytes.fill(0);

        Ok(Self { inner: WrappedMaterialsProvider::new(SecretVec::new(root.to_vec()), signing) })
    }

    /// Initializes a key directory with fresh random key material.
    ///
    /// Existing key files are kept, so repeated calls are safe.
    ///
    /// # Errors
    ///
    /// Returns `MaterialsError::Io` if directory creation or key file
    /// writing fails.
    pub fn init(key_dir: impl Into<PathBuf>) -> Result<(), MaterialsError> {
        let key_dir = key_dir.into();
        fs::create_dir_all(&key_dir)?;

        for name in [ROOT_KEY_FILE, SIGNING_KEY_FILE] {
            let path = key_dir.join(name);
            if path.exists() {
                continue;
            }

            let mut key = Zeroizing::new(vec![0u8; KEY_FILE_SIZE]);
            OsRng.fill_bytes(&mut key);
            fs::write(&path, key.as_slice())?;
            restrict_permissions(&path)?;
        }

        Ok(())
    }
}

fn read_key_file(path: &Path) -> Result<Vec<u8>, MaterialsError> {
    let bytes = fs::read(path).map_err(|e| {
        MaterialsError::KeyUnavailable(format!("cannot read {}: {e}", path.display()))
    })?;
    if bytes.len() != KEY_FILE_SIZE {
        return Err(MaterialsError::KeyUnavailable(format!(
            "{} has wrong size: {} bytes (expected {KEY_FILE_SIZE})",
            path.display(),
            bytes.len()
        )));
    }
    Ok(bytes)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), MaterialsError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), MaterialsError> {
    Ok(())
}

impl MaterialsProvider for FileMaterialsProvider {
    fn wrap_data_key(
        &self,
        data_key: &[u8],
        context: &EncryptionContext,
    ) -> Result<WrappedKey, MaterialsError> {
        self.inner.wrap_data_key(data_key, context)
    }

    fn unwrap_data_key(
        &self,
        wrapped: &WrappedKey,
        context: &EncryptionContext,
    ) -> Result<SecretVec<u8>, MaterialsError> {
        self.inner.unwrap_data_key(wrapped, context)
    }

    fn signing_key(
        &self,
        context: &EncryptionContext,
    ) -> Result<SigningKeyMaterial, MaterialsError> {
        self.inner.signing_key(context)
    }

    fn verification_key(
        &self,
        context: &EncryptionContext,
    ) -> Result<VerificationKeyMaterial, MaterialsError> {
        self.inner.verification_key(context)
    }
}
