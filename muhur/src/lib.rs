//! # `Muhur`
//!
//! Client-side, per-attribute record encryption for structured
//! key-value records: envelope encryption of designated attributes and
//! a signature over the whole record, bound to the table it came from.
//!
//! ## Features
//!
//! - Per-attribute actions: do nothing, sign only, encrypt and sign
//! - Envelope encryption with a fresh data key per record
//! - AEAD content ciphers (ChaCha20-Poly1305, AES-256-GCM)
//! - Deterministic canonical signing form, order-independent
//! - Pluggable materials providers (wrapped keys, static keys)
//! - Primary-key attributes are never encrypted, so they stay queryable
//!
//! ## Example
//!
//! ```rust,ignore
//! use muhur::prelude::*;
//!
//! let provider = WrappedMaterialsProvider::generate();
//! let encryptor = RecordEncryptor::new(provider, ContentCipher::default());
//!
//! let context = EncryptionContext::new("inventory", "partition_attribute")
//!     .with_sort_key("sort_attribute");
//! let actions = AttributeActions::new()
//!     .with_default(AttributeAction::EncryptAndSign)
//!     .with_attribute("partition_attribute", AttributeAction::SignOnly)
//!     .with_attribute("sort_attribute", AttributeAction::SignOnly);
//!
//! let encrypted = encryptor.encrypt_record(&record, &actions, &context)?;
//! let decrypted = encryptor.decrypt_record(&encrypted, &actions, &context)?;
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod canonical;
pub mod context;
pub mod encryptor;
pub mod envelope;
pub mod error;
pub mod material;
pub mod materials;
pub mod providers;
pub mod value;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::actions::{AttributeAction, AttributeActions};
    pub use crate::context::EncryptionContext;
    pub use crate::encryptor::RecordEncryptor;
    pub use crate::envelope::ContentCipher;
    pub use crate::error::{Error, MaterialsError};
    pub use crate::materials::MaterialsProvider;
    pub use crate::providers::{StaticMaterialsProvider, WrappedMaterialsProvider};
    pub use crate::value::{AttributeValue, Record};
}
