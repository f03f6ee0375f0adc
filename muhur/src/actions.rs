//! Per-attribute actions and their resolution.
//!
//! Each attribute of a record gets exactly one action: leave it alone,
//! cover it with the record signature, or encrypt it and cover it.
//! Primary-key attributes must stay queryable in plaintext, so they are
//! capped at [`AttributeAction::SignOnly`]: an explicit request to
//! encrypt one is a hard configuration error, while a default action of
//! `EncryptAndSign` is quietly downgraded for them.

use crate::context::EncryptionContext;
use crate::error::Error;
use crate::value::Record;
use std::collections::BTreeMap;

/// What to do with one attribute during record encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeAction {
    /// Leave the attribute untouched and unsigned.
    DoNothing,
    /// Cover the attribute with the record signature, keep it in plaintext.
    SignOnly,
    /// Encrypt the attribute and cover the ciphertext with the signature.
    EncryptAndSign,
}

impl AttributeAction {
    /// Stable single-byte encoding used in the canonical signing form.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::DoNothing => 0,
            Self::SignOnly => 1,
            Self::EncryptAndSign => 2,
        }
    }
}

/// Caller configuration mapping attribute names to actions.
///
/// Attributes without an explicit entry get the default action
/// (`DoNothing` unless changed).
///
/// # Example
///
/// ```
/// use muhur::actions::{AttributeAction, AttributeActions};
///
/// let actions = AttributeActions::new()
///     .with_default(AttributeAction::EncryptAndSign)
///     .with_attribute("partition_attribute", AttributeAction::SignOnly)
///     .with_attribute("leave me", AttributeAction::DoNothing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeActions {
    default_action: AttributeAction,
    overrides: BTreeMap<String, AttributeAction>,
}

impl AttributeActions {
    /// Creates an action map with a `DoNothing` default.
    #[must_use]
    pub fn new() -> Self {
        Self { default_action: AttributeAction::DoNothing, overrides: BTreeMap::new() }
    }

    /// Sets the default action for unlisted attributes.
    #[must_use]
    pub fn with_default(mut self, action: AttributeAction) -> Self {
        self.default_action = action;
        self
    }

    /// Sets the action for one named attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, action: AttributeAction) -> Self {
        self.overrides.insert(name.into(), action);
        self
    }

    /// Returns the default action.
    #[must_use]
    pub const fn default_action(&self) -> AttributeAction {
        self.default_action
    }

    /// Returns the explicitly configured action for `name`, if any.
    #[must_use]
    pub fn explicit_action(&self, name: &str) -> Option<AttributeAction> {
        self.overrides.get(name).copied()
    }
}

impl Default for AttributeActions {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the final action for every attribute in `record`.
///
/// Policy:
/// 1. Primary-key attributes are capped at `SignOnly`. An explicit
///    `EncryptAndSign` on one is rejected; a default-derived
///    `EncryptAndSign` is downgraded to `SignOnly`.
/// 2. Explicitly listed attributes use their listed action.
/// 3. Unlisted attributes use the default action.
///
/// # Errors
///
/// Returns `Error::InvalidConfiguration` if a primary-key attribute is
/// explicitly configured as `EncryptAndSign`.
pub fn resolve_actions(
    record: &Record,
    actions: &AttributeActions,
    context: &EncryptionContext,
) -> Result<BTreeMap<String, AttributeAction>, Error> {
    let mut resolved = BTreeMap::new();

    for name in record.keys() {
        let action = if context.is_primary_key(name) {
            match actions.explicit_action(name) {
                Some(AttributeAction::EncryptAndSign) => {
                    return Err(Error::InvalidConfiguration(format!(
                        "primary-key attribute {name:?} cannot be encrypted; it must stay queryable"
                    )));
                }
                Some(action) => action,
                None => match actions.default_action() {
                    AttributeAction::EncryptAndSign => AttributeAction::SignOnly,
                    action => action,
                },
            }
        } else {
            actions.explicit_action(name).unwrap_or_else(|| actions.default_action())
        };

        resolved.insert(name.clone(), action);
    }

    Ok(resolved)
}
