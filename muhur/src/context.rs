//! Encryption context describing where a record lives.
//!
//! The context binds ciphertexts and signatures to their origin: a
//! table/collection identifier plus the names of the attribute(s)
//! forming the record's primary key. A record encrypted for one table
//! cannot be verified as belonging to another.

use std::fmt;

/// Context for record encryption, used for key derivation and to bind
/// signatures to their origin.
///
/// # Example
///
/// ```
/// use muhur::context::EncryptionContext;
///
/// let ctx = EncryptionContext::new("inventory", "partition_attribute")
///     .with_sort_key("sort_attribute");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionContext {
    table_name: String,
    partition_key_name: String,
    sort_key_name: Option<String>,
}

impl EncryptionContext {
    /// Creates a new context for a table with the given partition key.
    #[must_use]
    pub fn new(table_name: impl Into<String>, partition_key_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            partition_key_name: partition_key_name.into(),
            sort_key_name: None,
        }
    }

    /// Sets the sort key attribute name, for tables with a composite key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key_name: impl Into<String>) -> Self {
        self.sort_key_name = Some(sort_key_name.into());
        self
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the partition key attribute name.
    #[must_use]
    pub fn partition_key_name(&self) -> &str {
        &self.partition_key_name
    }

    /// Returns the sort key attribute name, if the table has one.
    #[must_use]
    pub fn sort_key_name(&self) -> Option<&str> {
        self.sort_key_name.as_deref()
    }

    /// Returns whether `name` is one of the primary-key attributes.
    #[must_use]
    pub fn is_primary_key(&self, name: &str) -> bool {
        name == self.partition_key_name || self.sort_key_name.as_deref() == Some(name)
    }
}

impl fmt::Display for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.table_name, self.partition_key_name)?;
        if let Some(sort_key) = &self.sort_key_name {
            write!(f, "|{sort_key}")?;
        }
        Ok(())
    }
}
