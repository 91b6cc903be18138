//! Storefront-side customer identity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`ExternalId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalIdError {
    /// The input is empty or whitespace only.
    #[error("external id cannot be empty")]
    Empty,
}

/// The identifier a storefront uses for a customer, stored on the matching
/// Odoo user record.
///
/// The value is opaque: no format is enforced and lookups use it verbatim.
/// Only surrounding whitespace is removed, since it arrives as a query-string
/// parameter.
///
/// ## Examples
///
/// ```
/// use odoo_bridge_core::ExternalId;
///
/// assert_eq!(ExternalId::parse(" ext-42 ").unwrap().as_str(), "ext-42");
/// assert!(ExternalId::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Parse an `ExternalId` from a string.
    ///
    /// # Errors
    ///
    /// Returns [`ExternalIdError::Empty`] if nothing remains after trimming.
    pub fn parse(s: &str) -> Result<Self, ExternalIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ExternalIdError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ExternalId {
    type Err = ExternalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
