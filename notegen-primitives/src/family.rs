//! Template family identifiers.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_KEY_LEN: usize = 64;

/// Stable key naming a template family (e.g. `public_markdown`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FamilyKey(String);

impl FamilyKey {
    /// Creates a new family key after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFamilyKey`] if the key is empty, too long, or
    /// contains characters other than lowercase alphanumerics, dash, or underscore.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self(key))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FamilyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FamilyKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FamilyKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for FamilyKey {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FamilyKey> for String {
    fn from(value: FamilyKey) -> Self {
        value.0
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidFamilyKey {
            key: String::new(),
            reason: "key cannot be empty".into(),
        });
    }

    if key.len() > MAX_KEY_LEN {
        return Err(Error::InvalidFamilyKey {
            key: key.into(),
            reason: format!("key length must be <= {MAX_KEY_LEN}"),
        });
    }

    if !key
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_'))
    {
        return Err(Error::InvalidFamilyKey {
            key: key.into(),
            reason: "key must contain lowercase alphanumeric, dash, or underscore".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_snake_case_keys() {
        let key = FamilyKey::new("public_markdown").unwrap();
        assert_eq!(key.as_str(), "public_markdown");
    }

    #[test]
    fn rejects_invalid_keys() {
        assert!(FamilyKey::new("").is_err());
        assert!(FamilyKey::new("Public Markdown").is_err());
        assert!(FamilyKey::new("a".repeat(65)).is_err());
    }
}
