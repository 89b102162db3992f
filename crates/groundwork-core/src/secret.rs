//! Secret references.
//!
//! A [`SecretRef`] is an opaque handle; the value behind it is resolved by a
//! [`SecretStore`] at execution time and never materialized in resource
//! specifications or logs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Opaque handle to a secret held by an external store. Serializing a
/// `SecretRef` serializes the path, never the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretRef(String);

impl SecretRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecretRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display the path only. The value must never reach log output.
        write!(f, "secret:{}", self.0)
    }
}

/// Trait for secret storage backends.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Resolve a secret reference to its current value.
    async fn resolve(&self, secret: &SecretRef) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_path_not_value() {
        let secret = SecretRef::new("shop/source-token");
        assert_eq!(secret.to_string(), "secret:shop/source-token");
    }
}
