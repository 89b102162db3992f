//! DNS zone, certificate and record specifications.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::LogicalId;
use crate::resource::Value;

/// A hosted DNS zone for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsZone {
    pub domain: String,
}

/// How a certificate proves domain ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificateValidation {
    /// DNS challenge answered via records in the given zone.
    Dns { zone: LogicalId },
}

/// A TLS certificate covering a domain and optional alternative names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub domain: String,
    /// Additional covered names, typically the wildcard subdomain.
    pub alternative_names: Vec<String>,
    pub validation: CertificateValidation,
}

impl Certificate {
    /// The zone this certificate validates against.
    pub fn validation_zone(&self) -> &LogicalId {
        match &self.validation {
            CertificateValidation::Dns { zone } => zone,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            return Err(Error::Configuration(
                "certificate domain must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Alias target of a record set: the dependent resource's resolved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTarget {
    pub dns_name: Value,
}

/// An alias record binding a name in a zone to a target address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub zone: LogicalId,
    /// Fully qualified record name ("www.example.org" or the root domain).
    pub record_name: String,
    pub target: AliasTarget,
}
