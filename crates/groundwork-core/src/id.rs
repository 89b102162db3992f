//! Logical identifiers and deferred attribute references.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use uuid::Uuid;

/// Stable identity of a resource within a composition.
///
/// Logical ids are derived from the stack scope and the resource's role
/// (`"shop/load-balancer"`), never from random state. Re-composing the same
/// specifications yields the same ids, which is what lets a reconciling
/// provisioner re-apply a stack without creating duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(scope: &str, role: &str) -> Self {
        Self(format!("{scope}/{role}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LogicalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LogicalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Attributes a provisioned resource can export to its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum Attr {
    /// Provider-assigned identity (ARN-equivalent).
    #[display("identity")]
    Identity,
    /// Resolved DNS name (load balancers).
    #[display("dns-name")]
    DnsName,
    /// Hosted zone id.
    #[display("zone-id")]
    ZoneId,
    /// Scaling group name.
    #[display("group-name")]
    GroupName,
    /// Bucket name.
    #[display("bucket-name")]
    BucketName,
}

/// A value that only exists once the referenced resource has been
/// provisioned. Resolved by the apply engine from accumulated outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttrRef {
    pub resource: LogicalId,
    pub attr: Attr,
}

impl AttrRef {
    pub fn new(resource: LogicalId, attr: Attr) -> Self {
        Self { resource, attr }
    }
}

/// Typed handle to a resource registered in a composition.
///
/// Only [`Composition::add`](crate::Composition::add) produces these, so
/// holding one proves the resource exists in the graph. Dependents that
/// require a `ResourceRef` cannot be built before their dependency.
pub struct ResourceRef<T> {
    id: LogicalId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ResourceRef<T> {
    pub(crate) fn new(id: LogicalId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &LogicalId {
        &self.id
    }

    /// Deferred reference to one of this resource's exported attributes.
    pub fn attr(&self, attr: Attr) -> AttrRef {
        AttrRef::new(self.id.clone(), attr)
    }
}

impl<T> Clone for ResourceRef<T> {
    fn clone(&self) -> Self {
        Self::new(self.id.clone())
    }
}

impl<T> std::fmt::Debug for ResourceRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ResourceRef").field(&self.id).finish()
    }
}

impl<T> PartialEq for ResourceRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for ResourceRef<T> {}

/// A unique identifier for a pipeline run instance.
/// Uses UUIDv7 for time-ordered, sortable IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_ids_are_stable_across_derivations() {
        let a = LogicalId::new("shop", "load-balancer");
        let b = LogicalId::new("shop", "load-balancer");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "shop/load-balancer");
    }

    #[test]
    fn attr_serializes_kebab_case() {
        let json = serde_json::to_string(&Attr::DnsName).unwrap();
        assert_eq!(json, "\"dns-name\"");
    }
}
