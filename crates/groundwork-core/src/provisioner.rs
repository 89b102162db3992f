//! Provisioner trait: the seam to the external cloud resource engine.
//!
//! The composition layer only ever hands the provisioner fully resolved,
//! declarative specifications. Reconciliation (create vs. update vs.
//! replace) is the provisioner's concern, not ours.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::id::{Attr, LogicalId};
use crate::resource::ResourceProps;
use crate::storage::RemovalPolicy;
use crate::Result;

/// A resource specification with every deferred attribute reference
/// replaced by the concrete value its dependency exported.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedResource {
    pub id: LogicalId,
    pub props: ResourceProps,
    /// Resolved deferred values, keyed by the property label they fill
    /// (e.g. "target.dns-name").
    pub values: BTreeMap<String, String>,
}

/// State the provisioner reports back after reconciling a resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceState {
    /// Outputs this resource exports to its dependents.
    pub outputs: HashMap<Attr, String>,
    /// True when the engine accepted the spec but the resource is still
    /// converging (e.g. a scaling group waiting on launch signals).
    pub converging: bool,
}

/// Launch signal counts reported for a scaling group during creation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SignalReport {
    /// Launch attempts the group expects to hear back from.
    pub expected: u32,
    pub succeeded: u32,
    pub failed: u32,
}

impl SignalReport {
    pub fn completed(&self) -> u32 {
        self.succeeded + self.failed
    }

    /// Success rate over the attempts that have reported so far.
    pub fn success_percent(&self) -> f64 {
        if self.completed() == 0 {
            return 0.0;
        }
        f64::from(self.succeeded) * 100.0 / f64::from(self.completed())
    }
}

/// Trait for external provisioning engines.
///
/// Implementations must support create/update/delete reconciliation keyed by
/// logical id: applying the same specification twice must converge on one
/// resource, never two.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Reconcile one resource to its declared state and return its outputs.
    async fn apply(&self, resource: &ResolvedResource) -> Result<ResourceState>;

    /// Tear down one resource, honoring its removal policy.
    async fn destroy(&self, id: &LogicalId, policy: RemovalPolicy) -> Result<()>;

    /// Current launch signal counts for a converging scaling group.
    async fn signal_report(&self, id: &LogicalId) -> Result<SignalReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_percent_over_completed_attempts() {
        let report = SignalReport {
            expected: 5,
            succeeded: 4,
            failed: 1,
        };
        assert_eq!(report.success_percent(), 80.0);
    }

    #[test]
    fn success_percent_with_no_reports_is_zero() {
        assert_eq!(SignalReport::default().success_percent(), 0.0);
    }
}
