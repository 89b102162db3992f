//! The apply engine: ordered, output-propagating, idempotent re-apply.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

use groundwork_core::compute::SignalPolicy;
use groundwork_core::provisioner::{Provisioner, ResolvedResource};
use groundwork_core::{Attr, Composition, Error, LogicalId, ResourceKind, Result};

/// A validated provisioning order for one composition.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    pub id: LogicalId,
    pub kind: ResourceKind,
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for step in &self.steps {
            writeln!(f, "  + {:<16} {}", step.kind.to_string(), step.id)?;
        }
        Ok(())
    }
}

/// Outcome of a completed apply: the order used and every resource's
/// exported outputs.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub order: Vec<LogicalId>,
    pub outputs: HashMap<LogicalId, HashMap<Attr, String>>,
}

impl ApplyReport {
    pub fn output(&self, id: &LogicalId, attr: Attr) -> Option<&str> {
        self.outputs.get(id)?.get(&attr).map(String::as_str)
    }
}

/// Drives a composition through an external provisioning engine.
///
/// Applies are sequential: each resource completes (or is accepted as
/// converging) before its outputs are handed to the next dependent. The
/// only suspension point is the launch-signal wait on scaling groups, which
/// blocks the whole apply by design.
pub struct ApplyEngine {
    provisioner: Arc<dyn Provisioner>,
    signal_poll_interval: Duration,
}

impl ApplyEngine {
    pub fn new(provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            provisioner,
            signal_poll_interval: Duration::from_secs(10),
        }
    }

    /// Override the signal polling cadence (tests use millisecond polls).
    pub fn with_signal_poll_interval(mut self, interval: Duration) -> Self {
        self.signal_poll_interval = interval;
        self
    }

    /// Derive the provisioning order without touching the provisioner.
    pub fn plan(&self, comp: &Composition) -> Result<Plan> {
        let order = comp.ordered()?;
        let steps = order
            .into_iter()
            .map(|id| {
                let kind = comp
                    .get(&id)
                    .map(|spec| spec.props.kind())
                    .ok_or_else(|| Error::DependencyOrdering {
                        resource: id.clone(),
                        missing: id.clone(),
                    })?;
                Ok(PlanStep { id, kind })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Plan { steps })
    }

    /// Apply every resource in dependency order, propagating outputs.
    ///
    /// Any failure aborts the apply and propagates; already-applied
    /// resources are left for the provisioner to reconcile on the next
    /// apply. Nothing is retried here.
    pub async fn apply(&self, comp: &Composition) -> Result<ApplyReport> {
        let plan = self.plan(comp)?;
        let mut report = ApplyReport::default();

        for step in &plan.steps {
            let spec = comp.get(&step.id).ok_or_else(|| Error::DependencyOrdering {
                resource: step.id.clone(),
                missing: step.id.clone(),
            })?;
            let resolved = resolve_resource(&step.id, spec, &report.outputs)?;

            info!(resource = %step.id, kind = %step.kind, "applying resource");
            let state = match self.provisioner.apply(&resolved).await {
                Ok(state) => state,
                Err(e) => {
                    error!(resource = %step.id, error = %e, "apply failed");
                    return Err(e);
                }
            };

            if let Some(policy) = spec.props.signal_policy() {
                self.wait_for_signals(&step.id, policy).await?;
            }

            report.outputs.insert(step.id.clone(), state.outputs);
            report.order.push(step.id.clone());
        }

        info!(resources = report.order.len(), "apply complete");
        Ok(report)
    }

    /// Tear the composition down in reverse dependency order.
    pub async fn destroy(&self, comp: &Composition) -> Result<()> {
        let plan = self.plan(comp)?;
        for step in plan.steps.iter().rev() {
            let spec = comp.get(&step.id).ok_or_else(|| Error::DependencyOrdering {
                resource: step.id.clone(),
                missing: step.id.clone(),
            })?;
            let policy = spec.props.removal_policy();
            info!(resource = %step.id, policy = %policy, "destroying resource");
            self.provisioner.destroy(&step.id, policy).await?;
        }
        Ok(())
    }

    /// Block until the scaling group meets its launch success contract.
    ///
    /// Succeeds once `min_count` signals arrived and the success rate is at
    /// or above the threshold (exactly the threshold passes). Fails as soon
    /// as all expected attempts reported below the threshold, or when the
    /// timeout elapses.
    async fn wait_for_signals(&self, group: &LogicalId, policy: &SignalPolicy) -> Result<()> {
        let started = Instant::now();
        let threshold = f64::from(policy.min_success_percent);

        loop {
            let report = self.provisioner.signal_report(group).await?;
            let percent = report.success_percent();

            if report.succeeded >= policy.min_count && percent >= threshold {
                info!(
                    resource = %group,
                    succeeded = report.succeeded,
                    percent,
                    "launch signals satisfied"
                );
                return Ok(());
            }

            let exhausted = report.expected > 0 && report.completed() >= report.expected;
            if exhausted || started.elapsed() >= policy.timeout {
                error!(
                    resource = %group,
                    percent,
                    elapsed = ?started.elapsed(),
                    "launch signal contract not met"
                );
                return Err(Error::LaunchSignalTimeout {
                    group: group.clone(),
                    observed_percent: percent,
                    elapsed: started.elapsed(),
                });
            }

            let remaining = policy.timeout.saturating_sub(started.elapsed());
            tokio::time::sleep(self.signal_poll_interval.min(remaining)).await;
        }
    }
}

/// Replace every deferred attribute reference with the concrete output of
/// its dependency. A missing output here means a resource was handed to the
/// provisioner before its dependency, which the composition rules prevent
/// by construction.
pub(crate) fn resolve_resource(
    id: &LogicalId,
    spec: &groundwork_core::ResourceSpec,
    outputs: &HashMap<LogicalId, HashMap<Attr, String>>,
) -> Result<ResolvedResource> {
    let mut values = BTreeMap::new();
    for (label, attr_ref) in spec.props.deferred() {
        let value = outputs
            .get(&attr_ref.resource)
            .and_then(|attrs| attrs.get(&attr_ref.attr))
            .ok_or_else(|| Error::DependencyOrdering {
                resource: id.clone(),
                missing: attr_ref.resource.clone(),
            })?;
        values.insert(label, value.clone());
    }
    Ok(ResolvedResource {
        id: id.clone(),
        props: spec.props.clone(),
        values,
    })
}
