//! In-memory provisioner. Backs dry runs from the CLI and the engine's
//! tests; reconciles by logical id like a real provisioning engine would.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tracing::debug;

use async_trait::async_trait;
use groundwork_core::provisioner::{Provisioner, ResolvedResource, ResourceState, SignalReport};
use groundwork_core::storage::RemovalPolicy;
use groundwork_core::{Attr, Error, LogicalId, ResourceKind, Result};

#[derive(Default)]
struct MemoryState {
    resources: BTreeMap<LogicalId, ResolvedResource>,
    apply_log: Vec<LogicalId>,
    destroy_log: Vec<LogicalId>,
    signal_scripts: HashMap<LogicalId, VecDeque<SignalReport>>,
    fail_on: HashSet<LogicalId>,
}

/// A provisioner that holds everything in process memory.
///
/// Outputs are deterministic functions of the logical id, so repeated
/// applies of the same composition resolve deferred references to the same
/// values. Signal reports can be scripted per scaling group; without a
/// script a group reports one successful launch immediately.
#[derive(Default)]
pub struct MemoryProvisioner {
    state: Mutex<MemoryState>,
}

impl MemoryProvisioner {
    pub fn resource_count(&self) -> usize {
        self.lock().resources.len()
    }

    pub fn resource(&self, id: &LogicalId) -> Option<ResolvedResource> {
        self.lock().resources.get(id).cloned()
    }

    pub fn apply_log(&self) -> Vec<LogicalId> {
        self.lock().apply_log.clone()
    }

    pub fn destroy_log(&self) -> Vec<LogicalId> {
        self.lock().destroy_log.clone()
    }

    /// Queue the signal reports a scaling group will return, in order. The
    /// last report repeats once the queue drains.
    pub fn script_signals(&self, id: LogicalId, reports: Vec<SignalReport>) {
        self.lock().signal_scripts.insert(id, reports.into());
    }

    /// Make the next apply of `id` fail with a provisioning error.
    pub fn fail_on(&self, id: LogicalId) {
        self.lock().fail_on.insert(id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Deterministic outputs per resource kind, derived from the logical id.
fn synthesize_outputs(resource: &ResolvedResource) -> HashMap<Attr, String> {
    let slug = resource.id.to_string().replace('/', "-");
    let mut outputs = HashMap::new();
    outputs.insert(Attr::Identity, format!("mem-{slug}"));
    match resource.props.kind() {
        ResourceKind::LoadBalancer => {
            outputs.insert(Attr::DnsName, format!("{slug}.lb.internal"));
        }
        ResourceKind::DnsZone => {
            outputs.insert(Attr::ZoneId, format!("zone-{slug}"));
        }
        ResourceKind::ScalingGroup => {
            outputs.insert(Attr::GroupName, slug.clone());
        }
        ResourceKind::Bucket => {
            outputs.insert(Attr::BucketName, slug.clone());
        }
        _ => {}
    }
    outputs
}

#[async_trait]
impl Provisioner for MemoryProvisioner {
    async fn apply(&self, resource: &ResolvedResource) -> Result<ResourceState> {
        let mut state = self.lock();
        if state.fail_on.remove(&resource.id) {
            return Err(Error::Provisioning {
                resource: resource.id.clone(),
                message: "injected failure".to_string(),
            });
        }

        debug!(resource = %resource.id, "reconciling in memory");
        let converging = resource.props.signal_policy().is_some();
        let outputs = synthesize_outputs(resource);

        // Upsert: applying the same id again replaces, never duplicates.
        state
            .resources
            .insert(resource.id.clone(), resource.clone());
        state.apply_log.push(resource.id.clone());

        Ok(ResourceState {
            outputs,
            converging,
        })
    }

    async fn destroy(&self, id: &LogicalId, policy: RemovalPolicy) -> Result<()> {
        let mut state = self.lock();
        state.destroy_log.push(id.clone());
        if policy == RemovalPolicy::Retain {
            debug!(resource = %id, "retained on destroy");
            return Ok(());
        }
        state.resources.remove(id);
        Ok(())
    }

    async fn signal_report(&self, id: &LogicalId) -> Result<SignalReport> {
        let mut state = self.lock();
        if let Some(queue) = state.signal_scripts.get_mut(id) {
            if queue.len() > 1 {
                return Ok(queue.pop_front().unwrap_or_default());
            }
            if let Some(last) = queue.front() {
                return Ok(*last);
            }
        }
        Ok(SignalReport {
            expected: 1,
            succeeded: 1,
            failed: 0,
        })
    }
}
