//! Compute specifications: launch templates, bootstrap sequences, scaling
//! groups and the load-balancing front end.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::id::LogicalId;

/// Base machine image for instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineImage {
    /// Latest image of the provider's standard Linux line for a generation
    /// year (e.g. 2023).
    StandardLinux { generation: u16 },
    /// A specific prebuilt image.
    Custom { image_id: String },
}

/// Injected key credential for operator access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineKeyPair {
    pub key_name: String,
}

/// Operator identity attached to instances. Managed permissions only by
/// default; inline actions stay empty unless a caller opts in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceProfile {
    pub managed_policies: Vec<String>,
    pub inline_actions: Vec<String>,
}

/// One step of the declarative bootstrap sequence. Every step states
/// desired state, so replaying the sequence on an already-bootstrapped
/// instance converges without failing or duplicating anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootstrapStep {
    /// Install a package from the image's package manager.
    Package { name: String },
    /// Run a shell command.
    Command { exec: String },
    /// Place a file verbatim at a fixed path.
    File { path: String, source: String },
    /// Enable a service, restarting it when watched config files change.
    Service {
        name: String,
        enabled: bool,
        restart_on_change: bool,
    },
}

/// Template every instance in a scaling group launches from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTemplate {
    pub instance_type: String,
    pub machine_image: MachineImage,
    pub access_policy: LogicalId,
    pub profile: LogicalId,
    pub key_pair: LogicalId,
    pub bootstrap: Vec<BootstrapStep>,
}

/// Which subnet tier instances are placed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetSelection {
    Public,
    Private,
}

/// Launch success contract for a scaling group. The group only counts as
/// launched once `min_count` instances report success and the success rate
/// over all attempts stays at or above `min_success_percent` within
/// `timeout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPolicy {
    pub min_count: u32,
    pub min_success_percent: u8,
    pub timeout: Duration,
}

impl SignalPolicy {
    pub fn wait_for_count(min_count: u32, timeout: Duration) -> Self {
        Self {
            min_count,
            min_success_percent: 80,
            timeout,
        }
    }
}

/// A managed pool of instances that self-heals to a desired count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingGroup {
    pub network: LogicalId,
    pub launch_template: LogicalId,
    pub subnets: SubnetSelection,
    pub signals: Option<SignalPolicy>,
}

/// Traffic distribution front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub network: LogicalId,
    pub access_policy: LogicalId,
    pub internet_facing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Instance,
}

/// HTTP health check the target group runs against its backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub interval: Duration,
}

/// Pool of backends a load balancer forwards to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub network: LogicalId,
    pub target_type: TargetType,
    pub port: u16,
    /// Registered targets, typically a single scaling group.
    pub targets: Vec<LogicalId>,
    pub health_check: HealthCheck,
}

/// Protocol-specific entry point on a load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub load_balancer: LogicalId,
    pub port: u16,
    /// Certificate for encrypted transport. Required on the secure port.
    pub certificate: Option<LogicalId>,
    pub default_target_group: LogicalId,
    /// Whether the listener's port is opened in the access policy.
    pub open: bool,
}
