//! Compute provider: launch template with bootstrap, scaling group with a
//! launch signal contract, and the load-balancing front end.

use std::time::Duration;

use groundwork_config::EnvironmentVariant;
use groundwork_core::compute::{
    BootstrapStep, HealthCheck, InstanceProfile, LaunchTemplate, Listener, LoadBalancer,
    MachineImage, MachineKeyPair, ScalingGroup, SignalPolicy, SubnetSelection, TargetGroup,
    TargetType,
};
use groundwork_core::distribution::Certificate;
use groundwork_core::network::{AccessPolicy, VirtualNetwork};
use groundwork_core::{Composition, LogicalId, ResourceRef, Result};

/// Outputs produced earlier in the composition that compute depends on.
pub struct ComputeInputs<'a> {
    pub network: &'a ResourceRef<VirtualNetwork>,
    pub access_policy: &'a ResourceRef<AccessPolicy>,
    pub certificate: &'a ResourceRef<Certificate>,
}

/// Variant knobs for the compute tier.
#[derive(Debug, Clone)]
pub struct ComputeSettings {
    pub instance_type: String,
    pub signal_timeout: Duration,
    pub toolchain_packages: Vec<String>,
    /// (instance path, source file) pairs placed verbatim during bootstrap.
    pub config_files: Vec<(String, String)>,
}

impl From<&EnvironmentVariant> for ComputeSettings {
    fn from(env: &EnvironmentVariant) -> Self {
        Self {
            instance_type: env.instance_type.clone(),
            signal_timeout: env.signal_timeout,
            toolchain_packages: env.toolchain_packages.clone(),
            config_files: env
                .bootstrap_files
                .iter()
                .map(|f| (f.path.clone(), f.source.clone()))
                .collect(),
        }
    }
}

/// Outputs the compute provider exposes to dependents.
#[derive(Debug, Clone)]
pub struct ComputeOutputs {
    pub scaling_group: ResourceRef<ScalingGroup>,
    pub load_balancer: ResourceRef<LoadBalancer>,
}

/// Create the scaling group and its load-balancing front end.
///
/// Any failing step (missing image, signal timeout, unvalidated
/// certificate) aborts the whole apply downstream; the listener is only
/// registered after the target group, so no partial compute group is ever
/// addressable through the load balancer.
pub fn create_compute(
    comp: &mut Composition,
    scope: &str,
    inputs: ComputeInputs<'_>,
    settings: &ComputeSettings,
) -> Result<ComputeOutputs> {
    let key_pair = comp.add(
        LogicalId::new(scope, "key-pair"),
        MachineKeyPair {
            key_name: format!("{scope}-key-pair"),
        },
    )?;

    let profile = comp.add(
        LogicalId::new(scope, "instance-profile"),
        InstanceProfile {
            managed_policies: vec!["managed-instance-core".to_string()],
            inline_actions: Vec::new(),
        },
    )?;

    let launch_template = comp.add(
        LogicalId::new(scope, "launch-template"),
        LaunchTemplate {
            instance_type: settings.instance_type.clone(),
            machine_image: MachineImage::StandardLinux { generation: 2023 },
            access_policy: inputs.access_policy.id().clone(),
            profile: profile.id().clone(),
            key_pair: key_pair.id().clone(),
            bootstrap: bootstrap_sequence(settings),
        },
    )?;

    let scaling_group = comp.add(
        LogicalId::new(scope, "scaling-group"),
        ScalingGroup {
            network: inputs.network.id().clone(),
            launch_template: launch_template.id().clone(),
            subnets: SubnetSelection::Public,
            signals: Some(SignalPolicy::wait_for_count(1, settings.signal_timeout)),
        },
    )?;

    let load_balancer = comp.add(
        LogicalId::new(scope, "load-balancer"),
        LoadBalancer {
            network: inputs.network.id().clone(),
            access_policy: inputs.access_policy.id().clone(),
            internet_facing: true,
        },
    )?;

    let target_group = comp.add(
        LogicalId::new(scope, "target-group"),
        TargetGroup {
            network: inputs.network.id().clone(),
            target_type: TargetType::Instance,
            port: 80,
            targets: vec![scaling_group.id().clone()],
            health_check: HealthCheck {
                path: "/".to_string(),
                interval: Duration::from_secs(60),
            },
        },
    )?;

    comp.add(
        LogicalId::new(scope, "https-listener"),
        Listener {
            load_balancer: load_balancer.id().clone(),
            port: 443,
            certificate: Some(inputs.certificate.id().clone()),
            default_target_group: target_group.id().clone(),
            open: true,
        },
    )?;

    Ok(ComputeOutputs {
        scaling_group,
        load_balancer,
    })
}

/// The declarative bootstrap sequence. Desired-state steps only, so
/// replaying it on an already-bootstrapped instance converges cleanly.
fn bootstrap_sequence(settings: &ComputeSettings) -> Vec<BootstrapStep> {
    let mut steps = vec![BootstrapStep::Package {
        name: "nginx".to_string(),
    }];

    if !settings.toolchain_packages.is_empty() {
        steps.push(BootstrapStep::Command {
            exec: format!(
                "yum install -y {}",
                settings.toolchain_packages.join(" ")
            ),
        });
    }

    for (path, source) in &settings.config_files {
        steps.push(BootstrapStep::File {
            path: path.clone(),
            source: source.clone(),
        });
    }

    steps.push(BootstrapStep::Service {
        name: "nginx".to_string(),
        enabled: true,
        restart_on_change: true,
    });

    steps
}
