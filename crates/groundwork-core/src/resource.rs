//! Resource kinds and the typed property union the composition graph holds.

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::compute::{
    InstanceProfile, LaunchTemplate, Listener, LoadBalancer, MachineKeyPair, ScalingGroup,
    SignalPolicy, TargetGroup,
};
use crate::distribution::{Certificate, DnsZone, RecordSet};
use crate::id::{AttrRef, LogicalId};
use crate::network::{AccessPolicy, VirtualNetwork};
use crate::pipeline::Pipeline;
use crate::storage::{Bucket, RemovalPolicy};
use crate::Result;

/// The kind of a declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    VirtualNetwork,
    AccessPolicy,
    DnsZone,
    Certificate,
    RecordSet,
    MachineKeyPair,
    InstanceProfile,
    LaunchTemplate,
    ScalingGroup,
    LoadBalancer,
    TargetGroup,
    Listener,
    Bucket,
    Pipeline,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::VirtualNetwork => write!(f, "virtual-network"),
            ResourceKind::AccessPolicy => write!(f, "access-policy"),
            ResourceKind::DnsZone => write!(f, "dns-zone"),
            ResourceKind::Certificate => write!(f, "certificate"),
            ResourceKind::RecordSet => write!(f, "record-set"),
            ResourceKind::MachineKeyPair => write!(f, "machine-key-pair"),
            ResourceKind::InstanceProfile => write!(f, "instance-profile"),
            ResourceKind::LaunchTemplate => write!(f, "launch-template"),
            ResourceKind::ScalingGroup => write!(f, "scaling-group"),
            ResourceKind::LoadBalancer => write!(f, "load-balancer"),
            ResourceKind::TargetGroup => write!(f, "target-group"),
            ResourceKind::Listener => write!(f, "listener"),
            ResourceKind::Bucket => write!(f, "bucket"),
            ResourceKind::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// A property value known either immediately or only after a dependency has
/// been provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Value {
    Literal(String),
    Attr(AttrRef),
}

impl Value {
    pub fn attr_ref(&self) -> Option<&AttrRef> {
        match self {
            Value::Attr(attr) => Some(attr),
            Value::Literal(_) => None,
        }
    }
}

/// Typed properties of one resource specification.
#[derive(Debug, Clone, PartialEq, From, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceProps {
    VirtualNetwork(VirtualNetwork),
    AccessPolicy(AccessPolicy),
    DnsZone(DnsZone),
    Certificate(Certificate),
    RecordSet(RecordSet),
    MachineKeyPair(MachineKeyPair),
    InstanceProfile(InstanceProfile),
    LaunchTemplate(LaunchTemplate),
    ScalingGroup(ScalingGroup),
    LoadBalancer(LoadBalancer),
    TargetGroup(TargetGroup),
    Listener(Listener),
    Bucket(Bucket),
    Pipeline(Pipeline),
}

impl ResourceProps {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceProps::VirtualNetwork(_) => ResourceKind::VirtualNetwork,
            ResourceProps::AccessPolicy(_) => ResourceKind::AccessPolicy,
            ResourceProps::DnsZone(_) => ResourceKind::DnsZone,
            ResourceProps::Certificate(_) => ResourceKind::Certificate,
            ResourceProps::RecordSet(_) => ResourceKind::RecordSet,
            ResourceProps::MachineKeyPair(_) => ResourceKind::MachineKeyPair,
            ResourceProps::InstanceProfile(_) => ResourceKind::InstanceProfile,
            ResourceProps::LaunchTemplate(_) => ResourceKind::LaunchTemplate,
            ResourceProps::ScalingGroup(_) => ResourceKind::ScalingGroup,
            ResourceProps::LoadBalancer(_) => ResourceKind::LoadBalancer,
            ResourceProps::TargetGroup(_) => ResourceKind::TargetGroup,
            ResourceProps::Listener(_) => ResourceKind::Listener,
            ResourceProps::Bucket(_) => ResourceKind::Bucket,
            ResourceProps::Pipeline(_) => ResourceKind::Pipeline,
        }
    }

    /// Every resource this specification depends on, direct references and
    /// deferred attributes alike. The graph derives its edges from this.
    pub fn references(&self) -> Vec<LogicalId> {
        let mut refs = Vec::new();
        match self {
            ResourceProps::VirtualNetwork(_)
            | ResourceProps::DnsZone(_)
            | ResourceProps::MachineKeyPair(_)
            | ResourceProps::InstanceProfile(_)
            | ResourceProps::Bucket(_) => {}
            ResourceProps::AccessPolicy(policy) => refs.push(policy.network.clone()),
            ResourceProps::Certificate(cert) => refs.push(cert.validation_zone().clone()),
            ResourceProps::RecordSet(record) => {
                refs.push(record.zone.clone());
                if let Some(attr) = record.target.dns_name.attr_ref() {
                    refs.push(attr.resource.clone());
                }
            }
            ResourceProps::LaunchTemplate(template) => {
                refs.push(template.access_policy.clone());
                refs.push(template.profile.clone());
                refs.push(template.key_pair.clone());
            }
            ResourceProps::ScalingGroup(group) => {
                refs.push(group.network.clone());
                refs.push(group.launch_template.clone());
            }
            ResourceProps::LoadBalancer(lb) => {
                refs.push(lb.network.clone());
                refs.push(lb.access_policy.clone());
            }
            ResourceProps::TargetGroup(tg) => {
                refs.push(tg.network.clone());
                refs.extend(tg.targets.iter().cloned());
            }
            ResourceProps::Listener(listener) => {
                refs.push(listener.load_balancer.clone());
                refs.push(listener.default_target_group.clone());
                if let Some(cert) = &listener.certificate {
                    refs.push(cert.clone());
                }
            }
            ResourceProps::Pipeline(pipeline) => {
                refs.push(pipeline.bucket.clone());
                refs.push(pipeline.stages.deploy.scaling_group.clone());
            }
        }
        refs
    }

    /// Deferred values that the apply engine must resolve from dependency
    /// outputs before handing the resource to the provisioner. Each entry is
    /// labeled with the property it fills.
    pub fn deferred(&self) -> Vec<(String, AttrRef)> {
        match self {
            ResourceProps::RecordSet(record) => record
                .target
                .dns_name
                .attr_ref()
                .map(|attr| vec![("target.dns-name".to_string(), attr.clone())])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Structural invariants checked at registration time.
    pub fn validate(&self) -> Result<()> {
        match self {
            ResourceProps::VirtualNetwork(net) => net.validate(),
            ResourceProps::Certificate(cert) => cert.validate(),
            _ => Ok(()),
        }
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        match self {
            ResourceProps::Bucket(bucket) => bucket.removal_policy,
            _ => RemovalPolicy::Destroy,
        }
    }

    /// Launch signal contract, present on scaling groups that gate the apply.
    pub fn signal_policy(&self) -> Option<&SignalPolicy> {
        match self {
            ResourceProps::ScalingGroup(group) => group.signals.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{AliasTarget, CertificateValidation};
    use crate::id::Attr;

    #[test]
    fn record_set_references_zone_and_target() {
        let zone = LogicalId::new("shop", "zone");
        let lb = LogicalId::new("shop", "load-balancer");
        let props: ResourceProps = RecordSet {
            zone: zone.clone(),
            record_name: "www.example.org".to_string(),
            target: AliasTarget {
                dns_name: Value::Attr(AttrRef::new(lb.clone(), Attr::DnsName)),
            },
        }
        .into();

        let refs = props.references();
        assert!(refs.contains(&zone));
        assert!(refs.contains(&lb));
        assert_eq!(props.deferred().len(), 1);
    }

    #[test]
    fn certificate_references_validation_zone() {
        let zone = LogicalId::new("shop", "zone");
        let props: ResourceProps = Certificate {
            domain: "example.org".to_string(),
            alternative_names: vec![],
            validation: CertificateValidation::Dns { zone: zone.clone() },
        }
        .into();
        assert_eq!(props.references(), vec![zone]);
    }

    #[test]
    fn bucket_carries_its_removal_policy() {
        let props: ResourceProps = Bucket {
            removal_policy: crate::storage::RemovalPolicy::Retain,
        }
        .into();
        assert_eq!(props.removal_policy(), crate::storage::RemovalPolicy::Retain);
    }
}
