//! Stack composer: wires the providers together in the one valid order.
//!
//! Network → Distribution → Compute (using network, policy, certificate) →
//! record binding (using the load balancer) → Storage → one Pipeline per
//! branch. Reordering would bind DNS before a load balancer exists or run a
//! pipeline before its bucket does; the provider signatures make most such
//! reorderings unrepresentable.

use groundwork_config::StackConfig;
use groundwork_core::distribution::{Certificate, DnsZone};
use groundwork_core::pipeline::Pipeline;
use groundwork_core::storage::Bucket;
use groundwork_core::{Composition, Error, ResourceRef, Result};
use tracing::info;

use crate::compute::{create_compute, ComputeInputs, ComputeOutputs, ComputeSettings};
use crate::distribution::{create_distribution, RecordOutputs};
use crate::network::{create_network, NetworkOutputs, NetworkSettings};
use crate::pipeline::{create_pipeline, default_build_spec, PipelineInputs};
use crate::storage::create_storage;

/// A fully composed stack: the resource graph plus the typed handles a
/// caller needs to inspect or extend it.
#[derive(Debug)]
pub struct ComposedStack {
    pub composition: Composition,
    pub outputs: StackOutputs,
}

#[derive(Debug)]
pub struct StackOutputs {
    pub network: NetworkOutputs,
    pub zone: ResourceRef<DnsZone>,
    pub certificate: ResourceRef<Certificate>,
    pub compute: ComputeOutputs,
    pub records: RecordOutputs,
    pub bucket: ResourceRef<Bucket>,
    pub pipelines: Vec<ResourceRef<Pipeline>>,
}

/// Compose the whole web-hosting stack from ambient configuration.
pub fn compose_stack(config: &StackConfig) -> Result<ComposedStack> {
    if config.domain.is_empty() {
        return Err(Error::Configuration("domain must not be empty".to_string()));
    }
    if config.environment.branches.is_empty() {
        return Err(Error::Configuration(
            "at least one pipeline branch is required".to_string(),
        ));
    }

    let scope = config.stack_name.as_str();
    let env = &config.environment;
    info!(stack = scope, environment = %env.name, domain = %config.domain, "composing stack");

    let mut comp = Composition::new();

    let network = create_network(
        &mut comp,
        scope,
        &NetworkSettings {
            nat_gateways: env.nat_gateways,
        },
    )?;

    let distribution = create_distribution(&mut comp, scope, &config.domain)?;

    let compute = create_compute(
        &mut comp,
        scope,
        ComputeInputs {
            network: &network.network,
            access_policy: &network.access_policy,
            certificate: &distribution.certificate,
        },
        &ComputeSettings::from(env),
    )?;

    // The deferred half of the distribution: the load balancer exists now.
    let records = distribution
        .binding
        .bind_records(&mut comp, &compute.load_balancer)?;

    let storage = create_storage(&mut comp, scope)?;

    let mut pipelines = Vec::with_capacity(env.branches.len());
    for branch in &env.branches {
        pipelines.push(create_pipeline(
            &mut comp,
            scope,
            PipelineInputs {
                branch: branch.clone(),
                scaling_group: &compute.scaling_group,
                bucket: &storage.bucket,
                source: &config.source,
                build: default_build_spec(),
            },
        )?);
    }

    info!(resources = comp.len(), "stack composed");
    Ok(ComposedStack {
        composition: comp,
        outputs: StackOutputs {
            network,
            zone: distribution.zone,
            certificate: distribution.certificate,
            compute,
            records,
            bucket: storage.bucket,
            pipelines,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_config::{EnvironmentVariant, SourceLocation};
    use groundwork_core::{ResourceKind, ResourceProps, Value};

    fn config() -> StackConfig {
        StackConfig {
            stack_name: "shop".to_string(),
            domain: "example.org".to_string(),
            region: "us-east-1".to_string(),
            account: "123456789012".to_string(),
            source: SourceLocation {
                owner: "acme".to_string(),
                repo: "storefront".to_string(),
                token_secret: "storefront-source".to_string(),
            },
            environment: EnvironmentVariant::production(),
        }
    }

    fn count(comp: &Composition, kind: ResourceKind) -> usize {
        comp.iter().filter(|s| s.props.kind() == kind).count()
    }

    #[test]
    fn composes_exactly_one_of_each_shared_resource_and_two_pipelines() {
        let stack = compose_stack(&config()).unwrap();
        let comp = &stack.composition;

        assert_eq!(count(comp, ResourceKind::VirtualNetwork), 1);
        assert_eq!(count(comp, ResourceKind::AccessPolicy), 1);
        assert_eq!(count(comp, ResourceKind::DnsZone), 1);
        assert_eq!(count(comp, ResourceKind::Certificate), 1);
        assert_eq!(count(comp, ResourceKind::ScalingGroup), 1);
        assert_eq!(count(comp, ResourceKind::Bucket), 1);
        assert_eq!(count(comp, ResourceKind::RecordSet), 2);
        assert_eq!(count(comp, ResourceKind::Pipeline), 2);
    }

    #[test]
    fn access_policy_has_exactly_the_three_web_rules() {
        let stack = compose_stack(&config()).unwrap();
        let policy_spec = stack
            .composition
            .get(stack.outputs.network.access_policy.id())
            .unwrap();
        let ResourceProps::AccessPolicy(policy) = &policy_spec.props else {
            panic!("expected access policy");
        };
        let ports: Vec<u16> = policy.rules.iter().map(|r| r.port).collect();
        assert_eq!(ports, vec![443, 80, 22]);
    }

    #[test]
    fn certificate_zone_matches_distribution_zone() {
        let stack = compose_stack(&config()).unwrap();
        let ResourceProps::Certificate(cert) = &stack
            .composition
            .get(stack.outputs.certificate.id())
            .unwrap()
            .props
        else {
            panic!("expected certificate");
        };
        assert_eq!(cert.validation_zone(), stack.outputs.zone.id());
    }

    #[test]
    fn example_org_scenario_yields_wildcard_cert_and_both_alias_records() {
        let stack = compose_stack(&config()).unwrap();
        let comp = &stack.composition;

        let ResourceProps::Certificate(cert) =
            &comp.get(stack.outputs.certificate.id()).unwrap().props
        else {
            panic!("expected certificate");
        };
        assert_eq!(cert.domain, "example.org");
        assert_eq!(cert.alternative_names, vec!["*.example.org"]);

        let mut record_names = Vec::new();
        let mut targets = Vec::new();
        for spec in comp.iter() {
            if let ResourceProps::RecordSet(record) = &spec.props {
                record_names.push(record.record_name.clone());
                targets.push(record.target.dns_name.clone());
            }
        }
        record_names.sort();
        assert_eq!(record_names, vec!["example.org", "www.example.org"]);
        assert_eq!(targets[0], targets[1], "records must share one target");
        let Value::Attr(attr) = &targets[0] else {
            panic!("expected deferred target");
        };
        assert_eq!(&attr.resource, stack.outputs.compute.load_balancer.id());
    }

    #[test]
    fn pipelines_share_bucket_and_group_but_differ_in_branch() {
        let stack = compose_stack(&config()).unwrap();
        let branches: Vec<String> = stack
            .outputs
            .pipelines
            .iter()
            .map(|p| {
                let ResourceProps::Pipeline(pipe) =
                    &stack.composition.get(p.id()).unwrap().props
                else {
                    panic!("expected pipeline");
                };
                assert_eq!(pipe.bucket, *stack.outputs.bucket.id());
                assert_eq!(
                    pipe.stages.deploy.scaling_group,
                    *stack.outputs.compute.scaling_group.id()
                );
                pipe.branch().to_string()
            })
            .collect();
        assert_eq!(branches, vec!["master", "dev"]);
    }

    #[test]
    fn composition_is_idempotent_across_runs() {
        let first = compose_stack(&config()).unwrap();
        let second = compose_stack(&config()).unwrap();
        let ids_first: Vec<_> = first.composition.iter().map(|s| s.id.clone()).collect();
        let ids_second: Vec<_> = second.composition.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids_first, ids_second);
    }

    #[test]
    fn empty_branch_list_is_a_configuration_error() {
        let mut config = config();
        config.environment.branches.clear();
        assert!(matches!(
            compose_stack(&config).unwrap_err(),
            Error::Configuration(_)
        ));
    }

    #[test]
    fn ordering_is_derivable_for_the_whole_stack() {
        let stack = compose_stack(&config()).unwrap();
        let order = stack.composition.ordered().unwrap();
        assert_eq!(order.len(), stack.composition.len());

        // The load balancer must precede the records that alias it.
        let lb_idx = order
            .iter()
            .position(|id| id == stack.outputs.compute.load_balancer.id())
            .unwrap();
        let record_idx = order
            .iter()
            .position(|id| id == stack.outputs.records.root.id())
            .unwrap();
        assert!(lb_idx < record_idx);
    }
}
