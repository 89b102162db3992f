//! Network provider: isolated virtual network plus access policy.

use groundwork_core::network::{AccessPolicy, IngressRule, SubnetSpec, VirtualNetwork};
use groundwork_core::{Composition, LogicalId, ResourceRef, Result};

/// Caller-selected variant knobs for the network.
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    /// 0 for the cost-minimizing variant, 1 for the availability variant.
    pub nat_gateways: u8,
}

/// Outputs the network provider exposes to dependents.
#[derive(Debug, Clone)]
pub struct NetworkOutputs {
    pub network: ResourceRef<VirtualNetwork>,
    pub access_policy: ResourceRef<AccessPolicy>,
}

/// Create the virtual network and its access policy.
///
/// The policy always carries exactly three ingress rules: HTTPS, HTTP and
/// SSH, all open to any IPv4 source. Resource creation only; no polling.
pub fn create_network(
    comp: &mut Composition,
    scope: &str,
    settings: &NetworkSettings,
) -> Result<NetworkOutputs> {
    let network = comp.add(
        LogicalId::new(scope, "network"),
        VirtualNetwork {
            name: format!("{scope}-network"),
            cidr: "10.0.0.0/16".to_string(),
            max_zones: 2,
            nat_gateways: settings.nat_gateways,
            subnets: vec![SubnetSpec {
                name: "public".to_string(),
                cidr_mask: 24,
                public: true,
            }],
        },
    )?;

    let access_policy = comp.add(
        LogicalId::new(scope, "access-policy"),
        AccessPolicy {
            name: format!("{scope}-access-policy"),
            network: network.id().clone(),
            rules: vec![
                IngressRule::tcp_any(443, "allow https access"),
                IngressRule::tcp_any(80, "allow http access"),
                IngressRule::tcp_any(22, "allow ssh access"),
            ],
            allow_all_egress: true,
        },
    )?;

    Ok(NetworkOutputs {
        network,
        access_policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::ResourceProps;

    #[test]
    fn creates_network_and_policy_with_three_rules() {
        let mut comp = Composition::new();
        let outputs = create_network(&mut comp, "shop", &NetworkSettings { nat_gateways: 0 })
            .unwrap();

        assert_eq!(comp.len(), 2);
        let policy = comp.get(outputs.access_policy.id()).unwrap();
        let ResourceProps::AccessPolicy(policy) = &policy.props else {
            panic!("expected access policy");
        };
        assert_eq!(policy.rules.len(), 3);
        let ports: Vec<u16> = policy.rules.iter().map(|r| r.port).collect();
        assert_eq!(ports, vec![443, 80, 22]);
        assert!(policy.rules.iter().all(|r| r.source == "0.0.0.0/0"));
    }

    #[test]
    fn nat_variant_is_caller_selected() {
        let mut comp = Composition::new();
        let outputs = create_network(&mut comp, "shop", &NetworkSettings { nat_gateways: 1 })
            .unwrap();
        let ResourceProps::VirtualNetwork(net) = &comp.get(outputs.network.id()).unwrap().props
        else {
            panic!("expected network");
        };
        assert_eq!(net.nat_gateways, 1);
    }
}
