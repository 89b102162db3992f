//! Virtual network and access policy specifications.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::LogicalId;

/// An isolated virtual network with a private address range and subnets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualNetwork {
    /// Display name.
    pub name: String,
    /// Address range in CIDR notation (e.g. "10.0.0.0/16").
    pub cidr: String,
    /// Maximum number of availability zones to spread subnets across.
    pub max_zones: u8,
    /// Number of NAT gateways. 0 is the cost-minimizing variant, 1 the
    /// availability variant.
    pub nat_gateways: u8,
    /// Subnet tiers, replicated per zone.
    pub subnets: Vec<SubnetSpec>,
}

/// One subnet tier within a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub name: String,
    /// Prefix length of each subnet carved from the parent range.
    pub cidr_mask: u8,
    pub public: bool,
}

impl VirtualNetwork {
    pub fn validate(&self) -> Result<()> {
        let prefix = parse_prefix(&self.cidr).ok_or_else(|| {
            Error::Configuration(format!("invalid network cidr: {}", self.cidr))
        })?;

        if !self.subnets.iter().any(|s| s.public) {
            return Err(Error::Configuration(format!(
                "network {} has no public subnet",
                self.name
            )));
        }

        // Tiers are carved sequentially per zone, so distinct names plus
        // masks that fit inside the parent range guarantee no overlap.
        for (i, subnet) in self.subnets.iter().enumerate() {
            if subnet.cidr_mask <= prefix || subnet.cidr_mask > 28 {
                return Err(Error::Configuration(format!(
                    "subnet {} mask /{} does not fit inside {}",
                    subnet.name, subnet.cidr_mask, self.cidr
                )));
            }
            if self.subnets[..i].iter().any(|s| s.name == subnet.name) {
                return Err(Error::Configuration(format!(
                    "duplicate subnet tier name: {}",
                    subnet.name
                )));
            }
        }
        Ok(())
    }
}

fn parse_prefix(cidr: &str) -> Option<u8> {
    let (addr, prefix) = cidr.split_once('/')?;
    if addr.parse::<std::net::Ipv4Addr>().is_err() {
        return None;
    }
    let prefix: u8 = prefix.parse().ok()?;
    (prefix <= 30).then_some(prefix)
}

/// Transport protocol of an ingress rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// A single allow rule: (protocol, port, source range, purpose label).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: Protocol,
    pub port: u16,
    /// Source range in CIDR notation.
    pub source: String,
    /// Purpose label (e.g. "allow https access").
    pub description: String,
}

impl IngressRule {
    /// TCP rule open to any IPv4 source.
    pub fn tcp_any(port: u16, description: &str) -> Self {
        Self {
            protocol: Protocol::Tcp,
            port,
            source: "0.0.0.0/0".to_string(),
            description: description.to_string(),
        }
    }
}

/// Named set of allow rules governing traffic for resources in a network.
/// Never mutated after creation; a change is a new specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub name: String,
    pub network: LogicalId,
    /// Ordered rule list. Duplicates are harmless but redundant.
    pub rules: Vec<IngressRule>,
    pub allow_all_egress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(subnets: Vec<SubnetSpec>) -> VirtualNetwork {
        VirtualNetwork {
            name: "test".to_string(),
            cidr: "10.0.0.0/16".to_string(),
            max_zones: 2,
            nat_gateways: 0,
            subnets,
        }
    }

    fn public_tier(name: &str, mask: u8) -> SubnetSpec {
        SubnetSpec {
            name: name.to_string(),
            cidr_mask: mask,
            public: true,
        }
    }

    #[test]
    fn validate_accepts_single_public_tier() {
        assert!(network(vec![public_tier("public", 24)]).validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_public_subnet() {
        let net = network(vec![SubnetSpec {
            name: "private".to_string(),
            cidr_mask: 24,
            public: false,
        }]);
        assert!(matches!(net.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn validate_rejects_mask_outside_parent_range() {
        let net = network(vec![public_tier("public", 16)]);
        assert!(net.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_tier_names() {
        let net = network(vec![public_tier("public", 24), public_tier("public", 25)]);
        assert!(net.validate().is_err());
    }

    #[test]
    fn tcp_any_opens_to_all_ipv4() {
        let rule = IngressRule::tcp_any(443, "allow https access");
        assert_eq!(rule.source, "0.0.0.0/0");
        assert_eq!(rule.port, 443);
    }
}
