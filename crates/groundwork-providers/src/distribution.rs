//! Distribution provider: DNS zone, certificate, and deferred record
//! binding.
//!
//! DNS records need the load balancer; the load balancer needs the
//! certificate; the certificate needs the zone. The apparent cycle is
//! broken by splitting the work in two: the zone and certificate are
//! created now, and a [`RecordBinding`] is returned that binds the alias
//! records later, once the load balancer's handle exists.

use groundwork_core::compute::LoadBalancer;
use groundwork_core::distribution::{
    AliasTarget, Certificate, CertificateValidation, DnsZone, RecordSet,
};
use groundwork_core::{Attr, Composition, LogicalId, ResourceRef, Result, Value};

/// Outputs of the distribution provider. `binding` must be consumed once
/// the compute provider has produced a load balancer.
#[derive(Debug)]
pub struct Distribution {
    pub domain: String,
    pub zone: ResourceRef<DnsZone>,
    pub certificate: ResourceRef<Certificate>,
    pub binding: RecordBinding,
}

/// Deferred binding of the domain's alias records to a load balancer.
///
/// Consuming `self` makes the binding single-use, and requiring a
/// `ResourceRef<LoadBalancer>` makes it impossible to invoke before the
/// load balancer is part of the composition.
#[derive(Debug)]
pub struct RecordBinding {
    scope: String,
    domain: String,
    zone: ResourceRef<DnsZone>,
}

/// The two alias records produced by a binding.
#[derive(Debug, Clone)]
pub struct RecordOutputs {
    pub www: ResourceRef<RecordSet>,
    pub root: ResourceRef<RecordSet>,
}

impl RecordBinding {
    /// Create the `www` and root alias records, both pointing at the load
    /// balancer's resolved address.
    pub fn bind_records(
        self,
        comp: &mut Composition,
        load_balancer: &ResourceRef<LoadBalancer>,
    ) -> Result<RecordOutputs> {
        let target = || AliasTarget {
            dns_name: Value::Attr(load_balancer.attr(Attr::DnsName)),
        };

        let www = comp.add(
            LogicalId::new(&self.scope, "record-www"),
            RecordSet {
                zone: self.zone.id().clone(),
                record_name: format!("www.{}", self.domain),
                target: target(),
            },
        )?;

        let root = comp.add(
            LogicalId::new(&self.scope, "record-root"),
            RecordSet {
                zone: self.zone.id().clone(),
                record_name: self.domain.clone(),
                target: target(),
            },
        )?;

        Ok(RecordOutputs { www, root })
    }
}

/// Create the DNS zone and a certificate covering the domain and its
/// wildcard subdomain, validated via DNS challenge against that same zone.
pub fn create_distribution(
    comp: &mut Composition,
    scope: &str,
    domain: &str,
) -> Result<Distribution> {
    let zone = comp.add(
        LogicalId::new(scope, "zone"),
        DnsZone {
            domain: domain.to_string(),
        },
    )?;

    // Validation must reference the zone created above; this pairing is an
    // invariant, not a default.
    let certificate = comp.add(
        LogicalId::new(scope, "certificate"),
        Certificate {
            domain: domain.to_string(),
            alternative_names: vec![format!("*.{domain}")],
            validation: CertificateValidation::Dns {
                zone: zone.id().clone(),
            },
        },
    )?;

    Ok(Distribution {
        domain: domain.to_string(),
        zone: zone.clone(),
        certificate,
        binding: RecordBinding {
            scope: scope.to_string(),
            domain: domain.to_string(),
            zone,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::ResourceProps;

    #[test]
    fn certificate_validates_against_its_own_zone() {
        let mut comp = Composition::new();
        let dist = create_distribution(&mut comp, "shop", "example.org").unwrap();

        let ResourceProps::Certificate(cert) = &comp.get(dist.certificate.id()).unwrap().props
        else {
            panic!("expected certificate");
        };
        assert_eq!(cert.validation_zone(), dist.zone.id());
        assert_eq!(cert.domain, "example.org");
        assert_eq!(cert.alternative_names, vec!["*.example.org"]);
    }

    #[test]
    fn binding_creates_www_and_root_records_on_the_same_target() {
        let mut comp = Composition::new();
        let dist = create_distribution(&mut comp, "shop", "example.org").unwrap();

        // A load balancer must exist before records can be bound.
        let net = crate::network::create_network(
            &mut comp,
            "shop",
            &crate::network::NetworkSettings { nat_gateways: 0 },
        )
        .unwrap();
        let lb = comp
            .add(
                LogicalId::new("shop", "load-balancer"),
                LoadBalancer {
                    network: net.network.id().clone(),
                    access_policy: net.access_policy.id().clone(),
                    internet_facing: true,
                },
            )
            .unwrap();

        let records = dist.binding.bind_records(&mut comp, &lb).unwrap();

        let names: Vec<String> = [&records.www, &records.root]
            .iter()
            .map(|r| {
                let ResourceProps::RecordSet(record) = &comp.get(r.id()).unwrap().props else {
                    panic!("expected record set");
                };
                assert_eq!(
                    record.target.dns_name,
                    Value::Attr(lb.attr(Attr::DnsName)),
                    "both records must target the same load balancer"
                );
                record.record_name.clone()
            })
            .collect();
        assert_eq!(names, vec!["www.example.org", "example.org"]);
    }
}
