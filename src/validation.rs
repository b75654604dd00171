// Copyright (c) 2025 - Cowboy AI, Inc.
//! Validation Pass
//!
//! Runs every invariant check over a snapshot and reports all violations
//! at once, each naming the offending entity. Reference resolution is the
//! graph builder's job; checks here skip references that do not resolve.

use tracing::{debug, info};

use crate::domain::invariants::{
    check_firewall, check_listener, check_load_balancer, check_required_fields,
    check_route_table, check_service, check_subnet,
};
use crate::domain::{Address, Catalog, Declaration, Invariant, Resource, Snapshot};
use crate::errors::{TopologyError, ValidationReport};

/// Validate every declaration of `snapshot`
pub fn validate(snapshot: &Snapshot) -> ValidationReport {
    let catalog = snapshot.catalog();
    let mut report = ValidationReport::default();

    for duplicate in catalog.duplicates() {
        report.push(TopologyError::violation(
            duplicate.clone(),
            Invariant::DuplicateAddress,
        ));
    }

    for (address, declaration) in catalog.declarations() {
        let violations = check_declaration(&catalog, address, declaration);
        if !violations.is_empty() {
            debug!("{} violates {} invariant(s)", address, violations.len());
        }
        report.extend(
            violations
                .into_iter()
                .map(|invariant| TopologyError::violation(address.clone(), invariant)),
        );
    }

    info!(
        "Validated {} entities: {} violation(s)",
        snapshot.len(),
        report.len()
    );
    report
}

/// All invariant violations of one declaration
pub fn check_declaration(
    catalog: &Catalog<'_>,
    address: &Address,
    declaration: &Declaration,
) -> Vec<Invariant> {
    let mut violations = check_required_fields(&declaration.resource);

    match &declaration.resource {
        Resource::Subnet(spec) => violations.extend(check_subnet(catalog, address, spec)),
        Resource::RouteTable(spec) => violations.extend(check_route_table(catalog, spec)),
        Resource::Firewall(spec) => violations.extend(check_firewall(catalog, address, spec)),
        Resource::LoadBalancer(spec) => {
            violations.extend(check_load_balancer(catalog, address, spec))
        }
        Resource::Listener(spec) => violations.extend(check_listener(catalog, spec)),
        Resource::Service(spec) => violations.extend(check_service(catalog, declaration, spec)),
        _ => {}
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LogGroupSpec, NetworkSpec, SubnetSpec};
    use std::collections::BTreeMap;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn network() -> Declaration {
        Declaration::new(
            "main",
            Resource::Network(NetworkSpec {
                cidr: "10.0.0.0/16".parse().unwrap(),
                enable_dns_support: true,
                enable_dns_hostnames: true,
                tags: BTreeMap::new(),
            }),
        )
        .unwrap()
    }

    fn subnet(name: &str, cidr: &str, zone: &str) -> Declaration {
        Declaration::new(
            name,
            Resource::Subnet(SubnetSpec {
                network: addr("network.main"),
                cidr: cidr.parse().unwrap(),
                fault_domain: zone.parse().unwrap(),
                map_public_ip_on_launch: false,
                tags: BTreeMap::new(),
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_private_network() {
        let snapshot = Snapshot::new()
            .with_resource(network())
            .with_resource(subnet("a", "10.0.1.0/24", "us-east-1a"))
            .with_resource(subnet("b", "10.0.2.0/24", "us-east-1b"));

        assert!(validate(&snapshot).is_empty());
    }

    #[test]
    fn test_reports_every_violation() {
        let snapshot = Snapshot::new()
            .with_resource(network())
            .with_resource(subnet("a", "10.0.1.0/24", "us-east-1a"))
            .with_resource(subnet("b", "10.0.1.128/25", "us-east-1a"))
            .with_resource(subnet("c", "10.1.0.0/24", "us-east-1c"))
            .with_resource(
                Declaration::new(
                    "logs",
                    Resource::LogGroup(LogGroupSpec {
                        log_group_name: String::new(),
                        retention_days: None,
                    }),
                )
                .unwrap(),
            )
            .with_resource(network());

        let report = validate(&snapshot);
        let found: Vec<(String, String)> = report
            .violations()
            .map(|(entity, invariant)| (entity.to_string(), format!("{:?}", invariant)))
            .collect();

        assert_eq!(report.len(), 5, "{}", report.render());
        assert_eq!(found[0].0, "network.main");
        assert!(found[0].1.starts_with("DuplicateAddress"));
        assert!(found
            .iter()
            .any(|(e, i)| e == "subnet.b" && i.starts_with("OverlappingSubnets")));
        assert!(found
            .iter()
            .any(|(e, i)| e == "subnet.b" && i.starts_with("SharedFaultDomain")));
        assert!(found
            .iter()
            .any(|(e, i)| e == "subnet.c" && i.starts_with("SubnetOutsideNetwork")));
        assert!(found
            .iter()
            .any(|(e, i)| e == "log_group.logs" && i.starts_with("RequiredField")));
    }
}
