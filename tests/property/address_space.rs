// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Address-Space Invariants

use cim_topology::domain::{
    Cidr, Declaration, Invariant, NetworkSpec, Resource, Snapshot, SubnetSpec,
};
use cim_topology::validate;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn network() -> Declaration {
    Declaration::new(
        "main",
        Resource::Network(NetworkSpec {
            cidr: Cidr::new("10.0.0.0/16").unwrap(),
            enable_dns_support: true,
            enable_dns_hostnames: true,
            tags: BTreeMap::new(),
        }),
    )
    .unwrap()
}

fn subnet(i: usize, octet: u8) -> Declaration {
    Declaration::new(
        &format!("s{:02}", i),
        Resource::Subnet(SubnetSpec {
            network: "network.main".parse().unwrap(),
            cidr: Cidr::new(format!("10.0.{}.0/24", octet)).unwrap(),
            fault_domain: format!("zone-{}", i).parse().unwrap(),
            map_public_ip_on_launch: false,
            tags: BTreeMap::new(),
        }),
    )
    .unwrap()
}

proptest! {
    /// Distinct /24 blocks carved from the parent /16 never violate anything
    #[test]
    fn prop_disjoint_subnets_validate(octets in prop::collection::btree_set(any::<u8>(), 1..12)) {
        let mut snapshot = Snapshot::new().with_resource(network());
        for (i, octet) in octets.into_iter().enumerate() {
            snapshot = snapshot.with_resource(subnet(i, octet));
        }

        let report = validate(&snapshot);
        prop_assert!(report.is_empty(), "{}", report.render());
    }

    /// Reusing a block is reported exactly once, on the later sibling
    #[test]
    fn prop_reused_block_overlaps(octet in any::<u8>()) {
        let snapshot = Snapshot::new()
            .with_resource(network())
            .with_resource(subnet(0, octet))
            .with_resource(subnet(1, octet));

        let report = validate(&snapshot);
        let overlaps: Vec<_> = report
            .violations()
            .filter(|(_, invariant)| matches!(invariant, Invariant::OverlappingSubnets { .. }))
            .map(|(entity, _)| entity.to_string())
            .collect();

        prop_assert_eq!(overlaps, vec!["subnet.s01".to_string()]);
    }

    /// Blocks outside the parent range are reported
    #[test]
    fn prop_foreign_block_is_outside(second in 1u8..=255) {
        let outside = Declaration::new(
            "outside",
            Resource::Subnet(SubnetSpec {
                network: "network.main".parse().unwrap(),
                cidr: Cidr::new(format!("10.{}.0.0/24", second)).unwrap(),
                fault_domain: "zone-x".parse().unwrap(),
                map_public_ip_on_launch: false,
                tags: BTreeMap::new(),
            }),
        )
        .unwrap();
        let snapshot = Snapshot::new().with_resource(network()).with_resource(outside);

        let report = validate(&snapshot);
        let reported = report
            .violations()
            .any(|(_, invariant)| matches!(invariant, Invariant::SubnetOutsideNetwork { .. }));
        prop_assert!(reported, "{}", report.render());
    }
}
