// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-topology
//!
//! Provides deterministic snapshots for planning tests.
//!
//! # Design Principles
//! - All test data is deterministic (no `Uuid::now_v7()` or `Utc::now()`)
//! - Valid topologies start from the reference blueprint; tests break
//!   exactly one thing and assert on the report
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cim_topology::domain::{Address, Declaration, Resource, Snapshot};
use cim_topology::WebServiceBlueprint;

pub const PLAN_ID: &str = "01934f4a-0001-7000-8000-000000000001";

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

/// Minimal YAML snapshot: a network with two private subnets and an output
pub const PRIVATE_NETWORK_YAML: &str = r#"
resources:
  - name: main
    kind: network
    cidr: 10.0.0.0/16
  - name: private_a
    kind: subnet
    network: network.main
    cidr: 10.0.1.0/24
    fault_domain: us-east-1a
  - name: private_b
    kind: subnet
    network: network.main
    cidr: 10.0.2.0/24
    fault_domain: us-east-1b
outputs:
  - name: network_id
    value: network.main.id
"#;

pub fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("Invalid UUID in test fixture")
}

pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

pub fn addr(s: &str) -> Address {
    s.parse().expect("Invalid address in test fixture")
}

/// The reference web-service topology
pub fn web_service() -> Snapshot {
    WebServiceBlueprint::default()
        .build()
        .expect("Reference blueprint must build")
}

/// Mutable access to the first declaration at `address`
pub fn declaration_mut<'a>(snapshot: &'a mut Snapshot, address: &str) -> &'a mut Declaration {
    let address = addr(address);
    snapshot
        .resources
        .iter_mut()
        .find(|decl| decl.address() == address)
        .unwrap_or_else(|| panic!("fixture has no {}", address))
}

/// Mutable access to the resource record at `address`
pub fn resource_mut<'a>(snapshot: &'a mut Snapshot, address: &str) -> &'a mut Resource {
    &mut declaration_mut(snapshot, address).resource
}
