// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Typed records for a cloud deployment topology and the value objects
//! they are built from.
//!
//! # Value Objects with Invariants
//!
//! - [`Address`] - `kind.name` identity of a declared entity
//! - [`EntityName`] - validated entity name
//! - [`Cidr`] - canonical address range
//! - [`FaultDomain`] - availability zone label
//! - [`PortRange`] - inclusive port interval
//!
//! # Records
//!
//! - [`Resource`] - tagged union of every resource record
//! - [`Declaration`] - named resource with ordering overrides
//! - [`OutputSpec`] - published attribute of a resource
//! - [`Snapshot`] - complete declared configuration
//!
//! # Layers
//!
//! Each [`EntityKind`] belongs to one [`Layer`]; layers give the planner
//! its tie-break order (network before security before compute).

pub mod address;
pub mod invariants;
pub mod network;
pub mod resources;
pub mod snapshot;

pub use address::{Address, AddressError, EntityKind, EntityName, Layer};
pub use invariants::Invariant;
pub use network::{Cidr, FaultDomain, NetworkError, PortRange, Protocol};
pub use resources::{
    ApplicationProtocol, ClusterSpec, ContainerSpec, Declaration, Direction, Exposure,
    FirewallRule, FirewallSpec, HealthCheck, IdentitySpec, InternetGatewaySpec, LaunchMode,
    ListenerAction, ListenerSpec, LoadBalancerSpec, LoadBalancerType, LogConfiguration,
    LogGroupSpec, NetworkMode, NetworkSpec, PlacementSpec, PolicyAttachmentSpec, PortMapping,
    Reference, Resource, ResourceSpec, Route, RouteTableAssociationSpec, RouteTableSpec,
    ServiceSpec, SubnetSpec, Tags, TargetGroupSpec, TargetRegistration, TargetType, TaskSpec,
    TrafficSource, TrustPolicy,
};
pub use snapshot::{AttributeRef, Catalog, OutputSpec, Snapshot, SnapshotFormat};
