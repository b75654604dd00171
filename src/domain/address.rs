// Copyright (c) 2025 - Cowboy AI, Inc.
//! Entity Addresses and the Topology Taxonomy
//!
//! Every declaration in a snapshot is addressed as `kind.name`
//! (e.g. `subnet.public_a`). References between declarations are
//! addresses, so the kind of the target is known before it is resolved.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Address parsing error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address must have the form kind.name: {0}")]
    MissingSeparator(String),

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Entity name is empty")]
    EmptyName,

    #[error("Entity name exceeds maximum length of 64 characters: {0}")]
    NameTooLong(String),

    #[error("Invalid character {ch:?} in entity name: {name}")]
    InvalidCharacter { name: String, ch: char },
}

/// Kind of a declared entity
///
/// Outputs are not provisioned resources but they take part in ordering,
/// so they share the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    // Network
    /// Virtual network with its address space
    Network,
    /// Subnet carved out of a network
    Subnet,
    /// Internet gateway attached to a network
    InternetGateway,
    /// Route table of a network
    RouteTable,
    /// Binding of a subnet to a route table
    RouteTableAssociation,

    // Security
    /// Firewall rule set (security group)
    Firewall,

    // Load balancing
    /// Load balancer
    LoadBalancer,
    /// Target group receiving forwarded traffic
    TargetGroup,
    /// Listener terminating traffic on a load balancer
    Listener,

    // Identity
    /// Execution identity
    Role,
    /// Managed policy attached to a role
    PolicyAttachment,

    // Observability
    /// Log destination
    LogGroup,

    // Compute
    /// Container cluster
    Cluster,
    /// Task definition (container set with resource limits)
    TaskDefinition,
    /// Service supervising running tasks
    Service,

    // Output
    /// Published value
    Output,
}

impl EntityKind {
    /// All kinds, in layer order
    pub const ALL: [EntityKind; 16] = [
        Self::Network,
        Self::Subnet,
        Self::InternetGateway,
        Self::RouteTable,
        Self::RouteTableAssociation,
        Self::Firewall,
        Self::LoadBalancer,
        Self::TargetGroup,
        Self::Listener,
        Self::Role,
        Self::PolicyAttachment,
        Self::LogGroup,
        Self::Cluster,
        Self::TaskDefinition,
        Self::Service,
        Self::Output,
    ];

    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Subnet => "subnet",
            Self::InternetGateway => "internet_gateway",
            Self::RouteTable => "route_table",
            Self::RouteTableAssociation => "route_table_association",
            Self::Firewall => "firewall",
            Self::LoadBalancer => "load_balancer",
            Self::TargetGroup => "target_group",
            Self::Listener => "listener",
            Self::Role => "role",
            Self::PolicyAttachment => "policy_attachment",
            Self::LogGroup => "log_group",
            Self::Cluster => "cluster",
            Self::TaskDefinition => "task_definition",
            Self::Service => "service",
            Self::Output => "output",
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Network => "Virtual Network",
            Self::Subnet => "Subnet",
            Self::InternetGateway => "Internet Gateway",
            Self::RouteTable => "Route Table",
            Self::RouteTableAssociation => "Route Table Association",
            Self::Firewall => "Firewall",
            Self::LoadBalancer => "Load Balancer",
            Self::TargetGroup => "Target Group",
            Self::Listener => "Listener",
            Self::Role => "Execution Role",
            Self::PolicyAttachment => "Policy Attachment",
            Self::LogGroup => "Log Group",
            Self::Cluster => "Cluster",
            Self::TaskDefinition => "Task Definition",
            Self::Service => "Service",
            Self::Output => "Output",
        }
    }

    /// Get the topology layer this kind belongs to
    pub fn layer(&self) -> Layer {
        match self {
            Self::Network
            | Self::Subnet
            | Self::InternetGateway
            | Self::RouteTable
            | Self::RouteTableAssociation => Layer::Network,

            Self::Firewall => Layer::Security,

            Self::LoadBalancer | Self::TargetGroup | Self::Listener => Layer::LoadBalancing,

            Self::Role | Self::PolicyAttachment => Layer::Identity,

            Self::LogGroup => Layer::Observability,

            Self::Cluster | Self::TaskDefinition | Self::Service => Layer::Compute,

            Self::Output => Layer::Output,
        }
    }

    /// Attributes an entity of this kind exposes to outputs
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            Self::Network => &["id", "arn", "cidr"],
            Self::Subnet => &["id", "arn", "cidr", "fault_domain"],
            Self::InternetGateway => &["id", "arn"],
            Self::RouteTable => &["id"],
            Self::RouteTableAssociation => &["id"],
            Self::Firewall => &["id", "arn", "name"],
            Self::LoadBalancer => &["id", "arn", "dns_name", "zone_id"],
            Self::TargetGroup => &["id", "arn", "name"],
            Self::Listener => &["id", "arn"],
            Self::Role => &["id", "arn", "name"],
            Self::PolicyAttachment => &["id"],
            Self::LogGroup => &["id", "arn", "name"],
            Self::Cluster => &["id", "arn", "name"],
            Self::TaskDefinition => &["id", "arn", "family", "revision"],
            Self::Service => &["id", "name", "desired_count"],
            Self::Output => &["value"],
        }
    }

    /// Check whether this kind exposes the given attribute
    pub fn exposes(&self, attribute: &str) -> bool {
        self.attributes().contains(&attribute)
    }

    /// Check if this kind is a provisioned resource (everything but outputs)
    pub fn is_resource(&self) -> bool {
        !matches!(self, Self::Output)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AddressError::UnknownKind(s.to_string()))
    }
}

/// Topology layer, ordered bottom-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Address space and reachability
    Network,
    /// Inbound traffic restrictions
    Security,
    /// Public traffic termination and forwarding
    LoadBalancing,
    /// Authorization of the compute layer
    Identity,
    /// Log destinations
    Observability,
    /// Running and supervising containers
    Compute,
    /// Published values
    Output,
}

impl Layer {
    /// Rank used to break ties between independent entities
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Security => "security",
            Self::LoadBalancing => "load_balancing",
            Self::Identity => "identity",
            Self::Observability => "observability",
            Self::Compute => "compute",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name of a declared entity, unique per kind within a snapshot
///
/// # Invariants
/// - Name is 1-64 characters
/// - Name contains only ASCII alphanumerics, `_` and `-`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    /// Maximum length of an entity name
    pub const MAX_LENGTH: usize = 64;

    pub fn new(name: impl Into<String>) -> Result<Self, AddressError> {
        let name = name.into();

        if name.is_empty() {
            return Err(AddressError::EmptyName);
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(AddressError::NameTooLong(name));
        }

        if let Some(ch) = name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-')
        {
            return Err(AddressError::InvalidCharacter { name, ch });
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for EntityName {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for EntityName {
    type Error = AddressError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityName> for String {
    fn from(name: EntityName) -> Self {
        name.0
    }
}

/// Address of a declared entity (`kind.name`)
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::{Address, EntityKind};
///
/// let address: Address = "subnet.public_a".parse().unwrap();
/// assert_eq!(address.kind(), EntityKind::Subnet);
/// assert_eq!(address.name(), "public_a");
/// assert!("subnet".parse::<Address>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    kind: EntityKind,
    name: EntityName,
}

impl Address {
    /// Create an address with name validation
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Result<Self, AddressError> {
        Ok(Self::from_name(kind, EntityName::new(name)?))
    }

    /// Create an address from an already validated name
    pub fn from_name(kind: EntityKind, name: EntityName) -> Self {
        Self { kind, name }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn entity_name(&self) -> &EntityName {
        &self.name
    }

    pub fn layer(&self) -> Layer {
        self.kind.layer()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once('.')
            .ok_or_else(|| AddressError::MissingSeparator(s.to_string()))?;
        Self::new(kind.parse()?, name)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}
