// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed Resource Records
//!
//! One record per declarable resource kind. Records only hold desired
//! state; cross-entity references are [`Address`]es that the graph
//! builder resolves.
//!
//! # Snapshot Form
//!
//! ```yaml
//! - name: public_a
//!   kind: subnet
//!   network: network.main
//!   cidr: 10.0.1.0/24
//!   fault_domain: us-east-1a
//!   map_public_ip_on_launch: true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::address::{Address, AddressError, EntityKind, EntityName};
use super::network::{Cidr, FaultDomain, PortRange, Protocol};

/// Free-form provider tags
pub type Tags = BTreeMap<String, String>;

/// A reference from one declaration to another, found at `attribute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Attribute path inside the referring declaration (e.g. `subnets[1]`)
    pub attribute: String,
    /// Referenced address
    pub target: &'a Address,
    /// Kind the attribute accepts
    pub expected: EntityKind,
}

impl<'a> Reference<'a> {
    fn new(attribute: impl Into<String>, target: &'a Address, expected: EntityKind) -> Self {
        Self {
            attribute: attribute.into(),
            target,
            expected,
        }
    }
}

/// Top-level fields a record accepts in snapshot form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    /// Fields without a default
    pub required: &'static [&'static str],
    /// Fields that fall back to a default when absent
    pub optional: &'static [&'static str],
}

impl FieldSchema {
    const fn new(required: &'static [&'static str], optional: &'static [&'static str]) -> Self {
        Self { required, optional }
    }

    pub fn accepts(&self, field: &str) -> bool {
        self.required.contains(&field) || self.optional.contains(&field)
    }
}

/// Common behavior of every resource record
pub trait ResourceSpec {
    /// Kind of entity this record declares
    const KIND: EntityKind;

    /// Fields of the record, besides those every declaration carries
    const FIELDS: FieldSchema;

    /// Attribute references to other declarations
    fn references(&self) -> Vec<Reference<'_>>;
}

fn indexed<'a>(
    field: &str,
    targets: &'a [Address],
    expected: EntityKind,
) -> impl Iterator<Item = Reference<'a>> + 'a {
    let field = field.to_string();
    targets
        .iter()
        .enumerate()
        .map(move |(i, target)| Reference::new(format!("{}[{}]", field, i), target, expected))
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Network Layer
// ============================================================================

/// Virtual network (address space)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub cidr: Cidr,
    #[serde(default = "default_true")]
    pub enable_dns_support: bool,
    #[serde(default = "default_true")]
    pub enable_dns_hostnames: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
}

impl ResourceSpec for NetworkSpec {
    const KIND: EntityKind = EntityKind::Network;
    const FIELDS: FieldSchema = FieldSchema::new(
        &["cidr"],
        &["enable_dns_support", "enable_dns_hostnames", "tags"],
    );

    fn references(&self) -> Vec<Reference<'_>> {
        Vec::new()
    }
}

/// Subnet of a virtual network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub network: Address,
    pub cidr: Cidr,
    pub fault_domain: FaultDomain,
    #[serde(default)]
    pub map_public_ip_on_launch: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
}

impl ResourceSpec for SubnetSpec {
    const KIND: EntityKind = EntityKind::Subnet;
    const FIELDS: FieldSchema = FieldSchema::new(
        &["network", "cidr", "fault_domain"],
        &["map_public_ip_on_launch", "tags"],
    );

    fn references(&self) -> Vec<Reference<'_>> {
        vec![Reference::new("network", &self.network, EntityKind::Network)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternetGatewaySpec {
    pub network: Address,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
}

impl ResourceSpec for InternetGatewaySpec {
    const KIND: EntityKind = EntityKind::InternetGateway;
    const FIELDS: FieldSchema = FieldSchema::new(&["network"], &["tags"]);

    fn references(&self) -> Vec<Reference<'_>> {
        vec![Reference::new("network", &self.network, EntityKind::Network)]
    }
}

/// A single route: destination range → gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    pub destination: Cidr,
    pub gateway: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTableSpec {
    pub network: Address,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
}

impl RouteTableSpec {
    /// Gateway of the default route, if the table has one
    pub fn default_gateway(&self) -> Option<&Address> {
        self.routes
            .iter()
            .find(|route| route.destination.is_default_route())
            .map(|route| &route.gateway)
    }
}

impl ResourceSpec for RouteTableSpec {
    const KIND: EntityKind = EntityKind::RouteTable;
    const FIELDS: FieldSchema = FieldSchema::new(&["network"], &["routes", "tags"]);

    fn references(&self) -> Vec<Reference<'_>> {
        let mut refs = vec![Reference::new("network", &self.network, EntityKind::Network)];
        refs.extend(self.routes.iter().enumerate().map(|(i, route)| {
            Reference::new(
                format!("routes[{}].gateway", i),
                &route.gateway,
                EntityKind::InternetGateway,
            )
        }));
        refs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTableAssociationSpec {
    pub subnet: Address,
    pub route_table: Address,
}

impl ResourceSpec for RouteTableAssociationSpec {
    const KIND: EntityKind = EntityKind::RouteTableAssociation;
    const FIELDS: FieldSchema = FieldSchema::new(&["subnet", "route_table"], &[]);

    fn references(&self) -> Vec<Reference<'_>> {
        vec![
            Reference::new("subnet", &self.subnet, EntityKind::Subnet),
            Reference::new("route_table", &self.route_table, EntityKind::RouteTable),
        ]
    }
}

// ============================================================================
// Security Layer
// ============================================================================

/// Traffic direction of a firewall rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

/// Where rule traffic comes from (ingress) or goes to (egress)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficSource {
    /// An address range
    Cidr(Cidr),
    /// Members of another firewall
    Firewall(Address),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirewallRule {
    pub ports: PortRange,
    pub protocol: Protocol,
    pub source: TrafficSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FirewallRule {
    /// TCP rule from an address range
    pub fn tcp_from_cidr(ports: PortRange, cidr: Cidr) -> Self {
        Self {
            ports,
            protocol: Protocol::Tcp,
            source: TrafficSource::Cidr(cidr),
            description: None,
        }
    }

    /// TCP rule from the members of another firewall
    pub fn tcp_from_firewall(ports: PortRange, firewall: Address) -> Self {
        Self {
            ports,
            protocol: Protocol::Tcp,
            source: TrafficSource::Firewall(firewall),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Firewall rule set (security group)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallSpec {
    pub group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub network: Address,
    #[serde(default)]
    pub ingress: Vec<FirewallRule>,
    #[serde(default)]
    pub egress: Vec<FirewallRule>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
}

impl FirewallSpec {
    /// All rules with their direction
    pub fn rules(&self) -> impl Iterator<Item = (Direction, &FirewallRule)> {
        self.ingress
            .iter()
            .map(|rule| (Direction::Ingress, rule))
            .chain(self.egress.iter().map(|rule| (Direction::Egress, rule)))
    }
}

impl ResourceSpec for FirewallSpec {
    const KIND: EntityKind = EntityKind::Firewall;
    const FIELDS: FieldSchema = FieldSchema::new(
        &["group_name", "network"],
        &["description", "ingress", "egress", "tags"],
    );

    fn references(&self) -> Vec<Reference<'_>> {
        let mut refs = vec![Reference::new("network", &self.network, EntityKind::Network)];
        for (field, rules) in [("ingress", &self.ingress), ("egress", &self.egress)] {
            for (i, rule) in rules.iter().enumerate() {
                if let TrafficSource::Firewall(source) = &rule.source {
                    refs.push(Reference::new(
                        format!("{}[{}].source", field, i),
                        source,
                        EntityKind::Firewall,
                    ));
                }
            }
        }
        refs
    }
}

// ============================================================================
// Load-Balancing Layer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    /// Internet-facing
    Public,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadBalancerType {
    Application,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerSpec {
    pub exposure: Exposure,
    #[serde(default = "LoadBalancerSpec::default_type")]
    pub load_balancer_type: LoadBalancerType,
    #[serde(default)]
    pub firewalls: Vec<Address>,
    pub subnets: Vec<Address>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
}

impl LoadBalancerSpec {
    fn default_type() -> LoadBalancerType {
        LoadBalancerType::Application
    }
}

impl ResourceSpec for LoadBalancerSpec {
    const KIND: EntityKind = EntityKind::LoadBalancer;
    const FIELDS: FieldSchema = FieldSchema::new(
        &["exposure", "subnets"],
        &["load_balancer_type", "firewalls", "tags"],
    );

    fn references(&self) -> Vec<Reference<'_>> {
        indexed("firewalls", &self.firewalls, EntityKind::Firewall)
            .chain(indexed("subnets", &self.subnets, EntityKind::Subnet))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationProtocol {
    Http,
    Https,
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Ip,
    Instance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthCheck {
    pub path: String,
    #[serde(default = "HealthCheck::default_matcher")]
    pub matcher: String,
    #[serde(default = "HealthCheck::default_interval")]
    pub interval_seconds: u32,
    #[serde(default = "HealthCheck::default_threshold")]
    pub healthy_threshold: u32,
    #[serde(default = "HealthCheck::default_threshold")]
    pub unhealthy_threshold: u32,
}

impl HealthCheck {
    fn default_matcher() -> String {
        "200".to_string()
    }

    fn default_interval() -> u32 {
        30
    }

    fn default_threshold() -> u32 {
        3
    }

    pub fn http(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            matcher: Self::default_matcher(),
            interval_seconds: Self::default_interval(),
            healthy_threshold: Self::default_threshold(),
            unhealthy_threshold: Self::default_threshold(),
        }
    }
}

/// Set of compute endpoints a load balancer forwards to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupSpec {
    pub network: Address,
    pub port: u16,
    pub protocol: ApplicationProtocol,
    pub target_type: TargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
}

impl ResourceSpec for TargetGroupSpec {
    const KIND: EntityKind = EntityKind::TargetGroup;
    const FIELDS: FieldSchema = FieldSchema::new(
        &["network", "port", "protocol", "target_type"],
        &["health_check"],
    );

    fn references(&self) -> Vec<Reference<'_>> {
        vec![Reference::new("network", &self.network, EntityKind::Network)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListenerAction {
    Forward {
        target_group: Address,
    },
    FixedResponse {
        status_code: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerSpec {
    pub load_balancer: Address,
    pub port: u16,
    pub protocol: ApplicationProtocol,
    pub default_actions: Vec<ListenerAction>,
}

impl ListenerSpec {
    /// Target groups this listener forwards to
    pub fn forwarded_target_groups(&self) -> impl Iterator<Item = &Address> {
        self.default_actions.iter().filter_map(|action| match action {
            ListenerAction::Forward { target_group } => Some(target_group),
            ListenerAction::FixedResponse { .. } => None,
        })
    }
}

impl ResourceSpec for ListenerSpec {
    const KIND: EntityKind = EntityKind::Listener;
    const FIELDS: FieldSchema = FieldSchema::new(
        &["load_balancer", "port", "protocol", "default_actions"],
        &[],
    );

    fn references(&self) -> Vec<Reference<'_>> {
        let mut refs = vec![Reference::new(
            "load_balancer",
            &self.load_balancer,
            EntityKind::LoadBalancer,
        )];
        for (i, action) in self.default_actions.iter().enumerate() {
            if let ListenerAction::Forward { target_group } = action {
                refs.push(Reference::new(
                    format!("default_actions[{}].target_group", i),
                    target_group,
                    EntityKind::TargetGroup,
                ));
            }
        }
        refs
    }
}

// ============================================================================
// Identity Layer
// ============================================================================

/// Which external principal may assume an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustPolicy {
    pub principal_service: String,
    #[serde(default = "TrustPolicy::default_action")]
    pub action: String,
}

impl TrustPolicy {
    fn default_action() -> String {
        "sts:AssumeRole".to_string()
    }

    pub fn service(principal_service: impl Into<String>) -> Self {
        Self {
            principal_service: principal_service.into(),
            action: Self::default_action(),
        }
    }
}

/// Execution identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySpec {
    pub role_name: String,
    pub trust: TrustPolicy,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
}

impl ResourceSpec for IdentitySpec {
    const KIND: EntityKind = EntityKind::Role;
    const FIELDS: FieldSchema = FieldSchema::new(&["role_name", "trust"], &["tags"]);

    fn references(&self) -> Vec<Reference<'_>> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAttachmentSpec {
    pub role: Address,
    pub policy_arn: String,
}

impl ResourceSpec for PolicyAttachmentSpec {
    const KIND: EntityKind = EntityKind::PolicyAttachment;
    const FIELDS: FieldSchema = FieldSchema::new(&["role", "policy_arn"], &[]);

    fn references(&self) -> Vec<Reference<'_>> {
        vec![Reference::new("role", &self.role, EntityKind::Role)]
    }
}

// ============================================================================
// Observability Layer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroupSpec {
    pub log_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
}

impl ResourceSpec for LogGroupSpec {
    const KIND: EntityKind = EntityKind::LogGroup;
    const FIELDS: FieldSchema = FieldSchema::new(&["log_group_name"], &["retention_days"]);

    fn references(&self) -> Vec<Reference<'_>> {
        Vec::new()
    }
}

// ============================================================================
// Compute Layer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub cluster_name: String,
    #[serde(default)]
    pub container_insights: bool,
}

impl ResourceSpec for ClusterSpec {
    const KIND: EntityKind = EntityKind::Cluster;
    const FIELDS: FieldSchema = FieldSchema::new(&["cluster_name"], &["container_insights"]);

    fn references(&self) -> Vec<Reference<'_>> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Provider-managed capacity
    Fargate,
    /// Self-managed instances
    Ec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    Awsvpc,
    Bridge,
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortMapping {
    pub container_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    #[serde(default = "PortMapping::default_protocol")]
    pub protocol: Protocol,
}

impl PortMapping {
    fn default_protocol() -> Protocol {
        Protocol::Tcp
    }

    pub fn tcp(container_port: u16) -> Self {
        Self {
            container_port,
            host_port: Some(container_port),
            protocol: Protocol::Tcp,
        }
    }
}

/// Log routing of a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfiguration {
    pub log_group: Address,
    pub region: String,
    pub stream_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default = "default_true")]
    pub essential: bool,
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_configuration: Option<LogConfiguration>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

impl ContainerSpec {
    pub fn exposes_port(&self, port: u16) -> bool {
        self.port_mappings
            .iter()
            .any(|mapping| mapping.container_port == port)
    }
}

/// Task definition: containers with resource reservations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub family: String,
    pub requires_compatibilities: Vec<LaunchMode>,
    pub network_mode: NetworkMode,
    /// CPU units (1024 = one vCPU)
    pub cpu: u32,
    /// Memory in MiB
    pub memory: u32,
    pub execution_role: Address,
    pub containers: Vec<ContainerSpec>,
}

impl TaskSpec {
    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }
}

impl ResourceSpec for TaskSpec {
    const KIND: EntityKind = EntityKind::TaskDefinition;
    const FIELDS: FieldSchema = FieldSchema::new(
        &["family", "requires_compatibilities", "network_mode", "cpu", "memory", "execution_role", "containers"],
        &[],
    );

    fn references(&self) -> Vec<Reference<'_>> {
        let mut refs = vec![Reference::new(
            "execution_role",
            &self.execution_role,
            EntityKind::Role,
        )];
        for (i, container) in self.containers.iter().enumerate() {
            if let Some(logging) = &container.log_configuration {
                refs.push(Reference::new(
                    format!("containers[{}].log_configuration.log_group", i),
                    &logging.log_group,
                    EntityKind::LogGroup,
                ));
            }
        }
        refs
    }
}

/// Network placement of a service's tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacementSpec {
    pub subnets: Vec<Address>,
    #[serde(default)]
    pub firewalls: Vec<Address>,
    #[serde(default)]
    pub assign_public_ip: bool,
}

/// Registration of a service's container port with a target group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetRegistration {
    pub target_group: Address,
    pub container_name: String,
    pub container_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub cluster: Address,
    pub task_definition: Address,
    pub desired_count: u32,
    pub launch_mode: LaunchMode,
    pub placement: PlacementSpec,
    #[serde(default)]
    pub load_balancers: Vec<TargetRegistration>,
}

impl ResourceSpec for ServiceSpec {
    const KIND: EntityKind = EntityKind::Service;
    const FIELDS: FieldSchema = FieldSchema::new(
        &["cluster", "task_definition", "desired_count", "launch_mode", "placement"],
        &["load_balancers"],
    );

    fn references(&self) -> Vec<Reference<'_>> {
        let mut refs = vec![
            Reference::new("cluster", &self.cluster, EntityKind::Cluster),
            Reference::new(
                "task_definition",
                &self.task_definition,
                EntityKind::TaskDefinition,
            ),
        ];
        refs.extend(indexed(
            "placement.subnets",
            &self.placement.subnets,
            EntityKind::Subnet,
        ));
        refs.extend(indexed(
            "placement.firewalls",
            &self.placement.firewalls,
            EntityKind::Firewall,
        ));
        refs.extend(self.load_balancers.iter().enumerate().map(|(i, reg)| {
            Reference::new(
                format!("load_balancers[{}].target_group", i),
                &reg.target_group,
                EntityKind::TargetGroup,
            )
        }));
        refs
    }
}

// ============================================================================
// Resource Union and Declarations
// ============================================================================

/// Any declarable resource, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Network(NetworkSpec),
    Subnet(SubnetSpec),
    InternetGateway(InternetGatewaySpec),
    RouteTable(RouteTableSpec),
    RouteTableAssociation(RouteTableAssociationSpec),
    Firewall(FirewallSpec),
    LoadBalancer(LoadBalancerSpec),
    TargetGroup(TargetGroupSpec),
    Listener(ListenerSpec),
    Role(IdentitySpec),
    PolicyAttachment(PolicyAttachmentSpec),
    LogGroup(LogGroupSpec),
    Cluster(ClusterSpec),
    TaskDefinition(TaskSpec),
    Service(ServiceSpec),
}

impl Resource {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Network(_) => NetworkSpec::KIND,
            Self::Subnet(_) => SubnetSpec::KIND,
            Self::InternetGateway(_) => InternetGatewaySpec::KIND,
            Self::RouteTable(_) => RouteTableSpec::KIND,
            Self::RouteTableAssociation(_) => RouteTableAssociationSpec::KIND,
            Self::Firewall(_) => FirewallSpec::KIND,
            Self::LoadBalancer(_) => LoadBalancerSpec::KIND,
            Self::TargetGroup(_) => TargetGroupSpec::KIND,
            Self::Listener(_) => ListenerSpec::KIND,
            Self::Role(_) => IdentitySpec::KIND,
            Self::PolicyAttachment(_) => PolicyAttachmentSpec::KIND,
            Self::LogGroup(_) => LogGroupSpec::KIND,
            Self::Cluster(_) => ClusterSpec::KIND,
            Self::TaskDefinition(_) => TaskSpec::KIND,
            Self::Service(_) => ServiceSpec::KIND,
        }
    }

    /// Attribute references to other declarations
    pub fn references(&self) -> Vec<Reference<'_>> {
        match self {
            Self::Network(spec) => spec.references(),
            Self::Subnet(spec) => spec.references(),
            Self::InternetGateway(spec) => spec.references(),
            Self::RouteTable(spec) => spec.references(),
            Self::RouteTableAssociation(spec) => spec.references(),
            Self::Firewall(spec) => spec.references(),
            Self::LoadBalancer(spec) => spec.references(),
            Self::TargetGroup(spec) => spec.references(),
            Self::Listener(spec) => spec.references(),
            Self::Role(spec) => spec.references(),
            Self::PolicyAttachment(spec) => spec.references(),
            Self::LogGroup(spec) => spec.references(),
            Self::Cluster(spec) => spec.references(),
            Self::TaskDefinition(spec) => spec.references(),
            Self::Service(spec) => spec.references(),
        }
    }

    /// Field schema of a declarable kind; outputs are not resources
    pub fn schema(kind: EntityKind) -> Option<FieldSchema> {
        let schema = match kind {
            EntityKind::Network => NetworkSpec::FIELDS,
            EntityKind::Subnet => SubnetSpec::FIELDS,
            EntityKind::InternetGateway => InternetGatewaySpec::FIELDS,
            EntityKind::RouteTable => RouteTableSpec::FIELDS,
            EntityKind::RouteTableAssociation => RouteTableAssociationSpec::FIELDS,
            EntityKind::Firewall => FirewallSpec::FIELDS,
            EntityKind::LoadBalancer => LoadBalancerSpec::FIELDS,
            EntityKind::TargetGroup => TargetGroupSpec::FIELDS,
            EntityKind::Listener => ListenerSpec::FIELDS,
            EntityKind::Role => IdentitySpec::FIELDS,
            EntityKind::PolicyAttachment => PolicyAttachmentSpec::FIELDS,
            EntityKind::LogGroup => LogGroupSpec::FIELDS,
            EntityKind::Cluster => ClusterSpec::FIELDS,
            EntityKind::TaskDefinition => TaskSpec::FIELDS,
            EntityKind::Service => ServiceSpec::FIELDS,
            EntityKind::Output => return None,
        };
        Some(schema)
    }
}

/// A named resource declaration within a snapshot
///
/// `depends_on` holds explicit ordering overrides: edges that no
/// attribute reference implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: EntityName,
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Address>,
}

impl Declaration {
    /// Fields every declaration carries, whatever its kind
    pub const COMMON_FIELDS: [&'static str; 3] = ["name", "kind", "depends_on"];

    pub fn new(name: &str, resource: Resource) -> Result<Self, AddressError> {
        Ok(Self {
            name: EntityName::new(name)?,
            resource,
            depends_on: Vec::new(),
        })
    }

    /// Add an explicit ordering override
    pub fn depends_on(mut self, target: Address) -> Self {
        if !self.depends_on.contains(&target) {
            self.depends_on.push(target);
        }
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.resource.kind()
    }

    pub fn address(&self) -> Address {
        Address::from_name(self.kind(), self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn test_service_references() {
        let service = ServiceSpec {
            cluster: addr("cluster.main"),
            task_definition: addr("task_definition.app"),
            desired_count: 2,
            launch_mode: LaunchMode::Fargate,
            placement: PlacementSpec {
                subnets: vec![addr("subnet.public_a"), addr("subnet.public_b")],
                firewalls: vec![addr("firewall.service")],
                assign_public_ip: true,
            },
            load_balancers: vec![TargetRegistration {
                target_group: addr("target_group.app"),
                container_name: "app".to_string(),
                container_port: 80,
            }],
        };

        let refs = service.references();
        let attributes: Vec<&str> = refs.iter().map(|r| r.attribute.as_str()).collect();
        assert_eq!(
            attributes,
            vec![
                "cluster",
                "task_definition",
                "placement.subnets[0]",
                "placement.subnets[1]",
                "placement.firewalls[0]",
                "load_balancers[0].target_group",
            ]
        );
        assert_eq!(refs[4].expected, EntityKind::Firewall);
    }

    #[test]
    fn test_firewall_references_only_firewall_sources() {
        let firewall = FirewallSpec {
            group_name: "service".to_string(),
            description: None,
            network: addr("network.main"),
            ingress: vec![
                FirewallRule::tcp_from_firewall(PortRange::single(80), addr("firewall.lb")),
                FirewallRule::tcp_from_cidr(PortRange::single(22), "10.0.0.0/16".parse().unwrap()),
            ],
            egress: vec![],
            tags: Tags::new(),
        };

        let refs = firewall.references();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].attribute, "ingress[0].source");
        assert_eq!(refs[1].target, &addr("firewall.lb"));
        assert_eq!(firewall.rules().count(), 2);
    }

    #[test]
    fn test_route_table_default_gateway() {
        let table = RouteTableSpec {
            network: addr("network.main"),
            routes: vec![Route {
                destination: "0.0.0.0/0".parse().unwrap(),
                gateway: addr("internet_gateway.main"),
            }],
            tags: Tags::new(),
        };
        assert_eq!(table.default_gateway(), Some(&addr("internet_gateway.main")));
    }

    #[test]
    fn test_declaration_from_json() {
        let json = r#"{
            "name": "public_a",
            "kind": "subnet",
            "network": "network.main",
            "cidr": "10.0.1.0/24",
            "fault_domain": "us-east-1a",
            "map_public_ip_on_launch": true
        }"#;

        let declaration: Declaration = serde_json::from_str(json).unwrap();
        assert_eq!(declaration.address(), addr("subnet.public_a"));
        assert!(declaration.depends_on.is_empty());
        match &declaration.resource {
            Resource::Subnet(subnet) => {
                assert!(subnet.map_public_ip_on_launch);
                assert_eq!(subnet.fault_domain.as_str(), "us-east-1a");
            }
            other => panic!("unexpected resource: {:?}", other),
        }
    }

    #[test]
    fn test_schemas_cover_serialized_records() {
        let snapshot = crate::blueprint::WebServiceBlueprint::default()
            .build()
            .unwrap();
        let mut kinds = std::collections::BTreeSet::new();

        for declaration in &snapshot.resources {
            let schema = Resource::schema(declaration.kind()).unwrap();
            let value = serde_json::to_value(declaration).unwrap();
            let object = value.as_object().unwrap();

            for key in object.keys() {
                assert!(
                    Declaration::COMMON_FIELDS.contains(&key.as_str()) || schema.accepts(key),
                    "{}: `{}` missing from schema",
                    declaration.address(),
                    key
                );
            }
            for field in schema.required {
                assert!(object.contains_key(*field), "{}: {}", declaration.address(), field);
            }
            kinds.insert(declaration.kind());
        }

        assert_eq!(kinds.len(), 15);
        assert!(Resource::schema(EntityKind::Output).is_none());
    }

    #[test]
    fn test_nested_records_reject_unknown_fields() {
        let json = r#"{"ports": 80, "protocol": "tcp", "source": {"cidr": "0.0.0.0/0"}, "descripton": "typo"}"#;
        assert!(serde_json::from_str::<FirewallRule>(json).is_err());
    }

    #[test]
    fn test_declaration_override_is_deduplicated() {
        let declaration = Declaration::new(
            "logs",
            Resource::LogGroup(LogGroupSpec {
                log_group_name: "/ecs/app".to_string(),
                retention_days: Some(7),
            }),
        )
        .unwrap()
        .depends_on(addr("cluster.main"))
        .depends_on(addr("cluster.main"));

        assert_eq!(declaration.depends_on.len(), 1);
        assert_eq!(declaration.kind(), EntityKind::LogGroup);
    }
}
