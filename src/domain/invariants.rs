// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Topology Invariants
//!
//! Structural rules a snapshot must satisfy before it can be planned.
//! Every function is pure and returns *all* violations it finds for one
//! entity, so the validation pass can report a snapshot exhaustively.
//!
//! # Invariant Categories
//!
//! 1. **Required fields**: names, images, listeners actions, subnets
//! 2. **Address space**: subnet containment, disjointness, fault domains
//! 3. **Reachability**: public subnets routed to an internet gateway
//! 4. **Traffic chaining**: internet → load balancer → compute only
//! 5. **Wiring**: registrations, launch modes, listener ordering

use serde_json::{Map, Value};
use thiserror::Error;

use super::address::{Address, EntityKind};
use super::network::{Cidr, FaultDomain};
use super::resources::{
    Declaration, Exposure, FirewallSpec, LaunchMode, ListenerAction, ListenerSpec,
    LoadBalancerSpec, NetworkMode, Resource, RouteTableSpec, ServiceSpec, SubnetSpec, TargetType,
    TaskSpec, TrafficSource,
};
use super::snapshot::Catalog;

/// A broken structural rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Invariant {
    #[error("address is declared more than once")]
    DuplicateAddress,

    #[error("required field `{field}` is missing or empty")]
    RequiredField { field: String },

    #[error("field `{field}` is not recognised")]
    UnknownField { field: String },

    #[error("declaration is malformed: {reason}")]
    Malformed { reason: String },

    #[error("field `{field}` is out of range: {reason}")]
    OutOfRange { field: String, reason: String },

    #[error("subnet range {subnet} is not contained in network range {network}")]
    SubnetOutsideNetwork { subnet: Cidr, network: Cidr },

    #[error("subnet range {cidr} overlaps sibling {other} ({other_cidr})")]
    OverlappingSubnets {
        cidr: Cidr,
        other: Address,
        other_cidr: Cidr,
    },

    #[error("fault domain {fault_domain} is shared with sibling {other}")]
    SharedFaultDomain {
        fault_domain: FaultDomain,
        other: Address,
    },

    #[error("subnet assigns public addresses but has no default route to an internet gateway")]
    PublicSubnetUnrouted,

    #[error("`{field}` refers to {other} in {other_network}, expected {network}")]
    NetworkMismatch {
        field: String,
        other: Address,
        network: Address,
        other_network: Address,
    },

    #[error("compute ingress `{rule}` admits address range {cidr} instead of a load-balancer firewall")]
    OpenComputeIngress { rule: String, cidr: Cidr },

    #[error("compute ingress `{rule}` admits {source_firewall}, which no load balancer attaches")]
    IngressBypassesLoadBalancer {
        rule: String,
        source_firewall: Address,
    },

    #[error("public load balancer spans {count} fault domain(s), at least 2 required")]
    SingleFaultDomain { count: usize },

    #[error("public load balancer is placed in {subnet}, which is not routed to the internet")]
    PrivateSubnet { subnet: Address },

    #[error("load balancer has no listener")]
    NoListener,

    #[error("`{field}` names container `{container}`, which the task definition does not declare")]
    UnknownContainer { field: String, container: String },

    #[error("`{field}` registers port {port}, which container `{container}` does not map")]
    UnmappedContainerPort {
        field: String,
        container: String,
        port: u16,
    },

    #[error("task definition {task} does not support launch mode {mode:?}")]
    UnsupportedLaunchMode { task: Address, mode: LaunchMode },

    #[error("launch mode Fargate requires network mode awsvpc, found {found:?}")]
    FargateNetworkMode { found: NetworkMode },

    #[error("target group {target_group} must use ip targets for awsvpc tasks")]
    TargetTypeMismatch { target_group: Address },

    #[error("registration on {target_group} requires `depends_on` {listener}")]
    MissingListenerOrdering {
        listener: Address,
        target_group: Address,
    },
}

/// Smallest IPv4 prefix accepted for networks and subnets
pub const MIN_IPV4_PREFIX: u8 = 16;

/// Largest IPv4 prefix accepted for networks and subnets
pub const MAX_IPV4_PREFIX: u8 = 28;

/// Upper bound on tasks a single service may run
pub const MAX_DESIRED_COUNT: u32 = 5000;

fn required(field: &str) -> Invariant {
    Invariant::RequiredField {
        field: field.to_string(),
    }
}

fn check_prefix(field: &str, cidr: &Cidr) -> Option<Invariant> {
    if cidr.is_ipv4() && !(MIN_IPV4_PREFIX..=MAX_IPV4_PREFIX).contains(&cidr.prefix()) {
        return Some(Invariant::OutOfRange {
            field: field.to_string(),
            reason: format!(
                "prefix /{} outside /{}-/{}",
                cidr.prefix(),
                MIN_IPV4_PREFIX,
                MAX_IPV4_PREFIX
            ),
        });
    }
    None
}

/// Network an entity is attached to, if it has one
pub fn network_of<'a>(catalog: &Catalog<'a>, address: &Address) -> Option<&'a Address> {
    match &catalog.get(address)?.resource {
        Resource::Subnet(spec) => Some(&spec.network),
        Resource::InternetGateway(spec) => Some(&spec.network),
        Resource::RouteTable(spec) => Some(&spec.network),
        Resource::Firewall(spec) => Some(&spec.network),
        Resource::TargetGroup(spec) => Some(&spec.network),
        _ => None,
    }
}

/// Compare the network of each `(field, address)` against `network`
fn check_same_network<'a>(
    catalog: &Catalog<'_>,
    network: &Address,
    members: impl IntoIterator<Item = (String, &'a Address)>,
) -> Vec<Invariant> {
    members
        .into_iter()
        .filter_map(|(field, other)| {
            let other_network = network_of(catalog, other)?;
            (other_network != network).then(|| Invariant::NetworkMismatch {
                field,
                other: other.clone(),
                network: network.clone(),
                other_network: other_network.clone(),
            })
        })
        .collect()
}

/// Validate the field names of one declaration in snapshot form
///
/// # Rules
/// - Every field without a default is present and not null
/// - Every field is known to the declared kind
///
/// Unknown kinds yield no violations; the caller reports them.
pub fn check_declared_fields(kind: EntityKind, object: &Map<String, Value>) -> Vec<Invariant> {
    let Some(schema) = Resource::schema(kind) else {
        return Vec::new();
    };

    let missing = schema
        .required
        .iter()
        .filter(|field| object.get(**field).map_or(true, Value::is_null))
        .map(|field| required(field));

    let unknown = object
        .keys()
        .filter(|key| !Declaration::COMMON_FIELDS.contains(&key.as_str()) && !schema.accepts(key))
        .map(|key| Invariant::UnknownField { field: key.clone() });

    missing.chain(unknown).collect()
}

/// Validate required fields and value ranges of a single declaration
///
/// # Rules
/// - Names, images, ARNs and principals are non-empty
/// - Tasks declare at least one container and one launch mode
/// - Listeners carry at least one action, load balancers and services
///   at least one subnet
/// - Ports, container ports, CPU and memory are non-zero
pub fn check_required_fields(resource: &Resource) -> Vec<Invariant> {
    let mut violations = Vec::new();

    match resource {
        Resource::Network(spec) => {
            violations.extend(check_prefix("cidr", &spec.cidr));
        }
        Resource::Subnet(spec) => {
            violations.extend(check_prefix("cidr", &spec.cidr));
        }
        Resource::Firewall(spec) => {
            if spec.group_name.trim().is_empty() {
                violations.push(required("group_name"));
            }
        }
        Resource::LoadBalancer(spec) => {
            if spec.subnets.is_empty() {
                violations.push(required("subnets"));
            }
        }
        Resource::TargetGroup(spec) => {
            if spec.port == 0 {
                violations.push(required("port"));
            }
            if let Some(check) = &spec.health_check {
                if !check.path.starts_with('/') {
                    violations.push(Invariant::OutOfRange {
                        field: "health_check.path".to_string(),
                        reason: format!("`{}` is not an absolute path", check.path),
                    });
                }
            }
        }
        Resource::Listener(spec) => {
            if spec.port == 0 {
                violations.push(required("port"));
            }
            if spec.default_actions.is_empty() {
                violations.push(required("default_actions"));
            }
        }
        Resource::Role(spec) => {
            if spec.role_name.trim().is_empty() {
                violations.push(required("role_name"));
            }
            if spec.trust.principal_service.trim().is_empty() {
                violations.push(required("trust.principal_service"));
            }
        }
        Resource::PolicyAttachment(spec) => {
            if spec.policy_arn.trim().is_empty() {
                violations.push(required("policy_arn"));
            } else if !spec.policy_arn.starts_with("arn:") {
                violations.push(Invariant::OutOfRange {
                    field: "policy_arn".to_string(),
                    reason: format!("`{}` is not an ARN", spec.policy_arn),
                });
            }
        }
        Resource::LogGroup(spec) => {
            if spec.log_group_name.trim().is_empty() {
                violations.push(required("log_group_name"));
            }
            if spec.retention_days == Some(0) {
                violations.push(Invariant::OutOfRange {
                    field: "retention_days".to_string(),
                    reason: "retention must be at least one day".to_string(),
                });
            }
        }
        Resource::Cluster(spec) => {
            if spec.cluster_name.trim().is_empty() {
                violations.push(required("cluster_name"));
            }
        }
        Resource::TaskDefinition(spec) => violations.extend(check_task_fields(spec)),
        Resource::Service(spec) => {
            if spec.placement.subnets.is_empty() {
                violations.push(required("placement.subnets"));
            }
            for (i, registration) in spec.load_balancers.iter().enumerate() {
                if registration.container_port == 0 {
                    violations.push(required(&format!("load_balancers[{}].container_port", i)));
                }
            }
            if spec.desired_count > MAX_DESIRED_COUNT {
                violations.push(Invariant::OutOfRange {
                    field: "desired_count".to_string(),
                    reason: format!("{} exceeds {}", spec.desired_count, MAX_DESIRED_COUNT),
                });
            }
        }
        Resource::InternetGateway(_)
        | Resource::RouteTable(_)
        | Resource::RouteTableAssociation(_) => {}
    }

    violations
}

fn check_task_fields(task: &TaskSpec) -> Vec<Invariant> {
    let mut violations = Vec::new();

    if task.family.trim().is_empty() {
        violations.push(required("family"));
    }
    if task.requires_compatibilities.is_empty() {
        violations.push(required("requires_compatibilities"));
    }
    if task.cpu == 0 {
        violations.push(required("cpu"));
    }
    if task.memory == 0 {
        violations.push(required("memory"));
    }
    if task.containers.is_empty() {
        violations.push(required("containers"));
    }

    for (i, container) in task.containers.iter().enumerate() {
        if container.name.trim().is_empty() {
            violations.push(required(&format!("containers[{}].name", i)));
        }
        if container.image.trim().is_empty() {
            violations.push(required(&format!("containers[{}].image", i)));
        }
        for (j, mapping) in container.port_mappings.iter().enumerate() {
            if mapping.container_port == 0 {
                violations.push(required(&format!(
                    "containers[{}].port_mappings[{}].container_port",
                    i, j
                )));
            }
        }
        if task.containers[..i].iter().any(|c| c.name == container.name) {
            violations.push(Invariant::OutOfRange {
                field: format!("containers[{}].name", i),
                reason: format!("container name `{}` is repeated", container.name),
            });
        }
    }

    // Invariant: Fargate tasks run in their own network interface
    if task.requires_compatibilities.contains(&LaunchMode::Fargate)
        && task.network_mode != NetworkMode::Awsvpc
    {
        violations.push(Invariant::FargateNetworkMode {
            found: task.network_mode,
        });
    }

    violations
}

/// Validate a subnet against its network and siblings
///
/// # Rules
/// - Range contained in the parent network range
/// - Range disjoint from every sibling's range
/// - Fault domain distinct from every sibling's fault domain
/// - Public-address subnets routed to an internet gateway by default route
///
/// Sibling conflicts are reported once, on the later address of the pair.
pub fn check_subnet(catalog: &Catalog<'_>, address: &Address, subnet: &SubnetSpec) -> Vec<Invariant> {
    let mut violations = Vec::new();

    if let Some(network) = catalog.network(&subnet.network) {
        if !network.cidr.contains(&subnet.cidr) {
            violations.push(Invariant::SubnetOutsideNetwork {
                subnet: subnet.cidr,
                network: network.cidr,
            });
        }
    }

    let earlier_siblings = catalog
        .of_kind(EntityKind::Subnet)
        .take_while(|(other, _)| *other < address)
        .filter_map(|(other, _)| Some((other, catalog.subnet(other)?)))
        .filter(|(_, sibling)| sibling.network == subnet.network);

    for (other, sibling) in earlier_siblings {
        if sibling.cidr.overlaps(&subnet.cidr) {
            violations.push(Invariant::OverlappingSubnets {
                cidr: subnet.cidr,
                other: other.clone(),
                other_cidr: sibling.cidr,
            });
        }
        if sibling.fault_domain == subnet.fault_domain {
            violations.push(Invariant::SharedFaultDomain {
                fault_domain: subnet.fault_domain.clone(),
                other: other.clone(),
            });
        }
    }

    if subnet.map_public_ip_on_launch && !catalog.is_internet_routed(address) {
        violations.push(Invariant::PublicSubnetUnrouted);
    }

    violations
}

/// Validate that a route table only routes through gateways of its own network
pub fn check_route_table(catalog: &Catalog<'_>, table: &RouteTableSpec) -> Vec<Invariant> {
    check_same_network(
        catalog,
        &table.network,
        table
            .routes
            .iter()
            .enumerate()
            .map(|(i, route)| (format!("routes[{}].gateway", i), &route.gateway)),
    )
}

/// Check whether a firewall protects a service registered behind a load balancer
pub fn is_compute_firewall(catalog: &Catalog<'_>, firewall: &Address) -> bool {
    catalog.declarations().any(|(_, decl)| match &decl.resource {
        Resource::Service(service) => {
            !service.load_balancers.is_empty() && service.placement.firewalls.contains(firewall)
        }
        _ => false,
    })
}

/// Validate firewall rule chaining
///
/// # Rules
/// - Firewall sources belong to the same network
/// - A compute firewall admits inbound traffic only from firewalls that
///   a load balancer attaches; an address range would let public traffic
///   bypass the load balancer
pub fn check_firewall(
    catalog: &Catalog<'_>,
    address: &Address,
    firewall: &FirewallSpec,
) -> Vec<Invariant> {
    let sources = [("ingress", &firewall.ingress), ("egress", &firewall.egress)]
        .into_iter()
        .flat_map(|(field, rules)| {
            rules
                .iter()
                .enumerate()
                .filter_map(move |(i, rule)| match &rule.source {
                    TrafficSource::Firewall(source) => {
                        Some((format!("{}[{}].source", field, i), source))
                    }
                    TrafficSource::Cidr(_) => None,
                })
        });
    let mut violations = check_same_network(catalog, &firewall.network, sources);

    if !is_compute_firewall(catalog, address) {
        return violations;
    }

    for (i, rule) in firewall.ingress.iter().enumerate() {
        let field = format!("ingress[{}]", i);
        match &rule.source {
            TrafficSource::Cidr(cidr) => violations.push(Invariant::OpenComputeIngress {
                rule: field,
                cidr: *cidr,
            }),
            TrafficSource::Firewall(source) if !catalog.is_load_balancer_firewall(source) => {
                violations.push(Invariant::IngressBypassesLoadBalancer {
                    rule: field,
                    source_firewall: source.clone(),
                })
            }
            TrafficSource::Firewall(_) => {}
        }
    }

    violations
}

/// Validate load balancer placement
///
/// # Rules
/// - At least one listener is bound to the load balancer
/// - Public load balancers span at least two fault domains and sit in
///   internet-routed subnets only
/// - Attached subnets and firewalls share one network
pub fn check_load_balancer(
    catalog: &Catalog<'_>,
    address: &Address,
    lb: &LoadBalancerSpec,
) -> Vec<Invariant> {
    let mut violations = Vec::new();

    let has_listener = catalog
        .of_kind(EntityKind::Listener)
        .filter_map(|(listener, _)| catalog.listener(listener))
        .any(|listener| &listener.load_balancer == address);
    if !has_listener {
        violations.push(Invariant::NoListener);
    }

    if lb.exposure == Exposure::Public {
        let mut fault_domains: Vec<&FaultDomain> = lb
            .subnets
            .iter()
            .filter_map(|subnet| catalog.subnet(subnet))
            .map(|subnet| &subnet.fault_domain)
            .collect();
        fault_domains.sort();
        fault_domains.dedup();
        if fault_domains.len() < 2 {
            violations.push(Invariant::SingleFaultDomain {
                count: fault_domains.len(),
            });
        }

        for subnet in &lb.subnets {
            if catalog.subnet(subnet).is_some() && !catalog.is_internet_routed(subnet) {
                violations.push(Invariant::PrivateSubnet {
                    subnet: subnet.clone(),
                });
            }
        }
    }

    if let Some(network) = lb.subnets.first().and_then(|s| network_of(catalog, s)) {
        let members = lb
            .subnets
            .iter()
            .enumerate()
            .map(|(i, s)| (format!("subnets[{}]", i), s))
            .chain(
                lb.firewalls
                    .iter()
                    .enumerate()
                    .map(|(i, f)| (format!("firewalls[{}]", i), f)),
            );
        violations.extend(check_same_network(catalog, network, members));
    }

    violations
}

/// Validate listener wiring: forwarded target groups live in the load balancer's network
pub fn check_listener(catalog: &Catalog<'_>, listener: &ListenerSpec) -> Vec<Invariant> {
    let network = catalog
        .load_balancer(&listener.load_balancer)
        .and_then(|lb| lb.subnets.first())
        .and_then(|subnet| network_of(catalog, subnet));

    match network {
        Some(network) => check_same_network(
            catalog,
            network,
            listener
                .default_actions
                .iter()
                .enumerate()
                .filter_map(|(i, action)| match action {
                    ListenerAction::Forward { target_group } => {
                        Some((format!("default_actions[{}].target_group", i), target_group))
                    }
                    ListenerAction::FixedResponse { .. } => None,
                }),
        ),
        None => Vec::new(),
    }
}

/// Validate a service against its task definition, placement and listeners
///
/// # Rules
/// - The task definition supports the service's launch mode
/// - Each registration names a declared container and a port it maps
/// - awsvpc tasks register with `ip` target groups
/// - Placement subnets, firewalls and target groups share one network
/// - A registration on a target group fed by a listener declares an
///   ordering override on that listener
pub fn check_service(catalog: &Catalog<'_>, declaration: &Declaration, service: &ServiceSpec) -> Vec<Invariant> {
    let mut violations = Vec::new();
    let task = catalog.task_definition(&service.task_definition);

    if let Some(task) = task {
        if !task.requires_compatibilities.contains(&service.launch_mode) {
            violations.push(Invariant::UnsupportedLaunchMode {
                task: service.task_definition.clone(),
                mode: service.launch_mode,
            });
        }
    }

    for (i, registration) in service.load_balancers.iter().enumerate() {
        let field = format!("load_balancers[{}]", i);

        if let Some(task) = task {
            match task.container(&registration.container_name) {
                None => violations.push(Invariant::UnknownContainer {
                    field: format!("{}.container_name", field),
                    container: registration.container_name.clone(),
                }),
                Some(container) if !container.exposes_port(registration.container_port) => {
                    violations.push(Invariant::UnmappedContainerPort {
                        field: format!("{}.container_port", field),
                        container: container.name.clone(),
                        port: registration.container_port,
                    })
                }
                Some(_) => {}
            }

            if task.network_mode == NetworkMode::Awsvpc {
                if let Some(target_group) = catalog.target_group(&registration.target_group) {
                    if target_group.target_type != TargetType::Ip {
                        violations.push(Invariant::TargetTypeMismatch {
                            target_group: registration.target_group.clone(),
                        });
                    }
                }
            }
        }

        for listener in catalog.listeners_forwarding_to(&registration.target_group) {
            if !declaration.depends_on.contains(listener) {
                violations.push(Invariant::MissingListenerOrdering {
                    listener: listener.clone(),
                    target_group: registration.target_group.clone(),
                });
            }
        }
    }

    if let Some(network) = service
        .placement
        .subnets
        .first()
        .and_then(|s| network_of(catalog, s))
    {
        let placement = &service.placement;
        let members = placement
            .subnets
            .iter()
            .enumerate()
            .map(|(i, s)| (format!("placement.subnets[{}]", i), s))
            .chain(
                placement
                    .firewalls
                    .iter()
                    .enumerate()
                    .map(|(i, f)| (format!("placement.firewalls[{}]", i), f)),
            )
            .chain(
                service
                    .load_balancers
                    .iter()
                    .enumerate()
                    .map(|(i, r)| (format!("load_balancers[{}].target_group", i), &r.target_group)),
            );
        violations.extend(check_same_network(catalog, network, members));
    }

    violations
}
