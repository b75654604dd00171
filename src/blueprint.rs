// Copyright (c) 2025 - Cowboy AI, Inc.
//! Web Service Blueprint
//!
//! Builds the reference topology for a single containerized web service:
//! a public load balancer in two fault domains forwarding to a Fargate
//! service, with the network, firewalls, identity and logging it needs.
//!
//! ```text
//! internet → firewall.load_balancer → load_balancer.main → listener.http
//!          → target_group.app → firewall.service → service.app
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::{
    Address, ApplicationProtocol, AttributeRef, Cidr, ClusterSpec, ContainerSpec, Declaration,
    EntityKind, EntityName, Exposure, FaultDomain, FirewallRule, FirewallSpec, HealthCheck,
    IdentitySpec, InternetGatewaySpec, LaunchMode, ListenerAction, ListenerSpec,
    LoadBalancerSpec, LoadBalancerType, LogConfiguration, LogGroupSpec, NetworkMode, NetworkSpec,
    OutputSpec, PlacementSpec, PolicyAttachmentSpec, PortMapping, PortRange, Protocol, Resource,
    Route, RouteTableAssociationSpec, RouteTableSpec, ServiceSpec, Snapshot, SubnetSpec, Tags,
    TargetGroupSpec, TargetRegistration, TargetType, TaskSpec, TrafficSource, TrustPolicy,
};
use crate::errors::PlannerResult;

/// Managed policy granting image pulls and log delivery to tasks
pub const TASK_EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";

/// Principal that assumes the task execution role
pub const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Name of the single application container
pub const CONTAINER_NAME: &str = "app";

/// Reference web-service topology with its knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebServiceBlueprint {
    /// Prefix of provider-side names (`<prefix>-cluster`, ...)
    pub prefix: String,
    pub image: String,
    pub container_port: u16,
    pub listener_port: u16,
    pub desired_count: u32,
    pub cpu: u32,
    pub memory: u32,
    pub region: String,
    pub network_cidr: String,
    pub subnet_cidrs: [String; 2],
    pub fault_domains: [String; 2],
    /// Route container logs to a log group
    pub logging: bool,
    pub log_retention_days: u32,
    /// Attach an HTTP health check on `/` to the target group
    pub health_check: bool,
    /// Order the service after the listener feeding its target group
    pub listener_ordering: bool,
}

impl Default for WebServiceBlueprint {
    fn default() -> Self {
        Self {
            prefix: "web".to_string(),
            image: "public.ecr.aws/docker/library/python:3.12-slim".to_string(),
            container_port: 80,
            listener_port: 80,
            desired_count: 1,
            cpu: 256,
            memory: 512,
            region: "us-east-1".to_string(),
            network_cidr: "10.0.0.0/16".to_string(),
            subnet_cidrs: ["10.0.1.0/24".to_string(), "10.0.2.0/24".to_string()],
            fault_domains: ["us-east-1a".to_string(), "us-east-1b".to_string()],
            logging: true,
            log_retention_days: 7,
            health_check: true,
            listener_ordering: true,
        }
    }
}

fn addr(kind: EntityKind, name: &str) -> PlannerResult<Address> {
    Ok(Address::new(kind, name)?)
}

fn declare(name: &str, resource: Resource) -> PlannerResult<Declaration> {
    Ok(Declaration::new(name, resource)?)
}

impl WebServiceBlueprint {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn container_port(mut self, port: u16) -> Self {
        self.container_port = port;
        self
    }

    pub fn listener_port(mut self, port: u16) -> Self {
        self.listener_port = port;
        self
    }

    pub fn desired_count(mut self, count: u32) -> Self {
        self.desired_count = count;
        self
    }

    pub fn resources(mut self, cpu: u32, memory: u32) -> Self {
        self.cpu = cpu;
        self.memory = memory;
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn fault_domains(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.fault_domains = [first.into(), second.into()];
        self
    }

    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    pub fn listener_ordering(mut self, enabled: bool) -> Self {
        self.listener_ordering = enabled;
        self
    }

    fn tags(&self, suffix: &str) -> Tags {
        BTreeMap::from([("Name".to_string(), format!("{}-{}", self.prefix, suffix))])
    }

    /// Build the snapshot
    ///
    /// Fails with [`crate::errors::PlannerError::Configuration`] when a knob does not form
    /// a valid value (prefix, address ranges, fault domains).
    pub fn build(&self) -> PlannerResult<Snapshot> {
        EntityName::new(self.prefix.as_str())?;

        let network_cidr = Cidr::new(&self.network_cidr)?;
        let anywhere = Cidr::new("0.0.0.0/0")?;
        let zones = [
            FaultDomain::new(self.fault_domains[0].as_str())?,
            FaultDomain::new(self.fault_domains[1].as_str())?,
        ];
        let subnet_cidrs = [
            Cidr::new(&self.subnet_cidrs[0])?,
            Cidr::new(&self.subnet_cidrs[1])?,
        ];

        let network = addr(EntityKind::Network, "main")?;
        let gateway = addr(EntityKind::InternetGateway, "main")?;
        let route_table = addr(EntityKind::RouteTable, "public")?;
        let subnets = [
            addr(EntityKind::Subnet, "public_a")?,
            addr(EntityKind::Subnet, "public_b")?,
        ];
        let lb_firewall = addr(EntityKind::Firewall, "load_balancer")?;
        let service_firewall = addr(EntityKind::Firewall, "service")?;
        let load_balancer = addr(EntityKind::LoadBalancer, "main")?;
        let target_group = addr(EntityKind::TargetGroup, "app")?;
        let listener = addr(EntityKind::Listener, "http")?;
        let role = addr(EntityKind::Role, "task_execution")?;
        let log_group = addr(EntityKind::LogGroup, "app")?;
        let cluster = addr(EntityKind::Cluster, "main")?;
        let task = addr(EntityKind::TaskDefinition, "app")?;

        let mut snapshot = Snapshot::new();
        let mut push = |declaration: Declaration| snapshot.resources.push(declaration);

        // Network layer
        push(declare(
            "main",
            Resource::Network(NetworkSpec {
                cidr: network_cidr,
                enable_dns_support: true,
                enable_dns_hostnames: true,
                tags: self.tags("vpc"),
            }),
        )?);

        for (i, (name, subnet)) in ["public_a", "public_b"].iter().zip(&subnets).enumerate() {
            push(declare(
                name,
                Resource::Subnet(SubnetSpec {
                    network: network.clone(),
                    cidr: subnet_cidrs[i],
                    fault_domain: zones[i].clone(),
                    map_public_ip_on_launch: true,
                    tags: self.tags(&format!("public-{}", zones[i])),
                }),
            )?);
            push(declare(
                name,
                Resource::RouteTableAssociation(RouteTableAssociationSpec {
                    subnet: subnet.clone(),
                    route_table: route_table.clone(),
                }),
            )?);
        }

        push(declare(
            "main",
            Resource::InternetGateway(InternetGatewaySpec {
                network: network.clone(),
                tags: self.tags("igw"),
            }),
        )?);

        push(declare(
            "public",
            Resource::RouteTable(RouteTableSpec {
                network: network.clone(),
                routes: vec![Route {
                    destination: anywhere,
                    gateway: gateway.clone(),
                }],
                tags: self.tags("public-rt"),
            }),
        )?);

        // Security layer
        let allow_all_egress = FirewallRule {
            ports: PortRange::ALL,
            protocol: Protocol::All,
            source: TrafficSource::Cidr(anywhere),
            description: None,
        };

        push(declare(
            "load_balancer",
            Resource::Firewall(FirewallSpec {
                group_name: format!("{}-lb-sg", self.prefix),
                description: Some("Public HTTP to the load balancer".to_string()),
                network: network.clone(),
                ingress: vec![FirewallRule::tcp_from_cidr(
                    PortRange::single(self.listener_port),
                    anywhere,
                )
                .with_description("HTTP from anywhere")],
                egress: vec![allow_all_egress.clone()],
                tags: self.tags("lb-sg"),
            }),
        )?);

        push(declare(
            "service",
            Resource::Firewall(FirewallSpec {
                group_name: format!("{}-service-sg", self.prefix),
                description: Some("Load balancer traffic to the service".to_string()),
                network: network.clone(),
                ingress: vec![FirewallRule::tcp_from_firewall(
                    PortRange::single(self.container_port),
                    lb_firewall.clone(),
                )
                .with_description("Container port from the load balancer")],
                egress: vec![allow_all_egress],
                tags: self.tags("service-sg"),
            }),
        )?);

        // Load-balancing layer
        push(declare(
            "main",
            Resource::LoadBalancer(LoadBalancerSpec {
                exposure: Exposure::Public,
                load_balancer_type: LoadBalancerType::Application,
                firewalls: vec![lb_firewall],
                subnets: subnets.to_vec(),
                tags: self.tags("alb"),
            }),
        )?);

        push(declare(
            "app",
            Resource::TargetGroup(TargetGroupSpec {
                network: network.clone(),
                port: self.container_port,
                protocol: ApplicationProtocol::Http,
                target_type: TargetType::Ip,
                health_check: self.health_check.then(|| HealthCheck::http("/")),
            }),
        )?);

        push(declare(
            "http",
            Resource::Listener(ListenerSpec {
                load_balancer: load_balancer.clone(),
                port: self.listener_port,
                protocol: ApplicationProtocol::Http,
                default_actions: vec![ListenerAction::Forward {
                    target_group: target_group.clone(),
                }],
            }),
        )?);

        // Identity layer
        push(declare(
            "task_execution",
            Resource::Role(IdentitySpec {
                role_name: format!("{}-task-execution", self.prefix),
                trust: TrustPolicy::service(TASK_PRINCIPAL),
                tags: self.tags("task-execution"),
            }),
        )?);

        push(declare(
            "task_execution",
            Resource::PolicyAttachment(PolicyAttachmentSpec {
                role: role.clone(),
                policy_arn: TASK_EXECUTION_POLICY_ARN.to_string(),
            }),
        )?);

        // Observability layer
        if self.logging {
            push(declare(
                "app",
                Resource::LogGroup(LogGroupSpec {
                    log_group_name: format!("/ecs/{}", self.prefix),
                    retention_days: Some(self.log_retention_days),
                }),
            )?);
        }

        // Compute layer
        push(declare(
            "main",
            Resource::Cluster(ClusterSpec {
                cluster_name: format!("{}-cluster", self.prefix),
                container_insights: false,
            }),
        )?);

        let log_configuration = self.logging.then(|| LogConfiguration {
            log_group: log_group.clone(),
            region: self.region.clone(),
            stream_prefix: "ecs".to_string(),
        });

        push(declare(
            "app",
            Resource::TaskDefinition(TaskSpec {
                family: format!("{}-app", self.prefix),
                requires_compatibilities: vec![LaunchMode::Fargate],
                network_mode: NetworkMode::Awsvpc,
                cpu: self.cpu,
                memory: self.memory,
                execution_role: role,
                containers: vec![ContainerSpec {
                    name: CONTAINER_NAME.to_string(),
                    image: self.image.clone(),
                    essential: true,
                    port_mappings: vec![PortMapping::tcp(self.container_port)],
                    log_configuration,
                    environment: BTreeMap::new(),
                }],
            }),
        )?);

        let mut service = declare(
            "app",
            Resource::Service(ServiceSpec {
                cluster,
                task_definition: task,
                desired_count: self.desired_count,
                launch_mode: LaunchMode::Fargate,
                placement: PlacementSpec {
                    subnets: subnets.to_vec(),
                    firewalls: vec![service_firewall],
                    assign_public_ip: true,
                },
                load_balancers: vec![TargetRegistration {
                    target_group,
                    container_name: CONTAINER_NAME.to_string(),
                    container_port: self.container_port,
                }],
            }),
        )?;
        if self.listener_ordering {
            service = service.depends_on(listener);
        }
        push(service);

        // Output layer
        snapshot.outputs.push(
            OutputSpec::new(
                "load_balancer_dns",
                AttributeRef::new(load_balancer, "dns_name"),
            )?
            .with_description("Public address of the load balancer"),
        );

        debug!(
            "Built web service blueprint {} ({} resources)",
            self.prefix,
            snapshot.resources.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PlannerError;
    use crate::validation::validate;

    #[test]
    fn test_default_blueprint_is_valid() {
        let snapshot = WebServiceBlueprint::default().build().unwrap();
        assert_eq!(snapshot.resources.len(), 18);
        assert_eq!(snapshot.outputs.len(), 1);

        let report = validate(&snapshot);
        assert!(report.is_empty(), "{}", report.render());
    }

    #[test]
    fn test_knobs() {
        let snapshot = WebServiceBlueprint::new("api")
            .container_port(8080)
            .logging(false)
            .health_check(false)
            .listener_ordering(false)
            .build()
            .unwrap();

        let catalog = snapshot.catalog();
        assert!(catalog
            .get(&"log_group.app".parse().unwrap())
            .is_none());

        let tg = catalog.target_group(&"target_group.app".parse().unwrap()).unwrap();
        assert_eq!(tg.port, 8080);
        assert!(tg.health_check.is_none());

        let service = catalog.get(&"service.app".parse().unwrap()).unwrap();
        assert!(service.depends_on.is_empty());
    }

    #[test]
    fn test_invalid_knobs_are_configuration_errors() {
        let result = WebServiceBlueprint::new("bad prefix").build();
        assert!(matches!(result, Err(PlannerError::Configuration(_))));

        let result = WebServiceBlueprint::new("web")
            .fault_domains("us-east-1a", "")
            .build();
        assert!(matches!(result, Err(PlannerError::Configuration(_))));
    }
}
