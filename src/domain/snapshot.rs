// Copyright (c) 2025 - Cowboy AI, Inc.
//! Desired-State Snapshot
//!
//! A snapshot is the complete declared configuration at one point in
//! time: resource declarations plus published outputs. It is read from
//! JSON or YAML and indexed by a [`Catalog`] for lookups by address.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use super::address::{Address, AddressError, EntityKind, EntityName};
use super::invariants::{check_declared_fields, Invariant};
use super::resources::{
    Declaration, FirewallSpec, InternetGatewaySpec, ListenerSpec, LoadBalancerSpec, NetworkSpec,
    Resource, RouteTableSpec, SubnetSpec, TargetGroupSpec, TaskSpec,
};
use crate::errors::{PlannerError, PlannerResult, TopologyError, ValidationReport};

/// Reference to an attribute of a declared entity (`kind.name.attribute`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttributeRef {
    pub resource: Address,
    pub attribute: String,
}

impl AttributeRef {
    pub fn new(resource: Address, attribute: impl Into<String>) -> Self {
        Self {
            resource,
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

impl FromStr for AttributeRef {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, attribute) = s
            .rsplit_once('.')
            .ok_or_else(|| AddressError::MissingSeparator(s.to_string()))?;
        if attribute.is_empty() {
            return Err(AddressError::EmptyName);
        }
        Ok(Self::new(resource.parse()?, attribute))
    }
}

impl TryFrom<String> for AttributeRef {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributeRef> for String {
    fn from(value: AttributeRef) -> Self {
        value.to_string()
    }
}

/// A value published to the operator once the topology is live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: EntityName,
    pub value: AttributeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
}

impl OutputSpec {
    pub fn new(name: &str, value: AttributeRef) -> Result<Self, AddressError> {
        Ok(Self {
            name: EntityName::new(name)?,
            value,
            description: None,
            sensitive: false,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn address(&self) -> Address {
        Address::from_name(EntityKind::Output, self.name.clone())
    }
}

/// Serialized snapshot format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    Json,
    #[value(alias = "yml")]
    Yaml,
}

impl SnapshotFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl FromStr for SnapshotFormat {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(PlannerError::Configuration(format!(
                "unknown snapshot format: {}",
                other
            ))),
        }
    }
}

/// Complete declared configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub resources: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputSpec>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, declaration: Declaration) -> Self {
        self.resources.push(declaration);
        self
    }

    pub fn with_output(mut self, output: OutputSpec) -> Self {
        self.outputs.push(output);
        self
    }

    /// Number of graph nodes (resources and outputs)
    pub fn len(&self) -> usize {
        self.resources.len() + self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }

    /// Parse a JSON snapshot
    ///
    /// Declarations are decoded one at a time. Field problems are collected
    /// for every declaration and returned together as
    /// [`PlannerError::Rejected`], each keyed by the declaration's address.
    /// Entries without a usable `name` and `kind` are parse errors.
    pub fn from_json_str(json: &str) -> PlannerResult<Self> {
        serde_json::from_str::<RawSnapshot>(json)?.decode()
    }

    /// Parse a YAML snapshot; see [`Snapshot::from_json_str`]
    pub fn from_yaml_str(yaml: &str) -> PlannerResult<Self> {
        serde_yaml::from_str::<RawSnapshot>(yaml)?.decode()
    }

    pub fn parse(text: &str, format: SnapshotFormat) -> PlannerResult<Self> {
        match format {
            SnapshotFormat::Json => Self::from_json_str(text),
            SnapshotFormat::Yaml => Self::from_yaml_str(text),
        }
    }

    /// Read a snapshot file; the format defaults to the file extension
    pub fn from_path(path: &Path, format: Option<SnapshotFormat>) -> PlannerResult<Self> {
        let format = format
            .or_else(|| SnapshotFormat::from_path(path))
            .ok_or_else(|| {
                PlannerError::Configuration(format!(
                    "cannot infer snapshot format of {}, pass it explicitly",
                    path.display()
                ))
            })?;

        let text = std::fs::read_to_string(path).map_err(|e| PlannerError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let snapshot = Self::parse(&text, format)?;
        debug!(
            "Loaded snapshot {} ({} resources, {} outputs)",
            path.display(),
            snapshot.resources.len(),
            snapshot.outputs.len()
        );
        Ok(snapshot)
    }

    pub fn to_json_pretty(&self) -> PlannerResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PlannerError::Serialization(e.to_string()))
    }

    pub fn to_yaml(&self) -> PlannerResult<String> {
        serde_yaml::to_string(self).map_err(|e| PlannerError::Serialization(e.to_string()))
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self)
    }
}

/// Snapshot whose declarations are not decoded yet
#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    resources: Vec<Value>,
    #[serde(default)]
    outputs: Vec<OutputSpec>,
}

impl RawSnapshot {
    fn decode(self) -> PlannerResult<Snapshot> {
        let mut resources = Vec::with_capacity(self.resources.len());
        let mut report = ValidationReport::default();

        for (index, entry) in self.resources.into_iter().enumerate() {
            let address = identify(index, &entry)?;
            let problems = match entry.as_object() {
                Some(object) => check_declared_fields(address.kind(), object),
                None => Vec::new(),
            };
            if !problems.is_empty() {
                report.extend(
                    problems
                        .into_iter()
                        .map(|invariant| TopologyError::violation(address.clone(), invariant)),
                );
                continue;
            }

            match serde_json::from_value::<Declaration>(entry) {
                Ok(declaration) => resources.push(declaration),
                Err(err) => report.push(TopologyError::violation(
                    address,
                    Invariant::Malformed {
                        reason: err.to_string(),
                    },
                )),
            }
        }

        if !report.is_empty() {
            debug!("Snapshot rejected while decoding: {} error(s)", report.len());
            return Err(PlannerError::Rejected(report));
        }

        Ok(Snapshot {
            resources,
            outputs: self.outputs,
        })
    }
}

/// Address of the `index`th resource entry
fn identify(index: usize, entry: &Value) -> PlannerResult<Address> {
    let fail = |message: String| PlannerError::Parse(format!("resources[{}]: {}", index, message));

    let object = entry
        .as_object()
        .ok_or_else(|| fail("expected a mapping".to_string()))?;
    let field = |name: &str| {
        object
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| fail(format!("missing string field `{}`", name)))
    };

    let kind: EntityKind = field("kind")?.parse().map_err(|e: AddressError| fail(e.to_string()))?;
    if Resource::schema(kind).is_none() {
        return Err(fail(format!("{} is not a resource kind", kind)));
    }
    Address::new(kind, field("name")?).map_err(|e| fail(e.to_string()))
}

/// Address index over a snapshot
///
/// The first declaration of an address wins; later ones are recorded as
/// duplicates.
#[derive(Debug, Clone)]
pub struct Catalog<'a> {
    resources: BTreeMap<Address, &'a Declaration>,
    outputs: BTreeMap<Address, &'a OutputSpec>,
    duplicates: Vec<Address>,
}

impl<'a> Catalog<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        let mut resources = BTreeMap::new();
        let mut outputs = BTreeMap::new();
        let mut duplicates = Vec::new();

        for declaration in &snapshot.resources {
            let address = declaration.address();
            if resources.contains_key(&address) {
                duplicates.push(address);
            } else {
                resources.insert(address, declaration);
            }
        }

        for output in &snapshot.outputs {
            let address = output.address();
            if outputs.contains_key(&address) {
                duplicates.push(address);
            } else {
                outputs.insert(address, output);
            }
        }

        Self {
            resources,
            outputs,
            duplicates,
        }
    }

    /// Addresses declared more than once (one entry per extra declaration)
    pub fn duplicates(&self) -> &[Address] {
        &self.duplicates
    }

    pub fn get(&self, address: &Address) -> Option<&'a Declaration> {
        self.resources.get(address).copied()
    }

    pub fn output(&self, address: &Address) -> Option<&'a OutputSpec> {
        self.outputs.get(address).copied()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.resources.contains_key(address) || self.outputs.contains_key(address)
    }

    /// Unique declarations, ordered by address
    pub fn declarations(&self) -> impl Iterator<Item = (&Address, &'a Declaration)> + '_ {
        self.resources.iter().map(|(address, decl)| (address, *decl))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&Address, &'a OutputSpec)> + '_ {
        self.outputs.iter().map(|(address, output)| (address, *output))
    }

    pub fn of_kind(
        &self,
        kind: EntityKind,
    ) -> impl Iterator<Item = (&Address, &'a Declaration)> + '_ {
        self.declarations()
            .filter(move |(address, _)| address.kind() == kind)
    }

    pub fn network(&self, address: &Address) -> Option<&'a NetworkSpec> {
        match &self.get(address)?.resource {
            Resource::Network(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn subnet(&self, address: &Address) -> Option<&'a SubnetSpec> {
        match &self.get(address)?.resource {
            Resource::Subnet(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn internet_gateway(&self, address: &Address) -> Option<&'a InternetGatewaySpec> {
        match &self.get(address)?.resource {
            Resource::InternetGateway(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn route_table(&self, address: &Address) -> Option<&'a RouteTableSpec> {
        match &self.get(address)?.resource {
            Resource::RouteTable(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn firewall(&self, address: &Address) -> Option<&'a FirewallSpec> {
        match &self.get(address)?.resource {
            Resource::Firewall(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn load_balancer(&self, address: &Address) -> Option<&'a LoadBalancerSpec> {
        match &self.get(address)?.resource {
            Resource::LoadBalancer(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn target_group(&self, address: &Address) -> Option<&'a TargetGroupSpec> {
        match &self.get(address)?.resource {
            Resource::TargetGroup(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn listener(&self, address: &Address) -> Option<&'a ListenerSpec> {
        match &self.get(address)?.resource {
            Resource::Listener(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn task_definition(&self, address: &Address) -> Option<&'a TaskSpec> {
        match &self.get(address)?.resource {
            Resource::TaskDefinition(spec) => Some(spec),
            _ => None,
        }
    }

    /// Listeners whose actions forward to `target_group`
    pub fn listeners_forwarding_to(&self, target_group: &Address) -> Vec<&Address> {
        self.declarations()
            .filter_map(|(address, decl)| match &decl.resource {
                Resource::Listener(listener)
                    if listener.forwarded_target_groups().any(|tg| tg == target_group) =>
                {
                    Some(address)
                }
                _ => None,
            })
            .collect()
    }

    /// Route tables associated with `subnet`
    pub fn route_tables_of(&self, subnet: &Address) -> Vec<&'a Address> {
        self.resources
            .values()
            .copied()
            .filter_map(|decl| match &decl.resource {
                Resource::RouteTableAssociation(assoc) if &assoc.subnet == subnet => {
                    Some(&assoc.route_table)
                }
                _ => None,
            })
            .collect()
    }

    /// Check whether any load balancer attaches `firewall`
    pub fn is_load_balancer_firewall(&self, firewall: &Address) -> bool {
        self.resources.values().any(|decl| match &decl.resource {
            Resource::LoadBalancer(lb) => lb.firewalls.contains(firewall),
            _ => false,
        })
    }

    /// Check whether `subnet` is routed to an internet gateway by default route
    pub fn is_internet_routed(&self, subnet: &Address) -> bool {
        self.route_tables_of(subnet).into_iter().any(|table| {
            self.route_table(table)
                .and_then(RouteTableSpec::default_gateway)
                .is_some_and(|gateway| self.internet_gateway(gateway).is_some())
        })
    }
}
