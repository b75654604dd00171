// Copyright (c) 2025 - Cowboy AI, Inc.
//! Apply Plan
//!
//! [`plan`] turns a snapshot into an ordered list of steps for the
//! external apply engine, or into a [`ValidationReport`] listing every
//! failure found. There is no partial plan.
//!
//! # Example
//!
//! ```rust
//! use cim_topology::blueprint::WebServiceBlueprint;
//! use cim_topology::plan::plan;
//!
//! let snapshot = WebServiceBlueprint::new("web").build().unwrap();
//! let plan = plan(&snapshot).unwrap();
//!
//! assert_eq!(plan.apply_order().first().unwrap().to_string(), "network.main");
//! assert_eq!(plan.destroy_order().last().unwrap().to_string(), "network.main");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Address, Declaration, Layer, OutputSpec, Snapshot};
use crate::errors::{PlannerError, PlannerResult, ValidationReport};
use crate::graph::{self, EdgeKind, Entity, TopologyGraph};
use crate::validation::validate;

/// Entity provisioned or published by a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedEntity {
    Resource(Declaration),
    Output(OutputSpec),
}

/// One dependency of a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDependency {
    pub address: Address,
    pub kind: EdgeKind,
    pub attribute: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Zero-based position in the apply order
    pub position: usize,
    pub address: Address,
    pub layer: Layer,
    /// Steps sharing a wave are mutually independent
    pub wave: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<StepDependency>,
    pub entity: PlannedEntity,
}

/// Validated, ordered topology
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyPlan {
    steps: Vec<PlanStep>,
}

impl ApplyPlan {
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, address: &Address) -> Option<&PlanStep> {
        self.steps.iter().find(|step| &step.address == address)
    }

    pub fn position(&self, address: &Address) -> Option<usize> {
        self.step(address).map(|step| step.position)
    }

    /// Addresses in apply order, dependencies first
    pub fn apply_order(&self) -> Vec<&Address> {
        self.steps.iter().map(|step| &step.address).collect()
    }

    /// Addresses in destroy order: the exact reverse of the apply order
    pub fn destroy_order(&self) -> Vec<&Address> {
        self.steps.iter().rev().map(|step| &step.address).collect()
    }

    /// Addresses grouped by wave, in apply order within each wave
    pub fn waves(&self) -> Vec<Vec<&Address>> {
        let mut waves: BTreeMap<usize, Vec<&Address>> = BTreeMap::new();
        for step in &self.steps {
            waves.entry(step.wave).or_default().push(&step.address);
        }
        waves.into_values().collect()
    }

    /// Check the ordering facts of a plan read from outside
    ///
    /// Positions count up from zero, every dependency is an earlier step
    /// and every wave is one past the latest wave it depends on.
    pub fn verify(&self) -> PlannerResult<()> {
        let mut waves: HashMap<&Address, usize> = HashMap::with_capacity(self.steps.len());

        for (position, step) in self.steps.iter().enumerate() {
            let invalid = |message: String| {
                PlannerError::Parse(format!("plan step {} ({}): {}", position, step.address, message))
            };

            if step.position != position {
                return Err(invalid(format!("recorded at position {}", step.position)));
            }

            let mut expected = 0;
            for dependency in &step.dependencies {
                let wave = waves.get(&dependency.address).ok_or_else(|| {
                    invalid(format!("depends on {}, which is not an earlier step", dependency.address))
                })?;
                expected = expected.max(wave + 1);
            }
            if step.wave != expected {
                return Err(invalid(format!("wave {} should be {}", step.wave, expected)));
            }

            if waves.insert(&step.address, step.wave).is_some() {
                return Err(invalid("address appears twice".to_string()));
            }
        }
        Ok(())
    }

    /// Outputs the operator receives once the topology is live
    pub fn outputs(&self) -> impl Iterator<Item = &OutputSpec> {
        self.steps.iter().filter_map(|step| match &step.entity {
            PlannedEntity::Output(output) => Some(output),
            PlannedEntity::Resource(_) => None,
        })
    }

    /// Human-readable listing, one step per line
    pub fn summary(&self, destroy: bool) -> String {
        let mut out = String::new();
        let verb = if destroy { "destroy" } else { "apply" };
        let _ = writeln!(out, "{} plan: {} step(s)", verb, self.len());

        let steps: Box<dyn Iterator<Item = &PlanStep>> = if destroy {
            Box::new(self.steps.iter().rev())
        } else {
            Box::new(self.steps.iter())
        };
        for (i, step) in steps.enumerate() {
            let _ = writeln!(
                out,
                "{:>3}. [wave {}] {:<15} {}",
                i + 1,
                step.wave,
                step.layer.as_str(),
                step.address
            );
        }

        let outputs: Vec<_> = self.outputs().collect();
        if !outputs.is_empty() && !destroy {
            let _ = writeln!(out, "outputs:");
            for output in outputs {
                let value = if output.sensitive {
                    "(sensitive)".to_string()
                } else {
                    output.value.to_string()
                };
                let _ = writeln!(out, "  {} = {}", output.name, value);
            }
        }
        out
    }
}

/// Plan a snapshot
///
/// Unresolved references, invariant violations and dependency cycles are
/// all collected into one report.
pub fn plan(snapshot: &Snapshot) -> Result<ApplyPlan, ValidationReport> {
    let mut report = ValidationReport::default();

    let topology = match TopologyGraph::build(snapshot) {
        Ok(topology) => Some(topology),
        Err(unresolved) => {
            report.extend(unresolved.errors().iter().cloned());
            None
        }
    };

    report.extend(validate(snapshot).errors().iter().cloned());

    let Some(topology) = topology else {
        warn!("Snapshot rejected: {} error(s)", report.len());
        return Err(report);
    };

    let order = match graph::apply_order(&topology) {
        Ok(order) => order,
        Err(cycles) => {
            report.extend(cycles);
            warn!("Snapshot rejected: {} error(s)", report.len());
            return Err(report);
        }
    };

    if !report.is_empty() {
        warn!("Snapshot rejected: {} error(s)", report.len());
        return Err(report);
    }

    let waves = graph::waves(&topology, &order);
    let steps = order
        .iter()
        .zip(waves)
        .enumerate()
        .map(|(position, (&index, wave))| {
            let node = topology.node(index);
            PlanStep {
                position,
                address: node.address.clone(),
                layer: node.layer(),
                wave,
                dependencies: topology
                    .dependencies(&node.address)
                    .into_iter()
                    .map(|(address, dependency)| StepDependency {
                        address: address.clone(),
                        kind: dependency.kind,
                        attribute: dependency.attribute.clone(),
                    })
                    .collect(),
                entity: match node.entity {
                    Entity::Resource(declaration) => PlannedEntity::Resource(declaration.clone()),
                    Entity::Output(output) => PlannedEntity::Output(output.clone()),
                },
            }
        })
        .collect();

    let plan = ApplyPlan { steps };
    info!(
        "Planned {} step(s) in {} wave(s)",
        plan.len(),
        plan.waves().len()
    );
    Ok(plan)
}

/// Plan handed to the external apply engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub plan_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Whether the engine should tear the topology down
    pub destroy: bool,
    /// Addresses in the order the engine must process them
    pub order: Vec<Address>,
    pub plan: ApplyPlan,
}

impl PlanDocument {
    pub fn new(plan: ApplyPlan, destroy: bool) -> Self {
        Self::with_identity(plan, destroy, Uuid::now_v7(), Utc::now())
    }

    /// Build with a fixed id and timestamp
    pub fn with_identity(
        plan: ApplyPlan,
        destroy: bool,
        plan_id: Uuid,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let order = if destroy {
            plan.destroy_order().into_iter().cloned().collect()
        } else {
            plan.apply_order().into_iter().cloned().collect()
        };
        Self {
            plan_id,
            generated_at,
            destroy,
            order,
            plan,
        }
    }

    pub fn to_json(&self) -> PlannerResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PlannerError::Serialization(e.to_string()))
    }

    /// Read a plan document, rejecting plans whose ordering is inconsistent
    pub fn from_json(json: &str) -> PlannerResult<Self> {
        let document: Self = serde_json::from_str(json)?;
        document.plan.verify()?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttributeRef, ClusterSpec, LogGroupSpec, Resource};
    use crate::errors::{TopologyError, UnresolvedReason};
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn log_group(name: &str) -> Declaration {
        Declaration::new(
            name,
            Resource::LogGroup(LogGroupSpec {
                log_group_name: name.to_string(),
                retention_days: Some(14),
            }),
        )
        .unwrap()
    }

    fn cluster(name: &str) -> Declaration {
        Declaration::new(
            name,
            Resource::Cluster(ClusterSpec {
                cluster_name: name.to_string(),
                container_insights: true,
            }),
        )
        .unwrap()
    }

    fn small_snapshot() -> Snapshot {
        Snapshot::new()
            .with_resource(cluster("main").depends_on(addr("log_group.app")))
            .with_resource(log_group("app"))
            .with_output(
                OutputSpec::new("cluster_arn", AttributeRef::new(addr("cluster.main"), "arn"))
                    .unwrap(),
            )
    }

    #[test]
    fn test_plan_orders_and_reverses() {
        let plan = plan(&small_snapshot()).unwrap();

        let apply: Vec<String> = plan.apply_order().iter().map(|a| a.to_string()).collect();
        assert_eq!(apply, vec!["log_group.app", "cluster.main", "output.cluster_arn"]);

        let destroy: Vec<String> = plan.destroy_order().iter().map(|a| a.to_string()).collect();
        assert_eq!(destroy, vec!["output.cluster_arn", "cluster.main", "log_group.app"]);

        assert_eq!(plan.waves().len(), 3);
        assert_eq!(plan.outputs().count(), 1);
        assert_eq!(plan.position(&addr("cluster.main")), Some(1));

        let step = plan.step(&addr("cluster.main")).unwrap();
        assert_eq!(step.layer, Layer::Compute);
        assert_eq!(step.dependencies[0].kind, EdgeKind::Ordering);
    }

    #[test]
    fn test_plan_collects_all_failures() {
        let snapshot = Snapshot::new()
            .with_resource(cluster("main").depends_on(addr("log_group.missing")))
            .with_resource(log_group("app"))
            .with_resource(log_group("app"));

        let report = plan(&snapshot).unwrap_err();
        assert_eq!(report.len(), 2, "{}", report.render());
        assert!(matches!(
            &report.errors()[0],
            TopologyError::UnresolvedReference {
                reason: UnresolvedReason::Missing,
                ..
            }
        ));
        assert_eq!(report.violations().count(), 1);
    }

    #[test]
    fn test_cycle_yields_no_plan() {
        let snapshot = Snapshot::new()
            .with_resource(log_group("a").depends_on(addr("log_group.b")))
            .with_resource(log_group("b").depends_on(addr("log_group.a")));

        let report = plan(&snapshot).unwrap_err();
        assert_eq!(report.cycles().count(), 1);
    }

    #[test]
    fn test_document_round_trip() {
        let plan = plan(&small_snapshot()).unwrap();
        let id = Uuid::now_v7();
        let at = Utc::now();
        let document = PlanDocument::with_identity(plan, true, id, at);

        assert_eq!(document.order.first(), Some(&addr("output.cluster_arn")));

        let json = document.to_json().unwrap();
        let parsed = PlanDocument::from_json(&json).unwrap();
        assert_eq!(parsed.plan_id, id);
        assert_eq!(parsed.plan, document.plan);
    }

    #[test]
    fn test_inconsistent_document_is_rejected() {
        let plan = plan(&small_snapshot()).unwrap();
        let document = PlanDocument::new(plan, false);

        let mut tampered = document.clone();
        tampered.plan.steps[0].wave = usize::MAX;
        let json = tampered.to_json().unwrap();
        assert!(matches!(
            PlanDocument::from_json(&json),
            Err(PlannerError::Parse(message)) if message.contains("log_group.app")
        ));

        let mut reordered = document;
        reordered.plan.steps.swap(0, 1);
        let json = reordered.to_json().unwrap();
        assert!(PlanDocument::from_json(&json).is_err());

        let gapped = ApplyPlan {
            steps: vec![PlanStep {
                wave: 7,
                ..plan_step(&small_snapshot())
            }],
        };
        assert_eq!(gapped.waves().len(), 1);
    }

    fn plan_step(snapshot: &Snapshot) -> PlanStep {
        plan(snapshot).unwrap().steps[0].clone()
    }

    #[test]
    fn test_summary_lists_steps() {
        let plan = plan(&small_snapshot()).unwrap();
        let summary = plan.summary(false);
        assert!(summary.starts_with("apply plan: 3 step(s)"));
        assert!(summary.contains("cluster_arn = cluster.main.arn"));
        assert!(plan.summary(true).starts_with("destroy plan"));
    }
}
