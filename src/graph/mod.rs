// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Graph
//!
//! Directed graph over a snapshot: one node per declared entity, an edge
//! `A → B` whenever `A` must exist after `B`. Nodes live in a petgraph
//! arena addressed by [`NodeIndex`]; an address index provides lookup.
//!
//! # Edge Kinds
//!
//! - [`EdgeKind::Reference`]: `A` names `B` in one of its attributes
//! - [`EdgeKind::Ordering`]: `A` lists `B` in `depends_on`
//!
//! Ordering edges are purely additive. A `depends_on` entry next to an
//! attribute reference yields two parallel edges, never a replacement.

pub mod order;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::domain::{Address, Catalog, Declaration, EntityKind, Layer, OutputSpec, Snapshot};
use crate::errors::{TopologyError, UnresolvedReason, ValidationReport};

pub use order::{apply_order, cycles, waves};

/// Why one entity must follow another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Implied by an attribute reference
    Reference,
    /// Declared with `depends_on`
    Ordering,
}

/// Edge weight
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub kind: EdgeKind,
    /// Attribute path of the reference (`depends_on[i]` for overrides)
    pub attribute: String,
}

impl Dependency {
    pub fn reference(attribute: impl Into<String>) -> Self {
        Self {
            kind: EdgeKind::Reference,
            attribute: attribute.into(),
        }
    }

    pub fn ordering(index: usize) -> Self {
        Self {
            kind: EdgeKind::Ordering,
            attribute: format!("depends_on[{}]", index),
        }
    }
}

/// Declared entity behind a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity<'a> {
    Resource(&'a Declaration),
    Output(&'a OutputSpec),
}

#[derive(Debug, Clone)]
pub struct TopologyNode<'a> {
    pub address: Address,
    pub entity: Entity<'a>,
}

impl TopologyNode<'_> {
    pub fn layer(&self) -> Layer {
        self.address.layer()
    }
}

/// Dependency graph of one snapshot
#[derive(Debug, Clone)]
pub struct TopologyGraph<'a> {
    graph: DiGraph<TopologyNode<'a>, Dependency>,
    index: HashMap<Address, NodeIndex>,
}

impl<'a> TopologyGraph<'a> {
    /// Build the graph, resolving every reference
    ///
    /// All resolution failures are collected; the graph is returned only
    /// when every reference resolved. Duplicate addresses keep their
    /// first declaration here and are reported by the validation pass.
    pub fn build(snapshot: &'a Snapshot) -> Result<Self, ValidationReport> {
        let catalog = snapshot.catalog();
        let mut topology = Self {
            graph: DiGraph::with_capacity(snapshot.len(), snapshot.len() * 2),
            index: HashMap::with_capacity(snapshot.len()),
        };

        for (address, declaration) in catalog.declarations() {
            topology.add_node(address.clone(), Entity::Resource(declaration));
        }
        for (address, output) in catalog.outputs() {
            topology.add_node(address.clone(), Entity::Output(output));
        }

        let mut report = ValidationReport::default();

        for (referrer, declaration) in catalog.declarations() {
            for reference in declaration.resource.references() {
                match resolve_reference(&catalog, reference.target, reference.expected) {
                    Ok(()) => topology.add_edge(
                        referrer,
                        reference.target,
                        Dependency::reference(reference.attribute),
                    ),
                    Err(reason) => report.push(TopologyError::UnresolvedReference {
                        referrer: referrer.clone(),
                        attribute: reference.attribute,
                        target: reference.target.clone(),
                        reason,
                    }),
                }
            }

            for (i, target) in declaration.depends_on.iter().enumerate() {
                let dependency = Dependency::ordering(i);
                match resolve_ordering(&catalog, target) {
                    Ok(()) => topology.add_edge(referrer, target, dependency),
                    Err(reason) => report.push(TopologyError::UnresolvedReference {
                        referrer: referrer.clone(),
                        attribute: dependency.attribute,
                        target: target.clone(),
                        reason,
                    }),
                }
            }
        }

        for (referrer, output) in catalog.outputs() {
            let target = &output.value.resource;
            match resolve_output(&catalog, target, &output.value.attribute) {
                Ok(()) => topology.add_edge(referrer, target, Dependency::reference("value")),
                Err(reason) => report.push(TopologyError::UnresolvedReference {
                    referrer: referrer.clone(),
                    attribute: "value".to_string(),
                    target: target.clone(),
                    reason,
                }),
            }
        }

        if !report.is_empty() {
            warn!("{} unresolved reference(s)", report.len());
        }
        debug!(
            "Built topology graph: {} nodes, {} edges",
            topology.node_count(),
            topology.edge_count()
        );

        report.into_result(topology)
    }

    fn add_node(&mut self, address: Address, entity: Entity<'a>) {
        let node = self.graph.add_node(TopologyNode {
            address: address.clone(),
            entity,
        });
        self.index.insert(address, node);
    }

    fn add_edge(&mut self, from: &Address, to: &Address, dependency: Dependency) {
        if let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) {
            self.graph.add_edge(a, b, dependency);
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, address: &Address) -> Option<NodeIndex> {
        self.index.get(address).copied()
    }

    pub fn node(&self, index: NodeIndex) -> &TopologyNode<'a> {
        &self.graph[index]
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.index.contains_key(address)
    }

    /// Underlying petgraph graph
    pub fn inner(&self) -> &DiGraph<TopologyNode<'a>, Dependency> {
        &self.graph
    }

    /// Direct dependencies of `address`, one entry per edge
    pub fn dependencies(&self, address: &Address) -> Vec<(&Address, &Dependency)> {
        let Some(node) = self.index_of(address) else {
            return Vec::new();
        };
        let mut deps: Vec<_> = self
            .graph
            .edges(node)
            .map(|edge| (&self.graph[edge.target()].address, edge.weight()))
            .collect();
        deps.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.attribute.cmp(&b.1.attribute)));
        deps
    }

    /// Entities that depend directly on `address`
    pub fn dependents(&self, address: &Address) -> Vec<&Address> {
        let Some(node) = self.index_of(address) else {
            return Vec::new();
        };
        let mut dependents: Vec<_> = self
            .graph
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .map(|n| &self.graph[n].address)
            .collect();
        dependents.sort();
        dependents.dedup();
        dependents
    }
}

fn resolve_reference(
    catalog: &Catalog<'_>,
    target: &Address,
    expected: EntityKind,
) -> Result<(), UnresolvedReason> {
    if target.kind() != expected {
        return Err(UnresolvedReason::KindMismatch { expected });
    }
    if catalog.get(target).is_none() {
        return Err(UnresolvedReason::Missing);
    }
    Ok(())
}

fn resolve_ordering(catalog: &Catalog<'_>, target: &Address) -> Result<(), UnresolvedReason> {
    if !target.kind().is_resource() {
        return Err(UnresolvedReason::NotAResource);
    }
    if catalog.get(target).is_none() {
        return Err(UnresolvedReason::Missing);
    }
    Ok(())
}

fn resolve_output(
    catalog: &Catalog<'_>,
    target: &Address,
    attribute: &str,
) -> Result<(), UnresolvedReason> {
    resolve_ordering(catalog, target)?;
    let kind = target.kind();
    if !kind.exposes(attribute) {
        return Err(UnresolvedReason::UnknownAttribute {
            kind,
            attribute: attribute.to_string(),
        });
    }
    Ok(())
}
