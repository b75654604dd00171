// Copyright (c) 2025 - Cowboy AI, Inc.
//! Apply Order
//!
//! Deterministic topological sort of a [`TopologyGraph`]. Among entities
//! that are ready at the same time, the lower layer goes first, then the
//! lower address, so identical snapshots always produce identical plans.

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, warn};

use super::TopologyGraph;
use crate::domain::Address;
use crate::errors::TopologyError;

/// Every dependency cycle, members sorted by address
///
/// Strongly connected components with more than one entity, plus
/// entities that depend on themselves.
pub fn cycles(topology: &TopologyGraph<'_>) -> Vec<Vec<Address>> {
    let graph = topology.inner();

    let mut found: Vec<Vec<Address>> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| graph.find_edge(n, n).is_some())
        })
        .map(|component| {
            let mut members: Vec<Address> = component
                .into_iter()
                .map(|n| graph[n].address.clone())
                .collect();
            members.sort();
            members
        })
        .collect();

    found.sort();
    found
}

/// Topologically sorted node indices, dependencies first
///
/// Fails with one [`TopologyError::Cycle`] per cycle when the graph is
/// not acyclic; no partial order is returned.
pub fn apply_order(topology: &TopologyGraph<'_>) -> Result<Vec<NodeIndex>, Vec<TopologyError>> {
    let graph = topology.inner();

    // Outstanding dependency edges per node (parallel edges count separately)
    let mut pending: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.edges(n).count())
        .collect();

    let key = |n: NodeIndex| {
        let address = &graph[n].address;
        Reverse((address.layer().rank(), address.clone(), n))
    };

    let mut ready: BinaryHeap<_> = graph
        .node_indices()
        .filter(|n| pending[n.index()] == 0)
        .map(key)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse((_, _, node))) = ready.pop() {
        order.push(node);
        for edge in graph.edges_directed(node, Direction::Incoming) {
            let dependent = edge.source();
            pending[dependent.index()] -= 1;
            if pending[dependent.index()] == 0 {
                ready.push(key(dependent));
            }
        }
    }

    if order.len() < graph.node_count() {
        let errors: Vec<TopologyError> = cycles(topology)
            .into_iter()
            .map(|members| TopologyError::Cycle { members })
            .collect();
        warn!(
            "{} of {} entities are blocked by {} cycle(s)",
            graph.node_count() - order.len(),
            graph.node_count(),
            errors.len()
        );
        return Err(errors);
    }

    debug!("Apply order resolved for {} entities", order.len());
    Ok(order)
}

/// Wave of each node in `order`, indexed like `order`
///
/// A node with no dependencies is in wave 0; any other node is one wave
/// after its latest dependency. Nodes sharing a wave are independent.
pub fn waves(topology: &TopologyGraph<'_>, order: &[NodeIndex]) -> Vec<usize> {
    let graph = topology.inner();
    let mut wave_of = vec![0usize; graph.node_count()];

    for &node in order {
        wave_of[node.index()] = graph
            .edges(node)
            .map(|edge| wave_of[edge.target().index()] + 1)
            .max()
            .unwrap_or(0);
    }

    order.iter().map(|n| wave_of[n.index()]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClusterSpec, Declaration, LogGroupSpec, Resource, Snapshot};
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn log_group(name: &str) -> Declaration {
        Declaration::new(
            name,
            Resource::LogGroup(LogGroupSpec {
                log_group_name: name.to_string(),
                retention_days: None,
            }),
        )
        .unwrap()
    }

    fn cluster(name: &str) -> Declaration {
        Declaration::new(
            name,
            Resource::Cluster(ClusterSpec {
                cluster_name: name.to_string(),
                container_insights: false,
            }),
        )
        .unwrap()
    }

    fn ordered(topology: &TopologyGraph<'_>) -> Vec<String> {
        apply_order(topology)
            .unwrap()
            .into_iter()
            .map(|n| topology.node(n).address.to_string())
            .collect()
    }

    #[test]
    fn test_ties_break_by_layer_then_address() {
        let snapshot = Snapshot::new()
            .with_resource(cluster("b"))
            .with_resource(cluster("a"))
            .with_resource(log_group("z"));

        let topology = TopologyGraph::build(&snapshot).unwrap();
        assert_eq!(
            ordered(&topology),
            vec!["log_group.z", "cluster.a", "cluster.b"]
        );
    }

    #[test]
    fn test_dependencies_first_and_waves() {
        let snapshot = Snapshot::new()
            .with_resource(cluster("main").depends_on(addr("log_group.b")))
            .with_resource(log_group("b").depends_on(addr("log_group.a")))
            .with_resource(log_group("a"))
            .with_resource(log_group("c"));

        let topology = TopologyGraph::build(&snapshot).unwrap();
        let order = apply_order(&topology).unwrap();
        let names: Vec<_> = order
            .iter()
            .map(|&n| topology.node(n).address.to_string())
            .collect();

        assert_eq!(
            names,
            vec!["log_group.a", "log_group.b", "log_group.c", "cluster.main"]
        );
        assert_eq!(waves(&topology, &order), vec![0, 1, 0, 2]);
    }

    #[test]
    fn test_cycle_reports_members() {
        let snapshot = Snapshot::new()
            .with_resource(log_group("a").depends_on(addr("log_group.b")))
            .with_resource(log_group("b").depends_on(addr("log_group.a")))
            .with_resource(cluster("self").depends_on(addr("cluster.self")))
            .with_resource(log_group("free"));

        let topology = TopologyGraph::build(&snapshot).unwrap();
        let errors = apply_order(&topology).unwrap_err();

        assert_eq!(
            errors,
            vec![
                TopologyError::Cycle {
                    members: vec![addr("log_group.a"), addr("log_group.b")]
                },
                TopologyError::Cycle {
                    members: vec![addr("cluster.self")]
                },
            ]
        );
    }

    #[test]
    fn test_acyclic_has_no_cycles() {
        let snapshot = Snapshot::new()
            .with_resource(log_group("a"))
            .with_resource(cluster("main").depends_on(addr("log_group.a")));
        let topology = TopologyGraph::build(&snapshot).unwrap();
        assert!(cycles(&topology).is_empty());
    }
}
