// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Apply Ordering
//!
//! Random acyclic dependency sets must always plan, with every
//! dependency placed before its dependent; closing any path into a loop
//! must always be reported as a cycle.

use cim_topology::domain::{Address, Declaration, EntityKind, LogGroupSpec, Resource, Snapshot};
use cim_topology::plan;
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn name(i: usize) -> String {
    format!("lg{:02}", i)
}

fn address(i: usize) -> Address {
    Address::new(EntityKind::LogGroup, name(i)).unwrap()
}

/// Snapshot of `n` log groups where `(a, b)` with `a > b` means `a` depends on `b`
fn snapshot(n: usize, edges: &[(usize, usize)]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for i in 0..n {
        let mut declaration = Declaration::new(
            &name(i),
            Resource::LogGroup(LogGroupSpec {
                log_group_name: format!("/ecs/{}", name(i)),
                retention_days: None,
            }),
        )
        .unwrap();
        for &(from, to) in edges {
            if from == i {
                declaration = declaration.depends_on(address(to));
            }
        }
        snapshot.resources.push(declaration);
    }
    snapshot
}

/// Node count plus forward-only edges
fn acyclic() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..16).prop_flat_map(|n| {
        let edges = prop::collection::vec((1..n, 0..n), 0..32).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(a, b)| (a, b % a))
                .collect::<Vec<_>>()
        });
        (Just(n), edges)
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Every dependency precedes its dependent
    #[test]
    fn prop_dependencies_precede((n, edges) in acyclic()) {
        let plan = plan(&snapshot(n, &edges)).unwrap();
        prop_assert_eq!(plan.len(), n);

        for &(from, to) in &edges {
            let before = plan.position(&address(to)).unwrap();
            let after = plan.position(&address(from)).unwrap();
            prop_assert!(before < after);
        }
    }

    /// Destroy order is the exact reverse of apply order
    #[test]
    fn prop_destroy_reverses_apply((n, edges) in acyclic()) {
        let plan = plan(&snapshot(n, &edges)).unwrap();
        let mut apply = plan.apply_order();
        apply.reverse();
        prop_assert_eq!(apply, plan.destroy_order());
    }

    /// A step's wave is one past its latest dependency
    #[test]
    fn prop_waves_are_longest_paths((n, edges) in acyclic()) {
        let plan = plan(&snapshot(n, &edges)).unwrap();

        for step in plan.steps() {
            let expected = step
                .dependencies
                .iter()
                .map(|dep| plan.step(&dep.address).unwrap().wave + 1)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(step.wave, expected);
        }
    }

    /// Declaration order never changes the plan
    #[test]
    fn prop_order_is_deterministic((n, edges) in acyclic()) {
        let forward = snapshot(n, &edges);
        let mut backward = forward.clone();
        backward.resources.reverse();

        let a = plan(&forward).unwrap();
        let b = plan(&backward).unwrap();
        prop_assert_eq!(a.apply_order(), b.apply_order());
    }

    /// Closing a dependency path into a loop is reported, with no plan
    #[test]
    fn prop_back_edge_is_a_cycle((n, mut edges) in acyclic(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!edges.is_empty());
        let (from, to) = edges[pick.index(edges.len())];
        edges.push((to, from));

        let report = plan(&snapshot(n, &edges)).unwrap_err();
        let cycle = report
            .cycles()
            .find(|members| members.contains(&address(from)));

        prop_assert!(cycle.is_some());
        prop_assert!(cycle.unwrap().contains(&address(to)));
    }
}
