// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment topology planning for the Composable Information Machine
//!
//! This crate models a containerized web service's cloud topology as
//! typed declarations, resolves their references into a dependency
//! graph, validates structural invariants and produces a deterministic
//! apply plan for an external provisioning engine.
//!
//! # Pipeline
//!
//! ```text
//! Snapshot (JSON/YAML) → TopologyGraph → validation → ApplyPlan → PlanDocument
//! ```
//!
//! Planning is pure and single-pass: a snapshot either yields a complete
//! plan or a [`ValidationReport`] listing every failure.

pub mod blueprint;
pub mod config;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod plan;
pub mod validation;

// Re-export commonly used types
pub use blueprint::WebServiceBlueprint;
pub use config::{ConfigOverrides, OutputFormat, PlannerConfig, SnapshotSource};
pub use domain::{Address, Declaration, EntityKind, Invariant, Layer, Resource, Snapshot};
pub use errors::{PlannerError, PlannerResult, TopologyError, UnresolvedReason, ValidationReport};
pub use graph::{Dependency, EdgeKind, TopologyGraph};
pub use plan::{plan, ApplyPlan, PlanDocument, PlanStep};
pub use validation::validate;
