//! Error types for topology planning

use std::fmt;
use thiserror::Error;

use crate::domain::{Address, AddressError, EntityKind, Invariant, NetworkError};

/// Why a reference could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnresolvedReason {
    /// No declaration carries the address
    #[error("no such entity")]
    Missing,

    /// The attribute accepts a different kind of entity
    #[error("expected a {expected}")]
    KindMismatch { expected: EntityKind },

    /// The entity exists but does not expose the attribute
    #[error("{kind} does not expose attribute `{attribute}`")]
    UnknownAttribute { kind: EntityKind, attribute: String },

    /// Ordering overrides and outputs may only target provisioned resources
    #[error("outputs cannot be depended upon")]
    NotAResource,
}

/// Failures surfaced by the graph builder and the validation pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// An attribute names an entity that does not resolve
    #[error("unresolved reference {referrer} `{attribute}` -> {target}: {reason}")]
    UnresolvedReference {
        referrer: Address,
        attribute: String,
        target: Address,
        reason: UnresolvedReason,
    },

    /// The dependency graph is not acyclic
    #[error("dependency cycle between {}", CycleMembers(.members))]
    Cycle { members: Vec<Address> },

    /// A structural rule of the topology is broken
    #[error("{entity}: {invariant}")]
    InvariantViolation { entity: Address, invariant: Invariant },
}

impl TopologyError {
    pub fn violation(entity: Address, invariant: Invariant) -> Self {
        Self::InvariantViolation { entity, invariant }
    }

    /// The entity the failure is reported against
    pub fn entity(&self) -> Option<&Address> {
        match self {
            Self::UnresolvedReference { referrer, .. } => Some(referrer),
            Self::InvariantViolation { entity, .. } => Some(entity),
            Self::Cycle { .. } => None,
        }
    }
}

struct CycleMembers<'a>(&'a [Address]);

impl fmt::Display for CycleMembers<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, member) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", member)?;
        }
        Ok(())
    }
}

/// Complete list of failures for one snapshot
///
/// Either a plan is produced or every failure found is listed here;
/// there is no partial plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("topology rejected with {} error(s)", .errors.len())]
pub struct ValidationReport {
    errors: Vec<TopologyError>,
}

impl ValidationReport {
    pub fn new(errors: Vec<TopologyError>) -> Self {
        Self { errors }
    }

    pub fn push(&mut self, error: TopologyError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = TopologyError>) {
        self.errors.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[TopologyError] {
        &self.errors
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &TopologyError> {
        self.errors
            .iter()
            .filter(|e| matches!(e, TopologyError::UnresolvedReference { .. }))
    }

    pub fn cycles(&self) -> impl Iterator<Item = &[Address]> {
        self.errors.iter().filter_map(|e| match e {
            TopologyError::Cycle { members } => Some(members.as_slice()),
            _ => None,
        })
    }

    pub fn violations(&self) -> impl Iterator<Item = (&Address, &Invariant)> {
        self.errors.iter().filter_map(|e| match e {
            TopologyError::InvariantViolation { entity, invariant } => Some((entity, invariant)),
            _ => None,
        })
    }

    /// `Ok(value)` when nothing was reported
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// One line per failure, for operators
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self);
        for error in &self.errors {
            out.push_str("  - ");
            out.push_str(&error.to_string());
            out.push('\n');
        }
        out
    }
}

/// Errors at the planner's I/O boundary
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Snapshot file could not be read
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// Snapshot document is malformed
    #[error("Failed to parse snapshot: {0}")]
    Parse(String),

    /// Plan could not be written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Snapshot was rejected by the graph builder or validation pass
    #[error(transparent)]
    Rejected(#[from] ValidationReport),
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for PlannerError {
    fn from(err: serde_yaml::Error) -> Self {
        PlannerError::Parse(err.to_string())
    }
}

impl From<AddressError> for PlannerError {
    fn from(err: AddressError) -> Self {
        PlannerError::Configuration(err.to_string())
    }
}

impl From<NetworkError> for PlannerError {
    fn from(err: NetworkError) -> Self {
        PlannerError::Configuration(err.to_string())
    }
}
