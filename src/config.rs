// Copyright (c) 2025 - Cowboy AI, Inc.
//! Planner configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

use crate::blueprint::WebServiceBlueprint;
use crate::domain::{Snapshot, SnapshotFormat};
use crate::errors::{PlannerError, PlannerResult};

/// Environment variable prefix shared by every planner setting
pub const ENV_PREFIX: &str = "TOPOLOGY_";

/// How a plan is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per step
    #[default]
    Summary,
    /// Plan document for the apply engine
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary => write!(f, "summary"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "json" => Ok(Self::Json),
            other => Err(PlannerError::Configuration(format!(
                "unknown output format: {}",
                other
            ))),
        }
    }
}

/// Where the snapshot comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// JSON or YAML document on disk
    File {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<SnapshotFormat>,
    },
    /// Reference web-service topology
    Blueprint(WebServiceBlueprint),
}

impl SnapshotSource {
    pub fn load(&self) -> PlannerResult<Snapshot> {
        match self {
            Self::File { path, format } => Snapshot::from_path(path, *format),
            Self::Blueprint(blueprint) => blueprint.build(),
        }
    }
}

/// Settings given explicitly by the operator, layered over a [`PlannerConfig`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub snapshot: Option<PathBuf>,
    pub format: Option<SnapshotFormat>,
    pub blueprint: Option<String>,
    pub image: Option<String>,
    pub desired_count: Option<u32>,
    pub output: Option<OutputFormat>,
    pub destroy: bool,
}

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub source: SnapshotSource,

    /// Rendering of the plan on stdout
    #[serde(default)]
    pub output: OutputFormat,

    /// Emit the destroy order instead of the apply order
    #[serde(default)]
    pub destroy: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            source: SnapshotSource::Blueprint(WebServiceBlueprint::default()),
            output: OutputFormat::Summary,
            destroy: false,
        }
    }
}

impl PlannerConfig {
    pub fn new(source: SnapshotSource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    pub fn with_snapshot(mut self, path: impl Into<PathBuf>, format: Option<SnapshotFormat>) -> Self {
        self.source = SnapshotSource::File {
            path: path.into(),
            format,
        };
        self
    }

    pub fn with_blueprint(mut self, blueprint: WebServiceBlueprint) -> Self {
        self.source = SnapshotSource::Blueprint(blueprint);
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn with_destroy(mut self, destroy: bool) -> Self {
        self.destroy = destroy;
        self
    }

    /// Load configuration from `TOPOLOGY_*` environment variables
    ///
    /// - `TOPOLOGY_SNAPSHOT`: snapshot path (wins over the blueprint)
    /// - `TOPOLOGY_FORMAT`: `json` or `yaml`
    /// - `TOPOLOGY_BLUEPRINT`: blueprint name prefix
    /// - `TOPOLOGY_IMAGE`: blueprint container image
    /// - `TOPOLOGY_DESIRED_COUNT`: blueprint task count
    /// - `TOPOLOGY_OUTPUT`: `summary` or `json`
    /// - `TOPOLOGY_DESTROY`: `true` / `1`
    pub fn from_env() -> PlannerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PlannerResult<Self> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        let overrides = ConfigOverrides {
            snapshot: var("SNAPSHOT").map(PathBuf::from),
            format: var("FORMAT").map(|f| f.parse::<SnapshotFormat>()).transpose()?,
            blueprint: var("BLUEPRINT"),
            image: var("IMAGE"),
            desired_count: var("DESIRED_COUNT")
                .map(|count| {
                    count.parse::<u32>().map_err(|e| {
                        PlannerError::Configuration(format!(
                            "{}DESIRED_COUNT `{}`: {}",
                            ENV_PREFIX, count, e
                        ))
                    })
                })
                .transpose()?,
            output: var("OUTPUT").map(|o| o.parse::<OutputFormat>()).transpose()?,
            destroy: var("DESTROY").map(|d| parse_flag(&d)).transpose()?.unwrap_or(false),
        };

        let mut config = Self::default();
        config.override_config(&overrides);
        debug!("Planner configuration: {:?}", config);
        Ok(config)
    }

    /// Apply the values an operator set explicitly
    ///
    /// A snapshot path or blueprint prefix replaces the current source,
    /// with the snapshot path winning when both are set. Blueprint knobs
    /// only touch a blueprint source. `destroy` can only be switched on.
    pub fn override_config(&mut self, overrides: &ConfigOverrides) {
        if let Some(path) = &overrides.snapshot {
            let format = match &self.source {
                SnapshotSource::File { format, .. } => overrides.format.or(*format),
                SnapshotSource::Blueprint(_) => overrides.format,
            };
            self.source = SnapshotSource::File {
                path: path.clone(),
                format,
            };
        } else if let Some(prefix) = &overrides.blueprint {
            self.source = SnapshotSource::Blueprint(WebServiceBlueprint::new(prefix.as_str()));
        } else if let (SnapshotSource::File { format, .. }, Some(explicit)) =
            (&mut self.source, overrides.format)
        {
            *format = Some(explicit);
        }

        match &mut self.source {
            SnapshotSource::Blueprint(blueprint) => {
                if let Some(image) = &overrides.image {
                    blueprint.image = image.clone();
                }
                if let Some(count) = overrides.desired_count {
                    blueprint.desired_count = count;
                }
            }
            SnapshotSource::File { path, .. } => {
                if overrides.image.is_some() || overrides.desired_count.is_some() {
                    debug!("Ignoring blueprint settings, planning {}", path.display());
                }
            }
        }

        if let Some(output) = overrides.output {
            self.output = output;
        }
        if overrides.destroy {
            self.destroy = true;
        }
    }

    pub fn load_snapshot(&self) -> PlannerResult<Snapshot> {
        self.source.load()
    }
}

fn parse_flag(value: &str) -> PlannerResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(PlannerError::Configuration(format!(
            "expected a boolean, found `{}`",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PlannerConfig::default());
    }

    #[test]
    fn test_snapshot_wins_over_blueprint() {
        let config = PlannerConfig::from_lookup(lookup(&[
            ("TOPOLOGY_SNAPSHOT", "stack.json"),
            ("TOPOLOGY_BLUEPRINT", "api"),
            ("TOPOLOGY_FORMAT", "yaml"),
            ("TOPOLOGY_OUTPUT", "JSON"),
            ("TOPOLOGY_DESTROY", "1"),
        ]))
        .unwrap();

        assert_eq!(
            config.source,
            SnapshotSource::File {
                path: PathBuf::from("stack.json"),
                format: Some(SnapshotFormat::Yaml),
            }
        );
        assert_eq!(config.output, OutputFormat::Json);
        assert!(config.destroy);
    }

    #[test]
    fn test_blueprint_prefix() {
        let config = PlannerConfig::from_lookup(lookup(&[("TOPOLOGY_BLUEPRINT", "api")])).unwrap();
        let snapshot = config.load_snapshot().unwrap();
        assert!(!snapshot.is_empty());
        match config.source {
            SnapshotSource::Blueprint(blueprint) => assert_eq!(blueprint.prefix, "api"),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_blueprint_knobs_from_env() {
        let config = PlannerConfig::from_lookup(lookup(&[
            ("TOPOLOGY_IMAGE", "registry.local/app:2"),
            ("TOPOLOGY_DESIRED_COUNT", "4"),
        ]))
        .unwrap();

        match config.source {
            SnapshotSource::Blueprint(blueprint) => {
                assert_eq!(blueprint.image, "registry.local/app:2");
                assert_eq!(blueprint.desired_count, 4);
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_explicit_settings_override_env() {
        let mut config = PlannerConfig::from_lookup(lookup(&[
            ("TOPOLOGY_SNAPSHOT", "stack.json"),
            ("TOPOLOGY_FORMAT", "yaml"),
            ("TOPOLOGY_OUTPUT", "json"),
        ]))
        .unwrap();

        config.override_config(&ConfigOverrides {
            format: Some(SnapshotFormat::Json),
            ..ConfigOverrides::default()
        });
        assert_eq!(
            config.source,
            SnapshotSource::File {
                path: PathBuf::from("stack.json"),
                format: Some(SnapshotFormat::Json),
            }
        );
        assert_eq!(config.output, OutputFormat::Json);

        config.override_config(&ConfigOverrides {
            blueprint: Some("api".to_string()),
            desired_count: Some(3),
            output: Some(OutputFormat::Summary),
            destroy: true,
            ..ConfigOverrides::default()
        });
        match &config.source {
            SnapshotSource::Blueprint(blueprint) => {
                assert_eq!(blueprint.prefix, "api");
                assert_eq!(blueprint.desired_count, 3);
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert_eq!(config.output, OutputFormat::Summary);
        assert!(config.destroy);
    }

    #[test]
    fn test_unset_overrides_keep_config() {
        let mut config = PlannerConfig::default().with_destroy(true);
        let before = config.clone();
        config.override_config(&ConfigOverrides::default());
        assert_eq!(config, before);
    }

    #[test]
    fn test_invalid_values() {
        assert!(PlannerConfig::from_lookup(lookup(&[("TOPOLOGY_OUTPUT", "xml")])).is_err());
        assert!(PlannerConfig::from_lookup(lookup(&[("TOPOLOGY_DESTROY", "maybe")])).is_err());
        assert!(PlannerConfig::from_lookup(lookup(&[("TOPOLOGY_DESIRED_COUNT", "-1")])).is_err());
    }

    #[test]
    fn test_builder() {
        let config = PlannerConfig::default()
            .with_snapshot("a.yml", None)
            .with_output(OutputFormat::Json)
            .with_destroy(true);
        assert!(matches!(config.source, SnapshotSource::File { format: None, .. }));
        assert_eq!(config.output.to_string(), "json");
    }
}
