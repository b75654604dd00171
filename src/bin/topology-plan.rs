// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Planner
//!
//! Reads a desired-state snapshot (or builds the reference web-service
//! blueprint), validates it and prints the apply plan.
//!
//! Run with: cargo run --bin topology-plan -- --snapshot stack.yaml
//!
//! Settings are read from `TOPOLOGY_*` environment variables first;
//! flags given on the command line override them. Logs go to stderr; the
//! plan goes to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use cim_topology::{
    config::{ConfigOverrides, OutputFormat, PlannerConfig},
    domain::SnapshotFormat,
    plan, PlanDocument, PlannerError, ValidationReport,
};

/// Validate a deployment topology and print its apply plan
#[derive(Debug, Parser)]
#[command(name = "topology-plan", version, about)]
struct Args {
    /// Snapshot file (JSON or YAML); takes precedence over --blueprint
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Snapshot format, inferred from the file extension when omitted
    #[arg(long, value_enum)]
    format: Option<SnapshotFormat>,

    /// Plan the reference web-service blueprint with this name prefix
    #[arg(long)]
    blueprint: Option<String>,

    /// Container image for the blueprint
    #[arg(long)]
    image: Option<String>,

    /// Desired task count for the blueprint
    #[arg(long)]
    desired_count: Option<u32>,

    /// Plan rendering [default: summary]
    #[arg(long, value_enum)]
    output: Option<OutputFormat>,

    /// Print the destroy order instead of the apply order
    #[arg(long)]
    destroy: bool,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            snapshot: args.snapshot,
            format: args.format,
            blueprint: args.blueprint,
            image: args.image,
            desired_count: args.desired_count,
            output: args.output,
            destroy: args.destroy,
        }
    }
}

fn reject(report: &ValidationReport) -> ExitCode {
    error!("{}", report);
    eprint!("{}", report.render());
    ExitCode::FAILURE
}

fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let overrides = ConfigOverrides::from(Args::parse());
    let mut config = PlannerConfig::from_env().context("Invalid planner configuration")?;
    config.override_config(&overrides);

    let snapshot = match config.load_snapshot() {
        Ok(snapshot) => snapshot,
        Err(PlannerError::Rejected(report)) => return Ok(reject(&report)),
        Err(err) => return Err(err).context("Failed to load snapshot"),
    };
    info!(
        "Planning {} resources and {} outputs",
        snapshot.resources.len(),
        snapshot.outputs.len()
    );

    let plan = match plan(&snapshot) {
        Ok(plan) => plan,
        Err(report) => return Ok(reject(&report)),
    };

    match config.output {
        OutputFormat::Summary => print!("{}", plan.summary(config.destroy)),
        OutputFormat::Json => {
            let document = PlanDocument::new(plan, config.destroy);
            println!("{}", document.to_json().context("Failed to render plan")?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
