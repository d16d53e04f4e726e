//! Target planner command line runner.
//!
//! Loads planner configuration and a JSON fixture (projects plus precomputed
//! astrometry), runs one planning cycle and prints the resulting plan as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin target-planner -- demos/tonight.json planner.toml
//! ```
//!
//! # Environment Variables
//!
//! - `PLANNER_FIXTURE`: fixture path when none is given on the command line
//! - `PLANNER_CONFIG`: config path when none is given on the command line
//! - `PLANNER_*`: configuration overrides, see [`target_planner::config`]
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use target_planner::astrometry::StaticAstrometry;
use target_planner::db::LocalRepository;
use target_planner::models::Project;
use target_planner::planning::Environment;
use target_planner::services::PlanningSession;
use target_planner::PlannerConfig;

#[derive(Debug, Deserialize)]
struct Fixture {
    now: DateTime<Utc>,
    #[serde(default)]
    humidity: Option<f64>,
    projects: Vec<Project>,
    #[serde(default)]
    astrometry: StaticAstrometry,
}

fn load_config(path: Option<String>) -> anyhow::Result<PlannerConfig> {
    let mut config = match path {
        Some(path) => PlannerConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => PlannerConfig::from_default_location().unwrap_or_else(|e| {
            warn!("{}; using default configuration", e);
            PlannerConfig::default()
        }),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let fixture_path = args
        .next()
        .or_else(|| env::var("PLANNER_FIXTURE").ok())
        .context("usage: target-planner <fixture.json> [planner.toml]")?;
    let config = load_config(args.next().or_else(|| env::var("PLANNER_CONFIG").ok()))?;

    let raw = fs::read_to_string(&fixture_path)
        .with_context(|| format!("failed to read fixture {}", fixture_path))?;
    let fixture: Fixture = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse fixture {}", fixture_path))?;
    info!(
        "Planning for profile '{}' at {} with {} project(s)",
        config.profile.profile_id,
        fixture.now,
        fixture.projects.len()
    );

    let repository = Arc::new(LocalRepository::new());
    for project in fixture.projects {
        repository.store_project(project);
    }

    let mut session = PlanningSession::new(repository, Arc::new(fixture.astrometry), config);
    session.set_environment(Environment {
        humidity: fixture.humidity,
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = session.next_plan(fixture.now, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
