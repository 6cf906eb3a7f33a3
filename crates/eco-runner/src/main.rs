//! Command-line host for the predator-prey ecosystem.

#[macro_use]
mod telemetry;
mod checkpoint;
mod exporter;

use anyhow::{Context, Result};
use checkpoint::CheckpointManager;
use clap::Parser;
use eco_core::{EcosystemConfig, Error as EcoError, RunConfig, RunId, Species};
use eco_world::Ecosystem;
use exporter::SnapshotExporter;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use telemetry::LogFormat;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "ecosim", version, about = "Predator-prey grid ecosystem simulator")]
struct Cli {
    /// JSON file with ecosystem settings; missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Experiment folder for settings, snapshots and checkpoints
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of ticks to run (0 runs until interrupted or extinct)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Override the seed from the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Skip writing per-tick occupancy snapshots
    #[arg(long)]
    no_export: bool,

    /// Continue from the newest checkpoint in the output folder
    #[arg(long)]
    resume: bool,

    /// Ticks between census log lines
    #[arg(long)]
    census_interval: Option<u64>,

    /// Ticks between checkpoints (0 disables them)
    #[arg(long)]
    checkpoint_interval: Option<u64>,

    /// Checkpoint files kept on disk
    #[arg(long)]
    keep_checkpoints: Option<usize>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let defaults = RunConfig::default();
        RunConfig {
            output_dir: self
                .output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or(defaults.output_dir),
            max_ticks: self.ticks.unwrap_or(defaults.max_ticks),
            export_snapshots: !self.no_export && defaults.export_snapshots,
            census_interval: self.census_interval.unwrap_or(defaults.census_interval),
            checkpoint_interval: self
                .checkpoint_interval
                .unwrap_or(defaults.checkpoint_interval),
            keep_checkpoints: self.keep_checkpoints.unwrap_or(defaults.keep_checkpoints),
        }
    }

    /// World settings a restored checkpoint takes precedence over
    fn ignored_on_resume(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.config.is_some() {
            ignored.push("--config");
        }
        if self.seed.is_some() {
            ignored.push("--seed");
        }
        ignored
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    TickLimit,
    Interrupted,
    Extinction,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TickLimit => write!(f, "tick_limit"),
            StopReason::Interrupted => write!(f, "interrupted"),
            StopReason::Extinction => write!(f, "extinction"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.log_format)?;

    let run_config = cli.run_config();
    let output_dir = PathBuf::from(&run_config.output_dir);
    let run_id = RunId::new();
    info!(%run_id, output = %output_dir.display(), "Starting ecosystem simulator");

    let checkpoints = CheckpointManager::new(
        output_dir.join("checkpoints"),
        run_config.keep_checkpoints,
    );

    let mut ecosystem = if cli.resume {
        match checkpoints.restore_latest().await {
            Ok(ecosystem) => {
                let ignored = cli.ignored_on_resume();
                if !ignored.is_empty() {
                    warn!(
                        flags = %ignored.join(", "),
                        "Resuming with the checkpointed settings; flags ignored"
                    );
                }
                ecosystem
            }
            Err(EcoError::NotFound(msg)) => {
                warn!("Nothing to resume ({}), starting a new ecosystem", msg);
                Ecosystem::new(load_config(&cli).await?)?
            }
            Err(e) => return Err(e).context("failed to resume from checkpoint"),
        }
    } else {
        Ecosystem::new(load_config(&cli).await?)?
    };

    let exporter = if run_config.export_snapshots {
        Some(SnapshotExporter::create(&output_dir, ecosystem.config(), run_id).await?)
    } else {
        None
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    let started = Instant::now();
    let start_tick = ecosystem.tick();
    let reason = run_loop(
        &mut ecosystem,
        &run_config,
        exporter.as_ref(),
        &checkpoints,
        &cancel,
    )
    .await?;

    if let Some(exporter) = &exporter {
        exporter.export_time_slice(&ecosystem).await?;
    }
    if run_config.checkpoint_interval > 0 {
        checkpoints.create_checkpoint(&ecosystem).await?;
    }

    let census = ecosystem.census();
    ecosystem.emit_census(&census);

    let records = ecosystem.records();
    let elapsed = started.elapsed();
    let ticks_run = ecosystem.tick() - start_tick;
    info!(
        %run_id,
        reason = %reason,
        ticks_run,
        final_tick = ecosystem.tick(),
        population = census.total(),
        births = records.total_births(),
        deaths = records.total_deaths(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Simulation finished"
    );
    for species in Species::ALL {
        info!(
            species = %species,
            alive = *census.population.get(species),
            births = *records.births.get(species),
            starvations = *records.starvations.get(species),
            old_age_deaths = *records.old_age_deaths.get(species),
            predations = *records.predations.get(species),
            "Species summary"
        );
    }

    Ok(())
}

async fn load_config(cli: &Cli) -> Result<EcosystemConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config {}", path.display()))?;
            EcosystemConfig::from_json_str(&json)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => EcosystemConfig::default(),
    };

    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    config.validate()?;

    info!(
        seed = config.seed,
        width = config.world.width,
        height = config.world.height,
        "Configuration loaded"
    );
    Ok(config)
}

async fn run_loop(
    ecosystem: &mut Ecosystem,
    run_config: &RunConfig,
    exporter: Option<&SnapshotExporter>,
    checkpoints: &CheckpointManager,
    cancel: &CancellationToken,
) -> Result<StopReason> {
    let mut ticks_run = 0u64;

    loop {
        if cancel.is_cancelled() {
            return Ok(StopReason::Interrupted);
        }
        if run_config.max_ticks > 0 && ticks_run >= run_config.max_ticks {
            return Ok(StopReason::TickLimit);
        }
        if ecosystem.population() == 0 {
            info!(tick = ecosystem.tick(), "Every organism has died");
            return Ok(StopReason::Extinction);
        }

        if let Some(exporter) = exporter {
            exporter.export_time_slice(ecosystem).await?;
        }

        if let Err(e) = ecosystem.evolve() {
            error!(tick = ecosystem.tick(), error = %e, "Tick failed");
            return Err(e.into());
        }
        ticks_run += 1;
        let tick = ecosystem.tick();

        if run_config.census_interval > 0 && tick % run_config.census_interval == 0 {
            let census = ecosystem.census();
            ecosystem.emit_census(&census);
            record_gauge!("free_cells", ecosystem.grid().free_count(), tick = tick);
            record_counter!("births_total", ecosystem.records().total_births(), tick = tick);
            record_counter!("deaths_total", ecosystem.records().total_deaths(), tick = tick);
        }

        if run_config.checkpoint_interval > 0 && tick % run_config.checkpoint_interval == 0 {
            checkpoints.create_checkpoint(ecosystem).await?;
            record_counter!("checkpoints_written", 1u64);
        }

        tokio::task::yield_now().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_run_config() {
        let cli = Cli::parse_from([
            "ecosim",
            "--output",
            "/tmp/wolves",
            "--ticks",
            "50",
            "--no-export",
            "--checkpoint-interval",
            "0",
        ]);
        let run = cli.run_config();
        assert_eq!(run.output_dir, "/tmp/wolves");
        assert_eq!(run.max_ticks, 50);
        assert!(!run.export_snapshots);
        assert_eq!(run.checkpoint_interval, 0);
        assert_eq!(run.census_interval, RunConfig::default().census_interval);
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_world_flags_ignored_on_resume() {
        let cli = Cli::parse_from(["ecosim", "--resume", "--seed", "4", "--config", "wolves.json"]);
        assert_eq!(cli.ignored_on_resume(), vec!["--config", "--seed"]);

        let cli = Cli::parse_from(["ecosim", "--resume", "--ticks", "10"]);
        assert!(cli.ignored_on_resume().is_empty());
    }

    #[tokio::test]
    async fn test_seed_override() {
        let cli = Cli::parse_from(["ecosim", "--seed", "99"]);
        let config = load_config(&cli).await.unwrap();
        assert_eq!(config.seed, 99);
    }

    #[tokio::test]
    async fn test_run_loop_stops_at_tick_limit() {
        let mut config = EcosystemConfig::default();
        config.world.width = 10;
        config.world.height = 10;
        config.species.initial_count = eco_core::SpeciesTable::new(20, 6, 2);
        let mut ecosystem = Ecosystem::new(config).unwrap();

        let run = RunConfig {
            max_ticks: 7,
            checkpoint_interval: 0,
            ..Default::default()
        };
        let manager = CheckpointManager::new(std::env::temp_dir().join("ecosim-unused"), 1);
        let reason = run_loop(&mut ecosystem, &run, None, &manager, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reason, StopReason::TickLimit);
        assert_eq!(ecosystem.tick(), 7);
    }

    #[tokio::test]
    async fn test_run_loop_honors_cancellation() {
        let mut config = EcosystemConfig::default();
        config.world.width = 10;
        config.world.height = 10;
        config.species.initial_count = eco_core::SpeciesTable::new(20, 6, 2);
        let mut ecosystem = Ecosystem::new(config).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let manager = CheckpointManager::new(std::env::temp_dir().join("ecosim-unused"), 1);
        let reason = run_loop(&mut ecosystem, &RunConfig::default(), None, &manager, &cancel)
            .await
            .unwrap();

        assert_eq!(reason, StopReason::Interrupted);
        assert_eq!(ecosystem.tick(), 0);
    }

    #[tokio::test]
    async fn test_run_loop_reports_extinction() {
        let mut config = EcosystemConfig::default();
        config.world.width = 4;
        config.world.height = 4;
        config.species.initial_count = eco_core::SpeciesTable::new(0, 0, 0);
        let mut ecosystem = Ecosystem::new(config).unwrap();

        let reason = run_loop(
            &mut ecosystem,
            &RunConfig::default(),
            None,
            &CheckpointManager::new(std::env::temp_dir().join("ecosim-unused"), 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(reason, StopReason::Extinction);
    }
}
