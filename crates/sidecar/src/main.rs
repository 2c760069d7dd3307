//! shardkeeper: index lifecycle sidecar for a search cluster node.
//!
//! Runs three jobs on one scheduler:
//! - `engine_health`: pings the local node and maintains the started flag
//! - `process_stats`: samples the node's process statistics
//! - `index_lifecycle`: daily retention and precreation, on the elected master only

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shardkeeper_cluster::{EsHttpClient, ProcessHealth};
use shardkeeper_core::config::load_dotenv;
use shardkeeper_core::{CivilDate, Config};
use shardkeeper_indices::{parse_policies, CycleOutcome, EnvSettings, IndexLifecycleManager};
use shardkeeper_monitor::{EngineHealthMonitor, ProcessStatsMonitor};
use shardkeeper_scheduler::{FixedIntervalTimer, Scheduler};

const CRATES: [&str; 6] = [
    "shardkeeper",
    "shardkeeper_core",
    "shardkeeper_scheduler",
    "shardkeeper_cluster",
    "shardkeeper_indices",
    "shardkeeper_monitor",
];

/// Index lifecycle sidecar: retention, precreation and process monitoring.
#[derive(Parser, Debug)]
#[command(name = "shardkeeper", version, about)]
struct Cli {
    /// Configuration profile; keys are looked up as `{PROFILE}_{KEY}` first.
    #[arg(long, env = "SHARDKEEPER_PROFILE", default_value = "")]
    profile: String,

    /// Run a single lifecycle cycle now and exit.
    #[arg(long)]
    once: bool,
}

fn init_tracing(debug_logging: bool) {
    let default_filter = if debug_logging {
        let mut directives = vec!["info".to_string()];
        directives.extend(CRATES.iter().map(|c| format!("{c}=debug")));
        directives.join(",")
    } else {
        "info".to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

/// Waits for SIGINT or SIGTERM.
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

/// Report invalid policies at startup; the lifecycle job re-reads them each cycle.
fn check_policies(config: &Config) {
    match config
        .indices
        .policy_document()
        .map_err(anyhow::Error::from)
        .and_then(|doc| parse_policies(&doc).map_err(anyhow::Error::from))
    {
        Ok(policies) => info!(policies = policies.len(), "index policies loaded"),
        Err(e) => warn!(error = %e, "index policies are invalid; cycles will fail until fixed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    let config = Config::for_profile(&cli.profile);
    init_tracing(config.indices.debug_logging_enabled);
    config.log_summary();
    check_policies(&config);

    let client = Arc::new(
        EsHttpClient::new(&config.cluster.url).context("Invalid cluster URL (ES_URL)")?,
    );
    let health = ProcessHealth::new();
    let request_timeout = config.cluster.request_timeout();

    let health_monitor = Arc::new(EngineHealthMonitor::new(
        client.clone(),
        health.clone(),
        config.monitor.health_interval(),
        request_timeout,
    ));
    let lifecycle = Arc::new(
        IndexLifecycleManager::new(
            client.clone(),
            client.clone(),
            health.clone(),
            Arc::new(EnvSettings::new(config.profile.clone())),
        )
        .with_leader_timeout(request_timeout),
    );

    if cli.once {
        health_monitor.probe_once().await;
        let outcome = lifecycle.run_cycle(CivilDate::today()).await;
        return match outcome {
            CycleOutcome::Skipped(reason) => {
                info!(reason = %reason, "lifecycle cycle skipped");
                Ok(())
            }
            CycleOutcome::Succeeded(report) => {
                info!(summary = %report, "lifecycle cycle completed");
                Ok(())
            }
            CycleOutcome::PartiallyFailed(report) => bail!("lifecycle cycle failed: {report}"),
            CycleOutcome::Failed(e) => Err(e).context("lifecycle cycle failed"),
        };
    }

    let stats_monitor = Arc::new(ProcessStatsMonitor::new(
        client.clone(),
        health.clone(),
        config.monitor.stats_interval(),
        request_timeout,
    ));

    // The first stats sample waits one probe interval so the started flag is set.
    let stats_timer = FixedIntervalTimer::new(config.monitor.stats_interval())
        .with_initial_delay(config.monitor.health_interval());

    let mut scheduler = Scheduler::new();
    scheduler
        .register(health_monitor)
        .context("Failed to register health probe")?;
    scheduler
        .register_with_timer(stats_monitor.clone(), Box::new(stats_timer))
        .context("Failed to register stats sampler")?;
    scheduler
        .register(lifecycle)
        .context("Failed to register index lifecycle job")?;

    let handle = scheduler.start();
    info!("shardkeeper running");

    wait_for_shutdown_signal().await?;

    let metrics = handle.metrics();
    handle.shutdown().await;

    for (job, m) in &metrics.jobs {
        info!(
            job = %job,
            executions = m.executions,
            succeeded = m.succeeded,
            skipped = m.skipped,
            failed = m.failed,
            "job totals"
        );
    }
    if let Some(sampled_at) = stats_monitor.snapshot().sampled_at {
        info!(last_stats_sample = %sampled_at, "shardkeeper stopped");
    } else {
        info!("shardkeeper stopped");
    }
    Ok(())
}
