//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{EmissionPolicy, PipelineBlueprint};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::load_blueprint;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;

    if let Some(policy) = args.policy {
        let policy = EmissionPolicy::from(policy);
        info!(policy = policy.as_str(), "Overriding emission policy from CLI");
        blueprint.synchronizer.policy = policy;
    }

    info!(
        sources = blueprint.sources.len(),
        subscribers = blueprint.distributor.subscribers.len(),
        policy = blueprint.synchronizer.policy.as_str(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_results: (args.max_results > 0).then_some(args.max_results),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting pipeline...");
    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        results = stats.results_published,
        frames = stats.frames_emitted,
        duration_secs = stats.duration.as_secs_f64(),
        reason = stats.stop_reason.as_str(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("AHRS relay finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
    warn!("Received shutdown signal, stopping pipeline...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &PipelineBlueprint) {
    println!("\n=== Configuration Summary ===\n");

    println!("Sources ({}):", blueprint.sources.len());
    for source in &blueprint.sources {
        println!(
            "  - {} ({} {}) backoff {} ms",
            source.name,
            source.kind.label(),
            source.kind.endpoint(),
            source.reconnect.backoff_ms
        );
    }

    println!("\nSynchronizer:");
    println!("  Policy: {}", blueprint.synchronizer.policy.as_str());

    println!("\nEstimator:");
    println!("  Time unit: {:?}", blueprint.effective_time_unit());
    println!("  Gain: {}", blueprint.estimator.filter.gain);
    println!("  Sample rate: {} Hz", blueprint.estimator.filter.sample_rate);

    if !blueprint.distributor.subscribers.is_empty() {
        println!("\nSubscribers ({}):", blueprint.distributor.subscribers.len());
        for subscriber in &blueprint.distributor.subscribers {
            println!(
                "  - {} ({})",
                subscriber.name,
                subscriber.subscriber_type.as_str()
            );
        }
    }

    println!();
}
