//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{PipelineBlueprint, SourceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::load_blueprint;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sources: Vec<SourceInfo>,
    synchronizer: SynchronizerInfo,
    estimator: EstimatorInfo,
    distributor: DistributorInfo,
}

#[derive(Serialize)]
struct SourceInfo {
    name: String,
    kind: &'static str,
    endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<SourceDetails>,
}

#[derive(Serialize)]
struct SourceDetails {
    codec: String,
    backoff_ms: u64,
    connect_timeout_ms: u64,
    normalize: bool,
    filter_stages: usize,
}

#[derive(Serialize)]
struct SynchronizerInfo {
    policy: &'static str,
}

#[derive(Serialize)]
struct EstimatorInfo {
    time_unit: String,
    gyro_units: String,
    accel_units: String,
    sample_rate: f64,
    gain: f64,
    offset_correction: bool,
}

#[derive(Serialize)]
struct DistributorInfo {
    queue_capacity: usize,
    publish_raw_frames: bool,
    subscriber_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    subscribers: Vec<SubscriberInfo>,
}

#[derive(Serialize)]
struct SubscriberInfo {
    name: String,
    subscriber_type: &'static str,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;
    let info = build_config_info(&blueprint, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn source_info(source: &SourceConfig, detailed: bool) -> SourceInfo {
    let preprocess = &source.preprocess;
    SourceInfo {
        name: source.name.clone(),
        kind: source.kind.label(),
        endpoint: source.kind.endpoint(),
        details: detailed.then(|| SourceDetails {
            codec: format!("{:?}", source.kind.codec()),
            backoff_ms: source.reconnect.backoff_ms,
            connect_timeout_ms: source.reconnect.connect_timeout_ms,
            normalize: preprocess.normalize,
            filter_stages: preprocess.gyro.len() + preprocess.accel.len() + preprocess.mag.len(),
        }),
    }
}

fn build_config_info(blueprint: &PipelineBlueprint, args: &InfoArgs) -> ConfigInfo {
    let distributor = &blueprint.distributor;
    let subscribers = if args.subscribers {
        distributor
            .subscribers
            .iter()
            .map(|s| SubscriberInfo {
                name: s.name.clone(),
                subscriber_type: s.subscriber_type.as_str(),
                queue_capacity: s.queue_capacity.unwrap_or(distributor.queue_capacity),
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let estimator = &blueprint.estimator;

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sources: blueprint
            .sources
            .iter()
            .map(|s| source_info(s, args.sources))
            .collect(),
        synchronizer: SynchronizerInfo {
            policy: blueprint.synchronizer.policy.as_str(),
        },
        estimator: EstimatorInfo {
            time_unit: format!("{:?}", blueprint.effective_time_unit()),
            gyro_units: format!("{:?}", estimator.gyro_units),
            accel_units: format!("{:?}", estimator.accel_units),
            sample_rate: estimator.filter.sample_rate,
            gain: estimator.filter.gain,
            offset_correction: estimator.filter.offset_correction,
        },
        distributor: DistributorInfo {
            queue_capacity: distributor.queue_capacity,
            publish_raw_frames: distributor.publish_raw_frames,
            subscriber_count: distributor.subscribers.len(),
            subscribers,
        },
    }
}

fn tree_prefix(index: usize, len: usize) -> &'static str {
    if index + 1 == len {
        "└─"
    } else {
        "├─"
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== AHRS Relay Configuration ({}) ===\n", info.version);

    println!("Sources ({})", info.sources.len());
    for (i, source) in info.sources.iter().enumerate() {
        let prefix = tree_prefix(i, info.sources.len());
        println!("   {} {} ({} {})", prefix, source.name, source.kind, source.endpoint);
        if let Some(ref details) = source.details {
            let child = if i + 1 == info.sources.len() { "   " } else { "│  " };
            println!(
                "   {}  codec {}, backoff {} ms, connect timeout {} ms",
                child, details.codec, details.backoff_ms, details.connect_timeout_ms
            );
            println!(
                "   {}  normalize {}, {} filter stages",
                child, details.normalize, details.filter_stages
            );
        }
    }

    println!("\nSynchronizer");
    println!("   └─ Policy: {}", info.synchronizer.policy);

    let estimator = &info.estimator;
    println!("\nEstimator");
    println!("   ├─ Time unit: {}", estimator.time_unit);
    println!("   ├─ Units: gyro {}, accel {}", estimator.gyro_units, estimator.accel_units);
    println!("   ├─ Sample rate: {} Hz", estimator.sample_rate);
    println!("   ├─ Gain: {}", estimator.gain);
    println!("   └─ Offset correction: {}", estimator.offset_correction);

    let distributor = &info.distributor;
    println!("\nDistributor");
    println!("   ├─ Queue capacity: {}", distributor.queue_capacity);
    println!("   ├─ Raw frames: {}", distributor.publish_raw_frames);
    println!("   └─ Subscribers: {}", distributor.subscriber_count);
    for (i, subscriber) in distributor.subscribers.iter().enumerate() {
        let prefix = tree_prefix(i, distributor.subscribers.len());
        println!(
            "      {} {} ({}, queue {})",
            prefix, subscriber.name, subscriber.subscriber_type, subscriber.queue_capacity
        );
    }

    println!();
}
