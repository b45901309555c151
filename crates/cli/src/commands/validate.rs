//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CodecKind, PipelineBlueprint, SourceKind, SubscriberType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::load_blueprint;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source_count: usize,
    subscriber_count: usize,
    policy: &'static str,
    time_unit: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let config_path = args.config.display().to_string();
    let result = match load_blueprint(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(ConfigSummary {
                version: format!("{:?}", blueprint.version),
                source_count: blueprint.sources.len(),
                subscriber_count: blueprint.distributor.subscribers.len(),
                policy: blueprint.synchronizer.policy.as_str(),
                time_unit: format!("{:?}", blueprint.effective_time_unit()),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &PipelineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.distributor.subscribers.is_empty() {
        warnings.push("No subscribers configured - orientation results will be dropped".to_string());
    }

    let websocket_servers = blueprint
        .distributor
        .subscribers
        .iter()
        .filter(|s| s.subscriber_type == SubscriberType::WebsocketServer)
        .count();
    if websocket_servers > 1 {
        warnings.push(format!(
            "{websocket_servers} websocket servers configured - each needs its own addr"
        ));
    }

    let serial_line = blueprint
        .sources
        .iter()
        .any(|s| s.kind.codec() == CodecKind::SerialLine);
    let json = blueprint
        .sources
        .iter()
        .any(|s| s.kind.codec() == CodecKind::Json);
    if serial_line && json && blueprint.estimator.time_unit.is_none() {
        warnings.push(
            "Serial-line and JSON sources mixed without estimator.time_unit - microseconds assumed"
                .to_string(),
        );
    }

    for source in &blueprint.sources {
        if let SourceKind::Websocket { sensor_types, .. } = &source.kind {
            if sensor_types.len() < 3 {
                warnings.push(format!(
                    "Source '{}' requests {} sensor types - frames need gyroscope, accelerometer and magnetometer",
                    source.name,
                    sensor_types.len()
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sources: {}", summary.source_count);
            println!("  Subscribers: {}", summary.subscriber_count);
            println!("  Policy: {}", summary.policy);
            println!("  Time unit: {}", summary.time_unit);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
