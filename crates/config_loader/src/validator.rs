//! Config validation
//!
//! Rules:
//! - at least one source, source names unique and non-empty
//! - transport endpoints present, serial baud > 0
//! - reconnect backoff > 0
//! - preprocessing filter parameters positive
//! - filter settings within range
//! - subscriber names unique and non-empty, required params present
//! - queue capacities > 0

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{
    ContractError, FilterSpec, PipelineBlueprint, SourceConfig, SourceKind, SubscriberType,
};

/// Validate a PipelineBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    validate_source_names(blueprint)?;
    for (idx, source) in blueprint.sources.iter().enumerate() {
        validate_source_kind(idx, source)?;
        validate_reconnect(idx, source)?;
        validate_preprocess(idx, source)?;
    }
    validate_filter(blueprint)?;
    validate_distributor(blueprint)?;
    Ok(())
}

/// Source presence and name uniqueness
fn validate_source_names(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    if blueprint.sources.is_empty() {
        return Err(ContractError::config_validation(
            "sources",
            "at least one source is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, source) in blueprint.sources.iter().enumerate() {
        if source.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("sources[{idx}].name"),
                "source name cannot be empty",
            ));
        }
        if !seen.insert(source.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sources[name={}]", source.name),
                "duplicate source name",
            ));
        }
    }
    Ok(())
}

/// Transport endpoint fields
fn validate_source_kind(idx: usize, source: &SourceConfig) -> Result<(), ContractError> {
    match &source.kind {
        SourceKind::Websocket {
            address,
            sensor_types,
        } => {
            if address.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("sources[{idx}].kind.address"),
                    "websocket address cannot be empty",
                ));
            }
            if sensor_types.is_empty() {
                return Err(ContractError::config_validation(
                    format!("sources[{idx}].kind.sensor_types"),
                    "at least one sensor type is required",
                ));
            }
        }
        SourceKind::Tcp { address, .. } => {
            if address.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("sources[{idx}].kind.address"),
                    "tcp address cannot be empty",
                ));
            }
        }
        SourceKind::Serial { path, baud_rate } => {
            if path.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("sources[{idx}].kind.path"),
                    "serial path cannot be empty",
                ));
            }
            if *baud_rate == 0 {
                return Err(ContractError::config_validation(
                    format!("sources[{idx}].kind.baud_rate"),
                    "baud_rate must be > 0",
                ));
            }
        }
        SourceKind::Replay { path, .. } => {
            if path.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("sources[{idx}].kind.path"),
                    "replay path cannot be empty",
                ));
            }
        }
    }
    Ok(())
}

fn validate_reconnect(idx: usize, source: &SourceConfig) -> Result<(), ContractError> {
    if source.reconnect.backoff_ms == 0 {
        return Err(ContractError::config_validation(
            format!("sources[{idx}].reconnect.backoff_ms"),
            "backoff_ms must be > 0",
        ));
    }
    if source.reconnect.connect_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            format!("sources[{idx}].reconnect.connect_timeout_ms"),
            "connect_timeout_ms must be > 0",
        ));
    }
    Ok(())
}

/// Preprocessing filter parameters
fn validate_preprocess(idx: usize, source: &SourceConfig) -> Result<(), ContractError> {
    let chains = [
        ("gyro", &source.preprocess.gyro),
        ("accel", &source.preprocess.accel),
        ("mag", &source.preprocess.mag),
    ];

    for (axis, chain) in chains {
        for (stage, spec) in chain.iter().enumerate() {
            let field = format!("sources[{idx}].preprocess.{axis}[{stage}]");
            match *spec {
                FilterSpec::Fir { length, .. } if length == 0 => {
                    return Err(ContractError::config_validation(
                        field,
                        "fir length must be > 0",
                    ));
                }
                FilterSpec::Rc {
                    cutoff_hz,
                    sample_time_s,
                } if cutoff_hz <= 0.0 || sample_time_s <= 0.0 => {
                    return Err(ContractError::config_validation(
                        field,
                        format!(
                            "rc cutoff_hz and sample_time_s must be > 0, got {cutoff_hz} / {sample_time_s}"
                        ),
                    ));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Filter settings via derive rules
fn validate_filter(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    blueprint
        .estimator
        .filter
        .validate()
        .map_err(|errors| match ContractError::from(errors) {
            ContractError::ConfigValidation { field, message } => {
                ContractError::config_validation(format!("estimator.filter.{field}"), message)
            }
            other => other,
        })
}

/// Distributor routing
fn validate_distributor(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let distributor = &blueprint.distributor;

    if distributor.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "distributor.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, subscriber) in distributor.subscribers.iter().enumerate() {
        if subscriber.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("distributor.subscribers[{idx}].name"),
                "subscriber name cannot be empty",
            ));
        }
        if !seen.insert(subscriber.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("distributor.subscribers[name={}]", subscriber.name),
                "duplicate subscriber name",
            ));
        }
        if subscriber.queue_capacity == Some(0) {
            return Err(ContractError::config_validation(
                format!("distributor.subscribers[{idx}].queue_capacity"),
                "queue_capacity must be > 0",
            ));
        }
        if subscriber.subscriber_type == SubscriberType::Network
            && !subscriber.params.contains_key("addr")
        {
            return Err(ContractError::config_validation(
                format!("distributor.subscribers[{idx}].params.addr"),
                "network subscriber requires 'addr'",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ConfigVersion, DistributorConfig, EstimatorConfig, PreprocessConfig, ReconnectConfig,
        SubscriberConfig, SynchronizerConfig,
    };
    use std::collections::HashMap;

    fn minimal_blueprint() -> PipelineBlueprint {
        PipelineBlueprint {
            version: ConfigVersion::V1,
            sources: vec![SourceConfig {
                name: "phone".into(),
                kind: SourceKind::Websocket {
                    address: "10.0.0.128:8080".into(),
                    sensor_types: vec!["android.sensor.gyroscope".into()],
                },
                reconnect: ReconnectConfig::default(),
                preprocess: PreprocessConfig::default(),
            }],
            synchronizer: SynchronizerConfig::default(),
            estimator: EstimatorConfig::default(),
            distributor: DistributorConfig {
                queue_capacity: 64,
                publish_raw_frames: false,
                subscribers: vec![SubscriberConfig {
                    name: "log".into(),
                    subscriber_type: SubscriberType::Log,
                    queue_capacity: None,
                    params: HashMap::new(),
                }],
            },
        }
    }

    fn error_text(bp: &PipelineBlueprint) -> String {
        let result = validate(bp);
        assert!(result.is_err());
        result.unwrap_err().to_string()
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_no_sources() {
        let mut bp = minimal_blueprint();
        bp.sources.clear();
        let err = error_text(&bp);
        assert!(err.contains("at least one source"), "got: {err}");
    }

    #[test]
    fn test_duplicate_source_name() {
        let mut bp = minimal_blueprint();
        bp.sources.push(bp.sources[0].clone());
        let err = error_text(&bp);
        assert!(err.contains("duplicate source name"), "got: {err}");
    }

    #[test]
    fn test_empty_serial_path() {
        let mut bp = minimal_blueprint();
        bp.sources[0].kind = SourceKind::Serial {
            path: String::new(),
            baud_rate: 115_200,
        };
        let err = error_text(&bp);
        assert!(err.contains("serial path cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_zero_backoff() {
        let mut bp = minimal_blueprint();
        bp.sources[0].reconnect.backoff_ms = 0;
        let err = error_text(&bp);
        assert!(err.contains("backoff_ms"), "got: {err}");
    }

    #[test]
    fn test_invalid_rc_filter() {
        let mut bp = minimal_blueprint();
        bp.sources[0].preprocess.accel = vec![FilterSpec::Rc {
            cutoff_hz: 0.0,
            sample_time_s: 0.01,
        }];
        let err = error_text(&bp);
        assert!(err.contains("preprocess.accel[0]"), "got: {err}");
    }

    #[test]
    fn test_zero_fir_length() {
        let mut bp = minimal_blueprint();
        bp.sources[0].preprocess.gyro = vec![FilterSpec::Fir {
            length: 0,
            coefficient: 1.0,
        }];
        let err = error_text(&bp);
        assert!(err.contains("fir length"), "got: {err}");
    }

    #[test]
    fn test_non_positive_sample_rate() {
        let mut bp = minimal_blueprint();
        bp.estimator.filter.sample_rate = 0.0;
        match validate(&bp) {
            Err(ContractError::ConfigValidation { field, .. }) => {
                assert_eq!(field, "estimator.filter.sample_rate")
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_negative_rejection() {
        let mut bp = minimal_blueprint();
        bp.estimator.filter.magnetic_rejection = -1.0;
        let err = error_text(&bp);
        assert!(err.contains("magnetic_rejection"), "got: {err}");
    }

    #[test]
    fn test_empty_subscriber_name() {
        let mut bp = minimal_blueprint();
        bp.distributor.subscribers[0].name = String::new();
        let err = error_text(&bp);
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_duplicate_subscriber_name() {
        let mut bp = minimal_blueprint();
        let dup = bp.distributor.subscribers[0].clone();
        bp.distributor.subscribers.push(dup);
        let err = error_text(&bp);
        assert!(err.contains("duplicate subscriber name"), "got: {err}");
    }

    #[test]
    fn test_network_subscriber_requires_addr() {
        let mut bp = minimal_blueprint();
        bp.distributor.subscribers[0].subscriber_type = SubscriberType::Network;
        let err = error_text(&bp);
        assert!(err.contains("requires 'addr'"), "got: {err}");
    }
}
