//! PipelineBlueprint - Config Loader output
//!
//! Describes one complete relay pipeline: sources, synchronizer policy,
//! estimator settings and distributor routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{EstimatorConfig, TimeUnit};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete pipeline blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Inbound sources, one adapter each
    pub sources: Vec<SourceConfig>,

    /// Synchronizer settings
    #[serde(default)]
    pub synchronizer: SynchronizerConfig,

    /// Estimator settings
    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// Output routing
    #[serde(default)]
    pub distributor: DistributorConfig,
}

/// One inbound source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique source name
    pub name: String,

    /// Transport
    pub kind: SourceKind,

    /// Reconnect behaviour
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Per-axis preprocessing
    #[serde(default)]
    pub preprocess: PreprocessConfig,
}

/// Transport kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    /// Phone sensor websocket
    Websocket {
        address: String,
        #[serde(default = "default_sensor_types")]
        sensor_types: Vec<String>,
    },

    /// Newline-delimited TCP stream
    Tcp {
        address: String,
        #[serde(default)]
        codec: CodecKind,
    },

    /// Serial device
    Serial {
        path: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },

    /// Recorded file replayed at a fixed pace
    Replay {
        path: String,
        #[serde(default)]
        codec: CodecKind,
        #[serde(default = "default_replay_interval_ms")]
        interval_ms: u64,
    },
}

fn default_sensor_types() -> Vec<String> {
    vec![
        crate::ANDROID_ACCELEROMETER.to_string(),
        crate::ANDROID_GYROSCOPE.to_string(),
        crate::ANDROID_MAGNETIC_FIELD.to_string(),
    ]
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_replay_interval_ms() -> u64 {
    10
}

impl SourceKind {
    /// Short label (matches the serde tag)
    pub fn label(&self) -> &'static str {
        match self {
            Self::Websocket { .. } => "websocket",
            Self::Tcp { .. } => "tcp",
            Self::Serial { .. } => "serial",
            Self::Replay { .. } => "replay",
        }
    }

    /// Endpoint description for logs
    pub fn endpoint(&self) -> String {
        match self {
            Self::Websocket { address, .. } | Self::Tcp { address, .. } => address.clone(),
            Self::Serial { path, baud_rate } => format!("{path}@{baud_rate}"),
            Self::Replay { path, .. } => path.clone(),
        }
    }

    /// Codec used to decode lines from this transport
    pub fn codec(&self) -> CodecKind {
        match self {
            Self::Websocket { .. } => CodecKind::Json,
            Self::Serial { .. } => CodecKind::SerialLine,
            Self::Tcp { codec, .. } | Self::Replay { codec, .. } => *codec,
        }
    }
}

/// Line codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    /// One JSON sensor message per line
    #[default]
    Json,
    /// Whitespace-separated serial line
    SerialLine,
}

/// Reconnect settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Fixed delay before re-entering Connecting
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Upper bound on one connect attempt
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_backoff_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            backoff_ms: default_backoff_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Preprocessing applied inside the adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Divide each vector by its norm before filtering
    #[serde(default)]
    pub normalize: bool,

    #[serde(default)]
    pub gyro: Vec<FilterSpec>,

    #[serde(default)]
    pub accel: Vec<FilterSpec>,

    #[serde(default)]
    pub mag: Vec<FilterSpec>,
}

impl PreprocessConfig {
    /// True when nothing would be applied
    pub fn is_identity(&self) -> bool {
        !self.normalize && self.gyro.is_empty() && self.accel.is_empty() && self.mag.is_empty()
    }
}

/// One filter stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Moving sum scaled by `coefficient`
    Fir { length: usize, coefficient: f64 },
    /// First-order RC low-pass
    Rc { cutoff_hz: f64, sample_time_s: f64 },
}

/// Frame emission policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionPolicy {
    /// Emit when complete, then clear all axes
    #[default]
    Flush,
    /// Emit on every update once complete, never clear
    Retain,
}

impl EmissionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flush => "flush",
            Self::Retain => "retain",
        }
    }
}

/// Synchronizer settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchronizerConfig {
    #[serde(default)]
    pub policy: EmissionPolicy,
}

/// Distributor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributorConfig {
    /// Default per-subscriber queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Also publish raw composite frames
    #[serde(default)]
    pub publish_raw_frames: bool,

    /// Configured subscribers
    #[serde(default)]
    pub subscribers: Vec<SubscriberConfig>,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            publish_raw_frames: false,
            subscribers: Vec::new(),
        }
    }
}

fn default_queue_capacity() -> usize {
    64
}

/// Subscriber output config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberConfig {
    /// Subscriber name
    pub name: String,

    /// Subscriber type
    pub subscriber_type: SubscriberType,

    /// Queue capacity override
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Subscriber type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberType {
    /// Log output
    Log,
    /// Newline-delimited JSON to a TCP peer
    Network,
    /// JSON lines file
    File,
    /// Websocket broadcast server
    WebsocketServer,
}

impl SubscriberType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Network => "network",
            Self::File => "file",
            Self::WebsocketServer => "websocket_server",
        }
    }
}

impl PipelineBlueprint {
    /// Timestamp unit the estimator divides deltas by
    ///
    /// Configured unit if set, else microseconds when any source decodes
    /// serial lines (whatever its transport), else nanoseconds.
    pub fn effective_time_unit(&self) -> TimeUnit {
        if let Some(unit) = self.estimator.time_unit {
            return unit;
        }

        let any_serial_line = self
            .sources
            .iter()
            .any(|source| source.kind.codec() == CodecKind::SerialLine);

        if any_serial_line {
            TimeUnit::Microseconds
        } else {
            TimeUnit::Nanoseconds
        }
    }

    /// Find a source by name
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|source| source.name == name)
    }
}
