//! # Ingestion Pipeline
//!
//! Sensor source ingestion module.
//!
//! Responsibilities:
//! - Connect to each source (websocket, tcp, serial, replay) and reconnect
//!   with a fixed backoff when the transport drops
//! - Decode lines into samples, orientation hints and control events
//! - Apply per-axis preprocessing
//! - Send to downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::IngestionPipeline;
//!
//! let mut pipeline = IngestionPipeline::new(256);
//! for source in &blueprint.sources {
//!     pipeline.add_source_config(source)?;
//! }
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(event) = rx.recv().await {
//!     // route to the synchronizer
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::{MockConnector, MockSession, SessionEnd, ReconnectingAdapter, LineCodec};
//!
//! let connector = MockConnector::new("phone", vec![
//!     MockSession::Refuse("refused".into()),
//!     MockSession::lines([line], SessionEnd::Hold),
//! ]);
//! let adapter = ReconnectingAdapter::new("phone", connector, LineCodec::Json);
//! pipeline.add_source(Box::new(adapter))?;
//! ```

mod adapter;
mod codec;
mod config;
mod error;
mod factory;
mod framing;
mod mock;
mod pipeline;
mod preprocess;
pub mod transport;

// Re-exports
pub use adapter::{AdapterHandle, AdapterSinks, AdapterState, ReconnectingAdapter, SourceAdapter};
pub use codec::{decode_json, decode_serial_line, LineCodec, SensorMessage};
pub use config::{IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use factory::build_adapter;
pub use framing::LineFramer;
pub use mock::{MockConnection, MockConnector, MockProbe, MockSession, SessionEnd};
pub use pipeline::IngestionPipeline;
pub use preprocess::{normalize, FirFilter, Preprocessor, RcFilter, ScalarFilter};
