//! Builds adapters from source configuration

use std::time::Duration;

use contracts::{SourceConfig, SourceKind};

use crate::adapter::{ReconnectingAdapter, SourceAdapter};
use crate::codec::LineCodec;
use crate::transport::{ReplayConnector, SerialConnector, TcpConnector, WebSocketConnector};

/// Create the adapter described by `config`
pub fn build_adapter(config: &SourceConfig) -> Box<dyn SourceAdapter> {
    let name = config.name.as_str();
    let codec = LineCodec::from(config.kind.codec());

    match &config.kind {
        SourceKind::Websocket {
            address,
            sensor_types,
        } => configure(
            ReconnectingAdapter::new(name, WebSocketConnector::new(name, address, sensor_types), codec),
            config,
        ),
        SourceKind::Tcp { address, .. } => configure(
            ReconnectingAdapter::new(name, TcpConnector::new(name, address.as_str()), codec),
            config,
        ),
        SourceKind::Serial { path, baud_rate } => configure(
            ReconnectingAdapter::new(
                name,
                SerialConnector::new(name, path.as_str(), *baud_rate),
                codec,
            ),
            config,
        ),
        SourceKind::Replay {
            path, interval_ms, ..
        } => configure(
            ReconnectingAdapter::new(
                name,
                ReplayConnector::new(name, path.as_str(), Duration::from_millis(*interval_ms)),
                codec,
            ),
            config,
        ),
    }
}

fn configure<C: crate::transport::Connector>(
    adapter: ReconnectingAdapter<C>,
    config: &SourceConfig,
) -> Box<dyn SourceAdapter> {
    Box::new(
        adapter
            .with_reconnect(config.reconnect)
            .with_preprocess(&config.preprocess),
    )
}
