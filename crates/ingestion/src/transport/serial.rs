//! Serial device transport

use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::error::{IngestionError, Result};

use super::{Connector, FramedConnection};

/// Opens a serial device at a fixed baud rate
#[derive(Debug, Clone)]
pub struct SerialConnector {
    source_name: String,
    path: String,
    baud_rate: u32,
}

impl SerialConnector {
    pub fn new(source_name: impl Into<String>, path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            source_name: source_name.into(),
            path: path.into(),
            baud_rate,
        }
    }
}

impl Connector for SerialConnector {
    type Conn = FramedConnection<SerialStream>;

    fn endpoint(&self) -> String {
        format!("serial://{}@{}", self.path, self.baud_rate)
    }

    async fn connect(&mut self) -> Result<Self::Conn> {
        let port = tokio_serial::new(&self.path, self.baud_rate)
            .open_native_async()
            .map_err(|e| IngestionError::transport(&self.source_name, e))?;
        Ok(FramedConnection::new(self.source_name.clone(), port))
    }
}
