//! LogSubscriber - logs publication summary via tracing

use contracts::{ContractError, Publication, Subscriber};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Subscriber that logs publication summaries for debugging
pub struct LogSubscriber {
    name: String,
    /// Log every n-th publication
    every: u64,
    seen: u64,
}

impl LogSubscriber {
    /// Create a new LogSubscriber with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            every: 1,
            seen: 0,
        }
    }

    /// Create from params (`every`, default 1)
    pub fn from_params(name: impl Into<String>, params: &HashMap<String, String>) -> Self {
        let every = params
            .get("every")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);
        Self {
            every,
            ..Self::new(name)
        }
    }

    fn log_summary(&self, publication: &Publication) {
        match publication {
            Publication::Orientation(result) => info!(
                subscriber = %self.name,
                timestamp = result.timestamp,
                roll = result.euler_angles[0],
                pitch = result.euler_angles[1],
                yaw = result.euler_angles[2],
                initialising = result.flags.initialising,
                "Orientation"
            ),
            Publication::Frame(frame) => info!(
                subscriber = %self.name,
                timestamp = frame.timestamp,
                gyro = ?frame.gyro,
                accel = ?frame.accel,
                mag = ?frame.mag,
                "Frame"
            ),
        }
    }
}

impl Subscriber for LogSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_subscriber_deliver",
        skip(self, publication),
        fields(subscriber = %self.name, timestamp = publication.timestamp())
    )]
    async fn deliver(&mut self, publication: &Publication) -> Result<(), ContractError> {
        if self.seen % self.every == 0 {
            self.log_summary(publication);
        }
        self.seen += 1;
        Ok(())
    }

    #[instrument(name = "log_subscriber_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log subscriber
        Ok(())
    }

    #[instrument(name = "log_subscriber_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(subscriber = %self.name, publications = self.seen, "LogSubscriber closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FilterFlags, InternalStates, OrientationResult};

    #[tokio::test]
    async fn test_log_subscriber_deliver() {
        let mut subscriber = LogSubscriber::new("test_log");
        let result = OrientationResult {
            timestamp: 1,
            quaternion: [1.0, 0.0, 0.0, 0.0],
            euler_angles: [0.0; 3],
            internal_states: InternalStates::default(),
            flags: FilterFlags::default(),
            orientation: None,
        };

        assert!(subscriber.deliver(&result.into()).await.is_ok());
        assert_eq!(subscriber.seen, 1);
    }

    #[test]
    fn test_log_subscriber_params() {
        let mut params = HashMap::new();
        params.insert("every".to_string(), "10".to_string());
        let subscriber = LogSubscriber::from_params("my_logger", &params);
        assert_eq!(subscriber.name(), "my_logger");
        assert_eq!(subscriber.every, 10);

        params.insert("every".to_string(), "0".to_string());
        assert_eq!(LogSubscriber::from_params("x", &params).every, 1);
    }
}
