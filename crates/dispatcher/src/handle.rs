//! SubscriberHandle - runs a subscriber behind its own queue and worker task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Publication, Subscriber};

use crate::metrics::SubscriberMetrics;

/// Result of a non-blocking send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Accepted into the queue
    Queued,
    /// Queue full; the subscriber can no longer receive every publication
    Full,
    /// Worker has stopped; the subscriber should be unregistered
    Closed,
}

/// Handle to a running subscriber worker
pub struct SubscriberHandle {
    /// Subscriber name
    name: String,
    /// Channel to send publications to worker
    tx: mpsc::Sender<Publication>,
    /// Shared metrics
    metrics: Arc<SubscriberMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SubscriberHandle {
    /// Create a new SubscriberHandle and spawn the worker task
    pub fn spawn<S: Subscriber + 'static>(subscriber: S, queue_capacity: usize) -> Self {
        let name = subscriber.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SubscriberMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            subscriber_worker(subscriber, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Get subscriber name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SubscriberMetrics> {
        &self.metrics
    }

    /// Queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Whether the worker has stopped accepting publications
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a publication (non-blocking)
    pub fn try_send(&self, publication: Publication) -> SendOutcome {
        match self.tx.try_send(publication) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                SendOutcome::Queued
            }
            Err(mpsc::error::TrySendError::Full(p)) => {
                self.metrics.inc_dropped_count();
                warn!(
                    subscriber = %self.name,
                    timestamp = p.timestamp(),
                    "Queue full, subscriber cannot keep up"
                );
                SendOutcome::Full
            }
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    /// Shutdown the worker gracefully
    ///
    /// Queued publications are delivered, then the subscriber is flushed and
    /// closed.
    #[instrument(name = "subscriber_handle_shutdown", skip(self), fields(subscriber = %self.name))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(subscriber = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(subscriber = %self.name, "SubscriberHandle shutdown complete");
    }
}

/// Worker task that consumes publications and delivers them
///
/// The first delivery failure stops the worker; the distributor then
/// unregisters the subscriber.
#[instrument(
    name = "subscriber_worker_loop",
    skip(subscriber, rx, metrics),
    fields(subscriber = %name)
)]
async fn subscriber_worker<S: Subscriber>(
    mut subscriber: S,
    mut rx: mpsc::Receiver<Publication>,
    metrics: Arc<SubscriberMetrics>,
    name: String,
) {
    debug!("Subscriber worker started");

    while let Some(publication) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match subscriber.deliver(&publication).await {
            Ok(()) => metrics.inc_delivered_count(),
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    timestamp = publication.timestamp(),
                    error = %e,
                    "Delivery failed, subscriber will be unregistered"
                );
                rx.close();
                break;
            }
        }
    }

    // Cleanup
    if let Err(e) = subscriber.flush().await {
        error!(error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = subscriber.close().await {
        error!(error = %e, "Close failed on shutdown");
    }

    debug!("Subscriber worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, FrameSnapshot};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    /// Mock subscriber for testing
    struct MockSubscriber {
        name: String,
        delivered: Arc<AtomicU64>,
        closed: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MockSubscriber {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                delivered: Arc::new(AtomicU64::new(0)),
                closed: Arc::new(AtomicU64::new(0)),
                should_fail: false,
                delay_ms: 0,
            }
        }
    }

    impl Subscriber for MockSubscriber {
        fn name(&self) -> &str {
            &self.name
        }

        async fn deliver(&mut self, _publication: &Publication) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::delivery(&self.name, "mock failure"));
            }
            self.delivered.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.closed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn publication(timestamp: i64) -> Publication {
        Publication::Frame(FrameSnapshot {
            timestamp,
            gyro: [0.0; 3],
            accel: [0.0, 0.0, 1.0],
            mag: [1.0, 0.0, 0.0],
            orientation_hint: None,
        })
    }

    #[tokio::test]
    async fn test_subscriber_handle_basic() {
        let subscriber = MockSubscriber::new("test");
        let delivered = Arc::clone(&subscriber.delivered);
        let closed = Arc::clone(&subscriber.closed);

        let handle = SubscriberHandle::spawn(subscriber, 10);
        for i in 0..5 {
            assert_eq!(handle.try_send(publication(i)), SendOutcome::Queued);
        }

        handle.shutdown().await;
        assert_eq!(delivered.load(Ordering::Relaxed), 5);
        assert_eq!(closed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_subscriber_handle_queue_full() {
        let mut subscriber = MockSubscriber::new("slow");
        subscriber.delay_ms = 100;

        // Small queue capacity
        let handle = SubscriberHandle::spawn(subscriber, 2);
        assert_eq!(handle.try_send(publication(0)), SendOutcome::Queued);
        assert_eq!(handle.try_send(publication(1)), SendOutcome::Queued);
        assert_eq!(handle.try_send(publication(2)), SendOutcome::Full);

        assert_eq!(handle.metrics().dropped_count(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_failure_closes_queue() {
        let mut subscriber = MockSubscriber::new("failing");
        subscriber.should_fail = true;
        let closed = Arc::clone(&subscriber.closed);

        let handle = SubscriberHandle::spawn(subscriber, 10);
        assert_eq!(handle.try_send(publication(1)), SendOutcome::Queued);

        // Give worker time to process
        for _ in 0..50 {
            if handle.is_closed() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }

        assert!(handle.is_closed());
        assert_eq!(handle.try_send(publication(2)), SendOutcome::Closed);
        assert_eq!(handle.metrics().failure_count(), 1);

        handle.shutdown().await;
        assert_eq!(closed.load(Ordering::Relaxed), 1);
    }
}
