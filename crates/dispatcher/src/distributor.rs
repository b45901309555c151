//! Distributor - fan-out of publications to registered subscribers

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use contracts::{
    DistributorConfig, FrameSnapshot, OrientationResult, Publication, Subscriber,
    SubscriberConfig, SubscriberType,
};

use crate::error::DispatcherError;
use crate::handle::{SendOutcome, SubscriberHandle};
use crate::metrics::MetricsSnapshot;
use crate::server::{BroadcastServer, DEFAULT_BROADCAST_ADDR};
use crate::subscribers::{FileSubscriber, LogSubscriber, NetworkSubscriber};

/// Identifier returned by [`Distributor::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handles: BTreeMap<SubscriberId, SubscriberHandle>,
    servers: Vec<BroadcastServer>,
    evicted: u64,
    closed: bool,
}

/// Publication fan-out
///
/// Cheap to clone; every clone shares one registry. Broadcasting never
/// blocks: each subscriber has its own bounded queue and worker. A subscriber
/// whose queue is full is evicted, so every registered subscriber has
/// received every publication since it registered.
#[derive(Clone)]
pub struct Distributor {
    registry: Arc<Mutex<Registry>>,
    default_capacity: usize,
    publish_frames: bool,
}

impl Distributor {
    /// Create an empty distributor
    pub fn new(default_capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            default_capacity: default_capacity.max(1),
            publish_frames: false,
        }
    }

    /// Enable raw frame publication
    pub fn with_frames(mut self, publish_frames: bool) -> Self {
        self.publish_frames = publish_frames;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a subscriber with the default queue capacity
    ///
    /// Must be called from within a tokio runtime.
    pub fn register<S: Subscriber + 'static>(&self, subscriber: S) -> SubscriberId {
        self.register_with_capacity(subscriber, self.default_capacity)
    }

    /// Register a subscriber with its own queue capacity
    pub fn register_with_capacity<S: Subscriber + 'static>(
        &self,
        subscriber: S,
        queue_capacity: usize,
    ) -> SubscriberId {
        let handle = SubscriberHandle::spawn(subscriber, queue_capacity);
        let mut registry = self.lock();

        registry.next_id += 1;
        let id = SubscriberId(registry.next_id);
        if registry.closed {
            warn!(subscriber = %handle.name(), "Distributor closed, subscriber not registered");
            return id;
        }

        debug!(subscriber = %handle.name(), %id, "Subscriber registered");
        registry.handles.insert(id, handle);
        id
    }

    /// Remove a subscriber
    ///
    /// Its worker drains the queue and closes the subscriber in the
    /// background. Returns false when the id is unknown.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.lock().handles.remove(&id);
        match removed {
            Some(handle) => {
                debug!(subscriber = %handle.name(), %id, "Subscriber unregistered");
                true
            }
            None => false,
        }
    }

    /// Broadcast an orientation result
    pub fn broadcast(&self, result: OrientationResult) -> usize {
        self.publish(Publication::Orientation(result))
    }

    /// Broadcast a raw frame, when enabled
    pub fn broadcast_frame(&self, frame: FrameSnapshot) -> usize {
        if !self.publish_frames {
            return 0;
        }
        self.publish(Publication::Frame(frame))
    }

    /// Queue a publication for every subscriber
    ///
    /// Returns the number of subscribers that accepted it. Subscribers whose
    /// worker has stopped or whose queue is full are unregistered; failures
    /// never reach the caller.
    #[instrument(
        level = "trace",
        name = "distributor_publish",
        skip(self, publication),
        fields(kind = publication.kind(), timestamp = publication.timestamp())
    )]
    pub fn publish(&self, publication: Publication) -> usize {
        let mut registry = self.lock();
        let mut queued = 0;
        let mut dead = Vec::new();
        let mut lagging = Vec::new();

        for (id, handle) in &registry.handles {
            match handle.try_send(publication.clone()) {
                SendOutcome::Queued => queued += 1,
                SendOutcome::Full => lagging.push(*id),
                SendOutcome::Closed => dead.push(*id),
            }
        }

        for id in dead {
            if let Some(handle) = registry.handles.remove(&id) {
                warn!(subscriber = %handle.name(), %id, "Subscriber failed, unregistered");
            }
        }
        for id in lagging {
            if let Some(handle) = registry.handles.remove(&id) {
                registry.evicted += 1;
                warn!(
                    subscriber = %handle.name(),
                    %id,
                    queue_capacity = handle.queue_capacity(),
                    "Subscriber queue full, unregistered"
                );
            }
        }

        queued
    }

    /// Unregister every subscriber whose worker has stopped
    pub fn prune(&self) -> usize {
        let mut registry = self.lock();
        let before = registry.handles.len();
        registry.handles.retain(|id, handle| {
            let keep = !handle.is_closed();
            if !keep {
                warn!(subscriber = %handle.name(), %id, "Subscriber failed, unregistered");
            }
            keep
        });
        before - registry.handles.len()
    }

    /// Subscribers evicted so far because their queue was full
    pub fn evicted_total(&self) -> u64 {
        self.lock().evicted
    }

    /// Registered subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.lock().handles.len()
    }

    /// Metrics for all subscribers, in registration order
    pub fn metrics(&self) -> Vec<(SubscriberId, String, MetricsSnapshot)> {
        self.lock()
            .handles
            .iter()
            .map(|(id, h)| (*id, h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Keep a broadcast server alive until shutdown
    pub fn attach_server(&self, server: BroadcastServer) {
        self.lock().servers.push(server);
    }

    /// Run the distributor main loop
    ///
    /// Consumes publications until the input channel closes, then shuts
    /// every subscriber down (queued publications are still delivered).
    #[instrument(name = "distributor_run", skip(self, input_rx))]
    pub async fn run(self, mut input_rx: mpsc::Receiver<Publication>) {
        info!(subscribers = self.subscriber_count(), "Distributor started");

        let mut count: u64 = 0;
        while let Some(publication) = input_rx.recv().await {
            count += 1;
            self.publish(publication);

            if count.is_multiple_of(100) {
                debug!(publications = count, "Distributor progress");
            }
        }

        info!(publications = count, "Distributor input closed, shutting down");
        self.shutdown().await;
        info!("Distributor shutdown complete");
    }

    /// Spawn the distributor as a background task
    pub fn spawn(self, input_rx: mpsc::Receiver<Publication>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(input_rx).await;
        })
    }

    /// Stop servers, then flush and close every subscriber
    pub async fn shutdown(&self) {
        let (servers, handles) = {
            let mut registry = self.lock();
            registry.closed = true;
            (
                std::mem::take(&mut registry.servers),
                std::mem::take(&mut registry.handles),
            )
        };

        for server in servers {
            server.shutdown().await;
        }
        for (_, handle) in handles {
            handle.shutdown().await;
        }
    }
}

impl fmt::Debug for Distributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Distributor")
            .field("subscribers", &self.subscriber_count())
            .field("default_capacity", &self.default_capacity)
            .field("publish_frames", &self.publish_frames)
            .finish()
    }
}

/// Create a subscriber from configuration and register it
#[instrument(
    name = "distributor_create_subscriber",
    skip(distributor, config, default_capacity),
    fields(subscriber = %config.name, subscriber_type = ?config.subscriber_type)
)]
async fn register_from_config(
    distributor: &Distributor,
    config: &SubscriberConfig,
    default_capacity: usize,
) -> Result<(), DispatcherError> {
    let capacity = config.queue_capacity.unwrap_or(default_capacity);
    match config.subscriber_type {
        SubscriberType::Log => {
            let subscriber = LogSubscriber::from_params(&config.name, &config.params);
            distributor.register_with_capacity(subscriber, capacity);
        }
        SubscriberType::File => {
            let subscriber = FileSubscriber::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::subscriber_creation(&config.name, e.to_string()))?;
            distributor.register_with_capacity(subscriber, capacity);
        }
        SubscriberType::Network => {
            let subscriber = NetworkSubscriber::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::subscriber_creation(&config.name, e.to_string()))?;
            distributor.register_with_capacity(subscriber, capacity);
        }
        SubscriberType::WebsocketServer => {
            let addr = config
                .params
                .get("addr")
                .map(String::as_str)
                .unwrap_or(DEFAULT_BROADCAST_ADDR);
            let server =
                BroadcastServer::bind(&config.name, addr, distributor.clone(), capacity).await?;
            distributor.attach_server(server);
        }
    }
    Ok(())
}

/// Create a distributor and register every configured subscriber
#[instrument(
    name = "distributor_create",
    skip(config),
    fields(subscriber_count = config.subscribers.len())
)]
pub async fn create_distributor(config: &DistributorConfig) -> Result<Distributor, DispatcherError> {
    let distributor =
        Distributor::new(config.queue_capacity).with_frames(config.publish_raw_frames);

    for subscriber in &config.subscribers {
        if let Err(e) = register_from_config(&distributor, subscriber, config.queue_capacity).await
        {
            distributor.shutdown().await;
            return Err(e);
        }
    }

    Ok(distributor)
}
