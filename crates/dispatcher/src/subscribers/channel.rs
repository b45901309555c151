//! ChannelSubscriber - forwards publications into an mpsc channel

use contracts::{ContractError, Publication, Subscriber};
use tokio::sync::mpsc;

/// Subscriber that forwards into a `tokio::sync::mpsc` sender
///
/// Waits for capacity; a dropped receiver is a delivery failure.
pub struct ChannelSubscriber {
    name: String,
    tx: mpsc::Sender<Publication>,
}

impl ChannelSubscriber {
    pub fn new(name: impl Into<String>, tx: mpsc::Sender<Publication>) -> Self {
        Self {
            name: name.into(),
            tx,
        }
    }

    /// Subscriber plus the receiving end
    pub fn pair(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Publication>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(name, tx), rx)
    }
}

impl Subscriber for ChannelSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&mut self, publication: &Publication) -> Result<(), ContractError> {
        self.tx
            .send(publication.clone())
            .await
            .map_err(|_| ContractError::delivery(&self.name, "receiver dropped"))
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
