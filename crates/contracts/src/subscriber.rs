//! Subscriber trait - Distributor output interface

use crate::{ContractError, Publication};

/// Publication consumer
///
/// All subscriber implementations must implement this trait.
#[trait_variant::make(Subscriber: Send)]
pub trait LocalSubscriber {
    /// Subscriber name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one publication
    ///
    /// # Errors
    /// A delivery error unregisters the subscriber.
    async fn deliver(&mut self, publication: &Publication) -> Result<(), ContractError>;

    /// Flush buffered output (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close subscriber
    async fn close(&mut self) -> Result<(), ContractError>;
}
