//! CallbackSubscriber - invokes a closure per publication

use contracts::{ContractError, Publication, Subscriber};

/// Subscriber backed by a closure
///
/// An `Err` from the closure is a delivery failure.
pub struct CallbackSubscriber<F> {
    name: String,
    callback: F,
}

impl<F> CallbackSubscriber<F>
where
    F: FnMut(&Publication) -> Result<(), String> + Send,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> Subscriber for CallbackSubscriber<F>
where
    F: FnMut(&Publication) -> Result<(), String> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&mut self, publication: &Publication) -> Result<(), ContractError> {
        (self.callback)(publication).map_err(|e| ContractError::delivery(&self.name, e))
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
