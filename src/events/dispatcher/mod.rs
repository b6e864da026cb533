//! Change event dispatch.
//!
//! One handler slot per `EventKind`. Slots start unregistered; dispatching to
//! an unregistered slot completes immediately with success.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ChangeEvent, DispatchError, EventKind, Result, StreamEvent};
use crate::store::{BoxError, Record};

#[cfg(test)]
mod tests;

/// Handler for reconciled change records.
///
/// Implemented for any `Fn(Record) -> impl Future<Output = Result<(), BoxError>>`.
pub trait RecordHandler: Send + Sync {
    /// Process the full record of one change event.
    fn handle(&self, record: Record) -> BoxFuture<'static, std::result::Result<(), BoxError>>;
}

impl<F, Fut> RecordHandler for F
where
    F: Fn(Record) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
{
    fn handle(&self, record: Record) -> BoxFuture<'static, std::result::Result<(), BoxError>> {
        Box::pin(self(record))
    }
}

/// Routes change events to the handler registered for their kind.
#[derive(Default)]
pub struct ChangeEventDispatcher {
    handlers: RwLock<HashMap<EventKind, Arc<dyn RecordHandler>>>,
}

impl ChangeEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub async fn register<H>(&self, kind: EventKind, handler: H)
    where
        H: RecordHandler + 'static,
    {
        let replaced = self
            .handlers
            .write()
            .await
            .insert(kind, Arc::new(handler))
            .is_some();
        debug!(kind = %kind, replaced, "Registered change handler");
    }

    pub async fn on_insert<H: RecordHandler + 'static>(&self, handler: H) {
        self.register(EventKind::Insert, handler).await;
    }

    pub async fn on_modify<H: RecordHandler + 'static>(&self, handler: H) {
        self.register(EventKind::Modify, handler).await;
    }

    pub async fn on_remove<H: RecordHandler + 'static>(&self, handler: H) {
        self.register(EventKind::Remove, handler).await;
    }

    /// Return `kind` to the unregistered (no-op) state.
    pub async fn unregister(&self, kind: EventKind) {
        self.handlers.write().await.remove(&kind);
    }

    pub async fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.read().await.contains_key(&kind)
    }

    /// Dispatch one change event.
    ///
    /// Unknown kinds fail before any image is decoded or handler invoked.
    /// The handler's error is returned unchanged as `DispatchError::Handler`.
    pub async fn dispatch(&self, event: ChangeEvent) -> Result<()> {
        let kind = event.kind()?;
        let record = event.full_record()?;

        // Clone out of the lock so a slow handler doesn't block registration.
        let handler = self.handlers.read().await.get(&kind).cloned();

        match handler {
            Some(handler) => {
                debug!(kind = %kind, "Dispatching change event");
                handler.handle(record).await.map_err(DispatchError::Handler)
            }
            None => {
                debug!(kind = %kind, "No handler registered, skipping");
                Ok(())
            }
        }
    }

    /// Dispatch every record of a stream invocation, in order.
    ///
    /// Stops at the first failure. Returns the number of events dispatched.
    pub async fn process_batch(&self, batch: StreamEvent) -> Result<usize> {
        let total = batch.records.len();
        let mut dispatched = 0;

        for event in batch.records {
            self.dispatch(event).await?;
            dispatched += 1;
        }

        debug!(total, dispatched, "Processed stream batch");
        Ok(dispatched)
    }
}
