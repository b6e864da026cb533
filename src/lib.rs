//! dynamo-gateway - DynamoDB document gateway
//!
//! A thin async facade over a DynamoDB document client:
//! - `StoreGateway`: get, query, scan, update, delete, store, batch put and
//!   erase-all, each resolving to a single `Result`
//! - `ChangeEventDispatcher`: reconciles stream old/new images into one
//!   record and routes it to the handler registered for its event kind

pub mod config;
pub mod events;
pub mod store;
pub mod utils;

pub use config::GatewayConfig;
pub use events::{
    full_record, ChangeEvent, ChangeEventDispatcher, DispatchError, EventKind, RecordHandler,
    StreamEvent,
};
pub use store::{
    BoxError, DocumentClient, EraseSummary, QueryInput, Record, ScanInput, StoreError,
    StoreGateway,
};
