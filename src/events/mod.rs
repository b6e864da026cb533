//! DynamoDB stream change events.
//!
//! This module contains:
//! - `ChangeEvent` / `StreamEvent`: stream payload shapes (consumed, not produced)
//! - `EventKind`: the closed set of recognized event kinds
//! - `full_record`: old/new image reconciliation
//! - `ChangeEventDispatcher`: routes reconciled records to per-kind handlers

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::store::{BoxError, Record};

mod dispatcher;
mod merge;

pub use dispatcher::{ChangeEventDispatcher, RecordHandler};
pub use merge::full_record;

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors that can occur while dispatching a change event.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unexpected event kind: {0}")]
    UnexpectedEventKind(String),

    #[error("Change event carries neither an old nor a new image")]
    MissingImages,

    #[error("Failed to decode stream image: {0}")]
    Decode(#[from] serde_dynamo::Error),

    /// Failure raised by a registered handler, surfaced unchanged.
    #[error(transparent)]
    Handler(BoxError),
}

/// Kind of change carried by a stream record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Insert,
    Modify,
    Remove,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Insert, EventKind::Modify, EventKind::Remove];

    /// Stream `eventName` for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Insert => "INSERT",
            EventKind::Modify => "MODIFY",
            EventKind::Remove => "REMOVE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "INSERT" => Ok(EventKind::Insert),
            "MODIFY" => Ok(EventKind::Modify),
            "REMOVE" => Ok(EventKind::Remove),
            other => Err(DispatchError::UnexpectedEventKind(other.to_string())),
        }
    }
}

/// Before/after images of a stream record, in DynamoDB attribute encoding.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all(deserialize = "PascalCase"))]
pub struct StreamImages {
    #[serde(default)]
    pub old_image: Option<serde_dynamo::Item>,
    #[serde(default)]
    pub new_image: Option<serde_dynamo::Item>,
}

/// A single stream record: `{ eventName, dynamodb: { OldImage?, NewImage? } }`.
///
/// `event_name` is kept as received; unknown kinds are rejected at dispatch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct ChangeEvent {
    pub event_name: String,
    #[serde(default)]
    pub dynamodb: StreamImages,
}

impl ChangeEvent {
    /// Build an event from plain records, encoding them as stream images.
    pub fn from_records(
        event_name: impl Into<String>,
        old: Option<Record>,
        new: Option<Record>,
    ) -> Result<Self> {
        Ok(Self {
            event_name: event_name.into(),
            dynamodb: StreamImages {
                old_image: old.map(serde_dynamo::to_item).transpose()?,
                new_image: new.map(serde_dynamo::to_item).transpose()?,
            },
        })
    }

    /// Parse the event kind.
    pub fn kind(&self) -> Result<EventKind> {
        self.event_name.parse()
    }

    /// Decode both images and reconcile them into the full record.
    pub fn full_record(&self) -> Result<Record> {
        let old = decode(self.dynamodb.old_image.as_ref())?;
        let new = decode(self.dynamodb.new_image.as_ref())?;
        full_record(old, new)
    }
}

fn decode(image: Option<&serde_dynamo::Item>) -> Result<Option<Record>> {
    image
        .map(|item| serde_dynamo::from_item(item.clone()))
        .transpose()
        .map_err(DispatchError::from)
}

/// Stream invocation payload: `{ "Records": [ ... ] }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all(deserialize = "PascalCase"))]
pub struct StreamEvent {
    pub records: Vec<ChangeEvent>,
}
