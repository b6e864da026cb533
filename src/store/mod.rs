//! Document store access.
//!
//! This module contains:
//! - `DocumentClient` trait: the external store client seam
//! - Request/response types mirroring the DynamoDB document API
//! - `StoreGateway`: typed operations over a `DocumentClient`
//! - Implementations: DynamoDB (feature: dynamo), Mock

use std::collections::HashMap;

use async_trait::async_trait;

mod gateway;
pub mod mock;

#[cfg(feature = "dynamo")]
pub mod dynamo;

pub use gateway::{EraseSummary, StoreGateway};
pub use mock::{MockDocumentClient, MockServiceError, RecordedCall};

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoDocumentClient;

/// Plain document: attribute name to value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Expression attribute name placeholders (`#name` -> attribute name).
pub type AttributeNames = HashMap<String, String>;

/// Boxed error carried through unchanged from a collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failure reported by the document client (auth, throttling,
    /// validation, conditional check). Display and source are the client's own.
    #[error(transparent)]
    Client(BoxError),

    #[error("Attribute conversion failed: {0}")]
    Conversion(#[from] serde_dynamo::Error),
}

impl StoreError {
    /// Wrap a client error without altering it.
    pub fn client<E: Into<BoxError>>(error: E) -> Self {
        Self::Client(error.into())
    }

    /// Borrow the underlying client error as a concrete type, if it is one.
    pub fn client_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Client(e) => e.downcast_ref::<E>(),
            Self::Conversion(_) => None,
        }
    }
}

// ============================================================================
// Request / response types
// ============================================================================

/// `GetItem` parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetItemInput {
    pub table_name: String,
    pub key: Record,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetItemOutput {
    pub item: Option<Record>,
}

/// `Query` parameters.
///
/// `scan_index_forward` defaults to `false`: newest (highest sort key) first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryInput {
    pub table_name: String,
    pub key_condition_expression: String,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: Option<AttributeNames>,
    pub expression_attribute_values: Option<Record>,
    pub scan_index_forward: bool,
    pub limit: Option<i32>,
}

impl QueryInput {
    pub fn new(table_name: impl Into<String>, key_condition_expression: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            key_condition_expression: key_condition_expression.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }

    pub fn with_names(mut self, names: AttributeNames) -> Self {
        self.expression_attribute_names = Some(names);
        self
    }

    pub fn with_values(mut self, values: Record) -> Self {
        self.expression_attribute_values = Some(values);
        self
    }

    /// Set sort order: `true` ascending, `false` descending.
    pub fn with_scan_index_forward(mut self, forward: bool) -> Self {
        self.scan_index_forward = forward;
        self
    }

    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryOutput {
    pub items: Vec<Record>,
}

/// `Scan` parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanInput {
    pub table_name: String,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: Option<AttributeNames>,
    pub expression_attribute_values: Option<Record>,
    pub limit: Option<i32>,
}

impl ScanInput {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }

    pub fn with_names(mut self, names: AttributeNames) -> Self {
        self.expression_attribute_names = Some(names);
        self
    }

    pub fn with_values(mut self, values: Record) -> Self {
        self.expression_attribute_values = Some(values);
        self
    }

    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanOutput {
    pub items: Vec<Record>,
}

/// `UpdateItem` parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateItemInput {
    pub table_name: String,
    pub key: Record,
    pub update_expression: String,
    pub expression_attribute_names: Option<AttributeNames>,
    pub expression_attribute_values: Option<Record>,
}

/// `DeleteItem` parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteItemInput {
    pub table_name: String,
    pub key: Record,
    pub condition_expression: Option<String>,
    pub expression_attribute_names: Option<AttributeNames>,
    pub expression_attribute_values: Option<Record>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteItemOutput {
    /// Attributes of the deleted item, when the client reports them.
    pub attributes: Option<Record>,
}

/// `PutItem` parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PutItemInput {
    pub table_name: String,
    pub item: Record,
}

/// Write acknowledgment for `PutItem`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PutItemOutput {
    pub attributes: Option<Record>,
    pub consumed_capacity_units: Option<f64>,
}

/// One entry of a batch write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    Put { item: Record },
    Delete { key: Record },
}

/// `BatchWriteItem` parameters, keyed by table name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchWriteItemInput {
    pub request_items: HashMap<String, Vec<WriteRequest>>,
}

impl BatchWriteItemInput {
    /// Batch targeting a single table.
    pub fn for_table(table_name: impl Into<String>, requests: Vec<WriteRequest>) -> Self {
        let mut request_items = HashMap::new();
        request_items.insert(table_name.into(), requests);
        Self { request_items }
    }
}

/// Batch write acknowledgment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchWriteItemOutput {
    pub unprocessed_items: HashMap<String, Vec<WriteRequest>>,
    /// Total capacity units consumed across all tables in the batch.
    pub consumed_capacity_units: f64,
}

impl BatchWriteItemOutput {
    /// Number of write requests the store did not process.
    pub fn unprocessed_count(&self) -> usize {
        self.unprocessed_items.values().map(Vec::len).sum()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// External document store client.
///
/// Each method issues exactly one request. Errors are returned as
/// `StoreError::Client` wrapping whatever the client produced.
///
/// Implementations:
/// - `DynamoDocumentClient`: aws-sdk-dynamodb (feature: dynamo)
/// - `MockDocumentClient`: In-memory mock for testing
#[async_trait]
pub trait DocumentClient: Send + Sync {
    async fn get(&self, input: GetItemInput) -> Result<GetItemOutput>;

    async fn query(&self, input: QueryInput) -> Result<QueryOutput>;

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput>;

    async fn update(&self, input: UpdateItemInput) -> Result<()>;

    async fn delete(&self, input: DeleteItemInput) -> Result<DeleteItemOutput>;

    async fn put(&self, input: PutItemInput) -> Result<PutItemOutput>;

    async fn batch_write(&self, input: BatchWriteItemInput) -> Result<BatchWriteItemOutput>;
}
