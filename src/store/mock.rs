//! Mock document client for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    BatchWriteItemInput, BatchWriteItemOutput, DeleteItemInput, DeleteItemOutput, DocumentClient,
    GetItemInput, GetItemOutput, PutItemInput, PutItemOutput, QueryInput, QueryOutput, Record,
    Result, ScanInput, ScanOutput, StoreError, UpdateItemInput,
};

/// Error returned by `MockDocumentClient` when a failure is armed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MockServiceError(pub String);

/// A request received by the mock, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Get(GetItemInput),
    Query(QueryInput),
    Scan(ScanInput),
    Update(UpdateItemInput),
    Delete(DeleteItemInput),
    Put(PutItemInput),
    BatchWrite(BatchWriteItemInput),
}

/// Mock document client that records every request and answers with canned
/// responses.
#[derive(Default)]
pub struct MockDocumentClient {
    calls: RwLock<Vec<RecordedCall>>,
    item: RwLock<Option<Record>>,
    items: RwLock<Vec<Record>>,
    deleted: RwLock<Option<Record>>,
    put_output: RwLock<PutItemOutput>,
    batch_output: RwLock<BatchWriteItemOutput>,
    failure: RwLock<Option<String>>,
}

impl MockDocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Item returned by `get`.
    pub async fn set_item(&self, item: Option<Record>) {
        *self.item.write().await = item;
    }

    /// Items returned by `query` and `scan`.
    pub async fn set_items(&self, items: Vec<Record>) {
        *self.items.write().await = items;
    }

    /// Attributes reported by `delete`.
    pub async fn set_deleted(&self, deleted: Option<Record>) {
        *self.deleted.write().await = deleted;
    }

    pub async fn set_put_output(&self, output: PutItemOutput) {
        *self.put_output.write().await = output;
    }

    pub async fn set_batch_output(&self, output: BatchWriteItemOutput) {
        *self.batch_output.write().await = output;
    }

    /// Make every subsequent request fail with `MockServiceError(message)`.
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.write().await = message.map(str::to_string);
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    async fn record(&self, call: RecordedCall) -> Result<()> {
        self.calls.write().await.push(call);
        match self.failure.read().await.as_ref() {
            Some(message) => Err(StoreError::client(MockServiceError(message.clone()))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentClient for MockDocumentClient {
    async fn get(&self, input: GetItemInput) -> Result<GetItemOutput> {
        self.record(RecordedCall::Get(input)).await?;
        Ok(GetItemOutput {
            item: self.item.read().await.clone(),
        })
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput> {
        self.record(RecordedCall::Query(input)).await?;
        Ok(QueryOutput {
            items: self.items.read().await.clone(),
        })
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput> {
        self.record(RecordedCall::Scan(input)).await?;
        Ok(ScanOutput {
            items: self.items.read().await.clone(),
        })
    }

    async fn update(&self, input: UpdateItemInput) -> Result<()> {
        self.record(RecordedCall::Update(input)).await
    }

    async fn delete(&self, input: DeleteItemInput) -> Result<DeleteItemOutput> {
        self.record(RecordedCall::Delete(input)).await?;
        Ok(DeleteItemOutput {
            attributes: self.deleted.read().await.clone(),
        })
    }

    async fn put(&self, input: PutItemInput) -> Result<PutItemOutput> {
        self.record(RecordedCall::Put(input)).await?;
        Ok(self.put_output.read().await.clone())
    }

    async fn batch_write(&self, input: BatchWriteItemInput) -> Result<BatchWriteItemOutput> {
        self.record(RecordedCall::BatchWrite(input)).await?;
        Ok(self.batch_output.read().await.clone())
    }
}
