//! Store gateway.
//!
//! Stateless translation of table operations into `DocumentClient` requests.
//! One request per call, except `erase_all` (scan, then at most one batch).

use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    AttributeNames, BatchWriteItemInput, BatchWriteItemOutput, DeleteItemInput, DocumentClient,
    GetItemInput, PutItemInput, PutItemOutput, QueryInput, Record, Result, ScanInput,
    UpdateItemInput, WriteRequest,
};


/// Outcome of `StoreGateway::erase_all`.
///
/// `deleted` is the capacity units the batch delete consumed, as reported by
/// the store. It is not an item count.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EraseSummary {
    pub deleted: f64,
    pub unprocessed: usize,
}

/// Typed facade over a document store client.
///
/// Cheap to clone; clones share the same client.
#[derive(Clone)]
pub struct StoreGateway {
    client: Arc<dyn DocumentClient>,
}

impl StoreGateway {
    /// Create a gateway over an existing client.
    pub fn new(client: Arc<dyn DocumentClient>) -> Self {
        Self { client }
    }

    /// Connect to DynamoDB using the given configuration.
    #[cfg(feature = "dynamo")]
    pub async fn connect(config: &crate::config::GatewayConfig) -> Self {
        let client = super::DynamoDocumentClient::connect(config).await;
        Self::new(Arc::new(client))
    }

    /// Fetch a single item by key.
    pub async fn get(&self, table_name: &str, key: Record) -> Result<Option<Record>> {
        debug!(table = %table_name, operation = "get", "Forwarding to document client");

        let output = self
            .client
            .get(GetItemInput {
                table_name: table_name.to_string(),
                key,
            })
            .await?;

        Ok(output.item)
    }

    /// Run a key-condition query. Items come back in the client's order.
    pub async fn query(&self, input: QueryInput) -> Result<Vec<Record>> {
        debug!(
            table = %input.table_name,
            operation = "query",
            forward = input.scan_index_forward,
            limit = ?input.limit,
            "Forwarding to document client"
        );

        Ok(self.client.query(input).await?.items)
    }

    /// Scan the whole table, optionally filtered.
    pub async fn scan(&self, input: ScanInput) -> Result<Vec<Record>> {
        debug!(
            table = %input.table_name,
            operation = "scan",
            limit = ?input.limit,
            "Forwarding to document client"
        );

        Ok(self.client.scan(input).await?.items)
    }

    /// Apply an update expression to one item.
    pub async fn update(
        &self,
        table_name: &str,
        key: Record,
        update_expression: &str,
        names: Option<AttributeNames>,
        values: Option<Record>,
    ) -> Result<()> {
        debug!(table = %table_name, operation = "update", "Forwarding to document client");

        self.client
            .update(UpdateItemInput {
                table_name: table_name.to_string(),
                key,
                update_expression: update_expression.to_string(),
                expression_attribute_names: names,
                expression_attribute_values: values,
            })
            .await
    }

    /// Conditionally delete one item.
    ///
    /// Returns the deleted records the client reports. A failed condition
    /// surfaces as the client's error.
    pub async fn delete(
        &self,
        table_name: &str,
        key: Record,
        condition_expression: Option<&str>,
        names: Option<AttributeNames>,
        values: Option<Record>,
    ) -> Result<Vec<Record>> {
        debug!(table = %table_name, operation = "delete", "Forwarding to document client");

        let output = self
            .client
            .delete(DeleteItemInput {
                table_name: table_name.to_string(),
                key,
                condition_expression: condition_expression.map(str::to_string),
                expression_attribute_names: names,
                expression_attribute_values: values,
            })
            .await?;

        Ok(output.attributes.into_iter().collect())
    }

    /// Unconditional upsert of a full record.
    pub async fn store(&self, table_name: &str, record: Record) -> Result<PutItemOutput> {
        debug!(table = %table_name, operation = "store", "Forwarding to document client");

        self.client
            .put(PutItemInput {
                table_name: table_name.to_string(),
                item: record,
            })
            .await
    }

    /// Write all records in a single batch call.
    pub async fn batch_put(
        &self,
        table_name: &str,
        records: Vec<Record>,
    ) -> Result<BatchWriteItemOutput> {
        debug!(
            table = %table_name,
            operation = "batch_put",
            count = records.len(),
            "Forwarding to document client"
        );

        let requests = records
            .into_iter()
            .map(|item| WriteRequest::Put { item })
            .collect();

        self.client
            .batch_write(BatchWriteItemInput::for_table(table_name, requests))
            .await
    }

    /// Delete every item in the table: one scan, then one batch delete.
    ///
    /// Keys are rebuilt from each scanned item using `key_attribute` and,
    /// for tables with a sort key, `range_attribute`. An empty scan returns
    /// a zero summary without issuing the batch call.
    pub async fn erase_all(
        &self,
        table_name: &str,
        key_attribute: &str,
        range_attribute: Option<&str>,
    ) -> Result<EraseSummary> {
        let items = self.client.scan(ScanInput::new(table_name)).await?.items;

        if items.is_empty() {
            debug!(table = %table_name, operation = "erase_all", "Nothing to erase");
            return Ok(EraseSummary::default());
        }

        let requests: Vec<WriteRequest> = items
            .iter()
            .map(|item| WriteRequest::Delete {
                key: key_of(item, key_attribute, range_attribute),
            })
            .collect();

        debug!(
            table = %table_name,
            operation = "erase_all",
            count = requests.len(),
            "Issuing batch delete"
        );

        let output = self
            .client
            .batch_write(BatchWriteItemInput::for_table(table_name, requests))
            .await?;

        let summary = EraseSummary {
            deleted: output.consumed_capacity_units,
            unprocessed: output.unprocessed_count(),
        };

        if summary.unprocessed > 0 {
            warn!(
                table = %table_name,
                unprocessed = summary.unprocessed,
                "Batch delete left unprocessed keys"
            );
        }

        Ok(summary)
    }
}

/// Project an item down to its primary key attributes.
fn key_of(item: &Record, key_attribute: &str, range_attribute: Option<&str>) -> Record {
    std::iter::once(key_attribute)
        .chain(range_attribute)
        .filter_map(|name| item.get(name).map(|v| (name.to_string(), v.clone())))
        .collect()
}
