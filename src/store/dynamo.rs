//! DynamoDB document client.
//!
//! Converts plain `Record`s to and from DynamoDB attribute maps with
//! `serde_dynamo` and forwards each request to `aws_sdk_dynamodb::Client`.
//! SDK errors are passed through as `StoreError::Client` untouched.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::types::{
    AttributeValue, ConsumedCapacity, DeleteRequest, PutRequest, ReturnConsumedCapacity,
    ReturnValue, WriteRequest as SdkWriteRequest,
};
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, from_items, to_item};
use tracing::info;

use super::{
    BatchWriteItemInput, BatchWriteItemOutput, DeleteItemInput, DeleteItemOutput, DocumentClient,
    GetItemInput, GetItemOutput, PutItemInput, PutItemOutput, QueryInput, QueryOutput, Record,
    Result, ScanInput, ScanOutput, StoreError, UpdateItemInput, WriteRequest,
};
use crate::config::GatewayConfig;

type Item = HashMap<String, AttributeValue>;

/// `DocumentClient` backed by the AWS SDK.
#[derive(Clone)]
pub struct DynamoDocumentClient {
    client: Client,
}

impl DynamoDocumentClient {
    /// Build a client from configuration.
    ///
    /// Region falls back to the default provider chain (`AWS_REGION`,
    /// `AWS_DEFAULT_REGION`) when not set. A profile only swaps credentials
    /// for that shared-credentials entry; it never supplies the region.
    pub async fn connect(config: &GatewayConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(ref region) = config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }

        if let Some(ref profile) = config.profile {
            loader = loader.credentials_provider(
                ProfileFileCredentialsProvider::builder()
                    .profile_name(profile)
                    .build(),
            );
        }

        if let Some(ref endpoint) = config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        info!(
            region = ?sdk_config.region(),
            profile = ?config.profile,
            endpoint = ?config.endpoint_url,
            "Connected to DynamoDB"
        );

        Self::with_client(Client::new(&sdk_config))
    }

    /// Create with explicit client (for testing).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_attributes(record: Record) -> Result<Item> {
    Ok(to_item(record)?)
}

fn to_optional_attributes(record: Option<Record>) -> Result<Option<Item>> {
    record.map(to_attributes).transpose()
}

fn from_attributes(item: Item) -> Result<Record> {
    Ok(from_item(item)?)
}

fn capacity_units(consumed: &[ConsumedCapacity]) -> f64 {
    consumed.iter().filter_map(|c| c.capacity_units()).sum()
}

fn to_sdk_write_request(request: WriteRequest) -> Result<SdkWriteRequest> {
    let built = match request {
        WriteRequest::Put { item } => SdkWriteRequest::builder()
            .put_request(
                PutRequest::builder()
                    .set_item(Some(to_attributes(item)?))
                    .build()
                    .map_err(StoreError::client)?,
            )
            .build(),
        WriteRequest::Delete { key } => SdkWriteRequest::builder()
            .delete_request(
                DeleteRequest::builder()
                    .set_key(Some(to_attributes(key)?))
                    .build()
                    .map_err(StoreError::client)?,
            )
            .build(),
    };
    Ok(built)
}

fn from_sdk_write_request(request: &SdkWriteRequest) -> Result<Option<WriteRequest>> {
    if let Some(put) = request.put_request() {
        return Ok(Some(WriteRequest::Put {
            item: from_attributes(put.item().clone())?,
        }));
    }
    if let Some(delete) = request.delete_request() {
        return Ok(Some(WriteRequest::Delete {
            key: from_attributes(delete.key().clone())?,
        }));
    }
    Ok(None)
}

#[async_trait]
impl DocumentClient for DynamoDocumentClient {
    async fn get(&self, input: GetItemInput) -> Result<GetItemOutput> {
        let output = self
            .client
            .get_item()
            .table_name(input.table_name)
            .set_key(Some(to_attributes(input.key)?))
            .send()
            .await
            .map_err(StoreError::client)?;

        Ok(GetItemOutput {
            item: output.item.map(from_attributes).transpose()?,
        })
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput> {
        let output = self
            .client
            .query()
            .table_name(input.table_name)
            .key_condition_expression(input.key_condition_expression)
            .set_filter_expression(input.filter_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(to_optional_attributes(
                input.expression_attribute_values,
            )?)
            .scan_index_forward(input.scan_index_forward)
            .set_limit(input.limit)
            .send()
            .await
            .map_err(StoreError::client)?;

        Ok(QueryOutput {
            items: from_items(output.items.unwrap_or_default())?,
        })
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput> {
        let output = self
            .client
            .scan()
            .table_name(input.table_name)
            .set_filter_expression(input.filter_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(to_optional_attributes(
                input.expression_attribute_values,
            )?)
            .set_limit(input.limit)
            .send()
            .await
            .map_err(StoreError::client)?;

        Ok(ScanOutput {
            items: from_items(output.items.unwrap_or_default())?,
        })
    }

    async fn update(&self, input: UpdateItemInput) -> Result<()> {
        self.client
            .update_item()
            .table_name(input.table_name)
            .set_key(Some(to_attributes(input.key)?))
            .update_expression(input.update_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(to_optional_attributes(
                input.expression_attribute_values,
            )?)
            .send()
            .await
            .map_err(StoreError::client)?;

        Ok(())
    }

    async fn delete(&self, input: DeleteItemInput) -> Result<DeleteItemOutput> {
        // ALL_OLD so the deleted item is reported back to the caller.
        let output = self
            .client
            .delete_item()
            .table_name(input.table_name)
            .set_key(Some(to_attributes(input.key)?))
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(to_optional_attributes(
                input.expression_attribute_values,
            )?)
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(StoreError::client)?;

        Ok(DeleteItemOutput {
            attributes: output.attributes.map(from_attributes).transpose()?,
        })
    }

    async fn put(&self, input: PutItemInput) -> Result<PutItemOutput> {
        let output = self
            .client
            .put_item()
            .table_name(input.table_name)
            .set_item(Some(to_attributes(input.item)?))
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await
            .map_err(StoreError::client)?;

        Ok(PutItemOutput {
            attributes: output.attributes.map(from_attributes).transpose()?,
            consumed_capacity_units: output
                .consumed_capacity
                .as_ref()
                .and_then(|c| c.capacity_units()),
        })
    }

    async fn batch_write(&self, input: BatchWriteItemInput) -> Result<BatchWriteItemOutput> {
        let mut request_items = HashMap::with_capacity(input.request_items.len());
        for (table, requests) in input.request_items {
            let converted = requests
                .into_iter()
                .map(to_sdk_write_request)
                .collect::<Result<Vec<_>>>()?;
            request_items.insert(table, converted);
        }

        let output = self
            .client
            .batch_write_item()
            .set_request_items(Some(request_items))
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await
            .map_err(StoreError::client)?;

        let mut unprocessed_items = HashMap::new();
        for (table, requests) in output.unprocessed_items.unwrap_or_default() {
            let mut converted = Vec::with_capacity(requests.len());
            for request in &requests {
                if let Some(request) = from_sdk_write_request(request)? {
                    converted.push(request);
                }
            }
            unprocessed_items.insert(table, converted);
        }

        Ok(BatchWriteItemOutput {
            unprocessed_items,
            consumed_capacity_units: capacity_units(
                output.consumed_capacity.as_deref().unwrap_or_default(),
            ),
        })
    }
}
