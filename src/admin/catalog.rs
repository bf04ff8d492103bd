//! Table operations the admin tool needs, and their DynamoDB implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{AttributeValue, KeyType},
    Client,
};
use serde_json::{Map, Value};
use tracing::debug;

use super::error::{AdminError, Result};
use crate::dynamo::{self, sdk_message, Capacity, Created};

/// An item rendered for display.
pub type Item = Map<String, Value>;

#[async_trait]
pub trait TableCatalog: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Hash key attribute name of `table`, or `None` if the table does not exist.
    /// Tables that also have a range key fail with [`AdminError::CompositeKeyUnsupported`].
    async fn hash_key(&self, table: &str) -> Result<Option<String>>;

    /// Fails with [`AdminError::TableExists`] instead of touching an existing table.
    async fn create_table(&self, table: &str, key: &str, capacity: Capacity) -> Result<()>;

    async fn delete_table(&self, table: &str) -> Result<()>;

    async fn scan(&self, table: &str) -> Result<Vec<Item>>;

    async fn get_item(&self, table: &str, key_name: &str, key: &str) -> Result<Option<Item>>;

    async fn put_item(
        &self,
        table: &str,
        key_name: &str,
        key: &str,
        attributes: &[(String, String)],
    ) -> Result<()>;

    /// Sets one attribute on an existing item.
    async fn update_attribute(
        &self,
        table: &str,
        key_name: &str,
        key: &str,
        attribute: &str,
        value: &str,
    ) -> Result<()>;

    async fn delete_item(&self, table: &str, key_name: &str, key: &str) -> Result<()>;
}

pub struct DynamoCatalog {
    client: Client,
}

impl DynamoCatalog {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn backend<E: std::error::Error>(err: &E) -> AdminError {
    AdminError::Backend(sdk_message(err))
}

#[async_trait]
impl TableCatalog for DynamoCatalog {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let out = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(|e| backend(&e))?;
            names.extend(out.table_names().iter().cloned());
            match out.last_evaluated_table_name() {
                Some(last) => start = Some(last.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    async fn hash_key(&self, table: &str) -> Result<Option<String>> {
        match self.client.describe_table().table_name(table).send().await {
            Ok(out) => {
                let schema = out.table().map(|t| t.key_schema()).unwrap_or_default();
                if schema.iter().any(|k| k.key_type() == &KeyType::Range) {
                    return Err(AdminError::CompositeKeyUnsupported(table.to_string()));
                }
                Ok(schema
                    .iter()
                    .find(|k| k.key_type() == &KeyType::Hash)
                    .map(|k| k.attribute_name().to_string()))
            }
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false) =>
            {
                Ok(None)
            }
            Err(err) => Err(backend(&err)),
        }
    }

    async fn create_table(&self, table: &str, key: &str, capacity: Capacity) -> Result<()> {
        match dynamo::create_hash_key_table(&self.client, table, key, capacity).await {
            Ok(Created::Created) => Ok(()),
            Ok(Created::AlreadyExists) => Err(AdminError::TableExists(table.to_string())),
            Err(e) => Err(AdminError::Backend(format!("{:#}", e))),
        }
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        match self.client.delete_table().table_name(table).send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false) =>
            {
                Err(AdminError::TableNotFound(table.to_string()))
            }
            Err(err) => Err(backend(&err)),
        }
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start: Option<HashMap<String, AttributeValue>> = None;
        loop {
            let out = match self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start.take())
                .send()
                .await
            {
                Ok(out) => out,
                Err(err)
                    if err
                        .as_service_error()
                        .map(|e| e.is_resource_not_found_exception())
                        .unwrap_or(false) =>
                {
                    return Err(AdminError::TableNotFound(table.to_string()))
                }
                Err(err) => return Err(backend(&err)),
            };
            items.extend(out.items().iter().map(dynamo::item_to_json));
            match out.last_evaluated_key() {
                Some(key) if !key.is_empty() => start = Some(key.clone()),
                _ => break,
            }
        }
        debug!(table, count = items.len(), "scan complete");
        Ok(items)
    }

    async fn get_item(&self, table: &str, key_name: &str, key: &str) -> Result<Option<Item>> {
        let out = self
            .client
            .get_item()
            .table_name(table)
            .key(key_name, AttributeValue::S(key.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| backend(&e))?;
        Ok(out.item().map(dynamo::item_to_json))
    }

    async fn put_item(
        &self,
        table: &str,
        key_name: &str,
        key: &str,
        attributes: &[(String, String)],
    ) -> Result<()> {
        let mut item: HashMap<String, AttributeValue> = attributes
            .iter()
            .map(|(k, v)| (k.clone(), AttributeValue::S(v.clone())))
            .collect();
        item.insert(key_name.to_string(), AttributeValue::S(key.to_string()));

        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| backend(&e))?;
        Ok(())
    }

    async fn update_attribute(
        &self,
        table: &str,
        key_name: &str,
        key: &str,
        attribute: &str,
        value: &str,
    ) -> Result<()> {
        // Placeholders keep reserved words such as `value` usable as attribute names.
        let result = self
            .client
            .update_item()
            .table_name(table)
            .key(key_name, AttributeValue::S(key.to_string()))
            .update_expression("SET #attr = :val")
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#attr", attribute)
            .expression_attribute_names("#pk", key_name)
            .expression_attribute_values(":val", AttributeValue::S(value.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                Err(AdminError::ItemNotFound(key.to_string()))
            }
            Err(err) => Err(backend(&err)),
        }
    }

    async fn delete_item(&self, table: &str, key_name: &str, key: &str) -> Result<()> {
        let result = self
            .client
            .delete_item()
            .table_name(table)
            .key(key_name, AttributeValue::S(key.to_string()))
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", key_name)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                Err(AdminError::ItemNotFound(key.to_string()))
            }
            Err(err) => Err(backend(&err)),
        }
    }
}
