use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::catalog::{Item, TableCatalog};
use super::error::{AdminError, Result};
use crate::dynamo::Capacity;

struct MemoryTable {
    key: String,
    range_key: Option<String>,
    items: BTreeMap<String, Item>,
}

/// In-process catalog with the same not-found and conflict rules as DynamoDB.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: Mutex<HashMap<String, MemoryTable>>,
}

impl MemoryCatalog {
    pub fn insert_table(&self, name: &str, key: &str) {
        self.insert(name, key, None);
    }

    pub fn insert_composite_table(&self, name: &str, key: &str, range_key: &str) {
        self.insert(name, key, Some(range_key.to_string()));
    }

    fn insert(&self, name: &str, key: &str, range_key: Option<String>) {
        self.tables.lock().unwrap().insert(
            name.to_string(),
            MemoryTable {
                key: key.to_string(),
                range_key,
                items: BTreeMap::new(),
            },
        );
    }

    pub fn key_of(&self, name: &str) -> Option<String> {
        self.tables.lock().unwrap().get(name).map(|t| t.key.clone())
    }

    fn with_table<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut MemoryTable) -> Result<T>,
    ) -> Result<T> {
        let mut tables = self.tables.lock().unwrap();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| AdminError::TableNotFound(name.to_string()))?;
        f(table)
    }
}

#[async_trait]
impl TableCatalog for MemoryCatalog {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tables.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn hash_key(&self, table: &str) -> Result<Option<String>> {
        match self.tables.lock().unwrap().get(table) {
            Some(t) if t.range_key.is_some() => {
                Err(AdminError::CompositeKeyUnsupported(table.to_string()))
            }
            Some(t) => Ok(Some(t.key.clone())),
            None => Ok(None),
        }
    }

    async fn create_table(&self, table: &str, key: &str, _capacity: Capacity) -> Result<()> {
        if self.key_of(table).is_some() {
            return Err(AdminError::TableExists(table.to_string()));
        }
        self.insert_table(table, key);
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| AdminError::TableNotFound(table.to_string()))
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>> {
        self.with_table(table, |t| Ok(t.items.values().cloned().collect()))
    }

    async fn get_item(&self, table: &str, _key_name: &str, key: &str) -> Result<Option<Item>> {
        self.with_table(table, |t| Ok(t.items.get(key).cloned()))
    }

    async fn put_item(
        &self,
        table: &str,
        key_name: &str,
        key: &str,
        attributes: &[(String, String)],
    ) -> Result<()> {
        self.with_table(table, |t| {
            let mut item: Item = attributes
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            item.insert(key_name.to_string(), Value::String(key.to_string()));
            t.items.insert(key.to_string(), item);
            Ok(())
        })
    }

    async fn update_attribute(
        &self,
        table: &str,
        _key_name: &str,
        key: &str,
        attribute: &str,
        value: &str,
    ) -> Result<()> {
        self.with_table(table, |t| {
            let item = t
                .items
                .get_mut(key)
                .ok_or_else(|| AdminError::ItemNotFound(key.to_string()))?;
            item.insert(attribute.to_string(), Value::String(value.to_string()));
            Ok(())
        })
    }

    async fn delete_item(&self, table: &str, _key_name: &str, key: &str) -> Result<()> {
        self.with_table(table, |t| {
            t.items
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| AdminError::ItemNotFound(key.to_string()))
        })
    }
}
