//! Explicit state of one admin session: which table, if any, is selected.

use tracing::info;

use super::catalog::{Item, TableCatalog};
use super::error::{AdminError, Result};
use crate::dynamo::Capacity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedTable {
    pub name: String,
    pub primary_key: String,
}

/// How a table came to be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Existing,
    Created,
}

#[derive(Debug, Default)]
pub struct Session {
    selected: Option<SelectedTable>,
}

impl Session {
    pub fn selected(&self) -> Option<&SelectedTable> {
        self.selected.as_ref()
    }

    fn require_table(&self) -> Result<&SelectedTable> {
        self.selected.as_ref().ok_or(AdminError::NoTableSelected)
    }

    /// Selects `name`, creating it when missing. The key name is only asked for
    /// when a table has to be created; an existing table keeps its real hash key.
    pub async fn select_or_create<F>(
        &mut self,
        catalog: &dyn TableCatalog,
        name: &str,
        key_for_new: F,
    ) -> Result<Selection>
    where
        F: FnOnce() -> Result<String>,
    {
        let name = non_empty(name, "테이블 이름")?;
        if let Some(primary_key) = catalog.hash_key(name).await? {
            self.selected = Some(SelectedTable {
                name: name.to_string(),
                primary_key,
            });
            return Ok(Selection::Existing);
        }

        let key = key_for_new()?;
        self.create(catalog, name, &key, Capacity::default()).await?;
        Ok(Selection::Created)
    }

    /// Creates a table and selects it.
    pub async fn create(
        &mut self,
        catalog: &dyn TableCatalog,
        name: &str,
        primary_key: &str,
        capacity: Capacity,
    ) -> Result<()> {
        let name = non_empty(name, "테이블 이름")?;
        let primary_key = non_empty(primary_key, "기본 키 이름")?;
        catalog.create_table(name, primary_key, capacity).await?;
        info!(table = name, key = primary_key, "table created");
        self.selected = Some(SelectedTable {
            name: name.to_string(),
            primary_key: primary_key.to_string(),
        });
        Ok(())
    }

    pub async fn scan(&self, catalog: &dyn TableCatalog) -> Result<Vec<Item>> {
        let table = self.require_table()?;
        catalog.scan(&table.name).await
    }

    pub async fn put(
        &self,
        catalog: &dyn TableCatalog,
        key: &str,
        attributes: &[(String, String)],
    ) -> Result<()> {
        let table = self.require_table()?;
        let key = non_empty(key, "항목 키 값")?;
        catalog
            .put_item(&table.name, &table.primary_key, key, attributes)
            .await
    }

    pub async fn get(&self, catalog: &dyn TableCatalog, key: &str) -> Result<Item> {
        let table = self.require_table()?;
        let key = non_empty(key, "항목 키 값")?;
        catalog
            .get_item(&table.name, &table.primary_key, key)
            .await?
            .ok_or_else(|| AdminError::ItemNotFound(key.to_string()))
    }

    pub async fn update(
        &self,
        catalog: &dyn TableCatalog,
        key: &str,
        attribute: &str,
        value: &str,
    ) -> Result<()> {
        let table = self.require_table()?;
        let key = non_empty(key, "항목 키 값")?;
        let attribute = non_empty(attribute, "속성 이름")?;
        if attribute == table.primary_key {
            return Err(AdminError::KeyAttributeImmutable(attribute.to_string()));
        }
        catalog
            .update_attribute(&table.name, &table.primary_key, key, attribute, value)
            .await
    }

    pub async fn delete_item(&self, catalog: &dyn TableCatalog, key: &str) -> Result<()> {
        let table = self.require_table()?;
        let key = non_empty(key, "항목 키 값")?;
        catalog
            .delete_item(&table.name, &table.primary_key, key)
            .await
    }

    /// The table the next [`Session::delete_table`] would drop.
    pub fn table_to_delete(&self) -> Result<&str> {
        Ok(&self.require_table()?.name)
    }

    /// Drops the selected table and clears the selection. Returns the dropped name.
    pub async fn delete_table(&mut self, catalog: &dyn TableCatalog) -> Result<String> {
        let name = self.require_table()?.name.clone();
        match catalog.delete_table(&name).await {
            Ok(()) | Err(AdminError::TableNotFound(_)) => {
                self.selected = None;
            }
            Err(e) => return Err(e),
        }
        info!(table = %name, "table deleted");
        Ok(name)
    }
}

fn non_empty<'a>(value: &'a str, field: &'static str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AdminError::EmptyInput(field))
    } else {
        Ok(trimmed)
    }
}
