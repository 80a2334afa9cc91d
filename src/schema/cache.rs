//! Process-wide schema cache
//!
//! One entry per table, loaded on first use and kept until explicitly
//! invalidated. Concurrent first lookups for the same table share a single
//! catalog query. Failed or empty lookups are never stored, so a transient
//! error cannot pin a table to an all-`STRING` schema.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::future::Cache;

use super::catalog;
use super::{SchemaError, SchemaMap, TableRef, TableSchema};
use crate::cache::CachePolicy;
use crate::data::ColumnType;
use crate::warehouse::Warehouse;

pub struct SchemaCache {
    warehouse: Arc<dyn Warehouse>,
    project: String,
    dataset: String,
    cache: Cache<TableRef, Arc<TableSchema>>,
    /// Catalog queries issued
    loads: AtomicU64,
}

impl SchemaCache {
    /// Cache for tables of `project.dataset`
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        project: impl Into<String>,
        dataset: impl Into<String>,
    ) -> Self {
        Self {
            warehouse,
            project: project.into(),
            dataset: dataset.into(),
            cache: CachePolicy::permanent().build_async(),
            loads: AtomicU64::new(0),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Reference to `table` in the default project and dataset
    pub fn table_ref(&self, table: &str) -> TableRef {
        TableRef::new(&self.project, &self.dataset, table)
    }

    /// Schema of `table` in the default project and dataset
    pub async fn get_table(&self, table: &str) -> Result<Arc<TableSchema>, SchemaError> {
        self.get(&self.table_ref(table)).await
    }

    /// Schema of any table, loading it from the catalog on first use
    pub async fn get(&self, table: &TableRef) -> Result<Arc<TableSchema>, SchemaError> {
        table.validate()?;

        if let Some(schema) = self.cache.get(table).await {
            return Ok(schema);
        }

        self.cache
            .try_get_with(table.clone(), self.load(table))
            .await
            .map_err(|e| (*e).clone())
    }

    async fn load(&self, table: &TableRef) -> Result<Arc<TableSchema>, SchemaError> {
        self.loads.fetch_add(1, Ordering::Relaxed);

        let columns = catalog::fetch_columns(self.warehouse.as_ref(), table)
            .await
            .map_err(|source| {
                tracing::warn!(table = %table, error = %source, "Schema lookup failed");
                SchemaError::Catalog {
                    table: table.qualified(),
                    source,
                }
            })?;

        if columns.is_empty() {
            return Err(SchemaError::TableNotFound(table.qualified()));
        }

        let schema: SchemaMap = columns
            .into_iter()
            .map(|c| {
                let ty = ColumnType::normalize(&c.data_type);
                (c.name, ty)
            })
            .collect();

        tracing::info!(table = %table, columns = schema.len(), "Loaded table schema");

        Ok(Arc::new(TableSchema {
            table_ref: table.clone(),
            columns: schema,
        }))
    }

    /// Drop a cached schema so the next lookup reloads it (after a migration)
    pub async fn invalidate(&self, table: &TableRef) -> bool {
        self.cache.remove(table).await.is_some()
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn contains(&self, table: &TableRef) -> bool {
        self.cache.contains_key(table)
    }

    /// Number of catalog queries issued so far
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}
