//! In-memory warehouse
//!
//! Serves catalog lookups from registered table definitions and returns the
//! registered rows for any statement that references a table. Predicates are
//! not evaluated. Every executed statement is recorded so callers can assert
//! on the SQL and parameters that reached the warehouse.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Params, Warehouse, WarehouseError};
use crate::data::{Row, Value};

#[derive(Debug, Clone)]
struct MemoryTable {
    /// (column_name, data_type, is_nullable)
    columns: Vec<(String, String, String)>,
    rows: Vec<Row>,
}

/// Scripted [`Warehouse`] for tests and local development
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    tables: Mutex<HashMap<String, MemoryTable>>,
    executed: Mutex<Vec<(String, Params)>>,
    failure: Mutex<Option<WarehouseError>>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every statement, to widen race windows in concurrency tests
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Register a table with `(column_name, data_type)` pairs
    pub fn with_table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        self.tables.lock().insert(
            name.to_string(),
            MemoryTable {
                columns: columns
                    .iter()
                    .map(|(c, t)| (c.to_string(), t.to_string(), "YES".to_string()))
                    .collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    /// Mark a column as `NOT NULL` in the catalog
    pub fn with_required(self, table: &str, column: &str) -> Self {
        if let Some(t) = self.tables.lock().get_mut(table) {
            for (name, _, nullable) in &mut t.columns {
                if name == column {
                    *nullable = "NO".to_string();
                }
            }
        }
        self
    }

    /// Replace the rows returned for statements against `table`
    pub fn set_rows(&self, table: &str, rows: Vec<Row>) {
        if let Some(t) = self.tables.lock().get_mut(table) {
            t.rows = rows;
        }
    }

    /// Fail every subsequent statement with `error` until cleared with `None`
    pub fn set_failure(&self, error: Option<WarehouseError>) {
        *self.failure.lock() = error;
    }

    /// Number of statements executed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Statements executed so far, in order
    pub fn executed(&self) -> Vec<(String, Params)> {
        self.executed.lock().clone()
    }

    fn catalog_columns(&self, params: &Params) -> Vec<Row> {
        let tables = self.tables.lock();
        let Some(table) = params
            .get("table")
            .and_then(Value::as_str)
            .and_then(|name| tables.get(name))
        else {
            return Vec::new();
        };

        table
            .columns
            .iter()
            .map(|(name, data_type, nullable)| {
                [
                    ("column_name".to_string(), Value::from(name.as_str())),
                    ("data_type".to_string(), Value::from(data_type.as_str())),
                    ("is_nullable".to_string(), Value::from(nullable.as_str())),
                ]
                .into_iter()
                .collect()
            })
            .collect()
    }

    fn catalog_tables(&self) -> Vec<Row> {
        let mut names: Vec<String> = self.tables.lock().keys().cloned().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| [("table_name".to_string(), Value::String(name))].into_iter().collect())
            .collect()
    }

    fn table_rows(&self, sql: &str) -> Vec<Row> {
        let tables = self.tables.lock();
        // The first table referenced is the one the statement reads from
        tables
            .iter()
            .filter_map(|(name, t)| sql.find(&format!(".{}`", name)).map(|pos| (pos, t)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, t)| t.rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>, WarehouseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.executed.lock().push((sql.to_string(), params.clone()));

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        if sql.contains("INFORMATION_SCHEMA.COLUMNS") {
            Ok(self.catalog_columns(params))
        } else if sql.contains("INFORMATION_SCHEMA.TABLES") {
            Ok(self.catalog_tables())
        } else {
            Ok(self.table_rows(sql))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catalog_and_rows() {
        let warehouse = MemoryWarehouse::new().with_table("clientes", &[("edad", "INT64")]);
        let row: Row = [("edad".to_string(), Value::Int64(30))].into_iter().collect();
        warehouse.set_rows("clientes", vec![row]);

        let mut params = Params::new();
        params.insert("table".to_string(), Value::from("clientes"));
        let columns = warehouse
            .execute("SELECT * FROM `p.d.INFORMATION_SCHEMA.COLUMNS`", &params)
            .await
            .unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0]["data_type"], Value::from("INT64"));

        let rows = warehouse
            .execute("SELECT * FROM `p.d.clientes`", &Params::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(warehouse.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let warehouse = MemoryWarehouse::new();
        warehouse.set_failure(Some(WarehouseError::Network("down".into())));

        let result = warehouse.execute("SELECT 1", &Params::new()).await;
        assert!(matches!(result, Err(WarehouseError::Network(_))));

        warehouse.set_failure(None);
        assert!(warehouse.execute("SELECT 1", &Params::new()).await.is_ok());
    }
}
