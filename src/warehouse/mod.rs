//! Warehouse execution boundary
//!
//! Everything that talks to the analytical warehouse goes through the
//! [`Warehouse`] trait: catalog lookups and compiled filter queries alike.
//! Timeouts and transport concerns belong to the implementation.

pub mod bigquery;
pub mod memory;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::data::{Row, Value};

pub use bigquery::{BigQueryWarehouse, WarehouseConfig};
pub use memory::MemoryWarehouse;

/// Named query parameters, bound as `@name` in SQL text
pub type Params = BTreeMap<String, Value>;

/// Executes parameterized SQL against the warehouse
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>, WarehouseError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WarehouseError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Warehouse returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Query did not complete within the request timeout")]
    Incomplete,
}
