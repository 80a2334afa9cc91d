//! Warehouse table schemas
//!
//! Column types are looked up once per table through the warehouse catalog
//! and kept for the life of the process (see [`SchemaCache`]).

pub mod cache;
pub mod catalog;

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::data::ColumnType;
use crate::warehouse::WarehouseError;

pub use cache::SchemaCache;
pub use catalog::{ColumnDescriptor, ColumnMode};

/// Column name to canonical type
pub type SchemaMap = HashMap<String, ColumnType>;

/// Fully qualified warehouse table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// `project.dataset.table`
    pub fn qualified(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }

    /// Reject anything that is not a plain identifier before it is used in SQL
    pub fn validate(&self) -> Result<(), SchemaError> {
        static PROJECT: OnceLock<Regex> = OnceLock::new();
        static NAME: OnceLock<Regex> = OnceLock::new();
        let project = PROJECT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap());
        let name = NAME.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

        if !project.is_match(&self.project) {
            return Err(SchemaError::InvalidIdentifier(self.project.clone()));
        }
        for part in [&self.dataset, &self.table] {
            if !name.is_match(part) {
                return Err(SchemaError::InvalidIdentifier(part.clone()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// A table whose schema was read from the warehouse catalog
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table_ref: TableRef,
    pub columns: SchemaMap,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Catalog lookup for '{table}' failed: {source}")]
    Catalog {
        table: String,
        #[source]
        source: WarehouseError,
    },
}
