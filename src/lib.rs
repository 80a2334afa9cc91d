//! Segmento: filter-to-SQL compilation and result caching for campaign segments
//!
//! Turns a list of column filters chosen in a UI into a parameterized
//! warehouse statement, runs it, and caches the rows so repeated selections
//! are answered from memory.
//!
//! # Features
//!
//! - **Schema-aware compilation**: Column types drive value coercion and
//!   predicate shape, unknown columns are rejected
//! - **Named parameters**: Every user value is bound as `@valN`, never spliced
//! - **Campaign templates**: Reminder and default statements with per-phone dedup
//! - **Schema cache**: One catalog lookup per table, shared by concurrent callers
//! - **Query cache**: Bounded, FIFO eviction, TTL expiry and hit/miss stats
//!
//! # Example
//!
//! ```no_run
//! use segmento::data::ColumnType;
//! use segmento::filter::{compile, CampaignKind, FilterSpec};
//! use std::collections::HashMap;
//!
//! let mut schema = HashMap::new();
//! schema.insert("edad".to_string(), ColumnType::Int64);
//!
//! let filters = vec![FilterSpec::new("edad", serde_json::json!("30"))];
//! let compiled = compile(&schema, &filters, &CampaignKind::Unspecified).unwrap();
//! assert_eq!(compiled.where_sql, "edad = @val0");
//! ```

pub mod api;
pub mod cache;
pub mod data;
pub mod filter;
pub mod query;
pub mod schema;
pub mod warehouse;

// Re-export commonly used types
pub use cache::{generate_key, QueryCache};
pub use data::{ColumnType, Row, Value};
pub use filter::{compile, CampaignKind, CompileError, CompiledQuery, FilterSpec, SendMode};
pub use query::{FilterQueryError, FilterRequest, FilterService};
pub use schema::{SchemaCache, SchemaError};
pub use warehouse::{Warehouse, WarehouseError};
