//! Filter query pipeline
//!
//! cache lookup -> schema (cached) -> compile -> render -> execute -> cache store.
//! Nothing is cached unless every step succeeds.

use std::sync::Arc;

use super::{FilterQueryError, FilterRequest};
use crate::cache::{generate_key, QueryCache};
use crate::data::Row;
use crate::filter::{compile, QueryTemplates};
use crate::schema::{SchemaCache, SchemaError};
use crate::warehouse::Warehouse;

/// Rows for a filter query and whether they came from the cache
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub rows: Arc<Vec<Row>>,
    pub from_cache: bool,
}

pub struct FilterService {
    warehouse: Arc<dyn Warehouse>,
    schemas: Arc<SchemaCache>,
    cache: Arc<QueryCache>,
    templates: QueryTemplates,
}

impl FilterService {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        schemas: Arc<SchemaCache>,
        cache: Arc<QueryCache>,
        templates: QueryTemplates,
    ) -> Self {
        Self {
            warehouse,
            schemas,
            cache,
            templates,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn schemas(&self) -> &Arc<SchemaCache> {
        &self.schemas
    }

    pub fn warehouse(&self) -> &Arc<dyn Warehouse> {
        &self.warehouse
    }

    pub async fn run(&self, request: &FilterRequest) -> Result<FilterOutcome, FilterQueryError> {
        let key = generate_key(
            &request.table,
            &request.filters,
            &request.campaign,
            request.mode,
        );

        if let Some(rows) = self.cache.get(&key) {
            tracing::debug!(table = %request.table, key = %key, "Query cache hit");
            return Ok(FilterOutcome {
                rows,
                from_cache: true,
            });
        }
        tracing::debug!(table = %request.table, key = %key, "Query cache miss");

        let schema = self
            .schemas
            .get_table(&request.table)
            .await
            .map_err(|e| match e {
                SchemaError::InvalidIdentifier(name) => {
                    FilterQueryError::BadRequest(format!("invalid table name '{}'", name))
                }
                other => FilterQueryError::SchemaUnavailable(other),
            })?;

        let compiled = compile(&schema.columns, &request.filters, &request.campaign).map_err(
            |source| FilterQueryError::Compile {
                table: request.table.clone(),
                source,
            },
        )?;
        let sql = self
            .templates
            .render(&schema, &compiled, &request.campaign, request.mode);

        let rows = self
            .warehouse
            .execute(&sql, &compiled.params)
            .await
            .map_err(|source| FilterQueryError::Execution {
                table: request.table.clone(),
                source,
            })?;

        tracing::info!(
            table = %request.table,
            filters = request.filters.len(),
            rows = rows.len(),
            "Filter query executed"
        );

        let rows = Arc::new(rows);
        self.cache.put(&key, Arc::clone(&rows));
        Ok(FilterOutcome {
            rows,
            from_cache: false,
        })
    }
}
