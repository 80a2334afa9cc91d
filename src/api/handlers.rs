use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{CacheStats, QueryCache};
use crate::data::Row;
use crate::filter::QueryTemplates;
use crate::query::{FilterQueryError, FilterRequest, FilterService};
use crate::schema::{catalog, ColumnDescriptor, SchemaCache, SchemaError};
use crate::warehouse::Warehouse;

/// Message returned for any downstream failure; details go to the log
const INTERNAL_ERROR_MESSAGE: &str = "Error executing filter query";

/// Application state shared across handlers
pub struct AppState {
    pub warehouse: Arc<dyn Warehouse>,
    pub cache: Arc<QueryCache>,
    pub schemas: Arc<SchemaCache>,
    pub service: FilterService,
}

impl AppState {
    /// Wire the schema cache and filter service around a warehouse and a
    /// query cache constructed once at startup
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        cache: Arc<QueryCache>,
        project: &str,
        dataset: &str,
        templates: QueryTemplates,
    ) -> Self {
        let schemas = Arc::new(SchemaCache::new(Arc::clone(&warehouse), project, dataset));
        let service = FilterService::new(
            Arc::clone(&warehouse),
            Arc::clone(&schemas),
            Arc::clone(&cache),
            templates,
        );

        Self {
            warehouse,
            cache,
            schemas,
            service,
        }
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Filter Query
// ============================================================================

#[derive(Serialize)]
pub struct FilterResponse {
    pub rows: Arc<Vec<Row>>,
    #[serde(rename = "fromCache")]
    pub from_cache: bool,
}

pub async fn filter_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<FilterResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = FilterRequest::from_json(&body)?;

    let outcome = state.service.run(&request).await?;

    Ok(Json(FilterResponse {
        rows: outcome.rows,
        from_cache: outcome.from_cache,
    }))
}

// ============================================================================
// Cache Administration
// ============================================================================

#[derive(Serialize)]
pub struct CacheStatsResponse {
    pub success: bool,
    pub stats: CacheStats,
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        success: true,
        stats: state.cache.stats(),
    })
}

#[derive(Deserialize)]
pub struct CacheDeleteParams {
    pub key: Option<String>,
}

#[derive(Serialize)]
pub struct CacheDeleteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    pub message: String,
}

/// `DELETE /cache?key=<k>` removes one entry; without a key (or with an empty
/// one) everything is cleared
pub async fn cache_delete(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CacheDeleteParams>,
) -> Json<CacheDeleteResponse> {
    match params.key.filter(|k| !k.is_empty()) {
        Some(key) => {
            let deleted = state.cache.delete(&key);
            let message = if deleted {
                format!("Cache entry '{}' deleted", key)
            } else {
                format!("Cache entry '{}' not found", key)
            };
            Json(CacheDeleteResponse {
                success: true,
                deleted: Some(deleted),
                message,
            })
        }
        None => {
            state.cache.clear();
            tracing::info!("Query cache cleared");
            Json(CacheDeleteResponse {
                success: true,
                deleted: None,
                message: "Cache cleared".to_string(),
            })
        }
    }
}

#[derive(Serialize)]
pub struct CacheCleanResponse {
    pub success: bool,
    pub cleaned: usize,
    pub stats: CacheStats,
}

pub async fn cache_clean(State(state): State<Arc<AppState>>) -> Json<CacheCleanResponse> {
    let cleaned = state.cache.clean_expired();
    tracing::info!("Removed {} expired cache entries", cleaned);

    Json(CacheCleanResponse {
        success: true,
        cleaned,
        stats: state.cache.stats(),
    })
}

// ============================================================================
// Schema Introspection
// ============================================================================

#[derive(Serialize)]
pub struct SchemaResponse {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub tables: Vec<String>,
}

pub async fn table_schema(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> Result<Json<SchemaResponse>, ApiError> {
    let table_ref = state.schemas.table_ref(&table);
    table_ref.validate()?;

    let warehouse = state.warehouse.as_ref();
    let (columns, tables) = tokio::join!(
        catalog::fetch_columns(warehouse, &table_ref),
        catalog::list_tables(warehouse, &table_ref.project, &table_ref.dataset),
    );
    let columns = columns.map_err(|e| ApiError::internal("schema lookup", e))?;
    let tables = tables.map_err(|e| ApiError::internal("table listing", e))?;

    if columns.is_empty() {
        return Err(ApiError::NotFound(format!("Table '{}' not found", table)));
    }

    Ok(Json(SchemaResponse {
        table,
        columns,
        tables,
    }))
}

/// Forget a cached schema so the next filter query reloads it
pub async fn invalidate_schema(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let table_ref = state.schemas.table_ref(&table);
    table_ref.validate()?;

    let invalidated = state.schemas.invalidate(&table_ref).await;
    if invalidated {
        tracing::info!(table = %table_ref, "Schema invalidated");
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "invalidated": invalidated,
    })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    /// Log the cause, answer with the generic message
    fn internal(context: &str, error: impl std::fmt::Display) -> Self {
        tracing::error!("{} failed: {}", context, error);
        ApiError::Internal(INTERNAL_ERROR_MESSAGE.to_string())
    }
}

impl From<FilterQueryError> for ApiError {
    fn from(error: FilterQueryError) -> Self {
        match error {
            FilterQueryError::BadRequest(msg) => ApiError::BadRequest(msg),
            other => ApiError::internal("Filter query", other),
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(error: SchemaError) -> Self {
        match error {
            SchemaError::InvalidIdentifier(name) => {
                ApiError::BadRequest(format!("Invalid identifier: '{}'", name))
            }
            SchemaError::TableNotFound(name) => {
                ApiError::NotFound(format!("Table '{}' not found", name))
            }
            other => ApiError::internal("Schema lookup", other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
