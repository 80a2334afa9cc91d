use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    cache_clean, cache_delete, cache_stats, filter_query, health_check, invalidate_schema,
    table_schema, AppState,
};
use crate::cache::{query, sweeper, CacheSweeper, QueryCache};
use crate::filter::QueryTemplates;
use crate::warehouse::{BigQueryWarehouse, WarehouseConfig};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub warehouse: WarehouseConfig,
    pub cache_max_entries: usize,
    pub cache_ttl_secs: u64,
    pub cache_sweep_interval_secs: u64,
    pub templates: QueryTemplates,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            warehouse: WarehouseConfig::default(),
            cache_max_entries: query::DEFAULT_MAX_ENTRIES,
            cache_ttl_secs: query::DEFAULT_TTL.as_secs(),
            cache_sweep_interval_secs: sweeper::DEFAULT_SWEEP_INTERVAL.as_secs(),
            templates: QueryTemplates::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl ServerConfig {
    /// Reject settings that would leave the cache or its sweeper unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_max_entries == 0 {
            return Err(ConfigError::Zero("cache_max_entries"));
        }
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Zero("cache_ttl_secs"));
        }
        if self.cache_sweep_interval_secs == 0 {
            return Err(ConfigError::Zero("cache_sweep_interval_secs"));
        }
        Ok(())
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Filter queries
        .route("/filters/query", post(filter_query))
        // Cache administration
        .route("/cache/stats", get(cache_stats))
        .route("/cache", delete(cache_delete))
        .route("/cache/clean", post(cache_clean))
        // Schema introspection
        .route("/schema/:table", get(table_schema).delete(invalidate_schema))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let warehouse = Arc::new(BigQueryWarehouse::new(config.warehouse.clone())?);

    // The one query cache for this process; everything else borrows it
    let cache = Arc::new(QueryCache::with_config(
        config.cache_max_entries,
        Duration::from_secs(config.cache_ttl_secs),
    ));

    let state = Arc::new(AppState::new(
        warehouse,
        Arc::clone(&cache),
        &config.warehouse.project,
        &config.warehouse.dataset,
        config.templates.clone(),
    ));

    // Start background workers
    let sweeper = Arc::new(CacheSweeper::new(
        Arc::clone(&cache),
        Duration::from_secs(config.cache_sweep_interval_secs),
    ));
    let sweeper_handle = Arc::clone(&sweeper).start();

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting Segmento server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweeper))
        .await?;

    sweeper_handle.abort();

    tracing::info!("Segmento server stopped");
    Ok(())
}

async fn shutdown_signal(sweeper: Arc<CacheSweeper>) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received, stopping workers...");
    sweeper.stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Row, Value};
    use crate::warehouse::{MemoryWarehouse, WarehouseError};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    const INTERNAL_MESSAGE: &str = "Error executing filter query";

    fn create_test_app() -> (Arc<MemoryWarehouse>, Arc<QueryCache>, Router) {
        let warehouse = Arc::new(
            MemoryWarehouse::new()
                .with_table(
                    "clientes",
                    &[("telefono", "STRING"), ("edad", "INTEGER"), ("fecha", "DATE")],
                )
                .with_table("contactos", &[("telefono", "STRING")]),
        );
        let row = [
            ("telefono".to_string(), Value::from("600111222")),
            ("edad".to_string(), Value::Int64(30)),
        ]
        .into_iter()
        .collect();
        warehouse.set_rows("clientes", vec![row]);

        let cache = Arc::new(QueryCache::new());
        let state = Arc::new(AppState::new(
            warehouse.clone(),
            Arc::clone(&cache),
            "p",
            "d",
            QueryTemplates::default(),
        ));
        (warehouse, cache, build_router(state))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    fn empty(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(ServerConfig::default().validate(), Ok(()));

        let config = ServerConfig {
            cache_sweep_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("cache_sweep_interval_secs"))
        );

        let config = ServerConfig {
            cache_ttl_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Zero("cache_ttl_secs")));

        let config = ServerConfig {
            cache_max_entries: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Zero("cache_max_entries")));
    }

    #[tokio::test]
    async fn test_run_server_rejects_zero_sweep_interval() {
        let config = ServerConfig {
            port: 0,
            cache_sweep_interval_secs: 0,
            ..ServerConfig::default()
        };

        let err = run_server(config).await.unwrap_err();
        assert!(err.to_string().contains("cache_sweep_interval_secs"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_, _, app) = create_test_app();

        let (status, body) = send(&app, empty("GET", "/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_filter_query_then_cached() {
        let (warehouse, _, app) = create_test_app();
        let payload = serde_json::json!({
            "table": "clientes",
            "filters": [
                {"column": "edad", "type": "segmentacion", "value": "30"},
                {"column": "fecha", "type": "estrategia", "value": null}
            ]
        });

        let (status, body) = send(&app, post_json("/filters/query", payload.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fromCache"], false);
        assert_eq!(body["rows"][0]["edad"], 30);
        assert_eq!(body["rows"][0]["telefono"], "600111222");

        let (status, body) = send(&app, post_json("/filters/query", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fromCache"], true);
        assert_eq!(warehouse.calls(), 2);
    }

    #[tokio::test]
    async fn test_filter_query_bad_request() {
        let (warehouse, _, app) = create_test_app();

        let (status, body) = send(
            &app,
            post_json("/filters/query", serde_json::json!({"filters": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("table"));

        let (status, _) = send(
            &app,
            post_json(
                "/filters/query",
                serde_json::json!({"table": "clientes", "filters": "edad=30"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/filters/query")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(warehouse.calls(), 0);
    }

    #[tokio::test]
    async fn test_filter_query_downstream_errors_are_generic() {
        let (warehouse, cache, app) = create_test_app();

        // Compile error: non-numeric value for an INT64 column
        let (status, body) = send(
            &app,
            post_json(
                "/filters/query",
                serde_json::json!({"table": "clientes", "filters": [{"column": "edad", "value": "x"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL_MESSAGE);

        // Execution error
        warehouse.set_failure(Some(WarehouseError::Network("reset".into())));
        let (status, body) = send(
            &app,
            post_json(
                "/filters/query",
                serde_json::json!({"table": "clientes", "filters": []}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL_MESSAGE);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_admin() {
        let (_, cache, app) = create_test_app();
        cache.put("a", Vec::<Row>::new());
        cache.put("b", Vec::<Row>::new());
        let _ = cache.get("a");
        let _ = cache.get("zz");

        let (status, body) = send(&app, empty("GET", "/cache/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["stats"]["size"], 2);
        assert_eq!(body["stats"]["hitRate"], "50.00");

        let (_, body) = send(&app, empty("DELETE", "/cache?key=a")).await;
        assert_eq!(body["deleted"], true);
        let (_, body) = send(&app, empty("DELETE", "/cache?key=a")).await;
        assert_eq!(body["deleted"], false);

        let (_, body) = send(&app, empty("POST", "/cache/clean")).await;
        assert_eq!(body["cleaned"], 0);
        assert_eq!(body["stats"]["size"], 1);

        let (status, _) = send(&app, empty("DELETE", "/cache")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[tokio::test]
    async fn test_cache_delete_with_empty_key_clears() {
        let (_, cache, app) = create_test_app();
        cache.put("a", Vec::<Row>::new());
        cache.put("", Vec::<Row>::new());

        let (status, body) = send(&app, empty("DELETE", "/cache?key=")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Cache cleared");
        assert!(body.get("deleted").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_table_schema() {
        let (_, _, app) = create_test_app();

        let (status, body) = send(&app, empty("GET", "/schema/clientes")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"], "clientes");
        assert_eq!(body["columns"][1]["name"], "edad");
        assert_eq!(body["columns"][1]["type"], "INTEGER");
        assert_eq!(body["columns"][1]["mode"], "NULLABLE");
        assert_eq!(body["tables"], serde_json::json!(["clientes", "contactos"]));
    }

    #[tokio::test]
    async fn test_table_not_found() {
        let (_, _, app) = create_test_app();

        let (status, _) = send(&app, empty("GET", "/schema/nonexistent")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, empty("GET", "/schema/bad%20name")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalidate_schema() {
        let (warehouse, _, app) = create_test_app();
        let payload = serde_json::json!({"table": "clientes", "filters": []});
        send(&app, post_json("/filters/query", payload)).await;

        let (status, body) = send(&app, empty("DELETE", "/schema/clientes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invalidated"], true);

        let (_, body) = send(&app, empty("DELETE", "/schema/clientes")).await;
        assert_eq!(body["invalidated"], false);

        // Schema reload happens on the next cache miss
        let payload = serde_json::json!({"table": "clientes", "filters": [], "modoEnvio": "M0"});
        send(&app, post_json("/filters/query", payload)).await;
        let catalog_queries = warehouse
            .executed()
            .iter()
            .filter(|(sql, _)| sql.contains("INFORMATION_SCHEMA.COLUMNS"))
            .count();
        assert_eq!(catalog_queries, 2);
    }
}
