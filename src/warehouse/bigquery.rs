//! BigQuery REST executor
//!
//! Runs statements through the synchronous `jobs.query` endpoint using
//! standard SQL and named parameters, then follows `pageToken` through
//! `jobs.getQueryResults` until every row is collected.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use async_trait::async_trait;

use super::{Params, Warehouse, WarehouseError};
use crate::data::{ColumnType, Row, Value};

/// Connection settings for the warehouse
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Project that owns the dataset (and is billed for queries)
    pub project: String,
    /// Dataset holding the segment tables
    pub dataset: String,
    /// REST base URL, without trailing slash
    pub endpoint: String,
    /// OAuth2 bearer token
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project: "segmento".to_string(),
            dataset: "campanas".to_string(),
            endpoint: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BigQueryWarehouse {
    http_client: reqwest::Client,
    config: WarehouseConfig,
}

impl BigQueryWarehouse {
    pub fn new(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WarehouseError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_response(response: reqwest::Response) -> Result<QueryResponse, WarehouseError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WarehouseError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| WarehouseError::Deserialization(e.to_string()))
    }

    async fn next_page(
        &self,
        job: &JobReference,
        page_token: &str,
    ) -> Result<QueryResponse, WarehouseError> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.config.endpoint, job.project_id, job.job_id
        );
        let mut query = vec![("pageToken", page_token.to_string())];
        if let Some(ref location) = job.location {
            query.push(("location", location.clone()));
        }

        let response = self
            .authorize(self.http_client.get(&url).query(&query))
            .send()
            .await
            .map_err(|e| WarehouseError::Network(e.to_string()))?;

        Self::read_response(response).await
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>, WarehouseError> {
        let url = format!(
            "{}/projects/{}/queries",
            self.config.endpoint, self.config.project
        );
        let request = QueryRequest::new(sql, params, self.config.timeout);

        let response = self
            .authorize(self.http_client.post(&url).json(&request))
            .send()
            .await
            .map_err(|e| WarehouseError::Network(e.to_string()))?;

        let mut page = Self::read_response(response).await?;
        if !page.job_complete {
            return Err(WarehouseError::Incomplete);
        }

        let fields = page
            .schema
            .take()
            .map(|s| s.fields)
            .unwrap_or_default();
        let mut rows = decode_rows(&fields, page.rows.take().unwrap_or_default())?;

        while let (Some(token), Some(job)) = (page.page_token.take(), page.job_reference.clone()) {
            page = self.next_page(&job, &token).await?;
            rows.extend(decode_rows(&fields, page.rows.take().unwrap_or_default())?);
        }

        tracing::debug!(rows = rows.len(), "Warehouse query completed");
        Ok(rows)
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    query: String,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<QueryParameter>,
    timeout_ms: u64,
}

impl QueryRequest {
    fn new(sql: &str, params: &Params, timeout: Duration) -> Self {
        Self {
            query: sql.to_string(),
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: params
                .iter()
                .map(|(name, value)| QueryParameter::new(name, value))
                .collect(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParameter {
    name: String,
    parameter_type: ParameterType,
    parameter_value: ParameterValue,
}

#[derive(Debug, Serialize)]
struct ParameterType {
    #[serde(rename = "type")]
    param_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ParameterValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl QueryParameter {
    fn new(name: &str, value: &Value) -> Self {
        let param_type = match value {
            Value::Bool(_) => "BOOL",
            Value::Int64(_) => "INT64",
            Value::Float64(_) => "FLOAT64",
            Value::Null | Value::String(_) => "STRING",
        };
        let value = match value {
            Value::Null => None,
            other => Some(other.to_string()),
        };

        Self {
            name: name.to_string(),
            parameter_type: ParameterType { param_type },
            parameter_value: ParameterValue { value },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    schema: Option<TableSchema>,
    rows: Option<Vec<TableRow>>,
    page_token: Option<String>,
    job_reference: Option<JobReference>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    project_id: String,
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: serde_json::Value,
}

fn decode_rows(fields: &[FieldSchema], rows: Vec<TableRow>) -> Result<Vec<Row>, WarehouseError> {
    rows.into_iter()
        .map(|row| {
            if row.f.len() != fields.len() {
                return Err(WarehouseError::Deserialization(format!(
                    "row has {} cells, schema has {} fields",
                    row.f.len(),
                    fields.len()
                )));
            }
            fields
                .iter()
                .zip(row.f)
                .map(|(field, cell)| Ok((field.name.clone(), decode_cell(field, cell.v)?)))
                .collect::<Result<Row, WarehouseError>>()
        })
        .collect()
}

/// Cells arrive as strings; the field type decides the primitive
fn decode_cell(field: &FieldSchema, raw: serde_json::Value) -> Result<Value, WarehouseError> {
    let text = match raw {
        serde_json::Value::Null => return Ok(Value::Null),
        serde_json::Value::String(s) => s,
        // REPEATED and RECORD cells keep their JSON shape as text
        other => return Ok(Value::String(other.to_string())),
    };

    if field.mode.as_deref() == Some("REPEATED") {
        return Ok(Value::String(text));
    }

    match ColumnType::normalize(&field.field_type) {
        ColumnType::Int64 => text
            .parse()
            .map(Value::Int64)
            .map_err(|e| bad_cell(field, e)),
        ColumnType::Float64 => text
            .parse()
            .map(Value::Float64)
            .map_err(|e| bad_cell(field, e)),
        ColumnType::Bool => text
            .parse()
            .map(Value::Bool)
            .map_err(|e| bad_cell(field, e)),
        _ => Ok(Value::String(text)),
    }
}

fn bad_cell(field: &FieldSchema, e: impl std::fmt::Display) -> WarehouseError {
    WarehouseError::Deserialization(format!("column {}: {}", field.name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let mut params = Params::new();
        params.insert("val0".to_string(), Value::Int64(30));
        params.insert("val1".to_string(), Value::String("2024-05-01".into()));

        let request = QueryRequest::new("SELECT 1", &params, Duration::from_secs(5));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["useLegacySql"], false);
        assert_eq!(json["parameterMode"], "NAMED");
        assert_eq!(json["timeoutMs"], 5000);
        assert_eq!(json["queryParameters"][0]["name"], "val0");
        assert_eq!(json["queryParameters"][0]["parameterType"]["type"], "INT64");
        assert_eq!(json["queryParameters"][0]["parameterValue"]["value"], "30");
        assert_eq!(json["queryParameters"][1]["parameterType"]["type"], "STRING");
    }

    #[test]
    fn test_decode_rows() {
        let response: QueryResponse = serde_json::from_value(serde_json::json!({
            "jobComplete": true,
            "schema": {"fields": [
                {"name": "edad", "type": "INTEGER", "mode": "NULLABLE"},
                {"name": "saldo", "type": "FLOAT", "mode": "NULLABLE"},
                {"name": "activo", "type": "BOOLEAN", "mode": "NULLABLE"},
                {"name": "nombre", "type": "STRING", "mode": "NULLABLE"}
            ]},
            "rows": [
                {"f": [{"v": "30"}, {"v": "10.5"}, {"v": "true"}, {"v": "Ana"}]},
                {"f": [{"v": null}, {"v": "0"}, {"v": "false"}, {"v": null}]}
            ]
        }))
        .unwrap();

        let fields = response.schema.unwrap().fields;
        let rows = decode_rows(&fields, response.rows.unwrap()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["edad"], Value::Int64(30));
        assert_eq!(rows[0]["saldo"], Value::Float64(10.5));
        assert_eq!(rows[0]["activo"], Value::Bool(true));
        assert_eq!(rows[0]["nombre"], Value::String("Ana".into()));
        assert_eq!(rows[1]["edad"], Value::Null);
        assert_eq!(rows[1]["nombre"], Value::Null);
    }

    #[test]
    fn test_decode_rejects_bad_integer() {
        let fields = vec![FieldSchema {
            name: "edad".to_string(),
            field_type: "INT64".to_string(),
            mode: None,
        }];
        let rows = vec![TableRow {
            f: vec![TableCell {
                v: serde_json::json!("treinta"),
            }],
        }];

        let err = decode_rows(&fields, rows).unwrap_err();
        assert!(matches!(err, WarehouseError::Deserialization(_)));
    }
}
