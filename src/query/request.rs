//! Filter query payload validation
//!
//! The payload is checked by hand rather than through a typed extractor so
//! that every shape problem is reported as a 400 before any I/O happens.

use serde_json::Value as Json;

use super::FilterQueryError;
use crate::filter::{CampaignKind, FilterSpec, SendMode};

/// A validated filter query
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRequest {
    pub table: String,
    pub filters: Vec<FilterSpec>,
    pub campaign: CampaignKind,
    pub mode: SendMode,
}

impl FilterRequest {
    pub fn new(table: impl Into<String>, filters: Vec<FilterSpec>) -> Self {
        Self {
            table: table.into(),
            filters,
            campaign: CampaignKind::Unspecified,
            mode: SendMode::default(),
        }
    }

    pub fn with_campaign(mut self, campaign: CampaignKind) -> Self {
        self.campaign = campaign;
        self
    }

    pub fn with_mode(mut self, mode: SendMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate `{ table, filters, tipoCampana?, modoEnvio? }`
    pub fn from_json(body: &Json) -> Result<Self, FilterQueryError> {
        let bad = |msg: &str| FilterQueryError::BadRequest(msg.to_string());

        let table = match body.get("table") {
            Some(Json::String(t)) if !t.trim().is_empty() => t.trim().to_string(),
            _ => return Err(bad("'table' is required and must be a non-empty string")),
        };

        let filters = match body.get("filters") {
            Some(Json::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    serde_json::from_value::<FilterSpec>(item.clone()).map_err(|e| {
                        FilterQueryError::BadRequest(format!("filters[{}]: {}", i, e))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(bad("'filters' is required and must be a list")),
        };

        let campaign = match body.get("tipoCampana") {
            None | Some(Json::Null) => CampaignKind::Unspecified,
            Some(Json::String(kind)) => CampaignKind::from_raw(Some(kind.as_str())),
            Some(_) => return Err(bad("'tipoCampana' must be a string")),
        };

        let mode = match body.get("modoEnvio") {
            None | Some(Json::Null) => SendMode::default(),
            Some(Json::String(mode)) if mode.is_empty() => SendMode::default(),
            Some(Json::String(mode)) => mode.parse().map_err(FilterQueryError::BadRequest)?,
            Some(_) => return Err(bad("'modoEnvio' must be \"M0\" or \"M1\"")),
        };

        Ok(Self {
            table,
            filters,
            campaign,
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_payload() {
        let request = FilterRequest::from_json(&json!({
            "table": "clientes",
            "filters": [{"column": "edad", "type": "segmentacion", "value": "30"}],
            "tipoCampana": "Recordatorio",
            "modoEnvio": "M0"
        }))
        .unwrap();

        assert_eq!(request.table, "clientes");
        assert_eq!(request.filters.len(), 1);
        assert_eq!(request.campaign, CampaignKind::Reminder);
        assert_eq!(request.mode, SendMode::M0);
    }

    #[test]
    fn test_defaults() {
        let request =
            FilterRequest::from_json(&json!({"table": "clientes", "filters": []})).unwrap();

        assert_eq!(request.campaign, CampaignKind::Unspecified);
        assert_eq!(request.mode, SendMode::M1);
    }

    #[test]
    fn test_malformed_payloads() {
        for body in [
            json!({}),
            json!({"filters": []}),
            json!({"table": "", "filters": []}),
            json!({"table": 5, "filters": []}),
            json!({"table": "clientes"}),
            json!({"table": "clientes", "filters": {"column": "edad"}}),
            json!({"table": "clientes", "filters": [{"value": 1}]}),
            json!({"table": "clientes", "filters": [], "modoEnvio": "M7"}),
            json!({"table": "clientes", "filters": [], "tipoCampana": 3}),
            json!([1, 2, 3]),
        ] {
            assert!(
                matches!(
                    FilterRequest::from_json(&body),
                    Err(FilterQueryError::BadRequest(_))
                ),
                "{} should be rejected",
                body
            );
        }
    }
}
