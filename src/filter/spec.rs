use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Campaign kind that enables the Spanish due-date filter
pub const FIDELITY_CAMPAIGN: &str = "Fidelizacion";
/// Campaign kind that selects the reminder query variant
pub const REMINDER_CAMPAIGN: &str = "Recordatorio";

/// Values that mean "no constraint" for a filter position
pub const WILDCARD_VALUE: &str = "Todos";

/// A single column/value constraint as submitted by callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,
    /// Logical group tag ("segmentacion", "cluster", "estrategia", ...)
    #[serde(rename = "type", default)]
    pub group: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl FilterSpec {
    pub fn new(column: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            column: column.into(),
            group: String::new(),
            value,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// `null`, `""` and `"Todos"` constrain nothing
    pub fn is_wildcard(&self) -> bool {
        match &self.value {
            serde_json::Value::Null => true,
            serde_json::Value::String(s) => s.is_empty() || s == WILDCARD_VALUE,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CampaignKind {
    Fidelity,
    Reminder,
    Other(String),
    #[default]
    Unspecified,
}

impl CampaignKind {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => CampaignKind::Unspecified,
            Some(FIDELITY_CAMPAIGN) => CampaignKind::Fidelity,
            Some(REMINDER_CAMPAIGN) => CampaignKind::Reminder,
            Some(other) => CampaignKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CampaignKind::Fidelity => FIDELITY_CAMPAIGN,
            CampaignKind::Reminder => REMINDER_CAMPAIGN,
            CampaignKind::Other(s) => s,
            CampaignKind::Unspecified => "",
        }
    }
}

/// Companion table selector for reminder campaigns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    M0,
    #[default]
    M1,
}

impl SendMode {
    /// Suffix appended to the companion table name
    pub fn suffix(&self) -> &'static str {
        match self {
            SendMode::M0 => "m0",
            SendMode::M1 => "m1",
        }
    }
}

impl FromStr for SendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m0" => Ok(SendMode::M0),
            "m1" => Ok(SendMode::M1),
            other => Err(format!("unknown send mode '{}', expected M0 or M1", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wildcards() {
        assert!(FilterSpec::new("a", json!(null)).is_wildcard());
        assert!(FilterSpec::new("a", json!("")).is_wildcard());
        assert!(FilterSpec::new("a", json!("Todos")).is_wildcard());
        assert!(!FilterSpec::new("a", json!("todos")).is_wildcard());
        assert!(!FilterSpec::new("a", json!(0)).is_wildcard());
        assert!(!FilterSpec::new("a", json!(false)).is_wildcard());
    }

    #[test]
    fn test_filter_spec_deserialize() {
        let spec: FilterSpec =
            serde_json::from_value(json!({"column": "edad", "type": "segmentacion", "value": "30"}))
                .unwrap();
        assert_eq!(spec.column, "edad");
        assert_eq!(spec.group, "segmentacion");
        assert_eq!(spec.value, json!("30"));

        let spec: FilterSpec = serde_json::from_value(json!({"column": "edad"})).unwrap();
        assert!(spec.is_wildcard());
    }

    #[test]
    fn test_send_mode_parse() {
        assert_eq!("M0".parse::<SendMode>().unwrap(), SendMode::M0);
        assert_eq!("m1".parse::<SendMode>().unwrap(), SendMode::M1);
        assert!("M2".parse::<SendMode>().is_err());
        assert_eq!(SendMode::default(), SendMode::M1);
    }

    #[test]
    fn test_campaign_kind() {
        assert_eq!(CampaignKind::from_raw(Some("Fidelizacion")), CampaignKind::Fidelity);
        assert_eq!(CampaignKind::from_raw(Some("Recordatorio")), CampaignKind::Reminder);
        assert_eq!(CampaignKind::from_raw(None), CampaignKind::Unspecified);
        assert_eq!(
            CampaignKind::from_raw(Some("Cobranza")).as_str(),
            "Cobranza"
        );
    }
}
