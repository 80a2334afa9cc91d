//! Filter compilation
//!
//! Turns an ordered list of [`FilterSpec`]s into a `WHERE` clause plus named
//! parameters. The parameter for filter `i` is `val{i}`; the Spanish due-date
//! rule binds `val{i}_month` and `val{i}_day` instead.
//!
//! Column names are the only caller-supplied text that reaches SQL, and only
//! after they are found in the table schema. Values are always bound.

use chrono::NaiveDate;

use super::spanish::{self, SpanishDateError};
use super::spec::{CampaignKind, FilterSpec};
use crate::data::{ColumnType, Value};
use crate::schema::SchemaMap;
use crate::warehouse::Params;

/// Columns holding installment due dates, filtered by day and month only
/// for fidelity campaigns
pub const DUE_DATE_COLUMNS: [&str; 2] = ["fecha_vencimiento", "fecha_pago"];

/// Column name that always gets date-only comparison, whatever its type
pub const DATETIME_COLUMN: &str = "DATETIME";

/// Always-true predicate
pub const NO_OP_PREDICATE: &str = "1=1";

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub where_sql: String,
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("filter {index}: unknown column '{column}'")]
    UnknownColumn { index: usize, column: String },

    #[error("filter {index} ({column}): '{value}' is not a valid {expected}")]
    InvalidNumber {
        index: usize,
        column: String,
        value: String,
        expected: ColumnType,
    },

    #[error("filter {index} ({column}): '{value}' is not a YYYY-MM-DD date")]
    InvalidDate {
        index: usize,
        column: String,
        value: String,
    },

    #[error("filter {index} ({column}): {source}")]
    SpanishDate {
        index: usize,
        column: String,
        #[source]
        source: SpanishDateError,
    },

    #[error("filter {index} ({column}): arrays and objects cannot be compared")]
    UnsupportedValue { index: usize, column: String },
}

impl CompileError {
    /// Position of the offending filter in the request
    pub fn index(&self) -> usize {
        match self {
            CompileError::UnknownColumn { index, .. }
            | CompileError::InvalidNumber { index, .. }
            | CompileError::InvalidDate { index, .. }
            | CompileError::SpanishDate { index, .. }
            | CompileError::UnsupportedValue { index, .. } => *index,
        }
    }
}

/// Compile `filters` against `schema` into a `WHERE` clause
pub fn compile(
    schema: &SchemaMap,
    filters: &[FilterSpec],
    campaign: &CampaignKind,
) -> Result<CompiledQuery, CompileError> {
    let mut predicates = Vec::with_capacity(filters.len());
    let mut params = Params::new();

    for (index, filter) in filters.iter().enumerate() {
        if filter.is_wildcard() {
            predicates.push(NO_OP_PREDICATE.to_string());
            continue;
        }

        let column = filter.column.as_str();
        let column_type = *schema.get(column).ok_or_else(|| CompileError::UnknownColumn {
            index,
            column: column.to_string(),
        })?;
        let name = format!("val{}", index);

        if *campaign == CampaignKind::Fidelity && is_due_date_column(column) {
            let (month, day) = spanish_day_month(index, filter)?;
            predicates.push(format!(
                "EXTRACT(MONTH FROM DATE({})) = @{}_month",
                column, name
            ));
            predicates.push(format!("EXTRACT(DAY FROM DATE({})) = @{}_day", column, name));
            params.insert(format!("{}_month", name), Value::Int64(month as i64));
            params.insert(format!("{}_day", name), Value::Int64(day as i64));
            continue;
        }

        if column_type == ColumnType::Date || column == DATETIME_COLUMN {
            let date = date_part(index, filter)?;
            predicates.push(format!("DATE({}) = @{}", column, name));
            params.insert(name, Value::String(date));
            continue;
        }

        let value = scalar(index, filter)?;
        let value = match column_type {
            ColumnType::Int64 => coerce_int(index, filter, value)?,
            ColumnType::Float64 => coerce_float(index, filter, value)?,
            _ => value,
        };
        predicates.push(format!("{} = @{}", column, name));
        params.insert(name, value);
    }

    let where_sql = if predicates.is_empty() {
        NO_OP_PREDICATE.to_string()
    } else {
        predicates.join(" AND ")
    };

    Ok(CompiledQuery { where_sql, params })
}

fn is_due_date_column(column: &str) -> bool {
    DUE_DATE_COLUMNS
        .iter()
        .any(|alias| alias.eq_ignore_ascii_case(column))
}

fn scalar(index: usize, filter: &FilterSpec) -> Result<Value, CompileError> {
    Value::from_json(&filter.value).ok_or_else(|| CompileError::UnsupportedValue {
        index,
        column: filter.column.clone(),
    })
}

fn spanish_day_month(index: usize, filter: &FilterSpec) -> Result<(u32, u32), CompileError> {
    let text = match &filter.value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    spanish::parse_day_month(&text).map_err(|source| CompileError::SpanishDate {
        index,
        column: filter.column.clone(),
        source,
    })
}

/// `2024-05-01T10:00:00Z` and `2024-05-01 10:00:00` both become `2024-05-01`
fn date_part(index: usize, filter: &FilterSpec) -> Result<String, CompileError> {
    let invalid = || CompileError::InvalidDate {
        index,
        column: filter.column.clone(),
        value: filter.value.to_string(),
    };

    let text = filter.value.as_str().ok_or_else(invalid)?;
    let date = text
        .trim()
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or_default();

    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
    Ok(date.to_string())
}

fn coerce_int(index: usize, filter: &FilterSpec, value: Value) -> Result<Value, CompileError> {
    let parsed = match &value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        other => other.as_i64(),
    };
    parsed
        .map(Value::Int64)
        .ok_or_else(|| invalid_number(index, filter, &value, ColumnType::Int64))
}

fn coerce_float(index: usize, filter: &FilterSpec, value: Value) -> Result<Value, CompileError> {
    let parsed = match &value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    parsed
        .filter(|f| f.is_finite())
        .map(Value::Float64)
        .ok_or_else(|| invalid_number(index, filter, &value, ColumnType::Float64))
}

fn invalid_number(
    index: usize,
    filter: &FilterSpec,
    value: &Value,
    expected: ColumnType,
) -> CompileError {
    CompileError::InvalidNumber {
        index,
        column: filter.column.clone(),
        value: value.to_string(),
        expected,
    }
}
