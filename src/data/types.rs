use serde::{Deserialize, Serialize};

/// Canonical column type, independent of how the warehouse spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    String,
    Bytes,
    Bool,
    Int64,
    Float64,
    Numeric,
    BigNumeric,
    Date,
    Time,
    DateTime,
    Timestamp,
}

impl ColumnType {
    /// Map a warehouse-reported type name to its canonical tag.
    ///
    /// Accepts both standard SQL names (`INT64`, `FLOAT64`, `BOOL`) and the
    /// legacy aliases (`INTEGER`, `FLOAT`, `BOOLEAN`). Parameterized types such
    /// as `STRING(10)` or `NUMERIC(10, 2)` normalize to their base type.
    /// Anything unrecognized, including `ARRAY<…>`/`STRUCT<…>`, is `STRING`.
    pub fn normalize(raw: &str) -> Self {
        let base = raw
            .split(|c| c == '(' || c == '<')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();

        match base.as_str() {
            "STRING" => ColumnType::String,
            "BYTES" => ColumnType::Bytes,
            "BOOL" | "BOOLEAN" => ColumnType::Bool,
            "INT64" | "INTEGER" | "INT" | "SMALLINT" | "BIGINT" | "TINYINT" | "BYTEINT" => {
                ColumnType::Int64
            }
            "FLOAT64" | "FLOAT" => ColumnType::Float64,
            "NUMERIC" | "DECIMAL" => ColumnType::Numeric,
            "BIGNUMERIC" | "BIGDECIMAL" => ColumnType::BigNumeric,
            "DATE" => ColumnType::Date,
            "TIME" => ColumnType::Time,
            "DATETIME" => ColumnType::DateTime,
            "TIMESTAMP" => ColumnType::Timestamp,
            _ => ColumnType::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "STRING",
            ColumnType::Bytes => "BYTES",
            ColumnType::Bool => "BOOL",
            ColumnType::Int64 => "INT64",
            ColumnType::Float64 => "FLOAT64",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::BigNumeric => "BIGNUMERIC",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }
}

impl Default for ColumnType {
    fn default() -> Self {
        ColumnType::String
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_aliases() {
        assert_eq!(ColumnType::normalize("INTEGER"), ColumnType::Int64);
        assert_eq!(ColumnType::normalize("FLOAT"), ColumnType::Float64);
        assert_eq!(ColumnType::normalize("BOOLEAN"), ColumnType::Bool);
    }

    #[test]
    fn test_unknown_is_string() {
        assert_eq!(ColumnType::normalize("GEOGRAPHY"), ColumnType::String);
        assert_eq!(ColumnType::normalize("JSON"), ColumnType::String);
        assert_eq!(ColumnType::normalize(""), ColumnType::String);
        assert_eq!(ColumnType::normalize("ARRAY<INT64>"), ColumnType::String);
        assert_eq!(ColumnType::normalize("STRUCT<a INT64>"), ColumnType::String);
    }

    #[test]
    fn test_parameterized_and_case() {
        assert_eq!(ColumnType::normalize("NUMERIC(10, 2)"), ColumnType::Numeric);
        assert_eq!(ColumnType::normalize("STRING(255)"), ColumnType::String);
        assert_eq!(ColumnType::normalize("bignumeric"), ColumnType::BigNumeric);
        assert_eq!(ColumnType::normalize(" date "), ColumnType::Date);
        assert_eq!(ColumnType::normalize("DATETIME"), ColumnType::DateTime);
        assert_eq!(ColumnType::normalize("TIMESTAMP"), ColumnType::Timestamp);
    }

    #[test]
    fn test_display_roundtrips_through_normalize() {
        for ty in [
            ColumnType::String,
            ColumnType::Bytes,
            ColumnType::Bool,
            ColumnType::Int64,
            ColumnType::Float64,
            ColumnType::Numeric,
            ColumnType::BigNumeric,
            ColumnType::Date,
            ColumnType::Time,
            ColumnType::DateTime,
            ColumnType::Timestamp,
        ] {
            assert_eq!(ColumnType::normalize(&ty.to_string()), ty);
        }
    }
}
