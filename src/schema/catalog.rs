//! `INFORMATION_SCHEMA` lookups
//!
//! Identifiers in the `FROM` clause cannot be bound as parameters, so callers
//! validate the [`TableRef`] first; the table name itself is bound as `@table`.

use serde::Serialize;

use super::TableRef;
use crate::data::{Row, Value};
use crate::warehouse::{Params, Warehouse, WarehouseError};

/// How a column holds values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnMode {
    Nullable,
    Required,
    Repeated,
}

impl ColumnMode {
    fn from_catalog(data_type: &str, is_nullable: &str) -> Self {
        if data_type.trim_start().to_ascii_uppercase().starts_with("ARRAY<") {
            ColumnMode::Repeated
        } else if is_nullable.eq_ignore_ascii_case("NO") {
            ColumnMode::Required
        } else {
            ColumnMode::Nullable
        }
    }
}

/// Column as reported by the catalog, before type normalization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub mode: ColumnMode,
}

pub fn columns_sql(table: &TableRef) -> String {
    format!(
        "SELECT column_name, data_type, is_nullable \
         FROM `{}.{}.INFORMATION_SCHEMA.COLUMNS` \
         WHERE table_name = @table \
         ORDER BY ordinal_position",
        table.project, table.dataset
    )
}

pub fn tables_sql(project: &str, dataset: &str) -> String {
    format!(
        "SELECT table_name FROM `{}.{}.INFORMATION_SCHEMA.TABLES` ORDER BY table_name",
        project, dataset
    )
}

/// Columns of `table` in declaration order; empty when the table does not exist
pub async fn fetch_columns(
    warehouse: &dyn Warehouse,
    table: &TableRef,
) -> Result<Vec<ColumnDescriptor>, WarehouseError> {
    let mut params = Params::new();
    params.insert("table".to_string(), Value::String(table.table.clone()));

    let rows = warehouse.execute(&columns_sql(table), &params).await?;
    rows.iter().map(column_from_row).collect()
}

/// Every table name in the dataset
pub async fn list_tables(
    warehouse: &dyn Warehouse,
    project: &str,
    dataset: &str,
) -> Result<Vec<String>, WarehouseError> {
    let rows = warehouse
        .execute(&tables_sql(project, dataset), &Params::new())
        .await?;
    rows.iter()
        .map(|row| text(row, "table_name").map(str::to_string))
        .collect()
}

fn column_from_row(row: &Row) -> Result<ColumnDescriptor, WarehouseError> {
    let data_type = text(row, "data_type")?;
    let is_nullable = row
        .get("is_nullable")
        .and_then(Value::as_str)
        .unwrap_or("YES");

    Ok(ColumnDescriptor {
        name: text(row, "column_name")?.to_string(),
        data_type: data_type.to_string(),
        mode: ColumnMode::from_catalog(data_type, is_nullable),
    })
}

fn text<'a>(row: &'a Row, column: &str) -> Result<&'a str, WarehouseError> {
    row.get(column).and_then(Value::as_str).ok_or_else(|| {
        WarehouseError::Deserialization(format!("catalog row is missing '{}'", column))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::MemoryWarehouse;

    #[tokio::test]
    async fn test_fetch_columns() {
        let warehouse = MemoryWarehouse::new()
            .with_table(
                "clientes",
                &[("telefono", "STRING"), ("edad", "INT64"), ("tags", "ARRAY<STRING>")],
            )
            .with_required("clientes", "telefono");

        let table = TableRef::new("p", "d", "clientes");
        let columns = fetch_columns(&warehouse, &table).await.unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "telefono");
        assert_eq!(columns[0].mode, ColumnMode::Required);
        assert_eq!(columns[1].data_type, "INT64");
        assert_eq!(columns[1].mode, ColumnMode::Nullable);
        assert_eq!(columns[2].mode, ColumnMode::Repeated);

        let executed = warehouse.executed();
        let (sql, params) = &executed[0];
        assert!(sql.contains("`p.d.INFORMATION_SCHEMA.COLUMNS`"));
        assert_eq!(params["table"], Value::from("clientes"));
    }

    #[tokio::test]
    async fn test_fetch_columns_unknown_table() {
        let warehouse = MemoryWarehouse::new();
        let columns = fetch_columns(&warehouse, &TableRef::new("p", "d", "nada"))
            .await
            .unwrap();
        assert!(columns.is_empty());
    }

    #[tokio::test]
    async fn test_list_tables() {
        let warehouse = MemoryWarehouse::new()
            .with_table("zonas", &[])
            .with_table("clientes", &[]);

        let tables = list_tables(&warehouse, "p", "d").await.unwrap();
        assert_eq!(tables, vec!["clientes".to_string(), "zonas".to_string()]);
    }

    #[test]
    fn test_descriptor_serialization() {
        let column = ColumnDescriptor {
            name: "edad".into(),
            data_type: "INT64".into(),
            mode: ColumnMode::Nullable,
        };
        assert_eq!(
            serde_json::to_value(&column).unwrap(),
            serde_json::json!({"name": "edad", "type": "INT64", "mode": "NULLABLE"})
        );
    }
}
