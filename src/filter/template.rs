//! Full statement templates around a compiled `WHERE` clause
//!
//! Both variants filter the base table first, join the companion table
//! (bringing its columns along, minus the shared join key) and keep one row
//! per dedup key via `ROW_NUMBER() ... rn = 1`, so duplicate
//! join matches never reach the caller.

use super::compiler::CompiledQuery;
use super::spec::{CampaignKind, SendMode};
use crate::schema::TableSchema;

#[derive(Debug, Clone)]
pub struct QueryTemplates {
    /// Column collapsed to one row per value (phone number)
    pub dedup_column: String,
    /// Stable ordering inside each dedup partition
    pub tiebreak_column: String,
    /// Base name of the per-mode companion table for reminders (`{name}_m0`, `{name}_m1`)
    pub reminder_companion: String,
    /// Companion table for every other campaign kind
    pub default_companion: String,
}

impl Default for QueryTemplates {
    fn default() -> Self {
        Self {
            dedup_column: "telefono".to_string(),
            tiebreak_column: "fecha_actualizacion".to_string(),
            reminder_companion: "envios".to_string(),
            default_companion: "contactos".to_string(),
        }
    }
}

impl QueryTemplates {
    /// Companion table joined for this campaign kind and send mode
    pub fn companion_table(&self, campaign: &CampaignKind, mode: SendMode) -> String {
        match campaign {
            CampaignKind::Reminder => format!("{}_{}", self.reminder_companion, mode.suffix()),
            _ => self.default_companion.clone(),
        }
    }

    /// Render the statement for `table`; its schema has already been fetched,
    /// so the table name is a known warehouse identifier.
    pub fn render(
        &self,
        table: &TableSchema,
        compiled: &CompiledQuery,
        campaign: &CampaignKind,
        mode: SendMode,
    ) -> String {
        let base = table.table_ref.qualified();
        let companion = format!(
            "{}.{}.{}",
            table.table_ref.project,
            table.table_ref.dataset,
            self.companion_table(campaign, mode)
        );
        let join = match campaign {
            CampaignKind::Reminder => "INNER JOIN",
            _ => "LEFT JOIN",
        };

        format!(
            "WITH filtrado AS (\n  \
               SELECT * FROM `{base}` WHERE {where_sql}\n\
             ),\n\
             unido AS (\n  \
               SELECT f.*, c.* EXCEPT({dedup}),\n    \
                 ROW_NUMBER() OVER (PARTITION BY f.{dedup} ORDER BY f.{tiebreak}) AS rn\n  \
               FROM filtrado AS f\n  \
               {join} `{companion}` AS c ON f.{dedup} = c.{dedup}\n\
             )\n\
             SELECT * EXCEPT(rn) FROM unido WHERE rn = 1",
            base = base,
            where_sql = compiled.where_sql,
            dedup = self.dedup_column,
            tiebreak = self.tiebreak_column,
            join = join,
            companion = companion,
        )
    }
}
