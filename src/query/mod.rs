pub mod request;
pub mod service;

pub use request::FilterRequest;
pub use service::{FilterOutcome, FilterService};

use crate::filter::CompileError;
use crate::schema::SchemaError;
use crate::warehouse::WarehouseError;

#[derive(Debug, thiserror::Error)]
pub enum FilterQueryError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(#[from] SchemaError),

    #[error("Compile error on table '{table}': {source}")]
    Compile {
        table: String,
        #[source]
        source: CompileError,
    },

    #[error("Execution error on table '{table}': {source}")]
    Execution {
        table: String,
        #[source]
        source: WarehouseError,
    },
}
