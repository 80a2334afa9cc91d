pub mod types;
pub mod value;

pub use types::ColumnType;
pub use value::{Row, Value};
