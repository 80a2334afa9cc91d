//! Filter specs and their compilation to parameterized SQL

pub mod compiler;
pub mod spanish;
pub mod spec;
pub mod template;

pub use compiler::{compile, CompileError, CompiledQuery};
pub use spanish::SpanishDateError;
pub use spec::{CampaignKind, FilterSpec, SendMode};
pub use template::QueryTemplates;
