pub mod key;
pub mod policy;
pub mod query;
pub mod sweeper;

pub use key::generate_key;
pub use policy::CachePolicy;
pub use query::{CacheEntry, CacheStats, QueryCache};
pub use sweeper::CacheSweeper;
