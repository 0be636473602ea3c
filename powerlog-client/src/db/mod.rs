//! SQLite access: schema, parameterized query functions and the [`Store`]
//! that wraps them with reconnect-and-retry.

pub mod hourly_queries;
pub mod price_queries;
pub mod raw_sample_queries;
pub mod schema;
mod store;

pub use store::{CompactionOutcome, Connect, SqliteConnector, Store};
