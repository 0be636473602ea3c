pub mod db;
pub mod domain;
pub mod error;
pub mod timefmt;

pub use db::{CompactionOutcome, Connect, SqliteConnector, Store};
pub use error::StoreError;
