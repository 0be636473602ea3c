use sqlx::SqliteExecutor;

use crate::error::StoreError;

pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Create the pipeline tables if they do not exist yet.
pub async fn apply<'e>(exec: impl SqliteExecutor<'e>) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(exec).await?;
    Ok(())
}
