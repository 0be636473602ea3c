use thiserror::Error;

/// Failure of a time-series store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The connection to the database broke. The store has already tried one
    /// reconnect by the time a caller sees this.
    #[error("store transport error: {0}")]
    Transport(#[source] sqlx::Error),
    /// A uniqueness constraint tripped. Indicates a bug, not a runtime condition.
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),
    #[error("store query error: {0}")]
    Query(#[source] sqlx::Error),
    #[error("value encoding error: {0}")]
    Codec(String),
}

/// Errors caused by the link to the database rather than by the statement.
pub fn is_transport(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if is_transport(&e) {
            return StoreError::Transport(e);
        }
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DataIntegrity(db.message().to_string())
            }
            _ => StoreError::Query(e),
        }
    }
}

impl From<time::error::Format> for StoreError {
    fn from(e: time::error::Format) -> Self {
        StoreError::Codec(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_pool_is_a_transport_error() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Transport(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }
}
