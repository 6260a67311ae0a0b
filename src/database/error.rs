use thiserror::Error;

/// Failure of a single record-store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("{collection} record {id} not found")]
    NotFound { collection: &'static str, id: i64 },
    #[error("malformed {collection} row: {reason}")]
    Malformed {
        collection: &'static str,
        reason: String,
    },
}

impl StoreError {
    pub(crate) fn malformed(collection: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            collection,
            reason: reason.into(),
        }
    }
}
