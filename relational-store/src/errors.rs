use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the relational store.
///
/// Callers in `resilience` map these onto the four-kind failure taxonomy:
/// connection/pool failures are `Fatal`, unique-key violations are
/// `LocalInvariant`, everything else is treated as transient.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("unique key violation on {table}: {detail}")]
    UniqueViolation { table: &'static str, detail: String },

    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// True when the underlying Postgres error is a unique-constraint
    /// violation (SQLSTATE 23505) — used by callers to distinguish "this
    /// row already exists" (fine, idempotent upsert) from a genuine error.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Db(sqlx::Error::Database(e)) => e.code().as_deref() == Some("23505"),
            _ => false,
        }
    }
}
