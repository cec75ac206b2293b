use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::instrument;

use crate::errors::Result;

/// Opens a connection pool and runs pending migrations.
///
/// Pool size is deliberately small and configurable per component, each
/// with its own max-connections.
#[instrument(skip(database_url))]
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
