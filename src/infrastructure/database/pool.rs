use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Connections are opened on first use, so the service starts (and reports
/// the database as unhealthy) even while Postgres is unreachable.
pub fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect_lazy(database_url)?;
    Ok(pool)
}
