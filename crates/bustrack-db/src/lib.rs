//! # Bustrack DB
//!
//! PostgreSQL pool initialisation and schema migrations.
//!
//! ```ignore
//! use bustrack_db::{init_db_pool, run_migrations};
//!
//! let pool = init_db_pool(&database_url).await?;
//! run_migrations(&pool).await?;
//! ```

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

// Re-export PgPool for convenience
pub use sqlx::PgPool;

const MAX_CONNECTIONS: u32 = 20;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .idle_timeout(Duration::from_secs(30))
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

/// Connects a pool to `database_url`, failing fast if the database is unreachable.
pub async fn init_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = pool_options().connect(database_url).await?;
    info!(db.max_connections = MAX_CONNECTIONS, "Database pool initialized");
    Ok(pool)
}

/// Builds a pool without opening any connection. Connections are made on
/// first use, so this never fails on an unreachable database.
pub fn lazy_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    pool_options().connect_lazy(database_url)
}

/// Applies the migrations in `migrations/` at the workspace root.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
