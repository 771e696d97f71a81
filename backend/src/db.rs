#[cfg(not(any(feature = "db-sqlite", feature = "db-postgres")))]
compile_error!("Either the `db-sqlite` or `db-postgres` feature must be enabled.");

#[cfg(all(feature = "db-sqlite", feature = "db-postgres"))]
compile_error!("Only one of `db-sqlite` or `db-postgres` can be enabled.");

#[cfg(feature = "db-postgres")]
pub use sqlx::postgres::{PgPool as DbPool, PgPoolOptions as DbPoolOptions, Postgres as Db};

#[cfg(feature = "db-sqlite")]
pub use sqlx::sqlite::{Sqlite as Db, SqlitePool as DbPool, SqlitePoolOptions as DbPoolOptions};

use crate::config::DatabaseConfig;

/// Opens the pool and brings the schema up to date.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let db_pool = DbPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    migrate(&db_pool).await?;

    Ok(db_pool)
}

pub async fn migrate(db_pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(db_pool).await?;
    tracing::info!("Migrations complete.");
    Ok(())
}
