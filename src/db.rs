// src/db.rs

use std::{str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::config::Config;

const CONNECT_ATTEMPTS: u32 = 5;

pub async fn init_db(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut attempt = 0;
    let db = loop {
        attempt += 1;
        match SqlitePoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect_with(options.clone())
            .await
        {
            Ok(pool) => {
                tracing::info!(url = %config.database_url, "DB connected successfully");
                break pool;
            }
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                tracing::warn!(error = %e, attempt, "DB connection failed, retrying in 3s");
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            Err(e) => return Err(e.into()),
        }
    };

    migrate(&db).await?;
    Ok(db)
}

/// Single-connection in-memory database, migrated. The connection is never
/// recycled, otherwise the data would vanish with it.
pub async fn init_db_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let db = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&db).await?;
    Ok(db)
}

async fn migrate(db: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(db).await
}
