use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::AppConfig;

pub type DbPool = SqlitePool;

/// Application state holding the database connection pool
#[derive(Debug, Clone)]
pub struct AppState {
  pub db: DbPool,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
  #[error("Failed to connect to database: {0}")]
  Connect(#[from] sqlx::Error),

  #[error("Failed to run migrations: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open the connection pool and run migrations
pub async fn initialize_db(config: &AppConfig) -> Result<AppState, DbError> {
  info!(url = %config.database_url, "initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(config.max_connections)
    .connect(&config.database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("database initialized");

  Ok(AppState { db: pool })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_initialize_in_memory_db() {
    let config = AppConfig {
      database_url: "sqlite::memory:".to_string(),
      max_connections: 1,
      ..AppConfig::default()
    };

    let state = initialize_db(&config).await.expect("Should initialize");

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('enrollments', 'coupons')"
    )
    .fetch_all(&state.db)
    .await
    .expect("Failed to query tables");
    assert_eq!(tables.len(), 2);

    state.db.close().await;
  }

  #[tokio::test]
  async fn test_initialize_missing_file_fails() {
    let config = AppConfig {
      database_url: "sqlite://missing-dir/does/not/exist/coaching.db".to_string(),
      ..AppConfig::default()
    };

    assert!(matches!(initialize_db(&config).await, Err(DbError::Connect(_))));
  }
}
