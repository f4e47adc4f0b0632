pub mod commands;
pub mod config;
pub mod coupon;
pub mod dates;
pub mod db;
pub mod models;
pub mod timeline;

#[cfg(test)]
mod test_utils;

use tracing_subscriber::EnvFilter;

pub use config::{AppConfig, ConfigError};
pub use coupon::{validate, record_usage, CouponApproval, CouponRejection};
pub use db::{AppState, DbError};
pub use timeline::{classify, ClassificationResult};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Db(#[from] DbError),
}

/// Install the global tracing subscriber. Later calls are no-ops.
pub fn init_tracing(config: &AppConfig) {
  let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .try_init();
}

/// Start logging and open the database for an explicit configuration
pub async fn start(config: &AppConfig) -> Result<AppState, DbError> {
  init_tracing(config);
  db::initialize_db(config).await
}

/// Read configuration from the environment (and `.env`), then start
pub async fn bootstrap() -> Result<AppState, StartupError> {
  let config = AppConfig::from_env()?;
  Ok(start(&config).await?)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_start_with_in_memory_config() {
    let config = AppConfig {
      database_url: "sqlite::memory:".to_string(),
      max_connections: 1,
      log_filter: "not a [valid filter".to_string(),
    };

    let state = start(&config).await.expect("Should start");
    // Second init must not panic
    init_tracing(&config);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupons")
      .fetch_one(&state.db)
      .await
      .expect("Failed to count coupons");
    assert_eq!(count, 0);

    state.db.close().await;
  }
}
