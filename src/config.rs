use std::env;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

pub const DATABASE_URL_VAR: &str = "COACHING_DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "COACHING_DB_MAX_CONNECTIONS";
pub const LOG_FILTER_VAR: &str = "COACHING_LOG";

const DEFAULT_DATABASE_URL: &str = "sqlite://coaching-desk.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid value for {var}: {value}")]
  InvalidValue { var: &'static str, value: String },

  #[error("{0} must not be empty")]
  Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  pub database_url: String,
  pub max_connections: u32,
  pub log_filter: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      max_connections: DEFAULT_MAX_CONNECTIONS,
      log_filter: DEFAULT_LOG_FILTER.to_string(),
    }
  }
}

impl AppConfig {
  /// Read configuration from the environment (after loading `.env`, if present).
  /// Unset variables fall back to defaults; set-but-bad variables are errors.
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenvy::dotenv().ok();

    let defaults = Self::default();

    let database_url = match env::var(DATABASE_URL_VAR) {
      Ok(url) if url.trim().is_empty() => return Err(ConfigError::Empty(DATABASE_URL_VAR)),
      Ok(url) => url.trim().to_string(),
      Err(_) => defaults.database_url,
    };

    let max_connections = match env::var(MAX_CONNECTIONS_VAR) {
      Ok(raw) => match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
          return Err(ConfigError::InvalidValue {
            var: MAX_CONNECTIONS_VAR,
            value: raw,
          })
        }
      },
      Err(_) => defaults.max_connections,
    };

    let log_filter = env::var(LOG_FILTER_VAR)
      .ok()
      .filter(|f| !f.trim().is_empty())
      .unwrap_or(defaults.log_filter);

    Ok(Self {
      database_url,
      max_connections,
      log_filter,
    })
  }
}
