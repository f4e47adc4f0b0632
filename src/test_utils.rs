//! Test utilities: in-memory database, seed helpers and mock factories

use crate::models::{CouponRecord, DiscountType, EnrollmentRecord, NewEnrollment};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database with migrations applied
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_enrollment(
  id: &str,
  program_name: &str,
  scheduled_date: Option<DateTime<Utc>>,
) -> EnrollmentRecord {
  EnrollmentRecord {
    id: id.to_string(),
    program_name: program_name.to_string(),
    scheduled_date,
    transaction_id: Some(format!("txn_{}", id)),
    amount_paid: Some(499.0),
    currency: Some("USD".to_string()),
    payment_method: Some("card".to_string()),
    status: Some("paid".to_string()),
    created_at: None,
  }
}

pub fn mock_new_enrollment(user_id: &str, program_name: &str) -> NewEnrollment {
  NewEnrollment {
    user_id: user_id.to_string(),
    program_name: program_name.to_string(),
    scheduled_date: None,
    transaction_id: Some("txn_test".to_string()),
    amount_paid: Some(499.0),
    currency: Some("USD".to_string()),
    payment_method: Some("card".to_string()),
    status: Some("paid".to_string()),
  }
}

/// 25% off, no window, no cap, any product
pub fn mock_coupon(code: &str) -> CouponRecord {
  CouponRecord {
    code: code.to_string(),
    discount: 25.0,
    discount_type: DiscountType::Percentage,
    valid_from: None,
    valid_to: None,
    usage_count: 0,
    usage_limit: None,
    product: None,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Parse an RFC 3339 literal; panics on a typo in the test itself
pub fn at(rfc3339: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(rfc3339)
    .expect("test timestamp should be RFC 3339")
    .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('enrollments', 'coupons')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected 2 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_at_parses_utc() {
    assert_eq!(at("2024-06-10T11:00:00+02:00"), at("2024-06-10T09:00:00Z"));
  }
}
