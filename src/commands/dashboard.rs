use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::dates::parse_scheduled_date;
use crate::db::AppState;
use crate::models::{EnrollmentRecord, NewEnrollment};
use crate::timeline::{self, classify, ClassificationResult};

/// ---------------------------------------------------------------------------
/// Dashboard Summary
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
  pub total_enrollments: usize,
  pub upcoming_count: usize,
  pub past_count: usize,
  pub unscheduled_count: usize,
  pub message: String,
  pub upcoming: Vec<EnrollmentRecord>,
  pub past: Vec<EnrollmentRecord>,
  pub unscheduled: Vec<EnrollmentRecord>,
}

impl From<ClassificationResult> for DashboardSummary {
  fn from(result: ClassificationResult) -> Self {
    Self {
      total_enrollments: result.upcoming.len() + result.past.len() + result.unscheduled.len(),
      upcoming_count: result.upcoming_count(),
      past_count: result.past_count(),
      unscheduled_count: result.unscheduled.len(),
      message: result.message,
      upcoming: result.upcoming,
      past: result.past,
      unscheduled: result.unscheduled,
    }
  }
}

/// Load a user's enrollments and classify their sessions (page load, tab switch)
pub async fn get_dashboard(
  state: &AppState,
  user_id: &str,
  now: DateTime<Utc>,
) -> Result<DashboardSummary, String> {
  let enrollments = timeline::load_enrollments(&state.db, user_id).await?;
  let summary = DashboardSummary::from(classify(&enrollments, now));

  debug!(
    user_id,
    upcoming = summary.upcoming_count,
    past = summary.past_count,
    "dashboard classified"
  );

  Ok(summary)
}

/// Record a paid enrollment, returning its id
pub async fn book_enrollment(state: &AppState, enrollment: NewEnrollment) -> Result<String, String> {
  if enrollment.user_id.trim().is_empty() {
    return Err("User id is required".to_string());
  }
  if enrollment.program_name.trim().is_empty() {
    return Err("Program name is required".to_string());
  }

  let id = timeline::insert_enrollment(&state.db, &enrollment).await?;
  info!(
    user_id = %enrollment.user_id,
    enrollment_id = %id,
    program = %enrollment.program_name,
    "enrollment booked"
  );

  Ok(id)
}

/// Schedule a session from a submitted date string.
/// Unreadable dates are refused rather than stored.
pub async fn set_session_date(
  state: &AppState,
  user_id: &str,
  enrollment_id: &str,
  raw_date: &str,
) -> Result<DateTime<Utc>, String> {
  let scheduled = parse_scheduled_date(raw_date)
    .ok_or_else(|| format!("Invalid session date: {}", raw_date))?;

  timeline::schedule_session(&state.db, user_id, enrollment_id, scheduled).await?;
  info!(user_id, enrollment_id, scheduled = %scheduled, "session scheduled");

  Ok(scheduled)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;
  use chrono::Duration;

  #[tokio::test]
  async fn test_get_dashboard_empty() {
    let pool = setup_test_db().await;
    let state = AppState { db: pool.clone() };

    let summary = get_dashboard(&state, "user_1", at("2024-06-10T09:00:00Z"))
      .await
      .expect("Should load dashboard");

    assert_eq!(summary.total_enrollments, 0);
    assert_eq!(summary.message, "No sessions scheduled yet");

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_get_dashboard_end_to_end() {
    let pool = setup_test_db().await;
    let state = AppState { db: pool.clone() };
    let now = at("2024-06-10T09:00:00Z");

    let mut consulting = mock_new_enrollment("user_1", "Break into Consulting");
    consulting.scheduled_date = Some(now + Duration::days(2));
    let mut coaching = mock_new_enrollment("user_1", "Unlimited Coaching");
    coaching.scheduled_date = Some(now - Duration::days(5));
    book_enrollment(&state, consulting).await.expect("Should book");
    book_enrollment(&state, coaching).await.expect("Should book");
    book_enrollment(&state, mock_new_enrollment("user_1", "Resume Review"))
      .await
      .expect("Should book");

    let summary = get_dashboard(&state, "user_1", now).await.expect("Should load dashboard");

    assert_eq!(summary.total_enrollments, 3);
    assert_eq!(summary.upcoming_count, 1);
    assert_eq!(summary.past_count, 1);
    assert_eq!(summary.unscheduled_count, 1);
    assert_eq!(summary.upcoming[0].program_name, "Break into Consulting");
    assert_eq!(summary.past[0].program_name, "Unlimited Coaching");
    assert_eq!(
      summary.message,
      "Your next session for Break into Consulting is in 2 days"
    );

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_book_enrollment_requires_program_name() {
    let pool = setup_test_db().await;
    let state = AppState { db: pool.clone() };

    let result = book_enrollment(&state, mock_new_enrollment("user_1", "  ")).await;
    assert!(result.is_err());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_set_session_date_parses_and_stores() {
    let pool = setup_test_db().await;
    let state = AppState { db: pool.clone() };
    let id = book_enrollment(&state, mock_new_enrollment("user_1", "X"))
      .await
      .expect("Should book");

    let scheduled = set_session_date(&state, "user_1", &id, "2024-06-11 00:30:00")
      .await
      .expect("Should schedule");
    assert_eq!(scheduled, at("2024-06-11T00:30:00Z"));

    let summary = get_dashboard(&state, "user_1", at("2024-06-10T09:00:00Z"))
      .await
      .expect("Should load dashboard");
    assert_eq!(summary.message, "Your next session for X is tomorrow");

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_set_session_date_rejects_garbage() {
    let pool = setup_test_db().await;
    let state = AppState { db: pool.clone() };
    let id = book_enrollment(&state, mock_new_enrollment("user_1", "X"))
      .await
      .expect("Should book");

    let result = set_session_date(&state, "user_1", &id, "next week sometime").await;
    assert!(result.unwrap_err().contains("Invalid session date"));

    let summary = get_dashboard(&state, "user_1", at("2024-06-10T09:00:00Z"))
      .await
      .expect("Should load dashboard");
    assert_eq!(summary.unscheduled_count, 1);

    teardown_test_db(pool).await;
  }
}
