use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dates;

/// A user's purchase of a coaching program, optionally tied to a session time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRecord {
  pub id: String,
  pub program_name: String,
  /// None means not yet scheduled (or the stored value was unreadable)
  #[serde(default, deserialize_with = "dates::deserialize_lenient")]
  pub scheduled_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub transaction_id: Option<String>,
  #[serde(default)]
  pub amount_paid: Option<f64>,
  #[serde(default)]
  pub currency: Option<String>,
  #[serde(default)]
  pub payment_method: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default, deserialize_with = "dates::deserialize_lenient")]
  pub created_at: Option<DateTime<Utc>>,
}

/// For inserting new enrollments (id and created_at are assigned on insert)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnrollment {
  pub user_id: String,
  pub program_name: String,
  #[serde(default, deserialize_with = "dates::deserialize_lenient")]
  pub scheduled_date: Option<DateTime<Utc>>,
  pub transaction_id: Option<String>,
  pub amount_paid: Option<f64>,
  pub currency: Option<String>,
  pub payment_method: Option<String>,
  pub status: Option<String>,
}
