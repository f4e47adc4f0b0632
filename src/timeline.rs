//! Session Timeline Classifier
//!
//! Splits a user's enrollments into upcoming and past coaching sessions and
//! derives the dashboard status line.
//!
//! Rules:
//! - Instant comparison decides the bucket: strictly after `now` is upcoming,
//!   at or before `now` is past
//! - Day counts in the message use UTC calendar dates, never raw elapsed time
//! - Records without a usable date are unscheduled and sit in neither bucket

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::dates::{calendar_days_between, parse_scheduled_date};
use crate::models::{EnrollmentRecord, NewEnrollment};

pub const NO_SESSIONS_MESSAGE: &str = "No sessions scheduled yet";

// ---------------------------------------------------------------------------
/// Classification Result: recomputed on every call, never persisted
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Earliest first
    pub upcoming: Vec<EnrollmentRecord>,
    /// Most recent first
    pub past: Vec<EnrollmentRecord>,
    /// No scheduled date, in input order
    pub unscheduled: Vec<EnrollmentRecord>,
    pub message: String,
}

impl ClassificationResult {
    pub fn upcoming_count(&self) -> usize {
        self.upcoming.len()
    }

    pub fn past_count(&self) -> usize {
        self.past.len()
    }

    /// Next session, if any
    pub fn next_session(&self) -> Option<&EnrollmentRecord> {
        self.upcoming.first()
    }

    /// Most recent past session, if any
    pub fn last_session(&self) -> Option<&EnrollmentRecord> {
        self.past.first()
    }
}

/// Classify enrollments relative to `now`.
///
/// Total over its inputs: never fails, never drops or duplicates a record.
pub fn classify(records: &[EnrollmentRecord], now: DateTime<Utc>) -> ClassificationResult {
    let mut upcoming = Vec::new();
    let mut past = Vec::new();
    let mut unscheduled = Vec::new();

    for record in records {
        match record.scheduled_date {
            Some(date) if date > now => upcoming.push(record.clone()),
            Some(_) => past.push(record.clone()),
            None => unscheduled.push(record.clone()),
        }
    }

    // Stable sorts: equal dates keep input order
    upcoming.sort_by_key(|r| r.scheduled_date);
    past.sort_by(|a, b| b.scheduled_date.cmp(&a.scheduled_date));

    let message = status_message(&upcoming, &past, now);

    ClassificationResult {
        upcoming,
        past,
        unscheduled,
        message,
    }
}

fn status_message(
    upcoming: &[EnrollmentRecord],
    past: &[EnrollmentRecord],
    now: DateTime<Utc>,
) -> String {
    if let Some((next, date)) = upcoming
        .first()
        .and_then(|r| r.scheduled_date.map(|d| (r, d)))
    {
        let phrase = match calendar_days_between(now, date) {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            days => format!("in {} days", days),
        };
        return format!("Your next session for {} is {}", next.program_name, phrase);
    }

    if let Some((last, date)) = past
        .first()
        .and_then(|r| r.scheduled_date.map(|d| (r, d)))
    {
        let phrase = match calendar_days_between(date, now) {
            0 => "today".to_string(),
            1 => "yesterday".to_string(),
            days => format!("{} days ago", days),
        };
        return format!("Your last session for {} was {}", last.program_name, phrase);
    }

    NO_SESSIONS_MESSAGE.to_string()
}

// ---------------------------------------------------------------------------
// Database Operations
// ---------------------------------------------------------------------------

/// Store format for session dates
fn to_stored_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Load all enrollments for a user, oldest purchase first
pub async fn load_enrollments(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<EnrollmentRecord>, String> {
    let rows = sqlx::query(
        r#"
        SELECT
            id, program_name, scheduled_date, transaction_id, amount_paid,
            currency, payment_method, status, created_at
        FROM enrollments
        WHERE user_id = ?
        ORDER BY created_at, rowid
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to load enrollments: {}", e))?;

    let mut enrollments = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.get("id");
        let scheduled_raw: Option<String> = row.get("scheduled_date");
        let created_raw: Option<String> = row.get("created_at");

        let scheduled_date = scheduled_raw.as_deref().and_then(|raw| {
            let parsed = parse_scheduled_date(raw);
            if parsed.is_none() {
                warn!(enrollment_id = %id, raw, "unreadable scheduled_date, treating as unscheduled");
            }
            parsed
        });

        enrollments.push(EnrollmentRecord {
            id,
            program_name: row.get("program_name"),
            scheduled_date,
            transaction_id: row.get("transaction_id"),
            amount_paid: row.get("amount_paid"),
            currency: row.get("currency"),
            payment_method: row.get("payment_method"),
            status: row.get("status"),
            created_at: created_raw.as_deref().and_then(parse_scheduled_date),
        });
    }

    debug!(user_id, count = enrollments.len(), "loaded enrollments");
    Ok(enrollments)
}

/// Insert a new enrollment, returning its server-assigned id
pub async fn insert_enrollment(pool: &SqlitePool, enrollment: &NewEnrollment) -> Result<String, String> {
    let scheduled = enrollment.scheduled_date.map(to_stored_date);

    let id: String = sqlx::query_scalar(
        r#"
        INSERT INTO enrollments
            (user_id, program_name, scheduled_date, transaction_id,
             amount_paid, currency, payment_method, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&enrollment.user_id)
    .bind(&enrollment.program_name)
    .bind(&scheduled)
    .bind(&enrollment.transaction_id)
    .bind(enrollment.amount_paid)
    .bind(&enrollment.currency)
    .bind(&enrollment.payment_method)
    .bind(&enrollment.status)
    .fetch_one(pool)
    .await
    .map_err(|e| format!("Failed to insert enrollment: {}", e))?;

    Ok(id)
}

/// Set (or move) the session time of one of a user's enrollments
pub async fn schedule_session(
    pool: &SqlitePool,
    user_id: &str,
    enrollment_id: &str,
    scheduled_date: DateTime<Utc>,
) -> Result<(), String> {
    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET scheduled_date = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(to_stored_date(scheduled_date))
    .bind(enrollment_id)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| format!("Failed to schedule session: {}", e))?;

    if result.rows_affected() == 0 {
        return Err(format!("Enrollment not found: {}", enrollment_id));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
