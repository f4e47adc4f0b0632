//! Coupon Validator
//!
//! Decides whether a discount code is redeemable right now, for a given
//! product. Checks run in a fixed order and the first failure wins:
//! existence, start of window, end of window, usage cap, product.
//!
//! Business-rule failures are values (`CouponRejection`), not panics. Only a
//! failing lookup transport produces `LookupFailed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, info};

use crate::dates::parse_scheduled_date;
use crate::models::{CouponRecord, DiscountType};

// ---------------------------------------------------------------------------
/// Rejection reasons: must reach the presentation layer unmodified
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum CouponRejection {
    #[error("Coupon not found")]
    NotFound,

    #[error("Coupon is not active yet")]
    NotYetActive,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon usage limit reached")]
    UsageLimitReached,

    #[error("Coupon does not apply to this product")]
    ProductMismatch,

    #[error("Coupon lookup failed: {0}")]
    LookupFailed(String),
}

impl CouponRejection {
    /// Stable machine-readable reason code
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NotYetActive => "not_yet_active",
            Self::Expired => "expired",
            Self::UsageLimitReached => "usage_limit_reached",
            Self::ProductMismatch => "product_mismatch",
            Self::LookupFailed(_) => "lookup_failed",
        }
    }

    /// Default checkout copy. Hosts with their own wording map `reason_code` instead.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound => "This coupon code is not valid. Please check and try again.",
            Self::NotYetActive => "This coupon code is not active yet.",
            Self::Expired => "This coupon code has expired.",
            Self::UsageLimitReached => "This coupon code has reached its usage limit.",
            Self::ProductMismatch => "This coupon code doesn't apply to this product.",
            Self::LookupFailed(_) => "We couldn't check this coupon right now. Please try again.",
        }
    }

    /// Only transport failures are worth retrying with the same code
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LookupFailed(_))
    }
}

// ---------------------------------------------------------------------------
/// Approval: the discount parameters checkout applies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponApproval {
    pub code: String,
    pub discount: f64,
    pub discount_type: DiscountType,
    pub product: Option<String>,
}

impl From<CouponRecord> for CouponApproval {
    fn from(coupon: CouponRecord) -> Self {
        Self {
            code: coupon.code,
            discount: coupon.discount,
            discount_type: coupon.discount_type,
            product: coupon.product,
        }
    }
}

impl CouponApproval {
    /// Price after discount, never below zero, rounded to cents
    pub fn discounted_price(&self, price: f64) -> f64 {
        let off = match self.discount_type {
            DiscountType::Percentage => price * self.discount.clamp(0.0, 100.0) / 100.0,
            DiscountType::Fixed => self.discount.max(0.0),
        };
        let charged = (price - off).max(0.0);
        (charged * 100.0).round() / 100.0
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate `code` for `product_id` at `now`.
///
/// `lookup` is the host's record source (database, document store, map). Its
/// error only needs `Display`; it is carried as `LookupFailed`.
pub fn validate<F, E>(
    code: &str,
    product_id: Option<&str>,
    lookup: F,
    now: DateTime<Utc>,
) -> Result<CouponApproval, CouponRejection>
where
    F: FnOnce(&str) -> Result<Option<CouponRecord>, E>,
    E: std::fmt::Display,
{
    let coupon = lookup(code)
        .map_err(|e| CouponRejection::LookupFailed(e.to_string()))?
        .ok_or(CouponRejection::NotFound)?;

    check_redeemable(&coupon, product_id, now)?;

    Ok(CouponApproval::from(coupon))
}

/// Window, usage and product checks for an already-found coupon
pub fn check_redeemable(
    coupon: &CouponRecord,
    product_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), CouponRejection> {
    if coupon.valid_from.is_some_and(|from| now < from) {
        return Err(CouponRejection::NotYetActive);
    }

    // Redeemable through the valid_to instant itself
    if coupon.valid_to.is_some_and(|to| now > to) {
        return Err(CouponRejection::Expired);
    }

    if coupon.usage_limit.is_some_and(|limit| coupon.usage_count >= limit) {
        return Err(CouponRejection::UsageLimitReached);
    }

    if !coupon.is_unrestricted() && coupon.product.as_deref() != product_id {
        return Err(CouponRejection::ProductMismatch);
    }

    Ok(())
}

/// Count one redemption through caller-supplied read and write callbacks.
///
/// This is a plain read-increment-write: two concurrent calls for the same
/// code can both read N and both write N + 1. Hosts whose storage offers an
/// atomic increment should use it instead (see [`increment_coupon_usage`]).
/// Returns the new usage count.
pub fn record_usage<L, P, E1, E2>(code: &str, lookup: L, persist: P) -> Result<u32, CouponRejection>
where
    L: FnOnce(&str) -> Result<Option<CouponRecord>, E1>,
    P: FnOnce(&str, u32) -> Result<(), E2>,
    E1: std::fmt::Display,
    E2: std::fmt::Display,
{
    let coupon = lookup(code)
        .map_err(|e| CouponRejection::LookupFailed(e.to_string()))?
        .ok_or(CouponRejection::NotFound)?;

    let new_count = coupon.usage_count.saturating_add(1);
    persist(code, new_count)
        .map_err(|e| CouponRejection::LookupFailed(format!("failed to persist usage: {}", e)))?;

    Ok(new_count)
}

// ---------------------------------------------------------------------------
// Database Operations
// ---------------------------------------------------------------------------

fn parse_bound(code: &str, column: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, String> {
    match raw {
        None => Ok(None),
        // An unreadable bound must not silently widen the window
        Some(raw) => parse_scheduled_date(&raw)
            .map(Some)
            .ok_or_else(|| format!("Invalid {} for coupon {}: {}", column, code, raw)),
    }
}

fn coupon_from_row(row: &SqliteRow) -> Result<CouponRecord, String> {
    let code: String = row.get("code");
    let discount_type: String = row.get("discount_type");
    let usage_count: i64 = row.get("usage_count");
    let usage_limit: Option<i64> = row.get("usage_limit");

    Ok(CouponRecord {
        discount: row.get("discount"),
        discount_type: discount_type.parse()?,
        valid_from: parse_bound(&code, "valid_from", row.get("valid_from"))?,
        valid_to: parse_bound(&code, "valid_to", row.get("valid_to"))?,
        usage_count: u32::try_from(usage_count.max(0)).unwrap_or(u32::MAX),
        usage_limit: usage_limit.map(|l| u32::try_from(l.max(0)).unwrap_or(u32::MAX)),
        product: row.get("product"),
        code,
    })
}

/// Look up a coupon by exact (case-sensitive) code
pub async fn find_coupon(pool: &SqlitePool, code: &str) -> Result<Option<CouponRecord>, String> {
    let row = sqlx::query(
        r#"
        SELECT code, discount, discount_type, valid_from, valid_to,
               usage_count, usage_limit, product
        FROM coupons
        WHERE code = ?
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await
    .map_err(|e| format!("Failed to load coupon: {}", e))?;

    row.as_ref().map(coupon_from_row).transpose()
}

/// Insert or replace a coupon definition
pub async fn save_coupon(pool: &SqlitePool, coupon: &CouponRecord) -> Result<(), String> {
    sqlx::query(
        r#"
        INSERT INTO coupons
            (code, discount, discount_type, valid_from, valid_to,
             usage_count, usage_limit, product)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(code) DO UPDATE SET
            discount = excluded.discount,
            discount_type = excluded.discount_type,
            valid_from = excluded.valid_from,
            valid_to = excluded.valid_to,
            usage_count = excluded.usage_count,
            usage_limit = excluded.usage_limit,
            product = excluded.product,
            updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
        "#,
    )
    .bind(&coupon.code)
    .bind(coupon.discount)
    .bind(coupon.discount_type.to_string())
    .bind(coupon.valid_from.map(|d| d.to_rfc3339()))
    .bind(coupon.valid_to.map(|d| d.to_rfc3339()))
    .bind(i64::from(coupon.usage_count))
    .bind(coupon.usage_limit.map(i64::from))
    .bind(&coupon.product)
    .execute(pool)
    .await
    .map_err(|e| format!("Failed to save coupon: {}", e))?;

    Ok(())
}

/// Atomically count one redemption.
///
/// The limit check and the increment are a single statement, so concurrent
/// redemptions can never push `usage_count` past `usage_limit`. Returns the
/// new count, or `UsageLimitReached` / `NotFound` when no row was updated.
pub async fn increment_coupon_usage(pool: &SqlitePool, code: &str) -> Result<u32, CouponRejection> {
    let updated: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE coupons
        SET usage_count = usage_count + 1,
            updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
        WHERE code = ?
          AND (usage_limit IS NULL OR usage_count < usage_limit)
        RETURNING usage_count
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await
    .map_err(|e| CouponRejection::LookupFailed(format!("Failed to record coupon usage: {}", e)))?;

    match updated {
        Some(count) => {
            info!(code, usage_count = count, "coupon usage recorded");
            Ok(u32::try_from(count).unwrap_or(u32::MAX))
        }
        None => {
            let exists = find_coupon(pool, code)
                .await
                .map_err(CouponRejection::LookupFailed)?
                .is_some();
            debug!(code, exists, "coupon usage not recorded");
            if exists {
                Err(CouponRejection::UsageLimitReached)
            } else {
                Err(CouponRejection::NotFound)
            }
        }
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
