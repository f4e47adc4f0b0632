use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::coupon::{self, find_coupon, increment_coupon_usage, CouponApproval, CouponRejection};
use crate::db::AppState;

/// ---------------------------------------------------------------------------
/// Checkout Commands
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuote {
  pub original_price: f64,
  pub charged_price: f64,
  pub coupon: CouponApproval,
}

/// Check a code when the user applies it at checkout. Does not count a use.
pub async fn apply_coupon(
  state: &AppState,
  code: &str,
  product_id: Option<&str>,
  now: DateTime<Utc>,
) -> Result<CouponApproval, CouponRejection> {
  let found = find_coupon(&state.db, code).await;
  let result = coupon::validate(code, product_id, |_| found, now);

  if let Err(rejection) = &result {
    warn!(code, product_id, reason = rejection.reason_code(), "coupon rejected");
  }

  result
}

/// Validate a code and price the product with it
pub async fn quote_price(
  state: &AppState,
  code: &str,
  product_id: Option<&str>,
  price: f64,
  now: DateTime<Utc>,
) -> Result<CheckoutQuote, CouponRejection> {
  let approval = apply_coupon(state, code, product_id, now).await?;

  Ok(CheckoutQuote {
    original_price: price,
    charged_price: approval.discounted_price(price),
    coupon: approval,
  })
}

/// Validate and count one redemption after payment succeeds.
///
/// The usage increment is atomic: if another buyer took the last use between
/// validation and redemption, this returns `UsageLimitReached`.
pub async fn redeem_coupon(
  state: &AppState,
  code: &str,
  product_id: Option<&str>,
  now: DateTime<Utc>,
) -> Result<CouponApproval, CouponRejection> {
  let approval = apply_coupon(state, code, product_id, now).await?;
  let usage_count = increment_coupon_usage(&state.db, code).await?;

  info!(code, usage_count, "coupon redeemed");

  Ok(approval)
}
