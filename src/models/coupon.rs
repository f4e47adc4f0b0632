use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dates;

/// Product value meaning "no product restriction"
pub const ALL_PRODUCTS: &str = "allproducts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
  /// `discount` is a percent of the price
  Percentage,
  /// `discount` is an amount in the checkout currency
  Fixed,
}

impl std::fmt::Display for DiscountType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Percentage => write!(f, "percentage"),
      Self::Fixed => write!(f, "fixed"),
    }
  }
}

impl std::str::FromStr for DiscountType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "percentage" => Ok(Self::Percentage),
      "fixed" => Ok(Self::Fixed),
      _ => Err(format!("Unknown discount type: {}", s)),
    }
  }
}

/// A discount code as stored. Codes are case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRecord {
  pub code: String,
  pub discount: f64,
  pub discount_type: DiscountType,
  /// An unreadable bound fails deserialization rather than widening the window
  #[serde(default, deserialize_with = "dates::deserialize_strict")]
  pub valid_from: Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "dates::deserialize_strict")]
  pub valid_to: Option<DateTime<Utc>>,
  #[serde(default)]
  pub usage_count: u32,
  /// None = unlimited
  #[serde(default)]
  pub usage_limit: Option<u32>,
  /// None or `allproducts` = unrestricted
  #[serde(default)]
  pub product: Option<String>,
}

impl CouponRecord {
  /// True when the coupon applies to every product
  pub fn is_unrestricted(&self) -> bool {
    match self.product.as_deref() {
      None => true,
      Some(product) => product == ALL_PRODUCTS,
    }
  }
}
