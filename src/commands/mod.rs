//! Operations the application shell calls: dashboard loads and checkout

pub mod checkout;
pub mod dashboard;

pub use checkout::{apply_coupon, quote_price, redeem_coupon, CheckoutQuote};
pub use dashboard::{book_enrollment, get_dashboard, set_session_date, DashboardSummary};
