pub mod enrollment;
pub mod coupon;

pub use enrollment::{EnrollmentRecord, NewEnrollment};
pub use coupon::{CouponRecord, DiscountType};
