//! Authentication route handlers
//!
//! - Password login with optional OTP challenge
//! - OTP verification and resend
//! - Token validation and logout
//! - Access scope lookup for an operation

pub mod login;
pub mod otp;
pub mod scope;
pub mod session;

pub use login::login;
pub use otp::{resend_otp, verify_otp};
pub use scope::scope;
pub use session::{logout, validate};
