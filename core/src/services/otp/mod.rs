//! One-time password challenge contracts.
//!
//! Challenge state lives behind `OtpChallengeService`; delivery of the code
//! over SMS or email is a separate `OtpDelivery` collaborator.

mod traits;

pub use traits::{OtpChallengeService, OtpDelivery};
