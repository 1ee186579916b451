//! Per-source login attempt limiting.

mod tracker;

pub use tracker::{AttemptDecision, AttemptReservation, LoginAttemptPolicy, LoginAttemptTracker};
