//! Error handling shared by routes and middleware

pub mod error;

pub use error::ApiError;
