//! # WardGate API
//!
//! HTTP surface of the gateway: middleware stages, route handlers and the
//! application factory.

pub mod app;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod telemetry;

pub use app::{create_app, AppState, Collaborators};
