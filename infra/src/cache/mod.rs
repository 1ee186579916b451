//! Redis-backed shared state

pub mod redis_client;
pub mod session_registry;

#[cfg(test)]
mod tests;

pub use redis_client::RedisClient;
pub use session_registry::RedisSessionRegistry;
