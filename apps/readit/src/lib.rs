#![deny(clippy::wildcard_imports)]

pub mod error;
pub mod health;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-exports for public API
pub use error::AppError;
pub use state::AppState;
