//! Admin HTTP API
//!
//! Operator endpoints for program setup and manual round control, plus
//! read-only health, status and metrics.

pub mod errors;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::{build_app, ApiServer};
