//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Map storage and container failures onto generic HTTP responses.
//!
//! TLS is terminated in front of this service.

pub mod handlers;
pub mod middleware;
pub mod page;
pub mod router;
pub mod state;
