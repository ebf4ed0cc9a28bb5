//! Catalog API
//!
//! Product catalog over HTTP with JWT authentication. Endpoints validate
//! typed commands and hand them to a [`mediator::RequestSender`], which
//! routes each one to the handler registered for its type at startup.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod mediator;
pub mod persistence;
pub mod products;
pub mod response;
pub mod validation;

pub use app::{build_state, create_router, AppState, Stores};
pub use config::AppConfig;
pub use error::ApiError;
