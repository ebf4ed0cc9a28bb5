// Authentication module
// JWT access tokens, single-use refresh tokens, login and registration

pub mod commands;
pub mod endpoints;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::AuthenticatedUser;
pub use models::{AuthResponse, RefreshToken, TokenResponse, User};
pub use service::AuthService;
pub use store::{RefreshTokenStore, UserStore};
pub use token::{Claims, TokenService};
