// Authentication error types

use crate::persistence::StoreError;

/// Failures raised by the auth and token services.
///
/// Messages carried by `AuthenticationFailure` are deliberately coarse so a
/// caller cannot tell which check rejected them. `InvalidToken` carries the
/// precise reason for logs only; `Display` never shows it.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    AuthenticationFailure(&'static str),

    #[error("Invalid token")]
    InvalidToken(&'static str),

    #[error("Token generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing error")]
    PasswordHash,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    pub const INVALID_CREDENTIALS: &'static str = "Invalid credentials";
    pub const ACCOUNT_EXISTS: &'static str = "Account Already Exists";
    pub const ACCOUNT_CREATION: &'static str = "Account Creation Error";

    /// True for failures caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::AuthenticationFailure(_) | AuthError::InvalidToken(_)
        )
    }
}
