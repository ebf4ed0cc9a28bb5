// Auth commands and their validation rules

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::models::AuthResponse;
use crate::mediator::Request;
use crate::response::ApiResponse;
use crate::validation::validate_not_blank;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginCommand {
    #[validate(email(message = "A valid email is required."))]
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[validate(custom = "validate_not_blank")]
    pub password: String,
}

impl Request for UserLoginCommand {
    type Response = ApiResponse<AuthResponse>;
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRegisterCommand {
    #[validate(email(message = "A valid email is required."))]
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[validate(length(min = 3, message = "User name must be at least 3 characters."))]
    pub user_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub confirm_password: String,
}

impl Request for UserRegisterCommand {
    type Response = ApiResponse<AuthResponse>;
}

/// Expired access token plus the refresh token issued with it
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenCommand {
    #[validate(custom = "validate_not_blank")]
    pub token: String,
    #[validate(custom = "validate_not_blank")]
    pub refresh_token: String,
}

impl Request for RefreshTokenCommand {
    type Response = ApiResponse<AuthResponse>;
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeTokenCommand {
    #[validate(custom = "validate_not_blank")]
    pub refresh_token: String,
}

impl Request for RevokeTokenCommand {
    type Response = ApiResponse<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str, confirm: &str) -> UserRegisterCommand {
        UserRegisterCommand {
            email: "ada@example.com".to_string(),
            user_name: "ada".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_mismatched_passwords_are_rejected() {
        let errors = register("abc1234", "abc1235").validate().unwrap_err();
        let fields = errors.field_errors();

        let confirm = fields.get("confirm_password").expect("confirm_password error");
        assert_eq!(confirm[0].message.as_deref(), Some("Passwords do not match."));
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(register("correct horse", "correct horse").validate().is_ok());
    }

    #[test]
    fn test_short_user_name_and_bad_email() {
        let mut command = register("correct horse", "correct horse");
        command.email = "not-an-email".to_string();
        command.user_name = "ab".to_string();

        let errors = command.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("user_name"));
    }

    #[test]
    fn test_login_requires_email_and_password() {
        let command = UserLoginCommand {
            email: String::new(),
            password: " ".to_string(),
        };
        let errors = command.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_refresh_requires_both_tokens() {
        let command: RefreshTokenCommand =
            serde_json::from_str(r#"{"token":"","refreshToken":"abc"}"#).unwrap();
        let errors = command.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("token"));
        assert!(!errors.field_errors().contains_key("refresh_token"));
    }
}
