// JWT access token generation and validation, plus opaque refresh tokens

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Months, TimeZone, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{RefreshToken, TokenResponse},
    store::RefreshTokenStore,
};
use crate::config::JwtSettings;

/// Size of the random draw behind each refresh token
const REFRESH_TOKEN_BYTES: usize = 64;

/// Refresh tokens live for six months
const REFRESH_TOKEN_LIFETIME: Months = Months::new(6);

/// Claim names owned by [`Claims`]; extra claims may not reuse them
const RESERVED_CLAIMS: [&str; 8] = ["sub", "jti", "name", "roles", "iss", "aud", "iat", "exp"];

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Unique token id binding this token to its refresh token
    pub jti: String,
    /// User name
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    /// Caller supplied extra claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Expired when the expiry instant is not strictly in the future
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(true, |exp| exp <= now)
    }
}

/// Token service for JWT operations
pub struct TokenService {
    settings: JwtSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl TokenService {
    pub fn new(settings: JwtSettings, refresh_tokens: Arc<dyn RefreshTokenStore>) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(settings.secret.as_bytes());
        Self {
            settings,
            encoding_key,
            decoding_key,
            refresh_tokens,
        }
    }

    /// Access token lifetime in seconds
    pub fn expires_in(&self) -> i64 {
        self.settings.token_lifetime.num_seconds()
    }

    /// Issue a signed access token and a paired, persisted refresh token
    pub async fn generate_token(
        &self,
        user_id: Uuid,
        user_name: &str,
        roles: &[String],
        extra_claims: HashMap<String, serde_json::Value>,
    ) -> Result<TokenResponse, AuthError> {
        if let Some(key) = extra_claims.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())) {
            return Err(AuthError::TokenGeneration(format!("extra claim '{}' is reserved", key)));
        }

        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            name: user_name.to_string(),
            roles: roles.to_vec(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.settings.token_lifetime).timestamp(),
            extra: extra_claims,
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))?;

        let refresh_token = Self::generate_refresh_token();
        let expires_at = now
            .checked_add_months(REFRESH_TOKEN_LIFETIME)
            .ok_or_else(|| AuthError::TokenGeneration("refresh expiry out of range".to_string()))?;

        let record = RefreshToken {
            token: refresh_token.clone(),
            jwt_id: claims.jti.clone(),
            user_id,
            created_at: now,
            expires_at,
            used: false,
            invalidated: false,
        };
        self.refresh_tokens.insert(&record).await?;

        debug!("Issued token pair for user {} (jti {})", user_id, claims.jti);

        Ok(TokenResponse {
            access_token,
            refresh_token,
            expires_in: self.expires_in(),
        })
    }

    /// 64 bytes from the OS CSPRNG, base64 encoded
    pub fn generate_refresh_token() -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }

    /// Verify signature, issuer and audience and return the claims.
    ///
    /// Lifetime is not checked here: refresh needs to read claims out of an
    /// already expired access token, so callers compare `exp` themselves.
    /// Anything other than an HS256 token is rejected outright.
    pub fn validate_and_extract_claims(&self, token: &str) -> Option<Claims> {
        let header = decode_header(token).ok()?;
        if header.alg != Algorithm::HS256 {
            debug!("Rejected token signed with {:?}", header.alg);
            return None;
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[self.settings.issuer.as_str()]);
        validation.set_audience(&[self.settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| debug!("Token validation failed: {}", e))
            .ok()
    }

    /// True iff a stored record exists and is not expired, invalidated or used
    pub async fn validate_refresh_token(&self, token: &str) -> Result<bool, AuthError> {
        let stored = self.refresh_tokens.find(token).await?;
        Ok(stored.map_or(false, |record| record.is_active_at(Utc::now())))
    }
}
