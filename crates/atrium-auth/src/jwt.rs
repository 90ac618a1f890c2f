//! Session token creation and verification.

use anyhow::anyhow;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use atrium_config::SessionConfig;
use atrium_core::{AppError, AuthError};

use crate::claims::SessionClaims;

/// Creates a signed session token for `user_id`, valid for `config.expiry` seconds.
///
/// # Errors
///
/// Returns an internal error if token encoding fails.
pub fn create_session_token(
    user_id: Uuid,
    email: &str,
    config: &SessionConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + config.expiry.max(0) as usize;

    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow!("Failed to create session token: {}", e)))
}

/// Verifies signature and expiry of a session token.
///
/// # Errors
///
/// Returns [`AuthError::Unauthenticated`] when the token is malformed, forged
/// or expired.
pub fn verify_session_token(
    token: &str,
    config: &SessionConfig,
) -> Result<SessionClaims, AuthError> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::Unauthenticated("Invalid or expired session"))
}
