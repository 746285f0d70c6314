/// Access Token Codec
///
/// Creates and verifies HS256-signed, self-contained access tokens of the form
/// `base64url(header).base64url(payload).base64url(signature)`.
/// Verification never touches a store and never errors: anything other than
/// a well-formed, correctly signed, unexpired token yields `None`.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{AccessTokenClaims, TokenSubject};
use crate::error::AppError;

/// Mint an access token for `subject`, valid for `ttl_seconds` from now
///
/// # Errors
/// Returns error if the claims cannot be serialized or signed
pub fn create_access_token(
    secret: &str,
    subject: TokenSubject,
    ttl_seconds: i64,
) -> Result<String, AppError> {
    let claims = AccessTokenClaims::new(subject, Utc::now().timestamp(), ttl_seconds);
    sign_claims(secret, &claims)
}

/// Sign an already timestamped set of claims
pub fn sign_claims(secret: &str, claims: &AccessTokenClaims) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify signature and expiry, returning the claims of a valid token
pub fn verify_access_token(secret: &str, token: &str) -> Option<AccessTokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    // strict expiry, no grace period
    validation.leeway = 0;
    validation.validate_exp = true;

    match decode::<AccessTokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(reason = %e, "Access token rejected");
            None
        }
    }
}
