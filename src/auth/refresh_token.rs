/// Refresh Token Management
///
/// Refresh tokens are opaque 32-byte random values (base64url) stored in the
/// key-value store under `refresh:<token>`. The store's own expiry mirrors
/// the record's `expiresAt`; the embedded timestamp is checked again on every
/// read because store expiry may lag.
///
/// Many records may be valid at once for one user (one per login). A record
/// is removed on logout or when it is found expired.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::auth::claims::Role;
use crate::error::AppError;
use crate::store::{KvStore, StoreError};

const TOKEN_BYTES: usize = 32;
const KEY_PREFIX: &str = "refresh:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: i64,
    pub role: Role,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Store key for a refresh token
pub fn refresh_key(token: &str) -> String {
    format!("{}{}", KEY_PREFIX, token)
}

/// Generate a new cryptographically secure refresh token value
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Create and store a refresh token record, returning the token value
///
/// # Errors
/// Returns error if the record cannot be written
pub async fn issue_refresh_token(
    store: &dyn KvStore,
    user_id: i64,
    role: Role,
    ttl_seconds: i64,
) -> Result<String, AppError> {
    let token = generate_refresh_token();
    let now = Utc::now().timestamp();

    let record = RefreshTokenRecord {
        token: token.clone(),
        user_id,
        role,
        created_at: now,
        expires_at: now.saturating_add(ttl_seconds),
    };
    let value = serde_json::to_string(&record)
        .map_err(|e| AppError::Internal(format!("Refresh token serialization failed: {}", e)))?;

    store.put(&refresh_key(&token), &value, ttl_seconds).await?;

    tracing::debug!(user_id = user_id, "Refresh token issued");
    Ok(token)
}

/// Look up a refresh token
///
/// Returns `None` for an empty, unknown, expired or unreadable token, and
/// when the store itself fails. Expired records are deleted on the way out.
pub async fn verify_refresh_token(store: &dyn KvStore, token: &str) -> Option<RefreshTokenRecord> {
    if token.is_empty() {
        return None;
    }

    let key = refresh_key(token);
    let raw = match store.get(&key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "Refresh token lookup failed");
            return None;
        }
    };

    let record: RefreshTokenRecord = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable refresh token record");
            return None;
        }
    };

    if Utc::now().timestamp() > record.expires_at {
        tracing::info!(user_id = record.user_id, "Refresh token expired");
        if let Err(e) = store.delete(&key).await {
            tracing::warn!(error = %e, "Failed to delete expired refresh token");
        }
        return None;
    }

    Some(record)
}

/// Delete a refresh token; absent tokens are not an error
pub async fn invalidate_refresh_token(store: &dyn KvStore, token: &str) -> Result<(), StoreError> {
    store.delete(&refresh_key(token)).await
}
