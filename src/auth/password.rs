/// Password Hashing and Verification
///
/// Argon2id with fixed cost parameters. The stored form is
/// `base64(salt[16] || derived_key[32])`; there is no version field, so
/// changing the parameters invalidates every existing hash.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::{AppError, ValidationError};

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Time cost (iterations)
const T_COST: u32 = 3;
/// Memory cost in KiB (8 MiB)
const M_COST: u32 = 8 * 1024;
/// Lanes
const P_COST: u32 = 1;

/// Well-formed hash matching no password. Verifying against it costs the
/// same as a real check, so login for an unknown email takes as long as a
/// wrong password.
pub const DUMMY_PASSWORD_HASH: &str =
    "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], argon2::Error> {
    let params = Params::new(M_COST, T_COST, P_COST, Some(KEY_LEN))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2.hash_password_into(password.as_bytes(), salt, &mut key)?;
    Ok(key)
}

/// Hash a password with a fresh random salt
///
/// # Errors
/// Returns a validation error for an empty password, or an internal error
/// if key derivation fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()).into());
    }

    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let key = derive_key(password, &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let mut combined = Vec::with_capacity(SALT_LEN + KEY_LEN);
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&key);

    Ok(STANDARD.encode(combined))
}

/// Verify a password against a stored hash
///
/// Malformed hashes and derivation failures verify as `false`.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let combined = match STANDARD.decode(stored_hash) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(reason = %e, "Stored password hash is not valid base64");
            return false;
        }
    };

    if combined.len() != SALT_LEN + KEY_LEN {
        tracing::warn!(len = combined.len(), "Stored password hash has unexpected length");
        return false;
    }

    let (salt, expected) = combined.split_at(SALT_LEN);
    match derive_key(password, salt) {
        Ok(candidate) => candidate[..].ct_eq(expected).into(),
        Err(e) => {
            tracing::warn!(reason = %e, "Password verification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_hash_is_well_formed_and_matches_nothing() {
        let decoded = STANDARD.decode(DUMMY_PASSWORD_HASH).unwrap();
        assert_eq!(decoded.len(), SALT_LEN + KEY_LEN);

        assert!(!verify_password("secret123", DUMMY_PASSWORD_HASH));
        assert!(!verify_password("", DUMMY_PASSWORD_HASH));
    }

    #[test]
    fn test_hash_has_salt_and_key() {
        let hash = hash_password("secret123").expect("Failed to hash password");
        let decoded = STANDARD.decode(&hash).unwrap();

        assert_eq!(decoded.len(), SALT_LEN + KEY_LEN);
        assert_ne!(hash, "secret123");
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("secret123").expect("Failed to hash password");
        assert!(verify_password("secret123", &hash));
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password("secret123").expect("Failed to hash password");
        assert!(!verify_password("secret124", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn test_same_password_gets_fresh_salt() {
        let first = hash_password("secret123").unwrap();
        let second = hash_password("secret123").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("secret123", &first));
        assert!(verify_password("secret123", &second));
    }

    #[test]
    fn test_empty_password_is_rejected() {
        assert!(matches!(
            hash_password(""),
            Err(AppError::Validation(ValidationError::EmptyField(_)))
        ));
    }

    #[test]
    fn test_malformed_hashes_verify_false() {
        let short = STANDARD.encode([0u8; SALT_LEN + KEY_LEN - 1]);
        let long = STANDARD.encode([0u8; SALT_LEN + KEY_LEN + 1]);

        for stored in ["", "not base64!", short.as_str(), long.as_str()] {
            assert!(!verify_password("secret123", stored), "{:?}", stored);
        }
    }

    #[test]
    fn test_unicode_password() {
        let hash = hash_password("pässwörd 🔑").unwrap();
        assert!(verify_password("pässwörd 🔑", &hash));
        assert!(!verify_password("passwörd 🔑", &hash));
    }
}
