/// Authentication Orchestrator
///
/// Resolves the identity behind a request from its cookies:
///
/// 1. a valid access token authenticates directly, with no store lookup
/// 2. otherwise the refresh token is checked against the key-value store
/// 3. the account's current email is read from the user store
/// 4. a new access token is minted and handed back as a cookie to set
///
/// Every step runs sequentially and fails closed: an absent, invalid or
/// expired token, a missing user, or a store error all end in
/// `Authentication::Unauthenticated`.

use actix_web::cookie::Cookie;

use crate::auth::claims::{Session, TokenSubject};
use crate::auth::cookies::{build_cookie, token_from_cookie_header};
use crate::auth::jwt::{create_access_token, verify_access_token};
use crate::auth::refresh_token::{issue_refresh_token, verify_refresh_token};
use crate::configuration::AuthConfig;
use crate::error::AppError;
use crate::store::{KvStore, User, UserStore};

/// Outcome of authenticating one request
#[derive(Debug)]
pub enum Authentication {
    Authenticated {
        session: Session,
        /// Set when the access token was silently renewed; must be attached
        /// to the response as `Set-Cookie`
        renewed: Option<Cookie<'static>>,
    },
    Unauthenticated,
}

/// Authenticate a request given its raw `Cookie` header
pub async fn authenticate(
    cookie_header: Option<&str>,
    config: &AuthConfig,
    sessions: &dyn KvStore,
    users: &dyn UserStore,
) -> Authentication {
    if let Some(token) = token_from_cookie_header(cookie_header, &config.cookies.access) {
        if let Some(claims) = verify_access_token(&config.secret, token) {
            tracing::debug!(user_id = claims.sub, "Authenticated by access token");
            return Authentication::Authenticated {
                session: Session::from(claims),
                renewed: None,
            };
        }
    }

    let Some(refresh_token) = token_from_cookie_header(cookie_header, &config.cookies.refresh) else {
        return Authentication::Unauthenticated;
    };

    match renew_access(refresh_token, config, sessions, users).await {
        Some((session, cookie)) => Authentication::Authenticated {
            session,
            renewed: Some(cookie),
        },
        None => Authentication::Unauthenticated,
    }
}

/// Mint a fresh access token from a refresh token.
///
/// The refresh token itself is not rotated; sessions end when it expires.
pub async fn renew_access(
    refresh_token: &str,
    config: &AuthConfig,
    sessions: &dyn KvStore,
    users: &dyn UserStore,
) -> Option<(Session, Cookie<'static>)> {
    let record = verify_refresh_token(sessions, refresh_token).await?;

    let user = match users.find_by_id(record.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(user_id = record.user_id, "Refresh token for unknown user");
            return None;
        }
        Err(e) => {
            tracing::warn!(user_id = record.user_id, error = %e, "User lookup failed during renewal");
            return None;
        }
    };

    let session = Session {
        user_id: record.user_id,
        email: user.email,
        role: record.role,
    };

    let token = match create_access_token(&config.secret, subject_of(&session), config.access_ttl) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Failed to mint renewed access token");
            return None;
        }
    };

    tracing::debug!(user_id = session.user_id, "Access token renewed from refresh token");
    let cookie = build_cookie(&config.cookies.access, &token, config.access_ttl);
    Some((session, cookie))
}

/// Both cookies issued at login and registration
#[derive(Debug)]
pub struct IssuedTokens {
    pub access: Cookie<'static>,
    pub refresh: Cookie<'static>,
}

/// Issue a fresh access token and a fresh refresh token for `user`
///
/// # Errors
/// Returns error if signing fails or the refresh record cannot be stored
pub async fn issue_tokens(
    user: &User,
    config: &AuthConfig,
    sessions: &dyn KvStore,
) -> Result<IssuedTokens, AppError> {
    let subject = TokenSubject {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
    };
    let access_token = create_access_token(&config.secret, subject, config.access_ttl)?;
    let refresh_token = issue_refresh_token(sessions, user.id, user.role, config.refresh_ttl).await?;

    Ok(IssuedTokens {
        access: build_cookie(&config.cookies.access, &access_token, config.access_ttl),
        refresh: build_cookie(&config.cookies.refresh, &refresh_token, config.refresh_ttl),
    })
}

fn subject_of(session: &Session) -> TokenSubject {
    TokenSubject {
        user_id: session.user_id,
        email: session.email.clone(),
        role: session.role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{AccessTokenClaims, Role};
    use crate::auth::cookies::CookieNames;
    use crate::auth::jwt::sign_claims;
    use crate::auth::refresh_token::refresh_key;
    use crate::store::{InMemoryKvStore, InMemoryUserStore, NewUser, StoreError};
    use async_trait::async_trait;
    use chrono::Utc;

    fn config() -> AuthConfig {
        AuthConfig {
            secret: "orchestrator-test-secret".to_string(),
            cookies: CookieNames::new("app"),
            access_ttl: 900,
            refresh_ttl: 3600,
            access_token_expires_in: "15m".to_string(),
            refresh_token_expires_in: "1h".to_string(),
        }
    }

    async fn seeded_user(users: &InMemoryUserStore, role: Role) -> User {
        users
            .insert(NewUser {
                email: "a@b.com".to_string(),
                password_hash: "unused".to_string(),
                role,
            })
            .await
            .unwrap()
    }

    fn header(pairs: &[(&str, &str)]) -> String {
        pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// A user store whose every call fails
    struct BrokenUserStore;

    #[async_trait]
    impl UserStore for BrokenUserStore {
        async fn find_by_id(&self, _id: i64) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn insert(&self, _user: NewUser) -> Result<User, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_no_cookies_is_unauthenticated() {
        let outcome = authenticate(None, &config(), &InMemoryKvStore::new(), &InMemoryUserStore::new()).await;
        assert!(matches!(outcome, Authentication::Unauthenticated));
    }

    #[tokio::test]
    async fn test_valid_access_token_fast_path() {
        let config = config();
        let sessions = InMemoryKvStore::new();
        // an empty user store proves no lookup happens
        let users = InMemoryUserStore::new();

        let token = create_access_token(
            &config.secret,
            TokenSubject {
                user_id: 9,
                email: "fast@path.com".to_string(),
                role: Role::Admin,
            },
            config.access_ttl,
        )
        .unwrap();
        let cookies = header(&[(config.cookies.access.as_str(), token.as_str())]);

        match authenticate(Some(&cookies), &config, &sessions, &users).await {
            Authentication::Authenticated { session, renewed } => {
                assert_eq!(session.user_id, 9);
                assert_eq!(session.email, "fast@path.com");
                assert_eq!(session.role, Role::Admin);
                assert!(renewed.is_none());
            }
            Authentication::Unauthenticated => panic!("expected fast path"),
        }
    }

    #[tokio::test]
    async fn test_refresh_only_renews_access_token() {
        let config = config();
        let sessions = InMemoryKvStore::new();
        let users = InMemoryUserStore::new();
        let user = seeded_user(&users, Role::User).await;

        let tokens = issue_tokens(&user, &config, &sessions).await.unwrap();
        let cookies = header(&[(config.cookies.refresh.as_str(), tokens.refresh.value())]);

        match authenticate(Some(&cookies), &config, &sessions, &users).await {
            Authentication::Authenticated { session, renewed } => {
                assert_eq!(session.user_id, user.id);
                assert_eq!(session.email, "a@b.com");

                let cookie = renewed.expect("renewed access cookie");
                assert_eq!(cookie.name(), "app-access-token");
                let claims = verify_access_token(&config.secret, cookie.value()).unwrap();
                assert_eq!(claims.sub, user.id);
                assert_eq!(claims.exp - claims.iat, 900);
            }
            Authentication::Unauthenticated => panic!("expected renewal"),
        }
    }

    #[tokio::test]
    async fn test_expired_access_token_falls_back_to_refresh() {
        let config = config();
        let sessions = InMemoryKvStore::new();
        let users = InMemoryUserStore::new();
        let user = seeded_user(&users, Role::User).await;
        let tokens = issue_tokens(&user, &config, &sessions).await.unwrap();

        let now = Utc::now().timestamp();
        let expired = sign_claims(
            &config.secret,
            &AccessTokenClaims {
                sub: user.id,
                email: user.email.clone(),
                role: Role::User,
                iat: now - 901,
                exp: now - 1,
            },
        )
        .unwrap();
        let cookies = header(&[
            (config.cookies.access.as_str(), expired.as_str()),
            (config.cookies.refresh.as_str(), tokens.refresh.value()),
        ]);

        let outcome = authenticate(Some(&cookies), &config, &sessions, &users).await;
        assert!(matches!(
            outcome,
            Authentication::Authenticated { renewed: Some(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_expired_access_token_without_refresh() {
        let config = config();
        let now = Utc::now().timestamp();
        let expired = sign_claims(
            &config.secret,
            &AccessTokenClaims {
                sub: 1,
                email: "a@b.com".to_string(),
                role: Role::User,
                iat: now - 901,
                exp: now - 1,
            },
        )
        .unwrap();
        let cookies = header(&[(config.cookies.access.as_str(), expired.as_str())]);

        let outcome = authenticate(Some(&cookies), &config, &InMemoryKvStore::new(), &InMemoryUserStore::new()).await;
        assert!(matches!(outcome, Authentication::Unauthenticated));
    }

    #[tokio::test]
    async fn test_renewal_uses_record_role_and_fresh_email() {
        let config = config();
        let sessions = InMemoryKvStore::new();
        let users = InMemoryUserStore::new();
        let user = seeded_user(&users, Role::User).await;

        let token = issue_refresh_token(&sessions, user.id, Role::Admin, 3600).await.unwrap();
        let (session, _) = renew_access(&token, &config, &sessions, &users).await.unwrap();

        assert_eq!(session.role, Role::Admin);
        assert_eq!(session.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_deleted_user_is_unauthenticated() {
        let config = config();
        let sessions = InMemoryKvStore::new();
        let token = issue_refresh_token(&sessions, 404, Role::User, 3600).await.unwrap();
        let cookies = header(&[(config.cookies.refresh.as_str(), token.as_str())]);

        let outcome = authenticate(Some(&cookies), &config, &sessions, &InMemoryUserStore::new()).await;
        assert!(matches!(outcome, Authentication::Unauthenticated));
    }

    #[tokio::test]
    async fn test_user_store_failure_fails_closed() {
        let config = config();
        let sessions = InMemoryKvStore::new();
        let token = issue_refresh_token(&sessions, 1, Role::User, 3600).await.unwrap();
        let cookies = header(&[(config.cookies.refresh.as_str(), token.as_str())]);

        let outcome = authenticate(Some(&cookies), &config, &sessions, &BrokenUserStore).await;
        assert!(matches!(outcome, Authentication::Unauthenticated));
    }

    #[tokio::test]
    async fn test_issue_tokens_sets_both_cookies() {
        let config = config();
        let sessions = InMemoryKvStore::new();
        let users = InMemoryUserStore::new();
        let user = seeded_user(&users, Role::User).await;

        let tokens = issue_tokens(&user, &config, &sessions).await.unwrap();

        assert_eq!(tokens.access.name(), "app-access-token");
        assert_eq!(tokens.refresh.name(), "app-refresh-token");
        assert!(tokens.refresh.to_string().contains("Max-Age=3600"));
        assert!(sessions
            .get(&refresh_key(tokens.refresh.value()))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_each_login_gets_its_own_refresh_token() {
        let config = config();
        let sessions = InMemoryKvStore::new();
        let users = InMemoryUserStore::new();
        let user = seeded_user(&users, Role::User).await;

        let first = issue_tokens(&user, &config, &sessions).await.unwrap();
        let second = issue_tokens(&user, &config, &sessions).await.unwrap();

        assert_ne!(first.refresh.value(), second.refresh.value());
        assert_eq!(sessions.len().await, 2);
    }
}
