/// Authentication module
///
/// Hybrid token scheme: stateless short-lived access tokens and store-backed
/// revocable refresh tokens, both carried in cookies, with silent renewal of
/// the access token and constant-time password verification.

mod claims;
mod cookies;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::{AccessTokenClaims, Role, Session, TokenSubject};
pub use cookies::{build_cookie, build_delete_cookie, token_from_cookie_header, CookieNames};
pub use jwt::{create_access_token, sign_claims, verify_access_token};
pub use password::{hash_password, verify_password, DUMMY_PASSWORD_HASH};
pub use refresh_token::{
    generate_refresh_token, invalidate_refresh_token, issue_refresh_token, refresh_key,
    verify_refresh_token, RefreshTokenRecord,
};
pub use session::{authenticate, issue_tokens, renew_access, Authentication, IssuedTokens};
