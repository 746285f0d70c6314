/// Authentication Routes
///
/// Registration, login, logout, explicit refresh and session validation.
/// Tokens travel only in `Set-Cookie` headers, never in JSON bodies.

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{
    build_delete_cookie, hash_password, invalidate_refresh_token, issue_tokens, renew_access,
    token_from_cookie_header, verify_password, Authentication, Role, DUMMY_PASSWORD_HASH,
};
use crate::error::{AppError, AuthError};
use crate::state::AppState;
use crate::store::{NewUser, StoreError, User};
use crate::validators::{is_present_password, is_valid_email, is_valid_new_password};

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user account
#[derive(Serialize)]
pub struct UserBody {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserBody {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: UserBody,
}

fn cookie_header(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
}

/// POST /auth/register
///
/// Create an account and sign it in.
///
/// # Errors
/// - 400: invalid email or password
/// - 409: email already registered
/// - 500: hashing or store failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let RegisterRequest { email, password } = form.into_inner();
    let email = is_valid_email(&email)?;
    is_valid_new_password(&password)?;

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(StoreError::Conflict(
            "An account with this email already exists".to_string(),
        )
        .into());
    }

    let password_hash = web::block(move || hash_password(&password)).await??;
    let user = state
        .users
        .insert(NewUser {
            email,
            password_hash,
            role: Role::User,
        })
        .await?;

    let tokens = issue_tokens(&user, &state.auth, state.sessions.as_ref()).await?;

    tracing::info!(user_id = user.id, "User registered");

    Ok(HttpResponse::Created()
        .cookie(tokens.access)
        .cookie(tokens.refresh)
        .json(UserResponse {
            user: UserBody::from(&user),
        }))
}

/// POST /auth/login
///
/// Unknown email and wrong password produce the same 401 response.
pub async fn login(
    form: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { email, password } = form.into_inner();
    let email = is_valid_email(&email)?;
    is_present_password(&password)?;

    let user = state.users.find_by_email(&email).await?;

    // unknown emails still pay for a full verification
    let stored_hash = user
        .as_ref()
        .map_or_else(|| DUMMY_PASSWORD_HASH.to_string(), |u| u.password_hash.clone());
    let password_valid = web::block(move || verify_password(&password, &stored_hash)).await?;

    let user = match user {
        Some(user) if password_valid => user,
        _ => return Err(AuthError::InvalidCredentials.into()),
    };

    let tokens = issue_tokens(&user, &state.auth, state.sessions.as_ref()).await?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(HttpResponse::Ok()
        .cookie(tokens.access)
        .cookie(tokens.refresh)
        .json(UserResponse {
            user: UserBody::from(&user),
        }))
}

/// POST /auth/logout
///
/// Always succeeds: revokes the presented refresh token, if any, and clears
/// both cookies.
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let cookies = &state.auth.cookies;

    if let Some(token) = token_from_cookie_header(cookie_header(&req), &cookies.refresh) {
        if let Err(e) = invalidate_refresh_token(state.sessions.as_ref(), token).await {
            tracing::warn!(error = %e, "Failed to revoke refresh token on logout");
        }
    }

    HttpResponse::Ok()
        .cookie(build_delete_cookie(&cookies.access))
        .cookie(build_delete_cookie(&cookies.refresh))
        .json(json!({ "success": true }))
}

/// POST /auth/refresh
///
/// Mint a new access cookie from the refresh cookie. The refresh token is
/// left as is.
pub async fn refresh(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let token = token_from_cookie_header(cookie_header(&req), &state.auth.cookies.refresh)
        .ok_or(AuthError::MissingToken)?;

    let (session, access_cookie) = renew_access(
        token,
        &state.auth,
        state.sessions.as_ref(),
        state.users.as_ref(),
    )
    .await
    .ok_or(AuthError::TokenInvalid)?;

    tracing::info!(user_id = session.user_id, "Access token refreshed");

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .json(json!({ "success": true })))
}

/// GET /auth/validate-session
///
/// Runs the full authentication flow, renewing the access cookie when only
/// the refresh cookie is valid.
pub async fn validate_session(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    match state.authenticate(cookie_header(&req)).await {
        Authentication::Authenticated { session, renewed } => {
            let mut response = HttpResponse::Ok();
            if let Some(cookie) = renewed {
                response.cookie(cookie);
            }
            Ok(response.json(json!({ "user": { "email": session.email } })))
        }
        Authentication::Unauthenticated => Err(AuthError::Unauthenticated.into()),
    }
}
