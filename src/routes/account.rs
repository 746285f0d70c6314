/// Routes behind the session guards
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::auth::Session;
use crate::error::AppError;
use crate::routes::auth::UserBody;
use crate::state::AppState;

/// GET /api/me (authenticated)
pub async fn current_user(session: web::ReqData<Session>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "user": session.into_inner() }))
}

/// GET /api/admin/users/{id} (admin)
pub async fn get_user(
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({ "user": UserBody::from(&user) })))
}

/// GET /api/whoami (optional)
pub async fn whoami(session: Option<web::ReqData<Session>>) -> HttpResponse {
    let session = session.map(web::ReqData::into_inner);
    HttpResponse::Ok().json(json!({
        "authenticated": session.is_some(),
        "user": session,
    }))
}
