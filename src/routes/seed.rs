/// Development seed accounts
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::auth::{hash_password, Role};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{NewUser, StoreError};

const SEED_USERS: [(&str, &str, Role); 3] = [
    ("admin@example.com", "admin", Role::Admin),
    ("user@example.com", "user", Role::User),
    ("demo@example.com", "demo", Role::User),
];

/// POST /seed
///
/// Insert the seed accounts, skipping those that already exist.
pub async fn seed_users(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let mut created = Vec::new();
    let mut skipped = Vec::new();

    for (email, password, role) in SEED_USERS {
        if state.users.find_by_email(email).await?.is_some() {
            skipped.push(email);
            continue;
        }

        let password_hash = web::block(move || hash_password(password)).await??;
        let new_user = NewUser {
            email: email.to_string(),
            password_hash,
            role,
        };

        match state.users.insert(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, role = %role, "Seed user created");
                created.push(email);
            }
            // lost a race with a concurrent insert
            Err(StoreError::Conflict(_)) => skipped.push(email),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "created": created, "skipped": skipped })))
}
