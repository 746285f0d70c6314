mod account;
mod auth;
mod health_check;
mod seed;

pub use account::{current_user, get_user, whoami};
pub use auth::{login, logout, refresh, register, validate_session, UserBody, UserResponse};
pub use health_check::{health_check, public_config};
pub use seed::seed_users;
