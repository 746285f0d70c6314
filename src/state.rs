use std::sync::Arc;

use crate::auth::{authenticate, Authentication};
use crate::configuration::AuthConfig;
use crate::store::{KvStore, UserStore};

/// Shared application state, registered once as `web::Data`
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthConfig,
    pub users: Arc<dyn UserStore>,
    /// Refresh-token records
    pub sessions: Arc<dyn KvStore>,
}

impl AppState {
    pub fn new(auth: AuthConfig, users: Arc<dyn UserStore>, sessions: Arc<dyn KvStore>) -> Self {
        Self {
            auth,
            users,
            sessions,
        }
    }

    pub async fn authenticate(&self, cookie_header: Option<&str>) -> Authentication {
        authenticate(
            cookie_header,
            &self.auth,
            self.sessions.as_ref(),
            self.users.as_ref(),
        )
        .await
    }
}
