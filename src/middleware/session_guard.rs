/// Session Guard Middleware
///
/// Authenticates every request from its cookies and injects the resulting
/// `Session` into request extensions, where handlers read it through
/// `web::ReqData<Session>`. When the access token was silently renewed the
/// new access cookie is appended to the response, rejections included.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{Authentication, Role, Session};
use crate::error::{AppError, AuthError};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    /// Reject unauthenticated requests with 401
    Required,
    /// Additionally reject non-admin sessions with 403
    Admin,
    /// Never reject; attach the session when there is one
    Optional,
}

impl GuardMode {
    fn admit(self, session: Option<&Session>) -> Result<(), AuthError> {
        match (self, session) {
            (GuardMode::Optional, _) => Ok(()),
            (_, None) => Err(AuthError::Unauthenticated),
            (GuardMode::Required, Some(_)) => Ok(()),
            (GuardMode::Admin, Some(session)) => match session.role {
                Role::Admin => Ok(()),
                Role::User => Err(AuthError::Forbidden),
            },
        }
    }
}

pub struct SessionGuard {
    mode: GuardMode,
    state: web::Data<AppState>,
}

impl SessionGuard {
    pub fn required(state: web::Data<AppState>) -> Self {
        Self {
            mode: GuardMode::Required,
            state,
        }
    }

    pub fn admin(state: web::Data<AppState>) -> Self {
        Self {
            mode: GuardMode::Admin,
            state,
        }
    }

    pub fn optional(state: web::Data<AppState>) -> Self {
        Self {
            mode: GuardMode::Optional,
            state,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionGuardService {
            service: Rc::new(service),
            mode: self.mode,
            state: self.state.clone(),
        }))
    }
}

pub struct SessionGuardService<S> {
    service: Rc<S>,
    mode: GuardMode,
    state: web::Data<AppState>,
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let state = self.state.clone();
        let mode = self.mode;

        Box::pin(async move {
            let cookie_header = req
                .headers()
                .get(header::COOKIE)
                .and_then(|h| h.to_str().ok())
                .map(str::to_owned);

            let (session, renewed) = match state.authenticate(cookie_header.as_deref()).await {
                Authentication::Authenticated { session, renewed } => (Some(session), renewed),
                Authentication::Unauthenticated => (None, None),
            };

            if let Err(e) = mode.admit(session.as_ref()) {
                tracing::debug!(path = %req.path(), reason = %e, "Request rejected by session guard");
                let mut response = AppError::from(e).error_response();
                // a forbidden user keeps the access token renewed on the way in
                if let Some(cookie) = renewed {
                    if let Err(e) = response.add_cookie(&cookie) {
                        tracing::warn!(error = %e, "Failed to set renewed cookie on rejection");
                    }
                }
                return Ok(req.into_response(response).map_into_right_body());
            }

            if let Some(session) = session {
                req.extensions_mut().insert(session);
            }

            let mut res = service.call(req).await?;

            if let Some(cookie) = renewed {
                res.response_mut()
                    .add_cookie(&cookie)
                    .map_err(|e| AppError::Internal(format!("Failed to set renewed cookie: {}", e)))?;
            }

            Ok(res.map_into_left_body())
        })
    }
}
