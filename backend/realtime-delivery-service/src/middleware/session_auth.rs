use crate::error::AppError;
use crate::session::SessionStore;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

pub const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

/// Identity bound to the session token of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub identity: String,
    pub token: String,
}

/// Token from `Authorization: Bearer <token>`, falling back to `X-Session-Token`.
pub fn extract_session_token(req: &HttpRequest) -> Option<String> {
    let headers = req.headers();
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .or_else(|| {
            headers
                .get(SESSION_TOKEN_HEADER)
                .and_then(|h| h.to_str().ok())
        })
        .map(|t| t.trim().to_string())
}

/// Session authentication middleware
///
/// Answers 401 itself unless the request carries a live session token.
pub struct SessionAuthMiddleware {
    sessions: SessionStore,
}

impl SessionAuthMiddleware {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthMiddlewareService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct SessionAuthMiddlewareService<S> {
    service: Rc<S>,
    sessions: SessionStore,
}

impl<S, B> Service<ServiceRequest> for SessionAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = extract_session_token(req.request());

        match self.sessions.validate_session(token.as_deref()) {
            Ok(identity) => {
                req.extensions_mut().insert(AuthenticatedUser {
                    identity,
                    token: token.unwrap_or_default(),
                });
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(e) => {
                tracing::debug!(path = %req.path(), "rejected request without valid session");
                let response = e.error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}

impl actix_web::FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AppError::InvalidSession.into())),
        }
    }
}
