use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderMap},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::AuthSession;
use crate::error::AppError;
use crate::state::AppState;

/// Guards a resource behind a bearer token.
///
/// A request passes only if its token verifies and is still listed on the
/// owning user. Every rejection is turned into a `401` response right here;
/// the wrapped service is never called and nothing is left pending.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            match authenticate(&req).await {
                Ok(session) => {
                    req.extensions_mut().insert(session);
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                }
                Err(err) => {
                    log::debug!("rejected {} {}: {}", req.method(), req.path(), err);
                    Ok(req.error_response(err).map_into_right_body())
                }
            }
        })
    }
}

/// Strips the `Bearer ` scheme from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(req: &ServiceRequest) -> Result<AuthSession, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalServerError("application state missing".into()))?;

    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    let user_id = state
        .tokens
        .verify(token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = state
        .store
        .find_user_by_id_and_token(user_id, token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("token revoked or user gone".into()))?;

    Ok(AuthSession {
        user,
        token: token.to_string(),
    })
}
