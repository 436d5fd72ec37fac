use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::User;

/// The authenticated caller, resolved by `AuthMiddleware`.
///
/// Carries the user record as loaded for this request and the raw token the
/// request presented, so handlers can revoke exactly that session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

impl FromRequest for AuthSession {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthSession>().cloned() {
            Some(session) => ready(Ok(session)),
            // Route registered without AuthMiddleware.
            None => ready(Err(AppError::Unauthorized(
                "no session attached to request".to_string(),
            )
            .into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_auth_session_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        let user = User::new("a@x.com", "hash".into(), None, None);
        req.extensions_mut().insert(AuthSession {
            user: user.clone(),
            token: "tok".into(),
        });

        let mut payload = Payload::None;
        let session = AuthSession::from_request(&req, &mut payload).await.unwrap();
        assert_eq!(session.user.id, user.id);
        assert_eq!(session.token, "tok");
    }

    #[actix_rt::test]
    async fn test_auth_session_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = AuthSession::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
