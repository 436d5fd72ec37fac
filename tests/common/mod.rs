#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::{header, StatusCode},
    test, web, App, Error,
};
use serde_json::{json, Value};
use uuid::Uuid;

use taskvault::auth::TokenIssuer;
use taskvault::routes;
use taskvault::store::MemoryStore;
use taskvault::AppState;

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "secret123";

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

pub fn state() -> web::Data<AppState> {
    web::Data::new(AppState::new(
        Arc::new(MemoryStore::new()),
        TokenIssuer::new(SECRET, None),
        4,
    ))
}

pub async fn app(
    state: web::Data<AppState>,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    test::init_service(App::new().app_data(state).configure(routes::config)).await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// Sends `req` and returns the status with the body parsed as JSON
/// (`Value::Null` for empty or non-JSON bodies).
pub async fn send(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    req: Request,
) -> (StatusCode, Value) {
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub async fn register_user(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    email: &str,
) -> TestUser {
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "email": email, "password": PASSWORD }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    TestUser {
        id: body["user"]["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("user id in registration response"),
        token: body["token"]
            .as_str()
            .expect("token in registration response")
            .to_string(),
    }
}

pub async fn login(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    email: &str,
    password: &str,
) -> (StatusCode, Value) {
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    send(app, req).await
}

pub async fn get_me(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    token: &str,
) -> StatusCode {
    let req = test::TestRequest::get()
        .uri("/users/me")
        .insert_header(bearer(token))
        .to_request();
    send(app, req).await.0
}

pub async fn create_task(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    token: &str,
    body: Value,
) -> Value {
    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(bearer(token))
        .set_json(body)
        .to_request();
    let (status, task) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "create task failed: {}", task);
    task
}
