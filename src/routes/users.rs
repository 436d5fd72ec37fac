use actix_multipart::Multipart;
use actix_web::{http::header::ContentType, web, HttpResponse, Responder};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{hash_password, AuthResponse, AuthSession, LoginRequest, RegisterRequest},
    avatar,
    error::AppError,
    models::{ensure_allowed_fields, normalize_email, user::ALLOWED_USER_UPDATES, User, UserUpdate},
    state::AppState,
};

/// Register a new user
///
/// Creates the account with its first session and returns both.
///
/// ## Responses:
/// - `201 Created`: `{ user, token }`.
/// - `400 Bad Request`: Validation failure or email already registered.
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let register_data = register_data.into_inner();

    let password_hash = hash_password(&register_data.password, state.bcrypt_cost)?;
    let mut user = User::new(
        &register_data.email,
        password_hash,
        register_data.name,
        register_data.age,
    );

    let token = state.tokens.issue(user.id)?;
    user.add_token(token.clone());
    state.store.insert_user(&user).await?;

    log::info!("registered user {}", user.id);
    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Login user
///
/// Opens an additional session; earlier sessions stay valid.
///
/// ## Responses:
/// - `200 OK`: `{ user, token }`.
/// - `400 Bad Request`: Unknown email or wrong password, indistinguishably.
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let mut user = state
        .store
        .find_by_credentials(&login_data.email, &login_data.password)
        .await?;

    let token = state.tokens.issue(user.id)?;
    user.add_token(token.clone());
    state.store.save_user(&user).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// Ends the session that made this request.
pub async fn logout(
    state: web::Data<AppState>,
    session: AuthSession,
) -> Result<impl Responder, AppError> {
    let AuthSession { mut user, token } = session;
    user.revoke_token(&token);
    state.store.save_user(&user).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Ends every session of the caller.
pub async fn logout_all(
    state: web::Data<AppState>,
    session: AuthSession,
) -> Result<impl Responder, AppError> {
    let mut user = session.user;
    user.revoke_all_tokens();
    state.store.save_user(&user).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn me(session: AuthSession) -> impl Responder {
    HttpResponse::Ok().json(session.user)
}

/// Update own profile
///
/// Accepts any subset of `name`, `email`, `age` and `password`. A body with
/// any other key is rejected before anything is written.
pub async fn update_me(
    state: web::Data<AppState>,
    session: AuthSession,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let body = body.into_inner();
    ensure_allowed_fields(&body, &ALLOWED_USER_UPDATES)?;

    let update: UserUpdate = serde_json::from_value(Value::Object(body))
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    update.validate()?;

    let mut user = session.user;
    if let Some(name) = update.name {
        user.name = Some(name.trim().to_string());
    }
    if let Some(email) = update.email {
        user.email = normalize_email(&email);
    }
    if let Some(age) = update.age {
        user.age = Some(age);
    }
    if let Some(password) = update.password {
        user.password_hash = hash_password(&password, state.bcrypt_cost)?;
    }
    user.touch();

    state.store.save_user(&user).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Delete own profile together with all of its tasks.
pub async fn delete_me(
    state: web::Data<AppState>,
    session: AuthSession,
) -> Result<impl Responder, AppError> {
    let user = state
        .store
        .delete_user(session.user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    log::info!("deleted user {}", user.id);
    Ok(HttpResponse::Ok().json(user))
}

/// Replace the caller's avatar with the uploaded `avatar` file.
///
/// ## Responses:
/// - `200 OK`: Stored as a 250x250 PNG.
/// - `400 Bad Request`: Missing file, wrong extension, too large or not an image.
pub async fn upload_avatar(
    state: web::Data<AppState>,
    session: AuthSession,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let raw = avatar::read_upload(payload).await?;
    let png = avatar::normalize(&raw)?;

    let mut user = session.user;
    user.avatar = Some(png);
    user.touch();
    state.store.save_user(&user).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn delete_avatar(
    state: web::Data<AppState>,
    session: AuthSession,
) -> Result<impl Responder, AppError> {
    let mut user = session.user;
    user.avatar = None;
    user.touch();
    state.store.save_user(&user).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Serve a user's avatar. Public.
///
/// Malformed ids, unknown users and users without an avatar all answer `404`.
pub async fn get_avatar(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let not_found = || AppError::NotFound("Avatar not found".into());

    let id = Uuid::parse_str(&user_id).map_err(|_| not_found())?;
    let avatar = state
        .store
        .find_user_by_id(id)
        .await?
        .and_then(|user| user.avatar)
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().content_type(ContentType::png()).body(avatar))
}
