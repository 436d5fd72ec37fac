pub mod health;
pub mod tasks;
pub mod users;

use actix_web::{guard, web};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Registers every endpoint. Expects `web::Data<AppState>` on the app.
///
/// Resources under `/users` opt into `AuthMiddleware` one by one since the
/// scope mixes public and private routes; `/tasks` is private as a whole.
///
/// The public avatar resource is GET-guarded and registered ahead of
/// `/me/avatar`, so `GET /users/me/avatar` is treated as an unknown id (404)
/// while uploads and deletes still reach the authenticated resource.
pub fn config(cfg: &mut web::ServiceConfig) {
    // Undecodable bodies answer with the same `{"error": ...}` shape as every other 400.
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
    );

    cfg.service(health::health)
        .service(
            web::scope("/users")
                .service(web::resource("").route(web::post().to(users::register)))
                .service(web::resource("/login").route(web::post().to(users::login)))
                .service(
                    web::resource("/logout")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(users::logout)),
                )
                .service(
                    web::resource("/logoutAll")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(users::logout_all)),
                )
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(users::me))
                        .route(web::patch().to(users::update_me))
                        .route(web::delete().to(users::delete_me)),
                )
                .service(
                    web::resource("/{id}/avatar")
                        .guard(guard::Get())
                        .route(web::get().to(users::get_avatar)),
                )
                .service(
                    web::resource("/me/avatar")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(users::upload_avatar))
                        .route(web::delete().to(users::delete_avatar)),
                ),
        )
        .service(
            web::scope("/tasks")
                .wrap(AuthMiddleware)
                .service(
                    web::resource("")
                        .route(web::get().to(tasks::get_tasks))
                        .route(web::post().to(tasks::create_task)),
                )
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(tasks::get_task))
                        .route(web::patch().to(tasks::update_task))
                        .route(web::delete().to(tasks::delete_task)),
                ),
        );
}
