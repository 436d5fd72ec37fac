use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use taskvault::config::Config;
use taskvault::routes;
use taskvault::store::{MemoryStore, PgStore, Store};
use taskvault::AppState;

async fn open_store(config: &Config) -> io::Result<Arc<dyn Store>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await.map_err(io::Error::other)?;
            store.migrate().await.map_err(io::Error::other)?;
            log::info!("using postgres store");
            Ok(Arc::new(store))
        }
        None => {
            log::warn!("DATABASE_URL not set, data will live in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(io::Error::other)?;
    let store = open_store(&config).await?;
    let state = web::Data::new(AppState::from_config(&config, store));

    log::info!("Starting taskvault server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
