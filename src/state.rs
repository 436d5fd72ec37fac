use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::store::Store;

/// Shared, read-only application state handed to every worker.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenIssuer,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer, bcrypt_cost: u32) -> Self {
        Self {
            store,
            tokens,
            bcrypt_cost,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Self {
        Self::new(
            store,
            TokenIssuer::new(&config.jwt_secret, config.token_ttl),
            config.bcrypt_cost,
        )
    }
}
