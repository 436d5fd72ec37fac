#![doc = "The `taskvault` library crate."]
#![doc = ""]
#![doc = "Accounts with revocable token sessions, per-user task CRUD and avatar storage."]
#![doc = "The binary (`main.rs`) only reads configuration, picks a store and serves `routes::config`."]

pub mod auth;
pub mod avatar;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use error::AppError;
pub use state::AppState;
