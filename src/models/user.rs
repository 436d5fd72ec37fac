use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Keys a client may send to `PATCH /users/me`.
pub const ALLOWED_USER_UPDATES: [&str; 4] = ["name", "email", "age", "password"];

/// A registered account.
///
/// The password hash, the session tokens and the avatar bytes never leave the
/// server in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    /// Unique across users, stored lowercase.
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub age: Option<i32>,
    /// Currently valid session tokens, oldest first.
    #[serde(skip_serializing, default)]
    pub tokens: Vec<String>,
    #[serde(skip_serializing, default)]
    pub avatar: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, password_hash: String, name: Option<String>, age: Option<i32>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.map(|n| n.trim().to_string()),
            email: normalize_email(email),
            password_hash,
            age,
            tokens: Vec::new(),
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn add_token(&mut self, token: String) {
        self.tokens.push(token);
        self.touch();
    }

    /// Drops a single session. Returns `false` if the token was not active.
    pub fn revoke_token(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != token);
        self.touch();
        self.tokens.len() != before
    }

    pub fn revoke_all_tokens(&mut self) {
        self.tokens.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Profile changes accepted from `PATCH /users/me`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(custom = "crate::models::not_blank")]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
}
