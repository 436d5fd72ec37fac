pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::User;

// Re-export necessary items
pub use extractors::AuthSession;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenError, TokenIssuer};

/// Represents the payload for a user login request.
///
/// Deliberately unvalidated beyond presence: a malformed email simply fails
/// to match any account.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom = "crate::models::not_blank")]
    pub name: Option<String>,
    /// Must be a valid email format. Stored lowercase.
    #[validate(email)]
    pub email: String,
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
}

/// Response after a successful registration or login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    /// The newly issued session token.
    pub token: String,
}
