//! Authentication-related models

use serde::Deserialize;
use validator::Validate;

use crate::validation::Payload;

/// Login request
///
/// `username` accepts either the username or the email address.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "identifier")]
    #[validate(length(min = 1, max = 255))]
    pub username: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

impl Payload for LoginRequest {}

/// Token refresh request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

impl Payload for RefreshTokenRequest {}
