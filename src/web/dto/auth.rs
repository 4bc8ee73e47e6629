use serde::{Deserialize, Serialize};

use crate::model::entity::UserEntity;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegisterBody {
    /// First problem with the submitted fields, if any.
    pub fn problem(&self) -> Option<&'static str> {
        if self.username.trim().is_empty() {
            return Some("username must not be empty");
        }
        if !looks_like_email(self.email.trim()) {
            return Some("email is malformed");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Some("password must be at least 6 characters");
        }
        None
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct RefreshBody {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub user: UserEntity,
    pub access_token: String,
    pub refresh_token: String,
}
