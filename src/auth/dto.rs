use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{error::AuthError, password::MIN_PASSWORD_LEN, repo_types::User};

pub const MIN_USERNAME_LEN: usize = 3;

/// Request body for user registration, as received.
///
/// Fields stay untyped until [`RegisterRequest::validate`] so that every
/// problem in a body can be reported at once.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default, rename = "isAdmin")]
    pub is_admin: Option<Value>,
}

/// Request body for login, as received.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

/// Registration input that passed validation.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    pub email: String,
    pub is_admin: Option<bool>,
}

/// Login input that passed validation.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

impl RegisterRequest {
    pub fn validate(self) -> Result<RegisterInput, AuthError> {
        let mut errors = Vec::new();
        let username = string_min_len("username", self.username.as_ref(), MIN_USERNAME_LEN, &mut errors);
        let password = string_min_len("password", self.password.as_ref(), MIN_PASSWORD_LEN, &mut errors);
        let email = email_string("email", self.email.as_ref(), &mut errors);
        let is_admin = optional_bool("isAdmin", self.is_admin.as_ref(), &mut errors);

        match (username, password, email) {
            (Some(username), Some(password), Some(email)) if errors.is_empty() => Ok(RegisterInput {
                username,
                password,
                email,
                is_admin,
            }),
            _ => Err(AuthError::Validation(errors)),
        }
    }
}

impl LoginRequest {
    pub fn validate(self) -> Result<LoginInput, AuthError> {
        let mut errors = Vec::new();
        let username = string_min_len("username", self.username.as_ref(), MIN_USERNAME_LEN, &mut errors);
        let password = string_min_len("password", self.password.as_ref(), MIN_PASSWORD_LEN, &mut errors);

        match (username, password) {
            (Some(username), Some(password)) if errors.is_empty() => {
                Ok(LoginInput { username, password })
            }
            _ => Err(AuthError::Validation(errors)),
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn string_min_len(
    field: &str,
    value: Option<&Value>,
    min: usize,
    errors: &mut Vec<String>,
) -> Option<String> {
    let too_short = format!("{field} must be longer than or equal to {min} characters");
    match value {
        Some(Value::String(s)) if s.chars().count() >= min => Some(s.clone()),
        Some(Value::String(_)) => {
            errors.push(too_short);
            None
        }
        _ => {
            errors.push(too_short);
            errors.push(format!("{field} must be a string"));
            None
        }
    }
}

fn email_string(field: &str, value: Option<&Value>, errors: &mut Vec<String>) -> Option<String> {
    match value {
        Some(Value::String(s)) if is_valid_email(s) => Some(s.clone()),
        _ => {
            errors.push(format!("{field} must be an email"));
            None
        }
    }
}

fn optional_bool(field: &str, value: Option<&Value>, errors: &mut Vec<String>) -> Option<bool> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            errors.push(format!("{field} must be a boolean value"));
            None
        }
    }
}
