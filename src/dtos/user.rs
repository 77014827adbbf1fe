use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::error::{AppError, FieldErrors};
use crate::models::user::User;
use crate::validation::{self, REQUIRED};

const USERNAME_MAX_LEN: usize = 150;
const EMAIL_MAX_LEN: usize = 254;
const NAME_MAX_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A registration that passed field validation; the password is still plaintext.
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterUserRequest {
    pub fn validate(self) -> Result<Registration, AppError> {
        let mut errors = FieldErrors::new();

        let username = validation::required_text(&mut errors, "username", self.username, Some(USERNAME_MAX_LEN));
        if let Some(name) = &username {
            if !validation::is_valid_username(name) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        let email = validation::required_text(&mut errors, "email", self.email, Some(EMAIL_MAX_LEN))
            .map(|e| e.to_lowercase());
        if let Some(address) = &email {
            if !validation::is_valid_email(address) {
                errors.add("email", "Enter a valid email address.");
            }
        }

        // passwords are taken verbatim, whitespace included
        let password = match self.password {
            None => {
                errors.add("password", REQUIRED);
                None
            }
            Some(p) if p.chars().count() < MIN_PASSWORD_LEN => {
                errors.add(
                    "password",
                    format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
                );
                None
            }
            Some(p) => Some(p),
        };

        let first_name = validation::optional_text(&mut errors, "first_name", self.first_name, NAME_MAX_LEN);
        let last_name = validation::optional_text(&mut errors, "last_name", self.last_name, NAME_MAX_LEN);

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if errors.is_empty() => Ok(Registration {
                username,
                email,
                password,
                first_name,
                last_name,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub groups: Vec<String>,
    pub permissions: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

// The password hash never leaves the server.
impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: user.is_active,
            is_staff: user.is_staff,
            groups: user.groups,
            permissions: user.permissions,
            last_login: user.last_login,
            date_joined: user.date_joined,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}
