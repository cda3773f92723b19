use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Body of `POST /users`. Fields are optional so that a missing field is
/// reported as a validation failure rather than a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Body of `PATCH /users`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub id: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub about: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
    /// Kept raw: only a JSON boolean is accepted.
    pub active: Option<serde_json::Value>,
    pub password: Option<String>,
}

/// Body of `DELETE /users`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteUserRequest {
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of a successful write: the affected record and the text shown to
/// the caller.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub user: User,
    pub message: String,
}
