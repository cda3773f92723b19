use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_ROLE: &str = "User";

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string
    pub first_name: String,
    pub last_name: String,
    pub about: Option<String>,
    pub image: Option<String>,
    pub role: String,
    pub active: bool,
    pub email_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Full replacement of the mutable fields of a user.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub about: Option<String>,
    pub image: Option<String>,
    pub role: String,
    pub active: bool,
    /// `None` keeps the stored hash.
    pub password_hash: Option<String>,
}
