use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo_types::User;
pub use services::UserService;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::{dto::CreateUserRequest, memory::InMemoryUserStore, User, UserService};
    use crate::{auth::password::PasswordHasher, config::PasswordConfig};

    pub fn cheap_hasher() -> PasswordHasher {
        PasswordHasher::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .expect("valid test params")
    }

    pub fn test_service() -> UserService {
        UserService::new(Arc::new(InMemoryUserStore::new()), cheap_hasher())
    }

    pub fn create_req(
        username: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> CreateUserRequest {
        CreateUserRequest {
            username: Some(username.into()),
            password: Some(password.into()),
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            email: Some(email.into()),
        }
    }

    pub fn sample_user(username: &str) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$placeholder".into(),
            first_name: "Sample".into(),
            last_name: "User".into(),
            about: None,
            image: None,
            role: "User".into(),
            active: true,
            email_verified: true,
            created_at: now,
            updated_at: now,
        }
    }
}
