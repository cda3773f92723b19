use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{StoreError, UniqueField, UserStore};
use super::repo_types::{NewUser, User, UserChanges, DEFAULT_ROLE};

/// Process-local store used by tests and `AppState::fake`.
///
/// Uniqueness is checked under the write lock, so it gives the same guarantee
/// as the unique indexes of the Postgres store.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn check_unique(
    users: &HashMap<Uuid, User>,
    except: Option<Uuid>,
    username: &str,
    email: Option<&str>,
) -> Result<(), StoreError> {
    for u in users.values().filter(|u| Some(u.id) != except) {
        if same(&u.username, username) {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        if email.is_some_and(|e| same(&u.email, e)) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| same(&u.username, username)).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| same(&u.email, email)).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        check_unique(&users, None, &new_user.username, Some(&new_user.email))?;

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            about: None,
            image: None,
            role: DEFAULT_ROLE.to_string(),
            active: true,
            email_verified: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&id) {
            return Ok(None);
        }
        check_unique(&users, Some(id), &changes.username, None)?;

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        user.username = changes.username;
        user.first_name = changes.first_name;
        user.last_name = changes.last_name;
        user.about = changes.about;
        user.image = changes.image;
        user.role = changes.role;
        user.active = changes.active;
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.write().await.remove(&id))
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.email_verified = true;
            user.updated_at = OffsetDateTime::now_utc();
            user.clone()
        }))
    }
}
