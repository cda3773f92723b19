use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::password::PasswordHasher,
    error::{ServiceError, ServiceResult},
    users::{
        dto::{Confirmation, CreateUserRequest, DeleteUserRequest, UpdateUserRequest},
        repo::UserStore,
        repo_types::{NewUser, User, UserChanges},
    },
};

/// Trimmed value, or `None` when missing or blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Validation, uniqueness checks and persistence of user accounts.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    passwords: PasswordHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, passwords: PasswordHasher) -> Self {
        Self { store, passwords }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn passwords(&self) -> &PasswordHasher {
        &self.passwords
    }

    /// All users. An empty store is reported as not-found.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> ServiceResult<Vec<User>> {
        let users = self.store.list().await?;
        if users.is_empty() {
            return Err(ServiceError::not_found("No users found"));
        }
        Ok(users)
    }

    #[instrument(skip(self, req), fields(username = ?req.username))]
    pub async fn create_user(&self, req: CreateUserRequest) -> ServiceResult<Confirmation> {
        let (Some(username), Some(first_name), Some(last_name), Some(email)) = (
            present(&req.username),
            present(&req.first_name),
            present(&req.last_name),
            present(&req.email),
        ) else {
            warn!("create user with missing fields");
            return Err(ServiceError::validation("All fields are required"));
        };
        let Some(password) = req.password.as_deref().filter(|p| !p.is_empty()) else {
            warn!("create user with missing password");
            return Err(ServiceError::validation("All fields are required"));
        };

        // Fast path only: the store's unique constraints are authoritative.
        if self.store.find_by_username(username).await?.is_some() {
            warn!(username = %username, "duplicate username");
            return Err(ServiceError::conflict("Duplicate username"));
        }
        if self.store.find_by_email(email).await?.is_some() {
            warn!(email = %email, "duplicate email");
            return Err(ServiceError::conflict("Duplicate email"));
        }

        let password_hash = self.passwords.hash(password)?;
        let user = self
            .store
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(Confirmation {
            message: format!("New user {} created", user.username),
            user,
        })
    }

    /// Replaces every mutable field; `about` and `image` are cleared when
    /// absent or empty. The password hash changes only if a password is given.
    #[instrument(skip(self, req), fields(id = ?req.id))]
    pub async fn update_user(&self, req: UpdateUserRequest) -> ServiceResult<Confirmation> {
        let active = req.active.as_ref().and_then(serde_json::Value::as_bool);
        let (Some(id), Some(username), Some(first_name), Some(last_name), Some(role), Some(active)) = (
            present(&req.id),
            present(&req.username),
            present(&req.first_name),
            present(&req.last_name),
            present(&req.role),
            active,
        ) else {
            warn!("update user with missing fields");
            return Err(ServiceError::validation("Please enter all required fields"));
        };

        let id = Uuid::parse_str(id).map_err(|_| ServiceError::not_found("User not found"))?;
        if self.store.find_by_id(id).await?.is_none() {
            warn!(%id, "update of unknown user");
            return Err(ServiceError::not_found("User not found"));
        }

        if let Some(holder) = self.store.find_by_username(username).await? {
            if holder.id != id {
                warn!(username = %username, "duplicate username");
                return Err(ServiceError::conflict("Duplicate username"));
            }
        }

        let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
            Some(p) => Some(self.passwords.hash(p)?),
            None => None,
        };

        let changes = UserChanges {
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            about: present(&req.about).map(str::to_string),
            image: present(&req.image).map(str::to_string),
            role: role.to_string(),
            active,
            password_hash,
        };
        let user = self
            .store
            .update(id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        info!(user_id = %user.id, username = %user.username, "user updated");
        Ok(Confirmation {
            message: format!("{} updated", user.username),
            user,
        })
    }

    #[instrument(skip(self, req), fields(id = ?req.id))]
    pub async fn delete_user(&self, req: DeleteUserRequest) -> ServiceResult<Confirmation> {
        let Some(id) = present(&req.id) else {
            return Err(ServiceError::validation("User ID required"));
        };
        let id = Uuid::parse_str(id).map_err(|_| ServiceError::not_found("User not found"))?;

        let user = self
            .store
            .delete(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        info!(user_id = %user.id, username = %user.username, "user deleted");
        Ok(Confirmation {
            message: format!("Username {} with ID {} deleted", user.username, user.id),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::users::{
        memory::InMemoryUserStore,
        repo::StoreError,
        test_support::{cheap_hasher, create_req, test_service},
    };

    fn update_req(user: &User) -> UpdateUserRequest {
        UpdateUserRequest {
            id: Some(user.id.to_string()),
            username: Some(user.username.clone()),
            first_name: Some(user.first_name.clone()),
            last_name: Some(user.last_name.clone()),
            about: user.about.clone(),
            image: user.image.clone(),
            role: Some(user.role.clone()),
            active: Some(json!(user.active)),
            password: None,
        }
    }

    #[tokio::test]
    async fn create_hashes_password_and_confirms() {
        let svc = test_service();
        let done = svc
            .create_user(create_req("alice", "pw123", "Alice", "A", "a@x.com"))
            .await
            .unwrap();
        assert_eq!(done.message, "New user alice created");

        let stored = svc.store().find_by_username("alice").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "pw123");
        assert!(svc.passwords().verify("pw123", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn create_rejects_username_differing_in_case() {
        let svc = test_service();
        svc.create_user(create_req("alice", "pw123", "Alice", "A", "a@x.com"))
            .await
            .unwrap();
        let err = svc
            .create_user(create_req("Alice", "pw456", "Alice2", "B", "b@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Duplicate username"));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let svc = test_service();
        svc.create_user(create_req("alice", "pw", "Alice", "A", "a@x.com"))
            .await
            .unwrap();
        let err = svc
            .create_user(create_req("bob", "pw", "Bob", "B", "A@X.COM"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Duplicate email"));
    }

    #[tokio::test]
    async fn create_requires_every_field() {
        let svc = test_service();
        let mut req = create_req("alice", "pw", "Alice", "A", "a@x.com");
        req.last_name = Some("   ".into());
        let err = svc.create_user(req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "All fields are required"));

        let mut req = create_req("alice", "pw", "Alice", "A", "a@x.com");
        req.password = None;
        assert!(matches!(
            svc.create_user(req).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn create_accepts_any_non_empty_email() {
        let svc = test_service();
        let done = svc
            .create_user(create_req("alice", "pw123", "Alice", "A", "alice@localhost"))
            .await
            .unwrap();
        assert_eq!(done.user.email, "alice@localhost");
    }

    #[tokio::test]
    async fn update_with_empty_about_clears_it() {
        let svc = test_service();
        let user = svc
            .create_user(create_req("alice", "pw", "Alice", "A", "a@x.com"))
            .await
            .unwrap()
            .user;

        let mut req = update_req(&user);
        req.about = Some("hello".into());
        req.image = Some("https://img/a.png".into());
        let updated = svc.update_user(req).await.unwrap().user;
        assert_eq!(updated.about.as_deref(), Some("hello"));

        let mut req = update_req(&updated);
        req.about = Some(String::new());
        req.image = None;
        let cleared = svc.update_user(req).await.unwrap().user;
        assert_eq!(cleared.about, None);
        assert_eq!(cleared.image, None);
    }

    #[tokio::test]
    async fn update_username_conflicts_only_with_other_users() {
        let svc = test_service();
        let alice = svc
            .create_user(create_req("alice", "pw", "Alice", "A", "a@x.com"))
            .await
            .unwrap()
            .user;
        svc.create_user(create_req("bob", "pw", "Bob", "B", "b@x.com"))
            .await
            .unwrap();

        let mut req = update_req(&alice);
        req.username = Some("BOB".into());
        let err = svc.update_user(req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Duplicate username"));

        let mut req = update_req(&alice);
        req.username = Some("ALICE".into());
        let done = svc.update_user(req).await.unwrap();
        assert_eq!(done.message, "ALICE updated");
    }

    #[tokio::test]
    async fn update_requires_strict_boolean_active() {
        let svc = test_service();
        let user = svc
            .create_user(create_req("alice", "pw", "Alice", "A", "a@x.com"))
            .await
            .unwrap()
            .user;
        let mut req = update_req(&user);
        req.active = Some(json!("true"));
        let err = svc.update_user(req).await.unwrap_err();
        assert!(
            matches!(err, ServiceError::Validation(ref m) if m == "Please enter all required fields")
        );
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let svc = test_service();
        let user = svc
            .create_user(create_req("alice", "pw", "Alice", "A", "a@x.com"))
            .await
            .unwrap()
            .user;
        let mut req = update_req(&user);
        req.id = Some(Uuid::new_v4().to_string());
        assert!(matches!(
            svc.update_user(req).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn update_rehashes_only_when_password_given() {
        let svc = test_service();
        let user = svc
            .create_user(create_req("alice", "old-pw", "Alice", "A", "a@x.com"))
            .await
            .unwrap()
            .user;

        let kept = svc.update_user(update_req(&user)).await.unwrap().user;
        assert_eq!(kept.password_hash, user.password_hash);

        let mut req = update_req(&user);
        req.password = Some("new-pw".into());
        let changed = svc.update_user(req).await.unwrap().user;
        assert!(svc.passwords().verify("new-pw", &changed.password_hash).unwrap());
        assert!(!svc.passwords().verify("old-pw", &changed.password_hash).unwrap());
    }

    #[tokio::test]
    async fn delete_removes_user() {
        let svc = test_service();
        let user = svc
            .create_user(create_req("alice", "pw", "Alice", "A", "a@x.com"))
            .await
            .unwrap()
            .user;

        let done = svc
            .delete_user(DeleteUserRequest {
                id: Some(user.id.to_string()),
            })
            .await
            .unwrap();
        assert_eq!(
            done.message,
            format!("Username alice with ID {} deleted", user.id)
        );
        assert!(svc.store().find_by_id(user.id).await.unwrap().is_none());

        let err = svc
            .delete_user(DeleteUserRequest {
                id: Some(user.id.to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(ref m) if m == "User not found"));
    }

    #[tokio::test]
    async fn delete_requires_id() {
        let svc = test_service();
        let err = svc.delete_user(DeleteUserRequest { id: None }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "User ID required"));
    }

    #[tokio::test]
    async fn list_on_empty_store_is_not_found() {
        let svc = test_service();
        let err = svc.list_users().await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(ref m) if m == "No users found"));

        svc.create_user(create_req("alice", "pw", "Alice", "A", "a@x.com"))
            .await
            .unwrap();
        assert_eq!(svc.list_users().await.unwrap().len(), 1);
    }

    /// Lookups never see existing rows, as when a concurrent request wins the
    /// race between the pre-check and the write.
    struct BlindLookups(InMemoryUserStore);

    #[async_trait]
    impl UserStore for BlindLookups {
        async fn list(&self) -> Result<Vec<User>, StoreError> {
            self.0.list().await
        }
        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.0.find_by_id(id).await
        }
        async fn find_by_username(&self, _: &str) -> Result<Option<User>, StoreError> {
            Ok(None)
        }
        async fn find_by_email(&self, _: &str) -> Result<Option<User>, StoreError> {
            Ok(None)
        }
        async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
            self.0.create(new_user).await
        }
        async fn update(&self, id: Uuid, c: UserChanges) -> Result<Option<User>, StoreError> {
            self.0.update(id, c).await
        }
        async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.0.delete(id).await
        }
        async fn mark_email_verified(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.0.mark_email_verified(id).await
        }
    }

    #[tokio::test]
    async fn store_level_violation_surfaces_as_conflict() {
        let svc = UserService::new(
            Arc::new(BlindLookups(InMemoryUserStore::new())),
            cheap_hasher(),
        );
        svc.create_user(create_req("alice", "pw", "Alice", "A", "a@x.com"))
            .await
            .unwrap();

        let err = svc
            .create_user(create_req("ALICE", "pw", "Alice", "A", "z@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Duplicate username"));

        let err = svc
            .create_user(create_req("zed", "pw", "Zed", "Z", "A@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Duplicate email"));
    }
}
