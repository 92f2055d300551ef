use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ReferralError, ReferralResult};
use crate::models::{CreateUser, ReferralKey, User, UserId};

/// Lookup and creation of users, as needed by the referral service.
///
/// The service never caches what this returns: every chain walk reads the
/// current parent pointers through `find_by_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by public referral key
    async fn find_by_key(&self, key: &ReferralKey) -> ReferralResult<Option<User>>;

    /// Find a user by id
    async fn find_by_id(&self, id: UserId) -> ReferralResult<Option<User>>;

    /// Persist a new user, `referrer_id` included
    async fn create(&self, input: CreateUser) -> ReferralResult<User>;

    /// Direct referrals of `referrer_id`
    async fn list_by_referrer(&self, referrer_id: UserId) -> ReferralResult<Vec<User>>;

    /// Direct referrals of `referrer_id` registered at or after `since`
    async fn count_by_referrer_since(
        &self,
        referrer_id: UserId,
        since: DateTime<Utc>,
    ) -> ReferralResult<u64>;
}

#[derive(Debug, Default)]
struct Store {
    users: HashMap<UserId, User>,
    last_id: i64,
}

/// In-memory implementation of UserDirectory (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserDirectory {
    store: Arc<RwLock<Store>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a user's parent pointer, bypassing validation.
    ///
    /// Lets tests and fixtures build graphs the service would refuse,
    /// including cycles.
    pub async fn set_referrer(
        &self,
        id: UserId,
        referrer_id: Option<UserId>,
    ) -> ReferralResult<()> {
        let mut store = self.store.write().await;
        let user = store.users.get_mut(&id).ok_or(ReferralError::NotFound(id))?;
        user.referrer_id = referrer_id;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_key(&self, key: &ReferralKey) -> ReferralResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.values().find(|u| &u.key == key).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> ReferralResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.get(&id).cloned())
    }

    async fn create(&self, input: CreateUser) -> ReferralResult<User> {
        let mut store = self.store.write().await;

        let key = input.key.unwrap_or_else(ReferralKey::generate);
        if store.users.values().any(|u| u.key == key) {
            return Err(ReferralError::DuplicateKey(key.into_inner()));
        }

        // Exact match, like the unique index on users.email
        if store.users.values().any(|u| u.email == input.email) {
            return Err(ReferralError::DuplicateEmail(input.email));
        }

        store.last_id += 1;
        let now = Utc::now();
        let user = User {
            id: UserId(store.last_id),
            key,
            name: input.name,
            email: input.email,
            referrer_id: input.referrer_id,
            ban: input.ban,
            is_active: input.is_active,
            created_at: input.created_at.unwrap_or(now),
            updated_at: now,
        };
        store.users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, referrer_id = ?user.referrer_id, "Created user");
        Ok(user)
    }

    async fn list_by_referrer(&self, referrer_id: UserId) -> ReferralResult<Vec<User>> {
        let store = self.store.read().await;

        let mut referrals: Vec<User> = store
            .users
            .values()
            .filter(|u| u.referrer_id == Some(referrer_id))
            .cloned()
            .collect();

        referrals.sort_by_key(|u| u.id);
        Ok(referrals)
    }

    async fn count_by_referrer_since(
        &self,
        referrer_id: UserId,
        since: DateTime<Utc>,
    ) -> ReferralResult<u64> {
        let store = self.store.read().await;

        let count = store
            .users
            .values()
            .filter(|u| u.referrer_id == Some(referrer_id) && u.created_at >= since)
            .count();

        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids_and_keys() {
        let directory = InMemoryUserDirectory::new();

        let first = directory
            .create(CreateUser::new("First", "first@example.com"))
            .await
            .unwrap();
        let second = directory
            .create(CreateUser::new("Second", "second@example.com"))
            .await
            .unwrap();

        assert_eq!(first.id, UserId(1));
        assert_eq!(second.id, UserId(2));
        assert_ne!(first.key, second.key);

        let found = directory.find_by_key(&second.key).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(second.id));
    }

    #[tokio::test]
    async fn test_duplicate_key_and_email_rejected() {
        let directory = InMemoryUserDirectory::new();
        let key = ReferralKey::parse("SHARED").unwrap();

        directory
            .create(CreateUser::new("Ann", "ann@example.com").with_key(key.clone()))
            .await
            .unwrap();

        let dup_key = directory
            .create(CreateUser::new("Bob", "bob@example.com").with_key(key))
            .await;
        assert!(matches!(dup_key, Err(ReferralError::DuplicateKey(_))));

        let dup_email = directory
            .create(CreateUser::new("Ann again", "ann@example.com"))
            .await;
        assert!(matches!(dup_email, Err(ReferralError::DuplicateEmail(_))));

        let other_case = directory
            .create(CreateUser::new("Ann upper", "ANN@example.com"))
            .await;
        assert!(other_case.is_ok());
    }

    #[tokio::test]
    async fn test_children_listing_and_window_count() {
        let directory = InMemoryUserDirectory::new();
        let now = Utc::now();

        let parent = directory
            .create(CreateUser::new("Parent", "parent@example.com"))
            .await
            .unwrap();
        directory
            .create(
                CreateUser::new("Recent", "recent@example.com")
                    .with_referrer(Some(parent.id))
                    .created_at(now - Duration::days(30)),
            )
            .await
            .unwrap();
        directory
            .create(
                CreateUser::new("Old", "old@example.com")
                    .with_referrer(Some(parent.id))
                    .created_at(now - Duration::days(900)),
            )
            .await
            .unwrap();
        directory
            .create(CreateUser::new("Stranger", "stranger@example.com"))
            .await
            .unwrap();

        let children = directory.list_by_referrer(parent.id).await.unwrap();
        assert_eq!(children.len(), 2);

        let since = now - Duration::days(365);
        assert_eq!(directory.count_by_referrer_since(parent.id, since).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_referrer_missing_user() {
        let directory = InMemoryUserDirectory::new();
        let result = directory.set_referrer(UserId(42), None).await;
        assert!(matches!(result, Err(ReferralError::NotFound(UserId(42)))));
    }
}
