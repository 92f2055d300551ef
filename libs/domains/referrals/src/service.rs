use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::chain::{ChainWalk, walk_chain};
use crate::error::{ReferralError, ReferralResult};
use crate::models::{CreateUser, ReferralKey, ReferralStats, User, UserId};
use crate::program::{self, ReferralPolicy};
use crate::repository::UserDirectory;

/// Service layer for referral business logic.
///
/// Stateless over the directory: every call re-reads what it needs, so
/// results always reflect the directory at call time.
#[derive(Clone)]
pub struct ReferralService<D: UserDirectory> {
    directory: Arc<D>,
    policy: ReferralPolicy,
}

impl<D: UserDirectory> ReferralService<D> {
    pub fn new(directory: D) -> Self {
        Self::with_policy(directory, ReferralPolicy::default())
    }

    pub fn with_policy(directory: D, policy: ReferralPolicy) -> Self {
        Self {
            directory: Arc::new(directory),
            policy,
        }
    }

    pub fn policy(&self) -> ReferralPolicy {
        self.policy
    }

    /// Resolve `candidate_key` to a referrer id acceptable for `new_user_id`.
    ///
    /// `new_user_id` is `None` while the user does not exist yet; self-referral
    /// and cycle checks only apply once it does. Unknown keys, self-referral,
    /// banned or inactive referrers and would-be cycles all yield `Ok(None)`.
    /// Only directory failures are errors.
    pub async fn validate_referrer(
        &self,
        candidate_key: Option<&str>,
        new_user_id: Option<UserId>,
    ) -> ReferralResult<Option<UserId>> {
        let Some(key) = candidate_key.and_then(ReferralKey::parse) else {
            return Ok(None);
        };
        let new_user_id = new_user_id.filter(|id| id.is_assigned());

        let Some(referrer) = self.directory.find_by_key(&key).await? else {
            info!(referrer_key = %key, "Referrer not found");
            return Ok(None);
        };

        if new_user_id == Some(referrer.id) {
            info!(referrer_id = %referrer.id, "Self-referral attempt rejected");
            return Ok(None);
        }

        if !referrer.can_refer() {
            info!(
                referrer_id = %referrer.id,
                ban = referrer.ban,
                is_active = referrer.is_active,
                "Referrer is banned or inactive"
            );
            return Ok(None);
        }

        if let Some(new_user_id) = new_user_id {
            if self.has_cycle(referrer.id, new_user_id).await? {
                warn!(
                    referrer_id = %referrer.id,
                    new_user_id = %new_user_id,
                    "Cycle detected in referral chain"
                );
                return Ok(None);
            }
        }

        info!(
            referrer_id = %referrer.id,
            referrer_name = %referrer.name,
            "Referrer validated"
        );
        Ok(Some(referrer.id))
    }

    /// Would making `referrer_id` the referrer of `referral_id` create a cycle?
    ///
    /// Walks at most `policy.max_chain_depth` hops; see [`Self::has_cycle_within`].
    pub async fn has_cycle(&self, referrer_id: UserId, referral_id: UserId) -> ReferralResult<bool> {
        self.has_cycle_within(referrer_id, referral_id, self.policy.max_chain_depth)
            .await
    }

    /// Cycle check with an explicit hop limit.
    ///
    /// A missing user mid-chain ends the walk as "no cycle". So does running
    /// out of hops: loops longer than `max_depth` go undetected.
    pub async fn has_cycle_within(
        &self,
        referrer_id: UserId,
        referral_id: UserId,
        max_depth: usize,
    ) -> ReferralResult<bool> {
        let walk = walk_chain(self.directory.as_ref(), referrer_id, referral_id, max_depth).await?;

        match walk {
            ChainWalk::Broken { missing, depth } => {
                debug!(%referrer_id, %missing, depth, "Referrer chain ends at a missing user");
            }
            ChainWalk::DepthLimit { last } => {
                debug!(%referrer_id, %last, max_depth, "Referrer chain walk hit the depth limit");
            }
            ChainWalk::Cycle { .. } | ChainWalk::Root { .. } => {}
        }

        Ok(walk.is_cycle())
    }

    /// Whether `user_id` still earns referral benefits now
    pub async fn is_program_active(&self, user_id: UserId) -> ReferralResult<bool> {
        self.is_program_active_at(user_id, Utc::now()).await
    }

    /// Whether `user_id` is inside the program window at `now`; `false` for unknown users
    pub async fn is_program_active_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> ReferralResult<bool> {
        let Some(user) = self.directory.find_by_id(user_id).await? else {
            return Ok(false);
        };

        Ok(program::is_within_program(
            user.created_at,
            now,
            self.policy.program_years,
        ))
    }

    /// Direct referrer of `user_id`; `None` for roots and unknown users
    pub async fn get_referrer_id(&self, user_id: UserId) -> ReferralResult<Option<UserId>> {
        let user = self.directory.find_by_id(user_id).await?;
        Ok(user.and_then(|u| u.referrer_id))
    }

    /// Users directly referred by `referrer_id`
    pub async fn get_referrals(&self, referrer_id: UserId) -> ReferralResult<Vec<User>> {
        self.directory.list_by_referrer(referrer_id).await
    }

    /// Direct referrals registered within the program window
    pub async fn get_active_referrals_count(&self, referrer_id: UserId) -> ReferralResult<u64> {
        self.get_active_referrals_count_at(referrer_id, Utc::now())
            .await
    }

    pub async fn get_active_referrals_count_at(
        &self,
        referrer_id: UserId,
        now: DateTime<Utc>,
    ) -> ReferralResult<u64> {
        let cutoff = program::program_cutoff(now, self.policy.program_years);
        self.directory
            .count_by_referrer_since(referrer_id, cutoff)
            .await
    }

    /// Totals for a referrer; `NotFound` if the referrer does not exist
    pub async fn referral_stats(&self, referrer_id: UserId) -> ReferralResult<ReferralStats> {
        if self.directory.find_by_id(referrer_id).await?.is_none() {
            return Err(ReferralError::NotFound(referrer_id));
        }

        let total_referrals = self.get_referrals(referrer_id).await?.len();
        let active_referrals = self.get_active_referrals_count(referrer_id).await?;

        Ok(ReferralStats {
            referrer_id,
            total_referrals,
            active_referrals,
        })
    }

    /// Create a user, attaching the referrer behind `referrer_key` when it validates.
    ///
    /// Any `referrer_id` already on `input` is replaced by the validated one.
    /// A rejected referrer never fails the registration; the user is simply
    /// created without one.
    pub async fn register_user(
        &self,
        mut input: CreateUser,
        referrer_key: Option<&str>,
    ) -> ReferralResult<User> {
        input.validate()?;

        input.referrer_id = self.validate_referrer(referrer_key, None).await?;
        self.directory.create(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserDirectory;
    use mockall::predicate::eq;

    fn user(id: i64, referrer_id: Option<i64>) -> User {
        let now = Utc::now();
        User {
            id: UserId(id),
            key: ReferralKey::parse(&format!("KEY{id}")).unwrap(),
            name: format!("user {id}"),
            email: format!("user{id}@example.com"),
            referrer_id: referrer_id.map(UserId),
            ban: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_blank_key_skips_directory() {
        // No expectations: any directory call would panic
        let service = ReferralService::new(MockUserDirectory::new());

        assert_eq!(service.validate_referrer(None, None).await.unwrap(), None);
        assert_eq!(service.validate_referrer(Some(""), None).await.unwrap(), None);
        assert_eq!(
            service.validate_referrer(Some(""), Some(UserId(3))).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_key_is_looked_up_verbatim() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_key()
            .withf(|key| key.as_str() == " KEY1 ")
            .times(1)
            .returning(|_| Ok(None));

        let service = ReferralService::new(mock);
        let result = service.validate_referrer(Some(" KEY1 "), None).await.unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_directory_failure_propagates() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_key()
            .returning(|_| Err(ReferralError::Database("connection reset".to_string())));

        let service = ReferralService::new(mock);
        let result = service.validate_referrer(Some("KEY1"), None).await;

        assert!(matches!(result, Err(ReferralError::Database(_))));
    }

    #[tokio::test]
    async fn test_failure_mid_walk_propagates() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_key().returning(|_| Ok(Some(user(1, Some(2)))));
        mock.expect_find_by_id()
            .with(eq(UserId(1)))
            .returning(|_| Ok(Some(user(1, Some(2)))));
        mock.expect_find_by_id()
            .with(eq(UserId(2)))
            .returning(|_| Err(ReferralError::Database("timeout".to_string())));

        let service = ReferralService::new(mock);
        let result = service.validate_referrer(Some("KEY1"), Some(UserId(9))).await;

        assert!(matches!(result, Err(ReferralError::Database(_))));
    }

    #[tokio::test]
    async fn test_no_cycle_walk_when_user_not_created() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_key().returning(|_| Ok(Some(user(1, Some(2)))));
        mock.expect_find_by_id().never();

        let service = ReferralService::new(mock);
        let result = service.validate_referrer(Some("KEY1"), None).await.unwrap();

        assert_eq!(result, Some(UserId(1)));
    }

    #[tokio::test]
    async fn test_zero_new_user_id_means_not_created() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_key().returning(|_| Ok(Some(user(1, None))));
        mock.expect_find_by_id().never();

        let service = ReferralService::new(mock);
        let result = service
            .validate_referrer(Some("KEY1"), Some(UserId(0)))
            .await
            .unwrap();

        assert_eq!(result, Some(UserId(1)));
    }

    #[tokio::test]
    async fn test_self_cycle_needs_no_reads() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_id().never();

        let service = ReferralService::new(mock);
        assert!(service.has_cycle(UserId(5), UserId(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_depth_limit_bounds_directory_reads() {
        // An endless chain 1 -> 2 -> 3 -> ...
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_id()
            .times(10)
            .returning(|id| Ok(Some(user(id.get(), Some(id.get() + 1)))));

        let service = ReferralService::new(mock);
        let cycle = service.has_cycle(UserId(1), UserId(1_000)).await.unwrap();

        assert!(!cycle);
    }

    #[tokio::test]
    async fn test_custom_depth_limit() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_id()
            .times(3)
            .returning(|id| Ok(Some(user(id.get(), Some(id.get() + 1)))));

        let service = ReferralService::new(mock);
        let cycle = service
            .has_cycle_within(UserId(1), UserId(1_000), 3)
            .await
            .unwrap();

        assert!(!cycle);
    }

    #[tokio::test]
    async fn test_missing_user_mid_chain_is_not_a_cycle() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_id()
            .with(eq(UserId(1)))
            .returning(|_| Ok(Some(user(1, Some(2)))));
        mock.expect_find_by_id()
            .with(eq(UserId(2)))
            .returning(|_| Ok(None));

        let service = ReferralService::new(mock);
        assert!(!service.has_cycle(UserId(1), UserId(7)).await.unwrap());
    }

    #[tokio::test]
    async fn test_program_inactive_for_unknown_user() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_id().returning(|_| Ok(None));

        let service = ReferralService::new(mock);
        assert!(!service.is_program_active(UserId(404)).await.unwrap());
        assert_eq!(service.get_referrer_id(UserId(404)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_active_count_uses_program_cutoff() {
        let now = Utc::now();
        let expected_cutoff = program::program_cutoff(now, 3);

        let mut mock = MockUserDirectory::new();
        mock.expect_count_by_referrer_since()
            .with(eq(UserId(1)), eq(expected_cutoff))
            .times(1)
            .returning(|_, _| Ok(4));

        let policy = ReferralPolicy {
            program_years: 3,
            ..ReferralPolicy::default()
        };
        let service = ReferralService::with_policy(mock, policy);
        let count = service
            .get_active_referrals_count_at(UserId(1), now)
            .await
            .unwrap();

        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input_before_writing() {
        let mut mock = MockUserDirectory::new();
        mock.expect_create().never();

        let service = ReferralService::new(mock);
        let result = service
            .register_user(CreateUser::new("", "not-an-email"), None)
            .await;

        assert!(matches!(result, Err(ReferralError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_overlong_key_before_writing() {
        let mut mock = MockUserDirectory::new();
        mock.expect_create().never();

        let key = ReferralKey::parse(&"K".repeat(ReferralKey::MAX_LEN + 1)).unwrap();
        let service = ReferralService::new(mock);
        let result = service
            .register_user(CreateUser::new("Ann", "ann@example.com").with_key(key), None)
            .await;

        assert!(matches!(result, Err(ReferralError::Validation(_))));
    }

    #[tokio::test]
    async fn test_stats_for_unknown_referrer() {
        let mut mock = MockUserDirectory::new();
        mock.expect_find_by_id().returning(|_| Ok(None));

        let service = ReferralService::new(mock);
        let result = service.referral_stats(UserId(12)).await;

        assert!(matches!(result, Err(ReferralError::NotFound(UserId(12)))));
    }
}
