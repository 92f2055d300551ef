use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, SqlErr,
};

use crate::{
    entity,
    error::{ReferralError, ReferralResult},
    models::{CreateUser, ReferralKey, User, UserId},
    repository::UserDirectory,
};

/// PostgreSQL implementation of UserDirectory using SeaORM
#[derive(Clone)]
pub struct PgUserDirectory {
    db: DatabaseConnection,
}

impl PgUserDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn key_exists(&self, key: &str) -> ReferralResult<bool> {
        let found = entity::Entity::find()
            .filter(entity::Column::Key.eq(key))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }

    async fn email_exists(&self, email: &str) -> ReferralResult<bool> {
        let found = entity::Entity::find()
            .filter(entity::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_key(&self, key: &ReferralKey) -> ReferralResult<Option<User>> {
        let model = entity::Entity::find()
            .filter(entity::Column::Key.eq(key.as_str()))
            .one(&self.db)
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_by_id(&self, id: UserId) -> ReferralResult<Option<User>> {
        let model = entity::Entity::find_by_id(id.get()).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn create(&self, mut input: CreateUser) -> ReferralResult<User> {
        let key = input.key.take().unwrap_or_else(ReferralKey::generate);
        if self.key_exists(key.as_str()).await? {
            return Err(ReferralError::DuplicateKey(key.into_inner()));
        }
        if self.email_exists(&input.email).await? {
            return Err(ReferralError::DuplicateEmail(input.email));
        }
        let key_text = key.as_str().to_string();
        let email = input.email.clone();
        input.key = Some(key);

        let active_model: entity::ActiveModel = input.into();
        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|err| map_insert_error(err, &key_text, &email))?;

        tracing::info!(user_id = model.id, referrer_id = ?model.referrer_id, "Created user");
        Ok(model.into())
    }

    async fn list_by_referrer(&self, referrer_id: UserId) -> ReferralResult<Vec<User>> {
        let models = entity::Entity::find()
            .filter(entity::Column::ReferrerId.eq(referrer_id.get()))
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn count_by_referrer_since(
        &self,
        referrer_id: UserId,
        since: DateTime<Utc>,
    ) -> ReferralResult<u64> {
        let since: DateTimeWithTimeZone = since.into();

        let count = entity::Entity::find()
            .filter(entity::Column::ReferrerId.eq(referrer_id.get()))
            .filter(entity::Column::CreatedAt.gte(since))
            .count(&self.db)
            .await?;

        Ok(count)
    }
}

/// A concurrent insert can slip past the existence checks; the unique
/// indexes on `key` and `email` still catch it.
fn map_insert_error(err: DbErr, key: &str, email: &str) -> ReferralError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            duplicate_from_violation(&detail, key, email)
        }
        _ => err.into(),
    }
}

/// Postgres names the constraints `users_key_key` and `users_email_key`
fn duplicate_from_violation(detail: &str, key: &str, email: &str) -> ReferralError {
    if detail.contains("users_email_key") {
        ReferralError::DuplicateEmail(email.to_string())
    } else {
        ReferralError::DuplicateKey(key.to_string())
    }
}
