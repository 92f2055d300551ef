use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

use crate::models::{CreateUser, ReferralKey, User, UserId};

/// Sea-ORM Entity for the users table
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub key: String,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub referrer_id: Option<i64>,
    pub ban: bool,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: UserId(model.id),
            key: ReferralKey::from_stored(model.key),
            name: model.name,
            email: model.email,
            referrer_id: model.referrer_id.map(UserId),
            ban: model.ban,
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<CreateUser> for ActiveModel {
    fn from(input: CreateUser) -> Self {
        let now = chrono::Utc::now();

        ActiveModel {
            id: NotSet,
            key: Set(input.key.unwrap_or_else(ReferralKey::generate).into_inner()),
            name: Set(input.name),
            email: Set(input.email),
            referrer_id: Set(input.referrer_id.map(UserId::get)),
            ban: Set(input.ban),
            is_active: Set(input.is_active),
            created_at: Set(input.created_at.unwrap_or(now).into()),
            updated_at: Set(now.into()),
        }
    }
}
