use sea_orm_migration::prelude::*;

use crate::m20250805_000000_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Direct referrals by registration time, for the active-referrals count
        manager
            .create_index(
                Index::create()
                    .name("idx_users_referrer_id_created_at")
                    .table(Users::Table)
                    .col(Users::ReferrerId)
                    .col(Users::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                ALTER TABLE users
                    ADD CONSTRAINT chk_users_no_self_referral
                    CHECK (referrer_id IS NULL OR referrer_id <> id)
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE users DROP CONSTRAINT IF EXISTS chk_users_no_self_referral",
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_users_referrer_id_created_at")
                    .table(Users::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
