use thiserror::Error;

use crate::models::UserId;

/// Failures of the referral domain.
///
/// Rejected referrers are not errors: they surface as `Ok(None)` from
/// `ReferralService::validate_referrer`. Only directory failures and invalid
/// writes end up here.
#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("User not found: {0}")]
    NotFound(UserId),

    #[error("User with key '{0}' already exists")]
    DuplicateKey(String),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type ReferralResult<T> = Result<T, ReferralError>;

impl From<sea_orm::DbErr> for ReferralError {
    fn from(err: sea_orm::DbErr) -> Self {
        ReferralError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ReferralError {
    fn from(err: validator::ValidationErrors) -> Self {
        ReferralError::Validation(err.to_string())
    }
}
