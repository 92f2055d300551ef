use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use validator::{Validate, ValidationError};

/// Internal, auto-assigned user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Ids handed out by the directory start at 1
    pub fn is_assigned(self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Public, shareable referral code. Never interchangeable with [`UserId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralKey(String);

impl ReferralKey {
    /// Width of the stored key column, the length of a ULID
    pub const MAX_LEN: usize = 26;

    /// Keys match exactly; empty input yields `None`
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    /// Wrap a key read back from storage as-is
    pub(crate) fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    /// Fresh ULID-based key
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ReferralKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user as seen by the referral forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub key: ReferralKey,
    pub name: String,
    pub email: String,
    /// Parent in the referral forest; written once at creation
    pub referrer_id: Option<UserId>,
    pub ban: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Banned or deactivated users cannot refer anyone
    pub fn can_refer(&self) -> bool {
        !self.ban && self.is_active
    }
}

/// Input for creating a user in the directory
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    /// Generated when absent
    #[serde(default)]
    #[validate(custom(function = "validate_referral_key"))]
    pub key: Option<ReferralKey>,
    #[serde(default)]
    pub referrer_id: Option<UserId>,
    #[serde(default)]
    pub ban: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Backdated registration for imports; `now` when absent
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

fn validate_referral_key(key: &ReferralKey) -> Result<(), ValidationError> {
    if key.as_str().chars().count() > ReferralKey::MAX_LEN {
        let mut err = ValidationError::new("length");
        err.message = Some(format!("must be at most {} characters", ReferralKey::MAX_LEN).into());
        return Err(err);
    }
    Ok(())
}

impl CreateUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            key: None,
            referrer_id: None,
            ban: false,
            is_active: true,
            created_at: None,
        }
    }

    pub fn with_key(mut self, key: ReferralKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_referrer(mut self, referrer_id: Option<UserId>) -> Self {
        self.referrer_id = referrer_id;
        self
    }

    pub fn banned(mut self) -> Self {
        self.ban = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Referral summary for a single referrer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferralStats {
    pub referrer_id: UserId,
    pub total_referrals: usize,
    /// Referrals still inside the program window
    pub active_referrals: u64,
}
