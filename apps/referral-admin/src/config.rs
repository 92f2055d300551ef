//! Configuration for the referral admin CLI

use core_config::{ConfigError, FromEnv, ReferralConfig};
use database::postgres::PostgresConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: PostgresConfig,
    pub referral: ReferralConfig,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database: PostgresConfig::from_env()?,
            referral: ReferralConfig::from_env()?,
        })
    }
}
