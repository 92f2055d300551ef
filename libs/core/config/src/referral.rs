use crate::{env_parse, ConfigError, FromEnv};

/// Referral program settings
///
/// - `REFERRAL_PROGRAM_YEARS`: how long a referral earns benefits (default: 2)
/// - `REFERRAL_MAX_CHAIN_DEPTH`: hop limit for the referrer chain walk (default: 10)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralConfig {
    pub program_years: u32,
    pub max_chain_depth: usize,
}

impl ReferralConfig {
    pub const DEFAULT_PROGRAM_YEARS: u32 = 2;
    pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 10;

    pub fn new(program_years: u32, max_chain_depth: usize) -> Self {
        Self {
            program_years,
            max_chain_depth,
        }
    }
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM_YEARS, Self::DEFAULT_MAX_CHAIN_DEPTH)
    }
}

impl FromEnv for ReferralConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let program_years = env_parse("REFERRAL_PROGRAM_YEARS", Self::DEFAULT_PROGRAM_YEARS)?;
        if program_years == 0 {
            return Err(ConfigError::ParseError {
                key: "REFERRAL_PROGRAM_YEARS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        let max_chain_depth =
            env_parse("REFERRAL_MAX_CHAIN_DEPTH", Self::DEFAULT_MAX_CHAIN_DEPTH)?;
        if max_chain_depth == 0 {
            return Err(ConfigError::ParseError {
                key: "REFERRAL_MAX_CHAIN_DEPTH".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            program_years,
            max_chain_depth,
        })
    }
}
