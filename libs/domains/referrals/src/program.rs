//! Referral program window and traversal limits.
//!
//! A referral earns benefits for [`REFERRAL_PROGRAM_YEARS`] calendar years
//! after its registration. The window is half-open: a referral registered at
//! `t` is inside the program for `now` in `[t, t + years)`.

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use core_config::ReferralConfig;

/// Length of the program window in calendar years
pub const REFERRAL_PROGRAM_YEARS: u32 = 2;

/// Hop limit for the referrer chain walk in cycle detection
pub const MAX_CHAIN_DEPTH: usize = 10;

/// Tunables for [`crate::ReferralService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralPolicy {
    pub program_years: u32,
    pub max_chain_depth: usize,
}

impl Default for ReferralPolicy {
    fn default() -> Self {
        Self {
            program_years: REFERRAL_PROGRAM_YEARS,
            max_chain_depth: MAX_CHAIN_DEPTH,
        }
    }
}

impl From<ReferralConfig> for ReferralPolicy {
    fn from(config: ReferralConfig) -> Self {
        Self {
            program_years: config.program_years,
            max_chain_depth: config.max_chain_depth,
        }
    }
}

/// Shift `at` by whole calendar years.
///
/// Feb 29 in a target year without one rolls over to Mar 1.
fn shift_years(at: DateTime<Utc>, years: i32) -> Option<DateTime<Utc>> {
    let year = at.year().checked_add(years)?;
    at.with_year(year).or_else(|| {
        at.checked_add_signed(TimeDelta::days(1))?
            .with_year(year)
    })
}

fn signed_years(program_years: u32) -> i32 {
    i32::try_from(program_years).unwrap_or(i32::MAX)
}

/// End of the program window for a referral registered at `created_at`.
///
/// Saturates at the chrono maximum.
pub fn program_expires_at(created_at: DateTime<Utc>, program_years: u32) -> DateTime<Utc> {
    shift_years(created_at, signed_years(program_years)).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Earliest registration time still inside the window at `now`
pub fn program_cutoff(now: DateTime<Utc>, program_years: u32) -> DateTime<Utc> {
    shift_years(now, -signed_years(program_years)).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Strict comparison: exactly at expiry counts as expired
pub fn is_within_program(created_at: DateTime<Utc>, now: DateTime<Utc>, program_years: u32) -> bool {
    now < program_expires_at(created_at, program_years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_expiry_is_two_calendar_years_later() {
        assert_eq!(program_expires_at(at(2024, 3, 15), 2), at(2026, 3, 15));
    }

    #[test]
    fn test_leap_day_rolls_over_to_march() {
        assert_eq!(program_expires_at(at(2024, 2, 29), 2), at(2026, 3, 1));
        assert_eq!(program_expires_at(at(2024, 2, 29), 4), at(2028, 2, 29));
        assert!(is_within_program(
            at(2024, 2, 29),
            at(2026, 2, 28) + Duration::hours(6),
            2
        ));
    }

    #[test]
    fn test_cutoff_from_leap_day_rolls_over_to_march() {
        assert_eq!(program_cutoff(at(2028, 2, 29), 2), at(2026, 3, 1));
        assert_eq!(program_cutoff(at(2028, 2, 29), 4), at(2024, 2, 29));
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let created = at(2024, 3, 15);
        let expiry = at(2026, 3, 15);

        assert!(is_within_program(created, expiry - Duration::seconds(1), 2));
        assert!(!is_within_program(created, expiry, 2));
        assert!(!is_within_program(created, expiry + Duration::days(1), 2));
    }

    #[test]
    fn test_cutoff_mirrors_expiry() {
        let now = at(2026, 10, 16);
        let cutoff = program_cutoff(now, 2);
        assert_eq!(cutoff, at(2024, 10, 16));
        assert_eq!(program_expires_at(cutoff, 2), now);
    }

    #[test]
    fn test_default_policy_matches_config_defaults() {
        let from_config: ReferralPolicy = ReferralConfig::default().into();
        assert_eq!(from_config, ReferralPolicy::default());
    }
}
