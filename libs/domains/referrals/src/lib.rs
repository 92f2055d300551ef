//! Referrals Domain
//!
//! Keeps the referral forest acyclic and answers read-side questions about it.
//! Every user points to at most one referrer; the service validates a
//! prospective referrer before a user is created and refuses links that would
//! close a loop, refer to oneself, or come from a banned or inactive account.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  ReferralService │  ← referrer validation, cycle detection, program window
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │  UserDirectory   │  ← lookup by key / id, create (trait + implementations)
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │      Models      │  ← UserId, ReferralKey, User, CreateUser
//! └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_referrals::{CreateUser, InMemoryUserDirectory, ReferralService};
//!
//! # async fn example() -> domain_referrals::ReferralResult<()> {
//! let service = ReferralService::new(InMemoryUserDirectory::new());
//!
//! let referrer = service
//!     .register_user(CreateUser::new("Ann", "ann@example.com"), None)
//!     .await?;
//! let referral = service
//!     .register_user(
//!         CreateUser::new("Bob", "bob@example.com"),
//!         Some(referrer.key.as_str()),
//!     )
//!     .await?;
//!
//! assert_eq!(referral.referrer_id, Some(referrer.id));
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod program;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use chain::ChainWalk;
pub use error::{ReferralError, ReferralResult};
pub use models::{CreateUser, ReferralKey, ReferralStats, User, UserId};
pub use postgres::PgUserDirectory;
pub use program::{MAX_CHAIN_DEPTH, REFERRAL_PROGRAM_YEARS, ReferralPolicy};
pub use repository::{InMemoryUserDirectory, UserDirectory};
pub use service::ReferralService;
