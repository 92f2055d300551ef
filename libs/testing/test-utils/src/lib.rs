//! Shared test utilities for the referral crates
//!
//! - `TestDatabase`: PostgreSQL container with the workspace migrations applied (feature: "postgres")
//! - `TestDataBuilder`: deterministic names, emails and referral keys (always available)
//! - `assertions`: small assertion helpers (always available)
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let email = builder.email("referrer");
//!     let key = builder.key(1);
//! }
//! ```

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

/// Builder for test data with deterministic randomization
///
/// Tests sharing one database stay isolated as long as each uses its own
/// test name.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from a hash of the test name
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_register_with_referrer");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// `"{prefix}-{suffix}-{seed}"`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("{}-{}-{:x}", prefix, suffix, self.seed)
    }

    /// Unique, syntactically valid email for `label`
    pub fn email(&self, label: &str) -> String {
        format!("{}.{:x}@example.com", label, self.seed)
    }

    /// 26-character referral key, the width of a ULID
    pub fn key(&self, index: u32) -> String {
        format!("{:016X}{:010}", self.seed, index)
    }
}

/// Custom assertion helpers
pub mod assertions {
    /// Unwrap an `Option`, panicking with `context` when it is `None`
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that an `Option` is `None`, printing the value otherwise
    pub fn assert_none<T: std::fmt::Debug>(value: Option<T>, context: &str) {
        if let Some(v) = value {
            panic!("{}: expected None, got Some({:?})", context, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::from_test_name("my_test");
        let builder2 = TestDataBuilder::from_test_name("my_test");

        assert_eq!(builder1.email("ann"), builder2.email("ann"));
        assert_eq!(builder1.key(3), builder2.key(3));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.email("ann"), builder2.email("ann"));
        assert_ne!(builder1.key(1), builder2.key(1));
    }

    #[test]
    fn test_key_width() {
        let builder = TestDataBuilder::new(u64::MAX);
        assert_eq!(builder.key(u32::MAX).len(), 26);
        assert_eq!(TestDataBuilder::new(0).key(0).len(), 26);
    }
}
