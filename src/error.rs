//! Error types for the batchcache library.
//!
//! Ranking operations themselves never fail: an empty batch is a no-op and
//! asking for more candidates than are tracked simply returns fewer. The
//! errors here cover the two places where something can be wrong.
//!
//! ## Key Components
//!
//! - [`InvariantError`]: Returned by `check_invariants` methods when an
//!   internal recency list or frequency bucket table is inconsistent.
//! - [`ConfigError`]: Returned when a policy cannot be built from the given
//!   configuration (e.g. an unknown policy name).
//!
//! ## Example Usage
//!
//! ```
//! use batchcache::builder::CachePolicy;
//! use batchcache::error::ConfigError;
//!
//! let policy: Result<CachePolicy, ConfigError> = "lfu".parse();
//! assert_eq!(policy, Ok(CachePolicy::Lfu));
//!
//! let bad: Result<CachePolicy, ConfigError> = "arc".parse();
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal ranking invariants are violated.
///
/// Produced by `check_invariants` on [`LruCore`](crate::policy::lru::LruCore),
/// [`LfuCore`](crate::policy::lfu::LfuCore) and the underlying data structures.
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when a ranking policy cannot be configured.
///
/// Produced by [`CachePolicy::from_str`](crate::builder::CachePolicy) and
/// [`BatchCacheBuilder::try_build_named`](crate::builder::BatchCacheBuilder::try_build_named).
///
/// # Example
///
/// ```
/// use batchcache::builder::BatchCacheBuilder;
///
/// let err = BatchCacheBuilder::new()
///     .try_build_named::<u64>("clock")
///     .err()
///     .unwrap();
/// assert!(err.to_string().contains("clock"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
