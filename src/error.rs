//! Error types returned by the cache.
//!
//! Lookups never fail: a missing key is `None`. The only fallible operations
//! are construction, which validates the capacity, and
//! [`LfuCache::check_invariants`](crate::LfuCache::check_invariants).

use thiserror::Error;

/// Returned when a cache is constructed with an unusable capacity.
///
/// ```
/// # use bucket_lfu::{ConfigError, LfuCache};
/// let err = LfuCache::<&str, i32>::new(0).unwrap_err();
/// assert_eq!(err, ConfigError::ZeroCapacity);
///
/// let err = LfuCache::<&str, i32>::new(-3).unwrap_err();
/// assert_eq!(err, ConfigError::InvalidCapacity);
/// ```
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The capacity was zero. A cache that can hold nothing is rejected up
    /// front instead of silently dropping every insertion.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,
    /// The capacity was negative or does not fit in a `usize`.
    #[error("capacity must be a positive integer that fits in usize")]
    InvalidCapacity,
}

/// Returned by [`LfuCache::check_invariants`](crate::LfuCache::check_invariants)
/// when the bucket chain, a recency chain, or the lookup table disagree with
/// each other. Carries a description of the first violation found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the description of the violated invariant.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, InvariantError};

    #[test]
    fn config_display() {
        assert_eq!(
            ConfigError::ZeroCapacity.to_string(),
            "capacity must be greater than zero"
        );
        assert!(ConfigError::InvalidCapacity.to_string().contains("positive"));
    }

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("bucket chain is not ascending");
        assert_eq!(err.to_string(), "bucket chain is not ascending");
        assert_eq!(err.message(), "bucket chain is not ascending");
    }

    #[test]
    fn errors_implement_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<ConfigError>();
        assert_error::<InvariantError>();
    }
}
