//! Time handling for cached cross-sensor values
//!
//! Timestamps are milliseconds since the Unix epoch (UTC). The acquisition
//! layer parses upstream time strings; the core only compares them.
//!
//! Cached values never expire on their own. Whether an old value may still
//! feed a conversion is an explicit policy, [`Freshness`], chosen when the
//! resolver is built.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Milliseconds per second
pub const MS_PER_SECOND: u64 = 1_000;

/// Milliseconds per minute
pub const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;

/// Milliseconds per hour
pub const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Policy deciding whether a cached dependency may still be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Freshness {
    /// Any cached value is usable, however old
    #[default]
    Unbounded,

    /// Cached value must be at most `max_age_ms` older than the record
    MaxAge {
        /// Window length in milliseconds
        max_age_ms: u64,
    },
}

impl Freshness {
    /// Window of `minutes` minutes
    pub fn minutes(minutes: u64) -> Self {
        Self::MaxAge {
            max_age_ms: minutes.saturating_mul(MS_PER_MINUTE),
        }
    }

    /// Window of `hours` hours
    pub fn hours(hours: u64) -> Self {
        Self::MaxAge {
            max_age_ms: hours.saturating_mul(MS_PER_HOUR),
        }
    }

    /// Check a cached timestamp against the record time.
    ///
    /// Returns `Err(age_ms)` when the cached value is too old. Under
    /// `MaxAge` a cached value without timestamp counts as stale; a record
    /// without timestamp cannot be judged and passes.
    pub fn check(&self, cached: Option<Timestamp>, reference: Option<Timestamp>) -> Result<(), u64> {
        match *self {
            Self::Unbounded => Ok(()),
            Self::MaxAge { max_age_ms } => match (cached, reference) {
                (_, None) => Ok(()),
                (None, Some(_)) => Err(u64::MAX),
                (Some(cached), Some(reference)) => {
                    let age = age_ms(cached, reference);
                    if age > max_age_ms {
                        Err(age)
                    } else {
                        Ok(())
                    }
                }
            },
        }
    }
}

/// Age of `earlier` seen from `later`; zero if `earlier` is in the future
pub fn age_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_accepts_everything() {
        let policy = Freshness::Unbounded;
        assert!(policy.check(Some(0), Some(u64::MAX)).is_ok());
        assert!(policy.check(None, Some(1_000)).is_ok());
    }

    #[test]
    fn max_age_window_is_inclusive() {
        let policy = Freshness::minutes(10);
        let now = 100 * MS_PER_MINUTE;

        assert!(policy.check(Some(now - 10 * MS_PER_MINUTE), Some(now)).is_ok());
        assert_eq!(
            policy.check(Some(now - 10 * MS_PER_MINUTE - 1), Some(now)),
            Err(10 * MS_PER_MINUTE + 1)
        );
    }

    #[test]
    fn max_age_without_timestamps() {
        let policy = Freshness::hours(1);

        // Record without time cannot be judged
        assert!(policy.check(Some(0), None).is_ok());

        // Cached value without time is treated as stale
        assert!(policy.check(None, Some(5_000)).is_err());
    }

    #[test]
    fn huge_windows_saturate() {
        assert_eq!(Freshness::minutes(u64::MAX), Freshness::MaxAge { max_age_ms: u64::MAX });
        assert_eq!(Freshness::hours(u64::MAX / 2), Freshness::MaxAge { max_age_ms: u64::MAX });
        assert!(Freshness::hours(u64::MAX).check(Some(0), Some(u64::MAX)).is_ok());
    }

    #[test]
    fn future_cached_value_has_zero_age() {
        assert_eq!(age_ms(2_000, 1_000), 0);
        assert!(Freshness::MaxAge { max_age_ms: 0 }.check(Some(2_000), Some(1_000)).is_ok());
    }
}
