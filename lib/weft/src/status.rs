//! Status sets.

use std::ops::RangeInclusive;

/// Set of HTTP statuses, stored as inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    ranges: Vec<RangeInclusive<u16>>,
}

impl Default for StatusPolicy {
    /// Every 5xx status.
    fn default() -> Self {
        Self::server_errors()
    }
}

impl StatusPolicy {
    /// Policy matching no status.
    #[must_use]
    pub const fn none() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Policy matching `500..=599`.
    #[must_use]
    pub fn server_errors() -> Self {
        Self {
            ranges: vec![500..=599],
        }
    }

    /// Also match a single status, e.g. `429`.
    #[must_use]
    pub fn with_status(self, status: u16) -> Self {
        self.with_range(status..=status)
    }

    /// Also match a range of statuses.
    #[must_use]
    pub fn with_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.ranges.push(range);
        self
    }

    /// Returns `true` if `status` is in the set.
    #[must_use]
    pub fn contains(&self, status: u16) -> bool {
        self.ranges.iter().any(|range| range.contains(&status))
    }

    /// Policy matching `200..=299`.
    #[must_use]
    pub fn success() -> Self {
        Self {
            ranges: vec![200..=299],
        }
    }
}
