//! Time handling for the forecast backend.
//!
//! All model data is indexed by UTC epoch seconds. Queries and storage operate
//! on [`TimerangeDt`]: a half-open, step-aligned range `[start, end)` with a
//! fixed step width in seconds.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A UTC instant as epoch seconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn new(epoch_seconds: i64) -> Self {
        Self(epoch_seconds)
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    /// Convert back to a chrono datetime.
    pub fn datetime(self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.0, 0).single().unwrap_or_default()
    }

    /// Round down to the nearest multiple of `dt_seconds`.
    ///
    /// Uses euclidean division so pre-epoch timestamps round towards the past.
    pub fn floor(self, dt_seconds: i64) -> Self {
        Self(self.0.div_euclid(dt_seconds) * dt_seconds)
    }

    /// Round up to the nearest multiple of `dt_seconds`.
    pub fn ceil(self, dt_seconds: i64) -> Self {
        Self(-(-self.0).div_euclid(dt_seconds) * dt_seconds)
    }

    pub fn add(self, seconds: i64) -> Self {
        Self(self.0 + seconds)
    }

    /// UTC calendar year containing this instant.
    pub fn year(self) -> i32 {
        self.datetime().year()
    }

    /// Whether this timestamp is a multiple of `dt_seconds`.
    pub fn is_aligned(self, dt_seconds: i64) -> bool {
        self.0.rem_euclid(dt_seconds) == 0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.datetime().format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeError {
    #[error("time step must be positive, got {0}")]
    NonPositiveStep(i64),

    #[error("range end {end} precedes start {start}")]
    EndBeforeStart { start: Timestamp, end: Timestamp },

    #[error("timestamp {0} is not aligned to a {1}s step")]
    Misaligned(Timestamp, i64),
}

/// A half-open, step-aligned time range `[start, end)` with step `dt_seconds`.
///
/// The reader and mixer only ever operate on aligned ranges; the constructor
/// enforces alignment so downstream code can index by step without checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerangeDt {
    pub start: Timestamp,
    pub end: Timestamp,
    pub dt_seconds: i64,
}

impl TimerangeDt {
    pub fn new(start: Timestamp, end: Timestamp, dt_seconds: i64) -> Result<Self, TimeError> {
        if dt_seconds <= 0 {
            return Err(TimeError::NonPositiveStep(dt_seconds));
        }
        if end < start {
            return Err(TimeError::EndBeforeStart { start, end });
        }
        if !start.is_aligned(dt_seconds) {
            return Err(TimeError::Misaligned(start, dt_seconds));
        }
        if !end.is_aligned(dt_seconds) {
            return Err(TimeError::Misaligned(end, dt_seconds));
        }
        Ok(Self {
            start,
            end,
            dt_seconds,
        })
    }

    /// Number of timesteps in the range.
    pub fn count(&self) -> usize {
        ((self.end.0 - self.start.0) / self.dt_seconds) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Iterate the step instants in order.
    pub fn iter(&self) -> impl Iterator<Item = Timestamp> + '_ {
        let dt = self.dt_seconds;
        let start = self.start.0;
        (0..self.count() as i64).map(move |i| Timestamp(start + i * dt))
    }

    /// Step index of `t` within the range, if it lies on a step.
    pub fn index_of(&self, t: Timestamp) -> Option<usize> {
        if t < self.start || t >= self.end {
            return None;
        }
        let off = t.0 - self.start.0;
        (off % self.dt_seconds == 0).then(|| (off / self.dt_seconds) as usize)
    }

    /// The same instants re-expressed at a coarser or finer step.
    ///
    /// Start rounds down and end rounds up so the result covers the original.
    pub fn with_dt(&self, dt_seconds: i64) -> Result<Self, TimeError> {
        Self::new(
            self.start.floor(dt_seconds),
            self.end.ceil(dt_seconds),
            dt_seconds,
        )
    }

    /// Widen by `steps` on each side, keeping the step width.
    pub fn widened(&self, steps: usize) -> Self {
        let pad = steps as i64 * self.dt_seconds;
        Self {
            start: Timestamp(self.start.0 - pad),
            end: Timestamp(self.end.0 + pad),
            dt_seconds: self.dt_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_ceil_alignment() {
        let t = Timestamp(3601);
        assert_eq!(t.floor(3600), Timestamp(3600));
        assert_eq!(t.ceil(3600), Timestamp(7200));
        assert_eq!(Timestamp(3600).floor(3600), Timestamp(3600));
        assert_eq!(Timestamp(3600).ceil(3600), Timestamp(3600));
        // Pre-epoch rounds towards the past
        assert_eq!(Timestamp(-1).floor(3600), Timestamp(-3600));
    }

    #[test]
    fn test_range_count_and_iter() {
        let range = TimerangeDt::new(Timestamp(0), Timestamp(10 * 3600), 3600).unwrap();
        assert_eq!(range.count(), 10);
        let steps: Vec<_> = range.iter().collect();
        assert_eq!(steps[0], Timestamp(0));
        assert_eq!(steps[9], Timestamp(9 * 3600));
    }

    #[test]
    fn test_range_rejects_misaligned() {
        assert!(TimerangeDt::new(Timestamp(1800), Timestamp(7200), 3600).is_err());
        assert!(TimerangeDt::new(Timestamp(0), Timestamp(5000), 3600).is_err());
        assert!(TimerangeDt::new(Timestamp(0), Timestamp(0), 0).is_err());
    }

    #[test]
    fn test_index_of() {
        let range = TimerangeDt::new(Timestamp(7200), Timestamp(7200 + 5 * 3600), 3600).unwrap();
        assert_eq!(range.index_of(Timestamp(7200)), Some(0));
        assert_eq!(range.index_of(Timestamp(7200 + 4 * 3600)), Some(4));
        assert_eq!(range.index_of(Timestamp(7200 + 5 * 3600)), None);
        assert_eq!(range.index_of(Timestamp(0)), None);
    }

    #[test]
    fn test_with_dt_covers_original() {
        let range = TimerangeDt::new(Timestamp(3600), Timestamp(7200), 3600).unwrap();
        let coarse = range.with_dt(10800).unwrap();
        assert!(coarse.start <= range.start);
        assert!(coarse.end >= range.end);
        assert_eq!(coarse.start, Timestamp(0));
        assert_eq!(coarse.end, Timestamp(10800));
    }

    #[test]
    fn test_widened() {
        let range = TimerangeDt::new(Timestamp(7200), Timestamp(10800), 3600).unwrap();
        let wide = range.widened(2);
        assert_eq!(wide.start, Timestamp(0));
        assert_eq!(wide.end, Timestamp(18000));
        assert_eq!(wide.count(), 5);
    }

    #[test]
    fn test_timestamp_year() {
        // 2021-01-01T00:00:00Z
        assert_eq!(Timestamp(1609459200).year(), 2021);
        assert_eq!(Timestamp(1609459199).year(), 2020);
    }
}
