//! Core types and state transitions for the daily view quota.
//!
//! This module is pure: it defines the per-day record of viewed contact ids
//! and the admission transition against a configured daily limit. All I/O
//! (loading and persisting records) lives in `store`; the stateful facade
//! that wires the two together lives in `tracker`.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default daily limit when no valid limit is configured.
pub const DEFAULT_DAILY_LIMIT: u32 = 50;

/// A canonical calendar-day key in the viewer's local timezone.
///
/// Always encoded as ISO `YYYY-MM-DD`, independent of locale display
/// formatting, so the same wall-clock day produces the same storage key
/// across reloads and locale configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayKey(String);

impl DayKey {
    /// Returns the day key for the current local wall-clock time.
    pub fn today() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// Derives the day key from an arbitrary timestamp.
    ///
    /// The calendar date is taken in the timestamp's own timezone, so tests
    /// can pin a zone and callers can pass `Local::now()` directly.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self(dt.format("%Y-%m-%d").to_string())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated daily view limit.
///
/// The configured value is external input (config file, environment, CLI
/// flag); non-positive values clamp to [`DEFAULT_DAILY_LIMIT`] rather than
/// erroring, and oversized values saturate to `u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyLimit(u32);

impl DailyLimit {
    /// Creates a limit from a raw configured value.
    ///
    /// Non-positive input clamps to the default; values beyond `u32::MAX`
    /// saturate rather than becoming more restrictive than configured.
    pub fn new(raw: i64) -> Self {
        if raw >= 1 {
            Self(u32::try_from(raw).unwrap_or(u32::MAX))
        } else {
            tracing::warn!(
                "Invalid daily limit {}, falling back to default {}",
                raw,
                DEFAULT_DAILY_LIMIT
            );
            Self(DEFAULT_DAILY_LIMIT)
        }
    }

    /// Returns the limit as an integer.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for DailyLimit {
    fn default() -> Self {
        Self(DEFAULT_DAILY_LIMIT)
    }
}

/// The outcome of a single view attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A not-yet-seen id was admitted and now counts against the limit.
    AllowedNew,
    /// The id was already viewed today; replay never counts or blocks.
    AllowedReplay,
    /// A not-yet-seen id was refused because the limit is reached.
    Denied,
}

impl Admission {
    /// Whether the view may proceed.
    pub fn allowed(&self) -> bool {
        !matches!(self, Admission::Denied)
    }
}

/// The set of distinct contact ids viewed on one calendar day.
///
/// Within a day the set only grows; a new day starts from an entirely fresh
/// record rather than mutating the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRecord {
    day: DayKey,
    viewed: BTreeSet<String>,
}

impl QuotaRecord {
    /// Creates an empty record for the given day.
    pub fn empty(day: DayKey) -> Self {
        Self {
            day,
            viewed: BTreeSet::new(),
        }
    }

    /// Creates a record from previously persisted ids.
    pub fn from_viewed(day: DayKey, viewed: impl IntoIterator<Item = String>) -> Self {
        Self {
            day,
            viewed: viewed.into_iter().collect(),
        }
    }

    /// The day this record partitions.
    pub fn day(&self) -> &DayKey {
        &self.day
    }

    /// The distinct ids viewed so far today.
    pub fn viewed(&self) -> &BTreeSet<String> {
        &self.viewed
    }

    /// Number of distinct ids viewed so far today.
    pub fn viewed_count(&self) -> u32 {
        u32::try_from(self.viewed.len()).unwrap_or(u32::MAX)
    }

    /// Decides whether `record_id` may be opened, admitting it if so.
    ///
    /// This is the single check-and-insert transition: the membership test,
    /// the limit comparison, and the insert happen with no intervening
    /// observation point, so two rapid attempts cannot both pass the limit
    /// check. A denied attempt leaves the record untouched.
    pub fn attempt_view(&mut self, record_id: &str, limit: DailyLimit) -> Admission {
        if self.viewed.contains(record_id) {
            return Admission::AllowedReplay;
        }
        if self.viewed_count() >= limit.get() {
            return Admission::Denied;
        }
        self.viewed.insert(record_id.to_string());
        Admission::AllowedNew
    }

    /// Views still available today: `limit - |viewed|`, floored at 0.
    pub fn remaining(&self, limit: DailyLimit) -> u32 {
        limit.get().saturating_sub(self.viewed_count())
    }

    /// Whether no further new ids will be admitted today.
    pub fn limit_reached(&self, limit: DailyLimit) -> bool {
        self.viewed_count() >= limit.get()
    }
}

#[cfg(test)]
#[path = "tests/quota_proptests.rs"]
mod proptests;
