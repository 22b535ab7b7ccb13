//! The stateful quota tracker consumed by the contact browser.
//!
//! Combines the pure transitions in `quota` with the persistence in `store`
//! behind the contract the UI relies on: load once per (user, day), decide
//! each view attempt synchronously, persist write-behind. No failure mode
//! crosses this boundary - storage faults degrade to in-memory truth, and a
//! missing identity disables enforcement entirely rather than sharing an
//! anonymous bucket.

use crate::event_log::EventLog;
use crate::quota::{Admission, DailyLimit, DayKey, QuotaRecord};
use crate::store::QuotaStore;
use chrono::{DateTime, Local};

/// The signed-in principal, as reported by the auth collaborator.
///
/// An empty or absent user id is `Anonymous`: the source embedded a
/// possibly-undefined identity straight into the storage key, which would
/// collide unauthenticated sessions into one bucket. The safe default is to
/// not enforce (and not persist) anything without a real identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(String),
    Anonymous,
}

impl Identity {
    /// Builds an identity from an optional raw user id.
    ///
    /// Empty and whitespace-only ids degrade to `Anonymous`.
    pub fn from_user_id(user_id: Option<&str>) -> Self {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Identity::User(id.to_string()),
            _ => Identity::Anonymous,
        }
    }
}

/// The tracker's answer to one view attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOutcome {
    /// Whether the detail view may open.
    pub allowed: bool,
    /// Whether this id counted against the limit just now.
    pub first_view: bool,
    /// Views left today, or `None` when enforcement is disabled.
    pub remaining: Option<u32>,
}

/// Per-(user, day) quota tracker.
///
/// Holds the authoritative in-memory record for the current session. Once
/// loaded, admission decisions come from memory alone; persistence is only
/// for durability across restarts within the same day.
pub struct QuotaTracker {
    identity: Identity,
    limit: DailyLimit,
    record: QuotaRecord,
    store: Option<QuotaStore>,
    event_log: Option<EventLog>,
}

impl QuotaTracker {
    /// Loads the tracker for `identity` at wall-clock time `now`.
    ///
    /// The timestamp is used only to derive the local calendar-day key.
    /// Every read path fails open: an unopenable store or a corrupt record
    /// starts the day empty rather than erroring, and an unopenable event
    /// log just disables decision logging.
    pub fn load(identity: Identity, limit: DailyLimit, now: DateTime<Local>) -> Self {
        let day = DayKey::from_datetime(&now);

        let (store, record) = match &identity {
            Identity::Anonymous => (None, QuotaRecord::empty(day)),
            Identity::User(user_id) => match QuotaStore::open() {
                Ok(store) => {
                    let record = store.load(user_id, &day);
                    (Some(store), record)
                }
                Err(e) => {
                    tracing::warn!("Quota store unavailable, continuing in memory: {:#}", e);
                    (None, QuotaRecord::empty(day))
                }
            },
        };

        let event_log = match EventLog::open() {
            Ok(log) => Some(log),
            Err(e) => {
                tracing::warn!("Decision log unavailable: {:#}", e);
                None
            }
        };

        Self {
            identity,
            limit,
            record,
            store,
            event_log,
        }
    }

    /// Decides whether the detail view for `record_id` may open.
    ///
    /// The check-and-insert completes on the in-memory record before the
    /// write-behind persist is attempted, so the decision is never blocked
    /// on (or changed by) storage latency or storage faults.
    pub fn attempt_view(&mut self, record_id: &str) -> ViewOutcome {
        let user_id = match &self.identity {
            Identity::Anonymous => {
                return ViewOutcome {
                    allowed: true,
                    first_view: false,
                    remaining: None,
                };
            }
            Identity::User(user_id) => user_id.clone(),
        };

        let admission = self.record.attempt_view(record_id, self.limit);
        let remaining = self.record.remaining(self.limit);

        if admission == Admission::AllowedNew {
            self.persist();
        }

        if let Some(log) = &self.event_log {
            log.log_decision(&user_id, record_id, admission.allowed(), remaining);
        }

        ViewOutcome {
            allowed: admission.allowed(),
            first_view: admission == Admission::AllowedNew,
            remaining: Some(remaining),
        }
    }

    /// Writes the current record through to storage, best-effort.
    ///
    /// A failed write is logged and otherwise ignored: the in-memory count
    /// stays correct for this session, only durability is lost.
    pub fn persist(&self) {
        let (Identity::User(user_id), Some(store)) = (&self.identity, &self.store) else {
            return;
        };
        if let Err(e) = store.save(user_id, &self.record) {
            tracing::warn!("Failed to persist quota record: {:#}", e);
            if let Some(log) = &self.event_log {
                log.log_store_fault(user_id, &format!("{:#}", e));
            }
        }
    }

    /// Views left today, or `None` when enforcement is disabled.
    pub fn remaining(&self) -> Option<u32> {
        match self.identity {
            Identity::Anonymous => None,
            Identity::User(_) => Some(self.record.remaining(self.limit)),
        }
    }

    /// Whether no further new ids will be admitted today.
    pub fn limit_reached(&self) -> bool {
        match self.identity {
            Identity::Anonymous => false,
            Identity::User(_) => self.record.limit_reached(self.limit),
        }
    }

    /// The distinct ids viewed today, in sorted order.
    pub fn viewed_today(&self) -> impl Iterator<Item = &str> {
        self.record.viewed().iter().map(String::as_str)
    }

    /// Number of distinct ids viewed today.
    pub fn viewed_count(&self) -> u32 {
        self.record.viewed_count()
    }

    /// The configured daily limit.
    pub fn limit(&self) -> DailyLimit {
        self.limit
    }
}

#[cfg(test)]
#[path = "tests/tracker_tests.rs"]
mod tests;
