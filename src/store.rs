//! File-backed persistence for daily quota records.
//!
//! Plays the role of the browser's local storage and preserves its on-disk
//! contract exactly:
//! - key: `viewed_contacts_{userId}_{day}`
//! - value: JSON `{ "contacts": [id, ...], "date": day }`
//!
//! Each key is one JSON file under `~/.contact-quota/quota/`; the user
//! component of the filename is percent-encoded so an opaque id (path
//! separators included) still maps to exactly one flat file. Reads fail
//! open (missing, unreadable, or malformed payloads yield an empty record);
//! writes are best-effort and hold an advisory lock so a concurrent reader
//! or writer never sees a torn record file. The lock does not serialize
//! whole read-modify-write cycles across processes; sequencing of decisions
//! is the caller's responsibility.

use crate::paths;
use crate::quota::{DayKey, QuotaRecord};
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

const KEY_PREFIX: &str = "viewed_contacts_";

/// The persisted payload for one (user, day) pair.
///
/// Field names are the on-disk contract; do not rename.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    contacts: Vec<String>,
    date: String,
}

/// Escapes a key component into a safe filename fragment.
///
/// User ids are opaque strings; every byte outside `[A-Za-z0-9_-]` is
/// percent-encoded, so ids containing path separators or `..` cannot escape
/// the store root and distinct ids never collide. Typical provider ids pass
/// through unchanged.
fn encode_component(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => {
                encoded.push(char::from(byte));
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// File-backed key-value store for quota records.
pub struct QuotaStore {
    root: PathBuf,
}

impl QuotaStore {
    /// Opens the store rooted at `~/.contact-quota/quota/`.
    pub fn open() -> Result<Self> {
        Ok(Self {
            root: paths::quota_records_dir()?,
        })
    }

    fn record_path(&self, user_id: &str, day: &DayKey) -> PathBuf {
        self.root.join(format!(
            "{}{}_{}.json",
            KEY_PREFIX,
            encode_component(user_id),
            day.as_str()
        ))
    }

    /// Loads the record for a (user, day) pair, failing open.
    ///
    /// A missing file, an unreadable file, a malformed payload, or a payload
    /// whose `date` disagrees with the requested day all yield an empty
    /// record for that day. Corruption must never block the caller.
    pub fn load(&self, user_id: &str, day: &DayKey) -> QuotaRecord {
        let path = self.record_path(user_id, day);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return QuotaRecord::empty(day.clone());
            }
            Err(e) => {
                tracing::warn!("Failed to read quota record {}: {}", path.display(), e);
                return QuotaRecord::empty(day.clone());
            }
        };

        match serde_json::from_str::<StoredRecord>(&content) {
            Ok(stored) if stored.date == day.as_str() => {
                QuotaRecord::from_viewed(day.clone(), stored.contacts)
            }
            Ok(stored) => {
                tracing::warn!(
                    "Quota record {} carries date {} but was loaded for {}; starting empty",
                    path.display(),
                    stored.date,
                    day
                );
                QuotaRecord::empty(day.clone())
            }
            Err(e) => {
                tracing::warn!("Malformed quota record {}: {}", path.display(), e);
                QuotaRecord::empty(day.clone())
            }
        }
    }

    /// Writes the record for a user, keyed by the record's own day.
    ///
    /// The caller decides how to treat failure; the tracker logs and
    /// continues with its in-memory state. The advisory lock keeps the
    /// file from being torn by an overlapping writer; it does not make
    /// separate load-then-save cycles atomic.
    pub fn save(&self, user_id: &str, record: &QuotaRecord) -> Result<()> {
        let path = self.record_path(user_id, record.day());
        let stored = StoredRecord {
            contacts: record.viewed().iter().cloned().collect(),
            date: record.day().as_str().to_string(),
        };
        let content = serde_json::to_string(&stored).context("Failed to serialize quota record")?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open quota record: {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock quota record: {}", path.display()))?;
        // Truncate only after the lock is held, so a concurrent reader never
        // observes a half-written file.
        file.set_len(0)
            .with_context(|| format!("Failed to truncate quota record: {}", path.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write quota record: {}", path.display()))?;
        file.flush()
            .with_context(|| format!("Failed to flush quota record: {}", path.display()))?;
        Ok(())
    }

    /// Deletes persisted records for days other than `today`.
    ///
    /// Stale prior-day entries are harmless (the live key never reads them)
    /// and nothing prunes them implicitly; this is an explicit maintenance
    /// operation. Returns the number of files removed.
    pub fn prune(&self, today: &DayKey) -> Result<usize> {
        let keep_suffix = format!("_{}.json", today.as_str());
        let mut removed = 0;

        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list quota records: {}", self.root.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(KEY_PREFIX) || name.ends_with(&keep_suffix) {
                continue;
            }
            fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove stale quota record: {}", name))?;
            removed += 1;
        }

        Ok(removed)
    }
}
