//! Centralized home-based storage paths for all contact-quota persistence.
//!
//! This module provides helpers for unified storage under `~/.contact-quota/`:
//! - `quota/` - One JSON file per (user, day) quota record
//! - `logs/events.jsonl` - Structured decision log
//! - `config.yaml` - Optional configuration file

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

/// The name of the contact-quota directory.
const CONTACT_QUOTA_DIR: &str = ".contact-quota";

thread_local! {
    static TEST_HOME: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

/// RAII guard that restores the real home directory when dropped.
///
/// Returned by [`set_home_for_test`]; hold it for the duration of a test.
#[cfg(test)]
pub struct TestHomeGuard;

#[cfg(test)]
impl Drop for TestHomeGuard {
    fn drop(&mut self) {
        TEST_HOME.with(|h| *h.borrow_mut() = None);
    }
}

/// Overrides the home directory for the current thread.
///
/// Tests use this with a temp directory so they never touch the real
/// `~/.contact-quota/`. The override is thread-local, so parallel tests
/// remain isolated.
#[cfg(test)]
pub fn set_home_for_test(path: PathBuf) -> TestHomeGuard {
    TEST_HOME.with(|h| *h.borrow_mut() = Some(path));
    TestHomeGuard
}

fn home_dir() -> Result<PathBuf> {
    if let Some(test_home) = TEST_HOME.with(|h| h.borrow().clone()) {
        return Ok(test_home);
    }
    dirs::home_dir().context("Could not determine home directory for quota storage")
}

/// Returns the home-based contact-quota directory: `~/.contact-quota/`
///
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if:
/// - Home directory cannot be determined
/// - Directory creation fails
pub fn contact_quota_home_dir() -> Result<PathBuf> {
    let quota_dir = home_dir()?.join(CONTACT_QUOTA_DIR);
    fs::create_dir_all(&quota_dir).with_context(|| {
        format!(
            "Failed to create contact-quota directory: {}",
            quota_dir.display()
        )
    })?;
    Ok(quota_dir)
}

/// Returns the quota records directory: `~/.contact-quota/quota/`
///
/// Creates the directory if it doesn't exist.
pub fn quota_records_dir() -> Result<PathBuf> {
    let dir = contact_quota_home_dir()?.join("quota");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create quota records directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the logs directory: `~/.contact-quota/logs/`
///
/// Creates the directory if it doesn't exist.
pub fn logs_dir() -> Result<PathBuf> {
    let dir = contact_quota_home_dir()?.join("logs");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the decision log path: `~/.contact-quota/logs/events.jsonl`
pub fn events_log_path() -> Result<PathBuf> {
    Ok(logs_dir()?.join("events.jsonl"))
}

/// Returns the config file path: `~/.contact-quota/config.yaml`
///
/// The file itself may not exist; callers treat that as "use defaults".
pub fn config_path() -> Result<PathBuf> {
    Ok(contact_quota_home_dir()?.join("config.yaml"))
}

#[cfg(test)]
#[path = "tests/paths_tests.rs"]
mod tests;
