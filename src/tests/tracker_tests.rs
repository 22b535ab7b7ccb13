use super::*;
use crate::paths::set_home_for_test;
use crate::quota::DEFAULT_DAILY_LIMIT;
use tempfile::TempDir;

fn user() -> Identity {
    Identity::User("user_1".to_string())
}

fn load_tracker(identity: Identity, limit: i64) -> QuotaTracker {
    QuotaTracker::load(identity, DailyLimit::new(limit), Local::now())
}

#[test]
fn test_identity_from_user_id() {
    assert_eq!(
        Identity::from_user_id(Some("user_1")),
        Identity::User("user_1".to_string())
    );
    assert_eq!(Identity::from_user_id(None), Identity::Anonymous);
    assert_eq!(Identity::from_user_id(Some("")), Identity::Anonymous);
    assert_eq!(Identity::from_user_id(Some("   ")), Identity::Anonymous);
}

#[test]
fn test_limit_then_replay_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = set_home_for_test(temp_dir.path().to_path_buf());

    let mut tracker = load_tracker(user(), 3);

    for (i, id) in ["a", "b", "c"].iter().enumerate() {
        let outcome = tracker.attempt_view(id);
        assert!(outcome.allowed);
        assert!(outcome.first_view);
        assert_eq!(outcome.remaining, Some(2 - u32::try_from(i).unwrap()));
    }
    assert_eq!(tracker.viewed_count(), 3);
    assert!(tracker.limit_reached());

    // A fourth, never-seen id is denied and changes nothing.
    let denied = tracker.attempt_view("d");
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, Some(0));
    assert_eq!(tracker.viewed_count(), 3);

    // Replay of an admitted id is still allowed at the limit.
    let replay = tracker.attempt_view("a");
    assert!(replay.allowed);
    assert!(!replay.first_view);
    assert_eq!(tracker.viewed_count(), 3);
}

#[test]
fn test_admissions_survive_reload() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = set_home_for_test(temp_dir.path().to_path_buf());

    let mut tracker = load_tracker(user(), 10);
    tracker.attempt_view("a");
    tracker.attempt_view("b");

    // A fresh tracker for the same (user, day) sees the persisted views.
    let reloaded = load_tracker(user(), 10);
    assert_eq!(reloaded.viewed_count(), 2);
    assert_eq!(reloaded.remaining(), Some(8));
    let viewed: Vec<&str> = reloaded.viewed_today().collect();
    assert_eq!(viewed, vec!["a", "b"]);
}

#[test]
fn test_denied_attempt_is_not_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = set_home_for_test(temp_dir.path().to_path_buf());

    let mut tracker = load_tracker(user(), 1);
    tracker.attempt_view("a");
    tracker.attempt_view("b");

    let reloaded = load_tracker(user(), 1);
    let viewed: Vec<&str> = reloaded.viewed_today().collect();
    assert_eq!(viewed, vec!["a"]);
}

#[test]
fn test_anonymous_is_unlimited_and_never_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = set_home_for_test(temp_dir.path().to_path_buf());

    let mut tracker = load_tracker(Identity::Anonymous, 2);
    for i in 0..20 {
        let outcome = tracker.attempt_view(&format!("id_{}", i));
        assert!(outcome.allowed);
        assert_eq!(outcome.remaining, None);
    }
    assert_eq!(tracker.remaining(), None);
    assert!(!tracker.limit_reached());

    // Nothing was written for the anonymous session; the records
    // directory is never even created.
    let quota_dir = temp_dir.path().join(".contact-quota/quota");
    assert!(!quota_dir.exists());
}

#[test]
fn test_corrupt_record_fails_open_to_empty() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = set_home_for_test(temp_dir.path().to_path_buf());

    let day = DayKey::from_datetime(&Local::now());
    let quota_dir = temp_dir.path().join(".contact-quota/quota");
    std::fs::create_dir_all(&quota_dir).unwrap();
    std::fs::write(
        quota_dir.join(format!("viewed_contacts_user_1_{}.json", day)),
        "{{{ definitely not json",
    )
    .unwrap();

    let tracker = load_tracker(user(), 5);
    assert_eq!(tracker.viewed_count(), 0);
    assert_eq!(tracker.remaining(), Some(5));
}

#[test]
fn test_unavailable_store_still_enforces_in_memory() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = set_home_for_test(temp_dir.path().to_path_buf());

    // A regular file where the home directory should be makes every
    // storage path unopenable.
    std::fs::write(temp_dir.path().join(".contact-quota"), "not a dir").unwrap();

    let mut tracker = load_tracker(user(), 2);
    assert!(tracker.attempt_view("a").allowed);
    assert!(tracker.attempt_view("b").allowed);
    let denied = tracker.attempt_view("c");
    assert!(!denied.allowed);
    assert_eq!(tracker.viewed_count(), 2);
}

#[test]
fn test_invalid_limit_clamps_to_default() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = set_home_for_test(temp_dir.path().to_path_buf());

    let tracker = load_tracker(user(), 0);
    assert_eq!(tracker.limit().get(), DEFAULT_DAILY_LIMIT);
    assert_eq!(tracker.remaining(), Some(DEFAULT_DAILY_LIMIT));
}
