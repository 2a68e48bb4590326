// Unit tests for session loading

use super::*;
use pretty_assertions::assert_eq;
use serial_test::serial;
use tempfile::TempDir;

const STORAGE_STATE: &str = r#"{
  "cookies": [
    {"name": "sid", "value": "abc", "domain": ".dash.test", "path": "/", "expires": -1, "httpOnly": true, "secure": true, "sameSite": "Lax"},
    {"name": "old", "value": "x", "domain": "auth.dash.test", "expires": 1000},
    {"name": "pref", "value": "1", "domain": "dash.test"}
  ],
  "origins": [
    {"origin": "https://dash.test", "localStorage": [{"name": "tenant", "value": "42"}]}
  ]
}"#;

#[test]
fn test_parse_storage_state() {
    let state = SessionState::parse(STORAGE_STATE).unwrap();
    assert_eq!(state.cookies.len(), 3);
    assert_eq!(state.cookies[0].host(), "dash.test");
    assert!(state.cookies[0].http_only);
    assert_eq!(state.cookies[0].same_site.as_deref(), Some("Lax"));
    assert_eq!(state.cookies[2].path, "/");
    assert_eq!(state.cookies[2].expires, -1.0);
    assert_eq!(state.origins[0].local_storage[0].value, "42");
}

#[test]
fn test_parse_base64() {
    let encoded = base64::engine::general_purpose::STANDARD.encode(STORAGE_STATE);
    let state = SessionState::parse(&encoded).unwrap();
    assert_eq!(state, SessionState::parse(STORAGE_STATE).unwrap());
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(matches!(
        SessionState::parse("not a session!"),
        Err(RunError::SessionInvalid(_))
    ));
    assert!(matches!(
        SessionState::parse("{\"cookies\": 5}"),
        Err(RunError::SessionInvalid(_))
    ));
    assert!(matches!(
        SessionState::parse("{}"),
        Err(RunError::SessionInvalid(_))
    ));
}

#[test]
fn test_expired_cookies_are_filtered() {
    let state = SessionState::parse(STORAGE_STATE).unwrap();
    let live: Vec<&str> = state
        .live_cookies(2_000)
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(live, vec!["sid", "pref"]);
    assert_eq!(state.cookie_hosts(2_000), vec!["dash.test".to_string()]);
    assert_eq!(
        state.cookie_hosts(0),
        vec!["dash.test".to_string(), "auth.dash.test".to_string()]
    );
}

#[test]
#[serial]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, STORAGE_STATE).unwrap();

    let state = SessionStore::from_file(&path).load().unwrap();
    assert_eq!(state.cookies.len(), 3);
}

#[test]
#[serial]
fn test_missing_session_fails_fast() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(
        Some("REPORTGRAB_TEST_UNSET_SESSION".to_string()),
        dir.path().join("missing.json"),
    );

    match store.load() {
        Err(RunError::SessionMissing(msg)) => {
            assert!(msg.contains("missing.json"));
            assert!(msg.contains("$REPORTGRAB_TEST_UNSET_SESSION"));
        }
        other => panic!("expected SessionMissing, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_env_var_wins_over_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{}").unwrap();

    let var = "REPORTGRAB_TEST_SESSION_ENV";
    // SAFETY: serialized with the other env-touching tests
    unsafe { std::env::set_var(var, STORAGE_STATE) };
    let result = SessionStore::new(Some(var.to_string()), &path).load();
    unsafe { std::env::remove_var(var) };

    assert_eq!(result.unwrap().cookies.len(), 3);
}

#[test]
#[serial]
fn test_invalid_file_is_invalid_not_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{ broken").unwrap();

    assert!(matches!(
        SessionStore::from_file(&path).load(),
        Err(RunError::SessionInvalid(_))
    ));
}
