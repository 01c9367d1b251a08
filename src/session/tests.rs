use super::*;
use tempfile::TempDir;

const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef0123456789abcdef";

fn create_test_store() -> (SessionStore, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = SessionStore::new(temp_dir.path().join("sessions"), TEST_SECRET)
        .expect("store should build");
    (store, temp_dir)
}

fn empty_jar(store: &SessionStore) -> SignedCookieJar {
    SignedCookieJar::new(store.cookie_key())
}

#[test]
fn short_secret_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = SessionStore::new(temp_dir.path().to_path_buf(), "short");

    assert!(matches!(result, Err(PlaygroundError::Config(_))));
}

#[test]
fn absent_cookie_yields_fresh_empty_session() {
    let (store, _guard) = create_test_store();
    let jar = empty_jar(&store);

    let session = store.load(&jar).expect("load should succeed");

    assert!(!session.has("memory"));
}

#[test]
fn commit_then_load_round_trips_values() {
    let (store, _guard) = create_test_store();

    let mut session = Session::new();
    session
        .set("greeting", &"hello".to_string())
        .expect("set should succeed");
    session.set("count", &3_u32).expect("set should succeed");

    let cookie = store.commit(&session).expect("commit should succeed");
    assert_eq!(cookie.name(), SESSION_COOKIE);

    // Simulate the next request carrying the committed cookie back
    let jar = empty_jar(&store).add(cookie);
    let reloaded = store.load(&jar).expect("load should succeed");

    assert_eq!(reloaded.id(), session.id());
    assert_eq!(reloaded.get::<String>("greeting").as_deref(), Some("hello"));
    assert_eq!(reloaded.get::<u32>("count"), Some(3));
}

#[test]
fn invalid_cookie_value_fails_open() {
    let (store, _guard) = create_test_store();

    let bogus = Cookie::build((SESSION_COOKIE, "not-a-uuid")).build();
    let jar = empty_jar(&store).add(bogus);

    let session = store.load(&jar).expect("load should succeed");
    assert!(!session.has("anything"));
}

#[test]
fn valid_cookie_without_file_keeps_the_id() {
    let (store, _guard) = create_test_store();

    let id = Uuid::new_v4();
    let cookie = Cookie::build((SESSION_COOKIE, id.to_string())).build();
    let jar = empty_jar(&store).add(cookie);

    let session = store.load(&jar).expect("load should succeed");
    assert_eq!(session.id(), id);
    assert!(!session.has("memory"));
}

#[test]
fn corrupt_session_file_fails_open_with_same_id() {
    let (store, temp_dir) = create_test_store();

    let session = Session::new();
    store.commit(&session).expect("commit should succeed");

    let path = temp_dir
        .path()
        .join("sessions")
        .join(format!("{}.json", session.id()));
    std::fs::write(&path, "{ not json").expect("should overwrite file");

    let cookie = Cookie::build((SESSION_COOKIE, session.id().to_string())).build();
    let jar = empty_jar(&store).add(cookie);

    let reloaded = store.load(&jar).expect("load should succeed");
    assert_eq!(reloaded.id(), session.id());
}

#[test]
fn unreadable_session_file_is_session_unavailable() {
    let (store, temp_dir) = create_test_store();

    // A directory where the session file should be forces a read error
    let id = Uuid::new_v4();
    let path = temp_dir
        .path()
        .join("sessions")
        .join(format!("{}.json", id));
    std::fs::create_dir_all(&path).expect("should create dir");

    let cookie = Cookie::build((SESSION_COOKIE, id.to_string())).build();
    let jar = empty_jar(&store).add(cookie);

    assert!(matches!(
        store.load(&jar),
        Err(PlaygroundError::SessionUnavailable(_))
    ));

    // The documented recovery: log and continue with an empty session
    let recovered = store.load_or_empty(&jar);
    assert!(!recovered.has("anything"));
}

#[test]
fn commit_failure_is_session_unavailable() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    // Point the store's directory at an existing file
    let blocker = temp_dir.path().join("sessions");
    std::fs::write(&blocker, "occupied").expect("should write file");

    let store = SessionStore::new(blocker, TEST_SECRET).expect("store should build");
    let session = Session::new();

    assert!(matches!(
        store.commit(&session),
        Err(PlaygroundError::SessionUnavailable(_))
    ));
}

#[test]
fn clearing_sets_an_empty_value_without_removing_the_key() {
    let (store, _guard) = create_test_store();

    let mut session = Session::new();
    session
        .set("memory", &vec!["a".to_string(), "b".to_string()])
        .expect("set should succeed");
    session
        .set("memory", &Vec::<String>::new())
        .expect("set should succeed");

    let cookie = store.commit(&session).expect("commit should succeed");
    let jar = empty_jar(&store).add(cookie);
    let reloaded = store.load(&jar).expect("load should succeed");

    assert!(reloaded.has("memory"));
    assert_eq!(reloaded.get::<Vec<String>>("memory"), Some(vec![]));
}

#[test]
fn mismatched_value_shape_reads_as_none() {
    let mut session = Session::new();
    session
        .set("number", &42_u32)
        .expect("set should succeed");

    assert_eq!(session.get::<Vec<String>>("number"), None);
    assert_eq!(session.get::<u32>("number"), Some(42));
}

#[test]
fn session_cookie_attributes() {
    let (store, _guard) = create_test_store();
    let cookie = store.commit(&Session::new()).expect("commit should succeed");

    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
}
