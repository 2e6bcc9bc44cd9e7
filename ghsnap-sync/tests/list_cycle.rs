use std::cell::{Cell, RefCell};
use std::fs;

use ghsnap_core::{
    store,
    types::UserName,
    StoreError,
};
use ghsnap_sync::{
    run_list, setup, ListOptions, ListQuery, MergeSummary, RepoSource, SyncError,
};
use serde_json::{json, Value};
use tempfile::TempDir;

enum Response {
    Repos(Vec<Value>),
    Fail,
}

struct FakeSource {
    login: &'static str,
    response: Response,
    calls: Cell<usize>,
    last_query: RefCell<Option<ListQuery>>,
}

impl FakeSource {
    fn new(response: Response) -> Self {
        Self {
            login: "octocat",
            response,
            calls: Cell::new(0),
            last_query: RefCell::new(None),
        }
    }
}

impl RepoSource for FakeSource {
    fn list_repos(&self, query: &ListQuery) -> Result<Vec<Value>, SyncError> {
        self.calls.set(self.calls.get() + 1);
        *self.last_query.borrow_mut() = Some(query.clone());
        match &self.response {
            Response::Repos(items) => Ok(items.clone()),
            Response::Fail => Err(SyncError::CommandFailed {
                command: "gh repo list".to_string(),
                status: failed_status(),
                stderr: "HTTP 502".to_string(),
            }),
        }
    }

    fn current_user(&self) -> Result<UserName, SyncError> {
        Ok(UserName::from(self.login))
    }
}

#[cfg(unix)]
fn failed_status() -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(1 << 8)
}

#[cfg(windows)]
fn failed_status() -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(1)
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn user() -> UserName {
    UserName::from("octocat")
}

fn repo(name: &str, created_at: &str) -> Value {
    json!({
        "name": name,
        "url": format!("https://github.com/octocat/{name}"),
        "owner": {"id": "U_1", "login": "octocat"},
        "nameWithOwner": format!("octocat/{name}"),
        "parent": null,
        "pullRequests": {"totalCount": 0},
        "createdAt": created_at,
        "description": "",
        "diskUsage": 10,
        "hasProjectsEnabled": true,
        "homepageUrl": ""
    })
}

fn forced() -> ListOptions {
    ListOptions {
        force: true,
        ..ListOptions::default()
    }
}

fn initialised_home() -> TempDir {
    init_logs();
    let home = TempDir::new().expect("home");
    store::setup_at(home.path(), &user(), None).expect("setup");
    home
}

fn first_cycle(home: &TempDir) {
    let source = FakeSource::new(Response::Repos(vec![
        repo("repoA", "2020-01-01T00:00:00Z"),
        repo("repoB", "2021-01-01T00:00:00Z"),
    ]));
    run_list(home.path(), &source, &ListOptions::default()).expect("first cycle");
}

#[test]
fn first_cycle_fetches_and_persists_with_sentinel_log() {
    let home = initialised_home();
    let source = FakeSource::new(Response::Repos(vec![
        repo("repoA", "2020-01-01T00:00:00Z"),
        repo("repoB", "2021-01-01T00:00:00Z"),
    ]));

    let outcome = run_list(home.path(), &source, &ListOptions::default()).expect("run");

    assert!(outcome.fetched());
    assert_eq!(outcome.sequence, 1);
    assert_eq!(source.calls.get(), 1);
    assert_eq!(
        outcome.summary(),
        Some(MergeSummary {
            discovered: 2,
            ..MergeSummary::default()
        })
    );

    let snapshot = store::load_snapshot_at(home.path(), &user()).expect("load snapshot");
    assert_eq!(snapshot, outcome.snapshot);
    assert!(snapshot.values().all(|r| r.count == 1 && r.valid));
    assert_eq!(snapshot["repoA"].fields["field_2"], json!(""));

    let log = store::load_fetch_log_at(home.path(), &user()).expect("load log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[&1], "");
}

#[test]
fn query_uses_store_user_limit_and_tracked_fields() {
    let home = initialised_home();
    let source = FakeSource::new(Response::Repos(vec![]));
    run_list(home.path(), &source, &ListOptions::default()).expect("run");

    let query = source.last_query.borrow().clone().expect("query recorded");
    assert_eq!(query.owner.as_deref(), Some("octocat"));
    assert_eq!(query.limit, Some(400));
    assert_eq!(query.fields.len(), 11);
}

#[test]
fn second_cycle_without_force_reuses_snapshot_and_writes_nothing() {
    let home = initialised_home();
    first_cycle(&home);
    let db_before = fs::read(store::snapshot_path_at(home.path(), &user())).expect("db");
    let log_before = fs::read(store::fetch_log_path_at(home.path(), &user())).expect("log");

    let source = FakeSource::new(Response::Repos(vec![repo("repoZ", "2024")]));
    let outcome = run_list(home.path(), &source, &ListOptions::default()).expect("run");

    assert!(!outcome.fetched());
    assert_eq!(outcome.sequence, 2);
    assert_eq!(source.calls.get(), 0, "source must not be contacted");
    assert_eq!(outcome.snapshot.len(), 2);
    assert_eq!(outcome.log.len(), 1, "reported log matches disk");
    assert_eq!(db_before, fs::read(store::snapshot_path_at(home.path(), &user())).unwrap());
    assert_eq!(log_before, fs::read(store::fetch_log_path_at(home.path(), &user())).unwrap());
}

#[test]
fn forced_cycle_merges_with_provenance() {
    let home = initialised_home();
    first_cycle(&home);

    // repoA unchanged, repoB changed, repoB absent → retained, repoC new
    let mut changed_b = repo("repoB", "2021-01-01T00:00:00Z");
    changed_b["description"] = json!("now with a description");
    let source = FakeSource::new(Response::Repos(vec![
        repo("repoA", "2020-01-01T00:00:00Z"),
        changed_b,
        repo("repoC", "2022-01-01T00:00:00Z"),
    ]));
    let outcome = run_list(home.path(), &source, &forced()).expect("run");
    assert_eq!(outcome.sequence, 2);

    let snapshot = store::load_snapshot_at(home.path(), &user()).expect("load");
    assert_eq!(snapshot["repoA"].count, 1, "identical data keeps first-observed count");
    assert_eq!(snapshot["repoB"].count, 2);
    assert_eq!(snapshot["repoB"].fields["description"], json!("now with a description"));
    assert_eq!(snapshot["repoC"].count, 2);
    assert!(snapshot["repoC"].valid);

    let log = store::load_fetch_log_at(home.path(), &user()).expect("log");
    assert_eq!(log.len(), 2);
    assert_eq!(log[&1], "");
    assert!(log[&2].ends_with("+09:00"), "got: {}", log[&2]);

    // Third forced cycle without repoA: it is retained untouched.
    let source = FakeSource::new(Response::Repos(vec![repo("repoC", "2022-01-01T00:00:00Z")]));
    let outcome = run_list(home.path(), &source, &forced()).expect("run");
    assert_eq!(outcome.sequence, 3);
    assert_eq!(
        outcome.summary(),
        Some(MergeSummary {
            discovered: 0,
            updated: 0,
            unchanged: 1,
            retained: 2
        })
    );
    let snapshot = store::load_snapshot_at(home.path(), &user()).expect("load");
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot["repoA"].count, 1);
    assert!(snapshot["repoA"].valid);
}

#[test]
fn source_failure_leaves_store_untouched() {
    let home = initialised_home();
    first_cycle(&home);
    let db_before = fs::read(store::snapshot_path_at(home.path(), &user())).expect("db");
    let log_before = fs::read(store::fetch_log_path_at(home.path(), &user())).expect("log");

    let source = FakeSource::new(Response::Fail);
    let err = run_list(home.path(), &source, &forced()).unwrap_err();
    assert!(err.is_external_source_failure(), "got: {err}");

    assert_eq!(db_before, fs::read(store::snapshot_path_at(home.path(), &user())).unwrap());
    assert_eq!(log_before, fs::read(store::fetch_log_path_at(home.path(), &user())).unwrap());
}

#[test]
fn malformed_entity_leaves_store_untouched() {
    let home = initialised_home();
    let source = FakeSource::new(Response::Repos(vec![
        repo("repoA", "2020"),
        json!({"url": "https://example.com/nameless"}),
    ]));
    let err = run_list(home.path(), &source, &ListOptions::default()).unwrap_err();
    assert!(matches!(err, SyncError::MalformedEntity { index: 1, .. }), "got: {err}");

    assert!(store::load_snapshot_at(home.path(), &user()).unwrap().is_empty());
    assert!(store::load_fetch_log_at(home.path(), &user()).unwrap().is_empty());
}

#[test]
fn field_override_narrows_change_detection() {
    let home = initialised_home();
    first_cycle(&home);

    let mut changed_a = repo("repoA", "2020-01-01T00:00:00Z");
    changed_a["description"] = json!("edited");
    let source = FakeSource::new(Response::Repos(vec![changed_a]));
    let options = ListOptions {
        force: true,
        fields: Some(vec!["createdAt".to_string()]),
        ..ListOptions::default()
    };
    let outcome = run_list(home.path(), &source, &options).expect("run");

    let query = source.last_query.borrow().clone().expect("query");
    assert_eq!(query.fields, vec!["name", "createdAt"]);
    assert_eq!(outcome.snapshot["repoA"].count, 1, "description is not tracked this run");
}

#[test]
fn reobservation_with_local_fields_tracked_keeps_count_and_notes() {
    init_logs();
    let home = TempDir::new().expect("home");
    let tracked = vec!["name".to_string(), "count".to_string(), "field_1".to_string()];
    store::setup_at(home.path(), &user(), Some(tracked)).expect("setup");
    first_cycle(&home);

    let mut snapshot = store::load_snapshot_at(home.path(), &user()).expect("load");
    snapshot
        .get_mut("repoA")
        .expect("repoA")
        .fields
        .insert("field_1".to_string(), json!("keep me"));
    store::save_snapshot_at(home.path(), &user(), &snapshot).expect("save");

    let source = FakeSource::new(Response::Repos(vec![
        repo("repoA", "2020-01-01T00:00:00Z"),
        repo("repoB", "2021-01-01T00:00:00Z"),
    ]));
    let outcome = run_list(home.path(), &source, &forced()).expect("run");

    let query = source.last_query.borrow().clone().expect("query");
    assert_eq!(query.fields, vec!["name"]);
    assert_eq!(outcome.summary().map(|s| s.unchanged), Some(2));
    let snapshot = store::load_snapshot_at(home.path(), &user()).expect("load");
    assert_eq!(snapshot["repoA"].count, 1);
    assert_eq!(snapshot["repoA"].fields["field_1"], json!("keep me"));
}

#[test]
fn explicit_user_selects_its_own_store() {
    init_logs();
    let home = TempDir::new().expect("home");
    store::setup_at(home.path(), &UserName::from("hubot"), None).expect("setup");

    let source = FakeSource::new(Response::Repos(vec![repo("robots", "2020")]));
    let options = ListOptions {
        user: Some(" hubot\n".to_string()),
        ..ListOptions::default()
    };
    let outcome = run_list(home.path(), &source, &options).expect("run");

    assert_eq!(outcome.user, UserName::from("hubot"));
    let query = source.last_query.borrow().clone().expect("query");
    assert_eq!(query.owner.as_deref(), Some("hubot"));
    assert!(store::load_snapshot_at(home.path(), &UserName::from("hubot"))
        .unwrap()
        .contains_key("robots"));
}

#[test]
fn login_with_path_components_is_rejected_before_any_io() {
    init_logs();
    let home = TempDir::new().expect("home");
    let source = FakeSource::new(Response::Repos(vec![]));
    for raw in ["../../outside", "a/b", ".."] {
        let options = ListOptions {
            user: Some(raw.to_string()),
            ..ListOptions::default()
        };
        let err = run_list(home.path(), &source, &options).unwrap_err();
        assert!(
            matches!(err, SyncError::Store(StoreError::InvalidUserName { .. })),
            "{raw}: got {err}"
        );
        let err = setup(home.path(), &source, Some(raw), None).unwrap_err();
        assert!(
            matches!(err, SyncError::Store(StoreError::InvalidUserName { .. })),
            "{raw}: got {err}"
        );
    }
    assert_eq!(source.calls.get(), 0);
    assert_eq!(fs::read_dir(home.path()).expect("read home").count(), 0);
}

#[test]
fn list_before_setup_is_not_initialized() {
    init_logs();
    let home = TempDir::new().expect("home");
    let source = FakeSource::new(Response::Repos(vec![]));
    let err = run_list(home.path(), &source, &ListOptions::default()).unwrap_err();
    assert!(
        matches!(err, SyncError::Store(StoreError::NotInitialized { .. })),
        "got: {err}"
    );
    assert_eq!(source.calls.get(), 0);
}

#[test]
fn setup_without_user_asks_the_source() {
    init_logs();
    let home = TempDir::new().expect("home");
    let source = FakeSource::new(Response::Repos(vec![]));
    let config = setup(home.path(), &source, None, None).expect("setup");
    assert_eq!(config.user, user());
    assert!(store::config_path_at(home.path(), &user()).exists());
}
