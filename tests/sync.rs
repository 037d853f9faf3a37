use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use mood_calendar::cloud::{self, SaveOutcome};
use mood_calendar::config::{Config, RemoteConfig, SyncMode};
use mood_calendar::models::{DateKey, Mood, MoodStore};
use mood_calendar::storage;
use mood_calendar::sync::{FileMeta, RemoteLoad, SyncClient, decode_store};
use mood_calendar::AppState;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Stand-in for the raw host and the contents API, counting every request.
#[derive(Default)]
struct FakeRemote {
    raw_public: bool,
    meta_fails: bool,
    reject_writes: bool,
    read_delay: Duration,
    write_delay: Duration,
    file: Mutex<Option<RemoteFile>>,
    raw_requests: AtomicUsize,
    meta_requests: AtomicUsize,
    put_requests: AtomicUsize,
    dispatch_requests: AtomicUsize,
    put_bodies: Mutex<Vec<Value>>,
    dispatch_bodies: Mutex<Vec<Value>>,
    authorizations: Mutex<Vec<String>>,
}

#[derive(Clone)]
struct RemoteFile {
    sha: String,
    json: String,
}

impl FakeRemote {
    fn total_requests(&self) -> usize {
        self.raw_requests.load(Ordering::SeqCst)
            + self.meta_requests.load(Ordering::SeqCst)
            + self.put_requests.load(Ordering::SeqCst)
            + self.dispatch_requests.load(Ordering::SeqCst)
    }

    async fn store_file(&self, store: &MoodStore) {
        *self.file.lock().await = Some(RemoteFile {
            sha: "sha-initial".to_string(),
            json: serde_json::to_string_pretty(store).unwrap(),
        });
    }

    async fn record_auth(&self, headers: &HeaderMap) {
        if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            self.authorizations.lock().await.push(value.to_string());
        }
    }
}

async fn raw_file(
    State(remote): State<Arc<FakeRemote>>,
    Path((_owner, _repo, _branch, _path)): Path<(String, String, String, String)>,
) -> Response {
    remote.raw_requests.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(remote.read_delay).await;
    let file = remote.file.lock().await.clone();
    match file {
        Some(file) if remote.raw_public => file.json.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_contents(
    State(remote): State<Arc<FakeRemote>>,
    headers: HeaderMap,
) -> Response {
    remote.meta_requests.fetch_add(1, Ordering::SeqCst);
    remote.record_auth(&headers).await;
    if remote.meta_fails {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let file = remote.file.lock().await.clone();
    match file {
        Some(file) => {
            let encoded = STANDARD.encode(file.json.as_bytes());
            // The real API wraps base64 every 60 characters.
            let wrapped: String = encoded
                .as_bytes()
                .chunks(60)
                .map(|chunk| format!("{}\n", String::from_utf8_lossy(chunk)))
                .collect();
            Json(serde_json::json!({ "sha": file.sha, "content": wrapped })).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put_contents(
    State(remote): State<Arc<FakeRemote>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let count = remote.put_requests.fetch_add(1, Ordering::SeqCst) + 1;
    remote.record_auth(&headers).await;
    tokio::time::sleep(remote.write_delay).await;
    remote.put_bodies.lock().await.push(body.clone());
    if remote.reject_writes {
        return (StatusCode::CONFLICT, "sha mismatch").into_response();
    }

    let content = body["content"].as_str().unwrap_or_default();
    let json = String::from_utf8(STANDARD.decode(content).unwrap()).unwrap();
    let mut file = remote.file.lock().await;
    let created = file.is_none();
    *file = Some(RemoteFile {
        sha: format!("sha-{count}"),
        json,
    });
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    (status, Json(serde_json::json!({ "content": { "sha": format!("sha-{count}") } }))).into_response()
}

async fn dispatch(
    State(remote): State<Arc<FakeRemote>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    remote.dispatch_requests.fetch_add(1, Ordering::SeqCst);
    remote.record_auth(&headers).await;
    remote.dispatch_bodies.lock().await.push(body);
    StatusCode::NO_CONTENT
}

async fn start_fake(remote: FakeRemote) -> (Arc<FakeRemote>, String) {
    let remote = Arc::new(remote);
    let app = Router::new()
        .route("/raw/:owner/:repo/:branch/:path", get(raw_file))
        .route(
            "/api/repos/:owner/:repo/contents/:path",
            get(get_contents).put(put_contents),
        )
        .route("/api/repos/:owner/:repo/dispatches", post(dispatch))
        .with_state(Arc::clone(&remote));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (remote, base)
}

fn unique_path(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("mood_sync_{}_{}_{name}", std::process::id(), nanos))
}

fn remote_config(base: &str, mode: SyncMode) -> RemoteConfig {
    let mut remote = RemoteConfig::github("alice", "mood-calendar");
    remote.api_url = format!("{base}/api");
    remote.raw_url = format!("{base}/raw");
    remote.mode = mode;
    remote
}

async fn app_state(base: &str, mode: SyncMode, local: MoodStore, token: Option<&str>) -> AppState {
    let data_path = unique_path("moods.json");
    let config = Config {
        port: 0,
        token_path: data_path.with_extension("token"),
        data_path,
        remote: Some(remote_config(base, mode)),
    };
    if let Some(token) = token {
        storage::save_token(&config.token_path, token).await.unwrap();
    }
    storage::persist_moods(&config.data_path, &local).await.unwrap();
    AppState::new(config, local, NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()).unwrap()
}

fn key(value: &str) -> DateKey {
    value.parse().unwrap()
}

fn sample_store() -> MoodStore {
    let mut store = MoodStore::new();
    store.set_mood(&key("2024-3-15"), "😄", Some(Mood::Great), Some("café ☕ 日本".to_string()));
    store.set_mood(&key("2024-3-16"), "😠", Some(Mood::Terrible), None);
    store
}

#[tokio::test]
async fn load_prefers_the_public_raw_file() {
    let (remote, base) = start_fake(FakeRemote {
        raw_public: true,
        ..FakeRemote::default()
    })
    .await;
    remote.store_file(&sample_store()).await;

    let client = SyncClient::new(remote_config(&base, SyncMode::Contents)).unwrap();
    let loaded = client.load(None).await.unwrap();
    assert_eq!(loaded, RemoteLoad::Loaded(sample_store()));
    assert_eq!(remote.raw_requests.load(Ordering::SeqCst), 1);
    assert_eq!(remote.meta_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn private_file_is_read_through_the_contents_api() {
    let (remote, base) = start_fake(FakeRemote::default()).await;
    remote.store_file(&sample_store()).await;

    let client = SyncClient::new(remote_config(&base, SyncMode::Contents)).unwrap();
    let loaded = client.load(Some("secret-token")).await.unwrap();
    assert_eq!(loaded, RemoteLoad::Loaded(sample_store()));
    assert_eq!(remote.meta_requests.load(Ordering::SeqCst), 1);
    assert_eq!(
        remote.authorizations.lock().await.as_slice(),
        ["Bearer secret-token".to_string()]
    );

    match client.file_meta(None).await.unwrap() {
        FileMeta::Present { sha, content } => {
            assert_eq!(sha, "sha-initial");
            assert_eq!(decode_store(&content).unwrap(), sample_store());
        }
        FileMeta::Missing => panic!("file should exist"),
    }
}

#[tokio::test]
async fn missing_remote_file_keeps_local_store() {
    let (_remote, base) = start_fake(FakeRemote::default()).await;
    let state = app_state(&base, SyncMode::Contents, sample_store(), None).await;

    let status = cloud::load_remote(&state).await;
    assert_eq!(status, cloud::STATUS_NOT_FOUND);
    assert_eq!(state.data.lock().await.store, sample_store());
}

#[tokio::test]
async fn failed_remote_load_falls_back_to_local_data() {
    let (_remote, base) = start_fake(FakeRemote {
        meta_fails: true,
        ..FakeRemote::default()
    })
    .await;
    let state = app_state(&base, SyncMode::Contents, sample_store(), None).await;

    let status = cloud::load_remote(&state).await;
    assert_eq!(status, cloud::STATUS_LOAD_FAILED);
    assert_eq!(state.data.lock().await.status, cloud::STATUS_LOAD_FAILED);
    assert_eq!(state.data.lock().await.store, sample_store());
}

#[tokio::test]
async fn remote_store_replaces_and_mirrors_local_copy() {
    let (remote, base) = start_fake(FakeRemote {
        raw_public: true,
        ..FakeRemote::default()
    })
    .await;
    remote.store_file(&sample_store()).await;
    let state = app_state(&base, SyncMode::Contents, MoodStore::new(), None).await;

    assert_eq!(cloud::load_remote(&state).await, cloud::STATUS_LOADED);
    assert_eq!(state.data.lock().await.store, sample_store());
    let mirrored = storage::load_moods(&state.config.data_path).await;
    assert_eq!(mirrored.store, sample_store());
}

#[tokio::test]
async fn edits_made_during_a_load_are_replaced_by_the_remote_copy() {
    let (remote, base) = start_fake(FakeRemote {
        raw_public: true,
        read_delay: Duration::from_millis(300),
        ..FakeRemote::default()
    })
    .await;
    remote.store_file(&sample_store()).await;
    let state = app_state(&base, SyncMode::Contents, MoodStore::new(), None).await;

    let loading = tokio::spawn({
        let state = state.clone();
        async move { cloud::load_remote(&state).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.data.lock().await.status, cloud::STATUS_LOADING);
    state
        .data
        .lock()
        .await
        .store
        .set_mood(&key("2024-3-20"), "🙂", Some(Mood::Good), None);

    assert_eq!(loading.await.unwrap(), cloud::STATUS_LOADED);
    let session = state.data.lock().await;
    assert!(session.store.get(&key("2024-3-20")).is_none());
    assert_eq!(session.store, sample_store());
}

#[tokio::test]
async fn empty_remote_does_not_hide_local_data() {
    let (remote, base) = start_fake(FakeRemote {
        raw_public: true,
        ..FakeRemote::default()
    })
    .await;
    remote.store_file(&MoodStore::new()).await;
    let state = app_state(&base, SyncMode::Contents, sample_store(), None).await;

    assert_eq!(cloud::load_remote(&state).await, cloud::STATUS_LOADED);
    assert_eq!(state.data.lock().await.store, sample_store());
}

#[tokio::test]
async fn save_without_token_makes_no_requests() {
    let (remote, base) = start_fake(FakeRemote::default()).await;
    let state = app_state(&base, SyncMode::Contents, sample_store(), None).await;

    assert_eq!(cloud::save_remote(&state).await, SaveOutcome::NoCredential);
    assert_eq!(state.data.lock().await.status, cloud::STATUS_NO_TOKEN);
    assert_eq!(remote.total_requests(), 0);
}

#[tokio::test]
async fn first_save_creates_then_later_saves_carry_the_sha() {
    let (remote, base) = start_fake(FakeRemote::default()).await;
    let state = app_state(&base, SyncMode::Contents, sample_store(), Some("tok")).await;

    assert_eq!(cloud::save_remote(&state).await, SaveOutcome::Saved);
    assert_eq!(state.data.lock().await.status, cloud::STATUS_SAVED);

    state
        .data
        .lock()
        .await
        .store
        .set_mood(&key("2024-3-17"), "🙂", Some(Mood::Good), None);
    assert_eq!(cloud::save_remote(&state).await, SaveOutcome::Saved);

    let bodies = remote.put_bodies.lock().await;
    assert_eq!(bodies.len(), 2);
    assert!(bodies[0].get("sha").is_none());
    assert_eq!(bodies[0]["branch"], "main");
    assert_eq!(bodies[0]["message"], "Update moods.json");
    assert_eq!(bodies[1]["sha"], "sha-1");

    let written = decode_store(bodies[1]["content"].as_str().unwrap()).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(
        written.get(&key("2024-3-15")).unwrap().comment,
        "café ☕ 日本"
    );
    assert!(
        remote
            .authorizations
            .lock()
            .await
            .iter()
            .all(|value| value == "Bearer tok")
    );
}

#[tokio::test]
async fn rapid_second_save_is_dropped() {
    let (remote, base) = start_fake(FakeRemote {
        write_delay: Duration::from_millis(300),
        ..FakeRemote::default()
    })
    .await;
    let state = app_state(&base, SyncMode::Contents, sample_store(), Some("tok")).await;

    let first_state = state.clone();
    let first = tokio::spawn(async move { cloud::save_remote(&first_state).await });
    while remote.meta_requests.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let second = cloud::save_remote(&state).await;

    assert_eq!(second, SaveOutcome::AlreadyInFlight);
    assert_eq!(first.await.unwrap(), SaveOutcome::Saved);
    assert_eq!(remote.put_requests.load(Ordering::SeqCst), 1);

    // The flag is released once the write finishes.
    assert_eq!(cloud::save_remote(&state).await, SaveOutcome::Saved);
    assert_eq!(remote.put_requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rejected_write_reports_failure_and_keeps_local_data() {
    let (remote, base) = start_fake(FakeRemote {
        reject_writes: true,
        ..FakeRemote::default()
    })
    .await;
    let state = app_state(&base, SyncMode::Contents, sample_store(), Some("tok")).await;

    assert_eq!(cloud::save_remote(&state).await, SaveOutcome::Failed);
    assert_eq!(state.data.lock().await.status, cloud::STATUS_SAVE_FAILED);
    assert_eq!(state.data.lock().await.store, sample_store());
    assert_eq!(storage::load_moods(&state.config.data_path).await.store, sample_store());
    assert!(remote.file.lock().await.is_none());
}

#[tokio::test]
async fn dispatch_mode_sends_the_store_as_an_event() {
    let (remote, base) = start_fake(FakeRemote::default()).await;
    let state = app_state(&base, SyncMode::Dispatch, sample_store(), Some("tok")).await;

    assert_eq!(cloud::save_remote(&state).await, SaveOutcome::Dispatched);
    assert_eq!(state.data.lock().await.status, cloud::STATUS_DISPATCHED);
    assert_eq!(remote.put_requests.load(Ordering::SeqCst), 0);
    assert_eq!(remote.meta_requests.load(Ordering::SeqCst), 0);

    let bodies = remote.dispatch_bodies.lock().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["event_type"], "update-moods");
    let payload = bodies[0]["client_payload"]["moods"].as_str().unwrap();
    let sent: MoodStore = serde_json::from_str(payload).unwrap();
    assert_eq!(sent, sample_store());
}
