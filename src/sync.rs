//! Remote copy of the mood store, kept as one JSON file in a GitHub repository.
//!
//! Reads try the public raw host first and fall back to the contents API.
//! Writes either go through the contents API (create-or-update guarded by the
//! file's blob sha) or are handed to a workflow via a repository dispatch event.
//!
//! The contents write is two separate requests: read the current sha, then PUT
//! with it. Another writer landing between the two makes the PUT fail with a
//! conflict; nothing here retries or merges.
//!
//! Loads do not merge either: the caller swaps the fetched store in wholesale,
//! dropping local edits made between the request and the response.

use crate::config::{RemoteConfig, SyncMode};
use crate::models::MoodStore;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Response, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const COMMIT_MESSAGE: &str = "Update moods.json";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("mood_calendar/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("remote content is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("remote content is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("remote content is not a mood file: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the contents API knows about the remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileMeta {
    Missing,
    Present { sha: String, content: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLoad {
    Loaded(MoodStore),
    /// No file yet; the first save creates it.
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteReceipt {
    Committed { created: bool },
    Dispatched,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct DispatchBody<'a> {
    event_type: &'a str,
    client_payload: DispatchPayload,
}

#[derive(Debug, Serialize)]
struct DispatchPayload {
    moods: String,
}

#[derive(Debug, Clone)]
pub struct SyncClient {
    http: Client,
    remote: RemoteConfig,
}

impl SyncClient {
    pub fn new(remote: RemoteConfig) -> Result<Self, SyncError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, remote })
    }

    pub fn remote(&self) -> &RemoteConfig {
        &self.remote
    }

    fn raw_url(&self) -> String {
        let remote = &self.remote;
        format!(
            "{}/{}/{}/{}/{}",
            remote.raw_url, remote.owner, remote.repo, remote.branch, remote.path
        )
    }

    fn contents_url(&self) -> String {
        let remote = &self.remote;
        format!(
            "{}/repos/{}/{}/contents/{}",
            remote.api_url, remote.owner, remote.repo, remote.path
        )
    }

    fn dispatch_url(&self) -> String {
        let remote = &self.remote;
        format!(
            "{}/repos/{}/{}/dispatches",
            remote.api_url, remote.owner, remote.repo
        )
    }

    /// Unauthenticated read of the raw file; only works for public repositories.
    pub async fn fetch_raw(&self) -> Result<MoodStore, SyncError> {
        let response = self.http.get(self.raw_url()).send().await?;
        let response = ensure_success(response).await?;
        let store = response.json::<MoodStore>().await?;
        Ok(store.canonicalize_keys())
    }

    pub async fn file_meta(&self, token: Option<&str>) -> Result<FileMeta, SyncError> {
        let mut request = self
            .http
            .get(self.contents_url())
            .query(&[("ref", self.remote.branch.as_str())])
            .header(header::ACCEPT, GITHUB_ACCEPT);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(FileMeta::Missing);
        }
        let body = ensure_success(response)
            .await?
            .json::<ContentsResponse>()
            .await?;
        Ok(FileMeta::Present {
            sha: body.sha,
            content: body.content,
        })
    }

    pub async fn load(&self, token: Option<&str>) -> Result<RemoteLoad, SyncError> {
        match self.fetch_raw().await {
            Ok(store) => return Ok(RemoteLoad::Loaded(store)),
            Err(err) => debug!("raw read failed, trying contents API: {err}"),
        }

        match self.file_meta(token).await? {
            FileMeta::Missing => Ok(RemoteLoad::Missing),
            FileMeta::Present { content, .. } => {
                Ok(RemoteLoad::Loaded(decode_store(&content)?.canonicalize_keys()))
            }
        }
    }

    pub async fn write(&self, token: &str, store: &MoodStore) -> Result<WriteReceipt, SyncError> {
        match self.remote.mode {
            SyncMode::Contents => self.put_contents(token, store).await,
            SyncMode::Dispatch => self.dispatch(token, store).await,
        }
    }

    /// Reads the current sha, then creates or updates the file with it.
    pub async fn put_contents(
        &self,
        token: &str,
        store: &MoodStore,
    ) -> Result<WriteReceipt, SyncError> {
        // A failed marker read is treated as "no file yet"; the PUT will then
        // be rejected by the remote if the file does exist.
        let sha = match self.file_meta(Some(token)).await {
            Ok(FileMeta::Present { sha, .. }) => Some(sha),
            Ok(FileMeta::Missing) => None,
            Err(err) => {
                debug!("revision lookup failed before write: {err}");
                None
            }
        };
        let created = sha.is_none();

        let body = PutContentsBody {
            message: COMMIT_MESSAGE,
            content: encode_store(store)?,
            branch: &self.remote.branch,
            sha,
        };
        let response = self
            .http
            .put(self.contents_url())
            .header(header::ACCEPT, GITHUB_ACCEPT)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;

        info!(records = store.len(), created, "mood file written to remote");
        Ok(WriteReceipt::Committed { created })
    }

    /// Fires the automation event. Completion of the actual file write is not observable.
    pub async fn dispatch(&self, token: &str, store: &MoodStore) -> Result<WriteReceipt, SyncError> {
        let body = DispatchBody {
            event_type: &self.remote.dispatch_event,
            client_payload: DispatchPayload {
                moods: serde_json::to_string(store)?,
            },
        };
        let response = self
            .http
            .post(self.dispatch_url())
            .header(header::ACCEPT, GITHUB_ACCEPT)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;

        info!(records = store.len(), event = %self.remote.dispatch_event, "dispatch event sent");
        Ok(WriteReceipt::Dispatched)
    }
}

/// Pretty JSON, as UTF-8 bytes, in standard base64.
pub fn encode_store(store: &MoodStore) -> Result<String, SyncError> {
    let json = serde_json::to_string_pretty(store)?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Inverse of [`encode_store`]. The contents API wraps base64 at 60 columns.
pub fn decode_store(encoded: &str) -> Result<MoodStore, SyncError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    let text = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&text)?)
}

async fn ensure_success(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateKey, Mood};

    fn sample_store() -> MoodStore {
        let mut store = MoodStore::new();
        let first: DateKey = "2024-3-15".parse().unwrap();
        let second: DateKey = "2024-3-16".parse().unwrap();
        store.set_mood(&first, "😄", Some(Mood::Great), Some("Ünïcödé, 日本語, ☕".to_string()));
        store.set_mood(&second, "🌧", None, None);
        store
    }

    #[test]
    fn encoding_uses_utf8_bytes() {
        let store = sample_store();
        let encoded = encode_store(&store).unwrap();
        let bytes = STANDARD.decode(&encoded).unwrap();
        assert_eq!(bytes, serde_json::to_string_pretty(&store).unwrap().into_bytes());
    }

    #[test]
    fn non_ascii_survives_encode_and_decode() {
        let store = sample_store();
        let decoded = decode_store(&encode_store(&store).unwrap()).unwrap();
        assert_eq!(decoded, store);
    }

    #[test]
    fn decode_accepts_wrapped_lines() {
        let encoded = encode_store(&sample_store()).unwrap();
        let wrapped: String = encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| format!("{}\n", String::from_utf8_lossy(chunk)))
            .collect();
        assert_eq!(decode_store(&wrapped).unwrap(), sample_store());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_store("***"), Err(SyncError::Base64(_))));
        let not_json = STANDARD.encode("hello");
        assert!(matches!(decode_store(&not_json), Err(SyncError::Json(_))));
    }

    #[test]
    fn urls_follow_the_github_layout() {
        let client = SyncClient::new(RemoteConfig::github("alice", "moods")).unwrap();
        assert_eq!(
            client.raw_url(),
            "https://raw.githubusercontent.com/alice/moods/main/moods.json"
        );
        assert_eq!(
            client.contents_url(),
            "https://api.github.com/repos/alice/moods/contents/moods.json"
        );
        assert_eq!(
            client.dispatch_url(),
            "https://api.github.com/repos/alice/moods/dispatches"
        );
    }
}
