use std::{env, path::PathBuf};
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/moods.json";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_REMOTE_PATH: &str = "moods.json";
const DEFAULT_DISPATCH_EVENT: &str = "update-moods";
const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_RAW_URL: &str = "https://raw.githubusercontent.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MOOD_REMOTE_REPO must look like 'owner/repo', got '{0}'")]
    InvalidRepo(String),
    #[error("MOOD_SYNC_MODE must be 'contents' or 'dispatch', got '{0}'")]
    InvalidMode(String),
}

/// How saves reach the remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Authenticated create-or-update through the contents API.
    Contents,
    /// A repository dispatch event; an external workflow writes the file.
    Dispatch,
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
    pub mode: SyncMode,
    pub dispatch_event: String,
    pub api_url: String,
    pub raw_url: String,
}

impl RemoteConfig {
    pub fn github(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: DEFAULT_BRANCH.to_string(),
            path: DEFAULT_REMOTE_PATH.to_string(),
            mode: SyncMode::Contents,
            dispatch_event: DEFAULT_DISPATCH_EVENT.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            raw_url: DEFAULT_RAW_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub token_path: PathBuf,
    pub remote: Option<RemoteConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = var("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let data_path = var("MOOD_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));
        let token_path = var("MOOD_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_path.with_extension("token"));

        let remote = match var("MOOD_REMOTE_REPO") {
            None => None,
            Some(slug) => {
                let (owner, repo) = slug
                    .split_once('/')
                    .filter(|(owner, repo)| {
                        !owner.is_empty() && !repo.is_empty() && !repo.contains('/')
                    })
                    .ok_or_else(|| ConfigError::InvalidRepo(slug.clone()))?;

                let mut remote = RemoteConfig::github(owner, repo);
                if let Some(branch) = var("MOOD_REMOTE_BRANCH") {
                    remote.branch = branch;
                }
                if let Some(path) = var("MOOD_REMOTE_PATH") {
                    remote.path = path.trim_start_matches('/').to_string();
                }
                if let Some(mode) = var("MOOD_SYNC_MODE") {
                    remote.mode = match mode.to_ascii_lowercase().as_str() {
                        "contents" => SyncMode::Contents,
                        "dispatch" => SyncMode::Dispatch,
                        _ => return Err(ConfigError::InvalidMode(mode)),
                    };
                }
                if let Some(event) = var("MOOD_DISPATCH_EVENT") {
                    remote.dispatch_event = event;
                }
                if let Some(url) = var("MOOD_GITHUB_API_URL") {
                    remote.api_url = url.trim_end_matches('/').to_string();
                }
                if let Some(url) = var("MOOD_GITHUB_RAW_URL") {
                    remote.raw_url = url.trim_end_matches('/').to_string();
                }
                Some(remote)
            }
        };

        Ok(Self {
            port,
            data_path,
            token_path,
            remote,
        })
    }
}
