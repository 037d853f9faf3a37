use crate::config::Config;
use crate::models::MoodStore;
use crate::selection::{Selection, ViewState};
use crate::sync::{SyncClient, SyncError};
use chrono::NaiveDate;
use std::sync::{Arc, atomic::AtomicBool};
use tokio::sync::Mutex;

pub const STATUS_NOT_CONNECTED: &str = "Not connected";
pub const STATUS_REMOTE_DISABLED: &str = "Remote sync disabled";

/// Everything a gesture can change. Guarded by one lock, so only one
/// operation mutates it at a time.
#[derive(Debug)]
pub struct Session {
    pub store: MoodStore,
    pub selection: Selection,
    pub view: ViewState,
    /// Remote sync status line.
    pub status: String,
    /// Feedback for the last rejected gesture, or a local load warning.
    pub notice: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub data: Arc<Mutex<Session>>,
    pub sync: Option<SyncClient>,
    pub save_in_flight: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: Config, store: MoodStore, today: NaiveDate) -> Result<Self, SyncError> {
        let sync = config.remote.clone().map(SyncClient::new).transpose()?;
        let status = if sync.is_some() {
            STATUS_NOT_CONNECTED
        } else {
            STATUS_REMOTE_DISABLED
        };

        Ok(Self {
            config: Arc::new(config),
            data: Arc::new(Mutex::new(Session {
                store,
                selection: Selection::Idle,
                view: ViewState::starting_at(today),
                status: status.to_string(),
                notice: None,
            })),
            sync,
            save_in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    pub async fn set_status(&self, status: impl Into<String>) {
        self.data.lock().await.status = status.into();
    }

    pub async fn set_notice(&self, notice: Option<String>) {
        self.data.lock().await.notice = notice;
    }
}
