use crate::state::{AppState, STATUS_REMOTE_DISABLED};
use crate::storage::{load_token, persist_moods};
use crate::sync::{RemoteLoad, WriteReceipt};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

pub const STATUS_LOADING: &str = "Loading…";
pub const STATUS_LOADED: &str = "Loaded";
pub const STATUS_NOT_FOUND: &str = "File not found (will create)";
pub const STATUS_LOAD_FAILED: &str = "Load failed (using local data)";
pub const STATUS_NO_TOKEN: &str = "No token, local only";
pub const STATUS_SAVING: &str = "Saving…";
pub const STATUS_SAVED: &str = "Saved";
pub const STATUS_DISPATCHED: &str = "Dispatched";
pub const STATUS_SAVE_FAILED: &str = "Save failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Disabled,
    NoCredential,
    /// Another save was still running; this one was dropped.
    AlreadyInFlight,
    Saved,
    Dispatched,
    Failed,
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Pulls the remote copy into the store. Failures leave local data in place.
/// Returns the resulting status line.
///
/// A loaded remote replaces the whole store once the request returns, so an
/// edit made while the load is in flight is overwritten, not merged.
pub async fn load_remote(state: &AppState) -> String {
    let Some(sync) = state.sync.as_ref() else {
        state.set_status(STATUS_REMOTE_DISABLED).await;
        return STATUS_REMOTE_DISABLED.to_string();
    };

    state.set_status(STATUS_LOADING).await;
    let token = load_token(&state.config.token_path).await;

    let status = match sync.load(token.as_deref()).await {
        Ok(RemoteLoad::Loaded(remote)) => {
            let mut session = state.data.lock().await;
            if remote.is_empty() && !session.store.is_empty() {
                info!("remote mood file is empty; keeping local data");
            } else {
                info!(records = remote.len(), "remote mood file loaded");
                session.store = remote;
                if let Err(err) = persist_moods(&state.config.data_path, &session.store).await {
                    error!("failed to mirror remote moods locally: {}", err.message);
                }
            }
            STATUS_LOADED
        }
        Ok(RemoteLoad::Missing) => {
            info!("remote mood file does not exist yet");
            STATUS_NOT_FOUND
        }
        Err(err) => {
            warn!("remote load failed: {err}");
            STATUS_LOAD_FAILED
        }
    };

    state.set_status(status).await;
    status.to_string()
}

/// Pushes the whole store to the remote. At most one save runs at a time;
/// a request arriving while one is outstanding is dropped, not queued.
pub async fn save_remote(state: &AppState) -> SaveOutcome {
    let Some(sync) = state.sync.as_ref() else {
        state.set_status(STATUS_REMOTE_DISABLED).await;
        return SaveOutcome::Disabled;
    };

    let Some(token) = load_token(&state.config.token_path).await else {
        state.set_status(STATUS_NO_TOKEN).await;
        return SaveOutcome::NoCredential;
    };

    let Some(_guard) = InFlight::acquire(&state.save_in_flight) else {
        info!("save already in flight; dropping request");
        return SaveOutcome::AlreadyInFlight;
    };

    let snapshot = {
        let mut session = state.data.lock().await;
        session.status = STATUS_SAVING.to_string();
        session.store.clone()
    };

    let (outcome, status) = match sync.write(&token, &snapshot).await {
        Ok(WriteReceipt::Committed { .. }) => (SaveOutcome::Saved, STATUS_SAVED),
        Ok(WriteReceipt::Dispatched) => (SaveOutcome::Dispatched, STATUS_DISPATCHED),
        Err(err) => {
            warn!("remote save failed: {err}");
            (SaveOutcome::Failed, STATUS_SAVE_FAILED)
        }
    };
    state.set_status(status).await;
    outcome
}
