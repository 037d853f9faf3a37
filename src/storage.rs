use crate::errors::AppError;
use crate::models::MoodStore;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, warn};

/// Result of reading the local copy. A warning means the file was unusable and
/// the store started empty.
#[derive(Debug, Default)]
pub struct LocalLoad {
    pub store: MoodStore,
    pub warning: Option<String>,
}

pub async fn load_moods(path: &Path) -> LocalLoad {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<MoodStore>(&bytes) {
            Ok(store) => LocalLoad {
                store: store.canonicalize_keys(),
                warning: None,
            },
            Err(err) => {
                warn!("failed to parse mood file {}: {err}", path.display());
                LocalLoad {
                    store: MoodStore::default(),
                    warning: Some("Saved moods were unreadable; starting empty".to_string()),
                }
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => LocalLoad::default(),
        Err(err) => {
            error!("failed to read mood file {}: {err}", path.display());
            LocalLoad {
                store: MoodStore::default(),
                warning: Some("Saved moods could not be read; starting empty".to_string()),
            }
        }
    }
}

/// Overwrites the local copy through a sibling temp file and a rename.
pub async fn persist_moods(path: &Path, store: &MoodStore) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(store).map_err(AppError::internal)?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, payload)
        .await
        .map_err(AppError::internal)?;
    fs::rename(&temp_path, path)
        .await
        .map_err(AppError::internal)?;
    Ok(())
}

pub async fn remove_moods(path: &Path) -> Result<(), AppError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(AppError::internal(err)),
    }
}

pub async fn load_token(path: &Path) -> Option<String> {
    match fs::read_to_string(path).await {
        Ok(token) => Some(token.trim().to_string()).filter(|token| !token.is_empty()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            error!("failed to read token file {}: {err}", path.display());
            None
        }
    }
}

pub async fn save_token(path: &Path, token: &str) -> Result<(), AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::bad_request("token must not be empty"));
    }
    fs::write(path, token).await.map_err(AppError::internal)?;
    restrict_permissions(path).await?;
    info!("access token stored");
    Ok(())
}

pub async fn clear_token(path: &Path) -> Result<(), AppError> {
    match fs::remove_file(path).await {
        Ok(()) => {
            info!("access token cleared");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(AppError::internal(err)),
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), AppError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(AppError::internal)
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), AppError> {
    Ok(())
}
