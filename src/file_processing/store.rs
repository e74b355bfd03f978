use crate::errors::AppError;
use crate::session::ChatSession;
use std::path::Path;
use tokio::fs;

/// Loads the saved conversation, or an empty one when none exists yet.
pub async fn load_session(path: &Path) -> Result<ChatSession, AppError> {
    if !path.exists() {
        log::debug!("No session at {}, starting fresh", path.display());
        return Ok(ChatSession::new());
    }

    let raw = fs::read_to_string(path).await?;
    let mut session: ChatSession = serde_json::from_str(&raw)?;
    let recovered = session.recover_interrupted();
    if recovered > 0 {
        log::warn!("{} interrupted reply(ies) marked superseded", recovered);
    }
    Ok(session)
}

pub async fn save_session(path: &Path, session: &ChatSession) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let raw = serde_json::to_string_pretty(session)?;
    fs::write(path, raw).await?;
    Ok(())
}

pub async fn remove_session(path: &Path) -> Result<bool, AppError> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).await?;
    Ok(true)
}
