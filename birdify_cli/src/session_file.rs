//! Persisted session: a JSON file under the user config dir so a restart can
//! restore the signed-in identity without re-entering credentials.

use anyhow::{Context, Result};
use birdify_core::models::Session;
use std::fs;
use std::path::{Path, PathBuf};

pub fn default_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("no config directory on this platform")?;
    Ok(base.join("birdify").join("session.json"))
}

pub fn load(path: &Path) -> Result<Option<Session>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read session file {}", path.display()))?;
    let session = serde_json::from_str(&raw)
        .with_context(|| format!("session file {} is corrupt", path.display()))?;
    Ok(Some(session))
}

pub fn save(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(session)?;
    fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn clear(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Session {
        Session {
            access_token: "tok".into(),
            user_id: "u1".into(),
            email: "u1@example.com".into(),
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.json");

        assert!(load(&path).expect("load missing").is_none());
        save(&path, &sample()).expect("save");
        let restored = load(&path).expect("load").expect("present");
        assert_eq!(restored.user_id, "u1");

        clear(&path).expect("clear");
        assert!(load(&path).expect("load cleared").is_none());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").expect("write");
        assert!(load(&path).is_err());
    }
}
