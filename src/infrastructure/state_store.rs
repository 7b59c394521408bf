//! Persisted per-site cursor state.
//!
//! A run must never lose its whole history to one truncated write, so
//! saves go through a temp file plus rename. A missing or corrupt state
//! file degrades to the first-run (everything-is-old) behavior.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::domain::SiteState;

/// Load state, defaulting on absence or corruption.
pub async fn load(path: &Path) -> SiteState {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(_) => return SiteState::default(),
    };
    match serde_json::from_str(&raw) {
        Ok(state) => state,
        Err(err) => {
            warn!(path = %path.display(), %err, "state file corrupt, starting fresh");
            SiteState::default()
        }
    }
}

/// Atomically replace the state file.
pub async fn save(path: &Path, state: &SiteState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating state dir {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(state).context("serializing state")?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json.as_bytes())
        .await
        .with_context(|| format!("writing state tmp {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming state into {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_and_corrupt_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("site.json");

        // Missing file: default state.
        assert!(load(&path).await.is_empty());

        let mut state = SiteState::default();
        state.ids.insert("a".to_string());
        state.ids.insert("b".to_string());
        state.head_id = "b".to_string();
        save(&path, &state).await.unwrap();
        assert_eq!(load(&path).await, state);

        // Corrupt file: default state again, no error.
        tokio::fs::write(&path, b"{not json").await.unwrap();
        assert!(load(&path).await.is_empty());
    }
}
