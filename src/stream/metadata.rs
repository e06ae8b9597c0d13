//! On-disk JSON sidecar for [`super::StreamMetadata`] (spec §4.D, §6).
//!
//! Atomicity: write to a temp file in the same directory, then rename over
//! the target -- the same pattern this corpus uses wherever a sidecar must
//! survive a crash mid-write.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::StreamMetadata;

pub fn load(path: &Path) -> Result<Option<StreamMetadata>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read stream metadata at {}", path.display()))?;
    let metadata: StreamMetadata = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse stream metadata at {}", path.display()))?;
    Ok(Some(metadata))
}

pub fn save(path: &Path, metadata: &StreamMetadata) -> Result<()> {
    let dir = path.parent().context("metadata path has no parent directory")?;
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".termtap-metadata-")
        .tempfile_in(dir)
        .context("failed to create temp file for stream metadata")?;

    serde_json::to_writer_pretty(tmp.as_file_mut(), metadata).context("failed to serialize stream metadata")?;

    tmp.persist(path)
        .map_err(|e| anyhow::anyhow!("failed to persist stream metadata to {}: {}", path.display(), e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamMetadata;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pane.json");
        let metadata = StreamMetadata::new("%1".to_string(), "demo:0.0".to_string());
        save(&path, &metadata).unwrap();
        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.pane_id, "%1");
        assert_eq!(loaded.address, "demo:0.0");
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(load(&path).unwrap().is_none());
    }
}
