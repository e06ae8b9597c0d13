//! Resolves the per-user state directory the stream sidecar lives under.
//!
//! Ground truth: `logger.rs`'s `determine_log_path`, which walks the same
//! `$XDG_STATE_HOME` -> `~/.local/state` -> cwd chain. Kept as a separate
//! module because the stream registry (not just the logger) needs it.

use std::path::{Path, PathBuf};

use anyhow::Result;

/// Root directory for termtap's persisted state (spec §6: "conventionally
/// `/tmp/<tool>/` or the XDG state directory" -- this picks the XDG path for
/// consistency with the logger).
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME")
        && !state_home.is_empty()
    {
        return Ok(PathBuf::from(state_home).join("termtap"));
    }

    if let Some(home_dir) = home::home_dir() {
        return Ok(home_dir.join(".local").join("state").join("termtap"));
    }

    Ok(std::env::current_dir()?.join(".termtap"))
}

/// Directory holding each pane's stream file + metadata sidecar.
pub fn streams_dir() -> Result<PathBuf> {
    Ok(state_dir()?.join("streams"))
}

/// Turn a PaneId (e.g. `%42`) into a filesystem-safe stem shared by the
/// `.stream` and `.json` files for that pane.
pub fn pane_file_stem(pane_id: &str) -> String {
    pane_id
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn stream_path(dir: &Path, pane_id: &str) -> PathBuf {
    dir.join(format!("{}.stream", pane_file_stem(pane_id)))
}

pub fn metadata_path(dir: &Path, pane_id: &str) -> PathBuf {
    dir.join(format!("{}.json", pane_file_stem(pane_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pane_file_stem_sanitizes_percent() {
        assert_eq!(pane_file_stem("%42"), "_42");
    }

    #[test]
    fn pane_file_stem_keeps_alphanumeric() {
        assert_eq!(pane_file_stem("pane0"), "pane0");
    }
}
