//! Output stream (spec §4.D): the append-only byte mirror of a pane plus its
//! JSON metadata sidecar. This is the component the execution engine polls
//! for health and reads command output from.

pub mod metadata;

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entry in the stream sidecar (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMark {
    pub command: String,
    pub sent_at: DateTime<Utc>,
    pub start: u64,
    pub end: Option<u64>,
}

/// A single JSON document per pane (spec §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub pane_id: String,
    pub address: String,
    pub stream_started: DateTime<Utc>,
    pub commands: HashMap<String, CommandMark>,
    pub read_marks: HashMap<String, u64>,
    pub last_activity: DateTime<Utc>,
}

impl StreamMetadata {
    pub fn new(pane_id: String, address: String) -> Self {
        let now = Utc::now();
        StreamMetadata {
            pane_id,
            address,
            stream_started: now,
            commands: HashMap::new(),
            read_marks: HashMap::new(),
            last_activity: now,
        }
    }
}

const DEFAULT_READ_MARK: &str = "last_read";

/// A pane's stream: a byte mirror file plus its metadata sidecar, both
/// guarded by one mutex so metadata writes from the same supervisor
/// serialize (spec §4.D atomicity -- cross-process concurrency isn't
/// required).
pub struct Stream {
    stream_path: PathBuf,
    metadata_path: PathBuf,
    state: Mutex<StreamState>,
}

struct StreamState {
    metadata: Option<StreamMetadata>,
    /// File size as of the last health check, used to detect a stalled pipe.
    last_observed_size: u64,
}

impl Stream {
    pub fn new(stream_path: PathBuf, metadata_path: PathBuf) -> Self {
        Stream {
            stream_path,
            metadata_path,
            state: Mutex::new(StreamState {
                metadata: None,
                last_observed_size: 0,
            }),
        }
    }

    pub fn stream_path(&self) -> &Path {
        &self.stream_path
    }

    fn current_size(&self) -> Result<u64> {
        Ok(self.stream_path.metadata().map(|m| m.len()).unwrap_or(0))
    }

    /// Ensure the stream file exists and metadata is loaded or freshly
    /// created. Idempotent (spec §4.D, §8 invariant 7).
    pub fn ensure_started(&self, pane_id: &str, address: &str) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        if guard.metadata.is_some() {
            return Ok(());
        }

        if !self.stream_path.exists() {
            if let Some(dir) = self.stream_path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            File::create(&self.stream_path)
                .with_context(|| format!("failed to create stream file {}", self.stream_path.display()))?;
        }

        let loaded = metadata::load(&self.metadata_path)?;
        let mut meta = loaded.unwrap_or_else(|| StreamMetadata::new(pane_id.to_string(), address.to_string()));
        meta.read_marks.entry(DEFAULT_READ_MARK.to_string()).or_insert(0);
        metadata::save(&self.metadata_path, &meta)?;

        guard.last_observed_size = self.current_size()?;
        guard.metadata = Some(meta);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().unwrap().metadata.is_some()
    }

    /// Stop mirroring is the multiplexer adapter's job; this just flushes
    /// whatever's in memory back to disk.
    pub fn flush(&self) -> Result<()> {
        let guard = self.state.lock().unwrap();
        if let Some(meta) = guard.metadata.as_ref() {
            metadata::save(&self.metadata_path, meta)?;
        }
        Ok(())
    }

    /// Reset the staleness baseline to the current file size. Call this
    /// right after sending a command so the next [`is_healthy`](Self::is_healthy)
    /// check measures growth caused by that command alone, not whatever did
    /// or didn't happen while the previous command was running.
    pub fn reset_health_baseline(&self) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        guard.last_observed_size = self.current_size()?;
        Ok(())
    }

    /// "File size grew since the last baseline" health signal (spec §4.D,
    /// §9: checked once per send, against that send's own baseline).
    pub fn is_healthy(&self) -> Result<bool> {
        let mut guard = self.state.lock().unwrap();
        let current = self.current_size()?;
        let grew = current > guard.last_observed_size;
        guard.last_observed_size = current;
        Ok(grew || guard.metadata.as_ref().map(|m| m.commands.is_empty()).unwrap_or(true))
    }

    pub fn mark_command(&self, cmd_id: &str, command_text: &str) -> Result<()> {
        let size = self.current_size()?;
        let mut guard = self.state.lock().unwrap();
        let meta = guard.metadata.as_mut().context("stream not started")?;
        meta.commands.insert(
            cmd_id.to_string(),
            CommandMark {
                command: command_text.to_string(),
                sent_at: Utc::now(),
                start: size,
                end: None,
            },
        );
        meta.last_activity = Utc::now();
        metadata::save(&self.metadata_path, meta)
    }

    pub fn mark_command_end(&self, cmd_id: &str) -> Result<()> {
        let size = self.current_size()?;
        let mut guard = self.state.lock().unwrap();
        let meta = guard.metadata.as_mut().context("stream not started")?;
        if let Some(mark) = meta.commands.get_mut(cmd_id) {
            if mark.end.is_none() {
                mark.end = Some(size);
            }
        }
        meta.read_marks.insert(DEFAULT_READ_MARK.to_string(), size);
        metadata::save(&self.metadata_path, meta)
    }

    pub fn mark_read(&self, name: Option<&str>) -> Result<()> {
        let size = self.current_size()?;
        let name = name.unwrap_or(DEFAULT_READ_MARK);
        let mut guard = self.state.lock().unwrap();
        let meta = guard.metadata.as_mut().context("stream not started")?;
        meta.read_marks.insert(name.to_string(), size);
        metadata::save(&self.metadata_path, meta)
    }

    fn read_range(&self, start: u64, end: u64) -> Result<String> {
        let mut file = File::open(&self.stream_path)
            .with_context(|| format!("failed to open stream file {}", self.stream_path.display()))?;
        file.seek(SeekFrom::Start(start))?;
        let len = end.saturating_sub(start) as usize;
        let mut buf = vec![0u8; len];
        let read = file.read(&mut buf)?;
        buf.truncate(read);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn read_command_output(&self, cmd_id: &str) -> Result<String> {
        let (start, end) = {
            let guard = self.state.lock().unwrap();
            let meta = guard.metadata.as_ref().context("stream not started")?;
            let mark = meta
                .commands
                .get(cmd_id)
                .with_context(|| format!("no CommandMark for cmd_id {cmd_id}"))?;
            let end = match mark.end {
                Some(end) => end,
                None => self.current_size()?,
            };
            (mark.start, end)
        };
        self.read_range(start, end)
    }

    pub fn read_since(&self, name: Option<&str>) -> Result<String> {
        let name = name.unwrap_or(DEFAULT_READ_MARK);
        let start = {
            let guard = self.state.lock().unwrap();
            let meta = guard.metadata.as_ref().context("stream not started")?;
            *meta.read_marks.get(name).unwrap_or(&0)
        };
        let end = self.current_size()?;
        self.read_range(start, end.max(start))
    }

    pub fn read_all(&self) -> Result<String> {
        let end = self.current_size()?;
        self.read_range(0, end)
    }

    pub fn read_last_lines(&self, n: usize) -> Result<String> {
        let all = self.read_all()?;
        let lines: Vec<&str> = all.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].join("\n"))
    }
}

/// Supervisor-owned map from pane id to its [`Stream`] (spec §9:
/// "process-wide registries... reimplement as a value owned by the
/// supervisor and passed to each Pane"). One registry per supervisor
/// process; streams are created lazily on first lookup.
pub struct StreamRegistry {
    base_dir: PathBuf,
    streams: Mutex<HashMap<String, Arc<Stream>>>,
}

impl StreamRegistry {
    pub fn new(base_dir: PathBuf) -> Self {
        StreamRegistry {
            base_dir,
            streams: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, pane_id: &str) -> Arc<Stream> {
        let mut streams = self.streams.lock().unwrap();
        streams
            .entry(pane_id.to_string())
            .or_insert_with(|| {
                let stream_path = crate::state_dir::stream_path(&self.base_dir, pane_id);
                let metadata_path = crate::state_dir::metadata_path(&self.base_dir, pane_id);
                Arc::new(Stream::new(stream_path, metadata_path))
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    fn new_stream(dir: &Path) -> Stream {
        Stream::new(dir.join("pane.stream"), dir.join("pane.json"))
    }

    #[test]
    fn start_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let stream = new_stream(dir.path());
        stream.ensure_started("%1", "demo:0.0").unwrap();
        let size_before = stream.current_size().unwrap();
        stream.ensure_started("%1", "demo:0.0").unwrap();
        assert_eq!(stream.current_size().unwrap(), size_before);
    }

    #[test]
    fn command_mark_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let stream = new_stream(dir.path());
        stream.ensure_started("%1", "demo:0.0").unwrap();

        {
            let mut file = OpenOptions::new().append(true).open(stream.stream_path()).unwrap();
            write!(file, "prompt$ ").unwrap();
        }

        stream.mark_command("c1", "echo hi").unwrap();

        {
            let mut file = OpenOptions::new().append(true).open(stream.stream_path()).unwrap();
            write!(file, "hi\n").unwrap();
        }

        stream.mark_command_end("c1").unwrap();
        let output = stream.read_command_output("c1").unwrap();
        assert_eq!(output, "hi\n");
    }

    #[test]
    fn read_since_is_empty_with_no_new_output() {
        let dir = tempfile::tempdir().unwrap();
        let stream = new_stream(dir.path());
        stream.ensure_started("%1", "demo:0.0").unwrap();
        stream.mark_read(None).unwrap();
        assert_eq!(stream.read_since(None).unwrap(), "");
        assert_eq!(stream.read_since(None).unwrap(), "");
    }

    #[test]
    fn health_check_detects_growth() {
        let dir = tempfile::tempdir().unwrap();
        let stream = new_stream(dir.path());
        stream.ensure_started("%1", "demo:0.0").unwrap();
        // First check after start establishes the baseline but metadata has
        // no commands yet, so it reports healthy.
        assert!(stream.is_healthy().unwrap());

        stream.mark_command("c1", "echo hi").unwrap();
        stream.reset_health_baseline().unwrap();
        // No growth yet -- command just sent, no output written.
        assert!(!stream.is_healthy().unwrap());

        {
            let mut file = OpenOptions::new().append(true).open(stream.stream_path()).unwrap();
            write!(file, "hi\n").unwrap();
        }
        assert!(stream.is_healthy().unwrap());
    }

    #[test]
    fn health_baseline_does_not_carry_blame_to_the_next_command() {
        // A command that legitimately produces no output must not leave the
        // next command's pre-send state looking stale.
        let dir = tempfile::tempdir().unwrap();
        let stream = new_stream(dir.path());
        stream.ensure_started("%1", "demo:0.0").unwrap();

        stream.mark_command("quiet", "true").unwrap();
        stream.reset_health_baseline().unwrap();
        assert!(!stream.is_healthy().unwrap());
        stream.mark_command_end("quiet").unwrap();

        stream.mark_command("loud", "echo hi").unwrap();
        stream.reset_health_baseline().unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(stream.stream_path()).unwrap();
            write!(file, "hi\n").unwrap();
        }
        assert!(stream.is_healthy().unwrap());
    }

    #[test]
    fn registry_returns_same_stream_for_same_pane() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StreamRegistry::new(dir.path().to_path_buf());
        let a = registry.get_or_create("%1");
        let b = registry.get_or_create("%1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn registry_separates_distinct_panes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StreamRegistry::new(dir.path().to_path_buf());
        let a = registry.get_or_create("%1");
        let b = registry.get_or_create("%2");
        assert_ne!(a.stream_path(), b.stream_path());
    }
}
