//! tmux backend implementation of the [`Multiplexer`] trait.
//!
//! Ground truth: workmux's `src/multiplexer/tmux.rs` -- same `Cmd`-based
//! shelling-out style, same `tmux_cmd`/`tmux_query` helper split. The set of
//! operations implemented here is narrower: termtap needs pane introspection
//! and the output pipe, not workmux's window-status/sandbox/handshake
//! machinery.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};

use crate::cmd::Cmd;

use super::types::*;
use super::{Multiplexer, util};

/// tmux backend. Holds no state of its own -- every call shells out.
#[derive(Debug, Default)]
pub struct TmuxBackend;

impl TmuxBackend {
    pub fn new() -> Self {
        Self
    }

    fn tmux_cmd(&self, args: &[&str]) -> Result<()> {
        Cmd::new("tmux")
            .args(args)
            .run()
            .with_context(|| format!("tmux command failed: {:?}", args))?;
        Ok(())
    }

    fn tmux_query(&self, args: &[&str]) -> Result<String> {
        Cmd::new("tmux")
            .args(args)
            .run_and_capture_stdout()
            .with_context(|| format!("tmux query failed: {:?}", args))
    }

    fn path_str(path: &Path) -> Result<&str> {
        path.to_str()
            .ok_or_else(|| anyhow!("path contains non-UTF8 characters: {}", path.display()))
    }

    /// `#{pane_pipe}` is `1` while a pipe-pane is active, `0` otherwise.
    fn pipe_active(&self, pane_id: &PaneId) -> Result<bool> {
        let out = self.tmux_query(&["display-message", "-p", "-t", pane_id, "#{pane_pipe}"])?;
        Ok(out.trim() == "1")
    }
}

impl Multiplexer for TmuxBackend {
    fn enumerate_panes(&self) -> Result<Vec<PaneInfo>> {
        let current = self.current_pane_id();
        let format = "#{pane_id}\t#{session_name}\t#{window_index}\t#{pane_index}\t#{window_name}\t#{pane_pid}";
        let output = self
            .tmux_query(&["list-panes", "-a", "-F", format])
            .unwrap_or_default();

        let mut panes = Vec::new();
        for line in output.lines() {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 6 {
                continue;
            }
            let pane_id = parts[0].to_string();
            let is_current_pane = current.as_deref() == Some(pane_id.as_str());
            panes.push(PaneInfo {
                pane_id,
                session: parts[1].to_string(),
                window: parts[2].parse().unwrap_or(0),
                pane_index: parts[3].parse().unwrap_or(0),
                window_name: parts[4].to_string(),
                is_current_pane,
                leader_pid: parts[5].parse().unwrap_or(0),
            });
        }
        Ok(panes)
    }

    fn send_keys(&self, pane_id: &PaneId, text: &str, press_enter: bool) -> Result<()> {
        self.tmux_cmd(&["send-keys", "-t", pane_id, "-l", text])?;
        if press_enter {
            self.tmux_cmd(&["send-keys", "-t", pane_id, "Enter"])?;
        }
        Ok(())
    }

    fn send_key(&self, pane_id: &PaneId, key_name: &str) -> Result<()> {
        self.tmux_cmd(&["send-keys", "-t", pane_id, key_name])
    }

    fn paste_buffer(&self, pane_id: &PaneId, content: &str) -> Result<()> {
        let name = util::paste_buffer_name(content);

        let mut child = Command::new("tmux")
            .args(["load-buffer", "-b", name.as_str(), "-"])
            .stdin(Stdio::piped())
            .spawn()
            .context("failed to spawn tmux load-buffer")?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(content.as_bytes())
                .context("failed to write to tmux buffer")?;
        }
        let status = child.wait().context("failed to wait for tmux load-buffer")?;
        if !status.success() {
            return Err(anyhow!("tmux load-buffer failed"));
        }

        // -d deletes the buffer after pasting, so the caller's "delete buffer"
        // step (spec §4.A) happens atomically with the paste.
        self.tmux_cmd(&["paste-buffer", "-b", &name, "-t", pane_id, "-d"])?;
        self.tmux_cmd(&["send-keys", "-t", pane_id, "Enter"])
    }

    fn capture_visible(&self, pane_id: &PaneId) -> Result<String> {
        self.tmux_query(&["capture-pane", "-p", "-t", pane_id])
    }

    fn capture_all(&self, pane_id: &PaneId) -> Result<String> {
        self.tmux_query(&["capture-pane", "-p", "-t", pane_id, "-S", "-"])
    }

    fn capture_last_n(&self, pane_id: &PaneId, n: u32) -> Result<String> {
        let start = format!("-{n}");
        self.tmux_query(&["capture-pane", "-p", "-t", pane_id, "-S", &start])
    }

    fn start_pipe(&self, pane_id: &PaneId, path: &Path) -> Result<()> {
        if self.pipe_active(pane_id).unwrap_or(false) {
            return Ok(());
        }
        let path_str = Self::path_str(path)?;
        let shell_cmd = format!("cat >> {}", shell_quote(path_str));
        self.tmux_cmd(&["pipe-pane", "-t", pane_id, &shell_cmd])
    }

    fn stop_pipe(&self, pane_id: &PaneId) -> Result<()> {
        if !self.pipe_active(pane_id).unwrap_or(true) {
            return Ok(());
        }
        self.tmux_cmd(&["pipe-pane", "-t", pane_id])
    }

    fn get_leader_pid(&self, pane_id: &PaneId) -> Result<u32> {
        let out = self.tmux_query(&["display-message", "-p", "-t", pane_id, "#{pane_pid}"])?;
        out.trim()
            .parse()
            .with_context(|| format!("unexpected pane_pid output: {out:?}"))
    }

    fn create_session(&self, params: CreateSessionParams) -> Result<PaneId> {
        let cwd = Self::path_str(&params.cwd)?;
        let env_args: Vec<String> = params.env.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let mut cmd = Cmd::new("tmux").args(&["new-session", "-d", "-s", &params.name, "-c", cwd]);
        for pair in &env_args {
            cmd = cmd.arg("-e").arg(pair);
        }
        cmd = cmd.args(&["-P", "-F", "#{pane_id}"]);
        if let Some(shell_cmd) = &params.shell_command {
            cmd = cmd.arg(shell_cmd);
        }
        let pane_id = cmd
            .run_and_capture_stdout()
            .context("failed to create tmux session")?;
        Ok(pane_id.trim().to_string())
    }

    fn create_window(&self, session: &str, name: &str, cwd: &Path) -> Result<PaneId> {
        let cwd = Self::path_str(cwd)?;
        let target = format!("={session}");
        let pane_id = Cmd::new("tmux")
            .args(&[
                "new-window", "-d", "-t", &target, "-n", name, "-c", cwd, "-P", "-F", "#{pane_id}",
            ])
            .run_and_capture_stdout()
            .context("failed to create tmux window")?;
        Ok(pane_id.trim().to_string())
    }

    fn split_pane(&self, pane_id: &PaneId, cwd: &Path, direction: SplitDirection) -> Result<PaneId> {
        let cwd = Self::path_str(cwd)?;
        let split_arg = match direction {
            SplitDirection::Horizontal => "-h",
            SplitDirection::Vertical => "-v",
        };
        let new_pane_id = Cmd::new("tmux")
            .args(&[
                "split-window", split_arg, "-t", pane_id, "-c", cwd, "-P", "-F", "#{pane_id}",
            ])
            .run_and_capture_stdout()
            .context("failed to split pane")?;
        Ok(new_pane_id.trim().to_string())
    }

    fn kill_pane(&self, pane_id: &PaneId) -> Result<()> {
        self.tmux_cmd(&["kill-pane", "-t", pane_id])
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        let target = format!("={name}");
        self.tmux_cmd(&["kill-session", "-t", &target])
    }

    fn current_pane_id(&self) -> Option<PaneId> {
        std::env::var("TMUX_PANE").ok()
    }
}

/// Minimal POSIX single-quote escaping for paths embedded in a pipe-pane shell command.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r#"'\''"#))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r#"'it'\''s'"#);
    }

    #[test]
    fn shell_quote_plain_path() {
        assert_eq!(shell_quote("/tmp/foo.stream"), "'/tmp/foo.stream'");
    }
}
