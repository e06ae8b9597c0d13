//! Shared value types for the multiplexer adapter (spec §3, §4.A).

use std::path::PathBuf;

/// Opaque identifier minted by tmux (conventionally `%<digits>`). Stable for
/// the life of the pane; compared by equality only (spec §3).
pub type PaneId = String;

/// One row of `enumerate_panes()` (spec §4.A).
#[derive(Debug, Clone)]
pub struct PaneInfo {
    pub pane_id: PaneId,
    pub session: String,
    pub window: usize,
    pub pane_index: usize,
    pub window_name: String,
    pub is_current_pane: bool,
    pub leader_pid: u32,
}

/// Direction for `split_pane`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

/// How aggressively to prefer the paste-buffer route over direct `send-keys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PastePreference {
    /// Paste buffer for multi-line / long commands, direct send otherwise (spec §4.F step 5).
    #[default]
    Auto,
    /// Always route through the paste buffer.
    Force,
    /// Never use the paste buffer; always send-keys directly (may be unsafe for
    /// multi-line text, but the caller asked for it explicitly).
    Never,
}

/// Parameters for creating a new tmux session.
#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub name: String,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub shell_command: Option<String>,
}
