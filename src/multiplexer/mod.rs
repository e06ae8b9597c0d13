//! The terminal-multiplexer adapter (spec §4.A): a thin, mechanical wrapper
//! around tmux. It enumerates panes, sends keystrokes, captures content, and
//! starts/stops the output-mirroring pipe. It never interprets pane content.
//!
//! Scope note: spec.md scopes termtap to tmux only (§1, §6). Unlike workmux
//! -- this crate's teacher, which abstracts over tmux/WezTerm/Kitty -- the
//! `Multiplexer` trait here exists so the rest of the core (introspector,
//! handlers, stream, engine) never depends on tmux's CLI directly, not to
//! support multiple real backends. Only `TmuxBackend` is shipped.

pub mod tmux;
pub mod types;
pub mod util;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

pub use types::*;

/// Required operations of the terminal-multiplexer adapter (spec §4.A).
///
/// All failures surface as [`crate::error::TermtapError::Multiplexer`] with
/// tmux's own stderr preserved; implementations never interpret pane content.
pub trait Multiplexer: Send + Sync {
    /// Enumerate every pane tmux currently knows about.
    fn enumerate_panes(&self) -> Result<Vec<PaneInfo>>;

    /// Send keystrokes to a pane. For single-line `text`, sends verbatim plus
    /// `Enter` if `press_enter`. Multi-line text must go through
    /// [`Multiplexer::paste_buffer`] instead -- this method does not route.
    fn send_keys(&self, pane_id: &PaneId, text: &str, press_enter: bool) -> Result<()>;

    /// Send a symbolic key (e.g. the interrupt character, arrow keys).
    fn send_key(&self, pane_id: &PaneId, key_name: &str) -> Result<()>;

    /// Paste `content` atomically via a named paste buffer: create a buffer
    /// with a deterministic name derived from a hash of `content`, paste it
    /// into the pane, then delete the buffer (spec §4.A). Sends `Enter`
    /// afterwards so the pasted command executes.
    fn paste_buffer(&self, pane_id: &PaneId, content: &str) -> Result<()>;

    /// The pane's current visible (on-screen) content.
    fn capture_visible(&self, pane_id: &PaneId) -> Result<String>;

    /// The pane's full scrollback.
    fn capture_all(&self, pane_id: &PaneId) -> Result<String>;

    /// The last `n` lines of the pane's content.
    fn capture_last_n(&self, pane_id: &PaneId, n: u32) -> Result<String>;

    /// Begin mirroring the pane's output to `path`. No-op if already started.
    fn start_pipe(&self, pane_id: &PaneId, path: &Path) -> Result<()>;

    /// Stop mirroring. No-op if not running.
    fn stop_pipe(&self, pane_id: &PaneId) -> Result<()>;

    /// PID of the pane's foreground process group leader.
    fn get_leader_pid(&self, pane_id: &PaneId) -> Result<u32>;

    fn create_session(&self, params: CreateSessionParams) -> Result<PaneId>;

    fn create_window(&self, session: &str, name: &str, cwd: &Path) -> Result<PaneId>;

    fn split_pane(&self, pane_id: &PaneId, cwd: &Path, direction: SplitDirection) -> Result<PaneId>;

    fn kill_pane(&self, pane_id: &PaneId) -> Result<()>;

    fn kill_session(&self, name: &str) -> Result<()>;

    /// The pane tmux considers "current" from termtap's own environment
    /// (`$TMUX_PANE`), used to enforce the forbidden-pane rule (spec §4.A).
    fn current_pane_id(&self) -> Option<PaneId>;
}

/// Detect and construct the multiplexer backend. Always tmux (see module
/// docs); kept as a function (rather than a bare `TmuxBackend::new()` at
/// every call site) so tests can substitute a fake implementing the same
/// trait without touching call sites.
pub fn detect() -> Arc<dyn Multiplexer> {
    Arc::new(tmux::TmuxBackend::new())
}
