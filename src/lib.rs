//! termtap: a process-aware supervisor over tmux sessions.
//!
//! The library is the core (address resolution, introspection, handlers,
//! stream, execution engine); `main.rs`/`cli.rs` are one consumer of it.

pub mod address;
pub mod cmd;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod hover;
pub mod initializer;
pub mod introspect;
pub mod logger;
pub mod multiplexer;
pub mod pane;
pub mod ready_pattern;
pub mod state_dir;
pub mod stream;

pub use address::PaneAddress;
pub use engine::{CommandResult, CommandStatus, ExecuteRequest};
pub use error::{Result, TermtapError};
pub use pane::{Pane, PaneContext};
