//! The structured error taxonomy a driver can match on (spec §7).
//!
//! Adapter- and introspector-level plumbing uses `anyhow::Result` for context
//! chains (ground truth: workmux's `cmd.rs`/`config.rs`); this module is the
//! narrow boundary those errors get converted into before reaching a driver,
//! the same way workmux's `ClausetError`-style crates keep one typed surface
//! over `anyhow`-chained internals.

use thiserror::Error;

/// Errors raised by the core (§7). `timeout` is deliberately absent: per spec
/// it is a terminal [`crate::engine::CommandResult`] status, not a raised error.
#[derive(Debug, Error)]
pub enum TermtapError {
    #[error("no pane matches address {address:?}")]
    AddressNotFound { address: String },

    #[error("address {address:?} is ambiguous: {candidates:?}")]
    AddressAmbiguous {
        address: String,
        candidates: Vec<String>,
    },

    #[error("no service named {service:?} in session {session:?}")]
    ServiceNotFound { session: String, service: String },

    #[error("refusing to operate on the supervisor's own pane")]
    CurrentPane,

    #[error("tmux command failed: {message}")]
    Multiplexer { message: String },

    #[error("stream I/O failed for pane {pane_id}: {message}")]
    Stream { pane_id: String, message: String },

    #[error("aborted by user")]
    AbortedByUser,
}

pub type Result<T> = std::result::Result<T, TermtapError>;
