//! SSH handler (spec §4.C): requires interactive confirmation before
//! sending a command into a remote shell.

use std::sync::Arc;

use super::{BeforeSendOutcome, Handler, Verdict};
use crate::error::{Result, TermtapError};
use crate::hover::{HoverDialog, HoverResponse, AutoApproveHoverDialog};
use crate::pane::Pane;

pub struct SshHandler {
    hover: Arc<dyn HoverDialog>,
}

impl Default for SshHandler {
    fn default() -> Self {
        SshHandler {
            hover: Arc::new(AutoApproveHoverDialog),
        }
    }
}

impl SshHandler {
    pub fn with_hover(hover: Arc<dyn HoverDialog>) -> Self {
        SshHandler { hover }
    }
}

impl Handler for SshHandler {
    fn matches(&self, process_name: &str) -> bool {
        process_name == "ssh"
    }

    fn is_ready(&self, pane: &Pane) -> (Verdict, String) {
        // Readiness delegates to the same child/wait-channel logic as the
        // default handler (spec §4.C) -- ssh's own shell prompt looks
        // exactly like a local one once the tunnel is up.
        let chain = pane.process_chain();
        if chain.is_at_shell() {
            (Verdict::Ready, "remote shell at prompt".to_string())
        } else {
            (Verdict::Busy, "remote command running".to_string())
        }
    }

    fn on_before_send(&self, pane: &Pane, command: &str) -> Result<BeforeSendOutcome> {
        let body = format!("About to send to {}:\n  {command}", pane.address());
        match self.hover.confirm("Confirm command to SSH session", &body) {
            HoverResponse::Continue => Ok(BeforeSendOutcome::Proceed),
            HoverResponse::Edit(new_command) => Ok(BeforeSendOutcome::ProceedWithCommand(new_command)),
            HoverResponse::Abort => Err(TermtapError::AbortedByUser),
        }
    }
}
