//! Python-family handler (spec §4.C).

use std::collections::HashSet;

use super::{Handler, Verdict};
use crate::pane::Pane;

/// Wait channels that indicate the interpreter is blocked on stdin, not
/// doing work (Linux kernel symbol names, spec §4.C).
const DEFAULT_WAITING_FOR_STDIN: &[&str] = &["do_select", "do_sys_poll", "poll_schedule_timeout"];

pub struct PythonHandler {
    waiting_for_stdin: HashSet<String>,
}

impl Default for PythonHandler {
    fn default() -> Self {
        PythonHandler {
            waiting_for_stdin: DEFAULT_WAITING_FOR_STDIN.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Handler for PythonHandler {
    fn matches(&self, process_name: &str) -> bool {
        matches!(process_name, "python" | "python3" | "ipython") || process_name.starts_with("python3.")
    }

    fn is_ready(&self, pane: &Pane) -> (Verdict, String) {
        let chain = pane.process_chain();
        let Some(process) = chain.process.as_ref() else {
            return (Verdict::Ready, "no process beyond shell".to_string());
        };

        if process.child_count > 0 {
            return (Verdict::Busy, "interpreter has an active child".to_string());
        }

        if process.wchan.is_empty() {
            return (Verdict::Unknown, "no wait-channel available on this platform".to_string());
        }

        if self.waiting_for_stdin.contains(&process.wchan) {
            (Verdict::Ready, format!("blocked on stdin ({})", process.wchan))
        } else {
            (Verdict::Busy, format!("blocked on {} (active computation)", process.wchan))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_common_python_names() {
        let handler = PythonHandler::default();
        assert!(handler.matches("python"));
        assert!(handler.matches("python3"));
        assert!(handler.matches("python3.12"));
        assert!(handler.matches("ipython"));
        assert!(!handler.matches("node"));
    }
}
