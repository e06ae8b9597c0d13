//! Handler registry (spec §4.C): classifies a pane's process chain into a
//! readiness verdict, and carries the optional send/complete side-effect
//! hooks (SSH confirmation, etc).
//!
//! Ground truth: workmux doesn't have a direct equivalent (it never
//! introspects pane processes), so the registration-order-with-fallback
//! shape here follows the "first matching wins, default always matches"
//! idiom used across this corpus' dispatch tables (e.g. the handler list
//! in `other_examples`' `kiosk`'s agent-kind detection).

pub mod default;
pub mod python;
pub mod ssh;

use crate::error::Result;
use crate::pane::Pane;

/// A readiness verdict (spec §4.C). `Unknown` means "keep polling" -- the
/// engine never treats it as ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ready,
    Busy,
    Unknown,
}

/// What a handler's `on_before_send` hook may tell the engine to do.
#[derive(Debug, Clone)]
pub enum BeforeSendOutcome {
    Proceed,
    ProceedWithCommand(String),
    Abort,
}

impl Default for BeforeSendOutcome {
    fn default() -> Self {
        BeforeSendOutcome::Proceed
    }
}

/// A process classifier plus optional side-effect hooks (spec §4.C).
///
/// No handler may block indefinitely -- the execution engine enforces the
/// overall timeout regardless of what a handler does inside these calls.
pub trait Handler: Send + Sync {
    /// Does this handler cover the pane's current process (or shell, if no
    /// process)?
    fn matches(&self, process_name: &str) -> bool;

    /// `(verdict, reason)` for the pane's current process chain.
    fn is_ready(&self, pane: &Pane) -> (Verdict, String);

    /// Called just before a command is sent. Default: no-op, proceed as-is.
    fn on_before_send(&self, _pane: &Pane, _command: &str) -> Result<BeforeSendOutcome> {
        Ok(BeforeSendOutcome::Proceed)
    }

    /// Called after a command completes. Default: no-op.
    fn on_after_complete(&self, _pane: &Pane, _status: &str) -> Result<()> {
        Ok(())
    }
}

/// Handlers are tried in registration order; the registry always ends with
/// a default handler whose `matches` is total (spec §4.C).
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// The registry shipped by default: Python-family and SSH handlers ahead
    /// of the catch-all default.
    pub fn with_defaults() -> Self {
        HandlerRegistry {
            handlers: vec![
                Box::new(python::PythonHandler::default()),
                Box::new(ssh::SshHandler::default()),
                Box::new(default::DefaultHandler),
            ],
        }
    }

    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Self {
        HandlerRegistry { handlers }
    }

    /// The first handler whose `matches` returns true for `process_name`.
    /// Always returns something: the registry's final entry must be total.
    pub fn resolve(&self, process_name: &str) -> &dyn Handler {
        for handler in &self.handlers {
            if handler.matches(process_name) {
                return handler.as_ref();
            }
        }
        unreachable!("HandlerRegistry must end with a total default handler")
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverMatches;
    impl Handler for NeverMatches {
        fn matches(&self, _process_name: &str) -> bool {
            false
        }
        fn is_ready(&self, _pane: &Pane) -> (Verdict, String) {
            (Verdict::Unknown, "unreachable".to_string())
        }
    }

    struct TaggedMatch(&'static str);
    impl Handler for TaggedMatch {
        fn matches(&self, process_name: &str) -> bool {
            process_name == self.0
        }
        fn is_ready(&self, _pane: &Pane) -> (Verdict, String) {
            (Verdict::Ready, self.0.to_string())
        }
    }

    #[test]
    fn first_match_wins() {
        let registry = HandlerRegistry::new(vec![
            Box::new(NeverMatches),
            Box::new(TaggedMatch("node")),
            Box::new(TaggedMatch("python")),
        ]);
        assert!(registry.resolve("node").matches("node"));
        assert!(!registry.resolve("node").matches("python"));
    }

    #[test]
    fn default_registry_ends_with_total_handler() {
        let registry = HandlerRegistry::with_defaults();
        assert!(
            registry
                .resolve("some-random-binary-name")
                .matches("some-random-binary-name")
        );
    }
}
