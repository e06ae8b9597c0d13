//! The catch-all handler every registry ends with (spec §4.C).

use super::{Handler, Verdict};
use crate::pane::Pane;

#[derive(Debug, Default)]
pub struct DefaultHandler;

impl Handler for DefaultHandler {
    fn matches(&self, _process_name: &str) -> bool {
        true
    }

    fn is_ready(&self, pane: &Pane) -> (Verdict, String) {
        let chain = pane.process_chain();
        if chain.is_at_shell() {
            (Verdict::Ready, "shell at prompt".to_string())
        } else {
            let name = chain
                .process
                .as_ref()
                .map(|p| p.name.as_str())
                .unwrap_or("unknown");
            (Verdict::Busy, format!("process running: {name}"))
        }
    }
}
