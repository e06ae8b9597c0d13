//! `ps`-based process table scan for platforms without `/proc`.
//!
//! Ground truth: `other_examples`' `kiosk` (`agent/mod.rs`) falls back to
//! `pgrep`/`ps` shell-outs when it can't read `/proc`. termtap does the same
//! here, at the cost of never having a wait-channel (spec §4.B: "on systems
//! without a process filesystem exposing wait channels, the wait-channel
//! field is empty; this is valid but restricts classification").

use std::process::Command;

use tracing::debug;

use super::{ProcessTable, RawProcess, parse_state};

pub struct PsSource;

impl super::ProcessSource for PsSource {
    fn scan(&self) -> ProcessTable {
        let output = match Command::new("ps").args(["-eo", "pid,ppid,state,comm"]).output() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!(status = ?output.status.code(), "ps exited non-zero");
                return ProcessTable::from_raw(Vec::new());
            }
            Err(err) => {
                debug!(error = %err, "failed to spawn ps; returning empty table");
                return ProcessTable::from_raw(Vec::new());
            }
        };

        let text = String::from_utf8_lossy(&output.stdout);
        let mut raw = Vec::new();
        for line in text.lines().skip(1) {
            if let Some(entry) = parse_ps_line(line) {
                raw.push(entry);
            }
        }
        ProcessTable::from_raw(raw)
    }
}

fn parse_ps_line(line: &str) -> Option<RawProcess> {
    // `split_whitespace` collapses the runs of spaces `ps` pads its columns
    // with, unlike a fixed-arity split on a single whitespace char.
    let mut fields = line.split_whitespace();
    let pid: u32 = fields.next()?.parse().ok()?;
    let ppid: u32 = fields.next()?.parse().ok()?;
    let state_code = fields.next()?.chars().next()?;
    let name: String = fields.collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return None;
    }

    Some(RawProcess {
        pid,
        ppid,
        name,
        state: parse_state(state_code),
        wchan: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_ps_line() {
        let entry = parse_ps_line("1234  1 S bash").unwrap();
        assert_eq!(entry.pid, 1234);
        assert_eq!(entry.ppid, 1);
        assert_eq!(entry.name, "bash");
        assert_eq!(entry.wchan, "");
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(parse_ps_line("garbage").is_none());
    }
}
