//! `/proc`-backed process table scan (Linux only).
//!
//! Ground truth: `other_examples`' procfs crate source confirms
//! `Process::wchan()` reads `/proc/<pid>/wchan` directly, which is exactly
//! the field spec §3/§4.B needs for handler classification.

use procfs::process::all_processes;

use super::{ProcessTable, RawProcess, parse_state};
use tracing::debug;

pub struct ProcfsSource;

impl super::ProcessSource for ProcfsSource {
    fn scan(&self) -> ProcessTable {
        let processes = match all_processes() {
            Ok(iter) => iter,
            Err(err) => {
                debug!(error = %err, "failed to enumerate /proc; returning empty table");
                return ProcessTable::from_raw(Vec::new());
            }
        };

        let mut raw = Vec::new();
        for proc in processes {
            let Ok(proc) = proc else { continue };
            let Ok(stat) = proc.stat() else { continue };

            let wchan = proc.wchan().unwrap_or_default();
            raw.push(RawProcess {
                pid: stat.pid as u32,
                ppid: stat.ppid as u32,
                name: stat.comm,
                state: parse_state(stat.state),
                wchan,
            });
        }
        ProcessTable::from_raw(raw)
    }
}
