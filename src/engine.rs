//! Execution engine (spec §4.F): drives a single `execute()` call from
//! command text to a completed [`CommandResult`], polling the stream and
//! the pane's handler until ready, timed out, or aborted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, trace, warn};

use crate::error::{Result, TermtapError};
use crate::handlers::{BeforeSendOutcome, Verdict};
use crate::multiplexer::PastePreference;
use crate::pane::Pane;
use crate::ready_pattern::ReadyPatternMatcher;

/// A command routes through the paste buffer above this size, or if it
/// contains a newline (spec §4.F step 5, §8 boundary behaviour).
const PASTE_THRESHOLD_BYTES: usize = 1000;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub command: String,
    pub wait: bool,
    pub timeout_secs: f64,
    pub ready_pattern: Option<String>,
    pub paste: PastePreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Completed,
    Ready,
    Timeout,
    Aborted,
    Running,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Completed => "completed",
            CommandStatus::Ready => "ready",
            CommandStatus::Timeout => "timeout",
            CommandStatus::Aborted => "aborted",
            CommandStatus::Running => "running",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub cmd_id: String,
    pub status: CommandStatus,
    pub output: String,
    pub process: Option<String>,
    pub shell: Option<String>,
    pub pane_address: String,
    pub elapsed_seconds: f64,
}

/// Per-pane mutexes serializing execution (spec §9: "a mutex per pane for
/// execution serialization"). Keyed by PaneId, owned by the supervisor and
/// shared across every Pane value addressing the same pane.
#[derive(Default)]
pub struct ExecutionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ExecutionLocks {
    pub fn lock_for(&self, pane_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(pane_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}

fn mint_cmd_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    format!("{nanos:x}-{seq:x}")
}

fn mux_err(e: anyhow::Error) -> TermtapError {
    TermtapError::Multiplexer { message: e.to_string() }
}

fn stream_err(pane_id: &str, e: anyhow::Error) -> TermtapError {
    TermtapError::Stream {
        pane_id: pane_id.to_string(),
        message: e.to_string(),
    }
}

/// Run `request` against `pane` (spec §4.F).
pub fn execute(pane: &Pane, request: ExecuteRequest) -> Result<CommandResult> {
    // Step 1: reject the forbidden pane.
    if pane.is_current() {
        return Err(TermtapError::CurrentPane);
    }

    let lock = pane.context().execution_locks.lock_for(pane.pane_id());
    let _guard = lock.lock().unwrap();

    let stream = pane.stream();
    let pane_id = pane.pane_id().clone();
    let address = pane.address();

    // Step 2: ensure the stream is started, seeding last_read at 0 for a
    // brand-new stream.
    let was_started = stream.is_started();
    stream
        .ensure_started(&pane_id, &address)
        .map_err(|e| stream_err(&pane_id, e))?;
    if !was_started {
        stream.mark_read(None).map_err(|e| stream_err(&pane_id, e))?;
    }
    pane.context()
        .multiplexer
        .start_pipe(&pane_id, stream.stream_path())
        .map_err(mux_err)?;

    // Step 4: mint cmd_id and mark the command start.
    let cmd_id = mint_cmd_id();
    stream
        .mark_command(&cmd_id, &request.command)
        .map_err(|e| stream_err(&pane_id, e))?;

    // Step 5: resolve the send method.
    let use_paste = match request.paste {
        PastePreference::Force => true,
        PastePreference::Never => false,
        PastePreference::Auto => request.command.contains('\n') || request.command.len() >= PASTE_THRESHOLD_BYTES,
    };

    // Step 6: on_before_send hook.
    let handler = pane.handler();
    let command_to_send = match handler.on_before_send(pane, &request.command)? {
        BeforeSendOutcome::Proceed => request.command.clone(),
        BeforeSendOutcome::ProceedWithCommand(replacement) => replacement,
        BeforeSendOutcome::Abort => return Err(TermtapError::AbortedByUser),
    };

    // Step 7: send, recording a monotonic start instant.
    let start = Instant::now();
    if use_paste {
        pane.context()
            .multiplexer
            .paste_buffer(&pane_id, &command_to_send)
            .map_err(mux_err)?;
    } else {
        pane.context()
            .multiplexer
            .send_keys(&pane_id, &command_to_send, true)
            .map_err(mux_err)?;
    }
    // Baseline for this send's own staleness check (spec §9: checked across
    // the first poll after sending, never against leftover state from
    // whatever the previous command did or didn't print).
    stream.reset_health_baseline().map_err(|e| stream_err(&pane_id, e))?;

    // Step 8: return immediately for fire-and-forget sends.
    if !request.wait {
        return Ok(CommandResult {
            cmd_id,
            status: CommandStatus::Running,
            output: String::new(),
            process: pane.process_name(),
            shell: pane.shell_name(),
            pane_address: address,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        });
    }

    // Step 9: poll until ready / timeout / aborted.
    let timeout = Duration::from_secs_f64(request.timeout_secs.max(0.0));
    // `read_command_output` below always returns text relative to this
    // command's own start, so the matcher starts scanning from 0 regardless
    // of where the command begins in the underlying stream file.
    let mut ready_matcher = request
        .ready_pattern
        .as_deref()
        .map(|pattern| ReadyPatternMatcher::new(pattern, 0))
        .transpose()
        .map_err(|e| TermtapError::Multiplexer {
            message: format!("invalid ready_pattern: {e}"),
        })?;

    let mut health_checked = false;
    let status = loop {
        if start.elapsed() >= timeout {
            break CommandStatus::Timeout;
        }

        if let Some(matcher) = ready_matcher.as_mut() {
            let text = stream.read_command_output(&cmd_id).unwrap_or_default();
            if matcher.poll(&text) {
                break CommandStatus::Ready;
            }
        }

        pane.refresh();
        let (verdict, reason) = handler.is_ready(pane);
        trace!(%pane_id, ?verdict, reason, "poll tick");
        match verdict {
            Verdict::Ready => break CommandStatus::Completed,
            Verdict::Busy | Verdict::Unknown => {}
        }

        if pane.context().multiplexer.get_leader_pid(&pane_id).is_err() {
            break CommandStatus::Aborted;
        }

        thread::sleep(POLL_INTERVAL);

        // Checked once, on the first poll after sending: did the pipe
        // produce anything at all? If not, it may have died mid-command;
        // restart it so the rest of the poll loop still sees new output.
        if !health_checked {
            health_checked = true;
            if !stream.is_healthy().map_err(|e| stream_err(&pane_id, e))? {
                warn!(%pane_id, %cmd_id, "stream pipe produced no output after send, restarting");
                pane.context().multiplexer.stop_pipe(&pane_id).map_err(mux_err)?;
                pane.context()
                    .multiplexer
                    .start_pipe(&pane_id, stream.stream_path())
                    .map_err(mux_err)?;
            }
        }
    };

    // Step 10: close the mark, read the output.
    stream.mark_command_end(&cmd_id).map_err(|e| stream_err(&pane_id, e))?;
    let mut output = stream.read_command_output(&cmd_id).map_err(|e| stream_err(&pane_id, e))?;
    output = strip_command_echo(&output, &command_to_send);

    // Step 11: on_after_complete hook.
    handler.on_after_complete(pane, status.as_str())?;

    debug!(%pane_id, %cmd_id, status = status.as_str(), "command finished");

    // Step 12.
    Ok(CommandResult {
        cmd_id,
        status,
        output,
        process: pane.process_name(),
        shell: pane.shell_name(),
        pane_address: address,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    })
}

/// Strip a leading line that echoes the sent command, a known heuristic
/// this component preserves from the system it was distilled from (spec §9
/// open question: "preserve this behaviour but flag it").
fn strip_command_echo(output: &str, command: &str) -> String {
    let command_first_line = command.lines().next().unwrap_or(command).trim();
    match output.split_once('\n') {
        Some((first, rest)) if first.trim() == command_first_line => rest.to_string(),
        _ => output.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_matching_echo_line() {
        let output = "echo hi\nhi\n";
        assert_eq!(strip_command_echo(output, "echo hi"), "hi\n");
    }

    #[test]
    fn leaves_output_untouched_when_no_echo() {
        let output = "hi\n";
        assert_eq!(strip_command_echo(output, "echo hi"), "hi\n");
    }

    #[test]
    fn command_status_strings_match_spec_vocabulary() {
        assert_eq!(CommandStatus::Completed.as_str(), "completed");
        assert_eq!(CommandStatus::Ready.as_str(), "ready");
        assert_eq!(CommandStatus::Timeout.as_str(), "timeout");
        assert_eq!(CommandStatus::Aborted.as_str(), "aborted");
        assert_eq!(CommandStatus::Running.as_str(), "running");
    }
}
