//! Ready-pattern matcher (spec §4.G): scans newly-appended stream bytes for
//! a configured readiness regex, remembering how far it has already looked
//! so each poll only inspects new output.

use regex::Regex;

/// Incremental matcher over a growing byte stream. One instance per
/// in-flight command with a `ready_pattern` set.
pub struct ReadyPatternMatcher {
    pattern: Regex,
    scanned_up_to: u64,
}

impl ReadyPatternMatcher {
    pub fn new(pattern: &str, start_offset: u64) -> Result<Self, regex::Error> {
        Ok(ReadyPatternMatcher {
            pattern: Regex::new(pattern)?,
            scanned_up_to: start_offset,
        })
    }

    /// Scan `full_text` (the command's full output so far, from its start
    /// offset) for a match in the unscanned tail. Returns true on first
    /// match; once matched the command latches ready, so callers stop
    /// polling this matcher.
    ///
    /// `full_text` is re-decoded lossily from a growing byte buffer on every
    /// poll, so a byte offset recorded on a previous call may no longer fall
    /// on a char boundary (a multibyte sequence that was partial last time
    /// can resolve to a different length once more bytes arrive). Walk back
    /// to the nearest boundary rather than slicing blindly.
    pub fn poll(&mut self, full_text: &str) -> bool {
        let mut already_scanned = (self.scanned_up_to as usize).min(full_text.len());
        while already_scanned > 0 && !full_text.is_char_boundary(already_scanned) {
            already_scanned -= 1;
        }
        let unscanned = &full_text[already_scanned..];
        let matched = self.pattern.is_match(unscanned);
        self.scanned_up_to = full_text.len() as u64;
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_on_new_bytes_only() {
        let mut matcher = ReadyPatternMatcher::new("Serving HTTP on ", 0).unwrap();
        assert!(!matcher.poll("Starting up...\n"));
        assert!(matcher.poll("Starting up...\nServing HTTP on 0.0.0.0:8000\n"));
    }

    #[test]
    fn does_not_rematch_already_scanned_text() {
        let mut matcher = ReadyPatternMatcher::new("ready", 0).unwrap();
        assert!(matcher.poll("ready\n"));
        // Scanned-up-to has advanced past "ready\n"; appending unrelated
        // text should not cause a spurious second match of already-seen text.
        assert!(!matcher.poll("ready\nmore output\n"));
    }

    #[test]
    fn rejects_invalid_pattern() {
        assert!(ReadyPatternMatcher::new("(unterminated", 0).is_err());
    }
}
