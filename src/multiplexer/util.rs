//! Backend-mechanical helpers shared by the tmux adapter.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic short buffer name derived from a hash of `content` (spec
/// §4.A: "create buffer with a deterministic short name derived from a hash
/// of the content"). Two calls with the same content always produce the same
/// name, so a caller that races itself (unlikely, but the per-pane lock in
/// §4.F serializes this anyway) doesn't collide on unrelated buffers.
pub fn paste_buffer_name(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("termtap_{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_content() {
        assert_eq!(paste_buffer_name("echo hi"), paste_buffer_name("echo hi"));
    }

    #[test]
    fn differs_for_different_content() {
        assert_ne!(paste_buffer_name("echo hi"), paste_buffer_name("echo bye"));
    }
}
