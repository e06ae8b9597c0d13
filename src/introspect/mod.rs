//! Process introspector (spec §4.B): builds a process tree from a pane's
//! leader PID and reduces it to a [`ProcessChain`] the handler registry can
//! classify.
//!
//! Ground truth for the dual-source split: `other_examples`' `kiosk`
//! (`agent/mod.rs`) falls back from `/proc` reads to `pgrep`/`ps` shell-outs
//! when the process filesystem is unavailable; termtap mirrors that split as
//! [`procfs_source`] / [`fallback_source`] behind one [`ProcessSource`] seam.

pub mod fallback_source;
pub mod procfs_source;

use std::collections::{HashMap, HashSet};

use tracing::debug;

/// Coarse process state (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Sleeping,
    Stopped,
    Zombie,
    Unknown,
}

/// One entry in a pane's process tree (spec §3).
#[derive(Debug, Clone)]
pub struct ProcessNode {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    pub state: ProcessState,
    pub wchan: String,
    pub children: Vec<ProcessNode>,
}

/// Minimal view of a [`ProcessNode`] retained in a [`ProcessChain`] -- only
/// what handlers need to classify, not the whole subtree.
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub pid: u32,
    pub name: String,
    pub state: ProcessState,
    pub wchan: String,
    /// Direct child count in the scanned tree -- the python handler's
    /// "has no children" check (spec §4.C) needs this without keeping the
    /// whole subtree around.
    pub child_count: usize,
}

impl From<&ProcessNode> for ProcessSummary {
    fn from(node: &ProcessNode) -> Self {
        ProcessSummary {
            pid: node.pid,
            name: node.name.clone(),
            state: node.state,
            wchan: node.wchan.clone(),
            child_count: node.children.len(),
        }
    }
}

/// The reduced shell/process pair a handler classifies against (spec §3).
#[derive(Debug, Clone, Default)]
pub struct ProcessChain {
    /// The shallowest node whose name is a known shell.
    pub shell: Option<ProcessSummary>,
    /// The first non-shell, non-skipped descendant below the shell.
    pub process: Option<ProcessSummary>,
}

impl ProcessChain {
    /// A degraded chain used when the process table can't be read at all
    /// (spec §4.B failure semantics: shell `unknown`, process `none`).
    pub fn unknown() -> Self {
        ProcessChain::default()
    }

    pub fn is_at_shell(&self) -> bool {
        self.process.is_none()
    }
}

/// A flat scan of the OS process table, indexed by PID (spec §4.B).
#[derive(Debug, Default)]
pub struct ProcessTable {
    by_pid: HashMap<u32, RawProcess>,
    children_of: HashMap<u32, Vec<u32>>,
}

#[derive(Debug, Clone)]
struct RawProcess {
    pid: u32,
    ppid: u32,
    name: String,
    state: ProcessState,
    wchan: String,
}

impl ProcessTable {
    fn from_raw(processes: Vec<RawProcess>) -> Self {
        let mut by_pid = HashMap::with_capacity(processes.len());
        let mut children_of: HashMap<u32, Vec<u32>> = HashMap::new();
        for proc in processes {
            children_of.entry(proc.ppid).or_default().push(proc.pid);
            by_pid.insert(proc.pid, proc);
        }
        ProcessTable { by_pid, children_of }
    }

    /// Build the full subtree rooted at `pid`, or `None` if `pid` is not in
    /// the scanned table (e.g. it has already exited).
    pub fn subtree(&self, pid: u32) -> Option<ProcessNode> {
        let raw = self.by_pid.get(&pid)?;
        let children = self
            .children_of
            .get(&pid)
            .into_iter()
            .flatten()
            .filter_map(|child_pid| self.subtree(*child_pid))
            .collect();
        Some(ProcessNode {
            pid: raw.pid,
            ppid: raw.ppid,
            name: raw.name.clone(),
            state: raw.state,
            wchan: raw.wchan.clone(),
            children,
        })
    }
}

/// Scans the OS process table. Implementations never raise to callers for
/// a partial or unreadable table; they return what they could read.
pub trait ProcessSource: Send + Sync {
    fn scan(&self) -> ProcessTable;
}

/// Build the best available source for this platform: `/proc` on Linux,
/// `ps`-based elsewhere (spec §4.B, §9 platform caveat).
pub fn default_source() -> Box<dyn ProcessSource> {
    #[cfg(target_os = "linux")]
    {
        Box::new(procfs_source::ProcfsSource)
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(fallback_source::PsSource)
    }
}

/// Reduce the single "first child" chain under `root` into a [`ProcessChain`]
/// (spec §4.B). `known_shells` and `skip_wrappers` are externally configured
/// sets (workmux-style defaults apply when config supplies none).
pub fn build_chain(
    root: &ProcessNode,
    known_shells: &HashSet<String>,
    skip_wrappers: &HashSet<String>,
) -> ProcessChain {
    let chain = first_child_chain(root);

    let shell_index = chain.iter().position(|node| known_shells.contains(&node.name));
    let shell = shell_index.map(|i| ProcessSummary::from(chain[i]));

    let search_start = shell_index.map(|i| i + 1).unwrap_or(0);
    let process = chain
        .get(search_start..)
        .into_iter()
        .flatten()
        .find(|node| !skip_wrappers.contains(&node.name))
        .map(|node| ProcessSummary::from(*node));

    ProcessChain { shell, process }
}

/// The sibling-process caveat (spec §4.B): when a node has multiple
/// children, always take the first -- documented as a known limitation, not
/// a bug, and never panics on an empty-children node (the chain just ends).
fn first_child_chain(root: &ProcessNode) -> Vec<&ProcessNode> {
    let mut chain = vec![root];
    let mut current = root;
    while let Some(first_child) = current.children.first() {
        chain.push(first_child);
        current = first_child;
    }
    chain
}

pub fn default_known_shells() -> HashSet<String> {
    ["bash", "zsh", "fish", "sh", "dash"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn default_skip_wrappers() -> HashSet<String> {
    ["env", "xargs", "nice", "time"].into_iter().map(String::from).collect()
}

fn parse_state(code: char) -> ProcessState {
    match code {
        'R' => ProcessState::Running,
        'S' | 'D' | 'I' => ProcessState::Sleeping,
        'T' | 't' => ProcessState::Stopped,
        'Z' => ProcessState::Zombie,
        _ => {
            debug!(code, "unrecognized process state code");
            ProcessState::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(pid: u32, name: &str, children: Vec<ProcessNode>) -> ProcessNode {
        ProcessNode {
            pid,
            ppid: 0,
            name: name.to_string(),
            state: ProcessState::Sleeping,
            wchan: String::new(),
            children,
        }
    }

    #[test]
    fn chain_finds_shell_and_process() {
        let tree = node(1, "bash", vec![node(2, "vim", vec![])]);
        let chain = build_chain(&tree, &default_known_shells(), &default_skip_wrappers());
        assert_eq!(chain.shell.unwrap().name, "bash");
        assert_eq!(chain.process.unwrap().name, "vim");
    }

    #[test]
    fn chain_at_shell_with_no_descendant() {
        let tree = node(1, "zsh", vec![]);
        let chain = build_chain(&tree, &default_known_shells(), &default_skip_wrappers());
        assert_eq!(chain.shell.unwrap().name, "zsh");
        assert!(chain.process.is_none());
        assert!(chain.is_at_shell());
    }

    #[test]
    fn chain_skips_wrapper_to_find_process() {
        let tree = node(1, "bash", vec![node(2, "env", vec![node(3, "node", vec![])])]);
        let chain = build_chain(&tree, &default_known_shells(), &default_skip_wrappers());
        assert_eq!(chain.process.unwrap().name, "node");
    }

    #[test]
    fn chain_follows_only_first_child() {
        let tree = node(
            1,
            "bash",
            vec![node(2, "vim", vec![]), node(3, "ignored-sibling", vec![])],
        );
        let chain = build_chain(&tree, &default_known_shells(), &default_skip_wrappers());
        assert_eq!(chain.process.unwrap().name, "vim");
    }

    #[test]
    fn subtree_builds_nested_tree() {
        let table = ProcessTable::from_raw(vec![
            RawProcess {
                pid: 1,
                ppid: 0,
                name: "bash".to_string(),
                state: ProcessState::Sleeping,
                wchan: "wait".to_string(),
            },
            RawProcess {
                pid: 2,
                ppid: 1,
                name: "vim".to_string(),
                state: ProcessState::Running,
                wchan: String::new(),
            },
        ]);
        let tree = table.subtree(1).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].name, "vim");
    }

    #[test]
    fn subtree_missing_pid_is_none() {
        let table = ProcessTable::from_raw(vec![]);
        assert!(table.subtree(999).is_none());
    }

    #[test]
    fn state_parsing_covers_known_codes() {
        assert_eq!(parse_state('R'), ProcessState::Running);
        assert_eq!(parse_state('Z'), ProcessState::Zombie);
        assert_eq!(parse_state('?'), ProcessState::Unknown);
    }
}
