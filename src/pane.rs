//! Pane object (spec §4.E): a cheap value composing a PaneId with the
//! introspector, handler registry, and stream registry. Derived attributes
//! are cached on first access and invalidated on `refresh()` or after any
//! operation that could change them (spec §9: explicit cache fields, no
//! implicit global caches).

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::engine::ExecutionLocks;
use crate::handlers::{Handler, HandlerRegistry};
use crate::introspect::{self, ProcessChain, ProcessSource};
use crate::multiplexer::{Multiplexer, PaneId};
use crate::stream::{Stream, StreamRegistry};

/// Shared, supervisor-scoped collaborators a Pane needs. Cloned (cheaply,
/// via `Arc`) into every Pane built from the same supervisor.
#[derive(Clone)]
pub struct PaneContext {
    pub multiplexer: Arc<dyn Multiplexer>,
    pub process_source: Arc<dyn ProcessSource>,
    pub handlers: Arc<HandlerRegistry>,
    pub stream_registry: Arc<StreamRegistry>,
    pub known_shells: Arc<HashSet<String>>,
    pub skip_wrappers: Arc<HashSet<String>>,
    pub execution_locks: Arc<ExecutionLocks>,
}

#[derive(Default)]
struct PaneCache {
    address: Option<String>,
    leader_pid: Option<u32>,
    process_chain: Option<ProcessChain>,
    visible_content: Option<String>,
}

pub struct Pane {
    pane_id: PaneId,
    ctx: PaneContext,
    cache: RwLock<PaneCache>,
}

impl Pane {
    pub fn new(pane_id: PaneId, ctx: PaneContext) -> Self {
        Pane {
            pane_id,
            ctx,
            cache: RwLock::new(PaneCache::default()),
        }
    }

    pub fn pane_id(&self) -> &PaneId {
        &self.pane_id
    }

    pub fn context(&self) -> &PaneContext {
        &self.ctx
    }

    /// Drop every cached derived attribute so the next access recomputes it.
    pub fn refresh(&self) {
        *self.cache.write().unwrap() = PaneCache::default();
    }

    pub fn is_current(&self) -> bool {
        self.ctx.multiplexer.current_pane_id().as_deref() == Some(self.pane_id.as_str())
    }

    /// Canonical `session:window.pane` address string (spec §4.E). Falls
    /// back to the raw PaneId if the pane has already vanished.
    pub fn address(&self) -> String {
        if let Some(cached) = self.cache.read().unwrap().address.clone() {
            return cached;
        }
        let address = self
            .ctx
            .multiplexer
            .enumerate_panes()
            .ok()
            .and_then(|panes| panes.into_iter().find(|p| p.pane_id == self.pane_id))
            .map(|p| format!("{}:{}.{}", p.session, p.window, p.pane_index))
            .unwrap_or_else(|| self.pane_id.clone());
        self.cache.write().unwrap().address = Some(address.clone());
        address
    }

    pub fn leader_pid(&self) -> anyhow::Result<u32> {
        if let Some(pid) = self.cache.read().unwrap().leader_pid {
            return Ok(pid);
        }
        let pid = self.ctx.multiplexer.get_leader_pid(&self.pane_id)?;
        self.cache.write().unwrap().leader_pid = Some(pid);
        Ok(pid)
    }

    /// The pane's process chain (spec §4.B). Never fails to callers:
    /// introspection errors degrade to an unknown chain, per §4.B/§7.
    pub fn process_chain(&self) -> ProcessChain {
        if let Some(chain) = self.cache.read().unwrap().process_chain.clone() {
            return chain;
        }

        let chain = match self.leader_pid() {
            Ok(pid) => {
                let table = self.ctx.process_source.scan();
                match table.subtree(pid) {
                    Some(root) => introspect::build_chain(&root, &self.ctx.known_shells, &self.ctx.skip_wrappers),
                    None => ProcessChain::unknown(),
                }
            }
            Err(_) => ProcessChain::unknown(),
        };

        self.cache.write().unwrap().process_chain = Some(chain.clone());
        chain
    }

    pub fn shell_name(&self) -> Option<String> {
        self.process_chain().shell.map(|s| s.name)
    }

    pub fn process_name(&self) -> Option<String> {
        self.process_chain().process.map(|p| p.name)
    }

    /// The handler keyed on `process` (or `shell` if no process), per §4.E.
    pub fn handler(&self) -> &dyn Handler {
        let chain = self.process_chain();
        let key = chain
            .process
            .as_ref()
            .or(chain.shell.as_ref())
            .map(|s| s.name.as_str())
            .unwrap_or("");
        self.ctx.handlers.resolve(key)
    }

    pub fn visible_content(&self) -> anyhow::Result<String> {
        if let Some(content) = self.cache.read().unwrap().visible_content.clone() {
            return Ok(content);
        }
        let content = self.ctx.multiplexer.capture_visible(&self.pane_id)?;
        self.cache.write().unwrap().visible_content = Some(content.clone());
        Ok(content)
    }

    pub fn stream(&self) -> Arc<Stream> {
        self.ctx.stream_registry.get_or_create(&self.pane_id)
    }

    pub fn interrupt(&self) -> anyhow::Result<()> {
        self.ctx.multiplexer.send_key(&self.pane_id, "C-c")?;
        self.refresh();
        Ok(())
    }

    pub fn kill(&self) -> anyhow::Result<()> {
        self.ctx.multiplexer.kill_pane(&self.pane_id)?;
        self.refresh();
        Ok(())
    }

    /// Run a command to completion (or timeout) through the execution engine
    /// (spec §4.F). Thin delegation, as §4.E specifies.
    pub fn execute(&self, request: crate::engine::ExecuteRequest) -> crate::error::Result<crate::engine::CommandResult> {
        let result = crate::engine::execute(self, request);
        self.refresh();
        result
    }

    pub fn read_output(&self, mode: ReadMode) -> anyhow::Result<String> {
        let stream = self.stream();
        match mode {
            ReadMode::Since(name) => stream.read_since(name.as_deref()),
            ReadMode::Command(cmd_id) => stream.read_command_output(&cmd_id),
            ReadMode::LastLines(n) => stream.read_last_lines(n),
            ReadMode::All => stream.read_all(),
        }
    }
}

/// How a driver wants to read pane output (spec §4.E `read_output`).
pub enum ReadMode {
    Since(Option<String>),
    Command(String),
    LastLines(usize),
    All,
}
