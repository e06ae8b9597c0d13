//! termtap's CLI driver (spec §6 "external collaborator, built for
//! runnability"). Deliberately small: one subcommand per core operation,
//! mirroring workmux's `command/send.rs`/`command/wait.rs` one-op-per-file
//! style, just folded into a single module since there's only a handful.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use termtap::address::{self, PaneAddress};
use termtap::config::{ConfigStore, YamlConfigStore};
use termtap::engine::ExecuteRequest;
use termtap::handlers::HandlerRegistry;
use termtap::initializer::Initializer;
use termtap::introspect;
use termtap::multiplexer::{self, PastePreference};
use termtap::pane::{Pane, PaneContext, ReadMode};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "termtap")]
#[command(about = "A process-aware supervisor over tmux sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a command to a pane, optionally waiting for it to finish
    Send {
        /// Pane address (`%id`, `session:window.pane`, `session`, or `session.service`)
        address: String,

        /// Command text to send
        command: String,

        /// Seconds to wait before giving up (only applies when waiting)
        #[arg(long, default_value_t = 30.0)]
        timeout: f64,

        /// Regex that marks the command as ready once it matches new output
        #[arg(long = "ready-pattern")]
        ready_pattern: Option<String>,

        /// Fire the command and return immediately instead of waiting
        #[arg(long = "no-wait")]
        no_wait: bool,

        /// How to deliver the keystrokes
        #[arg(long, value_enum, default_value_t = PasteArg::Auto)]
        paste: PasteArg,
    },

    /// Read captured output from a pane
    Read {
        /// Pane address
        address: String,

        /// Only output added since the last read mark
        #[arg(long, conflicts_with_all = ["cmd_id", "last_lines"])]
        since: bool,

        /// Output only the range captured for one command id
        #[arg(long = "cmd-id", conflicts_with = "last_lines")]
        cmd_id: Option<String>,

        /// Output only the last N lines
        #[arg(long = "last-lines")]
        last_lines: Option<usize>,
    },

    /// Enumerate every pane the multiplexer currently knows about
    List,

    /// Send an interrupt (Ctrl-C) to a pane
    Interrupt {
        /// Pane address
        address: String,
    },

    /// Kill a pane
    Kill {
        /// Pane address
        address: String,
    },

    /// Start every service of a configured init group, in dependency order
    #[command(name = "run-group")]
    RunGroup {
        /// Init group name (also used as the tmux session name)
        name: String,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum PasteArg {
    Auto,
    Force,
    Never,
}

impl From<PasteArg> for PastePreference {
    fn from(value: PasteArg) -> Self {
        match value {
            PasteArg::Auto => PastePreference::Auto,
            PasteArg::Force => PastePreference::Force,
            PasteArg::Never => PastePreference::Never,
        }
    }
}

impl std::fmt::Display for PasteArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PasteArg::Auto => "auto",
            PasteArg::Force => "force",
            PasteArg::Never => "never",
        };
        write!(f, "{s}")
    }
}

fn build_context() -> Result<PaneContext> {
    let multiplexer = multiplexer::detect();
    let process_source: Arc<dyn introspect::ProcessSource> = Arc::from(introspect::default_source());
    let stream_registry = Arc::new(termtap::stream::StreamRegistry::new(termtap::state_dir::streams_dir()?));

    Ok(PaneContext {
        multiplexer,
        process_source,
        handlers: Arc::new(HandlerRegistry::with_defaults()),
        stream_registry,
        known_shells: Arc::new(introspect::default_known_shells()),
        skip_wrappers: Arc::new(introspect::default_skip_wrappers()),
        execution_locks: Arc::new(termtap::engine::ExecutionLocks::default()),
    })
}

fn pane_for(ctx: &PaneContext, config: &dyn ConfigStore, raw_address: &str) -> Result<Pane> {
    let address = PaneAddress::parse(raw_address);
    let pane_id = address::resolve_one(&address, ctx.multiplexer.as_ref(), config)?;
    address::reject_current_pane(&pane_id, ctx.multiplexer.as_ref())?;
    Ok(Pane::new(pane_id, ctx.clone()))
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let ctx = build_context()?;
    let config = YamlConfigStore::load().context("failed to load configuration")?;

    match cli.command {
        Commands::Send {
            address,
            command,
            timeout,
            ready_pattern,
            no_wait,
            paste,
        } => {
            let pane = pane_for(&ctx, &config, &address)?;
            let result = pane.execute(ExecuteRequest {
                command,
                wait: !no_wait,
                timeout_secs: timeout,
                ready_pattern,
                paste: paste.into(),
            })?;
            println!("status: {}", result.status.as_str());
            if !result.output.is_empty() {
                print!("{}", result.output);
            }
            Ok(())
        }

        Commands::Read {
            address,
            since,
            cmd_id,
            last_lines,
        } => {
            let pane = pane_for(&ctx, &config, &address)?;
            let mode = if let Some(n) = last_lines {
                ReadMode::LastLines(n)
            } else if let Some(id) = cmd_id {
                ReadMode::Command(id)
            } else if since {
                ReadMode::Since(None)
            } else {
                ReadMode::All
            };
            let output = pane.read_output(mode)?;
            print!("{output}");
            Ok(())
        }

        Commands::List => {
            for info in ctx.multiplexer.enumerate_panes()? {
                println!(
                    "{}\t{}:{}.{}\t{}",
                    info.pane_id, info.session, info.window, info.pane_index, info.window_name
                );
            }
            Ok(())
        }

        Commands::Interrupt { address } => {
            let pane = pane_for(&ctx, &config, &address)?;
            pane.interrupt()?;
            Ok(())
        }

        Commands::Kill { address } => {
            let pane = pane_for(&ctx, &config, &address)?;
            pane.kill()?;
            Ok(())
        }

        Commands::RunGroup { name } => {
            let group = config
                .get_init_group(&name)?
                .ok_or_else(|| anyhow!("no init group named {name:?}"))?;
            Initializer::new(ctx.clone()).run_group(&name, &group)?;
            Ok(())
        }
    }
}
