// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

mod graph;
mod logging;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use reactor_core::{EngineError, EngineOptions, PluginRegistry};
use reactor_engine::EngineHandle;
use tracing::{error, info, warn};

use crate::logging::LogFormat;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Reactor graph runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a graph, start it, and print every node's value once stabilised
    Run {
        /// Path to the graph definition file
        graph: PathBuf,
        /// Where to write a snapshot once the graph stabilises
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
        /// How long to wait for stabilisation before giving up
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
        #[arg(long, value_enum, default_value_t = CliLogFormat::Text)]
        log_format: CliLogFormat,
    },
    /// Construct a graph without starting it, reporting any structural errors
    Validate {
        /// Path to the graph definition file
        graph: PathBuf,
    },
    /// Import a snapshot into a fresh engine, resuming it if it was running
    Replay {
        /// Path to a snapshot file produced by `run --snapshot-out`
        snapshot: PathBuf,
        /// How long to wait for stabilisation before giving up
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogFormat {
    Text,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Text => Self::Text,
            CliLogFormat::Json => Self::Json,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run { graph, snapshot_out, timeout_ms, log_format } => {
            logging::init((*log_format).into());
            run(graph, snapshot_out.as_deref(), *timeout_ms).await
        },
        Commands::Validate { graph } => {
            logging::init(LogFormat::Text);
            validate(graph).await
        },
        Commands::Replay { snapshot, timeout_ms } => {
            logging::init(LogFormat::Text);
            replay(snapshot, *timeout_ms).await
        },
    };

    if let Err(error) = result {
        error!(%error, "command failed");
        std::process::exit(1);
    }
}

fn builtin_registry() -> Result<PluginRegistry, BoxError> {
    let mut registry = PluginRegistry::new();
    reactor_plugins::register_builtin_plugins(&mut registry)?;
    Ok(registry)
}

async fn run(graph_path: &std::path::Path, snapshot_out: Option<&std::path::Path>, timeout_ms: u64) -> Result<(), BoxError> {
    let graph_file = graph::load(graph_path)?;
    let registry = builtin_registry()?;
    let node_count = graph_file.nodes.len();
    let handle = EngineHandle::new(graph_file.options, registry)?;

    for def in graph_file.nodes {
        let id = def.id.clone();
        handle.add_node(def).await.map_err(|e| format!("failed to add node {id}: {e}"))?;
    }
    info!(node_count, "graph loaded, starting engine");

    match handle.start().await {
        Ok(()) | Err(EngineError::InvalidState(_)) => {},
        Err(error) => return Err(error.into()),
    }

    if await_stabilised(&handle, timeout_ms).await {
        info!("engine stabilised");
    } else {
        warn!(timeout_ms, "timed out waiting for stabilisation; printing current values anyway");
    }

    print_node_values(&handle).await?;

    if let Some(path) = snapshot_out {
        write_snapshot(&handle, path).await?;
    }

    let mut handle = handle;
    handle.shutdown_and_wait(Duration::from_secs(5)).await?;
    Ok(())
}

async fn validate(graph_path: &std::path::Path) -> Result<(), BoxError> {
    let graph_file = graph::load(graph_path)?;
    let registry = builtin_registry()?;
    let node_count = graph_file.nodes.len();
    let options = EngineOptions { auto_start: false, ..graph_file.options };
    let handle = EngineHandle::new(options, registry)?;

    for def in graph_file.nodes {
        let id = def.id.clone();
        handle.add_node(def).await.map_err(|e| format!("node {id}: {e}"))?;
    }

    info!(node_count, "graph is structurally valid");

    let mut handle = handle;
    handle.shutdown_and_wait(Duration::from_secs(5)).await?;
    Ok(())
}

async fn replay(snapshot_path: &std::path::Path, timeout_ms: u64) -> Result<(), BoxError> {
    let contents = std::fs::read_to_string(snapshot_path)
        .map_err(|e| format!("failed to read {}: {e}", snapshot_path.display()))?;
    let snapshot: reactor_engine::Snapshot = serde_json::from_str(&contents)
        .map_err(|e| format!("failed to parse {} as a snapshot: {e}", snapshot_path.display()))?;
    let recorded_running = snapshot.recorded_lifecycle == "RUNNING";

    let registry = builtin_registry()?;
    let options = EngineOptions { auto_start: false, ..snapshot.options.clone() };
    let handle = EngineHandle::new(options, registry)?;
    handle.import_state(snapshot).await?;

    if recorded_running {
        match handle.start().await {
            Ok(()) | Err(EngineError::InvalidState(_)) => {},
            Err(error) => return Err(error.into()),
        }
        if await_stabilised(&handle, timeout_ms).await {
            info!("replayed engine stabilised");
        } else {
            warn!(timeout_ms, "timed out waiting for the replayed engine to stabilise");
        }
    }

    print_node_values(&handle).await?;

    let mut handle = handle;
    handle.shutdown_and_wait(Duration::from_secs(5)).await?;
    Ok(())
}

async fn await_stabilised(handle: &EngineHandle, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if handle.is_stabilized().await.unwrap_or(false) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

async fn print_node_values(handle: &EngineHandle) -> Result<(), BoxError> {
    let ids = handle.node_ids().await?;
    for id in ids {
        let rx = handle.subscribe(&id).await?;
        let emission = rx.borrow().clone();
        let value = reactor_engine::snapshot::encode_emission(&emission);
        println!("{id}: {value}");
    }
    Ok(())
}

async fn write_snapshot(handle: &EngineHandle, path: &std::path::Path) -> Result<(), BoxError> {
    let snapshot = handle.export_state().await?;
    let encoded = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(path, encoded).map_err(|e| format!("failed to write snapshot to {}: {e}", path.display()))?;
    info!(path = %path.display(), "snapshot written");
    Ok(())
}
