use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webpad_core::{validate_file_name, validate_folder_name};
use webpad_gateway::{HttpRemoteStore, InMemoryRemoteStore, RemoteStore};
use webpad_session::{EditorSession, RestoreHandle};
use webpad_storage::SnapshotStore;

mod config;
mod logging;
mod render;
mod shell;

use config::{load_config, Config, Overrides};
use logging::init_logging;
use render::{render_tabs, render_tree};

#[derive(Parser, Debug)]
#[command(name = "webpad")]
#[command(about = "Edit a remote web project from the terminal", long_about = None)]
struct Cli {
    /// Base URL of the file API
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Where the open-tab snapshot is kept
    #[arg(long, global = true)]
    snapshot_path: Option<PathBuf>,
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,
    /// Work against a built-in sample project instead of the API
    #[arg(long, global = true, default_value_t = false)]
    in_memory: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether the file API is reachable
    Health,
    /// Print the project tree
    Tree,
    /// List open tabs
    Tabs,
    Open {
        id: String,
    },
    Close {
        id: String,
    },
    /// Print a file's content; defaults to the active tab
    Cat {
        id: Option<String>,
    },
    /// Replace a file's content from a local file, or stdin with `-`, and save
    Write {
        id: String,
        source: String,
    },
    NewFile {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    NewFolder {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    Delete {
        id: String,
    },
    Toggle {
        id: String,
    },
    /// Restore the sample project and discard the session
    Reset,
    /// Interactive session
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(Overrides {
        api_base_url: cli.api_url.clone(),
        snapshot_path: cli.snapshot_path.clone(),
        log_dir: cli.log_dir.clone(),
        request_timeout_secs: cli.timeout_secs,
        debug: cli.debug,
    })?;
    init_logging(&config);

    let mut session = build_session(&config, cli.in_memory)?;
    let restore = session.initialize().await;

    let outcome = match cli.command {
        Commands::Shell => {
            tokio::spawn(log_restore(restore));
            shell::run(&mut session).await
        }
        command => {
            log_restore(restore).await;
            run_command(&mut session, &config, command).await
        }
    };

    if outcome.is_ok() {
        if let Some(err) = session.last_error() {
            eprintln!("error: {err}");
        }
    }
    outcome
}

fn build_session(config: &Config, in_memory: bool) -> Result<EditorSession> {
    let remote: Arc<dyn RemoteStore> = if in_memory {
        Arc::new(InMemoryRemoteStore::with_sample_project())
    } else {
        Arc::new(
            HttpRemoteStore::new(&config.api_base_url, Some(config.request_timeout))
                .context("Failed to configure API client")?,
        )
    };
    info!(
        event = "session_start",
        api = %config.api_base_url,
        in_memory,
        snapshot = %config.snapshot_path.display()
    );

    let session = EditorSession::new(remote);
    match SnapshotStore::open(&config.snapshot_path) {
        Ok(store) => Ok(session.with_snapshot_backend(Box::new(store))),
        Err(err) => {
            warn!(
                event = "snapshot_unavailable",
                path = %config.snapshot_path.display(),
                error = %err
            );
            Ok(session)
        }
    }
}

async fn log_restore(restore: RestoreHandle) {
    let report = restore.wait().await;
    debug!(
        event = "restore_finished",
        refreshed = report.refreshed,
        failed = report.failed,
        skipped = report.skipped
    );
}

async fn run_command(session: &mut EditorSession, config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Health => {
            if !session.is_online() {
                bail!("server unreachable at {}", config.api_base_url);
            }
            println!("online");
        }
        Commands::Tree => print!("{}", render_tree(session.tree())),
        Commands::Tabs => {
            let active = session.active_id();
            print!("{}", render_tabs(&session.open_tabs(), active.as_deref()));
        }
        Commands::Open { id } => {
            open_file(session, &id).await?;
            println!("opened {id}");
        }
        Commands::Close { id } => {
            if session.close(&id) {
                println!("closed {id}");
            } else {
                println!("{id} was not open");
            }
        }
        Commands::Cat { id } => println!("{}", content_of(session, id.as_deref())?),
        Commands::Write { id, source } => {
            let content = read_source(&source)?;
            open_file(session, &id).await?;
            session.update_content(&id, content);
            session.save(&id).await?;
            println!("saved {id}");
        }
        Commands::NewFile { name, parent } => {
            let file_type = validate_file_name(&name)?;
            let node = session
                .create_file(&name, file_type, parent.as_deref())
                .await?;
            println!("created {}", node.id);
        }
        Commands::NewFolder { name, parent } => {
            validate_folder_name(&name)?;
            let node = session.create_folder(&name, parent.as_deref()).await?;
            println!("created {}", node.id);
        }
        Commands::Delete { id } => {
            session.delete_item(&id).await?;
            println!("deleted {id}");
        }
        Commands::Toggle { id } => {
            session.toggle_folder(&id).await?;
            let state = match session.tree().find(&id) {
                Some(node) if node.is_open => "open",
                Some(_) => "closed",
                None => "unknown",
            };
            println!("{id} {state}");
        }
        Commands::Reset => {
            session.reset_project().await?;
            println!("project reset");
        }
        Commands::Shell => shell::run(session).await?,
    }
    Ok(())
}

async fn open_file(session: &mut EditorSession, id: &str) -> Result<()> {
    session.open(id).await?;
    if session.tab(id).is_none() {
        bail!("{id} is not a file in the project");
    }
    Ok(())
}

/// Buffer of an open tab, else the content cached in the tree. Without an
/// id the active tab is used.
pub(crate) fn content_of(session: &EditorSession, id: Option<&str>) -> Result<String> {
    let Some(id) = id.map(str::to_string).or_else(|| session.active_id()) else {
        bail!("no active tab");
    };
    if let Some(tab) = session.tab(&id) {
        return Ok(tab.content);
    }
    session
        .tree()
        .find(&id)
        .filter(|node| node.is_file())
        .map(|node| node.content.clone().unwrap_or_default())
        .ok_or_else(|| anyhow!("{id} is not a file in the project"))
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(source).with_context(|| format!("Failed to read {source}"))
}
