//! Line-oriented interactive session over stdin.

use crate::render::{render_tabs, render_tree};
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use webpad_core::{validate_file_name, validate_folder_name};
use webpad_session::{EditorSession, SessionCommand};

const HELP: &str = "\
commands:
  tree | tabs | status | cat [id]
  open <id> | close <id> | edit <id> <text> | save <id> | save-all
  new-file <name> [parent] | new-folder <name> [parent]
  delete <id> | toggle <id> | reset | refresh | clear-error
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellAction {
    Command(SessionCommand),
    Tree,
    Tabs,
    Status,
    Cat(Option<String>),
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ShellAction>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();
    let mut required = |what: &str| {
        args.next()
            .map(str::to_string)
            .ok_or_else(|| format!("{verb}: missing {what}"))
    };

    let action = match verb {
        "tree" => ShellAction::Tree,
        "tabs" => ShellAction::Tabs,
        "status" => ShellAction::Status,
        "help" | "?" => ShellAction::Help,
        "quit" | "exit" => ShellAction::Quit,
        "cat" => ShellAction::Cat(args.next().map(str::to_string)),
        "open" => ShellAction::Command(SessionCommand::Open {
            id: required("id")?,
        }),
        "close" => ShellAction::Command(SessionCommand::Close {
            id: required("id")?,
        }),
        "edit" => {
            let Some((id, content)) = rest.split_once(char::is_whitespace) else {
                return Err("edit: usage is edit <id> <text>".to_string());
            };
            ShellAction::Command(SessionCommand::UpdateContent {
                id: id.to_string(),
                content: content.replace("\\n", "\n"),
            })
        }
        "save" => ShellAction::Command(SessionCommand::Save {
            id: required("id")?,
        }),
        "save-all" => ShellAction::Command(SessionCommand::SaveAll),
        "new-file" => {
            let name = required("name")?;
            let file_type = validate_file_name(&name).map_err(|err| err.to_string())?;
            ShellAction::Command(SessionCommand::CreateFile {
                name,
                file_type,
                parent_id: args.next().map(str::to_string),
            })
        }
        "new-folder" => {
            let name = required("name")?;
            validate_folder_name(&name).map_err(|err| err.to_string())?;
            ShellAction::Command(SessionCommand::CreateFolder {
                name,
                parent_id: args.next().map(str::to_string),
            })
        }
        "delete" => ShellAction::Command(SessionCommand::Delete {
            id: required("id")?,
        }),
        "toggle" => ShellAction::Command(SessionCommand::ToggleFolder {
            id: required("id")?,
        }),
        "reset" => ShellAction::Command(SessionCommand::Reset),
        "refresh" => ShellAction::Command(SessionCommand::Refresh),
        "clear-error" => ShellAction::Command(SessionCommand::ClearError),
        other => return Err(format!("unknown command '{other}', try help")),
    };
    Ok(Some(action))
}

pub async fn run(session: &mut EditorSession) -> Result<()> {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!(event = "session_event", kind = event.kind());
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ShellAction::Quit)) => break,
            Ok(Some(action)) => execute(session, action).await,
            Err(message) => println!("error: {message}"),
        }
        prompt();
    }

    let dirty = session.dirty_ids();
    if !dirty.is_empty() {
        println!("unsaved changes discarded: {}", dirty.join(", "));
    }
    Ok(())
}

async fn execute(session: &mut EditorSession, action: ShellAction) {
    match action {
        ShellAction::Command(command) => {
            if let Err(err) = session.dispatch(command).await {
                println!("error: {err}");
            }
        }
        ShellAction::Tree => print!("{}", render_tree(session.tree())),
        ShellAction::Tabs => {
            let active = session.active_id();
            print!("{}", render_tabs(&session.open_tabs(), active.as_deref()));
        }
        ShellAction::Status => {
            println!(
                "server: {}",
                if session.is_online() { "online" } else { "offline" }
            );
            println!("open tabs: {}", session.open_tabs().len());
            println!("unsaved: {}", session.dirty_ids().join(", "));
            if let Some(err) = session.last_error() {
                println!("last error: {err}");
            }
        }
        ShellAction::Cat(id) => match crate::content_of(session, id.as_deref()) {
            Ok(content) => println!("{content}"),
            Err(err) => println!("error: {err}"),
        },
        ShellAction::Help => println!("{HELP}"),
        ShellAction::Quit => {}
    }
}

fn prompt() {
    print!("webpad> ");
    let _ = std::io::stdout().flush();
}
