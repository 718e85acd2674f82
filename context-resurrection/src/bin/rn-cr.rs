// rn-cr: CLI for Context Resurrection snapshots held by right-now-daemon
//
// Commands:
//   rn-cr latest   --project <path> [--task <id>] [--last-activity-ms <ms>]
//   rn-cr list     --project <path> --task <id> [--limit <n>]
//   rn-cr get      --project <path> --task <id> <snapshot-id>
//   rn-cr capture  --project <path> --task <id> [--note <text>]
//   rn-cr delete-task    --project <path> --task <id>
//   rn-cr delete-project --project <path>
//   rn-cr ping

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rn_cr_lib::context_resurrection::{
    should_show_card, CardDisplayData, ContextSnapshotV1, TriggerConfig,
};
use rn_cr_lib::daemon::client::UnixSocketTransport;
use rn_cr_lib::daemon::config::Config;
use rn_cr_lib::daemon::protocol::ErrorDisposition;
use rn_cr_lib::{logging, CrClient, CrError};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when the daemon needs a newer client
const EXIT_UPDATE_REQUIRED: u8 = 3;
/// Exit status for every other failure
const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Parser)]
#[command(name = "rn-cr", about = "Inspect and manage Context Resurrection snapshots")]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the latest snapshot and whether the resurrection card would appear
    Latest {
        #[arg(long)]
        project: Option<PathBuf>,
        #[arg(long)]
        task: Option<String>,
        /// Epoch milliseconds of the last observed activity
        #[arg(long)]
        last_activity_ms: Option<f64>,
    },
    /// List snapshots for a task, newest first
    List {
        #[arg(long)]
        project: Option<PathBuf>,
        #[arg(long)]
        task: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one snapshot by id
    Get {
        #[arg(long)]
        project: Option<PathBuf>,
        #[arg(long)]
        task: String,
        snapshot_id: String,
    },
    /// Capture a manual snapshot now
    Capture {
        #[arg(long)]
        project: Option<PathBuf>,
        #[arg(long)]
        task: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete all snapshots for a task
    DeleteTask {
        #[arg(long)]
        project: Option<PathBuf>,
        #[arg(long)]
        task: String,
    },
    /// Delete all snapshots for a project
    DeleteProject {
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Check that the daemon is reachable and speaks our protocol
    Ping,
}

fn find_project_file() -> Option<PathBuf> {
    // Look for TODO.md in current directory or parent directories
    let mut current = std::env::current_dir().ok()?;

    loop {
        for name in ["TODO.md", "todo.md"] {
            let candidate = current.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

fn resolve_project(project: Option<PathBuf>) -> Result<String> {
    let path = match project {
        Some(p) => p,
        None => find_project_file()
            .ok_or_else(|| anyhow!("No TODO.md found; pass --project <path>"))?,
    };
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(path)
    };
    Ok(path.to_string_lossy().to_string())
}

fn print_snapshot(snapshot: &ContextSnapshotV1) {
    let card = CardDisplayData::from_snapshot(snapshot);
    println!("{}  {}", card.snapshot_id, card.task_title);
    println!("  captured: {} ({})", card.captured_at, card.capture_reason);
    if let Some(note) = &card.user_note {
        println!("  note: {}", note);
    }
    if let Some(terminal) = &card.terminal {
        print!("  session {}: {}", terminal.session_id, terminal.status);
        if let Some(code) = terminal.exit_code {
            print!(" (exit {})", code);
        }
        println!();
        if let Some(link) = card.deep_link() {
            println!("  open: {}", link);
        }
        if let Some(excerpt) = terminal.tail_excerpt.as_deref().filter(|e| !e.is_empty()) {
            println!("  ---");
            for line in excerpt.lines() {
                println!("  {}", line);
            }
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli, config: &Config) -> Result<()> {
    let client = CrClient::new(UnixSocketTransport::from_config(config));

    match cli.command {
        Command::Latest {
            project: p,
            task,
            last_activity_ms,
        } => {
            let project_path = resolve_project(p)?;
            let lookup = client.latest(&project_path, task.as_deref()).await;
            let show = should_show_card(
                Some(&lookup),
                last_activity_ms,
                Utc::now(),
                &TriggerConfig::from(config),
            );
            let snapshot = lookup?;

            if cli.json {
                let card = snapshot.as_ref().map(CardDisplayData::from_snapshot);
                print_json(&serde_json::json!({ "should_show": show, "card": card }))?;
            } else {
                match &snapshot {
                    Some(s) => {
                        print_snapshot(s);
                        println!("  resurrection card: {}", if show { "show" } else { "hide" });
                    }
                    None => println!("Nothing to resume."),
                }
            }
        }
        Command::List {
            project: p,
            task,
            limit,
        } => {
            let snapshots = client.list(&resolve_project(p)?, &task, limit).await?;
            if cli.json {
                print_json(&snapshots)?;
            } else if snapshots.is_empty() {
                println!("No snapshots for {}", task);
            } else {
                for snapshot in &snapshots {
                    print_snapshot(snapshot);
                }
            }
        }
        Command::Get {
            project: p,
            task,
            snapshot_id,
        } => {
            let snapshot = client.get(&resolve_project(p)?, &task, &snapshot_id).await?;
            match (&snapshot, cli.json) {
                (_, true) => {
                    print_json(&snapshot)?;
                }
                (Some(s), false) => print_snapshot(s),
                (None, false) => println!("Snapshot {} not found", snapshot_id),
            }
        }
        Command::Capture {
            project: p,
            task,
            note,
        } => {
            let snapshot = client
                .capture_now(&resolve_project(p)?, &task, note.as_deref())
                .await?;
            match (&snapshot, cli.json) {
                (_, true) => {
                    print_json(&snapshot)?;
                }
                (Some(s), false) => print_snapshot(s),
                (None, false) => println!("Daemon did not record a snapshot"),
            }
        }
        Command::DeleteTask { project: p, task } => {
            let deleted = client.delete_task(&resolve_project(p)?, &task).await?;
            if cli.json {
                print_json(&serde_json::json!({ "deleted_count": deleted }))?;
            } else {
                println!("Deleted {} snapshot(s) for {}", deleted, task);
            }
        }
        Command::DeleteProject { project: p } => {
            let project_path = resolve_project(p)?;
            let deleted = client.delete_project(&project_path).await?;
            if cli.json {
                print_json(&serde_json::json!({ "deleted_count": deleted }))?;
            } else {
                println!("Deleted {} snapshot(s) under {}", deleted, project_path);
            }
        }
        Command::Ping => {
            client.ping().await?;
            println!("Daemon is running at {}", config.socket_path.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::from_env();
    tracing::debug!(socket = %config.socket_path.display(), "using daemon socket");

    let err = match run(cli, &config).await {
        Ok(()) => return ExitCode::SUCCESS,
        Err(err) => err,
    };

    match err.downcast_ref::<CrError>() {
        Some(err) => {
            err.report("rn-cr");
            match err.disposition() {
                ErrorDisposition::UpdatePrompt => {
                    eprintln!("{}", err.user_message());
                    ExitCode::from(EXIT_UPDATE_REQUIRED)
                }
                ErrorDisposition::Silent => {
                    eprintln!("Nothing to resume ({})", err);
                    ExitCode::from(EXIT_FAILURE)
                }
                _ => {
                    eprintln!("Error: {}", err.user_message());
                    ExitCode::from(EXIT_FAILURE)
                }
            }
        }
        None => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
