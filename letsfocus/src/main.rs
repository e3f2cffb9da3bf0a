//! `letsfocus` command-line client.
//!
//! # Usage
//!
//! ```bash
//! letsfocus --token dev-token add "Write report" --priority high
//! letsfocus --token dev-token list --sort due_date
//! letsfocus --token dev-token move 3 1
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use letsfocus::client::ApiClient;
use letsfocus::config::{CliArgs, ClientConfig, Command};
use letsfocus::tasks::TaskList;
use letsfocus::view::{FilePreferenceStore, PreferenceStore, SortDirection, StatusFilter};
use letsfocus_proto::api::CreateTaskRequest;
use letsfocus_proto::task::{Priority, Task, TaskId};
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file so command output stays clean.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let Some(token) = config.token.clone() else {
        eprintln!("No session token: pass --token or set LETSFOCUS_TOKEN");
        return ExitCode::FAILURE;
    };
    let client = match ApiClient::new(&config.server_url, token) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let prefs = FilePreferenceStore::new(&config.preferences_file);

    let command = cli.command.unwrap_or(Command::List {
        sort: None,
        desc: false,
        all: false,
        tag: None,
        focus: false,
        search: None,
        save: false,
    });

    match run(command, &client, &prefs).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Command,
    client: &ApiClient,
    prefs: &FilePreferenceStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List {
            sort,
            desc,
            all,
            tag,
            focus,
            search,
            save,
        } => {
            let mut view = prefs.load()?;
            if let Some(sort) = sort {
                view.sort = sort.parse()?;
            }
            if desc {
                view.direction = SortDirection::Descending;
            }
            if all {
                view.status = StatusFilter::All;
            }
            if tag.is_some() {
                view.tag = tag;
            }
            if focus {
                view.focus_only = true;
            }
            if search.is_some() {
                view.search = search;
            }
            if save {
                prefs.save(&view)?;
            }

            let tasks = client.list_tasks().await?;
            for (i, task) in view.apply(&tasks).into_iter().enumerate() {
                println!("{}", render(i + 1, task));
            }
        }
        Command::Add {
            title,
            priority,
            focus,
            tags,
        } => {
            let request = CreateTaskRequest {
                priority: priority.as_deref().map(parse_priority).transpose()?,
                focus: Some(focus),
                tags: Some(tags),
                ..CreateTaskRequest::titled(title)
            };
            let task = client.create_task(&request).await?;
            println!("added {} ({})", task.title, task.id);
        }
        Command::Move { task, to } => {
            let mut list = TaskList::new(client.list_tasks().await?);
            let id = resolve_task(&list, &task)?;
            let target = to.checked_sub(1).ok_or("positions start at 1")?;
            let order = list.move_task(client, &id, target).await?;
            tracing::info!(task = %id, order, "task moved");
            for (i, task) in list.active().enumerate() {
                println!("{}", render(i + 1, task));
            }
        }
        Command::Renormalize => {
            let response = client.renormalize().await?;
            println!("{} ({} tasks)", response.message, response.renormalized);
        }
    }
    Ok(())
}

/// Accepts a task id or a 1-based position in the active list.
fn resolve_task(list: &TaskList, raw: &str) -> Result<TaskId, String> {
    if let Ok(position) = raw.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|i| list.active().nth(i))
            .map(|t| t.id.clone())
            .ok_or_else(|| format!("no task at position {position}"));
    }
    TaskId::parse(raw).ok_or_else(|| format!("not a task id or position: {raw}"))
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    match raw {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(format!("unknown priority {other:?} (expected low, medium, high)")),
    }
}

fn render(position: usize, task: &Task) -> String {
    let focus = if task.focus { "*" } else { " " };
    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", task.tags.join(", "))
    };
    format!(
        "{position:>3}. {focus} {title} ({status}, {priority}){tags}",
        title = task.title,
        status = task.status,
        priority = task.priority,
    )
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("letsfocus.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
