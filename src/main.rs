use clap::{Arg, ArgMatches, Command};
use color_eyre::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use kanban_board::adapters::{
    api::{BoardClient, HttpTaskRepository},
    cache::MokaBoardCache,
    config::FileConfigStore,
};
use kanban_board::application::{AppError, AppResult, MutationCoordinator, Settlement};
use kanban_board::domain::{Column, MoveRequest, Priority, TaskDraft, TaskId, TaskPatch};
use kanban_board::ports::ConfigStore;

fn cli() -> Command {
    Command::new("kanban-board")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Kanban board client with optimistic reordering")
        .long_about("Reads and reorders tasks on a kanban board served by a REST task API.\n\nChanges are applied locally first and undone if the server rejects any part of them.")
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .help("Task API base URL (can also be set via KANBAN_API_URL env var)")
                .global(true),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .value_name("TOKEN")
                .help("Bearer token for the task API (can also be set via KANBAN_TOKEN env var)")
                .global(true),
        )
        .subcommand(
            Command::new("list")
                .about("Print the board as JSON, grouped by column")
                .arg(
                    Arg::new("search")
                        .long("search")
                        .short('s')
                        .value_name("TERM")
                        .help("Only tasks whose title or description contains TERM"),
                ),
        )
        .subcommand(Command::new("columns").about("List the board columns"))
        .subcommand(
            Command::new("move")
                .about("Move a task to a slot in a column")
                .arg(Arg::new("task_id").help("Task to move").required(true).index(1))
                .arg(
                    Arg::new("column")
                        .help("Destination column (backlog, in_progress, review, done)")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::new("index")
                        .help("Drop slot within the column, 0 is the top")
                        .required(true)
                        .value_parser(clap::value_parser!(usize))
                        .index(3),
                ),
        )
        .subcommand(
            Command::new("add")
                .about("Create a task at the end of a column")
                .arg(Arg::new("title").required(true).index(1))
                .arg(Arg::new("description").long("description").short('d'))
                .arg(
                    Arg::new("column")
                        .long("column")
                        .short('c')
                        .default_value("backlog"),
                )
                .arg(
                    Arg::new("priority")
                        .long("priority")
                        .short('p')
                        .default_value("medium"),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Change title, description or priority of a task")
                .arg(Arg::new("task_id").required(true).index(1))
                .arg(Arg::new("title").long("title"))
                .arg(Arg::new("description").long("description").short('d'))
                .arg(Arg::new("priority").long("priority").short('p')),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a task")
                .arg(Arg::new("task_id").required(true).index(1)),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Log to a file so stdout stays clean JSON
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("kanban-board.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let matches = cli().get_matches();

    let config_store = FileConfigStore::new()?;
    let mut config = config_store.load_config().await?;

    if let Some(url) = matches.get_one::<String>("api-url") {
        config.api_base_url = url.clone();
    }
    if let Some(token) = matches.get_one::<String>("token") {
        config.api_token = Some(token.clone());
        config_store.save_config(&config).await?;
    }

    if let Some(("columns", _)) = matches.subcommand() {
        let columns: Vec<_> = Column::ALL
            .iter()
            .map(|c| serde_json::json!({ "key": c.key(), "label": c.label() }))
            .collect();
        return print_json(&columns);
    }

    let client = BoardClient::new(
        config.api_base_url.clone(),
        config.api_token.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let repository = Arc::new(HttpTaskRepository::new(client));
    let cache = Arc::new(MokaBoardCache::new(config.cache_ttl_seconds, 16));
    let coordinator = MutationCoordinator::new(repository, cache, &config);

    if let Err(e) = coordinator.load(true).await {
        eprintln!("❌ Couldn't load tasks from {}: {e}", config.api_base_url);
        std::process::exit(1);
    }

    let outcome = match matches.subcommand() {
        Some(("list", list_matches)) => {
            let search = list_matches.get_one::<String>("search").map(String::as_str);
            return print_json(&coordinator.board(search).await);
        }
        Some(("move", move_matches)) => run_move(&coordinator, move_matches).await,
        Some(("add", add_matches)) => run_add(&coordinator, add_matches).await.map(Some),
        Some(("edit", edit_matches)) => run_edit(&coordinator, edit_matches).await,
        Some(("delete", delete_matches)) => {
            let id = task_id(delete_matches);
            coordinator.delete_task(&id).await.map(Some)
        }
        _ => {
            cli().print_help()?;
            return Ok(());
        }
    };

    match outcome {
        Ok(Some(settlement)) => print_json(&serde_json::json!({
            "settlement": settlement,
            "board": coordinator.board(None).await,
        })),
        Ok(None) => {
            eprintln!("Nothing to change");
            Ok(())
        }
        Err(AppError::Domain(e)) => {
            // Rejected before anything changed
            eprintln!("⚠️  {e}");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    }
}

fn task_id(matches: &ArgMatches) -> TaskId {
    matches
        .get_one::<String>("task_id")
        .map(|s| TaskId::from(s.as_str()))
        .unwrap_or_else(|| TaskId(String::new()))
}

async fn run_move(
    coordinator: &MutationCoordinator,
    matches: &ArgMatches,
) -> AppResult<Option<Settlement>> {
    let column = parse_arg::<Column>(matches, "column")?.unwrap_or(Column::Backlog);
    let index = matches.get_one::<usize>("index").copied().unwrap_or(0);

    coordinator
        .move_task(MoveRequest::new(task_id(matches), column, index))
        .await
}

async fn run_add(coordinator: &MutationCoordinator, matches: &ArgMatches) -> AppResult<Settlement> {
    let title = matches.get_one::<String>("title").cloned().unwrap_or_default();
    let column = parse_arg::<Column>(matches, "column")?.unwrap_or(Column::Backlog);
    let priority = parse_arg::<Priority>(matches, "priority")?.unwrap_or_default();

    let mut draft = TaskDraft::new(title, column).with_priority(priority);
    if let Some(description) = matches.get_one::<String>("description") {
        draft = draft.with_description(description.clone());
    }

    coordinator.create_task(draft).await
}

async fn run_edit(
    coordinator: &MutationCoordinator,
    matches: &ArgMatches,
) -> AppResult<Option<Settlement>> {
    let patch = TaskPatch {
        title: matches.get_one::<String>("title").cloned(),
        description: matches.get_one::<String>("description").cloned(),
        priority: parse_arg::<Priority>(matches, "priority")?,
        placement: None,
    };

    coordinator.edit_task(&task_id(matches), patch).await
}

fn parse_arg<T>(matches: &ArgMatches, name: &str) -> AppResult<Option<T>>
where
    T: std::str::FromStr<Err = kanban_board::domain::DomainError>,
{
    matches
        .get_one::<String>(name)
        .map(|raw| raw.parse::<T>())
        .transpose()
        .map_err(AppError::from)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
