//! Command-line interface for taskbuddy
//!
//! This module defines the CLI structure using clap derive macros.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::controller::{BulkAction, BulkReport, TaskListController};
use crate::error::{Error, Result};
use crate::filter::{DateRange, TaskFilter};
use crate::session::{Session, SessionManager, StaticIdentity};
use crate::store::JsonFileStore;
use crate::task::{Category, NewTask, Task, TaskPatch, TaskStatus};
use crate::ui;

/// taskbuddy - personal task manager
///
/// Track tasks in a list or on a board, filter them, and move them between
/// TO-DO, IN-PROGRESS and COMPLETED.
#[derive(Parser, Debug)]
#[command(name = "taskbuddy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "TASKBUDDY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Opens the board when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and remember the session
    Login {
        /// Display name (falls back to `[identity] display_name`)
        #[arg(long)]
        name: Option<String>,

        /// Photo URL (falls back to `[identity] photo_url`)
        #[arg(long)]
        photo: Option<String>,
    },

    /// Sign out and forget the session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List tasks grouped by status
    List {
        #[arg(long)]
        category: Option<Category>,

        /// First due date to include (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Last due date to include (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Case-insensitive text to look for in title or description
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Add a task
    Add {
        title: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: NaiveDate,

        /// Work or Personal; repeat for both
        #[arg(long = "category", short = 'c', required = true)]
        categories: Vec<Category>,

        #[arg(long, short, default_value = "")]
        description: String,

        #[arg(long, default_value = "todo")]
        status: TaskStatus,

        /// Attachment reference (path or URL)
        #[arg(long)]
        attach: Option<String>,
    },

    /// Edit fields of a task
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, short)]
        description: Option<String>,

        #[arg(long)]
        due: Option<NaiveDate>,

        #[arg(long = "category", short = 'c')]
        categories: Vec<Category>,

        #[arg(long, conflicts_with = "clear_attachment")]
        attach: Option<String>,

        #[arg(long)]
        clear_attachment: bool,
    },

    /// Move a task to another status
    Move { id: String, status: TaskStatus },

    /// Delete tasks
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Apply one action to several tasks
    Bulk {
        /// Set this status on every task
        #[arg(long, conflicts_with = "delete", required_unless_present = "delete")]
        status: Option<TaskStatus>,

        /// Delete every task
        #[arg(long)]
        delete: bool,

        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Open the interactive board
    Board,
}

impl Cli {
    pub fn run(self, config: &Config, runtime: &Runtime) -> Result<()> {
        let json = self.json;
        match self.command.unwrap_or(Commands::Board) {
            Commands::Login { name, photo } => {
                let manager = session_manager(config, name, photo);
                let session = runtime.block_on(manager.sign_in())?;
                print_session(&session, json)
            }
            Commands::Logout => {
                runtime.block_on(session_manager(config, None, None).sign_out())?;
                if !json {
                    println!("Signed out.");
                }
                Ok(())
            }
            Commands::Whoami => {
                let session = require_session(config, runtime)?;
                print_session(&session, json)
            }
            Commands::List {
                category,
                from,
                to,
                search,
            } => {
                let mut controller = open_controller(config, runtime)?;
                let due = from.zip(to).map(|(start, end)| DateRange::new(start, end));
                controller.set_filter(TaskFilter { category, due });
                controller.set_search(search.unwrap_or_default());
                if json {
                    println!("{}", serde_json::to_string_pretty(controller.filtered())?);
                } else {
                    print_list(&controller);
                }
                Ok(())
            }
            Commands::Add {
                title,
                due,
                categories,
                description,
                status,
                attach,
            } => {
                let mut controller = open_controller(config, runtime)?;
                let mut task = NewTask::new(title, due, categories)
                    .with_description(description)
                    .with_status(status);
                if let Some(attach) = attach {
                    task = task.with_attachment(attach);
                }
                let created = runtime.block_on(controller.add_task(task))?;
                print_task(&created, json)
            }
            Commands::Edit {
                id,
                title,
                description,
                due,
                categories,
                attach,
                clear_attachment,
            } => {
                let mut controller = open_controller(config, runtime)?;
                let patch = TaskPatch {
                    title,
                    description,
                    due_date: due,
                    category: (!categories.is_empty()).then(|| categories.into_iter().collect()),
                    status: None,
                    attachment: if clear_attachment {
                        Some(None)
                    } else {
                        attach.map(Some)
                    },
                };
                let task = runtime.block_on(controller.update_task(&id, patch))?;
                print_task(&task, json)
            }
            Commands::Move { id, status } => {
                let mut controller = open_controller(config, runtime)?;
                let task = runtime.block_on(controller.move_task(&id, status))?;
                print_task(&task, json)
            }
            Commands::Delete { ids } => {
                let mut controller = open_controller(config, runtime)?;
                if let [id] = ids.as_slice() {
                    runtime.block_on(controller.delete_task(id))?;
                    if !json {
                        println!("Deleted {id}");
                    }
                    return Ok(());
                }
                let report = runtime.block_on(controller.bulk_apply(&ids, BulkAction::Delete));
                print_report(&report, json)
            }
            Commands::Bulk { status, delete, ids } => {
                let action = match status {
                    Some(status) if !delete => BulkAction::SetStatus(status),
                    None if delete => BulkAction::Delete,
                    _ => {
                        return Err(Error::InvalidArgument(
                            "choose exactly one of --status or --delete".to_string(),
                        ))
                    }
                };
                let mut controller = open_controller(config, runtime)?;
                let report = runtime.block_on(controller.bulk_apply(&ids, action));
                print_report(&report, json)
            }
            Commands::Board => {
                let session = require_session(config, runtime)?;
                let mut controller =
                    TaskListController::new(JsonFileStore::new(&config.data_file), &session);
                runtime.block_on(controller.load());
                ui::run(&mut controller, &session, runtime)?;
                Ok(())
            }
        }
    }
}

fn session_manager(
    config: &Config,
    name: Option<String>,
    photo: Option<String>,
) -> SessionManager<StaticIdentity> {
    SessionManager::new(
        StaticIdentity::from_config(&config.identity, name, photo),
        &config.session_file,
    )
}

fn require_session(config: &Config, runtime: &Runtime) -> Result<Session> {
    runtime
        .block_on(session_manager(config, None, None).restore())?
        .ok_or(Error::NotSignedIn)
}

fn open_controller(
    config: &Config,
    runtime: &Runtime,
) -> Result<TaskListController<JsonFileStore>> {
    let session = require_session(config, runtime)?;
    let mut controller = TaskListController::new(JsonFileStore::new(&config.data_file), &session);
    runtime.block_on(controller.load());
    Ok(controller)
}

fn print_session(session: &Session, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(session)?);
        return Ok(());
    }
    match session.photo_url() {
        Some(photo) => println!("{} ({photo})", session.display_name()),
        None => println!("{}", session.display_name()),
    }
    Ok(())
}

fn print_task(task: &Task, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        println!("{}", task_line(task));
    }
    Ok(())
}

fn print_list(controller: &TaskListController<JsonFileStore>) {
    for (status, tasks) in controller.grouped() {
        println!("{} ({})", status, tasks.len());
        if tasks.is_empty() {
            println!("  No Tasks in {status}");
        }
        for task in tasks {
            println!("  {}", task_line(task));
        }
    }
}

fn task_line(task: &Task) -> String {
    let mut line = format!(
        "[{}] {}  due {}  {}  {}",
        task.id,
        task.title,
        task.due_date,
        task.status,
        task.categories_label()
    );
    if let Some(attachment) = &task.attachment {
        line.push_str(&format!("  ({attachment})"));
    }
    line
}

fn print_report(report: &BulkReport, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "succeeded": report.succeeded,
            "failed": report.failed,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    println!("{} task(s) updated", report.succeeded.len());
    if !report.is_complete() {
        println!("failed: {}", report.failed.join(", "));
    }
    Ok(())
}
