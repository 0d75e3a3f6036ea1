use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::countdown::remaining;
use crate::ids::IdGenerator;
use crate::models::{Todo, TodoEdit};
use crate::storage::Storage;
use crate::store::{StoreError, TodoStore};
use crate::utils::{format_due_date, parse_due_date};

#[derive(Parser)]
#[command(name = "countdo")]
#[command(about = "Todo list with due-date countdowns, kept on this machine")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/storage)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Add a todo at the top of the list
    Add {
        /// What needs doing
        text: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Category, one of the configured ones or any text
        #[arg(long)]
        category: Option<String>,
    },
    /// Show todos in display order
    List {
        /// Only show todos whose text or category contains this
        #[arg(long)]
        search: Option<String>,
        /// Hide completed todos
        #[arg(long)]
        pending: bool,
    },
    /// Mark a todo done, or not done again
    Toggle {
        /// Todo id or a unique prefix of it
        id: String,
    },
    /// Remove a todo
    Delete {
        /// Todo id or a unique prefix of it
        id: String,
    },
    /// Change a todo's text, due date or category
    Edit {
        /// Todo id or a unique prefix of it
        id: String,
        #[arg(long)]
        text: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
    },
    /// Move the todo at one list position to another
    Move {
        from: usize,
        to: usize,
    },
    /// Show completed and total counts
    Stats,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("No todo with id '{0}'")]
    UnknownId(String),
    #[error("Id prefix '{prefix}' matches {matches} todos")]
    AmbiguousId { prefix: String, matches: usize },
    #[error("Position {index} is out of range, the list has {len} todos")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Todo text must not be empty")]
    EmptyText,
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

fn parse_due_arg(due: Option<String>) -> Result<Option<crate::models::DueDate>, CliError> {
    due.map(|due_str| {
        parse_due_date(&due_str)
            .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", due_str, e)))
    })
    .transpose()
}

/// Surface a save failure the store recorded during the last operation
fn check_saved<S: Storage, G: IdGenerator>(store: &mut TodoStore<S, G>) -> Result<(), CliError> {
    match store.take_last_error() {
        Some(e) => Err(CliError::StoreError(e)),
        None => Ok(()),
    }
}

/// Find the todo an id or id prefix refers to
pub fn resolve_id<S: Storage, G: IdGenerator>(store: &TodoStore<S, G>, prefix: &str) -> Result<String, CliError> {
    if store.get(prefix).is_some() {
        return Ok(prefix.to_string());
    }
    let matches: Vec<&Todo> = store
        .todos()
        .iter()
        .filter(|t| !prefix.is_empty() && t.id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [todo] => Ok(todo.id.clone()),
        [] => Err(CliError::UnknownId(prefix.to_string())),
        _ => Err(CliError::AmbiguousId {
            prefix: prefix.to_string(),
            matches: matches.len(),
        }),
    }
}

/// One line of `list` output
pub fn format_todo_line(index: usize, todo: &Todo, now: &DateTime<Local>) -> String {
    let status = if todo.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{:>3}  {} {}", index, status, todo.text);
    if let Some(category) = &todo.category {
        line.push_str(&format!("  ({})", category));
    }
    if let Some(due) = &todo.due_date {
        line.push_str(&format!("  due {}", format_due_date(due)));
        if !todo.completed {
            line.push_str(&format!(" · {}", remaining(due, now)));
        }
    }
    line.push_str(&format!("  #{}", todo.id));
    line
}

/// Handle the add command
pub fn handle_add<S: Storage, G: IdGenerator>(
    text: String,
    due: Option<String>,
    category: Option<String>,
    store: &mut TodoStore<S, G>,
) -> Result<(), CliError> {
    let due_date = parse_due_arg(due)?;
    let id = store
        .add(&text, due_date, category)
        .map(|todo| todo.id.clone())
        .ok_or(CliError::EmptyText)?;
    check_saved(store)?;
    println!("Todo added (ID: {})", id);
    Ok(())
}

/// Handle the list command
pub fn handle_list<S: Storage, G: IdGenerator>(
    search: Option<String>,
    pending: bool,
    store: &TodoStore<S, G>,
) -> Result<(), CliError> {
    let now = Local::now();
    let query = search.unwrap_or_default();
    let shown: Vec<_> = store
        .search(&query)
        .into_iter()
        .filter(|(_, todo)| !pending || !todo.completed)
        .collect();

    if shown.is_empty() {
        println!("No todos");
        return Ok(());
    }
    for (index, todo) in shown {
        println!("{}", format_todo_line(index, todo, &now));
    }
    Ok(())
}

/// Handle the toggle command
pub fn handle_toggle<S: Storage, G: IdGenerator>(id: String, store: &mut TodoStore<S, G>) -> Result<(), CliError> {
    let id = resolve_id(store, &id)?;
    store.toggle(&id);
    check_saved(store)?;
    if let Some(todo) = store.get(&id) {
        let state = if todo.completed { "done" } else { "not done" };
        println!("Marked '{}' as {}", todo.text, state);
    }
    Ok(())
}

/// Handle the delete command
pub fn handle_delete<S: Storage, G: IdGenerator>(id: String, store: &mut TodoStore<S, G>) -> Result<(), CliError> {
    let id = resolve_id(store, &id)?;
    store.delete(&id);
    check_saved(store)?;
    println!("Todo deleted (ID: {})", id);
    Ok(())
}

/// Handle the edit command
#[allow(clippy::too_many_arguments)]
pub fn handle_edit<S: Storage, G: IdGenerator>(
    id: String,
    text: Option<String>,
    due: Option<String>,
    clear_due: bool,
    category: Option<String>,
    clear_category: bool,
    store: &mut TodoStore<S, G>,
) -> Result<(), CliError> {
    let id = resolve_id(store, &id)?;
    if text.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(CliError::EmptyText);
    }

    let due_date = if clear_due {
        Some(None)
    } else {
        parse_due_arg(due)?.map(Some)
    };
    let category = if clear_category { Some(None) } else { category.map(Some) };

    store.edit(
        &id,
        TodoEdit {
            text,
            due_date,
            category,
        },
    );
    check_saved(store)?;
    println!("Todo updated (ID: {})", id);
    Ok(())
}

/// Handle the move command
pub fn handle_move<S: Storage, G: IdGenerator>(from: usize, to: usize, store: &mut TodoStore<S, G>) -> Result<(), CliError> {
    let len = store.todos().len();
    for index in [from, to] {
        if index >= len {
            return Err(CliError::IndexOutOfRange { index, len });
        }
    }
    store.reorder(from, to);
    check_saved(store)?;
    println!("Moved todo from position {} to {}", from, to);
    Ok(())
}

/// Handle the stats command
pub fn handle_stats<S: Storage, G: IdGenerator>(store: &TodoStore<S, G>) -> Result<(), CliError> {
    let counts = store.counts();
    println!("{}/{} completed, {} pending", counts.completed, counts.total, counts.pending());
    Ok(())
}
