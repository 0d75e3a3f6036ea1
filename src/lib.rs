pub mod cli;
pub mod config;
pub mod countdown;
pub mod database;
pub mod ids;
pub mod logging;
pub mod models;
pub mod storage;
pub mod store;
pub mod tui;
pub mod utils;

pub use config::Config;
pub use countdown::{Remaining, format_remaining, remaining};
pub use database::SqliteStorage;
pub use ids::{IdGenerator, TimestampIdGenerator};
pub use models::{DueDate, Todo, TodoEdit};
pub use storage::{MemoryStorage, Storage, StorageError};
pub use store::{Counts, StoreError, TodoStore};
pub use utils::Profile;
