use std::collections::HashSet;
use thiserror::Error;

use crate::ids::{IdGenerator, TimestampIdGenerator};
use crate::models::{DueDate, Todo, TodoEdit, normalize_category};
use crate::storage::{Storage, StorageError};

/// Key the collection is persisted under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "todos";

/// Generated ids are retried this many times before a collision is broken
/// with a numeric suffix
const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Malformed todo data: {0}")]
    CodecError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub completed: usize,
    pub total: usize,
}

impl Counts {
    pub fn pending(&self) -> usize {
        self.total - self.completed
    }
}

/// Serialize the whole collection in its persisted form
pub fn encode(todos: &[Todo]) -> Result<String, serde_json::Error> {
    serde_json::to_string(todos)
}

/// Parse a persisted collection
pub fn decode(raw: &str) -> Result<Vec<Todo>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Owns the todo collection and writes it through to a [`Storage`].
///
/// Nothing is written until [`TodoStore::load`] has run, so an empty store
/// can never clobber persisted data. Mutations never fail: invalid
/// arguments are ignored, and storage failures are logged and kept for
/// [`TodoStore::take_last_error`] while the in-memory state stays
/// authoritative.
pub struct TodoStore<S, G = TimestampIdGenerator> {
    storage: S,
    ids: G,
    key: String,
    todos: Vec<Todo>,
    initialized: bool,
    last_error: Option<StoreError>,
}

impl<S: Storage, G: IdGenerator> TodoStore<S, G> {
    pub fn new(storage: S, ids: G) -> Self {
        Self {
            storage,
            ids,
            key: DEFAULT_STORAGE_KEY.to_string(),
            todos: Vec::new(),
            initialized: false,
            last_error: None,
        }
    }

    /// Persist under a different storage key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Create a store and load the persisted collection
    pub fn open(storage: S, ids: G) -> Self {
        let mut store = Self::new(storage, ids);
        store.load();
        store
    }

    /// Replace the in-memory collection with the persisted one.
    ///
    /// Missing data yields an empty collection. Unreadable data is logged and
    /// also yields an empty collection. Either way the store is initialized
    /// afterwards and later mutations are written back.
    pub fn load(&mut self) {
        match self.read_persisted() {
            Ok(todos) => {
                tracing::info!(count = todos.len(), key = %self.key, "loaded todos");
                self.todos = todos;
            }
            Err(e) => {
                tracing::error!(error = %e, key = %self.key, "failed to load todos, starting empty");
                self.todos = Vec::new();
                self.last_error = Some(e);
            }
        }
        self.initialized = true;
    }

    fn read_persisted(&self) -> Result<Vec<Todo>, StoreError> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(Vec::new());
        };
        let todos = decode(&raw)?;
        Ok(drop_invalid_records(todos))
    }

    /// Add a todo at the head of the list. Blank text is ignored.
    pub fn add(&mut self, text: &str, due_date: Option<DueDate>, category: Option<String>) -> Option<&Todo> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("ignoring todo with empty text");
            return None;
        }

        let id = self.fresh_id();
        let mut todo = Todo::new(id, text.to_string());
        todo.due_date = due_date;
        todo.category = normalize_category(category);

        tracing::debug!(id = %todo.id, "added todo");
        self.todos.insert(0, todo);
        self.persist();
        self.todos.first()
    }

    /// Flip the completion flag of the todo with `id`
    pub fn toggle(&mut self, id: &str) {
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            tracing::debug!(id, "toggle ignored, no such todo");
            return;
        };
        todo.completed = !todo.completed;
        self.persist();
    }

    /// Remove the todo with `id`
    pub fn delete(&mut self, id: &str) {
        let Some(index) = self.position(id) else {
            tracing::debug!(id, "delete ignored, no such todo");
            return;
        };
        self.todos.remove(index);
        self.persist();
    }

    /// Change text, due date or category of the todo with `id` in place.
    /// Blank replacement text is ignored.
    pub fn edit(&mut self, id: &str, edit: TodoEdit) {
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            tracing::debug!(id, "edit ignored, no such todo");
            return;
        };

        let mut changed = false;
        if let Some(text) = edit.text {
            let text = text.trim();
            if !text.is_empty() && text != todo.text {
                todo.text = text.to_string();
                changed = true;
            }
        }
        if let Some(due_date) = edit.due_date {
            if todo.due_date != due_date {
                todo.due_date = due_date;
                changed = true;
            }
        }
        if let Some(category) = edit.category {
            let category = normalize_category(category);
            if todo.category != category {
                todo.category = category;
                changed = true;
            }
        }

        if changed {
            self.persist();
        }
    }

    /// Move the todo at `from` so that it ends up at `to`.
    /// Out-of-range indices are rejected.
    pub fn reorder(&mut self, from: usize, to: usize) {
        let len = self.todos.len();
        if from >= len || to >= len {
            tracing::warn!(from, to, len, "reorder ignored, index out of range");
            return;
        }
        if from == to {
            return;
        }
        let todo = self.todos.remove(from);
        self.todos.insert(to, todo);
        self.persist();
    }

    pub fn counts(&self) -> Counts {
        Counts {
            completed: self.todos.iter().filter(|t| t.completed).count(),
            total: self.todos.len(),
        }
    }

    /// Todos whose text or category contains `query`, ignoring case, paired
    /// with their index in the full list
    pub fn search(&self, query: &str) -> Vec<(usize, &Todo)> {
        let query = query.trim().to_lowercase();
        self.todos
            .iter()
            .enumerate()
            .filter(|(_, todo)| {
                query.is_empty()
                    || todo.text.to_lowercase().contains(&query)
                    || todo
                        .category
                        .as_ref()
                        .is_some_and(|c| c.to_lowercase().contains(&query))
            })
            .collect()
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.todos.iter().position(|t| t.id == id)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Most recent load or save failure, cleared on read
    pub fn take_last_error(&mut self) -> Option<StoreError> {
        self.last_error.take()
    }

    fn fresh_id(&mut self) -> String {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id();
            if self.get(&id).is_none() {
                return id;
            }
        }

        let base = self.ids.next_id();
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}-{n}");
            if self.get(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    fn persist(&mut self) {
        if !self.initialized {
            tracing::debug!("store not loaded yet, skipping write");
            return;
        }
        if let Err(e) = self.write_persisted() {
            tracing::error!(error = %e, key = %self.key, "failed to save todos");
            self.last_error = Some(e);
        }
    }

    fn write_persisted(&mut self) -> Result<(), StoreError> {
        let raw = encode(&self.todos)?;
        self.storage.set(&self.key, &raw)?;
        Ok(())
    }
}

/// Drop records with blank text and records whose id was already seen
fn drop_invalid_records(todos: Vec<Todo>) -> Vec<Todo> {
    let mut seen = HashSet::new();
    todos
        .into_iter()
        .filter(|todo| {
            if todo.text.trim().is_empty() {
                tracing::warn!(id = %todo.id, "dropping todo with empty text");
                return false;
            }
            let first = seen.insert(todo.id.clone());
            if !first {
                tracing::warn!(id = %todo.id, "dropping todo with duplicate id");
            }
            first
        })
        .collect()
}
