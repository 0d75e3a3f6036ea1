use chrono::Local;
use ratatui::widgets::ListState;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use crate::Config;
use crate::countdown::{Remaining, remaining};
use crate::ids::IdGenerator;
use crate::models::{Todo, TodoEdit};
use crate::storage::Storage;
use crate::store::TodoStore;
use crate::tui::error::TuiError;
use crate::tui::events::KeyMap;
use crate::tui::ticker::Countdowns;
use crate::tui::widgets::editor::Editor;
use crate::utils::{format_due_date, parse_due_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Search,
    Form,
    Help,
    ConfirmDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Text,
    DueDate,
    Category,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Text => FormField::DueDate,
            FormField::DueDate => FormField::Category,
            FormField::Category => FormField::Text,
        }
    }

    fn previous(self) -> Self {
        match self {
            FormField::Text => FormField::Category,
            FormField::DueDate => FormField::Text,
            FormField::Category => FormField::DueDate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TodoForm {
    /// Id of the todo being edited, `None` when creating
    pub editing: Option<String>,
    pub text: Editor,
    pub due_date: Editor,
    pub category: Editor,
    pub current_field: FormField,
}

impl TodoForm {
    fn new() -> Self {
        Self {
            editing: None,
            text: Editor::new(),
            due_date: Editor::new(),
            category: Editor::new(),
            current_field: FormField::Text,
        }
    }

    fn for_todo(todo: &Todo) -> Self {
        Self {
            editing: Some(todo.id.clone()),
            text: Editor::from_string(todo.text.clone()),
            due_date: Editor::from_string(todo.due_date.as_ref().map(format_due_date).unwrap_or_default()),
            category: Editor::from_string(todo.category.clone().unwrap_or_default()),
            current_field: FormField::Text,
        }
    }

    pub fn current_editor(&mut self) -> &mut Editor {
        match self.current_field {
            FormField::Text => &mut self.text,
            FormField::DueDate => &mut self.due_date,
            FormField::Category => &mut self.category,
        }
    }
}

pub struct App<S: Storage, G: IdGenerator> {
    pub config: Config,
    pub keys: KeyMap,
    pub store: TodoStore<S, G>,

    pub mode: Mode,
    pub list_state: ListState,
    pub search_query: String,
    pub form: Option<TodoForm>,

    pub status_message: Option<String>,
    status_time: Option<Instant>,

    pub countdowns: Countdowns,
    pub remaining: HashMap<String, Remaining>,
    ticks: Receiver<String>,
}

impl<S: Storage, G: IdGenerator> App<S, G> {
    /// Build the view over an already loaded store
    pub fn new(config: Config, store: TodoStore<S, G>) -> Result<Self, TuiError> {
        let keys = KeyMap::from_config(&config.key_bindings)?;
        let (tick_tx, ticks) = mpsc::channel();
        let countdowns = Countdowns::new(config.countdown_interval(), tick_tx);

        let mut app = Self {
            config,
            keys,
            store,
            mode: Mode::View,
            list_state: ListState::default(),
            search_query: String::new(),
            form: None,
            status_message: None,
            status_time: None,
            countdowns,
            remaining: HashMap::new(),
            ticks,
        };
        app.after_change();
        Ok(app)
    }

    /// Todos shown under the current search, with their index in the full list
    pub fn visible_todos(&self) -> Vec<(usize, &Todo)> {
        self.store.search(&self.search_query)
    }

    pub fn is_filtered(&self) -> bool {
        !self.search_query.trim().is_empty()
    }

    pub fn selected_todo(&self) -> Option<(usize, &Todo)> {
        let selected = self.list_state.selected()?;
        self.visible_todos().into_iter().nth(selected)
    }

    fn selected_id(&self) -> Option<String> {
        self.selected_todo().map(|(_, todo)| todo.id.clone())
    }

    /// Keep the selection on a visible row
    pub fn sync_list_state(&mut self) {
        let len = self.visible_todos().len();
        if len == 0 {
            self.list_state.select(None);
        } else {
            let selected = self.list_state.selected().unwrap_or(0).min(len - 1);
            self.list_state.select(Some(selected));
        }
    }

    fn select_todo(&mut self, id: &str) {
        let position = self.visible_todos().iter().position(|(_, t)| t.id == id);
        if let Some(position) = position {
            self.list_state.select(Some(position));
        }
    }

    pub fn move_selection_up(&mut self) {
        if let Some(selected) = self.list_state.selected() {
            self.list_state.select(Some(selected.saturating_sub(1)));
        }
    }

    pub fn move_selection_down(&mut self) {
        let len = self.visible_todos().len();
        if let Some(selected) = self.list_state.selected() {
            if selected + 1 < len {
                self.list_state.select(Some(selected + 1));
            }
        }
    }

    /// Bring tickers, cached countdowns and selection in line with the store,
    /// and surface any storage failure the store recorded
    fn after_change(&mut self) {
        self.countdowns.sync(self.store.todos());
        let now = Local::now();
        self.remaining = self
            .store
            .todos()
            .iter()
            .filter(|t| self.countdowns.is_tracking(&t.id))
            .filter_map(|t| t.due_date.as_ref().map(|due| (t.id.clone(), remaining(due, &now))))
            .collect();
        self.sync_list_state();

        if let Some(e) = self.store.take_last_error() {
            self.set_status_message(format!("Storage problem: {}", e));
        }
    }

    /// Recompute the countdown of one todo
    pub fn handle_tick(&mut self, id: &str) {
        if !self.countdowns.is_tracking(id) {
            return;
        }
        if let Some(due) = self.store.get(id).and_then(|t| t.due_date) {
            self.remaining.insert(id.to_string(), remaining(&due, &Local::now()));
        }
    }

    /// Apply every tick that arrived since the last frame
    pub fn drain_ticks(&mut self) {
        while let Ok(id) = self.ticks.try_recv() {
            self.handle_tick(&id);
        }
    }

    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            self.store.toggle(&id);
            self.after_change();
        }
    }

    pub fn enter_delete_confirmation(&mut self) {
        if self.selected_todo().is_some() {
            self.mode = Mode::ConfirmDelete;
        }
    }

    pub fn confirm_delete(&mut self) {
        if let Some(id) = self.selected_id() {
            self.store.delete(&id);
            self.set_status_message("Todo deleted".to_string());
            self.after_change();
        }
        self.mode = Mode::View;
    }

    pub fn cancel_delete(&mut self) {
        self.mode = Mode::View;
    }

    /// Move the selected todo one row up (`up = true`) or down
    pub fn move_selected(&mut self, up: bool) {
        if self.is_filtered() {
            self.set_status_message("Clear the search to reorder".to_string());
            return;
        }
        let Some((index, todo)) = self.selected_todo() else {
            return;
        };
        let id = todo.id.clone();
        let target = if up {
            match index.checked_sub(1) {
                Some(target) => target,
                None => return,
            }
        } else {
            index + 1
        };
        if target >= self.store.todos().len() {
            return;
        }
        self.store.reorder(index, target);
        self.after_change();
        self.select_todo(&id);
    }

    pub fn enter_search_mode(&mut self) {
        self.mode = Mode::Search;
    }

    /// Leave search input; `keep_filter = false` also clears the query
    pub fn exit_search_mode(&mut self, keep_filter: bool) {
        if !keep_filter {
            self.search_query.clear();
        }
        self.mode = Mode::View;
        self.sync_list_state();
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.sync_list_state();
    }

    pub fn add_to_search(&mut self, ch: char) {
        self.search_query.push(ch);
        self.list_state.select(Some(0));
        self.sync_list_state();
    }

    pub fn remove_from_search(&mut self) {
        self.search_query.pop();
        self.sync_list_state();
    }

    pub fn enter_create_mode(&mut self) {
        self.form = Some(TodoForm::new());
        self.mode = Mode::Form;
    }

    pub fn enter_edit_mode(&mut self) {
        let Some(form) = self.selected_todo().map(|(_, todo)| TodoForm::for_todo(todo)) else {
            return;
        };
        self.form = Some(form);
        self.mode = Mode::Form;
    }

    pub fn exit_form(&mut self) {
        self.form = None;
        self.mode = Mode::View;
    }

    pub fn navigate_form_field(&mut self, forward: bool) {
        if let Some(form) = self.form.as_mut() {
            form.current_field = if forward {
                form.current_field.next()
            } else {
                form.current_field.previous()
            };
        }
    }

    /// Step through the configured categories, like a combo-box
    pub fn cycle_category(&mut self, forward: bool) {
        let categories = &self.config.categories;
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if categories.is_empty() {
            return;
        }

        let current = categories
            .iter()
            .position(|c| c.eq_ignore_ascii_case(form.category.value.trim()));
        let next = match (current, forward) {
            (Some(i), true) => (i + 1) % categories.len(),
            (Some(i), false) => (i + categories.len() - 1) % categories.len(),
            (None, true) => 0,
            (None, false) => categories.len() - 1,
        };
        form.category.set(&categories[next]);
    }

    /// Validate the form and add or update the todo
    pub fn save_form(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let editing = form.editing.clone();
        let text = form.text.value.trim().to_string();
        let due_input = form.due_date.value.trim().to_string();
        let category = Some(form.category.value.clone());

        if text.is_empty() {
            self.set_status_message("Text is required".to_string());
            return;
        }

        // An unchanged due field keeps the stored due date and its offset
        let due_unchanged = editing.as_deref().is_some_and(|id| {
            let stored = self.store.get(id).and_then(|t| t.due_date.as_ref()).map(format_due_date);
            stored.unwrap_or_default() == due_input
        });

        let due_date = if due_input.is_empty() || due_unchanged {
            None
        } else {
            match parse_due_date(&due_input) {
                Ok(due) => Some(due),
                Err(_) => {
                    self.set_status_message(format!("Invalid date '{}', use YYYY-MM-DD", due_input));
                    return;
                }
            }
        };

        let saved_id = match editing {
            Some(id) => {
                self.store.edit(
                    &id,
                    TodoEdit {
                        text: Some(text),
                        due_date: if due_unchanged { None } else { Some(due_date) },
                        category: Some(category),
                    },
                );
                self.set_status_message("Todo updated".to_string());
                Some(id)
            }
            None => {
                let id = self.store.add(&text, due_date, category).map(|t| t.id.clone());
                self.set_status_message("Todo added".to_string());
                id
            }
        };

        self.exit_form();
        self.after_change();
        if let Some(id) = saved_id {
            self.select_todo(&id);
        }
    }

    pub fn enter_help_mode(&mut self) {
        self.mode = Mode::Help;
    }

    pub fn exit_help_mode(&mut self) {
        self.mode = Mode::View;
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
        self.status_time = None;
    }

    /// Check if status message should be auto-cleared (after 3 seconds)
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    /// Cancel all countdown tickers; called when the view is torn down
    pub fn shutdown(&mut self) {
        self.countdowns.clear();
        tracing::debug!("countdown tickers cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::Duration as TimeDelta;
    use chrono::{FixedOffset, TimeZone};

    fn app_with(texts: &[&str]) -> App<MemoryStorage, impl FnMut() -> String> {
        let mut n = 0;
        let mut store = TodoStore::open(MemoryStorage::new(), move || {
            n += 1;
            format!("t{n}")
        });
        for text in texts.iter().rev() {
            store.add(text, None, None);
        }
        App::new(Config::default(), store).unwrap()
    }

    fn texts<S: Storage, G: IdGenerator>(app: &App<S, G>) -> Vec<String> {
        app.visible_todos().iter().map(|(_, t)| t.text.clone()).collect()
    }

    #[test]
    fn starts_with_first_row_selected() {
        let app = app_with(&["a", "b"]);
        assert_eq!(app.list_state.selected(), Some(0));
        assert_eq!(app_with(&[]).list_state.selected(), None);
    }

    #[test]
    fn create_form_adds_at_top_and_selects_it() {
        let mut app = app_with(&["a", "b"]);
        app.move_selection_down();
        app.enter_create_mode();
        for ch in "new one".chars() {
            app.form.as_mut().unwrap().current_editor().insert_char(ch);
        }
        app.save_form();

        assert_eq!(app.mode, Mode::View);
        assert_eq!(texts(&app), ["new one", "a", "b"]);
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn form_rejects_bad_date_and_stays_open() {
        let mut app = app_with(&[]);
        app.enter_create_mode();
        let form = app.form.as_mut().unwrap();
        form.text.set("pay bills");
        form.due_date.set("next week");
        app.save_form();

        assert_eq!(app.mode, Mode::Form);
        assert!(app.store.todos().is_empty());
        assert!(app.status_message.as_deref().unwrap().contains("Invalid date"));
    }

    #[test]
    fn edit_form_keeps_position_and_completion() {
        let mut app = app_with(&["a", "b", "c"]);
        app.move_selection_down();
        app.toggle_selected();
        app.enter_edit_mode();
        app.form.as_mut().unwrap().text.set("b2");
        app.save_form();

        assert_eq!(texts(&app), ["a", "b2", "c"]);
        assert!(app.store.todos()[1].completed);
    }

    #[test]
    fn editing_text_keeps_due_date_in_its_own_offset() {
        let mut app = app_with(&[]);
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let due = tokyo.with_ymd_and_hms(2026, 11, 2, 0, 0, 0).unwrap();
        app.store.add("ship release", Some(due), None);
        app.after_change();

        app.enter_edit_mode();
        app.form.as_mut().unwrap().text.set("ship release v2");
        app.save_form();

        let todo = &app.store.todos()[0];
        assert_eq!(todo.text, "ship release v2");
        assert_eq!(todo.due_date, Some(due));
        assert_eq!(todo.due_date.unwrap().offset(), &tokyo);
    }

    #[test]
    fn changing_the_due_field_replaces_the_date() {
        let mut app = app_with(&[]);
        let due = FixedOffset::east_opt(9 * 3600).unwrap().with_ymd_and_hms(2026, 11, 2, 0, 0, 0).unwrap();
        app.store.add("ship release", Some(due), None);
        app.after_change();

        app.enter_edit_mode();
        app.form.as_mut().unwrap().due_date.set("2026-11-05");
        app.save_form();
        assert_eq!(app.store.todos()[0].due_date, Some(parse_due_date("2026-11-05").unwrap()));

        app.enter_edit_mode();
        app.form.as_mut().unwrap().due_date.set("");
        app.save_form();
        assert_eq!(app.store.todos()[0].due_date, None);
    }

    #[test]
    fn category_cycles_through_vocabulary() {
        let mut app = app_with(&[]);
        app.enter_create_mode();
        app.cycle_category(true);
        assert_eq!(app.form.as_ref().unwrap().category.value, app.config.categories[0]);
        app.cycle_category(false);
        let last = app.config.categories.last().unwrap().clone();
        assert_eq!(app.form.as_ref().unwrap().category.value, last);

        app.form.as_mut().unwrap().category.set("free text");
        app.cycle_category(true);
        assert_eq!(app.form.as_ref().unwrap().category.value, app.config.categories[0]);
    }

    #[test]
    fn search_filters_and_blocks_reordering() {
        let mut app = app_with(&["milk", "bread", "more milk"]);
        app.enter_search_mode();
        for ch in "milk".chars() {
            app.add_to_search(ch);
        }
        app.exit_search_mode(true);
        assert_eq!(texts(&app), ["milk", "more milk"]);

        app.move_selected(false);
        assert_eq!(app.store.todos()[0].text, "milk");
        assert!(app.status_message.is_some());

        app.clear_search();
        assert_eq!(texts(&app).len(), 3);
    }

    #[test]
    fn move_selected_follows_the_todo() {
        let mut app = app_with(&["a", "b", "c"]);
        app.move_selected(false);
        assert_eq!(texts(&app), ["b", "a", "c"]);
        assert_eq!(app.list_state.selected(), Some(1));

        app.move_selected(true);
        app.move_selected(true);
        assert_eq!(texts(&app), ["a", "b", "c"]);
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut app = app_with(&["a", "b"]);
        app.enter_delete_confirmation();
        assert_eq!(app.mode, Mode::ConfirmDelete);
        app.cancel_delete();
        assert_eq!(app.store.todos().len(), 2);

        app.move_selection_down();
        app.enter_delete_confirmation();
        app.confirm_delete();
        assert_eq!(texts(&app), ["a"]);
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn completing_a_todo_stops_its_countdown() {
        let mut app = app_with(&[]);
        let due = (Local::now() + TimeDelta::days(2)).fixed_offset();
        app.store.add("due soon", Some(due), None);
        app.after_change();
        let id = app.store.todos()[0].id.clone();
        assert!(app.countdowns.is_tracking(&id));
        assert!(!app.remaining[&id].is_overdue);

        app.toggle_selected();
        assert!(!app.countdowns.is_tracking(&id));
        assert!(!app.remaining.contains_key(&id));

        // a late tick for a completed todo is ignored
        app.handle_tick(&id);
        assert!(!app.remaining.contains_key(&id));

        app.shutdown();
        assert!(app.countdowns.is_empty());
    }

    #[test]
    fn storage_failures_show_in_status_bar() {
        let store = TodoStore::open(MemoryStorage::with_quota(8), || "x".to_string());
        let mut app = App::new(Config::default(), store).unwrap();
        app.enter_create_mode();
        app.form.as_mut().unwrap().text.set("does not fit");
        app.save_form();

        assert_eq!(app.store.todos().len(), 1);
        assert!(app.status_message.as_deref().unwrap().starts_with("Storage problem"));
    }
}
