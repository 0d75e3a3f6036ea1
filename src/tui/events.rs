use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, size as terminal_size};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::time::Duration;

use crate::config::KeyBindings;
use crate::ids::IdGenerator;
use crate::storage::Storage;
use crate::tui::app::{App, FormField, Mode};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::utils::{parse_key_binding, ParsedKeyBinding};

/// How long to wait for input before redrawing; ticks are picked up between polls
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Guard that ensures terminal state is restored even on panic
/// If the terminal is left in raw mode or alternate screen, the user's
/// terminal will be unusable.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    /// Initialize terminal state and return a guard
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Manually restore terminal state (called on normal exit)
    /// After calling this, the guard will do nothing on drop
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Ignore errors in drop - we're already in a cleanup path
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

/// Key bindings from the config, parsed once
#[derive(Debug, Clone)]
pub struct KeyMap {
    pub quit: ParsedKeyBinding,
    pub new: ParsedKeyBinding,
    pub edit: ParsedKeyBinding,
    pub delete: ParsedKeyBinding,
    pub toggle: ParsedKeyBinding,
    pub search: ParsedKeyBinding,
    pub help: ParsedKeyBinding,
    pub list_up: ParsedKeyBinding,
    pub list_down: ParsedKeyBinding,
    pub move_up: ParsedKeyBinding,
    pub move_down: ParsedKeyBinding,
}

impl KeyMap {
    pub fn from_config(bindings: &KeyBindings) -> Result<Self, TuiError> {
        let parse = |name: &str, value: &str| {
            parse_key_binding(value).map_err(|e| TuiError::KeyBindingError(format!("{}: {}", name, e)))
        };
        Ok(Self {
            quit: parse("quit", &bindings.quit)?,
            new: parse("new", &bindings.new)?,
            edit: parse("edit", &bindings.edit)?,
            delete: parse("delete", &bindings.delete)?,
            toggle: parse("toggle", &bindings.toggle)?,
            search: parse("search", &bindings.search)?,
            help: parse("help", &bindings.help)?,
            list_up: parse("list_up", &bindings.list_up)?,
            list_down: parse("list_down", &bindings.list_down)?,
            move_up: parse("move_up", &bindings.move_up)?,
            move_down: parse("move_down", &bindings.move_down)?,
        })
    }
}

pub fn run_event_loop<S: Storage, G: IdGenerator>(mut app: App<S, G>) -> Result<(), TuiError> {
    // Check terminal size before entering alternate screen
    // This allows us to show a helpful error message in the normal terminal
    let (width, height) = terminal_size()?;
    if width < Layout::MIN_WIDTH || height < Layout::MIN_HEIGHT {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, Layout::MIN_WIDTH, Layout::MIN_HEIGHT
        )));
    }

    // Setup terminal with guard to ensure restoration on panic
    let mut guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    tracing::info!(todos = app.store.todos().len(), "terminal UI started");

    loop {
        app.check_status_message_timeout();
        app.drain_ticks();

        terminal.draw(|f| {
            let layout = Layout::calculate(f.area());
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        // Only process Press events to avoid duplicate processing on Windows
        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event) {
                    break; // Quit requested
                }
            }
        }
    }

    app.shutdown();
    guard.restore()?;
    tracing::info!("terminal UI stopped");

    Ok(())
}

/// Route a key press by mode. Returns true when the app should quit.
pub fn handle_key_event<S: Storage, G: IdGenerator>(app: &mut App<S, G>, key_event: KeyEvent) -> bool {
    match app.mode {
        Mode::Help => {
            app.exit_help_mode();
            false
        }
        Mode::ConfirmDelete => {
            handle_confirm_delete(app, key_event);
            false
        }
        Mode::Search => {
            handle_search_mode(app, key_event);
            false
        }
        Mode::Form => {
            handle_form_mode(app, key_event);
            false
        }
        Mode::View => handle_view_mode(app, key_event),
    }
}

fn handle_view_mode<S: Storage, G: IdGenerator>(app: &mut App<S, G>, key_event: KeyEvent) -> bool {
    let keys = &app.keys;
    if matches_key_event(key_event, &keys.quit) {
        return true;
    }

    if matches_key_event(key_event, &keys.list_up) || key_event.code == KeyCode::Up {
        app.move_selection_up();
    } else if matches_key_event(key_event, &keys.list_down) || key_event.code == KeyCode::Down {
        app.move_selection_down();
    } else if matches_key_event(key_event, &keys.move_up) {
        app.move_selected(true);
    } else if matches_key_event(key_event, &keys.move_down) {
        app.move_selected(false);
    } else if matches_key_event(key_event, &keys.toggle) {
        app.toggle_selected();
    } else if matches_key_event(key_event, &keys.new) {
        app.enter_create_mode();
    } else if matches_key_event(key_event, &keys.edit) {
        app.enter_edit_mode();
    } else if matches_key_event(key_event, &keys.delete) {
        app.enter_delete_confirmation();
    } else if matches_key_event(key_event, &keys.search) {
        app.enter_search_mode();
    } else if matches_key_event(key_event, &keys.help) {
        app.enter_help_mode();
    } else if key_event.code == KeyCode::Esc {
        app.clear_search();
    }
    false
}

fn handle_confirm_delete<S: Storage, G: IdGenerator>(app: &mut App<S, G>, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
}

fn handle_search_mode<S: Storage, G: IdGenerator>(app: &mut App<S, G>, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Esc => app.exit_search_mode(false),
        KeyCode::Enter => app.exit_search_mode(true),
        KeyCode::Char(c) => app.add_to_search(c),
        KeyCode::Backspace => app.remove_from_search(),
        _ => {}
    }
}

fn handle_form_mode<S: Storage, G: IdGenerator>(app: &mut App<S, G>, key_event: KeyEvent) {
    let on_category = app
        .form
        .as_ref()
        .is_some_and(|form| form.current_field == FormField::Category);

    match key_event.code {
        KeyCode::Esc => app.exit_form(),
        KeyCode::Enter => app.save_form(),
        KeyCode::Tab => app.navigate_form_field(true),
        KeyCode::BackTab => app.navigate_form_field(false),
        KeyCode::Up if on_category => app.cycle_category(false),
        KeyCode::Down if on_category => app.cycle_category(true),
        code => {
            let Some(form) = app.form.as_mut() else {
                return;
            };
            let editor = form.current_editor();
            match code {
                KeyCode::Char(c) => editor.insert_char(c),
                KeyCode::Backspace => editor.delete_char(),
                KeyCode::Left => editor.move_cursor_left(),
                KeyCode::Right => editor.move_cursor_right(),
                KeyCode::Home => editor.move_cursor_home(),
                KeyCode::End => editor.move_cursor_end(),
                _ => {}
            }
        }
    }
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Use primary modifier check (Ctrl on Windows/Linux, Option/Alt on macOS)
    let has_primary_mod = crate::utils::has_primary_modifier(key_event.modifiers);
    if binding.requires_ctrl != has_primary_mod {
        return false;
    }
    binding.key_code == key_event.code
}
