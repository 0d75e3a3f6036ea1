use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::ids::IdGenerator;
use crate::storage::Storage;
use crate::tui::app::Mode;
use crate::tui::widgets::{
    color::parse_color, confirm_delete::render_confirm_delete, form::render_todo_form, help::render_help,
    status_bar::render_status_bar, todo_list::render_todo_list,
};
use crate::tui::{App, Layout};
use crate::utils::format_key_binding_for_display as key;

pub fn render<S: Storage, G: IdGenerator>(f: &mut Frame, app: &mut App<S, G>, layout: &Layout) {
    let fg_color = parse_color(&app.config.theme.fg);
    let bg_color = parse_color(&app.config.theme.bg);
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("countdo")
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(outer_block, f.area());

    f.render_widget(Paragraph::new(header_line(app)), layout.header_area);

    // Borrow fields separately so the list state can be handed out mutably
    let total = app.store.todos().len();
    let visible = app.store.search(&app.search_query);
    render_todo_list(
        f,
        layout.list_area,
        &visible,
        total,
        &app.remaining,
        &mut app.list_state,
        &app.config,
    );

    match app.mode {
        Mode::Help => render_help(f, f.area(), &app.config),
        Mode::ConfirmDelete => {
            if let Some((_, todo)) = app.selected_todo() {
                render_confirm_delete(f, f.area(), todo, &app.config);
            }
        }
        Mode::Form => {
            if let Some(form) = app.form.as_mut() {
                render_todo_form(f, f.area(), form, &app.config);
            }
        }
        Mode::View | Mode::Search => {}
    }

    let key_hints = get_key_hints(app);
    render_status_bar(f, layout.status_area, app.status_message.as_ref(), &key_hints, &app.config);
}

/// "3/7 completed" on the left, the search query when one is active
fn header_line<S: Storage, G: IdGenerator>(app: &App<S, G>) -> Line<'static> {
    let counts = app.store.counts();
    let mut spans = vec![Span::raw(format!(
        "{}/{} completed · {} pending",
        counts.completed,
        counts.total,
        counts.pending()
    ))];
    if app.mode == Mode::Search {
        spans.push(Span::raw(format!("    Search: {}_", app.search_query)));
    } else if app.is_filtered() {
        spans.push(Span::raw(format!("    Filter: {}", app.search_query)));
    }
    Line::from(spans)
}

fn get_key_hints<S: Storage, G: IdGenerator>(app: &App<S, G>) -> Vec<String> {
    let keys = &app.config.key_bindings;
    match app.mode {
        Mode::Help => vec!["Any key: Close help".to_string()],
        Mode::ConfirmDelete => vec!["y: Delete".to_string(), "n: Keep".to_string()],
        Mode::Search => vec![
            "Enter: Keep filter".to_string(),
            "Esc: Clear search".to_string(),
        ],
        Mode::Form => vec![
            "Tab/Shift+Tab: Switch field".to_string(),
            "Enter: Save".to_string(),
            "Esc: Cancel".to_string(),
        ],
        Mode::View => vec![
            format!("{}: Quit", key(&keys.quit)),
            format!("{}: New", key(&keys.new)),
            format!("{}: Toggle", key(&keys.toggle)),
            format!("{}: Edit", key(&keys.edit)),
            format!("{}: Delete", key(&keys.delete)),
            format!("{}: Search", key(&keys.search)),
            format!("{}/{}: Reorder", key(&keys.move_up), key(&keys.move_down)),
            format!("{}: Help", key(&keys.help)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use crate::storage::MemoryStorage;
    use crate::store::TodoStore;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn app() -> App<MemoryStorage, impl IdGenerator> {
        let mut n = 0;
        let mut store = TodoStore::open(MemoryStorage::new(), move || {
            n += 1;
            format!("r{n}")
        });
        store.add("Buy milk", None, Some("Shopping".to_string()));
        store.add("File taxes", None, None);
        store.toggle("r2");
        App::new(Config::default(), store).unwrap()
    }

    fn draw(app: &mut App<MemoryStorage, impl IdGenerator>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|f| {
                let layout = Layout::calculate(f.area());
                render(f, app, &layout);
            })
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn shows_counts_and_todos() {
        let mut app = app();
        let screen = draw(&mut app);
        assert!(screen.contains("1/2 completed · 1 pending"), "{screen}");
        assert!(screen.contains("File taxes"));
        assert!(screen.contains("Buy milk [Shopping]"));
    }

    #[test]
    fn search_header_shows_the_query() {
        let mut app = app();
        app.enter_search_mode();
        app.add_to_search('m');
        app.add_to_search('i');
        let screen = draw(&mut app);
        assert!(screen.contains("Search: mi_"));
        assert!(screen.contains("Todos (1 of 2)"));
        assert!(!screen.contains("File taxes"));
    }

    #[test]
    fn form_popup_titles_follow_the_action() {
        let mut app = app();
        app.enter_create_mode();
        assert!(draw(&mut app).contains("New Todo"));
        app.exit_form();
        app.enter_edit_mode();
        assert!(draw(&mut app).contains("Edit Todo"));
    }
}
