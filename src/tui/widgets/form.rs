use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::tui::app::{FormField, TodoForm};
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::editor::Editor;
use crate::tui::widgets::popup_area_with_height;

/// Text, due date and category boxes plus a hint line
const FORM_HEIGHT: u16 = 3 * 3 + 1 + 2;

fn field_title(field: FormField) -> &'static str {
    match field {
        FormField::Text => "Text",
        FormField::DueDate => "Due date (YYYY-MM-DD)",
        FormField::Category => "Category (↑/↓ to pick)",
    }
}

fn render_field(f: &mut Frame, area: Rect, editor: &mut Editor, field: FormField, focused: bool, config: &Config) {
    let fg_color = parse_color(&config.theme.fg);
    let bg_color = parse_color(&config.theme.bg);
    let highlight_bg = parse_color(&config.theme.highlight_bg);

    let border_style = if focused {
        Style::default().fg(highlight_bg).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(fg_color)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(field_title(field))
        .border_style(border_style)
        .style(Style::default().fg(fg_color).bg(bg_color));
    let inner = block.inner(area);

    editor.update_horizontal_scroll(inner.width as usize);
    let paragraph = Paragraph::new(editor.visible_text(inner.width as usize)).block(block);
    f.render_widget(paragraph, area);

    if focused {
        if let Some((x, y)) = editor.get_cursor_screen_pos(inner) {
            f.set_cursor_position((x, y));
        }
    }
}

pub fn render_todo_form(f: &mut Frame, area: Rect, form: &mut TodoForm, config: &Config) {
    let fg_color = parse_color(&config.theme.fg);
    let bg_color = parse_color(&config.theme.bg);
    let highlight_bg = parse_color(&config.theme.highlight_bg);

    let popup_area = popup_area_with_height(area, 70, FORM_HEIGHT);
    f.render_widget(Clear, popup_area);

    let title = if form.editing.is_some() { "Edit Todo" } else { "New Todo" };
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    let inner = outer.inner(popup_area);
    f.render_widget(outer, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1), // Category choices
        ])
        .split(inner);

    let current = form.current_field;
    render_field(f, rows[0], &mut form.text, FormField::Text, current == FormField::Text, config);
    render_field(f, rows[1], &mut form.due_date, FormField::DueDate, current == FormField::DueDate, config);
    render_field(f, rows[2], &mut form.category, FormField::Category, current == FormField::Category, config);

    let choices = Paragraph::new(config.categories.join(" · "))
        .style(Style::default().fg(get_contrast_text_color(highlight_bg)).bg(highlight_bg));
    f.render_widget(choices, rows[3]);
}
