use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::models::Todo;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area_with_height;

pub fn render_confirm_delete(f: &mut Frame, area: Rect, todo: &Todo, config: &Config) {
    let fg_color = parse_color(&config.theme.fg);
    let bg_color = parse_color(&config.theme.bg);
    let base = Style::default().fg(fg_color).bg(bg_color);

    let popup_area = popup_area_with_height(area, 50, 7);

    // Clear the background first - this prevents content from showing through
    f.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from(Span::styled("Delete this todo?", base)),
        Line::from(Span::styled(todo.text.clone(), base.add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled("y / Enter: Delete    n / Esc: Keep", base)),
    ];

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Delete")
                .title_alignment(Alignment::Center)
                .style(base),
        )
        .style(base)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
