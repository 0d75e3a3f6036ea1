use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Scrollbar, ScrollbarOrientation, ScrollbarState};
use std::collections::HashMap;

use crate::Config;
use crate::countdown::Remaining;
use crate::models::Todo;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::utils::format_due_date;

/// Due date and live countdown for one row, e.g. "2026-10-21 · 2d 5h remaining"
pub fn due_label(todo: &Todo, remaining: Option<&Remaining>) -> Option<String> {
    let due = todo.due_date.as_ref()?;
    let mut label = format_due_date(due);
    // Completed todos keep their date but lose the countdown
    if let Some(remaining) = remaining.filter(|_| !todo.completed) {
        label.push_str(&format!(" · {}", remaining));
    }
    Some(label)
}

fn todo_line<'a>(todo: &'a Todo, remaining: Option<&Remaining>, config: &Config, max_width: usize) -> Line<'a> {
    let theme = &config.theme;
    let fg = parse_color(&theme.fg);
    let completed_fg = parse_color(&theme.completed_fg);
    let overdue_fg = parse_color(&theme.overdue_fg);

    let mark = if todo.completed { "✓ " } else { "○ " };
    let text_style = if todo.completed {
        Style::default().fg(completed_fg).add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(fg)
    };

    let mut text = todo.text.clone();
    let suffix_len = todo.category.as_ref().map_or(0, |c| c.chars().count() + 3)
        + due_label(todo, remaining).map_or(0, |d| d.chars().count() + 2);
    let text_budget = max_width.saturating_sub(mark.chars().count() + suffix_len).max(8);
    if text.chars().count() > text_budget {
        text = text.chars().take(text_budget.saturating_sub(3)).collect::<String>() + "...";
    }

    let mut spans = vec![Span::styled(mark, text_style), Span::styled(text, text_style)];
    if let Some(category) = &todo.category {
        spans.push(Span::styled(format!(" [{}]", category), Style::default().fg(completed_fg)));
    }
    if let Some(label) = due_label(todo, remaining) {
        let overdue = !todo.completed && remaining.is_some_and(|r| r.is_overdue);
        let style = if overdue {
            Style::default().fg(overdue_fg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(fg)
        };
        spans.push(Span::styled(format!("  {}", label), style));
    }
    Line::from(spans)
}

pub fn render_todo_list(
    f: &mut Frame,
    area: Rect,
    todos: &[(usize, &Todo)],
    total_count: usize,
    remaining: &HashMap<String, Remaining>,
    list_state: &mut ListState,
    config: &Config,
) {
    // Account for borders, padding and the scrollbar column
    let max_width = area.width.saturating_sub(5) as usize;

    let highlight_bg = parse_color(&config.theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);

    let items: Vec<ListItem> = todos
        .iter()
        .map(|(_, todo)| ListItem::new(todo_line(todo, remaining.get(&todo.id), config, max_width)))
        .collect();

    // Split area to reserve space for scrollbar
    let list_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let list_area = list_areas[0];
    let scrollbar_area = list_areas[1];

    let title = if todos.len() == total_count {
        format!("Todos ({})", total_count)
    } else {
        format!("Todos ({} of {})", todos.len(), total_count)
    };
    let total_items = items.len();
    let list = if items.is_empty() {
        List::new(vec![ListItem::new("Nothing to do. Press the new key to add a todo.")])
    } else {
        List::new(items)
    };
    let list = list
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(parse_color(&config.theme.fg)))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));

    f.render_stateful_widget(list, list_area, list_state);

    let visible_items = list_area.height.saturating_sub(2) as usize; // Account for borders
    if total_items > visible_items && scrollbar_area.width > 0 && visible_items > 0 {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1, // Start after top border
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );

        let mut scrollbar_state = ScrollbarState::new(total_items)
            .viewport_content_length(visible_items)
            .position(list_state.selected().unwrap_or(0));

        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");

        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_due_date;

    fn todo_due(completed: bool) -> Todo {
        let mut todo = Todo::new("a".to_string(), "Pay rent".to_string());
        todo.completed = completed;
        todo.due_date = Some(parse_due_date("2026-10-21").unwrap());
        todo
    }

    #[test]
    fn due_label_includes_countdown_for_pending_todos() {
        let remaining = Remaining::from_parts(2, 5, 0, false);
        let label = due_label(&todo_due(false), Some(&remaining)).unwrap();
        assert_eq!(label, "2026-10-21 · 2d 5h remaining");
    }

    #[test]
    fn completed_todos_show_only_the_date() {
        let remaining = Remaining::from_parts(0, 3, 0, true);
        assert_eq!(due_label(&todo_due(true), Some(&remaining)).unwrap(), "2026-10-21");
    }

    #[test]
    fn todos_without_due_date_have_no_label() {
        let todo = Todo::new("b".to_string(), "Call mom".to_string());
        assert!(due_label(&todo, None).is_none());
    }

    #[test]
    fn long_text_is_truncated_to_fit() {
        let mut todo = Todo::new("c".to_string(), "x".repeat(200));
        todo.category = Some("Work".to_string());
        let line = todo_line(&todo, None, &Config::default(), 40);
        assert!(line.width() <= 40, "{}", line.width());
    }
}
