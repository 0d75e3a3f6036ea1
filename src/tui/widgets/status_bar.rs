use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Paragraph;

use crate::Config;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

/// Join as many hints as fit in `max_width`, ending with "..." when some were left out
pub fn fit_hints(key_hints: &[String], max_width: usize) -> String {
    let mut hints_text = String::new();
    for (i, hint) in key_hints.iter().enumerate() {
        let current_len = hints_text.chars().count();
        let would_be_len = if i == 0 {
            hint.chars().count()
        } else {
            current_len + SEPARATOR.chars().count() + hint.chars().count()
        };

        if would_be_len > max_width {
            let truncate_to = max_width.saturating_sub(ELLIPSIS.len());
            if i == 0 {
                // Even the first hint is too long
                hints_text = hint.chars().take(truncate_to).collect();
            } else if current_len + ELLIPSIS.len() > max_width {
                hints_text = hints_text.chars().take(truncate_to).collect();
            }
            hints_text.push_str(ELLIPSIS);
            break;
        }

        if i > 0 {
            hints_text.push_str(SEPARATOR);
        }
        hints_text.push_str(hint);
    }
    hints_text
}

pub fn render_status_bar(f: &mut Frame, area: Rect, message: Option<&String>, key_hints: &[String], config: &Config) {
    let fg_color = parse_color(&config.theme.fg);
    let bg_color = parse_color(&config.theme.bg);
    let highlight_bg = parse_color(&config.theme.highlight_bg);
    let max_width = area.width as usize;

    let (content, style) = match message {
        Some(msg) => {
            // Status messages get a highlighted background for visibility
            let mut content = msg.clone();
            if content.chars().count() > max_width {
                content = content.chars().take(max_width.saturating_sub(3)).collect::<String>() + ELLIPSIS;
            }
            let msg_fg = get_contrast_text_color(highlight_bg);
            (content, Style::default().fg(msg_fg).bg(highlight_bg).add_modifier(Modifier::BOLD))
        }
        None => (fit_hints(key_hints, max_width), Style::default().fg(fg_color).bg(bg_color)),
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}
