use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let fg_color = parse_color(&config.theme.fg);
    let bg_color = parse_color(&config.theme.bg);

    // Calculate popup area (60% width, 70% height, centered)
    let popup_area = popup_area(area, 60, 70);

    // Clear the background first - this prevents content from showing through
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(ratatui::widgets::Wrap { trim: false });

    f.render_widget(paragraph, popup_area);
}

pub fn build_help_text(config: &Config) -> String {
    let keys = &config.key_bindings;
    let mut text = String::new();

    text.push_str("List:\n");
    text.push_str(&format!("  {} / {} or ↑ / ↓: Move selection\n", key(&keys.list_up), key(&keys.list_down)));
    text.push_str(&format!("  {} / {}: Move todo up/down\n", key(&keys.move_up), key(&keys.move_down)));
    text.push_str(&format!("  {}: Mark done / not done\n", key(&keys.toggle)));
    text.push_str(&format!("  {}: New todo\n", key(&keys.new)));
    text.push_str(&format!("  {}: Edit selected todo\n", key(&keys.edit)));
    text.push_str(&format!("  {}: Delete selected todo\n", key(&keys.delete)));
    text.push_str(&format!("  {}: Search text and category\n", key(&keys.search)));
    text.push_str("  Esc: Clear search\n");
    text.push('\n');

    text.push_str("Form:\n");
    text.push_str("  Tab / Shift+Tab: Next / previous field\n");
    text.push_str("  ↑ / ↓ on Category: Pick a category\n");
    text.push_str("  Due date: YYYY-MM-DD, empty for none\n");
    text.push_str("  Enter: Save    Esc: Cancel\n");
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Quit\n", key(&keys.quit)));
    text.push_str(&format!("  {}: Show this help (any key closes it)\n", key(&keys.help)));

    text
}
