use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};

pub struct Layout {
    pub inner_area: Rect, // Area inside the outer border
    pub header_area: Rect,
    pub list_area: Rect,
    pub status_area: Rect,
}

impl Layout {
    /// Minimum terminal dimensions required for the application
    /// Width: 40 columns fits a todo line with its countdown and the header counts
    /// Height: 8 lines (2 outer borders + 1 header + 3 list with borders + 1 status + 1 buffer)
    pub const MIN_WIDTH: u16 = 40;
    pub const MIN_HEIGHT: u16 = 8;

    pub fn calculate(size: Rect) -> Self {
        // Ensure minimum terminal size (accounting for outer border)
        let width = size.width.max(Self::MIN_WIDTH + 2);
        let height = size.height.max(Self::MIN_HEIGHT + 2);
        let size = Rect::new(size.x, size.y, width, height);

        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        // Split vertically: header (1 line), todo list, status (1 line)
        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Counts and search
                Constraint::Min(3),    // Todo list
                Constraint::Length(1), // Status
            ])
            .split(inner_area);

        Self {
            inner_area,
            header_area: vertical[0],
            list_area: vertical[1],
            status_area: vertical[2],
        }
    }
}
