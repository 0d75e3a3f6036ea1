use ratatui::layout::Rect;
use std::cmp;

/// Single-line text field with a character-indexed cursor and horizontal scroll.
#[derive(Debug, Clone, Default)]
pub struct Editor {
    pub value: String,
    pub cursor_col: usize,
    pub scroll_col: usize, // Horizontal scroll (column offset)
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_string(content: String) -> Self {
        // Use chars().count() for UTF-8 safe character count, not byte count
        let cursor_col = content.chars().count();
        Self {
            value: content,
            cursor_col,
            scroll_col: 0,
        }
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, col: usize) -> usize {
        self.value
            .char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn insert_char(&mut self, ch: char) {
        let col = cmp::min(self.cursor_col, self.len());
        let at = self.byte_index(col);
        self.value.insert(at, ch);
        self.cursor_col = col + 1;
    }

    /// Delete the character before the cursor
    pub fn delete_char(&mut self) {
        let col = cmp::min(self.cursor_col, self.len());
        if col == 0 {
            return;
        }
        let at = self.byte_index(col - 1);
        self.value.remove(at);
        self.cursor_col = col - 1;
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_col = self.cursor_col.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor_col = cmp::min(self.cursor_col + 1, self.len());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_col = self.len();
    }

    /// Replace the whole value, cursor at the end
    pub fn set(&mut self, content: &str) {
        *self = Self::from_string(content.to_string());
    }

    pub fn update_horizontal_scroll(&mut self, viewport_width: usize) {
        let effective_width = viewport_width.max(1);
        if self.cursor_col < self.scroll_col {
            // Cursor is to the left of visible area
            self.scroll_col = self.cursor_col;
        } else if self.cursor_col >= self.scroll_col + effective_width {
            // Cursor is to the right of visible area
            self.scroll_col = self.cursor_col + 1 - effective_width;
        }
    }

    /// The part of the value that fits in `viewport_width` columns
    pub fn visible_text(&self, viewport_width: usize) -> String {
        self.value.chars().skip(self.scroll_col).take(viewport_width).collect()
    }

    pub fn to_string(&self) -> String {
        self.value.clone()
    }

    /// Cursor position on screen when the field is drawn inside `area` (no borders)
    pub fn get_cursor_screen_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let visible_col = self.cursor_col.checked_sub(self.scroll_col)?;
        if visible_col >= area.width as usize {
            return None; // Cursor is to the right of visible area
        }
        Some((area.x + visible_col as u16, area.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_and_deletes_at_cursor() {
        let mut editor = Editor::from_string("helo".to_string());
        editor.move_cursor_left();
        editor.insert_char('l');
        assert_eq!(editor.to_string(), "hello");
        editor.move_cursor_home();
        editor.delete_char();
        assert_eq!(editor.to_string(), "hello");
        editor.move_cursor_end();
        editor.delete_char();
        assert_eq!(editor.to_string(), "hell");
    }

    #[test]
    fn handles_multibyte_characters() {
        let mut editor = Editor::from_string("café".to_string());
        editor.delete_char();
        editor.insert_char('é');
        editor.move_cursor_left();
        editor.insert_char('ü');
        assert_eq!(editor.to_string(), "cafüé");
        assert_eq!(editor.cursor_col, 4);
    }

    #[test]
    fn scrolls_to_keep_cursor_visible() {
        let mut editor = Editor::from_string("abcdefghij".to_string());
        editor.update_horizontal_scroll(4);
        assert_eq!(editor.visible_text(4), "hij");
        assert_eq!(editor.get_cursor_screen_pos(Rect::new(10, 3, 4, 1)), Some((13, 3)));

        editor.move_cursor_home();
        editor.update_horizontal_scroll(4);
        assert_eq!(editor.visible_text(4), "abcd");
    }
}
