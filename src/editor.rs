use crate::models::EditorTarget;

/// Multi-line editor for task descriptions. `cursor_col` counts chars, not
/// bytes.
#[derive(Debug, Clone)]
pub struct TextEditor {
    pub content: Vec<String>,
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub scroll_offset: usize,
    pub title: String,
    pub target: EditorTarget,
    pub is_dirty: bool,
}

fn char_len(line: &str) -> usize {
    line.chars().count()
}

fn byte_index(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

impl TextEditor {
    pub fn new(title: String, target: EditorTarget, content: &str) -> Self {
        let mut lines: Vec<String> = content.split('\n').map(|s| s.to_string()).collect();
        if lines.is_empty() {
            lines.push(String::new());
        }

        TextEditor {
            content: lines,
            cursor_row: 0,
            cursor_col: 0,
            scroll_offset: 0,
            title,
            target,
            is_dirty: false,
        }
    }

    fn line_len(&self) -> usize {
        char_len(&self.content[self.cursor_row])
    }

    fn clamp_col(&mut self) {
        self.cursor_col = self.cursor_col.min(self.line_len());
    }

    pub fn insert_char(&mut self, c: char) {
        self.clamp_col();
        let line = &mut self.content[self.cursor_row];
        let at = byte_index(line, self.cursor_col);
        line.insert(at, c);
        self.cursor_col += 1;
        self.is_dirty = true;
    }

    pub fn insert_newline(&mut self) {
        self.clamp_col();
        let line = &mut self.content[self.cursor_row];
        let at = byte_index(line, self.cursor_col);
        let remaining = line.split_off(at);

        self.cursor_row += 1;
        self.cursor_col = 0;
        self.content.insert(self.cursor_row, remaining);
        self.is_dirty = true;
    }

    /// Backspace. At column 0 the line is joined onto the previous one.
    pub fn delete_char(&mut self) {
        self.clamp_col();
        if self.cursor_col > 0 {
            let line = &mut self.content[self.cursor_row];
            let at = byte_index(line, self.cursor_col - 1);
            line.remove(at);
            self.cursor_col -= 1;
            self.is_dirty = true;
        } else if self.cursor_row > 0 {
            let current_line = self.content.remove(self.cursor_row);
            self.cursor_row -= 1;
            self.cursor_col = self.line_len();
            self.content[self.cursor_row].push_str(&current_line);
            self.is_dirty = true;
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_row > 0 {
            self.cursor_row -= 1;
            self.cursor_col = self.line_len();
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_col < self.line_len() {
            self.cursor_col += 1;
        } else if self.cursor_row + 1 < self.content.len() {
            self.cursor_row += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor_row > 0 {
            self.cursor_row -= 1;
            self.clamp_col();
        }
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor_row + 1 < self.content.len() {
            self.cursor_row += 1;
            self.clamp_col();
        }
    }

    pub fn page_up(&mut self, visible_height: usize) {
        self.cursor_row = self.cursor_row.saturating_sub(visible_height);
        self.clamp_col();
        self.adjust_scroll_with_height(visible_height);
    }

    pub fn page_down(&mut self, visible_height: usize) {
        self.cursor_row = (self.cursor_row + visible_height).min(self.content.len() - 1);
        self.clamp_col();
        self.adjust_scroll_with_height(visible_height);
    }

    pub fn move_to_start_of_line(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_to_end_of_line(&mut self) {
        self.cursor_col = self.line_len();
    }

    // Keep the cursor row inside the visible window
    pub fn adjust_scroll_with_height(&mut self, visible_height: usize) {
        let visible_height = visible_height.max(1);
        if self.cursor_row < self.scroll_offset {
            self.scroll_offset = self.cursor_row;
        } else if self.cursor_row >= self.scroll_offset + visible_height {
            self.scroll_offset = self.cursor_row + 1 - visible_height;
        }
    }

    pub fn get_content(&self) -> String {
        self.content.join("\n")
    }
}
