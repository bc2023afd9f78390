//! The edit buffer: UTF-8 text plus a byte-offset cursor.
//!
//! Invariants: the text is always valid UTF-8 (guaranteed by `String`), the
//! cursor always sits on a code-point boundary, and the byte length never
//! exceeds the configured cap. Mutating operations are transactional; on
//! error the buffer is untouched.
//!
//! The buffer may hold embedded newlines during a multi-line edit. "Line"
//! here always means a logical line between `\n` bytes, not a soft-wrapped
//! terminal row; the renderer owns wrapping.

use crate::error::EditError;
use crate::undo::Snapshot;
use crate::width::{advance_columns, char_width, next_tab_stop};

/// Default hard cap on buffer size.
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct EditBuffer {
    text: String,
    cursor: usize,
    max_bytes: usize,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::with_max_bytes(DEFAULT_MAX_BYTES)
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self { text: String::new(), cursor: 0, max_bytes }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn byte_len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the whole contents, placing the cursor at the end. Used for
    /// history recall and search acceptance.
    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.cursor = self.text.len();
    }

    pub fn set_cursor(&mut self, at: usize) -> Result<(), EditError> {
        if self.text.is_char_boundary(at) {
            self.cursor = at;
            Ok(())
        } else {
            Err(EditError::InvalidOffset { offset: at, len: self.text.len() })
        }
    }

    /// Offset of the code point before `at`, if any.
    pub fn prev_offset(&self, at: usize) -> Option<usize> {
        self.text[..at].char_indices().next_back().map(|(i, _)| i)
    }

    /// Offset just past the code point at `at`, if any.
    pub fn next_offset(&self, at: usize) -> Option<usize> {
        self.text[at..].chars().next().map(|c| at + c.len_utf8())
    }

    pub fn char_at(&self, at: usize) -> Option<char> {
        self.text[at..].chars().next()
    }

    pub fn char_before(&self, at: usize) -> Option<char> {
        self.text[..at].chars().next_back()
    }

    pub fn insert_char(&mut self, c: char) -> Result<(), EditError> {
        let mut buf = [0u8; 4];
        self.insert_str(c.encode_utf8(&mut buf))
    }

    /// Insert at the cursor, advancing it past the new text.
    pub fn insert_str(&mut self, s: &str) -> Result<(), EditError> {
        if self.text.len() + s.len() > self.max_bytes {
            return Err(EditError::BufferFull { len: self.text.len(), max: self.max_bytes });
        }
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
        Ok(())
    }

    /// Delete the code point left of the cursor.
    pub fn delete_prev_char(&mut self) -> Option<char> {
        let at = self.prev_offset(self.cursor)?;
        let c = self.text.remove(at);
        self.cursor = at;
        Some(c)
    }

    /// Delete the code point at the cursor.
    pub fn delete_next_char(&mut self) -> Option<char> {
        if self.cursor >= self.text.len() {
            return None;
        }
        Some(self.text.remove(self.cursor))
    }

    /// Remove `start..end`, returning the removed text. The cursor moves to
    /// `start` when it was inside or right of the range.
    pub fn delete_range(&mut self, start: usize, end: usize) -> Result<String, EditError> {
        if start > end
            || end > self.text.len()
            || !self.text.is_char_boundary(start)
            || !self.text.is_char_boundary(end)
        {
            return Err(EditError::InvalidOffset { offset: end, len: self.text.len() });
        }
        let removed: String = self.text[start..end].to_string();
        self.text.replace_range(start..end, "");
        if self.cursor >= end {
            self.cursor -= end - start;
        } else if self.cursor > start {
            self.cursor = start;
        }
        Ok(removed)
    }

    pub fn move_left(&mut self) -> bool {
        match self.prev_offset(self.cursor) {
            Some(at) => {
                self.cursor = at;
                true
            }
            None => false,
        }
    }

    pub fn move_right(&mut self) -> bool {
        match self.next_offset(self.cursor) {
            Some(at) => {
                self.cursor = at;
                true
            }
            None => false,
        }
    }

    /// Start of the word ending at or before `at`: skip non-word code
    /// points, then take the maximal word-class run.
    pub fn word_start_before(&self, at: usize, is_word: &dyn Fn(char) -> bool) -> usize {
        let mut pos = at;
        while let Some(prev) = self.prev_offset(pos) {
            if is_word(self.char_at(prev).unwrap_or(' ')) {
                break;
            }
            pos = prev;
        }
        while let Some(prev) = self.prev_offset(pos) {
            if !is_word(self.char_at(prev).unwrap_or(' ')) {
                break;
            }
            pos = prev;
        }
        pos
    }

    /// End of the word starting at or after `at`.
    pub fn word_end_after(&self, at: usize, is_word: &dyn Fn(char) -> bool) -> usize {
        let mut pos = at;
        while let Some(c) = self.char_at(pos) {
            if is_word(c) {
                break;
            }
            pos += c.len_utf8();
        }
        while let Some(c) = self.char_at(pos) {
            if !is_word(c) {
                break;
            }
            pos += c.len_utf8();
        }
        pos
    }

    pub fn move_word_left(&mut self, is_word: &dyn Fn(char) -> bool) -> bool {
        let target = self.word_start_before(self.cursor, is_word);
        let moved = target != self.cursor;
        self.cursor = target;
        moved
    }

    pub fn move_word_right(&mut self, is_word: &dyn Fn(char) -> bool) -> bool {
        let target = self.word_end_after(self.cursor, is_word);
        let moved = target != self.cursor;
        self.cursor = target;
        moved
    }

    /// Start of the logical line containing `at`.
    pub fn line_start(&self, at: usize) -> usize {
        self.text[..at].rfind('\n').map(|i| i + 1).unwrap_or(0)
    }

    /// End of the logical line containing `at` (offset of the `\n` or EOB).
    pub fn line_end(&self, at: usize) -> usize {
        self.text[at..].find('\n').map(|i| at + i).unwrap_or(self.text.len())
    }

    pub fn is_on_first_line(&self) -> bool {
        self.line_start(self.cursor) == 0
    }

    pub fn is_on_last_line(&self) -> bool {
        self.line_end(self.cursor) == self.text.len()
    }

    pub fn move_to_line_start(&mut self) {
        self.cursor = self.line_start(self.cursor);
    }

    pub fn move_to_line_end(&mut self) {
        self.cursor = self.line_end(self.cursor);
    }

    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Display column of the cursor within its logical line.
    pub fn display_column(&self, ambiguous_wide: bool) -> usize {
        let ls = self.line_start(self.cursor);
        advance_columns(&self.text[ls..self.cursor], 0, ambiguous_wide)
    }

    /// Rendered width in cells of `start..end`, with tabs expanded against
    /// `start_col`.
    pub fn width_of_range(
        &self,
        start: usize,
        end: usize,
        start_col: usize,
        ambiguous_wide: bool,
    ) -> Result<usize, EditError> {
        if start > end
            || end > self.text.len()
            || !self.text.is_char_boundary(start)
            || !self.text.is_char_boundary(end)
        {
            return Err(EditError::InvalidOffset { offset: end, len: self.text.len() });
        }
        Ok(advance_columns(&self.text[start..end], start_col, ambiguous_wide) - start_col)
    }

    /// Move to the previous logical line, keeping the display column.
    pub fn move_line_up(&mut self, ambiguous_wide: bool) -> bool {
        let ls = self.line_start(self.cursor);
        if ls == 0 {
            return false;
        }
        let col = advance_columns(&self.text[ls..self.cursor], 0, ambiguous_wide);
        let prev_start = self.line_start(ls - 1);
        self.cursor = self.offset_at_column(prev_start, ls - 1, col, ambiguous_wide);
        true
    }

    /// Move to the next logical line, keeping the display column.
    pub fn move_line_down(&mut self, ambiguous_wide: bool) -> bool {
        let le = self.line_end(self.cursor);
        if le == self.text.len() {
            return false;
        }
        let ls = self.line_start(self.cursor);
        let col = advance_columns(&self.text[ls..self.cursor], 0, ambiguous_wide);
        let next_start = le + 1;
        let next_end = self.line_end(next_start);
        self.cursor = self.offset_at_column(next_start, next_end, col, ambiguous_wide);
        true
    }

    /// Byte offset within `start..end` where the display column reaches
    /// `target`, clamped to the line end.
    fn offset_at_column(&self, start: usize, end: usize, target: usize, ambiguous_wide: bool) -> usize {
        let mut col = 0;
        let mut pos = start;
        for c in self.text[start..end].chars() {
            let w = if c == '\t' { next_tab_stop(col) - col } else { char_width(c, ambiguous_wide) };
            if col + w > target {
                break;
            }
            col += w;
            pos += c.len_utf8();
            if col >= target {
                break;
            }
        }
        pos
    }

    /// Swap the two code points around the cursor and advance past them. At
    /// the end of a line the two before the cursor are swapped instead.
    pub fn transpose(&mut self) -> bool {
        let at_line_end = self.cursor >= self.line_end(self.cursor);
        let (a, b) = if at_line_end {
            let b = match self.prev_offset(self.cursor) {
                Some(b) => b,
                None => return false,
            };
            match self.prev_offset(b) {
                Some(a) => (a, b),
                None => return false,
            }
        } else {
            match self.prev_offset(self.cursor) {
                Some(a) => (a, self.cursor),
                None => return false,
            }
        };
        let first = match self.char_at(a) {
            Some(c) => c,
            None => return false,
        };
        let second = match self.char_at(b) {
            Some(c) if c != '\n' => c,
            _ => return false,
        };
        let end = b + second.len_utf8();
        let mut swapped = String::with_capacity(end - a);
        swapped.push(second);
        swapped.push(first);
        self.text.replace_range(a..end, &swapped);
        self.cursor = a + swapped.len();
        true
    }

    /// Leading whitespace of the cursor's logical line, for indent copying.
    pub fn leading_whitespace(&self) -> &str {
        let ls = self.line_start(self.cursor);
        let le = self.line_end(self.cursor);
        let line = &self.text[ls..le];
        let end = line
            .char_indices()
            .find(|(_, c)| !matches!(c, ' ' | '\t'))
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        &line[..end]
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot { text: self.text.clone(), cursor: self.cursor }
    }

    pub fn restore(&mut self, snap: Snapshot) {
        self.text = snap.text;
        self.cursor = snap.cursor.min(self.text.len());
        if !self.text.is_char_boundary(self.cursor) {
            self.cursor = self.prev_offset(self.cursor).unwrap_or(0);
        }
    }
}

impl Default for EditBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    fn buf(text: &str, cursor: usize) -> EditBuffer {
        let mut b = EditBuffer::new();
        b.set_text(text.to_string());
        b.set_cursor(cursor).unwrap();
        b
    }

    #[test]
    fn insert_advances_cursor() {
        let mut b = EditBuffer::new();
        b.insert_str("hé").unwrap();
        assert_eq!(b.text(), "hé");
        assert_eq!(b.cursor(), 3);
        b.set_cursor(1).unwrap();
        b.insert_char('x').unwrap();
        assert_eq!(b.text(), "hxé");
        assert_eq!(b.cursor(), 2);
    }

    #[test]
    fn cursor_must_sit_on_boundary() {
        let mut b = buf("é", 0);
        assert!(b.set_cursor(1).is_err());
        assert!(b.set_cursor(2).is_ok());
    }

    #[test]
    fn cap_is_enforced_atomically() {
        let mut b = EditBuffer::with_max_bytes(4);
        b.insert_str("abc").unwrap();
        let err = b.insert_str("de").unwrap_err();
        assert!(matches!(err, EditError::BufferFull { .. }));
        assert_eq!(b.text(), "abc");
        assert_eq!(b.cursor(), 3);
    }

    #[test]
    fn delete_prev_and_next() {
        let mut b = buf("aéb", 3);
        assert_eq!(b.delete_prev_char(), Some('é'));
        assert_eq!(b.text(), "ab");
        assert_eq!(b.cursor(), 1);
        assert_eq!(b.delete_next_char(), Some('b'));
        assert_eq!(b.text(), "a");
        assert_eq!(b.delete_next_char(), None);
    }

    #[test]
    fn delete_range_returns_removed() {
        let mut b = buf("hello world", 11);
        let removed = b.delete_range(5, 11).unwrap();
        assert_eq!(removed, " world");
        assert_eq!(b.text(), "hello");
        assert_eq!(b.cursor(), 5);
    }

    #[test]
    fn word_motion() {
        let mut b = buf("foo bar_baz  qux", 16);
        b.move_word_left(&word);
        assert_eq!(b.cursor(), 13); // start of "qux"
        b.move_word_left(&word);
        assert_eq!(b.cursor(), 4); // start of "bar_baz"
        b.move_word_right(&word);
        assert_eq!(b.cursor(), 11); // end of "bar_baz"
    }

    #[test]
    fn line_navigation() {
        let b = buf("one\ntwo\nthree", 5);
        assert_eq!(b.line_start(5), 4);
        assert_eq!(b.line_end(5), 7);
        assert!(!b.is_on_first_line());
        assert!(!b.is_on_last_line());
    }

    #[test]
    fn vertical_motion_keeps_column() {
        let mut b = buf("alpha\nbeta\ngamma", 8); // in "beta", col 2
        assert!(b.move_line_up(false));
        assert_eq!(&b.text()[b.cursor()..b.cursor() + 1], "p"); // col 2 of "alpha"
        assert!(b.move_line_down(false));
        assert!(b.move_line_down(false));
        assert_eq!(b.line_start(b.cursor()), 11); // in "gamma"
    }

    #[test]
    fn vertical_motion_clamps_to_short_line() {
        let mut b = buf("long line\nab\nlong line", 8);
        assert!(b.move_line_down(false));
        assert_eq!(b.cursor(), 12); // end of "ab"
    }

    #[test]
    fn vertical_motion_counts_wide_chars() {
        let mut b = buf("好好\nabcd", 11); // col 4 of second line
        assert!(b.move_line_up(false));
        assert_eq!(b.cursor(), 6); // after two wide chars = col 4
    }

    #[test]
    fn transpose_mid_line() {
        let mut b = buf("abcd", 2);
        assert!(b.transpose());
        assert_eq!(b.text(), "acbd");
        assert_eq!(b.cursor(), 3);
    }

    #[test]
    fn transpose_at_line_end() {
        let mut b = buf("abcd", 4);
        assert!(b.transpose());
        assert_eq!(b.text(), "abdc");
        assert_eq!(b.cursor(), 4);
    }

    #[test]
    fn transpose_multibyte() {
        let mut b = buf("aé", 3);
        assert!(b.transpose());
        assert_eq!(b.text(), "éa");
        assert_eq!(b.cursor(), 3);
    }

    #[test]
    fn transpose_needs_two_chars() {
        let mut b = buf("a", 1);
        assert!(!b.transpose());
        let mut b = buf("", 0);
        assert!(!b.transpose());
    }

    #[test]
    fn leading_whitespace_for_indent() {
        let b = buf("    let x = 1;", 10);
        assert_eq!(b.leading_whitespace(), "    ");
        let b = buf("a\n\tb", 4);
        assert_eq!(b.leading_whitespace(), "\t");
    }

    #[test]
    fn width_of_range_counts_cells() {
        let b = buf("a好\tb", 0);
        // 'a' = 1, '好' = 2, tab from col 3 to col 8 = 5
        assert_eq!(b.width_of_range(0, 5, 0, false).unwrap(), 8);
        assert!(b.width_of_range(0, 2, 0, false).is_err()); // mid-char offset
    }

    #[test]
    fn snapshot_round_trip() {
        let mut b = buf("hello", 3);
        let snap = b.snapshot();
        b.insert_str("XYZ").unwrap();
        b.restore(snap);
        assert_eq!(b.text(), "hello");
        assert_eq!(b.cursor(), 3);
    }
}
