//! Frame layout and terminal redraw.
//!
//! The renderer turns editor state into a logical frame — prompt and
//! continuation prefixes, the buffer soft-wrapped against the terminal
//! width, optional highlight escapes, an inline hint, and a transient
//! overlay — and redraws it in place. No alternate screen is used: the
//! renderer remembers how many rows the previous frame occupied and where
//! the cursor sat in them, moves back to the frame origin, and rewrites
//! each line behind an erase-to-end-of-line. A resize or Ctrl-L invalidates
//! the memory and forces a full redraw.

use crate::console::{ClearType, Color, ConsoleOutput, ConsoleResult, TextStyle};
use crate::width::{char_width, next_tab_stop, EscapeSkipper};

/// Colors for the interface elements around the user's text.
#[derive(Debug, Clone, Copy)]
pub struct UiColors {
    pub prompt: Color,
    pub info: Color,
    pub diminish: Color,
    pub emphasis: Color,
    pub hint: Color,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            prompt: Color::Default,
            info: Color::Cyan,
            diminish: Color::BrightBlack,
            emphasis: Color::BrightGreen,
            hint: Color::BrightBlack,
        }
    }
}

/// Byte-range styling collected from a positional highlighter.
#[derive(Debug, Default)]
pub struct PaintBuf {
    spans: Vec<(usize, usize, TextStyle)>,
}

impl PaintBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paint `start..end` (byte offsets into the buffer) with `style`.
    /// Later calls win on overlap.
    pub fn paint(&mut self, start: usize, end: usize, style: TextStyle) {
        if start < end {
            self.spans.push((start, end, style));
        }
    }

    fn style_at(&self, offset: usize) -> Option<&TextStyle> {
        self.spans
            .iter()
            .rev()
            .find(|(s, e, _)| (*s..*e).contains(&offset))
            .map(|(_, _, st)| st)
    }

    /// Interleave SGR escapes into `text` according to the painted spans.
    fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut current: Option<TextStyle> = None;
        for (i, c) in text.char_indices() {
            let wanted = self.style_at(i).copied();
            if wanted != current {
                out.push_str("\x1b[0m");
                if let Some(style) = &wanted {
                    out.push_str(&style.sgr());
                }
                current = wanted;
            }
            out.push(c);
        }
        if current.is_some() {
            out.push_str("\x1b[0m");
        }
        out
    }
}

/// The two shapes of host syntax highlighting.
pub enum Highlighter {
    /// Pure function from the buffer to an escape-painted string. The
    /// visible characters must be unchanged.
    Transform(Box<dyn Fn(&str) -> String>),
    /// Positional painter over byte ranges.
    Painter(Box<dyn Fn(&str, &mut PaintBuf)>),
}

impl Highlighter {
    fn apply(&self, text: &str) -> String {
        match self {
            Highlighter::Transform(f) => f(text),
            Highlighter::Painter(f) => {
                let mut paint = PaintBuf::new();
                f(text, &mut paint);
                paint.apply(text)
            }
        }
    }
}

/// The matched entry shown in the search modeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub text: String,
    /// Byte range of the matched substring within `text`.
    pub start: usize,
    pub len: usize,
}

/// Transient display below the input line, owned by the editor mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Menu { items: Vec<String>, selected: usize },
    Search { forward: bool, pattern: String, matched: Option<SearchMatch> },
    Help(Vec<String>),
}

/// Everything one redraw needs.
pub struct Frame {
    /// First-line prefix: prompt text plus marker, unstyled.
    pub prompt: String,
    /// Prefix for subsequent logical lines.
    pub continuation: String,
    /// Buffer contents.
    pub text: String,
    /// Cursor byte offset into `text`.
    pub cursor: usize,
    /// Ghost text drawn at the cursor in the hint color.
    pub hint: Option<String>,
    pub overlay: Option<Overlay>,
}

/// Menu rows shown at once; longer lists page around the selection.
const MENU_PAGE_ROWS: usize = 8;

pub struct Renderer {
    out: Box<dyn ConsoleOutput>,
    width: usize,
    height: usize,
    rows_drawn: usize,
    cursor_row: usize,
    color_enabled: bool,
    beep_enabled: bool,
    ambiguous_wide: bool,
    colors: UiColors,
}

impl Renderer {
    pub fn new(out: Box<dyn ConsoleOutput>, width: u16, height: u16) -> Self {
        let color_enabled = out.capabilities().supports_color;
        Self {
            out,
            width: width.max(2) as usize,
            height: height.max(2) as usize,
            rows_drawn: 0,
            cursor_row: 0,
            color_enabled,
            beep_enabled: true,
            ambiguous_wide: false,
            colors: UiColors::default(),
        }
    }

    pub fn output(&self) -> &dyn ConsoleOutput {
        &*self.out
    }

    pub fn set_colors(&mut self, colors: UiColors) {
        self.colors = colors;
    }

    pub fn set_color_enabled(&mut self, enabled: bool) {
        self.color_enabled = enabled;
    }

    pub fn set_beep_enabled(&mut self, enabled: bool) {
        self.beep_enabled = enabled;
    }

    pub fn set_ambiguous_wide(&mut self, wide: bool) {
        self.ambiguous_wide = wide;
    }

    /// Note a new terminal size and forget the previous frame.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width.max(2) as usize;
        self.height = height.max(2) as usize;
        self.invalidate();
    }

    /// Forget the previous frame; the next render starts at the current
    /// cursor line.
    pub fn invalidate(&mut self) {
        self.rows_drawn = 0;
        self.cursor_row = 0;
    }

    pub fn bell(&self) -> ConsoleResult<()> {
        if self.beep_enabled {
            self.out.bell()?;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Redraw the frame in place.
    pub fn render(&mut self, frame: &Frame, highlighter: Option<&Highlighter>) -> ConsoleResult<()> {
        let layout = self.layout(frame, highlighter);
        self.emit(&layout)
    }

    /// Ctrl-L: wipe the screen and draw the frame at the top.
    pub fn clear_screen(&mut self, frame: &Frame, highlighter: Option<&Highlighter>) -> ConsoleResult<()> {
        self.out.clear(ClearType::WholeScreen)?;
        self.out.move_to(0, 0)?;
        self.invalidate();
        self.render(frame, highlighter)
    }

    /// Leave the frame on screen and move to a fresh line below it. Called
    /// once when `read_line` ends.
    pub fn finish(&mut self) -> ConsoleResult<()> {
        let below = self.rows_drawn.saturating_sub(1 + self.cursor_row);
        self.out.cursor_down(below as u16)?;
        self.out.reset_style()?;
        self.out.write_text("\r\n")?;
        self.out.flush()?;
        self.invalidate();
        Ok(())
    }

    fn layout(&self, frame: &Frame, highlighter: Option<&Highlighter>) -> Layout {
        let mut rows: Vec<String> = Vec::new();
        let mut row = String::new();
        let mut col = 0usize;

        let prompt_style = self.style(TextStyle::fg(self.colors.prompt));
        self.open_row(&mut row, &mut col, &frame.prompt, &prompt_style);

        let styled = match (self.color_enabled, highlighter) {
            (true, Some(h)) => h.apply(&frame.text),
            _ => frame.text.clone(),
        };
        let cursor_chars = frame.text[..frame.cursor].chars().count();

        let mut cursor_pos: Option<(usize, usize)> = None;
        let mut seen = 0usize;
        let mut skip = EscapeSkipper::new();
        for c in styled.chars() {
            if skip.step(c) {
                row.push(c);
                continue;
            }
            if seen == cursor_chars {
                cursor_pos = Some((rows.len(), col));
            }
            seen += 1;
            match c {
                '\n' => {
                    rows.push(std::mem::take(&mut row));
                    col = 0;
                    let cont_style = self.style(TextStyle::fg(self.colors.prompt));
                    self.open_row(&mut row, &mut col, &frame.continuation, &cont_style);
                }
                '\t' => {
                    let stop = next_tab_stop(col).min(self.width);
                    while col < stop {
                        row.push(' ');
                        col += 1;
                    }
                }
                _ => {
                    let w = char_width(c, self.ambiguous_wide);
                    if w > 0 && col + w > self.width {
                        rows.push(std::mem::take(&mut row));
                        col = 0;
                    }
                    row.push(c);
                    col += w;
                }
            }
        }
        if cursor_pos.is_none() && seen == cursor_chars {
            cursor_pos = Some((rows.len(), col));
        }

        if let Some(hint) = frame.hint.as_deref() {
            let hint_style = self.style(TextStyle::fg(self.colors.hint));
            row.push_str(&hint_style);
            for c in hint.chars() {
                let w = char_width(c, self.ambiguous_wide);
                if w > 0 && col + w > self.width {
                    row.push_str(&self.reset());
                    rows.push(std::mem::take(&mut row));
                    col = 0;
                    row.push_str(&hint_style);
                }
                row.push(c);
                col += w;
            }
            row.push_str(&self.reset());
        }
        rows.push(row);

        if let Some(overlay) = &frame.overlay {
            self.layout_overlay(overlay, &mut rows);
        }

        let (cursor_row, cursor_col) = cursor_pos.unwrap_or((0, 0));
        Layout { rows, cursor_row, cursor_col }
    }

    fn open_row(&self, row: &mut String, col: &mut usize, prefix: &str, style: &str) {
        if !prefix.is_empty() {
            row.push_str(style);
            row.push_str(prefix);
            row.push_str(&self.reset());
            *col = crate::width::advance_columns(prefix, *col, self.ambiguous_wide);
        }
    }

    fn layout_overlay(&self, overlay: &Overlay, rows: &mut Vec<String>) {
        match overlay {
            Overlay::Menu { items, selected } => {
                let page_rows = MENU_PAGE_ROWS.min(self.height.saturating_sub(2)).max(1);
                let page = *selected / page_rows * page_rows;
                let end = (page + page_rows).min(items.len());
                for (i, item) in items[page..end].iter().enumerate() {
                    let index = page + i;
                    let style = if index == *selected {
                        TextStyle { reverse: true, foreground: Some(self.colors.emphasis), ..TextStyle::default() }
                    } else {
                        TextStyle::fg(self.colors.info)
                    };
                    let mut row = self.style(style);
                    row.push_str(&self.truncate(item));
                    row.push_str(&self.reset());
                    rows.push(row);
                }
                if end < items.len() {
                    let mut row = self.style(TextStyle::fg(self.colors.diminish));
                    row.push_str(&format!("({} more)", items.len() - end));
                    row.push_str(&self.reset());
                    rows.push(row);
                }
            }
            Overlay::Search { forward, pattern, matched } => {
                let label = if *forward { "(i-search)" } else { "(reverse-i-search)" };
                let mut row = String::new();
                row.push_str(&self.style(TextStyle::fg(self.colors.diminish)));
                row.push_str(label);
                row.push_str(&self.reset());
                row.push('\'');
                row.push_str(pattern);
                row.push_str("': ");
                if let Some(m) = matched {
                    let end = (m.start + m.len).min(m.text.len());
                    row.push_str(&self.style(TextStyle::fg(self.colors.diminish)));
                    row.push_str(&m.text[..m.start]);
                    row.push_str(&self.reset());
                    row.push_str(&self.style(TextStyle::fg(self.colors.emphasis)));
                    row.push_str(&m.text[m.start..end]);
                    row.push_str(&self.reset());
                    row.push_str(&self.style(TextStyle::fg(self.colors.diminish)));
                    row.push_str(&m.text[end..]);
                    row.push_str(&self.reset());
                }
                rows.push(self.truncate(&row));
            }
            Overlay::Help(lines) => {
                let style = self.style(TextStyle::fg(self.colors.info));
                for line in lines {
                    let mut row = style.clone();
                    row.push_str(&self.truncate(line));
                    row.push_str(&self.reset());
                    rows.push(row);
                }
            }
        }
    }

    /// Cut a row's visible width down to the terminal width, keeping any
    /// escape sequences intact.
    fn truncate(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut col = 0;
        let mut skip = EscapeSkipper::new();
        for c in s.chars() {
            if skip.step(c) {
                out.push(c);
                continue;
            }
            let w = char_width(c, self.ambiguous_wide);
            if col + w > self.width.saturating_sub(1) {
                break;
            }
            out.push(c);
            col += w;
        }
        out
    }

    fn style(&self, style: TextStyle) -> String {
        if self.color_enabled {
            style.sgr()
        } else {
            String::new()
        }
    }

    fn reset(&self) -> String {
        if self.color_enabled {
            "\x1b[0m".to_string()
        } else {
            String::new()
        }
    }

    fn emit(&mut self, layout: &Layout) -> ConsoleResult<()> {
        self.out.cursor_up(self.cursor_row as u16)?;
        self.out.set_column(0)?;
        for (i, row) in layout.rows.iter().enumerate() {
            self.out.clear(ClearType::ToEndOfLine)?;
            self.out.write_text(row)?;
            if i + 1 < layout.rows.len() {
                self.out.write_text("\r\n")?;
            }
        }
        // wipe rows the previous frame drew below the new one
        let orphans = self.rows_drawn.saturating_sub(layout.rows.len());
        for _ in 0..orphans {
            self.out.write_text("\r\n")?;
            self.out.clear(ClearType::ToEndOfLine)?;
        }
        self.out.cursor_up(orphans as u16)?;

        let up = layout.rows.len() - 1 - layout.cursor_row;
        self.out.cursor_up(up as u16)?;
        self.out.set_column(layout.cursor_col as u16)?;
        self.out.flush()?;

        self.rows_drawn = layout.rows.len();
        self.cursor_row = layout.cursor_row;
        Ok(())
    }
}

struct Layout {
    rows: Vec<String>,
    cursor_row: usize,
    cursor_col: usize,
}
