//! Scripted console for tests.
//!
//! [`MockConsoleInput`] feeds a byte script through the real key parser so
//! tests exercise the same decode path as a live terminal. When the script
//! runs out, reads fail; `read_line` treats that as an I/O error and
//! returns absent, which keeps runaway tests finite.
//!
//! [`MockConsoleOutput`] records every operation. Assertions usually look
//! at [`MockOutputHandle::text`] (all written text in order) or the raw op
//! list.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use linedit_core::{
    ClearType, ConsoleError, ConsoleInput, ConsoleOutput, ConsoleResult, InputCapabilities,
    KeyEvent, KeyParser, OutputCapabilities, RawModeGuard, TextStyle,
};

pub struct MockConsoleInput {
    events: Mutex<VecDeque<KeyEvent>>,
    size: (u16, u16),
}

impl MockConsoleInput {
    /// Decode a raw byte script into a queue of key events.
    pub fn from_bytes(script: &[u8]) -> Self {
        let mut parser = KeyParser::new();
        let mut events: VecDeque<KeyEvent> = parser.feed(script).into();
        events.extend(parser.flush());
        Self { events: Mutex::new(events), size: (80, 24) }
    }

    pub fn from_events(events: Vec<KeyEvent>) -> Self {
        Self { events: Mutex::new(events.into()), size: (80, 24) }
    }

    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.size = (cols, rows);
        self
    }

    /// Queue more input behind whatever is left.
    pub fn push_bytes(&self, script: &[u8]) {
        let mut parser = KeyParser::new();
        let mut events = self.events.lock().unwrap();
        events.extend(parser.feed(script));
        events.extend(parser.flush());
    }
}

impl ConsoleInput for MockConsoleInput {
    fn enable_raw_mode(&self) -> ConsoleResult<RawModeGuard> {
        Ok(RawModeGuard::new(|| {}, "mock"))
    }

    fn read_key_timeout(&self, _timeout_ms: Option<u32>) -> ConsoleResult<Option<KeyEvent>> {
        match self.events.lock().unwrap().pop_front() {
            Some(ev) => Ok(Some(ev)),
            None => Err(ConsoleError::Io("input script exhausted".to_string())),
        }
    }

    fn window_size(&self) -> ConsoleResult<(u16, u16)> {
        Ok(self.size)
    }

    fn capabilities(&self) -> InputCapabilities {
        InputCapabilities {
            is_tty: true,
            supports_resize_events: false,
            supports_bracketed_paste: true,
            platform_name: "mock".to_string(),
        }
    }
}

/// One recorded output operation.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOp {
    Text(String),
    Style(String),
    Reset,
    CursorUp(u16),
    CursorDown(u16),
    Column(u16),
    MoveTo(u16, u16),
    Clear(ClearType),
    Bell,
    BracketedPaste(bool),
    Flush,
}

/// Shared view over the operations a [`MockConsoleOutput`] recorded.
#[derive(Clone)]
pub struct MockOutputHandle {
    ops: Arc<Mutex<Vec<MockOp>>>,
}

impl MockOutputHandle {
    pub fn ops(&self) -> Vec<MockOp> {
        self.ops.lock().unwrap().clone()
    }

    /// All text written, concatenated in order.
    pub fn text(&self) -> String {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                MockOp::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn bell_count(&self) -> usize {
        self.ops.lock().unwrap().iter().filter(|op| matches!(op, MockOp::Bell)).count()
    }

    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }
}

pub struct MockConsoleOutput {
    ops: Arc<Mutex<Vec<MockOp>>>,
    color: bool,
}

impl MockConsoleOutput {
    pub fn new() -> Self {
        Self { ops: Arc::new(Mutex::new(Vec::new())), color: false }
    }

    pub fn with_color() -> Self {
        Self { ops: Arc::new(Mutex::new(Vec::new())), color: true }
    }

    pub fn handle(&self) -> MockOutputHandle {
        MockOutputHandle { ops: Arc::clone(&self.ops) }
    }

    fn push(&self, op: MockOp) {
        self.ops.lock().unwrap().push(op);
    }
}

impl Default for MockConsoleOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleOutput for MockConsoleOutput {
    fn write_text(&self, text: &str) -> ConsoleResult<()> {
        self.push(MockOp::Text(text.to_string()));
        Ok(())
    }

    fn set_style(&self, style: &TextStyle) -> ConsoleResult<()> {
        self.push(MockOp::Style(style.sgr()));
        Ok(())
    }

    fn reset_style(&self) -> ConsoleResult<()> {
        self.push(MockOp::Reset);
        Ok(())
    }

    fn cursor_up(&self, n: u16) -> ConsoleResult<()> {
        if n > 0 {
            self.push(MockOp::CursorUp(n));
        }
        Ok(())
    }

    fn cursor_down(&self, n: u16) -> ConsoleResult<()> {
        if n > 0 {
            self.push(MockOp::CursorDown(n));
        }
        Ok(())
    }

    fn set_column(&self, col: u16) -> ConsoleResult<()> {
        self.push(MockOp::Column(col));
        Ok(())
    }

    fn move_to(&self, row: u16, col: u16) -> ConsoleResult<()> {
        self.push(MockOp::MoveTo(row, col));
        Ok(())
    }

    fn clear(&self, what: ClearType) -> ConsoleResult<()> {
        self.push(MockOp::Clear(what));
        Ok(())
    }

    fn bell(&self) -> ConsoleResult<()> {
        self.push(MockOp::Bell);
        Ok(())
    }

    fn set_bracketed_paste(&self, enabled: bool) -> ConsoleResult<()> {
        self.push(MockOp::BracketedPaste(enabled));
        Ok(())
    }

    fn flush(&self) -> ConsoleResult<()> {
        self.push(MockOp::Flush);
        Ok(())
    }

    fn capabilities(&self) -> OutputCapabilities {
        OutputCapabilities {
            is_tty: true,
            supports_color: self.color,
            platform_name: "mock".to_string(),
        }
    }
}
