//! Console input/output abstraction.
//!
//! The engine never touches a file descriptor or console handle directly;
//! it speaks these two traits. Backends live in `linedit-io`: a POSIX
//! termios implementation, a Windows console implementation, and a
//! scripted mock for tests.
//!
//! The output trait is deliberately narrow — exactly the escape-sequence
//! vocabulary the renderer needs: relative cursor moves, column set,
//! erase-to-end-of-line, clear screen, SGR styling, bell, and the
//! bracketed-paste request.

use crate::key::KeyEvent;
use std::fmt;

/// Result type for console operations.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Errors from a console backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    /// Read or write against the terminal failed.
    Io(String),
    /// The backend cannot provide a required feature.
    Unsupported { feature: String, platform: String },
    /// Terminal setup or teardown failed.
    Terminal(String),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Io(msg) => write!(f, "I/O error: {msg}"),
            ConsoleError::Unsupported { feature, platform } => {
                write!(f, "'{feature}' is not supported on {platform}")
            }
            ConsoleError::Terminal(msg) => write!(f, "terminal error: {msg}"),
        }
    }
}

impl std::error::Error for ConsoleError {}

/// The 16 ANSI colors plus the terminal default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Color {
    /// SGR parameter for this color as a foreground.
    pub fn fg_code(self) -> &'static str {
        match self {
            Color::Default => "39",
            Color::Black => "30",
            Color::Red => "31",
            Color::Green => "32",
            Color::Yellow => "33",
            Color::Blue => "34",
            Color::Magenta => "35",
            Color::Cyan => "36",
            Color::White => "37",
            Color::BrightBlack => "90",
            Color::BrightRed => "91",
            Color::BrightGreen => "92",
            Color::BrightYellow => "93",
            Color::BrightBlue => "94",
            Color::BrightMagenta => "95",
            Color::BrightCyan => "96",
            Color::BrightWhite => "97",
        }
    }

    /// SGR parameter for this color as a background.
    pub fn bg_code(self) -> &'static str {
        match self {
            Color::Default => "49",
            Color::Black => "40",
            Color::Red => "41",
            Color::Green => "42",
            Color::Yellow => "43",
            Color::Blue => "44",
            Color::Magenta => "45",
            Color::Cyan => "46",
            Color::White => "47",
            Color::BrightBlack => "100",
            Color::BrightRed => "101",
            Color::BrightGreen => "102",
            Color::BrightYellow => "103",
            Color::BrightBlue => "104",
            Color::BrightMagenta => "105",
            Color::BrightCyan => "106",
            Color::BrightWhite => "107",
        }
    }
}

/// Text attributes applied to a run of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub bold: bool,
    pub underline: bool,
    pub reverse: bool,
}

impl TextStyle {
    pub fn fg(color: Color) -> Self {
        Self { foreground: Some(color), ..Self::default() }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// The SGR sequence selecting this style, or an empty string for the
    /// plain style.
    pub fn sgr(&self) -> String {
        let mut codes: Vec<&str> = Vec::new();
        if let Some(fg) = self.foreground {
            codes.push(fg.fg_code());
        }
        if let Some(bg) = self.background {
            codes.push(bg.bg_code());
        }
        if self.bold {
            codes.push("1");
        }
        if self.underline {
            codes.push("4");
        }
        if self.reverse {
            codes.push("7");
        }
        if codes.is_empty() {
            String::new()
        } else {
            format!("\x1b[{}m", codes.join(";"))
        }
    }
}

/// What the erase operation clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearType {
    /// `CSI K`: from the cursor to the end of the line.
    ToEndOfLine,
    /// `CSI 2 J`: the whole screen (only used for Ctrl-L).
    WholeScreen,
}

/// RAII guard for raw terminal mode. Restores the saved attributes on drop,
/// so every exit path — return, cancel, panic unwind — leaves the terminal
/// cooked.
pub struct RawModeGuard {
    restore: Option<Box<dyn FnOnce() + Send>>,
    platform: String,
}

impl RawModeGuard {
    pub fn new<F>(restore: F, platform: impl Into<String>) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { restore: Some(Box::new(restore)), platform: platform.into() }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Restore eagerly instead of waiting for drop.
    pub fn restore(mut self) {
        if let Some(f) = self.restore.take() {
            f();
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Some(f) = self.restore.take() {
            f();
        }
    }
}

/// Input-side capabilities of a backend.
#[derive(Debug, Clone)]
pub struct InputCapabilities {
    pub is_tty: bool,
    pub supports_resize_events: bool,
    pub supports_bracketed_paste: bool,
    pub platform_name: String,
}

/// Output-side capabilities of a backend.
#[derive(Debug, Clone)]
pub struct OutputCapabilities {
    pub is_tty: bool,
    pub supports_color: bool,
    pub platform_name: String,
}

/// Raw-mode keyboard input.
pub trait ConsoleInput {
    /// Switch the terminal to raw mode. The guard restores the previous
    /// attributes when dropped.
    fn enable_raw_mode(&self) -> ConsoleResult<RawModeGuard>;

    /// Read the next key event. `Some(ms)` bounds the wait; on timeout with
    /// a pending partial sequence the decoder flushes (this resolves a lone
    /// ESC), otherwise `Ok(None)` is returned. `None` blocks until input.
    fn read_key_timeout(&self, timeout_ms: Option<u32>) -> ConsoleResult<Option<KeyEvent>>;

    /// Current terminal size as (columns, rows).
    fn window_size(&self) -> ConsoleResult<(u16, u16)>;

    fn capabilities(&self) -> InputCapabilities;
}

/// Terminal output restricted to the renderer's vocabulary.
pub trait ConsoleOutput {
    fn write_text(&self, text: &str) -> ConsoleResult<()>;

    /// Select a style for subsequent text.
    fn set_style(&self, style: &TextStyle) -> ConsoleResult<()>;

    /// Back to the default rendition (`SGR 0`).
    fn reset_style(&self) -> ConsoleResult<()>;

    /// `CSI n A` — no-op for n = 0.
    fn cursor_up(&self, n: u16) -> ConsoleResult<()>;

    /// `CSI n B` — no-op for n = 0.
    fn cursor_down(&self, n: u16) -> ConsoleResult<()>;

    /// `CSI n G` with a 0-based column argument.
    fn set_column(&self, col: u16) -> ConsoleResult<()>;

    /// `CSI r ; c H` with 0-based arguments. Only used after a full clear.
    fn move_to(&self, row: u16, col: u16) -> ConsoleResult<()>;

    fn clear(&self, what: ClearType) -> ConsoleResult<()>;

    fn bell(&self) -> ConsoleResult<()>;

    /// Ask the terminal for bracketed paste (`CSI ? 2004 h/l`). Backends
    /// that do not support it ignore the call.
    fn set_bracketed_paste(&self, enabled: bool) -> ConsoleResult<()>;

    fn flush(&self) -> ConsoleResult<()>;

    fn capabilities(&self) -> OutputCapabilities;
}
