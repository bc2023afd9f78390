//! linedit — a portable readline alternative.
//!
//! Call [`LineReader::read_line`] with a prompt and get back a line (or a
//! multi-line block) edited interactively: cursor motion, kill/yank,
//! undo/redo, persistent history with incremental search, tab completion
//! with a candidate menu, syntax highlighting, and full UTF-8 awareness
//! including wide and combining characters. POSIX terminals and Windows
//! consoles are both supported through a minimal ANSI subset.
//!
//! # Example
//!
//! ```no_run
//! use linedit::LineReader;
//!
//! let mut reader = LineReader::new().expect("console");
//! reader.set_prompt_marker("» ");
//! while let Ok(Some(line)) = reader.read_line("math") {
//!     println!("got: {line}");
//! }
//! ```
//!
//! # Completion
//!
//! ```no_run
//! use linedit::{CompletionSet, LineReader};
//!
//! let mut reader = LineReader::new().expect("console");
//! reader.set_completer(|prefix: &str, out: &mut CompletionSet| {
//!     for kw in ["print", "println", "private"] {
//!         if kw.starts_with(out.word()) {
//!             out.add(kw, kw);
//!         }
//!     }
//!     let _ = prefix;
//! });
//! ```
//!
//! # Highlighting
//!
//! Register either a whole-buffer transformer that inserts SGR escapes, or
//! a positional painter over byte ranges:
//!
//! ```no_run
//! use linedit::{Color, Highlighter, LineReader, PaintBuf, TextStyle};
//!
//! let mut reader = LineReader::new().expect("console");
//! reader.set_highlighter(Highlighter::Painter(Box::new(|text: &str, paint: &mut PaintBuf| {
//!     if let Some(at) = text.find("let") {
//!         paint.paint(at, at + 3, TextStyle::fg(Color::Magenta));
//!     }
//! })));
//! ```

mod helpers;
mod reader;

pub use helpers::{FileCompleter, WordCompleter};
pub use reader::{LineReader, Termination};

// Core vocabulary hosts need for callbacks and configuration.
pub use linedit_core::{
    Color, Completer, Completion, CompletionSet, Highlighter, HistoryError, PaintBuf, ReadError,
    TextStyle, WordRules,
};
