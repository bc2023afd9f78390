//! Core line-editing engine.
//!
//! This crate is the platform-independent half of linedit: the key model
//! and byte decoder, the display-width tables, the edit buffer with its
//! undo log, the history store, the completion model, the modal editor
//! dispatch, and the renderer. Everything terminal-specific hides behind
//! the [`console`] traits, implemented by `linedit-io`.

pub mod buffer;
pub mod completion;
pub mod console;
pub mod editor;
pub mod error;
pub mod history;
pub mod key;
pub mod key_parser;
pub mod render;
pub mod sequence_matcher;
pub mod undo;
pub mod width;

pub use buffer::EditBuffer;
pub use completion::{Completer, Completion, CompletionSet, WordPredicate, WordRules};
pub use console::{
    ClearType, Color, ConsoleError, ConsoleInput, ConsoleOutput, ConsoleResult,
    InputCapabilities, OutputCapabilities, RawModeGuard, TextStyle,
};
pub use editor::{EditOptions, EditStep, Editor, IsCompleteFn, Mode};
pub use error::{EditError, HistoryError, ReadError};
pub use history::{History, SearchDirection};
pub use key::{Key, KeyEvent};
pub use key_parser::{KeyParser, ParserState};
pub use render::{Frame, Highlighter, Overlay, PaintBuf, Renderer, SearchMatch, UiColors};
pub use sequence_matcher::{MatchResult, SequenceMatcher};
pub use undo::{EditKind, Snapshot, UndoLog};
