//! Error types for the editing engine.

use std::fmt;
use std::io;

/// Errors raised by edit-buffer operations.
///
/// Every mutating operation on [`crate::buffer::EditBuffer`] is transactional:
/// when one of these is returned, the buffer and cursor are unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// A byte offset was out of range or not on a code-point boundary.
    InvalidOffset { offset: usize, len: usize },
    /// The insertion would exceed the configured buffer cap.
    BufferFull { len: usize, max: usize },
    /// Inserted bytes were not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::InvalidOffset { offset, len } => {
                write!(f, "offset {offset} is not a valid position in a buffer of {len} bytes")
            }
            EditError::BufferFull { len, max } => {
                write!(f, "buffer is full ({len} of {max} bytes)")
            }
            EditError::InvalidUtf8 => write!(f, "inserted bytes are not valid UTF-8"),
        }
    }
}

impl std::error::Error for EditError {}

/// Errors raised while loading or saving the history file.
///
/// These never abort an interactive `read_line`; callers log them to the
/// debug channel and continue.
#[derive(Debug)]
pub enum HistoryError {
    /// No file path has been configured for the store.
    NoFile,
    /// Underlying filesystem failure.
    Io(io::Error),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::NoFile => write!(f, "no history file configured"),
            HistoryError::Io(e) => write!(f, "history file error: {e}"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::Io(e) => Some(e),
            HistoryError::NoFile => None,
        }
    }
}

impl From<io::Error> for HistoryError {
    fn from(e: io::Error) -> Self {
        HistoryError::Io(e)
    }
}

/// Top-level error returned by `read_line`.
///
/// User-initiated ends (Enter, Ctrl-C, Ctrl-D) are not errors; they surface
/// as the tri-state result. Only real failures land here.
#[derive(Debug)]
pub enum ReadError {
    /// Terminal read or write failed.
    Io(io::Error),
    /// The console backend reported an unrecoverable condition.
    Console(crate::console::ConsoleError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "I/O error: {e}"),
            ReadError::Console(e) => write!(f, "console error: {e}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            ReadError::Console(e) => Some(e),
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

impl From<crate::console::ConsoleError> for ReadError {
    fn from(e: crate::console::ConsoleError) -> Self {
        ReadError::Console(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_error_display() {
        let e = EditError::InvalidOffset { offset: 7, len: 3 };
        assert_eq!(e.to_string(), "offset 7 is not a valid position in a buffer of 3 bytes");
        let e = EditError::BufferFull { len: 10, max: 10 };
        assert!(e.to_string().contains("full"));
    }

    #[test]
    fn history_error_from_io() {
        let e: HistoryError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(e, HistoryError::Io(_)));
        assert!(e.to_string().contains("nope"));
    }
}
