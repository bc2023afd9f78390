//! Console backends for linedit.
//!
//! Platform implementations of the `linedit-core` console traits:
//! - `unix`: POSIX termios + poll, SIGWINCH resize events
//! - `windows`: console API, VT output where available
//! - `mock`: scripted input and recorded output for tests (always built)

use linedit_core::{ConsoleError, ConsoleInput, ConsoleOutput, ConsoleResult};
use std::io;

pub mod debug;
pub mod mock;

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub use unix::{UnixConsoleInput, UnixConsoleOutput};

#[cfg(windows)]
pub use windows::{WindowsConsoleInput, WindowsConsoleOutput};

pub use mock::{MockConsoleInput, MockConsoleOutput, MockOp, MockOutputHandle};

pub fn io_error_to_console_error(e: io::Error) -> ConsoleError {
    ConsoleError::Io(e.to_string())
}

/// Console input for the current platform.
pub fn create_console_input() -> ConsoleResult<Box<dyn ConsoleInput>> {
    #[cfg(unix)]
    {
        let input = unix::UnixConsoleInput::new().map_err(io_error_to_console_error)?;
        Ok(Box::new(input))
    }

    #[cfg(windows)]
    {
        let input = windows::WindowsConsoleInput::new().map_err(io_error_to_console_error)?;
        Ok(Box::new(input))
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(ConsoleError::Unsupported {
            feature: "console input".to_string(),
            platform: std::env::consts::OS.to_string(),
        })
    }
}

/// Console output for the current platform. Fails when stdout is not a
/// terminal; callers fall back to non-interactive reading.
pub fn create_console_output() -> ConsoleResult<Box<dyn ConsoleOutput>> {
    #[cfg(unix)]
    {
        let output = unix::UnixConsoleOutput::new()?;
        Ok(Box::new(output))
    }

    #[cfg(windows)]
    {
        let output = windows::WindowsConsoleOutput::new()?;
        Ok(Box::new(output))
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(ConsoleError::Unsupported {
            feature: "console output".to_string(),
            platform: std::env::consts::OS.to_string(),
        })
    }
}

/// Mock console pair for tests.
pub fn create_mock_console_io() -> (Box<dyn ConsoleInput>, Box<dyn ConsoleOutput>) {
    (
        Box::new(mock::MockConsoleInput::from_bytes(b"")),
        Box::new(mock::MockConsoleOutput::new()),
    )
}
