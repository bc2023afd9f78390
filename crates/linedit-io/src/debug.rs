//! File-backed debug logging.
//!
//! A line editor cannot print diagnostics to the terminal it is editing,
//! so debug output goes to a file instead. Set `LINEDIT_DEBUG=1` to enable;
//! lines land in `tmp/linedit-debug.log` when a `tmp` directory exists,
//! otherwise `/tmp/linedit-debug.log`. Disabled, the macro costs one
//! atomic load.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();
static LOG_FILE: Mutex<Option<std::fs::File>> = Mutex::new(None);

const ENV_ENABLE_LOG: &str = "LINEDIT_DEBUG";

fn init_logger() {
    INIT.call_once(|| {
        if let Ok(val) = std::env::var(ENV_ENABLE_LOG) {
            if val == "true" || val == "1" {
                let log_path = if std::path::Path::new("tmp").exists() {
                    "tmp/linedit-debug.log"
                } else {
                    "/tmp/linedit-debug.log"
                };
                match OpenOptions::new().create(true).append(true).open(log_path) {
                    Ok(file) => {
                        *LOG_FILE.lock().unwrap() = Some(file);
                        eprintln!("linedit debug log enabled: {log_path}");
                    }
                    Err(e) => {
                        eprintln!("failed to open debug log {log_path}: {e}");
                    }
                }
            }
        }
    });
}

pub fn write_log(msg: &str) {
    init_logger();
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(ref mut file) = *guard {
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            if writeln!(file, "[{timestamp}] {msg}").is_ok() {
                let _ = file.flush();
            }
        }
    }
}

#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::debug::write_log(&format!($($arg)*));
    };
}
