//! POSIX console backend: termios raw mode, poll-driven reads, SIGWINCH.
//!
//! Raw mode is a scoped acquisition. The saved termios also lands in a
//! process-wide slot that an `atexit`-registered handler restores, so even
//! an abort cannot leave the terminal raw.

use std::collections::VecDeque;
use std::io;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};

use linedit_core::{
    ConsoleError, ConsoleInput, ConsoleOutput, ConsoleResult, ClearType, InputCapabilities,
    Key, KeyEvent, KeyParser, OutputCapabilities, RawModeGuard, TextStyle,
};

use crate::debug_log;

/// Set by the SIGWINCH handler, drained by the read loop.
static WINCH: AtomicBool = AtomicBool::new(false);

/// Original terminal attributes for the atexit/abort restore path.
static SAVED_TERMIOS: Mutex<Option<(i32, libc::termios)>> = Mutex::new(None);
static TEARDOWN: Once = Once::new();

extern "C" fn on_sigwinch(_sig: libc::c_int) {
    WINCH.store(true, Ordering::SeqCst);
}

extern "C" fn restore_on_exit() {
    if let Ok(saved) = SAVED_TERMIOS.lock() {
        if let Some((fd, termios)) = *saved {
            unsafe {
                libc::tcsetattr(fd, libc::TCSANOW, &termios);
            }
        }
    }
}

fn io_err(e: io::Error) -> ConsoleError {
    ConsoleError::Io(e.to_string())
}

pub struct UnixConsoleInput {
    fd: i32,
    parser: Mutex<KeyParser>,
    pending: Mutex<VecDeque<KeyEvent>>,
}

impl UnixConsoleInput {
    pub fn new() -> io::Result<Self> {
        let fd = io::stdin().as_raw_fd();
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_sigwinch as usize;
            // no SA_RESTART: the signal must interrupt poll()
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(libc::SIGWINCH, &action, std::ptr::null_mut());
        }
        Ok(Self {
            fd,
            parser: Mutex::new(KeyParser::new()),
            pending: Mutex::new(VecDeque::new()),
        })
    }

    fn enter_raw(&self) -> io::Result<(libc::termios, i32)> {
        let mut original: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(self.fd, &mut original) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let mut raw = original;
        raw.c_lflag &= !(libc::ICANON
            | libc::ECHO
            | libc::ECHOE
            | libc::ECHOK
            | libc::ECHONL
            | libc::ISIG
            | libc::IEXTEN);
        raw.c_iflag &= !(libc::IXON
            | libc::IXOFF
            | libc::ICRNL
            | libc::INLCR
            | libc::IGNCR
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag &= !libc::CSIZE;
        raw.c_cflag |= libc::CS8;
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFL) };
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }
        if unsafe { libc::fcntl(self.fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok((original, flags))
    }

    fn poll_input(&self, timeout_ms: i32) -> ConsoleResult<i32> {
        let mut pfd = libc::pollfd { fd: self.fd, events: libc::POLLIN, revents: 0 };
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc == -1 {
            let e = io::Error::last_os_error();
            if e.kind() == io::ErrorKind::Interrupted {
                // most likely SIGWINCH; the caller checks the flag
                return Ok(0);
            }
            return Err(io_err(e));
        }
        Ok(rc)
    }

    fn drain_read(&self) -> ConsoleResult<Vec<KeyEvent>> {
        let mut buf = [0u8; 64];
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n == -1 {
            let e = io::Error::last_os_error();
            if e.kind() == io::ErrorKind::WouldBlock {
                return Ok(Vec::new());
            }
            return Err(io_err(e));
        }
        if n == 0 {
            return Err(ConsoleError::Io("end of input".to_string()));
        }
        let mut parser = self.parser.lock().unwrap();
        Ok(parser.feed(&buf[..n as usize]))
    }
}

impl ConsoleInput for UnixConsoleInput {
    fn enable_raw_mode(&self) -> ConsoleResult<RawModeGuard> {
        let (original, flags) = self.enter_raw().map_err(io_err)?;
        *SAVED_TERMIOS.lock().unwrap() = Some((self.fd, original));
        TEARDOWN.call_once(|| unsafe {
            libc::atexit(restore_on_exit);
        });
        let fd = self.fd;
        Ok(RawModeGuard::new(
            move || {
                unsafe {
                    libc::tcsetattr(fd, libc::TCSANOW, &original);
                    libc::fcntl(fd, libc::F_SETFL, flags);
                }
                if let Ok(mut saved) = SAVED_TERMIOS.lock() {
                    *saved = None;
                }
            },
            "unix termios",
        ))
    }

    fn read_key_timeout(&self, timeout_ms: Option<u32>) -> ConsoleResult<Option<KeyEvent>> {
        if let Some(ev) = self.pending.lock().unwrap().pop_front() {
            return Ok(Some(ev));
        }
        if WINCH.swap(false, Ordering::SeqCst) {
            return Ok(Some(KeyEvent::simple(Key::Resize, Vec::new())));
        }
        match timeout_ms {
            Some(ms) => {
                let rc = self.poll_input(ms as i32)?;
                if WINCH.swap(false, Ordering::SeqCst) {
                    return Ok(Some(KeyEvent::simple(Key::Resize, Vec::new())));
                }
                let events = if rc == 0 {
                    // timeout: resolve any pending partial sequence
                    let mut parser = self.parser.lock().unwrap();
                    if parser.has_pending() {
                        parser.flush()
                    } else {
                        Vec::new()
                    }
                } else {
                    self.drain_read()?
                };
                let mut pending = self.pending.lock().unwrap();
                pending.extend(events);
                Ok(pending.pop_front())
            }
            None => loop {
                match self.read_key_timeout(Some(100))? {
                    Some(ev) => return Ok(Some(ev)),
                    None => continue,
                }
            },
        }
    }

    fn window_size(&self) -> ConsoleResult<(u16, u16)> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
        if rc == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
            return Ok((ws.ws_col, ws.ws_row));
        }
        debug_log!("TIOCGWINSZ failed, trying COLUMNS/LINES");
        let cols = std::env::var("COLUMNS").ok().and_then(|v| v.parse().ok()).unwrap_or(80);
        let rows = std::env::var("LINES").ok().and_then(|v| v.parse().ok()).unwrap_or(24);
        Ok((cols, rows))
    }

    fn capabilities(&self) -> InputCapabilities {
        let is_tty = unsafe { libc::isatty(self.fd) } == 1;
        let term = std::env::var("TERM").unwrap_or_default();
        InputCapabilities {
            is_tty,
            supports_resize_events: true,
            supports_bracketed_paste: is_tty && term != "dumb",
            platform_name: "unix".to_string(),
        }
    }
}

pub struct UnixConsoleOutput {
    fd: i32,
}

impl UnixConsoleOutput {
    pub fn new() -> ConsoleResult<Self> {
        if unsafe { libc::isatty(libc::STDOUT_FILENO) } == 0 {
            return Err(ConsoleError::Terminal("stdout is not a tty".to_string()));
        }
        Ok(Self { fd: libc::STDOUT_FILENO })
    }

    fn write_bytes(&self, bytes: &[u8]) -> ConsoleResult<()> {
        let mut written = 0;
        while written < bytes.len() {
            let rc = unsafe {
                libc::write(
                    self.fd,
                    bytes[written..].as_ptr() as *const libc::c_void,
                    bytes.len() - written,
                )
            };
            if rc == -1 {
                let e = io::Error::last_os_error();
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(io_err(e));
            }
            written += rc as usize;
        }
        Ok(())
    }
}

impl ConsoleOutput for UnixConsoleOutput {
    fn write_text(&self, text: &str) -> ConsoleResult<()> {
        self.write_bytes(text.as_bytes())
    }

    fn set_style(&self, style: &TextStyle) -> ConsoleResult<()> {
        let seq = style.sgr();
        if seq.is_empty() {
            self.reset_style()
        } else {
            self.write_bytes(seq.as_bytes())
        }
    }

    fn reset_style(&self) -> ConsoleResult<()> {
        self.write_bytes(b"\x1b[0m")
    }

    fn cursor_up(&self, n: u16) -> ConsoleResult<()> {
        if n > 0 {
            self.write_bytes(format!("\x1b[{n}A").as_bytes())?;
        }
        Ok(())
    }

    fn cursor_down(&self, n: u16) -> ConsoleResult<()> {
        if n > 0 {
            self.write_bytes(format!("\x1b[{n}B").as_bytes())?;
        }
        Ok(())
    }

    fn set_column(&self, col: u16) -> ConsoleResult<()> {
        self.write_bytes(format!("\x1b[{}G", col + 1).as_bytes())
    }

    fn move_to(&self, row: u16, col: u16) -> ConsoleResult<()> {
        self.write_bytes(format!("\x1b[{};{}H", row + 1, col + 1).as_bytes())
    }

    fn clear(&self, what: ClearType) -> ConsoleResult<()> {
        match what {
            ClearType::ToEndOfLine => self.write_bytes(b"\x1b[K"),
            ClearType::WholeScreen => self.write_bytes(b"\x1b[2J"),
        }
    }

    fn bell(&self) -> ConsoleResult<()> {
        self.write_bytes(b"\x07")
    }

    fn set_bracketed_paste(&self, enabled: bool) -> ConsoleResult<()> {
        if enabled {
            self.write_bytes(b"\x1b[?2004h")
        } else {
            self.write_bytes(b"\x1b[?2004l")
        }
    }

    fn flush(&self) -> ConsoleResult<()> {
        // write(2) is unbuffered; nothing to flush
        Ok(())
    }

    fn capabilities(&self) -> OutputCapabilities {
        OutputCapabilities {
            is_tty: true,
            supports_color: detect_color_support(),
            platform_name: "unix".to_string(),
        }
    }
}

/// Color is on for a TTY with a capable `TERM`, unless `NO_COLOR` is set.
pub fn detect_color_support() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if unsafe { libc::isatty(libc::STDOUT_FILENO) } == 0 {
        return false;
    }
    match std::env::var("TERM") {
        Ok(term) => term != "dumb",
        Err(_) => false,
    }
}
