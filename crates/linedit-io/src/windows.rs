//! Windows console backend.
//!
//! Input reads key records straight from the console (no VT input needed)
//! and maps virtual-key codes onto the shared [`Key`] names; UTF-16
//! surrogate pairs are recombined before they become character events.
//!
//! Output prefers VT processing (Windows 10+). When the console refuses
//! `ENABLE_VIRTUAL_TERMINAL_PROCESSING`, the writer falls back to
//! interpreting the renderer's small CSI subset — SGR, cursor moves,
//! column set, erase — against the classic console API, so the rest of
//! the crate never knows the difference.

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

use linedit_core::{
    ClearType, Color, ConsoleError, ConsoleInput, ConsoleOutput, ConsoleResult,
    InputCapabilities, Key, KeyEvent, OutputCapabilities, RawModeGuard, SequenceMatcher,
    TextStyle, MatchResult,
};

type BOOL = i32;
type HANDLE = isize;
type DWORD = u32;
type WORD = u16;
type WCHAR = u16;
type SHORT = i16;

const STD_INPUT_HANDLE: DWORD = 0xFFFF_FFF6; // (DWORD)-10
const STD_OUTPUT_HANDLE: DWORD = 0xFFFF_FFF5; // (DWORD)-11
const INVALID_HANDLE_VALUE: HANDLE = -1;

const WAIT_OBJECT_0: DWORD = 0;
const WAIT_TIMEOUT: DWORD = 0x0000_0102;
const INFINITE: DWORD = 0xFFFF_FFFF;

const KEY_EVENT: WORD = 0x0001;
const WINDOW_BUFFER_SIZE_EVENT: WORD = 0x0004;

const ENABLE_PROCESSED_INPUT: DWORD = 0x0001;
const ENABLE_LINE_INPUT: DWORD = 0x0002;
const ENABLE_ECHO_INPUT: DWORD = 0x0004;
const ENABLE_WINDOW_INPUT: DWORD = 0x0008;
const ENABLE_VIRTUAL_TERMINAL_PROCESSING: DWORD = 0x0004;

const SHIFT_PRESSED: DWORD = 0x0010;
const LEFT_ALT_PRESSED: DWORD = 0x0002;
const RIGHT_ALT_PRESSED: DWORD = 0x0001;
const LEFT_CTRL_PRESSED: DWORD = 0x0008;
const RIGHT_CTRL_PRESSED: DWORD = 0x0004;

const FOREGROUND_BLUE: WORD = 0x0001;
const FOREGROUND_GREEN: WORD = 0x0002;
const FOREGROUND_RED: WORD = 0x0004;
const FOREGROUND_INTENSITY: WORD = 0x0008;

#[repr(C)]
#[derive(Copy, Clone)]
struct COORD {
    x: SHORT,
    y: SHORT,
}

#[repr(C)]
#[derive(Copy, Clone)]
struct SMALL_RECT {
    left: SHORT,
    top: SHORT,
    right: SHORT,
    bottom: SHORT,
}

#[repr(C)]
#[derive(Copy, Clone)]
struct CONSOLE_SCREEN_BUFFER_INFO {
    size: COORD,
    cursor_position: COORD,
    attributes: WORD,
    window: SMALL_RECT,
    maximum_window_size: COORD,
}

#[repr(C)]
#[derive(Copy, Clone)]
struct KEY_EVENT_RECORD {
    key_down: BOOL,
    repeat_count: WORD,
    virtual_key_code: WORD,
    virtual_scan_code: WORD,
    unicode_char: WCHAR,
    control_key_state: DWORD,
}

#[repr(C)]
#[derive(Copy, Clone)]
struct WINDOW_BUFFER_SIZE_RECORD {
    size: COORD,
}

#[repr(C)]
#[derive(Copy, Clone)]
union INPUT_EVENT {
    key_event: KEY_EVENT_RECORD,
    window_buffer_size_event: WINDOW_BUFFER_SIZE_RECORD,
}

#[repr(C)]
#[derive(Copy, Clone)]
struct INPUT_RECORD {
    event_type: WORD,
    event: INPUT_EVENT,
}

#[link(name = "kernel32")]
extern "system" {
    fn GetStdHandle(handle: DWORD) -> HANDLE;
    fn GetConsoleMode(handle: HANDLE, mode: *mut DWORD) -> BOOL;
    fn SetConsoleMode(handle: HANDLE, mode: DWORD) -> BOOL;
    fn ReadConsoleInputW(
        handle: HANDLE,
        buffer: *mut INPUT_RECORD,
        length: DWORD,
        read: *mut DWORD,
    ) -> BOOL;
    fn WaitForSingleObject(handle: HANDLE, timeout_ms: DWORD) -> DWORD;
    fn GetConsoleScreenBufferInfo(handle: HANDLE, info: *mut CONSOLE_SCREEN_BUFFER_INFO) -> BOOL;
    fn SetConsoleCursorPosition(handle: HANDLE, position: COORD) -> BOOL;
    fn SetConsoleTextAttribute(handle: HANDLE, attributes: WORD) -> BOOL;
    fn FillConsoleOutputCharacterW(
        handle: HANDLE,
        character: WCHAR,
        length: DWORD,
        write_coord: COORD,
        written: *mut DWORD,
    ) -> BOOL;
    fn FillConsoleOutputAttribute(
        handle: HANDLE,
        attribute: WORD,
        length: DWORD,
        write_coord: COORD,
        written: *mut DWORD,
    ) -> BOOL;
    fn WriteConsoleW(
        handle: HANDLE,
        buffer: *const WCHAR,
        length: DWORD,
        written: *mut DWORD,
        reserved: *mut std::ffi::c_void,
    ) -> BOOL;
    fn GetConsoleWindow() -> HANDLE;
}

fn last_error(what: &str) -> ConsoleError {
    ConsoleError::Io(format!("{what}: {}", io::Error::last_os_error()))
}

pub struct WindowsConsoleInput {
    handle: HANDLE,
    matcher: SequenceMatcher,
    pending: Mutex<VecDeque<KeyEvent>>,
    high_surrogate: Mutex<Option<u16>>,
}

// The console handle is process-global; the Mutex-wrapped state carries it.
unsafe impl Send for WindowsConsoleInput {}
unsafe impl Sync for WindowsConsoleInput {}

impl WindowsConsoleInput {
    pub fn new() -> io::Result<Self> {
        let handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) };
        if handle == INVALID_HANDLE_VALUE {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            handle,
            matcher: SequenceMatcher::new(),
            pending: Mutex::new(VecDeque::new()),
            high_surrogate: Mutex::new(None),
        })
    }

    fn translate(&self, record: &KEY_EVENT_RECORD, out: &mut VecDeque<KeyEvent>) {
        if record.key_down == 0 {
            return;
        }
        let state = record.control_key_state;
        let ctrl = state & (LEFT_CTRL_PRESSED | RIGHT_CTRL_PRESSED) != 0;
        let shift = state & SHIFT_PRESSED != 0;
        let alt = state & (LEFT_ALT_PRESSED | RIGHT_ALT_PRESSED) != 0;
        let repeats = record.repeat_count.max(1);
        for _ in 0..repeats {
            if let Some(ev) = self.translate_once(record, ctrl, shift, alt) {
                out.push_back(ev);
            }
        }
    }

    fn translate_once(
        &self,
        record: &KEY_EVENT_RECORD,
        ctrl: bool,
        shift: bool,
        alt: bool,
    ) -> Option<KeyEvent> {
        let unit = record.unicode_char;
        if unit != 0 {
            // surrogate pairs arrive as two key records
            if (0xd800..0xdc00).contains(&unit) {
                *self.high_surrogate.lock().unwrap() = Some(unit);
                return None;
            }
            if (0xdc00..0xe000).contains(&unit) {
                let high = self.high_surrogate.lock().unwrap().take()?;
                let c = char::from_u32(
                    0x10000 + ((high as u32 - 0xd800) << 10) + (unit as u32 - 0xdc00),
                )?;
                return Some(KeyEvent::character(c));
            }
            if unit == 0x0d || unit == 0x0a {
                let key = if ctrl {
                    Key::ControlEnter
                } else if shift {
                    Key::ShiftEnter
                } else if alt {
                    Key::AltEnter
                } else {
                    Key::Enter
                };
                return Some(KeyEvent::simple(key, vec![unit as u8]));
            }
            if unit == 0x09 && shift {
                return Some(KeyEvent::simple(Key::BackTab, vec![0x09]));
            }
            if unit == 0x1b {
                return Some(KeyEvent::simple(Key::Escape, vec![0x1b]));
            }
            if unit < 0x20 || unit == 0x7f {
                let byte = unit as u8;
                return match self.matcher.match_sequence(&[byte]) {
                    MatchResult::Exact(key) => Some(KeyEvent::simple(key, vec![byte])),
                    _ => Some(KeyEvent::simple(Key::NotDefined, vec![byte])),
                };
            }
            let c = char::from_u32(unit as u32)?;
            if alt && (c == 'd' || c == 'D') {
                return Some(KeyEvent::simple(Key::AltD, Vec::new()));
            }
            return Some(KeyEvent::character(c));
        }

        let key = match record.virtual_key_code {
            0x25 if ctrl => Key::ControlLeft,
            0x25 if shift => Key::ShiftLeft,
            0x25 => Key::Left,
            0x26 if ctrl => Key::ControlUp,
            0x26 if shift => Key::ShiftUp,
            0x26 => Key::Up,
            0x27 if ctrl => Key::ControlRight,
            0x27 if shift => Key::ShiftRight,
            0x27 => Key::Right,
            0x28 if ctrl => Key::ControlDown,
            0x28 if shift => Key::ShiftDown,
            0x28 => Key::Down,
            0x21 => Key::PageUp,
            0x22 => Key::PageDown,
            0x23 if ctrl => Key::ControlEnd,
            0x23 => Key::End,
            0x24 if ctrl => Key::ControlHome,
            0x24 => Key::Home,
            0x2d => Key::Insert,
            0x2e => Key::Delete,
            0x70 => Key::F1,
            0x71 => Key::F2,
            0x72 => Key::F3,
            0x73 => Key::F4,
            0x74 => Key::F5,
            0x75 => Key::F6,
            0x76 => Key::F7,
            0x77 => Key::F8,
            0x78 => Key::F9,
            0x79 => Key::F10,
            0x7a => Key::F11,
            0x7b => Key::F12,
            _ => return None,
        };
        Some(KeyEvent::simple(key, Vec::new()))
    }
}

impl ConsoleInput for WindowsConsoleInput {
    fn enable_raw_mode(&self) -> ConsoleResult<RawModeGuard> {
        let mut mode: DWORD = 0;
        if unsafe { GetConsoleMode(self.handle, &mut mode) } == 0 {
            return Err(last_error("GetConsoleMode"));
        }
        let raw = (mode & !(ENABLE_PROCESSED_INPUT | ENABLE_LINE_INPUT | ENABLE_ECHO_INPUT))
            | ENABLE_WINDOW_INPUT;
        if unsafe { SetConsoleMode(self.handle, raw) } == 0 {
            return Err(last_error("SetConsoleMode"));
        }
        let handle = self.handle;
        Ok(RawModeGuard::new(
            move || unsafe {
                SetConsoleMode(handle, mode);
            },
            "windows console",
        ))
    }

    fn read_key_timeout(&self, timeout_ms: Option<u32>) -> ConsoleResult<Option<KeyEvent>> {
        if let Some(ev) = self.pending.lock().unwrap().pop_front() {
            return Ok(Some(ev));
        }
        let timeout = timeout_ms.map(|ms| ms as DWORD).unwrap_or(INFINITE);
        match unsafe { WaitForSingleObject(self.handle, timeout) } {
            WAIT_OBJECT_0 => {}
            WAIT_TIMEOUT => return Ok(None),
            _ => return Err(last_error("WaitForSingleObject")),
        }
        let mut record: INPUT_RECORD = unsafe { std::mem::zeroed() };
        let mut read: DWORD = 0;
        if unsafe { ReadConsoleInputW(self.handle, &mut record, 1, &mut read) } == 0 {
            return Err(last_error("ReadConsoleInputW"));
        }
        if read == 0 {
            return Ok(None);
        }
        let mut pending = self.pending.lock().unwrap();
        match record.event_type {
            KEY_EVENT => {
                let key = unsafe { record.event.key_event };
                self.translate(&key, &mut pending);
            }
            WINDOW_BUFFER_SIZE_EVENT => {
                pending.push_back(KeyEvent::simple(Key::Resize, Vec::new()));
            }
            _ => {}
        }
        Ok(pending.pop_front())
    }

    fn window_size(&self) -> ConsoleResult<(u16, u16)> {
        let out = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
        let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
        if unsafe { GetConsoleScreenBufferInfo(out, &mut info) } == 0 {
            return Ok((80, 24));
        }
        // the visible window, not the scrollback buffer
        let cols = (info.window.right - info.window.left + 1).max(1) as u16;
        let rows = (info.window.bottom - info.window.top + 1).max(1) as u16;
        Ok((cols, rows))
    }

    fn capabilities(&self) -> InputCapabilities {
        InputCapabilities {
            is_tty: unsafe { GetConsoleWindow() } != 0,
            supports_resize_events: true,
            supports_bracketed_paste: false,
            platform_name: "windows".to_string(),
        }
    }
}

pub struct WindowsConsoleOutput {
    handle: HANDLE,
    vt: bool,
    default_attributes: WORD,
    attributes: Mutex<WORD>,
}

unsafe impl Send for WindowsConsoleOutput {}
unsafe impl Sync for WindowsConsoleOutput {}

impl WindowsConsoleOutput {
    pub fn new() -> ConsoleResult<Self> {
        let handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
        if handle == INVALID_HANDLE_VALUE {
            return Err(last_error("GetStdHandle"));
        }
        let mut mode: DWORD = 0;
        if unsafe { GetConsoleMode(handle, &mut mode) } == 0 {
            return Err(ConsoleError::Terminal("stdout is not a console".to_string()));
        }
        let vt = unsafe { SetConsoleMode(handle, mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING) } != 0;
        let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
        let default_attributes = if unsafe { GetConsoleScreenBufferInfo(handle, &mut info) } != 0 {
            info.attributes
        } else {
            FOREGROUND_RED | FOREGROUND_GREEN | FOREGROUND_BLUE
        };
        Ok(Self { handle, vt, default_attributes, attributes: Mutex::new(default_attributes) })
    }

    fn write_utf16(&self, text: &str) -> ConsoleResult<()> {
        let wide: Vec<u16> = text.encode_utf16().collect();
        let mut offset = 0;
        while offset < wide.len() {
            let mut written: DWORD = 0;
            let ok = unsafe {
                WriteConsoleW(
                    self.handle,
                    wide[offset..].as_ptr(),
                    (wide.len() - offset) as DWORD,
                    &mut written,
                    std::ptr::null_mut(),
                )
            };
            if ok == 0 {
                return Err(last_error("WriteConsoleW"));
            }
            offset += written as usize;
        }
        Ok(())
    }

    fn info(&self) -> ConsoleResult<CONSOLE_SCREEN_BUFFER_INFO> {
        let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
        if unsafe { GetConsoleScreenBufferInfo(self.handle, &mut info) } == 0 {
            return Err(last_error("GetConsoleScreenBufferInfo"));
        }
        Ok(info)
    }

    fn set_cursor(&self, x: SHORT, y: SHORT) -> ConsoleResult<()> {
        let pos = COORD { x: x.max(0), y: y.max(0) };
        if unsafe { SetConsoleCursorPosition(self.handle, pos) } == 0 {
            return Err(last_error("SetConsoleCursorPosition"));
        }
        Ok(())
    }

    fn color_attribute(color: Color, default: WORD) -> WORD {
        match color {
            Color::Default => default & 0x0f,
            Color::Black => 0,
            Color::Red => FOREGROUND_RED,
            Color::Green => FOREGROUND_GREEN,
            Color::Yellow => FOREGROUND_RED | FOREGROUND_GREEN,
            Color::Blue => FOREGROUND_BLUE,
            Color::Magenta => FOREGROUND_RED | FOREGROUND_BLUE,
            Color::Cyan => FOREGROUND_GREEN | FOREGROUND_BLUE,
            Color::White => FOREGROUND_RED | FOREGROUND_GREEN | FOREGROUND_BLUE,
            Color::BrightBlack => FOREGROUND_INTENSITY,
            Color::BrightRed => FOREGROUND_RED | FOREGROUND_INTENSITY,
            Color::BrightGreen => FOREGROUND_GREEN | FOREGROUND_INTENSITY,
            Color::BrightYellow => FOREGROUND_RED | FOREGROUND_GREEN | FOREGROUND_INTENSITY,
            Color::BrightBlue => FOREGROUND_BLUE | FOREGROUND_INTENSITY,
            Color::BrightMagenta => FOREGROUND_RED | FOREGROUND_BLUE | FOREGROUND_INTENSITY,
            Color::BrightCyan => FOREGROUND_GREEN | FOREGROUND_BLUE | FOREGROUND_INTENSITY,
            Color::BrightWhite => {
                FOREGROUND_RED | FOREGROUND_GREEN | FOREGROUND_BLUE | FOREGROUND_INTENSITY
            }
        }
    }

    fn apply_attributes(&self, attrs: WORD) -> ConsoleResult<()> {
        *self.attributes.lock().unwrap() = attrs;
        if unsafe { SetConsoleTextAttribute(self.handle, attrs) } == 0 {
            return Err(last_error("SetConsoleTextAttribute"));
        }
        Ok(())
    }

    fn apply_sgr(&self, params: &str) -> ConsoleResult<()> {
        let mut attrs = *self.attributes.lock().unwrap();
        for code in params.split(';').filter(|p| !p.is_empty()) {
            match code {
                "0" => attrs = self.default_attributes,
                "1" => attrs |= FOREGROUND_INTENSITY,
                "7" => {
                    let fg = attrs & 0x0f;
                    let bg = (attrs >> 4) & 0x0f;
                    attrs = (attrs & !0xff) | (fg << 4) | bg;
                }
                "4" => {} // underline has no legacy attribute
                _ => {
                    if let Ok(n) = code.parse::<u16>() {
                        if let Some(color) = sgr_fg_color(n) {
                            attrs = (attrs & !0x0f)
                                | Self::color_attribute(color, self.default_attributes);
                        } else if let Some(color) = sgr_bg_color(n) {
                            attrs = (attrs & !0xf0)
                                | (Self::color_attribute(color, self.default_attributes >> 4) << 4);
                        }
                    }
                }
            }
        }
        self.apply_attributes(attrs)
    }

    /// Interpret the renderer's CSI subset against the console API.
    fn write_interpreted(&self, text: &str) -> ConsoleResult<()> {
        let mut rest = text;
        while let Some(at) = rest.find('\x1b') {
            if at > 0 {
                self.write_utf16(&rest[..at])?;
            }
            rest = &rest[at..];
            let Some(stripped) = rest.strip_prefix("\x1b[") else {
                // a lone ESC; print nothing and skip it
                rest = &rest[1..];
                continue;
            };
            let end = stripped
                .char_indices()
                .find(|(_, c)| ('\u{40}'..='\u{7e}').contains(c))
                .map(|(i, c)| (i, c));
            let Some((plen, final_byte)) = end else {
                break; // truncated sequence at end of chunk
            };
            let params = &stripped[..plen];
            self.dispatch_csi(params, final_byte)?;
            rest = &stripped[plen + final_byte.len_utf8()..];
        }
        if !rest.is_empty() {
            self.write_utf16(rest)?;
        }
        Ok(())
    }

    fn dispatch_csi(&self, params: &str, final_byte: char) -> ConsoleResult<()> {
        let n = params.parse::<i16>().unwrap_or(1).max(1);
        match final_byte {
            'm' => self.apply_sgr(if params.is_empty() { "0" } else { params }),
            'A' => {
                let info = self.info()?;
                self.set_cursor(info.cursor_position.x, info.cursor_position.y - n)
            }
            'B' => {
                let info = self.info()?;
                self.set_cursor(info.cursor_position.x, info.cursor_position.y + n)
            }
            'C' => {
                let info = self.info()?;
                self.set_cursor(info.cursor_position.x + n, info.cursor_position.y)
            }
            'D' => {
                let info = self.info()?;
                self.set_cursor(info.cursor_position.x - n, info.cursor_position.y)
            }
            'G' => {
                let info = self.info()?;
                self.set_cursor(n - 1, info.cursor_position.y)
            }
            'H' => {
                let mut it = params.split(';');
                let row = it.next().and_then(|p| p.parse::<i16>().ok()).unwrap_or(1);
                let col = it.next().and_then(|p| p.parse::<i16>().ok()).unwrap_or(1);
                self.set_cursor(col - 1, row - 1)
            }
            'K' => {
                let info = self.info()?;
                let len = (info.size.x - info.cursor_position.x).max(0) as DWORD;
                let mut written: DWORD = 0;
                unsafe {
                    FillConsoleOutputCharacterW(
                        self.handle,
                        ' ' as WCHAR,
                        len,
                        info.cursor_position,
                        &mut written,
                    );
                    FillConsoleOutputAttribute(
                        self.handle,
                        self.default_attributes,
                        len,
                        info.cursor_position,
                        &mut written,
                    );
                }
                Ok(())
            }
            'J' => {
                let info = self.info()?;
                let len = (info.size.x as DWORD) * (info.size.y as DWORD);
                let origin = COORD { x: 0, y: 0 };
                let mut written: DWORD = 0;
                unsafe {
                    FillConsoleOutputCharacterW(self.handle, ' ' as WCHAR, len, origin, &mut written);
                    FillConsoleOutputAttribute(
                        self.handle,
                        self.default_attributes,
                        len,
                        origin,
                        &mut written,
                    );
                }
                self.set_cursor(0, 0)
            }
            _ => Ok(()), // unknown final byte: drop the sequence
        }
    }
}

fn sgr_fg_color(code: u16) -> Option<Color> {
    Some(match code {
        30 => Color::Black,
        31 => Color::Red,
        32 => Color::Green,
        33 => Color::Yellow,
        34 => Color::Blue,
        35 => Color::Magenta,
        36 => Color::Cyan,
        37 => Color::White,
        39 => Color::Default,
        90 => Color::BrightBlack,
        91 => Color::BrightRed,
        92 => Color::BrightGreen,
        93 => Color::BrightYellow,
        94 => Color::BrightBlue,
        95 => Color::BrightMagenta,
        96 => Color::BrightCyan,
        97 => Color::BrightWhite,
        _ => return None,
    })
}

fn sgr_bg_color(code: u16) -> Option<Color> {
    Some(match code {
        40 => Color::Black,
        41 => Color::Red,
        42 => Color::Green,
        43 => Color::Yellow,
        44 => Color::Blue,
        45 => Color::Magenta,
        46 => Color::Cyan,
        47 => Color::White,
        49 => Color::Default,
        100 => Color::BrightBlack,
        101 => Color::BrightRed,
        102 => Color::BrightGreen,
        103 => Color::BrightYellow,
        104 => Color::BrightBlue,
        105 => Color::BrightMagenta,
        106 => Color::BrightCyan,
        107 => Color::BrightWhite,
        _ => return None,
    })
}

impl ConsoleOutput for WindowsConsoleOutput {
    fn write_text(&self, text: &str) -> ConsoleResult<()> {
        if self.vt {
            self.write_utf16(text)
        } else {
            self.write_interpreted(text)
        }
    }

    fn set_style(&self, style: &TextStyle) -> ConsoleResult<()> {
        if self.vt {
            let seq = style.sgr();
            if seq.is_empty() {
                return self.reset_style();
            }
            return self.write_utf16(&seq);
        }
        let mut attrs = self.default_attributes;
        if let Some(fg) = style.foreground {
            attrs = (attrs & !0x0f) | Self::color_attribute(fg, self.default_attributes);
        }
        if let Some(bg) = style.background {
            attrs = (attrs & !0xf0) | (Self::color_attribute(bg, self.default_attributes >> 4) << 4);
        }
        if style.bold {
            attrs |= FOREGROUND_INTENSITY;
        }
        if style.reverse {
            let fg = attrs & 0x0f;
            let bg = (attrs >> 4) & 0x0f;
            attrs = (attrs & !0xff) | (fg << 4) | bg;
        }
        self.apply_attributes(attrs)
    }

    fn reset_style(&self) -> ConsoleResult<()> {
        if self.vt {
            self.write_utf16("\x1b[0m")
        } else {
            self.apply_attributes(self.default_attributes)
        }
    }

    fn cursor_up(&self, n: u16) -> ConsoleResult<()> {
        if n == 0 {
            return Ok(());
        }
        if self.vt {
            self.write_utf16(&format!("\x1b[{n}A"))
        } else {
            let info = self.info()?;
            self.set_cursor(info.cursor_position.x, info.cursor_position.y - n as SHORT)
        }
    }

    fn cursor_down(&self, n: u16) -> ConsoleResult<()> {
        if n == 0 {
            return Ok(());
        }
        if self.vt {
            self.write_utf16(&format!("\x1b[{n}B"))
        } else {
            let info = self.info()?;
            self.set_cursor(info.cursor_position.x, info.cursor_position.y + n as SHORT)
        }
    }

    fn set_column(&self, col: u16) -> ConsoleResult<()> {
        if self.vt {
            self.write_utf16(&format!("\x1b[{}G", col + 1))
        } else {
            let info = self.info()?;
            self.set_cursor(col as SHORT, info.cursor_position.y)
        }
    }

    fn move_to(&self, row: u16, col: u16) -> ConsoleResult<()> {
        if self.vt {
            self.write_utf16(&format!("\x1b[{};{}H", row + 1, col + 1))
        } else {
            self.set_cursor(col as SHORT, row as SHORT)
        }
    }

    fn clear(&self, what: ClearType) -> ConsoleResult<()> {
        if self.vt {
            return match what {
                ClearType::ToEndOfLine => self.write_utf16("\x1b[K"),
                ClearType::WholeScreen => self.write_utf16("\x1b[2J"),
            };
        }
        match what {
            ClearType::ToEndOfLine => self.dispatch_csi("", 'K'),
            ClearType::WholeScreen => self.dispatch_csi("2", 'J'),
        }
    }

    fn bell(&self) -> ConsoleResult<()> {
        self.write_utf16("\x07")
    }

    fn set_bracketed_paste(&self, _enabled: bool) -> ConsoleResult<()> {
        // console input records never carry paste markers
        Ok(())
    }

    fn flush(&self) -> ConsoleResult<()> {
        Ok(())
    }

    fn capabilities(&self) -> OutputCapabilities {
        OutputCapabilities {
            is_tty: true,
            supports_color: true,
            platform_name: if self.vt { "windows vt".to_string() } else { "windows legacy".to_string() },
        }
    }
}
