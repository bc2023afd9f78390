//! State-machine parser turning raw terminal bytes into key events.
//!
//! The parser keeps state across calls so partial escape sequences and
//! split UTF-8 characters survive short reads. A lone ESC cannot be
//! distinguished from the start of a sequence by the bytes alone; the read
//! loop calls [`KeyParser::flush`] when its short timeout expires and the
//! pending ESC resolves to the Escape key.

use crate::key::{Key, KeyEvent};
use crate::sequence_matcher::{MatchResult, SequenceMatcher};

/// Cap on accumulated sequence bytes; a hostile stream cannot grow memory.
const MAX_SEQUENCE_BYTES: usize = 1024;

/// Emitted for invalid UTF-8 input.
const REPLACEMENT: char = '\u{fffd}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Plain input and single-byte controls.
    Ground,
    /// Seen ESC, deciding between a chord, CSI, SS3 and a lone Escape.
    Escape,
    /// Inside `ESC [`, accumulating parameter/intermediate bytes.
    Csi,
    /// Inside `ESC O` (application-mode keys).
    Ss3,
    /// Accumulating the continuation bytes of one UTF-8 code point.
    Utf8 { remaining: u8 },
    /// Between `ESC [ 200 ~` and `ESC [ 201 ~`.
    Paste,
}

pub struct KeyParser {
    state: ParserState,
    buffer: Vec<u8>,
    matcher: SequenceMatcher,
    paste_buffer: Vec<u8>,
}

impl KeyParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ground,
            buffer: Vec::new(),
            matcher: SequenceMatcher::new(),
            paste_buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// True when bytes are buffered waiting for more input. The read loop
    /// uses this to decide whether a timeout should flush.
    pub fn has_pending(&self) -> bool {
        self.state != ParserState::Ground
    }

    /// Feed raw bytes, returning every completed key event.
    pub fn feed(&mut self, data: &[u8]) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        for &byte in data {
            if self.buffer.len() >= MAX_SEQUENCE_BYTES && self.state != ParserState::Paste {
                events.extend(self.flush());
            }
            self.step(byte, &mut events);
        }
        events
    }

    fn step(&mut self, byte: u8, events: &mut Vec<KeyEvent>) {
        match self.state {
            ParserState::Ground => self.on_ground(byte, events),
            ParserState::Escape => self.on_escape(byte, events),
            ParserState::Csi => self.on_csi(byte, events),
            ParserState::Ss3 => self.on_ss3(byte, events),
            ParserState::Utf8 { remaining } => self.on_utf8(byte, remaining, events),
            ParserState::Paste => self.on_paste(byte, events),
        }
    }

    /// Resolve whatever is buffered. Called on read timeout and EOF.
    pub fn flush(&mut self) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        match self.state {
            ParserState::Ground => {}
            ParserState::Utf8 { .. } => {
                events.push(KeyEvent::with_text(
                    Key::Character,
                    std::mem::take(&mut self.buffer),
                    REPLACEMENT.to_string(),
                ));
            }
            ParserState::Paste => {
                let mut payload = std::mem::take(&mut self.paste_buffer);
                payload.append(&mut self.buffer);
                events.push(paste_event(payload));
            }
            ParserState::Escape | ParserState::Csi | ParserState::Ss3 => {
                let buffer = std::mem::take(&mut self.buffer);
                match self.matcher.find_longest_match(&buffer) {
                    Some(m) => {
                        events.push(KeyEvent::simple(m.key, buffer[..m.consumed].to_vec()));
                        for &b in &buffer[m.consumed..] {
                            events.push(loose_byte_event(b));
                        }
                    }
                    None => {
                        for &b in &buffer {
                            events.push(loose_byte_event(b));
                        }
                    }
                }
            }
        }
        self.reset();
        events
    }

    pub fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.buffer.clear();
        self.paste_buffer.clear();
    }

    fn on_ground(&mut self, byte: u8, events: &mut Vec<KeyEvent>) {
        match byte {
            0x1b => {
                self.buffer.push(byte);
                self.state = ParserState::Escape;
            }
            0x00..=0x1f | 0x7f => match self.matcher.match_sequence(&[byte]) {
                MatchResult::Exact(key) => events.push(KeyEvent::simple(key, vec![byte])),
                _ => events.push(KeyEvent::simple(Key::NotDefined, vec![byte])),
            },
            0x20..=0x7e => events.push(KeyEvent::character(byte as char)),
            _ => match utf8_continuations(byte) {
                Some(n) => {
                    self.buffer.push(byte);
                    self.state = ParserState::Utf8 { remaining: n };
                }
                None => events.push(KeyEvent::with_text(
                    Key::Character,
                    vec![byte],
                    REPLACEMENT.to_string(),
                )),
            },
        }
    }

    fn on_utf8(&mut self, byte: u8, remaining: u8, events: &mut Vec<KeyEvent>) {
        if (0x80..0xc0).contains(&byte) {
            self.buffer.push(byte);
            if remaining == 1 {
                let bytes = std::mem::take(&mut self.buffer);
                // from_utf8 rejects overlong encodings and surrogates
                let text = match std::str::from_utf8(&bytes) {
                    Ok(s) => s.to_string(),
                    Err(_) => REPLACEMENT.to_string(),
                };
                events.push(KeyEvent::with_text(Key::Character, bytes, text));
                self.state = ParserState::Ground;
            } else {
                self.state = ParserState::Utf8 { remaining: remaining - 1 };
            }
        } else {
            // truncated sequence: one replacement, then the byte stands alone
            events.push(KeyEvent::with_text(
                Key::Character,
                std::mem::take(&mut self.buffer),
                REPLACEMENT.to_string(),
            ));
            self.state = ParserState::Ground;
            self.step(byte, events);
        }
    }

    fn on_escape(&mut self, byte: u8, events: &mut Vec<KeyEvent>) {
        self.buffer.push(byte);
        match byte {
            b'[' => self.state = ParserState::Csi,
            b'O' => self.state = ParserState::Ss3,
            _ => match self.matcher.match_sequence(&self.buffer) {
                MatchResult::Exact(key) => {
                    events.push(KeyEvent::simple(key, std::mem::take(&mut self.buffer)));
                    self.state = ParserState::Ground;
                }
                MatchResult::Prefix => {}
                MatchResult::NoMatch => {
                    events.push(KeyEvent::simple(Key::Escape, vec![0x1b]));
                    self.buffer.clear();
                    self.state = ParserState::Ground;
                    self.step(byte, events);
                }
            },
        }
    }

    fn on_ss3(&mut self, byte: u8, events: &mut Vec<KeyEvent>) {
        self.buffer.push(byte);
        match self.matcher.match_sequence(&self.buffer) {
            MatchResult::Exact(key) => {
                events.push(KeyEvent::simple(key, std::mem::take(&mut self.buffer)));
                self.state = ParserState::Ground;
            }
            MatchResult::Prefix => {}
            MatchResult::NoMatch => {
                events.push(KeyEvent::simple(Key::NotDefined, std::mem::take(&mut self.buffer)));
                self.state = ParserState::Ground;
            }
        }
    }

    fn on_csi(&mut self, byte: u8, events: &mut Vec<KeyEvent>) {
        self.buffer.push(byte);

        if self.buffer == b"\x1b[200~" {
            self.state = ParserState::Paste;
            self.buffer.clear();
            return;
        }
        if self.buffer == b"\x1b[201~" {
            // stray close marker from a terminal that echoes the request
            self.buffer.clear();
            self.state = ParserState::Ground;
            return;
        }

        match self.matcher.match_sequence(&self.buffer) {
            MatchResult::Exact(Key::Ignore) => {
                self.buffer.clear();
                self.state = ParserState::Ground;
            }
            MatchResult::Exact(key) => {
                events.push(KeyEvent::simple(key, std::mem::take(&mut self.buffer)));
                self.state = ParserState::Ground;
            }
            MatchResult::Prefix => {}
            MatchResult::NoMatch => {
                if matches!(byte, 0x20..=0x3f) {
                    // parameter or intermediate byte, keep accumulating
                } else if matches!(byte, 0x40..=0x7e) {
                    // complete but unknown sequence: swallow it whole
                    events.push(KeyEvent::simple(Key::NotDefined, std::mem::take(&mut self.buffer)));
                    self.state = ParserState::Ground;
                } else {
                    // not a CSI byte at all: the ESC[ was not a sequence
                    events.push(KeyEvent::simple(Key::Escape, vec![0x1b]));
                    let rest: Vec<u8> = self.buffer.split_off(1);
                    self.buffer.clear();
                    self.state = ParserState::Ground;
                    for b in rest {
                        self.step(b, events);
                    }
                }
            }
        }
    }

    fn on_paste(&mut self, byte: u8, events: &mut Vec<KeyEvent>) {
        self.buffer.push(byte);
        if self.buffer.ends_with(b"\x1b[201~") {
            let keep = self.buffer.len() - b"\x1b[201~".len();
            self.paste_buffer.extend_from_slice(&self.buffer[..keep]);
            self.buffer.clear();
            events.push(paste_event(std::mem::take(&mut self.paste_buffer)));
            self.state = ParserState::Ground;
        } else if self.buffer.len() > b"\x1b[201~".len() {
            // spill all but a potential partial end marker
            let spill = self.buffer.len() - (b"\x1b[201~".len() - 1);
            self.paste_buffer.extend_from_slice(&self.buffer[..spill]);
            self.buffer.drain(..spill);
        }
    }
}

impl Default for KeyParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Continuation-byte count for a UTF-8 lead byte; None for invalid leads.
fn utf8_continuations(lead: u8) -> Option<u8> {
    match lead {
        0xc2..=0xdf => Some(1),
        0xe0..=0xef => Some(2),
        0xf0..=0xf4 => Some(3),
        _ => None,
    }
}

fn paste_event(payload: Vec<u8>) -> KeyEvent {
    match String::from_utf8(payload.clone()) {
        Ok(text) => KeyEvent::with_text(Key::Paste, payload, text),
        Err(_) => KeyEvent::simple(Key::Paste, payload),
    }
}

fn loose_byte_event(byte: u8) -> KeyEvent {
    if matches!(byte, 0x20..=0x7e) {
        KeyEvent::character(byte as char)
    } else {
        KeyEvent::simple(Key::NotDefined, vec![byte])
    }
}
