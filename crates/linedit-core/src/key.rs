//! Key definitions and key events produced by the input decoder.
//!
//! A [`KeyEvent`] pairs a named [`Key`] with the raw bytes that produced it
//! and, for printable input and pastes, the decoded text. Printable
//! characters arrive as `Key::Character` with `text` holding exactly one
//! code point; a bracketed paste arrives as a single `Key::Paste` event with
//! the whole payload in `text`.

/// All key inputs the decoder can produce.
///
/// Modifier combinations that the editor binds are distinct variants rather
/// than a separate modifier mask; the decoder owns the mapping from the
/// various terminal encodings (xterm `1;N` parameters, `modifyOtherKeys`,
/// kitty `u` sequences) to these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable code point; the event's `text` carries it.
    Character,
    Escape,

    // Control characters. 0x08/0x09/0x0a/0x0d are delivered as Backspace,
    // Tab and Enter instead of their control aliases.
    ControlA,
    ControlB,
    ControlC,
    ControlD,
    ControlE,
    ControlF,
    ControlG,
    ControlK,
    ControlL,
    ControlN,
    ControlO,
    ControlP,
    ControlQ,
    ControlR,
    ControlS,
    ControlT,
    ControlU,
    ControlV,
    ControlW,
    ControlX,
    ControlY,
    ControlZ,
    ControlUnderscore,

    Tab,
    BackTab,
    Enter,
    ShiftEnter,
    ControlEnter,
    AltEnter,
    Backspace,
    AltBackspace,

    Up,
    Down,
    Right,
    Left,
    ControlLeft,
    ControlRight,
    ControlUp,
    ControlDown,
    ShiftLeft,
    ShiftRight,
    ShiftUp,
    ShiftDown,

    Home,
    End,
    ControlHome,
    ControlEnd,
    Insert,
    Delete,
    PageUp,
    PageDown,

    AltD,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    /// Bracketed paste payload; `text` carries the pasted content.
    Paste,
    /// The terminal was resized; synthesized by the console backend.
    Resize,

    /// A recognized sequence that should produce no action.
    Ignore,
    /// An unrecognized byte or sequence.
    NotDefined,
}

/// A decoded key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The parsed key.
    pub key: Key,
    /// The raw bytes that produced this event.
    pub raw_bytes: Vec<u8>,
    /// Decoded text for `Character` and `Paste` events.
    pub text: Option<String>,
}

impl KeyEvent {
    pub fn new(key: Key, raw_bytes: Vec<u8>, text: Option<String>) -> Self {
        Self { key, raw_bytes, text }
    }

    /// A key event without text content.
    pub fn simple(key: Key, raw_bytes: Vec<u8>) -> Self {
        Self::new(key, raw_bytes, None)
    }

    /// A key event carrying decoded text.
    pub fn with_text(key: Key, raw_bytes: Vec<u8>, text: String) -> Self {
        Self::new(key, raw_bytes, Some(text))
    }

    /// A printable character event.
    pub fn character(c: char) -> Self {
        let mut buf = [0u8; 4];
        let s = c.encode_utf8(&mut buf);
        Self::with_text(Key::Character, s.as_bytes().to_vec(), s.to_string())
    }

    /// The decoded character for a `Character` event, if any.
    pub fn ch(&self) -> Option<char> {
        match self.key {
            Key::Character => self.text.as_ref().and_then(|t| t.chars().next()),
            _ => None,
        }
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_event_round_trip() {
        let ev = KeyEvent::character('é');
        assert_eq!(ev.key, Key::Character);
        assert_eq!(ev.raw_bytes, "é".as_bytes());
        assert_eq!(ev.ch(), Some('é'));
    }

    #[test]
    fn simple_event_has_no_text() {
        let ev = KeyEvent::simple(Key::ControlC, vec![0x03]);
        assert_eq!(ev.ch(), None);
        assert_eq!(ev.text_or_empty(), "");
    }

    #[test]
    fn wide_character_bytes() {
        let ev = KeyEvent::character('好');
        assert_eq!(ev.raw_bytes.len(), 3);
        assert_eq!(ev.text.as_deref(), Some("好"));
    }
}
