//! Trie-based matcher for terminal key sequences.
//!
//! Maps byte sequences to [`Key`]s and answers whether a partial sequence
//! could still become a longer valid one. The parser relies on the prefix
//! answer to decide between waiting for more bytes and flushing what it has.

use crate::key::Key;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct TrieNode {
    key: Option<Key>,
    children: BTreeMap<u8, TrieNode>,
}

impl TrieNode {
    fn new() -> Self {
        Self { key: None, children: BTreeMap::new() }
    }
}

/// Result of matching a byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// The sequence maps exactly to this key.
    Exact(Key),
    /// The sequence is a proper prefix of at least one known sequence.
    Prefix,
    /// No known sequence starts with these bytes.
    NoMatch,
}

/// Longest valid sequence found at the start of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongestMatch {
    pub key: Key,
    pub consumed: usize,
}

pub struct SequenceMatcher {
    root: TrieNode,
}

impl SequenceMatcher {
    pub fn new() -> Self {
        let mut m = Self { root: TrieNode::new() };
        m.build_table();
        m
    }

    /// Match a full byte sequence against the table.
    pub fn match_sequence(&self, bytes: &[u8]) -> MatchResult {
        if bytes.is_empty() {
            return MatchResult::NoMatch;
        }
        match self.find_node(bytes) {
            Some(node) => match node.key {
                Some(key) => MatchResult::Exact(key),
                None => MatchResult::Prefix,
            },
            None => MatchResult::NoMatch,
        }
    }

    /// Find the longest known sequence at the start of `bytes`. Used when a
    /// partial sequence has to be flushed.
    pub fn find_longest_match(&self, bytes: &[u8]) -> Option<LongestMatch> {
        let mut longest = None;
        let mut node = &self.root;
        for (i, &b) in bytes.iter().enumerate() {
            node = node.children.get(&b)?;
            if let Some(key) = node.key {
                longest = Some(LongestMatch { key, consumed: i + 1 });
            }
        }
        longest
    }

    fn find_node(&self, bytes: &[u8]) -> Option<&TrieNode> {
        let mut node = &self.root;
        for &b in bytes {
            node = node.children.get(&b)?;
        }
        Some(node)
    }

    fn insert(&mut self, bytes: &[u8], key: Key) {
        let mut node = &mut self.root;
        for &b in bytes {
            node = node.children.entry(b).or_insert_with(TrieNode::new);
        }
        node.key = Some(key);
    }

    fn build_table(&mut self) {
        use Key::*;

        // Single-byte controls. 0x08/0x09/0x0a/0x0d become the named
        // editing keys rather than their control aliases.
        self.insert(&[0x1b], Escape);
        self.insert(&[0x01], ControlA);
        self.insert(&[0x02], ControlB);
        self.insert(&[0x03], ControlC);
        self.insert(&[0x04], ControlD);
        self.insert(&[0x05], ControlE);
        self.insert(&[0x06], ControlF);
        self.insert(&[0x07], ControlG);
        self.insert(&[0x08], Backspace);
        self.insert(&[0x09], Tab);
        self.insert(&[0x0a], Enter);
        self.insert(&[0x0b], ControlK);
        self.insert(&[0x0c], ControlL);
        self.insert(&[0x0d], Enter);
        self.insert(&[0x0e], ControlN);
        self.insert(&[0x0f], ControlO);
        self.insert(&[0x10], ControlP);
        self.insert(&[0x11], ControlQ);
        self.insert(&[0x12], ControlR);
        self.insert(&[0x13], ControlS);
        self.insert(&[0x14], ControlT);
        self.insert(&[0x15], ControlU);
        self.insert(&[0x16], ControlV);
        self.insert(&[0x17], ControlW);
        self.insert(&[0x18], ControlX);
        self.insert(&[0x19], ControlY);
        self.insert(&[0x1a], ControlZ);
        self.insert(&[0x1f], ControlUnderscore);
        self.insert(&[0x7f], Backspace);

        // Alt chords the editor binds: ESC d, ESC DEL, ESC CR/LF.
        self.insert(b"\x1bd", AltD);
        self.insert(b"\x1bD", AltD);
        self.insert(&[0x1b, 0x7f], AltBackspace);
        self.insert(&[0x1b, 0x0d], AltEnter);
        self.insert(&[0x1b, 0x0a], AltEnter);

        // Arrows, CSI and SS3 (application mode) forms.
        self.insert(b"\x1b[A", Up);
        self.insert(b"\x1b[B", Down);
        self.insert(b"\x1b[C", Right);
        self.insert(b"\x1b[D", Left);
        self.insert(b"\x1bOA", Up);
        self.insert(b"\x1bOB", Down);
        self.insert(b"\x1bOC", Right);
        self.insert(b"\x1bOD", Left);

        // Home / End, several terminal dialects.
        self.insert(b"\x1b[H", Home);
        self.insert(b"\x1b[F", End);
        self.insert(b"\x1bOH", Home);
        self.insert(b"\x1bOF", End);
        self.insert(b"\x1b[1~", Home);
        self.insert(b"\x1b[4~", End);
        self.insert(b"\x1b[7~", Home);
        self.insert(b"\x1b[8~", End);

        // Editing and paging keys.
        self.insert(b"\x1b[2~", Insert);
        self.insert(b"\x1b[3~", Delete);
        self.insert(b"\x1b[5~", PageUp);
        self.insert(b"\x1b[6~", PageDown);
        self.insert(b"\x1b[Z", BackTab);

        // Modified arrows: xterm encodes the modifier as 1;N where N-1 is a
        // bitmask of shift=1, alt=2, ctrl=4.
        self.insert(b"\x1b[1;2A", ShiftUp);
        self.insert(b"\x1b[1;2B", ShiftDown);
        self.insert(b"\x1b[1;2C", ShiftRight);
        self.insert(b"\x1b[1;2D", ShiftLeft);
        self.insert(b"\x1b[1;5A", ControlUp);
        self.insert(b"\x1b[1;5B", ControlDown);
        self.insert(b"\x1b[1;5C", ControlRight);
        self.insert(b"\x1b[1;5D", ControlLeft);
        self.insert(b"\x1b[1;5H", ControlHome);
        self.insert(b"\x1b[1;5F", ControlEnd);

        // Modified Enter: xterm modifyOtherKeys and kitty's CSI-u form.
        self.insert(b"\x1b[27;2;13~", ShiftEnter);
        self.insert(b"\x1b[27;5;13~", ControlEnter);
        self.insert(b"\x1b[27;3;13~", AltEnter);
        self.insert(b"\x1b[13;2u", ShiftEnter);
        self.insert(b"\x1b[13;5u", ControlEnter);
        self.insert(b"\x1b[13;3u", AltEnter);

        // Function keys: SS3 for F1-F4, CSI ~ for the rest.
        self.insert(b"\x1bOP", F1);
        self.insert(b"\x1bOQ", F2);
        self.insert(b"\x1bOR", F3);
        self.insert(b"\x1bOS", F4);
        self.insert(b"\x1b[11~", F1);
        self.insert(b"\x1b[12~", F2);
        self.insert(b"\x1b[13~", F3);
        self.insert(b"\x1b[14~", F4);
        self.insert(b"\x1b[15~", F5);
        self.insert(b"\x1b[17~", F6);
        self.insert(b"\x1b[18~", F7);
        self.insert(b"\x1b[19~", F8);
        self.insert(b"\x1b[20~", F9);
        self.insert(b"\x1b[21~", F10);
        self.insert(b"\x1b[23~", F11);
        self.insert(b"\x1b[24~", F12);

        // Focus in/out reports some terminals send unsolicited.
        self.insert(b"\x1b[I", Ignore);
        self.insert(b"\x1b[O", Ignore);
    }
}

impl Default for SequenceMatcher {
    fn default() -> Self {
        Self::new()
    }
}
