//! The editor core: per-call state and key dispatch.
//!
//! One `Editor` lives for the duration of a single `read_line` call. It
//! owns the edit buffer, undo log, kill slot, and the current mode —
//! `Editing`, the completion menu, incremental history search, or the help
//! overlay — and turns key events into state changes. The caller renders
//! after every step that reports a visible change and stops on
//! [`EditStep::Finish`], [`EditStep::Cancel`] or [`EditStep::Eof`].
//!
//! Every failure inside dispatch is recovered locally (usually as a bell);
//! nothing here can leave the terminal in raw mode.

use crate::buffer::EditBuffer;
use crate::completion::{Completer, Completion, CompletionSet, WordRules};
use crate::history::{History, SearchDirection};
use crate::key::{Key, KeyEvent};
use crate::render::{Overlay, SearchMatch};
use crate::undo::{EditKind, Snapshot, UndoLog};
use std::rc::Rc;

/// Host predicate deciding whether Enter should submit the buffer.
pub type IsCompleteFn = Rc<dyn Fn(&str) -> bool>;

/// Behavior switches for one editing session.
#[derive(Clone)]
pub struct EditOptions {
    pub multiline: bool,
    pub auto_tab: bool,
    pub completion_preview: bool,
    pub multiline_indent: bool,
    pub continuation_char: char,
    pub word_rules: WordRules,
    pub max_buffer_bytes: usize,
    pub ambiguous_wide: bool,
    pub is_complete: Option<IsCompleteFn>,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            multiline: true,
            auto_tab: false,
            completion_preview: true,
            multiline_indent: true,
            continuation_char: '\\',
            word_rules: WordRules::default(),
            max_buffer_bytes: crate::buffer::DEFAULT_MAX_BYTES,
            ambiguous_wide: false,
            is_complete: None,
        }
    }
}

/// Outcome of dispatching one key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditStep {
    /// Nothing visible changed.
    Continue,
    /// Buffer, cursor or mode changed; redraw.
    Redraw,
    /// The action could not apply; ring the bell.
    Bell,
    /// Ctrl-L: clear the screen, then redraw.
    ClearScreen,
    /// Enter accepted the buffer.
    Finish(String),
    /// Ctrl-C.
    Cancel,
    /// Ctrl-D on an empty buffer.
    Eof,
}

/// Completion menu state.
#[derive(Debug, Clone)]
pub struct MenuState {
    pub candidates: Vec<Completion>,
    pub selected: usize,
}

/// Incremental history search state.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub direction: SearchDirection,
    pub pattern: String,
    /// Index and text of the current match.
    pub matched: Option<(usize, String)>,
    saved: Snapshot,
}

/// The editor's modal state; exactly one is active.
#[derive(Debug, Clone)]
pub enum Mode {
    Editing,
    Completion(MenuState),
    Search(SearchState),
    Help,
}

/// Per-call history navigation: where Up/Down is within the store, and the
/// in-progress line saved when the user first stepped into history.
#[derive(Debug, Default)]
struct HistoryNav {
    index: Option<usize>,
    draft: Option<String>,
}

const HELP_LINES: &[&str] = &[
    "ctrl-a/e home/end   ctrl-u/k kill line   ctrl-w/alt-d kill word",
    "ctrl-y yank         ctrl-z undo          ctrl-r/s search history",
    "tab complete        ctrl-l clear         ctrl-c cancel  ctrl-d eof",
];

pub struct Editor {
    buf: EditBuffer,
    undo: UndoLog,
    kill: String,
    mode: Mode,
    nav: HistoryNav,
    opts: EditOptions,
    last_was_undo: bool,
}

impl Editor {
    pub fn new(opts: EditOptions) -> Self {
        Self {
            buf: EditBuffer::with_max_bytes(opts.max_buffer_bytes),
            undo: UndoLog::new(),
            kill: String::new(),
            mode: Mode::Editing,
            nav: HistoryNav::default(),
            opts,
            last_was_undo: false,
        }
    }

    pub fn text(&self) -> &str {
        self.buf.text()
    }

    pub fn cursor(&self) -> usize {
        self.buf.cursor()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Text and cursor the renderer should show. During a search the
    /// current match is displayed in place of the buffer.
    pub fn display_text(&self) -> (String, usize) {
        match &self.mode {
            Mode::Search(s) => match &s.matched {
                Some((_, entry)) => (entry.clone(), entry.len()),
                None => (self.buf.text().to_string(), self.buf.cursor()),
            },
            _ => (self.buf.text().to_string(), self.buf.cursor()),
        }
    }

    /// Ghost text for the completion preview, when enabled and applicable.
    pub fn preview_hint(&self) -> Option<String> {
        if !self.opts.completion_preview {
            return None;
        }
        let menu = match &self.mode {
            Mode::Completion(menu) => menu,
            _ => return None,
        };
        let cand = menu.candidates.get(menu.selected)?;
        let cut = self.buf.cursor().checked_sub(cand.delete_before)?;
        let word = &self.buf.text()[cut..self.buf.cursor()];
        match cand.replacement.strip_prefix(word) {
            Some(rest) if !rest.is_empty() => Some(rest.to_string()),
            _ => None,
        }
    }

    /// The overlay for the current mode.
    pub fn overlay(&self) -> Option<Overlay> {
        match &self.mode {
            Mode::Editing => None,
            Mode::Completion(menu) => Some(Overlay::Menu {
                items: menu.candidates.iter().map(|c| c.display.clone()).collect(),
                selected: menu.selected,
            }),
            Mode::Search(s) => Some(Overlay::Search {
                forward: s.direction == SearchDirection::Forward,
                pattern: s.pattern.clone(),
                matched: s.matched.as_ref().map(|(_, entry)| search_match(entry, &s.pattern)),
            }),
            Mode::Help => Some(Overlay::Help(HELP_LINES.iter().map(|s| s.to_string()).collect())),
        }
    }

    /// Dispatch one key event against the current mode.
    pub fn handle_key(
        &mut self,
        ev: &KeyEvent,
        history: &mut History,
        completer: Option<&dyn Completer>,
    ) -> EditStep {
        match &self.mode {
            Mode::Editing => self.handle_editing(ev, history, completer),
            Mode::Completion(_) => self.handle_menu(ev, history, completer),
            Mode::Search(_) => self.handle_search(ev, history, completer),
            Mode::Help => {
                self.mode = Mode::Editing;
                EditStep::Redraw
            }
        }
    }

    fn handle_editing(
        &mut self,
        ev: &KeyEvent,
        history: &mut History,
        completer: Option<&dyn Completer>,
    ) -> EditStep {
        let was_undo = std::mem::replace(&mut self.last_was_undo, false);
        match ev.key {
            Key::Character => match ev.ch() {
                Some(c) => self.insert_char(c),
                None => EditStep::Continue,
            },
            Key::Paste => self.insert_paste(ev),
            Key::Enter => self.enter(),
            Key::ShiftEnter | Key::ControlEnter | Key::AltEnter => self.insert_newline(),
            Key::Backspace => self.delete_backward(),
            Key::Delete => self.delete_forward(),
            Key::ControlD => {
                if self.buf.is_empty() {
                    EditStep::Eof
                } else {
                    self.delete_forward()
                }
            }
            Key::Left | Key::ControlB => self.motion(|b, _| b.move_left()),
            Key::Right | Key::ControlF => self.motion(|b, _| b.move_right()),
            Key::ControlLeft => {
                let rules = self.opts.word_rules.clone();
                self.motion(move |b, _| b.move_word_left(&|c| rules.is_word(c)))
            }
            Key::ControlRight => {
                let rules = self.opts.word_rules.clone();
                self.motion(move |b, _| b.move_word_right(&|c| rules.is_word(c)))
            }
            Key::Home | Key::ControlA => self.motion(|b, _| {
                b.move_to_line_start();
                true
            }),
            Key::End | Key::ControlE => self.motion(|b, _| {
                b.move_to_line_end();
                true
            }),
            Key::ControlHome => self.motion(|b, _| {
                b.move_to_start();
                true
            }),
            Key::ControlEnd => self.motion(|b, _| {
                b.move_to_end();
                true
            }),
            Key::Up | Key::ControlP => {
                if !self.buf.is_on_first_line() {
                    self.motion(|b, wide| b.move_line_up(wide))
                } else {
                    self.history_prev(history)
                }
            }
            Key::Down | Key::ControlN => {
                if !self.buf.is_on_last_line() {
                    self.motion(|b, wide| b.move_line_down(wide))
                } else {
                    self.history_next(history)
                }
            }
            Key::ControlU => {
                let start = self.buf.line_start(self.buf.cursor());
                self.kill_range(start, self.buf.cursor())
            }
            Key::ControlK => {
                let end = self.buf.line_end(self.buf.cursor());
                self.kill_range(self.buf.cursor(), end)
            }
            Key::ControlW | Key::AltBackspace => {
                let rules = self.opts.word_rules.clone();
                let start = self.buf.word_start_before(self.buf.cursor(), &|c| rules.is_word(c));
                self.kill_range(start, self.buf.cursor())
            }
            Key::AltD => {
                let rules = self.opts.word_rules.clone();
                let end = self.buf.word_end_after(self.buf.cursor(), &|c| rules.is_word(c));
                self.kill_range(self.buf.cursor(), end)
            }
            Key::ControlY => {
                if was_undo {
                    self.redo()
                } else {
                    self.yank()
                }
            }
            Key::ControlT => self.transpose(),
            Key::ControlZ | Key::ControlUnderscore => self.undo(),
            Key::Tab => self.trigger_completion(completer),
            Key::ControlR => self.enter_search(SearchDirection::Reverse, history),
            Key::ControlS => self.enter_search(SearchDirection::Forward, history),
            Key::ControlL => EditStep::ClearScreen,
            Key::ControlC => EditStep::Cancel,
            Key::F1 => {
                self.mode = Mode::Help;
                EditStep::Redraw
            }
            Key::Resize => EditStep::Redraw,
            _ => EditStep::Continue,
        }
    }

    fn insert_char(&mut self, c: char) -> EditStep {
        if self.buf.byte_len() + c.len_utf8() > self.opts.max_buffer_bytes {
            return EditStep::Bell;
        }
        self.undo.record(EditKind::InsertRun, &self.buf.snapshot());
        if self.buf.insert_char(c).is_err() {
            return EditStep::Bell;
        }
        self.undo.finish(self.buf.cursor());
        EditStep::Redraw
    }

    fn insert_paste(&mut self, ev: &KeyEvent) -> EditStep {
        let raw;
        let payload = match ev.text.as_deref() {
            Some(t) => t,
            None => {
                raw = String::from_utf8_lossy(&ev.raw_bytes).into_owned();
                &raw
            }
        };
        // the payload is inserted verbatim, except NUL which no buffer wants
        let cleaned: String = payload.chars().filter(|&c| c != '\0').collect();
        if cleaned.is_empty() {
            return EditStep::Continue;
        }
        if self.buf.byte_len() + cleaned.len() > self.opts.max_buffer_bytes {
            return EditStep::Bell;
        }
        self.undo.record(EditKind::Structural, &self.buf.snapshot());
        if self.buf.insert_str(&cleaned).is_err() {
            return EditStep::Bell;
        }
        self.undo.finish(self.buf.cursor());
        self.undo.seal();
        EditStep::Redraw
    }

    fn enter(&mut self) -> EditStep {
        if self.opts.multiline && !self.input_complete() {
            return self.insert_newline();
        }
        EditStep::Finish(self.buf.text().to_string())
    }

    fn input_complete(&self) -> bool {
        let text = self.buf.text();
        if let Some(pred) = &self.opts.is_complete {
            return pred(text);
        }
        if self.opts.continuation_char != '\0' {
            if let Some(last) = text.trim_end().chars().next_back() {
                if last == self.opts.continuation_char {
                    return false;
                }
            }
        }
        balanced(text, &self.opts.word_rules)
    }

    fn insert_newline(&mut self) -> EditStep {
        let indent = if self.opts.multiline_indent {
            self.buf.leading_whitespace().to_string()
        } else {
            String::new()
        };
        let mut inserted = String::with_capacity(1 + indent.len());
        inserted.push('\n');
        inserted.push_str(&indent);
        if self.buf.byte_len() + inserted.len() > self.opts.max_buffer_bytes {
            return EditStep::Bell;
        }
        self.undo.record(EditKind::Structural, &self.buf.snapshot());
        if self.buf.insert_str(&inserted).is_err() {
            return EditStep::Bell;
        }
        self.undo.finish(self.buf.cursor());
        self.undo.seal();
        EditStep::Redraw
    }

    fn delete_backward(&mut self) -> EditStep {
        if self.buf.prev_offset(self.buf.cursor()).is_none() {
            return EditStep::Bell;
        }
        self.undo.record(EditKind::DeleteRun, &self.buf.snapshot());
        self.buf.delete_prev_char();
        self.undo.finish(self.buf.cursor());
        EditStep::Redraw
    }

    fn delete_forward(&mut self) -> EditStep {
        if self.buf.char_at(self.buf.cursor()).is_none() {
            return EditStep::Bell;
        }
        self.undo.record(EditKind::DeleteRun, &self.buf.snapshot());
        self.buf.delete_next_char();
        self.undo.finish(self.buf.cursor());
        EditStep::Redraw
    }

    fn motion<F>(&mut self, f: F) -> EditStep
    where
        F: FnOnce(&mut EditBuffer, bool) -> bool,
    {
        self.undo.seal();
        if f(&mut self.buf, self.opts.ambiguous_wide) {
            EditStep::Redraw
        } else {
            EditStep::Bell
        }
    }

    fn kill_range(&mut self, start: usize, end: usize) -> EditStep {
        if start >= end {
            return EditStep::Bell;
        }
        let before = self.buf.snapshot();
        match self.buf.delete_range(start, end) {
            Ok(removed) => {
                self.kill = removed;
                self.undo.record(EditKind::Structural, &before);
                self.undo.finish(self.buf.cursor());
                self.undo.seal();
                EditStep::Redraw
            }
            Err(_) => EditStep::Bell,
        }
    }

    fn yank(&mut self) -> EditStep {
        if self.kill.is_empty() {
            return EditStep::Bell;
        }
        if self.buf.byte_len() + self.kill.len() > self.opts.max_buffer_bytes {
            return EditStep::Bell;
        }
        self.undo.record(EditKind::Structural, &self.buf.snapshot());
        let kill = self.kill.clone();
        if self.buf.insert_str(&kill).is_err() {
            return EditStep::Bell;
        }
        self.undo.finish(self.buf.cursor());
        self.undo.seal();
        EditStep::Redraw
    }

    fn transpose(&mut self) -> EditStep {
        let before = self.buf.snapshot();
        if self.buf.transpose() {
            self.undo.record(EditKind::Structural, &before);
            self.undo.finish(self.buf.cursor());
            self.undo.seal();
            EditStep::Redraw
        } else {
            EditStep::Bell
        }
    }

    fn undo(&mut self) -> EditStep {
        match self.undo.undo(self.buf.snapshot()) {
            Some(snap) => {
                self.buf.restore(snap);
                self.last_was_undo = true;
                EditStep::Redraw
            }
            None => EditStep::Bell,
        }
    }

    fn redo(&mut self) -> EditStep {
        match self.undo.redo(self.buf.snapshot()) {
            Some(snap) => {
                self.buf.restore(snap);
                self.last_was_undo = true;
                EditStep::Redraw
            }
            None => EditStep::Bell,
        }
    }

    fn history_prev(&mut self, history: &History) -> EditStep {
        let index = match self.nav.index {
            None => {
                if history.is_empty() {
                    return EditStep::Bell;
                }
                self.nav.draft = Some(self.buf.text().to_string());
                history.len() - 1
            }
            Some(0) => return EditStep::Bell,
            Some(i) => i - 1,
        };
        self.recall(history, index)
    }

    fn history_next(&mut self, history: &History) -> EditStep {
        match self.nav.index {
            None => EditStep::Bell,
            Some(i) if i + 1 < history.len() => self.recall(history, i + 1),
            Some(_) => {
                let draft = self.nav.draft.take().unwrap_or_default();
                self.undo.record(EditKind::Structural, &self.buf.snapshot());
                self.buf.set_text(draft);
                self.undo.finish(self.buf.cursor());
                self.undo.seal();
                self.nav.index = None;
                EditStep::Redraw
            }
        }
    }

    fn recall(&mut self, history: &History, index: usize) -> EditStep {
        let entry = match history.get(index) {
            Some(e) => e.to_string(),
            None => return EditStep::Bell,
        };
        self.undo.record(EditKind::Structural, &self.buf.snapshot());
        self.buf.set_text(entry);
        self.undo.finish(self.buf.cursor());
        self.undo.seal();
        self.nav.index = Some(index);
        EditStep::Redraw
    }

    fn trigger_completion(&mut self, completer: Option<&dyn Completer>) -> EditStep {
        let completer = match completer {
            Some(c) => c,
            // no completer registered: Tab is a plain tab character
            None => return self.insert_char('\t'),
        };
        let candidates = self.collect_candidates(completer);
        match candidates.len() {
            0 => EditStep::Bell,
            1 => {
                let cand = candidates.into_iter().next().unwrap();
                self.apply_completion(&cand);
                if self.opts.auto_tab {
                    self.auto_tab(completer);
                }
                EditStep::Redraw
            }
            _ => {
                self.mode = Mode::Completion(MenuState { candidates, selected: 0 });
                EditStep::Redraw
            }
        }
    }

    fn collect_candidates(&self, completer: &dyn Completer) -> Vec<Completion> {
        let prefix = &self.buf.text()[..self.buf.cursor()];
        let mut set = CompletionSet::new(prefix, &self.opts.word_rules);
        completer.complete(prefix, &mut set);
        set.into_candidates()
    }

    fn apply_completion(&mut self, cand: &Completion) {
        let before = self.buf.snapshot();
        let cursor = self.buf.cursor();
        let start = cursor.saturating_sub(cand.delete_before);
        if self.buf.delete_range(start, cursor).is_err() {
            return;
        }
        let _ = self.buf.insert_str(&cand.replacement);
        self.undo.record(EditKind::Structural, &before);
        self.undo.finish(self.buf.cursor());
        self.undo.seal();
    }

    /// After a unique completion, keep expanding while the result stays
    /// unique. Bounded so a pathological completer cannot loop forever.
    fn auto_tab(&mut self, completer: &dyn Completer) {
        for _ in 0..16 {
            let candidates = self.collect_candidates(completer);
            let cand = match candidates.as_slice() {
                [only] => only.clone(),
                _ => break,
            };
            let before = self.buf.text().to_string();
            self.apply_completion(&cand);
            if self.buf.text() == before {
                break;
            }
        }
    }

    fn handle_menu(
        &mut self,
        ev: &KeyEvent,
        history: &mut History,
        completer: Option<&dyn Completer>,
    ) -> EditStep {
        let menu = match &mut self.mode {
            Mode::Completion(menu) => menu,
            _ => unreachable!("handle_menu outside completion mode"),
        };
        let count = menu.candidates.len();
        match ev.key {
            Key::Tab | Key::Right | Key::Down => {
                menu.selected = (menu.selected + 1) % count;
                EditStep::Redraw
            }
            Key::BackTab | Key::Left | Key::Up => {
                menu.selected = (menu.selected + count - 1) % count;
                EditStep::Redraw
            }
            Key::Enter => {
                // confirm the candidate, then let Enter act on the result:
                // a complete line submits, an unfinished one continues
                let cand = menu.candidates[menu.selected].clone();
                self.mode = Mode::Editing;
                self.apply_completion(&cand);
                self.handle_editing(ev, history, completer)
            }
            Key::Escape | Key::ControlC => {
                self.mode = Mode::Editing;
                EditStep::Redraw
            }
            Key::Backspace => {
                self.mode = Mode::Editing;
                match self.delete_backward() {
                    EditStep::Bell => EditStep::Redraw,
                    step => step,
                }
            }
            Key::Character => {
                self.mode = Mode::Editing;
                match ev.ch() {
                    Some(c) => self.insert_char(c),
                    None => EditStep::Redraw,
                }
            }
            _ => {
                // leave the menu and let the key act normally
                self.mode = Mode::Editing;
                match self.handle_editing(ev, history, completer) {
                    EditStep::Continue => EditStep::Redraw,
                    step => step,
                }
            }
        }
    }

    fn enter_search(&mut self, direction: SearchDirection, _history: &History) -> EditStep {
        self.undo.seal();
        self.mode = Mode::Search(SearchState {
            direction,
            pattern: String::new(),
            matched: None,
            saved: self.buf.snapshot(),
        });
        EditStep::Redraw
    }

    fn handle_search(
        &mut self,
        ev: &KeyEvent,
        history: &mut History,
        completer: Option<&dyn Completer>,
    ) -> EditStep {
        let state = match &mut self.mode {
            Mode::Search(state) => state,
            _ => unreachable!("handle_search outside search mode"),
        };
        match ev.key {
            Key::Character => {
                if let Some(c) = ev.ch() {
                    state.pattern.push(c);
                    Self::research(state, history, true);
                }
                EditStep::Redraw
            }
            Key::Backspace => {
                state.pattern.pop();
                Self::research(state, history, true);
                EditStep::Redraw
            }
            Key::ControlR => {
                state.direction = SearchDirection::Reverse;
                Self::research(state, history, false);
                EditStep::Redraw
            }
            Key::ControlS => {
                state.direction = SearchDirection::Forward;
                Self::research(state, history, false);
                EditStep::Redraw
            }
            Key::Enter => {
                let matched = state.matched.take();
                self.mode = Mode::Editing;
                if let Some((_, entry)) = matched {
                    self.buf.set_text(entry);
                }
                EditStep::Finish(self.buf.text().to_string())
            }
            Key::Escape => {
                let matched = state.matched.take();
                self.mode = Mode::Editing;
                if let Some((_, entry)) = matched {
                    self.undo.record(EditKind::Structural, &self.buf.snapshot());
                    self.buf.set_text(entry);
                    self.undo.finish(self.buf.cursor());
                    self.undo.seal();
                }
                EditStep::Redraw
            }
            Key::ControlG | Key::ControlC => {
                let saved = state.saved.clone();
                self.mode = Mode::Editing;
                self.buf.restore(saved);
                EditStep::Redraw
            }
            Key::Left
            | Key::Right
            | Key::Up
            | Key::Down
            | Key::Home
            | Key::End
            | Key::ControlLeft
            | Key::ControlRight
            | Key::ControlA
            | Key::ControlE => {
                let matched = state.matched.take();
                self.mode = Mode::Editing;
                if let Some((_, entry)) = matched {
                    self.undo.record(EditKind::Structural, &self.buf.snapshot());
                    self.buf.set_text(entry);
                    self.undo.finish(self.buf.cursor());
                    self.undo.seal();
                }
                match self.handle_editing(ev, history, completer) {
                    EditStep::Continue => EditStep::Redraw,
                    step => step,
                }
            }
            _ => EditStep::Continue,
        }
    }

    /// Walk the history for the pattern. `from_current` keeps the current
    /// match in view when the pattern changes; stepping (repeated Ctrl-R /
    /// Ctrl-S) starts just past it.
    fn research(state: &mut SearchState, history: &History, from_current: bool) {
        let from = match (&state.matched, state.direction, from_current) {
            (Some((i, _)), _, true) => Some(*i),
            (Some((i, _)), SearchDirection::Reverse, false) => match i.checked_sub(1) {
                Some(prev) => Some(prev),
                None => return, // already at the oldest match
            },
            (Some((i, _)), SearchDirection::Forward, false) => Some(i + 1),
            (None, SearchDirection::Reverse, _) => None,
            (None, SearchDirection::Forward, _) => Some(0),
        };
        state.matched = history
            .search(&state.pattern, from, state.direction)
            .and_then(|i| history.get(i).map(|e| (i, e.to_string())));
    }
}

/// Locate the pattern inside the matched entry for modeline highlighting,
/// with the same smart-case rule the search itself uses.
fn search_match(entry: &str, pattern: &str) -> SearchMatch {
    let fold = pattern.chars().all(|c| !c.is_uppercase());
    let needle = if fold { pattern.to_lowercase() } else { pattern.to_string() };
    let mut start = 0;
    let mut len = 0;
    if !needle.is_empty() {
        for (i, _) in entry.char_indices() {
            let candidate = &entry[i..];
            let folded = if fold { candidate.to_lowercase() } else { candidate.to_string() };
            if folded.starts_with(&needle) {
                start = i;
                len = entry[i..]
                    .char_indices()
                    .nth(pattern.chars().count())
                    .map(|(j, _)| j)
                    .unwrap_or(entry.len() - i);
                break;
            }
        }
    }
    SearchMatch { text: entry.to_string(), start, len }
}

/// Quote-aware bracket balance: `()`, `[]` and `{}` counted only outside
/// single or double quotes; unterminated quotes also leave the input open.
fn balanced(text: &str, rules: &WordRules) -> bool {
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == rules.escape_char {
            escaped = true;
            continue;
        }
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                _ => {}
            },
        }
    }
    quote.is_none() && depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(key: Key) -> KeyEvent {
        KeyEvent::simple(key, vec![])
    }

    fn type_str(ed: &mut Editor, h: &mut History, s: &str) {
        for c in s.chars() {
            ed.handle_key(&KeyEvent::character(c), h, None);
        }
    }

    fn editor() -> (Editor, History) {
        (Editor::new(EditOptions::default()), History::new())
    }

    #[test]
    fn typing_builds_the_buffer() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "hello");
        assert_eq!(ed.text(), "hello");
        assert_eq!(ed.cursor(), 5);
    }

    #[test]
    fn enter_finishes_with_buffer() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "hello");
        assert_eq!(ed.handle_key(&ev(Key::Enter), &mut h, None), EditStep::Finish("hello".into()));
    }

    #[test]
    fn arrow_editing_scenario() {
        // a b c Left Left x => axbc
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "abc");
        ed.handle_key(&ev(Key::Left), &mut h, None);
        ed.handle_key(&ev(Key::Left), &mut h, None);
        type_str(&mut ed, &mut h, "x");
        assert_eq!(ed.text(), "axbc");
    }

    #[test]
    fn home_and_kill_to_end() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "foo");
        ed.handle_key(&ev(Key::ControlA), &mut h, None);
        ed.handle_key(&ev(Key::ControlK), &mut h, None);
        assert_eq!(ed.text(), "");
        assert_eq!(ed.handle_key(&ev(Key::Enter), &mut h, None), EditStep::Finish("".into()));
    }

    #[test]
    fn kill_and_yank_round_trip() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "hello world");
        ed.handle_key(&ev(Key::ControlW), &mut h, None);
        assert_eq!(ed.text(), "hello ");
        ed.handle_key(&ev(Key::ControlY), &mut h, None);
        assert_eq!(ed.text(), "hello world");
    }

    #[test]
    fn ctrl_u_kills_to_line_start() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "abcdef");
        ed.handle_key(&ev(Key::Left), &mut h, None);
        ed.handle_key(&ev(Key::ControlU), &mut h, None);
        assert_eq!(ed.text(), "f");
        assert_eq!(ed.cursor(), 0);
    }

    #[test]
    fn alt_d_kills_next_word() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "one two");
        ed.handle_key(&ev(Key::ControlA), &mut h, None);
        ed.handle_key(&ev(Key::AltD), &mut h, None);
        assert_eq!(ed.text(), " two");
    }

    #[test]
    fn undo_coalesces_typed_run() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "hello");
        ed.handle_key(&ev(Key::ControlZ), &mut h, None);
        assert_eq!(ed.text(), "");
    }

    #[test]
    fn undo_then_redo_restores() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "hello");
        ed.handle_key(&ev(Key::ControlZ), &mut h, None);
        assert_eq!(ed.text(), "");
        // Ctrl-Y immediately after undo is redo
        ed.handle_key(&ev(Key::ControlY), &mut h, None);
        assert_eq!(ed.text(), "hello");
        assert_eq!(ed.cursor(), 5);
    }

    #[test]
    fn motion_breaks_undo_run() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "ab");
        ed.handle_key(&ev(Key::Left), &mut h, None);
        ed.handle_key(&ev(Key::Right), &mut h, None);
        type_str(&mut ed, &mut h, "cd");
        ed.handle_key(&ev(Key::ControlZ), &mut h, None);
        assert_eq!(ed.text(), "ab");
        ed.handle_key(&ev(Key::ControlZ), &mut h, None);
        assert_eq!(ed.text(), "");
    }

    #[test]
    fn transpose_swaps_and_advances() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "ab");
        ed.handle_key(&ev(Key::ControlT), &mut h, None);
        assert_eq!(ed.text(), "ba");
    }

    #[test]
    fn ctrl_d_on_empty_is_eof() {
        let (mut ed, mut h) = editor();
        assert_eq!(ed.handle_key(&ev(Key::ControlD), &mut h, None), EditStep::Eof);
        type_str(&mut ed, &mut h, "ab");
        ed.handle_key(&ev(Key::ControlA), &mut h, None);
        assert_eq!(ed.handle_key(&ev(Key::ControlD), &mut h, None), EditStep::Redraw);
        assert_eq!(ed.text(), "b");
    }

    #[test]
    fn ctrl_c_cancels() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "partial");
        assert_eq!(ed.handle_key(&ev(Key::ControlC), &mut h, None), EditStep::Cancel);
    }

    #[test]
    fn history_navigation_with_draft() {
        let (mut ed, mut h) = editor();
        h.add("first");
        h.add("second");
        type_str(&mut ed, &mut h, "draft");
        ed.handle_key(&ev(Key::Up), &mut h, None);
        assert_eq!(ed.text(), "second");
        ed.handle_key(&ev(Key::Up), &mut h, None);
        assert_eq!(ed.text(), "first");
        assert_eq!(ed.handle_key(&ev(Key::Up), &mut h, None), EditStep::Bell);
        ed.handle_key(&ev(Key::Down), &mut h, None);
        assert_eq!(ed.text(), "second");
        ed.handle_key(&ev(Key::Down), &mut h, None);
        assert_eq!(ed.text(), "draft");
    }

    #[test]
    fn up_moves_within_multiline_buffer_first() {
        let (mut ed, mut h) = editor();
        h.add("old");
        type_str(&mut ed, &mut h, "one");
        ed.handle_key(&ev(Key::ShiftEnter), &mut h, None);
        type_str(&mut ed, &mut h, "two");
        ed.handle_key(&ev(Key::Up), &mut h, None);
        // still our buffer, cursor moved to the first line
        assert_eq!(ed.text(), "one\ntwo");
        assert!(ed.cursor() <= 3);
    }

    #[test]
    fn continuation_char_keeps_reading() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "a\\");
        assert_eq!(ed.handle_key(&ev(Key::Enter), &mut h, None), EditStep::Redraw);
        type_str(&mut ed, &mut h, "b");
        assert_eq!(
            ed.handle_key(&ev(Key::Enter), &mut h, None),
            EditStep::Finish("a\\\nb".into())
        );
    }

    #[test]
    fn unbalanced_brackets_keep_reading() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "f(x,");
        assert_eq!(ed.handle_key(&ev(Key::Enter), &mut h, None), EditStep::Redraw);
        type_str(&mut ed, &mut h, "y)");
        assert!(matches!(ed.handle_key(&ev(Key::Enter), &mut h, None), EditStep::Finish(_)));
    }

    #[test]
    fn brackets_inside_strings_do_not_count() {
        let rules = WordRules::default();
        assert!(balanced("\"(\"", &rules));
        assert!(!balanced("\"(", &rules));
        assert!(!balanced("(", &rules));
        assert!(balanced("('a')", &rules));
        assert!(balanced("]", &rules)); // stray closer does not block
    }

    #[test]
    fn host_predicate_overrides_detector() {
        let mut opts = EditOptions::default();
        opts.is_complete = Some(Rc::new(|s: &str| s.ends_with(";")));
        let mut ed = Editor::new(opts);
        let mut h = History::new();
        type_str(&mut ed, &mut h, "stmt");
        assert_eq!(ed.handle_key(&ev(Key::Enter), &mut h, None), EditStep::Redraw);
        type_str(&mut ed, &mut h, ";");
        assert!(matches!(ed.handle_key(&ev(Key::Enter), &mut h, None), EditStep::Finish(_)));
    }

    #[test]
    fn multiline_indent_copies_leading_whitespace() {
        let (mut ed, mut h) = editor();
        type_str(&mut ed, &mut h, "  x\\");
        ed.handle_key(&ev(Key::Enter), &mut h, None);
        assert_eq!(ed.text(), "  x\\\n  ");
    }

    #[test]
    fn paste_inserts_verbatim_with_newlines() {
        let (mut ed, mut h) = editor();
        let paste = KeyEvent::with_text(Key::Paste, b"a\nb".to_vec(), "a\nb".to_string());
        ed.handle_key(&paste, &mut h, None);
        assert_eq!(ed.text(), "a\nb");
    }

    #[test]
    fn paste_strips_nul() {
        let (mut ed, mut h) = editor();
        let paste = KeyEvent::with_text(Key::Paste, b"a\0b".to_vec(), "a\0b".to_string());
        ed.handle_key(&paste, &mut h, None);
        assert_eq!(ed.text(), "ab");
    }

    #[test]
    fn completion_applies_single_candidate() {
        let (mut ed, mut h) = editor();
        let completer = |_: &str, out: &mut CompletionSet| {
            out.add("println", "println");
        };
        type_str(&mut ed, &mut h, "pr");
        ed.handle_key(&ev(Key::Tab), &mut h, Some(&completer));
        assert_eq!(ed.text(), "println");
        assert!(matches!(ed.mode(), Mode::Editing));
    }

    #[test]
    fn completion_menu_cycle_and_confirm() {
        let (mut ed, mut h) = editor();
        let completer = |_: &str, out: &mut CompletionSet| {
            out.add("print", "print");
            out.add("println", "println");
        };
        type_str(&mut ed, &mut h, "pr");
        ed.handle_key(&ev(Key::Tab), &mut h, Some(&completer));
        assert!(matches!(ed.mode(), Mode::Completion(_)));
        ed.handle_key(&ev(Key::Tab), &mut h, Some(&completer));
        let step = ed.handle_key(&ev(Key::Enter), &mut h, Some(&completer));
        assert_eq!(step, EditStep::Finish("println".into()));
        assert_eq!(ed.text(), "println");
    }

    #[test]
    fn empty_completion_rings_bell() {
        let (mut ed, mut h) = editor();
        let completer = |_: &str, _: &mut CompletionSet| {};
        type_str(&mut ed, &mut h, "zz");
        assert_eq!(ed.handle_key(&ev(Key::Tab), &mut h, Some(&completer)), EditStep::Bell);
        assert!(matches!(ed.mode(), Mode::Editing));
    }

    #[test]
    fn menu_escape_cancels_without_change() {
        let (mut ed, mut h) = editor();
        let completer = |_: &str, out: &mut CompletionSet| {
            out.add("aa", "aa");
            out.add("ab", "ab");
        };
        type_str(&mut ed, &mut h, "a");
        ed.handle_key(&ev(Key::Tab), &mut h, Some(&completer));
        ed.handle_key(&ev(Key::Escape), &mut h, Some(&completer));
        assert_eq!(ed.text(), "a");
        assert!(matches!(ed.mode(), Mode::Editing));
    }

    #[test]
    fn menu_printable_cancels_and_inserts() {
        let (mut ed, mut h) = editor();
        let completer = |_: &str, out: &mut CompletionSet| {
            out.add("aa", "aa");
            out.add("ab", "ab");
        };
        type_str(&mut ed, &mut h, "a");
        ed.handle_key(&ev(Key::Tab), &mut h, Some(&completer));
        ed.handle_key(&KeyEvent::character('x'), &mut h, Some(&completer));
        assert_eq!(ed.text(), "ax");
        assert!(matches!(ed.mode(), Mode::Editing));
    }

    #[test]
    fn menu_backspace_cancels_and_deletes() {
        let (mut ed, mut h) = editor();
        let completer = |_: &str, out: &mut CompletionSet| {
            out.add("aa", "aa");
            out.add("ab", "ab");
        };
        type_str(&mut ed, &mut h, "ab");
        ed.handle_key(&ev(Key::Tab), &mut h, Some(&completer));
        ed.handle_key(&ev(Key::Backspace), &mut h, Some(&completer));
        assert_eq!(ed.text(), "a");
    }

    #[test]
    fn preview_hint_shows_candidate_suffix() {
        let mut opts = EditOptions::default();
        opts.completion_preview = true;
        let mut ed = Editor::new(opts);
        let mut h = History::new();
        let completer = |_: &str, out: &mut CompletionSet| {
            out.add("print", "print");
            out.add("println", "println");
        };
        type_str(&mut ed, &mut h, "pr");
        ed.handle_key(&ev(Key::Tab), &mut h, Some(&completer));
        assert_eq!(ed.preview_hint(), Some("int".to_string()));
    }

    #[test]
    fn search_finds_and_accepts() {
        let (mut ed, mut h) = editor();
        for s in ["alpha", "beta", "beta-2"] {
            h.add(s);
        }
        ed.handle_key(&ev(Key::ControlR), &mut h, None);
        ed.handle_key(&KeyEvent::character('b'), &mut h, None);
        ed.handle_key(&KeyEvent::character('e'), &mut h, None);
        assert_eq!(
            ed.handle_key(&ev(Key::Enter), &mut h, None),
            EditStep::Finish("beta-2".into())
        );
    }

    #[test]
    fn search_steps_to_older_match() {
        let (mut ed, mut h) = editor();
        for s in ["beta", "other", "beta-2"] {
            h.add(s);
        }
        ed.handle_key(&ev(Key::ControlR), &mut h, None);
        ed.handle_key(&KeyEvent::character('b'), &mut h, None);
        ed.handle_key(&ev(Key::ControlR), &mut h, None);
        assert_eq!(
            ed.handle_key(&ev(Key::Enter), &mut h, None),
            EditStep::Finish("beta".into())
        );
    }

    #[test]
    fn search_ctrl_g_restores_original() {
        let (mut ed, mut h) = editor();
        h.add("target");
        type_str(&mut ed, &mut h, "mine");
        ed.handle_key(&ev(Key::ControlR), &mut h, None);
        ed.handle_key(&KeyEvent::character('t'), &mut h, None);
        ed.handle_key(&ev(Key::ControlG), &mut h, None);
        assert_eq!(ed.text(), "mine");
        assert!(matches!(ed.mode(), Mode::Editing));
    }

    #[test]
    fn search_escape_keeps_match() {
        let (mut ed, mut h) = editor();
        h.add("target");
        ed.handle_key(&ev(Key::ControlR), &mut h, None);
        ed.handle_key(&KeyEvent::character('t'), &mut h, None);
        ed.handle_key(&ev(Key::Escape), &mut h, None);
        assert_eq!(ed.text(), "target");
        assert!(matches!(ed.mode(), Mode::Editing));
    }

    #[test]
    fn search_motion_key_accepts_and_redispatches() {
        let (mut ed, mut h) = editor();
        h.add("target");
        ed.handle_key(&ev(Key::ControlR), &mut h, None);
        ed.handle_key(&KeyEvent::character('t'), &mut h, None);
        ed.handle_key(&ev(Key::Home), &mut h, None);
        assert_eq!(ed.text(), "target");
        assert_eq!(ed.cursor(), 0);
    }

    #[test]
    fn help_overlay_dismissed_by_any_key() {
        let (mut ed, mut h) = editor();
        ed.handle_key(&ev(Key::F1), &mut h, None);
        assert!(matches!(ed.mode(), Mode::Help));
        assert!(ed.overlay().is_some());
        ed.handle_key(&KeyEvent::character('x'), &mut h, None);
        assert!(matches!(ed.mode(), Mode::Editing));
    }

    #[test]
    fn smart_case_match_span() {
        let m = search_match("Beta-2", "be");
        assert_eq!(m.start, 0);
        assert_eq!(m.len, 2);
        let m = search_match("say beta", "BET");
        assert_eq!(m.len, 0); // exact case, no match span
    }

    #[test]
    fn buffer_cap_rings_bell() {
        let mut opts = EditOptions::default();
        opts.max_buffer_bytes = 3;
        let mut ed = Editor::new(opts);
        let mut h = History::new();
        type_str(&mut ed, &mut h, "abc");
        assert_eq!(ed.handle_key(&KeyEvent::character('d'), &mut h, None), EditStep::Bell);
        assert_eq!(ed.text(), "abc");
    }
}
