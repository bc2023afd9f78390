//! The public line reader.
//!
//! A [`LineReader`] is a long-lived value: the history store, completer,
//! highlighter and configuration survive across calls, while each
//! [`LineReader::read_line`] spins up a fresh editor, takes raw mode for
//! the duration of the call, and tears everything down on every exit path.
//!
//! When stdin or stdout is not a terminal (a pipe, a file, `TERM=dumb`),
//! `read_line` degrades to printing the prompt and reading one plain line —
//! no editing, no history.

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use linedit_core::{
    Color, Completer, ConsoleInput, ConsoleOutput, EditOptions, EditStep, Editor, Frame,
    Highlighter, History, HistoryError, Key, ReadError, Renderer, UiColors,
};
use linedit_core::width::str_width;
use linedit_io::debug_log;

/// Delay that separates a lone ESC from the head of an escape sequence.
const ESC_TIMEOUT_MS: u32 = 100;

/// How the previous `read_line` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A line was accepted with Enter.
    Line,
    /// Ctrl-D on an empty buffer, end of input, or an I/O failure.
    Eof,
    /// Ctrl-C.
    Cancelled,
}

enum Outcome {
    Line(String),
    Cancel,
    Eof,
    Abort,
}

pub struct LineReader {
    input: Box<dyn ConsoleInput>,
    renderer: Option<Renderer>,
    interactive: bool,
    history: History,
    options: EditOptions,
    colors: UiColors,
    prompt_marker: String,
    continuation_marker: String,
    color_override: Option<bool>,
    beep: bool,
    inline_help: bool,
    completer: Option<Box<dyn Completer>>,
    highlighter: Option<Highlighter>,
    termination: Termination,
}

impl LineReader {
    /// Hook up to the process terminal. Never fails just because stdin is a
    /// pipe; that case silently selects the non-interactive fallback.
    pub fn new() -> Result<Self, ReadError> {
        let input = linedit_io::create_console_input()?;
        let term_is_dumb = matches!(std::env::var("TERM"), Ok(t) if t == "dumb");
        let want_editing = input.capabilities().is_tty && !term_is_dumb;
        let renderer = if want_editing {
            linedit_io::create_console_output().ok().map(|out| {
                let (cols, rows) = input.window_size().unwrap_or((80, 24));
                Renderer::new(out, cols, rows)
            })
        } else {
            None
        };
        let interactive = renderer.is_some();
        Ok(Self::assemble(input, renderer, interactive))
    }

    /// Build a reader over explicit console implementations. Used by tests
    /// with the mock console, and by hosts embedding unusual terminals.
    pub fn with_console(input: Box<dyn ConsoleInput>, output: Box<dyn ConsoleOutput>) -> Self {
        let (cols, rows) = input.window_size().unwrap_or((80, 24));
        let renderer = Renderer::new(output, cols, rows);
        Self::assemble(input, Some(renderer), true)
    }

    fn assemble(
        input: Box<dyn ConsoleInput>,
        renderer: Option<Renderer>,
        interactive: bool,
    ) -> Self {
        Self {
            input,
            renderer,
            interactive,
            history: History::new(),
            options: EditOptions::default(),
            colors: UiColors::default(),
            prompt_marker: "> ".to_string(),
            continuation_marker: ". ".to_string(),
            color_override: None,
            beep: true,
            inline_help: true,
            completer: None,
            highlighter: None,
            termination: Termination::Line,
        }
    }

    /// Read one line (or multi-line block) of input. `None` means EOF or
    /// cancellation; [`LineReader::last_termination`] tells which.
    pub fn read_line(&mut self, prompt_text: &str) -> Result<Option<String>, ReadError> {
        if !self.interactive {
            return self.read_fallback(prompt_text);
        }

        let prompt = format!("{prompt_text}{}", self.prompt_marker);
        let continuation = self.continuation_prefix(&prompt);
        let mut editor = Editor::new(self.options.clone());
        let outcome = self.run_session(&mut editor, &prompt, &continuation);

        match outcome {
            Outcome::Line(line) => {
                self.termination = Termination::Line;
                if !line.is_empty()
                    && self.history.add(&line)
                    && self.history.path().is_some()
                {
                    if let Err(e) = self.history.save() {
                        debug_log!("history save failed: {e}");
                    }
                }
                Ok(Some(line))
            }
            Outcome::Cancel => {
                self.termination = Termination::Cancelled;
                Ok(None)
            }
            Outcome::Eof | Outcome::Abort => {
                self.termination = Termination::Eof;
                Ok(None)
            }
        }
    }

    fn run_session(&mut self, editor: &mut Editor, prompt: &str, continuation: &str) -> Outcome {
        let (cols, rows) = self.input.window_size().unwrap_or((80, 24));
        let renderer = match self.renderer.as_mut() {
            Some(r) => r,
            None => return Outcome::Abort,
        };
        renderer.resize(cols, rows);
        renderer.set_colors(self.colors);
        if let Some(force) = self.color_override {
            renderer.set_color_enabled(force);
        }
        renderer.set_beep_enabled(self.beep);
        renderer.set_ambiguous_wide(self.options.ambiguous_wide);

        let guard = match self.input.enable_raw_mode() {
            Ok(g) => g,
            Err(e) => {
                debug_log!("enable_raw_mode failed: {e}");
                return Outcome::Abort;
            }
        };
        let paste = self.input.capabilities().supports_bracketed_paste;
        if paste {
            let _ = renderer.output().set_bracketed_paste(true);
        }

        let completer = self.completer.as_deref();
        let highlighter = self.highlighter.as_ref();

        let mut frame = build_frame(editor, prompt, continuation);
        if renderer.render(&frame, highlighter).is_err() {
            let _ = renderer.output().set_bracketed_paste(false);
            drop(guard);
            return Outcome::Abort;
        }

        let outcome = loop {
            let ev = match self.input.read_key_timeout(Some(ESC_TIMEOUT_MS)) {
                Ok(Some(ev)) => ev,
                Ok(None) => continue,
                Err(e) => {
                    debug_log!("terminal read failed: {e}");
                    break Outcome::Abort;
                }
            };
            if ev.key == Key::Resize {
                if let Ok((w, h)) = self.input.window_size() {
                    renderer.resize(w, h);
                }
                frame = build_frame(editor, prompt, continuation);
                if renderer.render(&frame, highlighter).is_err() {
                    break Outcome::Abort;
                }
                continue;
            }
            if ev.key == Key::F1 && !self.inline_help {
                continue;
            }
            match editor.handle_key(&ev, &mut self.history, completer) {
                EditStep::Continue => {}
                EditStep::Redraw => {
                    frame = build_frame(editor, prompt, continuation);
                    if renderer.render(&frame, highlighter).is_err() {
                        break Outcome::Abort;
                    }
                }
                EditStep::Bell => {
                    let _ = renderer.bell();
                }
                EditStep::ClearScreen => {
                    frame = build_frame(editor, prompt, continuation);
                    if renderer.clear_screen(&frame, highlighter).is_err() {
                        break Outcome::Abort;
                    }
                }
                EditStep::Finish(line) => break Outcome::Line(line),
                EditStep::Cancel => break Outcome::Cancel,
                EditStep::Eof => break Outcome::Eof,
            }
        };

        if paste {
            let _ = renderer.output().set_bracketed_paste(false);
        }
        let _ = renderer.finish();
        drop(guard);
        outcome
    }

    /// Plain-stdin path for pipes and dumb terminals.
    fn read_fallback(&mut self, prompt_text: &str) -> Result<Option<String>, ReadError> {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{prompt_text}{}", self.prompt_marker);
        let _ = stdout.flush();
        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line)?;
        if n == 0 {
            self.termination = Termination::Eof;
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        self.termination = Termination::Line;
        if !line.is_empty() {
            self.history.add(&line);
        }
        Ok(Some(line))
    }

    fn continuation_prefix(&self, prompt: &str) -> String {
        if !self.options.multiline_indent {
            return self.continuation_marker.clone();
        }
        let pw = str_width(prompt, self.options.ambiguous_wide);
        let cw = str_width(&self.continuation_marker, self.options.ambiguous_wide);
        if pw > cw {
            format!("{}{}", " ".repeat(pw - cw), self.continuation_marker)
        } else {
            self.continuation_marker.clone()
        }
    }

    pub fn last_termination(&self) -> Termination {
        self.termination
    }

    // --- configuration -----------------------------------------------------

    pub fn set_prompt_marker(&mut self, marker: impl Into<String>) {
        self.prompt_marker = marker.into();
    }

    pub fn set_continuation_marker(&mut self, marker: impl Into<String>) {
        self.continuation_marker = marker.into();
    }

    pub fn set_prompt_color(&mut self, color: Color) {
        self.colors.prompt = color;
    }

    pub fn set_info_color(&mut self, color: Color) {
        self.colors.info = color;
    }

    pub fn set_diminish_color(&mut self, color: Color) {
        self.colors.diminish = color;
    }

    pub fn set_emphasis_color(&mut self, color: Color) {
        self.colors.emphasis = color;
    }

    pub fn set_hint_color(&mut self, color: Color) {
        self.colors.hint = color;
    }

    pub fn enable_multiline(&mut self, enable: bool) {
        self.options.multiline = enable;
    }

    pub fn enable_beep(&mut self, enable: bool) {
        self.beep = enable;
    }

    /// Force color on or off; without this call it follows terminal
    /// detection (`NO_COLOR`, `TERM`, tty-ness).
    pub fn enable_color(&mut self, enable: bool) {
        self.color_override = Some(enable);
    }

    pub fn enable_auto_tab(&mut self, enable: bool) {
        self.options.auto_tab = enable;
    }

    pub fn enable_inline_help(&mut self, enable: bool) {
        self.inline_help = enable;
    }

    pub fn enable_history_duplicates(&mut self, enable: bool) {
        self.history.set_allow_duplicates(enable);
    }

    pub fn enable_completion_preview(&mut self, enable: bool) {
        self.options.completion_preview = enable;
    }

    pub fn enable_multiline_indent(&mut self, enable: bool) {
        self.options.multiline_indent = enable;
    }

    /// Treat East-Asian ambiguous-width code points as wide.
    pub fn set_ambiguous_wide(&mut self, wide: bool) {
        self.options.ambiguous_wide = wide;
    }

    pub fn set_continuation_char(&mut self, c: char) {
        self.options.continuation_char = c;
    }

    pub fn set_max_input_bytes(&mut self, max: usize) {
        self.options.max_buffer_bytes = max.max(1);
    }

    pub fn set_word_chars<F>(&mut self, predicate: F)
    where
        F: Fn(char) -> bool + 'static,
    {
        self.options.word_rules.predicate = Rc::new(predicate);
    }

    pub fn set_quote_chars(&mut self, quotes: Vec<char>) {
        self.options.word_rules.quote_chars = quotes;
    }

    pub fn set_escape_char(&mut self, c: char) {
        self.options.word_rules.escape_char = c;
    }

    /// Override the balanced-brackets detector that decides whether Enter
    /// submits or continues a multi-line edit.
    pub fn set_is_complete<F>(&mut self, predicate: F)
    where
        F: Fn(&str) -> bool + 'static,
    {
        self.options.is_complete = Some(Rc::new(predicate));
    }

    pub fn set_completer<C>(&mut self, completer: C)
    where
        C: Completer + 'static,
    {
        self.completer = Some(Box::new(completer));
    }

    pub fn set_highlighter(&mut self, highlighter: Highlighter) {
        self.highlighter = Some(highlighter);
    }

    // --- history -----------------------------------------------------------

    /// Configure the history file and load it, keeping the newest
    /// `max_entries`. Load failures are reported but leave the reader
    /// usable.
    pub fn set_history(
        &mut self,
        path: impl Into<std::path::PathBuf>,
        max_entries: usize,
    ) -> Result<(), HistoryError> {
        self.history.set_file(path, max_entries)
    }

    pub fn history_add(&mut self, entry: &str) {
        self.history.add(entry);
    }

    pub fn history_remove_last(&mut self) {
        self.history.remove_last();
    }

    pub fn history_clear(&mut self) {
        self.history.clear();
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

fn build_frame(editor: &Editor, prompt: &str, continuation: &str) -> Frame {
    let (text, cursor) = editor.display_text();
    Frame {
        prompt: prompt.to_string(),
        continuation: continuation.to_string(),
        text,
        cursor,
        hint: editor.preview_hint(),
        overlay: editor.overlay(),
    }
}
