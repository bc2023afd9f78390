//! End-to-end editing scenarios: a scripted byte stream goes through the
//! real key decoder, editor dispatch and renderer, and the final line plus
//! side effects are checked.

use linedit::{CompletionSet, LineReader, Termination};
use linedit_io::mock::{MockConsoleInput, MockConsoleOutput, MockOutputHandle};

fn reader_for(script: &[u8]) -> (LineReader, MockOutputHandle) {
    let input = MockConsoleInput::from_bytes(script);
    let output = MockConsoleOutput::new();
    let handle = output.handle();
    (LineReader::with_console(Box::new(input), Box::new(output)), handle)
}

#[test]
fn plain_line_is_returned_and_remembered() {
    let (mut reader, _out) = reader_for(b"hello\r");
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("hello"));
    assert_eq!(reader.last_termination(), Termination::Line);
    assert_eq!(reader.history_len(), 1);
    assert_eq!(reader.history().get(0), Some("hello"));
}

#[test]
fn cursor_motion_inserts_in_the_middle() {
    // a b c Left Left x Enter -> axbc
    let (mut reader, _out) = reader_for(b"abc\x1b[D\x1b[Dx\r");
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("axbc"));
}

#[test]
fn kill_to_end_yields_empty_line_and_no_history() {
    // f o o Ctrl-A Ctrl-K Enter -> "" and history untouched
    let (mut reader, _out) = reader_for(b"foo\x01\x0b\r");
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some(""));
    assert_eq!(reader.history_len(), 0);
}

#[test]
fn reverse_search_finds_newest_match() {
    // Ctrl-R b e Enter -> beta-2
    let (mut reader, _out) = reader_for(b"\x12be\r");
    reader.history_add("alpha");
    reader.history_add("beta");
    reader.history_add("beta-2");
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("beta-2"));
}

#[test]
fn completion_menu_second_tab_selects_next() {
    // p r Tab Tab Enter -> println
    let (mut reader, _out) = reader_for(b"pr\t\t\r");
    reader.set_completer(|_prefix: &str, out: &mut CompletionSet| {
        for kw in ["print", "println"] {
            if kw.starts_with(out.word()) {
                out.add(kw, kw);
            }
        }
    });
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("println"));
}

#[test]
fn trailing_backslash_continues_the_line() {
    // a \ Enter b Enter -> "a\\\nb" in one submission
    let (mut reader, _out) = reader_for(b"a\\\rb\r");
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("a\\\nb"));
    assert_eq!(reader.history_len(), 1);
}

#[test]
fn unbalanced_paren_continues_the_line() {
    let (mut reader, _out) = reader_for(b"f(1,\r2)\r");
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("f(1,\n2)"));
}

#[test]
fn ctrl_c_cancels_without_history() {
    let (mut reader, _out) = reader_for(b"secret\x03");
    let line = reader.read_line("").unwrap();
    assert_eq!(line, None);
    assert_eq!(reader.last_termination(), Termination::Cancelled);
    assert_eq!(reader.history_len(), 0);
}

#[test]
fn ctrl_d_on_empty_is_eof() {
    let (mut reader, _out) = reader_for(b"\x04");
    let line = reader.read_line("").unwrap();
    assert_eq!(line, None);
    assert_eq!(reader.last_termination(), Termination::Eof);
}

#[test]
fn bracketed_paste_inserts_payload_verbatim() {
    let mut script = Vec::new();
    script.extend_from_slice(b"\x1b[200~two\nlines\x1b[201~");
    script.extend_from_slice(b"\r");
    let (mut reader, _out) = reader_for(&script);
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("two\nlines"));
}

#[test]
fn history_navigation_recalls_previous_entry() {
    // Up Enter -> last entry
    let (mut reader, _out) = reader_for(b"\x1b[A\r");
    reader.history_add("older");
    reader.history_add("newest");
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("newest"));
}

#[test]
fn undo_reverts_typed_run() {
    // type foo, undo (Ctrl-Z), type bar, Enter -> "bar"
    let (mut reader, _out) = reader_for(b"foo\x1abar\r");
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("bar"));
}

#[test]
fn repeated_lines_are_deduplicated() {
    let (mut reader, _out) = reader_for(b"same\r");
    reader.history_add("same");
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("same"));
    assert_eq!(reader.history_len(), 1);
}

#[test]
fn prompt_marker_is_rendered() {
    let (mut reader, out) = reader_for(b"x\r");
    reader.set_prompt_marker(">> ");
    let _ = reader.read_line("calc").unwrap();
    assert!(out.text().contains("calc>> "));
}

#[test]
fn wide_characters_round_trip() {
    let mut script = Vec::new();
    script.extend_from_slice("こんにちは".as_bytes());
    script.push(b'\r');
    let (mut reader, _out) = reader_for(&script);
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("こんにちは"));
}

#[test]
fn empty_completion_rings_the_bell() {
    let (mut reader, out) = reader_for(b"zz\t\r");
    reader.set_completer(|_: &str, _: &mut CompletionSet| {});
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("zz"));
    assert!(out.bell_count() >= 1);
}

#[test]
fn history_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");
    {
        let (mut reader, _out) = reader_for(b"persisted\r");
        reader.set_history(&path, 50).unwrap();
        let _ = reader.read_line("").unwrap();
    }
    let (mut reader, _out) = reader_for(b"\x1b[A\r");
    reader.set_history(&path, 50).unwrap();
    assert_eq!(reader.history_len(), 1);
    let line = reader.read_line("").unwrap();
    assert_eq!(line.as_deref(), Some("persisted"));
}

#[test]
fn multiline_entry_survives_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");
    {
        let (mut reader, _out) = reader_for(b"a\\\rb\r");
        reader.set_history(&path, 50).unwrap();
        let line = reader.read_line("").unwrap();
        assert_eq!(line.as_deref(), Some("a\\\nb"));
    }
    let (mut reader, _out) = reader_for(b"\r");
    reader.set_history(&path, 50).unwrap();
    assert_eq!(reader.history().get(0), Some("a\\\nb"));
}

#[test]
fn exhausted_input_reports_eof() {
    let (mut reader, _out) = reader_for(b"never finished");
    let line = reader.read_line("").unwrap();
    assert_eq!(line, None);
    assert_eq!(reader.last_termination(), Termination::Eof);
}
