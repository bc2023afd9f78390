//! History store: past entries, search, and the on-disk format.
//!
//! Entries are ordered oldest to newest. With duplicates disabled a new
//! entry equal to the current last is a no-op, and a soft cap drops from
//! the head. The store itself does not decide when to persist; the reader
//! saves after each accepted line when a file is configured.
//!
//! File format: UTF-8, one entry per line. Newlines inside an entry are
//! written as `\n` and backslashes as `\\`. Loading ignores leading and
//! trailing blank lines and keeps only the newest `max_entries`.

use crate::error::HistoryError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default soft cap on retained entries.
pub const DEFAULT_MAX_ENTRIES: usize = 200;

/// Direction of a history search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// From newer toward older entries.
    Reverse,
    /// From older toward newer entries.
    Forward,
}

#[derive(Debug)]
pub struct History {
    entries: Vec<String>,
    max_entries: usize,
    allow_duplicates: bool,
    path: Option<PathBuf>,
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: DEFAULT_MAX_ENTRIES,
            allow_duplicates: false,
            path: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn set_allow_duplicates(&mut self, allow: bool) {
        self.allow_duplicates = allow;
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an entry. Empty entries are dropped; with duplicates disabled
    /// an entry equal to the current last is a no-op. Returns whether the
    /// store changed.
    pub fn add(&mut self, entry: &str) -> bool {
        if entry.is_empty() {
            return false;
        }
        if !self.allow_duplicates && self.entries.last().map(String::as_str) == Some(entry) {
            return false;
        }
        self.entries.push(entry.to_string());
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        true
    }

    pub fn remove_last(&mut self) -> Option<String> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Find the nearest entry containing `pattern`, starting at `from`
    /// (inclusive) and walking in `direction`. An all-lowercase pattern
    /// matches case-insensitively; any uppercase makes it exact.
    pub fn search(
        &self,
        pattern: &str,
        from: Option<usize>,
        direction: SearchDirection,
    ) -> Option<usize> {
        if self.entries.is_empty() || pattern.is_empty() {
            return None;
        }
        let fold = pattern.chars().all(|c| !c.is_uppercase());
        let needle = if fold { pattern.to_lowercase() } else { pattern.to_string() };
        let matches = |entry: &str| {
            if fold {
                entry.to_lowercase().contains(&needle)
            } else {
                entry.contains(&needle)
            }
        };
        match direction {
            SearchDirection::Reverse => {
                let start = from.unwrap_or(self.entries.len() - 1).min(self.entries.len() - 1);
                (0..=start).rev().find(|&i| matches(&self.entries[i]))
            }
            SearchDirection::Forward => {
                let start = from.unwrap_or(0);
                (start..self.entries.len()).find(|&i| matches(&self.entries[i]))
            }
        }
    }

    /// Configure the backing file and load it. A missing file is not an
    /// error; the store just starts empty.
    pub fn set_file(&mut self, path: impl Into<PathBuf>, max_entries: usize) -> Result<(), HistoryError> {
        let path = path.into();
        self.max_entries = max_entries.max(1);
        self.path = Some(path.clone());
        if !path.exists() {
            return Ok(());
        }
        let raw = fs::read_to_string(&path)?;
        let lines: Vec<&str> = raw.lines().collect();
        let head = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(lines.len());
        let tail = lines.iter().rposition(|l| !l.trim().is_empty()).map(|i| i + 1).unwrap_or(head);
        let mut entries: Vec<String> = lines[head..tail].iter().map(|l| unescape_entry(l)).collect();
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }
        self.entries = entries;
        Ok(())
    }

    /// Write the full store to the configured file: temp file alongside the
    /// target, then rename into place. Mode 0600 on POSIX.
    pub fn save(&self) -> Result<(), HistoryError> {
        let path = self.path.as_ref().ok_or(HistoryError::NoFile)?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        for entry in &self.entries {
            writeln!(tmp, "{}", escape_entry(entry))?;
        }
        tmp.flush()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            tmp.as_file().set_permissions(perms)?;
        }
        tmp.persist(path).map_err(|e| HistoryError::Io(e.error))?;
        Ok(())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_entry(entry: &str) -> String {
    let mut out = String::with_capacity(entry.len());
    for c in entry.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_entry(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_dedups_consecutive() {
        let mut h = History::new();
        assert!(h.add("ls"));
        assert!(!h.add("ls"));
        assert!(h.add("pwd"));
        assert!(h.add("ls"));
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn duplicates_allowed_when_enabled() {
        let mut h = History::new();
        h.set_allow_duplicates(true);
        assert!(h.add("ls"));
        assert!(h.add("ls"));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn empty_entries_are_dropped() {
        let mut h = History::new();
        assert!(!h.add(""));
        assert_eq!(h.len(), 0);
    }

    #[test]
    fn cap_drops_from_head() {
        let mut h = History::new();
        h.max_entries = 3;
        for s in ["a", "b", "c", "d"] {
            h.add(s);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.get(0), Some("b"));
        assert_eq!(h.get(2), Some("d"));
    }

    #[test]
    fn reverse_search_finds_newest_first() {
        let mut h = History::new();
        for s in ["alpha", "beta", "beta-2"] {
            h.add(s);
        }
        assert_eq!(h.search("be", None, SearchDirection::Reverse), Some(2));
        assert_eq!(h.search("be", Some(1), SearchDirection::Reverse), Some(1));
        assert_eq!(h.search("al", None, SearchDirection::Reverse), Some(0));
        assert_eq!(h.search("zz", None, SearchDirection::Reverse), None);
    }

    #[test]
    fn forward_search() {
        let mut h = History::new();
        for s in ["alpha", "beta", "beta-2"] {
            h.add(s);
        }
        assert_eq!(h.search("beta", Some(0), SearchDirection::Forward), Some(1));
        assert_eq!(h.search("beta", Some(2), SearchDirection::Forward), Some(2));
    }

    #[test]
    fn smart_case_search() {
        let mut h = History::new();
        h.add("Make BUILD");
        // all-lowercase pattern folds case
        assert_eq!(h.search("build", None, SearchDirection::Reverse), Some(0));
        // uppercase in the pattern makes it exact
        assert_eq!(h.search("Build", None, SearchDirection::Reverse), None);
        assert_eq!(h.search("BUILD", None, SearchDirection::Reverse), Some(0));
    }

    #[test]
    fn escape_round_trip() {
        let original = "line one\nline \\two\\";
        let escaped = escape_entry(original);
        assert!(!escaped.contains('\n'));
        assert_eq!(unescape_entry(&escaped), original);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let mut h = History::new();
        h.set_file(&path, 100).unwrap();
        h.add("first");
        h.add("multi\nline");
        h.add("back\\slash");
        h.save().unwrap();

        let mut reloaded = History::new();
        reloaded.set_file(&path, 100).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.get(1), Some("multi\nline"));
        assert_eq!(reloaded.get(2), Some("back\\slash"));
    }

    #[test]
    fn load_truncates_to_max() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let mut h = History::new();
        h.set_file(&path, 100).unwrap();
        for i in 0..10 {
            h.add(&format!("entry-{i}"));
        }
        h.save().unwrap();

        let mut reloaded = History::new();
        reloaded.set_file(&path, 4).unwrap();
        assert_eq!(reloaded.len(), 4);
        assert_eq!(reloaded.get(0), Some("entry-6"));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = History::new();
        h.set_file(dir.path().join("absent"), 10).unwrap();
        assert!(h.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let mut h = History::new();
        h.set_file(&path, 10).unwrap();
        h.add("secret");
        h.save().unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
