//! Ready-made completers for hosts.

use std::path::PathBuf;

use linedit_core::{Completer, CompletionSet};

/// Completes the word under the cursor against a fixed vocabulary.
///
/// Matching is a case-sensitive prefix test on the word the set extracted,
/// so quoting and escaping behave like any other completion.
pub struct WordCompleter {
    words: Vec<String>,
}

impl WordCompleter {
    pub fn new<S: Into<String>>(words: Vec<S>) -> Self {
        Self { words: words.into_iter().map(Into::into).collect() }
    }
}

impl Completer for WordCompleter {
    fn complete(&self, _prefix: &str, out: &mut CompletionSet) {
        let word = out.word().to_string();
        for w in &self.words {
            if w.starts_with(&word) {
                out.add(w.clone(), w.clone());
            }
        }
    }
}

/// Filename completion over one or more root directories.
///
/// Directories complete with a trailing separator so a second Tab descends
/// into them. When `extensions` is non-empty, plain files must match one of
/// them. Filesystem errors are swallowed; an unreadable directory simply
/// contributes no candidates.
pub struct FileCompleter {
    pub roots: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub dir_separator: char,
}

impl FileCompleter {
    pub fn new() -> Self {
        Self { roots: vec![PathBuf::from(".")], extensions: Vec::new(), dir_separator: '/' }
    }

    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self { roots, ..Self::new() }
    }

    fn extension_matches(&self, name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        self.extensions.iter().any(|ext| {
            let ext = ext.strip_prefix('.').unwrap_or(ext);
            std::path::Path::new(name)
                .extension()
                .map(|e| e.to_string_lossy() == *ext)
                .unwrap_or(false)
        })
    }
}

impl Default for FileCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for FileCompleter {
    fn complete(&self, prefix: &str, out: &mut CompletionSet) {
        // a path token runs from the last unquoted whitespace, not just the
        // last word-class run; inside quotes the set's word is the token
        let token = match out.open_quote() {
            Some(_) => out.word().to_string(),
            None => prefix
                .rsplit([' ', '\t'])
                .next()
                .unwrap_or("")
                .to_string(),
        };
        let (dir_part, base) = match token.rfind(self.dir_separator) {
            Some(i) => (token[..=i].to_string(), token[i + 1..].to_string()),
            None => (String::new(), token.clone()),
        };
        for root in &self.roots {
            let dir = if dir_part.is_empty() { root.clone() } else { root.join(&dir_part) };
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with(&base) {
                    continue;
                }
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir && !self.extension_matches(&name) {
                    continue;
                }
                let mut replacement = format!("{dir_part}{name}");
                let mut display = name.clone();
                if is_dir {
                    replacement.push(self.dir_separator);
                    display.push(self.dir_separator);
                }
                out.add_anchored(display, replacement, token.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linedit_core::WordRules;

    #[test]
    fn word_completer_filters_by_prefix() {
        let c = WordCompleter::new(vec!["print", "println", "push"]);
        let rules = WordRules::default();
        let mut set = CompletionSet::new("x = pr", &rules);
        c.complete("x = pr", &mut set);
        let cands = set.into_candidates();
        assert_eq!(cands.len(), 2);
        assert_eq!(cands[0].replacement, "print");
        assert_eq!(cands[1].replacement, "println");
        assert!(cands.iter().all(|c| c.delete_before == 2));
    }

    #[test]
    fn file_completer_lists_matching_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alpha.txt"), "").unwrap();
        std::fs::write(dir.path().join("alpine.rs"), "").unwrap();
        std::fs::create_dir(dir.path().join("albums")).unwrap();
        let c = FileCompleter::with_roots(vec![dir.path().to_path_buf()]);
        let rules = WordRules::default();
        let mut set = CompletionSet::new("al", &rules);
        c.complete("al", &mut set);
        let mut names: Vec<String> = set.into_candidates().into_iter().map(|c| c.display).collect();
        names.sort();
        assert_eq!(names, vec!["albums/", "alpha.txt", "alpine.rs"]);
    }

    #[test]
    fn file_completer_honors_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join("b.rs"), "").unwrap();
        let mut c = FileCompleter::with_roots(vec![dir.path().to_path_buf()]);
        c.extensions = vec![".rs".to_string()];
        let rules = WordRules::default();
        let mut set = CompletionSet::new("", &rules);
        c.complete("", &mut set);
        let cands = set.into_candidates();
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].display, "b.rs");
    }

    #[test]
    fn file_completer_ignores_missing_directory() {
        let c = FileCompleter::with_roots(vec![PathBuf::from("/definitely/not/here")]);
        let rules = WordRules::default();
        let mut set = CompletionSet::new("x", &rules);
        c.complete("x", &mut set);
        assert!(set.is_empty());
    }
}
