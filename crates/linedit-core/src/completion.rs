//! Completion candidates and the completer callback interface.
//!
//! On Tab the editor builds a [`CompletionSet`] from the buffer prefix (the
//! bytes up to the cursor) and hands it to the registered [`Completer`].
//! The set locates the word being completed once — quote-aware — so every
//! candidate shares the same replacement anchor, and re-quotes or escapes
//! replacements that contain word-break characters.

use std::rc::Rc;

/// Predicate deciding which code points belong to a word.
pub type WordPredicate = Rc<dyn Fn(char) -> bool>;

/// Word syntax used for anchor extraction and re-quoting.
#[derive(Clone)]
pub struct WordRules {
    pub predicate: WordPredicate,
    pub escape_char: char,
    pub quote_chars: Vec<char>,
    /// Characters that force a replacement to be quoted or escaped.
    pub break_chars: Vec<char>,
}

impl WordRules {
    pub fn is_word(&self, c: char) -> bool {
        (self.predicate)(c)
    }

    pub fn is_break(&self, c: char) -> bool {
        self.break_chars.contains(&c)
    }
}

impl Default for WordRules {
    fn default() -> Self {
        Self {
            predicate: Rc::new(|c: char| c.is_alphanumeric() || c == '_'),
            escape_char: '\\',
            quote_chars: vec!['"', '\''],
            break_chars: vec![' ', '\t'],
        }
    }
}

impl std::fmt::Debug for WordRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordRules")
            .field("escape_char", &self.escape_char)
            .field("quote_chars", &self.quote_chars)
            .finish()
    }
}

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Shown in the candidate menu.
    pub display: String,
    /// Inserted into the buffer when chosen.
    pub replacement: String,
    /// Bytes before the cursor that the replacement overwrites.
    pub delete_before: usize,
}

/// Candidate list under construction during one completer invocation.
pub struct CompletionSet {
    prefix: String,
    anchor: usize,
    open_quote: Option<char>,
    rules: WordRules,
    candidates: Vec<Completion>,
}

impl CompletionSet {
    /// Analyze `prefix` (buffer bytes up to the cursor) and prepare an
    /// empty set anchored at the word under completion.
    pub fn new(prefix: &str, rules: &WordRules) -> Self {
        let (anchor, open_quote) = find_word_anchor(prefix, rules);
        Self {
            prefix: prefix.to_string(),
            anchor,
            open_quote,
            rules: rules.clone(),
            candidates: Vec::new(),
        }
    }

    /// The full buffer prefix the completer was invoked with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The word being completed (text after the anchor, without any
    /// opening quote).
    pub fn word(&self) -> &str {
        &self.prefix[self.anchor..]
    }

    /// Byte offset of the replacement anchor within the prefix.
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// The quote the word is sitting inside, if any.
    pub fn open_quote(&self) -> Option<char> {
        self.open_quote
    }

    /// Add a candidate for the current word, quoting the replacement as
    /// needed.
    pub fn add(&mut self, display: impl Into<String>, replacement: impl Into<String>) {
        let replacement = self.requote(replacement.into());
        self.candidates.push(Completion {
            display: display.into(),
            replacement,
            delete_before: self.prefix.len() - self.anchor,
        });
    }

    /// Add a candidate with an explicit overwrite length, still applying
    /// quoting. For completers whose token syntax differs from the word
    /// rules (e.g. paths).
    pub fn add_anchored(
        &mut self,
        display: impl Into<String>,
        replacement: impl Into<String>,
        delete_before: usize,
    ) {
        let replacement = self.requote(replacement.into());
        self.candidates.push(Completion {
            display: display.into(),
            replacement,
            delete_before: delete_before.min(self.prefix.len()),
        });
    }

    /// Add a candidate verbatim with an explicit overwrite length. For
    /// completers that manage their own anchor and quoting.
    pub fn add_raw(
        &mut self,
        display: impl Into<String>,
        replacement: impl Into<String>,
        delete_before: usize,
    ) {
        self.candidates.push(Completion {
            display: display.into(),
            replacement: replacement.into(),
            delete_before: delete_before.min(self.prefix.len()),
        });
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_candidates(self) -> Vec<Completion> {
        self.candidates
    }

    fn requote(&self, replacement: String) -> String {
        if let Some(q) = self.open_quote {
            // inside quotes: close them after the completed word
            let mut out = replacement;
            out.push(q);
            return out;
        }
        if !replacement.chars().any(|c| self.rules.is_break(c)) {
            return replacement;
        }
        match self.rules.quote_chars.first() {
            Some(&q) => format!("{q}{replacement}{q}"),
            None => {
                let mut out = String::with_capacity(replacement.len() * 2);
                for c in replacement.chars() {
                    if self.rules.is_break(c) {
                        out.push(self.rules.escape_char);
                    }
                    out.push(c);
                }
                out
            }
        }
    }
}

/// A source of completion candidates.
///
/// Closures with the matching signature implement this automatically, so a
/// host can register either a type or a plain function.
pub trait Completer {
    fn complete(&self, prefix: &str, out: &mut CompletionSet);
}

impl<F> Completer for F
where
    F: Fn(&str, &mut CompletionSet),
{
    fn complete(&self, prefix: &str, out: &mut CompletionSet) {
        self(prefix, out)
    }
}

/// Locate the word anchor in `prefix`: just after the innermost open quote
/// when one exists, otherwise the start of the trailing run of word-class
/// and escaped characters.
fn find_word_anchor(prefix: &str, rules: &WordRules) -> (usize, Option<char>) {
    // single pass tracking quote and escape state
    let mut open: Option<(char, usize)> = None;
    let mut escaped = false;
    for (i, c) in prefix.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == rules.escape_char {
            escaped = true;
            continue;
        }
        match open {
            Some((q, _)) if c == q => open = None,
            Some(_) => {}
            None if rules.quote_chars.contains(&c) => open = Some((c, i)),
            None => {}
        }
    }
    if let Some((q, at)) = open {
        return (at + q.len_utf8(), Some(q));
    }

    // no open quote: walk left over word-class and escaped characters
    let chars: Vec<(usize, char)> = prefix.char_indices().collect();
    let mut anchor = prefix.len();
    let mut i = chars.len();
    while i > 0 {
        let (at, c) = chars[i - 1];
        let is_escaped = i >= 2 && chars[i - 2].1 == rules.escape_char && !is_escape_escaped(&chars, i - 2, rules);
        if rules.is_word(c) {
            anchor = at;
            i -= 1;
        } else if is_escaped {
            anchor = chars[i - 2].0;
            i -= 2;
        } else {
            break;
        }
    }
    (anchor, None)
}

/// Whether the escape char at `chars[idx]` is itself escaped.
fn is_escape_escaped(chars: &[(usize, char)], idx: usize, rules: &WordRules) -> bool {
    let mut count = 0;
    let mut i = idx;
    while i > 0 && chars[i - 1].1 == rules.escape_char {
        count += 1;
        i -= 1;
    }
    count % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_at_word_start() {
        let rules = WordRules::default();
        let set = CompletionSet::new("print foo.ba", &rules);
        assert_eq!(set.word(), "ba");
        assert_eq!(set.anchor(), 10);
    }

    #[test]
    fn anchor_spans_whole_prefix_for_single_word() {
        let rules = WordRules::default();
        let set = CompletionSet::new("pr", &rules);
        assert_eq!(set.word(), "pr");
        assert_eq!(set.anchor(), 0);
    }

    #[test]
    fn anchor_inside_open_quote() {
        let rules = WordRules::default();
        let set = CompletionSet::new("open \"my fi", &rules);
        assert_eq!(set.open_quote(), Some('"'));
        assert_eq!(set.word(), "my fi");
    }

    #[test]
    fn closed_quotes_do_not_anchor() {
        let rules = WordRules::default();
        let set = CompletionSet::new("open \"done\" nex", &rules);
        assert_eq!(set.open_quote(), None);
        assert_eq!(set.word(), "nex");
    }

    #[test]
    fn escaped_space_stays_in_word() {
        let rules = WordRules::default();
        let set = CompletionSet::new("my\\ fil", &rules);
        assert_eq!(set.word(), "my\\ fil");
        assert_eq!(set.anchor(), 0);
    }

    #[test]
    fn delete_before_counts_word_bytes() {
        let rules = WordRules::default();
        let mut set = CompletionSet::new("echo wor", &rules);
        set.add("world", "world");
        let c = &set.into_candidates()[0];
        assert_eq!(c.delete_before, 3);
        assert_eq!(c.replacement, "world");
    }

    #[test]
    fn replacement_with_breaks_gets_quoted() {
        let rules = WordRules::default();
        let mut set = CompletionSet::new("open fi", &rules);
        set.add("my file.txt", "my file.txt");
        let c = &set.into_candidates()[0];
        assert_eq!(c.replacement, "\"my file.txt\"");
    }

    #[test]
    fn replacement_escaped_when_no_quote_chars() {
        let rules = WordRules { quote_chars: vec![], ..WordRules::default() };
        let mut set = CompletionSet::new("open fi", &rules);
        set.add("a b", "a b");
        let c = &set.into_candidates()[0];
        assert_eq!(c.replacement, "a\\ b");
    }

    #[test]
    fn dotted_names_are_not_quoted() {
        let rules = WordRules::default();
        let mut set = CompletionSet::new("open fi", &rules);
        set.add("file.txt", "file.txt");
        assert_eq!(set.into_candidates()[0].replacement, "file.txt");
    }

    #[test]
    fn add_anchored_overrides_delete_before_but_quotes() {
        let rules = WordRules::default();
        let mut set = CompletionSet::new("open a/b", &rules);
        set.add_anchored("my dir/", "a/my dir/", 3);
        let c = &set.into_candidates()[0];
        assert_eq!(c.delete_before, 3);
        assert_eq!(c.replacement, "\"a/my dir/\"");
    }

    #[test]
    fn in_quote_replacement_closes_the_quote() {
        let rules = WordRules::default();
        let mut set = CompletionSet::new("open \"my fi", &rules);
        set.add("my file.txt", "my file.txt");
        let c = &set.into_candidates()[0];
        assert_eq!(c.replacement, "my file.txt\"");
        assert_eq!(c.delete_before, "my fi".len());
    }

    #[test]
    fn closure_is_a_completer() {
        let rules = WordRules::default();
        let completer = |_prefix: &str, out: &mut CompletionSet| {
            out.add("one", "one");
            out.add("two", "two");
        };
        let mut set = CompletionSet::new("x", &rules);
        completer.complete("x", &mut set);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn add_raw_clamps_delete_before() {
        let rules = WordRules::default();
        let mut set = CompletionSet::new("ab", &rules);
        set.add_raw("x", "x", 99);
        assert_eq!(set.into_candidates()[0].delete_before, 2);
    }
}
