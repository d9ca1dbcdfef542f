//! `#define` pre-pass.
//!
//! `#define KEY VALUE` lines are pulled out of the source into a [`Macros`]
//! table and every later whole-identifier occurrence of `KEY` outside quotes
//! is replaced by `VALUE` before tokenizing.

use std::sync::OnceLock;

use regex::Regex;

use super::lexer::is_word_char;

/// Ordered `key → replacement` multimap.  Lookups return the newest entry.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Macros {
    entries: Vec<(String, String)>,
}

impl Macros {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// The most recent replacement recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All entries in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append every entry of `other` after ours.
    pub fn extend(&mut self, other: &Macros) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn define_line() -> &'static Regex {
    static DEFINE: OnceLock<Regex> = OnceLock::new();
    DEFINE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*#define[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]*([^\r\n]*)\r?$")
            .expect("define pattern")
    })
}

/// Split `src` into its `#define` table and the remaining source text.
///
/// Directive lines are blanked (their newline is kept) so byte offsets of
/// the surviving lines shift only by the removed directive text.
pub fn extract(src: &str) -> (Macros, String) {
    let mut macros = Macros::new();
    for caps in define_line().captures_iter(src) {
        macros.push(&caps[1], caps[2].trim());
    }
    let stripped = define_line().replace_all(src, "").into_owned();
    (macros, stripped)
}

/// Replace whole-identifier occurrences of macro keys in `src`.
///
/// A word is a maximal run of identifier characters, the same class the
/// lexer uses, so `Foo.KEY`, `$KEY` and `1.0f` are single words that only
/// match a key spelled exactly that way.  Quoted strings are copied through
/// untouched.  Replacements are not rescanned.
pub fn expand(src: &str, macros: &Macros) -> String {
    if macros.is_empty() {
        return src.to_owned();
    }
    let mut out = String::with_capacity(src.len());
    let mut chars = src.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c == '"' || c == '\'' {
            out.push(c);
            for (_, q) in chars.by_ref() {
                out.push(q);
                if q == c {
                    break;
                }
            }
        } else if is_word_char(c) {
            let mut end = start + c.len_utf8();
            while let Some(&(i, n)) = chars.peek() {
                if !is_word_char(n) {
                    break;
                }
                end = i + n.len_utf8();
                chars.next();
            }
            let word = &src[start..end];
            out.push_str(macros.get(word).unwrap_or(word));
        } else {
            out.push(c);
        }
    }
    out
}

/// Run both halves of the pre-pass.  `predefined` behaves as if it were
/// `#define`d ahead of the first line; the merged table is returned with
/// the expanded text.
pub fn preprocess(src: &str, predefined: &Macros) -> (Macros, String) {
    let (local, stripped) = extract(src);
    let mut macros = predefined.clone();
    macros.extend(&local);
    let expanded = expand(&stripped, &macros);
    (macros, expanded)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
