//! Environment substitution map.
//!
//! Variable names may carry `$name` or `${name}` tags.  Before such a name
//! reaches the variable store, every tag whose key is present here is
//! replaced by its value; unknown tags are left in place so a later pass can
//! still resolve them.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct EnvMap {
    entries: HashMap<String, String>,
}

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Substitute every known `$key` / `${key}` in `text`.
    pub fn expand(&self, text: &str) -> String {
        if !text.contains('$') {
            return text.to_owned();
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(at) = rest.find('$') {
            out.push_str(&rest[..at]);
            let after = &rest[at + 1..];
            let (key, tag_len) = match after.strip_prefix('{') {
                Some(inner) => match inner.find('}') {
                    Some(close) => (&inner[..close], close + 3),
                    None => ("", 1),
                },
                None => {
                    let len = after
                        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                        .unwrap_or(after.len());
                    (&after[..len], len + 1)
                }
            };
            let tag = &rest[at..at + tag_len];
            match self.get(key).filter(|v| !key.is_empty() && !v.is_empty()) {
                Some(value) => out.push_str(value),
                None => out.push_str(tag),
            }
            rest = &rest[at + tag_len..];
        }
        out.push_str(rest);
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = EnvMap::new();
        for (k, v) in iter {
            env.set(k, v);
        }
        env
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvMap {
        [("myIdentifier", "replaced"), ("obj", "Button")].into_iter().collect()
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(env().expand("myIdentifier"), "myIdentifier");
    }

    #[test]
    fn dollar_tag() {
        assert_eq!(env().expand("$myIdentifier"), "replaced");
    }

    #[test]
    fn braced_tag_with_path_suffix() {
        assert_eq!(env().expand("${obj}.Visible"), "Button.Visible");
        assert_eq!(env().expand("$obj.Visible"), "Button.Visible");
    }

    #[test]
    fn unknown_tag_is_kept() {
        assert_eq!(env().expand("$missing.x"), "$missing.x");
        assert_eq!(env().expand("${missing}"), "${missing}");
    }

    #[test]
    fn malformed_tags_pass_through() {
        assert_eq!(env().expand("${obj"), "${obj");
        assert_eq!(env().expand("a$"), "a$");
        assert_eq!(env().expand("$$obj"), "$Button");
    }

    #[test]
    fn multiple_tags() {
        assert_eq!(env().expand("$obj.$myIdentifier"), "Button.replaced");
    }
}
