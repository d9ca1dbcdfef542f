//! Tokenizer.
//!
//! Splits source text into [`Token`]s.  At each offset the longest lexeme
//! wins: two-character operators before one-character ones, then quoted
//! strings, then "words" (the maximal run of `[A-Za-z0-9${}_.]`), which are
//! classified by prefix into float, int, boolean, `return`, identifier or
//! unknown.  Anything else is skipped one character at a time.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::token::{Op, Token, TokenKind};

const TWO_CHAR_OPS: [&str; 13] = [
    "++", "--", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "&&", "||",
];

struct Classes {
    float: Regex,
    int: Regex,
    boolean: Regex,
    ident: Regex,
}

fn classes() -> &'static Classes {
    static CLASSES: OnceLock<Classes> = OnceLock::new();
    CLASSES.get_or_init(|| Classes {
        float: Regex::new(r"^[0-9]+\.[0-9]+").expect("float pattern"),
        int: Regex::new(r"^[0-9]+").expect("int pattern"),
        boolean: Regex::new(r"(?i)^(true|false)$").expect("boolean pattern"),
        ident: Regex::new(r"^[A-Za-z_$\{][A-Za-z0-9$\{\}_.]*$").expect("identifier pattern"),
    })
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '$' | '{' | '}' | '_' | '.')
}

/// Tokenize `src`.  Never fails; unrecognised characters are skipped.
pub fn tokenize(src: &str) -> Vec<Token> {
    Lexer::new(src).collect()
}

/// Iterator over the tokens of one source string.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn lex_operator(&mut self) -> Option<TokenKind> {
        let rest = self.rest();
        if let Some(sym) = TWO_CHAR_OPS.iter().find(|sym| rest.starts_with(**sym)) {
            self.pos += 2;
            return Op::from_symbol(sym).map(TokenKind::Op);
        }
        let kind = match rest.chars().next()? {
            '(' => TokenKind::ParenOpen,
            ')' => TokenKind::ParenClose,
            ';' => TokenKind::End,
            c @ ('+' | '-' | '*' | '/' | '%' | ',' | '=' | '<' | '>') => {
                TokenKind::Op(Op::from_symbol(c.encode_utf8(&mut [0; 4]))?)
            }
            _ => return None,
        };
        self.pos += 1;
        Some(kind)
    }

    fn lex_string(&mut self) -> Option<TokenKind> {
        let rest = self.rest();
        let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
        let close = rest[1..].find(quote)?;
        let body = &rest[1..1 + close];
        self.pos += close + 2;
        Some(TokenKind::Str(unescape(body)))
    }

    fn lex_word(&mut self) -> Option<TokenKind> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_word_char(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(classify(&rest[..len]))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            self.skip_ws();
            let start = self.pos;
            let c = self.rest().chars().next()?;

            let kind = self
                .lex_operator()
                .or_else(|| self.lex_string())
                .or_else(|| self.lex_word());
            match kind {
                Some(kind) => return Some(Token::new(kind, start)),
                None => {
                    debug!(offset = start, "no lexeme matches {c:?}, skipping");
                    self.pos += c.len_utf8();
                }
            }
        }
    }
}

/// Classify one word lexeme.
pub fn classify(word: &str) -> TokenKind {
    let re = classes();
    if let Some(m) = re.float.find(word) {
        return TokenKind::Float(m.as_str().parse().unwrap_or(0.0));
    }
    if let Some(m) = re.int.find(word) {
        let digits = m.as_str();
        return match digits.parse::<i64>() {
            Ok(n) => TokenKind::Int(n),
            Err(_) => TokenKind::Float(digits.parse().unwrap_or(f64::INFINITY)),
        };
    }
    if word == "return" {
        return TokenKind::Return;
    }
    if re.boolean.is_match(word) {
        return TokenKind::Int(if word.eq_ignore_ascii_case("true") { 1 } else { 0 });
    }
    if re.ident.is_match(word) {
        return TokenKind::Ident(word.to_owned());
    }
    TokenKind::Unknown(word.to_owned())
}

/// Decode backslash escapes inside a quoted string body.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
