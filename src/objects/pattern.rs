//! Glob patterns for key discovery.
//!
//! Syntax: `?` matches exactly one character (one UTF-8 scalar, so `caf?`
//! finds `café`), `*` matches any run including the empty one, and every other
//! character is literal, `\` included. There is no implicit prefix or
//! substring matching, so a pattern without wildcards names one key.
//!
//! The store's SCAN MATCH dialect also has `[...]` classes and `\` escapes, so
//! translation escapes `[`, `]` and `\` to keep them literal. Separators such
//! as `:` pass through untouched.

use super::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(u8),
    AnyOne,
    AnyRun,
}

/// A validated glob pattern together with its store-native translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    source: String,
    native: String,
    tokens: Vec<Token>,
}

impl GlobPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::invalid_pattern(pattern, "pattern is empty"));
        }

        let tokens: Vec<Token> = pattern
            .bytes()
            .map(|b| match b {
                b'?' => Token::AnyOne,
                b'*' => Token::AnyRun,
                c => Token::Literal(c),
            })
            .collect();

        let native = translate(&tokens);
        Ok(GlobPattern {
            source: pattern.to_string(),
            native,
            tokens,
        })
    }

    /// The pattern as written by the caller.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The pattern in the store's SCAN MATCH syntax.
    pub fn native(&self) -> &str {
        &self.native
    }

    /// True if the pattern has no wildcards and so names exactly one key.
    pub fn is_literal(&self) -> bool {
        self.tokens.iter().all(|t| matches!(t, Token::Literal(_)))
    }

    /// Client-side match with the same semantics the store applies.
    pub fn matches(&self, key: &str) -> bool {
        let key = key.as_bytes();
        let tokens = &self.tokens;
        let (mut k, mut t) = (0, 0);
        let mut star: Option<(usize, usize)> = None;

        while k < key.len() {
            match tokens.get(t) {
                Some(Token::AnyRun) => {
                    star = Some((t + 1, k));
                    t += 1;
                    continue;
                }
                Some(Token::AnyOne) => {
                    k += utf8_width(key[k]);
                    t += 1;
                    continue;
                }
                Some(Token::Literal(c)) if *c == key[k] => {
                    k += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }
            match star {
                Some((star_t, star_k)) => {
                    t = star_t;
                    k = star_k + utf8_width(key[star_k]);
                    star = Some((star_t, k));
                }
                None => return false,
            }
        }
        tokens[t..].iter().all(|t| *t == Token::AnyRun)
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for GlobPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        GlobPattern::parse(s)
    }
}

fn translate(tokens: &[Token]) -> String {
    let mut native = Vec::with_capacity(tokens.len() * 2);
    for token in tokens {
        match token {
            Token::AnyOne => native.push(b'?'),
            Token::AnyRun => native.push(b'*'),
            Token::Literal(c @ (b'[' | b']' | b'\\')) => {
                native.push(b'\\');
                native.push(*c);
            }
            Token::Literal(c) => native.push(*c),
        }
    }
    // Only ASCII bytes were inserted next to whole UTF-8 sequences
    String::from_utf8_lossy(&native).into_owned()
}

/// Byte length of the UTF-8 sequence that starts with `lead`.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xF0..=0xF7 => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redis::CommandExecutor;

    fn glob(p: &str) -> GlobPattern {
        GlobPattern::parse(p).unwrap()
    }

    #[test]
    fn test_wildcards() {
        assert!(glob("test?").matches("test1"));
        assert!(!glob("test?").matches("test"));
        assert!(!glob("test?").matches("test12"));
        assert!(glob("test:testGetPattern:*").matches("test:testGetPattern:one"));
        assert!(glob("*").matches(""));
        assert!(glob("a*b*c").matches("a--b--c"));
        assert!(!glob("a*b*c").matches("a--b--d"));
    }

    #[test]
    fn test_literal_pattern_is_exact() {
        let p = glob("test");
        assert!(p.is_literal());
        assert!(p.matches("test"));
        assert!(!p.matches("test1"));
        assert!(!p.matches("mytest"));
    }

    #[test]
    fn test_translation() {
        assert_eq!(glob("test:*").native(), "test:*");
        assert_eq!(glob("a[1]?").native(), "a\\[1\\]?");
        assert_eq!(glob("dir\\file").native(), "dir\\\\file");
        assert_eq!(glob("dir\\").native(), "dir\\\\");
    }

    #[test]
    fn test_backslash_is_literal() {
        let p = glob("dir\\file");
        assert!(p.is_literal());
        assert!(p.matches("dir\\file"));
        assert!(!p.matches("dirfile"));

        let trailing = glob("dir\\");
        assert!(trailing.matches("dir\\"));
        assert!(!trailing.matches("dir"));

        // A backslash does not turn the next wildcard into a literal
        let p = glob("what\\?");
        assert!(!p.is_literal());
        assert!(p.matches("what\\s"));
        assert!(!p.matches("what?"));
    }

    #[test]
    fn test_question_mark_is_one_character() {
        assert!(glob("caf?").matches("café"));
        assert!(glob("??").matches("日本"));
        assert!(!glob("?").matches("日本"));
        assert!(glob("*é").matches("résumé"));
        assert!(glob("r*?é").matches("résumé"));
        assert!(!glob("caf?").matches("cafés"));
    }

    #[test]
    fn test_invalid_patterns() {
        match GlobPattern::parse("") {
            Err(Error::InvalidPattern { pattern, reason }) => {
                assert_eq!(pattern, "");
                assert!(reason.contains("empty"));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(GlobPattern::parse("abc\\").is_ok());
    }

    #[test]
    fn test_client_and_store_agree() {
        let keys = [
            "test", "test1", "test2", "test12", "a[1]b", "a1b", "x*y", "xzy", "ns:a:b", "",
            "dir\\file", "dirfile", "café", "cafe", "日本", "résumé",
        ];
        let patterns = [
            "test?", "test*", "a[1]?", "a?b", "x?y", "ns:*", "*", "test", "dir\\file",
            "dir\\*", "caf?", "??", "r*?é", "*é",
        ];
        for pattern in patterns {
            let p = glob(pattern);
            for key in keys {
                assert_eq!(
                    p.matches(key),
                    CommandExecutor::matches_glob_pattern(key, p.native()),
                    "pattern {:?} key {:?}",
                    pattern,
                    key
                );
            }
        }
    }
}
