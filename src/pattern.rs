//! Name patterns used by bulk deletion.
//!
//! Glob patterns support `?`, `*` and bracket classes (`[abc]`, `[a-z]`,
//! `[!abc]`, `[^abc]`) and must match the whole name. Regex patterns use the
//! `regex` crate syntax and match anywhere in the name.

use regex::Regex;

use crate::diagnostics::{DiagnosticKind, Result, fail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMode {
    Glob,
    Regex,
}

#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    pub fn glob(pattern: &str) -> Result<Self> {
        Self::compile(pattern, &glob_to_regex(pattern))
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        Self::compile(pattern, pattern)
    }

    pub fn new(pattern: &str, mode: PatternMode) -> Result<Self> {
        match mode {
            PatternMode::Glob => Self::glob(pattern),
            PatternMode::Regex => Self::regex(pattern),
        }
    }

    fn compile(source: &str, regex: &str) -> Result<Self> {
        match Regex::new(regex) {
            Ok(regex) => Ok(Self {
                source: source.to_string(),
                regex,
            }),
            Err(err) => fail(
                DiagnosticKind::Pattern,
                format!("invalid pattern `{source}`: {err}"),
            ),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Patterns supplied to a single clear request. Empty patterns are dropped;
/// they never match anything.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<NamePattern>,
}

impl PatternSet {
    pub fn compile<S: AsRef<str>>(patterns: &[S], mode: PatternMode) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.is_empty() {
                continue;
            }
            compiled.push(NamePattern::new(pattern, mode)?);
        }
        Ok(Self { patterns: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamePattern> {
        self.patterns.iter()
    }

    pub fn matches_any(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(name))
    }
}

pub fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut idx = 0;
    while idx < chars.len() {
        match chars[idx] {
            '?' => out.push('.'),
            '*' => out.push_str(".*"),
            '[' => match bracket_class(&chars[idx + 1..]) {
                Some((class, consumed)) => {
                    out.push_str(&class);
                    idx += consumed;
                }
                None => out.push_str(r"\["),
            },
            ch => out.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
        idx += 1;
    }
    out.push('$');
    out
}

// Returns the regex class and how many chars after the `[` it used, or None
// when the bracket is never closed.
fn bracket_class(rest: &[char]) -> Option<(String, usize)> {
    let mut class = String::from("[");
    let mut idx = 0;
    if matches!(rest.first(), Some('!') | Some('^')) {
        class.push('^');
        idx += 1;
    }
    let body_start = idx;
    loop {
        let ch = *rest.get(idx)?;
        if ch == ']' && idx > body_start {
            break;
        }
        match ch {
            '-' if idx > body_start && rest.get(idx + 1).is_some_and(|next| *next != ']') => {
                class.push('-')
            }
            '\\' | '[' | ']' | '-' | '&' | '~' | '^' => {
                class.push('\\');
                class.push(ch);
            }
            _ => class.push(ch),
        }
        idx += 1;
    }
    class.push(']');
    Some((class, idx + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(pattern: &str) -> NamePattern {
        NamePattern::glob(pattern).expect("valid glob")
    }

    #[test]
    fn star_and_question_mark() {
        assert!(glob("b*").matches("bar"));
        assert!(glob("b*").matches("b"));
        assert!(!glob("b*").matches("foo"));
        assert!(glob("b?z").matches("baz"));
        assert!(!glob("b?z").matches("bz"));
        assert!(glob("b*r").matches("bar"));
        assert!(!glob("b*r").matches("baz"));
    }

    #[test]
    fn glob_is_anchored() {
        assert!(!glob("ar").matches("bar"));
        assert!(glob("bar").matches("bar"));
    }

    #[test]
    fn bracket_classes_and_negation() {
        assert!(glob("[bf]oo").matches("foo"));
        assert!(glob("x[0-9]").matches("x7"));
        assert!(!glob("x[0-9]").matches("xa"));
        assert!(glob("x[!0-9]").matches("xa"));
        assert!(glob("x[^0-9]").matches("xa"));
        assert!(!glob("x[^0-9]").matches("x1"));
    }

    #[test]
    fn regex_metacharacters_are_literal_in_globs() {
        assert!(glob("a.b").matches("a.b"));
        assert!(!glob("a.b").matches("axb"));
        assert!(glob("x[").matches("x["));
    }

    #[test]
    fn regex_mode_searches_unanchored() {
        let pattern = NamePattern::regex("^tmp_\\d+").expect("valid regex");
        assert!(pattern.matches("tmp_12"));
        assert!(!pattern.matches("my_tmp_12"));
        assert!(NamePattern::regex("ar").expect("valid regex").matches("bar"));
    }

    #[test]
    fn empty_patterns_are_ignored() {
        let set = PatternSet::compile(&["", "a*"], PatternMode::Glob).expect("valid set");
        assert!(set.matches_any("abc"));
        assert!(!set.matches_any(""));
    }

    #[test]
    fn invalid_regex_is_a_pattern_error() {
        let err = NamePattern::regex("(").unwrap_err();
        assert_eq!(err.kind(), Some(DiagnosticKind::Pattern));
    }
}
