use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceSpan};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare command-syntax word: names, options, glob patterns, numbers.
    Word,
    /// Quoted text; the lexeme holds the unquoted contents.
    String,
    Assign,
    Separator,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = if let Some((idx, ch)) = self.peeked.take() {
            Some((idx, ch))
        } else {
            self.chars.next()
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            Some((idx, ch))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn skip_blanks(&mut self) {
        while let Some((_, ch)) = self.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some((_, ch)) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn word(&mut self, start: usize) -> Token {
        let mut end = self.current;
        while let Some((idx, ch)) = self.peek() {
            if ch.is_whitespace() || ch == ';' || ch == '=' {
                break;
            }
            self.bump();
            end = idx + ch.len_utf8();
        }
        Token {
            kind: TokenKind::Word,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan { start, end },
        }
    }

    // Single quotes escape themselves by doubling; double quotes use
    // backslash escapes.
    fn string_literal(&mut self, start: usize, quote: char) -> Result<Token, Diagnostic> {
        let mut end = self.current;
        let mut value = String::new();
        while let Some((idx, ch)) = self.bump() {
            end = idx + ch.len_utf8();
            match ch {
                '\'' if quote == '\'' => {
                    if let Some((_, '\'')) = self.peek() {
                        self.bump();
                        value.push('\'');
                        continue;
                    }
                    return Ok(self.string_token(value, start, end));
                }
                '"' if quote == '"' => return Ok(self.string_token(value, start, end)),
                '\\' if quote == '"' => {
                    if let Some((_, esc)) = self.bump() {
                        match esc {
                            'n' => value.push('\n'),
                            't' => value.push('\t'),
                            other => value.push(other),
                        }
                    } else {
                        break;
                    }
                }
                '\n' => break,
                _ => value.push(ch),
            }
        }
        Err(
            Diagnostic::new(DiagnosticKind::Command, "unterminated string literal")
                .with_span(SourceSpan { start, end }),
        )
    }

    fn string_token(&self, value: String, start: usize, end: usize) -> Token {
        Token {
            kind: TokenKind::String,
            lexeme: value,
            span: SourceSpan { start, end },
        }
    }

    fn simple_token(&self, start: usize, kind: TokenKind) -> Token {
        let end = self.current;
        Token {
            kind,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan { start, end },
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            self.skip_blanks();
            let (start, ch) = match self.bump() {
                Some(pair) => pair,
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        lexeme: String::new(),
                        span: SourceSpan {
                            start: self.current,
                            end: self.current,
                        },
                    });
                    break;
                }
            };
            let token = match ch {
                '%' | '#' => {
                    self.skip_comment();
                    continue;
                }
                ';' | '\n' => self.simple_token(start, TokenKind::Separator),
                '=' => self.simple_token(start, TokenKind::Assign),
                '\'' | '"' => self.string_literal(start, ch)?,
                _ => self.word(start),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Splits tokens into statements at separators, dropping empty statements
/// and the trailing end marker.
pub fn statements(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut statements = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        match token.kind {
            TokenKind::Separator | TokenKind::Eof => {
                if !current.is_empty() {
                    statements.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(token),
        }
    }
    statements
}
