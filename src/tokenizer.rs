// ABOUTME: Converts source text into a flat, position-tagged token stream

use crate::error::{Position, TokenizerError};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    String(String),
    Number(f64),
    Keyword(String),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Position,
    pub end: Position,
}

struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    _source: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Scanner {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            _source: source,
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == ',' => {
                    self.advance();
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        self.advance();
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '\'' | '`' | '~' | '"' | ';')
        || c.is_whitespace()
        || c == ','
}

fn looks_like_number(lexeme: &str) -> bool {
    let bytes = lexeme.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    let start = if bytes[0] == b'-' || bytes[0] == b'+' { 1 } else { 0 };
    start < bytes.len() && bytes[start].is_ascii_digit()
}

fn parse_number(lexeme: &str, start: Position, end: Position) -> Result<f64, TokenizerError> {
    let bad = || TokenizerError::MalformedNumber {
        lexeme: lexeme.to_string(),
        line: start.line,
        col: start.col,
    };
    let _ = end;
    if lexeme.matches('.').count() > 1 {
        return Err(bad());
    }
    if lexeme.ends_with('.') {
        return Err(bad());
    }
    lexeme.parse::<f64>().map_err(|_| bad())
}

/// Scans `source` into a flat token stream, dropping whitespace and comments.
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenizerError> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();

    loop {
        scanner.skip_whitespace_and_comments();
        let start = scanner.position();
        let Some(c) = scanner.peek() else { break };

        let kind = match c {
            '(' => {
                scanner.advance();
                TokenKind::LParen
            }
            ')' => {
                scanner.advance();
                TokenKind::RParen
            }
            '[' => {
                scanner.advance();
                TokenKind::LBracket
            }
            ']' => {
                scanner.advance();
                TokenKind::RBracket
            }
            '{' => {
                scanner.advance();
                TokenKind::LBrace
            }
            '}' => {
                scanner.advance();
                TokenKind::RBrace
            }
            '\'' => {
                scanner.advance();
                TokenKind::Quote
            }
            '`' => {
                scanner.advance();
                TokenKind::Quasiquote
            }
            '~' => {
                scanner.advance();
                if scanner.peek() == Some('@') {
                    scanner.advance();
                    TokenKind::UnquoteSplicing
                } else {
                    TokenKind::Unquote
                }
            }
            '"' => {
                scanner.advance();
                let mut s = String::new();
                loop {
                    match scanner.peek() {
                        None => {
                            return Err(TokenizerError::UnterminatedString {
                                line: start.line,
                                col: start.col,
                            })
                        }
                        Some('"') => {
                            scanner.advance();
                            break;
                        }
                        Some('\\') => {
                            scanner.advance();
                            match scanner.advance() {
                                Some('n') => s.push('\n'),
                                Some('r') => s.push('\r'),
                                Some('t') => s.push('\t'),
                                Some('"') => s.push('"'),
                                Some('\\') => s.push('\\'),
                                Some(other) => s.push(other),
                                None => {
                                    return Err(TokenizerError::UnterminatedString {
                                        line: start.line,
                                        col: start.col,
                                    })
                                }
                            }
                        }
                        Some(c) => {
                            scanner.advance();
                            s.push(c);
                        }
                    }
                }
                TokenKind::String(s)
            }
            ':' => {
                let mut lexeme = String::new();
                while let Some(c) = scanner.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    lexeme.push(c);
                    scanner.advance();
                }
                TokenKind::Keyword(lexeme)
            }
            _ => {
                let mut lexeme = String::new();
                if c == '-' || c == '+' {
                    if let Some(next) = scanner.peek_at(1) {
                        if !next.is_ascii_digit() {
                            scanner.advance();
                            lexeme.push(c);
                            while let Some(c) = scanner.peek() {
                                if is_delimiter(c) {
                                    break;
                                }
                                lexeme.push(c);
                                scanner.advance();
                            }
                            let end = scanner.position();
                            tokens.push(Token {
                                kind: TokenKind::Symbol(lexeme),
                                start,
                                end,
                            });
                            continue;
                        }
                    }
                }
                while let Some(c) = scanner.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    lexeme.push(c);
                    scanner.advance();
                }
                let end = scanner.position();
                if looks_like_number(&lexeme) {
                    let n = parse_number(&lexeme, start, end)?;
                    tokens.push(Token {
                        kind: TokenKind::Number(n),
                        start,
                        end,
                    });
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Symbol(lexeme),
                        start,
                        end,
                    });
                }
                continue;
            }
        };

        let end = scanner.position();
        tokens.push(Token { kind, start, end });
    }

    Ok(tokens)
}
