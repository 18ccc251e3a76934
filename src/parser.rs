// ABOUTME: Consumes a token stream and builds the value tree (forms) to evaluate

use crate::error::ParserError;
use crate::tokenizer::{Token, TokenKind};
use crate::value::Value;

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn new(tokens: Vec<Token>) -> Self {
        TokenStream { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Parses a token stream into the sequence of top-level forms it contains.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Value>, ParserError> {
    let mut stream = TokenStream::new(tokens);
    let mut forms = Vec::new();
    while !stream.at_end() {
        forms.push(parse_form(&mut stream)?);
    }
    Ok(forms)
}

fn parse_form(stream: &mut TokenStream) -> Result<Value, ParserError> {
    let token = stream.peek().cloned().ok_or(ParserError::UnexpectedEof)?;

    match &token.kind {
        TokenKind::LParen => parse_seq(stream, TokenKind::RParen).map(Value::List),
        TokenKind::LBracket => parse_seq(stream, TokenKind::RBracket).map(Value::Vector),
        TokenKind::LBrace => parse_map(stream),
        TokenKind::RParen => Err(ParserError::UnmatchedDelimiter {
            delimiter: ')',
            line: token.start.line,
            col: token.start.col,
        }),
        TokenKind::RBracket => Err(ParserError::UnmatchedDelimiter {
            delimiter: ']',
            line: token.start.line,
            col: token.start.col,
        }),
        TokenKind::RBrace => Err(ParserError::UnmatchedDelimiter {
            delimiter: '}',
            line: token.start.line,
            col: token.start.col,
        }),
        TokenKind::Quote => parse_reader_macro(stream, "quote"),
        TokenKind::Quasiquote => parse_reader_macro(stream, "quasiquote"),
        TokenKind::Unquote => parse_reader_macro(stream, "unquote"),
        TokenKind::UnquoteSplicing => parse_reader_macro(stream, "unquote-splicing"),
        TokenKind::String(s) => {
            let s = s.clone();
            stream.advance();
            Ok(Value::String(s))
        }
        TokenKind::Number(n) => {
            let n = *n;
            stream.advance();
            Ok(Value::Number(n))
        }
        TokenKind::Keyword(k) => {
            let k = k.clone();
            stream.advance();
            Ok(Value::Keyword(k))
        }
        TokenKind::Symbol(s) => {
            let s = s.clone();
            stream.advance();
            Ok(match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "nil" => Value::Nil,
                _ => Value::Symbol(s),
            })
        }
    }
}

fn parse_reader_macro(stream: &mut TokenStream, wrapper: &str) -> Result<Value, ParserError> {
    let start = stream.advance().expect("caller verified token exists").start;
    if stream.peek().is_none() {
        return Err(ParserError::UnmatchedDelimiter {
            delimiter: '(',
            line: start.line,
            col: start.col,
        });
    }
    let inner = parse_form(stream)?;
    Ok(Value::List(vec![Value::Symbol(wrapper.to_string()), inner]))
}

fn opening_char_for(closing: &TokenKind) -> char {
    match closing {
        TokenKind::RParen => '(',
        TokenKind::RBracket => '[',
        TokenKind::RBrace => '{',
        _ => unreachable!("only called with a closing delimiter kind"),
    }
}

fn is_unexpected_close(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace)
}

fn parse_seq(stream: &mut TokenStream, closing: TokenKind) -> Result<Vec<Value>, ParserError> {
    let opening = stream.advance().expect("caller verified token exists");
    let open_line = opening.start.line;
    let open_col = opening.start.col;

    let mut items = Vec::new();
    loop {
        match stream.peek() {
            None => {
                return Err(ParserError::UnmatchedDelimiter {
                    delimiter: opening_char_for(&closing),
                    line: open_line,
                    col: open_col,
                })
            }
            Some(t) if t.kind == closing => {
                stream.advance();
                return Ok(items);
            }
            Some(t) if is_unexpected_close(&t.kind) => {
                return Err(ParserError::UnmatchedDelimiter {
                    delimiter: opening_char_for(&closing),
                    line: open_line,
                    col: open_col,
                });
            }
            _ => items.push(parse_form(stream)?),
        }
    }
}

fn parse_map(stream: &mut TokenStream) -> Result<Value, ParserError> {
    let opening = stream.advance().expect("caller verified token exists");
    let open_line = opening.start.line;
    let open_col = opening.start.col;

    let mut items = Vec::new();
    loop {
        match stream.peek() {
            None => {
                return Err(ParserError::UnmatchedDelimiter {
                    delimiter: '{',
                    line: open_line,
                    col: open_col,
                })
            }
            Some(t) if t.kind == TokenKind::RBrace => {
                stream.advance();
                break;
            }
            _ => items.push(parse_form(stream)?),
        }
    }

    if items.len() % 2 != 0 {
        return Err(ParserError::OddLengthMap {
            count: items.len(),
            line: open_line,
            col: open_col,
        });
    }

    let mut entries = Vec::with_capacity(items.len() / 2);
    let mut it = items.into_iter();
    while let (Some(k), Some(v)) = (it.next(), it.next()) {
        entries.push((k, v));
    }
    Ok(Value::Map(entries))
}

/// Tokenizes and parses `source` in one call, the common entry point for
/// evaluating a whole string of Lisp source.
pub fn parse_source(source: &str) -> Result<Vec<Value>, crate::error::LispError> {
    let tokens = crate::tokenizer::tokenize(source)?;
    Ok(parse(tokens)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse_str(src: &str) -> Vec<Value> {
        parse(tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn atoms() {
        let forms = parse_str("1 \"s\" true false nil :kw sym");
        assert!(matches!(forms[0], Value::Number(n) if n == 1.0));
        assert!(matches!(&forms[1], Value::String(s) if s == "s"));
        assert!(matches!(forms[2], Value::Bool(true)));
        assert!(matches!(forms[3], Value::Bool(false)));
        assert!(matches!(forms[4], Value::Nil));
        assert!(matches!(&forms[5], Value::Keyword(k) if k == ":kw"));
        assert!(matches!(&forms[6], Value::Symbol(s) if s == "sym"));
    }

    #[test]
    fn nested_list() {
        let forms = parse_str("(+ 1 (* 2 3))");
        match &forms[0] {
            Value::List(items) => {
                assert_eq!(items.len(), 3);
                assert!(matches!(&items[2], Value::List(inner) if inner.len() == 3));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn vector_and_map() {
        let forms = parse_str("[1 2 3] {:a 1 :b 2}");
        assert!(matches!(&forms[0], Value::Vector(v) if v.len() == 3));
        match &forms[1] {
            Value::Map(entries) => assert_eq!(entries.len(), 2),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn odd_length_map_is_an_error() {
        let tokens = tokenize("{:a 1 :b}").unwrap();
        assert!(matches!(parse(tokens), Err(ParserError::OddLengthMap { .. })));
    }

    #[test]
    fn unmatched_delimiters() {
        assert!(matches!(
            parse(tokenize("(+ 1 2").unwrap()),
            Err(ParserError::UnmatchedDelimiter { delimiter: '(', .. })
        ));
        assert!(matches!(
            parse(tokenize("+ 1 2)").unwrap()),
            Err(ParserError::UnmatchedDelimiter { delimiter: '(', .. })
        ));
    }

    #[test]
    fn reader_macros_expand_to_lists() {
        let forms = parse_str("'x `(a ~b ~@c)");
        assert_eq!(
            forms[0],
            Value::List(vec![Value::Symbol("quote".into()), Value::Symbol("x".into())])
        );
        match &forms[1] {
            Value::List(outer) => {
                assert_eq!(outer[0], Value::Symbol("quasiquote".into()));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }
}
