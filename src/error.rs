// ABOUTME: Error hierarchy for the tokenizer, parser, evaluator and host-interop boundary

use crate::value::Value;
use thiserror::Error;

/// Position of a single character in source text, used by tokenizer and
/// parser diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
    pub offset: usize,
}

#[derive(Error, Debug, Clone)]
pub enum TokenizerError {
    #[error("unterminated string starting at line {line}, column {col}")]
    UnterminatedString { line: usize, col: usize },

    #[error("malformed number \"{lexeme}\" at line {line}, column {col}")]
    MalformedNumber {
        lexeme: String,
        line: usize,
        col: usize,
    },
}

#[derive(Error, Debug, Clone)]
pub enum ParserError {
    #[error("unmatched '{delimiter}' starting at line {line}, column {col}")]
    UnmatchedDelimiter {
        delimiter: char,
        line: usize,
        col: usize,
    },

    #[error("unexpected end of input, expected a form")]
    UnexpectedEof,

    #[error("map literal must have an even number of forms, got {count} at line {line}, column {col}")]
    OddLengthMap { count: usize, line: usize, col: usize },

    #[error("unknown ns clause {clause}, supported: :require")]
    UnknownNsClause { clause: String },
}

#[derive(Error, Debug, Clone)]
pub enum ConversionError {
    #[error("cannot convert {value_kind} to a host value: {reason}")]
    ToHost { value_kind: String, reason: String },

    #[error("cannot convert host value to a Value: {reason}")]
    FromHost { reason: String },

    #[error("macros cannot cross the host interop boundary")]
    MacroNotConvertible,
}

/// All runtime evaluation failures, plus the non-error `recur` unwind
/// signal caught internally by the evaluator (see eval.rs). `Recur` must
/// never escape to user-visible error reporting.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error("{function}: expected {expected}, got {actual} at argument {position}")]
    TypeMismatch {
        function: String,
        expected: String,
        actual: String,
        position: usize,
    },

    #[error("{function}: expected {expected} argument{}, got {actual}", if *.expected == "1" { "" } else { "s" })]
    ArityError {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("{function}: {message}")]
    RuntimeError { function: String, message: String },

    #[error("Symbol {0} not found")]
    UndefinedSymbol(String),

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("recur called outside of loop or fn")]
    Recur(Vec<Value>),
}

impl EvalError {
    pub fn type_error(function: &str, expected: &str, actual: &Value, position: usize) -> Self {
        EvalError::TypeMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
            position,
        }
    }

    pub fn arity_error(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        EvalError::ArityError {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn runtime_error(function: &str, message: impl Into<String>) -> Self {
        EvalError::RuntimeError {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// The single error hierarchy exposed at the pipeline's public seams:
/// tokenizing, parsing, evaluating and (optionally) host interop.
#[derive(Error, Debug, Clone)]
pub enum LispError {
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Evaluation(#[from] EvalError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_error_pluralizes() {
        let one = EvalError::arity_error("f", "1", 2);
        assert_eq!(format!("{}", one), "f: expected 1 argument, got 2");

        let many = EvalError::arity_error("f", "2", 1);
        assert_eq!(format!("{}", many), "f: expected 2 arguments, got 1");
    }

    #[test]
    fn type_error_names_the_offending_argument() {
        let err = EvalError::type_error(">", "number", &Value::String("x".into()), 1);
        assert_eq!(format!("{}", err), ">: expected number, got string at argument 1");
    }

    #[test]
    fn lisp_error_composes_from_each_kind() {
        let e: LispError = TokenizerError::UnterminatedString { line: 1, col: 2 }.into();
        assert!(matches!(e, LispError::Tokenizer(_)));
    }
}
