use thiserror::Error;

use crate::token::{Span, Token};
use crate::value::Value;

#[derive(Debug, Error)]
pub enum LoxError {
    #[error("Error reading script: {0}")]
    Io(#[from] std::io::Error),

    #[error("[line {line}] Error: {message}")]
    Scan {
        message: String,
        line: usize,
        span: Span,
    },

    #[error("[line {line}] Error: {message}")]
    Parse {
        message: String,
        line: usize,
        span: Span,
    },

    #[error("[line {line}] Error: {message}")]
    Resolution {
        message: String,
        line: usize,
        span: Span,
    },

    #[error("{message}\n[line {line}]")]
    Runtime {
        message: String,
        line: usize,
        span: Span,
        /// Names of the callables the error propagated through, innermost
        /// first. Filled in as the error unwinds out of function calls.
        stack: Vec<String>,
    },

    // Control-flow signals used internally by the interpreter. They never
    // reach users: `Break` is consumed by the enclosing loop and `Return`
    // by the enclosing call frame.
    #[error("")]
    Break,

    #[error("")]
    Return(Value),

    #[error("")]
    ScriptFailed, // script errors were already reported, just signal failure
}

impl LoxError {
    pub fn scan(message: impl Into<String>, line: usize, span: Span) -> Self {
        LoxError::Scan {
            message: message.into(),
            line,
            span,
        }
    }

    pub fn parse(message: impl Into<String>, token: &Token) -> Self {
        LoxError::Parse {
            message: message.into(),
            line: token.line,
            span: token.span.clone(),
        }
    }

    pub fn resolution(message: impl Into<String>, token: &Token) -> Self {
        LoxError::Resolution {
            message: message.into(),
            line: token.line,
            span: token.span.clone(),
        }
    }

    pub fn runtime(message: impl Into<String>, token: &Token) -> Self {
        LoxError::Runtime {
            message: message.into(),
            line: token.line,
            span: token.span.clone(),
            stack: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn token(lexeme: &str, line: usize) -> Token {
        Token {
            token_type: TokenType::Identifier,
            lexeme: lexeme.to_string(),
            literal: None,
            line,
            span: 0..lexeme.len(),
        }
    }

    #[test]
    fn io_error_converts_to_lox_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LoxError = io_err.into();
        assert!(matches!(err, LoxError::Io(_)));
    }

    #[test]
    fn scan_error_displays_line() {
        let err = LoxError::scan("Unexpected character: $", 3, 10..11);
        assert_eq!(err.to_string(), "[line 3] Error: Unexpected character: $");
    }

    #[test]
    fn parse_error_takes_position_from_token() {
        let err = LoxError::parse("Expect ';' after value.", &token("x", 7));
        assert_eq!(err.to_string(), "[line 7] Error: Expect ';' after value.");
    }

    #[test]
    fn runtime_error_displays_message_then_line() {
        let err = LoxError::runtime("Operand must be a number.", &token("-", 2));
        assert_eq!(err.to_string(), "Operand must be a number.\n[line 2]");
    }

    #[test]
    fn runtime_error_starts_with_empty_stack() {
        match LoxError::runtime("boom", &token("x", 1)) {
            LoxError::Runtime { stack, .. } => assert!(stack.is_empty()),
            _ => panic!("expected runtime error"),
        }
    }

    #[test]
    fn control_flow_variants_display_nothing() {
        assert_eq!(LoxError::Break.to_string(), "");
        assert_eq!(LoxError::ScriptFailed.to_string(), "");
    }
}
