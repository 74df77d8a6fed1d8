// SPDX-License-Identifier: MIT

//! Typed error handling for checklist-gate
//!
//! The condition core never returns these to `Gate` callers: compile and
//! evaluation failures are logged and collapse to a boolean default. They
//! surface through the lower-level APIs, the loaders and the binary.

use thiserror::Error;

/// Top-level error type for checklist-gate
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration errors (invalid env vars, invalid config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Checklist content could not be interpreted
    #[error("Content error: {0}")]
    Content(String),

    /// Progress import was rejected
    #[error("Import failed: {0}")]
    Import(String),

    /// Expression failed to compile
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Errors raised while turning expression text into a predicate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Input was empty or whitespace only
    #[error("expression is empty")]
    EmptyInput,

    /// Input exceeded the size limit
    #[error("expression exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    InputTooLarge { max_bytes: usize, actual_bytes: usize },

    /// A character outside the expression vocabulary
    #[error("unexpected character `{found}` at {position}")]
    UnexpectedChar { found: char, position: usize },

    /// A quote with no matching closing quote
    #[error("unterminated string literal at {position}")]
    UnterminatedString { position: usize },

    /// Numeric literal failed to parse
    #[error("invalid number `{raw}` at {position}")]
    InvalidNumber { raw: String, position: usize },

    /// Parser saw a token it could not use
    #[error("unexpected {found} at {position}, expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },

    /// Parentheses, lists or unary operators nested too deeply
    #[error("expression nesting exceeds limit: depth {depth} (max {max_depth}) at {position}")]
    NestingTooDeep {
        max_depth: usize,
        depth: usize,
        position: usize,
    },

    /// Tokens left over after a complete expression
    #[error("unexpected trailing input at {position}")]
    TrailingInput { position: usize },
}

/// Errors raised while evaluating a compiled expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Expression references a field the values record does not carry
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Operator applied to an operand it cannot handle
    #[error("type error: {0}")]
    Type(String),
}

impl GateError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a content error
    pub fn content(message: impl Into<String>) -> Self {
        Self::Content(message.into())
    }

    /// Create an import error
    pub fn import(message: impl Into<String>) -> Self {
        Self::Import(message.into())
    }
}

impl From<String> for GateError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for GateError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}
