//! Error types for the analysis engine.
//!
//! Two failure families cross the crate boundary:
//!
//! - [`ParseError`]: the upstream parser rejected a statement. Surfaced
//!   per statement; a batch with one bad statement still returns a result
//!   for every statement, one of which carries the error.
//! - [`ValidationError`]: pre-flight limits (input size, statement count)
//!   checked before any parsing happens.
//!
//! Everything else degrades in place: advisory passes (hints, column
//! lineage) omit their artifact on failure, and unrecognized AST shapes
//! become placeholder nodes. No panic escapes this crate.

use crate::types::Dialect;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A statement could not be turned into an AST.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Human-readable message from the upstream parser.
    pub message: String,
    /// Line/column of the failure when the parser reported one.
    pub position: Option<Position>,
    /// Dialect in effect when parsing failed.
    pub dialect: Option<Dialect>,
    /// Coarse classification for programmatic handling.
    pub kind: ParseErrorKind,
}

/// 1-indexed line/column position inside the offending statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Category of parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrorKind {
    #[default]
    SyntaxError,
    /// A required clause or keyword was missing.
    MissingClause,
    /// Input ended mid-statement.
    UnexpectedEof,
    /// Syntax the selected dialect does not support.
    UnsupportedFeature,
    /// Tokenization failed before parsing started.
    LexerError,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            dialect: None,
            kind: ParseErrorKind::SyntaxError,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_kind(mut self, kind: ParseErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Pulls "Line: X, Column: Y" out of a sqlparser message.
    ///
    /// Coupled to the `sqlparser` crate's message format; returns `None`
    /// when the pattern is absent rather than guessing.
    fn position_from_message(message: &str) -> Option<Position> {
        static POSITION_RE: OnceLock<Regex> = OnceLock::new();
        let re = POSITION_RE.get_or_init(|| {
            Regex::new(r"Line:\s*(\d+)\s*,\s*Column:\s*(\d+)").expect("valid position regex")
        });

        re.captures(message).and_then(|caps| {
            let line = caps.get(1)?.as_str().parse().ok()?;
            let column = caps.get(2)?.as_str().parse().ok()?;
            Some(Position { line, column })
        })
    }

    fn kind_from_message(message: &str) -> ParseErrorKind {
        let lower = message.to_lowercase();
        if lower.contains("unexpected end") || lower.contains("eof") {
            ParseErrorKind::UnexpectedEof
        } else if lower.contains("expected") {
            ParseErrorKind::MissingClause
        } else if lower.contains("not supported") || lower.contains("unsupported") {
            ParseErrorKind::UnsupportedFeature
        } else if lower.contains("tokenize") || lower.contains("token") {
            ParseErrorKind::LexerError
        } else {
            ParseErrorKind::SyntaxError
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error")?;
        if let Some(dialect) = self.dialect {
            write!(f, " ({dialect:?})")?;
        }
        if let Some(pos) = self.position {
            write!(f, " at line {}, column {}", pos.line, pos.column)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        let message = err.to_string();
        let position = Self::position_from_message(&message);
        let kind = Self::kind_from_message(&message);
        Self {
            message,
            position,
            dialect: None,
            kind,
        }
    }
}

/// Pre-flight limit violation, checked before parsing.
///
/// Thresholds come from [`crate::types::AnalyzeOptions`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("input is {actual} bytes, exceeding the {limit}-byte limit")]
    SizeLimit { actual: usize, limit: usize },
    #[error("input contains {actual} statements, exceeding the limit of {limit}")]
    QueryCountLimit { actual: usize, limit: usize },
}
