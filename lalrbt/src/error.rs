//! Source-location and error types shared by the runtime.
//!
//! Two channels are kept apart here. [`ConfigError`] covers problems found
//! while wiring a lexer and a parse table together; they are detected once,
//! at construction, and there is no recovery from them. [`ParseError`] covers
//! engine malfunctions during a parse (cancellation, an inconsistent table,
//! a failing semantic action). A syntax error in the input is neither: it is
//! an ordinary [`ParseOutcome::Rejected`](crate::ParseOutcome) value.
//!
//! [`LexError`] is what a [`Lexer`](crate::Lexer) reports for input it cannot
//! scan. It carries a message and an optional [`Span`].
//!
//! # Examples
//!
//! ```rust
//! # use lalrbt::{LexError, Position, Span, span};
//! let sp = Span::new(Position::new(3, 5), Position::new(3, 10));
//! assert!(!sp.is_empty());
//! assert_eq!(sp.line_range(), (3, 3));
//!
//! let err = LexError::new("unterminated string literal", Some(sp));
//! assert!(err.to_string().contains("unterminated string literal"));
//!
//! let sp_opt = span!(1, 1, 1, 5);
//! assert!(sp_opt.is_some());
//! ```

use smartstring::alias::String;
use std::fmt;
use thiserror::Error;

/// A 1-based line/column position in source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number (character position in the line).
    pub column: usize,
}

impl Position {
    /// Creates a new `Position`.
    #[inline]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open source range: `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Starting position (inclusive).
    pub start: Position,
    /// Ending position (exclusive).
    pub end: Position,
}

impl Span {
    /// Creates a new `Span`.
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Merge two spans into one that covers both.
    #[inline]
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns `true` if the span is empty (same start and end position).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the inclusive line range spanned by this `Span`.
    #[inline]
    pub fn line_range(&self) -> (usize, usize) {
        (self.start.line, self.end.line)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Build an `Option<Span>` inline from 1-based line/column coordinates.
///
/// ```rust
/// # use lalrbt::span;
/// let s = span!(1, 1, 1, 5);
/// assert!(s.is_some());
/// ```
#[macro_export]
macro_rules! span {
    ($line_start:expr, $col_start:expr, $line_end:expr, $col_end:expr) => {
        Some($crate::Span {
            start: $crate::Position { line: $line_start, column: $col_start },
            end:   $crate::Position { line: $line_end,   column: $col_end   },
        })
    };
}

/// A lexer failure: input the scanner has no rule for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .span.map(|s| format!(" at {s}")).unwrap_or_default())]
pub struct LexError {
    /// Human-readable message.
    pub message: String,
    /// Optional source span for pinpointing the error.
    pub span: Option<Span>,
}

impl LexError {
    pub fn new(message: impl AsRef<str>, span: Option<Span>) -> Self {
        Self {
            message: message.as_ref().into(),
            span,
        }
    }
}

/// Fatal wiring errors, detected once when a table, lexer and session are put
/// together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The lexer has no token kind named like the grammar's end-of-file symbol.
    #[error("lexer cannot produce the end-of-file symbol `{0}`")]
    UndefinedEofSymbol(String),

    /// The table was generated with its conflicts resolved statically, so the
    /// backtracking engine has no alternatives to explore.
    #[error("parse table is not backtrack capable")]
    NotBacktrackCapable,

    /// The table data is internally inconsistent.
    #[error("malformed parse table: {0}")]
    MalformedTable(String),

    /// The requested entry point is not a declared entry marker.
    #[error("`{0}` is not a declared entry point")]
    UnknownEntry(String),

    /// The token stream has not been remapped onto the table's terminals.
    #[error("token stream is not mapped onto the grammar terminals")]
    Unmapped,
}

/// Engine malfunctions raised while a parse is running.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The caller's [`Monitor`](crate::Monitor) asked the engine to stop.
    #[error("parse cancelled")]
    Cancelled,

    /// The table disagrees with itself at run time (a missing goto, a goto in
    /// a terminal column, and the like).
    #[error("inconsistent parse table: {0}")]
    Table(String),

    /// Wiring problem surfaced at parse time.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A semantic action failed.
    #[error(transparent)]
    Semantic(#[from] anyhow::Error),
}
