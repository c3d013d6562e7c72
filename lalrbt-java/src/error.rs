//! # Java Parser Error Type
//!
//! [`JavaError`] is the single error surface of the Java layer. It aggregates
//! failures from:
//!
//! - **Lexing** (source text that is not a Java token),
//! - **Configuration** (a generated table that does not validate),
//! - **Parsing** (cancellation, table inconsistencies, failing semantics).
//!
//! Syntax errors are not among them: a rejected parse is a value carrying a
//! diagnostic. Conversions are derived with `#[from]`, so `?` works at every
//! call site returning `Result<T, JavaError>`.
use lalrbt::{ConfigError, LexError, ParseError};
use smartstring::alias::String;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JavaError {
    /// The source contains a character sequence that is not a token.
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    /// The parse table or the lexer mapping is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The parse was cancelled or the engine malfunctioned.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// No entry point has this name.
    #[error("unknown entry point {0:?}")]
    UnknownEntry(String),
}
