//! Token stream.
//!
//! A [`TokenStream`] drains a [`Lexer`] up front and keeps the result as an
//! indexed, random-access sequence. Comments and whitespace the lexer reports
//! as [`Lexeme::Adjunct`] are kept beside the tokens and attached to the
//! token that follows them. The engines never see lexer kinds directly: a
//! [`TerminalMap`] translates each lexer kind, by name, into the terminal id
//! of a particular grammar.
//!
//! The cursor ([`TokenStream::reset`], [`TokenStream::next_token`]) only
//! serves callers that want to walk the stream; the engines address tokens
//! by index.

use crate::{ConfigError, LexError, ParseTable, Position, Span, SymbolId};
use smartstring::alias::String;
use std::ops::Range;
use std::sync::Arc;

/// One item produced by a [`Lexer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lexeme {
    /// A grammar token.
    Token { kind: u16, start: usize, end: usize },
    /// Trivia: a comment or a run of whitespace.
    Adjunct { kind: u16, start: usize, end: usize },
}

/// A scanner feeding a [`TokenStream`].
///
/// Kinds are indices into [`Lexer::kind_names`]. The last token should be the
/// end-of-file token; if it is missing, [`TokenStream`] appends one at the end
/// of the source once the end-of-file kind is known.
pub trait Lexer {
    /// Names of the kinds this lexer emits, indexed by kind.
    fn kind_names() -> &'static [&'static str]
    where
        Self: Sized;

    /// The text being scanned.
    fn source(&self) -> &str;

    /// The next lexeme, or `None` once the input is exhausted.
    fn try_next(&mut self) -> Result<Option<Lexeme>, LexError>;
}

/// A token as stored in the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Lexer kind.
    pub kind: u16,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    leading: Range<usize>,
}

/// A comment or whitespace run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adjunct {
    pub kind: u16,
    pub start: usize,
    pub end: usize,
}

/// Maps lexer kinds onto the terminal ids of one grammar.
///
/// Built once per (lexer, table) pair and shared by every stream tokenized
/// with that lexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalMap {
    by_kind: Vec<Option<SymbolId>>,
    eof: SymbolId,
    eof_kind: u16,
    unproduced: Vec<String>,
}

impl TerminalMap {
    /// Matches lexer kinds to grammar terminals by name.
    ///
    /// Fails with [`ConfigError::UndefinedEofSymbol`] when no lexer kind
    /// carries the name of `eof`. Grammar terminals no lexer kind is named
    /// after are collected in [`TerminalMap::unproduced`] and logged.
    pub fn remap<'a, I>(lexer_kinds: &[&str], grammar_terminals: I, eof: SymbolId) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (SymbolId, &'a str)>,
    {
        let mut by_kind = vec![None; lexer_kinds.len()];
        let mut eof_name = None;
        let mut unproduced = Vec::new();
        for (sym, name) in grammar_terminals {
            if sym == eof {
                eof_name = Some(name);
            }
            let mut produced = false;
            for (kind, lexer_name) in lexer_kinds.iter().enumerate() {
                if *lexer_name == name {
                    by_kind[kind] = Some(sym);
                    produced = true;
                }
            }
            if !produced && sym != eof {
                log::warn!("terminal `{name}` is never produced by the lexer");
                unproduced.push(String::from(name));
            }
        }
        let Some(eof_name) = eof_name else {
            return Err(ConfigError::MalformedTable(
                format!("end-of-file symbol {eof} is not among the grammar terminals").into(),
            ));
        };
        let eof_kind = lexer_kinds
            .iter()
            .position(|n| *n == eof_name)
            .ok_or_else(|| ConfigError::UndefinedEofSymbol(eof_name.into()))?;
        Ok(Self {
            by_kind,
            eof,
            eof_kind: eof_kind as u16,
            unproduced,
        })
    }

    /// [`TerminalMap::remap`] against every terminal of `table` except the
    /// entry markers, which no lexer produces.
    pub fn for_table(lexer_kinds: &[&str], table: &ParseTable) -> Result<Self, ConfigError> {
        Self::remap(
            lexer_kinds,
            table.lexical_terminals().map(|t| (t, table.symbol_name(t))),
            table.eof(),
        )
    }

    /// The terminal for a lexer kind; `None` for kinds the grammar does not know.
    #[inline]
    pub fn terminal(&self, kind: u16) -> Option<SymbolId> {
        self.by_kind.get(kind as usize).copied().flatten()
    }

    pub fn eof(&self) -> SymbolId {
        self.eof
    }

    pub fn eof_kind(&self) -> u16 {
        self.eof_kind
    }

    /// Grammar terminals the lexer never produces.
    pub fn unproduced(&self) -> &[String] {
        &self.unproduced
    }
}

/// Lexer output held as an indexed sequence.
#[derive(Clone, Debug)]
pub struct TokenStream {
    source: std::string::String,
    kind_names: &'static [&'static str],
    tokens: Vec<Token>,
    adjuncts: Vec<Adjunct>,
    pending: usize,
    line_starts: Vec<usize>,
    terminals: Vec<Option<SymbolId>>,
    map: Option<Arc<TerminalMap>>,
    cursor: usize,
}

impl TokenStream {
    /// Drains `lexer` into a new stream.
    pub fn tokenize<L: Lexer>(mut lexer: L) -> Result<Self, LexError> {
        let mut tokens = Vec::new();
        let mut adjuncts = Vec::new();
        let mut pending = 0;
        while let Some(lexeme) = lexer.try_next()? {
            match lexeme {
                Lexeme::Token { kind, start, end } => {
                    tokens.push(Token {
                        kind,
                        start,
                        end,
                        leading: pending..adjuncts.len(),
                    });
                    pending = adjuncts.len();
                }
                Lexeme::Adjunct { kind, start, end } => adjuncts.push(Adjunct { kind, start, end }),
            }
        }
        let source = lexer.source().to_owned();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        log::debug!("tokenized {} tokens, {} adjuncts", tokens.len(), adjuncts.len());
        Ok(Self {
            source,
            kind_names: L::kind_names(),
            tokens,
            adjuncts,
            pending,
            line_starts,
            terminals: Vec::new(),
            map: None,
            cursor: 0,
        })
    }

    /// Builds a [`TerminalMap`] for `table`, applies it and returns the
    /// names of grammar terminals the lexer never produces.
    pub fn remap_terminal_symbols(&mut self, table: &ParseTable) -> Result<Vec<String>, ConfigError> {
        let map = TerminalMap::for_table(self.kind_names, table)?;
        let warnings = map.unproduced().to_vec();
        self.set_terminal_map(Arc::new(map));
        Ok(warnings)
    }

    /// Applies a map computed earlier, typically shared by many streams.
    pub fn set_terminal_map(&mut self, map: Arc<TerminalMap>) {
        let eof_kind = map.eof_kind();
        if self.tokens.last().is_none_or(|t| t.kind != eof_kind) {
            let at = self.source.len();
            self.tokens.push(Token {
                kind: eof_kind,
                start: at,
                end: at,
                leading: self.pending..self.adjuncts.len(),
            });
            self.pending = self.adjuncts.len();
        }
        self.terminals = self.tokens.iter().map(|t| map.terminal(t.kind)).collect();
        self.map = Some(map);
    }

    pub fn terminal_map(&self) -> Option<&TerminalMap> {
        self.map.as_deref()
    }

    pub fn is_mapped(&self) -> bool {
        self.map.is_some()
    }

    /// Number of tokens, the end-of-file token included once mapped.
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Moves the cursor to `index`, clamped to the last token.
    pub fn reset(&mut self, index: usize) {
        self.cursor = index.min(self.tokens.len().saturating_sub(1));
    }

    /// The cursor position.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Returns the index under the cursor and advances, stopping at the last
    /// token.
    pub fn next_token(&mut self) -> usize {
        let index = self.cursor;
        if self.cursor + 1 < self.tokens.len() {
            self.cursor += 1;
        }
        index
    }

    /// The index under the cursor.
    #[inline]
    pub fn peek(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn get_token(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    pub fn first_token(&self) -> usize {
        0
    }

    /// Index of the last token, which is the end-of-file token once mapped.
    pub fn last_token(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }

    /// The grammar terminal of token `index`, or `None` if the grammar has no
    /// terminal for its lexer kind (or the stream is not mapped yet).
    #[inline]
    pub fn kind(&self, index: usize) -> Option<SymbolId> {
        self.terminals.get(index).copied().flatten()
    }

    /// The lexer's name for the kind of token `index`.
    pub fn kind_name(&self, index: usize) -> &str {
        self.kind_names
            .get(self.tokens[index].kind as usize)
            .copied()
            .unwrap_or("?")
    }

    pub fn text(&self, index: usize) -> &str {
        let t = &self.tokens[index];
        &self.source[t.start..t.end]
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Trivia between the previous token and token `index`.
    pub fn preceding_adjuncts(&self, index: usize) -> &[Adjunct] {
        &self.adjuncts[self.tokens[index].leading.clone()]
    }

    /// Trivia between token `index` and the next token. For the last token
    /// this is whatever trivia the lexer reported after it.
    pub fn following_adjuncts(&self, index: usize) -> &[Adjunct] {
        match self.tokens.get(index + 1) {
            Some(next) => &self.adjuncts[next.leading.clone()],
            None => &self.adjuncts[self.pending..],
        }
    }

    pub fn adjunct_text(&self, adjunct: &Adjunct) -> &str {
        &self.source[adjunct.start..adjunct.end]
    }

    pub fn adjunct_kind_name(&self, adjunct: &Adjunct) -> &str {
        self.kind_names.get(adjunct.kind as usize).copied().unwrap_or("?")
    }

    /// Line and column (both 1-based, column in characters) of a byte offset.
    pub fn line_col(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&s| s <= offset).max(1);
        let start = self.line_starts[line - 1];
        let end = offset.min(self.source.len());
        let column = self.source.get(start..end).map_or(end - start, |s| s.chars().count()) + 1;
        Position::new(line, column)
    }

    /// Source span of token `index`.
    pub fn token_span(&self, index: usize) -> Span {
        let t = &self.tokens[index];
        Span::new(self.line_col(t.start), self.line_col(t.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{WordLexer, table};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const GRAMMAR: &str = "\
List -> List Item
List -> Item
Item -> a
Item -> b
Item -> c
";

    #[test]
    fn remap_attaches_terminals_and_appends_eof() {
        init_logger();
        let t = table(GRAMMAR);
        let mut stream = TokenStream::tokenize(WordLexer::without_end("a  b # note\nc")).unwrap();
        assert_eq!(stream.len(), 3);
        let warnings = stream.remap_terminal_symbols(&t).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(stream.len(), 4);
        assert_eq!(stream.kind(0), t.symbol("a"));
        assert_eq!(stream.kind(2), t.symbol("c"));
        assert_eq!(stream.kind(3), Some(t.eof()));
        assert_eq!(stream.text(1), "b");
        assert_eq!(stream.last_token(), 3);
    }

    #[test]
    fn adjuncts_attach_to_following_token() {
        let t = table(GRAMMAR);
        let mut stream = TokenStream::tokenize(WordLexer::new("a # one\nb")).unwrap();
        stream.remap_terminal_symbols(&t).unwrap();
        let before_b: Vec<_> = stream
            .preceding_adjuncts(1)
            .iter()
            .map(|a| stream.adjunct_kind_name(a))
            .collect();
        assert_eq!(before_b, ["ws", "comment", "ws"]);
        assert_eq!(stream.following_adjuncts(0).len(), 3);
        let comment = &stream.preceding_adjuncts(1)[1];
        assert_eq!(stream.adjunct_text(comment), "# one");
    }

    #[test]
    fn missing_eof_name_is_fatal() {
        let t = table(GRAMMAR);
        let err = TerminalMap::remap(&["a", "b"], t.lexical_terminals().map(|s| (s, t.symbol_name(s))), t.eof())
            .unwrap_err();
        assert_eq!(err, ConfigError::UndefinedEofSymbol("end".into()));
    }

    #[test]
    fn unproduced_terminals_are_warnings() {
        let t = table(GRAMMAR);
        let map = TerminalMap::for_table(&["end", "a", "b"], &t).unwrap();
        assert_eq!(map.unproduced().len(), 1);
        assert_eq!(map.unproduced()[0].as_str(), "c");
        assert_eq!(map.terminal(1), t.symbol("a"));
        assert_eq!(map.terminal(7), None);
    }

    #[test]
    fn cursor_reset_and_walk() {
        let t = table(GRAMMAR);
        let mut stream = TokenStream::tokenize(WordLexer::new("a b c")).unwrap();
        stream.remap_terminal_symbols(&t).unwrap();
        assert_eq!(stream.next_token(), 0);
        assert_eq!(stream.next_token(), 1);
        stream.reset(0);
        assert_eq!(stream.peek(), 0);
        stream.reset(99);
        assert_eq!(stream.position(), stream.last_token());
        assert_eq!(stream.next_token(), 3);
        assert_eq!(stream.next_token(), 3);
    }

    #[test]
    fn line_col_counts_characters() {
        let stream = TokenStream::tokenize(WordLexer::new("a\n  b")).unwrap();
        assert_eq!(stream.line_col(0), Position::new(1, 1));
        assert_eq!(stream.line_col(4), Position::new(2, 3));
        assert_eq!(stream.token_span(1), Span::new(Position::new(2, 3), Position::new(2, 4)));
    }
}
