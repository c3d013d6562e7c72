//! The deterministic shift/reduce engine.
//!
//! [`DeterministicEngine::run`] executes one LALR pass over a
//! [`TokenStream`]. Every reduction is handed to a [`Semantics`]
//! implementation, which turns the popped right-hand side into a new value
//! (an AST node, a token placeholder, an absent placeholder, or one of the
//! children passed through unchanged). Conflict cells are settled by a
//! [`Resolver`]: [`FirstAlternative`] takes the table's preferred action,
//! [`Replay`] follows a list of choices recorded by the backtracking search.
//!
//! Every stack frame carries the half-open [`TokenRange`] it covers. A
//! reduction over `n > 0` frames covers `[first.start, last.end)`; an empty
//! reduction covers the zero-width range at the current token.

use crate::{Action, ConflictId, ParseError, ParseTable, RuleId, StateId, SymbolId, TokenStream};
use smartstring::alias::String;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Half-open range of token indices `[start, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

impl TokenRange {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The zero-width range positioned at token `index`.
    #[inline]
    pub const fn at(index: usize) -> Self {
        Self::new(index, index)
    }

    /// The range of the single token `index`.
    #[inline]
    pub const fn token(index: usize) -> Self {
        Self::new(index, index + 1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// First token covered.
    #[inline]
    pub fn left_token(&self) -> usize {
        self.start
    }

    /// Last token covered; `None` for an empty range.
    #[inline]
    pub fn right_token(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.end - 1)
    }

    /// The smallest range covering both.
    pub fn cover(&self, other: &TokenRange) -> TokenRange {
        TokenRange::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn contains(&self, other: &TokenRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// The value held by a stack frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot<V> {
    /// A shifted token, by index.
    Token(usize),
    /// A value built by [`Semantics::reduce`].
    Node(V),
    /// Nothing: an optional sub-rule that matched empty, or an entry marker.
    Absent,
}

impl<V> Slot<V> {
    pub fn node(&self) -> Option<&V> {
        match self {
            Slot::Node(v) => Some(v),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<usize> {
        match self {
            Slot::Token(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Slot::Absent)
    }
}

/// One entry of the parse stack (the state lives on a parallel stack).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame<V> {
    pub slot: Slot<V>,
    pub range: TokenRange,
}

/// The right-hand side handed to [`Semantics::reduce`], leftmost first.
#[derive(Clone, Copy, Debug)]
pub struct Rhs<'a, V> {
    frames: &'a [Frame<V>],
}

impl<'a, V: Clone> Rhs<'a, V> {
    pub fn new(frames: &'a [Frame<V>]) -> Self {
        Self { frames }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn slot(&self, i: usize) -> &'a Slot<V> {
        &self.frames[i].slot
    }

    /// The slot of symbol `i`, cloned.
    #[inline]
    pub fn take(&self, i: usize) -> Slot<V> {
        self.frames[i].slot.clone()
    }

    #[inline]
    pub fn range(&self, i: usize) -> TokenRange {
        self.frames[i].range
    }

    #[inline]
    pub fn token(&self, i: usize) -> Option<usize> {
        self.frames[i].slot.token()
    }

    #[inline]
    pub fn node(&self, i: usize) -> Option<V> {
        self.frames[i].slot.node().cloned()
    }

    pub fn frames(&self) -> &'a [Frame<V>] {
        self.frames
    }
}

/// The per-grammar semantic actions, indexed by rule.
pub trait Semantics {
    type Node: Clone + Debug;

    /// Builds the value of a reduction of `rule` over `rhs` covering `range`.
    fn reduce(
        &mut self,
        rule: RuleId,
        rhs: Rhs<'_, Self::Node>,
        range: TokenRange,
    ) -> anyhow::Result<Slot<Self::Node>>;
}

/// Settles a conflict cell reached during a deterministic pass.
pub trait Resolver {
    fn resolve(
        &mut self,
        conflict: ConflictId,
        alternatives: &[Action],
        token: usize,
    ) -> Result<Action, ParseError>;
}

/// Takes the table's preferred action: shift before reduce, lower rule
/// numbers before higher ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstAlternative;

impl Resolver for FirstAlternative {
    fn resolve(&mut self, _: ConflictId, alternatives: &[Action], _: usize) -> Result<Action, ParseError> {
        alternatives
            .first()
            .copied()
            .ok_or_else(|| ParseError::Table("empty conflict list".into()))
    }
}

/// Follows recorded choices, one per conflict cell reached, in order.
#[derive(Clone, Debug, Default)]
pub struct Replay {
    choices: Vec<u16>,
    next: usize,
}

impl Replay {
    pub fn new(choices: Vec<u16>) -> Self {
        Self { choices, next: 0 }
    }

    /// Whether every recorded choice has been used.
    pub fn is_exhausted(&self) -> bool {
        self.next >= self.choices.len()
    }
}

impl Resolver for Replay {
    fn resolve(&mut self, conflict: ConflictId, alternatives: &[Action], token: usize) -> Result<Action, ParseError> {
        let Some(&choice) = self.choices.get(self.next) else {
            return Err(ParseError::Table(
                format!("no recorded choice for conflict {conflict} at token {token}").into(),
            ));
        };
        self.next += 1;
        alternatives.get(choice as usize).copied().ok_or_else(|| {
            ParseError::Table(format!("choice {choice} out of range for conflict {conflict}").into())
        })
    }
}

/// Single-token substitutions: token index to the terminal it is read as.
pub type Repairs = BTreeMap<usize, SymbolId>;

/// Where a parse starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Entry {
    /// The grammar's goal symbol.
    #[default]
    Goal,
    /// An isolated nonterminal, started by feeding its marker terminal.
    Marker(SymbolId),
}

/// Counters kept across runs.
///
/// # Fields
/// - `tokens`: stream tokens shifted. The end-of-file token never is.
/// - `shifts`, `reductions`: actions applied by deterministic passes.
/// - `ambigs`: conflict cells reached by deterministic passes.
/// - `backtracks`: times the search returned to an earlier choice point.
/// - `repairs`: token substitutions adopted by the backtracking engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserStats {
    pub tokens: usize,
    pub shifts: usize,
    pub reductions: usize,
    pub ambigs: usize,
    pub backtracks: usize,
    pub repairs: usize,
}

impl ParserStats {
    /// Adds the counters of `other`.
    pub fn merge(&mut self, other: &ParserStats) {
        self.tokens += other.tokens;
        self.shifts += other.shifts;
        self.reductions += other.reductions;
        self.ambigs += other.ambigs;
        self.backtracks += other.backtracks;
        self.repairs += other.repairs;
    }
}

/// Result of one deterministic pass.
#[derive(Debug)]
pub enum EngineOutcome<V> {
    /// The value of the entry symbol and the range it covers.
    Accepted(Frame<V>),
    /// No action for the token at this index.
    Rejected { token: usize },
}

/// The next input symbol: a stream token, or the virtual entry marker that
/// precedes the token at `index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Lookahead {
    pub(crate) index: usize,
    pub(crate) marker: Option<SymbolId>,
}

impl Lookahead {
    pub(crate) fn start(index: usize, entry: Entry) -> Self {
        Self {
            index,
            marker: match entry {
                Entry::Goal => None,
                Entry::Marker(m) => Some(m),
            },
        }
    }

    pub(crate) fn terminal(&self, stream: &TokenStream, repairs: &Repairs) -> Option<SymbolId> {
        self.marker.or_else(|| terminal_at(stream, repairs, self.index))
    }

    pub(crate) fn advance(self) -> Self {
        match self.marker {
            Some(_) => Self {
                index: self.index,
                marker: None,
            },
            None => Self {
                index: self.index + 1,
                marker: None,
            },
        }
    }
}

/// The terminal read at `index`, honouring repairs.
pub(crate) fn terminal_at(stream: &TokenStream, repairs: &Repairs, index: usize) -> Option<SymbolId> {
    repairs.get(&index).copied().or_else(|| stream.kind(index))
}

/// A single LALR pass with semantic actions.
///
/// # Overview
/// The engine keeps a state stack and a parallel stack of [`Frame`]s.
/// Shifts push the token as a [`Slot::Token`]; reductions pop the
/// right-hand side, hand it to [`Semantics::reduce`] together with the
/// covered [`TokenRange`], and push the result. Conflict cells go to the
/// [`Resolver`] passed to [`run`](Self::run). The first token without an
/// action ends the pass with [`EngineOutcome::Rejected`], and no recovery
/// is attempted.
///
/// An engine borrows its [`ParseTable`] and can be reused for any number of
/// runs; its stacks are cleared at the start of each.
pub struct DeterministicEngine<'t, V> {
    table: &'t ParseTable,
    states: Vec<StateId>,
    frames: Vec<Frame<V>>,
    stats: ParserStats,
}

impl<'t, V: Clone + Debug> DeterministicEngine<'t, V> {
    pub fn new(table: &'t ParseTable) -> Self {
        Self {
            table,
            states: Vec::new(),
            frames: Vec::new(),
            stats: ParserStats::default(),
        }
    }

    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    /// The state stack as left by the last run.
    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    /// The frame stack as left by the last run.
    pub fn frames(&self) -> &[Frame<V>] {
        &self.frames
    }

    /// Parses from the stream's cursor position.
    ///
    /// On acceptance the cursor rests on the end-of-file token; on rejection
    /// it rests on the offending token, and [`states`](Self::states) and
    /// [`frames`](Self::frames) show the stack at that point.
    pub fn run<S, R>(
        &mut self,
        stream: &mut TokenStream,
        semantics: &mut S,
        resolver: &mut R,
        entry: Entry,
        repairs: &Repairs,
    ) -> Result<EngineOutcome<V>, ParseError>
    where
        S: Semantics<Node = V>,
        R: Resolver + ?Sized,
    {
        if !stream.is_mapped() {
            return Err(crate::ConfigError::Unmapped.into());
        }
        self.states.clear();
        self.frames.clear();
        self.states.push(self.table.start_state());
        let mut la = Lookahead::start(stream.position(), entry);
        if log::log_enabled!(log::Level::Trace) {
            self.dump_state(stream, la, repairs);
        }
        loop {
            let state = self.top()?;
            let mut action = match la.terminal(stream, repairs) {
                Some(terminal) => self.table.action(state, terminal),
                None => Action::Error,
            };
            if let Action::Conflict(id) = action {
                log::trace!("Conflict {id}");
                self.stats.ambigs += 1;
                action = resolver.resolve(id, self.table.conflict(id), la.index)?;
            }
            match action {
                Action::Shift(next) => {
                    log::trace!("Shift {next}");
                    let frame = match la.marker {
                        Some(_) => Frame {
                            slot: Slot::Absent,
                            range: TokenRange::at(la.index),
                        },
                        None => {
                            self.stats.tokens += 1;
                            Frame {
                                slot: Slot::Token(la.index),
                                range: TokenRange::token(la.index),
                            }
                        }
                    };
                    self.frames.push(frame);
                    self.states.push(next);
                    self.stats.shifts += 1;
                    la = la.advance();
                    if la.index >= stream.len() {
                        return Err(ParseError::Table("shift past the end-of-file token".into()));
                    }
                }

                Action::Reduce(rule) => {
                    self.reduce(rule, la.index, semantics)?;
                }

                Action::Accept => {
                    log::trace!("Accept");
                    let Some(frame) = self.frames.pop() else {
                        return Err(ParseError::Table("accept on an empty stack".into()));
                    };
                    stream.reset(la.index);
                    return Ok(EngineOutcome::Accepted(frame));
                }

                Action::Error => {
                    log::trace!("Error on token {}", la.index);
                    stream.reset(la.index);
                    return Ok(EngineOutcome::Rejected { token: la.index });
                }

                Action::Conflict(_) | Action::Goto(_) => {
                    return Err(ParseError::Table(
                        format!("{action:?} in a terminal column of state {state}").into(),
                    ));
                }
            }

            if log::log_enabled!(log::Level::Trace) {
                self.dump_state(stream, la, repairs);
            }
        }
    }

    fn top(&self) -> Result<StateId, ParseError> {
        self.states
            .last()
            .copied()
            .ok_or_else(|| ParseError::Table("state stack underflow".into()))
    }

    fn reduce<S>(&mut self, rule_id: RuleId, at: usize, semantics: &mut S) -> Result<(), ParseError>
    where
        S: Semantics<Node = V>,
    {
        let rule = self.table.rule(rule_id);
        log::trace!("Reduce {}({})", rule.label, rule_id);
        let Some(base) = self.frames.len().checked_sub(rule.arity) else {
            return Err(ParseError::Table(format!("stack underflow reducing {}", rule.label).into()));
        };
        let range = match (self.frames.get(base), self.frames.last()) {
            (Some(first), Some(last)) if rule.arity > 0 => TokenRange::new(first.range.start, last.range.end),
            _ => TokenRange::at(at),
        };
        let slot = semantics.reduce(rule_id, Rhs::new(&self.frames[base..]), range)?;
        self.frames.truncate(base);
        self.states.truncate(base + 1);
        let state = self.top()?;
        let Some(next) = self.table.goto(state, rule.lhs) else {
            return Err(ParseError::Table(
                format!(
                    "no goto on {} from state {state}",
                    self.table.symbol_name(rule.lhs)
                )
                .into(),
            ));
        };
        self.frames.push(Frame { slot, range });
        self.states.push(next);
        self.stats.reductions += 1;
        Ok(())
    }

    fn dump_state(&self, stream: &TokenStream, la: Lookahead, repairs: &Repairs) {
        let mut output = String::new();
        for (frame, state) in self.frames.iter().zip(self.states.iter()) {
            output.push_str(&format!("<{}>  {:?}  ", state, frame.slot));
        }
        let incoming = la
            .terminal(stream, repairs)
            .map_or("?", |t| self.table.symbol_name(t));
        if let Some(state) = self.states.last() {
            output.push_str(&format!("<{}>  <-  {}", state, incoming));
        }
        log::trace!("{}", output);
    }
}
