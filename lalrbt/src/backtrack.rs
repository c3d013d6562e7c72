//! Backtracking ("fuzzy") parsing.
//!
//! A [`BacktrackingEngine`] parses in two phases. The search phase runs the
//! automaton on bare state stacks, depth first, taking the alternatives of
//! every conflict cell in table order and backing up to the most recent
//! choice point whenever a path hits an error. When a path reaches accept,
//! the choices made along it are replayed through a [`DeterministicEngine`]
//! with the real semantic actions, so values are only ever built for the
//! committed path.
//!
//! A choice is committed once the path that took it has read
//! [`COMMIT_DEPTH`] tokens past it; the search never backs up into it again.
//!
//! When every path fails, the engine may substitute the token at the
//! furthest failure with a terminal one of the failing configurations could
//! take, and search again. The number of substitutions is bounded by the
//! repair budget; a budget of zero reports the first syntax error reached by
//! the search.

use crate::engine::Lookahead;
use crate::recognizer::{self, Applied};
use crate::{
    Action, ConfigError, DeterministicEngine, EngineOutcome, Entry, Frame, Monitor, ParseError, ParseTable,
    ParserStats, Replay, Repairs, Semantics, StateId, SymbolId, TokenStream,
};
use std::collections::BTreeSet;

/// Failing configurations kept per failure token.
pub(crate) const MAX_CONFIGS: usize = 256;

/// Tokens a path must get past a choice point before the choice is final.
pub const COMMIT_DEPTH: usize = 64;

/// Search steps between two polls of the monitor.
const POLL_INTERVAL: usize = 1 << 12;

/// The furthest point the search reached before every path failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// Index of the token no path could get past.
    pub token: usize,
    /// Repairs in effect for the failing search.
    pub repairs: Repairs,
    pub(crate) configs: Vec<Vec<StateId>>,
}

impl Failure {
    /// Distinct state stacks that failed on [`Failure::token`].
    pub fn configs(&self) -> &[Vec<StateId>] {
        &self.configs
    }

    fn record(slot: &mut Option<Failure>, index: usize, states: &[StateId], repairs: &Repairs) {
        match slot {
            Some(f) if index < f.token => {}
            Some(f) if index == f.token => {
                if f.configs.len() < MAX_CONFIGS && !f.configs.iter().any(|c| c == states) {
                    f.configs.push(states.to_vec());
                }
            }
            _ => {
                *slot = Some(Failure {
                    token: index,
                    repairs: repairs.clone(),
                    configs: vec![states.to_vec()],
                })
            }
        }
    }
}

/// Result of [`BacktrackingEngine::parse`].
#[derive(Debug)]
pub enum FuzzyOutcome<V> {
    /// The search found a path. `repairs` lists the substitutions it needed
    /// and is empty for well-formed input.
    Accepted { frame: Frame<V>, repairs: Repairs },
    /// Every path failed, within the repair budget.
    Failed(Failure),
}

enum Recognition {
    Accepted { choices: Vec<u16> },
    Failed(Failure),
}

struct ChoicePoint<'t> {
    states: Vec<StateId>,
    la: Lookahead,
    alternatives: &'t [Action],
    next: usize,
    depth: usize,
}

/// Depth-first search over conflict alternatives with bounded repair.
///
/// # Overview
/// [`parse`](Self::parse) first searches on bare state stacks, then replays
/// the winning choices through a [`DeterministicEngine`] so that semantic
/// actions run exactly once, on the committed path. When every path fails
/// and the repair budget allows it, the token at the furthest failure is
/// read as some other terminal and the search starts over.
///
/// # Fields
/// - `table`: must be backtrack capable, see
///   [`ParseTable::check_backtrack_capable`].
/// - `budget`: the most tokens a single parse may substitute.
/// - `stats`: counters accumulated over every parse run with this engine.
pub struct BacktrackingEngine<'t> {
    table: &'t ParseTable,
    budget: usize,
    stats: ParserStats,
}

impl<'t> BacktrackingEngine<'t> {
    /// Fails with [`ConfigError::NotBacktrackCapable`] for a table whose
    /// conflicts were resolved at generation time.
    pub fn new(table: &'t ParseTable, budget: usize) -> Result<Self, ConfigError> {
        table.check_backtrack_capable()?;
        Ok(Self {
            table,
            budget,
            stats: ParserStats::default(),
        })
    }

    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    /// Parses from the stream's cursor position.
    ///
    /// Returns [`ParseError::Cancelled`] as soon as `monitor` reports
    /// cancellation at a backtrack or a repair trial.
    pub fn parse<S>(
        &mut self,
        stream: &mut TokenStream,
        semantics: &mut S,
        entry: Entry,
        monitor: Option<&dyn Monitor>,
    ) -> Result<FuzzyOutcome<S::Node>, ParseError>
    where
        S: Semantics,
    {
        if !stream.is_mapped() {
            return Err(ConfigError::Unmapped.into());
        }
        let start = stream.position();
        let mut repairs = Repairs::new();
        loop {
            let failure = match self.recognize(stream, entry, start, &repairs, monitor)? {
                Recognition::Accepted { choices } => {
                    log::debug!("accepted with {} choices, {} repairs", choices.len(), repairs.len());
                    stream.reset(start);
                    let frame = self.replay(stream, semantics, entry, choices, &repairs)?;
                    return Ok(FuzzyOutcome::Accepted { frame, repairs });
                }
                Recognition::Failed(failure) => failure,
            };
            log::debug!("search failed at token {}", failure.token);
            if repairs.len() >= self.budget {
                stream.reset(failure.token);
                return Ok(FuzzyOutcome::Failed(failure));
            }
            match self.find_repair(stream, entry, start, &repairs, &failure, monitor)? {
                Some(next) => {
                    self.stats.repairs += 1;
                    repairs = next;
                }
                None => {
                    stream.reset(failure.token);
                    return Ok(FuzzyOutcome::Failed(failure));
                }
            }
        }
    }

    fn check_cancelled(monitor: Option<&dyn Monitor>) -> Result<(), ParseError> {
        match monitor {
            Some(m) if m.is_cancelled() => {
                log::debug!("cancelled");
                Err(ParseError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    /// Depth-first search over conflict alternatives on bare state stacks.
    fn recognize(
        &mut self,
        stream: &TokenStream,
        entry: Entry,
        start: usize,
        repairs: &Repairs,
        monitor: Option<&dyn Monitor>,
    ) -> Result<Recognition, ParseError> {
        let table = self.table;
        let mut states = vec![table.start_state()];
        let mut la = Lookahead::start(start, entry);
        let mut choices: Vec<u16> = Vec::new();
        let mut points: Vec<ChoicePoint<'t>> = Vec::new();
        let mut failure: Option<Failure> = None;
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps % POLL_INTERVAL == 0 {
                Self::check_cancelled(monitor)?;
            }
            let Some(&top) = states.last() else {
                return Err(ParseError::Table("state stack underflow".into()));
            };
            let mut action = match la.terminal(stream, repairs) {
                Some(terminal) => table.action(top, terminal),
                None => Action::Error,
            };
            if let Action::Conflict(id) = action {
                let alternatives = table.conflict(id);
                points.push(ChoicePoint {
                    states: states.clone(),
                    la,
                    alternatives,
                    next: 1,
                    depth: choices.len(),
                });
                choices.push(0);
                action = alternatives[0];
            }
            loop {
                match recognizer::apply(table, &mut states, action)? {
                    Applied::Shifted => {
                        la = la.advance();
                        if la.index >= stream.len() {
                            return Err(ParseError::Table("shift past the end-of-file token".into()));
                        }
                        let settled = points.partition_point(|p| p.la.index + COMMIT_DEPTH < la.index);
                        if settled > 0 {
                            log::trace!("committed {settled} choice points");
                            points.drain(..settled);
                        }
                        break;
                    }
                    Applied::Reduced => break,
                    Applied::Accepted => return Ok(Recognition::Accepted { choices }),
                    Applied::Rejected => {
                        Failure::record(&mut failure, la.index, &states, repairs);
                        let Some(point) = points.last_mut() else {
                            return match failure {
                                Some(f) => Ok(Recognition::Failed(f)),
                                None => Err(ParseError::Table("search failed without a failure".into())),
                            };
                        };
                        Self::check_cancelled(monitor)?;
                        self.stats.backtracks += 1;
                        let alternative = point.next;
                        point.next += 1;
                        states.clone_from(&point.states);
                        la = point.la;
                        choices.truncate(point.depth);
                        choices.push(alternative as u16);
                        action = point.alternatives[alternative];
                        if point.next >= point.alternatives.len() {
                            points.pop();
                        }
                    }
                }
            }
        }
    }

    /// Looks for a single-token substitution at the failure point that lets
    /// the search accept or get further.
    fn find_repair(
        &mut self,
        stream: &TokenStream,
        entry: Entry,
        start: usize,
        repairs: &Repairs,
        failure: &Failure,
        monitor: Option<&dyn Monitor>,
    ) -> Result<Option<Repairs>, ParseError> {
        let at = failure.token;
        let table = self.table;
        if at >= stream.last_token() || repairs.contains_key(&at) {
            return Ok(None);
        }
        let current = stream.kind(at);
        let mut candidates: BTreeSet<SymbolId> = BTreeSet::new();
        for config in &failure.configs {
            candidates.extend(recognizer::acceptable_terminals(table, config)?);
        }
        candidates.remove(&table.eof());
        if let Some(current) = current {
            candidates.remove(&current);
        }

        let mut best: Option<(usize, Repairs)> = None;
        for candidate in candidates {
            Self::check_cancelled(monitor)?;
            let mut trial = repairs.clone();
            trial.insert(at, candidate);
            match self.recognize(stream, entry, start, &trial, monitor)? {
                Recognition::Accepted { .. } => {
                    log::debug!("repair: token {at} read as {}", table.symbol_name(candidate));
                    return Ok(Some(trial));
                }
                Recognition::Failed(f) if f.token > at && best.as_ref().is_none_or(|(b, _)| f.token > *b) => {
                    best = Some((f.token, trial));
                }
                Recognition::Failed(_) => {}
            }
        }
        if let Some((reach, _)) = &best {
            log::debug!("repair at token {at} reaches token {reach}");
        }
        Ok(best.map(|(_, trial)| trial))
    }

    fn replay<S>(
        &mut self,
        stream: &mut TokenStream,
        semantics: &mut S,
        entry: Entry,
        choices: Vec<u16>,
        repairs: &Repairs,
    ) -> Result<Frame<S::Node>, ParseError>
    where
        S: Semantics,
    {
        let mut engine = DeterministicEngine::new(self.table);
        let mut replay = Replay::new(choices);
        let outcome = engine.run(stream, semantics, &mut replay, entry, repairs);
        self.stats.merge(engine.stats());
        match outcome? {
            EngineOutcome::Accepted(frame) => Ok(frame),
            EngineOutcome::Rejected { token } => Err(ParseError::Table(
                format!("replay of an accepted search failed at token {token}").into(),
            )),
        }
    }
}
