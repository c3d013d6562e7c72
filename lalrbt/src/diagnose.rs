//! Syntax error diagnosis.
//!
//! Runs only after a parse has failed. [`DiagnosticEngine::diagnose`] moves
//! every configuration the automaton can be in forward together, one token
//! at a time, following all alternatives of conflict cells, until the token
//! where none of them survives. The terminals those configurations could
//! have taken form the expected set. A short best-first search then looks
//! for the cheapest insertion of terminals after which the offending token
//! becomes acceptable; that completion is reported and its terminals are
//! counted as expected too.
//!
//! The pass is deterministic and never builds values.

use crate::backtrack::MAX_CONFIGS;
use crate::engine::terminal_at;
use crate::recognizer::{acceptable_terminals, step_terminal};
use crate::{Entry, ParseError, ParseTable, Repairs, StateId, SymbolId, TokenStream};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};
use std::fmt;

/// Configurations expanded by the completion search before it gives up.
const COMPLETION_LIMIT: usize = 2048;

/// Why a parse failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Index of the offending token.
    pub token_index: usize,
    /// Terminals that would have been valid there.
    pub expected: BTreeSet<SymbolId>,
    /// Shortest terminal insertion found that makes the offending token
    /// acceptable; empty if none was found.
    pub completion: Vec<SymbolId>,
}

impl Diagnostic {
    /// Expected terminals by display spelling, in symbol order.
    pub fn expected_spellings<'t>(&self, table: &'t ParseTable) -> Vec<&'t str> {
        self.expected.iter().map(|&s| table.spelling(s)).collect()
    }

    /// A displayable `line:column: message` rendering.
    pub fn report<'a>(&'a self, table: &'a ParseTable, stream: &'a TokenStream) -> Report<'a> {
        Report {
            diagnostic: self,
            table,
            stream,
        }
    }
}

/// A [`Diagnostic`] paired with the table and stream it refers to.
///
/// Displays as `line:column: unexpected ...`, followed by the expected
/// terminals by spelling and any completion found. The position is the
/// start of the offending token; for the end-of-file token that is the end
/// of the source.
pub struct Report<'a> {
    diagnostic: &'a Diagnostic,
    table: &'a ParseTable,
    stream: &'a TokenStream,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.diagnostic;
        let index = d.token_index.min(self.stream.last_token());
        write!(f, "{}: ", self.stream.token_span(index).start)?;
        if self.stream.kind(index) == Some(self.table.eof()) {
            write!(f, "unexpected end of input")?;
        } else {
            write!(f, "unexpected `{}`", self.stream.text(index))?;
        }
        let expected = d.expected_spellings(self.table);
        match expected.as_slice() {
            [] => {}
            [one] => write!(f, ", expected `{one}`")?,
            many => {
                write!(f, ", expected one of ")?;
                for (i, s) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "`{s}`")?;
                }
            }
        }
        if !d.completion.is_empty() {
            let insert: Vec<&str> = d.completion.iter().map(|&s| self.table.spelling(s)).collect();
            write!(f, " (missing `{}`?)", insert.join(" "))?;
        }
        Ok(())
    }
}

/// Explains syntax errors. Stateless apart from the borrowed table, so one
/// engine may serve any number of streams.
pub struct DiagnosticEngine<'t> {
    table: &'t ParseTable,
}

impl<'t> DiagnosticEngine<'t> {
    pub fn new(table: &'t ParseTable) -> Self {
        Self { table }
    }

    /// Simulates the parse that started at token `start` and explains where
    /// it fails.
    ///
    /// Returns `None` if the input is in fact accepted. Otherwise the
    /// stream's cursor is left on the offending token.
    pub fn diagnose(
        &self,
        stream: &mut TokenStream,
        entry: Entry,
        start: usize,
        repairs: &Repairs,
    ) -> Result<Option<Diagnostic>, ParseError> {
        let Some((index, configs)) = self.simulate(stream, entry, start, repairs)? else {
            return Ok(None);
        };
        log::debug!("diagnosis: token {index}, {} configurations", configs.len());
        stream.reset(index);
        self.explain(stream, index, &configs, repairs).map(Some)
    }

    /// Builds the diagnostic for configurations known to fail on token
    /// `index`.
    pub fn explain(
        &self,
        stream: &TokenStream,
        index: usize,
        configs: &[Vec<StateId>],
        repairs: &Repairs,
    ) -> Result<Diagnostic, ParseError> {
        let mut expected = BTreeSet::new();
        for config in configs {
            expected.extend(acceptable_terminals(self.table, config)?);
        }
        let completion = match terminal_at(stream, repairs, index) {
            Some(actual) => self.complete(configs, actual)?,
            None => Vec::new(),
        };
        expected.extend(completion.iter().copied());
        Ok(Diagnostic {
            token_index: index,
            expected,
            completion,
        })
    }

    /// Breadth-first run over all configurations; the failing token and the
    /// configurations that were waiting for it, or `None` on acceptance.
    #[allow(clippy::type_complexity)]
    fn simulate(
        &self,
        stream: &TokenStream,
        entry: Entry,
        start: usize,
        repairs: &Repairs,
    ) -> Result<Option<(usize, Vec<Vec<StateId>>)>, ParseError> {
        let mut configs = vec![vec![self.table.start_state()]];
        if let Entry::Marker(marker) = entry {
            configs = step_terminal(self.table, &configs[0], marker)?.shifted;
        }
        let mut index = start;
        while index < stream.len() {
            let Some(terminal) = terminal_at(stream, repairs, index) else {
                return Ok(Some((index, configs)));
            };
            let mut next = Vec::new();
            let mut seen = BTreeSet::new();
            let mut accepted = false;
            for config in &configs {
                let step = step_terminal(self.table, config, terminal)?;
                accepted |= step.accepted;
                for stack in step.shifted {
                    if next.len() < MAX_CONFIGS && seen.insert(stack.clone()) {
                        next.push(stack);
                    }
                }
            }
            if accepted {
                return Ok(None);
            }
            if next.is_empty() {
                return Ok(Some((index, configs)));
            }
            configs = next;
            index += 1;
        }
        Err(ParseError::Table("input ran out before the end-of-file token".into()))
    }

    /// Cheapest sequence of terminals that, inserted before the offending
    /// token, lets some configuration take `actual`. Cost is the number of
    /// insertions plus the stack depth, so closing constructs wins ties.
    fn complete(&self, configs: &[Vec<StateId>], actual: SymbolId) -> Result<Vec<SymbolId>, ParseError> {
        let table = self.table;
        let insertable: Vec<SymbolId> = table.lexical_terminals().filter(|&t| t != table.eof()).collect();
        let mut stacks: Vec<Vec<StateId>> = Vec::new();
        let mut visited: BTreeSet<Vec<StateId>> = BTreeSet::new();
        let mut queue = BinaryHeap::new();
        for config in configs {
            if visited.insert(config.clone()) {
                queue.push(Reverse((config.len(), Vec::<SymbolId>::new(), stacks.len())));
                stacks.push(config.clone());
            }
        }
        let mut expanded = 0;
        while let Some(Reverse((_, seq, id))) = queue.pop() {
            let states = stacks[id].clone();
            if !seq.is_empty() && step_terminal(table, &states, actual)?.is_viable() {
                return Ok(seq);
            }
            expanded += 1;
            if expanded > COMPLETION_LIMIT {
                log::debug!("completion search gave up");
                break;
            }
            for &terminal in &insertable {
                for next in step_terminal(table, &states, terminal)?.shifted {
                    if visited.insert(next.clone()) {
                        let mut longer = seq.clone();
                        longer.push(terminal);
                        queue.push(Reverse((longer.len() + next.len(), longer, stacks.len())));
                        stacks.push(next);
                    }
                }
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{stream, table};

    const BLOCKS: &str = "\
%entry Stmt
prog: Prog -> Stmts
one: Stmts -> Stmt
more: Stmts -> Stmts Stmt
block: Stmt -> lp Stmts rp
expr: Stmt -> x semi
";

    fn names(t: &ParseTable, syms: &BTreeSet<SymbolId>) -> Vec<String> {
        syms.iter().map(|&s| t.symbol_name(s).to_string()).collect()
    }

    #[test]
    fn truncated_input_expects_closers() {
        let t = table(BLOCKS);
        let mut s = stream(&t, "lp x");
        let d = DiagnosticEngine::new(&t)
            .diagnose(&mut s, Entry::Goal, 0, &Repairs::new())
            .unwrap()
            .unwrap();
        assert_eq!(d.token_index, 2);
        assert_eq!(s.position(), 2);
        assert_eq!(names(&t, &d.expected), ["rp", "semi"]);
        let completion: Vec<&str> = d.completion.iter().map(|&s| t.symbol_name(s)).collect();
        assert_eq!(completion, ["semi", "rp"]);
    }

    #[test]
    fn unexpected_token_in_the_middle() {
        let t = table(BLOCKS);
        let mut s = stream(&t, "x semi rp x semi");
        let d = DiagnosticEngine::new(&t)
            .diagnose(&mut s, Entry::Goal, 0, &Repairs::new())
            .unwrap()
            .unwrap();
        assert_eq!(d.token_index, 2);
        assert!(d.expected.contains(&t.symbol("lp").unwrap()));
        assert!(d.expected.contains(&t.eof()));
        // `rp` needs an open `lp`
        assert!(d.completion.contains(&t.symbol("lp").unwrap()));
    }

    #[test]
    fn valid_input_has_no_diagnostic() {
        let t = table(BLOCKS);
        let mut s = stream(&t, "lp x semi rp");
        assert!(
            DiagnosticEngine::new(&t)
                .diagnose(&mut s, Entry::Goal, 0, &Repairs::new())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn entry_marker_diagnosis() {
        let t = table(BLOCKS);
        let marker = t.entry_marker(t.symbol("Stmt").unwrap()).unwrap();
        // a single statement, then a second one the entry does not allow
        let mut s = stream(&t, "x semi x semi");
        let d = DiagnosticEngine::new(&t)
            .diagnose(&mut s, Entry::Marker(marker), 0, &Repairs::new())
            .unwrap()
            .unwrap();
        assert_eq!(d.token_index, 2);
        assert_eq!(names(&t, &d.expected), ["end"]);
        assert!(!d.expected.contains(&marker));
    }

    #[test]
    fn diagnosis_is_repeatable() {
        let t = table(BLOCKS);
        let mut s = stream(&t, "lp lp x semi rp");
        let engine = DiagnosticEngine::new(&t);
        let first = engine.diagnose(&mut s, Entry::Goal, 0, &Repairs::new()).unwrap();
        let second = engine.diagnose(&mut s, Entry::Goal, 0, &Repairs::new()).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn report_shows_position_and_spellings() {
        let t = table(BLOCKS);
        let mut s = stream(&t, "lp x");
        let d = DiagnosticEngine::new(&t)
            .diagnose(&mut s, Entry::Goal, 0, &Repairs::new())
            .unwrap()
            .unwrap();
        let text = d.report(&t, &s).to_string();
        assert_eq!(
            text,
            "1:5: unexpected end of input, expected one of `rp` `semi` (missing `semi rp`?)"
        );
    }
}
