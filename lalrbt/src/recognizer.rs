//! Bare state-stack simulation of the automaton.
//!
//! These helpers drive the tables without frames or semantic actions. The
//! backtracking search uses them to explore alternatives cheaply before
//! committing to one, and the diagnosis pass uses them to find out which
//! terminals a configuration can still take.

use crate::{Action, ParseError, ParseTable, StateId, SymbolId};
use std::collections::BTreeSet;

/// Reductions explored per [`step_terminal`] before giving up on a cyclic
/// grammar.
const STEP_LIMIT: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Applied {
    Shifted,
    Reduced,
    Accepted,
    Rejected,
}

/// Applies a single action to `states`. Conflict cells must be expanded by
/// the caller.
pub(crate) fn apply(table: &ParseTable, states: &mut Vec<StateId>, action: Action) -> Result<Applied, ParseError> {
    match action {
        Action::Shift(next) => {
            states.push(next);
            Ok(Applied::Shifted)
        }
        Action::Reduce(id) => {
            let rule = table.rule(id);
            let keep = states
                .len()
                .checked_sub(rule.arity)
                .filter(|&n| n > 0)
                .ok_or_else(|| ParseError::Table(format!("stack underflow reducing {}", rule.label).into()))?;
            states.truncate(keep);
            let top = states[keep - 1];
            let next = table.goto(top, rule.lhs).ok_or_else(|| {
                ParseError::Table(format!("no goto on {} from state {top}", table.symbol_name(rule.lhs)).into())
            })?;
            states.push(next);
            Ok(Applied::Reduced)
        }
        Action::Accept => Ok(Applied::Accepted),
        Action::Error => Ok(Applied::Rejected),
        Action::Conflict(_) | Action::Goto(_) => {
            Err(ParseError::Table(format!("{action:?} where a terminal action was expected").into()))
        }
    }
}

/// Every configuration reachable by consuming one terminal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Step {
    /// Distinct stacks right after shifting the terminal.
    pub(crate) shifted: Vec<Vec<StateId>>,
    /// Some path accepted on the terminal (only possible at end of input).
    pub(crate) accepted: bool,
}

impl Step {
    pub(crate) fn is_viable(&self) -> bool {
        self.accepted || !self.shifted.is_empty()
    }
}

/// Runs every sequence of reductions allowed by `terminal`, following all
/// alternatives of conflict cells, up to the shift (or accept) of
/// `terminal`.
pub(crate) fn step_terminal(table: &ParseTable, states: &[StateId], terminal: SymbolId) -> Result<Step, ParseError> {
    let mut step = Step::default();
    let mut seen = BTreeSet::new();
    let mut work = vec![states.to_vec()];
    let mut explored = 0;
    while let Some(stack) = work.pop() {
        explored += 1;
        if explored > STEP_LIMIT {
            log::debug!("reduction limit reached on {}", table.symbol_name(terminal));
            break;
        }
        let Some(&top) = stack.last() else {
            continue;
        };
        let single = [table.action(top, terminal)];
        let alternatives = match single[0] {
            Action::Conflict(id) => table.conflict(id),
            _ => &single[..],
        };
        for &action in alternatives.iter().rev() {
            let mut next = stack.clone();
            match apply(table, &mut next, action)? {
                Applied::Shifted => {
                    if seen.insert(next.clone()) {
                        step.shifted.push(next);
                    }
                }
                Applied::Reduced => work.push(next),
                Applied::Accepted => step.accepted = true,
                Applied::Rejected => {}
            }
        }
    }
    Ok(step)
}

/// Terminals some path out of `states` can shift or accept. Entry markers
/// are never included.
pub fn acceptable_terminals(table: &ParseTable, states: &[StateId]) -> Result<BTreeSet<SymbolId>, ParseError> {
    let mut out = BTreeSet::new();
    for terminal in table.lexical_terminals() {
        if step_terminal(table, states, terminal)?.is_viable() {
            out.insert(terminal);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::table;

    const EXPR: &str = "\
add: E -> E plus T
e: E -> T
mul: T -> T times x
t: T -> x
";

    #[test]
    fn step_reduces_before_shifting() {
        let t = table(EXPR);
        let x = t.symbol("x").unwrap();
        let plus = t.symbol("plus").unwrap();
        let start = vec![t.start_state()];
        let after_x = step_terminal(&t, &start, x).unwrap();
        assert_eq!(after_x.shifted.len(), 1);
        let after_plus = step_terminal(&t, &after_x.shifted[0], plus).unwrap();
        // x reduced to T, T to E, then plus shifted
        assert_eq!(after_plus.shifted[0].len(), 3);
        assert!(!step_terminal(&t, &start, plus).unwrap().is_viable());
    }

    #[test]
    fn acceptable_terminals_after_operand() {
        let t = table(EXPR);
        let x = t.symbol("x").unwrap();
        let after_x = step_terminal(&t, &[t.start_state()], x).unwrap();
        let names: Vec<&str> = acceptable_terminals(&t, &after_x.shifted[0])
            .unwrap()
            .into_iter()
            .map(|s| t.symbol_name(s))
            .collect();
        assert_eq!(names, ["plus", "times", "end"]);
    }

    #[test]
    fn conflicts_are_followed_both_ways() {
        let t = table(
            "\
ifThen: S -> if x then S
ifThenElse: S -> if x then S else S
atom: S -> a
",
        );
        let mut stacks = vec![vec![t.start_state()]];
        for word in ["if", "x", "then", "if", "x", "then", "a"] {
            let sym = t.symbol(word).unwrap();
            stacks = stacks
                .iter()
                .flat_map(|s| step_terminal(&t, s, sym).unwrap().shifted)
                .collect();
        }
        // `else` can bind to either `if`
        let step = step_terminal(&t, &stacks[0], t.symbol("else").unwrap()).unwrap();
        assert_eq!(step.shifted.len(), 2);
        assert!(step_terminal(&t, &stacks[0], t.eof()).unwrap().accepted);
    }
}
