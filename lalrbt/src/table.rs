//! Read-only access to a generated LALR automaton.
//!
//! A [`ParseTable`] is built once from [`TableData`] (usually the static
//! arrays written by `lalrbt-gen` into a `parser_data.rs`) and then only
//! read. It is `Send + Sync` and is meant to be shared by reference, or
//! behind an `Arc`, by any number of parse sessions.
//!
//! Symbols share one id space: nonterminals come first, terminals follow,
//! and the end-of-file terminal is one of the terminals. Terminal columns of
//! the action table hold [`Action::Shift`], [`Action::Reduce`],
//! [`Action::Accept`], [`Action::Conflict`] or [`Action::Error`];
//! nonterminal columns hold [`Action::Goto`] or [`Action::Error`].

use crate::ConfigError;
use smartstring::alias::String;
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u16);

        impl From<$name> for usize {
            #[inline]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// An automaton state.
    StateId
);
id_type!(
    /// A grammar symbol, terminal or nonterminal.
    SymbolId
);
id_type!(
    /// A grammar rule (production).
    RuleId
);
id_type!(
    /// An entry of the conflict list table.
    ConflictId
);

/// One cell of the action/goto table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Error,
    Accept,
    Shift(StateId),
    Reduce(RuleId),
    /// Several actions are viable; the alternatives are listed, in the order
    /// they are to be tried, by [`ParseTable::conflict`].
    Conflict(ConflictId),
    Goto(StateId),
}

/// Rule metadata as it appears in generated table data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleInfo<'a> {
    pub lhs: SymbolId,
    pub arity: u16,
    pub label: &'a str,
}

/// An entry point: parsing `nonterminal` in isolation starts by feeding the
/// synthetic `marker` terminal to the automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryPoint {
    pub marker: SymbolId,
    pub nonterminal: SymbolId,
}

/// Borrowed table data, as produced by the generator.
#[derive(Clone, Copy, Debug)]
pub struct TableData<'a> {
    /// Symbol names indexed by [`SymbolId`].
    pub symbols: &'a [&'a str],
    /// Display spelling of each symbol (`;` for `semicolon`).
    pub spellings: &'a [&'a str],
    /// Number of leading nonterminal ids.
    pub n_nonterminals: usize,
    pub rules: &'a [RuleInfo<'a>],
    /// Row-major `n_states * symbols.len()` cells.
    pub actions: &'a [Action],
    pub conflicts: &'a [&'a [Action]],
    pub eof: SymbolId,
    pub entries: &'a [EntryPoint],
    /// Set when conflicts were preserved rather than resolved statically.
    pub backtrack: bool,
}

/// A grammar rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub lhs: SymbolId,
    pub arity: usize,
    pub label: String,
}

/// The immutable automaton shared by all parses.
#[derive(Clone, Debug)]
pub struct ParseTable {
    symbols: Vec<String>,
    spellings: Vec<String>,
    n_nonterminals: usize,
    rules: Vec<Rule>,
    actions: Box<[Action]>,
    n_states: usize,
    conflicts: Vec<Box<[Action]>>,
    eof: SymbolId,
    entries: Vec<EntryPoint>,
    backtrack: bool,
}

impl ParseTable {
    /// Copies and validates generated table data.
    pub fn try_new(data: TableData<'_>) -> Result<Self, ConfigError> {
        let malformed = |msg: std::string::String| ConfigError::MalformedTable(msg.into());

        let n_symbols = data.symbols.len();
        if n_symbols == 0 || n_symbols > u16::MAX as usize {
            return Err(malformed(format!("invalid symbol count {n_symbols}")));
        }
        if data.spellings.len() != n_symbols {
            return Err(malformed(format!(
                "{} spellings for {} symbols",
                data.spellings.len(),
                n_symbols
            )));
        }
        if data.n_nonterminals == 0 || data.n_nonterminals >= n_symbols {
            return Err(malformed(format!(
                "invalid nonterminal count {}",
                data.n_nonterminals
            )));
        }
        if data.actions.is_empty() || data.actions.len() % n_symbols != 0 {
            return Err(malformed(format!(
                "action table of {} cells is not a multiple of {} symbols",
                data.actions.len(),
                n_symbols
            )));
        }
        let n_states = data.actions.len() / n_symbols;
        let is_terminal = |sym: SymbolId| {
            let i: usize = sym.into();
            i >= data.n_nonterminals && i < n_symbols
        };
        let is_nonterminal = |sym: SymbolId| usize::from(sym) < data.n_nonterminals;

        if !is_terminal(data.eof) {
            return Err(malformed(format!("end-of-file symbol {} is not a terminal", data.eof)));
        }
        for (i, rule) in data.rules.iter().enumerate() {
            if !is_nonterminal(rule.lhs) {
                return Err(malformed(format!("rule {i} has terminal left-hand side {}", rule.lhs)));
            }
        }
        for entry in data.entries {
            if !is_terminal(entry.marker) || !is_nonterminal(entry.nonterminal) {
                return Err(malformed(format!("invalid entry point {entry:?}")));
            }
        }
        if !data.backtrack && !data.conflicts.is_empty() {
            return Err(malformed("conflicts listed in a statically resolved table".into()));
        }

        let check_target = |action: Action| -> Result<(), ConfigError> {
            match action {
                Action::Shift(s) | Action::Goto(s) if usize::from(s) >= n_states => {
                    Err(malformed(format!("state {s} out of range")))
                }
                Action::Reduce(r) if usize::from(r) >= data.rules.len() => {
                    Err(malformed(format!("rule {r} out of range")))
                }
                Action::Conflict(c) if usize::from(c) >= data.conflicts.len() => {
                    Err(malformed(format!("conflict {c} out of range")))
                }
                _ => Ok(()),
            }
        };

        for (cell, &action) in data.actions.iter().enumerate() {
            check_target(action)?;
            let sym = SymbolId((cell % n_symbols) as u16);
            let fits = match action {
                Action::Error => true,
                Action::Goto(_) => is_nonterminal(sym),
                _ => is_terminal(sym),
            };
            if !fits {
                return Err(malformed(format!(
                    "{action:?} in column {} of state {}",
                    data.symbols[usize::from(sym)],
                    cell / n_symbols
                )));
            }
        }
        for (i, alternatives) in data.conflicts.iter().enumerate() {
            if alternatives.len() < 2 {
                return Err(malformed(format!("conflict {i} lists fewer than two actions")));
            }
            for &action in alternatives.iter() {
                check_target(action)?;
                if matches!(action, Action::Error | Action::Goto(_) | Action::Conflict(_)) {
                    return Err(malformed(format!("conflict {i} lists {action:?}")));
                }
            }
        }

        Ok(Self {
            symbols: data.symbols.iter().map(|s| String::from(*s)).collect(),
            spellings: data.spellings.iter().map(|s| String::from(*s)).collect(),
            n_nonterminals: data.n_nonterminals,
            rules: data
                .rules
                .iter()
                .map(|r| Rule {
                    lhs: r.lhs,
                    arity: r.arity as usize,
                    label: r.label.into(),
                })
                .collect(),
            actions: data.actions.into(),
            n_states,
            conflicts: data.conflicts.iter().map(|c| Box::<[Action]>::from(*c)).collect(),
            eof: data.eof,
            entries: data.entries.to_vec(),
            backtrack: data.backtrack,
        })
    }

    #[inline]
    pub fn start_state(&self) -> StateId {
        StateId(0)
    }

    /// The action for `terminal` in `state`. Anything that is not a terminal
    /// of this grammar, or a state out of range, yields [`Action::Error`].
    #[inline]
    pub fn action(&self, state: StateId, terminal: SymbolId) -> Action {
        if !self.is_terminal(terminal) || usize::from(state) >= self.n_states {
            return Action::Error;
        }
        self.actions[usize::from(state) * self.symbols.len() + usize::from(terminal)]
    }

    /// The goto target for `nonterminal` in `state`.
    #[inline]
    pub fn goto(&self, state: StateId, nonterminal: SymbolId) -> Option<StateId> {
        if !self.is_nonterminal(nonterminal) || usize::from(state) >= self.n_states {
            return None;
        }
        match self.actions[usize::from(state) * self.symbols.len() + usize::from(nonterminal)] {
            Action::Goto(next) => Some(next),
            _ => None,
        }
    }

    /// The alternatives of a conflict cell in try order: the shift first,
    /// then reductions by ascending rule number.
    #[inline]
    pub fn conflict(&self, id: ConflictId) -> &[Action] {
        &self.conflicts[usize::from(id)]
    }

    #[inline]
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[usize::from(id)]
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn state_count(&self) -> usize {
        self.n_states
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    #[inline]
    pub fn eof(&self) -> SymbolId {
        self.eof
    }

    #[inline]
    pub fn is_terminal(&self, sym: SymbolId) -> bool {
        let i: usize = sym.into();
        i >= self.n_nonterminals && i < self.symbols.len()
    }

    #[inline]
    pub fn is_nonterminal(&self, sym: SymbolId) -> bool {
        usize::from(sym) < self.n_nonterminals
    }

    pub fn is_marker(&self, sym: SymbolId) -> bool {
        self.entries.iter().any(|e| e.marker == sym)
    }

    /// All terminal ids, end-of-file and entry markers included.
    pub fn terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (self.n_nonterminals..self.symbols.len()).map(|i| SymbolId(i as u16))
    }

    /// Terminals a lexer is expected to produce: everything but entry markers.
    pub fn lexical_terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.terminals().filter(|&t| !self.is_marker(t))
    }

    pub fn symbol_name(&self, sym: SymbolId) -> &str {
        self.symbols.get(usize::from(sym)).map_or("?", |s| s.as_str())
    }

    pub fn spelling(&self, sym: SymbolId) -> &str {
        self.spellings.get(usize::from(sym)).map_or("?", |s| s.as_str())
    }

    /// Looks a symbol up by name.
    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .position(|s| s == name)
            .map(|i| SymbolId(i as u16))
    }

    pub fn entries(&self) -> &[EntryPoint] {
        &self.entries
    }

    /// The marker terminal that starts a parse of `nonterminal` in isolation.
    pub fn entry_marker(&self, nonterminal: SymbolId) -> Option<SymbolId> {
        self.entries
            .iter()
            .find(|e| e.nonterminal == nonterminal)
            .map(|e| e.marker)
    }

    #[inline]
    pub fn is_backtrack_capable(&self) -> bool {
        self.backtrack
    }

    pub fn check_backtrack_capable(&self) -> Result<(), ConfigError> {
        if self.backtrack {
            Ok(())
        } else {
            Err(ConfigError::NotBacktrackCapable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::table;

    const LIST: &str = "\
List -> List a
List -> a
";

    #[test]
    fn table_from_generator_validates() {
        let t = table(LIST);
        assert!(t.is_backtrack_capable());
        assert_eq!(t.symbol_name(t.eof()), "end");
        let a = t.symbol("a").unwrap();
        assert!(t.is_terminal(a));
        assert!(matches!(t.action(t.start_state(), a), Action::Shift(_)));
        assert_eq!(t.action(t.start_state(), t.eof()), Action::Error);
        // nonterminal columns never answer `action`
        let list = t.symbol("List").unwrap();
        assert_eq!(t.action(t.start_state(), list), Action::Error);
        assert!(t.goto(t.start_state(), list).is_some());
    }

    #[test]
    fn rejects_goto_in_terminal_column() {
        let symbols = ["S", "a", "end"];
        let actions = [
            Action::Error,
            Action::Goto(StateId(0)),
            Action::Error,
        ];
        let data = TableData {
            symbols: &symbols,
            spellings: &symbols,
            n_nonterminals: 1,
            rules: &[],
            actions: &actions,
            conflicts: &[],
            eof: SymbolId(2),
            entries: &[],
            backtrack: true,
        };
        let err = ParseTable::try_new(data).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTable(_)));
    }

    #[test]
    fn rejects_out_of_range_state() {
        let symbols = ["S", "a", "end"];
        let actions = [Action::Error, Action::Shift(StateId(7)), Action::Error];
        let data = TableData {
            symbols: &symbols,
            spellings: &symbols,
            n_nonterminals: 1,
            rules: &[],
            actions: &actions,
            conflicts: &[],
            eof: SymbolId(2),
            entries: &[],
            backtrack: false,
        };
        assert!(ParseTable::try_new(data).is_err());
    }

    #[test]
    fn non_backtrack_table_is_reported() {
        let symbols = ["S", "a", "end"];
        let actions = [Action::Error, Action::Error, Action::Accept];
        let data = TableData {
            symbols: &symbols,
            spellings: &symbols,
            n_nonterminals: 1,
            rules: &[],
            actions: &actions,
            conflicts: &[],
            eof: SymbolId(2),
            entries: &[],
            backtrack: false,
        };
        let t = ParseTable::try_new(data).unwrap();
        assert_eq!(t.check_backtrack_capable(), Err(ConfigError::NotBacktrackCapable));
    }

    fn _assert_send_sync<T: Send + Sync>() {}
    #[test]
    fn table_is_shareable() {
        _assert_send_sync::<ParseTable>();
    }
}
