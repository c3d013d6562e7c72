//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Table-driven LALR parsing runtime with backtracking.
//!
//! `lalrbt` runs parse tables produced offline by `lalrbt-gen`:
//!  * [`TokenStream`] holds the lexer's output as an indexed, re-positionable
//!    sequence mapped onto the grammar's terminals;
//!  * [`ParseTable`] gives read-only access to the generated automaton and is
//!    shared by reference between any number of sessions;
//!  * [`DeterministicEngine`] is the shift/reduce loop, calling a
//!    [`Semantics`] implementation on every reduction;
//!  * [`BacktrackingEngine`] explores the alternatives of conflict cells and
//!    may repair single tokens within a caller-supplied budget;
//!  * [`DiagnosticEngine`] explains a failed parse as the offending token and
//!    the terminals that would have been accepted there;
//!  * [`Ast`] is an arena for syntax trees with parent links, list nodes and
//!    a [`Visitor`] protocol.
//!
//! [`ParseSession`] ties them together. A syntax error is an ordinary
//! [`ParseOutcome::Rejected`] value; [`ConfigError`] and [`ParseError`] are
//! reserved for wiring mistakes and engine failures.

#[macro_use]
mod error;
mod ast;
mod backtrack;
mod diagnose;
mod engine;
mod monitor;
mod recognizer;
mod session;
mod stream;
mod table;

#[cfg(test)]
mod testing;

pub use crate::ast::{Ast, ListOrder, Node, NodeId, Visitor};
pub use crate::backtrack::{BacktrackingEngine, COMMIT_DEPTH, Failure, FuzzyOutcome};
pub use crate::diagnose::{Diagnostic, DiagnosticEngine, Report};
pub use crate::engine::{
    DeterministicEngine, EngineOutcome, Entry, FirstAlternative, Frame, ParserStats, Repairs, Replay, Resolver,
    Rhs, Semantics, Slot, TokenRange,
};
pub use crate::error::{ConfigError, LexError, ParseError, Position, Span};
pub use crate::monitor::{CancelFlag, Deadline, Monitor};
pub use crate::recognizer::acceptable_terminals;
pub use crate::session::{ParseOutcome, ParseSession, Parsed};
pub use crate::stream::{Adjunct, Lexeme, Lexer, TerminalMap, Token, TokenStream};
pub use crate::table::{
    Action, ConflictId, EntryPoint, ParseTable, Rule, RuleId, RuleInfo, StateId, SymbolId, TableData,
};
