//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Offline LALR(1) table generator for the `lalrbt` runtime.
//!
//! `lalrbt-gen` reads a `.g` grammar, builds the LALR(1) automaton and writes
//! it out as Rust source (`ProdID`/`TokenID` enums, static tables and a
//! `table_data()` constructor) for inclusion from a `build.rs` script.
//!
//! Conflicts are not errors. By default every viable action of a conflict
//! cell is kept, in the order a backtracking parser should try them (shift
//! before reduce, lower-numbered rules first). With
//! [`GenOptions::backtrack`] off, each conflict is resolved to its first
//! alternative and logged.
//!
//! `%entry Nonterminal` makes a nonterminal parseable on its own; the
//! generator adds a marker terminal and a `Start -> marker Nonterminal`
//! rule for it.

mod automaton;
mod generate;
mod lalr;
mod lexer;
mod parser;
mod symtab;

pub use automaton::{Act, Automaton, GenOptions, GenRule, compile};
pub use generate::{generate, write_tables};
pub use lexer::SYM_NAMES;
