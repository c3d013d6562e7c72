//! Grammar compilation: grammar text in, LALR(1) automaton out.

use crate::lalr::{self, Cand, Grammar, Lookaheads};
use crate::lexer::{LexContext, Lexer};
use crate::parser::{self, Line, Production, Symbol};
use anyhow::{Result, anyhow, bail};
use chumsky::Parser;
use std::collections::HashSet;
use std::io::{self, Write};

/// Generator settings.
#[derive(Clone, Debug)]
pub struct GenOptions {
    /// Keep every conflicting action, in try order, for a backtracking
    /// runtime. When off, each conflict is resolved statically to its first
    /// alternative and reported.
    pub backtrack: bool,
    /// Include the LR item sets with lookaheads in the generated file.
    pub debug: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            backtrack: true,
            debug: false,
        }
    }
}

/// A table cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Act {
    Error,
    Accept,
    Shift(usize),
    Reduce(usize),
    Conflict(usize),
    Goto(usize),
}

impl From<Cand> for Act {
    fn from(cand: Cand) -> Self {
        match cand {
            Cand::Accept => Act::Accept,
            Cand::Shift(s) => Act::Shift(s),
            Cand::Reduce(r) => Act::Reduce(r),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenRule {
    pub lhs: usize,
    pub rhs: Vec<usize>,
    pub label: String,
}

/// A compiled grammar.
///
/// Symbol ids: nonterminals `0..n_nonterminals` (`0` is `Start`), then the
/// terminals, with the end-of-input terminal `end` last. Rule `0` is
/// `Start -> Goal`; each entry point adds `Start -> marker Nonterminal`.
#[derive(Clone, Debug)]
pub struct Automaton {
    pub symbols: Vec<String>,
    pub spellings: Vec<String>,
    pub n_nonterminals: usize,
    pub rules: Vec<GenRule>,
    /// One row per state, one cell per symbol.
    pub states: Vec<Vec<Act>>,
    /// Alternatives of each conflict cell, in try order.
    pub conflicts: Vec<Vec<Act>>,
    pub eof: usize,
    /// `(marker, nonterminal)` pairs.
    pub entries: Vec<(usize, usize)>,
    pub backtrack: bool,
    /// Conflict cells resolved statically (only without `backtrack`).
    pub resolved: usize,
    lookaheads: Vec<Lookaheads>,
}

impl Automaton {
    pub fn symbol(&self, name: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == name)
    }

    pub fn n_terminals(&self) -> usize {
        self.symbols.len() - self.n_nonterminals
    }

    /// Productions as symbol vectors, left-hand side first.
    pub fn prods(&self) -> Vec<Vec<usize>> {
        self.rules
            .iter()
            .map(|r| std::iter::once(r.lhs).chain(r.rhs.iter().copied()).collect())
            .collect()
    }

    pub fn write_prods<W: Write>(&self, out: &mut W) -> io::Result<()> {
        lalr::write_prods(out, &self.prods(), &self.symbols)
    }

    pub fn write_item_sets<W: Write>(&self, out: &mut W) -> io::Result<()> {
        lalr::write_set(out, &self.lookaheads, &self.prods(), &self.symbols)
    }
}

fn lowercase_first(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + c.as_str(),
    }
}

/// Compiles grammar text into an automaton.
pub fn compile(grammar: &str, options: &GenOptions) -> Result<Automaton> {
    let mut context = LexContext::default();
    context.prod_labels.add("start");
    context.nonterms.add("Start");
    let (toks, lines) = Lexer::tokenize_all(grammar, &mut context)?;
    let parsed = parser::parser().parse(&toks).into_result().map_err(|errs| {
        let at = errs.first().map_or(0, |e| e.span().start);
        let line = lines.get(at).or(lines.last()).copied().unwrap_or(1);
        anyhow!("line {line}: malformed grammar line")
    })?;

    let mut prods: Vec<Production> = Vec::new();
    let mut entry_nonterms: Vec<usize> = Vec::new();
    let mut spells: Vec<(usize, String)> = Vec::new();
    for line in parsed {
        match line {
            Line::Production(p) => prods.push(p),
            Line::Entry(ns) => {
                for n in ns {
                    if !entry_nonterms.contains(&n) {
                        entry_nonterms.push(n);
                    }
                }
            }
            Line::Spell(t, s) => spells.push((t, s)),
        }
    }

    let Some(goal) = prods.first().map(|p| p.lhs) else {
        bail!("grammar has no productions");
    };
    let nonterm_names: Vec<String> = context.nonterms.iter().map(str::to_owned).collect();
    for p in &prods {
        if p.lhs == 0 || p.rhs.contains(&Symbol::NonTerm(0)) {
            bail!("`Start` is reserved for the augmented start symbol");
        }
    }
    for n in 1..context.nonterms.len() {
        if !prods.iter().any(|p| p.lhs == n) {
            bail!("nonterminal `{}` has no productions", nonterm_names[n]);
        }
    }
    if context.terms.idx("end").is_some() {
        bail!("terminal `end` is reserved for end of input");
    }

    let mut entries = Vec::new();
    for &n in &entry_nonterms {
        if n == 0 {
            bail!("`Start` cannot be an entry point");
        }
        let marker = format!("{}Marker", lowercase_first(&nonterm_names[n]));
        if context.terms.idx(&marker).is_some() {
            bail!("terminal `{marker}` clashes with an entry marker");
        }
        entries.push((context.terms.add(&marker), n));
    }
    let eof_term = context.terms.add("end");

    let n_nonterms = context.nonterms.len();
    let n_terms = context.terms.len();
    let term_id = |t: usize| t + n_nonterms;

    let mut rules = vec![GenRule {
        lhs: 0,
        rhs: vec![goal],
        label: "start".into(),
    }];
    for (i, p) in prods.iter().enumerate() {
        rules.push(GenRule {
            lhs: p.lhs,
            rhs: p
                .rhs
                .iter()
                .map(|sym| match sym {
                    Symbol::NonTerm(n) => *n,
                    Symbol::Term(t) => term_id(*t),
                })
                .collect(),
            label: match p.label {
                Some(j) => context.prod_labels.sym(j).unwrap_or("?").to_owned(),
                None => format!("rule{}", i + 1),
            },
        });
    }
    for &(marker, n) in &entries {
        rules.push(GenRule {
            lhs: 0,
            rhs: vec![term_id(marker), n],
            label: format!("entry{}", nonterm_names[n]),
        });
    }
    let mut seen = HashSet::new();
    for r in &rules {
        if !seen.insert(r.label.to_lowercase()) {
            bail!("duplicate production label `{}`", r.label);
        }
    }

    let mut symbols: Vec<String> = context.nonterms.iter().map(str::to_owned).collect();
    symbols.extend(context.terms.iter().map(str::to_owned));
    let mut seen = HashSet::new();
    for s in &symbols {
        if !seen.insert(s.to_lowercase()) {
            bail!("symbol `{s}` differs from another symbol only in case");
        }
    }
    let mut spellings = symbols.clone();
    for (&t, s) in &context.spellings {
        spellings[term_id(t)] = s.clone();
    }
    for (t, s) in spells {
        spellings[term_id(t)] = s;
    }
    for &(marker, n) in &entries {
        spellings[term_id(marker)] = format!("<{}>", nonterm_names[n]);
    }
    spellings[term_id(eof_term)] = "end of input".into();

    let entries: Vec<(usize, usize)> = entries.into_iter().map(|(m, n)| (term_id(m), n)).collect();
    let eof = term_id(eof_term);

    let grammar = Grammar::new(
        rules
            .iter()
            .map(|r| std::iter::once(r.lhs).chain(r.rhs.iter().copied()).collect())
            .collect(),
        n_nonterms,
        n_terms,
    );
    let lr0 = lalr::construct_lr0(&grammar);
    let lookaheads = lalr::lookaheads(&grammar, &lr0);
    let tab = lalr::construct_lalr(&grammar, &lr0, &lookaheads);

    let mut states = Vec::with_capacity(tab.len());
    let mut conflicts = Vec::new();
    let mut resolved = 0;
    for (state, row) in tab.iter().enumerate() {
        let mut acts = vec![Act::Error; symbols.len()];
        for (&sym, &target) in &lr0.transitions[state] {
            if sym < n_nonterms {
                acts[sym] = Act::Goto(target);
            }
        }
        for (sym, cands) in row.iter().enumerate() {
            let mut iter = cands.iter().copied();
            let Some(first) = iter.next() else {
                continue;
            };
            if cands.len() == 1 {
                acts[sym] = first.into();
            } else if options.backtrack {
                log::debug!("state {state}: {} alternatives on `{}`", cands.len(), symbols[sym]);
                acts[sym] = Act::Conflict(conflicts.len());
                conflicts.push(cands.iter().map(|&c| Act::from(c)).collect());
            } else {
                log::warn!(
                    "state {state}: conflict on `{}` between {:?}, keeping {:?}",
                    symbols[sym],
                    cands,
                    first
                );
                acts[sym] = first.into();
                resolved += 1;
            }
        }
        states.push(acts);
    }
    log::info!(
        "{} rules, {} states, {} conflict cells{}",
        rules.len(),
        states.len(),
        conflicts.len() + resolved,
        if resolved > 0 { " (resolved statically)" } else { "" }
    );

    Ok(Automaton {
        symbols,
        spellings,
        n_nonterminals: n_nonterms,
        rules,
        states,
        conflicts,
        eof,
        entries,
        backtrack: options.backtrack,
        resolved,
        lookaheads,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const EXPR: &str = "\
-- arithmetic
add: E -> E + T
e: E -> T
mul: T -> T * F
t: T -> F
paren: F -> ( E )
x: F -> x
";

    #[test]
    fn symbols_are_laid_out_nonterminals_first() {
        init_logger();
        let auto = compile(EXPR, &GenOptions::default()).unwrap();
        assert_eq!(&auto.symbols[..4], ["Start", "E", "T", "F"]);
        assert_eq!(auto.n_nonterminals, 4);
        assert_eq!(auto.eof, auto.symbols.len() - 1);
        assert_eq!(auto.symbols[auto.eof], "end");
        assert_eq!(auto.spellings[auto.symbol("plus").unwrap()], "+");
        assert_eq!(auto.rules[0].rhs, [1]);
        assert_eq!(auto.rules[1].label, "add");
        assert!(auto.conflicts.is_empty());
    }

    #[test]
    fn unlabelled_rules_are_numbered() {
        let auto = compile("S -> a\nS -> b\n", &GenOptions::default()).unwrap();
        assert_eq!(auto.rules[1].label, "rule1");
        assert_eq!(auto.rules[2].label, "rule2");
    }

    #[test]
    fn conflicts_keep_all_alternatives_in_try_order() {
        let grammar = "\
ifThen: S -> if x then S
ifThenElse: S -> if x then S else S
atom: S -> a
";
        let auto = compile(grammar, &GenOptions::default()).unwrap();
        assert_eq!(auto.conflicts.len(), 1);
        let alts = &auto.conflicts[0];
        assert!(matches!(alts[0], Act::Shift(_)));
        assert_eq!(alts[1], Act::Reduce(1));

        let stat = compile(
            grammar,
            &GenOptions {
                backtrack: false,
                ..GenOptions::default()
            },
        )
        .unwrap();
        assert!(stat.conflicts.is_empty());
        assert_eq!(stat.resolved, 1);
        assert!(!stat.backtrack);
    }

    #[test]
    fn entry_points_get_marker_terminals() {
        let auto = compile("%entry T\nE -> E plus T\nE -> T\nT -> x\n", &GenOptions::default()).unwrap();
        let marker = auto.symbol("tMarker").unwrap();
        let t = auto.symbol("T").unwrap();
        assert_eq!(auto.entries, [(marker, t)]);
        assert!(marker >= auto.n_nonterminals && marker < auto.eof);
        assert_eq!(auto.spellings[marker], "<T>");
        let last = auto.rules.last().unwrap();
        assert_eq!((last.lhs, last.rhs.clone()), (0, vec![marker, t]));
        assert!(matches!(auto.states[0][marker], Act::Shift(_)));
    }

    #[test]
    fn spell_directive_overrides_display_text() {
        let auto = compile("%spell eqEq \"==\"\nE -> x eqEq x\n", &GenOptions::default()).unwrap();
        assert_eq!(auto.spellings[auto.symbol("eqEq").unwrap()], "==");
        assert_eq!(auto.spellings[auto.eof], "end of input");
    }

    #[test]
    fn grammar_errors() {
        let opts = GenOptions::default();
        assert!(compile("", &opts).is_err());
        assert!(compile("S -> A\n", &opts).unwrap_err().to_string().contains("`A`"));
        assert!(compile("S -> end\n", &opts).is_err());
        assert!(compile("s: S -> a\ns: S -> b\n", &opts).is_err());
        assert!(compile("S -> a\nS b\n", &opts).unwrap_err().to_string().contains("line"));
    }
}
