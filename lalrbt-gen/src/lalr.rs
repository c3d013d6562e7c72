// LR(0) item machinery, FIRST sets and LALR(1) lookahead propagation.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

/// An LR(0) item: a production and a dot position.
///
/// Productions are symbol vectors with the left-hand side at index 0, so the
/// dot of an item at the start of the right-hand side is `1` and the item is
/// complete when `dot == prod.len()`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Item {
    pub prod: usize,
    pub dot: usize,
}

/// A set of LR(0) items.
pub type ItemSet = BTreeSet<Item>;

/// Lookaheads attached to the items of one state.
pub type Lookaheads = BTreeMap<Item, BTreeSet<usize>>;

/// Stand-in lookahead used to discover propagation (the `#` of the Dragon
/// book construction).
const HASH: usize = usize::MAX;

/// A grammar in integer form.
///
/// Symbols below `n_nonterm` are nonterminals, the rest terminals; the last
/// terminal is the end-of-input symbol. Symbol `0` is the augmented start
/// symbol and only appears on left-hand sides.
#[derive(Debug)]
pub struct Grammar {
    pub prods: Vec<Vec<usize>>,
    pub n_nonterm: usize,
    pub n_term: usize,
    by_lhs: Vec<Vec<usize>>,
    first: Vec<BTreeSet<usize>>,
    nullable: Vec<bool>,
}

impl Grammar {
    pub fn new(prods: Vec<Vec<usize>>, n_nonterm: usize, n_term: usize) -> Self {
        let mut by_lhs = vec![Vec::new(); n_nonterm];
        for (i, p) in prods.iter().enumerate() {
            by_lhs[p[0]].push(i);
        }
        let (first, nullable) = first_sets(&prods, n_nonterm, n_term);
        Self {
            prods,
            n_nonterm,
            n_term,
            by_lhs,
            first,
            nullable,
        }
    }

    pub fn n_symbols(&self) -> usize {
        self.n_nonterm + self.n_term
    }

    pub fn eof(&self) -> usize {
        self.n_symbols() - 1
    }

    fn next_symbol(&self, item: Item) -> Option<usize> {
        self.prods[item.prod].get(item.dot).copied()
    }

    /// LR(0) closure of `kernel`.
    pub fn closure(&self, kernel: &ItemSet) -> ItemSet {
        let mut c = kernel.clone();
        let mut pending: Vec<Item> = kernel.iter().copied().collect();
        while let Some(item) = pending.pop() {
            let Some(sym) = self.next_symbol(item) else {
                continue;
            };
            if sym < self.n_nonterm {
                for &p in &self.by_lhs[sym] {
                    let new_item = Item { prod: p, dot: 1 };
                    if c.insert(new_item) {
                        pending.push(new_item);
                    }
                }
            }
        }
        c
    }

    /// FIRST of `seq` followed by the terminal `follow`.
    fn first_of(&self, seq: &[usize], follow: usize) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        for &sym in seq {
            out.extend(self.first[sym].iter().copied());
            if !self.nullable[sym] {
                return out;
            }
        }
        out.insert(follow);
        out
    }

    /// LR(1) closure of items carrying lookaheads.
    pub fn closure1<'a, I>(&self, kernel: I) -> Lookaheads
    where
        I: IntoIterator<Item = (Item, &'a BTreeSet<usize>)>,
    {
        let mut items = Lookaheads::new();
        let mut pending = Vec::new();
        for (item, las) in kernel {
            let set = items.entry(item).or_default();
            for &a in las {
                if set.insert(a) {
                    pending.push((item, a));
                }
            }
        }
        while let Some((item, la)) = pending.pop() {
            let Some(sym) = self.next_symbol(item) else {
                continue;
            };
            if sym >= self.n_nonterm {
                continue;
            }
            let lookaheads = self.first_of(&self.prods[item.prod][item.dot + 1..], la);
            for &p in &self.by_lhs[sym] {
                let new_item = Item { prod: p, dot: 1 };
                let set = items.entry(new_item).or_default();
                for &b in &lookaheads {
                    if set.insert(b) {
                        pending.push((new_item, b));
                    }
                }
            }
        }
        items
    }
}

/// The LR(0) automaton: state kernels and transitions, numbered in
/// discovery order from the start state `0`.
#[derive(Debug)]
pub struct Lr0 {
    pub kernels: Vec<ItemSet>,
    pub transitions: Vec<BTreeMap<usize, usize>>,
}

/// Builds the LR(0) automaton from the kernel of all `Start` productions.
pub fn construct_lr0(g: &Grammar) -> Lr0 {
    let start: ItemSet = g.by_lhs[0].iter().map(|&p| Item { prod: p, dot: 1 }).collect();
    let mut index = BTreeMap::from([(start.clone(), 0)]);
    let mut kernels = vec![start];
    let mut transitions = Vec::new();
    let mut state = 0;
    while state < kernels.len() {
        let closure = g.closure(&kernels[state]);
        let mut moves: BTreeMap<usize, ItemSet> = BTreeMap::new();
        for &item in &closure {
            if let Some(sym) = g.next_symbol(item) {
                moves.entry(sym).or_default().insert(Item {
                    prod: item.prod,
                    dot: item.dot + 1,
                });
            }
        }
        let mut row = BTreeMap::new();
        for (sym, kernel) in moves {
            let target = match index.get(&kernel) {
                Some(&t) => t,
                None => {
                    let t = kernels.len();
                    index.insert(kernel.clone(), t);
                    kernels.push(kernel);
                    t
                }
            };
            row.insert(sym, target);
        }
        transitions.push(row);
        state += 1;
    }
    Lr0 {
        kernels,
        transitions,
    }
}

/// Computes the LALR(1) lookaheads of every kernel item by spontaneous
/// generation and propagation.
pub fn lookaheads(g: &Grammar, lr0: &Lr0) -> Vec<Lookaheads> {
    let mut la: Vec<Lookaheads> = lr0
        .kernels
        .iter()
        .map(|k| k.iter().map(|&item| (item, BTreeSet::new())).collect())
        .collect();
    for set in la[0].values_mut() {
        set.insert(g.eof());
    }

    let hash = BTreeSet::from([HASH]);
    let mut propagate: Vec<((usize, Item), (usize, Item))> = Vec::new();
    for (state, kernel) in lr0.kernels.iter().enumerate() {
        for &k in kernel {
            for (item, las) in g.closure1([(k, &hash)]) {
                let Some(sym) = g.next_symbol(item) else {
                    continue;
                };
                let Some(&target) = lr0.transitions[state].get(&sym) else {
                    continue;
                };
                let moved = Item {
                    prod: item.prod,
                    dot: item.dot + 1,
                };
                for a in las {
                    if a == HASH {
                        propagate.push(((state, k), (target, moved)));
                    } else {
                        la[target].entry(moved).or_default().insert(a);
                    }
                }
            }
        }
    }
    log::debug!("{} propagation links", propagate.len());

    let mut changed = true;
    while changed {
        changed = false;
        for &((s, k), (t, m)) in &propagate {
            let src = la[s].get(&k).cloned().unwrap_or_default();
            let dst = la[t].entry(m).or_default();
            for a in src {
                changed |= dst.insert(a);
            }
        }
    }
    la
}

/// A candidate action of a terminal cell. The derived order is the order in
/// which alternatives of a conflict are tried.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Cand {
    Accept,
    Shift(usize),
    Reduce(usize),
}

/// Candidate actions indexed by state, then terminal symbol id.
pub type Tab = Vec<Vec<BTreeSet<Cand>>>;

/// Fills the terminal columns: shifts from the LR(0) transitions, reductions
/// of complete items on their lookaheads, and accept for complete `Start`
/// items at end of input.
pub fn construct_lalr(g: &Grammar, lr0: &Lr0, la: &[Lookaheads]) -> Tab {
    let mut tab: Tab = vec![vec![BTreeSet::new(); g.n_symbols()]; lr0.kernels.len()];
    for (state, row) in tab.iter_mut().enumerate() {
        for (&sym, &target) in &lr0.transitions[state] {
            if sym >= g.n_nonterm {
                row[sym].insert(Cand::Shift(target));
            }
        }
        let items = g.closure1(la[state].iter().map(|(&item, las)| (item, las)));
        for (item, las) in items {
            let p = &g.prods[item.prod];
            if item.dot != p.len() {
                continue;
            }
            for a in las {
                if p[0] == 0 {
                    if a == g.eof() {
                        row[a].insert(Cand::Accept);
                    }
                } else {
                    row[a].insert(Cand::Reduce(item.prod));
                }
            }
        }
    }
    tab
}

/// Computes FIRST sets and nullability for all grammar symbols.
pub fn first_sets(prods: &[Vec<usize>], n_nonterm: usize, n_term: usize) -> (Vec<BTreeSet<usize>>, Vec<bool>) {
    let n_sym = n_nonterm + n_term;
    let mut first: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n_sym];
    let mut nullable = vec![false; n_sym];
    for (t, set) in first.iter_mut().enumerate().skip(n_nonterm) {
        set.insert(t);
    }
    let mut changed = true;
    while changed {
        changed = false;
        for prod in prods {
            let lhs = prod[0];
            let mut all_nullable = true;
            for &sym in &prod[1..] {
                let first_sym = first[sym].clone();
                for f in first_sym {
                    changed |= first[lhs].insert(f);
                }
                if !nullable[sym] {
                    all_nullable = false;
                    break;
                }
            }
            if all_nullable && !nullable[lhs] {
                nullable[lhs] = true;
                changed = true;
            }
        }
    }
    (first, nullable)
}

/// Writes the productions, one per line.
///
/// ```text
/// PS,<number of productions>
///
/// P,<index>,<LHS> -> <RHS symbols>
/// ```
pub fn write_prods<W: Write>(out: &mut W, prods: &[Vec<usize>], tokens: &[String]) -> io::Result<()> {
    writeln!(out, "PS,{}\n", prods.len())?;
    for (i, prod) in prods.iter().enumerate() {
        write!(out, "P,{},", i)?;
        for (j, t) in prod.iter().enumerate() {
            write!(out, "{} ", tokens[*t])?;
            if j == 0 {
                write!(out, "-> ")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Writes every state's kernel items with their lookaheads.
pub fn write_set<W: Write>(out: &mut W, la: &[Lookaheads], prods: &[Vec<usize>], tokens: &[String]) -> io::Result<()> {
    writeln!(out, "CS,{}\n", la.len())?;
    for (i, state) in la.iter().enumerate() {
        for (item, lookaheads) in state {
            write!(out, "C,{},", i)?;
            let p = &prods[item.prod];
            for (j, t) in p.iter().enumerate() {
                if j == item.dot {
                    write!(out, ". ")?;
                }
                write!(out, "{} ", tokens[*t])?;
                if j == 0 {
                    write!(out, "-> ")?;
                }
            }
            if p.len() == item.dot {
                write!(out, ". ")?;
            }
            let names: Vec<&str> = lookaheads.iter().map(|&a| tokens[a].as_str()).collect();
            writeln!(out, "[{}]", names.join(", "))?;
        }
        writeln!(out)?;
    }
    Ok(())
}
