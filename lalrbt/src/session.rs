//! Parse sessions: the entry points that tie the engines together.
//!
//! A [`ParseSession`] owns one token stream and one semantic-action
//! implementation (and with it whatever arena the semantics build into) and
//! borrows a shared [`ParseTable`]. Syntax errors are not errors here: a
//! parse returns [`ParseOutcome::Rejected`] with a [`Diagnostic`], and
//! [`ParseError`] is reserved for cancellation, table inconsistencies and
//! failing semantic actions.

use crate::{
    BacktrackingEngine, ConfigError, DeterministicEngine, Diagnostic, DiagnosticEngine, EngineOutcome, Entry,
    FirstAlternative, FuzzyOutcome, Monitor, ParseError, ParseTable, ParserStats, Repairs, Semantics, Slot,
    SymbolId, TokenRange, TokenStream,
};

/// A successful parse.
#[derive(Debug, Clone)]
pub struct Parsed<V> {
    /// Value of the goal (or entry) symbol.
    pub root: Slot<V>,
    /// Tokens covered by `root`, the end-of-file token excluded.
    pub range: TokenRange,
    /// Token substitutions the parse needed, empty for well-formed input.
    pub repairs: Repairs,
}

#[derive(Debug, Clone)]
pub enum ParseOutcome<V> {
    Accepted(Parsed<V>),
    Rejected(Diagnostic),
}

impl<V> ParseOutcome<V> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ParseOutcome::Accepted(_))
    }

    pub fn parsed(&self) -> Option<&Parsed<V>> {
        match self {
            ParseOutcome::Accepted(p) => Some(p),
            ParseOutcome::Rejected(_) => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseOutcome::Accepted(_) => None,
            ParseOutcome::Rejected(d) => Some(d),
        }
    }
}

/// One compilation unit being parsed.
///
/// # Overview
/// Every entry point restarts from the stream's first token, so a session
/// may be parsed several times (from different entry points, say). Values
/// built by earlier parses stay in the semantics; clear them through
/// [`semantics_mut`](Self::semantics_mut) when that matters.
///
/// # Fields
/// - `table`: shared, read-only; many sessions may use it at once.
/// - `stream`: the unit's tokens, remapped onto `table`.
/// - `semantics`: the semantic actions and whatever they build into.
/// - `stats`: counters summed over every parse of the session.
pub struct ParseSession<'t, S: Semantics> {
    table: &'t ParseTable,
    stream: TokenStream,
    semantics: S,
    stats: ParserStats,
}

impl<'t, S: Semantics> ParseSession<'t, S> {
    /// Puts a session together.
    ///
    /// Fails if the stream was never remapped onto the table, or if the
    /// table cannot drive a backtracking parse.
    pub fn new(table: &'t ParseTable, stream: TokenStream, semantics: S) -> Result<Self, ConfigError> {
        table.check_backtrack_capable()?;
        if !stream.is_mapped() {
            return Err(ConfigError::Unmapped);
        }
        Ok(Self {
            table,
            stream,
            semantics,
            stats: ParserStats::default(),
        })
    }

    pub fn table(&self) -> &'t ParseTable {
        self.table
    }

    pub fn stream(&self) -> &TokenStream {
        &self.stream
    }

    pub fn semantics(&self) -> &S {
        &self.semantics
    }

    pub fn semantics_mut(&mut self) -> &mut S {
        &mut self.semantics
    }

    /// Counters accumulated over every parse of this session.
    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    pub fn into_parts(self) -> (TokenStream, S) {
        (self.stream, self.semantics)
    }

    /// Parses the whole unit from the goal symbol.
    pub fn fuzzy_parse(
        &mut self,
        error_repair_budget: usize,
        monitor: Option<&dyn Monitor>,
    ) -> Result<ParseOutcome<S::Node>, ParseError> {
        self.fuzzy(Entry::Goal, error_repair_budget, monitor)
    }

    /// Parses the whole unit as the nonterminal started by `marker`.
    pub fn fuzzy_parse_entry(
        &mut self,
        marker: SymbolId,
        error_repair_budget: usize,
        monitor: Option<&dyn Monitor>,
    ) -> Result<ParseOutcome<S::Node>, ParseError> {
        let entry = self.marker_entry(marker)?;
        self.fuzzy(entry, error_repair_budget, monitor)
    }

    /// Parses the whole unit as `nonterminal`, looked up by name.
    pub fn fuzzy_parse_named(
        &mut self,
        nonterminal: &str,
        error_repair_budget: usize,
        monitor: Option<&dyn Monitor>,
    ) -> Result<ParseOutcome<S::Node>, ParseError> {
        let marker = self
            .table
            .symbol(nonterminal)
            .and_then(|nt| self.table.entry_marker(nt))
            .ok_or_else(|| ConfigError::UnknownEntry(nonterminal.into()))?;
        self.fuzzy(Entry::Marker(marker), error_repair_budget, monitor)
    }

    /// One deterministic pass, conflicts settled by their first alternative.
    pub fn parse_deterministic(&mut self, entry: Entry) -> Result<ParseOutcome<S::Node>, ParseError> {
        if let Entry::Marker(marker) = entry {
            self.marker_entry(marker)?;
        }
        let start = self.stream.first_token();
        self.stream.reset(start);
        let mut engine = DeterministicEngine::new(self.table);
        let outcome = engine.run(
            &mut self.stream,
            &mut self.semantics,
            &mut FirstAlternative,
            entry,
            &Repairs::new(),
        );
        self.stats.merge(engine.stats());
        match outcome? {
            EngineOutcome::Accepted(frame) => Ok(ParseOutcome::Accepted(Parsed {
                root: frame.slot,
                range: frame.range,
                repairs: Repairs::new(),
            })),
            EngineOutcome::Rejected { token } => {
                log::debug!("deterministic parse rejected token {token}");
                let fallback = (token, vec![engine.states().to_vec()]);
                self.rejected(entry, start, &Repairs::new(), fallback)
            }
        }
    }

    /// Runs the diagnosis pass over the whole unit.
    ///
    /// Returns `None` if the unit parses.
    pub fn diagnose(&mut self, entry: Entry) -> Result<Option<Diagnostic>, ParseError> {
        let start = self.stream.first_token();
        DiagnosticEngine::new(self.table).diagnose(&mut self.stream, entry, start, &Repairs::new())
    }

    fn marker_entry(&self, marker: SymbolId) -> Result<Entry, ConfigError> {
        if self.table.is_marker(marker) {
            Ok(Entry::Marker(marker))
        } else {
            Err(ConfigError::UnknownEntry(self.table.symbol_name(marker).into()))
        }
    }

    fn fuzzy(
        &mut self,
        entry: Entry,
        budget: usize,
        monitor: Option<&dyn Monitor>,
    ) -> Result<ParseOutcome<S::Node>, ParseError> {
        let start = self.stream.first_token();
        self.stream.reset(start);
        let mut engine = BacktrackingEngine::new(self.table, budget)?;
        let outcome = engine.parse(&mut self.stream, &mut self.semantics, entry, monitor);
        self.stats.merge(engine.stats());
        match outcome? {
            FuzzyOutcome::Accepted { frame, repairs } => {
                if !repairs.is_empty() {
                    log::debug!("accepted after {} repairs", repairs.len());
                }
                Ok(ParseOutcome::Accepted(Parsed {
                    root: frame.slot,
                    range: frame.range,
                    repairs,
                }))
            }
            FuzzyOutcome::Failed(failure) => {
                let fallback = (failure.token, failure.configs().to_vec());
                self.rejected(entry, start, &failure.repairs, fallback)
            }
        }
    }

    /// Diagnoses a failed parse and leaves the cursor on the offending token.
    fn rejected(
        &mut self,
        entry: Entry,
        start: usize,
        repairs: &Repairs,
        fallback: (usize, Vec<Vec<crate::StateId>>),
    ) -> Result<ParseOutcome<S::Node>, ParseError> {
        let engine = DiagnosticEngine::new(self.table);
        if let Some(diagnostic) = engine.diagnose(&mut self.stream, entry, start, repairs)? {
            return Ok(ParseOutcome::Rejected(diagnostic));
        }
        // the parse failed where a simulation of every alternative accepts;
        // fall back on the stacks the parse itself was left with
        let (index, configs) = fallback;
        log::warn!("diagnosis found no error, reporting token {index} from the parse");
        self.stream.reset(index);
        let diagnostic = engine.explain(&self.stream, index, &configs, repairs)?;
        Ok(ParseOutcome::Rejected(diagnostic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Tree, TreeKind, stream, table, table_with};
    use crate::{CancelFlag, NodeId};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const LISTS: &str = "\
%entry Item
unit: Unit -> Decls
listMore: Decls -> Item Decls
listOne: Decls -> Item
pair: Item -> lp Word Word rp
word: Item -> Word
a: Word -> a
b: Word -> b
";

    fn session<'t>(t: &'t crate::ParseTable, source: &str) -> ParseSession<'t, Tree<'t>> {
        ParseSession::new(t, stream(t, source), Tree::new(t)).unwrap()
    }

    fn kinds(tree: &Tree, id: NodeId) -> Vec<TreeKind> {
        tree.ast.children(id).into_iter().map(|c| tree.ast.kind(c)).collect()
    }

    #[test]
    fn whole_unit_spans_every_token() {
        init_logger();
        let t = table(LISTS);
        let mut s = session(&t, "a lp a b rp b");
        let outcome = s.fuzzy_parse(0, None).unwrap();
        let parsed = outcome.parsed().unwrap();
        assert_eq!(parsed.range, TokenRange::new(0, 6));
        let root = *parsed.root.node().unwrap();
        let tree = s.semantics();
        assert_eq!(tree.ast.range(root), TokenRange::new(0, 6));
        let decls = tree.ast.children(root)[0];
        assert_eq!(tree.ast.kind(decls), TreeKind::List);
        assert_eq!(tree.ast.children(decls).len(), 3);
        for child in tree.ast.children(decls) {
            assert_eq!(tree.ast.parent(child), Some(decls));
            assert!(tree.ast.range(decls).contains(&tree.ast.range(child)));
        }
        let firsts: Vec<usize> = tree
            .ast
            .children(decls)
            .iter()
            .map(|&c| tree.ast.left_token(c))
            .collect();
        assert_eq!(firsts, [0, 1, 5]);
    }

    #[test]
    fn rejected_input_yields_a_diagnostic() {
        init_logger();
        let t = table(LISTS);
        let mut s = session(&t, "a lp a rp");
        let outcome = s.fuzzy_parse(0, None).unwrap();
        let diagnostic = outcome.diagnostic().unwrap();
        assert_eq!(diagnostic.token_index, 3);
        assert!(!diagnostic.expected.is_empty());
        assert_eq!(s.stream().position(), 3);
        assert!(diagnostic.expected.contains(&t.symbol("a").unwrap()));
    }

    #[test]
    fn repairs_are_reported() {
        init_logger();
        let t = table(LISTS);
        let mut s = session(&t, "a lp a lp rp");
        let outcome = s.fuzzy_parse(1, None).unwrap();
        let parsed = outcome.parsed().unwrap();
        assert_eq!(parsed.repairs.len(), 1);
        assert_eq!(parsed.repairs.keys().next(), Some(&3));
        assert_eq!(s.stats().repairs, 1);
    }

    #[test]
    fn entry_point_parses_a_fragment() {
        init_logger();
        let t = table(LISTS);
        let item = t.symbol("Item").unwrap();
        let marker = t.entry_marker(item).unwrap();
        let mut s = session(&t, "lp a b rp");
        let outcome = s.fuzzy_parse_entry(marker, 0, None).unwrap();
        let root = *outcome.parsed().unwrap().root.node().unwrap();
        assert_eq!(s.semantics().ast.range(root), TokenRange::new(0, 4));
        assert_eq!(kinds(s.semantics(), root).len(), 4);

        let by_name = s.fuzzy_parse_named("Item", 0, None).unwrap();
        assert!(by_name.is_accepted());

        let word = t.symbol("a").unwrap();
        assert!(matches!(
            s.fuzzy_parse_entry(word, 0, None),
            Err(ParseError::Config(ConfigError::UnknownEntry(_)))
        ));
        assert!(matches!(
            s.fuzzy_parse_named("Word", 0, None),
            Err(ParseError::Config(ConfigError::UnknownEntry(_)))
        ));
    }

    #[test]
    fn deterministic_and_fuzzy_agree() {
        init_logger();
        let t = table(LISTS);
        let mut fuzzy = session(&t, "lp a a rp b a");
        let mut plain = session(&t, "lp a a rp b a");
        let f = fuzzy.fuzzy_parse(0, None).unwrap();
        let p = plain.parse_deterministic(Entry::Goal).unwrap();
        let (f, p) = (f.parsed().unwrap(), p.parsed().unwrap());
        assert_eq!(f.range, p.range);
        assert_eq!(
            fuzzy.semantics().render(*f.root.node().unwrap()),
            plain.semantics().render(*p.root.node().unwrap())
        );
    }

    #[test]
    fn first_alternative_rejection_names_what_it_expected() {
        init_logger();
        // `d x c` is valid, but only through the second reduction of `d`
        let t = table(
            "\
viaP: S -> P x y
viaQ: S -> Q x c
p: P -> d
q: Q -> d
",
        );
        let mut s = session(&t, "d x c");
        let outcome = s.parse_deterministic(Entry::Goal).unwrap();
        let diagnostic = outcome.diagnostic().unwrap();
        assert_eq!(diagnostic.token_index, 2);
        assert_eq!(s.stream().position(), 2);
        assert!(diagnostic.expected.contains(&t.symbol("y").unwrap()));

        assert!(s.fuzzy_parse(0, None).unwrap().is_accepted());
    }

    #[test]
    fn diagnosis_is_deterministic() {
        init_logger();
        let t = table(LISTS);
        let mut s = session(&t, "a lp b");
        let first = s.diagnose(Entry::Goal).unwrap().unwrap();
        let second = s.diagnose(Entry::Goal).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.token_index, s.stream().last_token());
    }

    #[test]
    fn cancelled_session() {
        init_logger();
        let t = table(LISTS);
        let flag = CancelFlag::new();
        flag.cancel();
        let mut s = session(&t, "a lp a rp");
        assert!(matches!(s.fuzzy_parse(1, Some(&flag)), Err(ParseError::Cancelled)));
    }

    #[test]
    fn construction_checks() {
        let t = table_with(LISTS, false);
        assert!(matches!(
            ParseSession::new(&t, stream(&t, "a"), Tree::new(&t)),
            Err(ConfigError::NotBacktrackCapable)
        ));
        let t = table(LISTS);
        let raw = crate::TokenStream::tokenize(crate::testing::WordLexer::new("a")).unwrap();
        assert!(matches!(
            ParseSession::new(&t, raw, Tree::new(&t)),
            Err(ConfigError::Unmapped)
        ));
    }
}
