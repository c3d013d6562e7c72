//! Test fixtures: tables compiled from small grammars and a word lexer.

use crate::{
    Action, Ast, ConflictId, EntryPoint, LexError, Lexeme, Lexer, ListOrder, NodeId, ParseTable, Rhs,
    RuleId, RuleInfo, Semantics, Slot, StateId, SymbolId, TableData, TokenRange, TokenStream,
};
use lalrbt_gen::{Act, GenOptions};

pub(crate) fn table(grammar: &str) -> ParseTable {
    table_with(grammar, true)
}

pub(crate) fn table_with(grammar: &str, backtrack: bool) -> ParseTable {
    let options = GenOptions {
        backtrack,
        ..GenOptions::default()
    };
    let auto = lalrbt_gen::compile(grammar, &options).expect("grammar compiles");
    let conv = |act: &Act| match *act {
        Act::Error => Action::Error,
        Act::Accept => Action::Accept,
        Act::Shift(s) => Action::Shift(StateId(s as u16)),
        Act::Reduce(r) => Action::Reduce(RuleId(r as u16)),
        Act::Conflict(c) => Action::Conflict(ConflictId(c as u16)),
        Act::Goto(s) => Action::Goto(StateId(s as u16)),
    };
    let symbols: Vec<&str> = auto.symbols.iter().map(|s| s.as_str()).collect();
    let spellings: Vec<&str> = auto.spellings.iter().map(|s| s.as_str()).collect();
    let rules: Vec<RuleInfo<'_>> = auto
        .rules
        .iter()
        .map(|r| RuleInfo {
            lhs: SymbolId(r.lhs as u16),
            arity: r.rhs.len() as u16,
            label: &r.label,
        })
        .collect();
    let actions: Vec<Action> = auto.states.iter().flatten().map(conv).collect();
    let conflicts: Vec<Vec<Action>> = auto
        .conflicts
        .iter()
        .map(|c| c.iter().map(conv).collect())
        .collect();
    let conflict_refs: Vec<&[Action]> = conflicts.iter().map(|c| c.as_slice()).collect();
    let entries: Vec<EntryPoint> = auto
        .entries
        .iter()
        .map(|&(marker, nonterminal)| EntryPoint {
            marker: SymbolId(marker as u16),
            nonterminal: SymbolId(nonterminal as u16),
        })
        .collect();
    ParseTable::try_new(TableData {
        symbols: &symbols,
        spellings: &spellings,
        n_nonterminals: auto.n_nonterminals,
        rules: &rules,
        actions: &actions,
        conflicts: &conflict_refs,
        eof: SymbolId(auto.eof as u16),
        entries: &entries,
        backtrack: auto.backtrack,
    })
    .expect("table validates")
}

/// Tokenizes `source` with [`WordLexer`] and maps it onto `table`.
pub(crate) fn stream(table: &ParseTable, source: &str) -> TokenStream {
    let mut stream = TokenStream::tokenize(WordLexer::new(source)).expect("lexes");
    stream.remap_terminal_symbols(table).expect("maps");
    stream
}

pub(crate) const WORDS: &[&str] = &[
    "end", "a", "b", "c", "d", "x", "y", "plus", "times", "lp", "rp", "if", "then", "else",
    "semi", "comment", "ws",
];

const COMMENT: u16 = 15;
const WS: u16 = 16;

/// Whitespace separated words, `#` line comments.
pub(crate) struct WordLexer<'s> {
    source: &'s str,
    pos: usize,
    emit_end: bool,
    done: bool,
}

impl<'s> WordLexer<'s> {
    pub(crate) fn new(source: &'s str) -> Self {
        Self {
            source,
            pos: 0,
            emit_end: true,
            done: false,
        }
    }

    pub(crate) fn without_end(source: &'s str) -> Self {
        Self {
            emit_end: false,
            ..Self::new(source)
        }
    }
}

impl Lexer for WordLexer<'_> {
    fn kind_names() -> &'static [&'static str] {
        WORDS
    }

    fn source(&self) -> &str {
        self.source
    }

    fn try_next(&mut self) -> Result<Option<Lexeme>, LexError> {
        if self.done {
            return Ok(None);
        }
        let start = self.pos;
        let rest = &self.source[start..];
        let Some(first) = rest.chars().next() else {
            self.done = true;
            return Ok(self.emit_end.then_some(Lexeme::Token {
                kind: 0,
                start,
                end: start,
            }));
        };
        let len = if first.is_whitespace() {
            rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len())
        } else if first == '#' {
            rest.find('\n').unwrap_or(rest.len())
        } else {
            rest.find(char::is_whitespace).unwrap_or(rest.len())
        };
        self.pos += len;
        let end = self.pos;
        if first.is_whitespace() {
            return Ok(Some(Lexeme::Adjunct { kind: WS, start, end }));
        }
        if first == '#' {
            return Ok(Some(Lexeme::Adjunct {
                kind: COMMENT,
                start,
                end,
            }));
        }
        let word = &self.source[start..end];
        match WORDS[1..COMMENT as usize].iter().position(|w| *w == word) {
            Some(i) => Ok(Some(Lexeme::Token {
                kind: i as u16 + 1,
                start,
                end,
            })),
            None => Err(LexError::new(format!("unknown word {word:?}"), None)),
        }
    }
}

/// Semantics that renders each reduction as `(label children..)`.
pub(crate) struct Sexpr<'a> {
    pub(crate) table: &'a ParseTable,
    pub(crate) stream: &'a TokenStream,
}

impl Semantics for Sexpr<'_> {
    type Node = std::string::String;

    fn reduce(&mut self, rule: RuleId, rhs: Rhs<'_, Self::Node>, _: TokenRange) -> anyhow::Result<Slot<Self::Node>> {
        let mut parts = vec![self.table.rule(rule).label.to_string()];
        for frame in rhs.frames() {
            match &frame.slot {
                Slot::Token(i) => parts.push(self.stream.text(*i).to_string()),
                Slot::Node(s) => parts.push(s.clone()),
                Slot::Absent => parts.push("_".into()),
            }
        }
        Ok(Slot::Node(format!("({})", parts.join(" "))))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TreeKind {
    Token,
    List,
    Rule(RuleId),
}

/// Semantics that build an [`Ast`]. Rules labelled `list..` build
/// right-recursive lists: `listOne: L -> X` starts one, `listMore: L -> X L`
/// extends it.
pub(crate) struct Tree<'a> {
    pub(crate) table: &'a ParseTable,
    pub(crate) ast: Ast<TreeKind>,
}

impl<'a> Tree<'a> {
    pub(crate) fn new(table: &'a ParseTable) -> Self {
        Self { table, ast: Ast::new() }
    }

    fn child(&mut self, slot: Slot<NodeId>) -> Option<NodeId> {
        match slot {
            Slot::Token(i) => Some(self.ast.new_token(TreeKind::Token, i)),
            Slot::Node(n) => Some(n),
            Slot::Absent => None,
        }
    }

    /// `(kind children..)` with token leaves as their index.
    pub(crate) fn render(&self, id: NodeId) -> std::string::String {
        let mut parts = vec![match self.ast.kind(id) {
            TreeKind::Token => return format!("{}", self.ast.left_token(id)),
            TreeKind::List => "list".to_string(),
            TreeKind::Rule(r) => self.table.rule(r).label.to_string(),
        }];
        for child in self.ast.all_children(id) {
            parts.push(child.map_or("_".into(), |c| self.render(c)));
        }
        format!("({})", parts.join(" "))
    }
}

impl Semantics for Tree<'_> {
    type Node = NodeId;

    fn reduce(&mut self, rule: RuleId, rhs: Rhs<'_, NodeId>, range: TokenRange) -> anyhow::Result<Slot<NodeId>> {
        let table = self.table;
        let label = table.rule(rule).label.as_str();
        if label.starts_with("list") {
            let (item, list) = match rhs.len() {
                1 => (rhs.take(0), None),
                2 => (rhs.take(0), rhs.node(1)),
                n => anyhow::bail!("list rule {label} has {n} symbols"),
            };
            let list = match list {
                Some(list) => list,
                None => self.ast.new_list(TreeKind::List, ListOrder::Reversed, range),
            };
            if let Some(item) = self.child(item) {
                self.ast.list_push(list, item);
            }
            return Ok(Slot::Node(list));
        }
        let children: Vec<Option<NodeId>> = (0..rhs.len()).map(|i| self.child(rhs.take(i))).collect();
        Ok(Slot::Node(self.ast.new_node(TreeKind::Rule(rule), range, children)))
    }
}
