//! Lexer for grammar files.
//!
//! A grammar file is a sequence of lines. Each line is one of
//!
//! ```text
//! label: Lhs -> sym sym ...      -- a labelled production
//! Lhs -> sym sym ...             -- an unlabelled production
//! %entry Nonterminal ...         -- parseable in isolation
//! %spell terminal "text"         -- display spelling of a terminal
//! ```
//!
//! Capitalized identifiers are nonterminals, lowercase identifiers are
//! terminals, and single punctuation characters are terminals named after
//! the character through [`SYM_NAMES`] (`;` is `semicolon`). `--` starts a
//! comment that runs to the end of the line.
//!
//! The lexer is built on [`logos`] and interns every name it meets into a
//! [`LexContext`].

use crate::symtab::Symtab;
use anyhow::{Result, bail};
use logos::Logos;
use std::collections::{BTreeMap, HashMap};

/// Symbol tables filled while lexing a grammar.
#[derive(Default, Debug)]
pub struct LexContext {
    pub terms: Symtab,
    pub nonterms: Symtab,
    pub prod_labels: Symtab,
    /// Spellings of punctuation terminals, by terminal index.
    pub spellings: BTreeMap<usize, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Entry,
    Spell,
}

/// Tokens produced by the grammar lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A production label (`expr1:`).
    ProdLabel(usize),
    /// A nonterminal (`Expr`).
    NonTerm(usize),
    /// `->`
    Prod,
    /// A terminal (`plus`, `+`).
    Term(usize),
    /// `%entry` or `%spell`.
    Directive(Directive),
    /// A double quoted string, quotes removed.
    Str(String),
    /// End of line, the rule terminator.
    LineFeed,
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\f\r]+")]
enum LogosToken {
    #[regex(r"[\n]")]
    LineFeed,

    #[regex(r"--[^\n]*")]
    Comment,

    #[regex(r"->")]
    Prod,

    #[regex(r"%[a-z]+")]
    Directive,

    #[regex(r#""[^"\n]*""#)]
    Str,

    #[regex(r"[a-z]([a-zA-Z0-9])*:")]
    ProdLabel,

    #[regex(r"[a-z]([a-zA-Z0-9])*")]
    Atom,

    #[regex(r"[A-Z][a-zA-Z0-9]*")]
    Var,

    #[regex(r###"[-~`!@#$%^&*+=|\\<>?/;\(\)\[\]{},\.'":]"###)]
    Sym,
}

/// Names of single-character terminals, as used in generated code and by
/// lexers that want to match the grammar by name.
pub const SYM_NAMES: &[(char, &str)] = &[
    ('.', "dot"),
    ('-', "minus"),
    ('~', "tilde"),
    ('`', "backtick"),
    ('!', "exclamation"),
    ('@', "at"),
    ('#', "hash"),
    ('$', "dollar"),
    ('%', "percent"),
    ('^', "caret"),
    ('&', "ampersand"),
    ('*', "asterisk"),
    ('+', "plus"),
    ('=', "equals"),
    ('|', "pipe"),
    ('\\', "backslash"),
    ('<', "lessThan"),
    ('>', "greaterThan"),
    ('?', "question"),
    ('/', "slash"),
    (';', "semicolon"),
    ('(', "leftParen"),
    (')', "rightParen"),
    ('[', "leftBrack"),
    (']', "rightBrack"),
    ('{', "leftBrace"),
    ('}', "rightBrace"),
    (',', "comma"),
    ('\'', "singleQuote"),
    ('"', "doubleQuote"),
    (':', "colon"),
];

pub struct Lexer<'source> {
    inner: logos::Lexer<'source, LogosToken>,
    sym_names: HashMap<char, &'static str>,
    line: usize,
}

impl<'source> Lexer<'source> {
    pub fn new(input: &'source str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            sym_names: SYM_NAMES.iter().cloned().collect(),
            line: 1,
        }
    }

    /// Current line, 1-based.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The next token, or `None` at end of input.
    pub fn next_token(&mut self, ctx: &mut LexContext) -> Result<Option<Token>> {
        while let Some(kind) = self.inner.next() {
            let slice = self.inner.slice();
            let Ok(token) = kind else {
                bail!("line {}: unexpected input {:?}", self.line, slice);
            };
            let token = match token {
                LogosToken::Sym => {
                    let Some(name) = slice.chars().next().and_then(|c| self.sym_names.get(&c)) else {
                        bail!("line {}: unknown symbol {:?}", self.line, slice);
                    };
                    let idx = ctx.terms.add(name);
                    ctx.spellings.entry(idx).or_insert_with(|| slice.to_owned());
                    Token::Term(idx)
                }
                LogosToken::Atom => Token::Term(ctx.terms.add(slice)),
                LogosToken::Var => Token::NonTerm(ctx.nonterms.add(slice)),
                LogosToken::ProdLabel => {
                    Token::ProdLabel(ctx.prod_labels.add(&slice[..slice.len() - 1]))
                }
                LogosToken::Directive => match &slice[1..] {
                    "entry" => Token::Directive(Directive::Entry),
                    "spell" => Token::Directive(Directive::Spell),
                    other => bail!("line {}: unknown directive %{}", self.line, other),
                },
                LogosToken::Str => Token::Str(slice[1..slice.len() - 1].to_owned()),
                LogosToken::Prod => Token::Prod,
                LogosToken::Comment => continue,
                LogosToken::LineFeed => {
                    self.line += 1;
                    Token::LineFeed
                }
            };
            return Ok(Some(token));
        }
        Ok(None)
    }

    /// Tokenizes all of `input`, returning the tokens and the line each one
    /// starts on. A final line feed is supplied if the input lacks one.
    pub fn tokenize_all(input: &'source str, ctx: &mut LexContext) -> Result<(Vec<Token>, Vec<usize>)> {
        let mut lex = Lexer::new(input);
        let mut tokens = Vec::new();
        let mut lines = Vec::new();
        loop {
            let line = lex.line();
            match lex.next_token(ctx)? {
                Some(tok) => {
                    tokens.push(tok);
                    lines.push(line);
                }
                None => break,
            }
        }
        if tokens.last().is_some_and(|t| *t != Token::LineFeed) {
            tokens.push(Token::LineFeed);
            lines.push(lex.line());
        }
        Ok((tokens, lines))
    }
}
