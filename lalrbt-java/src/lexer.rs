//! # Java Lexer
//!
//! A [`logos`] scanner for the Java subset in `java.g`. Every kind it emits
//! is named like the grammar terminal it stands for (`semicolon`, `eqEq`,
//! `identifier`, ...), which is all [`TokenStream::remap_terminal_symbols`]
//! needs to wire the two together. Whitespace and comments are emitted as
//! adjuncts and stay available through the stream.
//!
//! [`TokenStream::remap_terminal_symbols`]: lalrbt::TokenStream::remap_terminal_symbols

use lalrbt::{LexError, Lexeme, Lexer, Position, Span};
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaToken {
    #[token("abstract")]
    Abstract,
    #[token("boolean")]
    Boolean,
    #[token("break")]
    Break,
    #[token("byte")]
    Byte,
    #[token("catch")]
    Catch,
    #[token("char")]
    Char,
    #[token("class")]
    Class,
    #[token("continue")]
    Continue,
    #[token("do")]
    Do,
    #[token("double")]
    Double,
    #[token("else")]
    Else,
    #[token("extends")]
    Extends,
    #[token("false")]
    False,
    #[token("final")]
    Final,
    #[token("finally")]
    Finally,
    #[token("float")]
    Float,
    #[token("for")]
    For,
    #[token("if")]
    If,
    #[token("implements")]
    Implements,
    #[token("import")]
    Import,
    #[token("instanceof")]
    Instanceof,
    #[token("int")]
    Int,
    #[token("interface")]
    Interface,
    #[token("long")]
    Long,
    #[token("new")]
    New,
    #[token("null")]
    Null,
    #[token("package")]
    Package,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("public")]
    Public,
    #[token("return")]
    Return,
    #[token("short")]
    Short,
    #[token("static")]
    Static,
    #[token("super")]
    Super,
    #[token("this")]
    This,
    #[token("throw")]
    Throw,
    #[token("throws")]
    Throws,
    #[token("true")]
    True,
    #[token("try")]
    Try,
    #[token("void")]
    Void,
    #[token("while")]
    While,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Identifier,
    #[regex(r"[0-9][0-9_]*[lL]?")]
    #[regex(r"0[xX][0-9a-fA-F][0-9a-fA-F_]*[lL]?")]
    IntLiteral,
    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+[fFdD]?")]
    #[regex(r"[0-9][0-9_]*[fFdD]")]
    FloatLiteral,
    #[regex(r"'([^'\\\n]|\\[^\n][^'\n]*)'")]
    CharLiteral,
    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    StringLiteral,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    AsteriskEq,
    #[token("/=")]
    SlashEq,

    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBrack,
    #[token("]")]
    RightBrack,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("=")]
    Equals,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,
    #[token("!")]
    Exclamation,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[regex(r"[ \t\r\n\x0C]+")]
    Whitespace,
    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,
}

/// Runs a block comment on to its closing `*/`. Block comments do not nest.
fn block_comment(lex: &mut logos::Lexer<JavaToken>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

/// Kind names, indexed by kind. Kind 0 is the end-of-file token, the rest
/// follow the declaration order of [`JavaToken`].
pub const KIND_NAMES: &[&str] = &[
    "end",
    "abstract",
    "boolean",
    "break",
    "byte",
    "catch",
    "char",
    "class",
    "continue",
    "do",
    "double",
    "else",
    "extends",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "super",
    "this",
    "throw",
    "throws",
    "true",
    "try",
    "void",
    "while",
    "identifier",
    "intLiteral",
    "floatLiteral",
    "charLiteral",
    "stringLiteral",
    "eqEq",
    "notEq",
    "lessEq",
    "greaterEq",
    "andAnd",
    "orOr",
    "plusPlus",
    "minusMinus",
    "plusEq",
    "minusEq",
    "asteriskEq",
    "slashEq",
    "dot",
    "semicolon",
    "comma",
    "leftParen",
    "rightParen",
    "leftBrack",
    "rightBrack",
    "leftBrace",
    "rightBrace",
    "equals",
    "lessThan",
    "greaterThan",
    "exclamation",
    "tilde",
    "question",
    "colon",
    "plus",
    "minus",
    "asterisk",
    "slash",
    "percent",
    "whitespace",
    "lineComment",
    "blockComment",
];

impl JavaToken {
    /// Index into [`KIND_NAMES`].
    #[inline]
    pub fn kind(self) -> u16 {
        self as u16 + 1
    }

    pub fn name(self) -> &'static str {
        KIND_NAMES[self.kind() as usize]
    }

    pub fn is_adjunct(self) -> bool {
        matches!(
            self,
            JavaToken::Whitespace | JavaToken::LineComment | JavaToken::BlockComment
        )
    }
}

pub struct JavaLexer<'s> {
    inner: logos::Lexer<'s, JavaToken>,
    finished: bool,
}

impl<'s> JavaLexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            inner: JavaToken::lexer(source),
            finished: false,
        }
    }

    fn position(&self, offset: usize) -> Position {
        let before = &self.inner.source()[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        Position::new(line, before[line_start..].chars().count() + 1)
    }
}

impl Lexer for JavaLexer<'_> {
    fn kind_names() -> &'static [&'static str] {
        KIND_NAMES
    }

    fn source(&self) -> &str {
        self.inner.source()
    }

    fn try_next(&mut self) -> Result<Option<Lexeme>, LexError> {
        if self.finished {
            return Ok(None);
        }
        let Some(result) = self.inner.next() else {
            self.finished = true;
            let end = self.inner.source().len();
            return Ok(Some(Lexeme::Token { kind: 0, start: end, end }));
        };
        let range = self.inner.span();
        let token = result.map_err(|()| {
            let span = Span::new(self.position(range.start), self.position(range.end));
            let slice = self.inner.slice();
            let message = if slice.starts_with("/*") {
                "unterminated block comment".to_string()
            } else {
                format!("unexpected character {slice:?}")
            };
            LexError::new(message, Some(span))
        })?;
        let (kind, start, end) = (token.kind(), range.start, range.end);
        Ok(Some(if token.is_adjunct() {
            Lexeme::Adjunct { kind, start, end }
        } else {
            Lexeme::Token { kind, start, end }
        }))
    }
}
