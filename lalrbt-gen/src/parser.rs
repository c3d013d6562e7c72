use crate::lexer::{Directive, Token};
use chumsky::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Term(usize),
    NonTerm(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub label: Option<usize>,
    pub lhs: usize,
    pub rhs: Vec<Symbol>,
}

/// One meaningful line of a grammar file.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Production(Production),
    /// `%entry A B ...`
    Entry(Vec<usize>),
    /// `%spell term "text"`
    Spell(usize, String),
}

pub type GrammarError<'a> = extra::Err<Simple<'a, Token>>;

pub fn parser<'a>() -> impl Parser<'a, &'a [Token], Vec<Line>, GrammarError<'a>> {
    let symbol = select! {
        Token::Term(t) => Symbol::Term(t),
        Token::NonTerm(n) => Symbol::NonTerm(n),
    };

    let tlist = symbol.repeated().collect::<Vec<_>>();

    let left = select! {
        Token::NonTerm(n) => n,
    };

    let prod_kw = select! { Token::Prod => () };
    let lf = select! { Token::LineFeed => () };

    let production_without_label = left
        .clone()
        .then_ignore(prod_kw.clone())
        .then(tlist.clone())
        .then_ignore(lf.clone())
        .map(|(lhs, rhs)| Production {
            label: None,
            lhs,
            rhs,
        })
        .map(|p| Some(Line::Production(p)));

    let production_with_label = select! { Token::ProdLabel(l) => l }
        .then(left.clone())
        .then_ignore(prod_kw)
        .then(tlist)
        .then_ignore(lf.clone())
        .map(|((label, lhs), rhs)| Production {
            label: Some(label),
            lhs,
            rhs,
        })
        .map(|p| Some(Line::Production(p)));

    let entry = select! { Token::Directive(Directive::Entry) => () }
        .ignore_then(left.repeated().at_least(1).collect::<Vec<_>>())
        .then_ignore(lf.clone())
        .map(|nonterms| Some(Line::Entry(nonterms)));

    let spell = select! { Token::Directive(Directive::Spell) => () }
        .ignore_then(select! { Token::Term(t) => t })
        .then(select! { Token::Str(s) => s })
        .then_ignore(lf.clone())
        .map(|(term, text)| Some(Line::Spell(term, text)));

    let empty_line = lf.map(|_| None::<Line>);

    let line = production_with_label
        .or(production_without_label)
        .or(entry)
        .or(spell)
        .or(empty_line);

    line.repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|items| items.into_iter().flatten().collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_production() {
        let tokens = vec![
            Token::ProdLabel(0),
            Token::NonTerm(1),
            Token::Prod,
            Token::Term(2),
            Token::NonTerm(3),
            Token::LineFeed,
        ];
        let lines = parser().parse(&tokens).into_result().unwrap();
        assert_eq!(
            lines,
            [Line::Production(Production {
                label: Some(0),
                lhs: 1,
                rhs: vec![Symbol::Term(2), Symbol::NonTerm(3)],
            })]
        );
    }

    #[test]
    fn empty_line_skipped() {
        let tokens = vec![Token::LineFeed];
        let lines = parser().parse(&tokens).into_result().unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn empty_rhs_and_directives() {
        let tokens = vec![
            Token::ProdLabel(10),
            Token::NonTerm(0),
            Token::Prod,
            Token::LineFeed,
            Token::Directive(Directive::Entry),
            Token::NonTerm(0),
            Token::NonTerm(2),
            Token::LineFeed,
            Token::Directive(Directive::Spell),
            Token::Term(5),
            Token::Str("==".into()),
            Token::LineFeed,
        ];
        let lines = parser().parse(&tokens).into_result().unwrap();
        assert_eq!(lines.len(), 3);
        assert!(matches!(&lines[0], Line::Production(p) if p.rhs.is_empty()));
        assert_eq!(lines[1], Line::Entry(vec![0, 2]));
        assert_eq!(lines[2], Line::Spell(5, "==".into()));
    }

    #[test]
    fn missing_arrow_is_rejected() {
        let tokens = vec![Token::NonTerm(0), Token::Term(1), Token::LineFeed];
        assert!(parser().parse(&tokens).into_result().is_err());
    }
}
