//! # lalrbt-java
//!
//! A Java subset parser built on the **lalrbt** runtime: a complete example
//! of a grammar data product, from source text to a typed syntax tree.
//!
//! ## Overview
//!
//! - [`lexer`]: a logos tokenizer producing [`JavaToken`] kinds, with
//!   whitespace and comments kept as adjuncts of the following token.
//! - [`parser`]: the tables generated from `java.g` at build time, the
//!   tree-building [`JavaSemantics`] and the [`JavaParser`] front end.
//! - [`ast`]: the closed [`JavaKind`] enum, the [`JavaVisitor`] with one
//!   `visit_*`/`end_visit_*` pair per kind and a [`TreePrinter`].
//!
//! ## Example
//!
//! ```rust
//! use lalrbt_java::{JavaKind, JavaParser, ParseOptions};
//!
//! let parser = JavaParser::try_new().unwrap();
//! let parse = parser.parse("class A { int x; }", &ParseOptions::default()).unwrap();
//! let root = parse.root().expect("accepted");
//! assert_eq!(parse.ast().kind(root), JavaKind::CompilationUnit);
//!
//! let parse = parser.parse("class A { int x", &ParseOptions::default()).unwrap();
//! let report = parse.report(&parser).unwrap().to_string();
//! assert!(report.contains("unexpected end of input"));
//! ```
pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{JavaAst, JavaKind, JavaVisitor, TreePrinter, accept};
pub use error::JavaError;
pub use lexer::{JavaLexer, JavaToken};
pub use parser::parser_data::{ProdID, TokenID};
pub use parser::{JavaEntry, JavaParse, JavaParser, JavaSemantics, ParseOptions};
