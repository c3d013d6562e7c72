//! End-to-end parses of Java sources and fragments.

use lalrbt::{Entry, NodeId, ParseOutcome, ParseSession, TokenRange};
use lalrbt_java::{
    JavaAst, JavaEntry, JavaKind, JavaParse, JavaParser, JavaSemantics, JavaVisitor, ParseOptions, accept,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parse_as(parser: &JavaParser, source: &str, entry: JavaEntry, budget: usize) -> JavaParse {
    let options = ParseOptions {
        error_repair_budget: budget,
        entry,
    };
    parser.parse(source, &options).unwrap()
}

fn parse(parser: &JavaParser, source: &str) -> JavaParse {
    parse_as(parser, source, JavaEntry::CompilationUnit, 0)
}

fn find(parse: &JavaParse, kind: JavaKind) -> Vec<NodeId> {
    let ast = parse.ast();
    ast.descendants(parse.root().unwrap())
        .into_iter()
        .filter(|&id| ast.kind(id) == kind)
        .collect()
}

#[test]
fn empty_class() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let parse = parse(&parser, "class A {}");
    assert!(parse.is_accepted());
    let root = parse.root().unwrap();
    assert_eq!(parse.ast().kind(root), JavaKind::CompilationUnit);
    assert_eq!(parse.ast().range(root), TokenRange::new(0, 4));
    assert!(parse.repairs().unwrap().is_empty());
    let class = find(&parse, JavaKind::ClassDeclaration)[0];
    let name = parse.ast().child(class, 2).unwrap();
    assert_eq!(parse.text(name), "A");
}

#[test]
fn class_with_a_field() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let parse = parse(&parser, "class A { int x; }");
    assert!(parse.is_accepted());
    let fields = find(&parse, JavaKind::FieldDeclaration);
    assert_eq!(fields.len(), 1);
    assert_eq!(parse.text(fields[0]), "int x;");
    let declarators = find(&parse, JavaKind::VariableDeclarators);
    assert_eq!(parse.ast().children(declarators[0]).len(), 1);
    assert_eq!(parse.ast().parent(declarators[0]), Some(fields[0]));
}

#[test]
fn truncated_class_reports_missing_closers() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let parse = parse(&parser, "class A { int x");
    assert!(!parse.is_accepted());
    assert_eq!(parse.root(), None);
    let diagnostic = parse.diagnostic().unwrap();
    // the end-of-file token
    assert_eq!(diagnostic.token_index, 5);
    let expected = diagnostic.expected_spellings(parser.table());
    assert!(expected.contains(&";"), "{expected:?}");
    assert!(expected.contains(&"}"), "{expected:?}");
    let report = parse.report(&parser).unwrap().to_string();
    assert!(report.starts_with("1:16: unexpected end of input"), "{report}");
}

#[test]
fn misplaced_token_is_located() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let parse = parse(&parser, "class A {\n  int x = ;\n}");
    let diagnostic = parse.diagnostic().unwrap();
    assert_eq!(parse.stream().text(diagnostic.token_index), ";");
    let report = parse.report(&parser).unwrap().to_string();
    assert!(report.starts_with("2:11: unexpected `;`"), "{report}");
}

#[test]
fn method_declaration_entry() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let parse = parse_as(&parser, "void m(){}", JavaEntry::MethodDeclaration, 0);
    assert!(parse.is_accepted());
    let root = parse.root().unwrap();
    assert_eq!(parse.ast().kind(root), JavaKind::MethodDeclaration);
    assert_eq!(parse.ast().range(root), TokenRange::new(0, 6));

    let parse = parse_as(&parser, "class A {}", JavaEntry::MethodDeclaration, 0);
    assert!(!parse.is_accepted());
    assert_eq!(parse.diagnostic().unwrap().token_index, 0);
}

#[test]
fn fragments_of_every_entry() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let cases = [
        ("int a; void f() {} A() { this.a = 1; }", JavaEntry::ClassBodyDeclarations, JavaKind::ClassBodyDeclarations),
        ("int i = 0; i++; return i;", JavaEntry::BlockStatements, JavaKind::BlockStatements),
        ("a.b(c, d[1]) * 2 + -x", JavaEntry::Expression, JavaKind::AdditiveExpression),
    ];
    for (source, entry, kind) in cases {
        let parse = parse_as(&parser, source, entry, 0);
        let root = parse.root().unwrap_or_else(|| panic!("{source}: {:?}", parse.diagnostic()));
        assert_eq!(parse.ast().kind(root), kind, "{source}");
        assert_eq!(parse.text(root), source);
    }
}

#[test]
fn diagnosis_is_deterministic() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let source = "class A { void m() { if (x) { y = (int) z } } }";
    let first = parse(&parser, source);
    let second = parse(&parser, source);
    assert_eq!(first.diagnostic(), second.diagnostic());
    assert!(first.diagnostic().is_some());
    assert_eq!(
        first.report(&parser).unwrap().to_string(),
        second.report(&parser).unwrap().to_string()
    );
}

#[test]
fn casts_and_parenthesized_expressions() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let source = "class A { void m() { a = (int) b; c = (B) d; e = (f) + g; h = (i); j = (K[]) l; } }";
    let parse = parse(&parser, source);
    assert!(parse.is_accepted(), "{:?}", parse.diagnostic());
    let casts: Vec<&str> = find(&parse, JavaKind::CastExpression)
        .into_iter()
        .map(|c| parse.text(c))
        .collect();
    assert_eq!(casts, ["(int) b", "(B) d", "(K[]) l"]);
    let parens: Vec<&str> = find(&parse, JavaKind::ParenthesizedExpression)
        .into_iter()
        .map(|p| parse.text(p))
        .collect();
    assert_eq!(parens, ["(f)", "(i)"]);
    assert!(parse.stats().backtracks > 0);
}

#[test]
fn dangling_else_attaches_to_nearest_if() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let parse = parse_as(&parser, "if (a) if (b) c(); else d();", JavaEntry::BlockStatements, 0);
    assert!(parse.is_accepted());
    let ast = parse.ast();
    let outer = find(&parse, JavaKind::IfThenStatement);
    let inner = find(&parse, JavaKind::IfThenElseStatement);
    assert_eq!((outer.len(), inner.len()), (1, 1));
    assert_eq!(ast.parent(inner[0]), Some(outer[0]));
    assert_eq!(parse.text(inner[0]), "if (b) c(); else d();");
}

#[test]
fn local_declarations_and_array_access() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let parse = parse_as(&parser, "A[] a = new A[3]; a[0] = b; int[][] m;", JavaEntry::BlockStatements, 0);
    assert!(parse.is_accepted(), "{:?}", parse.diagnostic());
    assert_eq!(find(&parse, JavaKind::LocalVariableDeclaration).len(), 2);
    assert_eq!(find(&parse, JavaKind::ArrayAccess).len(), 1);
    assert_eq!(find(&parse, JavaKind::ArrayCreation).len(), 1);
}

#[test]
fn repair_budget_gets_past_a_bad_token() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let source = "class A { int x = 1 } }";
    assert!(!parse(&parser, source).is_accepted());

    let parse = parse_as(&parser, source, JavaEntry::CompilationUnit, 1);
    assert!(parse.is_accepted(), "{:?}", parse.diagnostic());
    let repairs = parse.repairs().unwrap();
    assert_eq!(repairs.len(), 1);
    let (&index, &terminal) = repairs.iter().next().unwrap();
    assert_eq!(parse.stream().text(index), "}");
    assert_eq!(parser.table().spelling(terminal), ";");
}

#[test]
fn comments_do_not_reach_the_parser() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let source = "/** doc */ class A { // trailing\n int /* inline */ x; }";
    let parse = parse(&parser, source);
    assert!(parse.is_accepted());
    let class = find(&parse, JavaKind::ClassDeclaration)[0];
    let first = parse.ast().left_token(class);
    let comments: Vec<&str> = parse
        .stream()
        .preceding_adjuncts(first)
        .iter()
        .map(|a| parse.stream().adjunct_text(a))
        .collect();
    assert!(comments.contains(&"/** doc */"), "{comments:?}");
}

/// Counts statements and remembers the names of the methods it enters.
#[derive(Default)]
struct Census<'a> {
    parse: Option<&'a JavaParse>,
    methods: Vec<String>,
    returns: usize,
    skipped_blocks: usize,
}

impl JavaVisitor for Census<'_> {
    fn visit_method_declarator(&mut self, ast: &JavaAst, node: NodeId) -> bool {
        if let (Some(parse), Some(name)) = (self.parse, ast.child(node, 0)) {
            self.methods.push(parse.text(name).to_string());
        }
        true
    }

    fn visit_return_statement(&mut self, _: &JavaAst, _: NodeId) -> bool {
        self.returns += 1;
        false
    }

    fn visit_initializer(&mut self, _: &JavaAst, _: NodeId) -> bool {
        self.skipped_blocks += 1;
        false
    }
}

#[test]
fn typed_visitor_walks_a_class() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let parse = parse(
        &parser,
        "class A { { return; } int f() { return 1; } void g() { if (x) return; else return; } }",
    );
    assert!(parse.is_accepted());
    let mut census = Census {
        parse: Some(&parse),
        ..Census::default()
    };
    accept(parse.ast(), parse.root().unwrap(), &mut census);
    assert_eq!(census.methods, ["f", "g"]);
    assert_eq!(census.returns, 3);
    assert_eq!(census.skipped_blocks, 1);
}

/// Kind and range of every node under the root, in document order.
fn shape(outcome: &ParseOutcome<NodeId>, ast: &JavaAst) -> Vec<(JavaKind, TokenRange)> {
    let root = *outcome.parsed().unwrap().root.node().unwrap();
    ast.descendants(root)
        .into_iter()
        .map(|id| (ast.kind(id), ast.range(id)))
        .collect()
}

#[test]
fn deterministic_and_fuzzy_parses_agree_when_no_choice_is_needed() {
    init_logger();
    let parser = JavaParser::try_new().unwrap();
    let session = |source: &str| {
        ParseSession::new(parser.table(), parser.tokenize(source).unwrap(), JavaSemantics::new()).unwrap()
    };
    let always = [
        "class A {}",
        "package p.q; import r.S; import t.*; public final class A extends B implements C, D {}",
        "class A { int x; private static String[] names; void m() {} A(int a, long b) throws E {} }",
        "interface I extends J { void run(); }",
    ];
    let maybe = [
        "class A { void m() { if (a) if (b) x = 1; else x = 2; } }",
        "class A { int f(int n) { while (n > 0) n = n - 1; return n * 2 + 1; } }",
        "class A { boolean b = !(a && c) || d == e; }",
    ];
    let mut agreed = 0;
    for &source in always.iter().chain(maybe.iter()) {
        let mut plain = session(source);
        let mut fuzzy = session(source);
        let p = plain.parse_deterministic(Entry::Goal).unwrap();
        let f = fuzzy.fuzzy_parse(0, None).unwrap();
        assert!(f.is_accepted(), "{source}");
        if always.contains(&source) {
            assert!(p.is_accepted(), "{source}");
        }
        if p.is_accepted() {
            assert_eq!(
                shape(&p, plain.semantics().ast()),
                shape(&f, fuzzy.semantics().ast()),
                "{source}"
            );
            assert!(f.parsed().unwrap().repairs.is_empty());
            agreed += 1;
        }
    }
    assert!(agreed >= always.len());
}
