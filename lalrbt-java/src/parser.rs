//! # Java Parser
//!
//! Couples the generated tables with the Java tree-building semantics.
//!
//! - [`parser_data`]: the generated automaton, with [`ProdID`] and [`TokenID`],
//! - [`JavaSemantics`]: one arm per rule, building a [`JavaAst`],
//! - [`JavaParser`]: the table and lexer mapping, shared by every parse,
//! - [`JavaParse`]: the token stream, the tree and the outcome of one parse.
//!
//! The grammar keeps the Java ambiguities the LALR(1) construction cannot
//! settle (casts against parenthesized names, the dangling `else`) as
//! conflict cells, so every parse goes through the backtracking engine.
//!
//! [`ProdID`]: parser_data::ProdID
//! [`TokenID`]: parser_data::TokenID

use crate::ast::{JavaAst, JavaKind, TreePrinter};
use crate::lexer::{JavaLexer, KIND_NAMES};
use crate::JavaError;
use anyhow::bail;
use lalrbt::{
    ListOrder, Monitor, NodeId, ParseOutcome, ParseSession, ParseTable, ParserStats, Repairs, Report,
    Rhs, RuleId, Semantics, Slot, TerminalMap, TokenRange, TokenStream,
};
use parser_data::ProdID;
use std::str::FromStr;
use std::sync::Arc;

/// Includes the generated LALR(1) tables and definitions.
///
/// `parser_data.rs` is written by [`lalrbt_gen::generate`] from `src/java.g`
/// during the build. It defines the symbol and rule tables, the conflict
/// lists and the [`ProdID`]/[`TokenID`] enums.
pub mod parser_data {
    include!(concat!(env!("OUT_DIR"), "/parser_data.rs"));
}

/// What a reduction builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Build {
    /// A node of this kind with one child per right-hand-side symbol.
    Node(JavaKind),
    /// The value of the symbol at this position, unchanged.
    Pass(usize),
    /// Nothing: an empty optional.
    Absent,
    /// A new list holding the single right-hand-side symbol.
    List(JavaKind, ListOrder),
    /// The list at `list` extended by the symbol at `item`.
    Append { list: usize, item: usize },
    /// Start rules: accepted, never reduced.
    Unreachable,
}

fn build(prod: ProdID) -> Build {
    use Build::*;
    match prod {
        ProdID::Start => Unreachable,
        ProdID::CompilationUnit => Node(JavaKind::CompilationUnit),
        ProdID::NoPackage
        | ProdID::NoImports
        | ProdID::NoTypes
        | ProdID::NoModifiers
        | ProdID::NoSuper
        | ProdID::NoInterfaces
        | ProdID::NoMembers
        | ProdID::NoExtendsInterfaces
        | ProdID::NoInitializers
        | ProdID::NoThrows
        | ProdID::NoParameters
        | ProdID::NoStatements
        | ProdID::NoFinally
        | ProdID::NoForInit
        | ProdID::NoForUpdate
        | ProdID::NoExpression
        | ProdID::NoArguments
        | ProdID::NoDims => Absent,
        ProdID::SomePackage
        | ProdID::SomeImports
        | ProdID::SomeTypes
        | ProdID::ClassTypeDeclaration
        | ProdID::InterfaceTypeDeclaration
        | ProdID::SomeModifiers
        | ProdID::PrimitiveTypeRef
        | ProdID::ReferenceTypeRef
        | ProdID::ClassTypeRef
        | ProdID::ArrayTypeRef
        | ProdID::SomeMembers
        | ProdID::FieldMember
        | ProdID::MethodMember
        | ProdID::ConstructorMember
        | ProdID::ClassMember
        | ProdID::InterfaceMember
        | ProdID::ExpressionInitializer
        | ProdID::ArrayInitializerRef
        | ProdID::SomeInitializers
        | ProdID::BlockMethodBody
        | ProdID::SomeParameters
        | ProdID::SomeStatements
        | ProdID::StatementRef
        | ProdID::SimpleStatement
        | ProdID::BlockStatement
        | ProdID::SomeFinally
        | ProdID::ForInitExpressions
        | ProdID::ForInitDeclaration
        | ProdID::ForUpdate
        | ProdID::SomeExpression
        | ProdID::AssignmentStatement
        | ProdID::PreIncrementStatement
        | ProdID::PreDecrementStatement
        | ProdID::PostIncrementStatement
        | ProdID::PostDecrementStatement
        | ProdID::InvocationStatement
        | ProdID::CreationStatement
        | ProdID::Expression
        | ProdID::ConditionalRef
        | ProdID::AssignmentRef
        | ProdID::NameLeftHandSide
        | ProdID::FieldLeftHandSide
        | ProdID::ArrayLeftHandSide
        | ProdID::ConditionalOrRef
        | ProdID::ConditionalAndRef
        | ProdID::EqualityRef
        | ProdID::RelationalRef
        | ProdID::AdditiveRef
        | ProdID::MultiplicativeRef
        | ProdID::UnaryRef
        | ProdID::PreIncrementRef
        | ProdID::PreDecrementRef
        | ProdID::NotPlusMinusRef
        | ProdID::PostfixRef
        | ProdID::CastRef
        | ProdID::PrimaryRef
        | ProdID::NamePostfix
        | ProdID::PostIncrementRef
        | ProdID::PostDecrementRef
        | ProdID::PrimaryNoNewArrayRef
        | ProdID::ArrayCreationRef
        | ProdID::LiteralRef
        | ProdID::CreationRef
        | ProdID::FieldAccessRef
        | ProdID::InvocationRef
        | ProdID::ArrayAccessRef
        | ProdID::SomeArguments
        | ProdID::SomeDims => Pass(0),
        ProdID::PackageDeclaration => Node(JavaKind::PackageDeclaration),
        ProdID::ImportsOne => List(JavaKind::ImportDeclarations, ListOrder::Source),
        ProdID::ImportsMore
        | ProdID::TypesMore
        | ProdID::MembersMore
        | ProdID::StatementsMore
        | ProdID::CatchesMore
        | ProdID::DimExprsMore => Append { list: 0, item: 1 },
        ProdID::SingleTypeImport => Node(JavaKind::SingleTypeImport),
        ProdID::TypeImportOnDemand => Node(JavaKind::TypeImportOnDemand),
        ProdID::TypesOne => List(JavaKind::TypeDeclarations, ListOrder::Source),
        ProdID::EmptyTypeDeclaration | ProdID::EmptyMember => Node(JavaKind::EmptyDeclaration),
        ProdID::ModifiersOne => List(JavaKind::Modifiers, ListOrder::Reversed),
        ProdID::ModifiersMore => Append { list: 1, item: 0 },
        ProdID::PublicModifier
        | ProdID::ProtectedModifier
        | ProdID::PrivateModifier
        | ProdID::StaticModifier
        | ProdID::FinalModifier
        | ProdID::AbstractModifier => Node(JavaKind::Modifier),
        ProdID::BooleanType
        | ProdID::ByteType
        | ProdID::ShortType
        | ProdID::IntType
        | ProdID::LongType
        | ProdID::CharType
        | ProdID::FloatType
        | ProdID::DoubleType => Node(JavaKind::PrimitiveType),
        ProdID::ClassType => Node(JavaKind::ClassType),
        ProdID::PrimitiveArrayType
        | ProdID::NameArrayType
        | ProdID::NestedArrayType => Node(JavaKind::ArrayType),
        ProdID::ClassTypesOne => List(JavaKind::ClassTypeList, ListOrder::Source),
        ProdID::ClassTypesMore
        | ProdID::DeclaratorsMore
        | ProdID::InitializersMore
        | ProdID::ParametersMore
        | ProdID::StatementExpressionsMore
        | ProdID::ArgumentsMore => Append { list: 0, item: 2 },
        ProdID::SimpleName => Node(JavaKind::SimpleName),
        ProdID::QualifiedName => Node(JavaKind::QualifiedName),
        ProdID::ClassDeclaration => Node(JavaKind::ClassDeclaration),
        ProdID::Superclass => Node(JavaKind::Superclass),
        ProdID::Interfaces => Node(JavaKind::Interfaces),
        ProdID::ClassBody => Node(JavaKind::ClassBody),
        ProdID::MembersOne => List(JavaKind::ClassBodyDeclarations, ListOrder::Source),
        ProdID::InitializerMember => Node(JavaKind::Initializer),
        ProdID::InterfaceDeclaration => Node(JavaKind::InterfaceDeclaration),
        ProdID::ExtendsInterfaces => Node(JavaKind::ExtendsInterfaces),
        ProdID::FieldDeclaration => Node(JavaKind::FieldDeclaration),
        ProdID::DeclaratorsOne => List(JavaKind::VariableDeclarators, ListOrder::Source),
        ProdID::VariableDeclarator | ProdID::InitializedDeclarator => Node(JavaKind::VariableDeclarator),
        ProdID::VariableDeclaratorId | ProdID::ArrayDeclaratorId => Node(JavaKind::VariableDeclaratorId),
        ProdID::ArrayInitializer | ProdID::TrailingCommaArrayInitializer => Node(JavaKind::ArrayInitializer),
        ProdID::InitializersOne => List(JavaKind::VariableInitializers, ListOrder::Source),
        ProdID::MethodDeclaration => Node(JavaKind::MethodDeclaration),
        ProdID::TypedMethodHeader | ProdID::VoidMethodHeader => Node(JavaKind::MethodHeader),
        ProdID::MethodDeclarator => Node(JavaKind::MethodDeclarator),
        ProdID::AbstractMethodBody => Node(JavaKind::AbstractMethodBody),
        ProdID::ThrowsClause => Node(JavaKind::Throws),
        ProdID::ParametersOne => List(JavaKind::FormalParameterList, ListOrder::Source),
        ProdID::FormalParameter => Node(JavaKind::FormalParameter),
        ProdID::ConstructorDeclaration => Node(JavaKind::ConstructorDeclaration),
        ProdID::Block => Node(JavaKind::Block),
        ProdID::StatementsOne => List(JavaKind::BlockStatements, ListOrder::Source),
        ProdID::LocalVariableDeclarationStatement => Node(JavaKind::LocalVariableDeclarationStatement),
        ProdID::LocalVariableDeclaration => Node(JavaKind::LocalVariableDeclaration),
        ProdID::IfThenStatement => Node(JavaKind::IfThenStatement),
        ProdID::IfThenElseStatement => Node(JavaKind::IfThenElseStatement),
        ProdID::WhileStatement => Node(JavaKind::WhileStatement),
        ProdID::ForStatement => Node(JavaKind::ForStatement),
        ProdID::EmptyStatement => Node(JavaKind::EmptyStatement),
        ProdID::ExpressionStatement => Node(JavaKind::ExpressionStatement),
        ProdID::DoStatement => Node(JavaKind::DoStatement),
        ProdID::BreakStatement => Node(JavaKind::BreakStatement),
        ProdID::ContinueStatement => Node(JavaKind::ContinueStatement),
        ProdID::ReturnStatement => Node(JavaKind::ReturnStatement),
        ProdID::ThrowStatement => Node(JavaKind::ThrowStatement),
        ProdID::TryStatement | ProdID::TryFinallyStatement => Node(JavaKind::TryStatement),
        ProdID::CatchesOne => List(JavaKind::Catches, ListOrder::Source),
        ProdID::CatchClause => Node(JavaKind::CatchClause),
        ProdID::FinallyClause => Node(JavaKind::FinallyClause),
        ProdID::StatementExpressionsOne => List(JavaKind::StatementExpressionList, ListOrder::Source),
        ProdID::Assignment => Node(JavaKind::Assignment),
        ProdID::Assign
        | ProdID::AddAssign
        | ProdID::SubtractAssign
        | ProdID::MultiplyAssign
        | ProdID::DivideAssign => Node(JavaKind::AssignmentOperator),
        ProdID::ConditionalExpression => Node(JavaKind::ConditionalExpression),
        ProdID::ConditionalOr => Node(JavaKind::ConditionalOrExpression),
        ProdID::ConditionalAnd => Node(JavaKind::ConditionalAndExpression),
        ProdID::Equal | ProdID::NotEqual => Node(JavaKind::EqualityExpression),
        ProdID::Less
        | ProdID::Greater
        | ProdID::LessEqual
        | ProdID::GreaterEqual => Node(JavaKind::RelationalExpression),
        ProdID::InstanceOf => Node(JavaKind::InstanceOfExpression),
        ProdID::Add | ProdID::Subtract => Node(JavaKind::AdditiveExpression),
        ProdID::Multiply | ProdID::Divide | ProdID::Remainder => Node(JavaKind::MultiplicativeExpression),
        ProdID::UnaryPlus
        | ProdID::UnaryMinus
        | ProdID::BitwiseComplement
        | ProdID::LogicalComplement => Node(JavaKind::UnaryExpression),
        ProdID::PreIncrement => Node(JavaKind::PreIncrementExpression),
        ProdID::PreDecrement => Node(JavaKind::PreDecrementExpression),
        ProdID::PrimitiveCast | ProdID::ReferenceCast => Node(JavaKind::CastExpression),
        ProdID::PostIncrement => Node(JavaKind::PostIncrementExpression),
        ProdID::PostDecrement => Node(JavaKind::PostDecrementExpression),
        ProdID::This => Node(JavaKind::This),
        ProdID::Parenthesized => Node(JavaKind::ParenthesizedExpression),
        ProdID::IntegerLiteral
        | ProdID::FloatingPointLiteral
        | ProdID::CharacterLiteral
        | ProdID::StringLiteral
        | ProdID::TrueLiteral
        | ProdID::FalseLiteral
        | ProdID::NullLiteral => Node(JavaKind::Literal),
        ProdID::ClassInstanceCreation => Node(JavaKind::ClassInstanceCreation),
        ProdID::ArgumentsOne => List(JavaKind::ArgumentList, ListOrder::Source),
        ProdID::PrimitiveArrayCreation | ProdID::ClassArrayCreation => Node(JavaKind::ArrayCreation),
        ProdID::DimExprsOne => List(JavaKind::DimExprs, ListOrder::Source),
        ProdID::DimExpr => Node(JavaKind::DimExpr),
        ProdID::DimsOne | ProdID::DimsMore => Node(JavaKind::Dims),
        ProdID::FieldAccess | ProdID::SuperFieldAccess => Node(JavaKind::FieldAccess),
        ProdID::NameInvocation
        | ProdID::PrimaryInvocation
        | ProdID::SuperInvocation => Node(JavaKind::MethodInvocation),
        ProdID::NameArrayAccess | ProdID::PrimaryArrayAccess => Node(JavaKind::ArrayAccess),
        ProdID::EntryMethodDeclaration
        | ProdID::EntryClassBodyDeclarations
        | ProdID::EntryBlockStatements
        | ProdID::EntryExpression => Unreachable,
    }
}

/// Semantic actions that build a [`JavaAst`].
///
/// Token leaves are [`JavaKind::Token`] nodes. Optional parts that are
/// missing stay as `None` children, so a node of a given kind always has
/// the same number of children.
#[derive(Debug, Default)]
pub struct JavaSemantics {
    ast: JavaAst,
}

impl JavaSemantics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ast(&self) -> &JavaAst {
        &self.ast
    }

    pub fn into_ast(self) -> JavaAst {
        self.ast
    }

    fn child(&mut self, slot: Slot<NodeId>) -> Option<NodeId> {
        match slot {
            Slot::Token(index) => Some(self.ast.new_token(JavaKind::Token, index)),
            Slot::Node(id) => Some(id),
            Slot::Absent => None,
        }
    }
}

impl Semantics for JavaSemantics {
    type Node = NodeId;

    fn reduce(&mut self, rule: RuleId, rhs: Rhs<'_, NodeId>, range: TokenRange) -> anyhow::Result<Slot<NodeId>> {
        let Ok(prod) = ProdID::try_from(rule.0) else {
            bail!("rule {rule} is not a Java production");
        };
        match build(prod) {
            Build::Node(kind) => {
                let children: Vec<Option<NodeId>> = (0..rhs.len()).map(|i| self.child(rhs.take(i))).collect();
                Ok(Slot::Node(self.ast.new_node(kind, range, children)))
            }
            Build::Pass(i) => Ok(rhs.take(i)),
            Build::Absent => Ok(Slot::Absent),
            Build::List(kind, order) => {
                let list = self.ast.new_list(kind, order, range);
                if let Some(item) = self.child(rhs.take(0)) {
                    self.ast.list_push(list, item);
                }
                Ok(Slot::Node(list))
            }
            Build::Append { list, item } => {
                let Some(list) = rhs.node(list) else {
                    bail!("{prod:?}: list operand is missing");
                };
                if let Some(item) = self.child(rhs.take(item)) {
                    self.ast.list_push(list, item);
                }
                Ok(Slot::Node(list))
            }
            Build::Unreachable => bail!("{prod:?} is accepted, not reduced"),
        }
    }
}

/// The nonterminal a parse starts from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum JavaEntry {
    /// A whole source file.
    #[default]
    CompilationUnit,
    MethodDeclaration,
    ClassBodyDeclarations,
    BlockStatements,
    Expression,
}

impl JavaEntry {
    pub const ALL: &'static [JavaEntry] = &[
        JavaEntry::CompilationUnit,
        JavaEntry::MethodDeclaration,
        JavaEntry::ClassBodyDeclarations,
        JavaEntry::BlockStatements,
        JavaEntry::Expression,
    ];

    /// Grammar name of the nonterminal.
    pub fn nonterminal(self) -> &'static str {
        match self {
            JavaEntry::CompilationUnit => "CompilationUnit",
            JavaEntry::MethodDeclaration => "MethodDeclaration",
            JavaEntry::ClassBodyDeclarations => "ClassBodyDeclarations",
            JavaEntry::BlockStatements => "BlockStatements",
            JavaEntry::Expression => "Expression",
        }
    }
}

impl FromStr for JavaEntry {
    type Err = JavaError;

    /// Accepts the nonterminal name in any case, dashes and underscores
    /// ignored: `method-declaration`, `BlockStatements`, `expression`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: std::string::String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        JavaEntry::ALL
            .iter()
            .copied()
            .find(|e| e.nonterminal().to_ascii_lowercase() == wanted)
            .ok_or_else(|| JavaError::UnknownEntry(s.into()))
    }
}

/// Per-parse settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Single-token substitutions a parse may make to get past errors.
    pub error_repair_budget: usize,
    pub entry: JavaEntry,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_repair_budget: 0,
            entry: JavaEntry::CompilationUnit,
        }
    }
}

/// The Java parse table together with the lexer mapping onto it.
///
/// Construction validates the generated table once; afterwards a parser can
/// be shared and used for any number of parses.
pub struct JavaParser {
    table: ParseTable,
    map: Arc<TerminalMap>,
}

impl JavaParser {
    pub fn try_new() -> Result<Self, JavaError> {
        let table = ParseTable::try_new(parser_data::table_data())?;
        table.check_backtrack_capable()?;
        let map = TerminalMap::for_table(KIND_NAMES, &table)?;
        for name in map.unproduced() {
            log::warn!("grammar terminal {name} is never produced by the lexer");
        }
        log::debug!(
            "java table: {} symbols, {} rules, {} conflicts",
            parser_data::N_SYMBOLS,
            parser_data::N_PRODUCTIONS,
            parser_data::N_CONFLICTS
        );
        Ok(Self {
            table,
            map: Arc::new(map),
        })
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    /// Lexes `source` into a stream mapped onto the Java table.
    pub fn tokenize(&self, source: &str) -> Result<TokenStream, JavaError> {
        let mut stream = TokenStream::tokenize(JavaLexer::new(source))?;
        stream.set_terminal_map(Arc::clone(&self.map));
        Ok(stream)
    }

    pub fn parse(&self, source: &str, options: &ParseOptions) -> Result<JavaParse, JavaError> {
        self.parse_with_monitor(source, options, None)
    }

    /// Parses `source` from `options.entry`, polling `monitor` for
    /// cancellation.
    ///
    /// Syntax errors are not errors here: they come back as a rejected
    /// [`JavaParse`] carrying a diagnostic.
    pub fn parse_with_monitor(
        &self,
        source: &str,
        options: &ParseOptions,
        monitor: Option<&dyn Monitor>,
    ) -> Result<JavaParse, JavaError> {
        let stream = self.tokenize(source)?;
        let mut session = ParseSession::new(&self.table, stream, JavaSemantics::new())?;
        let budget = options.error_repair_budget;
        let outcome = match options.entry {
            JavaEntry::CompilationUnit => session.fuzzy_parse(budget, monitor)?,
            entry => session.fuzzy_parse_named(entry.nonterminal(), budget, monitor)?,
        };
        let stats = session.stats().clone();
        let (stream, semantics) = session.into_parts();
        log::debug!(
            "parsed {} tokens: accepted={}, {stats:?}",
            stream.len(),
            outcome.is_accepted()
        );
        Ok(JavaParse {
            stream,
            ast: semantics.into_ast(),
            outcome,
            stats,
        })
    }
}

/// Everything one parse produced.
pub struct JavaParse {
    stream: TokenStream,
    ast: JavaAst,
    outcome: ParseOutcome<NodeId>,
    stats: ParserStats,
}

impl JavaParse {
    pub fn is_accepted(&self) -> bool {
        self.outcome.is_accepted()
    }

    /// Root of the tree, if the parse was accepted.
    pub fn root(&self) -> Option<NodeId> {
        self.outcome.parsed().and_then(|p| p.root.node().copied())
    }

    pub fn diagnostic(&self) -> Option<&lalrbt::Diagnostic> {
        self.outcome.diagnostic()
    }

    /// Substitutions an accepted parse needed.
    pub fn repairs(&self) -> Option<&Repairs> {
        self.outcome.parsed().map(|p| &p.repairs)
    }

    pub fn outcome(&self) -> &ParseOutcome<NodeId> {
        &self.outcome
    }

    pub fn stream(&self) -> &TokenStream {
        &self.stream
    }

    pub fn ast(&self) -> &JavaAst {
        &self.ast
    }

    pub fn ast_mut(&mut self) -> &mut JavaAst {
        &mut self.ast
    }

    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    /// Source text spanned by `node`, adjuncts between its tokens included.
    pub fn text(&self, node: NodeId) -> &str {
        let range = self.ast.range(node);
        let Some(last) = range.right_token() else {
            return "";
        };
        let start = self.stream.get_token(range.left_token()).start;
        let end = self.stream.get_token(last).end;
        &self.stream.source()[start..end]
    }

    /// A `line:column: message` rendering of the diagnostic.
    pub fn report<'a>(&'a self, parser: &'a JavaParser) -> Option<Report<'a>> {
        self.diagnostic().map(|d| d.report(parser.table(), &self.stream))
    }

    /// The tree, one node per line.
    pub fn dump(&self) -> Option<std::string::String> {
        self.root().map(|root| TreePrinter::print(&self.ast, root, &self.stream))
    }
}
