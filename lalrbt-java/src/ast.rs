//! # Java Syntax Trees
//!
//! Java trees live in a [`JavaAst`], the generic [`Ast`] arena instantiated
//! with the closed [`JavaKind`] enum. The `java_nodes!` macro generates the enum
//! together with [`JavaVisitor`], which has one `visit_*`/`end_visit_*` pair
//! per kind, and the dispatcher that routes the generic [`Visitor`] hooks to
//! them through an exhaustive `match`. Adding a kind adds its visitor methods
//! and its dispatch arm in one place.

use lalrbt::{Ast, NodeId, TokenStream, Visitor};
use std::fmt::Write;

pub type JavaAst = Ast<JavaKind>;

macro_rules! java_nodes {
    ($($kind:ident => $visit:ident, $end_visit:ident;)*) => {
        /// Every node kind of a Java tree.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum JavaKind {
            $($kind,)*
        }

        impl JavaKind {
            pub const ALL: &'static [JavaKind] = &[$(JavaKind::$kind,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(JavaKind::$kind => stringify!($kind),)*
                }
            }
        }

        /// Typed visitor over a [`JavaAst`].
        ///
        /// Every `visit_*` method defaults to [`JavaVisitor::visit_default`]
        /// and every `end_visit_*` to [`JavaVisitor::end_visit_default`], so
        /// an implementation overrides only the kinds it cares about.
        pub trait JavaVisitor {
            fn pre_visit(&mut self, _ast: &JavaAst, _node: NodeId) -> bool {
                true
            }

            fn post_visit(&mut self, _ast: &JavaAst, _node: NodeId) {}

            /// Returns whether to descend into the children.
            fn visit_default(&mut self, _ast: &JavaAst, _node: NodeId) -> bool {
                true
            }

            fn end_visit_default(&mut self, _ast: &JavaAst, _node: NodeId) {}

            $(
                fn $visit(&mut self, ast: &JavaAst, node: NodeId) -> bool {
                    self.visit_default(ast, node)
                }

                fn $end_visit(&mut self, ast: &JavaAst, node: NodeId) {
                    self.end_visit_default(ast, node)
                }
            )*
        }

        fn dispatch_visit<V: JavaVisitor + ?Sized>(visitor: &mut V, ast: &JavaAst, node: NodeId) -> bool {
            match ast.kind(node) {
                $(JavaKind::$kind => visitor.$visit(ast, node),)*
            }
        }

        fn dispatch_end_visit<V: JavaVisitor + ?Sized>(visitor: &mut V, ast: &JavaAst, node: NodeId) {
            match ast.kind(node) {
                $(JavaKind::$kind => visitor.$end_visit(ast, node),)*
            }
        }
    };
}

java_nodes! {
    Token => visit_token, end_visit_token;
    CompilationUnit => visit_compilation_unit, end_visit_compilation_unit;
    PackageDeclaration => visit_package_declaration, end_visit_package_declaration;
    ImportDeclarations => visit_import_declarations, end_visit_import_declarations;
    SingleTypeImport => visit_single_type_import, end_visit_single_type_import;
    TypeImportOnDemand => visit_type_import_on_demand, end_visit_type_import_on_demand;
    TypeDeclarations => visit_type_declarations, end_visit_type_declarations;
    EmptyDeclaration => visit_empty_declaration, end_visit_empty_declaration;
    Modifiers => visit_modifiers, end_visit_modifiers;
    Modifier => visit_modifier, end_visit_modifier;
    PrimitiveType => visit_primitive_type, end_visit_primitive_type;
    ClassType => visit_class_type, end_visit_class_type;
    ArrayType => visit_array_type, end_visit_array_type;
    ClassTypeList => visit_class_type_list, end_visit_class_type_list;
    SimpleName => visit_simple_name, end_visit_simple_name;
    QualifiedName => visit_qualified_name, end_visit_qualified_name;
    ClassDeclaration => visit_class_declaration, end_visit_class_declaration;
    Superclass => visit_superclass, end_visit_superclass;
    Interfaces => visit_interfaces, end_visit_interfaces;
    ClassBody => visit_class_body, end_visit_class_body;
    ClassBodyDeclarations => visit_class_body_declarations, end_visit_class_body_declarations;
    Initializer => visit_initializer, end_visit_initializer;
    InterfaceDeclaration => visit_interface_declaration, end_visit_interface_declaration;
    ExtendsInterfaces => visit_extends_interfaces, end_visit_extends_interfaces;
    FieldDeclaration => visit_field_declaration, end_visit_field_declaration;
    VariableDeclarators => visit_variable_declarators, end_visit_variable_declarators;
    VariableDeclarator => visit_variable_declarator, end_visit_variable_declarator;
    VariableDeclaratorId => visit_variable_declarator_id, end_visit_variable_declarator_id;
    ArrayInitializer => visit_array_initializer, end_visit_array_initializer;
    VariableInitializers => visit_variable_initializers, end_visit_variable_initializers;
    MethodDeclaration => visit_method_declaration, end_visit_method_declaration;
    MethodHeader => visit_method_header, end_visit_method_header;
    MethodDeclarator => visit_method_declarator, end_visit_method_declarator;
    AbstractMethodBody => visit_abstract_method_body, end_visit_abstract_method_body;
    Throws => visit_throws, end_visit_throws;
    FormalParameterList => visit_formal_parameter_list, end_visit_formal_parameter_list;
    FormalParameter => visit_formal_parameter, end_visit_formal_parameter;
    ConstructorDeclaration => visit_constructor_declaration, end_visit_constructor_declaration;
    Block => visit_block, end_visit_block;
    BlockStatements => visit_block_statements, end_visit_block_statements;
    LocalVariableDeclarationStatement => visit_local_variable_declaration_statement, end_visit_local_variable_declaration_statement;
    LocalVariableDeclaration => visit_local_variable_declaration, end_visit_local_variable_declaration;
    IfThenStatement => visit_if_then_statement, end_visit_if_then_statement;
    IfThenElseStatement => visit_if_then_else_statement, end_visit_if_then_else_statement;
    WhileStatement => visit_while_statement, end_visit_while_statement;
    ForStatement => visit_for_statement, end_visit_for_statement;
    EmptyStatement => visit_empty_statement, end_visit_empty_statement;
    ExpressionStatement => visit_expression_statement, end_visit_expression_statement;
    DoStatement => visit_do_statement, end_visit_do_statement;
    BreakStatement => visit_break_statement, end_visit_break_statement;
    ContinueStatement => visit_continue_statement, end_visit_continue_statement;
    ReturnStatement => visit_return_statement, end_visit_return_statement;
    ThrowStatement => visit_throw_statement, end_visit_throw_statement;
    TryStatement => visit_try_statement, end_visit_try_statement;
    Catches => visit_catches, end_visit_catches;
    CatchClause => visit_catch_clause, end_visit_catch_clause;
    FinallyClause => visit_finally_clause, end_visit_finally_clause;
    StatementExpressionList => visit_statement_expression_list, end_visit_statement_expression_list;
    Assignment => visit_assignment, end_visit_assignment;
    AssignmentOperator => visit_assignment_operator, end_visit_assignment_operator;
    ConditionalExpression => visit_conditional_expression, end_visit_conditional_expression;
    ConditionalOrExpression => visit_conditional_or_expression, end_visit_conditional_or_expression;
    ConditionalAndExpression => visit_conditional_and_expression, end_visit_conditional_and_expression;
    EqualityExpression => visit_equality_expression, end_visit_equality_expression;
    RelationalExpression => visit_relational_expression, end_visit_relational_expression;
    InstanceOfExpression => visit_instance_of_expression, end_visit_instance_of_expression;
    AdditiveExpression => visit_additive_expression, end_visit_additive_expression;
    MultiplicativeExpression => visit_multiplicative_expression, end_visit_multiplicative_expression;
    UnaryExpression => visit_unary_expression, end_visit_unary_expression;
    PreIncrementExpression => visit_pre_increment_expression, end_visit_pre_increment_expression;
    PreDecrementExpression => visit_pre_decrement_expression, end_visit_pre_decrement_expression;
    PostIncrementExpression => visit_post_increment_expression, end_visit_post_increment_expression;
    PostDecrementExpression => visit_post_decrement_expression, end_visit_post_decrement_expression;
    CastExpression => visit_cast_expression, end_visit_cast_expression;
    Literal => visit_literal, end_visit_literal;
    This => visit_this, end_visit_this;
    ParenthesizedExpression => visit_parenthesized_expression, end_visit_parenthesized_expression;
    ClassInstanceCreation => visit_class_instance_creation, end_visit_class_instance_creation;
    ArgumentList => visit_argument_list, end_visit_argument_list;
    ArrayCreation => visit_array_creation, end_visit_array_creation;
    DimExprs => visit_dim_exprs, end_visit_dim_exprs;
    DimExpr => visit_dim_expr, end_visit_dim_expr;
    Dims => visit_dims, end_visit_dims;
    FieldAccess => visit_field_access, end_visit_field_access;
    MethodInvocation => visit_method_invocation, end_visit_method_invocation;
    ArrayAccess => visit_array_access, end_visit_array_access;
}

/// Adapts a [`JavaVisitor`] to the arena's generic [`Visitor`] hooks.
struct Dispatch<'v, V: ?Sized>(&'v mut V);

impl<V: JavaVisitor + ?Sized> Visitor<JavaKind> for Dispatch<'_, V> {
    fn pre_visit(&mut self, ast: &JavaAst, node: NodeId) -> bool {
        self.0.pre_visit(ast, node)
    }

    fn visit(&mut self, ast: &JavaAst, node: NodeId) -> bool {
        dispatch_visit(self.0, ast, node)
    }

    fn end_visit(&mut self, ast: &JavaAst, node: NodeId) {
        dispatch_end_visit(self.0, ast, node)
    }

    fn post_visit(&mut self, ast: &JavaAst, node: NodeId) {
        self.0.post_visit(ast, node)
    }
}

/// Walks the tree under `root` with a typed visitor.
pub fn accept<V: JavaVisitor + ?Sized>(ast: &JavaAst, root: NodeId, visitor: &mut V) {
    ast.accept(root, &mut Dispatch(visitor));
}

/// Renders a tree one node per line, token leaves with their text.
pub struct TreePrinter<'a> {
    stream: &'a TokenStream,
    depth: usize,
    out: String,
}

impl<'a> TreePrinter<'a> {
    pub fn new(stream: &'a TokenStream) -> Self {
        Self {
            stream,
            depth: 0,
            out: String::new(),
        }
    }

    pub fn print(ast: &JavaAst, root: NodeId, stream: &'a TokenStream) -> String {
        let mut printer = Self::new(stream);
        accept(ast, root, &mut printer);
        printer.out
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) {
        let _ = writeln!(self.out, "{:indent$}{}", "", text, indent = self.depth * 2);
    }
}

impl JavaVisitor for TreePrinter<'_> {
    fn visit_default(&mut self, ast: &JavaAst, node: NodeId) -> bool {
        let range = ast.range(node);
        self.line(format_args!("{} [{}..{})", ast.kind(node).name(), range.start, range.end));
        self.depth += 1;
        true
    }

    fn end_visit_default(&mut self, _: &JavaAst, _: NodeId) {
        self.depth -= 1;
    }

    fn visit_token(&mut self, ast: &JavaAst, node: NodeId) -> bool {
        if let Some(index) = ast.token(node) {
            let stream = self.stream;
            self.line(format_args!("`{}`", stream.text(index)));
        }
        false
    }

    fn end_visit_token(&mut self, _: &JavaAst, _: NodeId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use lalrbt::{ListOrder, TokenRange};

    fn sample() -> (JavaAst, NodeId) {
        let mut ast = JavaAst::new();
        let modifiers = ast.new_list(JavaKind::Modifiers, ListOrder::Reversed, TokenRange::token(1));
        for i in [1, 0] {
            let token = ast.new_token(JavaKind::Token, i);
            let modifier = ast.new_node(JavaKind::Modifier, TokenRange::token(i), [Some(token)]);
            ast.list_push(modifiers, modifier);
        }
        let int = ast.new_token(JavaKind::Token, 2);
        let ty = ast.new_node(JavaKind::PrimitiveType, TokenRange::token(2), [Some(int)]);
        let field = ast.new_node(
            JavaKind::FieldDeclaration,
            TokenRange::new(0, 3),
            [Some(modifiers), Some(ty)],
        );
        (ast, field)
    }

    #[derive(Default)]
    struct Kinds {
        seen: Vec<JavaKind>,
        modifiers: usize,
    }

    impl JavaVisitor for Kinds {
        fn visit_default(&mut self, ast: &JavaAst, node: NodeId) -> bool {
            self.seen.push(ast.kind(node));
            true
        }

        fn visit_modifier(&mut self, _: &JavaAst, _: NodeId) -> bool {
            self.modifiers += 1;
            false
        }
    }

    #[test]
    fn typed_visits_reach_overrides() {
        let (ast, root) = sample();
        let mut kinds = Kinds::default();
        accept(&ast, root, &mut kinds);
        assert_eq!(kinds.modifiers, 2);
        assert_eq!(
            kinds.seen,
            [
                JavaKind::FieldDeclaration,
                JavaKind::Modifiers,
                JavaKind::PrimitiveType,
                JavaKind::Token
            ]
        );
    }

    #[test]
    fn every_kind_has_a_name() {
        assert_eq!(JavaKind::ALL.len(), JavaKind::ArrayAccess as usize + 1);
        assert_eq!(JavaKind::ALL[0].name(), "Token");
        assert_eq!(JavaKind::IfThenElseStatement.name(), "IfThenElseStatement");
    }
}
