//! AST for the uC language
//!
//! ASDL:
//!   program = Program(global_decl* declarations)
//!   global_decl = Function(function_definition) | Declaration(declaration)
//!   function_definition = FunctionDefinition(type_specifier, declarator,
//!                                            declaration* declarations,
//!                                            compound_statement body)
//!   declaration = Declaration(type_specifier, init_declarator* init_declarators)
//!   init_declarator = InitDeclarator(declarator, initializer? initializer)
//!   declarator = Named(identifier)
//!              | Parenthesized(declarator)
//!              | Array(declarator base, expression? size)
//!              | Function(declarator base, parameter_declaration*? params)
//!   initializer = Expr(expression) | List(initializer*)
//!   statement = Expression(expression?) | Compound(compound_statement)
//!             | If(expression, statement, statement?)
//!             | While(expression, statement)
//!             | For(for_init?, expression? condition, expression? step, statement)
//!             | Break | Return(expression?) | Assert(expression)
//!             | Print(expression?) | Read(expression)
//!   expression = Assign(expression target, expression value)
//!              | Binary(binary_operator, expression, expression)
//!              | Unary(unary_operator, expression)
//!              | Index(expression base, expression index)
//!              | Call(expression callee, expression*? args)
//!              | Identifier(string) | IntConstant(int) | CharConstant(char)
//!              | StringLiteral(string) | ExprList(expression*)
//!
//! Declarator nesting encodes syntax only; a base type and a declarator
//! shape are combined by a later semantic stage. Absent optional
//! productions are `None`, never an empty list.

#[derive(Debug, PartialEq)]
pub struct Program {
    pub declarations: Vec<GlobalDecl>,
}

#[derive(Debug, PartialEq)]
pub enum GlobalDecl {
    Function(FunctionDefinition),
    Declaration(Declaration),
}

#[derive(Debug, PartialEq)]
pub struct FunctionDefinition {
    pub type_specifier: TypeSpecifier,
    pub declarator: Declarator,
    /// K&R-style declarations between the declarator and the body.
    pub declarations: Vec<Declaration>,
    pub body: CompoundStatement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeSpecifier {
    Void,
    Char,
    Int,
}

#[derive(Debug, PartialEq)]
pub struct Declaration {
    pub type_specifier: TypeSpecifier,
    pub init_declarators: Vec<InitDeclarator>,
}

#[derive(Debug, PartialEq)]
pub struct InitDeclarator {
    pub declarator: Declarator,
    pub initializer: Option<Initializer>,
}

#[derive(Debug, PartialEq)]
pub enum Declarator {
    Named(String),
    Parenthesized(Box<Declarator>),
    Array {
        base: Box<Declarator>,
        size: Option<Expression>,
    },
    Function {
        base: Box<Declarator>,
        params: Option<Vec<ParameterDeclaration>>,
    },
}

#[derive(Debug, PartialEq)]
pub struct ParameterDeclaration {
    pub type_specifier: TypeSpecifier,
    pub declarator: Declarator,
}

#[derive(Debug, PartialEq)]
pub enum Initializer {
    Expr(Expression),
    List(Vec<Initializer>),
}

#[derive(Debug, PartialEq)]
pub struct CompoundStatement {
    pub declarations: Vec<Declaration>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, PartialEq)]
pub enum Statement {
    Expression(Option<Expression>),
    Compound(CompoundStatement),
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    For {
        init: Option<ForInit>,
        condition: Option<Expression>,
        step: Option<Expression>,
        body: Box<Statement>,
    },
    Break,
    Return(Option<Expression>),
    Assert(Expression),
    Print(Option<Expression>),
    Read(Expression),
}

/// The first clause of a `for` statement. The expression and declaration
/// alternatives are kept distinct so the semantic stage can scope a
/// loop-local declaration correctly.
#[derive(Debug, PartialEq)]
pub enum ForInit {
    Expression(Expression),
    Declaration(Declaration),
}

#[derive(Debug, PartialEq)]
pub enum Expression {
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Index {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Option<Vec<Expression>>,
    },
    Identifier(String),
    IntConstant(i64),
    CharConstant(char),
    StringLiteral(String),
    /// Comma operator: `a, b, c` evaluated left to right.
    ExprList(Vec<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}
