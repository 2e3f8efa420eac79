//! Parser for the uC language
//!
//! Grammar (left-recursive lists flattened; `?` marks an optional part):
//!   <program>         ::= <global-decl>+
//!   <global-decl>     ::= <function-def> | <declaration>
//!   <function-def>    ::= <type-spec> <declarator> <declaration>* <compound-stmt>
//!   <declarator>      ::= <identifier>
//!                       | "(" <declarator> ")"
//!                       | <declarator> "[" <binary-exp>? "]"
//!                       | <declarator> "(" <param-list>? ")"
//!   <param-list>      ::= <type-spec> <declarator> { "," <type-spec> <declarator> }
//!   <declaration>     ::= <type-spec> <init-declarator> { "," <init-declarator> } ";"
//!   <init-declarator> ::= <declarator> [ "=" <initializer> ]
//!   <initializer>     ::= <assignment-exp> | "{" [ <initializer> { "," <initializer> } [","] ] "}"
//!   <compound-stmt>   ::= "{" <declaration>* <statement>* "}"
//!   <statement>       ::= <exp>? ";" | <compound-stmt>
//!                       | "if" "(" <exp> ")" <statement> [ "else" <statement> ]
//!                       | "while" "(" <exp> ")" <statement>
//!                       | "for" "(" ( <exp>? ";" | <declaration> ) <exp>? ";" <exp>? ")" <statement>
//!                       | "break" ";" | "return" <exp>? ";" | "assert" <exp> ";"
//!                       | "print" "(" <exp>? ")" ";" | "read" "(" <arg-exp> ")" ";"
//!   <exp>             ::= <assignment-exp> { "," <assignment-exp> }
//!   <assignment-exp>  ::= <binary-exp> | <unary-exp> "=" <binary-exp>
//!   <binary-exp>      ::= <unary-exp> | <binary-exp> <binop> <binary-exp>
//!   <unary-exp>       ::= <postfix-exp> | ("+" | "-" | "!") <unary-exp>
//!   <postfix-exp>     ::= <primary-exp> { "[" <exp> "]" | "(" <arg-exp>? ")" }
//!   <arg-exp>         ::= <assignment-exp> { "," <assignment-exp> }
//!   <primary-exp>     ::= <identifier> | <int-const> | <char-const> | <string> | "(" <exp> ")"
//!
//! The flat `<binary-exp>` rule is resolved by declared precedence, not by
//! grammar stratification: `||`, `&&` (left, lowest) < `==`, `!=` (nonassoc)
//! < `<`, `<=`, `>`, `>=` (nonassoc) < `+`, `-` (left) < `*`, `/`, `%`
//! (left, highest). Chaining a non-associative tier (`a < b < c`) is a
//! syntax error at the second operator. `else` binds to the nearest
//! unmatched `if`, and declarator suffixes and initializers are consumed
//! greedily before a declarator is finalized.

use crate::ast_uc::{
    BinaryOperator, CompoundStatement, Declaration, Declarator, Expression, ForInit,
    FunctionDefinition, GlobalDecl, InitDeclarator, Initializer, ParameterDeclaration, Program,
    Statement, TypeSpecifier, UnaryOperator,
};
use crate::lexer::{Keyword, Token, TokenKind};
use thiserror::Error;
use winnow::combinator::{fail, opt, peek};
use winnow::prelude::*;
use winnow::stream::TokenSlice;
use winnow::token::{any, literal};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParserError {
    /// A token that extends no valid derivation.
    #[error("ParserError: Before: {literal} at {line}:{column}")]
    UnexpectedToken {
        literal: String,
        line: usize,
        column: usize,
    },

    /// Input ended while a construct was incomplete.
    #[error("ParserError: At the end of input ({source_name})")]
    UnexpectedEof { source_name: String },
}

impl ParserError {
    // Avoiding `From` so winnow types don't become part of our public API
    fn from_parse(
        error: winnow::error::ParseError<TokenSlice<'_, Token>, winnow::error::ContextError>,
        source: &str,
    ) -> Self {
        // The error offset indexes the offending token; one past the end
        // means the input ran out mid-construct.
        match error.input().get(error.offset()) {
            Some(token) => ParserError::UnexpectedToken {
                literal: token.kind.to_string(),
                line: token.line,
                column: token.column,
            },
            None => ParserError::UnexpectedEof {
                source_name: source.to_string(),
            },
        }
    }
}

type Tokens<'i> = TokenSlice<'i, Token>;

impl PartialEq<TokenKind> for Token {
    fn eq(&self, other: &TokenKind) -> bool {
        self.kind == *other
    }
}

/// Parses a complete token stream into a [`Program`].
///
/// All parse state lives in the token stream created here, so sequential
/// calls are independent; `source` only names the input in end-of-input
/// diagnostics.
pub fn parse(input: &[Token], source: &str) -> Result<Program, ParserError> {
    let tokens = Tokens::new(input);
    program
        .parse(tokens)
        .map_err(|e| ParserError::from_parse(e, source))
}

/// Returns the lookahead token without consuming it, `None` at end of input.
fn lookahead<'i>(i: &mut Tokens<'i>) -> winnow::Result<Option<&'i Token>> {
    opt(peek(any)).parse_next(i)
}

fn is_type_specifier(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Keyword(Keyword::Void | Keyword::Char | Keyword::Int)
    )
}

fn program(i: &mut Tokens<'_>) -> winnow::Result<Program> {
    let mut declarations = vec![global_declaration(i)?];
    while lookahead(i)?.is_some() {
        declarations.push(global_declaration(i)?);
    }
    Ok(Program { declarations })
}

/// Both alternatives start with `type_specifier declarator`; one token of
/// lookahead then decides: `{` or a type keyword continues a function
/// definition, anything else continues a declaration.
fn global_declaration(i: &mut Tokens<'_>) -> winnow::Result<GlobalDecl> {
    let ty = type_specifier(i)?;
    let first = declarator(i)?;

    let is_definition = match lookahead(i)? {
        Some(token) => token.kind == TokenKind::OpenBrace || is_type_specifier(&token.kind),
        None => false,
    };

    if is_definition {
        let mut declarations = Vec::new();
        while let Some(token) = lookahead(i)? {
            if !is_type_specifier(&token.kind) {
                break;
            }
            declarations.push(declaration(i)?);
        }
        let body = compound_statement(i)?;
        return Ok(GlobalDecl::Function(FunctionDefinition {
            type_specifier: ty,
            declarator: first,
            declarations,
            body,
        }));
    }

    Ok(GlobalDecl::Declaration(declaration_tail(i, ty, first)?))
}

fn type_specifier(i: &mut Tokens<'_>) -> winnow::Result<TypeSpecifier> {
    any.verify_map(|t: &Token| match t.kind {
        TokenKind::Keyword(Keyword::Void) => Some(TypeSpecifier::Void),
        TokenKind::Keyword(Keyword::Char) => Some(TypeSpecifier::Char),
        TokenKind::Keyword(Keyword::Int) => Some(TypeSpecifier::Int),
        _ => None,
    })
    .parse_next(i)
}

fn identifier(i: &mut Tokens<'_>) -> winnow::Result<String> {
    any.verify_map(|t: &Token| match &t.kind {
        TokenKind::Identifier(name) => Some(name.clone()),
        _ => None,
    })
    .parse_next(i)
}

/// Base declarator plus greedily consumed `[...]`/`(...)` suffixes; each
/// suffix wraps the declarator built so far, nesting left-associatively.
fn declarator(i: &mut Tokens<'_>) -> winnow::Result<Declarator> {
    let mut decl = match lookahead(i)?.map(|t| &t.kind) {
        Some(TokenKind::Identifier(_)) => Declarator::Named(identifier(i)?),
        Some(TokenKind::OpenParen) => {
            any.parse_next(i)?;
            let inner = declarator(i)?;
            literal(TokenKind::CloseParen).parse_next(i)?;
            Declarator::Parenthesized(Box::new(inner))
        }
        _ => return fail.parse_next(i),
    };

    loop {
        match lookahead(i)?.map(|t| &t.kind) {
            Some(TokenKind::OpenBracket) => {
                any.parse_next(i)?;
                let size = match lookahead(i)?.map(|t| &t.kind) {
                    Some(TokenKind::CloseBracket) => None,
                    _ => Some(binary_expression(i, 0)?.0),
                };
                literal(TokenKind::CloseBracket).parse_next(i)?;
                decl = Declarator::Array {
                    base: Box::new(decl),
                    size,
                };
            }
            Some(TokenKind::OpenParen) => {
                any.parse_next(i)?;
                let params = match lookahead(i)?.map(|t| &t.kind) {
                    Some(TokenKind::CloseParen) => None,
                    _ => Some(parameter_list(i)?),
                };
                literal(TokenKind::CloseParen).parse_next(i)?;
                decl = Declarator::Function {
                    base: Box::new(decl),
                    params,
                };
            }
            _ => break,
        }
    }

    Ok(decl)
}

fn parameter_list(i: &mut Tokens<'_>) -> winnow::Result<Vec<ParameterDeclaration>> {
    let mut params = vec![parameter_declaration(i)?];
    while opt(literal(TokenKind::Comma)).parse_next(i)?.is_some() {
        params.push(parameter_declaration(i)?);
    }
    Ok(params)
}

fn parameter_declaration(i: &mut Tokens<'_>) -> winnow::Result<ParameterDeclaration> {
    let type_specifier = type_specifier(i)?;
    let declarator = declarator(i)?;
    Ok(ParameterDeclaration {
        type_specifier,
        declarator,
    })
}

fn declaration(i: &mut Tokens<'_>) -> winnow::Result<Declaration> {
    let ty = type_specifier(i)?;
    let first = declarator(i)?;
    declaration_tail(i, ty, first)
}

fn declaration_tail(
    i: &mut Tokens<'_>,
    type_specifier: TypeSpecifier,
    first: Declarator,
) -> winnow::Result<Declaration> {
    let mut init_declarators = vec![init_declarator_tail(i, first)?];
    while opt(literal(TokenKind::Comma)).parse_next(i)?.is_some() {
        init_declarators.push(init_declarator(i)?);
    }
    literal(TokenKind::Semicolon).parse_next(i)?;
    Ok(Declaration {
        type_specifier,
        init_declarators,
    })
}

fn init_declarator(i: &mut Tokens<'_>) -> winnow::Result<InitDeclarator> {
    let declarator = declarator(i)?;
    init_declarator_tail(i, declarator)
}

fn init_declarator_tail(
    i: &mut Tokens<'_>,
    declarator: Declarator,
) -> winnow::Result<InitDeclarator> {
    let initializer = if opt(literal(TokenKind::Assign)).parse_next(i)?.is_some() {
        Some(initializer(i)?)
    } else {
        None
    };
    Ok(InitDeclarator {
        declarator,
        initializer,
    })
}

fn initializer(i: &mut Tokens<'_>) -> winnow::Result<Initializer> {
    if opt(literal(TokenKind::OpenBrace)).parse_next(i)?.is_none() {
        return Ok(Initializer::Expr(assignment_expression(i)?));
    }

    let mut items = Vec::new();
    if opt(literal(TokenKind::CloseBrace)).parse_next(i)?.is_some() {
        return Ok(Initializer::List(items));
    }
    loop {
        items.push(initializer(i)?);
        if opt(literal(TokenKind::Comma)).parse_next(i)?.is_none() {
            break;
        }
        // trailing comma before the closing brace
        if let Some(token) = lookahead(i)? {
            if token.kind == TokenKind::CloseBrace {
                break;
            }
        }
    }
    literal(TokenKind::CloseBrace).parse_next(i)?;
    Ok(Initializer::List(items))
}

fn compound_statement(i: &mut Tokens<'_>) -> winnow::Result<CompoundStatement> {
    literal(TokenKind::OpenBrace).parse_next(i)?;

    let mut declarations = Vec::new();
    while let Some(token) = lookahead(i)? {
        if !is_type_specifier(&token.kind) {
            break;
        }
        declarations.push(declaration(i)?);
    }

    let mut statements = Vec::new();
    loop {
        match lookahead(i)?.map(|t| &t.kind) {
            None | Some(TokenKind::CloseBrace) => break,
            _ => statements.push(statement(i)?),
        }
    }

    literal(TokenKind::CloseBrace).parse_next(i)?;
    Ok(CompoundStatement {
        declarations,
        statements,
    })
}

fn statement(i: &mut Tokens<'_>) -> winnow::Result<Statement> {
    let Some(token) = lookahead(i)? else {
        return fail.parse_next(i);
    };
    match &token.kind {
        TokenKind::OpenBrace => Ok(Statement::Compound(compound_statement(i)?)),
        TokenKind::Keyword(Keyword::If) => if_statement(i),
        TokenKind::Keyword(Keyword::While) => while_statement(i),
        TokenKind::Keyword(Keyword::For) => for_statement(i),
        TokenKind::Keyword(Keyword::Break) => {
            any.parse_next(i)?;
            literal(TokenKind::Semicolon).parse_next(i)?;
            Ok(Statement::Break)
        }
        TokenKind::Keyword(Keyword::Return) => return_statement(i),
        TokenKind::Keyword(Keyword::Assert) => {
            any.parse_next(i)?;
            let expr = expression(i)?;
            literal(TokenKind::Semicolon).parse_next(i)?;
            Ok(Statement::Assert(expr))
        }
        TokenKind::Keyword(Keyword::Print) => print_statement(i),
        TokenKind::Keyword(Keyword::Read) => read_statement(i),
        TokenKind::Semicolon => {
            any.parse_next(i)?;
            Ok(Statement::Expression(None))
        }
        _ => {
            let expr = expression(i)?;
            literal(TokenKind::Semicolon).parse_next(i)?;
            Ok(Statement::Expression(Some(expr)))
        }
    }
}

fn if_statement(i: &mut Tokens<'_>) -> winnow::Result<Statement> {
    literal(TokenKind::Keyword(Keyword::If)).parse_next(i)?;
    literal(TokenKind::OpenParen).parse_next(i)?;
    let condition = expression(i)?;
    literal(TokenKind::CloseParen).parse_next(i)?;
    let then_branch = Box::new(statement(i)?);
    // `else` binds here, to the nearest unmatched `if`
    let else_branch = if opt(literal(TokenKind::Keyword(Keyword::Else)))
        .parse_next(i)?
        .is_some()
    {
        Some(Box::new(statement(i)?))
    } else {
        None
    };
    Ok(Statement::If {
        condition,
        then_branch,
        else_branch,
    })
}

fn while_statement(i: &mut Tokens<'_>) -> winnow::Result<Statement> {
    literal(TokenKind::Keyword(Keyword::While)).parse_next(i)?;
    literal(TokenKind::OpenParen).parse_next(i)?;
    let condition = expression(i)?;
    literal(TokenKind::CloseParen).parse_next(i)?;
    let body = Box::new(statement(i)?);
    Ok(Statement::While { condition, body })
}

fn for_statement(i: &mut Tokens<'_>) -> winnow::Result<Statement> {
    literal(TokenKind::Keyword(Keyword::For)).parse_next(i)?;
    literal(TokenKind::OpenParen).parse_next(i)?;

    let init = match lookahead(i)?.map(|t| &t.kind) {
        Some(kind) if is_type_specifier(kind) => {
            // the declaration consumes its own `;`
            Some(ForInit::Declaration(declaration(i)?))
        }
        Some(TokenKind::Semicolon) => {
            any.parse_next(i)?;
            None
        }
        _ => {
            let expr = expression(i)?;
            literal(TokenKind::Semicolon).parse_next(i)?;
            Some(ForInit::Expression(expr))
        }
    };

    let condition = match lookahead(i)?.map(|t| &t.kind) {
        Some(TokenKind::Semicolon) => None,
        _ => Some(expression(i)?),
    };
    literal(TokenKind::Semicolon).parse_next(i)?;

    let step = match lookahead(i)?.map(|t| &t.kind) {
        Some(TokenKind::CloseParen) => None,
        _ => Some(expression(i)?),
    };
    literal(TokenKind::CloseParen).parse_next(i)?;

    let body = Box::new(statement(i)?);
    Ok(Statement::For {
        init,
        condition,
        step,
        body,
    })
}

fn return_statement(i: &mut Tokens<'_>) -> winnow::Result<Statement> {
    literal(TokenKind::Keyword(Keyword::Return)).parse_next(i)?;
    let expr = match lookahead(i)?.map(|t| &t.kind) {
        Some(TokenKind::Semicolon) => None,
        _ => Some(expression(i)?),
    };
    literal(TokenKind::Semicolon).parse_next(i)?;
    Ok(Statement::Return(expr))
}

fn print_statement(i: &mut Tokens<'_>) -> winnow::Result<Statement> {
    literal(TokenKind::Keyword(Keyword::Print)).parse_next(i)?;
    literal(TokenKind::OpenParen).parse_next(i)?;
    let expr = match lookahead(i)?.map(|t| &t.kind) {
        Some(TokenKind::CloseParen) => None,
        _ => Some(expression(i)?),
    };
    literal(TokenKind::CloseParen).parse_next(i)?;
    literal(TokenKind::Semicolon).parse_next(i)?;
    Ok(Statement::Print(expr))
}

fn read_statement(i: &mut Tokens<'_>) -> winnow::Result<Statement> {
    literal(TokenKind::Keyword(Keyword::Read)).parse_next(i)?;
    literal(TokenKind::OpenParen).parse_next(i)?;
    let target = argument_expression(i)?;
    literal(TokenKind::CloseParen).parse_next(i)?;
    literal(TokenKind::Semicolon).parse_next(i)?;
    Ok(Statement::Read(target))
}

/// `<exp>`: one assignment expression, or a comma list folded into
/// [`Expression::ExprList`] preserving source order.
fn expression(i: &mut Tokens<'_>) -> winnow::Result<Expression> {
    let first = assignment_expression(i)?;
    if opt(literal(TokenKind::Comma)).parse_next(i)?.is_none() {
        return Ok(first);
    }
    let mut items = vec![first, assignment_expression(i)?];
    while opt(literal(TokenKind::Comma)).parse_next(i)?.is_some() {
        items.push(assignment_expression(i)?);
    }
    Ok(Expression::ExprList(items))
}

/// Like [`expression`], used for call arguments and `read` targets.
fn argument_expression(i: &mut Tokens<'_>) -> winnow::Result<Expression> {
    let mut args = argument_expression_list(i)?;
    if args.len() == 1 {
        return Ok(args.remove(0));
    }
    Ok(Expression::ExprList(args))
}

fn argument_expression_list(i: &mut Tokens<'_>) -> winnow::Result<Vec<Expression>> {
    let mut args = vec![assignment_expression(i)?];
    while opt(literal(TokenKind::Comma)).parse_next(i)?.is_some() {
        args.push(assignment_expression(i)?);
    }
    Ok(args)
}

/// `=` is only legal after a left side derived through the unary
/// production; `a + b = c` errors at the `=`, while `(a + b) = c` is
/// accepted because the parenthesized expression reduces through
/// `<primary-exp>`. Chained assignment errors at the second `=` in the
/// caller, which finds it dangling.
fn assignment_expression(i: &mut Tokens<'_>) -> winnow::Result<Expression> {
    let (expr, is_unary) = binary_expression(i, 0)?;
    match lookahead(i)?.map(|t| &t.kind) {
        Some(TokenKind::Assign) => {
            if !is_unary {
                return fail.parse_next(i);
            }
            any.parse_next(i)?;
            let (value, _) = binary_expression(i, 0)?;
            Ok(Expression::Assign {
                target: Box::new(expr),
                value: Box::new(value),
            })
        }
        _ => Ok(expr),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Assoc {
    Left,
    NonAssoc,
}

fn binary_operator(kind: &TokenKind) -> Option<(BinaryOperator, u8, Assoc)> {
    Some(match kind {
        TokenKind::Or => (BinaryOperator::Or, 1, Assoc::Left),
        TokenKind::And => (BinaryOperator::And, 1, Assoc::Left),
        TokenKind::Equal => (BinaryOperator::Equal, 2, Assoc::NonAssoc),
        TokenKind::NotEqual => (BinaryOperator::NotEqual, 2, Assoc::NonAssoc),
        TokenKind::LessThan => (BinaryOperator::LessThan, 3, Assoc::NonAssoc),
        TokenKind::LessEqual => (BinaryOperator::LessEqual, 3, Assoc::NonAssoc),
        TokenKind::GreaterThan => (BinaryOperator::GreaterThan, 3, Assoc::NonAssoc),
        TokenKind::GreaterEqual => (BinaryOperator::GreaterEqual, 3, Assoc::NonAssoc),
        TokenKind::Plus => (BinaryOperator::Add, 4, Assoc::Left),
        TokenKind::Minus => (BinaryOperator::Subtract, 4, Assoc::Left),
        TokenKind::Star => (BinaryOperator::Multiply, 5, Assoc::Left),
        TokenKind::Slash => (BinaryOperator::Divide, 5, Assoc::Left),
        TokenKind::Percent => (BinaryOperator::Modulo, 5, Assoc::Left),
        _ => return None,
    })
}

/// Precedence climbing over the flat binary rule. Returns the expression
/// and whether it was derived purely through `<unary-exp>`, which the
/// assignment rule needs for its left side.
fn binary_expression(i: &mut Tokens<'_>, min_prec: u8) -> winnow::Result<(Expression, bool)> {
    let mut lhs = unary_expression(i)?;
    let mut is_unary = true;

    while let Some(token) = lookahead(i)? {
        let Some((op, prec, assoc)) = binary_operator(&token.kind) else {
            break;
        };
        if prec < min_prec {
            break;
        }
        any.parse_next(i)?;
        let (rhs, _) = binary_expression(i, prec + 1)?;
        lhs = Expression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
        is_unary = false;

        if assoc == Assoc::NonAssoc {
            // same-tier chaining like `a < b < c` must not left-associate
            if let Some(next) = lookahead(i)? {
                if binary_operator(&next.kind).is_some_and(|(_, p, _)| p == prec) {
                    return fail.parse_next(i);
                }
            }
        }
    }

    Ok((lhs, is_unary))
}

fn unary_expression(i: &mut Tokens<'_>) -> winnow::Result<Expression> {
    if let Some(token) = lookahead(i)? {
        let op = match token.kind {
            TokenKind::Plus => Some(UnaryOperator::Plus),
            TokenKind::Minus => Some(UnaryOperator::Minus),
            TokenKind::Not => Some(UnaryOperator::Not),
            _ => None,
        };
        if let Some(op) = op {
            any.parse_next(i)?;
            let operand = unary_expression(i)?;
            return Ok(Expression::Unary {
                op,
                operand: Box::new(operand),
            });
        }
    }
    postfix_expression(i)
}

fn postfix_expression(i: &mut Tokens<'_>) -> winnow::Result<Expression> {
    let mut expr = primary_expression(i)?;
    loop {
        match lookahead(i)?.map(|t| &t.kind) {
            Some(TokenKind::OpenBracket) => {
                any.parse_next(i)?;
                let index = expression(i)?;
                literal(TokenKind::CloseBracket).parse_next(i)?;
                expr = Expression::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            }
            Some(TokenKind::OpenParen) => {
                any.parse_next(i)?;
                let args = match lookahead(i)?.map(|t| &t.kind) {
                    Some(TokenKind::CloseParen) => None,
                    _ => Some(argument_expression_list(i)?),
                };
                literal(TokenKind::CloseParen).parse_next(i)?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    args,
                };
            }
            _ => break,
        }
    }
    Ok(expr)
}

fn primary_expression(i: &mut Tokens<'_>) -> winnow::Result<Expression> {
    if let Some(token) = lookahead(i)? {
        if token.kind == TokenKind::OpenParen {
            any.parse_next(i)?;
            let expr = expression(i)?;
            literal(TokenKind::CloseParen).parse_next(i)?;
            return Ok(expr);
        }
    }
    any.verify_map(|t: &Token| match &t.kind {
        TokenKind::Identifier(name) => Some(Expression::Identifier(name.clone())),
        TokenKind::IntConstant(value) => Some(Expression::IntConstant(*value)),
        TokenKind::CharConstant(c) => Some(Expression::CharConstant(*c)),
        TokenKind::StringLiteral(s) => Some(Expression::StringLiteral(s.clone())),
        _ => None,
    })
    .parse_next(i)
}
