//! This module provides the [`Parser`].

mod exprs;
mod stmts;

use crate::{
    ast::SpanStmt,
    span::Span,
    tokens::{Token, TokenType},
};
use std::fmt;
use thiserror::Error;

/// An error that occurred during parsing.
#[derive(Clone, Debug, PartialEq, Error)]
pub struct ParseError {
    /// The message to display to the user.
    pub message: String,

    /// The lexeme of the token that caused the error, or the token's name for `Eof`.
    pub lexeme: String,

    /// The span of the token that caused the error.
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParseError({:?})", self.message)
    }
}

/// A result wrapping a [`ParseError`].
type ParseResult<T, E = ParseError> = ::std::result::Result<T, E>;

/// A recursive descent parser for Lox.
///
/// It parses this grammar:
/// ```text
/// program     → declaration* EOF ;
///
/// declaration → classDecl | funDecl | varDecl | statement ;
///
/// classDecl   → "class" IDENTIFIER ( "<" IDENTIFIER )? "{" function* "}" ;
/// funDecl     → "fun" function ;
/// function    → IDENTIFIER "(" parameters? ")" block ;
/// parameters  → IDENTIFIER ( "," IDENTIFIER )* ;
/// varDecl     → "var" IDENTIFIER ( "=" expression )? ";" ;
///
/// statement   → exprStmt | ifStmt | printStmt | returnStmt | whileStmt | forStmt | block ;
/// exprStmt    → expression ";" ;
/// ifStmt      → "if" "(" expression ")" statement ( "else" statement )? ;
/// printStmt   → "print" expression ";" ;
/// returnStmt  → "return" expression? ";" ;
/// whileStmt   → "while" "(" expression ")" statement ;
/// forStmt     → "for" "(" ( varDecl | exprStmt | ";" ) expression? ";" expression? ")" statement ;
/// block       → "{" declaration* "}" ;
///
/// expression  → assignment ;
/// assignment  → ( call "." )? IDENTIFIER "=" assignment | logic_or ;
/// logic_or    → logic_and ( "or" logic_and )* ;
/// logic_and   → equality ( "and" equality )* ;
/// equality    → comparison ( ( "!=" | "==" ) comparison )* ;
/// comparison  → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
/// term        → factor ( ( "-" | "+" ) factor )* ;
/// factor      → unary ( ( "/" | "*" ) unary )* ;
/// unary       → ( "!" | "-" ) unary | call ;
/// call        → primary ( "(" arguments? ")" | "." IDENTIFIER )* ;
/// arguments   → expression ( "," expression )* ;
/// primary     → NUMBER | STRING | "true" | "false" | "nil" | "this"
///             | "super" "." IDENTIFIER | "(" expression ")" | IDENTIFIER ;
/// ```
///
/// Parsing is fail-fast: the first error aborts and is returned to the caller.
pub struct Parser<'s> {
    /// The token list that we're parsing.
    tokens: Vec<Token<'s>>,

    /// The index of the token currently being considered.
    current: usize,
}

impl<'s> Parser<'s> {
    /// Parse the given list of tokens, stopping at the first error.
    pub fn parse(tokens: Vec<Token<'s>>) -> ParseResult<Vec<SpanStmt>> {
        let mut parser = Self { tokens, current: 0 };

        let mut statements = Vec::new();
        while !parser.is_at_end() {
            statements.push(parser.parse_declaration()?);
        }

        Ok(statements)
    }

    /// Get the current token.
    #[inline]
    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.current)
    }

    /// Get the previous token.
    #[inline]
    fn previous(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.current.saturating_sub(1))
    }

    /// Are we at the end of the token list?
    #[inline]
    fn is_at_end(&self) -> bool {
        self.check(TokenType::Eof)
    }

    /// Advance the internal pointer and get the next token.
    fn advance(&mut self) -> Token<'s> {
        if !self.is_at_end() {
            self.current += 1;
        }
        *self.previous().unwrap()
    }

    /// Check if the next token is of the given type.
    #[inline]
    fn check(&self, token_type: TokenType) -> bool {
        self.peek().is_some_and(|t| t.token_type == token_type)
    }

    /// Check if the next token is of one of the given types and advance if it is.
    fn match_tokens(&mut self, token_types: impl IntoIterator<Item = TokenType>) -> bool {
        for token_type in token_types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }

        false
    }

    /// Build a [`ParseError`] pointing at the given token.
    fn error_at(token: &Token<'s>, message: String) -> ParseError {
        ParseError {
            message,
            lexeme: token.lexeme_or_name(),
            span: token.span,
        }
    }

    /// Build a [`ParseError`] pointing at the current token.
    fn error_at_current(&self, message: String) -> ParseError {
        let token = self.peek().or_else(|| self.previous()).unwrap();
        Self::error_at(token, message)
    }

    /// Expect the next token to be of the given type and return it if so, or return an error with
    /// the given message if the check fails.
    fn consume(&mut self, token_type: TokenType, message: String) -> ParseResult<Token<'s>> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{BinaryOperator, Expr, Stmt, UnaryOperator},
        scanner::Scanner,
        span::WithSpan,
    };

    fn parse_code(code: &str) -> ParseResult<Vec<SpanStmt>> {
        Parser::parse(Scanner::scan_tokens(code).unwrap())
    }

    #[test]
    fn precedence() {
        let stmts = parse_code("print 1 + 2 * 3;").unwrap();

        let Stmt::Print(expr) = &stmts[0].value else {
            panic!("Expected print statement, got {stmts:?}");
        };
        let Expr::Binary(left, plus, right) = &expr.value else {
            panic!("Expected binary expression, got {expr:?}");
        };
        assert_eq!(plus.value, BinaryOperator::Plus);
        assert_eq!(left.value, Expr::Number(1.0));

        let Expr::Binary(two, star, three) = &right.value else {
            panic!("Expected nested binary expression, got {right:?}");
        };
        assert_eq!(star.value, BinaryOperator::Star);
        assert_eq!(two.value, Expr::Number(2.0));
        assert_eq!(three.value, Expr::Number(3.0));
    }

    #[test]
    fn unary_and_grouping() {
        let stmts = parse_code("print -(1 + 2);").unwrap();

        let Stmt::Print(expr) = &stmts[0].value else {
            panic!("Expected print statement");
        };
        let Expr::Unary(minus, operand) = &expr.value else {
            panic!("Expected unary expression, got {expr:?}");
        };
        assert_eq!(minus.value, UnaryOperator::Minus);
        assert!(matches!(operand.value, Expr::Grouping(_)));
    }

    #[test]
    fn for_loop_desugars_to_while_in_block() {
        let stmts = parse_code("for (var i = 0; i < 3; i = i + 1) print i;").unwrap();

        let Stmt::Block(outer) = &stmts[0].value else {
            panic!("Expected the for loop to desugar to a block, got {stmts:?}");
        };
        assert!(matches!(outer[0].value, Stmt::VarDecl(_, _)));

        let Stmt::While(_, body) = &outer[1].value else {
            panic!("Expected a while loop inside the block, got {outer:?}");
        };
        let Stmt::Block(body) = &body.value else {
            panic!("Expected the loop body to be a block, got {body:?}");
        };
        assert!(matches!(body[0].value, Stmt::Print(_)));
        assert!(matches!(
            body[1].value,
            Stmt::Expression(WithSpan {
                value: Expr::Assign(_, _),
                ..
            })
        ));
    }

    #[test]
    fn for_loop_without_condition_loops_forever() {
        let stmts = parse_code("for (;;) print 1;").unwrap();

        let Stmt::While(condition, _) = &stmts[0].value else {
            panic!("Expected a bare while loop, got {stmts:?}");
        };
        assert_eq!(condition.value, Expr::Boolean(true));
    }

    #[test]
    fn assignment_targets() {
        let stmts = parse_code("a = 1; a.b = 2;").unwrap();
        assert!(matches!(
            stmts[0].value,
            Stmt::Expression(ref e) if matches!(e.value, Expr::Assign(_, _))
        ));
        assert!(matches!(
            stmts[1].value,
            Stmt::Expression(ref e) if matches!(e.value, Expr::Set(_, _, _))
        ));

        let error = parse_code("1 = 2;").unwrap_err();
        assert_eq!(error.message, "Invalid assignment target");
    }

    #[test]
    fn class_with_superclass_and_super() {
        let stmts =
            parse_code("class B < A { greet() { super.greet(); print this; } }").unwrap();

        let Stmt::ClassDecl(name, superclass, methods) = &stmts[0].value else {
            panic!("Expected class declaration, got {stmts:?}");
        };
        assert_eq!(name.value, "B");
        assert_eq!(superclass.as_ref().unwrap().value, "A");
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].value.0.value, "greet");
    }

    #[test]
    fn fail_fast_returns_first_error() {
        let error = parse_code("var = 1;\nvar b = ;").unwrap_err();
        assert_eq!(error.message, "Expected variable name after 'var' keyword");
        assert_eq!(error.lexeme, "=");
    }

    #[test]
    fn error_at_eof_names_the_token() {
        let error = parse_code("print 1").unwrap_err();
        assert_eq!(error.lexeme, "Eof");
    }
}
