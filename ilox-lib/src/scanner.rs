//! This module handles scanning source code to produce tokens.

use crate::{
    span::Span,
    tokens::{Token, TokenLiteral, TokenType},
};
use std::fmt;
use thiserror::Error;

/// An error that occurred whilst scanning.
#[derive(Clone, Debug, PartialEq, Error)]
pub struct ScanError {
    /// The error message.
    pub message: String,

    /// The offending lexeme.
    pub lexeme: String,

    /// The span where the error occurred.
    pub span: Span,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScanError({:?})", self.message)
    }
}

/// A result wrapping a [`ScanError`].
type Result<T, E = ScanError> = ::std::result::Result<T, E>;

/// A scanner to get tokens from source code.
pub struct Scanner<'s> {
    /// The source code.
    source: &'s str,

    /// The tokens that we've already scanned out.
    tokens: Vec<Token<'s>>,

    /// A byte index to the start of the token currently being scanned.
    start: usize,

    /// A byte index to the character currently being considered.
    current: usize,
}

impl<'s> Scanner<'s> {
    /// Scan all the tokens from the given source code, stopping at the first error.
    pub fn scan_tokens(source: &'s str) -> Result<Vec<Token<'s>>> {
        let mut scanner = Self {
            source,
            tokens: Vec::new(),
            start: 0,
            current: 0,
        };

        while !scanner.is_at_end() {
            scanner.start = scanner.current;
            scanner.scan_token()?;
        }

        scanner.tokens.push(Token {
            token_type: TokenType::Eof,
            lexeme: "",
            literal: None,
            span: Span {
                start: scanner.current,
                end: scanner.current,
            },
        });

        Ok(scanner.tokens)
    }

    /// Are we at the end of the source code?
    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Get the span from the start of this lexeme to the character most recently consumed.
    #[inline]
    fn current_span(&self) -> Span {
        Span {
            start: self.start,
            end: self.current.saturating_sub(1),
        }
    }

    /// Scan a single token.
    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen, None),
            ')' => self.add_token(TokenType::RightParen, None),
            '{' => self.add_token(TokenType::LeftBrace, None),
            '}' => self.add_token(TokenType::RightBrace, None),
            ',' => self.add_token(TokenType::Comma, None),
            '.' => self.add_token(TokenType::Dot, None),
            '-' => self.add_token(TokenType::Minus, None),
            '+' => self.add_token(TokenType::Plus, None),
            ';' => self.add_token(TokenType::Semicolon, None),
            '*' => self.add_token(TokenType::Star, None),

            '/' => {
                if self.match_char('/') {
                    while self.current_char() != Some('\n') && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash, None);
                }
            }
            '!' => {
                let token_type = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type, None);
            }
            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type, None);
            }
            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type, None);
            }
            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type, None);
            }

            ' ' | '\t' | '\r' | '\n' => {}

            '"' => self.scan_string()?,

            '0'..='9' => self.scan_number(),

            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier_or_keyword(),

            c => return Err(self.error(format!("Unidentified token {c:?}"))),
        }

        Ok(())
    }

    /// Build a [`ScanError`] for the lexeme currently being scanned.
    fn error(&self, message: String) -> ScanError {
        ScanError {
            message,
            lexeme: self.source[self.start..self.current].to_string(),
            span: self.current_span(),
        }
    }

    /// Return the char pointed to by `self.current`.
    #[inline]
    fn current_char(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    /// Return the char after the one pointed to by `self.current`.
    #[inline]
    fn next_char(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    /// Advance the internal pointer.
    fn advance(&mut self) -> char {
        let c = self.current_char().unwrap_or_else(|| {
            panic!(
                "source: {:?}, current: {}, tokens: {:?}",
                self.source, self.current, self.tokens
            )
        });
        self.current += c.len_utf8();
        c
    }

    /// Add a token with the given token type and literal to the internal token vec.
    fn add_token(&mut self, token_type: TokenType, literal: Option<TokenLiteral<'s>>) {
        let lexeme = &self.source[self.start..self.current];
        self.tokens.push(Token {
            token_type,
            lexeme,
            literal,
            span: self.current_span(),
        });
    }

    /// Conditionally [`advance`](Self::advance) if the next char is the expected one.
    fn match_char(&mut self, expected: char) -> bool {
        if self.current_char() == Some(expected) {
            self.current += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Scan a string literal. Strings may span newlines and have no escape sequences.
    fn scan_string(&mut self) -> Result<()> {
        while self.current_char() != Some('"') && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            return Err(self.error("Unterminated string".to_string()));
        }

        // The closing "
        self.advance();

        self.add_token(
            TokenType::String,
            Some(TokenLiteral::String(
                // Trim the surrounding quotes
                &self.source[(self.start + 1)..(self.current - 1)],
            )),
        );

        Ok(())
    }

    /// Scan a numeric literal.
    fn scan_number(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.current_char() == Some('.') && self.next_char().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        self.add_token(
            TokenType::Number,
            Some(TokenLiteral::Number(
                self.source[self.start..self.current].parse().unwrap(),
            )),
        );
    }

    /// Scan a single identifier or keyword.
    fn scan_identifier_or_keyword(&mut self) {
        /// Check if the given character is valid to be used in an identifier.
        fn is_ident_char(c: Option<char>) -> bool {
            c.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        }

        while is_ident_char(self.current_char()) {
            self.advance();
        }

        let token_type = match &self.source[self.start..self.current] {
            "and" => TokenType::And,
            "class" => TokenType::Class,
            "else" => TokenType::Else,
            "false" => TokenType::False,
            "for" => TokenType::For,
            "fun" => TokenType::Fun,
            "if" => TokenType::If,
            "nil" => TokenType::Nil,
            "or" => TokenType::Or,
            "print" => TokenType::Print,
            "return" => TokenType::Return,
            "super" => TokenType::Super,
            "this" => TokenType::This,
            "true" => TokenType::True,
            "var" => TokenType::Var,
            "while" => TokenType::While,
            _ => TokenType::Identifier,
        };

        self.add_token(token_type, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenType::*;

    fn scan<'s>(code: &'s str) -> Vec<(TokenType, &'s str, Option<TokenLiteral<'s>>)> {
        Scanner::scan_tokens(code)
            .unwrap()
            .into_iter()
            .map(|token| (token.token_type, token.lexeme, token.literal))
            .collect()
    }

    #[test]
    fn identifiers() {
        let scanned = scan("andy formless fo _ _123 _abc ab123");

        assert_eq!(
            scanned,
            vec![
                (Identifier, "andy", None),
                (Identifier, "formless", None),
                (Identifier, "fo", None),
                (Identifier, "_", None),
                (Identifier, "_123", None),
                (Identifier, "_abc", None),
                (Identifier, "ab123", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn keywords() {
        let scanned = scan(
            "and class else false for fun if nil or print return super this true var while",
        );

        assert_eq!(
            scanned,
            vec![
                (And, "and", None),
                (Class, "class", None),
                (Else, "else", None),
                (False, "false", None),
                (For, "for", None),
                (Fun, "fun", None),
                (If, "if", None),
                (Nil, "nil", None),
                (Or, "or", None),
                (Print, "print", None),
                (Return, "return", None),
                (Super, "super", None),
                (This, "this", None),
                (True, "true", None),
                (Var, "var", None),
                (While, "while", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn numbers() {
        let scanned = scan("123\n123.456\n.456\n123.");

        assert_eq!(
            scanned,
            vec![
                (Number, "123", Some(TokenLiteral::Number(123.0))),
                (Number, "123.456", Some(TokenLiteral::Number(123.456))),
                (Dot, ".", None),
                (Number, "456", Some(TokenLiteral::Number(456.0))),
                (Number, "123", Some(TokenLiteral::Number(123.0))),
                (Dot, ".", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn punctuators() {
        let scanned = scan("(){};,+-*!===<=>=!=! =<>/.");

        assert_eq!(
            scanned,
            vec![
                (LeftParen, "(", None),
                (RightParen, ")", None),
                (LeftBrace, "{", None),
                (RightBrace, "}", None),
                (Semicolon, ";", None),
                (Comma, ",", None),
                (Plus, "+", None),
                (Minus, "-", None),
                (Star, "*", None),
                (BangEqual, "!=", None),
                (EqualEqual, "==", None),
                (LessEqual, "<=", None),
                (GreaterEqual, ">=", None),
                (BangEqual, "!=", None),
                (Bang, "!", None),
                (Equal, "=", None),
                (Less, "<", None),
                (Greater, ">", None),
                (Slash, "/", None),
                (Dot, ".", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn strings() {
        let scanned = scan("\"\"\n\"string\"\n\"spans\nlines\"");

        assert_eq!(
            scanned,
            vec![
                (String, "\"\"", Some(TokenLiteral::String(""))),
                (String, "\"string\"", Some(TokenLiteral::String("string"))),
                (
                    String,
                    "\"spans\nlines\"",
                    Some(TokenLiteral::String("spans\nlines"))
                ),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn comments_and_whitespace() {
        let scanned = scan("space    tabs\t\t\t\tnewlines\n\n\n// a comment\nend");

        assert_eq!(
            scanned,
            vec![
                (Identifier, "space", None),
                (Identifier, "tabs", None),
                (Identifier, "newlines", None),
                (Identifier, "end", None),
                (Eof, "", None),
            ]
        );
    }

    #[test]
    fn unterminated_string() {
        let error = Scanner::scan_tokens("var s = \"oops").unwrap_err();
        assert_eq!(error.message, "Unterminated string");
    }

    #[test]
    fn unidentified_token() {
        let error = Scanner::scan_tokens("var x = 1 @ 2;").unwrap_err();
        assert!(error.message.starts_with("Unidentified token"));
        assert_eq!(error.lexeme, "@");
    }

    #[test]
    fn always_ends_with_eof() {
        for code in ["", "   ", "// only a comment", "var x = 1;"] {
            let tokens = Scanner::scan_tokens(code).unwrap();
            let eof_count = tokens
                .iter()
                .filter(|t| t.token_type == TokenType::Eof)
                .count();
            assert_eq!(eof_count, 1);
            assert_eq!(tokens.last().unwrap().token_type, TokenType::Eof);
        }
    }
}
