//! Module `scanner` implements the single‑pass lexer for SeeMM source text.
//!
//! It turns a `&str` into a `Vec<Token>`, skipping whitespace and `//`
//! comments, and always terminates the vector with exactly one `EOF` token.
//!
//! # Identifier typing
//!
//! The scanner also stamps every `IDENTIFIER` token with a [`SemanticType`].
//! It consults (and mutates) an identifier→type table that the host pre‑seeds
//! with the types of its variables and functions:
//!
//! - A name seen for the first time takes the type named by the tokens right
//!   before it (`int x`, `float[] xs`), or `NONE` if there is no type keyword.
//! - A known name with no type keyword in front is stamped with the known type.
//! - A known but still untyped (`NONE`) name that now appears after a type
//!   keyword is upgraded, and every token already emitted for that name is
//!   rewritten to the new type.
//! - A known, typed name that appears after a *different* type keyword keeps
//!   its first type and a diagnostic is recorded.
//!
//! Unexpected characters are reported through [`Diagnostics`] and skipped;
//! scanning never stops early.

use std::collections::HashMap;

use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

use crate::error::{Diagnostics, Stage};
use crate::token::{Literal, Token, TokenType};
use crate::types::SemanticType;

/// Identifier → declared type table shared between host and scanner.
pub type IdentifierTypes = HashMap<String, SemanticType>;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"bool"     => TokenType::BOOL,
    b"break"    => TokenType::BREAK,
    b"continue" => TokenType::CONTINUE,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"float"    => TokenType::FLOAT,
    b"if"       => TokenType::IF,
    b"int"      => TokenType::INT,
    b"return"   => TokenType::RETURN,
    b"true"     => TokenType::TRUE,
    b"void"     => TokenType::VOID,
    b"while"    => TokenType::WHILE,
};

/// Convenience wrapper: scan `source` against `identifiers`.
pub fn scan(
    source: &str,
    identifiers: &mut IdentifierTypes,
    diagnostics: &mut Diagnostics,
) -> Vec<Token> {
    Scanner::new(source, identifiers).scan_tokens(diagnostics)
}

pub struct Scanner<'a, 'm> {
    src: &'a str,
    start: usize, // index of the *first* byte of the current lexeme
    curr: usize,  // index *one past* the last byte examined
    line: usize,  // 1‑based line counter (\n increments)
    identifiers: &'m mut IdentifierTypes,
    tokens: Vec<Token>,
}

impl<'a, 'm> Scanner<'a, 'm> {
    pub fn new(src: &'a str, identifiers: &'m mut IdentifierTypes) -> Self {
        info!(
            "Scanner created over {} bytes with {} known identifiers",
            src.len(),
            identifiers.len()
        );

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            identifiers,
            tokens: Vec::new(),
        }
    }

    /// Scan the whole input.
    pub fn scan_tokens(mut self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.curr;
            self.scan_token(diagnostics);
        }

        self.tokens
            .push(Token::new(TokenType::EOF, "", self.line, self.src.len()));

        info!("Scanned {} tokens", self.tokens.len());

        self.tokens
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes()[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte, `0` past the end.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.bytes().get(self.curr).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.bytes().get(self.curr + 1).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        &self.src[self.start..self.curr]
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    fn scan_token(&mut self, diagnostics: &mut Diagnostics) {
        let b = self.advance();

        match b {
            b'(' => self.add_token(TokenType::LEFT_PAREN),
            b')' => self.add_token(TokenType::RIGHT_PAREN),
            b'{' => self.add_token(TokenType::LEFT_BRACE),
            b'}' => self.add_token(TokenType::RIGHT_BRACE),
            b'[' => self.add_token(TokenType::LEFT_BRACKET),
            b']' => self.add_token(TokenType::RIGHT_BRACKET),
            b',' => self.add_token(TokenType::COMMA),
            b'.' => self.add_token(TokenType::DOT),
            b'-' => self.add_token(TokenType::MINUS),
            b'+' => self.add_token(TokenType::PLUS),
            b';' => self.add_token(TokenType::SEMICOLON),
            b'*' => self.add_token(TokenType::STAR),
            b'%' => self.add_token(TokenType::PERCENT),

            b'!' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };
                self.add_token(tt);
            }

            b'=' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };
                self.add_token(tt);
            }

            b'<' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };
                self.add_token(tt);
            }

            b'>' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };
                self.add_token(tt);
            }

            b'&' if self.match_byte(b'&') => self.add_token(TokenType::AND),
            b'|' if self.match_byte(b'|') => self.add_token(TokenType::OR),

            b' ' | b'\r' | b'\t' => {}

            b'\n' => {
                self.line += 1;
            }

            b'/' => {
                if self.match_byte(b'/') {
                    // Fast‑forward to the newline; it is left for the main loop
                    // so the line counter stays right.
                    match memchr(b'\n', &self.bytes()[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.src.len(),
                    }
                } else {
                    self.add_token(TokenType::SLASH);
                }
            }

            b'0'..=b'9' => self.number(diagnostics),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(diagnostics),

            _ => {
                // Swallow the rest of a multi‑byte character so it is reported once.
                if b >= 0x80 {
                    while !self.is_at_end() && (self.peek() & 0xC0) == 0x80 {
                        self.advance();
                    }
                }

                diagnostics.push(
                    Stage::Lex,
                    self.line,
                    "",
                    format!("Unexpected character '{}'.", self.lexeme()),
                );
            }
        }
    }

    /// `123` or `1.5`; a `.` only belongs to the number if a digit follows.
    fn number(&mut self, diagnostics: &mut Diagnostics) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }

            let value: f64 = self.lexeme().parse().unwrap_or(0.0);
            self.add_literal(TokenType::FLOAT_NUMBER, Literal::Float(value));
            return;
        }

        let value: i64 = match self.lexeme().parse() {
            Ok(v) => v,
            Err(_) => {
                diagnostics.push(
                    Stage::Lex,
                    self.line,
                    format!(" at '{}'", self.lexeme()),
                    "Integer literal is too large.",
                );
                0
            }
        };

        self.add_literal(TokenType::INT_NUMBER, Literal::Int(value));
    }

    fn identifier(&mut self, diagnostics: &mut Diagnostics) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let tt: TokenType = KEYWORDS
            .get(self.lexeme().as_bytes())
            .copied()
            .unwrap_or(TokenType::IDENTIFIER);

        match tt {
            TokenType::TRUE => self.add_literal(tt, Literal::Bool(true)),
            TokenType::FALSE => self.add_literal(tt, Literal::Bool(false)),
            TokenType::IDENTIFIER => self.add_identifier(diagnostics),
            _ => self.add_token(tt),
        }
    }

    // ───────────────────────────── emission ────────────────────────────────

    fn make_token(&self, tt: TokenType) -> Token {
        Token::new(tt, self.lexeme(), self.line, self.start)
    }

    fn add_token(&mut self, tt: TokenType) {
        let token = self.make_token(tt);
        self.tokens.push(token);
    }

    fn add_literal(&mut self, tt: TokenType, literal: Literal) {
        let token = self.make_token(tt).with_literal(literal);
        self.tokens.push(token);
    }

    fn add_identifier(&mut self, diagnostics: &mut Diagnostics) {
        let mut token = self.make_token(TokenType::IDENTIFIER);
        let declared: Option<SemanticType> = self.declared_type_before();

        let stamped = match (self.identifiers.get(&token.lexeme).copied(), declared) {
            (None, declared) => {
                let ty = declared.unwrap_or(SemanticType::NONE);
                self.identifiers.insert(token.lexeme.clone(), ty);
                ty
            }

            (Some(known), None) => known,

            (Some(SemanticType::NONE), Some(ty)) => {
                debug!("Backfilling '{}' as {:?}", token.lexeme, ty);

                for earlier in self.tokens.iter_mut() {
                    if earlier.token_type == TokenType::IDENTIFIER && earlier.lexeme == token.lexeme {
                        earlier.semantic_type = ty;
                    }
                }
                self.identifiers.insert(token.lexeme.clone(), ty);
                ty
            }

            (Some(known), Some(ty)) if known == ty => known,

            (Some(known), Some(ty)) => {
                diagnostics.push(
                    Stage::Lex,
                    token.line,
                    format!(" at '{}'", token.lexeme),
                    format!(
                        "'{}' is already declared as {} and can't be redeclared as {}.",
                        token.lexeme, known, ty
                    ),
                );
                known
            }
        };

        token.semantic_type = stamped;
        self.tokens.push(token);
    }

    /// The type spelled by the tokens right before the current identifier:
    /// `int x` → INT, `int[] x` → INT_ARRAY.
    fn declared_type_before(&self) -> Option<SemanticType> {
        let n = self.tokens.len();
        let prev = self.tokens.last()?;

        if prev.token_type == TokenType::RIGHT_BRACKET {
            if n >= 3 && self.tokens[n - 2].token_type == TokenType::LEFT_BRACKET {
                return self.tokens[n - 3]
                    .token_type
                    .as_type_keyword()
                    .map(SemanticType::array_of);
            }
            return None;
        }

        prev.token_type.as_type_keyword()
    }
}
