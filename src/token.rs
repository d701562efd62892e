use log::debug;
use serde::Serialize;
use std::fmt;

use crate::types::SemanticType;

/// The different kinds of tokens recognised by the scanner.
///
/// Literal payloads are carried separately in [`Token::literal`], so kinds are
/// plain `Copy` tags that can be compared directly.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// '['
    LEFT_BRACKET,

    /// ']'
    RIGHT_BRACKET,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// ';'
    SEMICOLON,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '%'
    PERCENT,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// '&&'
    AND,

    /// '||'
    OR,

    /// A user‑defined identifier
    IDENTIFIER,

    /// Integer literal, e.g. `42`
    INT_NUMBER,

    /// Float literal, e.g. `4.2`
    FLOAT_NUMBER,

    /// 'else'
    ELSE,

    /// 'false'
    FALSE,

    /// 'if'
    IF,

    /// 'break'
    BREAK,

    /// 'continue'
    CONTINUE,

    /// 'return'
    RETURN,

    /// 'true'
    TRUE,

    /// 'int'
    INT,

    /// 'float'
    FLOAT,

    /// 'bool'
    BOOL,

    /// 'void'
    VOID,

    /// 'while'
    WHILE,

    /// End‑of‑file marker
    EOF,
}

impl TokenType {
    /// The semantic type named by a type keyword, if this is one.
    pub fn as_type_keyword(self) -> Option<SemanticType> {
        match self {
            TokenType::INT => Some(SemanticType::INT),
            TokenType::FLOAT => Some(SemanticType::FLOAT),
            TokenType::BOOL => Some(SemanticType::BOOL),
            TokenType::VOID => Some(SemanticType::VOID),
            _ => None,
        }
    }
}

/// A literal already converted by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*n))
            }
            Literal::Float(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A scanned token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact source text that produced this token.
    pub lexeme: String,

    /// 1‑based line number in the source.
    pub line: usize,

    /// Byte offset of the first character of the lexeme.
    pub offset: usize,

    /// Converted value for number and boolean literals.
    pub literal: Option<Literal>,

    /// Declared type of the name, for identifiers.  May be upgraded by the
    /// scanner after the token was emitted.
    pub semantic_type: SemanticType,
}

impl Token {
    pub fn new<S: Into<String>>(token_type: TokenType, lexeme: S, line: usize, offset: usize) -> Self {
        let lexeme: String = lexeme.into();

        debug!(
            "Creating new token: type={:?}, lexeme={}, line={}",
            token_type, lexeme, line
        );

        Self {
            token_type,
            lexeme,
            line,
            offset,
            literal: None,
            semantic_type: SemanticType::NONE,
        }
    }

    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    /// An identifier that did not come from source text (host lookups,
    /// detached calls).  Line 0 marks it as synthetic.
    pub fn synthetic<S: Into<String>>(name: S, semantic_type: SemanticType) -> Self {
        Self {
            token_type: TokenType::IDENTIFIER,
            lexeme: name.into(),
            line: 0,
            offset: 0,
            literal: None,
            semantic_type,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.literal, self.token_type) {
            (Some(lit), _) => write!(f, "{:?} {} {}", self.token_type, self.lexeme, lit),
            (None, TokenType::IDENTIFIER) => write!(
                f,
                "{:?} {} {:?}",
                self.token_type, self.lexeme, self.semantic_type
            ),
            (None, _) => write!(f, "{:?} {} null", self.token_type, self.lexeme),
        }
    }
}
