//! Expression and statement trees produced by the parser.
//!
//! Nodes are immutable once built.  The resolver annotates expressions out of
//! band, keyed by [`ExprId`].

use std::rc::Rc;

use crate::token::{Literal, Token};
use crate::types::SemanticType;

/// Identity of an expression node within one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

impl ExprId {
    /// Id for expressions built outside the parser.  Never resolved, so the
    /// interpreter looks such names up in globals.
    pub const DETACHED: ExprId = ExprId(u32::MAX);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        id: ExprId,
        value: Literal,
        line: usize,
    },

    /// `( expression )`
    Grouping { id: ExprId, inner: Box<Expr> },

    /// `!x`, `-x`
    Unary {
        id: ExprId,
        operator: Token,
        right: Box<Expr>,
    },

    /// Arithmetic, comparison and equality operators.
    Binary {
        id: ExprId,
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `&&` / `||`.
    Logical {
        id: ExprId,
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Variable { id: ExprId, name: Token },

    /// `name[index]`
    Index {
        id: ExprId,
        name: Token,
        index: Box<Expr>,
    },

    /// `name = value` or `name[index] = value`
    Assign {
        id: ExprId,
        name: Token,
        index: Option<Box<Expr>>,
        value: Box<Expr>,
    },

    /// `name = { e1, e2, ... }`
    ArrayAssign {
        id: ExprId,
        name: Token,
        elements: Vec<Expr>,
    },

    Call {
        id: ExprId,
        callee: Box<Expr>,
        /// Closing `)`, kept for error locations.
        paren: Token,
        arguments: Vec<Expr>,
    },
}

impl Expr {
    pub fn id(&self) -> ExprId {
        match self {
            Expr::Literal { id, .. }
            | Expr::Grouping { id, .. }
            | Expr::Unary { id, .. }
            | Expr::Binary { id, .. }
            | Expr::Logical { id, .. }
            | Expr::Variable { id, .. }
            | Expr::Index { id, .. }
            | Expr::Assign { id, .. }
            | Expr::ArrayAssign { id, .. }
            | Expr::Call { id, .. } => *id,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Expr::Literal { line, .. } => *line,
            Expr::Grouping { inner, .. } => inner.line(),
            Expr::Unary { operator, .. }
            | Expr::Binary { operator, .. }
            | Expr::Logical { operator, .. } => operator.line,
            Expr::Variable { name, .. }
            | Expr::Index { name, .. }
            | Expr::Assign { name, .. }
            | Expr::ArrayAssign { name, .. } => name.line,
            Expr::Call { paren, .. } => paren.line,
        }
    }

    /// A zero‑argument call of the global function `name`, for hosts that
    /// want to invoke an entry point without re‑running declarations.
    pub fn global_call(name: &str) -> Expr {
        let callee = Token::synthetic(name, SemanticType::NONE);
        let mut paren = Token::synthetic(")", SemanticType::NONE);
        paren.token_type = crate::token::TokenType::RIGHT_PAREN;

        Expr::Call {
            id: ExprId::DETACHED,
            callee: Box::new(Expr::Variable {
                id: ExprId::DETACHED,
                name: callee,
            }),
            paren,
            arguments: Vec::new(),
        }
    }
}

/// Parsed function declaration, shared with the closures created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub param_types: Vec<SemanticType>,
    pub return_type: SemanticType,
    pub body: Vec<Stmt>,
}

/// Right‑hand side of an array declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayInitializer {
    /// `= { e1, e2 }` allocates a fresh list.
    Elements(Vec<Expr>),

    /// `= other` aliases an existing list.
    Value(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),

    Block(Vec<Stmt>),

    /// `int x = 1;`, `float y;`, `bool b = true;`
    Var {
        name: Token,
        ty: SemanticType,
        initializer: Option<Expr>,
    },

    /// `int[] xs = { 1, 2 };`
    Array {
        name: Token,
        ty: SemanticType,
        initializer: Option<ArrayInitializer>,
    },

    If {
        keyword: Token,
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        keyword: Token,
        condition: Expr,
        body: Box<Stmt>,
    },

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Break(Token),

    Continue(Token),

    Function(Rc<FunctionDecl>),
}
