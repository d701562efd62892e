/*!
Recursive‑descent parser for SeeMM.

### Cost

Each token is consumed once via `advance()`; error recovery
(`synchronize`) only discards tokens up to the next statement boundary, so a
parse is Θ(n) in the token count.  Call‑stack depth follows syntactic nesting.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, recovery      | `debug`| Descent into grammar branches.            |

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------------------------------------------------

```text
program        → declaration* EOF ;
declaration    → typedDecl | statement ;
typedDecl      → TYPE ( "[" "]" )? IDENT
                 ( "(" parameters? ")" block          // function
                 | ( "=" initializer )? ";" ) ;       // variable / array
parameters     → TYPE ( "[" "]" )? IDENT ( "," TYPE ( "[" "]" )? IDENT )* ;
statement      → exprStmt | ifStmt | whileStmt | returnStmt
               | "break" ";" | "continue" ";" | block ;
block          → "{" declaration* "}" ;
expression     → assignment ;
assignment     → IDENT ( "[" expression "]" )? "=" assignment
               | IDENT "=" "{" ( assignment ( "," assignment )* )? "}"
               | logic_or ;
logic_or       → logic_and ( "||" logic_and )* ;
logic_and      → equality  ( "&&" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" | "%" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" )* ;
primary        → INT | FLOAT | "true" | "false"
               | IDENT ( "[" expression "]" )? | "(" expression ")" ;
```

Function declarations are hoisted: each one is inserted at the front of the
statement list it belongs to, so every function is defined before any other
statement of that list runs.
*/

use std::rc::Rc;

use crate::ast::{ArrayInitializer, Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{Diagnostics, Stage};
use crate::token::{Token, TokenType};
use crate::types::SemanticType;

use log::{debug, info};

const MAX_ARGS: usize = 255;

/// A syntax error that has not been recorded yet.
#[derive(Debug)]
struct ParseError {
    line: usize,
    location: String,
    message: String,
}

type PResult<T> = std::result::Result<T, ParseError>;

/// Convenience wrapper: parse `tokens`, appending syntax errors to `diagnostics`.
pub fn parse(tokens: Vec<Token>, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
    let mut parser = Parser::new(tokens);
    let statements = parser.parse();
    diagnostics.append(parser.take_diagnostics());
    statements
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: u32,
    diagnostics: Diagnostics,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        let mut parser = Self {
            tokens: Vec::new(),
            current: 0,
            next_id: 0,
            diagnostics: Diagnostics::new(),
        };
        parser.set_tokens(tokens);
        parser
    }

    /// Replace the token stream and reset all parse state.
    pub fn set_tokens(&mut self, mut tokens: Vec<Token>) {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::EOF) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, "", line, 0));
        }

        self.tokens = tokens;
        self.current = 0;
        self.next_id = 0;
        self.diagnostics = Diagnostics::new();
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Statements that failed to parse are left out.
    pub fn parse(&mut self) -> Vec<Stmt> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                push_hoisted(&mut statements, stmt);
            }
        }

        info!(
            "Parsed {} statement(s) with {} error(s)",
            statements.len(),
            self.diagnostics.len()
        );

        statements
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Option<Stmt> {
        debug!("Entering declaration at line {}", self.peek().line);

        let result = match self.peek().token_type.as_type_keyword() {
            Some(ty) => {
                self.advance();
                self.typed_declaration(ty)
            }
            None => self.statement(),
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(error) => {
                self.diagnostics
                    .push(Stage::Parse, error.line, error.location, error.message);
                self.synchronize();
                None
            }
        }
    }

    fn typed_declaration(&mut self, ty: SemanticType) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();

        if self.matches(TokenType::LEFT_BRACKET) {
            self.consume(TokenType::RIGHT_BRACKET, "Expect ']' after '['.")?;

            if ty == SemanticType::VOID {
                return Err(self.error(&keyword, "Can't declare an array of void."));
            }

            let ty = ty.array_of();
            let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

            if self.matches(TokenType::LEFT_PAREN) {
                return self.function(name, ty);
            }

            return self.array_declaration(name, ty);
        }

        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

        if self.matches(TokenType::LEFT_PAREN) {
            return self.function(name, ty);
        }

        if ty == SemanticType::VOID {
            return Err(self.error(&name, "Can't declare a void variable."));
        }

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var {
            name,
            ty,
            initializer,
        })
    }

    fn array_declaration(&mut self, name: Token, ty: SemanticType) -> PResult<Stmt> {
        let initializer = if self.matches(TokenType::EQUAL) {
            if self.matches(TokenType::LEFT_BRACE) {
                Some(ArrayInitializer::Elements(self.array_elements()?))
            } else {
                Some(ArrayInitializer::Value(self.expression()?))
            }
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Array {
            name,
            ty,
            initializer,
        })
    }

    /// Elements after an opening `{`, through the closing `}`.
    fn array_elements(&mut self) -> PResult<Vec<Expr>> {
        let mut elements: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_BRACE) {
            loop {
                elements.push(self.assignment()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(
            TokenType::RIGHT_BRACE,
            "Expect '}' after array initializer.",
        )?;

        Ok(elements)
    }

    fn function(&mut self, name: Token, return_type: SemanticType) -> PResult<Stmt> {
        let mut params: Vec<Token> = Vec::new();
        let mut param_types: Vec<SemanticType> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGS {
                    return Err(self.error(self.peek(), "Can't have more than 255 parameters."));
                }

                let mut ty = match self.peek().token_type.as_type_keyword() {
                    Some(SemanticType::VOID) | None => {
                        return Err(self.error(self.peek(), "Expect parameter type."));
                    }
                    Some(ty) => ty,
                };
                self.advance();

                if self.matches(TokenType::LEFT_BRACKET) {
                    self.consume(TokenType::RIGHT_BRACKET, "Expect ']' after '['.")?;
                    ty = ty.array_of();
                }

                param_types.push(ty);
                params.push(self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        self.consume(TokenType::LEFT_BRACE, "Expect '{' before function body.")?;

        let body: Vec<Stmt> = self.block()?;

        debug!(
            "Parsed function '{}' with {} parameter(s)",
            name.lexeme,
            params.len()
        );

        Ok(Stmt::Function(Rc::new(FunctionDecl {
            name,
            params,
            param_types,
            return_type,
            body,
        })))
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> PResult<Stmt> {
        if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::BREAK) {
            let keyword = self.previous().clone();
            self.consume(TokenType::SEMICOLON, "Expect ';' after break.")?;
            Ok(Stmt::Break(keyword))
        } else if self.matches(TokenType::CONTINUE) {
            let keyword = self.previous().clone();
            self.consume(TokenType::SEMICOLON, "Expect ';' after continue.")?;
            Ok(Stmt::Continue(keyword))
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();

        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            keyword,
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();

        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While {
            keyword,
            condition,
            body,
        })
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    /// Statements after an opening `{`, through the closing `}`.
    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                push_hoisted(&mut statements, stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr: Expr = self.logical_or()?;

        if !self.matches(TokenType::EQUAL) {
            return Ok(expr);
        }

        let equals: Token = self.previous().clone();

        if self.matches(TokenType::LEFT_BRACE) {
            return match expr {
                Expr::Variable { name, .. } => {
                    let elements = self.array_elements()?;
                    Ok(Expr::ArrayAssign {
                        id: self.next_id(),
                        name,
                        elements,
                    })
                }
                _ => Err(self.error(&equals, "Invalid assignment target.")),
            };
        }

        let value: Expr = self.assignment()?;

        match expr {
            Expr::Variable { name, .. } => Ok(Expr::Assign {
                id: self.next_id(),
                name,
                index: None,
                value: Box::new(value),
            }),

            Expr::Index { name, index, .. } => Ok(Expr::Assign {
                id: self.next_id(),
                name,
                index: Some(index),
                value: Box::new(value),
            }),

            _ => Err(self.error(&equals, "Invalid assignment target.")),
        }
    }

    fn logical_or(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                id: self.next_id(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                id: self.next_id(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// One left‑associative binary precedence level.
    fn binary_level(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let mut expr: Expr = operand(self)?;

        while operators.iter().any(|&op| self.check(op)) {
            let operator: Token = self.advance().clone();
            let right: Expr = operand(self)?;

            expr = Expr::Binary {
                id: self.next_id(),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> PResult<Expr> {
        self.binary_level(&[TokenType::MINUS, TokenType::PLUS], Self::factor)
    }

    fn factor(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[TokenType::SLASH, TokenType::STAR, TokenType::PERCENT],
            Self::unary,
        )
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary {
                id: self.next_id(),
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.primary()?;

        while self.matches(TokenType::LEFT_PAREN) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    return Err(self.error(self.peek(), "Can't have more than 255 arguments."));
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            id: self.next_id(),
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token: &Token = self.peek();

        match token.token_type {
            TokenType::TRUE | TokenType::FALSE | TokenType::INT_NUMBER | TokenType::FLOAT_NUMBER => {
                let (literal, line) = match token.literal {
                    Some(literal) => (literal, token.line),
                    None => return Err(self.error(token, "Malformed literal.")),
                };
                self.advance();

                Ok(Expr::Literal {
                    id: self.next_id(),
                    value: literal,
                    line,
                })
            }

            TokenType::IDENTIFIER => {
                let name: Token = self.advance().clone();

                if self.matches(TokenType::LEFT_BRACKET) {
                    let index: Expr = self.expression()?;
                    self.consume(TokenType::RIGHT_BRACKET, "Expect ']' after index.")?;

                    return Ok(Expr::Index {
                        id: self.next_id(),
                        name,
                        index: Box::new(index),
                    });
                }

                Ok(Expr::Variable {
                    id: self.next_id(),
                    name,
                })
            }

            TokenType::LEFT_PAREN => {
                self.advance();
                let inner: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

                Ok(Expr::Grouping {
                    id: self.next_id(),
                    inner: Box::new(inner),
                })
            }

            _ => Err(self.error(token, "Expect expression.")),
        }
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn next_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();
            return true;
        }

        false
    }

    fn consume(&mut self, ttype: TokenType, message: &str) -> PResult<Token> {
        if self.check(ttype) {
            return Ok(self.advance().clone());
        }

        Err(self.error(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn error(&self, token: &Token, message: &str) -> ParseError {
        let location = if token.token_type == TokenType::EOF {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };

        ParseError {
            line: token.line,
            location,
            message: message.to_string(),
        }
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        debug!("Synchronizing after parse error at line {}", self.peek().line);

        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::IF
                | TokenType::WHILE
                | TokenType::BREAK
                | TokenType::CONTINUE
                | TokenType::RETURN
                | TokenType::INT
                | TokenType::FLOAT
                | TokenType::BOOL
                | TokenType::VOID => return,
                _ => {}
            }

            self.advance();
        }
    }
}

/// Functions go to the front of their statement list, everything else is appended.
fn push_hoisted(statements: &mut Vec<Stmt>, stmt: Stmt) {
    if matches!(stmt, Stmt::Function(_)) {
        statements.insert(0, stmt);
    } else {
        statements.push(stmt);
    }
}
