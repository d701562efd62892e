//! Static resolver pass for **SeeMM** programs.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined).
//! 2. Type‑check every expression against the semantic types the scanner
//!    stamped on identifiers and the signature table of callable names.
//! 3. Tell the interpreter, for *each* variable occurrence, whether it's a
//!    local (and at what depth).  Names found in no scope are globals.
//!
//! Every problem becomes a [`Diagnostic`](crate::error::Diagnostic); the walk
//! never stops early so one pass surfaces all errors.

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{ArrayInitializer, Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{Diagnostics, Stage};
use crate::host::Host;
use crate::interpreter::{Interpreter, BUILTINS};
use crate::token::{Literal, Token, TokenType};
use crate::types::SemanticType;

/// Parameter and return types of something callable.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<SemanticType>,
    pub ret: SemanticType,
}

/// Every callable name a program may use.
pub type Signatures = HashMap<String, Signature>;

/// Builtins, host functions and every function declared anywhere in
/// `statements`.  Script functions shadow host entries of the same name.
pub fn collect_signatures(statements: &[Stmt], host: &Host) -> Signatures {
    let mut signatures = Signatures::new();

    for builtin in BUILTINS {
        signatures.insert(
            builtin.name.to_string(),
            Signature {
                params: builtin.params.to_vec(),
                ret: builtin.ret,
            },
        );
    }

    for function in host.functions() {
        signatures.insert(
            function.name.clone(),
            Signature {
                params: function.param_types.clone(),
                ret: function.return_type,
            },
        );
    }

    collect_declared(statements, &mut signatures);

    debug!("Collected {} signature(s)", signatures.len());
    signatures
}

fn collect_declared(statements: &[Stmt], signatures: &mut Signatures) {
    for stmt in statements {
        match stmt {
            Stmt::Function(decl) => {
                signatures.insert(
                    decl.name.lexeme.clone(),
                    Signature {
                        params: decl.param_types.clone(),
                        ret: decl.return_type,
                    },
                );
                collect_declared(&decl.body, signatures);
            }
            Stmt::Block(body) => collect_declared(body, signatures),
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_declared(std::slice::from_ref(&**then_branch), signatures);
                if let Some(else_branch) = else_branch {
                    collect_declared(std::slice::from_ref(&**else_branch), signatures);
                }
            }
            Stmt::While { body, .. } => {
                collect_declared(std::slice::from_ref(&**body), signatures)
            }
            _ => {}
        }
    }
}

/// What a name is bound to while resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    /// Declared, initializer not resolved yet.
    Declared,
    Defined,
    Function,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances for locals by calling back into the interpreter.
pub struct Resolver<'a, 'interp> {
    interpreter: &'interp mut Interpreter,
    signatures: Signatures,
    scopes: Vec<HashMap<&'a str, Binding>>,
    globals: HashMap<String, Binding>,
    /// Return type of the function being resolved, `None` at top level.
    current_function: Option<SemanticType>,
    /// Index of the first scope that belongs to the current function.
    function_base: usize,
    in_loop: bool,
    diagnostics: Diagnostics,
}

impl<'a, 'interp> Resolver<'a, 'interp> {
    /// Create a new resolver bound to the given interpreter.  `reserved`
    /// holds global names the program can't redeclare (builtins and host
    /// names).
    pub fn new(
        interpreter: &'interp mut Interpreter,
        signatures: Signatures,
        reserved: impl IntoIterator<Item = String>,
    ) -> Self {
        info!("Resolver instantiated");

        let globals = reserved
            .into_iter()
            .map(|name| {
                let binding = if signatures.contains_key(&name) {
                    Binding::Function
                } else {
                    Binding::Defined
                };
                (name, binding)
            })
            .collect();

        Resolver {
            interpreter,
            signatures,
            scopes: Vec::new(),
            globals,
            current_function: None,
            function_base: 0,
            in_loop: false,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Walk all top‑level statements and hand back what went wrong.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Diagnostics {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        info!(
            "Resolve pass finished with {} error(s)",
            self.diagnostics.len()
        );
        self.diagnostics
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Expression(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var {
                name,
                ty,
                initializer,
            } => {
                self.declare(name);
                if let Some(expr) = initializer {
                    let value = self.resolve_expr(expr);
                    if !compatible(*ty, value) {
                        self.error(
                            name,
                            format!(
                                "Can't initialize '{}' of type {} with a value of type {}.",
                                name.lexeme, ty, value
                            ),
                        );
                    }
                }
                self.define(name);
            }

            Stmt::Array {
                name,
                ty,
                initializer,
            } => {
                self.declare(name);
                match initializer {
                    Some(ArrayInitializer::Elements(elements)) => {
                        self.check_elements(name, *ty, elements);
                    }
                    Some(ArrayInitializer::Value(expr)) => {
                        let value = self.resolve_expr(expr);
                        if !compatible(*ty, value) {
                            self.error(
                                name,
                                format!(
                                    "Can't initialize '{}' of type {} with a value of type {}.",
                                    name.lexeme, ty, value
                                ),
                            );
                        }
                    }
                    None => {}
                }
                self.define(name);
            }

            Stmt::If {
                keyword,
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(keyword, condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While {
                keyword,
                condition,
                body,
            } => {
                self.check_condition(keyword, condition);

                let enclosing = std::mem::replace(&mut self.in_loop, true);
                self.resolve_stmt(body);
                self.in_loop = enclosing;
            }

            Stmt::Return { keyword, value } => {
                let value_type = match value {
                    Some(expr) => self.resolve_expr(expr),
                    None => SemanticType::VOID,
                };

                match self.current_function {
                    None => self.error(keyword, "Can't return from top-level code."),
                    Some(expected) if !matches_return(expected, value_type) => self.error(
                        keyword,
                        format!(
                            "Function must return {} but this returns {}.",
                            expected, value_type
                        ),
                    ),
                    Some(_) => {}
                }
            }

            Stmt::Break(keyword) | Stmt::Continue(keyword) => {
                if !self.in_loop {
                    self.error(
                        keyword,
                        format!("Can't use '{}' outside of a loop.", keyword.lexeme),
                    );
                }
            }

            Stmt::Function(decl) => {
                if self.current_function.is_some() {
                    self.error(&decl.name, "Can't declare a function inside another function.");
                }

                // The name is visible inside its own body.
                self.declare(&decl.name);
                self.bind(&decl.name, Binding::Function);
                self.resolve_function(decl);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) -> SemanticType {
        match expr {
            Expr::Literal { value, .. } => match value {
                Literal::Int(_) => SemanticType::INT,
                Literal::Float(_) => SemanticType::FLOAT,
                Literal::Bool(_) => SemanticType::BOOL,
            },

            Expr::Grouping { inner, .. } => self.resolve_expr(inner),

            Expr::Unary {
                operator, right, ..
            } => {
                let operand = self.resolve_expr(right);

                if operator.token_type == TokenType::BANG {
                    if !is_wild(operand) && operand != SemanticType::BOOL {
                        self.error(operator, "Operand must be a boolean.");
                    }
                    SemanticType::BOOL
                } else {
                    if !is_wild(operand) && !operand.is_numeric() {
                        self.error(operator, "Operand must be a number.");
                    }
                    operand
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let l = self.resolve_expr(left);
                let r = self.resolve_expr(right);
                self.check_binary(operator, l, r)
            }

            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let l = self.resolve_expr(left);
                let r = self.resolve_expr(right);

                let is_bool = |t: SemanticType| is_wild(t) || t == SemanticType::BOOL;
                if !is_bool(l) || !is_bool(r) {
                    self.error(operator, "Operands must be booleans.");
                }
                SemanticType::BOOL
            }

            Expr::Variable { id, name } => {
                self.check_ready(name);

                if self.binding_of(name) == Some(Binding::Function) {
                    self.error(
                        name,
                        format!("Can't use function '{}' as a value.", name.lexeme),
                    );
                    self.resolve_local(*id, name);
                    return SemanticType::NONE;
                }

                self.resolve_local(*id, name);
                self.variable_type(name)
            }

            Expr::Index { id, name, index } => {
                self.check_ready(name);
                let index_type = self.resolve_expr(index);
                self.resolve_local(*id, name);
                self.check_index(name, index_type)
            }

            Expr::Assign {
                id,
                name,
                index,
                value,
            } => {
                let index_type = index.as_deref().map(|i| self.resolve_expr(i));
                let value_type = self.resolve_expr(value);
                self.resolve_local(*id, name);

                let target = match index_type {
                    Some(index_type) => self.check_index(name, index_type),
                    None => self.variable_type(name),
                };

                if !compatible(target, value_type) {
                    self.error(
                        name,
                        format!(
                            "Can't assign a value of type {} to '{}' of type {}.",
                            value_type, name.lexeme, target
                        ),
                    );
                }
                target
            }

            Expr::ArrayAssign { id, name, elements } => {
                self.resolve_local(*id, name);
                let target = self.variable_type(name);
                self.check_elements(name, target, elements);
                target
            }

            Expr::Call {
                callee,
                paren,
                arguments,
                ..
            } => {
                let argument_types: Vec<SemanticType> =
                    arguments.iter().map(|a| self.resolve_expr(a)).collect();

                let name: &'a Token = match &**callee {
                    Expr::Variable { id, name } => {
                        self.resolve_local(*id, name);
                        name
                    }
                    other => {
                        self.resolve_expr(other);
                        self.error(paren, "Can only call functions.");
                        return SemanticType::NONE;
                    }
                };

                self.check_call(name, &argument_types)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Type rules
    // ─────────────────────────────────────────────────────────────────────────

    fn variable_type(&mut self, name: &Token) -> SemanticType {
        if name.semantic_type == SemanticType::NONE {
            self.error(name, format!("Undefined variable '{}'.", name.lexeme));
        }
        name.semantic_type
    }

    fn check_binary(&mut self, operator: &Token, l: SemanticType, r: SemanticType) -> SemanticType {
        let numeric = |t: SemanticType| is_wild(t) || t.is_numeric();

        match operator.token_type {
            TokenType::EQUAL_EQUAL | TokenType::BANG_EQUAL => {
                let both_bool = (is_wild(l) || l == SemanticType::BOOL)
                    && (is_wild(r) || r == SemanticType::BOOL);

                if !both_bool && !(numeric(l) && numeric(r)) {
                    self.error(operator, "Operands must be two numbers or two booleans.");
                }
                SemanticType::BOOL
            }

            TokenType::GREATER
            | TokenType::GREATER_EQUAL
            | TokenType::LESS
            | TokenType::LESS_EQUAL => {
                if !numeric(l) || !numeric(r) {
                    self.error(operator, "Operands must be numbers.");
                }
                SemanticType::BOOL
            }

            _ => {
                if !numeric(l) || !numeric(r) {
                    self.error(operator, "Operands must be numbers.");
                    return SemanticType::NONE;
                }

                match (l, r) {
                    (SemanticType::INT, SemanticType::INT) => SemanticType::INT,
                    (SemanticType::FLOAT, _) | (_, SemanticType::FLOAT) => SemanticType::FLOAT,
                    _ => SemanticType::ANY,
                }
            }
        }
    }

    /// Element type of `name[index]`.
    fn check_index(&mut self, name: &Token, index_type: SemanticType) -> SemanticType {
        if !is_wild(index_type) && index_type != SemanticType::INT {
            self.error(name, "Array index must be an int.");
        }

        match name.semantic_type {
            SemanticType::ANY => SemanticType::ANY,
            SemanticType::NONE => self.variable_type(name),
            ty => match ty.element() {
                Some(element) => element,
                None => {
                    self.error(name, format!("'{}' is not an array.", name.lexeme));
                    SemanticType::NONE
                }
            },
        }
    }

    fn check_elements(&mut self, name: &Token, target: SemanticType, elements: &'a [Expr]) {
        let element = match target {
            SemanticType::NONE => {
                self.variable_type(name);
                None
            }
            SemanticType::ANY => None,
            ty => match ty.element() {
                Some(element) => Some(element),
                None => {
                    self.error(name, format!("'{}' is not an array.", name.lexeme));
                    None
                }
            },
        };

        for expr in elements {
            let value = self.resolve_expr(expr);

            if let Some(element) = element {
                if !compatible(element, value) {
                    self.error(
                        name,
                        format!(
                            "Elements of '{}' must be {} but got {}.",
                            name.lexeme, element, value
                        ),
                    );
                }
            }
        }
    }

    fn check_condition(&mut self, keyword: &Token, condition: &'a Expr) {
        let ty = self.resolve_expr(condition);

        if !is_wild(ty) && ty != SemanticType::BOOL {
            self.error(keyword, "Condition must be a boolean.");
        }
    }

    fn check_call(&mut self, name: &Token, arguments: &[SemanticType]) -> SemanticType {
        let Some(signature) = self.signatures.get(&name.lexeme).cloned() else {
            self.error(name, format!("Undefined function '{}'.", name.lexeme));
            return SemanticType::NONE;
        };

        if signature.params.len() != arguments.len() {
            self.error(
                name,
                format!(
                    "Expected {} arguments but got {}.",
                    signature.params.len(),
                    arguments.len()
                ),
            );
            return signature.ret;
        }

        for (i, (param, argument)) in signature.params.iter().zip(arguments).enumerate() {
            if !compatible(*param, *argument) {
                self.error(
                    name,
                    format!(
                        "Argument {} of '{}' must be {} but got {}.",
                        i + 1,
                        name.lexeme,
                        param,
                        argument
                    ),
                );
            }
        }

        signature.ret
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, decl: &'a FunctionDecl) {
        let enclosing_function = self.current_function.replace(decl.return_type);
        let enclosing_loop = std::mem::replace(&mut self.in_loop, false);
        let enclosing_base = std::mem::replace(&mut self.function_base, self.scopes.len());

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        if !is_wild(decl.return_type)
            && decl.return_type != SemanticType::VOID
            && !always_returns(&decl.body)
        {
            self.error(
                &decl.name,
                format!(
                    "Function '{}' must return {} on every path.",
                    decl.name.lexeme, decl.return_type
                ),
            );
        }

        self.function_base = enclosing_base;
        self.in_loop = enclosing_loop;
        self.current_function = enclosing_function;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Token) {
        if self.scopes.is_empty() {
            if self.globals.contains_key(&name.lexeme) {
                self.error(name, format!("'{}' is already defined.", name.lexeme));
            } else {
                self.globals.insert(name.lexeme.clone(), Binding::Declared);
            }
            return;
        }

        let taken = self.scopes[self.function_base..]
            .iter()
            .any(|scope| scope.contains_key(name.lexeme.as_str()));

        if taken {
            self.error(
                name,
                format!("'{}' is already declared in this scope.", name.lexeme),
            );
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.as_str(), Binding::Declared);
        }
    }

    fn define(&mut self, name: &'a Token) {
        self.bind(name, Binding::Defined);
    }

    /// Completes a declaration.  A global that was already bound before its
    /// `declare` (a duplicate) keeps its first binding.
    fn bind(&mut self, name: &'a Token, binding: Binding) {
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name.lexeme.as_str(), binding);
            }
            None => {
                if let Some(slot) = self.globals.get_mut(&name.lexeme) {
                    if *slot == Binding::Declared {
                        *slot = binding;
                    }
                }
            }
        }
    }

    /// Innermost binding of `name`, falling back to the globals.
    fn binding_of(&self, name: &Token) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name.lexeme.as_str()).copied())
            .or_else(|| self.globals.get(&name.lexeme).copied())
    }

    /// Rejects reading a name inside its own initializer.
    fn check_ready(&mut self, name: &Token) {
        let pending = match self.scopes.last() {
            Some(scope) => scope.get(name.lexeme.as_str()) == Some(&Binding::Declared),
            None => self.globals.get(&name.lexeme) == Some(&Binding::Declared),
        };

        if pending {
            self.error(name, "Can't read local variable in its own initializer.");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as a local at depth `d`, or leave it
    /// unrecorded (global) if no scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme.as_str()) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }

    fn error(&mut self, token: &Token, message: impl Into<String>) {
        let location = if token.token_type == TokenType::EOF {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };

        self.diagnostics
            .push(Stage::Resolve, token.line, location, message);
    }
}

/// `ANY` matches everything; `NONE` comes from an expression that already
/// produced a diagnostic.
fn is_wild(ty: SemanticType) -> bool {
    matches!(ty, SemanticType::ANY | SemanticType::NONE)
}

fn compatible(target: SemanticType, value: SemanticType) -> bool {
    is_wild(target) || is_wild(value) || target.accepts(value)
}

fn matches_return(expected: SemanticType, actual: SemanticType) -> bool {
    is_wild(expected) || is_wild(actual) || expected == actual
}

/// True when running `statements` can't fall off the end.
fn always_returns(statements: &[Stmt]) -> bool {
    statements.iter().any(|stmt| match stmt {
        Stmt::Return { .. } => true,
        Stmt::Block(body) => always_returns(body),
        Stmt::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => {
            always_returns(std::slice::from_ref(&**then_branch))
                && always_returns(std::slice::from_ref(&**else_branch))
        }
        // `while (true)` only ends through `break` or `return`.
        Stmt::While {
            condition: Expr::Literal {
                value: Literal::Bool(true),
                ..
            },
            body,
            ..
        } => !breaks_out(body),
        _ => false,
    })
}

/// Does `stmt` contain a `break` that leaves the loop it is the body of?
fn breaks_out(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Break(_) => true,
        Stmt::Block(body) => body.iter().any(breaks_out),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => breaks_out(then_branch) || else_branch.as_deref().is_some_and(breaks_out),
        _ => false,
    }
}
