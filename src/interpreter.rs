//! Tree‑walking interpreter.
//!
//! Statements execute to a [`Signal`]; `return`, `break` and `continue`
//! travel outward as signal values until a call or loop consumes them.
//! Runtime faults are [`RuntimeError`]s propagated with `?` and reported to
//! the [`Reporter`] once, at the `interpret` / `evaluate` boundary.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, info};

use crate::ast::{ArrayInitializer, Expr, ExprId, FunctionDecl, Stmt};
use crate::callable::{Callable, NativeFn};
use crate::environment::{checked_index, Environment};
use crate::error::{Reporter, RuntimeError};
use crate::host::Host;
use crate::token::{Token, TokenType};
use crate::types::SemanticType;
use crate::value::Value;

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// A function every program can call without the host registering it.
pub struct Builtin {
    pub name: &'static str,
    pub params: &'static [SemanticType],
    pub ret: SemanticType,
    pub func: NativeFn,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "deltatime",
        params: &[],
        ret: SemanticType::FLOAT,
        func: native_deltatime,
    },
    Builtin {
        name: "print",
        params: &[SemanticType::ANY],
        ret: SemanticType::VOID,
        func: native_print,
    },
    Builtin {
        name: "size_of",
        params: &[SemanticType::ANY],
        ret: SemanticType::INT,
        func: native_size_of,
    },
];

fn native_deltatime(interpreter: &Interpreter, _args: &[Value]) -> Result<Value, String> {
    Ok(Value::Float(interpreter.delta_time()))
}

fn native_print(interpreter: &Interpreter, args: &[Value]) -> Result<Value, String> {
    let line: String = args.iter().map(Value::to_string).collect();
    debug!("print: {}", line);
    interpreter.reporter.console(&line);
    Ok(Value::Nil)
}

/// Length of an array, `0` for anything else.
fn native_size_of(_interpreter: &Interpreter, args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::Array(list)) => Ok(Value::Int(list.borrow().len() as i64)),
        _ => Ok(Value::Int(0)),
    }
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    reporter: Rc<dyn Reporter>,
    delta_time: f64,
    delta_override: Option<f64>,
    last_frame: Option<Instant>,
}

impl Interpreter {
    /// Creates an interpreter whose globals hold the builtins and everything
    /// `host` exposes.
    pub fn new(host: &Host, reporter: Rc<dyn Reporter>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        let mut interpreter = Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            reporter,
            delta_time: 0.0,
            delta_override: None,
            last_frame: None,
        };
        interpreter.reset(host);
        interpreter
    }

    /// Throws away all script state and rebuilds the globals from `host`.
    pub fn reset(&mut self, host: &Host) {
        info!(
            "Resetting globals: {} builtin(s), {} host function(s), {} host variable(s)",
            BUILTINS.len(),
            host.functions().len(),
            host.variables().len()
        );

        let mut globals = Environment::new();

        for builtin in BUILTINS {
            let native = Callable::Native {
                name: builtin.name,
                params: builtin.params,
                ret: builtin.ret,
                func: builtin.func,
            };
            // Names are unique in a fresh scope.
            let _ = globals.define(builtin.name, Value::Callable(Rc::new(native)));
        }

        for function in host.functions() {
            let value = Value::Callable(Rc::new(Callable::Host(Rc::clone(function))));
            if let Err(msg) = globals.define(&function.name, value) {
                debug!("Skipping host function: {}", msg);
            }
        }

        for variable in host.variables() {
            if let Err(msg) = globals.define(&variable.name, variable.initial.deep_clone()) {
                debug!("Skipping host variable: {}", msg);
            }
        }

        self.globals = Rc::new(RefCell::new(globals));
        self.environment = Rc::clone(&self.globals);
        self.locals.clear();
    }

    /// Records that the variable expression `id` binds `depth` scopes out.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Noting {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    pub fn locals(&self) -> &HashMap<ExprId, usize> {
        &self.locals
    }

    // ─── frame clock ─────────────────────────────────────────────────────────

    /// Marks the start of a host tick and updates `deltatime()`.
    pub fn begin_frame(&mut self) {
        let now = Instant::now();

        self.delta_time = match (self.delta_override, self.last_frame) {
            (Some(fixed), _) => fixed,
            (None, Some(last)) => now.duration_since(last).as_secs_f64(),
            (None, None) => 0.0,
        };
        self.last_frame = Some(now);

        debug!("Frame started, deltatime = {}", self.delta_time);
    }

    /// Pins `deltatime()` to a fixed value for every following frame.
    pub fn set_delta_time(&mut self, seconds: f64) {
        self.delta_override = Some(seconds);
        self.delta_time = seconds;
    }

    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    // ─── host access to globals ──────────────────────────────────────────────

    pub fn lookup_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().lookup(name)
    }

    /// Assigns a global binding, coercing to the type carried by `name`.
    pub fn assign_global(&mut self, name: &Token, value: Value) -> IResult<Value> {
        self.globals.borrow_mut().assign(name, value)
    }

    // ─── entry points ────────────────────────────────────────────────────────

    /// Runs a program.  A runtime error ends the pass and is reported.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        info!("Interpreting {} statement(s)", statements.len());

        self.environment = Rc::clone(&self.globals);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Signal::Normal) => {}
                Ok(signal) => {
                    debug!("Top-level {:?} ends the pass", signal);
                    break;
                }
                Err(error) => {
                    self.reporter.runtime_error(&error);
                    return Err(error);
                }
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Evaluates an expression against the globals, e.g. a detached call of
    /// an entry point.  A runtime error is reported.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        self.environment = Rc::clone(&self.globals);

        let result = self.eval(expr);
        if let Err(error) = &result {
            self.reporter.runtime_error(error);
        }
        result
    }

    // ─── statements ──────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> IResult<Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval(expr)?;
                Ok(Signal::Normal)
            }

            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(scope)))
            }

            Stmt::Var {
                name,
                ty,
                initializer,
            } => {
                let value = match initializer {
                    Some(expr) => self.eval(expr)?,
                    None => Value::default_for(*ty),
                };
                self.declare(name, *ty, value)?;
                Ok(Signal::Normal)
            }

            Stmt::Array {
                name,
                ty,
                initializer,
            } => {
                let value = match initializer {
                    Some(ArrayInitializer::Elements(elements)) => self.array_literal(elements)?,
                    Some(ArrayInitializer::Value(expr)) => self.eval(expr)?,
                    None => Value::default_for(*ty),
                };
                self.declare(name, *ty, value)?;
                Ok(Signal::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if is_truthy(&self.eval(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }

            Stmt::While {
                condition, body, ..
            } => {
                while is_truthy(&self.eval(condition)?) {
                    match self.execute(body)? {
                        Signal::Break => break,
                        Signal::Normal | Signal::Continue => {}
                        ret @ Signal::Return(_) => return Ok(ret),
                    }
                }
                Ok(Signal::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                Ok(Signal::Return(value))
            }

            Stmt::Break(_) => Ok(Signal::Break),

            Stmt::Continue(_) => Ok(Signal::Continue),

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = Callable::User {
                    decl: Rc::clone(decl),
                    closure: Rc::clone(&self.environment),
                };
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Callable(Rc::new(function)))
                    .map_err(|msg| RuntimeError::new(decl.name.line, msg))?;
                Ok(Signal::Normal)
            }
        }
    }

    /// Runs `statements` in `environment`, restoring the current scope after,
    /// whatever the outcome.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<Signal> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(Signal::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Signal::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    /// Invokes a script function: one fresh scope under `closure` holds the
    /// parameters and the body.
    pub(crate) fn call_function(
        &mut self,
        decl: &FunctionDecl,
        closure: Rc<RefCell<Environment>>,
        arguments: Vec<Value>,
    ) -> IResult<Value> {
        let mut scope = Environment::with_enclosing(closure);

        for (param, value) in decl.params.iter().zip(arguments) {
            scope
                .define(&param.lexeme, value)
                .map_err(|msg| RuntimeError::new(param.line, msg))?;
        }

        match self.execute_block(&decl.body, Rc::new(RefCell::new(scope)))? {
            Signal::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }

    fn declare(&mut self, name: &Token, ty: SemanticType, value: Value) -> IResult<()> {
        let value = value.coerce_to(ty).map_err(|msg| {
            RuntimeError::new(
                name.line,
                format!("Can't initialize '{}': {}", name.lexeme, msg),
            )
        })?;

        self.environment
            .borrow_mut()
            .define(&name.lexeme, value)
            .map_err(|msg| RuntimeError::new(name.line, msg))
    }

    // ─── expressions ─────────────────────────────────────────────────────────

    fn eval(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(Value::from(*value)),

            Expr::Grouping { inner, .. } => self.eval(inner),

            Expr::Unary {
                operator, right, ..
            } => {
                let right = self.eval(right)?;
                evaluate_unary(operator, right)
            }

            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                evaluate_binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.eval(left)?;

                let short_circuit = match operator.token_type {
                    TokenType::OR => is_truthy(&left),
                    _ => !is_truthy(&left),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Index { id, name, index } => {
                let target = self.look_up_variable(*id, name)?;
                let index = self.eval(index)?;

                match target {
                    Value::Array(list) => {
                        let items = list.borrow();
                        let slot = checked_index(&items, &index, name.line)?;
                        Ok(items[slot].clone())
                    }
                    _ => Err(RuntimeError::new(name.line, "Variable is not an array.")),
                }
            }

            Expr::Assign {
                id,
                name,
                index,
                value,
            } => match index {
                None => {
                    let value = self.eval(value)?;
                    self.assign_variable(*id, name, value)
                }
                Some(index) => {
                    let index = self.eval(index)?;
                    let value = self.eval(value)?;

                    match self.locals.get(id) {
                        Some(&distance) => Environment::assign_index_at(
                            &self.environment,
                            distance,
                            name,
                            &index,
                            value,
                        ),
                        None => self.globals.borrow_mut().assign_index(name, &index, value),
                    }
                }
            },

            Expr::ArrayAssign { id, name, elements } => {
                let value = self.array_literal(elements)?;
                self.assign_variable(*id, name, value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
                ..
            } => {
                let callee = self.eval(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.eval(argument)?);
                }

                match callee {
                    Value::Callable(function) => function.call(self, values, paren.line),
                    _ => Err(RuntimeError::new(
                        paren.line,
                        "Can only call functions.",
                    )),
                }
            }
        }
    }

    /// A fresh list from `{ e1, e2, ... }`.
    fn array_literal(&mut self, elements: &[Expr]) -> IResult<Value> {
        let mut items: Vec<Value> = Vec::with_capacity(elements.len());
        for element in elements {
            items.push(self.eval(element)?);
        }
        Ok(Value::array(items))
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::assign_at(&self.environment, distance, name, value),
            None => self.globals.borrow_mut().assign(name, value),
        }
    }
}

fn evaluate_unary(operator: &Token, right: Value) -> IResult<Value> {
    match (operator.token_type, right) {
        (TokenType::MINUS, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::new(operator.line, "Integer overflow.")),
        (TokenType::MINUS, Value::Float(n)) => Ok(Value::Float(-n)),
        (TokenType::MINUS, _) => Err(RuntimeError::new(
            operator.line,
            "Operand must be a number.",
        )),
        (TokenType::BANG, value) => Ok(Value::Bool(!is_truthy(&value))),
        _ => Err(RuntimeError::new(
            operator.line,
            format!("Invalid unary operator '{}'.", operator.lexeme),
        )),
    }
}

fn evaluate_binary(operator: &Token, left: Value, right: Value) -> IResult<Value> {
    let line = operator.line;

    match operator.token_type {
        TokenType::EQUAL_EQUAL => return Ok(Value::Bool(is_equal(&left, &right))),
        TokenType::BANG_EQUAL => return Ok(Value::Bool(!is_equal(&left, &right))),
        _ => {}
    }

    if let (Value::Int(a), Value::Int(b)) = (&left, &right) {
        return integer_binary(operator, *a, *b);
    }

    let (a, b) = match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(RuntimeError::new(line, "Operands must be numbers.")),
    };

    let value = match operator.token_type {
        TokenType::PLUS => Value::Float(a + b),
        TokenType::MINUS => Value::Float(a - b),
        TokenType::STAR => Value::Float(a * b),
        TokenType::SLASH | TokenType::PERCENT if b == 0.0 => {
            return Err(RuntimeError::new(line, "Division by zero."));
        }
        TokenType::SLASH => Value::Float(a / b),
        TokenType::PERCENT => Value::Float(a % b),
        TokenType::GREATER => Value::Bool(a > b),
        TokenType::GREATER_EQUAL => Value::Bool(a >= b),
        TokenType::LESS => Value::Bool(a < b),
        TokenType::LESS_EQUAL => Value::Bool(a <= b),
        _ => {
            return Err(RuntimeError::new(
                line,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            ))
        }
    };

    Ok(value)
}

fn integer_binary(operator: &Token, a: i64, b: i64) -> IResult<Value> {
    let line = operator.line;

    let checked = match operator.token_type {
        TokenType::PLUS => a.checked_add(b),
        TokenType::MINUS => a.checked_sub(b),
        TokenType::STAR => a.checked_mul(b),
        TokenType::SLASH | TokenType::PERCENT if b == 0 => {
            return Err(RuntimeError::new(line, "Division by zero."));
        }
        TokenType::SLASH => a.checked_div(b),
        TokenType::PERCENT => a.checked_rem(b),
        TokenType::GREATER => return Ok(Value::Bool(a > b)),
        TokenType::GREATER_EQUAL => return Ok(Value::Bool(a >= b)),
        TokenType::LESS => return Ok(Value::Bool(a < b)),
        TokenType::LESS_EQUAL => return Ok(Value::Bool(a <= b)),
        _ => {
            return Err(RuntimeError::new(
                line,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            ))
        }
    };

    checked
        .map(Value::Int)
        .ok_or_else(|| RuntimeError::new(line, "Integer overflow."))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// `==` semantics: numbers compare by value across int and float.
fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            left.as_f64() == right.as_f64()
        }
        _ => left == right,
    }
}
