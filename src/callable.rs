use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::host::HostFunction;
use crate::interpreter::{IResult, Interpreter};
use crate::types::SemanticType;
use crate::value::Value;

/// Signature of a builtin implemented in Rust.
pub type NativeFn = fn(&Interpreter, &[Value]) -> Result<Value, String>;

/// Anything a script can call.
pub enum Callable {
    /// Declared in the script; closes over the scope it was declared in.
    User {
        decl: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
    },

    /// Builtin shipped with the interpreter.
    Native {
        name: &'static str,
        params: &'static [SemanticType],
        ret: SemanticType,
        func: NativeFn,
    },

    /// Registered by the host application.
    Host(Rc<HostFunction>),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::User { decl, .. } => &decl.name.lexeme,
            Callable::Native { name, .. } => name,
            Callable::Host(function) => &function.name,
        }
    }

    pub fn param_types(&self) -> &[SemanticType] {
        match self {
            Callable::User { decl, .. } => &decl.param_types,
            Callable::Native { params, .. } => params,
            Callable::Host(function) => &function.param_types,
        }
    }

    pub fn arity(&self) -> usize {
        self.param_types().len()
    }

    pub fn return_type(&self) -> SemanticType {
        match self {
            Callable::User { decl, .. } => decl.return_type,
            Callable::Native { ret, .. } => *ret,
            Callable::Host(function) => function.return_type,
        }
    }

    pub fn is_user_function(&self) -> bool {
        matches!(self, Callable::User { .. })
    }

    /// Checks arity, coerces arguments to the parameter types, runs the body
    /// and coerces the result to the return type.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        line: usize,
    ) -> IResult<Value> {
        debug!("Calling '{}' with {} argument(s)", self.name(), arguments.len());

        if arguments.len() != self.arity() {
            return Err(RuntimeError::new(
                line,
                format!(
                    "Expected {} arguments but got {}.",
                    self.arity(),
                    arguments.len()
                ),
            ));
        }

        let mut checked: Vec<Value> = Vec::with_capacity(arguments.len());
        for (i, (argument, ty)) in arguments.iter().zip(self.param_types()).enumerate() {
            let value = argument.coerce_to(*ty).map_err(|msg| {
                RuntimeError::new(
                    line,
                    format!("Argument {} of '{}': {}", i + 1, self.name(), msg),
                )
            })?;
            checked.push(value);
        }

        let result: Value = match self {
            Callable::User { decl, closure } => {
                interpreter.call_function(decl, Rc::clone(closure), checked)?
            }

            Callable::Native { func, .. } => {
                func(interpreter, &checked).map_err(|msg| RuntimeError::new(line, msg))?
            }

            Callable::Host(function) => function.invoke(&checked).unwrap_or(Value::Nil),
        };

        match (self.return_type(), result) {
            (SemanticType::VOID, _) => Ok(Value::Nil),
            (_, Value::Nil) => Ok(Value::Nil),
            (ty, value) => value.coerce_to(ty).map_err(|msg| {
                RuntimeError::new(
                    line,
                    format!("'{}' returned a bad value: {}", self.name(), msg),
                )
            }),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::User { decl, .. } => write!(f, "<fn {}>", decl.name.lexeme),
            Callable::Native { name, .. } => write!(f, "<native fn {}>", name),
            Callable::Host(function) => write!(f, "<host fn {}>", function.name),
        }
    }
}
