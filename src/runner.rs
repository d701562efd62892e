//! Host‑side driver for a script.
//!
//! A [`ScriptRunner`] owns a [`Host`] description and an [`Interpreter`].
//! The host calls [`compile`](ScriptRunner::compile) whenever the source
//! changes, [`run`](ScriptRunner::run) once after a successful compile and
//! [`tick`](ScriptRunner::tick) every frame.  `run` and `tick` both answer
//! with the external variables the pass changed.

use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, Stmt};
use crate::error::{Diagnostics, Reporter, Result, SeeError};
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// Entry point called once after the top‑level statements.
pub const SETUP: &str = "Setup";

/// Entry point called on every tick.
pub const MAIN: &str = "Main";

/// An external variable whose value differs from the previous pass.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableChange {
    pub name: String,
    pub previous: Value,
    pub current: Value,
}

pub struct ScriptRunner {
    host: Host,
    interpreter: Interpreter,
    reporter: Rc<dyn Reporter>,
    program: Option<Vec<Stmt>>,
    /// Last observed value of every external variable, in host order.
    snapshot: Vec<(String, Value)>,
    ticks: u64,
}

impl ScriptRunner {
    pub fn new(host: Host, reporter: Rc<dyn Reporter>) -> Self {
        let interpreter = Interpreter::new(&host, Rc::clone(&reporter));

        let mut runner = Self {
            host,
            interpreter,
            reporter,
            program: None,
            snapshot: Vec::new(),
            ticks: 0,
        };
        runner.take_snapshot();
        runner
    }

    /// Compiles `source`, replacing any previous program.  External
    /// variables go back to their initial values.  On failure every
    /// diagnostic is reported and no program is kept.
    pub fn compile(&mut self, source: &str) -> std::result::Result<(), Diagnostics> {
        self.program = None;
        self.ticks = 0;

        let result = crate::compile(source, &self.host, &mut self.interpreter);
        self.take_snapshot();

        match result {
            Ok(program) => {
                info!("Program ready with {} statement(s)", program.len());
                self.program = Some(program);
                Ok(())
            }
            Err(diagnostics) => {
                for diagnostic in &diagnostics {
                    self.reporter.diagnostic(diagnostic);
                }
                Err(diagnostics)
            }
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.program.is_some()
    }

    /// Executes the top‑level statements, then `Setup()` if the program
    /// declares it.
    pub fn run(&mut self) -> Result<Vec<VariableChange>> {
        let program = self.program.as_ref().ok_or(SeeError::NotCompiled)?;

        self.interpreter.interpret(program)?;

        if self.declares(SETUP) {
            self.interpreter.evaluate(&Expr::global_call(SETUP))?;
        }

        Ok(self.poll_changes())
    }

    /// Starts a frame and calls `Main()` if the program declares it.
    pub fn tick(&mut self) -> Result<Vec<VariableChange>> {
        if self.program.is_none() {
            return Err(SeeError::NotCompiled);
        }

        self.ticks += 1;
        self.interpreter.begin_frame();
        debug!("Tick {}", self.ticks);

        if self.declares(MAIN) {
            self.interpreter.evaluate(&Expr::global_call(MAIN))?;
        }

        Ok(self.poll_changes())
    }

    /// Number of ticks since the last compile.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Writes an external variable from the host side.  The write is not
    /// reported back as a change.
    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<()> {
        let ty = self
            .host
            .variable(name)
            .map(|v| v.ty)
            .ok_or_else(|| SeeError::Config(format!("unknown external variable '{}'", name)))?;

        let stored = self
            .interpreter
            .assign_global(&Token::synthetic(name, ty), value)?;

        if let Some(entry) = self.snapshot.iter_mut().find(|(n, _)| n == name) {
            entry.1 = stored.deep_clone();
        }

        Ok(())
    }

    /// Current value of a global binding.
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.interpreter.lookup_global(name)
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    fn declares(&self, name: &str) -> bool {
        matches!(
            self.interpreter.lookup_global(name),
            Some(Value::Callable(callable)) if callable.is_user_function()
        )
    }

    fn take_snapshot(&mut self) {
        self.snapshot = self
            .host
            .variables()
            .iter()
            .map(|v| {
                let value = self
                    .interpreter
                    .lookup_global(&v.name)
                    .unwrap_or(Value::Nil)
                    .deep_clone();
                (v.name.clone(), value)
            })
            .collect();
    }

    fn poll_changes(&mut self) -> Vec<VariableChange> {
        let mut changes: Vec<VariableChange> = Vec::new();

        for (name, previous) in self.snapshot.iter_mut() {
            let current = self
                .interpreter
                .lookup_global(name)
                .unwrap_or(Value::Nil)
                .deep_clone();

            if current != *previous {
                debug!("External variable '{}': {} -> {}", name, previous, current);

                changes.push(VariableChange {
                    name: name.clone(),
                    previous: std::mem::replace(previous, current.clone()),
                    current,
                });
            }
        }

        changes
    }
}
