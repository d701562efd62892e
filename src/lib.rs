//! **SeeMM**: a small typed scripting language meant to be embedded in a
//! host application and re‑run once per host tick.
//!
//! The pipeline is scanner → parser → resolver → interpreter.  [`compile`]
//! runs the first three stages; [`runner::ScriptRunner`] wraps the whole
//! cycle the way a host drives it.

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod config;
pub mod environment;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod runner;
pub mod scanner;
pub mod token;
pub mod types;
pub mod value;

use log::info;

use crate::ast::Stmt;
use crate::error::Diagnostics;
use crate::host::Host;
use crate::interpreter::{Interpreter, BUILTINS};
use crate::resolver::Resolver;

/// Lexes, parses and resolves `source` against `host`.
///
/// `interpreter` is reset from `host` first, then receives the binding
/// distances.  Any diagnostic from any stage fails the compile; the program
/// is only returned when it is safe to run.
pub fn compile(
    source: &str,
    host: &Host,
    interpreter: &mut Interpreter,
) -> Result<Vec<Stmt>, Diagnostics> {
    info!("Compiling {} byte(s) of source", source.len());

    interpreter.reset(host);

    let mut diagnostics = Diagnostics::new();
    let mut identifiers = host.identifier_types();
    for builtin in BUILTINS {
        identifiers.insert(builtin.name.to_string(), builtin.ret);
    }

    let tokens = scanner::scan(source, &mut identifiers, &mut diagnostics);
    let statements = parser::parse(tokens, &mut diagnostics);

    let signatures = resolver::collect_signatures(&statements, host);
    let reserved = BUILTINS
        .iter()
        .map(|b| b.name.to_string())
        .chain(host.variables().iter().map(|v| v.name.clone()))
        .chain(host.functions().iter().map(|f| f.name.clone()));

    diagnostics.append(Resolver::new(interpreter, signatures, reserved).resolve(&statements));

    if diagnostics.is_empty() {
        info!("Compiled {} top-level statement(s)", statements.len());
        Ok(statements)
    } else {
        info!("Compile failed with {} error(s)", diagnostics.len());
        Err(diagnostics)
    }
}
