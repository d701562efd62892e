//! Centralised error hierarchy for the **SeeMM** scripting language.
//!
//! Two kinds of fault exist:
//!
//! * [`Diagnostic`]s are compile‑time problems found by the scanner, parser or
//!   resolver.  They never abort a stage; each stage pushes them into a
//!   [`Diagnostics`] accumulator that the caller inspects afterwards.
//! * [`RuntimeError`]s are raised while interpreting and unwind to the nearest
//!   `interpret` / `evaluate` boundary.
//!
//! The module **does not** print anything itself.  Surfacing is delegated to a
//! [`Reporter`] supplied by the host.

use std::cell::RefCell;
use std::fmt;
use std::io;

use log::{error, info, warn};
use thiserror::Error;

/// Pipeline stage that produced a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse,
    Resolve,
}

/// A recoverable compile‑time fault.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub stage: Stage,

    /// 1‑based source line.
    pub line: usize,

    /// Either empty, `" at end"` or `" at 'lexeme'"`.
    pub location: String,

    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {}] Error{}: {}",
            self.line, self.location, self.message
        )
    }
}

/// Ordered accumulator of [`Diagnostic`]s shared by every compile stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>, M: Into<String>>(
        &mut self,
        stage: Stage,
        line: usize,
        location: S,
        message: M,
    ) {
        let diagnostic = Diagnostic {
            stage,
            line,
            location: location.into(),
            message: message.into(),
        };

        info!("Recording {:?} diagnostic: {}", stage, diagnostic);

        self.items.push(diagnostic);
    }

    /// Moves every diagnostic of `other` to the end of `self`.
    pub fn append(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// True if any diagnostic message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.items.iter().any(|d| d.message.contains(needle))
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'d> IntoIterator for &'d Diagnostics {
    type Item = &'d Diagnostic;
    type IntoIter = std::slice::Iter<'d, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Execution‑time fault.  Terminates the current interpretation pass.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] {message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        RuntimeError { line, message }
    }
}

/// Canonical crate error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeeError {
    /// One or more lex/parse/resolve diagnostics.
    #[error("compilation failed with {} error(s)", .0.len())]
    Compile(Diagnostics),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Malformed host description file.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Host description refers to something the language cannot express.
    #[error("invalid host configuration: {0}")]
    Config(String),

    #[error("no compiled program")]
    NotCompiled,
}

impl From<Diagnostics> for SeeError {
    fn from(diagnostics: Diagnostics) -> Self {
        SeeError::Compile(diagnostics)
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, SeeError>;

/// Host‑side sink for everything the core wants to surface.
pub trait Reporter {
    /// A lexer/parser/resolver diagnostic.
    fn diagnostic(&self, diagnostic: &Diagnostic);

    /// An uncaught [`RuntimeError`] that ended a pass.
    fn runtime_error(&self, error: &RuntimeError);

    /// Output of the `print` builtin.
    fn console(&self, message: &str);
}

/// Forwards everything to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn diagnostic(&self, diagnostic: &Diagnostic) {
        warn!("{}", diagnostic);
    }

    fn runtime_error(&self, error: &RuntimeError) {
        error!("{}", error);
    }

    fn console(&self, message: &str) {
        info!("console: {}", message);
    }
}

/// Keeps every report in memory.  Used by tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    diagnostics: RefCell<Vec<Diagnostic>>,
    runtime_errors: RefCell<Vec<RuntimeError>>,
    console: RefCell<Vec<String>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn runtime_errors(&self) -> Vec<RuntimeError> {
        self.runtime_errors.borrow().clone()
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.console.borrow().clone()
    }

    /// Drains the console buffer.
    pub fn take_console(&self) -> Vec<String> {
        self.console.borrow_mut().drain(..).collect()
    }
}

impl Reporter for CollectingReporter {
    fn diagnostic(&self, diagnostic: &Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic.clone());
    }

    fn runtime_error(&self, error: &RuntimeError) {
        self.runtime_errors.borrow_mut().push(error.clone());
    }

    fn console(&self, message: &str) {
        self.console.borrow_mut().push(message.to_string());
    }
}
