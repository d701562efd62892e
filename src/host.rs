//! Host bridge: variables and functions a hosting application exposes to
//! scripts.
//!
//! A [`Host`] is plain data.  Every (re)compile reads it to seed the
//! identifier‑type table, the resolver's signature table and the globals
//! scope, so changing the host only takes effect on the next compile.

use std::fmt;
use std::rc::Rc;

use log::info;

use crate::error::{Result, SeeError};
use crate::scanner::IdentifierTypes;
use crate::types::SemanticType;
use crate::value::Value;

/// Callback behind a [`HostFunction`].  `None` means "no value".
pub type HostCallback = Rc<dyn Fn(&[Value]) -> Option<Value>>;

/// A function implemented by the host.
pub struct HostFunction {
    pub name: String,
    pub param_types: Vec<SemanticType>,
    pub return_type: SemanticType,
    callback: HostCallback,
}

impl HostFunction {
    pub fn new<F>(
        name: impl Into<String>,
        param_types: Vec<SemanticType>,
        return_type: SemanticType,
        callback: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Option<Value> + 'static,
    {
        Self {
            name: name.into(),
            param_types,
            return_type,
            callback: Rc::new(callback),
        }
    }

    pub fn invoke(&self, arguments: &[Value]) -> Option<Value> {
        (self.callback)(arguments)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .field("param_types", &self.param_types)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// An external variable and the value it starts with on every compile.
#[derive(Debug, Clone)]
pub struct HostVariable {
    pub name: String,
    pub ty: SemanticType,
    pub initial: Value,
}

#[derive(Debug, Clone, Default)]
pub struct Host {
    variables: Vec<HostVariable>,
    functions: Vec<Rc<HostFunction>>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an external variable.  `initial` must fit `ty`.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        ty: SemanticType,
        initial: Value,
    ) -> Result<()> {
        let name: String = name.into();

        if matches!(ty, SemanticType::VOID | SemanticType::ANY | SemanticType::NONE) {
            return Err(SeeError::Config(format!(
                "external variable '{}' can't have type {}",
                name, ty
            )));
        }

        self.check_unique(&name)?;

        let initial = initial
            .coerce_to(ty)
            .map_err(|msg| SeeError::Config(format!("external variable '{}': {}", name, msg)))?;

        info!("Registered external variable '{}' of type {}", name, ty);

        self.variables.push(HostVariable { name, ty, initial });
        Ok(())
    }

    pub fn add_function(&mut self, function: HostFunction) -> Result<()> {
        self.check_unique(&function.name)?;

        info!(
            "Registered host function '{}' with {} parameter(s)",
            function.name,
            function.param_types.len()
        );

        self.functions.push(Rc::new(function));
        Ok(())
    }

    pub fn variables(&self) -> &[HostVariable] {
        &self.variables
    }

    pub fn functions(&self) -> &[Rc<HostFunction>] {
        &self.functions
    }

    pub fn variable(&self, name: &str) -> Option<&HostVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Identifier table the scanner starts from: every external name with
    /// its type (return type for functions).
    pub fn identifier_types(&self) -> IdentifierTypes {
        let mut identifiers = IdentifierTypes::new();

        for variable in &self.variables {
            identifiers.insert(variable.name.clone(), variable.ty);
        }

        for function in &self.functions {
            identifiers.insert(function.name.clone(), function.return_type);
        }

        identifiers
    }

    fn check_unique(&self, name: &str) -> Result<()> {
        let taken = self.variables.iter().any(|v| v.name == name)
            || self.functions.iter().any(|f| f.name == name);

        if taken {
            return Err(SeeError::Config(format!("'{}' is registered twice", name)));
        }

        Ok(())
    }
}
