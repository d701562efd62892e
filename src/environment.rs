//! Runtime scope chain.
//!
//! Scopes are `Rc<RefCell<Environment>>` so a function value can keep the
//! scope it was declared in alive after the declaring block has finished.
//! Writes through a [`Token`] coerce the value to the token's semantic type.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Binds `name` in this scope.  A name can only be bound once per scope.
    pub fn define(&mut self, name: &str, value: Value) -> Result<(), String> {
        if self.values.contains_key(name) {
            return Err(format!("'{}' is already defined in this scope.", name));
        }

        debug!("Defining '{}' = {}", name, value);

        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Value bound in this exact scope.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Assigns to the nearest binding of `name`.  Returns the stored value.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<Value, RuntimeError> {
        if self.values.contains_key(&name.lexeme) {
            self.store(name, value)
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// `name[index] = value` on the nearest binding of `name`.
    pub fn assign_index(
        &mut self,
        name: &Token,
        index: &Value,
        value: Value,
    ) -> Result<Value, RuntimeError> {
        if self.values.contains_key(&name.lexeme) {
            self.store_index(name, index, value)
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign_index(name, index, value)
        } else {
            Err(undefined(name))
        }
    }

    // ─── distance‑indexed access ─────────────────────────────────────────────

    /// Scope `distance` hops out from `env` (0 is `env` itself).
    pub fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
    ) -> Result<Value, RuntimeError> {
        let scope = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let value = scope.borrow().lookup(&name.lexeme);

        value.ok_or_else(|| undefined(name))
    }

    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<Value, RuntimeError> {
        let scope = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let mut scope = scope.borrow_mut();

        if !scope.values.contains_key(&name.lexeme) {
            return Err(undefined(name));
        }

        scope.store(name, value)
    }

    pub fn assign_index_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        index: &Value,
        value: Value,
    ) -> Result<Value, RuntimeError> {
        let scope = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let mut scope = scope.borrow_mut();

        if !scope.values.contains_key(&name.lexeme) {
            return Err(undefined(name));
        }

        scope.store_index(name, index, value)
    }

    // ─── writes into a binding known to live in this scope ──────────────────

    fn store(&mut self, name: &Token, value: Value) -> Result<Value, RuntimeError> {
        let value = value
            .coerce_to(name.semantic_type)
            .map_err(|msg| {
                RuntimeError::new(
                    name.line,
                    format!("Can't assign to '{}': {}", name.lexeme, msg),
                )
            })?;

        self.values.insert(name.lexeme.clone(), value.clone());
        Ok(value)
    }

    fn store_index(
        &mut self,
        name: &Token,
        index: &Value,
        value: Value,
    ) -> Result<Value, RuntimeError> {
        let list = match self.values.get(&name.lexeme) {
            Some(Value::Array(list)) => Rc::clone(list),
            _ => return Err(RuntimeError::new(name.line, "Variable is not an array.")),
        };

        let slot: usize = checked_index(&list.borrow(), index, name.line)?;

        let value = match name.semantic_type.element() {
            Some(element) => value
                .coerce_to(element)
                .map_err(|msg| RuntimeError::new(name.line, msg))?,
            None => value,
        };

        list.borrow_mut()[slot] = value.clone();
        Ok(value)
    }
}

/// Validates `index` against `items` and returns it as a slot number.
pub fn checked_index(items: &[Value], index: &Value, line: usize) -> Result<usize, RuntimeError> {
    let n: i64 = index
        .as_integral()
        .ok_or_else(|| RuntimeError::new(line, "Array index must be an integer."))?;

    usize::try_from(n)
        .ok()
        .filter(|&slot| slot < items.len())
        .ok_or_else(|| RuntimeError::new(line, "Index out of bounds."))
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name.line, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SemanticType;

    fn token(name: &str, ty: SemanticType) -> Token {
        Token::synthetic(name, ty)
    }

    #[test]
    fn define_twice_in_one_scope_fails() {
        let mut env = Environment::new();
        assert!(env.define("x", Value::Int(1)).is_ok());
        assert!(env.define("x", Value::Int(2)).is_err());
    }

    #[test]
    fn assign_walks_out_and_coerces() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("f", Value::Float(0.0)).unwrap();

        let mut inner = Environment::with_enclosing(Rc::clone(&globals));
        let stored = inner
            .assign(&token("f", SemanticType::FLOAT), Value::Int(3))
            .unwrap();

        assert_eq!(stored, Value::Float(3.0));
        assert_eq!(globals.borrow().lookup("f"), Some(Value::Float(3.0)));
    }

    #[test]
    fn distance_lookup_skips_shadowing_scopes() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x", Value::Int(1)).unwrap();

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(&outer))));
        inner.borrow_mut().define("x", Value::Int(2)).unwrap();

        let x = token("x", SemanticType::INT);
        assert_eq!(Environment::get_at(&inner, 0, &x).unwrap(), Value::Int(2));
        assert_eq!(Environment::get_at(&inner, 1, &x).unwrap(), Value::Int(1));
        assert!(Environment::get_at(&inner, 2, &x).is_err());
    }

    #[test]
    fn indexed_assignment_checks_bounds_and_shape() {
        let mut env = Environment::new();
        env.define("xs", Value::array(vec![Value::Int(1), Value::Int(2)]))
            .unwrap();
        env.define("n", Value::Int(0)).unwrap();

        let xs = token("xs", SemanticType::INT_ARRAY);
        env.assign_index(&xs, &Value::Int(1), Value::Int(9)).unwrap();
        assert_eq!(
            env.get(&xs).unwrap(),
            Value::array(vec![Value::Int(1), Value::Int(9)])
        );

        let err = env
            .assign_index(&xs, &Value::Int(2), Value::Int(0))
            .unwrap_err();
        assert_eq!(err.message, "Index out of bounds.");

        let err = env
            .assign_index(&token("n", SemanticType::INT), &Value::Int(0), Value::Int(1))
            .unwrap_err();
        assert_eq!(err.message, "Variable is not an array.");
    }
}
