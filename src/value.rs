use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::callable::Callable;
use crate::token::Literal;
use crate::types::SemanticType;

/// Shared, mutable backing list of an array value.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// A runtime value.
///
/// Arrays are reference values: cloning a `Value::Array` clones the handle,
/// not the elements.  Use [`Value::deep_clone`] for an independent copy.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(ArrayRef),
    Callable(Rc<Callable>),
    Nil,
}

impl Value {
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Zero value of a declared type.
    pub fn default_for(ty: SemanticType) -> Self {
        match ty {
            SemanticType::INT => Value::Int(0),
            SemanticType::FLOAT => Value::Float(0.0),
            SemanticType::BOOL => Value::Bool(false),
            ty if ty.is_array() => Value::array(Vec::new()),
            _ => Value::Nil,
        }
    }

    /// Short name of the runtime shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Array(_) => "array",
            Value::Callable(_) => "function",
            Value::Nil => "nil",
        }
    }

    /// The integer a numeric value denotes exactly, if any.
    pub fn as_integral(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Validates `self` against a declared type and converts it where the
    /// language allows (`int` → `float`, integral `float` → `int`).
    ///
    /// Arrays keep their identity: elements are converted in place and the
    /// same handle is returned.
    pub fn coerce_to(&self, ty: SemanticType) -> Result<Value, String> {
        match (ty, self) {
            (SemanticType::ANY | SemanticType::NONE, _) => Ok(self.clone()),

            (SemanticType::INT, Value::Int(_)) => Ok(self.clone()),
            (SemanticType::INT, Value::Float(_)) => self
                .as_integral()
                .map(Value::Int)
                .ok_or_else(|| format!("Expected int but got float {}.", self)),

            (SemanticType::FLOAT, Value::Int(n)) => Ok(Value::Float(*n as f64)),
            (SemanticType::FLOAT, Value::Float(_)) => Ok(self.clone()),

            (SemanticType::BOOL, Value::Bool(_)) => Ok(self.clone()),

            (SemanticType::VOID, Value::Nil) => Ok(Value::Nil),

            (ty, Value::Array(list)) if ty.is_array() => {
                let element = ty.element().unwrap_or(SemanticType::ANY);
                let mut items = list.borrow_mut();

                for item in items.iter_mut() {
                    *item = item.coerce_to(element)?;
                }

                Ok(Value::Array(Rc::clone(list)))
            }

            (ty, value) => Err(format!("Expected {} but got {}.", ty, value.kind())),
        }
    }

    /// Copy that shares no array storage with `self`.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Array(list) => {
                Value::array(list.borrow().iter().map(Value::deep_clone).collect())
            }
            other => other.clone(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::array(elements)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Int(n) => Value::Int(n),
            Literal::Float(n) => Value::Float(n),
            Literal::Bool(b) => Value::Bool(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*n))
            }

            Value::Float(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::Bool(b) => write!(f, "{}", b),

            Value::Array(list) => {
                f.write_str("[")?;
                for (i, item) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }

            Value::Callable(callable) => write!(f, "<fn {}>", callable.name()),

            Value::Nil => write!(f, "nil"),
        }
    }
}
