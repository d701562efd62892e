use serde::{Deserialize, Serialize};
use std::fmt;

/// Static type tag of the language.
///
/// `ANY` only appears in builtin/host signatures; `NONE` marks a name whose
/// type has not been established (yet).
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SemanticType {
    INT,
    FLOAT,
    BOOL,
    VOID,
    INT_ARRAY,
    FLOAT_ARRAY,
    BOOL_ARRAY,
    ANY,
    #[default]
    NONE,
}

impl SemanticType {
    /// The array type whose elements are `self`.  Non‑scalars map to themselves.
    pub fn array_of(self) -> Self {
        match self {
            SemanticType::INT => SemanticType::INT_ARRAY,
            SemanticType::FLOAT => SemanticType::FLOAT_ARRAY,
            SemanticType::BOOL => SemanticType::BOOL_ARRAY,
            other => other,
        }
    }

    /// Element type of an array type, `None` for everything else.
    pub fn element(self) -> Option<Self> {
        match self {
            SemanticType::INT_ARRAY => Some(SemanticType::INT),
            SemanticType::FLOAT_ARRAY => Some(SemanticType::FLOAT),
            SemanticType::BOOL_ARRAY => Some(SemanticType::BOOL),
            _ => None,
        }
    }

    pub fn is_array(self) -> bool {
        self.element().is_some()
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, SemanticType::INT | SemanticType::FLOAT)
    }

    /// Can a value of static type `value` be stored in a slot of type `self`?
    ///
    /// INT needs INT, FLOAT takes INT or FLOAT, BOOL needs BOOL, arrays need
    /// the identical array type.  `ANY` on either side is always accepted.
    pub fn accepts(self, value: SemanticType) -> bool {
        if self == SemanticType::ANY || value == SemanticType::ANY {
            return true;
        }

        match self {
            SemanticType::FLOAT => value.is_numeric(),
            _ => self == value,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::INT => "int",
            SemanticType::FLOAT => "float",
            SemanticType::BOOL => "bool",
            SemanticType::VOID => "void",
            SemanticType::INT_ARRAY => "int[]",
            SemanticType::FLOAT_ARRAY => "float[]",
            SemanticType::BOOL_ARRAY => "bool[]",
            SemanticType::ANY => "any",
            SemanticType::NONE => "unknown",
        };

        write!(f, "{}", name)
    }
}
