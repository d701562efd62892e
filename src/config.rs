//! JSON description of the external variables a host exposes.
//!
//! ```json
//! { "variables": [ { "name": "speed", "type": "FLOAT", "value": 2.5 },
//!                  { "name": "path",  "type": "INT_ARRAY", "value": [1, 2] } ] }
//! ```

use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::{Result, SeeError};
use crate::host::Host;
use crate::types::SemanticType;
use crate::value::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SemanticType,
    /// Omitted means the zero value of `ty`.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl HostConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes)?;

        info!("Loaded host configuration from {:?}", path);
        Self::from_json(&text)
    }

    /// Adds every configured variable to `host`.
    pub fn apply(&self, host: &mut Host) -> Result<()> {
        for variable in &self.variables {
            let value = match &variable.value {
                Some(json) => json_to_value(json).map_err(|msg| {
                    SeeError::Config(format!("variable '{}': {}", variable.name, msg))
                })?,
                None => Value::default_for(variable.ty),
            };

            host.add_variable(variable.name.clone(), variable.ty, value)?;
        }

        Ok(())
    }
}

fn json_to_value(json: &serde_json::Value) -> std::result::Result<Value, String> {
    match json {
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| format!("unsupported number {}", n)),
        },
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::array),
        other => Err(format!("unsupported value {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_are_coerced_to_their_declared_type() {
        let config = HostConfig::from_json(
            r#"{ "variables": [
                { "name": "speed", "type": "FLOAT", "value": 2 },
                { "name": "path", "type": "INT_ARRAY", "value": [1, 2, 3] },
                { "name": "armed", "type": "BOOL" }
            ] }"#,
        )
        .unwrap();

        let mut host = Host::new();
        config.apply(&mut host).unwrap();

        assert_eq!(host.variable("speed").unwrap().initial, Value::Float(2.0));
        assert_eq!(
            host.variable("path").unwrap().initial,
            Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(host.variable("armed").unwrap().initial, Value::Bool(false));
    }

    #[test]
    fn mismatched_value_is_a_config_error() {
        let config = HostConfig::from_json(
            r#"{ "variables": [ { "name": "flag", "type": "BOOL", "value": 1 } ] }"#,
        )
        .unwrap();

        let mut host = Host::new();
        assert!(matches!(config.apply(&mut host), Err(SeeError::Config(_))));
    }

    #[test]
    fn strings_are_rejected() {
        let config = HostConfig::from_json(
            r#"{ "variables": [ { "name": "s", "type": "INT", "value": "one" } ] }"#,
        )
        .unwrap();

        assert!(config.apply(&mut Host::new()).is_err());
    }
}
