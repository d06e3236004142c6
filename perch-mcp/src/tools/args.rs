//! Typed extraction of loosely-typed tool arguments
//!
//! Optional values fall back to a default when absent or of the wrong type;
//! required values report which key was missing or mistyped.

use serde_json::{Map, Value};
use thiserror::Error;

/// A required argument was missing or had the wrong type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("{0} is required")]
    Missing(String),

    #[error("{0} must be a number")]
    NotANumber(String),
}

/// The argument mapping of a single tool invocation
///
/// `null` values are treated the same as absent keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn get_number(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn require_number(&self, key: &str) -> Result<f64, ParamError> {
        match self.get(key) {
            None => Err(ParamError::Missing(key.to_string())),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| ParamError::NotANumber(key.to_string())),
        }
    }

    /// A required number truncated to an integer id
    pub fn require_id(&self, key: &str) -> Result<i64, ParamError> {
        self.require_number(key).map(|number| number as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => Arguments::new(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_defaults_on_missing_or_mistyped() {
        let args = args(json!({ "all": "yes", "limit": "ten", "branch": 5, "tail": null }));

        assert!(!args.get_bool("all", false));
        assert!(args.get_bool("tail", true));
        assert_eq!(args.get_number("limit", 10.0), 10.0);
        assert_eq!(args.get_string("branch", "main"), "main");
    }

    #[test]
    fn test_present_values() {
        let args = args(json!({ "all": true, "limit": 25, "branch": "dev" }));

        assert!(args.get_bool("all", false));
        assert_eq!(args.get_number("limit", 10.0), 25.0);
        assert_eq!(args.get_string("branch", "main"), "dev");
    }

    #[test]
    fn test_require_number() {
        let args = args(json!({ "pipeline_number": 7.9, "step_id": "3" }));

        assert_eq!(args.require_id("pipeline_number"), Ok(7));
        assert_eq!(
            args.require_number("step_id").unwrap_err().to_string(),
            "step_id must be a number"
        );
        assert_eq!(
            args.require_number("missing").unwrap_err().to_string(),
            "missing is required"
        );
    }
}
