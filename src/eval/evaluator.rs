//! Evaluator trait and resolution types.

use crate::error::{ResolveError, Result};
use crate::sources::FlagPayload;
use serde::Serialize;
use serde_json::Value;

/// Why a value was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// The flag's default variant was served.
    Static,
}

/// Result of resolving one flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// The variant's value.
    pub value: Value,
    /// Name of the variant that was served.
    pub variant: String,
    /// Why the variant was chosen.
    pub reason: Reason,
}

/// Kind of value a caller expects a flag to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// JSON `true`/`false`
    Boolean,
    /// JSON string
    String,
    /// JSON number
    Number,
    /// JSON object
    Object,
}

impl ValueKind {
    /// Lowercase name used in errors and routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Number => "number",
            Self::Object => "object",
        }
    }

    /// Whether `value` is of this kind.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Boolean => value.is_boolean(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Object => value.is_object(),
        }
    }

    /// Name of the kind `value` actually has.
    pub fn name_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Holds loaded flag state and answers evaluation queries.
///
/// `load` may be called at any time and from any task while queries are in
/// flight: a query observes either the previous flag set or the new one in its
/// entirety. A payload that fails to load leaves the previous set active.
pub trait Evaluator: Send + Sync {
    /// Parse `payload` and swap it in as the live flag set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`](crate::error::Error::Parse) if the payload is
    /// empty or malformed; the previously loaded flags stay active.
    fn load(&self, payload: &FlagPayload) -> Result<()>;

    /// Resolve a single flag.
    fn resolve(&self, flag_key: &str) -> std::result::Result<Resolution, ResolveError>;

    /// Resolve every enabled flag from one consistent snapshot.
    fn resolve_all(&self) -> Vec<(String, Resolution)>;

    /// Number of flags currently loaded.
    fn flag_count(&self) -> usize;

    /// Resolve a flag and check that its value is of `kind`.
    fn resolve_kind(
        &self,
        flag_key: &str,
        kind: ValueKind,
    ) -> std::result::Result<Resolution, ResolveError> {
        let resolution = self.resolve(flag_key)?;
        if !kind.matches(&resolution.value) {
            return Err(ResolveError::TypeMismatch {
                flag: flag_key.to_string(),
                expected: kind.as_str(),
                actual: ValueKind::name_of(&resolution.value),
            });
        }
        Ok(resolution)
    }

    /// Resolve a boolean flag.
    fn resolve_boolean(&self, flag_key: &str) -> std::result::Result<bool, ResolveError> {
        let resolution = self.resolve_kind(flag_key, ValueKind::Boolean)?;
        Ok(resolution.value.as_bool().unwrap_or_default())
    }

    /// Resolve a string flag.
    fn resolve_string(&self, flag_key: &str) -> std::result::Result<String, ResolveError> {
        let resolution = self.resolve_kind(flag_key, ValueKind::String)?;
        Ok(resolution.value.as_str().unwrap_or_default().to_string())
    }

    /// Resolve a numeric flag.
    fn resolve_number(&self, flag_key: &str) -> std::result::Result<f64, ResolveError> {
        let resolution = self.resolve_kind(flag_key, ValueKind::Number)?;
        Ok(resolution.value.as_f64().unwrap_or_default())
    }

    /// Resolve an object flag.
    fn resolve_object(&self, flag_key: &str) -> std::result::Result<Value, ResolveError> {
        Ok(self.resolve_kind(flag_key, ValueKind::Object)?.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_matching() {
        assert!(ValueKind::Boolean.matches(&json!(true)));
        assert!(ValueKind::Number.matches(&json!(1.5)));
        assert!(ValueKind::String.matches(&json!("red")));
        assert!(ValueKind::Object.matches(&json!({"a": 1})));
        assert!(!ValueKind::Object.matches(&json!([1, 2])));
        assert_eq!(ValueKind::name_of(&json!([1])), "array");
    }

    #[test]
    fn test_resolution_serializes_reason() {
        let resolution = Resolution {
            value: json!(true),
            variant: "on".to_string(),
            reason: Reason::Static,
        };
        let body = serde_json::to_value(&resolution).unwrap();
        assert_eq!(body, json!({"value": true, "variant": "on", "reason": "STATIC"}));
    }
}
