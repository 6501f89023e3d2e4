use thiserror::Error;

use crate::value::Value;

/// A failure as seen by the target: the error a surface member raises.
///
/// Failures of real operations travel through proxies untouched, so this is
/// the only error type a target ever observes from an intercepted call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{name}: {message}")]
pub struct Fault {
    pub name: String,
    pub message: String,
    pub code: Option<String>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: "Error".to_string(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: "Error".to_string(),
            message: message.into(),
            code: Some(code.into()),
        }
    }

    pub fn type_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: "TypeError".to_string(),
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Error object handed to callbacks and event listeners.
    pub fn to_value(&self) -> Value {
        Value::object([
            ("name", Value::from(self.name.as_str())),
            ("message", Value::from(self.message.as_str())),
            ("code", Value::from(self.code.clone())),
        ])
    }

    /// Rebuild a fault from an error object; anything else becomes a plain
    /// `Error` whose message is the value's textual form.
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        match value {
            Value::Object(_) => Self {
                name: field("name").unwrap_or_else(|| "Error".to_string()),
                message: field("message").unwrap_or_default(),
                code: field("code"),
            },
            other => Self::new(other.to_js_string()),
        }
    }
}

/// Why a member could not be routed through a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("member '{0}' is read-only")]
    ReadOnly(String),

    #[error("member '{0}' does not exist")]
    Missing(String),

    #[error("interceptor state is poisoned")]
    Poisoned,

    #[error("{surface}: left unhooked: {}", .members.join(", "))]
    Incomplete {
        surface: String,
        members: Vec<String>,
    },
}
