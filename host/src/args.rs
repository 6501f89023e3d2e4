//! Argument extraction for surface members.

use snare_intercept::{Fault, Function, Value};

/// Short type description used in `ERR_INVALID_ARG_TYPE` messages.
pub fn received(value: &Value) -> String {
    match value {
        Value::Undefined => "Received undefined".to_string(),
        Value::Null => "Received null".to_string(),
        Value::Bool(b) => format!("Received type boolean ({b})"),
        Value::Number(_) => format!("Received type number ({})", value.to_js_string()),
        Value::BigInt(n) => format!("Received type bigint ({n}n)"),
        Value::String(s) => format!("Received type string ('{s}')"),
        Value::Function(f) => format!("Received function {}", f.name()),
        _ => "Received an instance of Object".to_string(),
    }
}

pub fn invalid_type(name: &str, expected: &str, value: &Value) -> Fault {
    Fault::type_error(
        "ERR_INVALID_ARG_TYPE",
        format!(
            "The \"{name}\" argument must be of type {expected}. {}",
            received(value)
        ),
    )
}

pub fn nth(args: &[Value], n: usize) -> &Value {
    static UNDEFINED: Value = Value::Undefined;
    args.get(n).unwrap_or(&UNDEFINED)
}

pub fn string<'a>(args: &'a [Value], n: usize, name: &str) -> Result<&'a str, Fault> {
    let value = nth(args, n);
    value
        .as_str()
        .ok_or_else(|| invalid_type(name, "string", value))
}

/// Paths accept strings and buffers.
pub fn path(args: &[Value], n: usize) -> Result<String, Fault> {
    match nth(args, n) {
        Value::String(s) => Ok(s.clone()),
        Value::Bytes(b) => Ok(String::from_utf8_lossy(b).into_owned()),
        other => Err(invalid_type("path", "string or an instance of Buffer", other)),
    }
}

pub fn integer(args: &[Value], n: usize, name: &str) -> Result<i64, Fault> {
    let value = nth(args, n);
    value
        .as_i64()
        .ok_or_else(|| invalid_type(name, "number", value))
}

pub fn function(args: &[Value], n: usize, name: &str) -> Result<Function, Fault> {
    let value = nth(args, n);
    value
        .as_function()
        .cloned()
        .ok_or_else(|| invalid_type(name, "function", value))
}

/// The trailing completion callback of an async member, if any.
pub fn trailing_callback(args: &[Value]) -> Option<Function> {
    args.last().and_then(Value::as_function).cloned()
}

/// Arguments before the trailing callback.
pub fn without_callback(args: &[Value]) -> &[Value] {
    match args.last() {
        Some(Value::Function(_)) => &args[..args.len() - 1],
        _ => args,
    }
}

/// Encoding from an options argument given as a string or `{ encoding }`.
pub fn encoding(options: &Value) -> Option<&str> {
    match options {
        Value::String(s) => Some(s),
        Value::Object(_) => options.get("encoding").and_then(Value::as_str),
        _ => None,
    }
}
