//! The `errors` surface: stack-trace rendering.
//!
//! Rendering always goes through the *current* `prepareStackTrace` member,
//! so replacing it changes how every later failure is formatted.

use std::sync::Arc;

use snare_intercept::stack::capture_frames;
use snare_intercept::{Fault, Function, Namespace, Value};

use crate::args;

const MAX_FRAMES: usize = 64;

/// `Name: message` followed by one line per frame.
pub fn default_render(err: &Value, frames: &Value) -> String {
    let fault = Fault::from_value(err);
    let mut out = format!("{}: {}", fault.name, fault.message);
    for frame in frames.as_array().unwrap_or_default() {
        out.push('\n');
        out.push_str(&frame.to_js_string());
    }
    out
}

/// The current call stack as an array of frame lines.
pub fn current_frames() -> Value {
    Value::Array(
        capture_frames(MAX_FRAMES)
            .iter()
            .map(|frame| Value::from(frame.to_string()))
            .collect(),
    )
}

/// Render `err` through the namespace's current `prepareStackTrace`.
pub fn render(errors: &Namespace, err: &Value) -> Result<String, Fault> {
    let frames = current_frames();
    match errors.function("prepareStackTrace") {
        Some(prepare) => Ok(prepare.call(&[err.clone(), frames])?.to_js_string()),
        None => Ok(default_render(err, &frames)),
    }
}

pub fn namespace() -> Arc<Namespace> {
    let ns = Arc::new(Namespace::new().with_fn("prepareStackTrace", 2, |a| {
        Ok(Value::from(default_render(args::nth(a, 0), args::nth(a, 1))))
    }));

    let errors = Arc::downgrade(&ns);
    ns.insert(
        "captureStackTrace",
        Function::new("captureStackTrace", 1, move |a| {
            let Value::Object(mut err) = args::nth(a, 0).clone() else {
                return Err(args::invalid_type("targetObject", "object", args::nth(a, 0)));
            };
            let target = Value::Object(err.clone());
            let stack = match errors.upgrade() {
                Some(errors) => render(&errors, &target)?,
                None => default_render(&target, &current_frames()),
            };
            err.insert("stack".to_string(), Value::from(stack));
            Ok(Value::Object(err))
        }),
    );
    ns
}
