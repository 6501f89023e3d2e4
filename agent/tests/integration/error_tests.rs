use snare_intercept::{Fault, Function, Value};

use crate::common::*;

fn tracing_errors() -> Harness {
    Harness::with_config(|c| c.trace_errors = true)
}

// ============================================================================
// Failure Propagation
// ============================================================================

#[test]
fn test_uncaught_exception_is_logged_and_still_fatal() {
    let h = tracing_errors();
    let boom = Function::new("boom", 0, |_| Err(Fault::type_error("ERR_BOOM", "kaboom")));
    h.call("timers", "setImmediate", &[Value::Function(boom)])
        .unwrap();

    let fault = h.run().unwrap_err();

    assert_eq!(fault, Fault::type_error("ERR_BOOM", "kaboom"));
    let errors = h.logged("error.");
    assert_eq!(errors, vec!["[error.uncaughtException]"]);
    assert_eq!(h.logged("throw"), vec!["[throw] TypeError: kaboom"]);
}

#[test]
fn test_handled_exception_reaches_listener() {
    let h = tracing_errors();
    let (listener, seen) = recorder("onUncaught");
    h.call(
        "process",
        "on",
        &[Value::from("uncaughtException"), Value::Function(listener)],
    )
    .unwrap();
    let boom = Function::new("boom", 0, |_| Err(Fault::new("handled")));
    h.call("timers", "setImmediate", &[Value::Function(boom)])
        .unwrap();

    assert_eq!(h.run(), Ok(()));
    assert_eq!(h.logged("error."), vec!["[error.uncaughtException]"]);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(Fault::from_value(&seen[0][0]).message, "handled");
    assert!(h.logged("throw").is_empty());
}

#[test]
fn test_rejection_from_promises_surface() {
    let h = tracing_errors();
    let missing = h.target_path("missing.cfg");
    h.call("fs/promises", "readFile", &[Value::from(missing.as_str())])
        .unwrap();

    let fault = h.run().unwrap_err();

    assert_eq!(fault.code.as_deref(), Some("ENOENT"));
    assert_eq!(h.logged("error."), vec!["[error.unhandledRejection]"]);
}

#[test]
fn test_nothing_logged_when_disabled() {
    let h = Harness::new();
    let boom = Function::new("boom", 0, |_| Err(Fault::new("quiet")));
    h.call("timers", "setImmediate", &[Value::Function(boom)])
        .unwrap();
    assert!(h.run().is_err());
    assert!(h.logged("error.").is_empty());
    assert!(h.logged("throw").is_empty());
}
