use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use snare_intercept::{Function, TimerHandle, Value};

use crate::common::*;

fn accelerated() -> Harness {
    Harness::with_config(|c| c.skip_sleeps = true)
}

// ============================================================================
// One-Shot Timers
// ============================================================================

#[test]
fn test_long_timeout_fires_immediately() {
    let h = accelerated();
    let (cb, calls) = recorder("later");
    let start = Instant::now();

    h.call(
        "timers",
        "setTimeout",
        &[Value::Function(cb), Value::from(600_000i64), Value::from("arg")],
    )
    .unwrap();
    h.run().unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(*calls.lock().unwrap(), vec![vec![Value::from("arg")]]);
}

#[test]
fn test_ignored_timers_still_accelerated() {
    let h = Harness::with_config(|c| {
        c.skip_sleeps = true;
        c.ignored_apis = vec!["timers".to_string()];
    });
    let (cb, calls) = recorder("later");
    let start = Instant::now();

    h.call(
        "timers",
        "setTimeout",
        &[Value::Function(cb), Value::from(600_000i64)],
    )
    .unwrap();
    h.run().unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert!(h.logged("timers.").is_empty());
}

#[test]
fn test_accelerated_timers_keep_call_order() {
    let h = accelerated();
    let order = Arc::new(Mutex::new(Vec::new()));

    for (label, delay) in [("slow", 90_000i64), ("fast", 0)] {
        let log = Arc::clone(&order);
        let cb = Function::new(label, 0, move |_| {
            log.lock().unwrap().push(label);
            Ok(Value::Undefined)
        });
        h.call("timers", "setTimeout", &[Value::Function(cb), Value::from(delay)])
            .unwrap();
    }
    h.run().unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["slow", "fast"]);
}

#[test]
fn test_timeouts_untouched_when_disabled() {
    let h = Harness::new();
    let (cb, calls) = recorder("later");
    let start = Instant::now();
    h.call("timers", "setTimeout", &[Value::Function(cb), Value::from(30i64)])
        .unwrap();
    h.run().unwrap();
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(calls.lock().unwrap().len(), 1);
}

// ============================================================================
// Intervals
// ============================================================================

#[test]
fn test_interval_fires_once_and_returns_placeholder() {
    let h = accelerated();
    let (cb, calls) = recorder("poll");

    let handle = h
        .call("timers", "setInterval", &[Value::Function(cb), Value::from(1000i64), Value::from(1i64)])
        .unwrap();
    h.run().unwrap();

    assert!(handle.as_timer().unwrap().is_placeholder());
    assert_eq!(*calls.lock().unwrap(), vec![vec![Value::from(1i64)]]);
    assert_eq!(h.call("timers", "clearInterval", &[handle]), Ok(Value::Undefined));
}

#[test]
fn test_clear_accepts_real_and_placeholder_handles() {
    let h = accelerated();
    let (cb, calls) = recorder("never");
    let real = h
        .call("timers", "setTimeout", &[Value::Function(cb), Value::from(0i64)])
        .unwrap();
    h.call("timers", "clearTimeout", &[real]).unwrap();
    h.call(
        "timers",
        "clearTimeout",
        &[Value::Timer(TimerHandle::placeholder())],
    )
    .unwrap();
    h.run().unwrap();
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_sleep_is_skipped() {
    let h = accelerated();
    let start = Instant::now();
    h.call("timers", "sleep", &[Value::from(120_000i64)]).unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
}
