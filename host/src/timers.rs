//! The `timers` surface over the event loop.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use snare_intercept::{Fault, Namespace, Value};

use crate::args;
use crate::event_loop::EventLoop;

fn clear(event_loop: &EventLoop, a: &[Value]) -> Result<Value, Fault> {
    if let Some(handle) = args::nth(a, 0).as_timer() {
        event_loop.clear(handle);
    }
    Ok(Value::Undefined)
}

pub fn namespace(event_loop: &Arc<EventLoop>) -> Namespace {
    let (timeout, interval, immediate, clear_t, clear_i) = (
        Arc::clone(event_loop),
        Arc::clone(event_loop),
        Arc::clone(event_loop),
        Arc::clone(event_loop),
        Arc::clone(event_loop),
    );
    Namespace::new()
        .with_fn("setTimeout", 2, move |a| {
            let callback = args::function(a, 0, "callback")?;
            let rest = a.get(2..).unwrap_or_default().to_vec();
            Ok(Value::Timer(timeout.set_timeout(callback, args::nth(a, 1), rest)))
        })
        .with_fn("setInterval", 2, move |a| {
            let callback = args::function(a, 0, "callback")?;
            let rest = a.get(2..).unwrap_or_default().to_vec();
            Ok(Value::Timer(interval.set_interval(callback, args::nth(a, 1), rest)))
        })
        .with_fn("setImmediate", 1, move |a| {
            let callback = args::function(a, 0, "callback")?;
            immediate.enqueue(callback, a.get(1..).unwrap_or_default().to_vec());
            Ok(Value::Undefined)
        })
        .with_fn("clearTimeout", 1, move |a| clear(&clear_t, a))
        .with_fn("clearInterval", 1, move |a| clear(&clear_i, a))
        .with_fn("sleep", 1, |a| {
            let ms = args::nth(a, 0).as_f64().filter(|ms| *ms > 0.0).unwrap_or(0.0);
            thread::sleep(Duration::from_micros((ms * 1000.0) as u64));
            Ok(Value::Undefined)
        })
}
