//! Timer acceleration: positive delays collapse to zero.
//!
//! The `timers` members are swapped for accelerated stand-ins when the agent
//! attaches, so acceleration does not depend on the members being hooked.
//! Call order is preserved; only wall-clock time is compressed. Repeating
//! timers fire once and hand back a placeholder handle.

use std::sync::Arc;

use snare_host::{args, EventLoop};
use snare_intercept::{Fault, Function, TimerHandle, Value};

/// Members of the `timers` surface that get a stand-in.
pub const ACCELERATED: &[&str] = &[
    "setTimeout",
    "setInterval",
    "clearTimeout",
    "clearInterval",
    "sleep",
];

fn positive_delay(delay: &Value) -> bool {
    delay.as_f64().is_some_and(|ms| ms > 0.0)
}

fn is_placeholder(handle: &Value) -> bool {
    handle.as_timer().is_some_and(|h| h.is_placeholder())
}

pub struct TimerAcceleration {
    event_loop: Arc<EventLoop>,
}

impl TimerAcceleration {
    pub fn new(event_loop: Arc<EventLoop>) -> Self {
        Self { event_loop }
    }

    pub fn set_timeout(&self, original: &Function, a: &[Value]) -> Result<Value, Fault> {
        if !positive_delay(args::nth(a, 1)) {
            return original.call(a);
        }
        let mut forwarded = a.to_vec();
        forwarded[1] = Value::from(0i64);
        original.call(&forwarded)
    }

    pub fn set_interval(&self, original: &Function, a: &[Value]) -> Result<Value, Fault> {
        if !positive_delay(args::nth(a, 1)) {
            return original.call(a);
        }
        // A non-callable first argument is left for the real member to reject.
        let Some(callback) = args::nth(a, 0).as_function().cloned() else {
            return original.call(a);
        };
        let rest = a.get(2..).unwrap_or_default().to_vec();
        self.event_loop
            .set_timeout(callback, &Value::from(0i64), rest);
        Ok(Value::Timer(TimerHandle::placeholder()))
    }

    /// The stand-in for `member`, delegating to `original` where the real
    /// behaviour is kept. `None` for members left alone.
    pub fn accelerate(self: &Arc<Self>, member: &str, original: &Function) -> Option<Function> {
        let this = Arc::clone(self);
        let real = original.clone();
        let stand_in = match member {
            "setTimeout" => Function::new(original.name(), original.arity(), move |a| {
                this.set_timeout(&real, a)
            }),
            "setInterval" => Function::new(original.name(), original.arity(), move |a| {
                this.set_interval(&real, a)
            }),
            "clearTimeout" | "clearInterval" => {
                Function::new(original.name(), original.arity(), move |a| {
                    if is_placeholder(args::nth(a, 0)) {
                        Ok(Value::Undefined)
                    } else {
                        real.call(a)
                    }
                })
            }
            "sleep" => Function::new(original.name(), original.arity(), |_| Ok(Value::Undefined)),
            _ => return None,
        };
        stand_in.copy_properties_from(original);
        Some(stand_in)
    }
}
