//! The `process` surface: an event emitter plus process facts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use snare_intercept::{Fault, Function, Namespace, Value};

use crate::args;

/// Event listeners by event name, in registration order.
#[derive(Default)]
pub struct Emitter {
    listeners: Mutex<HashMap<String, Vec<Function>>>,
}

impl Emitter {
    pub fn on(&self, event: &str, listener: Function) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.entry(event.to_string()).or_default().push(listener);
    }

    pub fn listener_count(&self, event: &str) -> usize {
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.get(event).map_or(0, Vec::len)
    }

    /// Call every listener of `event`; `true` if there was at least one.
    /// The first failing listener stops delivery and its failure propagates.
    pub fn emit(&self, event: &str, args: &[Value]) -> Result<bool, Fault> {
        let snapshot = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.get(event).cloned().unwrap_or_default()
        };
        for listener in &snapshot {
            listener.call(args)?;
        }
        Ok(!snapshot.is_empty())
    }
}

pub fn cwd() -> String {
    std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn namespace(emitter: &Arc<Emitter>) -> Namespace {
    let (on, emit, count) = (Arc::clone(emitter), Arc::clone(emitter), Arc::clone(emitter));
    Namespace::new()
        .with_fn("on", 2, move |a| {
            let event = args::string(a, 0, "event")?;
            on.on(event, args::function(a, 1, "listener")?);
            Ok(Value::Undefined)
        })
        .with_fn("emit", 1, move |a| {
            let event = args::nth(a, 0).to_js_string();
            Ok(Value::from(emit.emit(&event, a.get(1..).unwrap_or_default())?))
        })
        .with_fn("listenerCount", 1, move |a| {
            Ok(Value::from(count.listener_count(args::string(a, 0, "event")?)))
        })
        .with_fn("cwd", 0, |_| Ok(Value::from(cwd())))
        .with("pid", Value::from(u64::from(std::process::id())))
        .with("platform", Value::from(crate::os::platform()))
}
