//! Members replaced outright when the agent attaches.
//!
//! The `os` fingerprinting answers and, with `skipSleeps`, the accelerated
//! `timers` members do not depend on hooking: an ignore-list entry only
//! silences their log lines. Proxies installed later wrap the stand-ins.

use std::sync::Arc;

use log::{debug, warn};
use snare_host::Runtime;
use snare_intercept::{Function, Namespace};

use crate::context::InterceptionContext;
use crate::spoof::OsSpoof;
use crate::timers::{TimerAcceleration, ACCELERATED};

struct Replaced {
    surface: Arc<Namespace>,
    member: String,
    original: Function,
}

/// The stand-ins in place, with the members they replaced.
pub struct SurfaceOverrides {
    replaced: Vec<Replaced>,
}

fn builtin_namespace(runtime: &Runtime, name: &str) -> Option<Arc<Namespace>> {
    runtime
        .loader()
        .builtin(name)
        .and_then(|member| member.as_namespace().cloned())
}

impl SurfaceOverrides {
    pub fn install(runtime: &Runtime, context: &InterceptionContext) -> Self {
        let mut overrides = Self {
            replaced: Vec::new(),
        };
        if let Some(os) = builtin_namespace(runtime, "os") {
            for member in OsSpoof::MEMBERS {
                overrides.replace(&os, "os", member, |original| OsSpoof::spoof(member, original));
            }
        }
        if context.config().skip_sleeps {
            if let Some(timers) = builtin_namespace(runtime, "timers") {
                let acceleration =
                    Arc::new(TimerAcceleration::new(Arc::clone(context.event_loop())));
                for member in ACCELERATED {
                    overrides.replace(&timers, "timers", member, |original| {
                        acceleration.accelerate(member, original)
                    });
                }
            }
        }
        debug!("{} members overridden", overrides.replaced.len());
        overrides
    }

    fn replace<F>(&mut self, surface: &Arc<Namespace>, name: &str, member: &str, stand_in: F)
    where
        F: FnOnce(&Function) -> Option<Function>,
    {
        let Some(original) = surface.function(member) else {
            debug!("{}.{} is not a function, leaving it", name, member);
            return;
        };
        let Some(replacement) = stand_in(&original) else {
            return;
        };
        match surface.set(member, replacement) {
            Ok(()) => self.replaced.push(Replaced {
                surface: Arc::clone(surface),
                member: member.to_string(),
                original,
            }),
            Err(e) => warn!("Could not override {}.{}: {}", name, member, e),
        }
    }

    /// Members currently replaced, in installation order.
    pub fn members(&self) -> Vec<&str> {
        self.replaced.iter().map(|r| r.member.as_str()).collect()
    }

    /// Put the replaced members back.
    pub fn detach(&self) {
        for replaced in self.replaced.iter().rev() {
            if let Err(e) = replaced
                .surface
                .set(&replaced.member, replaced.original.clone())
            {
                debug!("Could not restore {}: {}", replaced.member, e);
            }
        }
    }
}
