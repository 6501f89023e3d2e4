//! Failure observation: unhandled failures and stack rendering are logged,
//! then handed to the members they replaced.

use std::sync::Arc;

use log::debug;
use snare_host::{args, Runtime};
use snare_intercept::{Fault, Function, HookError, Interceptor, Namespace, Value};

use crate::context::InterceptionContext;

const FAILURE_EVENTS: &[&str] = &["uncaughtException", "unhandledRejection"];

/// Replaces `process.emit` and `errors.prepareStackTrace` until detached.
pub struct ErrorObserver {
    process: Arc<Namespace>,
    errors: Arc<Namespace>,
    original_emit: Function,
    original_prepare: Function,
}

fn required(ns: &Namespace, name: &str) -> Result<Function, HookError> {
    ns.function(name)
        .ok_or_else(|| HookError::Missing(name.to_string()))
}

fn observe_emit(context: Arc<InterceptionContext>, original: Function) -> Function {
    Function::new(original.name().to_string(), original.arity(), move |a| {
        if let Some(event) = args::nth(a, 0).as_str() {
            if FAILURE_EVENTS.contains(&event) {
                context.sink().write_line(&format!("[error.{}]\n---", event));
            }
        }
        original.call(a)
    })
}

fn observe_prepare(context: Arc<InterceptionContext>, original: Function) -> Function {
    Function::new(original.name().to_string(), original.arity(), move |a| {
        let fault = Fault::from_value(args::nth(a, 0));
        context.report(&format!("[throw] {}: {}", fault.name, fault.message));
        original.call(a)
    })
}

impl ErrorObserver {
    pub fn install(
        runtime: &Runtime,
        context: &Arc<InterceptionContext>,
        interceptor: &Interceptor,
    ) -> Result<Self, HookError> {
        let process = Arc::clone(runtime.process());
        let errors = Arc::clone(runtime.errors());
        let original_emit = required(&process, "emit")?;
        let original_prepare = required(&errors, "prepareStackTrace")?;

        let emit = observe_emit(Arc::clone(context), original_emit.clone());
        let prepare = observe_prepare(Arc::clone(context), original_prepare.clone());
        interceptor.mark_wrapped(&emit);
        interceptor.mark_wrapped(&prepare);
        process.set("emit", emit)?;
        if let Err(e) = errors.set("prepareStackTrace", prepare) {
            process.set("emit", original_emit)?;
            return Err(e);
        }
        debug!("Error observer installed");

        Ok(Self {
            process,
            errors,
            original_emit,
            original_prepare,
        })
    }

    /// Put the replaced members back.
    pub fn detach(&self) {
        if let Err(e) = self.process.set("emit", self.original_emit.clone()) {
            debug!("Could not restore process.emit: {}", e);
        }
        if let Err(e) = self
            .errors
            .set("prepareStackTrace", self.original_prepare.clone())
        {
            debug!("Could not restore prepareStackTrace: {}", e);
        }
    }
}
