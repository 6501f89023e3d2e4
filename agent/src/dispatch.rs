//! The policy chain run by every proxy.

use std::sync::Arc;

use snare_intercept::{CallListener, InvocationContext};

use crate::capture::FileCapture;
use crate::context::InterceptionContext;
use crate::logger::CallLogger;
use crate::network::RequestLog;
use crate::spoof::ExecSpoof;

/// One surface-specific behaviour. A policy short-circuits the real call by
/// supplying an outcome on the context; later policies then do not run.
pub trait Policy: Send + Sync {
    fn name(&self) -> &'static str;

    fn applies_to(&self, ctx: &InvocationContext<'_>) -> bool;

    fn on_call(&self, ctx: &mut InvocationContext<'_>);

    /// Runs once the original has returned, unless a policy replaced it.
    fn on_return(&self, _ctx: &mut InvocationContext<'_>) {}
}

/// Logs the call, then runs policies in order.
pub struct AgentListener {
    logger: CallLogger,
    policies: Vec<Box<dyn Policy>>,
}

impl AgentListener {
    /// The chain enabled by the context's configuration.
    pub fn new(context: &Arc<InterceptionContext>) -> Self {
        let config = context.config();
        let mut policies: Vec<Box<dyn Policy>> = Vec::new();
        if config.log_http_requests {
            policies.push(Box::new(RequestLog::new(Arc::clone(context))));
        }
        policies.push(Box::new(ExecSpoof::new(Arc::clone(context))));
        if config.save_file_writes || config.hide_lock_files {
            policies.push(Box::new(FileCapture::new(Arc::clone(context))));
        }
        Self::with_policies(CallLogger::new(Arc::clone(context)), policies)
    }

    pub fn with_policies(logger: CallLogger, policies: Vec<Box<dyn Policy>>) -> Self {
        Self { logger, policies }
    }

    pub fn policy_names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.name()).collect()
    }
}

impl CallListener for AgentListener {
    fn on_enter(&self, ctx: &mut InvocationContext<'_>) {
        self.logger.log(ctx);
        for policy in &self.policies {
            if ctx.skips_original() {
                break;
            }
            if policy.applies_to(ctx) {
                policy.on_call(ctx);
            }
        }
    }

    fn on_leave(&self, ctx: &mut InvocationContext<'_>) {
        for policy in &self.policies {
            if policy.applies_to(ctx) {
                policy.on_return(ctx);
            }
        }
    }
}
