//! Call logging: the first thing every intercepted call goes through.

use std::sync::Arc;

use snare_intercept::InvocationContext;

use crate::context::InterceptionContext;
use crate::format::call_line;

/// Member names that are internal cleanup and never logged.
const INTERNAL_MEMBERS: &[&str] = &["free"];

pub struct CallLogger {
    context: Arc<InterceptionContext>,
}

impl CallLogger {
    pub fn new(context: Arc<InterceptionContext>) -> Self {
        Self { context }
    }

    pub fn should_log(&self, ctx: &InvocationContext<'_>) -> bool {
        !INTERNAL_MEMBERS.contains(&ctx.member())
            && !self.context.ignore_list().matches(&ctx.api_path())
    }

    pub fn log(&self, ctx: &InvocationContext<'_>) {
        if self.should_log(ctx) {
            self.context
                .report(&call_line(&ctx.api_path(), ctx.arguments()));
        }
    }
}
