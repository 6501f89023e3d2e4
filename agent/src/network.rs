//! Request log: one JSON line per outbound request in `requests.txt`.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use snare_intercept::{InvocationContext, Value};

use crate::context::InterceptionContext;
use crate::dispatch::Policy;

pub const REQUEST_LOG: &str = "requests.txt";

pub fn request_log_path(work_dir: &Path) -> PathBuf {
    work_dir.join(REQUEST_LOG)
}

/// Append the request descriptor as one JSON line.
pub fn append_request(work_dir: &Path, descriptor: &Value) -> io::Result<()> {
    let mut line = serde_json::to_string(descriptor)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(request_log_path(work_dir))?;
    file.write_all(line.as_bytes())
}

pub struct RequestLog {
    context: Arc<InterceptionContext>,
}

impl RequestLog {
    pub fn new(context: Arc<InterceptionContext>) -> Self {
        Self { context }
    }
}

impl Policy for RequestLog {
    fn name(&self) -> &'static str {
        "network"
    }

    fn applies_to(&self, ctx: &InvocationContext<'_>) -> bool {
        ctx.surface().contains("http") && matches!(ctx.member(), "request" | "get")
    }

    fn on_call(&self, ctx: &mut InvocationContext<'_>) {
        if ctx.arguments().is_empty() {
            return;
        }
        if let Err(e) = append_request(self.context.work_dir(), ctx.nth_argument(0)) {
            debug!("Request log write failed: {}", e);
        }
    }
}
