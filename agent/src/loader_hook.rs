//! The module load hook: every acquired surface passes through the
//! interceptor here, except the instrument's own.

use std::sync::Arc;

use log::warn;
use snare_host::{LoadHook, LoadRequest};
use snare_intercept::{Interceptor, Member};

use crate::context::InterceptionContext;

/// Canonical id of the instrument's own surface.
pub const SELF_MODULE: &str = "snare";

pub fn load_hook(context: Arc<InterceptionContext>, interceptor: Arc<Interceptor>) -> LoadHook {
    Arc::new(move |req: &LoadRequest<'_>, loaded: Member| {
        on_load(&context, &interceptor, req, loaded)
    })
}

fn on_load(
    context: &InterceptionContext,
    interceptor: &Interceptor,
    req: &LoadRequest<'_>,
    loaded: Member,
) -> Member {
    let resolved = match req.loader.resolve_filename(req.request, req.parent) {
        Ok(id) => id,
        Err(e) => {
            warn!("Resolving {} failed: {}", req.request, e);
            context
                .sink()
                .write_line(&format!("[!] Module load error: {}", e));
            return loaded;
        }
    };
    context.report(&format!(
        "[require] caller={} request={} resolved={}",
        req.parent.unwrap_or("<anonymous>"),
        req.request,
        resolved
    ));
    if resolved == SELF_MODULE {
        return loaded;
    }

    match interceptor.install(&loaded, &resolved) {
        Ok(member) => member,
        Err(e) => {
            warn!("Hooking {} failed: {}", resolved, e);
            context
                .sink()
                .write_line(&format!("[!] Module load error: {}", e));
            loaded
        }
    }
}
