use crate::interceptor::invocation::InvocationContext;

/// Receives every call routed through a proxy installed by an
/// [`Interceptor`](crate::Interceptor).
///
/// Both callbacks run with hooks suppressed on the current thread, so
/// anything the listener calls is not intercepted again. The original itself
/// runs between them with hooks live.
///
/// A listener that wants to skip the original supplies an outcome from
/// `on_enter` through [`InvocationContext::replace_return_value`] or
/// [`InvocationContext::replace_outcome`]; `on_leave` then does not run.
pub trait CallListener: Send + Sync {
    fn on_enter(&self, ctx: &mut InvocationContext<'_>);

    /// Runs after the original returned; its outcome is in
    /// [`InvocationContext::return_value`].
    fn on_leave(&self, _ctx: &mut InvocationContext<'_>) {}
}

/// Listener that observes nothing; every call goes straight to the original.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl CallListener for PassThrough {
    fn on_enter(&self, _ctx: &mut InvocationContext<'_>) {}
}
