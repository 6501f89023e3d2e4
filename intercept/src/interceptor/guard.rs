//! Per-thread re-entrancy guard for proxy dispatch.

use std::cell::Cell;

thread_local! {
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Set the re-entrancy flag on the current thread.
pub fn set_in_hook(val: bool) {
    IN_HOOK.with(|h| h.set(val));
}

/// Check if a listener is currently running on this thread.
pub fn is_in_hook() -> bool {
    IN_HOOK.with(|h| h.get())
}

/// RAII guard that suppresses interception for its lifetime.
/// Saves the current state and restores it on drop, so guards nest.
pub struct HookSuppressGuard(bool);

impl HookSuppressGuard {
    pub fn new() -> Self {
        let was = is_in_hook();
        set_in_hook(true);
        Self(was)
    }
}

impl Default for HookSuppressGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HookSuppressGuard {
    fn drop(&mut self) {
        set_in_hook(self.0);
    }
}
