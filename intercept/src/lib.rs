//! snare-intercept: call interception over dynamic library surfaces.

pub mod error;
pub mod function;
pub mod ignore;
pub mod interceptor;
pub mod namespace;
pub mod stack;
pub mod value;

// Re-exports for convenience (flattened imports)
pub use error::{Fault, HookError};
pub use function::{Function, NativeFn};
pub use ignore::IgnoreList;
pub use interceptor::guard::{is_in_hook, HookSuppressGuard};
pub use interceptor::invocation::InvocationContext;
pub use interceptor::listener::{CallListener, PassThrough};
pub use interceptor::Interceptor;
pub use namespace::{Member, Namespace};
pub use value::{TimerHandle, TimerKind, Value};
