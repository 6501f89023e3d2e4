//! snare agent - the behaviour-analysis instrument.
//!
//! Attaches to a [`Runtime`] before the target's own code runs: installs the
//! module load hook so every surface the target acquires is routed through
//! the interceptor, and (optionally) observes failure propagation.
//!
//! Built as a cdylib, the agent activates through [`snare_agent_init`],
//! which the `preload` feature also runs from a load-time constructor.

pub mod capture; // File capture policy and descriptor table
pub mod config;
pub mod context;
pub mod dispatch; // Policy trait and the listener running the chain
pub mod errors;
pub mod format;
pub mod loader_hook;
pub mod logger;
pub mod network;
pub mod overrides; // Stand-ins installed at attach (os answers, timers)
pub mod sink;
pub mod spoof; // Exec and OS-information spoofing
pub mod stack;
pub mod timers;

pub use config::{Config, ConfigError};
pub use context::InterceptionContext;
pub use sink::{DiagnosticSink, MemoryLog};

use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{Context, Result};
use log::{error, info};
use snare_host::{LoadHook, Runtime};
use snare_intercept::{Interceptor, Member, Namespace, Value};

use crate::dispatch::AgentListener;
use crate::errors::ErrorObserver;
use crate::loader_hook::{load_hook, SELF_MODULE};
use crate::overrides::SurfaceOverrides;

/// Global agent state.
static AGENT: OnceLock<Agent> = OnceLock::new();

/// An attached instrument.
pub struct Agent {
    runtime: Arc<Runtime>,
    context: Arc<InterceptionContext>,
    interceptor: Arc<Interceptor>,
    /// The load hook ours replaced; taken on detach.
    previous_hook: Mutex<Option<Option<LoadHook>>>,
    overrides: SurfaceOverrides,
    error_observer: Option<ErrorObserver>,
}

fn config_value(config: &Config, work_dir: &std::path::Path) -> Value {
    Value::object([
        ("showStack", Value::from(config.show_stack)),
        ("saveFileWrites", Value::from(config.save_file_writes)),
        ("logHttpRequests", Value::from(config.log_http_requests)),
        ("skipSleeps", Value::from(config.skip_sleeps)),
        ("traceErrors", Value::from(config.trace_errors)),
        (
            "ignoredApis",
            Value::Array(config.ignored_apis.iter().map(|s| Value::from(s.as_str())).collect()),
        ),
        ("hideLockFiles", Value::from(config.hide_lock_files)),
        ("workDir", Value::from(work_dir.display().to_string())),
    ])
}

/// The instrument's own surface, `require("snare")`.
fn self_surface(context: &InterceptionContext) -> Namespace {
    let config = config_value(context.config(), context.work_dir());
    Namespace::new()
        .with_fn("version", 0, |_| Ok(Value::from(env!("CARGO_PKG_VERSION"))))
        .with_fn("config", 0, move |_| Ok(config.clone()))
}

impl Agent {
    /// Attach to `runtime`. Surfaces acquired after this point are hooked.
    pub fn attach(runtime: Arc<Runtime>, config: Config, sink: DiagnosticSink) -> Result<Self> {
        let context = Arc::new(InterceptionContext::new(
            config,
            sink,
            Arc::clone(runtime.event_loop()),
        ));
        let listener = Arc::new(AgentListener::new(&context));
        let interceptor = Arc::new(Interceptor::new(listener, context.ignore_list().clone()));

        let own = Member::from(self_surface(&context));
        interceptor.exclude(&own);
        runtime.loader().register_builtin(SELF_MODULE, own);

        let error_observer = if context.config().trace_errors {
            let observer = ErrorObserver::install(&runtime, &context, &interceptor)
                .context("failed to install error observer")?;
            Some(observer)
        } else {
            None
        };

        let overrides = SurfaceOverrides::install(&runtime, &context);
        let previous = runtime
            .loader()
            .set_load_hook(load_hook(Arc::clone(&context), Arc::clone(&interceptor)));
        info!(
            "Agent attached (work dir {})",
            context.work_dir().display()
        );

        Ok(Self {
            runtime,
            context,
            interceptor,
            previous_hook: Mutex::new(Some(previous)),
            overrides,
            error_observer,
        })
    }

    /// Undo [`attach`](Self::attach). Proxies already handed out stay in place;
    /// overridden members get their originals back.
    pub fn detach(&self) {
        let previous = self
            .previous_hook
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(previous) = previous {
            self.runtime.loader().restore_load_hook(previous);
        }
        self.overrides.detach();
        if let Some(observer) = &self.error_observer {
            observer.detach();
        }
        info!("Agent detached");
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn context(&self) -> &Arc<InterceptionContext> {
        &self.context
    }

    pub fn interceptor(&self) -> &Arc<Interceptor> {
        &self.interceptor
    }

    /// The process-wide agent, once [`snare_agent_init`] has succeeded.
    pub fn get() -> Option<&'static Agent> {
        AGENT.get()
    }
}

/// Attach the process-wide agent to [`Runtime::global`].
///
/// Returns 0 on success (or if already attached), -1 on failure.
#[unsafe(no_mangle)]
pub extern "C" fn snare_agent_init() -> i32 {
    let _ = env_logger::try_init();
    if AGENT.get().is_some() {
        return 0;
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return -1;
        }
    };
    match Agent::attach(Runtime::global(), config, DiagnosticSink::stderr()) {
        Ok(agent) => {
            if let Err(agent) = AGENT.set(agent) {
                agent.detach();
            }
            0
        }
        Err(e) => {
            error!("Failed to attach agent: {:#}", e);
            -1
        }
    }
}

/// Constructor for automatic initialization on library load (Linux).
#[cfg(all(feature = "preload", target_os = "linux", not(test)))]
#[unsafe(link_section = ".init_array")]
#[used]
static INIT: extern "C" fn() = {
    extern "C" fn init() {
        snare_agent_init();
    }
    init
};

/// Constructor for automatic initialization on library load (macOS).
#[cfg(all(feature = "preload", target_os = "macos", not(test)))]
#[unsafe(link_section = "__DATA,__mod_init_func")]
#[used]
static INIT: extern "C" fn() = {
    extern "C" fn init() {
        snare_agent_init();
    }
    init
};
