//! snare-host: the system-access surfaces an instrumented target runs against.
//!
//! A [`Runtime`] bundles the event loop, the module loader and the builtin
//! surfaces. Targets acquire every surface through [`ModuleLoader::load`],
//! which is where the instrument attaches.

pub mod args;
pub mod child_process;
pub mod errno;
pub mod errors;
pub mod event_loop;
pub mod fs;
pub mod http;
pub mod loader;
pub mod os;
pub mod path;
pub mod process;
pub mod timers;

use std::sync::{Arc, OnceLock};

use log::debug;
use snare_intercept::{Fault, Member, Namespace, Value};

pub use event_loop::{EventLoop, Task, TaskError};
pub use loader::{LoadHook, LoadRequest, ModuleLoader};

/// Builtin module names, in registration order.
pub const BUILTINS: &[&str] = &[
    "fs",
    "fs/promises",
    "path",
    "child_process",
    "os",
    "http",
    "https",
    "timers",
    "process",
];

pub struct Runtime {
    event_loop: Arc<EventLoop>,
    loader: ModuleLoader,
    files: Arc<fs::FileTable>,
    process: Arc<Namespace>,
    errors: Arc<Namespace>,
}

static GLOBAL: OnceLock<Arc<Runtime>> = OnceLock::new();

impl Runtime {
    pub fn new() -> Arc<Self> {
        let event_loop = Arc::new(EventLoop::new());
        let files = Arc::new(fs::FileTable::default());
        let emitter = Arc::new(process::Emitter::default());
        let process = Arc::new(process::namespace(&emitter));
        let errors = errors::namespace();

        let loader = ModuleLoader::new();
        let fs = Arc::new(fs::namespace(&event_loop, &files));
        if let Some(promises) = fs.namespace("promises") {
            loader.register_builtin("fs/promises", promises);
        }
        loader.register_builtin("fs", fs);
        loader.register_builtin("path", path::namespace());
        loader.register_builtin("child_process", child_process::namespace(&event_loop));
        loader.register_builtin("os", os::namespace());
        loader.register_builtin("http", http::namespace(&event_loop, "http"));
        loader.register_builtin("https", http::namespace(&event_loop, "https"));
        loader.register_builtin("timers", timers::namespace(&event_loop));
        loader.register_builtin("process", Arc::clone(&process));
        debug!("Runtime created with {} builtins", BUILTINS.len());

        Arc::new(Self {
            event_loop,
            loader,
            files,
            process,
            errors,
        })
    }

    /// The process-wide runtime.
    pub fn global() -> Arc<Runtime> {
        Arc::clone(GLOBAL.get_or_init(Runtime::new))
    }

    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    pub fn files(&self) -> &Arc<fs::FileTable> {
        &self.files
    }

    /// The global `process` object.
    pub fn process(&self) -> &Arc<Namespace> {
        &self.process
    }

    /// The global error facilities (`prepareStackTrace`).
    pub fn errors(&self) -> &Arc<Namespace> {
        &self.errors
    }

    pub fn require(&self, request: &str) -> Result<Member, Fault> {
        self.loader.require(request)
    }

    /// Render a failure's stack through the current `prepareStackTrace`.
    pub fn render_stack(&self, fault: &Fault) -> String {
        let err = fault.to_value();
        errors::render(&self.errors, &err)
            .unwrap_or_else(|_| errors::default_render(&err, &Value::Array(Vec::new())))
    }

    /// Drain the event loop.
    ///
    /// A failed task is emitted on `process` as `uncaughtException` or
    /// `unhandledRejection`. Without a listener the stack is printed to
    /// stderr and the failure ends the run.
    pub fn run(&self) -> Result<(), Fault> {
        while let Some(task) = self.event_loop.next_task() {
            if let Err(err) = task.run() {
                self.deliver(err)?;
            }
        }
        Ok(())
    }

    fn deliver(&self, err: TaskError) -> Result<(), Fault> {
        let (event, fault) = match err {
            TaskError::Exception(fault) => ("uncaughtException", fault),
            TaskError::Rejection(fault) => ("unhandledRejection", fault),
        };
        let handled = match self.process.function("emit") {
            Some(emit) => emit
                .call(&[Value::from(event), fault.to_value()])?
                .as_bool()
                .unwrap_or(false),
            None => false,
        };
        if handled {
            return Ok(());
        }
        eprintln!("{}", self.render_stack(&fault));
        Err(fault)
    }
}
