//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use snare_agent::{Agent, Config, DiagnosticSink, MemoryLog};
use snare_host::Runtime;
use snare_intercept::{Fault, Function, Namespace, Value};
use tempfile::TempDir;

pub use snare_agent::capture::DescriptorTable;

/// A fresh runtime with an agent attached, writing captures to a scratch
/// directory and diagnostics to memory.
pub struct Harness {
    pub runtime: Arc<Runtime>,
    pub agent: Agent,
    pub log: MemoryLog,
    pub work_dir: TempDir,
    /// Scratch space for the target's own files.
    pub target_dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Stacks are off unless `configure` turns them on.
    pub fn with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let work_dir = TempDir::new().expect("work dir");
        let target_dir = TempDir::new().expect("target dir");
        let mut config = Config {
            show_stack: false,
            work_dir: Some(work_dir.path().to_path_buf()),
            ..Config::default()
        };
        configure(&mut config);

        let runtime = Runtime::new();
        let (sink, log) = DiagnosticSink::memory();
        let agent = Agent::attach(Arc::clone(&runtime), config, sink).expect("attach");
        Self {
            runtime,
            agent,
            log,
            work_dir,
            target_dir,
        }
    }

    /// `require(module)` as a namespace.
    pub fn surface(&self, module: &str) -> Arc<Namespace> {
        self.runtime
            .require(module)
            .unwrap_or_else(|e| panic!("require({module}) failed: {e}"))
            .as_namespace()
            .cloned()
            .unwrap_or_else(|| panic!("{module} is not a namespace"))
    }

    pub fn call(&self, module: &str, member: &str, args: &[Value]) -> Result<Value, Fault> {
        self.surface(module)
            .function(member)
            .unwrap_or_else(|| panic!("{module}.{member} missing"))
            .call(args)
    }

    pub fn run(&self) -> Result<(), Fault> {
        self.runtime.run()
    }

    /// Absolute path for a target file.
    pub fn target_path(&self, name: &str) -> String {
        self.target_dir.path().join(name).to_string_lossy().into_owned()
    }

    pub fn work_path(&self, name: &str) -> PathBuf {
        self.work_dir.path().join(name)
    }

    /// Names of the files in the work directory, sorted.
    pub fn work_files(&self) -> Vec<String> {
        list_files(self.work_dir.path())
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        self.agent.context().descriptors()
    }

    /// Diagnostic lines starting with `[prefix`.
    pub fn logged(&self, prefix: &str) -> Vec<String> {
        let needle = format!("[{prefix}");
        self.log
            .lines()
            .into_iter()
            .filter(|l| l.starts_with(&needle))
            .collect()
    }
}

pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// `<digits>_<name>`, the shape of a close-time capture.
pub fn is_snapshot_of(file: &str, name: &str) -> bool {
    file.strip_suffix(name)
        .and_then(|p| p.strip_suffix('_'))
        .is_some_and(|millis| !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit()))
}

/// A function recording the arguments of every call.
pub fn recorder(name: &str) -> (Function, Arc<Mutex<Vec<Vec<Value>>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let f = Function::new(name, 0, move |a| {
        sink.lock().unwrap().push(a.to_vec());
        Ok(Value::Undefined)
    });
    (f, calls)
}

/// A `child_process` stand-in counting how often anything really ran.
pub fn spy_child_process() -> (Namespace, Arc<AtomicUsize>) {
    let spawned = Arc::new(AtomicUsize::new(0));
    let (sync, cb) = (Arc::clone(&spawned), Arc::clone(&spawned));
    let ns = Namespace::new()
        .with_fn("execSync", 2, move |a| {
            sync.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from(format!("ran {}", a[0].to_js_string())))
        })
        .with_fn("exec", 3, move |_| {
            cb.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Undefined)
        });
    (ns, spawned)
}
