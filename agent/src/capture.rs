//! File capture: shadow copies of everything the target writes.
//!
//! Path-based writes are copied to `<work_dir>/<basename>` as they happen.
//! Descriptor-based writes are recovered at close time: the path recorded at
//! open is copied to `<work_dir>/<unix_millis>_<basename>` before the real
//! close runs. Copies use `std::fs` directly, never the hooked surface, and
//! every capture failure is dropped.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use snare_host::{args, path, process};
use snare_intercept::{Fault, Function, InvocationContext, Value};

use crate::context::InterceptionContext;
use crate::dispatch::Policy;

/// Descriptor to the path it was opened from.
#[derive(Default)]
pub struct DescriptorTable {
    paths: Mutex<HashMap<i64, String>>,
}

impl DescriptorTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<i64, String>> {
        self.paths.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, fd: i64, path: impl Into<String>) {
        self.lock().insert(fd, path.into());
    }

    pub fn take(&self, fd: i64) -> Option<String> {
        self.lock().remove(&fd)
    }

    pub fn contains(&self, fd: i64) -> bool {
        self.lock().contains_key(&fd)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

pub fn shadow_path(work_dir: &Path, original: &str) -> PathBuf {
    work_dir.join(path::basename(original))
}

pub fn snapshot_path(work_dir: &Path, original: &str, unix_millis: u128) -> PathBuf {
    work_dir.join(format!("{}_{}", unix_millis, path::basename(original)))
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Write all of `data`, one partial write at a time. Stops early when a
/// write makes no progress. Returns the bytes written.
pub fn write_fully<W: Write>(out: &mut W, data: &[u8]) -> io::Result<usize> {
    let mut offset = 0;
    while offset < data.len() {
        match out.write(&data[offset..]) {
            Ok(0) => break,
            Ok(n) => offset += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(offset)
}

/// Copy `data` to the shadow of `original`, replacing or extending it.
pub fn save_copy(work_dir: &Path, original: &str, data: &Value, append: bool) -> io::Result<PathBuf> {
    let target = shadow_path(work_dir, original);
    let mut options = OpenOptions::new();
    if append {
        options.append(true).create(true);
    } else {
        options.write(true).create(true).truncate(true);
    }
    let mut file = options.open(&target)?;
    write_fully(&mut file, &data.to_bytes())?;
    Ok(target)
}

/// Whether writing `original` already writes its shadow: same file name,
/// and the same directory once symlinks are resolved.
fn writes_own_shadow(work_dir: &Path, original: &str) -> bool {
    let requested = PathBuf::from(path::resolve(&process::cwd(), &[original]));
    let shadow = shadow_path(work_dir, original);
    if requested == shadow {
        return true;
    }
    if requested.file_name() != shadow.file_name() {
        return false;
    }
    match (requested.parent(), shadow.parent()) {
        (Some(a), Some(b)) => match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        },
        _ => false,
    }
}

/// Where an asynchronous open stands.
enum PendingOpen {
    Pending { path: String },
    Opened(i64),
    Failed,
}

/// Wraps the caller's completion callback of an asynchronous open: records
/// the descriptor on success, then hands the outcome to the caller.
struct OpenContinuation {
    context: Arc<InterceptionContext>,
    callback: Function,
    state: Mutex<PendingOpen>,
}

impl OpenContinuation {
    fn new(context: Arc<InterceptionContext>, path: String, callback: Function) -> Self {
        Self {
            context,
            callback,
            state: Mutex::new(PendingOpen::Pending { path }),
        }
    }

    fn resolve(&self, outcome: &[Value]) -> Result<Value, Fault> {
        let err = args::nth(outcome, 0);
        let fd = args::nth(outcome, 1).as_i64();
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let next = match (err.is_nullish(), fd) {
                (true, Some(fd)) => PendingOpen::Opened(fd),
                _ => PendingOpen::Failed,
            };
            if let PendingOpen::Pending { path } = mem::replace(&mut *state, next) {
                if let PendingOpen::Opened(fd) = *state {
                    self.context.descriptors().record(fd, path);
                }
            }
        }
        self.callback.call(outcome)
    }

    fn into_function(self) -> Function {
        let name = self.callback.name().to_string();
        let arity = self.callback.arity();
        Function::new(name, arity, move |outcome| self.resolve(outcome))
    }
}

/// Shadow-copies writes and descriptor contents for the `fs` surfaces.
pub struct FileCapture {
    context: Arc<InterceptionContext>,
}

impl FileCapture {
    pub fn new(context: Arc<InterceptionContext>) -> Self {
        Self { context }
    }

    fn capture_write(&self, ctx: &InvocationContext<'_>, append: bool) {
        let Some(original) = ctx.nth_argument(0).as_str() else {
            return;
        };
        let work_dir = self.context.work_dir();
        if writes_own_shadow(work_dir, original) {
            return;
        }
        match save_copy(work_dir, original, ctx.nth_argument(1), append) {
            Ok(target) => debug!("Captured write to {} as {}", original, target.display()),
            Err(e) => debug!("Capture of {} failed: {}", original, e),
        }
    }

    fn record_opened(&self, ctx: &InvocationContext<'_>) {
        let Some(Ok(fd)) = ctx.return_value() else {
            return;
        };
        if let (Some(fd), Ok(path)) = (fd.as_i64(), args::path(ctx.arguments(), 0)) {
            self.context.descriptors().record(fd, path);
        }
    }

    /// Forward the open with the caller's callback behind a continuation.
    fn open_async(&self, ctx: &mut InvocationContext<'_>) {
        let (Some(callback), Ok(path)) = (
            args::trailing_callback(ctx.arguments()),
            args::path(ctx.arguments(), 0),
        ) else {
            return;
        };
        let continuation = OpenContinuation::new(Arc::clone(&self.context), path, callback);
        let mut forwarded = args::without_callback(ctx.arguments()).to_vec();
        forwarded.push(Value::Function(continuation.into_function()));
        ctx.replace_arguments(forwarded);
    }

    /// Copy the file behind `fd` if it was opened while capturing.
    pub fn snapshot_on_close(&self, fd: &Value) {
        let Some(original) = fd.as_i64().and_then(|fd| self.context.descriptors().take(fd)) else {
            return;
        };
        let target = snapshot_path(self.context.work_dir(), &original, unix_millis());
        match fs::copy(&original, &target) {
            Ok(_) => debug!("Captured {} as {}", original, target.display()),
            Err(e) => debug!("Capture of {} failed: {}", original, e),
        }
    }
}

impl Policy for FileCapture {
    fn name(&self) -> &'static str {
        "file-capture"
    }

    fn applies_to(&self, ctx: &InvocationContext<'_>) -> bool {
        ctx.surface().contains("fs")
    }

    fn on_call(&self, ctx: &mut InvocationContext<'_>) {
        let config = self.context.config();
        if ctx.member() == "existsSync" {
            let is_lock = ctx.nth_argument(0).as_str().is_some_and(|p| p.ends_with(".lock"));
            if config.hide_lock_files && is_lock {
                ctx.replace_return_value(Value::from(false));
            }
            return;
        }
        if !config.save_file_writes {
            return;
        }
        match ctx.member() {
            "writeFileSync" | "writeFile" => self.capture_write(ctx, false),
            "appendFileSync" | "appendFile" => self.capture_write(ctx, true),
            "open" => self.open_async(ctx),
            "closeSync" | "close" => self.snapshot_on_close(ctx.nth_argument(0)),
            _ => {}
        }
    }

    fn on_return(&self, ctx: &mut InvocationContext<'_>) {
        if ctx.member() == "openSync" && self.context.config().save_file_writes {
            self.record_opened(ctx);
        }
    }
}
