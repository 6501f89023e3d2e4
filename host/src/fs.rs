//! The `fs` surface: files by path and by descriptor.
//!
//! Synchronous members do their work on the caller's turn. Callback members
//! do it on the event loop and report `(err, result)`; `fs.promises` members
//! have no callback to report to, so their failures are rejections.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use snare_intercept::{Fault, Function, Namespace, Value};

use crate::args;
use crate::errno::{bad_descriptor, io_fault};
use crate::event_loop::{EventLoop, TaskError};

/// First descriptor handed out; 0-2 belong to the standard streams.
const FIRST_FD: i64 = 3;

/// Open files by descriptor.
pub struct FileTable {
    files: Mutex<HashMap<i64, File>>,
    next_fd: AtomicI64,
}

impl Default for FileTable {
    fn default() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            next_fd: AtomicI64::new(FIRST_FD),
        }
    }
}

impl FileTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<i64, File>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn open(&self, path: &str, flags: &Value, mode: &Value) -> Result<i64, Fault> {
        let options = open_options(flags, mode)?;
        let file = options.open(path).map_err(|e| io_fault(&e, "open", Some(path)))?;
        let fd = self.next_fd.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(fd, file);
        Ok(fd)
    }

    /// One write call; the count may fall short of `data.len()`.
    pub fn write(&self, fd: i64, data: &[u8], position: Option<u64>) -> Result<usize, Fault> {
        let mut files = self.lock();
        let file = files.get_mut(&fd).ok_or_else(|| bad_descriptor("write"))?;
        if let Some(position) = position {
            file.seek(SeekFrom::Start(position))
                .map_err(|e| io_fault(&e, "write", None))?;
        }
        file.write(data).map_err(|e| io_fault(&e, "write", None))
    }

    pub fn close(&self, fd: i64) -> Result<(), Fault> {
        match self.lock().remove(&fd) {
            Some(_) => Ok(()),
            None => Err(bad_descriptor("close")),
        }
    }

    pub fn is_open(&self, fd: i64) -> bool {
        self.lock().contains_key(&fd)
    }
}

fn open_options(flags: &Value, mode: &Value) -> Result<OpenOptions, Fault> {
    let flags = match flags {
        Value::Undefined | Value::Null => "r",
        Value::String(s) => s.as_str(),
        other => return Err(args::invalid_type("flags", "string", other)),
    };
    let mut options = OpenOptions::new();
    match flags {
        "r" | "rs" => options.read(true),
        "r+" | "rs+" => options.read(true).write(true),
        "w" => options.write(true).create(true).truncate(true),
        "wx" | "xw" => options.write(true).create_new(true),
        "w+" => options.read(true).write(true).create(true).truncate(true),
        "wx+" | "xw+" => options.read(true).write(true).create_new(true),
        "a" | "as" => options.append(true).create(true),
        "ax" | "xa" => options.append(true).create_new(true),
        "a+" | "as+" => options.read(true).append(true).create(true),
        "ax+" | "xa+" => options.read(true).append(true).create_new(true),
        other => {
            return Err(Fault::type_error(
                "ERR_INVALID_ARG_VALUE",
                format!("The argument 'flags' is invalid. Received '{other}'"),
            ))
        }
    };
    apply_mode(&mut options, mode);
    Ok(options)
}

#[cfg(unix)]
fn apply_mode(options: &mut OpenOptions, mode: &Value) {
    use std::os::unix::fs::OpenOptionsExt;
    if let Some(mode) = mode.as_i64() {
        options.mode(mode as u32);
    }
}

#[cfg(not(unix))]
fn apply_mode(_options: &mut OpenOptions, _mode: &Value) {}

fn write_file(path: &str, data: &Value, options: &Value, append: bool) -> Result<(), Fault> {
    let flag = options.get("flag").and_then(Value::as_str);
    let append = append || flag.is_some_and(|f| f.starts_with('a'));
    let mut open = OpenOptions::new();
    if append {
        open.append(true).create(true);
    } else {
        open.write(true).create(true).truncate(true);
    }
    let mut file = open.open(path).map_err(|e| io_fault(&e, "open", Some(path)))?;
    file.write_all(&data.to_bytes())
        .map_err(|e| io_fault(&e, "write", Some(path)))
}

fn read_file(path: &str, options: &Value) -> Result<Value, Fault> {
    let bytes = fs::read(path).map_err(|e| io_fault(&e, "open", Some(path)))?;
    match args::encoding(options) {
        Some(_) => Ok(Value::from(String::from_utf8_lossy(&bytes).into_owned())),
        None => Ok(Value::Bytes(bytes)),
    }
}

/// Build `(err, result)` callback arguments from an outcome.
pub fn callback_args(outcome: Result<Value, Fault>) -> Vec<Value> {
    match outcome {
        Ok(Value::Undefined) => vec![Value::Null],
        Ok(value) => vec![Value::Null, value],
        Err(fault) => vec![fault.to_value()],
    }
}

/// Run `op` on the loop and hand its outcome to `callback`.
fn complete<F>(event_loop: &EventLoop, callback: Function, op: F)
where
    F: FnOnce() -> Result<Value, Fault> + Send + 'static,
{
    event_loop.enqueue_job(move || {
        callback
            .call(&callback_args(op()))
            .map(|_| ())
            .map_err(TaskError::Exception)
    });
}

/// Run `op` on the loop; a failure is a rejection, a success goes to the
/// optional fulfilment callback.
fn settle<F>(event_loop: &EventLoop, on_fulfilled: Option<Function>, op: F)
where
    F: FnOnce() -> Result<Value, Fault> + Send + 'static,
{
    event_loop.enqueue_job(move || {
        let value = op().map_err(TaskError::Rejection)?;
        if let Some(cb) = on_fulfilled {
            cb.call(&[value]).map_err(TaskError::Exception)?;
        }
        Ok(())
    });
}

fn constants() -> Value {
    #[cfg(unix)]
    let flags = [
        ("O_RDONLY", libc::O_RDONLY),
        ("O_WRONLY", libc::O_WRONLY),
        ("O_RDWR", libc::O_RDWR),
        ("O_CREAT", libc::O_CREAT),
        ("O_EXCL", libc::O_EXCL),
        ("O_TRUNC", libc::O_TRUNC),
        ("O_APPEND", libc::O_APPEND),
    ];
    #[cfg(not(unix))]
    let flags = [
        ("O_RDONLY", 0),
        ("O_WRONLY", 1),
        ("O_RDWR", 2),
        ("O_CREAT", 0x100),
        ("O_EXCL", 0x400),
        ("O_TRUNC", 0x200),
        ("O_APPEND", 0x8),
    ];
    let mut entries: Vec<(&str, Value)> = flags
        .iter()
        .map(|(name, bits)| (*name, Value::from(*bits)))
        .collect();
    entries.push(("COPYFILE_EXCL", Value::from(1i64)));
    entries.push(("F_OK", Value::from(0i64)));
    Value::object(entries)
}

fn promise_write(event_loop: &EventLoop, a: &[Value], append: bool) -> Result<Value, Fault> {
    let path = args::path(a, 0)?;
    let data = args::nth(a, 1).clone();
    let options = args::nth(args::without_callback(a), 2).clone();
    settle(event_loop, args::trailing_callback(a), move || {
        write_file(&path, &data, &options, append).map(|_| Value::Undefined)
    });
    Ok(Value::Undefined)
}

fn promises(event_loop: &Arc<EventLoop>) -> Namespace {
    let (w, ap, rd) = (
        Arc::clone(event_loop),
        Arc::clone(event_loop),
        Arc::clone(event_loop),
    );
    Namespace::new()
        .with_fn("writeFile", 3, move |a| promise_write(&w, a, false))
        .with_fn("appendFile", 3, move |a| promise_write(&ap, a, true))
        .with_fn("readFile", 2, move |a| {
            let path = args::path(a, 0)?;
            let options = args::nth(args::without_callback(a), 1).clone();
            settle(&rd, args::trailing_callback(a), move || read_file(&path, &options));
            Ok(Value::Undefined)
        })
}

/// Callback-style write: `(path, data[, options], cb)`.
fn callback_write(event_loop: &EventLoop, a: &[Value], append: bool) -> Result<Value, Fault> {
    let cb = required_callback(a)?;
    let path = args::path(a, 0)?;
    let data = args::nth(a, 1).clone();
    let options = args::nth(args::without_callback(a), 2).clone();
    complete(event_loop, cb, move || {
        write_file(&path, &data, &options, append).map(|_| Value::Undefined)
    });
    Ok(Value::Undefined)
}

fn required_callback(a: &[Value]) -> Result<Function, Fault> {
    args::trailing_callback(a).ok_or_else(|| args::invalid_type("cb", "function", &Value::Undefined))
}

/// The `fs` surface over a shared descriptor table.
pub fn namespace(event_loop: &Arc<EventLoop>, table: &Arc<FileTable>) -> Namespace {
    let ns = Namespace::new()
        .with_fn("writeFileSync", 3, |a| {
            let path = args::path(a, 0)?;
            write_file(&path, args::nth(a, 1), args::nth(a, 2), false)?;
            Ok(Value::Undefined)
        })
        .with_fn("appendFileSync", 3, |a| {
            let path = args::path(a, 0)?;
            write_file(&path, args::nth(a, 1), args::nth(a, 2), true)?;
            Ok(Value::Undefined)
        })
        .with_fn("readFileSync", 2, |a| {
            let path = args::path(a, 0)?;
            read_file(&path, args::nth(a, 1))
        })
        .with_fn("existsSync", 1, |a| {
            let exists = match args::path(a, 0) {
                Ok(path) => fs::metadata(path).is_ok(),
                Err(_) => false,
            };
            Ok(Value::from(exists))
        })
        .with_fn("copyFileSync", 3, |a| {
            let src = args::path(a, 0)?;
            let dst = args::path(a, 1)?;
            let exclusive = args::nth(a, 2).as_i64().is_some_and(|m| m & 1 != 0);
            if exclusive && fs::metadata(&dst).is_ok() {
                return Err(Fault::with_code(
                    "EEXIST",
                    format!("EEXIST: file already exists, copyfile '{src}' -> '{dst}'"),
                ));
            }
            fs::copy(&src, &dst).map_err(|e| io_fault(&e, "copyfile", Some(&src)))?;
            Ok(Value::Undefined)
        })
        .with_fn("unlinkSync", 1, |a| {
            let path = args::path(a, 0)?;
            fs::remove_file(&path).map_err(|e| io_fault(&e, "unlink", Some(&path)))?;
            Ok(Value::Undefined)
        })
        .with_fn("mkdirSync", 2, |a| {
            let path = args::path(a, 0)?;
            let recursive = args::nth(a, 1)
                .get("recursive")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let result = if recursive {
                fs::create_dir_all(&path)
            } else {
                fs::create_dir(&path)
            };
            result.map_err(|e| io_fault(&e, "mkdir", Some(&path)))?;
            Ok(Value::Undefined)
        })
        .with("constants", constants());

    let el = Arc::clone(event_loop);
    ns.insert(
        "writeFile",
        Function::new("writeFile", 4, move |a| callback_write(&el, a, false)),
    );

    let el = Arc::clone(event_loop);
    ns.insert(
        "appendFile",
        Function::new("appendFile", 4, move |a| callback_write(&el, a, true)),
    );

    let files = Arc::clone(table);
    ns.insert(
        "openSync",
        Function::new("openSync", 3, move |a| {
            let path = args::path(a, 0)?;
            let fd = files.open(&path, args::nth(a, 1), args::nth(a, 2))?;
            Ok(Value::from(fd))
        }),
    );

    let files = Arc::clone(table);
    let el = Arc::clone(event_loop);
    ns.insert(
        "open",
        Function::new("open", 4, move |a| {
            let cb = required_callback(a)?;
            let path = args::path(a, 0)?;
            let rest = args::without_callback(a);
            let flags = args::nth(rest, 1).clone();
            let mode = args::nth(rest, 2).clone();
            let files = Arc::clone(&files);
            complete(&el, cb, move || {
                files.open(&path, &flags, &mode).map(Value::from)
            });
            Ok(Value::Undefined)
        }),
    );

    let files = Arc::clone(table);
    ns.insert(
        "writeSync",
        Function::new("writeSync", 5, move |a| {
            let fd = args::integer(a, 0, "fd")?;
            let written = match args::nth(a, 1) {
                Value::Bytes(buffer) => {
                    let offset = args::nth(a, 2).as_i64().unwrap_or(0).max(0) as usize;
                    let offset = offset.min(buffer.len());
                    let length = args::nth(a, 3)
                        .as_i64()
                        .map(|l| l.max(0) as usize)
                        .unwrap_or(buffer.len() - offset);
                    let end = offset.saturating_add(length).min(buffer.len());
                    let position = args::nth(a, 4).as_i64().map(|p| p.max(0) as u64);
                    files.write(fd, &buffer[offset..end], position)?
                }
                other => {
                    let position = args::nth(a, 2).as_i64().map(|p| p.max(0) as u64);
                    files.write(fd, &other.to_bytes(), position)?
                }
            };
            Ok(Value::from(written))
        }),
    );

    let files = Arc::clone(table);
    ns.insert(
        "closeSync",
        Function::new("closeSync", 1, move |a| {
            let fd = args::integer(a, 0, "fd")?;
            files.close(fd)?;
            Ok(Value::Undefined)
        }),
    );

    let files = Arc::clone(table);
    let el = Arc::clone(event_loop);
    ns.insert(
        "close",
        Function::new("close", 2, move |a| {
            let fd = args::integer(a, 0, "fd")?;
            let files = Arc::clone(&files);
            match args::trailing_callback(a) {
                Some(cb) => complete(&el, cb, move || files.close(fd).map(|_| Value::Undefined)),
                None => el.enqueue_job(move || files.close(fd).map_err(TaskError::Exception)),
            }
            Ok(Value::Undefined)
        }),
    );

    ns.insert("promises", promises(event_loop));
    debug!("fs surface ready with {} members", ns.len());
    ns
}
