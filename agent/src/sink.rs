//! The diagnostic stream: one line per observed event, flushed as written.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

type Writer = Box<dyn Write + Send>;

#[derive(Clone)]
pub struct DiagnosticSink {
    out: Arc<Mutex<Writer>>,
}

impl DiagnosticSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// A sink writing to memory, and a handle for reading it back.
    pub fn memory() -> (Self, MemoryLog) {
        let log = MemoryLog::default();
        (Self::new(log.clone()), log)
    }

    /// Write and flush one line. Failures are dropped.
    pub fn write_line(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

#[derive(Clone, Default)]
pub struct MemoryLog {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemoryLog {
    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Write for MemoryLog {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
