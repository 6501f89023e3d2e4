//! Call-stack capture for diagnostic output.

use std::fmt;
use std::path::PathBuf;

use ::backtrace::Backtrace;

/// One resolved frame of the current call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub symbol: Option<String>,
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
}

impl Frame {
    /// Whether the frame's symbol names a path rooted at `prefix`
    /// (e.g. `snare_agent::`), including qualified forms such as
    /// `<snare_agent::X as Trait>::f` and generic arguments.
    pub fn in_module(&self, prefix: &str) -> bool {
        let Some(symbol) = self.symbol.as_deref() else {
            return false;
        };
        symbol.match_indices(prefix).any(|(at, _)| {
            symbol[..at]
                .chars()
                .next_back()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == ':'))
        })
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.symbol.as_deref().unwrap_or("<unknown>");
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "    at {} ({}:{})", symbol, file.display(), line),
            (Some(file), None) => write!(f, "    at {} ({})", symbol, file.display()),
            _ => write!(f, "    at {}", symbol),
        }
    }
}

/// Capture and resolve up to `limit` frames of the current thread's stack,
/// innermost first.
pub fn capture_frames(limit: usize) -> Vec<Frame> {
    let bt = Backtrace::new();
    let mut frames = Vec::new();
    for frame in bt.frames() {
        for symbol in frame.symbols() {
            if frames.len() >= limit {
                return frames;
            }
            frames.push(Frame {
                symbol: symbol.name().map(|name| format!("{:#}", name)),
                file: symbol.filename().map(PathBuf::from),
                line: symbol.lineno(),
            });
        }
    }
    frames
}
