//! Call stacks for diagnostic output, with the instrument's own frames removed.

use snare_intercept::stack::{capture_frames, Frame};

/// Frames captured before filtering.
const MAX_FRAMES: usize = 64;

/// Symbol paths belonging to the instrument or to stack capture itself.
const INSTRUMENT_MODULES: &[&str] = &["snare_agent::", "snare_intercept::", "backtrace::"];

fn is_instrument_frame(frame: &Frame) -> bool {
    INSTRUMENT_MODULES.iter().any(|m| frame.in_module(m))
}

/// Drop empty lines and bare `Error` header lines.
pub fn filter_lines<I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    lines
        .into_iter()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("Error")
        })
        .collect()
}

/// The current stack, innermost first, one `    at ...` line per frame.
pub fn filtered_stack() -> Vec<String> {
    let frames = capture_frames(MAX_FRAMES)
        .into_iter()
        .filter(|frame| !is_instrument_frame(frame))
        .map(|frame| frame.to_string());
    filter_lines(frames)
}
