//! Argument rendering for diagnostic lines.

use snare_intercept::Value;

/// Longest rendered argument list before it is cut.
pub const MAX_ARGS_CHARS: usize = 1000;

pub const TRUNCATION_MARKER: &str = " (TRUNCATED)";

/// Shown in place of arguments that cannot be serialized.
pub const UNRENDERABLE: &str = "<error displaying args>";

/// Keep the first `max` characters of `s`, appending `suffix` if anything
/// was dropped. Counts characters, not bytes.
pub fn truncate_with_suffix(s: &str, max: usize, suffix: &str) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{}", &s[..cut], suffix),
        None => s.to_string(),
    }
}

/// The argument list as JSON, bounded to [`MAX_ARGS_CHARS`].
pub fn render_args(args: &[Value]) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(args)?;
    Ok(truncate_with_suffix(&json, MAX_ARGS_CHARS, TRUNCATION_MARKER))
}

/// `[surface.member] args=...`, degraded when the arguments do not render.
pub fn call_line(api_path: &str, args: &[Value]) -> String {
    match render_args(args) {
        Ok(rendered) => format!("[{}] args={}", api_path, rendered),
        Err(_) => format!("[{}] args={}", api_path, UNRENDERABLE),
    }
}
