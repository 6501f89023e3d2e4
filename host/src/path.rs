//! POSIX path manipulation.
//!
//! The free functions are the uninstrumented primitives; [`namespace`] exposes
//! them as the `path` surface.

use snare_intercept::{Fault, Namespace, Value};

use crate::args;

pub const SEP: &str = "/";

pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Collapse `.`/`..` segments and duplicate separators. A trailing
/// separator is kept.
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let absolute = is_absolute(path);
    let trailing = path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }

    let mut out = segments.join("/");
    if out.is_empty() && !absolute {
        out.push('.');
    }
    if trailing && !out.is_empty() {
        out.push('/');
    }
    if absolute {
        out.insert(0, '/');
    }
    out
}

pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return ".".to_string();
    }
    normalize(&joined)
}

/// Resolve right to left until an absolute path is formed, falling back to
/// `cwd`. The result carries no trailing separator.
pub fn resolve<S: AsRef<str>>(cwd: &str, parts: &[S]) -> String {
    let mut resolved = String::new();
    for part in parts.iter().rev().map(AsRef::as_ref) {
        if part.is_empty() {
            continue;
        }
        resolved = if resolved.is_empty() {
            part.to_string()
        } else {
            format!("{part}/{resolved}")
        };
        if is_absolute(part) {
            break;
        }
    }
    if !is_absolute(&resolved) {
        resolved = if resolved.is_empty() {
            cwd.to_string()
        } else {
            format!("{cwd}/{resolved}")
        };
    }
    let normalized = normalize(&resolved);
    match normalized.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => normalized,
    }
}

pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

pub fn dirname(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].trim_end_matches('/').to_string(),
        None => ".".to_string(),
    }
}

pub fn extname(path: &str) -> &str {
    let base = basename(path);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &base[idx..],
    }
}

fn cwd() -> String {
    std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| SEP.to_string())
}

fn strings(args: &[Value]) -> Result<Vec<String>, Fault> {
    (0..args.len())
        .map(|i| args::string(args, i, "paths").map(str::to_string))
        .collect()
}

pub fn namespace() -> Namespace {
    Namespace::new()
        .with_fn("basename", 2, |a| {
            let path = args::string(a, 0, "path")?;
            let base = basename(path);
            let base = match args::nth(a, 1).as_str() {
                Some(ext) if base != ext => base.strip_suffix(ext).unwrap_or(base),
                _ => base,
            };
            Ok(Value::from(base))
        })
        .with_fn("dirname", 1, |a| Ok(Value::from(dirname(args::string(a, 0, "path")?))))
        .with_fn("extname", 1, |a| Ok(Value::from(extname(args::string(a, 0, "path")?))))
        .with_fn("normalize", 1, |a| Ok(Value::from(normalize(args::string(a, 0, "path")?))))
        .with_fn("isAbsolute", 1, |a| Ok(Value::from(is_absolute(args::string(a, 0, "path")?))))
        .with_fn("join", 0, |a| Ok(Value::from(join(&strings(a)?))))
        .with_fn("resolve", 0, |a| Ok(Value::from(resolve(&cwd(), &strings(a)?))))
        .with("sep", Value::from(SEP))
}
