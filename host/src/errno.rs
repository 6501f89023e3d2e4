//! Mapping of OS errors to coded faults.

use std::io;

use snare_intercept::Fault;

/// Symbolic code and description for an OS error.
pub fn describe(err: &io::Error) -> (&'static str, &'static str) {
    if let Some(known) = err.raw_os_error().and_then(describe_raw) {
        return known;
    }

    match err.kind() {
        io::ErrorKind::NotFound => ("ENOENT", "no such file or directory"),
        io::ErrorKind::PermissionDenied => ("EACCES", "permission denied"),
        io::ErrorKind::AlreadyExists => ("EEXIST", "file already exists"),
        io::ErrorKind::InvalidInput => ("EINVAL", "invalid argument"),
        io::ErrorKind::ConnectionRefused => ("ECONNREFUSED", "connection refused"),
        _ => ("EIO", "i/o error"),
    }
}

#[cfg(unix)]
fn describe_raw(raw: i32) -> Option<(&'static str, &'static str)> {
    let known = match raw {
        libc::ENOENT => ("ENOENT", "no such file or directory"),
        libc::EACCES => ("EACCES", "permission denied"),
        libc::EPERM => ("EPERM", "operation not permitted"),
        libc::EEXIST => ("EEXIST", "file already exists"),
        libc::EISDIR => ("EISDIR", "illegal operation on a directory"),
        libc::ENOTDIR => ("ENOTDIR", "not a directory"),
        libc::ENOTEMPTY => ("ENOTEMPTY", "directory not empty"),
        libc::EBADF => ("EBADF", "bad file descriptor"),
        libc::EMFILE => ("EMFILE", "too many open files"),
        libc::ENOSPC => ("ENOSPC", "no space left on device"),
        libc::EROFS => ("EROFS", "read-only file system"),
        libc::EINVAL => ("EINVAL", "invalid argument"),
        libc::ECONNREFUSED => ("ECONNREFUSED", "connection refused"),
        libc::ENETUNREACH => ("ENETUNREACH", "network is unreachable"),
        _ => return None,
    };
    Some(known)
}

#[cfg(not(unix))]
fn describe_raw(_raw: i32) -> Option<(&'static str, &'static str)> {
    None
}

/// Fault for a failed filesystem call, e.g.
/// `ENOENT: no such file or directory, open 'missing.txt'`.
pub fn io_fault(err: &io::Error, syscall: &str, path: Option<&str>) -> Fault {
    let (code, description) = describe(err);
    let message = match path {
        Some(path) => format!("{code}: {description}, {syscall} '{path}'"),
        None => format!("{code}: {description}, {syscall}"),
    };
    Fault::with_code(code, message)
}

/// Fault for an operation on a descriptor the runtime does not know.
pub fn bad_descriptor(syscall: &str) -> Fault {
    Fault::with_code("EBADF", format!("EBADF: bad file descriptor, {syscall}"))
}
