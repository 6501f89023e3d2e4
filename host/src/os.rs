//! The `os` surface, backed by `sysinfo`.

use std::env;

use snare_intercept::{Namespace, Value};
use sysinfo::System;

/// One `os.cpus()` entry.
pub fn cpu_descriptor(model: &str, speed: u64) -> Value {
    let times = Value::object(
        ["user", "nice", "sys", "idle", "irq"]
            .into_iter()
            .map(|k| (k, Value::from(0i64))),
    );
    Value::object([
        ("model", Value::from(model)),
        ("speed", Value::from(speed)),
        ("times", times),
    ])
}

fn cpus() -> Value {
    let mut sys = System::new();
    sys.refresh_cpu_all();
    Value::Array(
        sys.cpus()
            .iter()
            .map(|cpu| cpu_descriptor(cpu.brand(), cpu.frequency()))
            .collect(),
    )
}

fn memory() -> System {
    let mut sys = System::new();
    sys.refresh_memory();
    sys
}

pub fn platform() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn os_type() -> &'static str {
    match env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows_NT",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

fn arch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    }
}

fn homedir() -> String {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .unwrap_or_default()
}

pub fn namespace() -> Namespace {
    let eol = if cfg!(windows) { "\r\n" } else { "\n" };
    Namespace::new()
        .with_fn("totalmem", 0, |_| Ok(Value::from(memory().total_memory())))
        .with_fn("freemem", 0, |_| Ok(Value::from(memory().available_memory())))
        .with_fn("cpus", 0, |_| Ok(cpus()))
        .with_fn("hostname", 0, |_| Ok(Value::from(System::host_name().unwrap_or_default())))
        .with_fn("platform", 0, |_| Ok(Value::from(platform())))
        .with_fn("arch", 0, |_| Ok(Value::from(arch())))
        .with_fn("type", 0, |_| Ok(Value::from(os_type())))
        .with_fn("release", 0, |_| Ok(Value::from(System::kernel_version().unwrap_or_default())))
        .with_fn("uptime", 0, |_| Ok(Value::from(System::uptime())))
        .with_fn("homedir", 0, |_| Ok(Value::from(homedir())))
        .with_fn("tmpdir", 0, |_| {
            Ok(Value::from(env::temp_dir().to_string_lossy().into_owned()))
        })
        .with("EOL", Value::from(eol))
}
