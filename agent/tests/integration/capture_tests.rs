use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use snare_intercept::{Function, Value};

use crate::common::*;

// ============================================================================
// Path-Based Writes
// ============================================================================

#[test]
fn test_write_file_sync_is_shadowed() {
    let h = Harness::new();
    let target = h.target_path("config.json");

    h.call(
        "fs",
        "writeFileSync",
        &[Value::from(target.as_str()), Value::from("{\"a\":1}")],
    )
    .unwrap();

    assert_eq!(fs::read_to_string(h.work_path("config.json")).unwrap(), "{\"a\":1}");
    assert_eq!(fs::read_to_string(&target).unwrap(), "{\"a\":1}");
}

#[test]
fn test_relative_work_dir_equal_to_target_dir_appends_once() {
    let cwd = std::env::current_dir().unwrap();
    let scratch = tempfile::TempDir::new_in(&cwd).unwrap();
    let relative = PathBuf::from(scratch.path().file_name().unwrap());
    let h = Harness::with_config(|c| c.work_dir = Some(relative.clone()));
    let target = relative.join("log.txt").to_string_lossy().into_owned();

    h.call(
        "fs",
        "appendFileSync",
        &[Value::from(target.as_str()), Value::from("a")],
    )
    .unwrap();

    assert_eq!(fs::read_to_string(scratch.path().join("log.txt")).unwrap(), "a");
    assert_eq!(h.logged("fs.appendFileSync").len(), 1);
}

#[test]
fn test_async_write_file_is_shadowed() {
    let h = Harness::new();
    let target = h.target_path("payload.bin");
    let (cb, calls) = recorder("done");
    let data = Value::bytes(vec![0x4d, 0x5a, 0x00, 0xff]);

    h.call(
        "fs",
        "writeFile",
        &[Value::from(target.as_str()), data, Value::Function(cb)],
    )
    .unwrap();
    assert_eq!(fs::read(h.work_path("payload.bin")).unwrap(), vec![0x4d, 0x5a, 0x00, 0xff]);

    h.run().unwrap();
    assert_eq!(*calls.lock().unwrap(), vec![vec![Value::Null]]);
    assert_eq!(fs::read(&target).unwrap(), vec![0x4d, 0x5a, 0x00, 0xff]);
}

#[test]
fn test_appends_accumulate_in_shadow() {
    let h = Harness::new();
    let target = h.target_path("keys.log");
    for chunk in ["k1\n", "k2\n", "k3\n"] {
        h.call(
            "fs",
            "appendFileSync",
            &[Value::from(target.as_str()), Value::from(chunk)],
        )
        .unwrap();
    }
    assert_eq!(fs::read_to_string(h.work_path("keys.log")).unwrap(), "k1\nk2\nk3\n");
    assert_eq!(fs::read_to_string(&target).unwrap(), "k1\nk2\nk3\n");
}

#[test]
fn test_promises_write_is_shadowed() {
    let h = Harness::new();
    let target = h.target_path("stage2.js");
    h.call(
        "fs/promises",
        "writeFile",
        &[Value::from(target.as_str()), Value::from("eval(atob('...'))")],
    )
    .unwrap();
    h.run().unwrap();
    assert_eq!(
        fs::read_to_string(h.work_path("stage2.js")).unwrap(),
        "eval(atob('...'))"
    );
    assert_eq!(h.logged("fs/promises.writeFile").len(), 1);
}

#[test]
fn test_failed_write_still_fails_for_target() {
    let h = Harness::new();
    let target = h.target_path("missing-dir/out.txt");
    let fault = h
        .call(
            "fs",
            "writeFileSync",
            &[Value::from(target.as_str()), Value::from("x")],
        )
        .unwrap_err();
    assert_eq!(fault.code.as_deref(), Some("ENOENT"));
}

#[test]
fn test_capture_disabled() {
    let h = Harness::with_config(|c| c.save_file_writes = false);
    let target = h.target_path("config.json");
    h.call(
        "fs",
        "writeFileSync",
        &[Value::from(target.as_str()), Value::from("{}")],
    )
    .unwrap();
    assert!(h.work_files().is_empty());
    assert!(fs::metadata(&target).is_ok());
}

// ============================================================================
// Descriptor-Based Writes
// ============================================================================

#[test]
fn test_open_write_close_produces_one_snapshot() {
    let h = Harness::new();
    let target = h.target_path("secret.dat");

    let fd = h
        .call("fs", "openSync", &[Value::from(target.as_str()), Value::from("w")])
        .unwrap();
    let fd_num = fd.as_i64().unwrap();
    assert!(h.descriptors().contains(fd_num));

    h.call("fs", "writeSync", &[fd.clone(), Value::bytes(b"first-".to_vec())])
        .unwrap();
    h.call("fs", "writeSync", &[fd.clone(), Value::from("second")])
        .unwrap();
    h.call("fs", "closeSync", &[fd]).unwrap();

    let files = h.work_files();
    assert_eq!(files.len(), 1, "{files:?}");
    assert!(is_snapshot_of(&files[0], "secret.dat"), "{}", files[0]);
    assert_eq!(
        fs::read_to_string(h.work_path(&files[0])).unwrap(),
        "first-second"
    );
    assert!(!h.descriptors().contains(fd_num));
}

#[test]
fn test_async_open_records_before_caller_callback() {
    let h = Harness::new();
    let target = h.target_path("drop.exe");
    let fs_ns = h.surface("fs");
    let descriptors_seen = Arc::new(Mutex::new(None));

    let seen = Arc::clone(&descriptors_seen);
    let agent_ctx = Arc::clone(h.agent.context());
    let inner = Arc::clone(&fs_ns);
    let on_open = Function::new("onOpen", 2, move |a| {
        let fd = a[1].clone();
        *seen.lock().unwrap() = Some(agent_ctx.descriptors().contains(fd.as_i64().unwrap()));
        inner
            .function("writeSync")
            .unwrap()
            .call(&[fd.clone(), Value::from("MZ")])?;
        inner
            .function("close")
            .unwrap()
            .call(&[fd, Value::Function(Function::new("onClose", 1, |_| Ok(Value::Undefined)))])?;
        Ok(Value::Undefined)
    });

    fs_ns
        .function("open")
        .unwrap()
        .call(&[Value::from(target.as_str()), Value::from("w"), Value::Function(on_open)])
        .unwrap();
    h.run().unwrap();

    assert_eq!(*descriptors_seen.lock().unwrap(), Some(true));
    let files = h.work_files();
    assert_eq!(files.len(), 1, "{files:?}");
    assert!(is_snapshot_of(&files[0], "drop.exe"));
    assert_eq!(fs::read_to_string(h.work_path(&files[0])).unwrap(), "MZ");
    assert!(h.descriptors().is_empty());
}

#[test]
fn test_failed_async_open_records_nothing() {
    let h = Harness::new();
    let target = h.target_path("nope/drop.exe");
    let (cb, calls) = recorder("onOpen");
    h.call(
        "fs",
        "open",
        &[Value::from(target.as_str()), Value::from("r"), Value::Function(cb)],
    )
    .unwrap();
    h.run().unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0].get("code"), Some(&Value::from("ENOENT")));
    assert!(h.descriptors().is_empty());
}

#[test]
fn test_close_of_unknown_descriptor() {
    let h = Harness::new();
    let fault = h.call("fs", "closeSync", &[Value::from(4242i64)]).unwrap_err();
    assert_eq!(fault.code.as_deref(), Some("EBADF"));
    assert!(h.work_files().is_empty());
}

// ============================================================================
// Existence Checks
// ============================================================================

#[test]
fn test_lock_files_visible_by_default() {
    let h = Harness::new();
    let lock = h.target_path("instance.lock");
    fs::write(&lock, "1234").unwrap();
    let exists = h.call("fs", "existsSync", &[Value::from(lock.as_str())]);
    assert_eq!(exists, Ok(Value::from(true)));
}

#[test]
fn test_lock_files_hidden_when_enabled() {
    let h = Harness::with_config(|c| c.hide_lock_files = true);
    let lock = h.target_path("instance.lock");
    fs::write(&lock, "1234").unwrap();
    let exists = h.call("fs", "existsSync", &[Value::from(lock.as_str())]);
    assert_eq!(exists, Ok(Value::from(false)));
}
