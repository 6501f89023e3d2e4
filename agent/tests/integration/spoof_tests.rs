use std::sync::atomic::Ordering;

use snare_agent::spoof::{SPOOFED_CPU_MODEL, SPOOFED_TOTAL_MEMORY};
use snare_intercept::Value;

use crate::common::*;

// ============================================================================
// Process Execution
// ============================================================================

#[test]
fn test_tasklist_is_empty_and_never_runs() {
    let h = Harness::new();
    let (spy, spawned) = spy_child_process();
    h.runtime.loader().register_builtin("child_process", spy);

    let out = h.call("child_process", "execSync", &[Value::from("tasklist /v")]);

    assert_eq!(out, Ok(Value::from("")));
    assert_eq!(spawned.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.logged("child_process.execSync"),
        vec![r#"[child_process.execSync] args=["tasklist /v"]"#]
    );
}

#[test]
fn test_video_controller_query() {
    let h = Harness::new();
    let (spy, spawned) = spy_child_process();
    h.runtime.loader().register_builtin("child_process", spy);

    let out = h
        .call(
            "child_process",
            "execSync",
            &[Value::from("wmic path win32_VideoController get name /value")],
        )
        .unwrap();

    assert!(out.as_str().unwrap().contains("CurrentRefreshRate=59"));
    assert_eq!(spawned.load(Ordering::SeqCst), 0);
}

#[test]
fn test_powershell_answers_non_zero() {
    let h = Harness::new();
    let (spy, _) = spy_child_process();
    h.runtime.loader().register_builtin("child_process", spy);
    let out = h.call(
        "child_process",
        "execSync",
        &[Value::from("powershell -c (Get-Process).Count")],
    );
    assert_eq!(out, Ok(Value::from("40000")));
}

#[test]
fn test_unmatched_command_reaches_real_member() {
    let h = Harness::new();
    let (spy, spawned) = spy_child_process();
    h.runtime.loader().register_builtin("child_process", spy);

    let out = h.call("child_process", "execSync", &[Value::from("whoami")]);

    assert_eq!(out, Ok(Value::from("ran whoami")));
    assert_eq!(spawned.load(Ordering::SeqCst), 1);
}

#[test]
fn test_exec_callback_receives_spoofed_output() {
    let h = Harness::new();
    let (spy, spawned) = spy_child_process();
    h.runtime.loader().register_builtin("child_process", spy);
    let (cb, calls) = recorder("onDone");

    h.call(
        "child_process",
        "exec",
        &[Value::from("tasklist"), Value::Function(cb)],
    )
    .unwrap();
    h.run().unwrap();

    assert_eq!(spawned.load(Ordering::SeqCst), 0);
    assert_eq!(
        *calls.lock().unwrap(),
        vec![vec![Value::Null, Value::from(""), Value::from("")]]
    );
}

#[cfg(unix)]
#[test]
fn test_real_exec_sync_is_untouched() {
    let h = Harness::new();
    let out = h.call(
        "child_process",
        "execSync",
        &[Value::from("printf hello"), Value::from("utf8")],
    );
    assert_eq!(out, Ok(Value::from("hello")));
}

#[cfg(unix)]
#[test]
fn test_real_failure_propagates_unchanged() {
    let h = Harness::new();
    let fault = h
        .call("child_process", "execSync", &[Value::from("exit 7")])
        .unwrap_err();
    assert!(fault.message.starts_with("Command failed: exit 7"));
    assert_eq!(fault.code.as_deref(), Some("7"));
}

// ============================================================================
// OS Information
// ============================================================================

#[test]
fn test_total_memory_is_sixteen_gib() {
    let h = Harness::new();
    let total = h.call("os", "totalmem", &[]).unwrap();
    assert_eq!(total, Value::from(16u64 * 1024 * 1024 * 1024));
    assert_eq!(total, Value::from(SPOOFED_TOTAL_MEMORY));
}

#[test]
fn test_cpus_are_four_identical_descriptors() {
    let h = Harness::new();
    let cpus = h.call("os", "cpus", &[]).unwrap();
    let cpus = cpus.as_array().unwrap();
    assert_eq!(cpus.len(), 4);
    for cpu in cpus {
        assert_eq!(cpu.get("model"), Some(&Value::from(SPOOFED_CPU_MODEL)));
        assert_eq!(cpu.get("speed"), Some(&Value::from(3600u64)));
        let times = cpu.get("times").unwrap();
        for key in ["user", "nice", "sys", "idle", "irq"] {
            assert_eq!(times.get(key), Some(&Value::from(0i64)));
        }
    }
}

#[test]
fn test_other_os_members_are_real() {
    let h = Harness::new();
    let platform = h.call("os", "platform", &[]).unwrap();
    assert_eq!(platform, Value::from(snare_host::os::platform()));
}

#[test]
fn test_ignored_total_memory_stays_spoofed_but_unlogged() {
    let h = Harness::with_config(|c| c.ignored_apis = vec!["os.totalmem".to_string()]);

    let total = h.call("os", "totalmem", &[]).unwrap();

    assert_eq!(total, Value::from(SPOOFED_TOTAL_MEMORY));
    assert!(h.logged("os.totalmem").is_empty());
    let totalmem = h.surface("os").get("totalmem").unwrap();
    assert!(!h.agent.interceptor().is_wrapped(&totalmem));
}
