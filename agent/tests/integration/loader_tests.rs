use std::sync::Arc;

use snare_agent::loader_hook::SELF_MODULE;
use snare_intercept::{Member, Namespace, Value};

use crate::common::*;

// ============================================================================
// Hook Installation
// ============================================================================

#[test]
fn test_every_builtin_member_is_proxied() {
    let h = Harness::new();
    let fs = h.runtime.require("fs").unwrap();
    let ns = fs.as_namespace().unwrap();
    for key in ["writeFileSync", "openSync", "closeSync", "existsSync"] {
        let member = ns.get(key).unwrap();
        assert!(h.agent.interceptor().is_wrapped(&member), "fs.{key}");
    }
    let nested = ns.namespace("promises").unwrap();
    assert!(h
        .agent
        .interceptor()
        .is_wrapped(&nested.get("readFile").unwrap()));
}

#[test]
fn test_installing_twice_is_idempotent() {
    let h = Harness::new();
    let fs = h.runtime.require("fs").unwrap();
    let before: Vec<Member> = snapshot(fs.as_namespace().unwrap());
    let wrapped = h.agent.interceptor().wrapped_count();

    h.runtime.require("fs").unwrap();
    h.runtime.require("node:fs").unwrap();
    h.agent.interceptor().install(&fs, "fs").unwrap();

    let after = snapshot(fs.as_namespace().unwrap());
    assert_eq!(h.agent.interceptor().wrapped_count(), wrapped);
    assert!(before.iter().zip(&after).all(|(a, b)| a.same_as(b)));
}

fn snapshot(ns: &Arc<Namespace>) -> Vec<Member> {
    ns.keys().iter().filter_map(|k| ns.get(k)).collect()
}

#[test]
fn test_shared_namespace_keeps_one_proxy() {
    let h = Harness::new();
    let fs = h.surface("fs");
    let promises = h.surface("fs/promises");
    let via_fs = fs.namespace("promises").unwrap().get("writeFile").unwrap();
    let direct = promises.get("writeFile").unwrap();
    assert!(via_fs.same_as(&direct));
}

#[test]
fn test_own_surface_is_never_hooked() {
    let h = Harness::new();
    let own = h.surface(SELF_MODULE);
    let version = own.get("version").unwrap();
    assert!(!h.agent.interceptor().is_wrapped(&version));
    own.function("version").unwrap().call(&[]).unwrap();
    assert!(h.logged("snare.").is_empty());
}

#[test]
fn test_ignored_api_is_left_bound_to_original() {
    let h = Harness::with_config(|c| c.ignored_apis = vec!["path.normalize".to_string()]);
    let path = h.surface("path");
    assert!(!h
        .agent
        .interceptor()
        .is_wrapped(&path.get("normalize").unwrap()));

    path.function("normalize")
        .unwrap()
        .call(&[Value::from("/a/./b")])
        .unwrap();
    path.function("join")
        .unwrap()
        .call(&[Value::from("/a"), Value::from("b")])
        .unwrap();

    assert!(h.logged("path.normalize").is_empty());
    assert_eq!(h.logged("path.join"), vec![r#"[path.join] args=["/a","b"]"#]);
}

#[test]
fn test_results_pass_through_unchanged() {
    let h = Harness::new();
    let out = h.call("path", "basename", &[Value::from("/tmp/x/secret.dat"), Value::from(".dat")]);
    assert_eq!(out, Ok(Value::from("secret")));
}

// ============================================================================
// Module Acquisition
// ============================================================================

#[test]
fn test_transitive_requires_are_logged_with_caller() {
    let h = Harness::new();
    h.runtime
        .loader()
        .register_module("/app/lib/dropper.js", |loader, id| loader.load("fs", Some(id)));
    h.runtime
        .loader()
        .register_module("/app/index.js", |loader, id| loader.load("./lib/dropper", Some(id)));

    let exported = h.runtime.require("/app/index.js").unwrap();

    assert!(exported.as_namespace().is_some());
    assert_eq!(
        h.logged("require"),
        vec![
            "[require] caller=/app/lib/dropper.js request=fs resolved=fs",
            "[require] caller=/app/index.js request=./lib/dropper resolved=/app/lib/dropper.js",
            "[require] caller=<anonymous> request=/app/index.js resolved=/app/index.js",
        ]
    );
}

#[test]
fn test_missing_module_fails_unchanged() {
    let h = Harness::new();
    let fault = h.runtime.require("left-pad").unwrap_err();
    assert_eq!(fault.code.as_deref(), Some("MODULE_NOT_FOUND"));
    assert_eq!(fault.message, "Cannot find module 'left-pad'");
}

#[test]
fn test_detach_stops_hooking_new_surfaces() {
    let h = Harness::new();
    h.agent.detach();
    let os = h.surface("os");
    assert!(!h
        .agent
        .interceptor()
        .is_wrapped(&os.get("hostname").unwrap()));
    assert!(h.log.lines().is_empty());
}

#[test]
fn test_stack_lines_follow_call_when_enabled() {
    let h = Harness::with_config(|c| c.show_stack = true);
    h.call("path", "extname", &[Value::from("a.txt")]).unwrap();
    let lines = h.log.lines();
    let call = lines
        .iter()
        .position(|l| l == r#"[path.extname] args=["a.txt"]"#)
        .unwrap();
    assert!(lines[call + 1..]
        .iter()
        .take_while(|l| !l.starts_with('['))
        .all(|l| l.starts_with("    at ") && !l.contains("snare_agent::")));
}
