use std::fs;

use snare_agent::network::REQUEST_LOG;
use snare_intercept::Value;

use crate::common::*;

// ============================================================================
// Request Log
// ============================================================================

#[test]
fn test_requests_are_logged_before_issue() {
    let h = Harness::new();
    let summary = h
        .call("http", "get", &[Value::from("http://127.0.0.1:9/gate.php?id=1")])
        .unwrap();
    let options = Value::object([
        ("hostname", Value::from("127.0.0.1")),
        ("port", Value::from(9i64)),
        ("path", Value::from("/upload")),
        ("method", Value::from("POST")),
    ]);
    h.call("https", "request", &[options]).unwrap();

    assert_eq!(summary.get("method"), Some(&Value::from("GET")));
    let log = fs::read_to_string(h.work_path(REQUEST_LOG)).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(
        lines,
        vec![
            "\"http://127.0.0.1:9/gate.php?id=1\"",
            r#"{"hostname":"127.0.0.1","method":"POST","path":"/upload","port":9}"#,
        ]
    );
}

#[test]
fn test_request_log_disabled() {
    let h = Harness::with_config(|c| c.log_http_requests = false);
    h.call("http", "get", &[Value::from("http://127.0.0.1:9/")])
        .unwrap();
    assert!(h.work_files().is_empty());
    assert_eq!(h.logged("http.get").len(), 1);
}

#[test]
fn test_transport_failure_still_reaches_target() {
    let h = Harness::new();
    h.call("http", "get", &[Value::from("http://127.0.0.1:9/")])
        .unwrap();
    let fault = h.run().unwrap_err();
    assert_eq!(fault.code.as_deref(), Some("ECONNREFUSED"));
}
