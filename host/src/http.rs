//! The `http` and `https` surfaces, backed by `ureq`.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use snare_intercept::{Fault, Function, Namespace, Value};

use crate::args;
use crate::event_loop::{EventLoop, TaskError};

/// A request assembled from `(url | options[, options])`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestSpec {
    /// Build from call arguments. `scheme` is the surface's default protocol.
    pub fn from_args(scheme: &str, a: &[Value]) -> Result<Self, Fault> {
        let rest = args::without_callback(a);
        let (url, options) = match args::nth(rest, 0) {
            Value::String(url) => (Some(url.clone()), args::nth(rest, 1)),
            options @ Value::Object(_) => (None, options),
            other => return Err(args::invalid_type("options", "string or object", other)),
        };
        let url = match url {
            Some(url) => url,
            None => url_from_options(scheme, options),
        };

        let method = options
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let headers = options
            .get("headers")
            .and_then(Value::as_object)
            .map(|h| {
                h.iter()
                    .map(|(k, v)| (k.clone(), v.to_js_string()))
                    .collect()
            })
            .unwrap_or_default();
        let body = options.get("body").map(Value::to_js_string);

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

fn url_from_options(scheme: &str, options: &Value) -> String {
    let text = |key: &str| options.get(key).map(Value::to_js_string);
    let protocol = text("protocol").unwrap_or_else(|| format!("{scheme}:"));
    let host = text("hostname")
        .or_else(|| text("host"))
        .unwrap_or_else(|| "localhost".to_string());
    let port = text("port").map(|p| format!(":{p}")).unwrap_or_default();
    let path = text("path").unwrap_or_else(|| "/".to_string());
    format!("{protocol}//{host}{port}{path}")
}

fn response_value(response: ureq::Response) -> Value {
    let status = response.status();
    let headers: BTreeMap<String, Value> = response
        .headers_names()
        .into_iter()
        .filter_map(|name| {
            let value = response.header(&name)?.to_string();
            Some((name, Value::from(value)))
        })
        .collect();
    let body = response.into_string().unwrap_or_default();
    Value::object([
        ("statusCode", Value::from(u64::from(status))),
        ("headers", Value::Object(headers)),
        ("body", Value::from(body)),
    ])
}

/// Perform the request. Error statuses are still responses.
pub fn send(spec: &RequestSpec) -> Result<Value, Fault> {
    let mut request = ureq::request(&spec.method, &spec.url);
    for (name, value) in &spec.headers {
        request = request.set(name, value);
    }
    let result = match &spec.body {
        Some(body) => request.send_string(body),
        None => request.call(),
    };
    match result {
        Ok(response) | Err(ureq::Error::Status(_, response)) => Ok(response_value(response)),
        Err(err) => Err(Fault::with_code(
            "ECONNREFUSED",
            format!("request to {} failed: {}", spec.url, err),
        )),
    }
}

fn issue(event_loop: &EventLoop, spec: RequestSpec, callback: Option<Function>) -> Value {
    let summary = Value::object([
        ("method", Value::from(spec.method.as_str())),
        ("url", Value::from(spec.url.as_str())),
    ]);
    event_loop.enqueue_job(move || {
        debug!("{} {}", spec.method, spec.url);
        let response = send(&spec).map_err(TaskError::Exception)?;
        if let Some(cb) = callback {
            cb.call(&[response]).map_err(TaskError::Exception)?;
        }
        Ok(())
    });
    summary
}

/// `http` when `scheme` is `"http"`, `https` when `"https"`.
pub fn namespace(event_loop: &Arc<EventLoop>, scheme: &'static str) -> Namespace {
    let (req_loop, get_loop) = (Arc::clone(event_loop), Arc::clone(event_loop));
    Namespace::new()
        .with_fn("request", 3, move |a| {
            let spec = RequestSpec::from_args(scheme, a)?;
            Ok(issue(&req_loop, spec, args::trailing_callback(a)))
        })
        .with_fn("get", 3, move |a| {
            let mut spec = RequestSpec::from_args(scheme, a)?;
            spec.method = "GET".to_string();
            Ok(issue(&get_loop, spec, args::trailing_callback(a)))
        })
}
