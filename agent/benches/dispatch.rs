use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use snare_agent::format::call_line;
use snare_agent::{Agent, Config, DiagnosticSink};
use snare_host::Runtime;
use snare_intercept::{Function, IgnoreList, Value};

fn make_ignore_list(count: usize) -> IgnoreList {
    let patterns = [
        "fs.readFileSync", "http.get", "net.connect", "crypto.randomBytes", "os.hostname",
        "path.join", "url.parse", "dns.lookup", "tls.connect", "zlib.gzip",
    ];
    IgnoreList::new((0..count).map(|i| patterns[i % patterns.len()]))
}

fn bench_ignore_list(c: &mut Criterion) {
    // 1 pattern, matching
    {
        let ignore = make_ignore_list(1);
        c.bench_function("ignore_match_1", |b| {
            b.iter(|| ignore.matches(black_box("fs.readFileSync")))
        });
    }

    // 10 patterns, no match
    {
        let ignore = make_ignore_list(10);
        c.bench_function("ignore_miss_10", |b| {
            b.iter(|| ignore.matches(black_box("child_process.execSync")))
        });
    }
}

fn bench_call_line(c: &mut Criterion) {
    let args = [
        Value::from("/tmp/stage/config.json"),
        Value::from("x".repeat(4096)),
        Value::object([("encoding", Value::from("utf8"))]),
    ];
    c.bench_function("call_line_truncated", |b| {
        b.iter(|| call_line(black_box("fs.writeFileSync"), black_box(&args)))
    });
}

fn bench_proxy_dispatch(c: &mut Criterion) {
    let runtime = Runtime::new();
    let config = Config {
        show_stack: false,
        ..Config::default()
    };
    let (sink, log) = DiagnosticSink::memory();
    let _agent = Agent::attach(Arc::clone(&runtime), config, sink).unwrap();

    let module = runtime.require("path").unwrap();
    let join: Function = module.as_namespace().unwrap().function("join").unwrap();
    let args = [Value::from("/usr"), Value::from("lib")];

    // Logger plus a policy chain that declines
    c.bench_function("proxy_path_join", |b| {
        b.iter(|| {
            black_box(join.call(black_box(&args)).unwrap());
            log.clear();
        })
    });

    // Spoofed result, real member never runs
    let os = runtime.require("os").unwrap();
    let totalmem = os.as_namespace().unwrap().function("totalmem").unwrap();
    c.bench_function("proxy_os_totalmem_spoofed", |b| {
        b.iter(|| {
            black_box(totalmem.call(&[]).unwrap());
            log.clear();
        })
    });
}

criterion_group!(benches, bench_ignore_list, bench_call_line, bench_proxy_dispatch);
criterion_main!(benches);
