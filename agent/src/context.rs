//! State shared by the logger and every policy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use snare_host::EventLoop;
use snare_intercept::IgnoreList;

use crate::capture::DescriptorTable;
use crate::config::Config;
use crate::sink::DiagnosticSink;
use crate::spoof::SpoofTable;

/// Built once at activation and passed by reference to each component.
pub struct InterceptionContext {
    config: Config,
    work_dir: PathBuf,
    ignore: IgnoreList,
    spoof: SpoofTable,
    descriptors: DescriptorTable,
    sink: DiagnosticSink,
    event_loop: Arc<EventLoop>,
}

impl InterceptionContext {
    pub fn new(config: Config, sink: DiagnosticSink, event_loop: Arc<EventLoop>) -> Self {
        let work_dir = config.resolve_work_dir();
        let ignore = IgnoreList::new(config.ignored_apis.iter().cloned());
        Self {
            config,
            work_dir,
            ignore,
            spoof: SpoofTable::default(),
            descriptors: DescriptorTable::default(),
            sink,
            event_loop,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory receiving shadow copies and `requests.txt`.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    pub fn spoof_table(&self) -> &SpoofTable {
        &self.spoof
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        &self.descriptors
    }

    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    /// Write one diagnostic line, followed by the filtered stack when
    /// `showStack` is on.
    pub fn report(&self, line: &str) {
        if !self.config.show_stack {
            self.sink.write_line(line);
            return;
        }
        let mut out = line.to_string();
        for frame in crate::stack::filtered_stack() {
            out.push('\n');
            out.push_str(&frame);
        }
        self.sink.write_line(&out);
    }
}
