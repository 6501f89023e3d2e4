//! Cooperative single-threaded task queue with timers.
//!
//! Immediate tasks run first, in FIFO order; timers fire in deadline order,
//! ties broken by scheduling order. Only one task runs at a time.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use snare_intercept::{Fault, Function, TimerHandle, TimerKind, Value};
use thiserror::Error;

/// Largest delay a timer accepts, in milliseconds (2^31 - 1).
pub const TIMEOUT_MAX: f64 = 2_147_483_647.0;

/// How a failed task surfaces to the runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    /// A callback failed.
    #[error("uncaught exception: {0}")]
    Exception(Fault),
    /// An operation with nobody waiting on its outcome failed.
    #[error("unhandled rejection: {0}")]
    Rejection(Fault),
}

pub type Job = Box<dyn FnOnce() -> Result<(), TaskError> + Send>;

pub enum Task {
    Call { callback: Function, args: Vec<Value> },
    Job(Job),
}

impl Task {
    pub fn run(self) -> Result<(), TaskError> {
        match self {
            Task::Call { callback, args } => callback
                .call(&args)
                .map(|_| ())
                .map_err(TaskError::Exception),
            Task::Job(job) => job(),
        }
    }
}

struct Timer {
    id: u64,
    callback: Function,
    args: Vec<Value>,
    period: Option<Duration>,
}

#[derive(Default)]
struct State {
    queue: VecDeque<Task>,
    timers: BTreeMap<(Instant, u64), Timer>,
    armed: HashMap<u64, (Instant, u64)>,
    next_id: u64,
    next_seq: u64,
}

impl State {
    fn arm(&mut self, due: Instant, timer: Timer) {
        self.next_seq += 1;
        let key = (due, self.next_seq);
        self.armed.insert(timer.id, key);
        self.timers.insert(key, timer);
    }
}

#[derive(Default)]
pub struct EventLoop {
    state: Mutex<State>,
}

/// Clamp a requested delay the way timers do: non-numeric, non-finite,
/// below one or above [`TIMEOUT_MAX`] becomes one millisecond.
pub fn clamp_delay(ms: &Value) -> Duration {
    let ms = match ms {
        Value::Number(n) if n.is_finite() && *n >= 1.0 && *n <= TIMEOUT_MAX => *n,
        _ => 1.0,
    };
    Duration::from_micros((ms * 1000.0) as u64)
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue `callback(args)` to run on the next turn.
    pub fn enqueue(&self, callback: Function, args: Vec<Value>) {
        self.lock().queue.push_back(Task::Call { callback, args });
    }

    pub fn enqueue_job<F>(&self, job: F)
    where
        F: FnOnce() -> Result<(), TaskError> + Send + 'static,
    {
        self.lock().queue.push_back(Task::Job(Box::new(job)));
    }

    pub fn set_timeout(&self, callback: Function, delay: &Value, args: Vec<Value>) -> TimerHandle {
        self.schedule(callback, delay, args, TimerKind::Timeout)
    }

    pub fn set_interval(&self, callback: Function, delay: &Value, args: Vec<Value>) -> TimerHandle {
        self.schedule(callback, delay, args, TimerKind::Interval)
    }

    fn schedule(&self, callback: Function, delay: &Value, args: Vec<Value>, kind: TimerKind) -> TimerHandle {
        let delay = clamp_delay(delay);
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        let period = (kind == TimerKind::Interval).then_some(delay);
        state.arm(
            Instant::now() + delay,
            Timer {
                id,
                callback,
                args,
                period,
            },
        );
        TimerHandle::new(id, kind)
    }

    /// Cancel a timer. Unknown and placeholder handles are ignored.
    pub fn clear(&self, handle: TimerHandle) {
        if handle.is_placeholder() {
            return;
        }
        let mut state = self.lock();
        if let Some(key) = state.armed.remove(&handle.id) {
            state.timers.remove(&key);
        }
    }

    /// Whether any task or timer is outstanding.
    pub fn pending(&self) -> bool {
        let state = self.lock();
        !state.queue.is_empty() || !state.timers.is_empty()
    }

    pub fn armed_timers(&self) -> usize {
        self.lock().timers.len()
    }

    /// Next runnable task, blocking until a timer falls due. `None` once the
    /// loop is idle.
    pub fn next_task(&self) -> Option<Task> {
        loop {
            let wait = {
                let mut state = self.lock();
                if let Some(task) = state.queue.pop_front() {
                    return Some(task);
                }
                let (&key, _) = state.timers.iter().next()?;
                let now = Instant::now();
                if key.0 <= now {
                    let timer = state.timers.remove(&key)?;
                    state.armed.remove(&timer.id);
                    let task = Task::Call {
                        callback: timer.callback.clone(),
                        args: timer.args.clone(),
                    };
                    if let Some(period) = timer.period {
                        state.arm(now + period, timer);
                    }
                    return Some(task);
                }
                key.0 - now
            };
            thread::sleep(wait);
        }
    }
}
