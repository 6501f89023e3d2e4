//! The `child_process` surface: shell command execution.

use std::process::{Command, Output};
use std::sync::Arc;

use snare_intercept::{Fault, Namespace, Value};

use crate::args;
use crate::event_loop::{EventLoop, TaskError};

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd.exe");
    cmd.arg("/d").arg("/s").arg("/c").arg(command);
    cmd
}

/// Run `command` through the platform shell, honouring `{ cwd }`.
pub fn run(command: &str, options: &Value) -> Result<Output, Fault> {
    let mut cmd = shell(command);
    if let Some(cwd) = options.get("cwd").and_then(Value::as_str) {
        cmd.current_dir(cwd);
    }
    cmd.output()
        .map_err(|e| Fault::with_code("ENOENT", format!("spawn failed: {e}")))
}

fn command_failed(command: &str, output: &Output) -> Fault {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut fault = Fault::new(format!("Command failed: {command}\n{stderr}"));
    fault.code = output.status.code().map(|c| c.to_string());
    fault
}

fn encode(bytes: Vec<u8>, options: &Value) -> Value {
    match args::encoding(options) {
        Some("buffer") | None => Value::Bytes(bytes),
        Some(_) => Value::from(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn exec_sync(a: &[Value]) -> Result<Value, Fault> {
    let command = args::string(a, 0, "command")?;
    let options = args::nth(a, 1);
    let output = run(command, options)?;
    if !output.status.success() {
        return Err(command_failed(command, &output));
    }
    Ok(encode(output.stdout, options))
}

fn exec(event_loop: &EventLoop, a: &[Value]) -> Result<Value, Fault> {
    let command = args::string(a, 0, "command")?.to_string();
    let rest = args::without_callback(a);
    let options = args::nth(rest, 1).clone();
    let callback = args::trailing_callback(a);
    let shown = command.clone();

    event_loop.enqueue_job(move || {
        let outcome = run(&command, &options).and_then(|output| {
            if output.status.success() {
                Ok(output)
            } else {
                Err(command_failed(&command, &output))
            }
        });
        let Some(callback) = callback else {
            return outcome.map(|_| ()).map_err(TaskError::Exception);
        };
        let args = match outcome {
            Ok(output) => vec![
                Value::Null,
                Value::from(String::from_utf8_lossy(&output.stdout).into_owned()),
                Value::from(String::from_utf8_lossy(&output.stderr).into_owned()),
            ],
            Err(fault) => vec![fault.to_value(), Value::from(""), Value::from("")],
        };
        callback.call(&args).map(|_| ()).map_err(TaskError::Exception)
    });

    Ok(Value::object([("command", Value::from(shown))]))
}

pub fn namespace(event_loop: &Arc<EventLoop>) -> Namespace {
    let el = Arc::clone(event_loop);
    Namespace::new()
        .with_fn("execSync", 2, exec_sync)
        .with_fn("exec", 3, move |a| exec(&el, a))
}
