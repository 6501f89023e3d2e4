//! Fabricated results for environment-fingerprinting calls.

use std::sync::Arc;

use snare_host::args;
use snare_host::os::cpu_descriptor;
use snare_intercept::{Function, InvocationContext, Value};

use crate::context::InterceptionContext;
use crate::dispatch::Policy;

/// Total memory reported by `os.totalmem`: 16 GiB.
pub const SPOOFED_TOTAL_MEMORY: u64 = 16 * 1024 * 1024 * 1024;

pub const SPOOFED_CPU_MODEL: &str = "Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz";
pub const SPOOFED_CPU_SPEED: u64 = 3600;
pub const SPOOFED_CPU_COUNT: usize = 4;

/// One spoofing rule: commands starting with `prefix` yield `result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoofRule {
    pub prefix: &'static str,
    pub result: &'static str,
}

/// Ordered rules; the first matching prefix wins.
#[derive(Debug, Clone)]
pub struct SpoofTable {
    rules: Vec<SpoofRule>,
}

impl Default for SpoofTable {
    fn default() -> Self {
        Self::new(vec![
            // Hide the process list.
            SpoofRule {
                prefix: "tasklist",
                result: "",
            },
            // Any non-zero answer defeats checks for "0" or blacklisted output.
            SpoofRule {
                prefix: "powershell",
                result: "40000",
            },
            // wmic path win32_VideoController get name /value
            SpoofRule {
                prefix: "wmic",
                result: "CurrentRefreshRate=59",
            },
        ])
    }
}

impl SpoofTable {
    pub fn new(rules: Vec<SpoofRule>) -> Self {
        Self { rules }
    }

    /// The fabricated output for `command`, if a rule matches.
    pub fn lookup(&self, command: &Value) -> Option<&'static str> {
        let command = command.as_str()?;
        self.rules
            .iter()
            .find(|rule| command.starts_with(rule.prefix))
            .map(|rule| rule.result)
    }

    pub fn rules(&self) -> &[SpoofRule] {
        &self.rules
    }
}

/// Short-circuits `execSync`/`exec` for commands in the spoof table.
pub struct ExecSpoof {
    context: Arc<InterceptionContext>,
}

impl ExecSpoof {
    pub fn new(context: Arc<InterceptionContext>) -> Self {
        Self { context }
    }
}

impl Policy for ExecSpoof {
    fn name(&self) -> &'static str {
        "exec-spoof"
    }

    fn applies_to(&self, ctx: &InvocationContext<'_>) -> bool {
        matches!(ctx.member(), "execSync" | "exec")
    }

    fn on_call(&self, ctx: &mut InvocationContext<'_>) {
        let Some(result) = self.context.spoof_table().lookup(ctx.nth_argument(0)) else {
            return;
        };
        if ctx.member() == "exec" {
            if let Some(callback) = args::trailing_callback(ctx.arguments()) {
                self.context.event_loop().enqueue(
                    callback,
                    vec![Value::Null, Value::from(result), Value::from("")],
                );
            }
        }
        ctx.replace_return_value(Value::from(result));
    }
}

/// Fixed memory size and CPU list for the `os` surface. Installed as
/// stand-ins when the agent attaches, independent of hooking.
pub struct OsSpoof;

impl OsSpoof {
    /// Members of the `os` surface that get a stand-in.
    pub const MEMBERS: &'static [&'static str] = &["totalmem", "cpus"];

    pub fn cpus() -> Value {
        Value::Array(
            (0..SPOOFED_CPU_COUNT)
                .map(|_| cpu_descriptor(SPOOFED_CPU_MODEL, SPOOFED_CPU_SPEED))
                .collect(),
        )
    }

    /// The stand-in for `member`, carrying the original's metadata.
    pub fn spoof(member: &str, original: &Function) -> Option<Function> {
        let stand_in = match member {
            "totalmem" => Function::new(original.name(), original.arity(), |_| {
                Ok(Value::from(SPOOFED_TOTAL_MEMORY))
            }),
            "cpus" => Function::new(original.name(), original.arity(), |_| Ok(Self::cpus())),
            _ => return None,
        };
        stand_in.copy_properties_from(original);
        Some(stand_in)
    }
}
