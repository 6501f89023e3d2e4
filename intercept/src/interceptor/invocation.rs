use crate::error::Fault;
use crate::function::Function;
use crate::value::Value;

static UNDEFINED: Value = Value::Undefined;

/// One intercepted call, alive for the duration of a single dispatch.
pub struct InvocationContext<'a> {
    surface: &'a str,
    member: &'a str,
    original: &'a Function,
    arguments: &'a [Value],
    forwarded: Option<Vec<Value>>,
    replacement: Option<Result<Value, Fault>>,
    returned: Option<Result<Value, Fault>>,
}

impl<'a> InvocationContext<'a> {
    pub fn new(
        surface: &'a str,
        member: &'a str,
        original: &'a Function,
        arguments: &'a [Value],
    ) -> Self {
        Self {
            surface,
            member,
            original,
            arguments,
            forwarded: None,
            replacement: None,
            returned: None,
        }
    }

    /// Dotted path of the namespace the member was reached through.
    pub fn surface(&self) -> &str {
        self.surface
    }

    pub fn member(&self) -> &str {
        self.member
    }

    /// `<surface>.<member>`, the form ignore-list entries are matched against.
    pub fn api_path(&self) -> String {
        format!("{}.{}", self.surface, self.member)
    }

    /// The arguments the original will receive.
    pub fn arguments(&self) -> &[Value] {
        self.forwarded.as_deref().unwrap_or(self.arguments)
    }

    /// The arguments as the caller passed them.
    pub fn caller_arguments(&self) -> &[Value] {
        self.arguments
    }

    /// Missing arguments read as `undefined`.
    pub fn nth_argument(&self, n: usize) -> &Value {
        self.arguments().get(n).unwrap_or(&UNDEFINED)
    }

    pub fn original(&self) -> &Function {
        self.original
    }

    /// Call the original with `arguments` instead of the caller's.
    pub fn replace_arguments(&mut self, arguments: Vec<Value>) {
        self.forwarded = Some(arguments);
    }

    /// Swap one argument, padding with `undefined` when `n` is past the end.
    pub fn replace_nth_argument(&mut self, n: usize, value: Value) {
        let forwarded = self
            .forwarded
            .get_or_insert_with(|| self.arguments.to_vec());
        if forwarded.len() <= n {
            forwarded.resize(n + 1, Value::Undefined);
        }
        forwarded[n] = value;
    }

    /// Supply a result; the original will not be called by the proxy.
    pub fn replace_return_value(&mut self, value: Value) {
        self.replacement = Some(Ok(value));
    }

    /// Supply a complete outcome, failure included.
    pub fn replace_outcome(&mut self, outcome: Result<Value, Fault>) {
        self.replacement = Some(outcome);
    }

    pub fn skips_original(&self) -> bool {
        self.replacement.is_some()
    }

    /// Record what the original produced. Set by the proxy before `on_leave`.
    pub fn set_return_value(&mut self, outcome: Result<Value, Fault>) {
        self.returned = Some(outcome);
    }

    /// What the original produced, once it has run.
    pub fn return_value(&self) -> Option<&Result<Value, Fault>> {
        self.returned.as_ref()
    }

    pub fn into_replacement(self) -> Option<Result<Value, Fault>> {
        self.replacement
    }

    /// The outcome handed back to the caller: a replacement if one was
    /// supplied, otherwise the original's own.
    pub fn into_outcome(self) -> Result<Value, Fault> {
        self.replacement
            .or(self.returned)
            .unwrap_or(Ok(Value::Undefined))
    }
}
