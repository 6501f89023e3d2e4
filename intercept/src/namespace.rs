//! Library surfaces: graphs of nested namespaces terminating in callables.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::HookError;
use crate::function::Function;
use crate::value::Value;

/// One member of a namespace.
#[derive(Debug, Clone)]
pub enum Member {
    Function(Function),
    Namespace(Arc<Namespace>),
    Value(Value),
}

impl Member {
    /// Identity of reference members; plain values have none.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Member::Function(f) => Some(f.identity()),
            Member::Namespace(ns) => Some(Arc::as_ptr(ns) as *const () as usize),
            Member::Value(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Member::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&Arc<Namespace>> {
        match self {
            Member::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn same_as(&self, other: &Member) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Function> for Member {
    fn from(f: Function) -> Self {
        Member::Function(f)
    }
}

impl From<Arc<Namespace>> for Member {
    fn from(ns: Arc<Namespace>) -> Self {
        Member::Namespace(ns)
    }
}

impl From<Namespace> for Member {
    fn from(ns: Namespace) -> Self {
        Member::Namespace(Arc::new(ns))
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Member::Value(value)
    }
}

struct Slot {
    member: Member,
    writable: bool,
}

/// A mutable, shared set of named members.
#[derive(Default)]
pub struct Namespace {
    slots: RwLock<BTreeMap<String, Slot>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a writable member.
    pub fn with(self, name: impl Into<String>, member: impl Into<Member>) -> Self {
        self.insert(name, member);
        self
    }

    /// Builder-style insert of a function member.
    pub fn with_fn<F>(self, name: &str, arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, crate::error::Fault> + Send + Sync + 'static,
    {
        self.with(name, Function::new(name, arity, body))
    }

    pub fn insert(&self, name: impl Into<String>, member: impl Into<Member>) {
        self.put(name.into(), member.into(), true);
    }

    /// Insert a member that later reassignment cannot replace.
    pub fn insert_readonly(&self, name: impl Into<String>, member: impl Into<Member>) {
        self.put(name.into(), member.into(), false);
    }

    fn put(&self, name: String, member: Member, writable: bool) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.insert(name, Slot { member, writable });
    }

    pub fn get(&self, name: &str) -> Option<Member> {
        self.slots
            .read()
            .ok()
            .and_then(|slots| slots.get(name).map(|slot| slot.member.clone()))
    }

    pub fn function(&self, name: &str) -> Option<Function> {
        match self.get(name)? {
            Member::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn namespace(&self, name: &str) -> Option<Arc<Namespace>> {
        match self.get(name)? {
            Member::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    /// Reassign an existing member.
    pub fn set(&self, name: &str, member: impl Into<Member>) -> Result<(), HookError> {
        let mut slots = self.slots.write().map_err(|_| HookError::Poisoned)?;
        let slot = slots
            .get_mut(name)
            .ok_or_else(|| HookError::Missing(name.to_string()))?;
        if !slot.writable {
            return Err(HookError::ReadOnly(name.to_string()));
        }
        slot.member = member.into();
        Ok(())
    }

    pub fn keys(&self) -> Vec<String> {
        self.slots
            .read()
            .map(|slots| slots.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.slots.read().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace").field("members", &self.keys()).finish()
    }
}
