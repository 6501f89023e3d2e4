//! Callable values with introspectable metadata and stable identity.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::Fault;
use crate::value::Value;

/// Signature every callable body implements.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, Fault> + Send + Sync;

struct Inner {
    name: String,
    arity: usize,
    properties: RwLock<BTreeMap<String, Value>>,
    body: Box<NativeFn>,
}

/// A shared callable.
///
/// Clones share the same body and property bag; identity is the address of
/// the shared allocation, so two structurally identical functions built
/// separately are never confused with each other.
#[derive(Clone)]
pub struct Function(Arc<Inner>);

impl Function {
    pub fn new<F>(name: impl Into<String>, arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self(Arc::new(Inner {
            name: name.into(),
            arity,
            properties: RwLock::new(BTreeMap::new()),
            body: Box::new(body),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Number of declared parameters (`fn.length`).
    pub fn arity(&self) -> usize {
        self.0.arity
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, Fault> {
        (self.0.body)(args)
    }

    pub fn property(&self, key: &str) -> Option<Value> {
        self.0
            .properties
            .read()
            .ok()
            .and_then(|props| props.get(key).cloned())
    }

    pub fn set_property(&self, key: impl Into<String>, value: Value) {
        let mut props = self.0.properties.write().unwrap_or_else(|e| e.into_inner());
        props.insert(key.into(), value);
    }

    pub fn properties(&self) -> BTreeMap<String, Value> {
        self.0
            .properties
            .read()
            .map(|props| props.clone())
            .unwrap_or_default()
    }

    /// Copy every custom property of `other` onto this function.
    pub fn copy_properties_from(&self, other: &Function) {
        let source = other.properties();
        if source.is_empty() {
            return;
        }
        let mut props = self.0.properties.write().unwrap_or_else(|e| e.into_inner());
        props.extend(source);
    }

    /// Address-based identity of the shared allocation.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.0.name)
            .field("arity", &self.0.arity)
            .finish()
    }
}
