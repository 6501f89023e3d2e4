//! Module acquisition: the one path by which surfaces reach a target.
//!
//! Every `load` resolves the request, performs the real acquisition (cache,
//! builtin table or module factory), passes the result through the installed
//! load hook and caches what the hook returned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::debug;
use snare_intercept::{Fault, Member};

use crate::path;

/// One acquisition as seen by a load hook.
pub struct LoadRequest<'a> {
    pub request: &'a str,
    /// Canonical id of the requiring module, if any.
    pub parent: Option<&'a str>,
    pub loader: &'a ModuleLoader,
}

pub type LoadHook = Arc<dyn Fn(&LoadRequest<'_>, Member) -> Member + Send + Sync>;

/// Produces a module's exports. Receives the loader and the module's own
/// canonical id, to be passed as parent on nested requires.
pub type ModuleFactory = Arc<dyn Fn(&ModuleLoader, &str) -> Result<Member, Fault> + Send + Sync>;

/// Extensions tried after the bare path, in order.
const EXTENSIONS: &[&str] = &[".js", ".json", "/index.js"];

#[derive(Default)]
pub struct ModuleLoader {
    builtins: RwLock<HashMap<String, Member>>,
    modules: RwLock<HashMap<String, ModuleFactory>>,
    cache: Mutex<HashMap<String, Member>>,
    hook: RwLock<Option<LoadHook>>,
}

fn not_found(request: &str) -> Fault {
    Fault::with_code("MODULE_NOT_FOUND", format!("Cannot find module '{request}'"))
}

fn is_relative(request: &str) -> bool {
    request == "."
        || request == ".."
        || request.starts_with("./")
        || request.starts_with("../")
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_builtin(&self, name: &str, member: impl Into<Member>) {
        let mut builtins = self.builtins.write().unwrap_or_else(|e| e.into_inner());
        builtins.insert(name.to_string(), member.into());
    }

    /// Register a module by absolute path (normalized) or package name.
    pub fn register_module<F>(&self, id: &str, factory: F)
    where
        F: Fn(&ModuleLoader, &str) -> Result<Member, Fault> + Send + Sync + 'static,
    {
        let id = if path::is_absolute(id) {
            path::normalize(id)
        } else {
            id.to_string()
        };
        let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
        modules.insert(id, Arc::new(factory));
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins
            .read()
            .map(|b| b.contains_key(name))
            .unwrap_or(false)
    }

    /// A builtin as registered, bypassing the cache and the load hook.
    pub fn builtin(&self, name: &str) -> Option<Member> {
        self.builtins.read().ok().and_then(|b| b.get(name).cloned())
    }

    fn has_module(&self, id: &str) -> bool {
        self.modules
            .read()
            .map(|m| m.contains_key(id))
            .unwrap_or(false)
    }

    /// Canonical id for `request` made from `parent`.
    pub fn resolve_filename(&self, request: &str, parent: Option<&str>) -> Result<String, Fault> {
        if let Some(name) = request.strip_prefix("node:") {
            return if self.is_builtin(name) {
                Ok(name.to_string())
            } else {
                Err(Fault::with_code(
                    "ERR_UNKNOWN_BUILTIN_MODULE",
                    format!("No such built-in module: {request}"),
                ))
            };
        }
        if self.is_builtin(request) {
            return Ok(request.to_string());
        }

        if path::is_absolute(request) || is_relative(request) {
            let base = match parent {
                Some(parent) if path::is_absolute(parent) => path::dirname(parent),
                _ => crate::process::cwd(),
            };
            let candidate = path::resolve(&base, &[request]);
            if self.has_module(&candidate) {
                return Ok(candidate);
            }
            return EXTENSIONS
                .iter()
                .map(|ext| format!("{candidate}{ext}"))
                .find(|id| self.has_module(id))
                .ok_or_else(|| not_found(request));
        }

        if self.has_module(request) {
            return Ok(request.to_string());
        }
        Err(not_found(request))
    }

    /// Acquire `request` on behalf of `parent`.
    pub fn load(&self, request: &str, parent: Option<&str>) -> Result<Member, Fault> {
        let id = self.resolve_filename(request, parent)?;

        let cached = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned();
        let real = match cached {
            Some(member) => member,
            None => self.instantiate(&id)?,
        };

        let hook = self.hook.read().ok().and_then(|h| h.clone());
        let loaded = match hook {
            Some(hook) => hook(
                &LoadRequest {
                    request,
                    parent,
                    loader: self,
                },
                real,
            ),
            None => real,
        };

        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, loaded.clone());
        Ok(loaded)
    }

    fn instantiate(&self, id: &str) -> Result<Member, Fault> {
        if let Some(member) = self.builtin(id) {
            return Ok(member);
        }
        let factory = self
            .modules
            .read()
            .ok()
            .and_then(|m| m.get(id).cloned())
            .ok_or_else(|| not_found(id))?;
        debug!("Instantiating module {}", id);
        factory(self, id)
    }

    /// Top-level acquisition, as from the entry script.
    pub fn require(&self, request: &str) -> Result<Member, Fault> {
        self.load(request, None)
    }

    /// Install `hook`, returning the one it replaces.
    pub fn set_load_hook(&self, hook: LoadHook) -> Option<LoadHook> {
        let mut slot = self.hook.write().unwrap_or_else(|e| e.into_inner());
        slot.replace(hook)
    }

    /// Put back a hook returned by [`set_load_hook`](Self::set_load_hook).
    pub fn restore_load_hook(&self, previous: Option<LoadHook>) {
        let mut slot = self.hook.write().unwrap_or_else(|e| e.into_inner());
        *slot = previous;
    }

    pub fn has_load_hook(&self) -> bool {
        self.hook.read().map(|h| h.is_some()).unwrap_or(false)
    }
}
