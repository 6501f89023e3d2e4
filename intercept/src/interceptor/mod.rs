use crate::error::{Fault, HookError};
use crate::function::Function;
use crate::ignore::IgnoreList;
use crate::interceptor::guard::{is_in_hook, HookSuppressGuard};
use crate::interceptor::invocation::InvocationContext;
use crate::interceptor::listener::CallListener;
use crate::namespace::{Member, Namespace};
use crate::value::Value;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod guard;
pub mod invocation;
pub mod listener;

/// Hook installer.
///
/// Walks namespace graphs and routes every callable through a proxy that
/// reports to the listener. The wrapped set is keyed by identity and holds a
/// strong reference to each entry, so an address is never reused while it
/// is recorded. Originals map to their proxy; proxies map to themselves.
pub struct Interceptor {
    listener: Arc<dyn CallListener>,
    ignore: IgnoreList,
    wrapped: Mutex<HashMap<usize, Member>>,
    excluded: Mutex<Vec<Member>>,
}

impl Interceptor {
    pub fn new(listener: Arc<dyn CallListener>, ignore: IgnoreList) -> Self {
        Self {
            listener,
            ignore,
            wrapped: Mutex::new(HashMap::new()),
            excluded: Mutex::new(Vec::new()),
        }
    }

    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    /// Never hook `member` or anything reached only through it.
    pub fn exclude(&self, member: &Member) {
        self.excluded_set().push(member.clone());
    }

    pub fn is_excluded(&self, member: &Member) -> bool {
        self.excluded_set().iter().any(|m| m.same_as(member))
    }

    pub fn is_wrapped(&self, member: &Member) -> bool {
        member
            .identity()
            .is_some_and(|id| self.wrapped_set().contains_key(&id))
    }

    /// Record a callable installed outside the walker (e.g. an observer
    /// replacing a member) so that later walks leave it alone.
    pub fn mark_wrapped(&self, function: &Function) {
        self.wrapped_set()
            .insert(function.identity(), Member::Function(function.clone()));
    }

    pub fn wrapped_count(&self) -> usize {
        self.wrapped_set().len()
    }

    /// Install proxies over `member`, reached at `surface`.
    ///
    /// A bare callable yields its proxy; a namespace is rewired in place and
    /// returned as is. Members that refuse reassignment stay unhooked and are
    /// reported as [`HookError::Incomplete`] once the walk is done; every
    /// other member is routed through its proxy regardless.
    pub fn install(&self, member: &Member, surface: &str) -> Result<Member, HookError> {
        match member {
            Member::Function(f) => {
                if self.is_excluded(member) {
                    return Ok(member.clone());
                }
                let name = if f.name().is_empty() { "<anon>" } else { f.name() };
                Ok(Member::Function(self.proxy_for(f, surface, name)))
            }
            Member::Namespace(ns) => {
                let mut seen = HashSet::new();
                let mut unhooked = Vec::new();
                self.walk(ns, surface, &mut seen, &mut unhooked);
                if unhooked.is_empty() {
                    Ok(member.clone())
                } else {
                    Err(HookError::Incomplete {
                        surface: surface.to_string(),
                        members: unhooked,
                    })
                }
            }
            Member::Value(_) => Ok(member.clone()),
        }
    }

    fn walk(
        &self,
        ns: &Arc<Namespace>,
        surface: &str,
        seen: &mut HashSet<usize>,
        unhooked: &mut Vec<String>,
    ) {
        let node = Member::Namespace(Arc::clone(ns));
        if self.is_excluded(&node) {
            debug!("Skipping excluded surface {}", surface);
            return;
        }
        if let Some(id) = node.identity() {
            if !seen.insert(id) {
                return;
            }
        }

        for key in ns.keys() {
            let Some(value) = ns.get(&key) else {
                continue;
            };
            let api_path = format!("{}.{}", surface, key);
            match value {
                Member::Function(ref original) => {
                    if self.ignore.matches(&api_path) || self.is_excluded(&value) {
                        continue;
                    }
                    let proxy = self.proxy_for(original, surface, &key);
                    if proxy.ptr_eq(original) {
                        continue;
                    }
                    if let Err(e) = ns.set(&key, proxy) {
                        debug!("Leaving {} unhooked: {}", api_path, e);
                        unhooked.push(api_path);
                    }
                }
                Member::Namespace(ref child) => {
                    self.walk(child, &api_path, seen, unhooked);
                }
                Member::Value(_) => {}
            }
        }
    }

    /// The proxy routing `original`: an existing one when the callable was
    /// seen before, the callable itself when it already is a proxy.
    fn proxy_for(&self, original: &Function, surface: &str, member: &str) -> Function {
        let mut wrapped = self.wrapped_set();
        if let Some(Member::Function(existing)) = wrapped.get(&original.identity()) {
            return existing.clone();
        }
        let proxy = self.attach(original, surface, member);
        wrapped.insert(original.identity(), Member::Function(proxy.clone()));
        wrapped.insert(proxy.identity(), Member::Function(proxy.clone()));
        proxy
    }

    /// Build a proxy carrying the original's name, arity and properties.
    fn attach(&self, original: &Function, surface: &str, member: &str) -> Function {
        let listener = Arc::clone(&self.listener);
        let target = original.clone();
        let surface = surface.to_string();
        let member = member.to_string();
        let proxy = Function::new(original.name(), original.arity(), move |args| {
            dispatch(listener.as_ref(), &surface, &member, &target, args)
        });
        proxy.copy_properties_from(original);
        proxy
    }

    fn wrapped_set(&self) -> MutexGuard<'_, HashMap<usize, Member>> {
        self.wrapped.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn excluded_set(&self) -> MutexGuard<'_, Vec<Member>> {
        self.excluded.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn dispatch(
    listener: &dyn CallListener,
    surface: &str,
    member: &str,
    original: &Function,
    args: &[Value],
) -> Result<Value, Fault> {
    if is_in_hook() {
        return original.call(args);
    }

    let mut ctx = InvocationContext::new(surface, member, original, args);
    {
        let _guard = HookSuppressGuard::new();
        listener.on_enter(&mut ctx);
    }
    if ctx.skips_original() {
        return ctx.into_outcome();
    }

    let outcome = original.call(ctx.arguments());
    ctx.set_return_value(outcome);
    let _guard = HookSuppressGuard::new();
    listener.on_leave(&mut ctx);
    ctx.into_outcome()
}
