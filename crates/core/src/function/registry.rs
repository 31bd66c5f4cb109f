use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::debug;

use super::call::Callee;
use super::descriptor::SerializedFunctionCall;
use super::id::FunctionId;
use crate::error::FunctionError;

/// Uniform signature of every registered function. Plain user functions
/// ignore the [`Invocation`]; combinators use it to call the descriptors
/// they were handed.
pub type FunctionBody =
    dyn Fn(&Invocation<'_>, &[Value]) -> Result<Value, FunctionError> + Send + Sync;

/// Handle to a registered function. Identity is the identity of the shared
/// body: clones of a handle identify as the same function.
#[derive(Clone)]
pub struct FunctionRef {
    body: Arc<FunctionBody>,
}

impl FunctionRef {
    fn address(&self) -> usize {
        Arc::as_ptr(&self.body) as *const () as usize
    }

    /// Whether both handles point at the same registered body.
    pub fn same_as(&self, other: &FunctionRef) -> bool {
        self.address() == other.address()
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({:#x})", self.address())
    }
}

#[derive(Default)]
struct RegistryInner {
    bodies: HashMap<FunctionId, Arc<FunctionBody>>,
    /// Body address -> id. Every address stays valid for the registry's
    /// lifetime because `bodies` keeps the Arc alive.
    ids: HashMap<usize, FunctionId>,
}

/// Process-wide table of functions that may cross the isolation boundary.
///
/// Populate it once at startup, before the first scheduling pass. After that
/// scheduling only reads; late registration is still safe behind the lock.
#[derive(Default)]
pub struct FunctionRegistry {
    inner: RwLock<RegistryInner>,
}

impl FunctionRegistry {
    /// An empty registry. Most callers want [`FunctionRegistry::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the worker functions every task relies on.
    pub fn with_builtins() -> Self {
        let mut inner = RegistryInner::default();
        for (id, body) in crate::builtins::builtin_bodies() {
            inner.ids.insert(Arc::as_ptr(&body) as *const () as usize, id.clone());
            inner.bodies.insert(id, body);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Register a plain function: it receives its bound parameters followed
    /// by whatever the invoker appends.
    pub fn register<F>(&self, id: FunctionId, func: F) -> Result<FunctionRef, FunctionError>
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        self.register_with_context(id, move |_, args| func(args))
    }

    /// Register a function that needs to invoke other descriptors.
    pub fn register_with_context<F>(
        &self,
        id: FunctionId,
        func: F,
    ) -> Result<FunctionRef, FunctionError>
    where
        F: Fn(&Invocation<'_>, &[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        let body: Arc<FunctionBody> = Arc::new(func);
        let handle = FunctionRef { body };

        let mut inner = self.write()?;
        if inner.bodies.contains_key(&id) {
            return Err(FunctionError::DuplicateFunction(id));
        }
        inner.ids.insert(handle.address(), id.clone());
        inner.bodies.insert(id.clone(), Arc::clone(&handle.body));
        debug!(function_id = %id, "registered function");

        Ok(handle)
    }

    /// The id a callee was registered under.
    pub fn identify(&self, callee: &Callee) -> Result<FunctionId, FunctionError> {
        let inner = self.read()?;
        match callee {
            Callee::Ref(func) => inner
                .ids
                .get(&func.address())
                .cloned()
                .ok_or(FunctionError::UnregisteredReference),
            Callee::Id(id) if inner.bodies.contains_key(id) => Ok(id.clone()),
            Callee::Id(id) => Err(FunctionError::UnresolvedFunctionReference(id.clone())),
        }
    }

    /// Look up the body registered under `id`.
    pub fn resolve(&self, id: &FunctionId) -> Result<Arc<FunctionBody>, FunctionError> {
        self.read()?
            .bodies
            .get(id)
            .cloned()
            .ok_or_else(|| FunctionError::UnresolvedFunctionReference(id.clone()))
    }

    /// Handle for a function registered under `id`, e.g. to bind a built-in.
    pub fn function_ref(&self, id: &FunctionId) -> Option<FunctionRef> {
        let inner = self.read().ok()?;
        inner.bodies.get(id).map(|body| FunctionRef {
            body: Arc::clone(body),
        })
    }

    pub fn contains(&self, id: &FunctionId) -> bool {
        self.read().map(|inner| inner.bodies.contains_key(id)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.read().map(|inner| inner.bodies.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke a descriptor against this registry.
    pub fn invoke(
        &self,
        call: &SerializedFunctionCall,
        extra: &[Value],
    ) -> Result<Value, FunctionError> {
        Invocation::new(self).call(call, extra)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RegistryInner>, FunctionError> {
        self.inner
            .read()
            .map_err(|e| FunctionError::LockPoisoned(format!("function registry read lock: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RegistryInner>, FunctionError> {
        self.inner
            .write()
            .map_err(|e| FunctionError::LockPoisoned(format!("function registry write lock: {e}")))
    }
}

/// Context handed to every function body while a descriptor is executed.
pub struct Invocation<'a> {
    registry: &'a FunctionRegistry,
}

impl<'a> Invocation<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a FunctionRegistry {
        self.registry
    }

    /// Resolve and run `call`. Bound parameters come first, then `extra`.
    pub fn call(
        &self,
        call: &SerializedFunctionCall,
        extra: &[Value],
    ) -> Result<Value, FunctionError> {
        let body = self.registry.resolve(&call.function_id)?;

        let mut args = Vec::with_capacity(call.parameters.len() + extra.len());
        for parameter in &call.parameters {
            args.push(parameter.to_argument()?);
        }
        args.extend_from_slice(extra);

        body(self, &args)
    }

    /// Same as [`Invocation::call`] for a descriptor received as an argument.
    pub fn call_value(&self, descriptor: &Value, extra: &[Value]) -> Result<Value, FunctionError> {
        let call = SerializedFunctionCall::from_value(descriptor)?;
        self.call(&call, extra)
    }
}
