//! The process-wide reflection registry and its dispatch paths.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use parking_lot::RwLock;
use prism_core::{Describe, DuplicatePolicy, MetaError};
use prism_value::{BoxedValue, boxed};

use crate::metadata::{ConstructorFn, ListenerFn, MethodFn, TypeMetadata};

/// What to do when an event listener panics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListenerPanicPolicy {
    /// Log at `warn` and keep invoking the remaining listeners.
    #[default]
    Swallow,
    /// Invoke every listener, then resume the first panic.
    RethrowAfterAll,
    /// Resume the panic at once; remaining listeners do not run.
    RethrowImmediately,
}

/// Name-keyed registry of [`TypeMetadata`] entries with dynamic dispatch.
///
/// Entries are read-mostly: lookups take a shared lock on the name table,
/// per-entry mutation (appending methods or listeners after registration)
/// takes the entry's own lock. No user-supplied callable ever runs under a
/// registry or entry lock: callables are cloned out first, then invoked.
pub struct ReflectionRegistry {
    types: RwLock<IndexMap<String, Arc<RwLock<TypeMetadata>>>>,
    policy: RwLock<DuplicatePolicy>,
    panic_policy: RwLock<ListenerPanicPolicy>,
}

impl Default for ReflectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectionRegistry {
    /// An empty registry with strict duplicate handling and panic
    /// swallowing.
    pub fn new() -> ReflectionRegistry {
        ReflectionRegistry {
            types: RwLock::new(IndexMap::new()),
            policy: RwLock::new(DuplicatePolicy::default()),
            panic_policy: RwLock::new(ListenerPanicPolicy::default()),
        }
    }

    /// Change the duplicate-registration policy.
    pub fn set_duplicate_policy(&self, policy: DuplicatePolicy) {
        *self.policy.write() = policy;
    }

    /// Change the listener panic policy.
    pub fn set_listener_panic_policy(&self, policy: ListenerPanicPolicy) {
        *self.panic_policy.write() = policy;
    }

    /// Register a metadata bag under `name`, honoring the duplicate
    /// policy.
    pub fn register_type(&self, name: &str, metadata: TypeMetadata) -> Result<(), MetaError> {
        let policy = *self.policy.read();
        let mut types = self.types.write();
        if types.contains_key(name) {
            match policy {
                DuplicatePolicy::Ignore => return Ok(()),
                DuplicatePolicy::Overwrite => {
                    log::warn!("reflection registry: overwriting entry for {name}");
                }
                DuplicatePolicy::Error => {
                    return Err(MetaError::AlreadyRegistered { name: name.into() });
                }
            }
        }
        types.insert(name.to_string(), Arc::new(RwLock::new(metadata)));
        Ok(())
    }

    /// Register the default metadata for `T`: a zero-argument constructor,
    /// `on_create`/`on_destroy` events and a `print` method rendering the
    /// target's debug string.
    pub fn register_defaults<T>(&self, name: &str) -> Result<(), MetaError>
    where
        T: Describe + Default + Send + Sync,
    {
        let mut metadata = TypeMetadata::new();
        metadata.add_constructor(0, |args| {
            if args.is_empty() {
                Ok(boxed(T::default()))
            } else {
                Err(MetaError::ArgumentMismatch {
                    detail: "default constructor takes no arguments".to_string(),
                })
            }
        });
        metadata.add_event("on_create", "fired when an instance is created");
        metadata.add_event("on_destroy", "fired when an instance is dropped");
        metadata.add_method("print", |target, _args| Ok(boxed(target.debug_string())));
        self.register_type(name, metadata)
    }

    /// The entry registered under `name`.
    pub fn lookup_entry(&self, name: &str) -> Option<Arc<RwLock<TypeMetadata>>> {
        self.types.read().get(name).cloned()
    }

    /// True when `name` has an entry.
    pub fn is_registered(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    /// Registered type names, in registration order.
    pub fn registered_types(&self) -> Vec<String> {
        self.types.read().keys().cloned().collect()
    }

    /// Drop every entry. Meant for tests and structured teardown.
    pub fn clear(&self) {
        self.types.write().clear();
    }

    /// Resolve the entry a target value dispatches against: its display
    /// name first, then its bare name (so borrowed handles reach the
    /// registration of the bare type).
    fn entry_for_target(
        &self,
        target: &BoxedValue,
    ) -> Result<(String, Arc<RwLock<TypeMetadata>>), MetaError> {
        let descriptor = target.type_info();
        let types = self.types.read();
        if let Some(entry) = types.get(descriptor.name()) {
            return Ok((descriptor.name().to_string(), Arc::clone(entry)));
        }
        if let Some(entry) = types.get(descriptor.bare_name()) {
            return Ok((descriptor.bare_name().to_string(), Arc::clone(entry)));
        }
        Err(MetaError::NotFound {
            what: "type",
            name: descriptor.name().to_string(),
            type_name: String::new(),
        })
    }

    /// Run `mutate` against the entry registered under `type_name`.
    fn with_entry<R>(
        &self,
        type_name: &str,
        mutate: impl FnOnce(&mut TypeMetadata) -> R,
    ) -> Result<R, MetaError> {
        let entry = self
            .lookup_entry(type_name)
            .ok_or_else(|| MetaError::NotFound {
                what: "type",
                name: type_name.to_string(),
                type_name: String::new(),
            })?;
        let mut metadata = entry.write();
        Ok(mutate(&mut metadata))
    }

    /// Append a method overload to an already-registered type.
    pub fn add_method<F>(&self, type_name: &str, method_name: &str, method: F) -> Result<(), MetaError>
    where
        F: Fn(&BoxedValue, &[BoxedValue]) -> Result<BoxedValue, MetaError> + Send + Sync + 'static,
    {
        self.with_entry(type_name, |md| md.add_method(method_name, method))
    }

    /// Drop every overload of a method.
    pub fn remove_method(&self, type_name: &str, method_name: &str) -> Result<(), MetaError> {
        self.with_entry(type_name, |md| md.remove_method(method_name))
    }

    /// Append a constructor to an already-registered type.
    pub fn add_constructor<F>(&self, type_name: &str, arity: usize, constructor: F) -> Result<(), MetaError>
    where
        F: Fn(&[BoxedValue]) -> Result<BoxedValue, MetaError> + Send + Sync + 'static,
    {
        self.with_entry(type_name, |md| md.add_constructor(arity, constructor))
    }

    /// Register a property on an already-registered type.
    #[allow(clippy::too_many_arguments)]
    pub fn add_property(
        &self,
        type_name: &str,
        property_name: &str,
        getter: crate::metadata::GetterFn,
        setter: Option<crate::metadata::SetterFn>,
        default: BoxedValue,
        description: &str,
    ) -> Result<(), MetaError> {
        self.with_entry(type_name, |md| {
            md.add_property(property_name, getter, setter, default, description)
        })
    }

    /// Drop a property.
    pub fn remove_property(&self, type_name: &str, property_name: &str) -> Result<(), MetaError> {
        self.with_entry(type_name, |md| md.remove_property(property_name))
    }

    /// Declare an event on an already-registered type.
    pub fn add_event(&self, type_name: &str, event_name: &str, description: &str) -> Result<(), MetaError> {
        self.with_entry(type_name, |md| md.add_event(event_name, description))
    }

    /// Drop an event and its listeners.
    pub fn remove_event(&self, type_name: &str, event_name: &str) -> Result<(), MetaError> {
        self.with_entry(type_name, |md| md.remove_event(event_name))
    }

    /// Append a listener with a priority; larger priorities fire first,
    /// ties fire in registration order.
    pub fn add_listener<F>(
        &self,
        type_name: &str,
        event_name: &str,
        listener: F,
        priority: i32,
    ) -> Result<(), MetaError>
    where
        F: Fn(&BoxedValue, &[BoxedValue]) + Send + Sync + 'static,
    {
        self.with_entry(type_name, |md| md.add_listener(event_name, listener, priority))
    }

    //////////////////////////////////////////////////////////////////////
    // Dispatch
    //////////////////////////////////////////////////////////////////////

    /// The overloads of `name` visible to `target`, in registration order.
    pub fn get_methods(&self, target: &BoxedValue, name: &str) -> Vec<MethodFn> {
        self.entry_for_target(target)
            .map(|(_, entry)| {
                let overloads = entry.read().method_overloads(name);
                overloads
            })
            .unwrap_or_default()
    }

    /// Invoke the method `name` on `target`.
    ///
    /// Overloads run in registration order; the first that does not reject
    /// with `ArgumentMismatch` wins, and its result (success or failure)
    /// propagates unchanged. When every overload rejects (or none exists),
    /// the error is `NotFound`.
    pub fn call_method(
        &self,
        target: &BoxedValue,
        name: &str,
        args: &[BoxedValue],
    ) -> Result<BoxedValue, MetaError> {
        let (type_name, entry) = self.entry_for_target(target)?;
        let overloads = entry.read().method_overloads(name);
        for overload in overloads {
            match overload(target, args) {
                Err(err) if err.is_argument_mismatch() => continue,
                outcome => return outcome,
            }
        }
        Err(MetaError::NotFound {
            what: "method",
            name: name.to_string(),
            type_name,
        })
    }

    /// Read the property `name` from `target`.
    pub fn get_property(&self, target: &BoxedValue, name: &str) -> Result<BoxedValue, MetaError> {
        let (type_name, entry) = self.entry_for_target(target)?;
        let property = entry
            .read()
            .property(name)
            .ok_or_else(|| MetaError::NotFound {
                what: "property",
                name: name.to_string(),
                type_name,
            })?;
        (property.getter)(target)
    }

    /// Write the property `name` on `target`. A property without a setter
    /// fails with `ReadOnly`; getter/setter errors propagate unchanged.
    pub fn set_property(
        &self,
        target: &BoxedValue,
        name: &str,
        value: &BoxedValue,
    ) -> Result<(), MetaError> {
        let (type_name, entry) = self.entry_for_target(target)?;
        let property = entry
            .read()
            .property(name)
            .ok_or_else(|| MetaError::NotFound {
                what: "property",
                name: name.to_string(),
                type_name: type_name.clone(),
            })?;
        let setter = property.setter.ok_or(MetaError::ReadOnly {
            type_name,
            operation: "set_property",
        })?;
        setter(target, value)
    }

    /// The constructor at `index` for `type_name`, in registration order.
    pub fn get_constructor(&self, type_name: &str, index: usize) -> Option<ConstructorFn> {
        let entry = self.lookup_entry(type_name)?;
        let constructor = entry.read().constructor(index);
        constructor
    }

    /// Construct an instance of `type_name`.
    ///
    /// Constructors whose declared arity matches run in registration
    /// order; a constructor is free to reject with `ArgumentMismatch`, in
    /// which case the next one is tried. When none accepts, the error is
    /// `ConstructorFailure`.
    pub fn create_instance(
        &self,
        type_name: &str,
        args: &[BoxedValue],
    ) -> Result<BoxedValue, MetaError> {
        let entry = self
            .lookup_entry(type_name)
            .ok_or_else(|| MetaError::NotFound {
                what: "type",
                name: type_name.to_string(),
                type_name: String::new(),
            })?;
        let constructors = entry.read().constructors();
        if constructors.is_empty() {
            return Err(MetaError::NotFound {
                what: "constructor",
                name: type_name.to_string(),
                type_name: type_name.to_string(),
            });
        }
        for (arity, constructor) in constructors {
            if arity != args.len() {
                continue;
            }
            match constructor(args) {
                Err(err) if err.is_argument_mismatch() => continue,
                outcome => return outcome,
            }
        }
        Err(MetaError::ConstructorFailure {
            type_name: type_name.to_string(),
        })
    }

    /// Fire the event `name` on `target`.
    ///
    /// Listeners run in descending priority order (stable for ties), with
    /// no registry lock held. A panicking listener is handled per the
    /// configured [`ListenerPanicPolicy`]; under `Swallow` the remaining
    /// listeners still run.
    pub fn fire_event(
        &self,
        target: &BoxedValue,
        name: &str,
        args: &[BoxedValue],
    ) -> Result<(), MetaError> {
        let (type_name, entry) = self.entry_for_target(target)?;
        let listeners: Vec<ListenerFn> = entry
            .read()
            .event_listeners(name)
            .ok_or_else(|| MetaError::NotFound {
                what: "event",
                name: name.to_string(),
                type_name,
            })?;
        let policy = *self.panic_policy.read();
        let mut deferred = None;
        for listener in listeners {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(target, args))) {
                match policy {
                    ListenerPanicPolicy::Swallow => {
                        log::warn!("listener for event {name} panicked; continuing");
                    }
                    ListenerPanicPolicy::RethrowImmediately => resume_unwind(payload),
                    ListenerPanicPolicy::RethrowAfterAll => {
                        if deferred.is_none() {
                            deferred = Some(payload);
                        }
                    }
                }
            }
        }
        if let Some(payload) = deferred {
            resume_unwind(payload);
        }
        Ok(())
    }
}

/// The process-wide reflection registry. Lazily initialized on first
/// touch, torn down at process exit.
pub fn reflection_registry() -> &'static ReflectionRegistry {
    static REGISTRY: LazyLock<ReflectionRegistry> = LazyLock::new(ReflectionRegistry::new);
    &REGISTRY
}
