//! Process-wide, thread-safe name↔descriptor and name↔factory map.

use core::any::Any;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{Describe, MetaError, TypeDescriptor};

/// A registered zero-argument producer: yields an owned, type-erased payload
/// plus the descriptor that identifies it.
pub type FactoryFn = Arc<dyn Fn() -> (Box<dyn Any + Send + Sync>, TypeDescriptor) + Send + Sync>;

/// Policy applied when a name is registered twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Keep the first registration, silently drop the new one.
    Ignore,
    /// Replace the previous registration. Logged at `warn` so aliasing
    /// mistakes stay visible.
    Overwrite,
    /// Refuse with [`MetaError::AlreadyRegistered`].
    #[default]
    Error,
}

struct RegistryInner {
    policy: DuplicatePolicy,
    types: IndexMap<String, TypeDescriptor>,
    factories: IndexMap<String, FactoryFn>,
}

/// Name-keyed registry of type descriptors and instance factories.
///
/// The process-wide instance lives behind [`type_registry`]; fresh instances
/// can be constructed for isolated use (tests, plugin sandboxes).
///
/// Many readers run concurrently; registrations serialize against them.
/// Factory callables are invoked with no registry lock held.
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// An empty registry with the default (strict) duplicate policy.
    pub fn new() -> TypeRegistry {
        TypeRegistry::with_policy(DuplicatePolicy::default())
    }

    /// An empty registry with an explicit duplicate policy.
    pub fn with_policy(policy: DuplicatePolicy) -> TypeRegistry {
        TypeRegistry {
            inner: RwLock::new(RegistryInner {
                policy,
                types: IndexMap::new(),
                factories: IndexMap::new(),
            }),
        }
    }

    /// Change the duplicate policy for subsequent registrations.
    pub fn set_duplicate_policy(&self, policy: DuplicatePolicy) {
        self.inner.write().policy = policy;
    }

    /// Register `descriptor` under `name`, honoring the duplicate policy.
    pub fn register(&self, name: &str, descriptor: TypeDescriptor) -> Result<(), MetaError> {
        let mut inner = self.inner.write();
        if inner.types.contains_key(name) {
            match inner.policy {
                DuplicatePolicy::Ignore => return Ok(()),
                DuplicatePolicy::Overwrite => {
                    log::warn!("type registry: overwriting registration for {name}");
                }
                DuplicatePolicy::Error => {
                    return Err(MetaError::AlreadyRegistered { name: name.into() });
                }
            }
        }
        inner.types.insert(name.to_string(), descriptor);
        Ok(())
    }

    /// Register the descriptor of `T` under `name`.
    pub fn register_type<T: Describe>(&self, name: &str) -> Result<(), MetaError> {
        self.register(name, TypeDescriptor::of::<T>())
    }

    /// The descriptor registered under `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<TypeDescriptor> {
        self.inner.read().types.get(name).cloned()
    }

    /// True when `name` has been registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.read().types.contains_key(name)
    }

    /// Every registered name, in registration order.
    pub fn registered_names(&self) -> Vec<String> {
        self.inner.read().types.keys().cloned().collect()
    }

    /// Register a default-constructing factory (and the descriptor) for `T`
    /// under `name`.
    pub fn register_factory<T>(&self, name: &str) -> Result<(), MetaError>
    where
        T: Describe + Default + Send + Sync,
    {
        self.register_factory_with(name, TypeDescriptor::of::<T>(), || {
            Box::new(T::default()) as Box<dyn Any + Send + Sync>
        })
    }

    /// Register an arbitrary producer under `name`. The producer may box a
    /// different handle type than the descriptor's bare type (e.g. a
    /// `Box<dyn Trait>` wrapped in a concrete handle); the produced value is
    /// owned by the caller.
    pub fn register_factory_with<F>(
        &self,
        name: &str,
        descriptor: TypeDescriptor,
        producer: F,
    ) -> Result<(), MetaError>
    where
        F: Fn() -> Box<dyn Any + Send + Sync> + Send + Sync + 'static,
    {
        self.register(name, descriptor.clone())?;
        let factory: FactoryFn = Arc::new(move || (producer(), descriptor.clone()));
        self.inner.write().factories.insert(name.to_string(), factory);
        Ok(())
    }

    /// Produce a fresh instance of the type registered under `name`.
    ///
    /// Returns the owned payload and its descriptor; `None` when no factory
    /// is registered. The factory runs with no registry lock held.
    pub fn create(&self, name: &str) -> Option<(Box<dyn Any + Send + Sync>, TypeDescriptor)> {
        let factory = self.inner.read().factories.get(name).cloned()?;
        Some(factory())
    }

    /// Drop every registration. Meant for tests and structured teardown.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.types.clear();
        inner.factories.clear();
    }
}

/// The process-wide type registry. Lazily initialized on first touch, torn
/// down at process exit.
pub fn type_registry() -> &'static TypeRegistry {
    static REGISTRY: LazyLock<TypeRegistry> = LazyLock::new(TypeRegistry::new);
    &REGISTRY
}
