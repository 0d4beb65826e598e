//! Per-type bags of constructors, methods, properties and events.

use std::sync::Arc;

use indexmap::IndexMap;
use prism_core::MetaError;
use prism_value::BoxedValue;

/// A method body: receives the target value and the argument list.
///
/// An overload that does not accept the argument shape returns
/// [`MetaError::ArgumentMismatch`]; overload resolution then moves on to
/// the next registered callable.
pub type MethodFn = Arc<dyn Fn(&BoxedValue, &[BoxedValue]) -> Result<BoxedValue, MetaError> + Send + Sync>;

/// A constructor body: consumes an argument list, produces a value.
/// Rejection works as for [`MethodFn`].
pub type ConstructorFn = Arc<dyn Fn(&[BoxedValue]) -> Result<BoxedValue, MetaError> + Send + Sync>;

/// A property read accessor.
pub type GetterFn = Arc<dyn Fn(&BoxedValue) -> Result<BoxedValue, MetaError> + Send + Sync>;

/// A property write accessor.
pub type SetterFn = Arc<dyn Fn(&BoxedValue, &BoxedValue) -> Result<(), MetaError> + Send + Sync>;

/// An event listener: receives the target and the event arguments.
pub type ListenerFn = Arc<dyn Fn(&BoxedValue, &[BoxedValue]) + Send + Sync>;

/// Property metadata: accessors, default value and description.
#[derive(Clone)]
pub struct Property {
    /// Read accessor.
    pub getter: GetterFn,
    /// Write accessor; a property without one is readonly.
    pub setter: Option<SetterFn>,
    /// Default value advertised for the property.
    pub default: BoxedValue,
    /// Human-readable description.
    pub description: String,
}

/// Event metadata: description plus a priority-ordered listener list.
#[derive(Clone, Default)]
pub struct Event {
    /// Human-readable description.
    pub description: String,
    /// Listeners in invocation order: descending priority, registration
    /// order between equal priorities. The order is maintained by ordered
    /// insertion, never by re-sorting.
    listeners: Vec<(i32, ListenerFn)>,
}

impl Event {
    pub(crate) fn add_listener(&mut self, listener: ListenerFn, priority: i32) {
        // Insert before the first strictly-lower priority: equal
        // priorities keep registration order.
        let at = self
            .listeners
            .iter()
            .position(|(p, _)| *p < priority)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(at, (priority, listener));
    }

    /// Listeners in invocation order.
    pub fn listeners(&self) -> impl Iterator<Item = &ListenerFn> {
        self.listeners.iter().map(|(_, l)| l)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Everything the reflection registry knows about one type.
///
/// Assemble a bag with the `add_*` methods and hand it to
/// [`ReflectionRegistry::register_type`](crate::ReflectionRegistry::register_type);
/// later additions go through the registry so they pick up the entry lock.
#[derive(Clone, Default)]
pub struct TypeMetadata {
    constructors: Vec<(usize, ConstructorFn)>,
    methods: IndexMap<String, Vec<MethodFn>>,
    properties: IndexMap<String, Property>,
    events: IndexMap<String, Event>,
}

impl TypeMetadata {
    /// An empty bag.
    pub fn new() -> TypeMetadata {
        TypeMetadata::default()
    }

    /// Append a constructor with its declared arity. Constructors
    /// dispatch in registration order.
    pub fn add_constructor<F>(&mut self, arity: usize, constructor: F)
    where
        F: Fn(&[BoxedValue]) -> Result<BoxedValue, MetaError> + Send + Sync + 'static,
    {
        self.constructors.push((arity, Arc::new(constructor)));
    }

    /// The constructor at `index`, in registration order.
    pub fn constructor(&self, index: usize) -> Option<ConstructorFn> {
        self.constructors.get(index).map(|(_, c)| Arc::clone(c))
    }

    pub(crate) fn constructors(&self) -> Vec<(usize, ConstructorFn)> {
        self.constructors.clone()
    }

    /// Append a method overload under `name`. Overloads dispatch in
    /// registration order; the first that does not reject wins.
    pub fn add_method<F>(&mut self, name: &str, method: F)
    where
        F: Fn(&BoxedValue, &[BoxedValue]) -> Result<BoxedValue, MetaError> + Send + Sync + 'static,
    {
        self.methods
            .entry(name.to_string())
            .or_default()
            .push(Arc::new(method));
    }

    /// Drop every overload of `name`.
    pub fn remove_method(&mut self, name: &str) {
        self.methods.shift_remove(name);
    }

    /// The overloads registered under `name`, in registration order.
    pub fn method_overloads(&self, name: &str) -> Vec<MethodFn> {
        self.methods.get(name).cloned().unwrap_or_default()
    }

    /// Registered method names, in registration order.
    pub fn method_names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    /// Register a property.
    pub fn add_property(
        &mut self,
        name: &str,
        getter: GetterFn,
        setter: Option<SetterFn>,
        default: BoxedValue,
        description: &str,
    ) {
        self.properties.insert(
            name.to_string(),
            Property {
                getter,
                setter,
                default,
                description: description.to_string(),
            },
        );
    }

    /// Drop a property.
    pub fn remove_property(&mut self, name: &str) {
        self.properties.shift_remove(name);
    }

    /// The property registered under `name`.
    pub fn property(&self, name: &str) -> Option<Property> {
        self.properties.get(name).cloned()
    }

    /// Registered property names, in registration order.
    pub fn property_names(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    /// Declare an event.
    pub fn add_event(&mut self, name: &str, description: &str) {
        self.events
            .entry(name.to_string())
            .or_default()
            .description = description.to_string();
    }

    /// Drop an event and its listeners.
    pub fn remove_event(&mut self, name: &str) {
        self.events.shift_remove(name);
    }

    /// The event registered under `name`.
    pub fn event(&self, name: &str) -> Option<&Event> {
        self.events.get(name)
    }

    /// Append a listener; the event is declared implicitly when missing.
    pub fn add_listener<F>(&mut self, event_name: &str, listener: F, priority: i32)
    where
        F: Fn(&BoxedValue, &[BoxedValue]) + Send + Sync + 'static,
    {
        self.events
            .entry(event_name.to_string())
            .or_default()
            .add_listener(Arc::new(listener), priority);
    }

    /// Listeners of `event_name` in invocation order; `None` when the
    /// event does not exist.
    pub(crate) fn event_listeners(&self, event_name: &str) -> Option<Vec<ListenerFn>> {
        self.events
            .get(event_name)
            .map(|e| e.listeners().cloned().collect())
    }
}
