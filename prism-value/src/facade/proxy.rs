//! Named function proxies: dynamically-built callables that travel as
//! ordinary values.

use core::fmt;
use std::sync::Arc;

use prism_core::MetaError;

use crate::BoxedValue;
use crate::facade::hooks::DynCall;

/// A named, described wrapper around a boxed-argument function.
///
/// `ProxyFn` implements [`DynCall`], so a boxed proxy carries the Callable
/// skill: look one up, pass it around as a [`BoxedValue`], invoke it with
/// boxed arguments. The optional arity is enforced before the underlying
/// function runs.
#[derive(Clone)]
pub struct ProxyFn {
    name: String,
    description: String,
    arity: Option<usize>,
    func: Arc<dyn Fn(&[BoxedValue]) -> Result<BoxedValue, MetaError> + Send + Sync>,
}

impl ProxyFn {
    /// Wrap `func` under `name`.
    pub fn new<F>(name: &str, func: F) -> ProxyFn
    where
        F: Fn(&[BoxedValue]) -> Result<BoxedValue, MetaError> + Send + Sync + 'static,
    {
        ProxyFn {
            name: name.to_string(),
            description: String::new(),
            arity: None,
            func: Arc::new(func),
        }
    }

    /// Attach a human-readable description.
    pub fn with_description(mut self, description: &str) -> ProxyFn {
        self.description = description.to_string();
        self
    }

    /// Declare the exact number of arguments the function accepts.
    pub fn with_arity(mut self, arity: usize) -> ProxyFn {
        self.arity = Some(arity);
        self
    }

    /// The proxy's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The proxy's description, empty when none was attached.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared arity, `None` when variadic.
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Invoke directly, without going through a boxed handle.
    pub fn invoke(&self, args: &[BoxedValue]) -> Result<BoxedValue, MetaError> {
        self.dyn_call(args)
    }
}

impl DynCall for ProxyFn {
    fn dyn_call(&self, args: &[BoxedValue]) -> Result<BoxedValue, MetaError> {
        if let Some(arity) = self.arity
            && args.len() != arity
        {
            return Err(MetaError::ArgumentMismatch {
                detail: format!(
                    "{} expects {arity} argument(s), got {}",
                    self.name,
                    args.len()
                ),
            });
        }
        (self.func)(args)
    }
}

impl fmt::Display for ProxyFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            Some(n) => write!(f, "fn {}/{n}", self.name),
            None => write!(f, "fn {}", self.name),
        }
    }
}

impl fmt::Debug for ProxyFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFn")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

prism_core::describe_type!(ProxyFn => CLASS | FUNCTION | MOVABLE | COPYABLE | FINAL);
