//! Free-function dispatch against the process-wide registry, plus the
//! argument helpers method bodies build on.

use prism_core::MetaError;
use prism_value::BoxedValue;

use crate::registry::reflection_registry;

/// Invoke a method on `target` through the process-wide registry.
pub fn call_method(
    target: &BoxedValue,
    name: &str,
    args: &[BoxedValue],
) -> Result<BoxedValue, MetaError> {
    reflection_registry().call_method(target, name, args)
}

/// Read a property of `target` through the process-wide registry.
pub fn get_property(target: &BoxedValue, name: &str) -> Result<BoxedValue, MetaError> {
    reflection_registry().get_property(target, name)
}

/// Write a property of `target` through the process-wide registry.
pub fn set_property(target: &BoxedValue, name: &str, value: &BoxedValue) -> Result<(), MetaError> {
    reflection_registry().set_property(target, name, value)
}

/// Fire an event on `target` through the process-wide registry.
pub fn fire_event(target: &BoxedValue, name: &str, args: &[BoxedValue]) -> Result<(), MetaError> {
    reflection_registry().fire_event(target, name, args)
}

/// Construct an instance of a registered type through the process-wide
/// registry.
pub fn create_instance(type_name: &str, args: &[BoxedValue]) -> Result<BoxedValue, MetaError> {
    reflection_registry().create_instance(type_name, args)
}

/// Reject the current overload unless exactly `expected` arguments were
/// passed.
pub fn expect_arity(args: &[BoxedValue], expected: usize) -> Result<(), MetaError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(MetaError::ArgumentMismatch {
            detail: format!("expected {expected} argument(s), got {}", args.len()),
        })
    }
}

/// Extract argument `index` as a `T`, rejecting the overload when it is
/// missing or holds a different type.
///
/// This is the building block for the overload contract: a method body
/// extracts its arguments with `arg` first, and any mismatch makes
/// resolution move on to the next overload.
pub fn arg<T: Clone + 'static>(args: &[BoxedValue], index: usize) -> Result<T, MetaError> {
    let value = args.get(index).ok_or_else(|| MetaError::ArgumentMismatch {
        detail: format!("missing argument {index}"),
    })?;
    value.try_cast::<T>().ok_or_else(|| MetaError::ArgumentMismatch {
        detail: format!(
            "argument {index} is a {}, expected {}",
            value.type_info(),
            core::any::type_name::<T>()
        ),
    })
}
