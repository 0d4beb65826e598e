//! Visitor dispatch over common scalar payloads.

use prism_core::TypeDescriptor;

/// Receiver for [`BoxedValue::visit`](crate::BoxedValue::visit).
///
/// Every hook has a no-op default, so a visitor implements only what it
/// cares about. Signed and unsigned integers arrive widened to 64 bits,
/// floats as `f64`.
pub trait ScalarVisitor {
    /// A `bool` payload.
    fn visit_bool(&mut self, _value: bool) {}
    /// A `char` payload.
    fn visit_char(&mut self, _value: char) {}
    /// Any signed integer payload.
    fn visit_int(&mut self, _value: i64) {}
    /// Any unsigned integer payload.
    fn visit_uint(&mut self, _value: u64) {}
    /// Any floating-point payload.
    fn visit_float(&mut self, _value: f64) {}
    /// A `String` or `&str` payload.
    fn visit_str(&mut self, _value: &str) {}
    /// The handle has no payload.
    fn visit_empty(&mut self) {}
    /// Fallback for every other payload type.
    fn visit_other(&mut self, _descriptor: &TypeDescriptor) {}
}
