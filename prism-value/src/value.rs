//! The uniform value handle.

use core::any::TypeId;
use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use bitflags::bitflags;
use indexmap::IndexMap;
use parking_lot::RwLock;
use prism_core::{Describe, MetaError, TypeDescriptor, TypeTraits};

use crate::facade::{FacadeVTable, facade_for};
use crate::payload::Payload;
use crate::visit::ScalarVisitor;

bitflags! {
    /// Per-value flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct ValueFlags: u8 {
        /// The payload is a non-owning reference to external storage.
        const REFERENCE = 1 << 0;
        /// The value was produced as a call result.
        const RETURN_VALUE = 1 << 1;
        /// Writes are refused through every path.
        const READONLY = 1 << 2;
    }
}

/// Attribute maps are insertion-ordered and shared between deep copies of
/// the same logical value, so they carry their own lock.
pub(crate) type AttrMap = IndexMap<String, BoxedValue>;
pub(crate) type SharedAttrs = Arc<RwLock<AttrMap>>;

/// Everything the per-value lock guards.
pub(crate) struct ValueState {
    pub(crate) payload: Payload,
    pub(crate) descriptor: TypeDescriptor,
    pub(crate) vtable: Option<Arc<FacadeVTable>>,
    pub(crate) attrs: Option<SharedAttrs>,
    pub(crate) flags: ValueFlags,
    pub(crate) modified_at: Instant,
}

/// The shared record behind a [`BoxedValue`] handle.
pub(crate) struct ValueCell {
    pub(crate) state: RwLock<ValueState>,
    pub(crate) created_at: Instant,
    pub(crate) access_count: AtomicU64,
}

/// Type-erased value handle carrying a payload, its descriptor, attributes
/// and flags.
///
/// A `BoxedValue` is a shared record: cloning the handle aliases the same
/// record, so payload writes, attribute mutations and flag changes are
/// visible through every handle. The record is destroyed when the last
/// handle drops. All state is guarded by one reader-writer lock per value;
/// readers run concurrently, writers serialize.
///
/// Construct with [`boxed`], [`boxed_with_flags`], [`boxed_void`] or, for
/// non-owning payloads, the unsafe [`boxed_ref`]/[`boxed_const_ref`].
pub struct BoxedValue {
    pub(crate) cell: Arc<ValueCell>,
}

impl Clone for BoxedValue {
    /// Aliases the shared record; this is not a deep copy. Use
    /// [`BoxedValue::clone_value`] to copy the payload through the
    /// Cloneable skill.
    fn clone(&self) -> Self {
        BoxedValue {
            cell: Arc::clone(&self.cell),
        }
    }
}

fn require_payload(state: &ValueState, operation: &'static str) -> Result<(), MetaError> {
    if state.payload.is_empty() {
        Err(MetaError::Undefined { operation })
    } else {
        Ok(())
    }
}

/// Render a value without taking its lock again.
pub(crate) fn debug_string_locked(state: &ValueState) -> String {
    if let Some(vt) = &state.vtable
        && let Some(to_string) = vt.to_string
        && let Some(any) = state.payload.as_any()
    {
        return to_string(any);
    }
    format!("{}:<opaque>", state.descriptor.name())
}

impl BoxedValue {
    fn from_state(state: ValueState) -> BoxedValue {
        BoxedValue {
            cell: Arc::new(ValueCell {
                state: RwLock::new(state),
                created_at: Instant::now(),
                access_count: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn from_parts(
        payload: Payload,
        descriptor: TypeDescriptor,
        vtable: Option<Arc<FacadeVTable>>,
        attrs: Option<SharedAttrs>,
        flags: ValueFlags,
    ) -> BoxedValue {
        BoxedValue::from_state(ValueState {
            payload,
            descriptor,
            vtable,
            attrs,
            flags,
            modified_at: Instant::now(),
        })
    }

    /// Owning handle around `value`.
    pub fn new<T: Describe + Send + Sync>(value: T) -> BoxedValue {
        BoxedValue::new_with_flags(value, false, false)
    }

    /// Owning handle with explicit return-value and readonly flags.
    pub fn new_with_flags<T: Describe + Send + Sync>(
        value: T,
        is_return_value: bool,
        readonly: bool,
    ) -> BoxedValue {
        let mut flags = ValueFlags::empty();
        flags.set(ValueFlags::RETURN_VALUE, is_return_value);
        flags.set(ValueFlags::READONLY, readonly);
        BoxedValue::from_parts(
            Payload::own(value),
            TypeDescriptor::of::<T>(),
            facade_for(TypeId::of::<T>()),
            None,
            flags,
        )
    }

    /// Empty handle: no payload, undefined descriptor.
    pub fn void() -> BoxedValue {
        BoxedValue::from_parts(
            Payload::Empty,
            TypeDescriptor::undefined(),
            None,
            None,
            ValueFlags::empty(),
        )
    }

    /// Non-owning handle around external mutable storage.
    ///
    /// The descriptor is the referent's, decorated as a reference; the
    /// capability vtable is the referent type's, so skills dispatch as for
    /// an owned value.
    ///
    /// # Safety
    ///
    /// The handle (including every clone of it) must not outlive `target`,
    /// and `target` must not be read or written through any other path
    /// while a handle to it exists. The per-value lock serializes access
    /// *between handles* only.
    pub unsafe fn from_mut_ref<T: Describe + Send + Sync>(target: &mut T) -> BoxedValue {
        BoxedValue::from_parts(
            Payload::borrowed_mut(target),
            TypeDescriptor::of::<T>().as_reference(),
            facade_for(TypeId::of::<T>()),
            None,
            ValueFlags::REFERENCE,
        )
    }

    /// Non-owning, readonly handle around external storage.
    ///
    /// # Safety
    ///
    /// As for [`BoxedValue::from_mut_ref`], except concurrent reads of
    /// `target` outside the handle remain allowed.
    pub unsafe fn from_const_ref<T: Describe + Send + Sync>(target: &T) -> BoxedValue {
        BoxedValue::from_parts(
            Payload::borrowed_const(target),
            TypeDescriptor::of::<T>().as_reference().as_const(),
            facade_for(TypeId::of::<T>()),
            None,
            ValueFlags::REFERENCE | ValueFlags::READONLY,
        )
    }

    //////////////////////////////////////////////////////////////////////
    // Type identity
    //////////////////////////////////////////////////////////////////////

    /// The descriptor of the current payload.
    pub fn type_info(&self) -> TypeDescriptor {
        self.cell.state.read().descriptor.clone()
    }

    /// True when the stored concrete type is `T` (references are looked
    /// through).
    pub fn is_type<T: 'static>(&self) -> bool {
        self.cell.state.read().payload.type_id() == Some(TypeId::of::<T>())
    }

    /// True when [`BoxedValue::try_cast`] would succeed for `T`.
    pub fn can_cast<T: 'static>(&self) -> bool {
        self.is_type::<T>()
    }

    /// True when the handle has no payload.
    pub fn is_undefined(&self) -> bool {
        let state = self.cell.state.read();
        state.payload.is_empty() || state.descriptor.is_undefined()
    }

    /// True when the handle holds no value.
    pub fn is_null(&self) -> bool {
        self.cell.state.read().payload.is_empty()
    }

    /// True when the payload is a non-owning reference.
    pub fn is_reference(&self) -> bool {
        self.cell.state.read().flags.contains(ValueFlags::REFERENCE)
    }

    /// True when writes are refused.
    pub fn is_readonly(&self) -> bool {
        self.cell.state.read().flags.contains(ValueFlags::READONLY)
    }

    /// True when the value is readonly or its descriptor is const-decorated.
    pub fn is_const(&self) -> bool {
        let state = self.cell.state.read();
        state.flags.contains(ValueFlags::READONLY)
            || state.descriptor.has_trait(TypeTraits::CONST)
    }

    /// True when the value was produced as a call result.
    pub fn is_return_value(&self) -> bool {
        self.cell.state.read().flags.contains(ValueFlags::RETURN_VALUE)
    }

    /// Clear the return-value flag.
    pub fn reset_return_value(&self) {
        self.cell.state.write().flags.remove(ValueFlags::RETURN_VALUE);
    }

    /// Toggle the readonly flag.
    pub fn set_readonly(&self, readonly: bool) {
        self.cell.state.write().flags.set(ValueFlags::READONLY, readonly);
    }

    //////////////////////////////////////////////////////////////////////
    // Payload access
    //////////////////////////////////////////////////////////////////////

    /// Copy the payload out as `T`. `None` when the stored type is not `T`.
    pub fn try_cast<T: Clone + 'static>(&self) -> Option<T> {
        self.cell.access_count.fetch_add(1, Ordering::Relaxed);
        let state = self.cell.state.read();
        state.payload.as_any()?.downcast_ref::<T>().cloned()
    }

    /// Run `f` against a shared view of the payload.
    ///
    /// This is the borrow-shaped read path (`get()` in registry terms);
    /// `f` runs under the value's read lock, so it must not call back into
    /// this value's write operations.
    pub fn with<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, MetaError> {
        self.cell.access_count.fetch_add(1, Ordering::Relaxed);
        let state = self.cell.state.read();
        let any = state
            .payload
            .as_any()
            .ok_or(MetaError::Undefined { operation: "with" })?;
        match any.downcast_ref::<T>() {
            Some(v) => Ok(f(v)),
            None => Err(MetaError::TypeMismatch {
                expected: core::any::type_name::<T>().to_string(),
                actual: state.descriptor.name().to_string(),
                operation: "with",
            }),
        }
    }

    /// Run `f` against an exclusive view of the payload.
    ///
    /// Fails with `ReadOnly` on readonly values, `Undefined` on empty ones,
    /// `TypeMismatch` when the stored type is not `T`. Refreshes the
    /// modification timestamp. `f` runs under the value's write lock.
    pub fn with_mut<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, MetaError> {
        self.cell.access_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.cell.state.write();
        if state.flags.contains(ValueFlags::READONLY) || !state.payload.writable() {
            if state.payload.is_empty() {
                return Err(MetaError::Undefined {
                    operation: "with_mut",
                });
            }
            return Err(MetaError::ReadOnly {
                type_name: state.descriptor.name().to_string(),
                operation: "with_mut",
            });
        }
        let descriptor_name = state.descriptor.name().to_string();
        match state.payload.as_any_mut().and_then(|a| a.downcast_mut::<T>()) {
            Some(v) => {
                let out = f(v);
                state.modified_at = Instant::now();
                Ok(out)
            }
            None => Err(MetaError::TypeMismatch {
                expected: core::any::type_name::<T>().to_string(),
                actual: descriptor_name,
                operation: "with_mut",
            }),
        }
    }

    /// Replace the payload, rebinding descriptor and capability vtable.
    ///
    /// Fails with `ReadOnly` on readonly values. A reference payload is
    /// replaced by the new owned payload; the external storage is left
    /// untouched.
    pub fn assign<T: Describe + Send + Sync>(&self, value: T) -> Result<(), MetaError> {
        let mut state = self.cell.state.write();
        if state.flags.contains(ValueFlags::READONLY) {
            return Err(MetaError::ReadOnly {
                type_name: state.descriptor.name().to_string(),
                operation: "assign",
            });
        }
        state.payload = Payload::own(value);
        state.descriptor = TypeDescriptor::of::<T>();
        state.vtable = facade_for(TypeId::of::<T>());
        state.flags.remove(ValueFlags::REFERENCE);
        state.modified_at = Instant::now();
        Ok(())
    }

    /// Exchange the entire state of two values.
    ///
    /// Fails with `ReadOnly` when either side is readonly. Locks are taken
    /// in address order, so concurrent swaps cannot deadlock.
    pub fn swap(&self, other: &BoxedValue) -> Result<(), MetaError> {
        if Arc::ptr_eq(&self.cell, &other.cell) {
            return Ok(());
        }
        let (first, second) = if Arc::as_ptr(&self.cell) < Arc::as_ptr(&other.cell) {
            (&self.cell, &other.cell)
        } else {
            (&other.cell, &self.cell)
        };
        let mut a = first.state.write();
        let mut b = second.state.write();
        for side in [&*a, &*b] {
            if side.flags.contains(ValueFlags::READONLY) {
                return Err(MetaError::ReadOnly {
                    type_name: side.descriptor.name().to_string(),
                    operation: "swap",
                });
            }
        }
        core::mem::swap(&mut *a, &mut *b);
        let now = Instant::now();
        a.modified_at = now;
        b.modified_at = now;
        Ok(())
    }

    //////////////////////////////////////////////////////////////////////
    // Attributes
    //////////////////////////////////////////////////////////////////////

    /// Attach (or replace) an attribute.
    ///
    /// The attribute map is shared with deep copies of this value, so the
    /// mutation is visible through every related handle.
    pub fn set_attr(&self, name: &str, value: BoxedValue) -> Result<(), MetaError> {
        let attrs = {
            let mut state = self.cell.state.write();
            require_payload(&state, "set_attr")?;
            state.modified_at = Instant::now();
            state
                .attrs
                .get_or_insert_with(|| Arc::new(RwLock::new(AttrMap::new())))
                .clone()
        };
        attrs.write().insert(name.to_string(), value);
        Ok(())
    }

    /// The attribute registered under `name`; an undefined value when
    /// missing.
    pub fn get_attr(&self, name: &str) -> Result<BoxedValue, MetaError> {
        let attrs = {
            let state = self.cell.state.read();
            require_payload(&state, "get_attr")?;
            state.attrs.clone()
        };
        Ok(attrs
            .and_then(|map| map.read().get(name).cloned())
            .unwrap_or_else(BoxedValue::void))
    }

    /// True when an attribute named `name` exists.
    pub fn has_attr(&self, name: &str) -> Result<bool, MetaError> {
        let attrs = {
            let state = self.cell.state.read();
            require_payload(&state, "has_attr")?;
            state.attrs.clone()
        };
        Ok(attrs.is_some_and(|map| map.read().contains_key(name)))
    }

    /// Remove an attribute. Removing a missing attribute is not an error.
    pub fn remove_attr(&self, name: &str) -> Result<(), MetaError> {
        let attrs = {
            let mut state = self.cell.state.write();
            require_payload(&state, "remove_attr")?;
            state.modified_at = Instant::now();
            state.attrs.clone()
        };
        if let Some(map) = attrs {
            map.write().shift_remove(name);
        }
        Ok(())
    }

    /// Attribute names in insertion order.
    pub fn list_attrs(&self) -> Result<Vec<String>, MetaError> {
        let attrs = {
            let state = self.cell.state.read();
            require_payload(&state, "list_attrs")?;
            state.attrs.clone()
        };
        Ok(attrs.map_or_else(Vec::new, |map| map.read().keys().cloned().collect()))
    }

    /// Drop every attribute. Breaks attribute cycles so the records they
    /// form can be reclaimed.
    pub fn clear_attrs(&self) -> Result<(), MetaError> {
        let attrs = {
            let mut state = self.cell.state.write();
            require_payload(&state, "clear_attrs")?;
            state.modified_at = Instant::now();
            state.attrs.take()
        };
        if let Some(map) = attrs {
            map.write().clear();
        }
        Ok(())
    }

    //////////////////////////////////////////////////////////////////////
    // Diagnostics
    //////////////////////////////////////////////////////////////////////

    /// Human-readable rendering: the Stringable skill when the type has
    /// one, a `<type>:<opaque>` form otherwise.
    pub fn debug_string(&self) -> String {
        debug_string_locked(&self.cell.state.read())
    }

    /// Creation time of the shared record.
    pub fn created_at(&self) -> Instant {
        self.cell.created_at
    }

    /// Time of the most recent write.
    pub fn last_modified_at(&self) -> Instant {
        self.cell.state.read().modified_at
    }

    /// Best-effort count of payload accesses, for diagnostics.
    pub fn access_count(&self) -> u64 {
        self.cell.access_count.load(Ordering::Relaxed)
    }

    /// Dispatch the payload to a scalar visitor.
    ///
    /// Common scalar payloads (integers, floats, `bool`, `char`, strings)
    /// call their typed hook; everything else falls through to
    /// [`ScalarVisitor::visit_other`].
    pub fn visit(&self, visitor: &mut dyn ScalarVisitor) {
        let state = self.cell.state.read();
        let Some(any) = state.payload.as_any() else {
            visitor.visit_empty();
            return;
        };

        macro_rules! dispatch {
            ($t:ty, $m:ident, $conv:expr) => {
                if let Some(v) = any.downcast_ref::<$t>() {
                    #[allow(clippy::redundant_closure_call)]
                    return visitor.$m($conv(v));
                }
            };
        }

        dispatch!(bool, visit_bool, |v: &bool| *v);
        dispatch!(char, visit_char, |v: &char| *v);
        dispatch!(i8, visit_int, |v: &i8| i64::from(*v));
        dispatch!(i16, visit_int, |v: &i16| i64::from(*v));
        dispatch!(i32, visit_int, |v: &i32| i64::from(*v));
        dispatch!(i64, visit_int, |v: &i64| *v);
        dispatch!(isize, visit_int, |v: &isize| *v as i64);
        dispatch!(u8, visit_uint, |v: &u8| u64::from(*v));
        dispatch!(u16, visit_uint, |v: &u16| u64::from(*v));
        dispatch!(u32, visit_uint, |v: &u32| u64::from(*v));
        dispatch!(u64, visit_uint, |v: &u64| *v);
        dispatch!(usize, visit_uint, |v: &usize| *v as u64);
        dispatch!(f32, visit_float, |v: &f32| f64::from(*v));
        dispatch!(f64, visit_float, |v: &f64| *v);
        dispatch!(String, visit_str, (|v: &String| v.as_str()) as fn(&String) -> &str);
        dispatch!(&'static str, visit_str, |v: &&'static str| *v);
        visitor.visit_other(&state.descriptor);
    }
}

impl fmt::Debug for BoxedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxedValue({})", self.debug_string())
    }
}

//////////////////////////////////////////////////////////////////////
// Construction helpers
//////////////////////////////////////////////////////////////////////

/// Owning handle around `value`.
pub fn boxed<T: Describe + Send + Sync>(value: T) -> BoxedValue {
    BoxedValue::new(value)
}

/// Owning handle with explicit flags.
pub fn boxed_with_flags<T: Describe + Send + Sync>(
    value: T,
    is_return_value: bool,
    readonly: bool,
) -> BoxedValue {
    BoxedValue::new_with_flags(value, is_return_value, readonly)
}

/// Empty handle: no payload, undefined descriptor.
pub fn boxed_void() -> BoxedValue {
    BoxedValue::void()
}

/// Owning handle with a `"description"` attribute attached.
pub fn boxed_with_desc<T: Describe + Send + Sync>(value: T, description: &str) -> BoxedValue {
    let v = BoxedValue::new(value);
    // A fresh owned value always has a payload; attaching cannot fail.
    let _ = v.set_attr("description", boxed(description.to_string()));
    v
}

/// Non-owning handle around external mutable storage; sets the reference
/// flag.
///
/// # Safety
///
/// See [`BoxedValue::from_mut_ref`].
pub unsafe fn boxed_ref<T: Describe + Send + Sync>(target: &mut T) -> BoxedValue {
    unsafe { BoxedValue::from_mut_ref(target) }
}

/// Non-owning, readonly handle around external storage.
///
/// # Safety
///
/// See [`BoxedValue::from_const_ref`].
pub unsafe fn boxed_const_ref<T: Describe + Send + Sync>(target: &T) -> BoxedValue {
    unsafe { BoxedValue::from_const_ref(target) }
}
