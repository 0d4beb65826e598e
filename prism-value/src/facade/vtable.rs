//////////////////////////////////////////////////////////////////////
// Capability vtable
//////////////////////////////////////////////////////////////////////

use core::any::{Any, TypeId};
use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use prism_core::{Describe, MetaError, TypeDescriptor};

use crate::BoxedValue;
use crate::facade::hooks::{DynCall, TextSerial};

/// Streams the payload into a sink.
pub type PrintFn = fn(&dyn Any, &mut dyn fmt::Write) -> fmt::Result;
/// Renders the payload as an owned string.
pub type ToStringFn = fn(&dyn Any) -> String;
/// Equality against another type-erased payload. False on type mismatch.
pub type EqualsFn = fn(&dyn Any, &dyn Any) -> bool;
/// Ordering against another type-erased payload. `None` on type mismatch
/// or incomparable values.
pub type LessFn = fn(&dyn Any, &dyn Any) -> Option<Ordering>;
/// Encodes the payload through its [`TextSerial`] hook.
pub type SerializeFn = fn(&dyn Any) -> Result<String, MetaError>;
/// Decodes into the payload through its [`TextSerial`] hook. False when
/// the text was rejected.
pub type DeserializeFn = fn(&mut dyn Any, &str) -> bool;
/// Deep-copies the payload. `None` on type mismatch.
pub type CloneFn = fn(&dyn Any) -> Option<Box<dyn Any + Send + Sync>>;
/// Invokes the payload through its [`DynCall`] hook.
pub type CallFn = fn(&dyn Any, &[BoxedValue]) -> Result<BoxedValue, MetaError>;

/// Per-concrete-type table of optional skill entry points.
///
/// Built once at registration time, through [`FacadeBuilder`] or the
/// [`probe_facade!`](crate::probe_facade) macro, then cached inside every
/// [`BoxedValue`] of the type, so skill dispatch is a single pointer load.
/// Any field may be absent when the concrete type does not satisfy the
/// capability.
pub struct FacadeVTable {
    descriptor: TypeDescriptor,
    type_id: TypeId,
    /// Printable: stream into a sink.
    pub print: Option<PrintFn>,
    /// Stringable: render as a string.
    pub to_string: Option<ToStringFn>,
    /// Comparable: equality.
    pub equals: Option<EqualsFn>,
    /// Comparable: optional ordering.
    pub less: Option<LessFn>,
    /// Serializable: encode.
    pub serialize: Option<SerializeFn>,
    /// Serializable: decode in place.
    pub deserialize: Option<DeserializeFn>,
    /// Cloneable: deep copy.
    pub clone_fn: Option<CloneFn>,
    /// Callable: dynamic invocation.
    pub call: Option<CallFn>,
}

impl FacadeVTable {
    /// A vtable with every capability absent.
    pub fn empty<T: Describe + Send + Sync>() -> FacadeVTable {
        FacadeVTable {
            descriptor: TypeDescriptor::of::<T>(),
            type_id: TypeId::of::<T>(),
            print: None,
            to_string: None,
            equals: None,
            less: None,
            serialize: None,
            deserialize: None,
            clone_fn: None,
            call: None,
        }
    }

    /// Start building a vtable for `T`; add capabilities with the
    /// trait-gated builder methods.
    pub fn builder<T: Describe + Send + Sync>() -> FacadeBuilder<T> {
        FacadeBuilder {
            vt: FacadeVTable::empty::<T>(),
            _marker: PhantomData,
        }
    }

    /// Descriptor of the concrete type this vtable was built for.
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// `TypeId` of the concrete type this vtable was built for.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

//////////////////////////////////////////////////////////////////////
// Monomorphized skill entry points
//////////////////////////////////////////////////////////////////////

pub(crate) fn print_impl<T: Any + fmt::Display>(
    this: &dyn Any,
    out: &mut dyn fmt::Write,
) -> fmt::Result {
    match this.downcast_ref::<T>() {
        Some(v) => write!(out, "{v}"),
        None => Err(fmt::Error),
    }
}

pub(crate) fn to_string_impl<T: Any + ToString>(this: &dyn Any) -> String {
    this.downcast_ref::<T>().map(T::to_string).unwrap_or_default()
}

pub(crate) fn equals_impl<T: Any + PartialEq>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

pub(crate) fn less_impl<T: Any + PartialOrd>(a: &dyn Any, b: &dyn Any) -> Option<Ordering> {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(x), Some(y)) => x.partial_cmp(y),
        _ => None,
    }
}

pub(crate) fn serialize_impl<T: Any + TextSerial>(this: &dyn Any) -> Result<String, MetaError> {
    match this.downcast_ref::<T>() {
        Some(v) => Ok(v.serialize()),
        None => Err(MetaError::Internal {
            detail: format!(
                "serialize dispatched against a foreign payload (expected {})",
                core::any::type_name::<T>()
            ),
        }),
    }
}

pub(crate) fn deserialize_impl<T: Any + TextSerial>(this: &mut dyn Any, text: &str) -> bool {
    this.downcast_mut::<T>().is_some_and(|v| v.deserialize(text))
}

pub(crate) fn clone_impl<T: Any + Clone + Send + Sync>(
    this: &dyn Any,
) -> Option<Box<dyn Any + Send + Sync>> {
    this.downcast_ref::<T>()
        .map(|v| Box::new(v.clone()) as Box<dyn Any + Send + Sync>)
}

pub(crate) fn call_impl<T: Any + DynCall>(
    this: &dyn Any,
    args: &[BoxedValue],
) -> Result<BoxedValue, MetaError> {
    match this.downcast_ref::<T>() {
        Some(v) => v.dyn_call(args),
        None => Err(MetaError::Internal {
            detail: format!(
                "call dispatched against a foreign payload (expected {})",
                core::any::type_name::<T>()
            ),
        }),
    }
}

//////////////////////////////////////////////////////////////////////
// Builder
//////////////////////////////////////////////////////////////////////

/// Builds a [`FacadeVTable`] for `T`, one capability at a time.
///
/// Each method is gated on the trait the capability dispatches to, so a
/// vtable can only advertise what the concrete type actually satisfies.
pub struct FacadeBuilder<T> {
    vt: FacadeVTable,
    _marker: PhantomData<T>,
}

impl<T: Describe + Send + Sync> FacadeBuilder<T> {
    /// Printable: stream-insertion through `Display`.
    pub fn printable(mut self) -> Self
    where
        T: fmt::Display,
    {
        self.vt.print = Some(print_impl::<T>);
        self
    }

    /// Stringable: explicit string conversion.
    pub fn stringable(mut self) -> Self
    where
        T: ToString,
    {
        self.vt.to_string = Some(to_string_impl::<T>);
        self
    }

    /// Comparable: equality.
    pub fn comparable(mut self) -> Self
    where
        T: PartialEq,
    {
        self.vt.equals = Some(equals_impl::<T>);
        self
    }

    /// Comparable: ordering on top of equality.
    pub fn ordered(mut self) -> Self
    where
        T: PartialOrd,
    {
        self.vt.less = Some(less_impl::<T>);
        self
    }

    /// Serializable: the type's [`TextSerial`] hook.
    pub fn serializable(mut self) -> Self
    where
        T: TextSerial,
    {
        self.vt.serialize = Some(serialize_impl::<T>);
        self.vt.deserialize = Some(deserialize_impl::<T>);
        self
    }

    /// Cloneable: deep copy through `Clone`.
    pub fn cloneable(mut self) -> Self
    where
        T: Clone,
    {
        self.vt.clone_fn = Some(clone_impl::<T>);
        self
    }

    /// Callable: the type's [`DynCall`] hook.
    pub fn callable(mut self) -> Self
    where
        T: DynCall,
    {
        self.vt.call = Some(call_impl::<T>);
        self
    }

    /// Finish the table.
    pub fn build(self) -> FacadeVTable {
        self.vt
    }
}
