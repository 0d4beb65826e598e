//! Capability probing via autoref specialization.
//!
//! Each skill gets a pair of traits: a specialized impl on [`Probe<T>`]
//! that applies when the concrete type satisfies the capability, and a
//! fallback impl on `&Probe<T>` that always applies. A method call through
//! an `&Probe<T>` receiver resolves to the specialized impl when its bound
//! holds and to the fallback otherwise: the "does this expression
//! compile?" test, done on stable.
//!
//! This only works when `T` is spelled concretely, which is exactly the
//! contract: probing happens once, at registration time, never in generic
//! code. Use the [`probe_facade!`](crate::probe_facade) macro rather than
//! calling the probe methods directly.

use core::any::Any;
use core::fmt;
use core::marker::PhantomData;

use crate::facade::hooks::{DynCall, TextSerial};
use crate::facade::vtable::{
    CallFn, CloneFn, DeserializeFn, EqualsFn, LessFn, PrintFn, SerializeFn, ToStringFn, call_impl,
    clone_impl, deserialize_impl, equals_impl, less_impl, print_impl, serialize_impl,
    to_string_impl,
};

/// Probe receiver. Carries only the type being probed.
pub struct Probe<T>(PhantomData<T>);

impl<T> Probe<T> {
    /// A probe for `T`.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Probe<T> {
        Probe(PhantomData)
    }
}

macro_rules! probe_pair {
    (
        $(#[$doc:meta])*
        $yes:ident / $no:ident : $method:ident -> $fnty:ty { $($bound:tt)+ } = $entry:expr
    ) => {
        $(#[$doc])*
        pub trait $yes {
            /// The skill entry point, when the capability holds.
            fn $method(&self) -> Option<$fnty>;
        }

        impl<T: $($bound)+> $yes for Probe<T> {
            #[inline]
            fn $method(&self) -> Option<$fnty> {
                Some($entry)
            }
        }

        /// Fallback when the capability is absent.
        pub trait $no {
            /// Always `None`.
            fn $method(&self) -> Option<$fnty>;
        }

        impl<T> $no for &Probe<T> {
            #[inline]
            fn $method(&self) -> Option<$fnty> {
                None
            }
        }
    };
}

probe_pair! {
    /// Printable probe: `Display`.
    ProbePrint / ProbePrintFallback : probe_print -> PrintFn
        { Any + fmt::Display } = print_impl::<T>
}

probe_pair! {
    /// Stringable probe: `ToString`.
    ProbeToString / ProbeToStringFallback : probe_to_string -> ToStringFn
        { Any + ToString } = to_string_impl::<T>
}

probe_pair! {
    /// Comparable probe: `PartialEq`.
    ProbeEquals / ProbeEqualsFallback : probe_equals -> EqualsFn
        { Any + PartialEq } = equals_impl::<T>
}

probe_pair! {
    /// Ordering probe: `PartialOrd`.
    ProbeLess / ProbeLessFallback : probe_less -> LessFn
        { Any + PartialOrd } = less_impl::<T>
}

probe_pair! {
    /// Serializable probe: the [`TextSerial`] hook.
    ProbeSerialize / ProbeSerializeFallback : probe_serialize -> SerializeFn
        { Any + TextSerial } = serialize_impl::<T>
}

probe_pair! {
    /// Deserialization half of the Serializable probe.
    ProbeDeserialize / ProbeDeserializeFallback : probe_deserialize -> DeserializeFn
        { Any + TextSerial } = deserialize_impl::<T>
}

probe_pair! {
    /// Cloneable probe: `Clone`.
    ProbeClone / ProbeCloneFallback : probe_clone -> CloneFn
        { Any + Clone + Send + Sync } = clone_impl::<T>
}

probe_pair! {
    /// Callable probe: the [`DynCall`] hook.
    ProbeCall / ProbeCallFallback : probe_call -> CallFn
        { Any + DynCall } = call_impl::<T>
}

/// Build a [`FacadeVTable`](crate::facade::FacadeVTable) for a concrete
/// type by probing every skill it satisfies.
///
/// ```
/// # use prism_value::probe_facade;
/// #[derive(Clone, PartialEq)]
/// struct Reading(f64);
///
/// prism_core::describe_type!(Reading => CLASS | MOVABLE | COPYABLE);
///
/// let vt = probe_facade!(Reading);
/// assert!(vt.equals.is_some());   // PartialEq probed
/// assert!(vt.clone_fn.is_some()); // Clone probed
/// assert!(vt.print.is_none());    // no Display on Reading
/// ```
#[macro_export]
macro_rules! probe_facade {
    ($t:ty) => {{
        #[allow(unused_imports)]
        use $crate::facade::probe::{
            ProbeCall, ProbeCallFallback, ProbeClone, ProbeCloneFallback, ProbeDeserialize,
            ProbeDeserializeFallback, ProbeEquals, ProbeEqualsFallback, ProbeLess,
            ProbeLessFallback, ProbePrint, ProbePrintFallback, ProbeSerialize,
            ProbeSerializeFallback, ProbeToString, ProbeToStringFallback,
        };
        let probe = $crate::facade::probe::Probe::<$t>::new();
        let mut vt = $crate::facade::FacadeVTable::empty::<$t>();
        vt.print = (&probe).probe_print();
        vt.to_string = (&probe).probe_to_string();
        vt.equals = (&probe).probe_equals();
        vt.less = (&probe).probe_less();
        vt.serialize = (&probe).probe_serialize();
        vt.deserialize = (&probe).probe_deserialize();
        vt.clone_fn = (&probe).probe_clone();
        vt.call = (&probe).probe_call();
        vt
    }};
}
