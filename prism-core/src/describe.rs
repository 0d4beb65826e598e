//! The [`Describe`] trait: the source of [`TypeDescriptor`]s.
//!
//! Implementations for the standard surface live here; downstream types opt
//! in with the [`describe_type!`](crate::describe_type) macro.

use crate::{TypeDescriptor, TypeTraits};

/// Allows deriving a [`TypeDescriptor`] from a type.
///
/// Rust cannot inspect an arbitrary `T` for structural traits without
/// specialization, so every described type declares its [`TypeTraits`],
/// either through one of the blanket/std impls in this module or through
/// [`describe_type!`](crate::describe_type).
pub trait Describe: Sized + 'static {
    /// Declared trait flags for this type.
    const TRAITS: TypeTraits;

    /// Human-readable name; defaults to the compiler-provided one.
    fn type_name() -> &'static str {
        core::any::type_name::<Self>()
    }

    /// The descriptor for this type. The same type always yields an equal
    /// descriptor.
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::from_parts::<Self>(Self::type_name(), Self::TRAITS)
    }
}

/// Descriptor derived from a value. Rust resolves the static type; dynamic
/// hierarchies are modelled as concrete handle types, so the static type is
/// the dynamic one.
#[inline]
pub fn for_instance<T: Describe>(_value: &T) -> TypeDescriptor {
    TypeDescriptor::of::<T>()
}

/// Pointer-shaped wrappers inherit the arithmetic flag of their pointee,
/// mirroring how the descriptor treats a pointer-to-scalar as scalar-like.
const fn pointer_traits(inner: TypeTraits, base: TypeTraits) -> TypeTraits {
    if inner.contains(TypeTraits::ARITHMETIC) {
        base.union(TypeTraits::ARITHMETIC)
    } else {
        base
    }
}

/// Element containers copy trivial-ness from the element where it matters
/// (fixed arrays are plain bits exactly when their elements are).
const fn array_traits(inner: TypeTraits) -> TypeTraits {
    let base = TypeTraits::ARRAY
        .union(TypeTraits::BOUNDED_ARRAY)
        .union(TypeTraits::MOVABLE);
    if inner.contains(TypeTraits::TRIVIAL) {
        base.union(TypeTraits::TRIVIAL).union(TypeTraits::COPYABLE)
    } else {
        base
    }
}

macro_rules! impl_describe {
    ($($t:ty => $traits:expr;)*) => {
        $(
            impl Describe for $t {
                const TRAITS: TypeTraits = $traits;
            }
        )*
    };
}

impl_describe! {
    u8 => TypeTraits::SCALAR;
    u16 => TypeTraits::SCALAR;
    u32 => TypeTraits::SCALAR;
    u64 => TypeTraits::SCALAR;
    u128 => TypeTraits::SCALAR;
    usize => TypeTraits::SCALAR;
    i8 => TypeTraits::SCALAR;
    i16 => TypeTraits::SCALAR;
    i32 => TypeTraits::SCALAR;
    i64 => TypeTraits::SCALAR;
    i128 => TypeTraits::SCALAR;
    isize => TypeTraits::SCALAR;
    f32 => TypeTraits::SCALAR;
    f64 => TypeTraits::SCALAR;
    bool => TypeTraits::SCALAR;
    char => TypeTraits::SCALAR;
}

impl_describe! {
    () => TypeTraits::VOID
        .union(TypeTraits::EMPTY)
        .union(TypeTraits::TRIVIAL)
        .union(TypeTraits::STANDARD_LAYOUT)
        .union(TypeTraits::DEFAULT_CONSTRUCTIBLE)
        .union(TypeTraits::MOVABLE)
        .union(TypeTraits::COPYABLE);
    String => TypeTraits::CLASS
        .union(TypeTraits::DEFAULT_CONSTRUCTIBLE)
        .union(TypeTraits::MOVABLE)
        .union(TypeTraits::COPYABLE)
        .union(TypeTraits::FINAL);
    &'static str => TypeTraits::REFERENCE
        .union(TypeTraits::MOVABLE)
        .union(TypeTraits::COPYABLE)
        .union(TypeTraits::FINAL);
}

impl<T: Describe> Describe for Vec<T> {
    const TRAITS: TypeTraits = TypeTraits::OBJECT.union(TypeTraits::DEFAULT_CONSTRUCTIBLE);
}

impl<T: Describe> Describe for std::collections::VecDeque<T> {
    const TRAITS: TypeTraits = TypeTraits::OBJECT.union(TypeTraits::DEFAULT_CONSTRUCTIBLE);
}

impl<T: Describe> Describe for Option<T> {
    const TRAITS: TypeTraits = TypeTraits::ENUM
        .union(TypeTraits::SCOPED_ENUM)
        .union(TypeTraits::DEFAULT_CONSTRUCTIBLE)
        .union(TypeTraits::MOVABLE);
}

impl<K: Describe, V: Describe> Describe for std::collections::HashMap<K, V> {
    const TRAITS: TypeTraits = TypeTraits::OBJECT.union(TypeTraits::DEFAULT_CONSTRUCTIBLE);
}

impl<K: Describe, V: Describe> Describe for std::collections::BTreeMap<K, V> {
    const TRAITS: TypeTraits = TypeTraits::OBJECT.union(TypeTraits::DEFAULT_CONSTRUCTIBLE);
}

impl<T: Describe> Describe for std::collections::HashSet<T> {
    const TRAITS: TypeTraits = TypeTraits::OBJECT.union(TypeTraits::DEFAULT_CONSTRUCTIBLE);
}

impl<T: Describe> Describe for std::collections::BTreeSet<T> {
    const TRAITS: TypeTraits = TypeTraits::OBJECT.union(TypeTraits::DEFAULT_CONSTRUCTIBLE);
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    const TRAITS: TypeTraits = array_traits(T::TRAITS);
}

impl<T: Describe> Describe for &'static [T] {
    const TRAITS: TypeTraits = TypeTraits::ARRAY
        .union(TypeTraits::UNBOUNDED_ARRAY)
        .union(TypeTraits::REFERENCE)
        .union(TypeTraits::MOVABLE)
        .union(TypeTraits::COPYABLE);
}

impl<T: Describe> Describe for &'static T {
    const TRAITS: TypeTraits = pointer_traits(
        T::TRAITS,
        TypeTraits::REFERENCE
            .union(TypeTraits::TRIVIAL)
            .union(TypeTraits::MOVABLE)
            .union(TypeTraits::COPYABLE),
    );
}

impl<T: Describe> Describe for *const T {
    const TRAITS: TypeTraits = pointer_traits(
        T::TRAITS,
        TypeTraits::POINTER
            .union(TypeTraits::TRIVIAL)
            .union(TypeTraits::MOVABLE)
            .union(TypeTraits::COPYABLE),
    );
}

impl<T: Describe> Describe for *mut T {
    const TRAITS: TypeTraits = pointer_traits(
        T::TRAITS,
        TypeTraits::POINTER
            .union(TypeTraits::TRIVIAL)
            .union(TypeTraits::MOVABLE)
            .union(TypeTraits::COPYABLE),
    );
}

impl<T: Describe> Describe for Box<T> {
    const TRAITS: TypeTraits =
        pointer_traits(T::TRAITS, TypeTraits::POINTER.union(TypeTraits::MOVABLE));
}

impl<T: Describe> Describe for std::sync::Arc<T> {
    const TRAITS: TypeTraits = pointer_traits(
        T::TRAITS,
        TypeTraits::POINTER
            .union(TypeTraits::MOVABLE)
            .union(TypeTraits::COPYABLE),
    );
}

impl<T: Describe> Describe for std::rc::Rc<T> {
    const TRAITS: TypeTraits = pointer_traits(
        T::TRAITS,
        TypeTraits::POINTER
            .union(TypeTraits::MOVABLE)
            .union(TypeTraits::COPYABLE),
    );
}

macro_rules! impl_describe_tuple {
    ($($name:ident),+) => {
        impl<$($name: Describe),+> Describe for ($($name,)+) {
            const TRAITS: TypeTraits = TypeTraits::CLASS
                .union(TypeTraits::AGGREGATE)
                .union(TypeTraits::MOVABLE);
        }
    };
}

impl_describe_tuple!(A);
impl_describe_tuple!(A, B);
impl_describe_tuple!(A, B, C);
impl_describe_tuple!(A, B, C, D);

/// Implement [`Describe`] for a downstream type with declared trait flags.
///
/// ```
/// # use prism_core::describe_type;
/// struct Sensor {
///     gain: f64,
/// }
///
/// describe_type!(Sensor => CLASS | DEFAULT_CONSTRUCTIBLE | MOVABLE);
/// ```
///
/// Without a flag list the type is declared as a plain movable class.
#[macro_export]
macro_rules! describe_type {
    ($t:ty) => {
        $crate::describe_type!($t => CLASS | MOVABLE);
    };
    ($t:ty => $($flag:ident)|+) => {
        impl $crate::Describe for $t {
            const TRAITS: $crate::TypeTraits =
                $crate::TypeTraits::from_bits_retain($($crate::TypeTraits::$flag.bits())|+);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_arithmetic() {
        assert!(TypeDescriptor::of::<i32>().has_trait(TypeTraits::ARITHMETIC));
        assert!(TypeDescriptor::of::<f64>().has_trait(TypeTraits::TRIVIAL));
        assert!(!TypeDescriptor::of::<String>().has_trait(TypeTraits::ARITHMETIC));
    }

    #[test]
    fn pointers_to_scalars_stay_arithmetic() {
        let d = TypeDescriptor::of::<*const i32>();
        assert!(d.has_trait(TypeTraits::POINTER));
        assert!(d.has_trait(TypeTraits::ARITHMETIC));
        assert!(d.bare_equals(&TypeDescriptor::of::<i32>()));
    }

    #[test]
    fn unit_is_void_and_empty() {
        let d = TypeDescriptor::of::<()>();
        assert!(d.has_trait(TypeTraits::VOID));
        assert!(d.has_trait(TypeTraits::EMPTY));
    }
}
