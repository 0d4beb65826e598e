//! Tracks which structural traits a described type carries at runtime.

use bitflags::bitflags;

bitflags! {
    /// Bitset flagging the structural traits of a type.
    ///
    /// The flag set and its bit order are part of the diagnostic surface:
    /// [`TypeDescriptor::to_json`](crate::TypeDescriptor::to_json) emits one
    /// boolean per flag, in bit index order.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TypeTraits: u32 {
        /// The payload is immutable through this descriptor.
        const CONST = 1 << 0;
        /// The descriptor stands for a borrowed form of the bare type.
        const REFERENCE = 1 << 1;
        /// Raw or smart pointer (`*const T`, `*mut T`, `Box`, `Arc`, `Rc`).
        const POINTER = 1 << 2;
        /// The unit/void type.
        const VOID = 1 << 3;
        /// Integer, floating point, `bool` or `char`.
        const ARITHMETIC = 1 << 4;
        /// Array or slice of elements.
        const ARRAY = 1 << 5;
        /// Array with a statically known length (`[T; N]`).
        const BOUNDED_ARRAY = 1 << 6;
        /// Slice with a dynamic length (`[T]`, `&[T]`).
        const UNBOUNDED_ARRAY = 1 << 7;
        /// An enum type.
        const ENUM = 1 << 8;
        /// An enum whose variants do not leak into the enclosing scope.
        /// Every Rust enum qualifies; the distinction matters for
        /// foreign-type descriptors.
        const SCOPED_ENUM = 1 << 9;
        /// A struct or other user-defined aggregate.
        const CLASS = 1 << 10;
        /// A function or function-object type.
        const FUNCTION = 1 << 11;
        /// Plain bits: no drop glue, bitwise-copyable.
        const TRIVIAL = 1 << 12;
        /// Layout is defined field-by-field (`repr(C)`-like guarantees).
        const STANDARD_LAYOUT = 1 << 13;
        /// Implements `Default`.
        const DEFAULT_CONSTRUCTIBLE = 1 << 14;
        /// Can be moved (every Rust type; kept for foreign descriptors).
        const MOVABLE = 1 << 15;
        /// Implements `Clone`.
        const COPYABLE = 1 << 16;
        /// Constructible from a plain field list.
        const AGGREGATE = 1 << 17;
        /// Cannot be further derived from.
        const FINAL = 1 << 18;
        /// Cannot be instantiated directly (trait-object-like).
        const ABSTRACT = 1 << 19;
        /// Dispatches through a vtable at runtime.
        const POLYMORPHIC = 1 << 20;
        /// Zero-sized.
        const EMPTY = 1 << 21;
        /// The undefined descriptor. Set on nothing else.
        const UNDEFINED = 1 << 22;
    }
}

impl TypeTraits {
    /// JSON key for every flag, in bit index order.
    pub(crate) const JSON_NAMES: &'static [(TypeTraits, &'static str)] = &[
        (TypeTraits::CONST, "isConst"),
        (TypeTraits::REFERENCE, "isReference"),
        (TypeTraits::POINTER, "isPointer"),
        (TypeTraits::VOID, "isVoid"),
        (TypeTraits::ARITHMETIC, "isArithmetic"),
        (TypeTraits::ARRAY, "isArray"),
        (TypeTraits::BOUNDED_ARRAY, "isBoundedArray"),
        (TypeTraits::UNBOUNDED_ARRAY, "isUnboundedArray"),
        (TypeTraits::ENUM, "isEnum"),
        (TypeTraits::SCOPED_ENUM, "isScopedEnum"),
        (TypeTraits::CLASS, "isClass"),
        (TypeTraits::FUNCTION, "isFunction"),
        (TypeTraits::TRIVIAL, "isTrivial"),
        (TypeTraits::STANDARD_LAYOUT, "isStandardLayout"),
        (TypeTraits::DEFAULT_CONSTRUCTIBLE, "isDefaultConstructible"),
        (TypeTraits::MOVABLE, "isMovable"),
        (TypeTraits::COPYABLE, "isCopyable"),
        (TypeTraits::AGGREGATE, "isAggregate"),
        (TypeTraits::FINAL, "isFinal"),
        (TypeTraits::ABSTRACT, "isAbstract"),
        (TypeTraits::POLYMORPHIC, "isPolymorphic"),
        (TypeTraits::EMPTY, "isEmpty"),
        (TypeTraits::UNDEFINED, "isUndefined"),
    ];

    /// Flags shared by every arithmetic scalar.
    pub const SCALAR: TypeTraits = TypeTraits::ARITHMETIC
        .union(TypeTraits::TRIVIAL)
        .union(TypeTraits::STANDARD_LAYOUT)
        .union(TypeTraits::DEFAULT_CONSTRUCTIBLE)
        .union(TypeTraits::MOVABLE)
        .union(TypeTraits::COPYABLE)
        .union(TypeTraits::FINAL);

    /// Flags shared by ordinary owned user/container types.
    pub const OBJECT: TypeTraits = TypeTraits::CLASS.union(TypeTraits::MOVABLE);
}
