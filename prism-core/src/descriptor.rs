//! Compact, comparable identity for a concrete type.

use core::any::TypeId;
use core::fmt;
use std::borrow::Cow;

use crate::TypeTraits;

/// Marker behind the undefined descriptor's identity.
struct UndefinedMarker;

/// Decoration bits layered on top of a base [`TypeId`].
///
/// Rust's `TypeId` cannot be derived for non-`'static` borrows, so borrowed
/// and pointer-decorated descriptors keep the bare type's id and record the
/// decoration here; the pair is the identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decor(u8);

impl Decor {
    const REFERENCE: u8 = 1 << 0;
    const CONST: u8 = 1 << 1;
    const POINTER: u8 = 1 << 2;

    /// No decoration.
    pub const NONE: Decor = Decor(0);
}

/// Process-stable identity of a described type.
///
/// Opaque, but ordered and hashable so it can key maps. Two descriptors are
/// equal exactly when their ids are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorId {
    base: TypeId,
    decor: Decor,
}

impl DescriptorId {
    /// The identity of the bare (undecorated) form of this type.
    #[inline]
    pub fn bare(self) -> DescriptorId {
        DescriptorId {
            base: self.base,
            decor: Decor::NONE,
        }
    }

    /// The underlying `TypeId` of the bare type.
    #[inline]
    pub fn type_id(self) -> TypeId {
        self.base
    }
}

/// Immutable, cheaply-copyable identity + trait bitset for one type.
///
/// Create one with [`TypeDescriptor::of`] (for a [`Describe`] type), derive
/// one from a value with [`for_instance`], or take the unique
/// [`undefined`](TypeDescriptor::undefined) descriptor.
///
/// [`Describe`]: crate::Describe
/// [`for_instance`]: crate::for_instance
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    id: DescriptorId,
    display_name: Cow<'static, str>,
    bare_name: Cow<'static, str>,
    bare_id: u64,
    traits: TypeTraits,
}

impl TypeDescriptor {
    /// Descriptor for a described type. The same `T` always yields an equal
    /// descriptor; creation is infallible.
    #[inline]
    pub fn of<T: crate::Describe>() -> TypeDescriptor {
        T::descriptor()
    }

    /// Assemble a descriptor from a static name and declared traits.
    ///
    /// This is the primitive [`Describe`](crate::Describe) implementations
    /// build on; prefer [`TypeDescriptor::of`] everywhere else.
    pub fn from_parts<T: 'static>(display_name: &'static str, traits: TypeTraits) -> TypeDescriptor {
        let bare_name = bare_name_of(display_name);
        let bare_id = fnv1a(bare_name.as_bytes());
        TypeDescriptor {
            id: DescriptorId {
                base: TypeId::of::<T>(),
                decor: Decor::NONE,
            },
            display_name: Cow::Borrowed(display_name),
            bare_name,
            bare_id,
            traits,
        }
    }

    /// The undefined descriptor: equal only to itself, carries only the
    /// `UNDEFINED` trait.
    pub fn undefined() -> TypeDescriptor {
        TypeDescriptor {
            id: DescriptorId {
                base: TypeId::of::<UndefinedMarker>(),
                decor: Decor::NONE,
            },
            display_name: Cow::Borrowed("undefined"),
            bare_name: Cow::Borrowed("undefined"),
            bare_id: fnv1a(b"undefined"),
            traits: TypeTraits::UNDEFINED,
        }
    }

    /// Opaque identity. Suitable as a map key.
    #[inline]
    pub fn id(&self) -> DescriptorId {
        self.id
    }

    /// Demangled, human-readable type name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.display_name
    }

    /// The name stripped of reference, const and pointer decoration.
    #[inline]
    pub fn bare_name(&self) -> &str {
        &self.bare_name
    }

    /// The trait bitset.
    #[inline]
    pub fn traits(&self) -> TypeTraits {
        self.traits
    }

    /// True when the given trait flag is set.
    #[inline]
    pub fn has_trait(&self, flag: TypeTraits) -> bool {
        self.traits.contains(flag)
    }

    /// True for the undefined descriptor only.
    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.traits.contains(TypeTraits::UNDEFINED)
    }

    /// Identity comparison. Equivalent to `==`.
    #[inline]
    pub fn equals(&self, other: &TypeDescriptor) -> bool {
        self.id == other.id
    }

    /// True when both descriptors denote the same bare type, ignoring
    /// reference, const and pointer decoration.
    #[inline]
    pub fn bare_equals(&self, other: &TypeDescriptor) -> bool {
        self.bare_id == other.bare_id
    }

    /// Strict ordering by identity.
    #[inline]
    pub fn less(&self, other: &TypeDescriptor) -> bool {
        self.id < other.id
    }

    /// A copy of this descriptor decorated as a borrowed form: display name
    /// gains a `&`, the `REFERENCE` trait is set, bare identity is kept.
    pub fn as_reference(&self) -> TypeDescriptor {
        let mut d = self.clone();
        d.id.decor.0 |= Decor::REFERENCE;
        d.display_name = Cow::Owned(format!("&{}", self.display_name));
        d.traits |= TypeTraits::REFERENCE;
        d
    }

    /// A copy of this descriptor with the `CONST` trait set. The display
    /// name is unchanged; Rust has no const-decorated spelling.
    pub fn as_const(&self) -> TypeDescriptor {
        let mut d = self.clone();
        d.id.decor.0 |= Decor::CONST;
        d.traits |= TypeTraits::CONST;
        d
    }

    /// A copy of this descriptor decorated as a raw pointer form.
    pub fn as_pointer(&self) -> TypeDescriptor {
        let mut d = self.clone();
        d.id.decor.0 |= Decor::POINTER;
        d.display_name = Cow::Owned(format!("*const {}", self.display_name));
        d.traits |= TypeTraits::POINTER;
        d
    }

    /// A copy of this descriptor with all decoration removed.
    pub fn undecorated(&self) -> TypeDescriptor {
        let mut d = self.clone();
        d.id.decor = Decor::NONE;
        d.display_name = match &self.bare_name {
            Cow::Borrowed(b) => Cow::Borrowed(*b),
            Cow::Owned(o) => Cow::Owned(o.clone()),
        };
        d.traits -= TypeTraits::REFERENCE | TypeTraits::CONST | TypeTraits::POINTER;
        d
    }

    /// Serialize the descriptor to its JSON diagnostic form:
    /// `{"typeName":…, "bareTypeName":…, "traits":{…}}`.
    ///
    /// Trait keys appear in bit index order, every flag present as a boolean.
    pub fn to_json(&self) -> String {
        use core::fmt::Write;

        let mut out = String::with_capacity(512);
        let _ = write!(
            out,
            "{{\"typeName\":\"{}\",\"bareTypeName\":\"{}\",\"traits\":{{",
            self.display_name, self.bare_name
        );
        for (i, (flag, key)) in TypeTraits::JSON_NAMES.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "\"{key}\":{}", self.traits.contains(*flag));
        }
        out.push_str("}}");
        out
    }
}

impl PartialEq for TypeDescriptor {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl PartialOrd for TypeDescriptor {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeDescriptor {
    #[inline]
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl core::hash::Hash for TypeDescriptor {
    #[inline]
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// FNV-1a over the bare name. Stable across processes, unlike `TypeId`.
pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Strip reference, pointer and smart-pointer decoration from a type name.
fn bare_name_of(full: &str) -> Cow<'_, str> {
    let mut s = full.trim();
    loop {
        if let Some(rest) = s.strip_prefix("&mut ") {
            s = rest.trim_start();
            continue;
        }
        if let Some(rest) = s.strip_prefix('&') {
            let rest = rest.trim_start();
            // Skip a lifetime if the name carries one (`&'a T`).
            s = match rest.strip_prefix('\'') {
                Some(_) => rest.split_once(' ').map_or(rest, |(_, t)| t).trim_start(),
                None => rest,
            };
            continue;
        }
        if let Some(rest) = s.strip_prefix("*const ") {
            s = rest.trim_start();
            continue;
        }
        if let Some(rest) = s.strip_prefix("*mut ") {
            s = rest.trim_start();
            continue;
        }
        if let Some(inner) = unwrap_smart_pointer(s) {
            s = inner;
            continue;
        }
        break;
    }
    if s.len() == full.len() {
        Cow::Borrowed(full)
    } else {
        Cow::Owned(s.to_string())
    }
}

/// Peel one `Box<…>` / `Arc<…>` / `Rc<…>` layer, path-qualified or not.
fn unwrap_smart_pointer(s: &str) -> Option<&str> {
    const WRAPPERS: &[&str] = &[
        "alloc::boxed::Box",
        "std::boxed::Box",
        "Box",
        "alloc::sync::Arc",
        "std::sync::Arc",
        "Arc",
        "alloc::rc::Rc",
        "std::rc::Rc",
        "Rc",
    ];
    for w in WRAPPERS {
        if let Some(rest) = s.strip_prefix(w)
            && let Some(inner) = rest.strip_prefix('<')
            && let Some(inner) = inner.strip_suffix('>')
        {
            return Some(inner.trim());
        }
    }
    None
}
