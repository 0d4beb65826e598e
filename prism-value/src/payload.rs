//! Storage behind a [`BoxedValue`](crate::BoxedValue): a sum of empty,
//! inline-small, heap-boxed and borrowed-reference forms.
//!
//! The choice of form is invisible to callers; everything reaches the
//! payload through `as_any`/`as_any_mut`.

use core::any::{Any, TypeId};
use core::mem::{align_of, size_of};
use core::ptr::NonNull;

use prism_core::{Describe, TypeTraits};
use static_assertions::{const_assert, const_assert_eq};

/// Payloads no larger than this (and no more aligned than
/// [`INLINE_ALIGN`]) are stored inline instead of spilling to the heap.
pub(crate) const INLINE_SIZE: usize = 24;
pub(crate) const INLINE_ALIGN: usize = 8;

/// Backing bytes for the inline form. The alignment of this struct is the
/// alignment guarantee the inline form hands out.
#[repr(C, align(8))]
#[derive(Clone, Copy)]
struct InlineBytes([u8; INLINE_SIZE]);

const_assert_eq!(align_of::<InlineBytes>(), INLINE_ALIGN);
const_assert!(size_of::<u64>() <= INLINE_SIZE);
const_assert!(size_of::<(u64, u64, u64)>() <= INLINE_SIZE);

/// Inline storage: raw bytes plus monomorphized reify functions that turn
/// the buffer back into a `dyn Any` view of the stored type.
pub(crate) struct InlineSlot {
    bytes: InlineBytes,
    ty: TypeId,
    reify: fn(*const u8) -> *const (dyn Any + Send + Sync),
    reify_mut: fn(*mut u8) -> *mut (dyn Any + Send + Sync),
}

fn reify_inline<T: Any + Send + Sync>(p: *const u8) -> *const (dyn Any + Send + Sync) {
    p as *const T as *const (dyn Any + Send + Sync)
}

fn reify_inline_mut<T: Any + Send + Sync>(p: *mut u8) -> *mut (dyn Any + Send + Sync) {
    p as *mut T as *mut (dyn Any + Send + Sync)
}

/// A non-owning payload: type-erased pointer into external storage.
///
/// Carries no lifetime; the constructors on [`crate::BoxedValue`] are
/// `unsafe` and make the caller promise the referent outlives the handle
/// and is not accessed concurrently with it.
pub(crate) struct BorrowedSlot {
    ptr: NonNull<()>,
    ty: TypeId,
    reify: fn(NonNull<()>) -> *const (dyn Any + Send + Sync),
    reify_mut: Option<fn(NonNull<()>) -> *mut (dyn Any + Send + Sync)>,
}

// SAFETY: the borrow constructors require the referent to be `Send + Sync`
// and the caller to uphold the exclusive-access contract; the slot itself
// is just a pointer and some fn pointers.
unsafe impl Send for BorrowedSlot {}
unsafe impl Sync for BorrowedSlot {}

fn reify_borrow<T: Any + Send + Sync>(p: NonNull<()>) -> *const (dyn Any + Send + Sync) {
    p.cast::<T>().as_ptr() as *const (dyn Any + Send + Sync)
}

fn reify_borrow_mut<T: Any + Send + Sync>(p: NonNull<()>) -> *mut (dyn Any + Send + Sync) {
    p.cast::<T>().as_ptr() as *mut (dyn Any + Send + Sync)
}

/// The storage forms of a value.
pub(crate) enum Payload {
    /// No payload: a void/undefined value.
    Empty,
    /// Small trivial payload stored in place.
    Inline(InlineSlot),
    /// Heap-owned payload.
    Boxed(Box<dyn Any + Send + Sync>),
    /// Non-owning pointer into external storage.
    Borrowed(BorrowedSlot),
}

impl Payload {
    /// Owning payload for `value`. Small trivial types stay inline,
    /// everything else is boxed.
    pub(crate) fn own<T: Describe + Send + Sync>(value: T) -> Payload {
        if T::TRAITS.contains(TypeTraits::TRIVIAL)
            && size_of::<T>() <= INLINE_SIZE
            && align_of::<T>() <= INLINE_ALIGN
        {
            let mut slot = InlineSlot {
                bytes: InlineBytes([0; INLINE_SIZE]),
                ty: TypeId::of::<T>(),
                reify: reify_inline::<T>,
                reify_mut: reify_inline_mut::<T>,
            };
            // SAFETY: the buffer is INLINE_ALIGN-aligned and large enough;
            // a TRIVIAL type has no drop glue, so forgetting the source
            // after the byte copy loses nothing.
            unsafe {
                core::ptr::copy_nonoverlapping(
                    (&raw const value).cast::<u8>(),
                    slot.bytes.0.as_mut_ptr(),
                    size_of::<T>(),
                );
            }
            core::mem::forget(value);
            Payload::Inline(slot)
        } else {
            Payload::Boxed(Box::new(value))
        }
    }

    /// Non-owning shared payload. See [`BorrowedSlot`] for the contract.
    pub(crate) fn borrowed_const<T: Any + Send + Sync>(target: &T) -> Payload {
        Payload::Borrowed(BorrowedSlot {
            ptr: NonNull::from(target).cast::<()>(),
            ty: TypeId::of::<T>(),
            reify: reify_borrow::<T>,
            reify_mut: None,
        })
    }

    /// Non-owning exclusive payload. See [`BorrowedSlot`] for the contract.
    pub(crate) fn borrowed_mut<T: Any + Send + Sync>(target: &mut T) -> Payload {
        Payload::Borrowed(BorrowedSlot {
            ptr: NonNull::from(target).cast::<()>(),
            ty: TypeId::of::<T>(),
            reify: reify_borrow::<T>,
            reify_mut: Some(reify_borrow_mut::<T>),
        })
    }

    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// `TypeId` of the stored concrete type, `None` when empty.
    pub(crate) fn type_id(&self) -> Option<TypeId> {
        match self {
            Payload::Empty => None,
            Payload::Inline(slot) => Some(slot.ty),
            Payload::Boxed(b) => Some((**b).type_id()),
            Payload::Borrowed(s) => Some(s.ty),
        }
    }

    /// True when the payload can be written through (owned, or borrowed
    /// from a mutable place).
    pub(crate) fn writable(&self) -> bool {
        match self {
            Payload::Empty => false,
            Payload::Inline(_) | Payload::Boxed(_) => true,
            Payload::Borrowed(s) => s.reify_mut.is_some(),
        }
    }

    /// Shared view of the payload.
    pub(crate) fn as_any(&self) -> Option<&(dyn Any + Send + Sync)> {
        match self {
            Payload::Empty => None,
            // SAFETY: the pointer reifies the buffer this slot owns; the
            // view borrows `self`.
            Payload::Inline(slot) => Some(unsafe { &*(slot.reify)(slot.bytes.0.as_ptr()) }),
            Payload::Boxed(b) => Some(b.as_ref()),
            // SAFETY: the borrow constructor's contract guarantees the
            // referent is alive and not being written elsewhere.
            Payload::Borrowed(s) => Some(unsafe { &*(s.reify)(s.ptr) }),
        }
    }

    /// Exclusive view of the payload. `None` when empty or when the payload
    /// is a const borrow.
    pub(crate) fn as_any_mut(&mut self) -> Option<&mut (dyn Any + Send + Sync)> {
        match self {
            Payload::Empty => None,
            // SAFETY: as in `as_any`, plus `&mut self` makes the view
            // exclusive.
            Payload::Inline(slot) => {
                Some(unsafe { &mut *(slot.reify_mut)(slot.bytes.0.as_mut_ptr()) })
            }
            Payload::Boxed(b) => Some(b.as_mut()),
            // SAFETY: `reify_mut` only exists when the payload was borrowed
            // from a mutable place; the constructor's contract covers
            // aliasing.
            Payload::Borrowed(s) => {
                let reify_mut = s.reify_mut?;
                Some(unsafe { &mut *reify_mut(s.ptr) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_trivial_payloads_go_inline() {
        let p = Payload::own(42_i32);
        assert!(matches!(p, Payload::Inline(_)));
        assert_eq!(p.as_any().and_then(|a| a.downcast_ref::<i32>()), Some(&42));
    }

    #[test]
    fn large_payloads_spill_to_the_heap() {
        let p = Payload::own(String::from("heap"));
        assert!(matches!(p, Payload::Boxed(_)));
        assert_eq!(
            p.as_any().and_then(|a| a.downcast_ref::<String>()).map(String::as_str),
            Some("heap")
        );
    }

    #[test]
    fn large_trivial_payloads_are_not_inlined() {
        let p = Payload::own([7_u64; 4]);
        assert!(matches!(p, Payload::Boxed(_)));
        assert_eq!(
            p.as_any().and_then(|a| a.downcast_ref::<[u64; 4]>()),
            Some(&[7, 7, 7, 7])
        );
    }
}
