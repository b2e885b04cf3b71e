//! Heterogeneous user event payloads.
//!
//! Custom events pushed through the event loop carry either a small
//! trivially-copyable payload stored inline (no allocation) or an
//! arbitrary payload boxed on the heap with type-erased destruction.

use bytemuck::Pod;
use std::any::{Any, TypeId};

/// Bytes available for inline payloads: one pointer's worth.
pub const INLINE_CAPACITY: usize = std::mem::size_of::<usize>();

/// A user-defined event payload.
pub enum UserEvent {
    /// Small POD payload stored inline.
    Inline {
        type_id: TypeId,
        len: u8,
        bytes: [u8; INLINE_CAPACITY],
    },
    /// Arbitrary payload boxed on the heap.
    Boxed(Box<dyn Any + Send>),
}

impl UserEvent {
    /// Wrap a payload, storing it inline when it fits a pointer.
    ///
    /// POD payloads larger than [`INLINE_CAPACITY`] fall back to the
    /// boxed representation.
    pub fn small<T: Pod + Send + 'static>(value: T) -> Self {
        let size = std::mem::size_of::<T>();
        if size <= INLINE_CAPACITY {
            let mut bytes = [0u8; INLINE_CAPACITY];
            bytes[..size].copy_from_slice(bytemuck::bytes_of(&value));
            Self::Inline {
                type_id: TypeId::of::<T>(),
                len: size as u8,
                bytes,
            }
        } else {
            Self::boxed(value)
        }
    }

    /// Wrap a payload on the heap.
    pub fn boxed<T: Any + Send>(value: T) -> Self {
        Self::Boxed(Box::new(value))
    }

    /// Recover a POD payload by value, from either representation.
    ///
    /// Returns `None` on a type mismatch.
    pub fn get<T: Pod + 'static>(&self) -> Option<T> {
        match self {
            Self::Inline {
                type_id,
                len,
                bytes,
            } => {
                if *type_id != TypeId::of::<T>() || *len as usize != std::mem::size_of::<T>() {
                    return None;
                }
                Some(bytemuck::pod_read_unaligned(&bytes[..*len as usize]))
            }
            Self::Boxed(any) => any.downcast_ref::<T>().copied(),
        }
    }

    /// Borrow a boxed payload.
    ///
    /// Inline payloads cannot be borrowed (their storage is unaligned);
    /// use [`get`](Self::get) for those.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Inline { .. } => None,
            Self::Boxed(any) => any.downcast_ref::<T>(),
        }
    }

    /// True when the payload is stored inline.
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }
}

impl std::fmt::Debug for UserEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline { type_id, len, .. } => f
                .debug_struct("UserEvent::Inline")
                .field("type_id", type_id)
                .field("len", len)
                .finish(),
            Self::Boxed(_) => f.debug_struct("UserEvent::Boxed").finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_pod_is_stored_inline() {
        let event = UserEvent::small(42u32);
        assert!(event.is_inline());
        assert_eq!(event.get::<u32>(), Some(42));
    }

    #[test]
    fn oversized_pod_falls_back_to_box() {
        #[repr(C)]
        #[derive(Clone, Copy, PartialEq, Debug, bytemuck::Pod, bytemuck::Zeroable)]
        struct Wide([u64; 4]);

        let event = UserEvent::small(Wide([1, 2, 3, 4]));
        assert!(!event.is_inline());
        assert_eq!(event.get::<Wide>(), Some(Wide([1, 2, 3, 4])));
    }

    #[test]
    fn type_mismatch_returns_none() {
        let event = UserEvent::small(1.5f32);
        assert_eq!(event.get::<u32>(), None);
    }

    #[test]
    fn boxed_payload_with_destructor() {
        let event = UserEvent::boxed(String::from("resize"));
        assert_eq!(
            event.downcast_ref::<String>().map(String::as_str),
            Some("resize")
        );
        assert!(event.downcast_ref::<u32>().is_none());
    }
}
