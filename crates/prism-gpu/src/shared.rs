//! Shared GPU resources with a tri-state release gate.
//!
//! A resource that outlives any one frame must not be destroyed while a
//! frame still has in-flight GPU work referencing it. [`SharedResource`]
//! coordinates that with weak/strong reference counting and an explicit
//! lifecycle gate:
//!
//! `Alive` → (`begin_release`) → `Draining` → (`try_finish_release`,
//! once every guard fence has signaled and no strong lock remains) →
//! `Released`.
//!
//! Strong lock acquisition fails from the instant `Draining` is entered,
//! so the outstanding-lock count only ever falls afterwards. The wrapped
//! value is surrendered exactly once, on the transition to `Released`,
//! for explicit destruction by the caller.
//!
//! The CPU side of this renderer is single-threaded; handles are
//! reference-counted with `Rc` and are not `Send`.

use crate::error::Result;
use ash::vk;
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

/// Lifecycle state of a shared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// In service; strong locks may be taken.
    Alive,
    /// Release requested; waiting for in-flight work and locks to clear.
    Draining,
    /// Value surrendered; all handles are dead.
    Released,
}

struct Inner<T> {
    value: RefCell<Option<T>>,
    state: Cell<LifecycleState>,
    strong_locks: Cell<u32>,
    /// Fences the resource was locked against when release began.
    guard_fences: RefCell<Vec<vk::Fence>>,
}

/// Owner of a shared GPU resource.
pub struct SharedResource<T> {
    inner: Rc<Inner<T>>,
}

impl<T> SharedResource<T> {
    /// Wrap a value in the Alive state.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(Some(value)),
                state: Cell::new(LifecycleState::Alive),
                strong_locks: Cell::new(0),
                guard_fences: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create a weak logical handle.
    pub fn handle(&self) -> Res<T> {
        Res {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    /// Number of outstanding strong locks.
    pub fn strong_locks(&self) -> u32 {
        self.inner.strong_locks.get()
    }

    /// Request release, recording the in-flight fences the resource must
    /// outlive. New strong locks are refused from this point on.
    ///
    /// No-op unless the resource is Alive.
    pub fn begin_release(&self, fences: impl IntoIterator<Item = vk::Fence>) {
        if self.inner.state.get() != LifecycleState::Alive {
            return;
        }
        self.inner.guard_fences.borrow_mut().extend(fences);
        self.inner.state.set(LifecycleState::Draining);
    }

    /// Try to complete a pending release.
    ///
    /// `poll` reports whether a fence has signaled, without blocking.
    /// Returns the wrapped value exactly once, on the Draining→Released
    /// transition; `None` while work is still in flight, a strong lock is
    /// outstanding, or release has not been requested.
    pub fn try_finish_release(
        &self,
        mut poll: impl FnMut(vk::Fence) -> Result<bool>,
    ) -> Result<Option<T>> {
        if self.inner.state.get() != LifecycleState::Draining {
            return Ok(None);
        }

        // Prune fences as they signal so later polls skip them
        {
            let mut fences = self.inner.guard_fences.borrow_mut();
            let mut i = 0;
            while i < fences.len() {
                if poll(fences[i])? {
                    fences.swap_remove(i);
                } else {
                    i += 1;
                }
            }
            if !fences.is_empty() {
                return Ok(None);
            }
        }

        if self.inner.strong_locks.get() != 0 {
            return Ok(None);
        }

        self.inner.state.set(LifecycleState::Released);
        Ok(self.inner.value.borrow_mut().take())
    }
}

/// Weak logical handle to a shared resource.
pub struct Res<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Res<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Res<T> {
    /// Acquire a strong lock for the duration of a frame's use.
    ///
    /// Returns `None` once the resource has begun releasing.
    pub fn lock(&self) -> Option<ResLock<T>> {
        if self.inner.state.get() != LifecycleState::Alive {
            return None;
        }
        self.inner.strong_locks.set(self.inner.strong_locks.get() + 1);
        Some(ResLock {
            inner: Rc::clone(&self.inner),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }
}

/// Strong lock on a shared resource.
///
/// The resource cannot finish releasing while any lock is alive.
pub struct ResLock<T> {
    inner: Rc<Inner<T>>,
}

impl<T> ResLock<T> {
    /// Borrow the locked value.
    pub fn value(&self) -> Ref<'_, T> {
        // The value can only be taken in Released, which requires zero
        // outstanding locks; holding a lock therefore guarantees Some.
        Ref::map(self.inner.value.borrow(), |v| {
            v.as_ref().expect("locked resource must hold a value")
        })
    }
}

impl<T> Drop for ResLock<T> {
    fn drop(&mut self) {
        let count = self.inner.strong_locks.get();
        debug_assert!(count > 0);
        self.inner.strong_locks.set(count.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn fence(id: u64) -> vk::Fence {
        vk::Fence::from_raw(id)
    }

    #[test]
    fn lock_succeeds_while_alive() {
        let shared = SharedResource::new(42u32);
        let res = shared.handle();

        let lock = res.lock().expect("alive resource must lock");
        assert_eq!(*lock.value(), 42);
        assert_eq!(shared.strong_locks(), 1);
        drop(lock);
        assert_eq!(shared.strong_locks(), 0);
    }

    #[test]
    fn lock_fails_once_draining() {
        let shared = SharedResource::new(0u32);
        let res = shared.handle();

        shared.begin_release([fence(1)]);
        assert_eq!(shared.state(), LifecycleState::Draining);
        assert!(res.lock().is_none());
    }

    #[test]
    fn release_waits_for_fences() {
        let shared = SharedResource::new("mesh");
        shared.begin_release([fence(1), fence(2)]);

        // Fence 2 still pending
        let taken = shared
            .try_finish_release(|f| Ok(f.as_raw() == 1))
            .unwrap();
        assert!(taken.is_none());
        assert_eq!(shared.state(), LifecycleState::Draining);

        // Everything signaled: value surrendered exactly once
        let taken = shared.try_finish_release(|_| Ok(true)).unwrap();
        assert_eq!(taken, Some("mesh"));
        assert_eq!(shared.state(), LifecycleState::Released);

        let again = shared.try_finish_release(|_| Ok(true)).unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn release_waits_for_outstanding_locks() {
        let shared = SharedResource::new(7u32);
        let res = shared.handle();

        let lock = res.lock().unwrap();
        shared.begin_release([]);

        // No fences, but a lock is still held
        assert!(shared.try_finish_release(|_| Ok(true)).unwrap().is_none());

        drop(lock);
        assert_eq!(shared.try_finish_release(|_| Ok(true)).unwrap(), Some(7));
    }

    #[test]
    fn release_before_request_is_noop() {
        let shared = SharedResource::new(1u32);
        assert!(shared.try_finish_release(|_| Ok(true)).unwrap().is_none());
        assert_eq!(shared.state(), LifecycleState::Alive);
    }
}
