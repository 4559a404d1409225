//! Shared, reference-counted lifetime guards for pooled memory.
//!
//! A [`LifetimeGuard`] covers one or more memory blocks as a single releasable unit:
//! every holder adds a reference, and the release action registered at construction
//! runs exactly once, when the last reference is released.

use std::sync::{Arc, Mutex};

use counter::RefCounter;

pub mod counter;

type ReleaseAction = Box<dyn FnOnce() + Send + 'static>;

/// A shared handle over a reference-counted resource.
///
/// Cloning a `LifetimeGuard` clones the handle, not a reference: the logical reference
/// count is changed only through [`add_ref`](Self::add_ref) and
/// [`release`](Self::release). A freshly created guard holds one reference, owned by
/// whoever created it.
#[derive(Clone)]
pub struct LifetimeGuard(Arc<GuardInner>);

impl LifetimeGuard {
    /// Creates a new guard holding a single reference.
    ///
    /// `on_release` is invoked exactly once, by the caller whose [`release`](Self::release)
    /// brings the reference count to zero. If the guard is dropped before that happens,
    /// the action is dropped without being invoked.
    pub fn new(on_release: impl FnOnce() + Send + 'static) -> LifetimeGuard {
        LifetimeGuard(Arc::new(GuardInner {
            refs: RefCounter::new(1),
            on_release: Mutex::new(Some(Box::new(on_release))),
        }))
    }

    /// Adds a reference to the guarded resource.
    ///
    /// Returns `false` (and leaves the count at zero) if the resource was already
    /// released.
    pub fn add_ref(&self) -> bool {
        self.0.refs.try_increment()
    }

    /// Releases a reference to the guarded resource.
    ///
    /// Returns `true` if this call released the last reference and ran the release
    /// action. Releasing an already released guard is a no-op returning `false`.
    ///
    /// # Safety
    ///
    /// The caller must own the reference being released: it was obtained from
    /// [`new`](Self::new) or a successful [`add_ref`](Self::add_ref) and has not been
    /// released before. Once the count reaches zero, the release action may hand the
    /// guarded memory to another user, so no access to it may follow.
    pub unsafe fn release(&self) -> bool {
        match self.0.refs.try_decrement() {
            Some(0) => {
                self.0.run_release_action();
                true
            }
            _ => false,
        }
    }

    /// Returns the current reference count (may be stale by the time it is observed).
    pub fn ref_count(&self) -> usize {
        self.0.refs.read()
    }

    /// Returns `true` once the last reference has been released.
    pub fn is_released(&self) -> bool {
        self.0.refs.read() == 0
    }

    /// Returns `true` if both handles refer to the same guarded resource.
    pub fn ptr_eq(&self, other: &LifetimeGuard) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for LifetimeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifetimeGuard")
            .field("refs", &self.ref_count())
            .finish()
    }
}

struct GuardInner {
    refs: RefCounter,
    on_release: Mutex<Option<ReleaseAction>>,
}

impl GuardInner {
    fn run_release_action(&self) {
        let action = match self.on_release.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(action) = action {
            log::debug!("lifetime guard released");
            action();
        }
    }
}
