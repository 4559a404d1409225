//! A buffer group that owns its segments.

use std::slice;

use pixmem_common::{Result, error::Error};
use pixmem_common_traits::segment_owner::SegmentOwner;
use pixmem_lifetime::{LifetimeGuard, counter::RefCounter};

use crate::{
    alloc::{AllocationOptions, GroupAllocation, SegmentAllocator, chunk_size_for},
    group::{BufferGroup, verify_layout},
    span_cache::{CacheMode, SpanCache},
    view::GroupView,
};

/// A buffer group that owns the memory behind its segments.
///
/// Besides the [`BufferGroup`] contract, an owned group:
/// - tracks counted references held by other components
///   ([`increase_ref_counts`](Self::increase_ref_counts)), so that pooled memory is
///   returned only after the last of them is released;
/// - publishes its segments through a single [`GroupView`] whose handles go stale when
///   the group is swapped or disposed;
/// - can exchange its entire backing storage with another owned group (see
///   [`swap_or_copy_content`](crate::swap::swap_or_copy_content)).
///
/// Dropping the group disposes it.
pub struct OwnedGroup<T> {
    owners: Vec<Box<dyn SegmentOwner<T>>>,
    chunk_size: usize,
    total_length: usize,
    /// One reference on a guard covering all segments, owned by the group until dispose.
    guard: Option<LifetimeGuard>,
    /// Per-segment guards, when there is no group-wide one.
    counted: Vec<LifetimeGuard>,
    external_refs: RefCounter,
    cache: SpanCache<T>,
    swappable: bool,
    disposed: bool,
    view: GroupView,
}

impl<T> OwnedGroup<T> {
    /// Creates a group over `owners`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the owner lengths don't match `chunk_size` and
    /// `total_length`.
    pub fn new(
        owners: Vec<Box<dyn SegmentOwner<T>>>,
        chunk_size: usize,
        total_length: usize,
    ) -> Result<Self> {
        Self::build(owners, None, chunk_size, total_length)
    }

    /// Creates a group over `owners` whose memory is collectively kept alive by
    /// `guard`.
    ///
    /// The group takes over the reference the caller holds on `guard` and releases it
    /// on dispose. The guard is released right away if the layout is rejected.
    pub fn with_lifetime_guard(
        owners: Vec<Box<dyn SegmentOwner<T>>>,
        guard: LifetimeGuard,
        chunk_size: usize,
        total_length: usize,
    ) -> Result<Self> {
        Self::build(owners, Some(guard), chunk_size, total_length)
    }

    /// Creates a group over heap vectors, taking the chunk size from the first one.
    pub fn from_vecs(vecs: Vec<Vec<T>>) -> Result<Self>
    where
        T: Send + Sync + 'static,
    {
        let chunk_size = vecs.first().map_or(0, Vec::len);
        let total_length = vecs.iter().map(Vec::len).sum();
        let owners = vecs
            .into_iter()
            .map(|v| Box::new(v) as Box<dyn SegmentOwner<T>>)
            .collect();
        Self::new(owners, chunk_size, total_length)
    }

    /// Allocates a group of `total_length` elements from `allocator`.
    ///
    /// The chunk size is the largest multiple of `alignment_in_elements` that fits in
    /// one allocator buffer, or `total_length` if the whole group fits in one chunk.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `alignment_in_elements` is zero or exceeds the buffer
    /// capacity; any error the allocator reports.
    pub fn allocate<A>(
        allocator: &A,
        total_length: usize,
        alignment_in_elements: usize,
        options: AllocationOptions,
    ) -> Result<Self>
    where
        A: SegmentAllocator<T> + ?Sized,
    {
        let chunk_size = chunk_size_for::<T>(
            allocator.buffer_capacity_in_bytes(),
            total_length,
            alignment_in_elements,
        )?;
        let allocation = if total_length == 0 {
            GroupAllocation::new(Vec::new())
        } else {
            allocator.allocate_group(chunk_size, total_length, options)?
        };
        let (owners, guard) = allocation.into_parts();
        Self::build(owners, guard, chunk_size, total_length)
    }

    fn build(
        mut owners: Vec<Box<dyn SegmentOwner<T>>>,
        guard: Option<LifetimeGuard>,
        chunk_size: usize,
        total_length: usize,
    ) -> Result<Self> {
        if let Err(e) = verify_layout(owners.iter().map(|o| o.len()), chunk_size, total_length) {
            drop(owners);
            if let Some(guard) = guard {
                // SAFETY: the caller handed its reference over to us.
                unsafe { guard.release() };
            }
            return Err(e);
        }

        let counted = if guard.is_some() {
            Vec::new()
        } else {
            owners
                .iter()
                .filter_map(|o| o.lifetime_guard().cloned())
                .collect()
        };
        let cache = SpanCache::build(&mut owners);
        let view = GroupView::new(owners.iter().map(|o| o.len()));

        log::debug!(
            "owned group: {} segments, chunk size {}, total length {}, cache {:?}",
            owners.len(),
            chunk_size,
            total_length,
            cache.mode()
        );

        Ok(OwnedGroup {
            owners,
            chunk_size,
            total_length,
            guard,
            counted,
            external_refs: RefCounter::new(0),
            cache,
            swappable: true,
            disposed: false,
            view,
        })
    }

    /// Sets whether the group may exchange its storage with another group.
    pub fn with_swappable(mut self, swappable: bool) -> Self {
        self.swappable = swappable;
        self
    }

    /// Returns `true` if the group may exchange its storage with another group.
    pub fn swappable(&self) -> bool {
        self.swappable
    }

    /// The current view over the group's segments.
    pub fn view(&self) -> &GroupView {
        &self.view
    }

    /// The fast path chosen for segment access.
    pub fn cache_mode(&self) -> CacheMode {
        self.cache.mode()
    }

    /// Returns `true` if the group memory is covered by a single group-wide guard.
    pub fn has_lifetime_guard(&self) -> bool {
        self.guard.is_some()
    }

    /// Number of counted references currently held through
    /// [`increase_ref_counts`](Self::increase_ref_counts).
    pub fn external_ref_count(&self) -> usize {
        self.external_refs.read()
    }

    /// Adds a counted reference to the group memory.
    ///
    /// With a group-wide lifetime guard the reference is added to the guard; otherwise
    /// it is added to every segment owner that supports counted ownership. Each call
    /// must be balanced by one [`decrease_ref_counts`](Self::decrease_ref_counts).
    ///
    /// # Errors
    ///
    /// `UseAfterDispose` if the group has been disposed.
    pub fn increase_ref_counts(&self) -> Result<()> {
        self.ensure_live("increase_ref_counts")?;
        self.external_refs.increment();
        match &self.guard {
            Some(guard) => {
                let added = guard.add_ref();
                debug_assert!(added, "live group guard was already released");
            }
            None => {
                for guard in &self.counted {
                    let added = guard.add_ref();
                    debug_assert!(added, "live segment guard was already released");
                }
            }
        }
        Ok(())
    }

    /// Releases a counted reference added by
    /// [`increase_ref_counts`](Self::increase_ref_counts).
    ///
    /// This is allowed after dispose: the memory is returned when the last reference
    /// goes away.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if there is no outstanding counted reference.
    pub fn decrease_ref_counts(&self) -> Result<()> {
        if !self.external_refs.decrement_above(0) {
            return Err(Error::invalid_operation("decrease_ref_counts"));
        }
        match &self.guard {
            // SAFETY: the reference was added by a matching `increase_ref_counts`.
            Some(guard) => unsafe {
                guard.release();
            },
            None => {
                for guard in &self.counted {
                    // SAFETY: as above, one reference per counted guard.
                    unsafe { guard.release() };
                }
            }
        }
        Ok(())
    }

    /// Disposes the group: drops the segment owners and releases the group's own
    /// reference on its lifetime guard. Calling it again has no effect.
    ///
    /// After dispose, [`count`](BufferGroup::count) and
    /// [`segment`](BufferGroup::segment) fail with `UseAfterDispose` and every handle
    /// of the view is stale.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.view.invalidate();
        self.cache = SpanCache::None;
        self.owners.clear();
        if let Some(guard) = &self.guard {
            // SAFETY: the group's own reference, released exactly once here.
            unsafe { guard.release() };
        }
        log::trace!("owned group disposed");
    }

    /// Invalidates the current view and builds a fresh one over the current segments.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose` if the group has been disposed.
    pub fn recreate_view_after_swap(&mut self) -> Result<()> {
        self.ensure_live("recreate_view_after_swap")?;
        self.view.invalidate();
        self.view = GroupView::new(self.owners.iter().map(|o| o.len()));
        log::trace!("recreated view over {} segments", self.owners.len());
        Ok(())
    }

    /// Returns all segments as disjoint mutable slices, e.g. for per-segment parallel
    /// processing.
    pub fn segments_mut(&mut self) -> Result<Vec<&mut [T]>> {
        self.ensure_live("segments_mut")?;
        if let SpanCache::None = self.cache {
            return Ok(self.owners.iter_mut().map(|o| o.as_mut_slice()).collect());
        }
        let cache = &self.cache;
        self.owners
            .iter()
            .enumerate()
            .map(|(i, owner)| {
                let start = cache.start(i).ok_or_else(|| {
                    Error::internal_inconsistency(format!("segment {i} missing from span cache"))
                })?;
                // SAFETY: every owner exclusively owns its segment, so the slices are
                // disjoint, and `&mut self` excludes any other access for their lifetime.
                Ok(unsafe { slice::from_raw_parts_mut(start.as_ptr(), owner.len()) })
            })
            .collect()
    }

    /// Exchanges the backing storage of two groups and rebuilds both views.
    pub(crate) fn swap_storage(&mut self, other: &mut OwnedGroup<T>) -> Result<()> {
        std::mem::swap(&mut self.owners, &mut other.owners);
        std::mem::swap(&mut self.chunk_size, &mut other.chunk_size);
        std::mem::swap(&mut self.total_length, &mut other.total_length);
        std::mem::swap(&mut self.guard, &mut other.guard);
        std::mem::swap(&mut self.counted, &mut other.counted);
        std::mem::swap(&mut self.cache, &mut other.cache);
        log::trace!(
            "swapped storage: {} and {} segments",
            self.owners.len(),
            other.owners.len()
        );
        self.recreate_view_after_swap()?;
        other.recreate_view_after_swap()
    }

    fn ensure_live(&self, context: &str) -> Result<()> {
        if self.disposed {
            Err(Error::use_after_dispose(context))
        } else {
            Ok(())
        }
    }

    fn owner_len(&self, index: usize) -> Result<usize> {
        self.owners
            .get(index)
            .map(|o| o.len())
            .ok_or_else(|| Error::index_out_of_range(index, self.owners.len()))
    }
}

impl<T> BufferGroup<T> for OwnedGroup<T> {
    fn count(&self) -> Result<usize> {
        self.ensure_live("count")?;
        Ok(self.owners.len())
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn total_length(&self) -> usize {
        self.total_length
    }

    fn is_valid(&self) -> bool {
        !self.disposed
    }

    fn segment(&self, index: usize) -> Result<&[T]> {
        self.ensure_live("segment")?;
        let len = self.owner_len(index)?;
        match self.cache.start(index) {
            // SAFETY: the cached pointer addresses `len` elements owned by `owners[index]`.
            Some(start) => Ok(unsafe { slice::from_raw_parts(start.as_ptr(), len) }),
            None => Ok(self.owners[index].as_slice()),
        }
    }

    fn segment_mut(&mut self, index: usize) -> Result<&mut [T]> {
        self.ensure_live("segment_mut")?;
        let len = self.owner_len(index)?;
        match self.cache.start(index) {
            // SAFETY: as in `segment`, and `&mut self` guarantees exclusive access.
            Some(start) => Ok(unsafe { slice::from_raw_parts_mut(start.as_ptr(), len) }),
            None => Ok(self.owners[index].as_mut_slice()),
        }
    }
}

impl<T> Drop for OwnedGroup<T> {
    fn drop(&mut self) {
        let outstanding = self.external_refs.read();
        if outstanding > 0 {
            log::warn!(
                "owned group dropped with {outstanding} counted references outstanding"
            );
        }
        self.dispose();
    }
}

impl<T> std::fmt::Debug for OwnedGroup<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedGroup")
            .field("count", &self.owners.len())
            .field("chunk_size", &self.chunk_size)
            .field("total_length", &self.total_length)
            .field("cache", &self.cache.mode())
            .field("external_refs", &self.external_refs.read())
            .field("swappable", &self.swappable)
            .field("disposed", &self.disposed)
            .finish()
    }
}
