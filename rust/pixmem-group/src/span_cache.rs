//! Fast-path classification of the memory behind an owned group.

use std::ptr::NonNull;

use pixmem_common_traits::segment_owner::{SegmentBacking, SegmentOwner};

/// The backing layout recognized by a [`SpanCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// No fast path; segments are resolved through their owners.
    None,
    /// A single segment living in a managed array at an element offset.
    SingleArray,
    /// A single natively allocated segment.
    SinglePointer,
    /// Several natively allocated segments.
    MultiPointer,
}

/// Segment start pointers, captured once when the group is built.
pub(crate) enum SpanCache<T> {
    None,
    SingleArray { base: NonNull<T>, offset: usize },
    SinglePointer(NonNull<T>),
    MultiPointer(Vec<NonNull<T>>),
}

impl<T> SpanCache<T> {
    pub fn build(owners: &mut [Box<dyn SegmentOwner<T>>]) -> SpanCache<T> {
        match owners {
            [] => SpanCache::None,
            [single] => match single.backing() {
                SegmentBacking::Array { base, offset } => SpanCache::SingleArray { base, offset },
                SegmentBacking::Native(ptr) => SpanCache::SinglePointer(ptr),
                SegmentBacking::Other => SpanCache::None,
            },
            many => {
                let mut pointers = Vec::with_capacity(many.len());
                for owner in many.iter_mut() {
                    match owner.backing() {
                        SegmentBacking::Native(ptr) => pointers.push(ptr),
                        _ => return SpanCache::None,
                    }
                }
                SpanCache::MultiPointer(pointers)
            }
        }
    }

    pub fn mode(&self) -> CacheMode {
        match self {
            SpanCache::None => CacheMode::None,
            SpanCache::SingleArray { .. } => CacheMode::SingleArray,
            SpanCache::SinglePointer(_) => CacheMode::SinglePointer,
            SpanCache::MultiPointer(_) => CacheMode::MultiPointer,
        }
    }

    /// Start of segment `index`, or `None` when the segment must be resolved through
    /// its owner.
    #[inline]
    pub fn start(&self, index: usize) -> Option<NonNull<T>> {
        match self {
            SpanCache::None => None,
            SpanCache::SingleArray { base, offset } => {
                debug_assert_eq!(index, 0);
                // SAFETY: the owner guarantees `base + offset` is within its array.
                Some(unsafe { base.add(*offset) })
            }
            SpanCache::SinglePointer(ptr) => {
                debug_assert_eq!(index, 0);
                Some(*ptr)
            }
            SpanCache::MultiPointer(pointers) => pointers.get(index).copied(),
        }
    }
}

// SAFETY: the cached pointers address memory exclusively owned by the group's segment
// owners, which are themselves `Send + Sync`.
unsafe impl<T: Send> Send for SpanCache<T> {}

// SAFETY: shared access through the cache only produces `&[T]`.
unsafe impl<T: Sync> Sync for SpanCache<T> {}
