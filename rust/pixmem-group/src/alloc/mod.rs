//! Allocation front-end: turns a requested group length into backing segments.

use pixmem_common::{Result, error::Error, verify_arg};
use pixmem_common_traits::segment_owner::SegmentOwner;
use pixmem_lifetime::LifetimeGuard;

use crate::group::{layout_segment_len, segment_count};

pub mod array_pool;
pub mod uniform_pool;

pub use array_pool::{ArrayPool, ArrayPoolOptions, PoolAllocator, PooledArray};
pub use uniform_pool::{UniformPool, UniformPoolAllocator, UniformPoolOptions};

/// Default size of one allocator buffer: 4 MiB.
pub const DEFAULT_BUFFER_CAPACITY_IN_BYTES: usize = 4 * 1024 * 1024;

/// Per-request allocation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationOptions {
    /// Newly handed out segments must be zeroed, even when taken from a pool.
    pub clean: bool,
}

impl AllocationOptions {
    /// Options requesting zeroed segments.
    pub fn clean() -> Self {
        AllocationOptions { clean: true }
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }
}

/// The segments of a freshly allocated group, optionally covered by one lifetime
/// guard.
pub struct GroupAllocation<T> {
    owners: Vec<Box<dyn SegmentOwner<T>>>,
    guard: Option<LifetimeGuard>,
}

impl<T> GroupAllocation<T> {
    pub fn new(owners: Vec<Box<dyn SegmentOwner<T>>>) -> Self {
        GroupAllocation {
            owners,
            guard: None,
        }
    }

    /// Segments kept alive collectively by `guard`; the allocation owns one reference
    /// on it, which passes to the group built from the allocation.
    pub fn with_guard(owners: Vec<Box<dyn SegmentOwner<T>>>, guard: LifetimeGuard) -> Self {
        GroupAllocation {
            owners,
            guard: Some(guard),
        }
    }

    pub fn into_parts(self) -> (Vec<Box<dyn SegmentOwner<T>>>, Option<LifetimeGuard>) {
        (self.owners, self.guard)
    }
}

/// Source of backing segments for owned groups.
pub trait SegmentAllocator<T> {
    /// Size of the largest contiguous buffer the allocator hands out.
    fn buffer_capacity_in_bytes(&self) -> usize;

    /// Allocates one segment of exactly `len` elements.
    fn allocate_segment(
        &self,
        len: usize,
        options: AllocationOptions,
    ) -> Result<Box<dyn SegmentOwner<T>>>;

    /// Allocates all segments of a group of `total_length` elements in chunks of
    /// `chunk_size`.
    ///
    /// The default implementation allocates every segment separately.
    fn allocate_group(
        &self,
        chunk_size: usize,
        total_length: usize,
        options: AllocationOptions,
    ) -> Result<GroupAllocation<T>> {
        let owners = (0..segment_count(chunk_size, total_length))
            .map(|i| {
                self.allocate_segment(layout_segment_len(chunk_size, total_length, i), options)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GroupAllocation::new(owners))
    }
}

/// Computes the chunk size of a group of `total_length` elements of `T`.
///
/// The chunk is the largest multiple of `alignment_in_elements` that fits in a buffer of
/// `capacity_in_bytes`, clamped to `total_length` when the whole group fits in one
/// chunk.
pub fn chunk_size_for<T>(
    capacity_in_bytes: usize,
    total_length: usize,
    alignment_in_elements: usize,
) -> Result<usize> {
    verify_arg!(alignment_in_elements, alignment_in_elements > 0);
    let block_capacity = capacity_in_bytes / std::mem::size_of::<T>().max(1);
    if alignment_in_elements > block_capacity {
        return Err(Error::invalid_arg(
            "alignment_in_elements",
            format!(
                "alignment of {alignment_in_elements} elements exceeds the buffer capacity \
                 of {block_capacity} elements"
            ),
        ));
    }
    let buffer_len = block_capacity / alignment_in_elements * alignment_in_elements;
    Ok(total_length.min(buffer_len))
}

/// Allocates every segment as a zeroed heap vector.
#[derive(Debug, Clone)]
pub struct HeapAllocator {
    buffer_capacity_in_bytes: usize,
}

impl HeapAllocator {
    pub fn new(buffer_capacity_in_bytes: usize) -> Self {
        HeapAllocator {
            buffer_capacity_in_bytes,
        }
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        HeapAllocator::new(DEFAULT_BUFFER_CAPACITY_IN_BYTES)
    }
}

impl<T> SegmentAllocator<T> for HeapAllocator
where
    T: bytemuck::Zeroable + Copy + Send + Sync + 'static,
{
    fn buffer_capacity_in_bytes(&self) -> usize {
        self.buffer_capacity_in_bytes
    }

    fn allocate_segment(
        &self,
        len: usize,
        _options: AllocationOptions,
    ) -> Result<Box<dyn SegmentOwner<T>>> {
        Ok(Box::new(vec![T::zeroed(); len]))
    }
}
