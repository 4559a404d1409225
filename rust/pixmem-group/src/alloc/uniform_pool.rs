//! A bounded pool of equally sized native blocks, and the segment allocator built on
//! it.
//!
//! Blocks handed out together for one group are covered by a single
//! [`LifetimeGuard`]: they return to the pool as a unit once the group and every
//! counted reference to it are gone.

use std::{
    ptr::NonNull,
    sync::{Arc, Mutex, PoisonError},
};

use pixmem_common::{Result, error::Error};
use pixmem_common_traits::segment_owner::{SegmentBacking, SegmentOwner};
use pixmem_lifetime::LifetimeGuard;
use pixmem_native_alloc::native_buffer::NativeBuffer;

use super::{AllocationOptions, GroupAllocation, SegmentAllocator};
use crate::group::{layout_segment_len, segment_count};

/// Configuration of a [`UniformPool`].
#[derive(Debug, Clone)]
pub struct UniformPoolOptions {
    /// Length of every block, in elements.
    pub block_len: usize,
    /// Maximum number of blocks the pool hands out at the same time.
    pub capacity: usize,
}

impl UniformPoolOptions {
    pub const DEFAULT_BLOCK_LEN: usize = 1024 * 1024;
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn with_block_len(mut self, block_len: usize) -> Self {
        self.block_len = block_len;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        pixmem_common::verify_arg!(block_len, self.block_len > 0);
        pixmem_common::verify_arg!(capacity, self.capacity > 0);
        Ok(())
    }
}

impl Default for UniformPoolOptions {
    fn default() -> Self {
        Self {
            block_len: Self::DEFAULT_BLOCK_LEN,
            capacity: Self::DEFAULT_CAPACITY,
        }
    }
}

/// A thread-safe pool of at most `capacity` native blocks of `block_len` elements.
///
/// Blocks are allocated lazily and kept for reuse once returned. Clones of the pool
/// share the same blocks.
pub struct UniformPool<T>(Arc<UniformPoolInner<T>>);

struct UniformPoolInner<T> {
    options: UniformPoolOptions,
    state: Mutex<PoolState<T>>,
}

struct PoolState<T> {
    free: Vec<NativeBuffer<T>>,
    outstanding: usize,
}

impl<T> PoolState<T> {
    /// Takes `count` blocks, reusing free ones first. If an allocation fails, every
    /// block taken so far goes back to the free list.
    fn take(
        &mut self,
        count: usize,
        mut allocate: impl FnMut() -> Result<NativeBuffer<T>>,
    ) -> Result<Vec<NativeBuffer<T>>> {
        let split_at = self.free.len() - count.min(self.free.len());
        let mut blocks = self.free.split_off(split_at);
        while blocks.len() < count {
            match allocate() {
                Ok(block) => blocks.push(block),
                Err(e) => {
                    self.free.append(&mut blocks);
                    return Err(e);
                }
            }
        }
        self.outstanding += count;
        Ok(blocks)
    }
}

impl<T> Clone for UniformPool<T> {
    fn clone(&self) -> Self {
        UniformPool(self.0.clone())
    }
}

impl<T> UniformPool<T>
where
    T: bytemuck::Zeroable,
{
    pub fn new(options: UniformPoolOptions) -> Result<Self> {
        options.validate()?;
        Ok(UniformPool(Arc::new(UniformPoolInner {
            options,
            state: Mutex::new(PoolState {
                free: Vec::new(),
                outstanding: 0,
            }),
        })))
    }

    /// Rents `count` blocks, or returns `None` if the pool can't supply that many
    /// without exceeding its capacity.
    pub fn rent(&self, count: usize) -> Result<Option<BlockLease<T>>> {
        let mut state = self.lock();
        if count > self.0.options.capacity - state.outstanding {
            return Ok(None);
        }

        let block_len = self.0.options.block_len;
        let blocks = state.take(count, || {
            NativeBuffer::allocate(block_len).map_err(|e| Error::io("uniform pool block", e))
        })?;
        Ok(Some(BlockLease {
            pool: self.clone(),
            blocks,
        }))
    }
}

impl<T> UniformPool<T> {
    pub fn options(&self) -> &UniformPoolOptions {
        &self.0.options
    }

    /// Number of blocks kept for reuse.
    pub fn free_count(&self) -> usize {
        self.lock().free.len()
    }

    /// Number of blocks currently rented out.
    pub fn outstanding_count(&self) -> usize {
        self.lock().outstanding
    }

    fn return_blocks(&self, blocks: Vec<NativeBuffer<T>>) {
        let mut state = self.lock();
        state.outstanding -= blocks.len();
        state.free.extend(blocks);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState<T>> {
        self.0.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for UniformPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformPool")
            .field("options", &self.0.options)
            .field("free", &self.free_count())
            .field("outstanding", &self.outstanding_count())
            .finish()
    }
}

/// Blocks rented from a [`UniformPool`]; they go back to the pool when the lease is
/// dropped.
pub struct BlockLease<T> {
    pool: UniformPool<T>,
    blocks: Vec<NativeBuffer<T>>,
}

impl<T> BlockLease<T> {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks_mut(&mut self) -> &mut [NativeBuffer<T>] {
        &mut self.blocks
    }
}

impl<T> Drop for BlockLease<T> {
    fn drop(&mut self) {
        let blocks = std::mem::take(&mut self.blocks);
        self.pool.return_blocks(blocks);
    }
}

/// A group segment living in a block whose lease is held by a group-wide guard.
struct BlockSegment<T> {
    start: NonNull<T>,
    len: usize,
}

// SAFETY: the segment is created over a leased block that no one else accesses, and
// the owning group keeps the lease alive (through its guard reference) for as long as
// the segment exists.
unsafe impl<T: Send + Sync> SegmentOwner<T> for BlockSegment<T> {
    fn len(&self) -> usize {
        self.len
    }

    fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.start.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.start.as_ptr(), self.len) }
    }

    fn backing(&mut self) -> SegmentBacking<T> {
        SegmentBacking::Native(self.start)
    }
}

unsafe impl<T: Send> Send for BlockSegment<T> {}
unsafe impl<T: Sync> Sync for BlockSegment<T> {}

/// A single pooled block that supports counted ownership on its own.
///
/// The block returns to its pool when this segment is dropped and every counted
/// reference added through [`lifetime_guard`](SegmentOwner::lifetime_guard) is
/// released.
pub struct PooledBlock<T> {
    start: NonNull<T>,
    len: usize,
    guard: LifetimeGuard,
}

impl<T: Send + 'static> PooledBlock<T> {
    fn new(mut lease: BlockLease<T>, len: usize) -> PooledBlock<T> {
        debug_assert_eq!(lease.len(), 1);
        let start = NonNull::new(lease.blocks_mut()[0].as_ptr())
            .unwrap_or_else(NonNull::dangling);
        PooledBlock {
            start,
            len,
            guard: LifetimeGuard::new(move || drop(lease)),
        }
    }
}

// SAFETY: the block is kept alive by the lease inside `guard`, on which this segment
// holds a reference until it is dropped.
unsafe impl<T: Send + Sync> SegmentOwner<T> for PooledBlock<T> {
    fn len(&self) -> usize {
        self.len
    }

    fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.start.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.start.as_ptr(), self.len) }
    }

    fn backing(&mut self) -> SegmentBacking<T> {
        SegmentBacking::Native(self.start)
    }

    fn lifetime_guard(&self) -> Option<&LifetimeGuard> {
        Some(&self.guard)
    }
}

impl<T> Drop for PooledBlock<T> {
    fn drop(&mut self) {
        // SAFETY: the reference created together with the guard.
        unsafe { self.guard.release() };
    }
}

unsafe impl<T: Send> Send for PooledBlock<T> {}
unsafe impl<T: Sync> Sync for PooledBlock<T> {}

/// Segment allocator backed by a [`UniformPool`].
///
/// When the pool is exhausted, segments fall back to individually allocated native
/// buffers that are freed rather than pooled.
#[derive(Debug, Clone)]
pub struct UniformPoolAllocator<T> {
    pool: UniformPool<T>,
}

impl<T> UniformPoolAllocator<T> {
    pub fn new(pool: UniformPool<T>) -> Self {
        UniformPoolAllocator { pool }
    }

    pub fn pool(&self) -> &UniformPool<T> {
        &self.pool
    }
}

impl<T> UniformPoolAllocator<T>
where
    T: bytemuck::Zeroable + Copy + Send + Sync + 'static,
{
    fn unpooled(len: usize) -> Result<Box<dyn SegmentOwner<T>>> {
        let buffer = NativeBuffer::<T>::allocate(len)
            .map_err(|e| Error::io("native segment", e))?;
        Ok(Box::new(buffer))
    }
}

impl<T> SegmentAllocator<T> for UniformPoolAllocator<T>
where
    T: bytemuck::Zeroable + Copy + Send + Sync + 'static,
{
    fn buffer_capacity_in_bytes(&self) -> usize {
        self.pool.options().block_len * std::mem::size_of::<T>()
    }

    fn allocate_segment(
        &self,
        len: usize,
        options: AllocationOptions,
    ) -> Result<Box<dyn SegmentOwner<T>>> {
        if len > self.pool.options().block_len {
            return Self::unpooled(len);
        }
        match self.pool.rent(1)? {
            Some(mut lease) => {
                if options.clean {
                    lease.blocks_mut()[0].clear();
                }
                Ok(Box::new(PooledBlock::new(lease, len)))
            }
            None => Self::unpooled(len),
        }
    }

    fn allocate_group(
        &self,
        chunk_size: usize,
        total_length: usize,
        options: AllocationOptions,
    ) -> Result<GroupAllocation<T>> {
        let count = segment_count(chunk_size, total_length);
        if count == 1 {
            return Ok(GroupAllocation::new(vec![
                self.allocate_segment(total_length, options)?,
            ]));
        }

        let lengths = (0..count).map(|i| layout_segment_len(chunk_size, total_length, i));
        let Some(mut lease) = self.pool.rent(count)? else {
            let owners = lengths.map(Self::unpooled).collect::<Result<Vec<_>>>()?;
            return Ok(GroupAllocation::new(owners));
        };

        let mut owners: Vec<Box<dyn SegmentOwner<T>>> = Vec::with_capacity(count);
        for (block, len) in lease.blocks_mut().iter_mut().zip(lengths) {
            if options.clean {
                block.clear();
            }
            let start = NonNull::new(block.as_ptr()).unwrap_or_else(NonNull::dangling);
            owners.push(Box::new(BlockSegment { start, len }));
        }
        let guard = LifetimeGuard::new(move || drop(lease));
        Ok(GroupAllocation::with_guard(owners, guard))
    }
}
