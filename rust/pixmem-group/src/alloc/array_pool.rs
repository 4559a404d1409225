//! A bucketed pool of heap arrays, and the segment allocator built on it.

use std::{
    ptr::NonNull,
    sync::{Arc, Mutex, PoisonError},
};

use pixmem_common::{Result, error::Error};
use pixmem_common_traits::segment_owner::{SegmentBacking, SegmentOwner};

use super::{AllocationOptions, SegmentAllocator};

/// Length of the arrays in the smallest bucket.
const MIN_ARRAY_LEN: usize = 16;

/// Configuration of an [`ArrayPool`].
#[derive(Debug, Clone)]
pub struct ArrayPoolOptions {
    /// Longest array (in elements) the pool retains. Longer requests are served by
    /// plain allocations that are freed on return.
    pub max_array_len: usize,
    /// How many returned arrays each size bucket keeps.
    pub max_arrays_per_bucket: usize,
}

impl ArrayPoolOptions {
    pub const DEFAULT_MAX_ARRAY_LEN: usize = 1024 * 1024;
    pub const DEFAULT_MAX_ARRAYS_PER_BUCKET: usize = 16;

    pub fn with_max_array_len(mut self, max_array_len: usize) -> Self {
        self.max_array_len = max_array_len;
        self
    }

    pub fn with_max_arrays_per_bucket(mut self, max_arrays_per_bucket: usize) -> Self {
        self.max_arrays_per_bucket = max_arrays_per_bucket;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_array_len < MIN_ARRAY_LEN {
            return Err(Error::invalid_arg(
                "max_array_len",
                format!("must be at least {MIN_ARRAY_LEN}"),
            ));
        }
        if !self.max_array_len.is_power_of_two() {
            return Err(Error::invalid_arg("max_array_len", "must be a power of two"));
        }
        Ok(())
    }
}

impl Default for ArrayPoolOptions {
    fn default() -> Self {
        Self {
            max_array_len: Self::DEFAULT_MAX_ARRAY_LEN,
            max_arrays_per_bucket: Self::DEFAULT_MAX_ARRAYS_PER_BUCKET,
        }
    }
}

/// A thread-safe pool of heap arrays, bucketed by power-of-two length.
///
/// Rented arrays come back to the pool when their [`PooledArray`] is dropped. The
/// pool is a cheap handle: clones share the same buckets.
pub struct ArrayPool<T>(Arc<ArrayPoolInner<T>>);

struct ArrayPoolInner<T> {
    options: ArrayPoolOptions,
    buckets: Vec<Mutex<Vec<Vec<T>>>>,
}

impl<T> Clone for ArrayPool<T> {
    fn clone(&self) -> Self {
        ArrayPool(self.0.clone())
    }
}

impl<T> ArrayPool<T>
where
    T: bytemuck::Zeroable + Copy,
{
    /// Creates an empty pool.
    pub fn new(options: ArrayPoolOptions) -> Result<Self> {
        options.validate()?;
        let bucket_count = bucket_index(options.max_array_len) + 1;
        let buckets = (0..bucket_count).map(|_| Mutex::new(Vec::new())).collect();
        Ok(ArrayPool(Arc::new(ArrayPoolInner { options, buckets })))
    }

    pub fn options(&self) -> &ArrayPoolOptions {
        &self.0.options
    }

    /// Rents an array holding at least `len` elements.
    ///
    /// Arrays taken from a bucket keep the contents they were returned with unless
    /// `clean` is set.
    pub fn rent(&self, len: usize, clean: bool) -> PooledArray<T> {
        if len > self.0.options.max_array_len {
            return PooledArray {
                array: vec![T::zeroed(); len],
                len,
                pool: None,
            };
        }

        let bucket = bucket_index(len);
        let reused = self.0.buckets[bucket]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let array = match reused {
            Some(mut array) => {
                if clean {
                    array[..len].fill(T::zeroed());
                }
                array
            }
            None => vec![T::zeroed(); bucket_len(bucket)],
        };
        PooledArray {
            array,
            len,
            pool: Some(self.clone()),
        }
    }

    /// Number of arrays currently held by the pool.
    pub fn retained_count(&self) -> usize {
        self.0
            .buckets
            .iter()
            .map(|b| b.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }
}

impl<T> ArrayPool<T> {
    fn return_array(&self, array: Vec<T>) {
        let bucket = bucket_index(array.len());
        if bucket_len(bucket) != array.len() {
            return;
        }
        if let Some(slot) = self.0.buckets.get(bucket) {
            let mut arrays = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if arrays.len() < self.0.options.max_arrays_per_bucket {
                arrays.push(array);
            }
        }
    }
}

impl<T> std::fmt::Debug for ArrayPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayPool")
            .field("options", &self.0.options)
            .field("buckets", &self.0.buckets.len())
            .finish()
    }
}

fn bucket_index(len: usize) -> usize {
    let size = len.max(MIN_ARRAY_LEN).next_power_of_two();
    (size.trailing_zeros() - MIN_ARRAY_LEN.trailing_zeros()) as usize
}

fn bucket_len(bucket: usize) -> usize {
    MIN_ARRAY_LEN << bucket
}

/// An array rented from an [`ArrayPool`], exposing its first `len` elements.
///
/// The array goes back to the pool when this value is dropped.
pub struct PooledArray<T> {
    array: Vec<T>,
    len: usize,
    pool: Option<ArrayPool<T>>,
}

impl<T> PooledArray<T> {
    /// Number of elements the underlying array can hold.
    pub fn capacity(&self) -> usize {
        self.array.len()
    }

    /// Returns `true` if the array returns to a pool when dropped.
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }
}

unsafe impl<T: Send + Sync> SegmentOwner<T> for PooledArray<T> {
    fn len(&self) -> usize {
        self.len
    }

    fn as_slice(&self) -> &[T] {
        &self.array[..self.len]
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.array[..self.len]
    }

    fn backing(&mut self) -> SegmentBacking<T> {
        if self.len == 0 {
            return SegmentBacking::Other;
        }
        SegmentBacking::Array {
            base: NonNull::from(self.array.as_mut_slice()).cast(),
            offset: 0,
        }
    }
}

impl<T> Drop for PooledArray<T> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            let array = std::mem::take(&mut self.array);
            pool.return_array(array);
        }
    }
}

impl<T> std::fmt::Debug for PooledArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledArray")
            .field("len", &self.len)
            .field("capacity", &self.array.len())
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

/// Segment allocator renting every segment from an [`ArrayPool`].
#[derive(Debug, Clone)]
pub struct PoolAllocator<T> {
    pool: ArrayPool<T>,
}

impl<T> PoolAllocator<T> {
    pub fn new(pool: ArrayPool<T>) -> Self {
        PoolAllocator { pool }
    }

    pub fn pool(&self) -> &ArrayPool<T> {
        &self.pool
    }
}

impl<T> SegmentAllocator<T> for PoolAllocator<T>
where
    T: bytemuck::Zeroable + Copy + Send + Sync + 'static,
{
    fn buffer_capacity_in_bytes(&self) -> usize {
        self.pool.options().max_array_len * std::mem::size_of::<T>()
    }

    fn allocate_segment(
        &self,
        len: usize,
        options: AllocationOptions,
    ) -> Result<Box<dyn SegmentOwner<T>>> {
        Ok(Box::new(self.pool.rent(len, options.clean)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_pool() -> ArrayPool<u32> {
        ArrayPool::new(
            ArrayPoolOptions::default()
                .with_max_array_len(64)
                .with_max_arrays_per_bucket(2),
        )
        .unwrap()
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(16), 0);
        assert_eq!(bucket_index(17), 1);
        assert_eq!(bucket_index(64), 2);
        assert_eq!(bucket_len(2), 64);
    }

    #[test]
    fn test_rent_and_return() {
        let pool = small_pool();
        let mut array = pool.rent(20, false);
        assert!(array.is_pooled());
        assert_eq!(array.capacity(), 32);
        assert_eq!(SegmentOwner::len(&array), 20);
        array.as_mut_slice().fill(5);
        drop(array);
        assert_eq!(pool.retained_count(), 1);

        // Reused without cleaning keeps old contents.
        let array = pool.rent(30, false);
        assert_eq!(pool.retained_count(), 0);
        assert_eq!(array.as_slice()[0], 5);
        drop(array);

        let array = pool.rent(30, true);
        assert!(array.as_slice().iter().all(|&x| x == 0));
    }

    #[test]
    fn test_oversized_is_not_pooled() {
        let pool = small_pool();
        let array = pool.rent(65, false);
        assert!(!array.is_pooled());
        drop(array);
        assert_eq!(pool.retained_count(), 0);
    }

    #[test]
    fn test_bucket_limit() {
        let pool = small_pool();
        let arrays: Vec<_> = (0..3).map(|_| pool.rent(10, false)).collect();
        drop(arrays);
        assert_eq!(pool.retained_count(), 2);
    }

    #[test]
    fn test_invalid_options() {
        assert!(ArrayPool::<u8>::new(ArrayPoolOptions::default().with_max_array_len(100)).is_err());
        assert!(ArrayPool::<u8>::new(ArrayPoolOptions::default().with_max_array_len(8)).is_err());
    }
}
