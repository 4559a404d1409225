//! Natively allocated typed buffer.
//!
//! This module provides `NativeBuffer<T>`, a fixed-capacity block of `T` elements
//! obtained directly from the global allocator with a caller-chosen alignment. It is
//! the pointer-backed segment kind of a buffer group: the block address never changes
//! for the lifetime of the buffer, so a group may cache it.
//!
//! # Safety
//!
//! While `NativeBuffer` implements `Send` and `Sync`, users must ensure that any data
//! written to the buffer is properly synchronized when accessed from multiple threads.

use std::marker::PhantomData;
use std::ptr::NonNull;

use pixmem_common_traits::segment_owner::{SegmentBacking, SegmentOwner};

use crate::{align::DEFAULT_ALIGNMENT, raw};

/// A natively allocated, zero-initialized buffer of `T` elements.
pub struct NativeBuffer<T> {
    /// Start of the allocated block.
    ptr: NonNull<T>,
    /// The logical length of the buffer, in elements.
    len: usize,
    /// The allocated size of the block, in bytes.
    capacity_bytes: usize,
    /// Block alignment, in bytes.
    alignment: usize,
    _marker: PhantomData<T>,
}

impl<T> NativeBuffer<T>
where
    T: bytemuck::Zeroable,
{
    /// Allocates a zeroed buffer of `len` elements with the default (64-byte) alignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the size computation overflows or the allocator fails.
    pub fn allocate(len: usize) -> std::io::Result<NativeBuffer<T>> {
        Self::allocate_aligned(len, DEFAULT_ALIGNMENT)
    }

    /// Allocates a zeroed buffer of `len` elements, aligned to at least `alignment`
    /// bytes.
    ///
    /// # Arguments
    ///
    /// * `len` - The number of elements.
    /// * `alignment` - The minimal block alignment in bytes (a power of two). The
    ///   natural alignment of `T` is used if it is larger.
    ///
    /// # Panics
    ///
    /// Panics if `T` is a zero-sized type.
    ///
    /// # Errors
    ///
    /// Returns an error if `alignment` is not a power of two, the size computation
    /// overflows, or the allocator fails.
    pub fn allocate_aligned(len: usize, alignment: usize) -> std::io::Result<NativeBuffer<T>> {
        let elem_size = std::mem::size_of::<T>();
        assert_ne!(elem_size, 0, "zero-sized element types are not supported");
        let alignment = alignment.max(std::mem::align_of::<T>());
        let size = len.checked_mul(elem_size).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "buffer size overflow")
        })?;
        let (ptr, capacity_bytes) = raw::allocate(size, alignment)?;
        Ok(NativeBuffer {
            ptr: ptr.cast(),
            len,
            capacity_bytes,
            alignment,
            _marker: PhantomData,
        })
    }

    /// Sets every element of the buffer to its all-zero value.
    pub fn clear(&mut self) {
        unsafe {
            self.ptr.as_ptr().write_bytes(0, self.len);
        }
    }
}

impl<T> NativeBuffer<T> {
    /// Returns the length of the buffer in elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer has a length of 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements the allocated block can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity_bytes / std::mem::size_of::<T>()
    }

    /// Returns the alignment of the block in bytes.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Returns a raw pointer to the beginning of the block.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - The pointer is not used after the `NativeBuffer` is dropped
    /// - Any access to the memory region is within bounds (0..len)
    /// - Proper synchronization is used for concurrent access
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns the buffer contents.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Returns the buffer contents, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> std::ops::Deref for NativeBuffer<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T> std::ops::DerefMut for NativeBuffer<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

unsafe impl<T: Send + Sync> SegmentOwner<T> for NativeBuffer<T> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        NativeBuffer::as_slice(self)
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        NativeBuffer::as_mut_slice(self)
    }

    fn backing(&mut self) -> SegmentBacking<T> {
        SegmentBacking::Native(self.ptr)
    }
}

impl<T> Drop for NativeBuffer<T> {
    fn drop(&mut self) {
        let _ = unsafe { raw::free(self.ptr.cast(), self.capacity_bytes, self.alignment) };
    }
}

// SAFETY: NativeBuffer exclusively owns its block and frees it on drop.
unsafe impl<T: Send> Send for NativeBuffer<T> {}

// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Sync> Sync for NativeBuffer<T> {}

impl<T> std::fmt::Debug for NativeBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("alignment", &self.alignment)
            .finish()
    }
}
