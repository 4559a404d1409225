//! Raw, zero-initialized block allocation through the global allocator.

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::ptr::NonNull;

use crate::align::checked_align_up;

/// Allocates a zeroed memory block of at least `size` bytes with the given alignment.
///
/// The returned capacity is `size` rounded up to a multiple of `alignment` (and is never
/// zero, so that every block owns a distinct address).
pub fn allocate(size: usize, alignment: usize) -> std::io::Result<(NonNull<u8>, usize)> {
    let layout = block_layout(size, alignment)?;
    let ptr = unsafe { alloc_zeroed(layout) };
    let ptr = NonNull::new(ptr).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            format!("failed to allocate {} bytes", layout.size()),
        )
    })?;
    Ok((ptr, layout.size()))
}

/// Frees a block previously returned by [`allocate`].
///
/// # Safety
///
/// `ptr`, `capacity` and `alignment` must be exactly the pointer and capacity returned
/// by a call to `allocate` with the same `alignment`, and the block must not be used
/// after this call.
pub unsafe fn free(ptr: NonNull<u8>, capacity: usize, alignment: usize) -> std::io::Result<()> {
    let layout = block_layout(capacity, alignment)?;
    debug_assert_eq!(layout.size(), capacity);
    unsafe {
        dealloc(ptr.as_ptr(), layout);
    }
    Ok(())
}

fn block_layout(size: usize, alignment: usize) -> std::io::Result<Layout> {
    if !alignment.is_power_of_two() {
        return Err(invalid_layout("alignment is not a power of two"));
    }
    let capacity =
        checked_align_up(size.max(1), alignment).ok_or_else(|| invalid_layout("size overflow"))?;
    Layout::from_size_align(capacity, alignment).map_err(|_| invalid_layout("invalid layout"))
}

fn invalid_layout(message: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, message.to_string())
}
