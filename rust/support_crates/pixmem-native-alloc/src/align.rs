/// Default alignment (in bytes) of natively allocated segment memory.
pub const DEFAULT_ALIGNMENT: usize = 64;

/// Aligns a number up to the next multiple of the specified alignment, returning `None`
/// on overflow.
///
/// # Examples
///
/// ```
/// use pixmem_native_alloc::align::checked_align_up;
///
/// assert_eq!(checked_align_up(9, 8), Some(16));
/// assert_eq!(checked_align_up(usize::MAX, 8), None);
/// ```
#[inline]
pub fn checked_align_up(n: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    n.checked_add(alignment - 1).map(|n| n & !(alignment - 1))
}

/// Checks if a pointer is aligned to the specified alignment boundary.
///
/// # Examples
///
/// ```
/// use pixmem_native_alloc::align::is_aligned_ptr;
///
/// assert!(is_aligned_ptr(64 as *const u8, 64));
/// assert!(!is_aligned_ptr(65 as *const u8, 64));
/// ```
#[inline]
pub fn is_aligned_ptr<T>(ptr: *const T, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    (ptr as usize) & (alignment - 1) == 0
}
