//! `SegmentOwner`: A trait for types that own one contiguous segment of a buffer group.

use std::ptr::NonNull;

use pixmem_lifetime::LifetimeGuard;

/// A trait for types that own a contiguous run of `T` elements backing one segment of
/// a buffer group.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - The memory described by `as_slice()`, `as_mut_slice()` and `backing()` is the same
///   region, and its address does not change for the entire lifetime of the owner,
///   including when the owner value itself is moved.
/// - The memory is exclusively accessible through the owner (no aliasing handles are
///   handed out elsewhere) while the owner is alive.
/// - Pointers returned by `backing()` are valid for reads and writes of `len()`
///   elements (starting at `base + offset` for [`SegmentBacking::Array`]) for as long as
///   the owner is alive, and were derived from a mutable borrow of the memory.
/// - `len()` never changes after construction.
pub unsafe trait SegmentOwner<T>: Send + Sync {
    /// Returns the number of elements in the segment.
    fn len(&self) -> usize;

    /// Returns `true` if the segment has no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the segment contents.
    fn as_slice(&self) -> &[T];

    /// Returns the segment contents, mutably.
    fn as_mut_slice(&mut self) -> &mut [T];

    /// Classifies the memory backing this segment.
    ///
    /// Called once, when the owner is handed to a buffer group.
    fn backing(&mut self) -> SegmentBacking<T> {
        SegmentBacking::Other
    }

    /// Returns the lifetime guard through which this segment supports counted
    /// ownership, if any.
    ///
    /// The owner holds one reference on the guard and releases it when dropped.
    fn lifetime_guard(&self) -> Option<&LifetimeGuard> {
        None
    }
}

/// Describes the concrete kind of memory behind a [`SegmentOwner`].
pub enum SegmentBacking<T> {
    /// A slot of a (possibly pooled) managed array. The segment starts `offset` elements
    /// past `base`.
    Array { base: NonNull<T>, offset: usize },
    /// Natively allocated memory starting at the pointer.
    Native(NonNull<T>),
    /// Any other memory; accessed through the owner's slice methods only.
    Other,
}

impl<T> std::fmt::Debug for SegmentBacking<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentBacking::Array { base, offset } => f
                .debug_struct("Array")
                .field("base", base)
                .field("offset", offset)
                .finish(),
            SegmentBacking::Native(ptr) => f.debug_tuple("Native").field(ptr).finish(),
            SegmentBacking::Other => f.write_str("Other"),
        }
    }
}

unsafe impl<T: Send + Sync> SegmentOwner<T> for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }

    fn backing(&mut self) -> SegmentBacking<T> {
        if Vec::is_empty(self) {
            return SegmentBacking::Other;
        }
        SegmentBacking::Array {
            base: NonNull::from(Vec::as_mut_slice(self)).cast(),
            offset: 0,
        }
    }
}

unsafe impl<T: Send + Sync> SegmentOwner<T> for Box<[T]> {
    #[inline]
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

/// A segment backed by a sub-range of a vector.
///
/// Useful when several logical segments are carved out of differently sized arrays, or
/// when an array is larger than the segment it backs.
pub struct VecSegment<T> {
    vec: Vec<T>,
    offset: usize,
    len: usize,
}

impl<T> VecSegment<T> {
    /// Creates a segment over `vec[offset..offset + len]`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn new(vec: Vec<T>, offset: usize, len: usize) -> VecSegment<T> {
        assert!(
            offset.checked_add(len).is_some_and(|end| end <= vec.len()),
            "segment range out of bounds: {offset}+{len} > {}",
            vec.len()
        );
        VecSegment { vec, offset, len }
    }

    /// Returns the offset of the segment within the underlying vector.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Consumes the segment and returns the underlying vector.
    pub fn into_inner(self) -> Vec<T> {
        self.vec
    }
}

unsafe impl<T: Send + Sync> SegmentOwner<T> for VecSegment<T> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        &self.vec[self.offset..self.offset + self.len]
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.vec[self.offset..self.offset + self.len]
    }

    fn backing(&mut self) -> SegmentBacking<T> {
        if self.len == 0 {
            return SegmentBacking::Other;
        }
        SegmentBacking::Array {
            base: NonNull::from(self.vec.as_mut_slice()).cast(),
            offset: self.offset,
        }
    }
}

impl<T> std::fmt::Debug for VecSegment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VecSegment")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("capacity", &self.vec.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_backing() {
        let mut v = vec![1u32, 2, 3];
        let expected = v.as_ptr();
        match SegmentOwner::backing(&mut v) {
            SegmentBacking::Array { base, offset } => {
                assert_eq!(base.as_ptr() as *const u32, expected);
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected backing {other:?}"),
        }
    }

    #[test]
    fn test_vec_segment_range() {
        let mut seg = VecSegment::new((0..10u8).collect(), 3, 4);
        assert_eq!(SegmentOwner::len(&seg), 4);
        assert_eq!(SegmentOwner::as_slice(&seg), &[3, 4, 5, 6]);
        SegmentOwner::as_mut_slice(&mut seg)[0] = 42;
        match seg.backing() {
            SegmentBacking::Array { base, offset } => {
                assert_eq!(offset, 3);
                assert_eq!(unsafe { *base.add(offset).as_ptr() }, 42);
            }
            other => panic!("unexpected backing {other:?}"),
        }
        assert_eq!(seg.into_inner()[3], 42);
    }

    #[test]
    #[should_panic]
    fn test_vec_segment_out_of_bounds() {
        let _ = VecSegment::new(vec![0u8; 4], 2, 3);
    }

    #[test]
    fn test_boxed_slice_is_other() {
        let mut b: Box<[u16]> = vec![7; 5].into_boxed_slice();
        assert!(matches!(b.backing(), SegmentBacking::Other));
        assert_eq!(SegmentOwner::len(&b), 5);
    }
}
