//! The `BufferGroup` contract: a sequence of uniformly sized segments that behaves like
//! one linear buffer.

use pixmem_common::{Result, error::Error};

/// The read-only shape shared by every buffer group variant.
///
/// A group is an ordered sequence of segments. Every segment except the last holds
/// exactly [`chunk_size`](Self::chunk_size) elements; the last one holds between 1 and
/// `chunk_size` elements. An empty group has no segments at all.
pub trait BufferGroup<T> {
    /// Returns the number of segments.
    ///
    /// # Errors
    ///
    /// Fails with `UseAfterDispose` if the group has been disposed.
    fn count(&self) -> Result<usize>;

    /// Returns the uniform length of all segments but the last.
    fn chunk_size(&self) -> usize;

    /// Returns the sum of all segment lengths.
    fn total_length(&self) -> usize;

    /// Returns `false` once the group has been disposed.
    fn is_valid(&self) -> bool;

    /// Returns the segment at `index`.
    ///
    /// # Errors
    ///
    /// Fails with `UseAfterDispose` on a disposed group and with `OutOfRange` if
    /// `index >= count()`.
    fn segment(&self, index: usize) -> Result<&[T]>;

    /// Returns the segment at `index`, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`segment`](Self::segment).
    fn segment_mut(&mut self, index: usize) -> Result<&mut [T]>;

    /// Returns `true` if the group holds no elements.
    fn is_empty(&self) -> bool {
        self.total_length() == 0
    }

    /// Returns the length of the segment at `index`, as implied by the group layout.
    fn segment_len(&self, index: usize) -> usize {
        layout_segment_len(self.chunk_size(), self.total_length(), index)
    }

    /// Returns an iterator over the segments, in order.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidGroup` if the group is no longer valid.
    fn segments(&self) -> Result<Segments<'_, T, Self>>
    where
        Self: Sized,
    {
        if !self.is_valid() {
            return Err(Error::invalid_group("segments"));
        }
        Ok(Segments {
            group: self,
            index: 0,
            count: self.count()?,
            _marker: std::marker::PhantomData,
        })
    }
}

/// Iterator over the segments of a [`BufferGroup`].
pub struct Segments<'a, T, G: ?Sized> {
    group: &'a G,
    index: usize,
    count: usize,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<'a, T: 'a, G> Iterator for Segments<'a, T, G>
where
    G: BufferGroup<T> + ?Sized,
{
    type Item = &'a [T];

    fn next(&mut self) -> Option<&'a [T]> {
        if self.index >= self.count {
            return None;
        }
        let segment = self.group.segment(self.index).ok()?;
        self.index += 1;
        Some(segment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl<'a, T: 'a, G> ExactSizeIterator for Segments<'a, T, G> where G: BufferGroup<T> + ?Sized {}

/// Number of segments needed to hold `total_length` elements in chunks of `chunk_size`.
#[inline]
pub fn segment_count(chunk_size: usize, total_length: usize) -> usize {
    if total_length == 0 {
        0
    } else {
        total_length.div_ceil(chunk_size)
    }
}

/// Length of segment `index` in a group of `total_length` elements chunked by
/// `chunk_size`; zero past the last segment.
#[inline]
pub fn layout_segment_len(chunk_size: usize, total_length: usize, index: usize) -> usize {
    let start = index.saturating_mul(chunk_size);
    if start >= total_length {
        0
    } else {
        (total_length - start).min(chunk_size)
    }
}

/// Verifies the layout invariants of a group made of segments with the given lengths.
///
/// - the lengths add up to `total_length`;
/// - every segment but the last has `chunk_size` elements;
/// - the last segment has between 1 and `chunk_size` elements;
/// - `chunk_size` is positive whenever there is at least one segment.
pub(crate) fn verify_layout(
    lengths: impl ExactSizeIterator<Item = usize>,
    chunk_size: usize,
    total_length: usize,
) -> Result<()> {
    let count = lengths.len();
    if count == 0 {
        pixmem_common::verify_arg!(total_length, total_length == 0);
        return Ok(());
    }
    pixmem_common::verify_arg!(chunk_size, chunk_size > 0);

    let mut sum = 0usize;
    for (i, len) in lengths.enumerate() {
        if i + 1 < count {
            if len != chunk_size {
                return Err(Error::invalid_arg(
                    "segments",
                    format!("segment {i} has length {len}, expected chunk size {chunk_size}"),
                ));
            }
        } else if len == 0 || len > chunk_size {
            return Err(Error::invalid_arg(
                "segments",
                format!("last segment has length {len}, expected 1..={chunk_size}"),
            ));
        }
        sum += len;
    }

    if sum != total_length {
        return Err(Error::invalid_arg(
            "total_length",
            format!("segments hold {sum} elements, expected {total_length}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_count() {
        assert_eq!(segment_count(4, 0), 0);
        assert_eq!(segment_count(4, 1), 1);
        assert_eq!(segment_count(4, 4), 1);
        assert_eq!(segment_count(4, 5), 2);
        assert_eq!(segment_count(4, 10), 3);
    }

    #[test]
    fn test_layout_segment_len() {
        let lens: Vec<_> = (0..4).map(|i| layout_segment_len(4, 10, i)).collect();
        assert_eq!(lens, [4, 4, 2, 0]);
        assert_eq!(layout_segment_len(3, 3, 0), 3);
        assert_eq!(layout_segment_len(3, 0, 0), 0);
    }

    #[test]
    fn test_verify_layout() {
        assert!(verify_layout([4, 4, 2].into_iter(), 4, 10).is_ok());
        assert!(verify_layout([4].into_iter(), 4, 4).is_ok());
        assert!(verify_layout([4, 1].into_iter(), 4, 5).is_ok());
        assert!(verify_layout(std::iter::empty(), 0, 0).is_ok());

        assert!(verify_layout(std::iter::empty(), 4, 1).is_err());
        assert!(verify_layout([4, 3, 2].into_iter(), 4, 9).is_err());
        assert!(verify_layout([4, 5].into_iter(), 4, 9).is_err());
        assert!(verify_layout([4, 0].into_iter(), 4, 4).is_err());
        assert!(verify_layout([4, 2].into_iter(), 4, 7).is_err());
        assert!(verify_layout([0].into_iter(), 0, 0).is_err());
    }
}
