use pixmem_common::{Result, error::Error};

use crate::group::{BufferGroup, verify_layout};

/// A buffer group over segments owned by someone else.
///
/// The group never owns, frees or swaps its segments; it only lends the
/// [`BufferGroup`] shape to memory the caller already holds.
pub struct ConsumedGroup<'a, T> {
    segments: Vec<&'a mut [T]>,
    chunk_size: usize,
    total_length: usize,
}

impl<'a, T> ConsumedGroup<'a, T> {
    /// Wraps `segments`, using the length of the first one as the chunk size.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the segments don't form a valid group layout.
    pub fn new(segments: Vec<&'a mut [T]>) -> Result<Self> {
        let chunk_size = segments.first().map_or(0, |s| s.len());
        Self::with_chunk_size(segments, chunk_size)
    }

    /// Wraps `segments` with an explicit chunk size.
    pub fn with_chunk_size(segments: Vec<&'a mut [T]>, chunk_size: usize) -> Result<Self> {
        let total_length = segments.iter().map(|s| s.len()).sum();
        verify_layout(segments.iter().map(|s| s.len()), chunk_size, total_length)?;
        Ok(ConsumedGroup {
            segments,
            chunk_size,
            total_length,
        })
    }

    /// Splits `data` into segments of `chunk_size` elements (the last one may be shorter).
    pub fn from_chunks(data: &'a mut [T], chunk_size: usize) -> Result<Self> {
        if data.is_empty() {
            return Self::with_chunk_size(Vec::new(), chunk_size);
        }
        pixmem_common::verify_arg!(chunk_size, chunk_size > 0);
        Self::with_chunk_size(data.chunks_mut(chunk_size).collect(), chunk_size)
    }

    /// Returns the wrapped segments for disjoint mutable access.
    ///
    /// The segments are reborrowed, so the layout checked at construction can't be
    /// replaced through them.
    pub fn segments_mut(&mut self) -> Vec<&mut [T]> {
        self.segments.iter_mut().map(|s| &mut **s).collect()
    }

    /// Releases the wrapped segments back to the caller.
    pub fn into_segments(self) -> Vec<&'a mut [T]> {
        self.segments
    }

    /// Does nothing: the segments belong to the caller.
    pub fn dispose(&mut self) {}
}

impl<T> BufferGroup<T> for ConsumedGroup<'_, T> {
    fn count(&self) -> Result<usize> {
        Ok(self.segments.len())
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn total_length(&self) -> usize {
        self.total_length
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn segment(&self, index: usize) -> Result<&[T]> {
        self.segments
            .get(index)
            .map(|s| &**s)
            .ok_or_else(|| Error::index_out_of_range(index, self.segments.len()))
    }

    fn segment_mut(&mut self, index: usize) -> Result<&mut [T]> {
        let count = self.segments.len();
        self.segments
            .get_mut(index)
            .map(|s| &mut **s)
            .ok_or_else(|| Error::index_out_of_range(index, count))
    }
}

impl<T> std::fmt::Debug for ConsumedGroup<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumedGroup")
            .field("count", &self.segments.len())
            .field("chunk_size", &self.chunk_size)
            .field("total_length", &self.total_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_segments_in_order() {
        let mut a = [1u8, 2, 3];
        let mut b = [4u8, 5, 6];
        let mut c = [7u8];
        let mut group = ConsumedGroup::new(vec![&mut a[..], &mut b[..], &mut c[..]]).unwrap();
        assert_eq!(group.count().unwrap(), 3);
        assert_eq!(group.chunk_size(), 3);
        assert_eq!(group.total_length(), 7);
        assert_eq!(group.segment(1).unwrap(), &[4, 5, 6]);
        let flat: Vec<u8> = group.segments().unwrap().flatten().copied().collect();
        assert_eq!(flat, [1, 2, 3, 4, 5, 6, 7]);

        group.dispose();
        assert!(group.is_valid());
        group.segment_mut(2).unwrap()[0] = 70;
        drop(group);
        assert_eq!(c, [70]);
    }

    #[test]
    fn test_rejects_bad_layout() {
        let mut a = [0u8; 2];
        let mut b = [0u8; 3];
        assert!(ConsumedGroup::new(vec![&mut a[..], &mut b[..]]).is_err());

        let mut empty: [u8; 0] = [];
        assert!(ConsumedGroup::new(vec![&mut empty[..]]).is_err());
    }

    #[test]
    fn test_index_out_of_range() {
        let mut data = [0u32; 4];
        let group = ConsumedGroup::from_chunks(&mut data, 2).unwrap();
        let err = group.segment(2).unwrap_err();
        assert!(err.is_out_of_range());
    }

    #[test]
    fn test_segments_mut_keeps_layout() {
        let mut data = [0u32; 10];
        let mut group = ConsumedGroup::from_chunks(&mut data, 4).unwrap();
        for (i, segment) in group.segments_mut().into_iter().enumerate() {
            segment.fill(i as u32 + 1);
        }
        assert_eq!(group.segment_len(0), 4);
        assert_eq!(group.segment(2).unwrap().len(), 2);

        let mut flat = [0u32; 10];
        crate::ops::copy_to_slice(&group, &mut flat).unwrap();
        assert_eq!(flat, [1, 1, 1, 1, 2, 2, 2, 2, 3, 3]);
    }

    #[test]
    fn test_empty() {
        let mut data: [u32; 0] = [];
        let group = ConsumedGroup::from_chunks(&mut data, 4).unwrap();
        assert_eq!(group.count().unwrap(), 0);
        assert!(group.is_empty());
        assert_eq!(group.segments().unwrap().count(), 0);
    }
}
