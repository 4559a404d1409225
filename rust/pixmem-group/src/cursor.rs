//! Position trackers used by the segment-walking operations.

use std::marker::PhantomData;

use pixmem_common::{Result, error::Error};

use crate::group::BufferGroup;

/// A read position within a buffer group: a segment index and an offset into that
/// segment.
pub(crate) struct Cursor<'a, T, G: ?Sized> {
    group: &'a G,
    index: usize,
    offset: usize,
    count: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: 'a, G> Cursor<'a, T, G>
where
    G: BufferGroup<T> + ?Sized,
{
    pub fn new(group: &'a G) -> Result<Self> {
        Ok(Cursor {
            group,
            index: 0,
            offset: 0,
            count: group.count()?,
            _marker: PhantomData,
        })
    }

    /// Number of elements left in the current segment.
    pub fn look_ahead(&self) -> usize {
        remaining_in_segment::<T, G>(self.group, self.index, self.offset, self.count)
    }

    /// Returns the next `n` elements of the current segment.
    pub fn get_slice(&self, n: usize) -> Result<&'a [T]> {
        let group: &'a G = self.group;
        let segment = group.segment(self.index)?;
        segment
            .get(self.offset..self.offset + n)
            .ok_or_else(|| overrun(n, segment.len().saturating_sub(self.offset)))
    }

    /// Advances the position by `n` elements, moving to the start of the next segment
    /// when the end of the current one is reached exactly.
    pub fn forward(&mut self, n: usize) -> Result<()> {
        advance(
            self.look_ahead(),
            n,
            &mut self.index,
            &mut self.offset,
        )
    }
}

/// A write position within a buffer group.
pub(crate) struct CursorMut<'a, T, G: ?Sized> {
    group: &'a mut G,
    index: usize,
    offset: usize,
    count: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: 'a, G> CursorMut<'a, T, G>
where
    G: BufferGroup<T> + ?Sized,
{
    pub fn new(group: &'a mut G) -> Result<Self> {
        let count = group.count()?;
        Ok(CursorMut {
            group,
            index: 0,
            offset: 0,
            count,
            _marker: PhantomData,
        })
    }

    pub fn look_ahead(&self) -> usize {
        remaining_in_segment::<T, G>(&*self.group, self.index, self.offset, self.count)
    }

    pub fn get_slice(&mut self, n: usize) -> Result<&mut [T]> {
        let offset = self.offset;
        let segment = self.group.segment_mut(self.index)?;
        let available = segment.len().saturating_sub(offset);
        segment
            .get_mut(offset..offset + n)
            .ok_or_else(|| overrun(n, available))
    }

    pub fn forward(&mut self, n: usize) -> Result<()> {
        advance(
            self.look_ahead(),
            n,
            &mut self.index,
            &mut self.offset,
        )
    }
}

fn remaining_in_segment<T, G>(group: &G, index: usize, offset: usize, count: usize) -> usize
where
    G: BufferGroup<T> + ?Sized,
{
    if index >= count {
        0
    } else {
        group.segment_len(index) - offset
    }
}

fn advance(look_ahead: usize, n: usize, index: &mut usize, offset: &mut usize) -> Result<()> {
    if n > look_ahead {
        return Err(overrun(n, look_ahead));
    }
    if n == look_ahead {
        *index += 1;
        *offset = 0;
    } else {
        *offset += n;
    }
    Ok(())
}

#[cold]
fn overrun(requested: usize, available: usize) -> Error {
    Error::internal_inconsistency(format!(
        "cursor overrun: {requested} elements requested, {available} left in segment"
    ))
}

#[cfg(test)]
mod tests {
    use pixmem_common::error::ErrorKind;

    use super::*;
    use crate::consumed::ConsumedGroup;

    #[test]
    fn test_cursor_walk() {
        let mut data: Vec<u32> = (0..10).collect();
        let group = ConsumedGroup::from_chunks(&mut data, 4).unwrap();
        let mut cursor = Cursor::new(&group).unwrap();

        assert_eq!(cursor.look_ahead(), 4);
        assert_eq!(cursor.get_slice(3).unwrap(), &[0, 1, 2]);
        cursor.forward(3).unwrap();
        assert_eq!(cursor.look_ahead(), 1);
        cursor.forward(1).unwrap();
        assert_eq!(cursor.look_ahead(), 4);
        assert_eq!(cursor.get_slice(4).unwrap(), &[4, 5, 6, 7]);
        cursor.forward(4).unwrap();
        assert_eq!(cursor.look_ahead(), 2);
        cursor.forward(2).unwrap();
        assert_eq!(cursor.look_ahead(), 0);
    }

    #[test]
    fn test_forward_past_segment_end() {
        let mut data = vec![0u8; 6];
        let group = ConsumedGroup::from_chunks(&mut data, 4).unwrap();
        let mut cursor = Cursor::new(&group).unwrap();
        cursor.forward(2).unwrap();

        let err = cursor.forward(3).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InternalInconsistency { .. }
        ));
        // The failed step leaves the position untouched.
        assert_eq!(cursor.look_ahead(), 2);
    }

    #[test]
    fn test_cursor_mut_writes() {
        let mut data = vec![0u16; 5];
        {
            let mut group = ConsumedGroup::from_chunks(&mut data, 3).unwrap();
            let mut cursor = CursorMut::new(&mut group).unwrap();
            cursor.forward(2).unwrap();
            cursor.get_slice(1).unwrap()[0] = 9;
            cursor.forward(1).unwrap();
            cursor.get_slice(2).unwrap().copy_from_slice(&[7, 8]);
            assert!(cursor.get_slice(3).is_err());
            cursor.forward(2).unwrap();
            assert_eq!(cursor.look_ahead(), 0);
        }
        assert_eq!(data, [0, 0, 9, 7, 8]);
    }
}
