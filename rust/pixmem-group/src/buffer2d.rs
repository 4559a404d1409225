//! Row-addressable 2-D pixel buffer over an owned group.

use pixmem_common::{Result, error::Error};

use crate::{
    alloc::{AllocationOptions, SegmentAllocator},
    group::BufferGroup,
    ops,
    owned::OwnedGroup,
    swap,
};

/// A `width × height` buffer stored row-major in an [`OwnedGroup`].
///
/// The group is allocated with a chunk size that is a multiple of `width`, so every
/// row lies within a single segment.
#[derive(Debug)]
pub struct Buffer2d<T> {
    group: OwnedGroup<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2d<T> {
    /// Allocates a `width × height` buffer.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if a single row does not fit in one allocator buffer, or if
    /// `width * height` overflows.
    pub fn allocate<A>(
        allocator: &A,
        width: usize,
        height: usize,
        options: AllocationOptions,
    ) -> Result<Self>
    where
        A: SegmentAllocator<T> + ?Sized,
    {
        let total_length = width.checked_mul(height).ok_or_else(|| {
            Error::invalid_arg("height", format!("{width} x {height} overflows"))
        })?;
        let group = OwnedGroup::allocate(allocator, total_length, width.max(1), options)?;
        Ok(Buffer2d {
            group,
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn group(&self) -> &OwnedGroup<T> {
        &self.group
    }

    /// Returns row `y`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if `y >= height`; `UseAfterDispose` if the group was disposed.
    pub fn row(&self, y: usize) -> Result<&[T]> {
        let (index, start) = self.locate_row(y)?;
        if self.width == 0 {
            return Ok(&[]);
        }
        let segment = self.group.segment(index)?;
        segment
            .get(start..start + self.width)
            .ok_or_else(|| Error::out_of_range("row", start + self.width, segment.len()))
    }

    /// Returns row `y`, mutably.
    pub fn row_mut(&mut self, y: usize) -> Result<&mut [T]> {
        let (index, start) = self.locate_row(y)?;
        if self.width == 0 {
            return Ok(&mut []);
        }
        let width = self.width;
        let segment = self.group.segment_mut(index)?;
        let available = segment.len();
        segment
            .get_mut(start..start + width)
            .ok_or_else(|| Error::out_of_range("row", start + width, available))
    }

    fn locate_row(&self, y: usize) -> Result<(usize, usize)> {
        if y >= self.height {
            return Err(Error::out_of_range("row", y, self.height));
        }
        if self.width == 0 {
            return Ok((0, 0));
        }
        let rows_per_segment = self.group.chunk_size() / self.width;
        if rows_per_segment == 0 {
            return Err(Error::out_of_range("row", self.width, self.group.chunk_size()));
        }
        Ok((y / rows_per_segment, (y % rows_per_segment) * self.width))
    }

    pub fn fill(&mut self, value: T) -> Result<()>
    where
        T: Copy,
    {
        ops::fill(&mut self.group, value)
    }

    pub fn clear(&mut self) -> Result<()>
    where
        T: bytemuck::Zeroable + Copy,
    {
        ops::clear(&mut self.group)
    }

    /// Copies the buffer row by row into `target`.
    pub fn copy_to_slice(&self, target: &mut [T]) -> Result<()>
    where
        T: Copy,
    {
        ops::copy_to_slice(&self.group, target)
    }

    /// Moves the content of `source` into this buffer; see
    /// [`swap_or_copy_content`](swap::swap_or_copy_content).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the two buffers differ in size.
    pub fn swap_or_copy_content(&mut self, source: &mut Buffer2d<T>) -> Result<bool>
    where
        T: Copy,
    {
        if self.width != source.width || self.height != source.height {
            return Err(Error::invalid_arg(
                "source",
                format!(
                    "size {}x{} does not match {}x{}",
                    source.width, source.height, self.width, self.height
                ),
            ));
        }
        swap::swap_or_copy_content(&mut self.group, &mut source.group)
    }
}
