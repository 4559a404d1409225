//! Operations over any [`BufferGroup`], walking segment boundaries in place.
//!
//! Every operation first checks that the groups involved are valid (`InvalidGroup`),
//! then that the target can hold the source (`OutOfRange`). Groups with no segments
//! are a no-op past those checks.

use pixmem_common::{Result, error::Error};

use crate::{
    cursor::{Cursor, CursorMut},
    group::BufferGroup,
};

/// Sets every element of the group to `value`.
pub fn fill<T, G>(group: &mut G, value: T) -> Result<()>
where
    T: Copy,
    G: BufferGroup<T> + ?Sized,
{
    ensure_valid::<T, G>(&*group, "fill")?;
    for i in 0..group.count()? {
        group.segment_mut(i)?.fill(value);
    }
    Ok(())
}

/// Sets every element of the group to its all-zero value.
pub fn clear<T, G>(group: &mut G) -> Result<()>
where
    T: bytemuck::Zeroable + Copy,
    G: BufferGroup<T> + ?Sized,
{
    ensure_valid::<T, G>(&*group, "clear")?;
    fill(group, T::zeroed())
}

/// Copies the contents of the group into the front of `target`.
///
/// # Errors
///
/// `OutOfRange` if `target` is shorter than the group.
pub fn copy_to_slice<T, G>(group: &G, target: &mut [T]) -> Result<()>
where
    T: Copy,
    G: BufferGroup<T> + ?Sized,
{
    ensure_valid::<T, G>(group, "copy_to_slice")?;
    let total = group.total_length();
    if target.len() < total {
        return Err(Error::target_too_small(total, target.len()));
    }

    let mut position = 0;
    for i in 0..group.count()? {
        let segment = group.segment(i)?;
        target[position..position + segment.len()].copy_from_slice(segment);
        position += segment.len();
    }
    Ok(())
}

/// Copies `source` into the front of the group.
///
/// # Errors
///
/// `OutOfRange` if the group is shorter than `source`.
pub fn copy_from_slice<T, G>(source: &[T], group: &mut G) -> Result<()>
where
    T: Copy,
    G: BufferGroup<T> + ?Sized,
{
    ensure_valid::<T, G>(&*group, "copy_from_slice")?;
    let total = group.total_length();
    if total < source.len() {
        return Err(Error::target_too_small(source.len(), total));
    }

    let mut rest = source;
    let mut index = 0;
    while !rest.is_empty() {
        let segment = group.segment_mut(index)?;
        let n = segment.len().min(rest.len());
        segment[..n].copy_from_slice(&rest[..n]);
        rest = &rest[n..];
        index += 1;
    }
    Ok(())
}

/// Copies the contents of `source` into the front of `target`.
///
/// The groups may have different chunk sizes; the copy proceeds in runs bounded by
/// whichever segment ends first on either side.
///
/// # Errors
///
/// `OutOfRange` if `target` holds fewer elements than `source`.
pub fn copy_to<T, S, D>(source: &S, target: &mut D) -> Result<()>
where
    T: Copy,
    S: BufferGroup<T> + ?Sized,
    D: BufferGroup<T> + ?Sized,
{
    transform_to(source, target, |src: &[T], dst: &mut [T]| {
        dst.copy_from_slice(src)
    })
}

/// Walks `source` and `target` in lockstep and calls `transform` on each pair of
/// equally long runs.
///
/// `S` and `D` may be different element types; `transform` receives source and target
/// slices of the same length and is expected to fill the target slice.
///
/// # Errors
///
/// `OutOfRange` if `target` holds fewer elements than `source`.
pub fn transform_to<S, D, GS, GD, F>(source: &GS, target: &mut GD, mut transform: F) -> Result<()>
where
    GS: BufferGroup<S> + ?Sized,
    GD: BufferGroup<D> + ?Sized,
    F: FnMut(&[S], &mut [D]),
{
    ensure_valid::<S, GS>(source, "transform_to source")?;
    ensure_valid::<D, GD>(&*target, "transform_to target")?;
    let required = source.total_length();
    if target.total_length() < required {
        return Err(Error::target_too_small(required, target.total_length()));
    }
    if required == 0 {
        return Ok(());
    }

    let mut src = Cursor::new(source)?;
    let mut dst = CursorMut::new(target)?;
    let mut remaining = required;
    while remaining > 0 {
        let n = src.look_ahead().min(dst.look_ahead());
        if n == 0 {
            return Err(Error::internal_inconsistency(format!(
                "segment walk stalled with {remaining} elements left"
            )));
        }
        transform(src.get_slice(n)?, dst.get_slice(n)?);
        src.forward(n)?;
        dst.forward(n)?;
        remaining -= n;
    }
    Ok(())
}

/// Calls `transform` once per segment, in order.
pub fn transform_inplace<T, G, F>(group: &mut G, mut transform: F) -> Result<()>
where
    G: BufferGroup<T> + ?Sized,
    F: FnMut(&mut [T]),
{
    ensure_valid::<T, G>(&*group, "transform_inplace")?;
    for i in 0..group.count()? {
        transform(group.segment_mut(i)?);
    }
    Ok(())
}

/// Collects the contents of the group into a single vector.
pub fn flatten_to_vec<T, G>(group: &G) -> Result<Vec<T>>
where
    T: Copy,
    G: BufferGroup<T> + ?Sized,
{
    ensure_valid::<T, G>(group, "flatten_to_vec")?;
    let mut result = Vec::with_capacity(group.total_length());
    for i in 0..group.count()? {
        result.extend_from_slice(group.segment(i)?);
    }
    Ok(result)
}

fn ensure_valid<T, G>(group: &G, operation: &str) -> Result<()>
where
    G: BufferGroup<T> + ?Sized,
{
    if group.is_valid() {
        Ok(())
    } else {
        Err(Error::invalid_group(operation))
    }
}
