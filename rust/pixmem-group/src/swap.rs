use pixmem_common::{Result, error::Error};

use crate::{group::BufferGroup, ops::copy_to, owned::OwnedGroup};

/// Moves the content of `source` into `target`.
///
/// When both groups are swappable, their backing storage is exchanged and both views
/// are recreated, so handles obtained from either view before the call go stale.
/// Otherwise the elements are copied, which requires both groups to have the same
/// total length.
///
/// Returns `true` if the storage was swapped, `false` if it was copied.
///
/// # Errors
///
/// - `InvalidGroup` if either group was disposed.
/// - `InvalidOperation` when swapping groups that have counted references
///   outstanding, or when copying between groups of different lengths.
pub fn swap_or_copy_content<T>(target: &mut OwnedGroup<T>, source: &mut OwnedGroup<T>) -> Result<bool>
where
    T: Copy,
{
    if !target.is_valid() || !source.is_valid() {
        return Err(Error::invalid_group("swap_or_copy_content"));
    }

    if target.swappable() && source.swappable() {
        if target.external_ref_count() != 0 || source.external_ref_count() != 0 {
            return Err(Error::invalid_operation(
                "swap_or_copy_content with counted references outstanding",
            ));
        }
        target.swap_storage(source)?;
        return Ok(true);
    }

    if target.total_length() != source.total_length() {
        return Err(Error::invalid_operation(format!(
            "swap_or_copy_content between groups of length {} and {}",
            source.total_length(),
            target.total_length()
        )));
    }
    copy_to(&*source, target)?;
    Ok(false)
}
