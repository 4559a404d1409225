//! Stale-checked handles to the segments of an [`OwnedGroup`].
//!
//! A group publishes its segments through exactly one [`GroupView`]. Each handle in
//! the view records the view token it was created under and a segment index; it is
//! resolved against the group on every access. Swapping or disposing the group
//! invalidates the token, so handles obtained before that point fail with `StaleView`
//! instead of reaching memory that no longer belongs to the group.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use pixmem_common::{Result, error::Error};

use crate::{group::BufferGroup, owned::OwnedGroup};

/// Shared validity flag of one generation of a group's view.
#[derive(Debug)]
pub(crate) struct ViewToken {
    valid: AtomicBool,
}

impl ViewToken {
    fn new() -> Arc<ViewToken> {
        Arc::new(ViewToken {
            valid: AtomicBool::new(true),
        })
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

/// The current set of segment handles of an owned group.
#[derive(Debug)]
pub struct GroupView {
    token: Arc<ViewToken>,
    segments: Vec<ViewSegment>,
}

impl GroupView {
    pub(crate) fn new(lengths: impl Iterator<Item = usize>) -> GroupView {
        let token = ViewToken::new();
        let segments = lengths
            .enumerate()
            .map(|(index, len)| ViewSegment {
                token: token.clone(),
                index,
                len,
            })
            .collect();
        GroupView { token, segments }
    }

    /// Returns `false` once the owning group was swapped or disposed.
    pub fn is_valid(&self) -> bool {
        self.token.is_valid()
    }

    /// Number of segment handles in this view.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the handle for segment `index`.
    ///
    /// # Errors
    ///
    /// `StaleView` if the view was invalidated, `OutOfRange` past the last segment.
    pub fn segment(&self, index: usize) -> Result<ViewSegment> {
        if !self.is_valid() {
            return Err(Error::stale_view(index));
        }
        self.segments
            .get(index)
            .cloned()
            .ok_or_else(|| Error::index_out_of_range(index, self.segments.len()))
    }

    /// Iterates over all handles of this view.
    pub fn iter(&self) -> impl Iterator<Item = &ViewSegment> {
        self.segments.iter()
    }

    pub(crate) fn token(&self) -> &Arc<ViewToken> {
        &self.token
    }

    pub(crate) fn invalidate(&self) {
        self.token.invalidate();
    }
}

/// A handle to one segment of an owned group, valid until the group's backing
/// segments are swapped or disposed.
#[derive(Debug, Clone)]
pub struct ViewSegment {
    token: Arc<ViewToken>,
    index: usize,
    len: usize,
}

impl ViewSegment {
    /// Index of the segment within its group.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Length of the segment at the time the handle was created.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` while the handle can still be resolved.
    pub fn is_valid(&self) -> bool {
        self.token.is_valid()
    }

    /// Resolves the handle against `group`.
    ///
    /// # Errors
    ///
    /// `StaleView` if the group's segments were swapped or disposed after the handle
    /// was obtained, or if the handle belongs to a different group.
    pub fn slice<'g, T>(&self, group: &'g OwnedGroup<T>) -> Result<&'g [T]> {
        self.check(group)?;
        group.segment(self.index)
    }

    /// Resolves the handle against `group`, mutably.
    pub fn slice_mut<'g, T>(&self, group: &'g mut OwnedGroup<T>) -> Result<&'g mut [T]> {
        self.check(group)?;
        group.segment_mut(self.index)
    }

    fn check<T>(&self, group: &OwnedGroup<T>) -> Result<()> {
        if self.token.is_valid() && Arc::ptr_eq(&self.token, group.view().token()) {
            Ok(())
        } else {
            Err(Error::stale_view(self.index))
        }
    }
}
