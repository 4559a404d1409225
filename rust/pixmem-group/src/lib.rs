//! Discontiguous buffer groups: large logical buffers stored as a sequence of
//! uniformly sized segments.
//!
//! A [`BufferGroup`] behaves like one linear buffer of `total_length()` elements
//! split into segments of `chunk_size()` elements (the last one may be shorter). The
//! operations in [`ops`] walk segment boundaries in place, including between groups of
//! different chunk sizes, and never materialize an intermediate contiguous copy.
//!
//! Two group variants are provided:
//! - [`OwnedGroup`] owns its segment memory, supports counted references, disposal
//!   and storage swaps, and publishes its segments through a stale-checked
//!   [`GroupView`];
//! - [`ConsumedGroup`] lends the group shape to segments owned by the caller.
//!
//! Owned groups are usually obtained from a [`SegmentAllocator`](alloc::SegmentAllocator):
//! the plain [`HeapAllocator`](alloc::HeapAllocator), the bucketed
//! [`ArrayPool`](alloc::ArrayPool) or the native [`UniformPool`](alloc::UniformPool).

pub mod alloc;
pub mod buffer2d;
pub mod consumed;
mod cursor;
pub mod group;
pub mod ops;
pub mod owned;
pub mod span_cache;
pub mod swap;
pub mod view;

#[cfg(test)]
mod tests;

pub use buffer2d::Buffer2d;
pub use consumed::ConsumedGroup;
pub use group::BufferGroup;
pub use owned::OwnedGroup;
pub use span_cache::CacheMode;
pub use swap::swap_or_copy_content;
pub use view::{GroupView, ViewSegment};
