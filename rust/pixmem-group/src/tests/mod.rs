#[cfg(test)]
mod copy_walks;



#[cfg(test)]
mod parallel;


use crate::{OwnedGroup, alloc::HeapAllocator, alloc::AllocationOptions};

/// Heap-backed group of `total` `u32` elements chunked by `chunk`.
pub(crate) fn heap_group(chunk: usize, total: usize) -> OwnedGroup<u32> {
    let allocator = HeapAllocator::new(chunk * std::mem::size_of::<u32>());
    OwnedGroup::allocate(&allocator, total, 1, AllocationOptions::default()).unwrap()
}
