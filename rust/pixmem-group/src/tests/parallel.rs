use rayon::prelude::*;

use crate::{
    BufferGroup, ConsumedGroup, OwnedGroup,
    alloc::{AllocationOptions, UniformPool, UniformPoolAllocator, UniformPoolOptions},
    ops,
    tests::heap_group,
};

#[test]
fn test_parallel_fill_per_segment() {
    let mut group = heap_group(64, 1000);
    group
        .segments_mut()
        .unwrap()
        .into_par_iter()
        .enumerate()
        .for_each(|(i, segment)| segment.fill(i as u32));

    for i in 0..group.count().unwrap() {
        assert!(group.segment(i).unwrap().iter().all(|&x| x == i as u32));
    }
}

#[test]
fn test_parallel_over_pointer_segments() {
    let pool = UniformPool::<u64>::new(
        UniformPoolOptions::default()
            .with_block_len(128)
            .with_capacity(16),
    )
    .unwrap();
    let allocator = UniformPoolAllocator::new(pool);
    let mut group: OwnedGroup<u64> =
        OwnedGroup::allocate(&allocator, 1500, 1, AllocationOptions::clean()).unwrap();

    let offsets: Vec<usize> = (0..group.count().unwrap()).map(|i| i * 128).collect();
    group
        .segments_mut()
        .unwrap()
        .into_par_iter()
        .zip(offsets)
        .for_each(|(segment, offset)| {
            for (j, x) in segment.iter_mut().enumerate() {
                *x = (offset + j) as u64;
            }
        });
    assert_eq!(
        ops::flatten_to_vec(&group).unwrap(),
        (0..1500u64).collect::<Vec<_>>()
    );
}

#[test]
fn test_parallel_consumed_segments() {
    let mut data = vec![1i32; 777];
    let mut group = ConsumedGroup::from_chunks(&mut data, 100).unwrap();
    group
        .segments_mut()
        .par_iter_mut()
        .for_each(|segment| segment.iter_mut().for_each(|x| *x *= -3));
    drop(group);
    assert!(data.iter().all(|&x| x == -3));
}
