use crate::{
    BufferGroup, ConsumedGroup, OwnedGroup,
    alloc::{AllocationOptions, ArrayPool, ArrayPoolOptions, PoolAllocator},
    ops,
    tests::heap_group,
};

fn sequential_group(chunk: usize, total: usize) -> OwnedGroup<u32> {
    let mut group = heap_group(chunk, total);
    let data: Vec<u32> = (0..total as u32).collect();
    ops::copy_from_slice(&data, &mut group).unwrap();
    group
}

#[test]
fn test_copy_across_chunk_sizes() {
    let source = sequential_group(3, 7);
    let mut target = heap_group(5, 7);
    assert_eq!(source.count().unwrap(), 3);
    assert_eq!(target.count().unwrap(), 2);

    ops::copy_to(&source, &mut target).unwrap();
    assert_eq!(ops::flatten_to_vec(&target).unwrap(), (0..7).collect::<Vec<u32>>());
}

#[test]
fn test_transform_across_chunk_sizes() {
    let source = sequential_group(3, 7);
    let mut target = heap_group(5, 7);

    ops::transform_to(&source, &mut target, |src: &[u32], dst: &mut [u32]| {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s * 2;
        }
    })
    .unwrap();
    assert_eq!(
        ops::flatten_to_vec(&target).unwrap(),
        (0..7).map(|x| x * 2).collect::<Vec<u32>>()
    );
}

#[test]
fn test_copy_into_larger_target() {
    let source = sequential_group(4, 6);
    let mut target = heap_group(5, 12);
    ops::fill(&mut target, 99).unwrap();
    ops::copy_to(&source, &mut target).unwrap();

    let flat = ops::flatten_to_vec(&target).unwrap();
    assert_eq!(&flat[..6], &[0, 1, 2, 3, 4, 5]);
    assert!(flat[6..].iter().all(|&x| x == 99));
}

#[test]
fn test_copy_into_smaller_target_fails() {
    let source = sequential_group(4, 10);
    let mut target = heap_group(4, 9);
    let err = ops::copy_to(&source, &mut target).unwrap_err();
    assert!(err.is_out_of_range());
    assert!(ops::flatten_to_vec(&target).unwrap().iter().all(|&x| x == 0));
}

#[test]
fn test_operations_reject_disposed_group() {
    let mut group = sequential_group(4, 10);
    let mut other = heap_group(4, 10);
    group.dispose();

    assert!(matches!(
        ops::fill(&mut group, 1).unwrap_err().kind(),
        pixmem_common::error::ErrorKind::InvalidGroup { .. }
    ));
    assert!(ops::copy_to(&group, &mut other).is_err());
    assert!(ops::copy_to(&other, &mut group).is_err());
    assert!(ops::flatten_to_vec(&group).is_err());
    assert!(group.segments().is_err());
}

#[test]
fn test_round_trip_through_contiguous_buffer() {
    fastrand::seed(215478963);
    let pool = ArrayPool::<u32>::new(ArrayPoolOptions::default().with_max_array_len(64)).unwrap();
    let pooled = PoolAllocator::new(pool);

    for total in [0usize, 1, 7, 16, 64, 65, 300] {
        let data: Vec<u32> = (0..total).map(|_| fastrand::u32(..)).collect();

        let mut first = heap_group(7, total);
        ops::copy_from_slice(&data, &mut first).unwrap();

        let mut second =
            OwnedGroup::allocate(&pooled, total, 1, AllocationOptions::clean()).unwrap();
        ops::copy_to(&first, &mut second).unwrap();

        let mut third_data = vec![0u32; total];
        let mut third = ConsumedGroup::from_chunks(&mut third_data, 11).unwrap();
        ops::copy_to(&second, &mut third).unwrap();

        let mut flat = vec![0u32; total];
        ops::copy_to_slice(&third, &mut flat).unwrap();
        assert_eq!(flat, data, "total length {total}");
    }
}

#[test]
fn test_transform_to_different_element_type() {
    let source = sequential_group(6, 20);
    let mut rgba = vec![[0u8; 4]; 20];
    let mut target = ConsumedGroup::from_chunks(&mut rgba, 8).unwrap();

    ops::transform_to(&source, &mut target, |src: &[u32], dst: &mut [[u8; 4]]| {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s.to_le_bytes();
        }
    })
    .unwrap();
    drop(target);
    assert_eq!(rgba[19], [19, 0, 0, 0]);
}
