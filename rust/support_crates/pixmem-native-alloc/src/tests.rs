use pixmem_common_traits::segment_owner::{SegmentBacking, SegmentOwner};

use crate::{align, native_buffer::NativeBuffer, raw};

#[test]
fn test_raw_allocations() {
    let (ptr, size) = raw::allocate(1, 64).unwrap();
    assert_eq!(size, 64);
    assert!(align::is_aligned_ptr(ptr.as_ptr(), 64));
    unsafe { raw::free(ptr, size, 64).expect("free") };

    let (ptr, size) = raw::allocate(0, 64).unwrap();
    assert_eq!(size, 64, "Zero size should allocate one aligned unit");
    unsafe { raw::free(ptr, size, 64).expect("free") };
}

#[test]
fn test_raw_allocate_rounds_up() {
    let (ptr, size) = raw::allocate(64 * 3 + 1, 64).expect("allocate");
    assert_eq!(size, 64 * 4);
    unsafe { raw::free(ptr, size, 64).expect("free") };
}

#[test]
fn test_raw_allocate_bad_alignment() {
    let err = raw::allocate(16, 48).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn test_native_buffer_allocate() {
    let buffer = NativeBuffer::<u32>::allocate(100).expect("Failed to allocate buffer");

    assert_eq!(buffer.len(), 100);
    assert!(buffer.capacity() >= 100);
    assert_eq!(buffer.alignment(), align::DEFAULT_ALIGNMENT);
    assert!(align::is_aligned_ptr(buffer.as_ptr(), buffer.alignment()));
    assert!(!buffer.is_empty());
    assert!(buffer.iter().all(|&v| v == 0));
}

#[test]
fn test_native_buffer_zero_len() {
    let buffer = NativeBuffer::<u64>::allocate(0).expect("Failed to allocate zero-size buffer");

    assert_eq!(buffer.len(), 0);
    assert!(buffer.is_empty());
    assert!(buffer.capacity() >= 1);
    assert!(buffer.as_slice().is_empty());
}

#[test]
fn test_native_buffer_type_alignment_wins() {
    let buffer = NativeBuffer::<u128>::allocate_aligned(4, 1).expect("allocate");
    assert!(buffer.alignment() >= std::mem::align_of::<u128>());
    assert!(align::is_aligned_ptr(buffer.as_ptr(), std::mem::align_of::<u128>()));
}

#[test]
fn test_native_buffer_write_and_clear() {
    let mut buffer = NativeBuffer::<u16>::allocate(16).expect("allocate");
    buffer[0] = 42;
    buffer[15] = 7;
    assert_eq!(buffer.as_slice()[0], 42);
    assert_eq!(buffer.as_slice()[15], 7);

    buffer.clear();
    assert!(buffer.iter().all(|&v| v == 0));
}

#[test]
fn test_native_buffer_segment_owner() {
    let mut buffer = NativeBuffer::<f32>::allocate(8).expect("allocate");
    let expected = buffer.as_ptr();
    SegmentOwner::as_mut_slice(&mut buffer)[3] = 1.5;
    assert_eq!(SegmentOwner::len(&buffer), 8);
    assert!(SegmentOwner::lifetime_guard(&buffer).is_none());
    match SegmentOwner::backing(&mut buffer) {
        SegmentBacking::Native(ptr) => {
            assert_eq!(ptr.as_ptr(), expected);
            assert_eq!(unsafe { *ptr.as_ptr().add(3) }, 1.5);
        }
        other => panic!("unexpected backing {other:?}"),
    }
}

#[test]
fn test_native_buffer_address_survives_move() {
    let buffer = NativeBuffer::<u32>::allocate(4).expect("allocate");
    let before = buffer.as_ptr();
    let moved = vec![buffer];
    assert_eq!(moved[0].as_ptr(), before);
}

#[test]
fn test_native_buffer_debug() {
    let buffer = NativeBuffer::<u8>::allocate(32).expect("allocate");
    let debug_str = format!("{:?}", buffer);
    assert!(debug_str.contains("NativeBuffer"));
    assert!(debug_str.contains("len"));
    assert!(debug_str.contains("capacity"));
}

#[test]
fn test_native_buffer_multiple_allocations() {
    let sizes = [1, 63, 64, 65, 4096];
    let buffers: Vec<_> = sizes
        .iter()
        .map(|&size| NativeBuffer::<u8>::allocate(size).expect("allocate"))
        .collect();

    for (buffer, &size) in buffers.iter().zip(sizes.iter()) {
        assert_eq!(buffer.len(), size);
        assert!(align::is_aligned_ptr(buffer.as_ptr(), 64));
    }
}
