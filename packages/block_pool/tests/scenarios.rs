//! End-to-end usage of the public API, separate from the main crate to prove that none of
//! this depends on accessing private APIs.
#![allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]

use std::collections::HashSet;
use std::ptr;

use block_pool::{DropPolicy, Error, Multipool, Pool};

/// Pool with initial block size 2, growth factor 2 and maximum block size 8.
type SmallPool = Pool<u64, 2, 8>;

#[test]
fn two_constructs_fill_the_first_block() {
    let mut pool = SmallPool::new(2);

    let p1 = pool.construct(1);
    let p2 = pool.construct(2);

    assert_ne!(p1, p2);
    assert!(pool.full());
    assert_eq!(pool.block_count(), 1);

    pool.release();
}

#[test]
fn third_construct_grows_by_one_block() {
    let mut pool = SmallPool::new(2);

    let p1 = pool.construct(1);
    let p2 = pool.construct(2);
    let p3 = pool.construct(3);

    assert_ne!(p3, p1);
    assert_ne!(p3, p2);
    assert!(!pool.full());
    assert_eq!(pool.block_sizes().collect::<Vec<_>>(), [2, 4]);

    // Growth did not disturb the objects in the first block.
    unsafe {
        assert_eq!(p1.read(), 1);
        assert_eq!(p2.read(), 2);
        assert_eq!(p3.read(), 3);
    }

    pool.release();
}

#[test]
fn destroyed_slot_is_reused_next() {
    let mut pool = SmallPool::new(2);

    let p1 = pool.construct(1);
    let _p2 = pool.construct(2);
    let _p3 = pool.construct(3);

    unsafe {
        pool.destroy(p1.as_ptr());
    }

    assert_eq!(pool.construct(4), p1);

    pool.release();
}

#[test]
fn filling_one_multipool_member_leaves_the_other_free() {
    struct A(#[expect(dead_code, reason = "only the type matters")] u32);
    struct B(#[expect(dead_code, reason = "only the type matters")] u64);

    let mut pools = Multipool::<(A, B)>::new(4);

    for i in 0..4 {
        _ = pools.construct(A(i));
    }

    assert!(pools.get::<A, _>().full());
    assert!(!pools.get::<B, _>().full());
    assert_eq!(pools.get::<B, _>().capacity(), 4);

    pools.release_all();

    assert!(pools.get::<A, _>().full());
    assert!(pools.get::<B, _>().full());

    let a = pools.construct(A(5));
    assert!(pools.get::<A, _>().contains(a.as_ptr()));

    pools.release_all();
}

#[test]
fn destroying_one_multipool_member_leaves_the_other_alone() {
    struct A(#[expect(dead_code, reason = "only the type matters")] u32);
    struct B(#[expect(dead_code, reason = "only the type matters")] u64);

    let mut pools = Multipool::<(A, B)>::new(4);

    let a_items: Vec<_> = (0..4).map(|i| pools.construct(A(i))).collect();
    let _b1 = pools.construct(B(1));
    let _b2 = pools.construct(B(2));

    let b_before = pools.get::<B, _>().diagnostics();

    for a in a_items {
        unsafe {
            pools.destroy::<A, _>(a.as_ptr());
        }
    }

    let b_after = pools.get::<B, _>().diagnostics();
    assert_eq!(b_after.next_free_address(), b_before.next_free_address());
    assert_eq!(b_after.free_count(), b_before.free_count());

    let b3 = pools.construct(B(3));
    assert_eq!(Some(b3.as_ptr().addr()), b_before.next_free_address());
    assert!(pools.get::<B, _>().contains(b3.as_ptr()));

    pools.release_all();
}

#[test]
fn destroy_null_changes_nothing() {
    let mut pool = SmallPool::new(2);
    let item = pool.construct(1);

    let before = pool.diagnostics();
    unsafe {
        pool.destroy(ptr::null_mut());
    }

    assert_eq!(pool.diagnostics(), before);

    unsafe {
        pool.destroy(item.as_ptr());
    }
}

#[test]
fn block_sizes_never_decrease_and_cap_at_max() {
    let mut pool = SmallPool::new(2);
    let mut items = Vec::new();

    for i in 0..100 {
        items.push(pool.construct(i));
    }

    let sizes: Vec<usize> = pool.block_sizes().collect();
    assert!(sizes.windows(2).all(|pair| pair.first() <= pair.get(1)));
    assert!(sizes.iter().all(|&size| size <= 8));
    assert_eq!(sizes.iter().sum::<usize>(), pool.capacity());

    // Every object got its own address and kept it.
    let addresses: HashSet<_> = items.iter().map(|item| item.as_ptr()).collect();
    assert_eq!(addresses.len(), items.len());

    for (expected, item) in (0..100_u64).zip(&items) {
        assert_eq!(unsafe { item.read() }, expected);
    }

    for item in items {
        unsafe {
            pool.destroy(item.as_ptr());
        }
    }

    assert!(pool.is_empty());
    assert_eq!(pool.diagnostics().free_count(), pool.capacity());
}

#[test]
fn release_then_reuse() {
    let mut pool = SmallPool::new(2);

    for i in 0..3 {
        _ = pool.construct(i);
    }

    pool.release();
    assert!(pool.full());
    assert!(pool.is_empty());

    let item = pool.construct(7);
    assert_eq!(unsafe { item.read() }, 7);
    assert_eq!(pool.block_sizes().collect::<Vec<_>>(), [8]);

    pool.release();
}

#[test]
fn invalid_configuration_is_reported() {
    assert_eq!(
        SmallPool::builder()
            .initial_block_size(0)
            .try_build()
            .unwrap_err(),
        Error::ZeroInitialBlockSize
    );

    assert_eq!(
        Multipool::<(u8, u16), 2, 8>::builder()
            .initial_block_size(9)
            .try_build()
            .unwrap_err(),
        Error::InitialBlockSizeTooLarge {
            requested: 9,
            max: 8
        }
    );
}

#[test]
#[should_panic]
fn new_with_zero_initial_block_size_panics() {
    drop(SmallPool::new(0));
}

#[test]
fn strict_pool_can_be_dropped_when_empty() {
    let mut pool = Pool::<String>::builder()
        .initial_block_size(4)
        .drop_policy(DropPolicy::MustNotForgetItems)
        .build();

    let items: Vec<_> = (0..10).map(|i| pool.construct(i.to_string())).collect();

    for item in items {
        unsafe {
            pool.destroy(item.as_ptr());
        }
    }
}

#[test]
fn diagnostics_report_renders() {
    let mut pool = SmallPool::new(2);
    let _a = pool.construct(1);
    let _b = pool.construct(2);

    let report = pool.diagnostics().to_string();

    assert!(report.contains("u64"));
    assert!(report.contains("next free: none"));
    assert!(report.contains("block 0:"));

    pool.release();
}
