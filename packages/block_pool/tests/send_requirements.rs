//! Pools are thread-mobile when their item types are, and never thread-safe.

use std::cell::Cell;
use std::rc::Rc;

use block_pool::{Multipool, Pool};
use static_assertions::{assert_impl_all, assert_not_impl_any};

assert_impl_all!(Pool<String>: Send);
assert_impl_all!(Pool<Cell<u32>>: Send);
assert_not_impl_any!(Pool<String>: Sync);
assert_not_impl_any!(Pool<Rc<String>>: Send);

assert_impl_all!(Multipool<(u8, String, Vec<u64>)>: Send);
assert_not_impl_any!(Multipool<(u8, String)>: Sync);
assert_not_impl_any!(Multipool<(u8, Rc<String>)>: Send);

#[test]
fn pool_moves_to_another_thread_with_its_objects() {
    let mut pool = Pool::<u64>::new(4);

    for i in 0..10 {
        _ = pool.construct(i);
    }

    let len = std::thread::spawn(move || {
        let len = pool.len();
        pool.release();
        len
    })
    .join()
    .unwrap();

    assert_eq!(len, 10);
}
