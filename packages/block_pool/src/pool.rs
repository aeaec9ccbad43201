use std::any::type_name;
use std::iter;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;
use std::thread;

use scopeguard::ScopeGuard;
use tracing::{debug, trace};

use crate::{Block, BlockDiagnostics, Diagnostics, DropPolicy, PoolBuilder, Slot};

/// An object pool for values of type `T` that grows in blocks and reuses memory via a free list.
///
/// The pool requests memory from the system allocator in blocks of slots. Objects are written
/// into free slots by [`construct()`][1] and dropped in place by [`destroy()`][2], which puts
/// the slot back on a free list that spans all blocks. Slots are reused in LIFO order: the most
/// recently destroyed slot is the next one handed out.
///
/// When the free list is empty, the next [`construct()`][1] allocates a new block of
/// `min(GROWTH_FACTOR * block_size, MAX_BLOCK_SIZE)` slots, where `block_size` is the size of
/// the previous growth step (initially the size of the first block). Blocks are never resized,
/// moved or freed individually, so every pointer returned by [`construct()`][1] stays valid
/// until the object is destroyed or the pool [releases][3] its memory.
///
/// # Configuration
///
/// * `GROWTH_FACTOR` (default 2) - multiplier applied to the block size on each growth step.
///   Must be at least 1.
/// * `MAX_BLOCK_SIZE` (default 1024) - upper limit on the number of slots in any block.
///   Must be at least 1.
/// * The initial block size and the [drop policy][DropPolicy] are set via [`builder()`][4] or
///   [`new()`][5].
///
/// # Out of band access
///
/// The pool never creates references to its objects. You access them through the pointers
/// returned by [`construct()`][1], using unsafe code, and you decide how they are aliased.
///
/// # Dropping the pool
///
/// The pool does not know which slots hold live objects, so it cannot drop them. Destroy every
/// object before the pool goes away if its destructor matters. What happens to objects that are
/// still alive when the pool is dropped is governed by the [drop policy][DropPolicy].
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) if `T` is, but it is not thread-safe ([`Sync`]).
///
/// # Example
///
/// ```
/// use block_pool::Pool;
///
/// let mut pool = Pool::<String>::new(2);
///
/// let hello = pool.construct("Hello".to_string());
/// let world = pool.construct("World".to_string());
///
/// // SAFETY: Both pointers came from this pool and the objects are still alive.
/// unsafe {
///     assert_eq!(hello.as_ref(), "Hello");
///     assert_eq!(world.as_ref(), "World");
/// }
///
/// // SAFETY: The pointer came from this pool and has not been destroyed yet.
/// unsafe { pool.destroy(hello.as_ptr()); }
///
/// // The freed slot is reused first.
/// let again = pool.construct("Again".to_string());
/// assert_eq!(again, hello);
///
/// // SAFETY: Both pointers came from this pool and have not been destroyed yet.
/// unsafe {
///     pool.destroy(again.as_ptr());
///     pool.destroy(world.as_ptr());
/// }
/// ```
///
/// [1]: Self::construct
/// [2]: Self::destroy
/// [3]: Self::release
/// [4]: Self::builder
/// [5]: Self::new
pub struct Pool<T, const GROWTH_FACTOR: usize = 2, const MAX_BLOCK_SIZE: usize = 1024> {
    /// The blocks that provide the storage of the pool, in allocation order.
    blocks: Vec<Block<T>>,

    /// The block size that the next growth step multiplies by `GROWTH_FACTOR`.
    ///
    /// This is pool state in its own right, not derived from `blocks`, because it survives
    /// `release()`.
    block_size: NonZero<usize>,

    /// Head of the free list. Every slot on the list lies inside one of `blocks`.
    next_free: Option<NonNull<Slot<T>>>,

    /// Number of live objects. Every slot is either on the free list or holds a live object,
    /// so the free list is always `capacity - length` long.
    length: usize,

    drop_policy: DropPolicy,
}

impl<T, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize>
    Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>
{
    /// Creates a pool whose first block has `initial_block_size` slots, with the
    /// default [drop policy][DropPolicy].
    ///
    /// # Panics
    ///
    /// Panics if `initial_block_size` is zero or greater than `MAX_BLOCK_SIZE`.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let pool = Pool::<u64>::new(16);
    ///
    /// assert_eq!(pool.capacity(), 16);
    /// assert_eq!(pool.len(), 0);
    /// assert!(!pool.full());
    /// ```
    #[must_use]
    pub fn new(initial_block_size: usize) -> Self {
        Self::builder()
            .initial_block_size(initial_block_size)
            .build()
    }

    /// Starts building a new [`Pool`].
    ///
    /// Use this when you want to customize the pool configuration or handle an invalid
    /// initial block size as an error.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::{DropPolicy, Pool};
    ///
    /// let pool = Pool::<u32>::builder()
    ///     .initial_block_size(8)
    ///     .drop_policy(DropPolicy::MustNotForgetItems)
    ///     .build();
    ///
    /// assert_eq!(pool.capacity(), 8);
    /// ```
    pub fn builder() -> PoolBuilder<T, GROWTH_FACTOR, MAX_BLOCK_SIZE> {
        PoolBuilder::new()
    }

    /// The initial block size must already be validated against `MAX_BLOCK_SIZE`.
    #[must_use]
    pub(crate) fn new_inner(initial_block_size: NonZero<usize>, drop_policy: DropPolicy) -> Self {
        const {
            assert!(GROWTH_FACTOR >= 1, "pool growth factor must be at least 1");
            assert!(
                MAX_BLOCK_SIZE >= 1,
                "pool maximum block size must be at least 1"
            );
        }

        debug_assert!(initial_block_size.get() <= MAX_BLOCK_SIZE);

        let mut pool = Self {
            blocks: Vec::new(),
            block_size: initial_block_size,
            next_free: None,
            length: 0,
            drop_policy,
        };

        pool.push_block(initial_block_size);

        trace!(
            item_type = type_name::<T>(),
            initial_block_size = initial_block_size.get(),
            growth_factor = GROWTH_FACTOR,
            max_block_size = MAX_BLOCK_SIZE,
            "created pool"
        );

        pool
    }

    /// Moves `value` into a free slot of the pool and returns a pointer to it.
    ///
    /// If the pool is [full][Self::full], a new block is allocated first. This does not move
    /// any existing object, so previously returned pointers remain valid.
    ///
    /// The object stays alive until it is passed to [`destroy()`][Self::destroy] or the pool
    /// releases its memory. Access the object through the returned pointer from unsafe code.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let mut pool = Pool::<u64>::new(1);
    ///
    /// let first = pool.construct(1);
    /// assert!(pool.full());
    ///
    /// // The pool grows to make room. The first object stays where it is.
    /// let second = pool.construct(2);
    ///
    /// // SAFETY: Both objects are alive and nothing else references them.
    /// unsafe {
    ///     assert_eq!(first.read(), 1);
    ///     assert_eq!(second.read(), 2);
    /// }
    /// # // SAFETY: Both pointers came from this pool and have not been destroyed yet.
    /// # unsafe { pool.destroy(first.as_ptr()); pool.destroy(second.as_ptr()); }
    /// ```
    #[must_use]
    pub fn construct(&mut self, value: T) -> NonNull<T> {
        let slot = self.pop_free_slot();
        let item = Slot::item_ptr(slot);

        // SAFETY: The slot was just taken off the free list, so it holds no live object and
        // nobody else refers to it. Slots are sized and aligned for T.
        unsafe {
            item.write(value);
        }

        // Cannot overflow because every live object occupies a distinct slot in memory.
        self.length = self.length.wrapping_add(1);

        item
    }

    /// Initializes an object in place in a free slot of the pool and returns a pointer to it.
    ///
    /// The closure receives the uninitialized storage of the slot. This avoids constructing the
    /// object elsewhere and moving it into the pool, which can matter for large types.
    ///
    /// If the closure panics, the slot is returned to the free list and the pool is left as if
    /// the call never happened (except for any growth that took place).
    ///
    /// # Example
    ///
    /// ```
    /// use std::mem::MaybeUninit;
    ///
    /// use block_pool::Pool;
    ///
    /// let mut pool = Pool::<[u64; 512]>::new(4);
    ///
    /// // SAFETY: The closure fully initializes the array.
    /// let item = unsafe {
    ///     pool.construct_with(|uninit: &mut MaybeUninit<[u64; 512]>| {
    ///         uninit.write([7; 512]);
    ///     })
    /// };
    ///
    /// // SAFETY: The object is alive and nothing else references it.
    /// assert_eq!(unsafe { item.as_ref() }[511], 7);
    /// # // SAFETY: The pointer came from this pool and has not been destroyed yet.
    /// # unsafe { pool.destroy(item.as_ptr()); }
    /// ```
    ///
    /// # Safety
    ///
    /// The closure must fully initialize the `MaybeUninit<T>` before returning normally.
    #[must_use]
    pub unsafe fn construct_with(&mut self, f: impl FnOnce(&mut MaybeUninit<T>)) -> NonNull<T> {
        let slot = self.pop_free_slot();

        // If the initializer panics, the slot goes back on the free list.
        let pool = scopeguard::guard(self, move |pool| {
            // SAFETY: The slot came off our free list above and the initializer did not
            // finish, so the slot holds no live object.
            unsafe {
                pool.push_free_slot(slot);
            }
        });

        let mut uninit = Slot::item_ptr(slot).cast::<MaybeUninit<T>>();

        // SAFETY: The slot is ours alone and sized and aligned for T. MaybeUninit does not
        // require the memory to be initialized.
        f(unsafe { uninit.as_mut() });

        let pool = ScopeGuard::into_inner(pool);

        // Cannot overflow because every live object occupies a distinct slot in memory.
        pool.length = pool.length.wrapping_add(1);

        uninit.cast()
    }

    /// Drops the object that `ptr` points to and returns its slot to the free list.
    ///
    /// The slot becomes the head of the free list, so the next [`construct()`][Self::construct]
    /// reuses it. This never calls into the system allocator.
    ///
    /// A null pointer is ignored.
    ///
    /// If the destructor of the object panics, the slot is still returned to the free list.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let mut pool = Pool::<String>::new(4);
    ///
    /// let item = pool.construct("short-lived".to_string());
    /// assert_eq!(pool.len(), 1);
    ///
    /// // SAFETY: The pointer came from this pool and has not been destroyed yet.
    /// unsafe { pool.destroy(item.as_ptr()); }
    /// assert_eq!(pool.len(), 0);
    ///
    /// // SAFETY: Null pointers are always accepted.
    /// unsafe { pool.destroy(std::ptr::null_mut()); }
    /// ```
    ///
    /// # Safety
    ///
    /// Unless null, `ptr` must have been returned by [`construct()`][Self::construct] or
    /// [`construct_with()`][Self::construct_with] on this pool, must not have been destroyed
    /// already, and the pool must not have been released since. No references to the object
    /// may be in use after this call.
    pub unsafe fn destroy(&mut self, ptr: *mut T) {
        let Some(item) = NonNull::new(ptr) else {
            return;
        };

        let slot = Slot::from_item_ptr(item);

        // The slot goes back on the free list even if the destructor panics.
        let _recycle = scopeguard::guard(self, move |pool| {
            // SAFETY: The object in the slot has been dropped (or its destructor unwound),
            // so the slot holds no live object. The caller guarantees the slot is ours.
            unsafe {
                pool.push_free_slot(slot);
            }

            pool.length = pool
                .length
                .checked_sub(1)
                .expect("destroyed more objects than the pool has constructed");
        });

        // SAFETY: The caller guarantees that the pointer refers to a live object from this pool.
        unsafe {
            item.drop_in_place();
        }
    }

    /// Returns all blocks to the system allocator without dropping any live objects.
    ///
    /// This is meant for bulk teardown when the objects have trivial destructors or have been
    /// cleaned up by other means. Every pointer previously returned by the pool becomes dangling.
    ///
    /// Afterwards the pool holds no blocks and is [full][Self::full]. It remains usable: the next
    /// [`construct()`][Self::construct] allocates a new block. The block size counter is not
    /// reset, so that block has `min(GROWTH_FACTOR * block_size, MAX_BLOCK_SIZE)` slots, growth
    /// carrying on from where it was before the release.
    ///
    /// The [drop policy][DropPolicy] does not apply to this method.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let mut pool = Pool::<u32, 2, 64>::new(4);
    /// let _item = pool.construct(1);
    ///
    /// pool.release();
    /// assert!(pool.full());
    /// assert_eq!(pool.capacity(), 0);
    ///
    /// // Growth continues from the block size reached before the release.
    /// let _item = pool.construct(2);
    /// assert_eq!(pool.capacity(), 8);
    /// ```
    pub fn release(&mut self) {
        debug!(
            item_type = type_name::<T>(),
            block_count = self.blocks.len(),
            forgotten_items = self.length,
            block_size = self.block_size.get(),
            "releasing all blocks"
        );

        self.next_free = None;
        self.length = 0;
        self.blocks.clear();
    }

    /// Whether the free list is empty, meaning the next [`construct()`][Self::construct]
    /// will allocate a new block first.
    ///
    /// A full pool still accepts new objects. This is a hint about the cost of the next call.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let mut pool = Pool::<u8>::new(2);
    /// assert!(!pool.full());
    ///
    /// let _a = pool.construct(1);
    /// let _b = pool.construct(2);
    /// assert!(pool.full());
    ///
    /// let _c = pool.construct(3);
    /// assert!(!pool.full());
    /// ```
    #[must_use]
    pub fn full(&self) -> bool {
        self.next_free.is_none()
    }

    /// The number of live objects in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the pool has no live objects.
    ///
    /// An empty pool may still be holding blocks of free slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The total number of slots in all blocks, live or free.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let mut pool = Pool::<u32, 2, 1024>::new(3);
    /// assert_eq!(pool.capacity(), 3);
    ///
    /// let items: Vec<_> = (0..4).map(|i| pool.construct(i)).collect();
    ///
    /// // The fourth object required a second block of 2 * 3 slots.
    /// assert_eq!(pool.capacity(), 9);
    /// # for item in items {
    /// #     // SAFETY: The pointers came from this pool and have not been destroyed yet.
    /// #     unsafe { pool.destroy(item.as_ptr()); }
    /// # }
    /// ```
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks.iter().map(|block| block.len().get()).sum()
    }

    /// The number of blocks the pool currently owns.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The sizes of the blocks the pool currently owns, in allocation order.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let mut pool = Pool::<u32, 2, 8>::new(2);
    /// let items: Vec<_> = (0..20).map(|i| pool.construct(i)).collect();
    ///
    /// let sizes: Vec<usize> = pool.block_sizes().collect();
    /// assert_eq!(sizes, [2, 4, 8, 8]);
    /// # pool.release();
    /// ```
    #[must_use]
    pub fn block_sizes(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.blocks.iter().map(|block| block.len().get())
    }

    /// The block size counter: the size of the most recent growth step, or the initial block
    /// size if the pool has not grown yet.
    ///
    /// The next growth step allocates `min(GROWTH_FACTOR * block_size(), MAX_BLOCK_SIZE)` slots.
    /// This value is kept across [`release()`][Self::release].
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size.get()
    }

    /// The [drop policy][DropPolicy] the pool was created with.
    #[must_use]
    pub fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    /// Whether `ptr` points at a slot inside one of the blocks of this pool.
    ///
    /// This only checks the address. It does not tell whether the slot holds a live object.
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let mut pool = Pool::<u32>::new(4);
    /// let item = pool.construct(5);
    ///
    /// assert!(pool.contains(item.as_ptr()));
    /// assert!(!pool.contains(&5));
    /// # // SAFETY: The pointer came from this pool and has not been destroyed yet.
    /// # unsafe { pool.destroy(item.as_ptr()); }
    /// ```
    #[must_use]
    pub fn contains(&self, ptr: *const T) -> bool {
        let Some(item) = NonNull::new(ptr.cast_mut()) else {
            return false;
        };

        let slot = Slot::from_item_ptr(item);

        self.blocks.iter().any(|block| block.contains(slot))
    }

    /// Reports on the internal state of the pool: item layout, free list, and blocks.
    ///
    /// This walks the free list and is intended for debugging, not for hot paths.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            item_type: type_name::<T>(),
            item_size: size_of::<T>(),
            item_align: align_of::<T>(),
            slot_size: size_of::<Slot<T>>(),
            next_free_address: self.next_free.map(|slot| slot.as_ptr().addr()),
            block_size: self.block_size.get(),
            free_count: self.free_slots().count(),
            live_count: self.length,
            blocks: self
                .blocks
                .iter()
                .map(|block| BlockDiagnostics {
                    start_address: block.start_address(),
                    slot_count: block.len().get(),
                })
                .collect(),
        }
    }

    /// Takes the head of the free list, growing the pool first if the list is empty.
    fn pop_free_slot(&mut self) -> NonNull<Slot<T>> {
        if self.next_free.is_none() {
            self.grow();
        }

        let slot = self
            .next_free
            .expect("growing the pool always puts at least one slot on the free list");

        // SAFETY: Slots on the free list hold links, not objects.
        self.next_free = unsafe { Slot::next(slot) };

        slot
    }

    /// Makes `slot` the new head of the free list.
    ///
    /// # Safety
    ///
    /// The slot must lie inside one of our blocks, must not hold a live object and must not
    /// already be on the free list.
    unsafe fn push_free_slot(&mut self, slot: NonNull<Slot<T>>) {
        // SAFETY: Forwarding the guarantee that the slot is ours and holds no live object.
        unsafe {
            Slot::set_next(slot, self.next_free);
        }

        self.next_free = Some(slot);
    }

    // Mutating the size calculation can result in unbounded memory use.
    #[cfg_attr(test, mutants::skip)]
    fn grow(&mut self) {
        let block_size = self
            .block_size
            .get()
            .saturating_mul(GROWTH_FACTOR)
            .min(MAX_BLOCK_SIZE);

        let block_size = NonZero::new(block_size)
            .expect("growth factor, maximum block size and block size are all at least 1");

        self.push_block(block_size);
        self.block_size = block_size;
    }

    fn push_block(&mut self, len: NonZero<usize>) {
        debug_assert!(
            self.next_free.is_none(),
            "a new block is only added when the free list is empty"
        );

        let block = Block::new(len);
        self.next_free = Some(block.first_slot());
        self.blocks.push(block);

        debug!(
            item_type = type_name::<T>(),
            block_size = len.get(),
            block_count = self.blocks.len(),
            "allocated block"
        );
    }

    fn free_slots(&self) -> impl Iterator<Item = NonNull<Slot<T>>> + '_ {
        // SAFETY: Slots on the free list hold links, not objects.
        iter::successors(self.next_free, |slot| unsafe { Slot::next(*slot) })
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let mut previous_len = 0;

        for block in &self.blocks {
            let len = block.len().get();

            assert!(
                len >= previous_len,
                "block of {len} slots was allocated after a block of {previous_len} slots"
            );
            assert!(
                len <= MAX_BLOCK_SIZE,
                "block of {len} slots exceeds the maximum block size {MAX_BLOCK_SIZE}"
            );

            previous_len = len;
        }

        let capacity = self.capacity();
        let mut free_count: usize = 0;

        for slot in self.free_slots() {
            free_count = free_count
                .checked_add(1)
                .expect("free list count overflowed");

            assert!(
                free_count <= capacity,
                "free list is longer than the capacity {capacity}, it must contain a cycle"
            );
            assert!(
                self.blocks.iter().any(|block| block.contains(slot)),
                "free list contains a slot outside of the pool's blocks"
            );
        }

        assert_eq!(
            free_count.checked_add(self.length),
            Some(capacity),
            "free slots plus live objects must add up to the capacity"
        );
    }
}

impl<T, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> Default
    for Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>
{
    /// Creates a pool whose first block has a single slot.
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> Drop
    for Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>
{
    fn drop(&mut self) {
        let forgotten_items = self.length;

        // The blocks are freed after this, whether or not we panic below.

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if !thread::panicking() && matches!(self.drop_policy, DropPolicy::MustNotForgetItems) {
            assert!(
                forgotten_items == 0,
                "dropped a Pool<{}> with {forgotten_items} live objects - this is forbidden by DropPolicy::MustNotForgetItems",
                type_name::<T>()
            );
        }
    }
}

impl<T, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> std::fmt::Debug
    for Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("item_type", &std::format_args!("{}", type_name::<T>()))
            .field("growth_factor", &GROWTH_FACTOR)
            .field("max_block_size", &MAX_BLOCK_SIZE)
            .field("blocks", &self.blocks)
            .field("block_size", &self.block_size)
            .field("next_free", &self.next_free)
            .field("length", &self.length)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

// SAFETY: The raw pointers in the pool only point into blocks that the pool owns exclusively.
// Moving the pool to another thread moves ownership of all its objects with it, which is fine
// as long as the objects themselves may be sent. The pool is not Sync because it offers no
// synchronization.
unsafe impl<T: Send, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> Send
    for Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>
{
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::indexing_slicing,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::ptr;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(Pool<u32>: Send, std::fmt::Debug, Default);
    assert_not_impl_any!(Pool<u32>: Sync, Clone);
    assert_not_impl_any!(Pool<Rc<u32>>: Send, Sync);

    /// Counts how many instances have been dropped.
    struct DropCounter {
        drops: Rc<Cell<usize>>,
    }

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn smoke_test() {
        let mut pool = Pool::<u32>::new(3);

        let a = pool.construct(42);
        let b = pool.construct(43);
        let c = pool.construct(44);

        unsafe {
            assert_eq!(a.read(), 42);
            assert_eq!(b.read(), 43);
            assert_eq!(c.read(), 44);
        }

        assert_eq!(pool.len(), 3);
        pool.integrity_check();

        unsafe {
            pool.destroy(b.as_ptr());
        }

        assert_eq!(pool.len(), 2);
        pool.integrity_check();

        let d = pool.construct(45);

        unsafe {
            assert_eq!(a.read(), 42);
            assert_eq!(c.read(), 44);
            assert_eq!(d.read(), 45);

            pool.destroy(a.as_ptr());
            pool.destroy(c.as_ptr());
            pool.destroy(d.as_ptr());
        }

        assert!(pool.is_empty());
        pool.integrity_check();
    }

    #[test]
    fn new_pool_has_exactly_one_block() {
        let pool = Pool::<u64, 2, 8>::new(5);

        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.block_sizes().collect::<Vec<_>>(), [5]);
        assert_eq!(pool.block_size(), 5);
        assert_eq!(pool.capacity(), 5);
        assert!(!pool.full());
        pool.integrity_check();
    }

    #[test]
    fn first_block_is_handed_out_in_address_order() {
        let mut pool = Pool::<u64>::new(4);

        let items: Vec<_> = (0..4).map(|i| pool.construct(i)).collect();

        for pair in items.windows(2) {
            assert_eq!(
                pair[1].as_ptr().addr() - pair[0].as_ptr().addr(),
                size_of::<Slot<u64>>()
            );
        }

        pool.release();
    }

    #[test]
    fn destroyed_slots_are_reused_lifo() {
        let mut pool = Pool::<u64>::new(8);

        let items: Vec<_> = (0..8).map(|i| pool.construct(i)).collect();

        unsafe {
            pool.destroy(items[2].as_ptr());
            pool.destroy(items[5].as_ptr());
            pool.destroy(items[0].as_ptr());
        }

        assert_eq!(pool.construct(100), items[0]);
        assert_eq!(pool.construct(101), items[5]);
        assert_eq!(pool.construct(102), items[2]);
        assert!(pool.full());

        pool.integrity_check();
        pool.release();
    }

    #[test]
    fn growth_happens_only_when_full() {
        let mut pool = Pool::<u32, 3, 100>::new(2);

        let _a = pool.construct(1);
        let _b = pool.construct(2);
        assert_eq!(pool.block_count(), 1);
        assert!(pool.full());

        let _c = pool.construct(3);
        assert_eq!(pool.block_sizes().collect::<Vec<_>>(), [2, 6]);
        assert_eq!(pool.block_size(), 6);

        pool.integrity_check();
    }

    #[test]
    fn growth_is_capped_at_max_block_size() {
        let mut pool = Pool::<u32, 4, 10>::new(3);

        for i in 0..50 {
            _ = pool.construct(i);
        }

        assert_eq!(
            pool.block_sizes().collect::<Vec<_>>(),
            [3, 10, 10, 10, 10, 10]
        );
        assert_eq!(pool.block_size(), 10);

        pool.integrity_check();
    }

    #[test]
    fn growth_factor_of_one_keeps_block_size() {
        let mut pool = Pool::<u32, 1, 16>::new(2);

        for i in 0..7 {
            _ = pool.construct(i);
        }

        assert_eq!(pool.block_sizes().collect::<Vec<_>>(), [2, 2, 2, 2]);
    }

    #[test]
    fn growth_saturates_instead_of_overflowing() {
        let mut pool = Pool::<u8, { usize::MAX }, 4>::new(2);

        for i in 0..7 {
            _ = pool.construct(i);
        }

        assert_eq!(pool.block_sizes().collect::<Vec<_>>(), [2, 4, 4]);
    }

    #[test]
    fn growth_does_not_move_existing_objects() {
        let mut pool = Pool::<String, 2, 4>::new(1);

        let items: Vec<_> = (0..20)
            .map(|i| (i, pool.construct(i.to_string())))
            .collect();

        let addresses: HashSet<usize> = items.iter().map(|(_, p)| p.as_ptr().addr()).collect();
        assert_eq!(addresses.len(), items.len());

        for (i, item) in &items {
            assert_eq!(unsafe { item.as_ref() }, &i.to_string());
            assert!(pool.contains(item.as_ptr()));
        }

        for (_, item) in items {
            unsafe {
                pool.destroy(item.as_ptr());
            }
        }

        pool.integrity_check();
    }

    #[test]
    fn destroy_runs_destructor() {
        let drops = Rc::new(Cell::new(0));
        let mut pool = Pool::<DropCounter>::new(2);

        let item = pool.construct(DropCounter {
            drops: Rc::clone(&drops),
        });
        assert_eq!(drops.get(), 0);

        unsafe {
            pool.destroy(item.as_ptr());
        }
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn destroy_null_is_noop() {
        let mut pool = Pool::<u32>::new(2);
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
    fn release_does_not_run_destructors() {
        let drops = Rc::new(Cell::new(0));
        let mut pool = Pool::<DropCounter>::new(4);

        for _ in 0..6 {
            _ = pool.construct(DropCounter {
                drops: Rc::clone(&drops),
            });
        }

        pool.release();

        assert_eq!(drops.get(), 0);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.block_count(), 0);
        assert_eq!(pool.capacity(), 0);
        assert!(pool.full());
        pool.integrity_check();
    }

    #[test]
    fn release_keeps_block_size_counter() {
        let mut pool = Pool::<u32, 2, 64>::new(2);

        for i in 0..3 {
            _ = pool.construct(i);
        }
        assert_eq!(pool.block_size(), 4);

        pool.release();
        assert_eq!(pool.block_size(), 4);

        let item = pool.construct(9);
        assert_eq!(unsafe { item.read() }, 9);
        assert_eq!(pool.block_sizes().collect::<Vec<_>>(), [8]);
        assert_eq!(pool.block_size(), 8);
        pool.integrity_check();
    }

    #[test]
    fn release_of_fresh_pool_still_grows_from_initial_size() {
        let mut pool = Pool::<u32, 2, 64>::new(3);

        pool.release();
        _ = pool.construct(1);

        assert_eq!(pool.block_sizes().collect::<Vec<_>>(), [6]);
    }

    #[test]
    fn construct_with_initializes_in_place() {
        let mut pool = Pool::<[u32; 4]>::new(2);

        let item = unsafe {
            pool.construct_with(|uninit| {
                uninit.write([1, 2, 3, 4]);
            })
        };

        assert_eq!(unsafe { item.read() }, [1, 2, 3, 4]);
        assert_eq!(pool.len(), 1);

        unsafe {
            pool.destroy(item.as_ptr());
        }
        pool.integrity_check();
    }

    #[test]
    fn construct_with_panic_returns_slot() {
        let mut pool = Pool::<u64>::new(2);
        let first = pool.construct(1);

        let result = catch_unwind(AssertUnwindSafe(|| unsafe {
            pool.construct_with(|_| panic!("initializer failed"))
        }));
        assert!(result.is_err());

        assert_eq!(pool.len(), 1);
        assert!(!pool.full());
        pool.integrity_check();

        // The slot that the failed initializer was given is the next one to be used.
        let second = pool.construct(2);
        assert_eq!(
            second.as_ptr().addr(),
            first.as_ptr().addr() + size_of::<Slot<u64>>()
        );
        assert!(pool.full());

        pool.release();
    }

    #[test]
    fn destroy_returns_slot_even_if_destructor_panics() {
        struct PanicOnDrop;

        impl Drop for PanicOnDrop {
            fn drop(&mut self) {
                panic!("destructor failed");
            }
        }

        let mut pool = Pool::<PanicOnDrop>::new(1);
        let item = pool.construct(PanicOnDrop);

        let result = catch_unwind(AssertUnwindSafe(|| unsafe {
            pool.destroy(item.as_ptr());
        }));
        assert!(result.is_err());

        assert_eq!(pool.len(), 0);
        assert!(!pool.full());
        pool.integrity_check();
    }

    #[test]
    fn zero_sized_type_is_supported() {
        let mut pool = Pool::<()>::new(2);

        let a = pool.construct(());
        let b = pool.construct(());
        assert_ne!(a, b);

        unsafe {
            pool.destroy(a.as_ptr());
            pool.destroy(b.as_ptr());
        }

        pool.integrity_check();
    }

    #[test]
    fn over_aligned_type_is_aligned() {
        #[repr(align(64))]
        struct CacheLine([u8; 64]);

        let mut pool = Pool::<CacheLine>::new(3);

        let items: Vec<_> = (0..10_u8)
            .map(|i| pool.construct(CacheLine([i; 64])))
            .collect();

        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.as_ptr().addr() % 64, 0);
            assert_eq!(usize::from(unsafe { item.as_ref() }.0[0]), i);
        }

        pool.release();
    }

    #[test]
    fn diagnostics_reflect_state() {
        let mut pool = Pool::<u32, 2, 8>::new(2);

        let a = pool.construct(1);
        let b = pool.construct(2);
        let c = pool.construct(3);

        let report = pool.diagnostics();
        assert_eq!(report.item_size(), size_of::<u32>());
        assert_eq!(report.item_align(), align_of::<u32>());
        assert_eq!(report.slot_size(), size_of::<Slot<u32>>());
        assert_eq!(report.block_size(), 4);
        assert_eq!(report.free_count(), 3);
        assert_eq!(report.live_count(), 3);
        assert_eq!(report.blocks().len(), 2);
        assert_eq!(report.blocks()[0].slot_count(), 2);
        assert_eq!(report.blocks()[1].slot_count(), 4);
        assert_eq!(
            report.next_free_address(),
            Some(c.as_ptr().addr() + size_of::<Slot<u32>>())
        );

        unsafe {
            pool.destroy(a.as_ptr());
            pool.destroy(b.as_ptr());
            pool.destroy(c.as_ptr());
        }

        assert_eq!(pool.diagnostics().free_count(), 6);
    }

    #[test]
    fn contains_rejects_foreign_pointers() {
        let mut pool = Pool::<u32>::new(2);
        let mut other = Pool::<u32>::new(2);

        let ours = pool.construct(1);
        let theirs = other.construct(2);

        assert!(pool.contains(ours.as_ptr()));
        assert!(!pool.contains(theirs.as_ptr()));
        assert!(!pool.contains(ptr::null()));

        pool.release();
        assert!(!pool.contains(ours.as_ptr()));

        unsafe {
            other.destroy(theirs.as_ptr());
        }
    }

    #[test]
    fn default_pool_starts_with_single_slot() {
        let pool = Pool::<u32>::default();

        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.drop_policy(), DropPolicy::MayForgetItems);
    }

    #[test]
    fn dropping_pool_with_live_items_forgets_them_by_default() {
        let drops = Rc::new(Cell::new(0));

        {
            let mut pool = Pool::<DropCounter>::new(2);
            _ = pool.construct(DropCounter {
                drops: Rc::clone(&drops),
            });
        }

        assert_eq!(drops.get(), 0);
    }

    #[test]
    #[should_panic]
    fn drop_with_live_items_panics_if_forbidden() {
        let mut pool = Pool::<u32>::builder()
            .initial_block_size(2)
            .drop_policy(DropPolicy::MustNotForgetItems)
            .build();

        _ = pool.construct(1);
    }

    #[test]
    fn drop_after_release_is_fine_if_forgetting_forbidden() {
        let mut pool = Pool::<u32>::builder()
            .initial_block_size(2)
            .drop_policy(DropPolicy::MustNotForgetItems)
            .build();

        _ = pool.construct(1);
        pool.release();
    }

    #[test]
    fn pool_can_move_between_threads() {
        let mut pool = Pool::<String>::new(2);
        let item = pool.construct("sent".to_string());
        let address = item.as_ptr().addr();

        let pool = thread::spawn(move || {
            assert!(pool.contains(ptr::without_provenance(address)));
            pool
        })
        .join()
        .unwrap();

        // Moving the pool does not move its objects.
        assert_eq!(unsafe { item.as_ref() }, "sent");

        let mut pool = pool;
        unsafe {
            pool.destroy(item.as_ptr());
        }
    }

    #[test]
    fn debug_output_names_item_type() {
        let pool = Pool::<String>::new(1);
        let debug_output = format!("{pool:?}");

        assert!(debug_output.contains("Pool"));
        assert!(debug_output.contains("String"));
    }
}
