use std::any::type_name;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use crate::{DropPolicy, MultipoolBuilder, Pool, Result};

/// A list of types that a [`Multipool`] keeps one [`Pool`] for.
///
/// Implemented for tuples of 1 to 8 types. The tuple types are used as markers only;
/// no tuple value is ever created.
pub trait TypeList<const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> {
    /// The tuple of pools, one per type in the list, in list order.
    type Pools;

    /// Creates one pool per type, each with the given initial block size and drop policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial block size is outside `1..=MAX_BLOCK_SIZE`.
    fn new_pools(initial_block_size: usize, drop_policy: DropPolicy) -> Result<Self::Pools>;

    /// Releases the memory of every pool, first to last.
    fn release_all(pools: &mut Self::Pools);

    /// The number of live objects across all pools.
    fn live_count(pools: &Self::Pools) -> usize;
}

/// Selects the pool for type `T` out of the pools of a [`TypeList`].
///
/// `Index` is a marker for the position of `T` in the list ([`Index0`] to [`Index7`]). It lets
/// the list implement this trait once per position without overlapping impls. Callers never
/// name it: the compiler infers it from `T`, which is what makes a type that is missing from
/// the list (or listed twice) a compile error.
pub trait Member<T, Index, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize>:
    TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>
{
    /// The pool for `T`.
    fn pool(
        pools: &<Self as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::Pools,
    ) -> &Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>;

    /// The pool for `T`, for mutation.
    fn pool_mut(
        pools: &mut <Self as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::Pools,
    ) -> &mut Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>;
}

/// Position marker for the first type of a [`TypeList`].
#[derive(Debug)]
#[expect(clippy::exhaustive_enums, reason = "uninhabited position marker")]
pub enum Index0 {}
/// Position marker for the second type of a [`TypeList`].
#[derive(Debug)]
#[expect(clippy::exhaustive_enums, reason = "uninhabited position marker")]
pub enum Index1 {}
/// Position marker for the third type of a [`TypeList`].
#[derive(Debug)]
#[expect(clippy::exhaustive_enums, reason = "uninhabited position marker")]
pub enum Index2 {}
/// Position marker for the fourth type of a [`TypeList`].
#[derive(Debug)]
#[expect(clippy::exhaustive_enums, reason = "uninhabited position marker")]
pub enum Index3 {}
/// Position marker for the fifth type of a [`TypeList`].
#[derive(Debug)]
#[expect(clippy::exhaustive_enums, reason = "uninhabited position marker")]
pub enum Index4 {}
/// Position marker for the sixth type of a [`TypeList`].
#[derive(Debug)]
#[expect(clippy::exhaustive_enums, reason = "uninhabited position marker")]
pub enum Index5 {}
/// Position marker for the seventh type of a [`TypeList`].
#[derive(Debug)]
#[expect(clippy::exhaustive_enums, reason = "uninhabited position marker")]
pub enum Index6 {}
/// Position marker for the eighth type of a [`TypeList`].
#[derive(Debug)]
#[expect(clippy::exhaustive_enums, reason = "uninhabited position marker")]
pub enum Index7 {}

macro_rules! impl_type_list {
    (@member ($($all:ident),+) $member:ident : $index:ident @ $position:tt) => {
        impl<$($all),+, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize>
            Member<$member, $index, GROWTH_FACTOR, MAX_BLOCK_SIZE> for ($($all,)+)
        {
            fn pool(
                pools: &<Self as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::Pools,
            ) -> &Pool<$member, GROWTH_FACTOR, MAX_BLOCK_SIZE> {
                &pools.$position
            }

            fn pool_mut(
                pools: &mut <Self as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::Pools,
            ) -> &mut Pool<$member, GROWTH_FACTOR, MAX_BLOCK_SIZE> {
                &mut pools.$position
            }
        }
    };
    (@members $all:tt ; $($member:ident : $index:ident @ $position:tt),+) => {
        $(impl_type_list!(@member $all $member : $index @ $position);)+
    };
    ($($member:ident : $index:ident @ $position:tt),+) => {
        impl<$($member),+, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize>
            TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE> for ($($member,)+)
        {
            type Pools = ($(Pool<$member, GROWTH_FACTOR, MAX_BLOCK_SIZE>,)+);

            fn new_pools(
                initial_block_size: usize,
                drop_policy: DropPolicy,
            ) -> Result<<Self as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::Pools> {
                Ok(($(
                    Pool::<$member, GROWTH_FACTOR, MAX_BLOCK_SIZE>::builder()
                        .initial_block_size(initial_block_size)
                        .drop_policy(drop_policy)
                        .try_build()?,
                )+))
            }

            fn release_all(pools: &mut <Self as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::Pools) {
                $(pools.$position.release();)+
            }

            fn live_count(
                pools: &<Self as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::Pools,
            ) -> usize {
                [$(pools.$position.len()),+].iter().sum()
            }
        }

        impl_type_list!(@members ($($member),+) ; $($member : $index @ $position),+);
    };
}

impl_type_list!(T0: Index0 @ 0);
impl_type_list!(T0: Index0 @ 0, T1: Index1 @ 1);
impl_type_list!(T0: Index0 @ 0, T1: Index1 @ 1, T2: Index2 @ 2);
impl_type_list!(T0: Index0 @ 0, T1: Index1 @ 1, T2: Index2 @ 2, T3: Index3 @ 3);
impl_type_list!(
    T0: Index0 @ 0,
    T1: Index1 @ 1,
    T2: Index2 @ 2,
    T3: Index3 @ 3,
    T4: Index4 @ 4
);
impl_type_list!(
    T0: Index0 @ 0,
    T1: Index1 @ 1,
    T2: Index2 @ 2,
    T3: Index3 @ 3,
    T4: Index4 @ 4,
    T5: Index5 @ 5
);
impl_type_list!(
    T0: Index0 @ 0,
    T1: Index1 @ 1,
    T2: Index2 @ 2,
    T3: Index3 @ 3,
    T4: Index4 @ 4,
    T5: Index5 @ 5,
    T6: Index6 @ 6
);
impl_type_list!(
    T0: Index0 @ 0,
    T1: Index1 @ 1,
    T2: Index2 @ 2,
    T3: Index3 @ 3,
    T4: Index4 @ 4,
    T5: Index5 @ 5,
    T6: Index6 @ 6,
    T7: Index7 @ 7
);

/// A set of [`Pool`]s, one per type in the tuple `L`, addressed by type.
///
/// Every method that takes a type parameter `T` is routed to the pool for `T` at compile time.
/// Naming a type that is not in `L` does not compile, and neither does naming a type that
/// appears in `L` more than once. The second type parameter of those methods is a position
/// marker that the compiler infers, so write `_` for it when spelling out `T`.
///
/// All member pools share the `GROWTH_FACTOR` and `MAX_BLOCK_SIZE` of the multipool and start
/// with the same initial block size, but otherwise grow and release independently.
///
/// # Thread safety
///
/// The multipool is thread-mobile ([`Send`]) if every type in `L` is, but it is not
/// thread-safe ([`Sync`]).
///
/// # Example
///
/// ```
/// use block_pool::Multipool;
///
/// struct Particle {
///     position: (f32, f32),
/// }
///
/// let mut pools = Multipool::<(Particle, String)>::new(4);
///
/// let particle = pools.construct(Particle { position: (1.0, 2.0) });
/// let label = pools.construct("spark".to_string());
///
/// assert_eq!(pools.get::<Particle, _>().len(), 1);
/// assert_eq!(pools.get::<String, _>().len(), 1);
/// assert_eq!(pools.len(), 2);
///
/// // SAFETY: Both pointers came from this multipool and have not been destroyed yet.
/// unsafe {
///     assert_eq!(particle.as_ref().position, (1.0, 2.0));
///
///     pools.destroy(particle.as_ptr());
///     pools.destroy(label.as_ptr());
/// }
///
/// assert!(pools.is_empty());
/// ```
pub struct Multipool<L, const GROWTH_FACTOR: usize = 2, const MAX_BLOCK_SIZE: usize = 1024>
where
    L: TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>,
{
    pools: <L as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::Pools,
}

impl<L, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize>
    Multipool<L, GROWTH_FACTOR, MAX_BLOCK_SIZE>
where
    L: TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>,
{
    /// Creates a multipool whose member pools each start with a block of
    /// `initial_block_size` slots.
    ///
    /// # Panics
    ///
    /// Panics if `initial_block_size` is zero or greater than `MAX_BLOCK_SIZE`.
    #[must_use]
    pub fn new(initial_block_size: usize) -> Self {
        Self::builder()
            .initial_block_size(initial_block_size)
            .build()
    }

    /// Starts building a new [`Multipool`].
    pub fn builder() -> MultipoolBuilder<L, GROWTH_FACTOR, MAX_BLOCK_SIZE> {
        MultipoolBuilder::new()
    }

    #[must_use]
    pub(crate) fn from_pools(pools: <L as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::Pools) -> Self {
        Self { pools }
    }

    /// Moves `value` into the pool for `T`. See [`Pool::construct()`].
    #[must_use]
    pub fn construct<T, I>(&mut self, value: T) -> NonNull<T>
    where
        L: Member<T, I, GROWTH_FACTOR, MAX_BLOCK_SIZE>,
    {
        self.get_mut::<T, I>().construct(value)
    }

    /// Initializes an object in place in the pool for `T`. See [`Pool::construct_with()`].
    ///
    /// # Safety
    ///
    /// The closure must fully initialize the `MaybeUninit<T>` before returning normally.
    #[must_use]
    pub unsafe fn construct_with<T, I>(&mut self, f: impl FnOnce(&mut MaybeUninit<T>)) -> NonNull<T>
    where
        L: Member<T, I, GROWTH_FACTOR, MAX_BLOCK_SIZE>,
    {
        // SAFETY: Forwarding the caller's guarantee about the initializer.
        unsafe { self.get_mut::<T, I>().construct_with(f) }
    }

    /// Drops the object that `ptr` points to and returns its slot to the pool for `T`.
    /// A null pointer is ignored. See [`Pool::destroy()`].
    ///
    /// # Safety
    ///
    /// Unless null, `ptr` must have been returned for type `T` by this multipool, must not have
    /// been destroyed already, and the pool for `T` must not have been released since.
    pub unsafe fn destroy<T, I>(&mut self, ptr: *mut T)
    where
        L: Member<T, I, GROWTH_FACTOR, MAX_BLOCK_SIZE>,
    {
        // SAFETY: Forwarding the caller's guarantee that the pointer belongs to the pool for T.
        unsafe {
            self.get_mut::<T, I>().destroy(ptr);
        }
    }

    /// Releases the memory of the pool for `T` only, without dropping its live objects.
    /// See [`Pool::release()`].
    ///
    /// # Example
    ///
    /// ```
    /// use block_pool::Multipool;
    ///
    /// let mut pools = Multipool::<(u32, u64)>::new(4);
    /// let _small = pools.construct(1_u32);
    /// let big = pools.construct(2_u64);
    ///
    /// pools.release::<u32, _>();
    ///
    /// assert!(pools.get::<u32, _>().full());
    /// assert_eq!(pools.get::<u64, _>().len(), 1);
    /// # // SAFETY: The pointer came from this multipool and has not been destroyed yet.
    /// # unsafe { pools.destroy(big.as_ptr()); }
    /// ```
    pub fn release<T, I>(&mut self)
    where
        L: Member<T, I, GROWTH_FACTOR, MAX_BLOCK_SIZE>,
    {
        self.get_mut::<T, I>().release();
    }

    /// Releases the memory of every member pool, in the order the types are listed, without
    /// dropping any live objects.
    pub fn release_all(&mut self) {
        <L as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::release_all(&mut self.pools);
    }

    /// The pool for `T`.
    #[must_use]
    pub fn get<T, I>(&self) -> &Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>
    where
        L: Member<T, I, GROWTH_FACTOR, MAX_BLOCK_SIZE>,
    {
        <L as Member<T, I, GROWTH_FACTOR, MAX_BLOCK_SIZE>>::pool(&self.pools)
    }

    /// The pool for `T`, for direct use.
    #[must_use]
    pub fn get_mut<T, I>(&mut self) -> &mut Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>
    where
        L: Member<T, I, GROWTH_FACTOR, MAX_BLOCK_SIZE>,
    {
        <L as Member<T, I, GROWTH_FACTOR, MAX_BLOCK_SIZE>>::pool_mut(&mut self.pools)
    }

    /// The number of live objects across all member pools.
    #[must_use]
    pub fn len(&self) -> usize {
        <L as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::live_count(&self.pools)
    }

    /// Whether no member pool has live objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> Default
    for Multipool<L, GROWTH_FACTOR, MAX_BLOCK_SIZE>
where
    L: TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>,
{
    /// Creates a multipool whose member pools each start with a single-slot block.
    fn default() -> Self {
        Self::new(1)
    }
}

impl<L, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> std::fmt::Debug
    for Multipool<L, GROWTH_FACTOR, MAX_BLOCK_SIZE>
where
    L: TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multipool")
            .field("item_types", &std::format_args!("{}", type_name::<L>()))
            .field("growth_factor", &GROWTH_FACTOR)
            .field("max_block_size", &MAX_BLOCK_SIZE)
            .field("live_count", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(Multipool<(u32, String)>: Send, std::fmt::Debug, Default);
    assert_not_impl_any!(Multipool<(u32, String)>: Sync, Clone);
    assert_not_impl_any!(Multipool<(u32, Rc<u32>)>: Send, Sync);

    #[derive(Debug, PartialEq)]
    struct A(u64);

    #[derive(Debug, PartialEq)]
    struct B([u8; 24]);

    #[test]
    fn construct_routes_by_type() {
        let mut pools = Multipool::<(A, B)>::new(4);

        let a = pools.construct(A(1));
        let b = pools.construct(B([2; 24]));

        assert_eq!(pools.get::<A, _>().len(), 1);
        assert_eq!(pools.get::<B, _>().len(), 1);
        assert!(pools.get::<A, _>().contains(a.as_ptr()));
        assert!(pools.get::<B, _>().contains(b.as_ptr()));

        unsafe {
            assert_eq!(a.as_ref(), &A(1));
            assert_eq!(b.as_ref(), &B([2; 24]));

            pools.destroy(a.as_ptr());
            pools.destroy(b.as_ptr());
        }

        assert!(pools.is_empty());
    }

    #[test]
    fn filling_one_member_leaves_others_untouched() {
        let mut pools = Multipool::<(A, B), 2, 8>::new(4);

        for i in 0..4 {
            _ = pools.construct(A(i));
        }

        assert!(pools.get::<A, _>().full());
        assert!(!pools.get::<B, _>().full());
        assert_eq!(pools.get::<B, _>().diagnostics().free_count(), 4);

        pools.get::<A, _>().integrity_check();
        pools.get::<B, _>().integrity_check();
    }

    #[test]
    fn destroying_one_member_leaves_others_untouched() {
        let mut pools = Multipool::<(A, B), 2, 8>::new(4);

        let a_items: Vec<_> = (0..6).map(|i| pools.construct(A(i))).collect();
        let b_items: Vec<_> = (0..3_u8).map(|i| pools.construct(B([i; 24]))).collect();

        let b_before = pools.get::<B, _>().diagnostics();

        for a in a_items {
            unsafe {
                pools.destroy::<A, _>(a.as_ptr());
            }
        }

        let b_after = pools.get::<B, _>().diagnostics();
        assert_eq!(b_after.next_free_address(), b_before.next_free_address());
        assert_eq!(b_after.free_count(), b_before.free_count());
        assert_eq!(b_after, b_before);
        assert!(pools.get::<A, _>().is_empty());

        // B hands out its own head slot next, not one of the slots A just freed.
        let b = pools.construct(B([9; 24]));
        assert_eq!(Some(b.as_ptr().addr()), b_before.next_free_address());
        assert!(pools.get::<B, _>().contains(b.as_ptr()));
        assert!(!pools.get::<A, _>().contains(b.as_ptr().cast::<A>()));

        pools.get::<A, _>().integrity_check();
        pools.get::<B, _>().integrity_check();

        for item in b_items.into_iter().chain([b]) {
            unsafe {
                pools.destroy(item.as_ptr());
            }
        }

        assert!(pools.is_empty());
    }

    #[test]
    fn members_grow_independently() {
        let mut pools = Multipool::<(A, B), 2, 8>::new(2);

        for i in 0..7 {
            _ = pools.construct(A(i));
        }

        assert_eq!(
            pools.get::<A, _>().block_sizes().collect::<Vec<_>>(),
            [2, 4, 8]
        );
        assert_eq!(pools.get::<B, _>().block_sizes().collect::<Vec<_>>(), [2]);
        assert_eq!(pools.len(), 7);
    }

    #[test]
    fn release_all_empties_every_member() {
        let mut pools = Multipool::<(A, B)>::new(4);

        for i in 0..4 {
            _ = pools.construct(A(i));
        }
        _ = pools.construct(B([0; 24]));

        pools.release_all();

        assert!(pools.get::<A, _>().full());
        assert!(pools.get::<B, _>().full());
        assert!(pools.is_empty());

        let a = pools.construct(A(9));
        assert_eq!(unsafe { a.read() }, A(9));
    }

    #[test]
    fn release_single_member() {
        let mut pools = Multipool::<(A, B)>::new(4);

        _ = pools.construct(A(1));
        let b = pools.construct(B([1; 24]));

        pools.release::<A, _>();

        assert_eq!(pools.get::<A, _>().block_count(), 0);
        assert_eq!(pools.get::<B, _>().block_count(), 1);
        assert_eq!(pools.len(), 1);

        unsafe {
            pools.destroy(b.as_ptr());
        }
    }

    #[test]
    fn destroy_null_is_noop() {
        let mut pools = Multipool::<(A, B)>::new(2);
        let a = pools.construct(A(1));

        unsafe {
            pools.destroy::<B, _>(std::ptr::null_mut());
        }

        assert_eq!(pools.len(), 1);
        unsafe {
            pools.destroy(a.as_ptr());
        }
    }

    #[test]
    fn construct_with_routes_by_type() {
        let mut pools = Multipool::<(A, B)>::new(2);

        let b = unsafe {
            pools.construct_with::<B, _>(|uninit| {
                uninit.write(B([7; 24]));
            })
        };

        assert_eq!(pools.get::<B, _>().len(), 1);
        assert_eq!(pools.get::<A, _>().len(), 0);

        unsafe {
            pools.destroy(b.as_ptr());
        }
    }

    #[test]
    fn get_mut_gives_direct_access() {
        let mut pools = Multipool::<(A, B)>::new(2);

        let pool = pools.get_mut::<A, _>();
        let a = pool.construct(A(3));
        unsafe {
            pool.destroy(a.as_ptr());
        }

        assert!(pools.is_empty());
    }

    #[test]
    fn destroy_runs_destructor_of_the_right_type() {
        struct Counted(Rc<Cell<usize>>);

        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let mut pools = Multipool::<(u8, Counted)>::new(2);

        let counted = pools.construct(Counted(Rc::clone(&drops)));
        let byte = pools.construct(5_u8);

        unsafe {
            pools.destroy(byte.as_ptr());
            assert_eq!(drops.get(), 0);

            pools.destroy(counted.as_ptr());
            assert_eq!(drops.get(), 1);
        }
    }

    #[test]
    fn eight_member_list_is_supported() {
        let mut pools = Multipool::<(u8, u16, u32, u64, u128, i8, i16, String)>::new(1);

        _ = pools.construct(1_u8);
        _ = pools.construct(1_u16);
        _ = pools.construct(1_u32);
        _ = pools.construct(1_u64);
        _ = pools.construct(1_u128);
        _ = pools.construct(1_i8);
        _ = pools.construct(1_i16);
        let s = pools.construct("last".to_string());

        assert_eq!(pools.len(), 8);

        unsafe {
            pools.destroy(s.as_ptr());
        }
        pools.release_all();
        assert!(pools.is_empty());
    }

    #[test]
    #[should_panic]
    fn drop_policy_applies_to_members() {
        let mut pools = Multipool::<(u32, u64)>::builder()
            .initial_block_size(2)
            .drop_policy(DropPolicy::MustNotForgetItems)
            .build();

        _ = pools.construct(1_u64);
    }

    #[test]
    fn debug_output_names_types() {
        let pools = Multipool::<(u32, String)>::new(1);
        let debug_output = format!("{pools:?}");

        assert!(debug_output.contains("Multipool"));
        assert!(debug_output.contains("u32"));
        assert!(debug_output.contains("String"));
    }
}
