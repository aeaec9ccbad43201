use std::any::type_name;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{DropPolicy, Multipool, Pool, Result, TypeList, validate_initial_block_size};

/// Builder for creating an instance of [`Pool`].
///
/// The growth factor and maximum block size are part of the pool type. The builder sets the
/// runtime configuration: the size of the first block and the [drop policy][DropPolicy].
///
/// If no initial block size is set, the pool starts with a single-slot block.
///
/// # Examples
///
/// ```
/// use block_pool::{DropPolicy, Pool};
///
/// let pool = Pool::<u32>::builder()
///     .initial_block_size(64)
///     .drop_policy(DropPolicy::MustNotForgetItems)
///     .build();
///
/// assert_eq!(pool.capacity(), 64);
/// ```
#[must_use]
pub struct PoolBuilder<T, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> {
    initial_block_size: usize,
    drop_policy: DropPolicy,

    _item: PhantomData<T>,
}

impl<T, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> std::fmt::Debug
    for PoolBuilder<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("item_type", &std::format_args!("{}", type_name::<T>()))
            .field("growth_factor", &GROWTH_FACTOR)
            .field("max_block_size", &MAX_BLOCK_SIZE)
            .field("initial_block_size", &self.initial_block_size)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize>
    PoolBuilder<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>
{
    pub(crate) fn new() -> Self {
        Self {
            initial_block_size: 1,
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Sets the number of slots in the first block of the pool.
    ///
    /// The value must be in `1..=MAX_BLOCK_SIZE`. This is checked when the pool is built.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let pool = Pool::<u32>::builder().initial_block_size(8).build();
    ///
    /// assert_eq!(pool.block_size(), 8);
    /// ```
    pub fn initial_block_size(mut self, slots: usize) -> Self {
        self.initial_block_size = slots;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat live objects in the pool when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::{DropPolicy, Pool};
    ///
    /// let pool = Pool::<u32>::builder()
    ///     .drop_policy(DropPolicy::MustNotForgetItems)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the initial block size is zero or greater than `MAX_BLOCK_SIZE`.
    /// Use [`try_build()`][Self::try_build] to handle this as an error instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::Pool;
    ///
    /// let pool = Pool::<u32>::builder().initial_block_size(4).build();
    /// ```
    #[must_use]
    pub fn build(self) -> Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE> {
        self.try_build()
            .unwrap_or_else(|error| panic!("invalid pool configuration: {error}"))
    }

    /// Builds the pool with the specified configuration, returning an error if the
    /// configuration is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroInitialBlockSize`][crate::Error::ZeroInitialBlockSize] or
    /// [`Error::InitialBlockSizeTooLarge`][crate::Error::InitialBlockSizeTooLarge] if the
    /// initial block size is outside `1..=MAX_BLOCK_SIZE`.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::{Error, Pool};
    ///
    /// let result = Pool::<u32, 2, 16>::builder().initial_block_size(32).try_build();
    ///
    /// assert_eq!(
    ///     result.unwrap_err(),
    ///     Error::InitialBlockSizeTooLarge {
    ///         requested: 32,
    ///         max: 16
    ///     }
    /// );
    /// ```
    pub fn try_build(self) -> Result<Pool<T, GROWTH_FACTOR, MAX_BLOCK_SIZE>> {
        validate_initial_block_size(self.initial_block_size, MAX_BLOCK_SIZE)?;

        let initial_block_size = NonZero::new(self.initial_block_size)
            .expect("we just validated that the initial block size is not zero");

        Ok(Pool::new_inner(initial_block_size, self.drop_policy))
    }
}

/// Builder for creating an instance of [`Multipool`].
///
/// Every member pool is created with the same initial block size and drop policy.
/// The members grow independently afterwards.
///
/// # Examples
///
/// ```
/// use block_pool::{DropPolicy, Multipool};
///
/// let pools = Multipool::<(u32, String)>::builder()
///     .initial_block_size(16)
///     .drop_policy(DropPolicy::MayForgetItems)
///     .build();
///
/// assert_eq!(pools.get::<u32, _>().capacity(), 16);
/// assert_eq!(pools.get::<String, _>().capacity(), 16);
/// ```
#[must_use]
pub struct MultipoolBuilder<L, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> {
    initial_block_size: usize,
    drop_policy: DropPolicy,

    _types: PhantomData<L>,
}

impl<L, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize> std::fmt::Debug
    for MultipoolBuilder<L, GROWTH_FACTOR, MAX_BLOCK_SIZE>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipoolBuilder")
            .field("item_types", &std::format_args!("{}", type_name::<L>()))
            .field("growth_factor", &GROWTH_FACTOR)
            .field("max_block_size", &MAX_BLOCK_SIZE)
            .field("initial_block_size", &self.initial_block_size)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<L, const GROWTH_FACTOR: usize, const MAX_BLOCK_SIZE: usize>
    MultipoolBuilder<L, GROWTH_FACTOR, MAX_BLOCK_SIZE>
where
    L: TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>,
{
    pub(crate) fn new() -> Self {
        Self {
            initial_block_size: 1,
            drop_policy: DropPolicy::default(),
            _types: PhantomData,
        }
    }

    /// Sets the number of slots in the first block of every member pool.
    ///
    /// The value must be in `1..=MAX_BLOCK_SIZE`. This is checked when the multipool is built.
    pub fn initial_block_size(mut self, slots: usize) -> Self {
        self.initial_block_size = slots;
        self
    }

    /// Sets the [drop policy][DropPolicy] for every member pool.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the multipool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the initial block size is zero or greater than `MAX_BLOCK_SIZE`.
    /// Use [`try_build()`][Self::try_build] to handle this as an error instead.
    #[must_use]
    pub fn build(self) -> Multipool<L, GROWTH_FACTOR, MAX_BLOCK_SIZE> {
        self.try_build()
            .unwrap_or_else(|error| panic!("invalid multipool configuration: {error}"))
    }

    /// Builds the multipool with the specified configuration, returning an error if the
    /// configuration is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroInitialBlockSize`][crate::Error::ZeroInitialBlockSize] or
    /// [`Error::InitialBlockSizeTooLarge`][crate::Error::InitialBlockSizeTooLarge] if the
    /// initial block size is outside `1..=MAX_BLOCK_SIZE`.
    pub fn try_build(self) -> Result<Multipool<L, GROWTH_FACTOR, MAX_BLOCK_SIZE>> {
        let pools = <L as TypeList<GROWTH_FACTOR, MAX_BLOCK_SIZE>>::new_pools(
            self.initial_block_size,
            self.drop_policy,
        )?;

        Ok(Multipool::from_pools(pools))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::Error;

    assert_impl_all!(PoolBuilder<u32, 2, 1024>: Send, Sync, std::fmt::Debug);
    assert_impl_all!(MultipoolBuilder<(u32, u64), 2, 1024>: Send, Sync, std::fmt::Debug);

    #[test]
    fn pool_builder_defaults() {
        let builder = PoolBuilder::<u32, 2, 1024>::new();

        assert_eq!(builder.initial_block_size, 1);
        assert_eq!(builder.drop_policy, DropPolicy::default());
    }

    #[test]
    fn pool_builder_chaining_works() {
        let builder = PoolBuilder::<u32, 2, 1024>::new()
            .initial_block_size(32)
            .drop_policy(DropPolicy::MustNotForgetItems);

        assert_eq!(builder.initial_block_size, 32);
        assert_eq!(builder.drop_policy, DropPolicy::MustNotForgetItems);
    }

    #[test]
    fn pool_builder_settings_can_be_overridden() {
        let builder = PoolBuilder::<u32, 2, 1024>::new()
            .initial_block_size(32)
            .initial_block_size(3)
            .drop_policy(DropPolicy::MustNotForgetItems)
            .drop_policy(DropPolicy::MayForgetItems);

        assert_eq!(builder.initial_block_size, 3);
        assert_eq!(builder.drop_policy, DropPolicy::MayForgetItems);
    }

    #[test]
    fn pool_try_build_rejects_zero() {
        let result = PoolBuilder::<u32, 2, 1024>::new()
            .initial_block_size(0)
            .try_build();

        assert_eq!(result.unwrap_err(), Error::ZeroInitialBlockSize);
    }

    #[test]
    fn pool_try_build_rejects_oversized() {
        let result = PoolBuilder::<u32, 2, 8>::new()
            .initial_block_size(9)
            .try_build();

        assert_eq!(
            result.unwrap_err(),
            Error::InitialBlockSizeTooLarge {
                requested: 9,
                max: 8
            }
        );
    }

    #[test]
    fn pool_try_build_accepts_max() {
        let pool = PoolBuilder::<u32, 2, 8>::new()
            .initial_block_size(8)
            .try_build()
            .unwrap();

        assert_eq!(pool.capacity(), 8);
    }

    #[test]
    #[should_panic]
    fn pool_build_panics_on_zero() {
        drop(
            PoolBuilder::<u32, 2, 1024>::new()
                .initial_block_size(0)
                .build(),
        );
    }

    #[test]
    fn pool_builder_is_debug() {
        let builder = PoolBuilder::<u32, 2, 1024>::new().initial_block_size(7);
        let debug_output = format!("{builder:?}");

        assert!(debug_output.contains("PoolBuilder"));
        assert!(debug_output.contains("u32"));
        assert!(debug_output.contains('7'));
    }

    #[test]
    fn multipool_builder_applies_settings_to_all_members() {
        let pools = MultipoolBuilder::<(u32, String), 2, 1024>::new()
            .initial_block_size(5)
            .build();

        assert_eq!(pools.get::<u32, _>().capacity(), 5);
        assert_eq!(pools.get::<String, _>().capacity(), 5);
    }

    #[test]
    fn multipool_try_build_rejects_oversized() {
        let result = MultipoolBuilder::<(u32, String), 2, 4>::new()
            .initial_block_size(5)
            .try_build();

        assert_eq!(
            result.unwrap_err(),
            Error::InitialBlockSizeTooLarge {
                requested: 5,
                max: 4
            }
        );
    }

    #[test]
    #[should_panic]
    fn multipool_build_panics_on_zero() {
        drop(
            MultipoolBuilder::<(u32,), 2, 1024>::new()
                .initial_block_size(0)
                .build(),
        );
    }

    #[test]
    fn multipool_builder_is_debug() {
        let builder = MultipoolBuilder::<(u32, u8), 2, 1024>::new();
        let debug_output = format!("{builder:?}");

        assert!(debug_output.contains("MultipoolBuilder"));
        assert!(debug_output.contains("u32"));
    }
}
