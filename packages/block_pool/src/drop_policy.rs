/// Determines what happens to live objects when a pool is dropped.
///
/// A pool does not know which of its slots hold live objects, so it can never run their
/// destructors on its own. When the pool is dropped, its blocks are returned to the system
/// allocator and any object that was not destroyed is forgotten.
///
/// By default this is allowed. [`Pool::release()`][1] is an explicit request to forget
/// everything and is never subject to the drop policy.
///
/// # Examples
///
/// ```
/// use block_pool::{DropPolicy, Pool};
///
/// // The drop policy is set at pool creation time.
/// let pool = Pool::<u32>::builder()
///     .initial_block_size(16)
///     .drop_policy(DropPolicy::MustNotForgetItems)
///     .build();
/// ```
///
/// [1]: crate::Pool::release
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Live objects are forgotten without running their destructors when the pool is dropped.
    /// This is the default.
    #[default]
    MayForgetItems,

    /// The pool will panic if it still contains live objects when it is dropped.
    ///
    /// This is valuable when the pooled type owns resources that must be released by its
    /// destructor, so forgetting an object is a bug in the caller.
    MustNotForgetItems,
}
