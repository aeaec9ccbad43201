use thiserror::Error;

/// Errors that can occur when configuring a pool.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A pool must be able to hold at least one object in its first block.
    #[error("initial block size must be at least 1 slot")]
    ZeroInitialBlockSize,

    /// The first block of a pool may not be larger than any later block is allowed to be.
    #[error("initial block size {requested} exceeds the maximum block size {max}")]
    InitialBlockSizeTooLarge {
        /// The initial block size the caller asked for.
        requested: usize,

        /// The maximum block size of the pool type.
        max: usize,
    },
}

/// A specialized `Result` type for pool configuration, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

/// Checks that an initial block size is usable by a pool with the given maximum block size.
pub(crate) fn validate_initial_block_size(requested: usize, max: usize) -> Result<()> {
    if requested == 0 {
        return Err(Error::ZeroInitialBlockSize);
    }

    if requested > max {
        return Err(Error::InitialBlockSizeTooLarge { requested, max });
    }

    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug, Copy);

    #[test]
    fn zero_is_rejected() {
        assert_eq!(
            validate_initial_block_size(0, 8),
            Err(Error::ZeroInitialBlockSize)
        );
    }

    #[test]
    fn above_max_is_rejected() {
        assert_eq!(
            validate_initial_block_size(9, 8),
            Err(Error::InitialBlockSizeTooLarge {
                requested: 9,
                max: 8
            })
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(validate_initial_block_size(1, 8), Ok(()));
        assert_eq!(validate_initial_block_size(8, 8), Ok(()));
    }

    #[test]
    fn messages_name_the_values() {
        let message = Error::InitialBlockSizeTooLarge {
            requested: 2048,
            max: 1024,
        }
        .to_string();

        assert!(message.contains("2048"));
        assert!(message.contains("1024"));
    }
}
