use std::fmt;

/// A point-in-time report on the internal state of a [`Pool`][crate::Pool].
///
/// Obtained from [`Pool::diagnostics()`][crate::Pool::diagnostics]. Gathering the report walks
/// the free list, so it takes time proportional to the number of free slots. It does not modify
/// the pool.
///
/// The [`Display`][fmt::Display] implementation renders a human-readable multi-line report.
///
/// # Example
///
/// ```
/// use block_pool::Pool;
///
/// let mut pool = Pool::<u64>::new(4);
/// let item = pool.construct(42);
///
/// let report = pool.diagnostics();
/// assert_eq!(report.free_count(), 3);
/// assert_eq!(report.live_count(), 1);
/// assert_eq!(report.blocks().len(), 1);
///
/// println!("{report}");
/// # // SAFETY: The pointer came from this pool and has not been destroyed.
/// # unsafe { pool.destroy(item.as_ptr()); }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostics {
    pub(crate) item_type: &'static str,
    pub(crate) item_size: usize,
    pub(crate) item_align: usize,
    pub(crate) slot_size: usize,
    pub(crate) next_free_address: Option<usize>,
    pub(crate) block_size: usize,
    pub(crate) free_count: usize,
    pub(crate) live_count: usize,
    pub(crate) blocks: Vec<BlockDiagnostics>,
}

/// The part of [`Diagnostics`] that describes a single block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockDiagnostics {
    pub(crate) start_address: usize,
    pub(crate) slot_count: usize,
}

impl Diagnostics {
    /// The name of the pooled type.
    #[must_use]
    pub fn item_type(&self) -> &'static str {
        self.item_type
    }

    /// `size_of` the pooled type.
    #[must_use]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// `align_of` the pooled type.
    #[must_use]
    pub fn item_align(&self) -> usize {
        self.item_align
    }

    /// The number of bytes each slot occupies, which is at least the item size and at least
    /// the size of a free list link.
    #[must_use]
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// The address of the slot that the next construct call will use, if the pool is not full.
    #[must_use]
    pub fn next_free_address(&self) -> Option<usize> {
        self.next_free_address
    }

    /// The block size counter that the next growth step will multiply.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The number of slots on the free list, counted by walking it.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// The number of live objects in the pool.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// The blocks of the pool, in allocation order.
    #[must_use]
    pub fn blocks(&self) -> &[BlockDiagnostics] {
        &self.blocks
    }
}

impl BlockDiagnostics {
    /// The address of the first slot of the block.
    #[must_use]
    pub fn start_address(&self) -> usize {
        self.start_address
    }

    /// The number of slots in the block.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pool<{}>", self.item_type)?;
        writeln!(f, "  element size: {}", self.item_size)?;
        writeln!(f, "  element alignment: {}", self.item_align)?;
        writeln!(f, "  slot size: {}", self.slot_size)?;

        match self.next_free_address {
            Some(address) => writeln!(f, "  next free: {address:#x}")?,
            None => writeln!(f, "  next free: none")?,
        }

        writeln!(f, "  block size: {}", self.block_size)?;
        writeln!(f, "  free count: {}", self.free_count)?;
        writeln!(f, "  live count: {}", self.live_count)?;

        for (index, block) in self.blocks.iter().enumerate() {
            writeln!(
                f,
                "  block {index}: start {:#x}, {} slots",
                block.start_address, block.slot_count
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn sample() -> Diagnostics {
        Diagnostics {
            item_type: "u32",
            item_size: 4,
            item_align: 4,
            slot_size: 8,
            next_free_address: Some(0x1000),
            block_size: 2,
            free_count: 1,
            live_count: 1,
            blocks: vec![BlockDiagnostics {
                start_address: 0x1000,
                slot_count: 2,
            }],
        }
    }

    #[test]
    fn display_lists_every_field() {
        let report = sample().to_string();

        assert!(report.starts_with("Pool<u32>\n"));
        assert!(report.contains("element size: 4"));
        assert!(report.contains("element alignment: 4"));
        assert!(report.contains("slot size: 8"));
        assert!(report.contains("next free: 0x1000"));
        assert!(report.contains("block size: 2"));
        assert!(report.contains("free count: 1"));
        assert!(report.contains("live count: 1"));
        assert!(report.contains("block 0: start 0x1000, 2 slots"));
    }

    #[test]
    fn display_of_full_pool_has_no_next_free() {
        let mut diagnostics = sample();
        diagnostics.next_free_address = None;
        diagnostics.free_count = 0;

        assert!(diagnostics.to_string().contains("next free: none"));
    }
}
