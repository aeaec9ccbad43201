use std::alloc::{self, Layout};
use std::mem::{ManuallyDrop, MaybeUninit};
use std::num::NonZero;
use std::ptr::NonNull;

/// One storage cell of a [`Block`], sized and aligned for exactly one `T`.
///
/// A slot is either free, in which case `next` links it into the pool's free list, or it holds
/// a live `T` in `item`. There is no tag telling the two apart: a slot is free exactly when it
/// is reachable from the free list. Writing an item overwrites the link and writing a link
/// overwrites the item, so the free list must be read before an item is written into a slot.
///
/// `repr(C)` places both fields at offset 0, which lets us convert between slot pointers and
/// item pointers with plain casts.
#[repr(C)]
pub(crate) union Slot<T> {
    item: ManuallyDrop<MaybeUninit<T>>,
    next: Option<NonNull<Slot<T>>>,
}

impl<T> Slot<T> {
    /// Returns a pointer to the item storage of the slot.
    #[must_use]
    pub(crate) fn item_ptr(slot: NonNull<Self>) -> NonNull<T> {
        // SAFETY: Slot pointers always come from one of our blocks, so the field projection
        // stays within the allocation.
        let item = unsafe { &raw mut (*slot.as_ptr()).item };

        // SAFETY: The field is at offset 0 of a non-null slot, so the pointer is non-null.
        unsafe { NonNull::new_unchecked(item.cast::<T>()) }
    }

    /// Converts a pointer obtained from [`item_ptr()`][Self::item_ptr] back into a slot pointer.
    #[must_use]
    pub(crate) fn from_item_ptr(item: NonNull<T>) -> NonNull<Self> {
        item.cast()
    }

    /// Reads the free list link stored in the slot.
    ///
    /// # Safety
    ///
    /// The slot must be free (reachable from the free list or freshly chained into one).
    #[must_use]
    pub(crate) unsafe fn next(slot: NonNull<Self>) -> Option<NonNull<Self>> {
        // SAFETY: The caller guarantees the slot lies inside one of our blocks.
        let next = unsafe { &raw const (*slot.as_ptr()).next };

        // SAFETY: Forwarding the guarantee that the slot is free, so `next` is the active field.
        unsafe { next.read() }
    }

    /// Stores a free list link in the slot, overwriting whatever was there.
    ///
    /// # Safety
    ///
    /// The slot must not hold a live object and the caller must have exclusive access to it.
    pub(crate) unsafe fn set_next(slot: NonNull<Self>, next: Option<NonNull<Self>>) {
        // SAFETY: The caller guarantees the slot lies inside one of our blocks.
        let link = unsafe { &raw mut (*slot.as_ptr()).next };

        // SAFETY: Forwarding the guarantee that nothing else uses the slot right now.
        unsafe {
            link.write(next);
        }
    }
}

/// A contiguous run of slots obtained from the system allocator in a single request.
///
/// The block owns its memory and returns it to the system allocator when dropped. It never runs
/// destructors of items that may still live in its slots - the pool decides what to do about
/// those before it lets go of its blocks.
///
/// Blocks are never resized or moved. Moving the `Block` value only moves the pointer to the
/// memory, so slot addresses stay stable for the whole life of the block.
pub(crate) struct Block<T> {
    first_slot: NonNull<Slot<T>>,
    len: NonZero<usize>,
}

impl<T> Block<T> {
    /// Allocates a new block of `len` slots and chains them into a free list, in address order.
    ///
    /// The link of the last slot is `None`, so the caller may use [`first_slot()`][1] as the head
    /// of a free list that ends with this block.
    ///
    /// # Panics
    ///
    /// Panics if a block of `len` slots is larger than the address space allows.
    ///
    /// Allocation failure is reported via [`std::alloc::handle_alloc_error`].
    ///
    /// [1]: Self::first_slot
    #[must_use]
    pub(crate) fn new(len: NonZero<usize>) -> Self {
        let layout = Self::layout(len);

        // SAFETY: The layout has non-zero size because a slot always has room for a link
        // and the block has at least one slot.
        let ptr = unsafe { alloc::alloc(layout) };

        let Some(first_slot) = NonNull::new(ptr.cast::<Slot<T>>()) else {
            alloc::handle_alloc_error(layout);
        };

        for index in 0..len.get() {
            // Cannot overflow because the slot count is bounded by the allocation size.
            let next_index = index.wrapping_add(1);

            let next = if next_index < len.get() {
                // SAFETY: next_index < len, so the pointer stays inside our allocation.
                Some(unsafe { first_slot.add(next_index) })
            } else {
                None
            };

            // SAFETY: index < len, so the pointer stays inside our allocation.
            let slot = unsafe { first_slot.add(index) };

            // SAFETY: The memory is freshly allocated and nobody else knows about it yet.
            unsafe {
                Slot::set_next(slot, next);
            }
        }

        Self { first_slot, len }
    }

    /// The first slot of the block, which heads the chain created by [`new()`][Self::new].
    #[must_use]
    pub(crate) fn first_slot(&self) -> NonNull<Slot<T>> {
        self.first_slot
    }

    /// The number of slots in the block.
    #[must_use]
    pub(crate) fn len(&self) -> NonZero<usize> {
        self.len
    }

    /// The address of the first byte of the block.
    #[must_use]
    pub(crate) fn start_address(&self) -> usize {
        self.first_slot.as_ptr().addr()
    }

    /// Whether `slot` points at the start of one of the slots of this block.
    #[must_use]
    pub(crate) fn contains(&self, slot: NonNull<Slot<T>>) -> bool {
        let start = self.start_address();

        // Cannot overflow because the allocation exists and lies within the address space.
        let end = start.wrapping_add(Self::layout(self.len).size());

        let address = slot.as_ptr().addr();

        if address < start || address >= end {
            return false;
        }

        // Cannot underflow because we checked above that the address is not below the start.
        let offset = address.wrapping_sub(start);

        // A slot is never zero-sized because it always has room for a link.
        offset
            .checked_rem(size_of::<Slot<T>>())
            .is_some_and(|remainder| remainder == 0)
    }

    fn layout(len: NonZero<usize>) -> Layout {
        Layout::array::<Slot<T>>(len.get())
            .expect("a block of this many slots does not fit in the address space")
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        // SAFETY: We allocated this memory in new() with the same layout and nothing else
        // deallocates it. Any items still in the slots are deliberately not dropped.
        unsafe {
            alloc::dealloc(self.first_slot.as_ptr().cast(), Self::layout(self.len));
        }
    }
}

impl<T> std::fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("first_slot", &self.first_slot)
            .field("len", &self.len)
            .finish()
    }
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
    use std::num::NonZero;

    use super::*;

    /// Walks the chain that starts at `head` and returns the visited slots in order.
    fn walk<T>(head: NonNull<Slot<T>>) -> Vec<NonNull<Slot<T>>> {
        std::iter::successors(Some(head), |slot| unsafe { Slot::next(*slot) }).collect()
    }

    #[test]
    fn new_block_is_chained_in_address_order() {
        let block = Block::<u64>::new(NonZero::new(5).unwrap());

        let chain = walk(block.first_slot());
        assert_eq!(chain.len(), 5);

        for pair in chain.windows(2) {
            assert_eq!(
                pair[1].as_ptr().addr() - pair[0].as_ptr().addr(),
                size_of::<Slot<u64>>()
            );
        }
    }

    #[test]
    fn single_slot_block_has_no_next() {
        let block = Block::<u64>::new(NonZero::new(1).unwrap());

        assert_eq!(unsafe { Slot::next(block.first_slot()) }, None);
    }

    #[test]
    fn slot_fits_item_and_link() {
        assert!(size_of::<Slot<[u8; 3]>>() >= size_of::<Option<NonNull<u8>>>());
        assert!(size_of::<Slot<[u64; 16]>>() >= size_of::<[u64; 16]>());
        assert_eq!(
            align_of::<Slot<u128>>(),
            align_of::<u128>().max(align_of::<usize>())
        );
    }

    #[test]
    fn zero_sized_items_still_get_room_for_a_link() {
        let block = Block::<()>::new(NonZero::new(3).unwrap());

        assert_eq!(walk(block.first_slot()).len(), 3);
    }

    #[test]
    fn item_ptr_round_trips_to_slot() {
        let block = Block::<u32>::new(NonZero::new(2).unwrap());
        let slot = block.first_slot();

        let item = Slot::item_ptr(slot);
        assert_eq!(item.as_ptr().addr(), slot.as_ptr().addr());
        assert_eq!(Slot::from_item_ptr(item), slot);
    }

    #[test]
    fn contains_accepts_only_own_slot_starts() {
        let block = Block::<u64>::new(NonZero::new(4).unwrap());
        let other = Block::<u64>::new(NonZero::new(4).unwrap());

        for slot in walk(block.first_slot()) {
            assert!(block.contains(slot));
            assert!(!other.contains(slot));
        }

        let misaligned = unsafe { block.first_slot().byte_add(1) };
        assert!(!block.contains(misaligned));

        let past_end = unsafe { block.first_slot().add(4) };
        assert!(!block.contains(past_end));
    }

    #[test]
    fn contains_rejects_pointers_inside_a_slot() {
        let block = Block::<[u64; 3]>::new(NonZero::new(3).unwrap());
        let slot_size = size_of::<Slot<[u64; 3]>>();

        for offset in 1..slot_size {
            let inside_first = unsafe { block.first_slot().byte_add(offset) };
            assert!(!block.contains(inside_first));

            let inside_last = unsafe { block.first_slot().add(2).byte_add(offset) };
            assert!(!block.contains(inside_last));
        }

        assert!(block.contains(unsafe { block.first_slot().add(1) }));
        assert!(block.contains(unsafe { block.first_slot().add(2) }));
    }

    #[test]
    fn set_next_relinks_slots() {
        let block = Block::<u32>::new(NonZero::new(3).unwrap());
        let chain = walk(block.first_slot());
        let (first, second, third) = (chain[0], chain[1], chain[2]);

        unsafe {
            // Skip the middle slot and make it the tail instead.
            Slot::set_next(first, Some(third));
            Slot::set_next(third, Some(second));
            Slot::set_next(second, None);

            assert_eq!(Slot::next(first), Some(third));
            assert_eq!(Slot::next(third), Some(second));
            assert_eq!(Slot::next(second), None);
        }

        assert_eq!(walk(first), [first, third, second]);
        assert_eq!(Slot::item_ptr(third).as_ptr().addr(), third.as_ptr().addr());
    }

    #[test]
    fn items_can_be_written_over_links() {
        let block = Block::<String>::new(NonZero::new(2).unwrap());
        let slot = block.first_slot();
        let item = Slot::item_ptr(slot);

        unsafe {
            item.write("pooled".to_string());
            assert_eq!(item.as_ref(), "pooled");
            item.drop_in_place();

            Slot::set_next(slot, None);
            assert_eq!(Slot::next(slot), None);
        }
    }
}
