#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Block-based object pools with an intrusive free list and stable memory addresses.
//!
//! This crate provides [`Pool<T>`], an object pool that obtains memory from the system allocator
//! in geometrically growing blocks instead of one allocation per object, and [`Multipool`], a
//! bundle of such pools for a fixed list of types with compile-time routing by type.
//!
//! # Key Features
//!
//! - **Few system allocator calls**: memory is requested one block at a time. Blocks grow by
//!   a compile-time growth factor up to a compile-time maximum block size.
//! - **O(1) construct and destroy**: free slots form a singly linked list stored inside the
//!   slots themselves, so no bookkeeping memory is needed.
//! - **LIFO reuse**: the most recently destroyed slot is the next one handed out, which keeps
//!   hot memory hot.
//! - **Stable memory addresses**: objects never move. Growing the pool adds a block and leaves
//!   existing blocks alone.
//! - **Bulk release**: all blocks can be returned to the system at once, without running
//!   destructors, for fast teardown of trivially destructible objects.
//! - **Compile-time dispatch**: [`Multipool`] picks the pool for a type with no runtime tag.
//! - **Flexible drop policies**: configure what happens when a pool is dropped while it still
//!   has live objects.
//! - **Thread mobility**: pools can be moved between threads (but not shared).
//!
//! # Raw pointers
//!
//! The pools hand out [`NonNull<T>`][std::ptr::NonNull] pointers and never create references
//! to the objects they hold. You decide how objects are accessed and aliased, and you are
//! responsible for destroying each object exactly once, using unsafe code.
//!
//! # Examples
//!
//! ## Single type
//!
//! ```rust
//! use block_pool::Pool;
//!
//! // First block has 2 slots, blocks double in size up to 8 slots.
//! let mut pool = Pool::<u64, 2, 8>::new(2);
//!
//! let first = pool.construct(1);
//! let second = pool.construct(2);
//! assert!(pool.full());
//!
//! // The pool grows by one block of 4 slots. Existing objects stay put.
//! let third = pool.construct(3);
//! assert!(!pool.full());
//! assert_eq!(pool.block_sizes().collect::<Vec<_>>(), [2, 4]);
//!
//! // SAFETY: The pointer came from this pool and has not been destroyed yet.
//! unsafe { pool.destroy(first.as_ptr()); }
//!
//! // The slot just freed is the first to be reused.
//! let fourth = pool.construct(4);
//! assert_eq!(fourth, first);
//!
//! // SAFETY: All the pointers came from this pool and have not been destroyed yet.
//! unsafe {
//!     assert_eq!(second.read() + third.read() + fourth.read(), 9);
//!
//!     pool.destroy(second.as_ptr());
//!     pool.destroy(third.as_ptr());
//!     pool.destroy(fourth.as_ptr());
//! }
//! ```
//!
//! ## Multiple types
//!
//! ```rust
//! use block_pool::Multipool;
//!
//! struct Node {
//!     value: u32,
//! }
//!
//! struct Edge {
//!     from: u32,
//!     to: u32,
//! }
//!
//! let mut graph = Multipool::<(Node, Edge)>::new(16);
//!
//! let a = graph.construct(Node { value: 1 });
//! let b = graph.construct(Node { value: 2 });
//! let ab = graph.construct(Edge { from: 1, to: 2 });
//!
//! assert_eq!(graph.get::<Node, _>().len(), 2);
//! assert_eq!(graph.get::<Edge, _>().len(), 1);
//!
//! // SAFETY: The objects are alive and nothing else references them.
//! unsafe {
//!     assert_eq!(a.as_ref().value, ab.as_ref().from);
//!     assert_eq!(b.as_ref().value, ab.as_ref().to);
//! }
//!
//! // Nodes and edges have trivial destructors, so it is fine to just drop the memory.
//! graph.release_all();
//! assert!(graph.is_empty());
//! ```
//!
//! ## Enforcing cleanup
//!
//! ```rust
//! use block_pool::{DropPolicy, Pool};
//!
//! let mut pool = Pool::<String>::builder()
//!     .initial_block_size(8)
//!     .drop_policy(DropPolicy::MustNotForgetItems)
//!     .build();
//!
//! let item = pool.construct("must be destroyed".to_string());
//!
//! // SAFETY: The pointer came from this pool and has not been destroyed yet.
//! unsafe { pool.destroy(item.as_ptr()); }
//!
//! // Dropping the pool with a live object would have panicked.
//! ```

mod block;
mod builder;
mod diagnostics;
mod drop_policy;
mod error;
mod multipool;
mod pool;

pub(crate) use block::*;
pub use builder::*;
pub use diagnostics::*;
pub use drop_policy::*;
pub(crate) use error::validate_initial_block_size;
pub use error::{Error, Result};
pub use multipool::*;
pub use pool::*;
