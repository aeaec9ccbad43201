//! Basic usage of the `block_pool` crate:
//!
//! * Creating a pool.
//! * Constructing objects.
//! * Accessing objects through their pointers.
//! * Destroying objects and watching their slots be reused.
//! * Inspecting the pool.

use block_pool::Pool;

fn main() {
    // The first block has room for 2 objects. Later blocks double in size, up to 8 slots.
    let mut pool = Pool::<String, 2, 8>::new(2);

    let alice = pool.construct("Alice".to_string());
    let bob = pool.construct("Bob".to_string());

    println!(
        "Pool contains {} objects in {} block(s), full: {}",
        pool.len(),
        pool.block_count(),
        pool.full()
    );

    // The pool is full, so this allocates a second block. Alice and Bob stay where they are.
    let charlie = pool.construct("Charlie".to_string());

    println!(
        "After growth: {} objects, block sizes {:?}",
        pool.len(),
        pool.block_sizes().collect::<Vec<_>>()
    );

    // SAFETY: The objects are alive and we hold no other references to them.
    unsafe {
        println!(
            "Objects: {}, {}, {}",
            alice.as_ref(),
            bob.as_ref(),
            charlie.as_ref()
        );
    }

    // You can also modify the objects in place.
    // SAFETY: The object is alive and we hold no other references to it.
    unsafe {
        (*bob.as_ptr()).push_str(" Smith");
        println!("Modified object: {}", bob.as_ref());
    }

    // SAFETY: The pointer came from this pool and has not been destroyed yet.
    unsafe {
        pool.destroy(alice.as_ptr());
    }

    // The most recently freed slot is handed out first.
    let dave = pool.construct("Dave".to_string());
    println!("Dave reused Alice's slot: {}", dave == alice);

    println!("{}", pool.diagnostics());

    // SAFETY: The pointers came from this pool and have not been destroyed yet.
    unsafe {
        pool.destroy(bob.as_ptr());
        pool.destroy(charlie.as_ptr());
        pool.destroy(dave.as_ptr());
    }

    println!("Pool is empty again: {}", pool.is_empty());
}
