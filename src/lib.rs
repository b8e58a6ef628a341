#![doc = include_str!("../README.md")]
#![no_std]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
// This is necessary to allow `sptr` to shadow methods provided by newer
// toolchains.
#![allow(unstable_name_collisions)]

extern crate alloc;

mod polyfill;

pub mod block;
pub mod buddy;
pub mod heap;
pub mod scratch;


use core::alloc::Layout;

#[doc(inline)]
pub use crate::{
    block::{BlockHeap, BLOCK_HEAP_MAX},
    buddy::{BuddyHeap, BUDDY_MAX_K, BUDDY_MIN_K},
    heap::{Heap, HeapFlags},
    scratch::ScratchHeap,
};

/// The error type for allocator constructors.
#[derive(Clone, Debug)]
pub enum AllocInitError {
    /// A necessary allocation failed.
    ///
    /// This variant is returned when a constructor attempts to allocate
    /// memory, either for metadata or the managed region, but the backing
    /// heap fails.
    ///
    /// The variant contains the [`Layout`] that could not be allocated.
    AllocFailed(Layout),

    /// The configuration of the allocator is invalid.
    ///
    /// This variant is returned when an allocator's configuration
    /// parameters are impossible to satisfy.
    InvalidConfig,

    /// The location of the allocator is invalid.
    ///
    /// This variant is returned when the full size of the managed region
    /// would not fit at the provided address, i.e., pointer calculations
    /// would overflow.
    InvalidLocation,
}
