//! Scratch allocation.
//!
//! A scratch heap is a monotonic bump allocator over a fixed arena. There
//! is no per-allocation free: the whole arena is reclaimed at once by
//! [`reset`](ScratchHeap::reset), in O(1). Useful for per-frame or
//! per-request working memory whose lifetimes all end together.

use core::alloc::Layout;
use core::num::NonZeroUsize;
use core::ptr::NonNull;

use crate::heap::Heap;
use crate::polyfill::NonNullStrict;
use crate::AllocInitError;

/// A monotonic scratch allocator.
///
/// Built over a backing [`Heap`], which owns the arena for the lifetime of
/// this value. Not thread-safe; callers serialize externally.
#[derive(Debug)]
pub struct ScratchHeap<'h> {
    heap: &'h Heap,
    mem: NonNull<u8>,
    head: NonZeroUsize,
    tail: NonZeroUsize,
}

impl<'h> ScratchHeap<'h> {
    /// Constructs a scratch heap over an arena of `nbytes` bytes aligned
    /// to `align`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocInitError::InvalidConfig`] if `nbytes` is zero or
    /// `align` is not a power of two, and [`AllocInitError::AllocFailed`]
    /// if the backing heap cannot provide the arena.
    pub fn init(
        heap: &'h Heap,
        nbytes: usize,
        align: usize,
    ) -> Result<ScratchHeap<'h>, AllocInitError> {
        if nbytes == 0 || !align.is_power_of_two() {
            return Err(AllocInitError::InvalidConfig);
        }

        let layout = Layout::from_size_align(nbytes, align)
            .map_err(|_| AllocInitError::InvalidConfig)?;

        let mem = heap
            .aligned_alloc(nbytes, align)
            .ok_or(AllocInitError::AllocFailed(layout))?;

        let head = mem.addr();
        let tail = head
            .get()
            .checked_add(nbytes)
            .and_then(NonZeroUsize::new)
            .ok_or(AllocInitError::InvalidLocation)?;

        Ok(ScratchHeap {
            heap,
            mem,
            head,
            tail,
        })
    }

    /// Allocates `nbytes` bytes aligned to `align`.
    ///
    /// Returns `None`, leaving the heap unchanged, if `align` is not a
    /// power of two or the arena has insufficient room left.
    pub fn alloc(&mut self, nbytes: usize, align: usize) -> Option<NonNull<u8>> {
        if !align.is_power_of_two() {
            return None;
        }

        let aligned = self.head.get().checked_add(align - 1)? & !(align - 1);
        let end = aligned.checked_add(nbytes)?;

        if end > self.tail.get() {
            return None;
        }

        self.head = NonZeroUsize::new(end).unwrap();

        Some(self.mem.with_addr(NonZeroUsize::new(aligned).unwrap()))
    }

    /// Reclaims the whole arena.
    ///
    /// # Safety
    ///
    /// All pointers previously returned by [`alloc`](ScratchHeap::alloc)
    /// are invalidated; they may no longer be dereferenced.
    pub unsafe fn reset(&mut self) {
        self.head = self.mem.addr();
    }
}

impl Drop for ScratchHeap<'_> {
    fn drop(&mut self) {
        unsafe { self.heap.aligned_free(self.mem) };
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::prelude::rust_2021::*;

    use super::*;
    use crate::heap::HeapFlags;

    #[test]
    fn init_rejects_bad_config() {
        let heap = Heap::new(HeapFlags::empty());

        assert!(ScratchHeap::init(&heap, 0, 8).is_err());
        assert!(ScratchHeap::init(&heap, 256, 3).is_err());
    }

    #[test]
    fn allocations_advance_and_align() {
        let heap = Heap::new(HeapFlags::COUNT);
        let mut scratch = ScratchHeap::init(&heap, 1024, 64).unwrap();

        let base = scratch.mem.as_ptr() as usize;

        let a = scratch.alloc(10, 1).unwrap();
        assert_eq!(a.as_ptr() as usize, base);

        let b = scratch.alloc(10, 16).unwrap();
        assert_eq!(b.as_ptr() as usize, base + 16);
        assert_eq!(b.as_ptr() as usize % 16, 0);

        let c = scratch.alloc(1, 64).unwrap();
        assert_eq!(c.as_ptr() as usize, base + 64);
    }

    #[test]
    fn exhaustion_leaves_state_unchanged() {
        let heap = Heap::new(HeapFlags::empty());
        let mut scratch = ScratchHeap::init(&heap, 128, 8).unwrap();

        let a = scratch.alloc(100, 8).unwrap();
        assert!(scratch.alloc(100, 8).is_none());

        // A fitting request must still succeed at the same watermark.
        let b = scratch.alloc(28, 1).unwrap();
        assert_eq!(
            b.as_ptr() as usize,
            a.as_ptr() as usize + 100
        );
    }

    #[test]
    fn non_power_of_two_alignment_fails() {
        let heap = Heap::new(HeapFlags::empty());
        let mut scratch = ScratchHeap::init(&heap, 128, 8).unwrap();

        assert!(scratch.alloc(8, 0).is_none());
        assert!(scratch.alloc(8, 12).is_none());
    }

    #[test]
    fn reset_replays_identical_offsets() {
        let heap = Heap::new(HeapFlags::empty());
        let mut scratch = ScratchHeap::init(&heap, 4096, 16).unwrap();

        let script = [(40usize, 8usize), (1, 64), (100, 2), (512, 256), (3, 1)];

        let first: Vec<usize> = script
            .iter()
            .map(|&(n, a)| scratch.alloc(n, a).unwrap().as_ptr() as usize)
            .collect();

        unsafe { scratch.reset() };

        let second: Vec<usize> = script
            .iter()
            .map(|&(n, a)| scratch.alloc(n, a).unwrap().as_ptr() as usize)
            .collect();

        assert_eq!(first, second);
    }
}
