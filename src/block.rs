//! Fixed-size block allocation.
//!
//! A block heap carves a slab of up to 255 identical cells out of the
//! backing heap and serves them in O(1). The freelist is threaded through
//! the cells themselves: each free cell stores the index of the next free
//! cell in its first byte, so the slab needs no side metadata at all.

use core::alloc::Layout;
use core::ptr::NonNull;

use log::trace;

use crate::heap::Heap;
use crate::polyfill::NonNullStrict;
use crate::AllocInitError;

/// Maximum number of cells a [`BlockHeap`] can manage.
pub const BLOCK_HEAP_MAX: usize = u8::MAX as usize;

/// A fixed-size block allocator.
///
/// Built over a backing [`Heap`], which owns the slab for the lifetime of
/// this value. Not thread-safe; callers serialize externally.
#[derive(Debug)]
pub struct BlockHeap<'h> {
    heap: &'h Heap,
    base: NonNull<u8>,
    block_size: usize,
    capacity: u8,
    avail: u8,
    first_free: u8,
}

impl<'h> BlockHeap<'h> {
    /// Constructs a block heap of `nblocks` cells of `block_size` bytes
    /// each, with the slab aligned to `align`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocInitError::InvalidConfig`] if `block_size` or
    /// `nblocks` is zero or `align` is not a power of two, and
    /// [`AllocInitError::AllocFailed`] if the backing heap cannot provide
    /// the slab.
    pub fn init(
        heap: &'h Heap,
        block_size: usize,
        nblocks: u8,
        align: usize,
    ) -> Result<BlockHeap<'h>, AllocInitError> {
        if block_size == 0 || nblocks == 0 || !align.is_power_of_two() {
            return Err(AllocInitError::InvalidConfig);
        }

        let total = block_size
            .checked_mul(nblocks as usize)
            .ok_or(AllocInitError::InvalidConfig)?;
        let layout = Layout::from_size_align(total, align).map_err(|_| {
            AllocInitError::InvalidConfig
        })?;

        let base = heap
            .aligned_alloc(total, align)
            .ok_or(AllocInitError::AllocFailed(layout))?;

        // Thread the freelist through the cells: free cell `i` names cell
        // `i + 1` in its first byte. The last cell's link is never read;
        // `avail` runs out first.
        for i in 0..nblocks as usize {
            unsafe {
                base.as_ptr()
                    .add(i * block_size)
                    .write((i as u8).wrapping_add(1))
            };
        }

        Ok(BlockHeap {
            heap,
            base,
            block_size,
            capacity: nblocks,
            avail: nblocks,
            first_free: 0,
        })
    }

    /// Returns the number of free cells.
    pub fn available(&self) -> usize {
        self.avail as usize
    }

    /// Allocates one cell.
    ///
    /// Returns `None` when every cell is live.
    pub fn alloc(&mut self) -> Option<NonNull<u8>> {
        if self.avail == 0 {
            return None;
        }

        let offset = self.block_size * self.first_free as usize;

        // SAFETY: `first_free` indexes a cell of the slab, so the pointer
        // stays within the slab's provenance and is non-null.
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) };

        self.first_free = unsafe { ptr.as_ptr().read() };
        self.avail -= 1;

        Some(ptr)
    }

    /// Frees one cell.
    ///
    /// Pointers outside the slab, or not on a cell boundary, are ignored.
    ///
    /// # Safety
    ///
    /// A pointer that does name a cell of this heap must have been returned
    /// by [`alloc`](BlockHeap::alloc) and not yet freed; freeing a live
    /// cell twice corrupts the freelist.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) {
        let extent = self.block_size * self.capacity as usize;

        let offset = match ptr.addr().get().checked_sub(self.base.addr().get()) {
            Some(offset) if offset < extent && offset % self.block_size == 0 => offset,
            _ => {
                if self.heap.debug() {
                    trace!("block_heap info: free of pointer outside heap");
                }
                return;
            }
        };

        let index = (offset / self.block_size) as u8;

        unsafe { ptr.as_ptr().write(self.first_free) };
        self.first_free = index;
        // Releasing a cell restores capacity: `avail` counts free cells.
        self.avail += 1;
    }
}

impl Drop for BlockHeap<'_> {
    fn drop(&mut self) {
        unsafe { self.heap.aligned_free(self.base) };
    }
}
