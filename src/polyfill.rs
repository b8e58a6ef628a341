//! Strict-provenance shims for stable toolchains.
//!
//! Pointer/address round-trips go through [`sptr`] so the crate keeps a
//! single provenance story whether or not the intrinsics are available.

use core::num::NonZeroUsize;
use core::ptr::NonNull;

pub(crate) use sptr::Strict;

/// Strict-provenance methods on [`NonNull`], with non-zero address types.
pub(crate) trait NonNullStrict<T> {
    fn addr(self) -> NonZeroUsize
    where
        T: Sized;

    fn with_addr(self, addr: NonZeroUsize) -> Self
    where
        T: Sized;
}

impl<T> NonNullStrict<T> for NonNull<T> {
    fn addr(self) -> NonZeroUsize
    where
        T: Sized,
    {
        // SAFETY: The pointer is guaranteed by the type to be non-null,
        // meaning that the address will be non-zero.
        unsafe { NonZeroUsize::new_unchecked(self.as_ptr().addr()) }
    }

    fn with_addr(self, addr: NonZeroUsize) -> Self
    where
        T: Sized,
    {
        // SAFETY: The result of `with_addr` is non-null because `addr` is
        // guaranteed to be non-zero.
        unsafe { NonNull::new_unchecked(self.as_ptr().with_addr(addr.get())) }
    }
}
