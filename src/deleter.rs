//! Deletion strategies: the routines that destroy a pointee once its last owner lets go.

use alloc::boxed::Box;
use core::ptr::NonNull;

/// Destroys a pointee.
///
/// Any `FnMut(NonNull<T>)` closure is a deleter, so ad-hoc cleanup does not need its own type.
pub trait Deleter<T: ?Sized> {
    /// Destroy the value behind `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be the pointer this deleter was paired with when ownership was established, and
    /// it must not have been deleted already.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// The default strategy: `ptr` came from [`Box::into_raw`] and is handed back to `Box` to drop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

impl<T: ?Sized, F: FnMut(NonNull<T>)> Deleter<T> for F {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        (*self)(ptr)
    }
}
