use alloc::boxed::Box;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

use crate::deleter::{DefaultDelete, Deleter};

/// An exclusive owner of a heap object, destroyed through a [`Deleter`].
///
/// A `Unique` can be handed over to shared ownership with
/// [`Shared::from_unique`](crate::Shared::from_unique), which keeps its deleter.
pub struct Unique<T: ?Sized, D: Deleter<T> = DefaultDelete> {
    ptr: Option<NonNull<T>>,
    deleter: D,
    phantom: PhantomData<T>,
}

impl<T> Unique<T> {
    /// Box `value` and own it.
    pub fn new(value: T) -> Self {
        Unique::from_box(Box::new(value))
    }
}

impl<T: ?Sized> Unique<T> {
    pub fn from_box(value: Box<T>) -> Self {
        Unique { ptr: Some(NonNull::from(Box::leak(value))), deleter: DefaultDelete, phantom: PhantomData }
    }
}

impl<T: ?Sized, D: Deleter<T>> Unique<T, D> {
    /// Own `ptr`, destroying it with `deleter`. A null `ptr` yields an empty `Unique`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid until `deleter` runs on it, `deleter` must be able to destroy
    /// it, and nothing else may own it.
    pub unsafe fn from_raw_with(ptr: *mut T, deleter: D) -> Self {
        Unique { ptr: NonNull::new(ptr), deleter, phantom: PhantomData }
    }

    /// An empty `Unique` with the default deleter.
    pub fn empty() -> Self
    where
        D: Default,
    {
        Unique { ptr: None, deleter: D::default(), phantom: PhantomData }
    }

    /// The owned pointer, without giving up ownership.
    pub fn get(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    /// Give up ownership without destroying anything. `self` is left empty.
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.ptr.take()
    }

    pub fn get_deleter(&self) -> &D {
        &self.deleter
    }

    pub fn get_deleter_mut(&mut self) -> &mut D {
        &mut self.deleter
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Destroy the owned value, if any, leaving `self` empty.
    pub fn reset(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            unsafe { self.deleter.delete(ptr) };
        }
    }

    /// Exchange pointees and deleters.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.ptr, &mut other.ptr);
        mem::swap(&mut self.deleter, &mut other.deleter);
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for Unique<T, D> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for Unique<T, D> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the `Unique` is empty.
    fn deref(&self) -> &T {
        match self.ptr {
            Some(ptr) => unsafe { &*ptr.as_ptr() },
            None => panic!("dereferenced an empty `Unique`"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> DerefMut for Unique<T, D> {
    fn deref_mut(&mut self) -> &mut T {
        match self.ptr {
            Some(ptr) => unsafe { &mut *ptr.as_ptr() },
            None => panic!("dereferenced an empty `Unique`"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T> + Default> Default for Unique<T, D> {
    fn default() -> Self {
        Unique::empty()
    }
}

impl<T: ?Sized + fmt::Debug, D: Deleter<T>> fmt::Debug for Unique<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ptr {
            Some(ptr) => fmt::Debug::fmt(unsafe { ptr.as_ref() }, f),
            None => f.write_str("(empty)"),
        }
    }
}
