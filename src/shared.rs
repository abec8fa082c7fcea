use alloc::boxed::Box;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Deref;
use core::ptr::{self, NonNull};

use log::debug;

use crate::block::{self, ControlBlock, DeleterBlock, InPlaceBlock};
use crate::deleter::{DefaultDelete, Deleter};
use crate::error::{Error, Result};
use crate::link::{Link, StrongClaim};
use crate::weak::Weak;
use crate::ReferenceCounted;

/// A non-thread-safe shared owner of a heap object.
///
/// Every `Shared` refers to a control block. An empty `Shared` refers to a process-wide sentinel
/// block, so creating one never allocates. The pointee is destroyed when the last `Shared` to it
/// goes away; the block itself lives on while any [`Weak`] still observes it.
pub struct Shared<T: ?Sized> {
    link: Link<T, StrongClaim>,
}

impl<T: ?Sized> Shared<T> {
    /// Take a strong claim on `block`.
    ///
    /// # Safety
    ///
    /// `block` must be the sentinel or a live, unexpired block.
    pub(crate) unsafe fn from_block(block: NonNull<dyn ControlBlock<T>>) -> Self {
        Shared { link: unsafe { Link::bind(block) } }
    }

    pub(crate) fn link(&self) -> &Link<T, StrongClaim> {
        &self.link
    }

    /// A `Shared` that owns nothing.
    ///
    /// ```
    /// use counted_ptr::Shared;
    ///
    /// let empty: Shared<u8> = Shared::empty();
    /// assert!(Shared::is_empty(&empty));
    /// assert_eq!(Shared::use_count(&empty), 0);
    /// ```
    pub fn empty() -> Self {
        Shared { link: Link::sentinel() }
    }

    /// Take ownership of a boxed value, destroying it with [`DefaultDelete`].
    pub fn from_box(value: Box<T>) -> Self {
        unsafe { Self::from_raw_with(Box::into_raw(value), DefaultDelete) }
    }

    /// Take ownership of `ptr`, destroying it with [`DefaultDelete`]. A null `ptr` yields an
    /// empty `Shared`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from [`Box::into_raw`], and nothing else may own it.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        unsafe { Self::from_raw_with(ptr, DefaultDelete) }
    }

    /// Take ownership of `ptr`, destroying it with `deleter` once the last `Shared` is gone. A
    /// null `ptr` yields an empty `Shared` and drops `deleter` without calling it.
    ///
    /// `T` may borrow, but `deleter` may not: no handle carries its lifetimes.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid until `deleter` runs on it, `deleter` must be able to destroy
    /// it, and nothing else may own it.
    pub unsafe fn from_raw_with<D>(ptr: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + 'static,
    {
        match NonNull::new(ptr) {
            Some(ptr) => unsafe { Self::from_block(block::allocate(DeleterBlock::new(ptr, deleter))) },
            None => Self::empty(),
        }
    }

    /// Promote `weak` to a co-owner of its pointee.
    ///
    /// Fails with [`Error::Expired`] if the pointee has already been destroyed; `weak` is left
    /// untouched either way. An empty `Weak` promotes to an empty `Shared`.
    pub fn try_from_weak(weak: &Weak<T>) -> Result<Self> {
        let link = weak.link();
        if link.block().expired() {
            debug!("refusing to promote an expired weak reference");
            return Err(Error::Expired);
        }
        Ok(unsafe { Self::from_block(link.raw()) })
    }

    /// Create a [`Weak`] observing the same block.
    pub fn downgrade(this: &Self) -> Weak<T> {
        Weak::from_link(this.link.relink())
    }

    /// The pointee, or `None` if `this` is empty.
    #[inline]
    pub fn get(this: &Self) -> Option<&T> {
        // The strong claim keeps the pointee alive for as long as `this` is borrowed.
        this.link.get().map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Mutable access to the pointee, if no other `Shared` or `Weak` refers to its block.
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if this.link.use_count() == 1 && this.link.weak_count() == 0 {
            this.link.get().map(|ptr| unsafe { &mut *ptr.as_ptr() })
        } else {
            None
        }
    }

    /// The address of the pointee, or `None` if `this` is empty.
    pub fn as_ptr(this: &Self) -> Option<NonNull<T>> {
        this.link.get()
    }

    /// Whether `this` owns nothing.
    pub fn is_empty(this: &Self) -> bool {
        this.link.get().is_none()
    }

    /// The number of `Shared`s referring to this block. Empty handles report `0`.
    pub fn use_count(this: &Self) -> usize {
        this.link.use_count()
    }

    /// The number of [`Weak`]s referring to this block.
    pub fn weak_count(this: &Self) -> usize {
        this.link.weak_count()
    }

    /// Whether both handles refer to the same block.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.link.same_block(other.link.raw())
    }

    /// Give up this handle's claim, leaving it empty. Destroys the pointee if this was the last
    /// owner.
    pub fn reset(this: &mut Self) {
        this.link.reset();
    }

    /// Give up this handle's claim, then take ownership of `ptr` as [`Shared::from_raw_with`]
    /// does.
    ///
    /// # Safety
    ///
    /// As for [`Shared::from_raw_with`]. In particular `ptr` must not be the pointee `this`
    /// currently owns.
    pub unsafe fn reset_with<D>(this: &mut Self, ptr: *mut T, deleter: D)
    where
        D: Deleter<T> + 'static,
    {
        this.link.reset();
        *this = unsafe { Self::from_raw_with(ptr, deleter) };
    }

    /// Move the claim out of `this`, leaving `this` empty.
    pub fn take(this: &mut Self) -> Self {
        let mut taken = Self::empty();
        Self::swap(this, &mut taken);
        taken
    }

    /// Exchange the blocks of two handles. No count changes.
    pub fn swap(this: &mut Self, other: &mut Self) {
        this.link.swap(&mut other.link);
    }

    fn addr(this: &Self) -> *const () {
        this.link.get().map_or(ptr::null(), |ptr| ptr.as_ptr().cast::<()>() as *const ())
    }
}

impl<T> Shared<T> {
    /// Allocate `value` inline in a fresh control block, so that block and pointee share one
    /// allocation.
    ///
    /// ```
    /// use counted_ptr::Shared;
    ///
    /// let five = Shared::new(5);
    /// assert_eq!(*five, 5);
    /// assert_eq!(Shared::use_count(&five), 1);
    ///
    /// let text = String::from("borrowed");
    /// let view = Shared::new(text.as_str());
    /// assert_eq!(*view, "borrowed");
    /// ```
    pub fn new(value: T) -> Self {
        unsafe { Self::from_block(block::allocate(InPlaceBlock::new(value))) }
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    /// Makes a clone of the `Shared` pointer.
    ///
    /// This creates another pointer to the same allocation, increasing the reference count.
    #[inline]
    fn clone(&self) -> Shared<T> {
        Shared { link: self.link.clone() }
    }

    /// Rebinds `self` to the block of `source`.
    ///
    /// The claim on `source`'s block is taken before the old one is released, so assigning a
    /// handle its own block never destroys the pointee.
    fn clone_from(&mut self, source: &Self) {
        self.link.clone_from(&source.link);
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    /// Dereferences the pointee.
    ///
    /// # Panics
    ///
    /// Panics if the `Shared` is empty.
    #[inline]
    fn deref(&self) -> &T {
        match Shared::get(self) {
            Some(value) => value,
            None => panic!("dereferenced an empty `Shared`"),
        }
    }
}

impl<T: ?Sized> AsRef<T> for Shared<T> {
    fn as_ref(&self) -> &T {
        &**self
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Shared::get(self) {
            Some(value) => fmt::Display::fmt(value, f),
            None => f.write_str("(empty)"),
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Shared::get(self) {
            Some(value) => fmt::Debug::fmt(value, f),
            None => f.write_str("(empty)"),
        }
    }
}

impl<T: ?Sized> fmt::Pointer for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&Shared::addr(self), f)
    }
}

impl<T: ?Sized> ReferenceCounted<T> for Shared<T> {
    fn reference_count(this: &Self) -> usize {
        Shared::use_count(this)
    }
}

impl<T: ?Sized> Default for Shared<T> {
    /// Creates an empty `Shared<T>`, without allocating.
    fn default() -> Shared<T> {
        Shared::empty()
    }
}

impl<T: ?Sized> PartialEq for Shared<T> {
    /// Equality for two `Shared`s.
    ///
    /// Two `Shared`s are equal if they point at the same address. The pointees are never
    /// compared; two empty handles are equal.
    #[inline]
    fn eq(&self, other: &Shared<T>) -> bool {
        Shared::addr(self) == Shared::addr(other)
    }
}

impl<T: ?Sized> Eq for Shared<T> {}

impl<T: ?Sized> PartialOrd for Shared<T> {
    /// Partial comparison for two `Shared`s.
    ///
    /// The two are compared by pointee address; an empty handle orders first.
    fn partial_cmp(&self, other: &Shared<T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized> Ord for Shared<T> {
    /// Comparison for two `Shared`s, by pointee address.
    fn cmp(&self, other: &Shared<T>) -> Ordering {
        Shared::addr(self).cmp(&Shared::addr(other))
    }
}

impl<T: ?Sized> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Shared::addr(self).hash(state)
    }
}

impl<T> From<T> for Shared<T> {
    fn from(t: T) -> Self {
        Shared::new(t)
    }
}

impl<T: ?Sized> From<Box<T>> for Shared<T> {
    fn from(value: Box<T>) -> Self {
        Shared::from_box(value)
    }
}

impl<T: ?Sized> TryFrom<&Weak<T>> for Shared<T> {
    type Error = Error;

    fn try_from(weak: &Weak<T>) -> Result<Self> {
        Shared::try_from_weak(weak)
    }
}

#[cfg(feature = "unique")]
mod adopt {
    use super::*;
    use crate::unique::Unique;

    impl<T: ?Sized> Shared<T> {
        /// Take over the pointee and deleter of an exclusive pointer, leaving it empty.
        ///
        /// ```
        /// use counted_ptr::{Shared, Unique};
        ///
        /// let mut unique = Unique::new(String::from("owned"));
        /// let shared = Shared::from_unique(std::mem::take(&mut unique));
        /// assert!(unique.is_empty());
        /// assert_eq!(*shared, "owned");
        /// ```
        pub fn from_unique<D>(mut unique: Unique<T, D>) -> Self
        where
            D: Deleter<T> + Clone + 'static,
        {
            let ptr = unique.get();
            let deleter = unique.get_deleter().clone();
            unique.release();

            match ptr {
                Some(ptr) => unsafe { Self::from_block(block::allocate(DeleterBlock::new(ptr, deleter))) },
                None => Self::empty(),
            }
        }
    }

    impl<T: ?Sized, D: Deleter<T> + Clone + 'static> From<Unique<T, D>> for Shared<T> {
        fn from(unique: Unique<T, D>) -> Self {
            Shared::from_unique(unique)
        }
    }
}
