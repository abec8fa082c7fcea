use core::fmt;

use crate::link::{Link, WeakClaim};
use crate::shared::Shared;

/// A non-owning observer of a [`Shared`] pointee.
///
/// A `Weak` keeps the control block allocated but not the pointee. Use [`Weak::lock`] to get a
/// [`Shared`] back while the pointee is alive.
pub struct Weak<T: ?Sized> {
    link: Link<T, WeakClaim>,
}

impl<T: ?Sized> Weak<T> {
    pub(crate) fn from_link(link: Link<T, WeakClaim>) -> Self {
        Weak { link }
    }

    pub(crate) fn link(&self) -> &Link<T, WeakClaim> {
        &self.link
    }

    /// A `Weak` that observes nothing. Locking it yields an empty [`Shared`].
    pub fn new() -> Self {
        Weak { link: Link::sentinel() }
    }

    /// A [`Shared`] co-owning the pointee, or an empty one if the pointee is gone.
    ///
    /// ```
    /// use counted_ptr::Shared;
    ///
    /// let strong = Shared::new("hello");
    /// let weak = Shared::downgrade(&strong);
    /// assert_eq!(*weak.lock(), "hello");
    ///
    /// drop(strong);
    /// assert!(Shared::is_empty(&weak.lock()));
    /// ```
    pub fn lock(&self) -> Shared<T> {
        if self.expired() {
            return Shared::empty();
        }
        // Not expired, so taking a strong claim next to the existing ones is sound.
        unsafe { Shared::from_block(self.link.raw()) }
    }

    /// Whether the pointee has been destroyed. An empty `Weak` is never expired.
    pub fn expired(&self) -> bool {
        self.link.block().expired()
    }

    /// The number of [`Shared`]s co-owning the pointee; `0` once it has been destroyed.
    pub fn use_count(&self) -> usize {
        self.link.use_count()
    }

    /// The number of `Weak`s referring to this block, `self` included.
    pub fn weak_count(&self) -> usize {
        self.link.weak_count()
    }

    /// Rebind to the block `shared` refers to.
    pub fn assign(&mut self, shared: &Shared<T>) {
        let block = shared.link().raw();
        if !self.link.same_block(block) {
            unsafe { self.link.rebind(block) }
        }
    }

    /// Stop observing, leaving `self` empty.
    pub fn reset(&mut self) {
        self.link.reset();
    }

    /// Exchange the blocks of two handles. No count changes.
    pub fn swap(&mut self, other: &mut Self) {
        self.link.swap(&mut other.link);
    }

    /// Whether both handles refer to the same block.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.link.same_block(other.link.raw())
    }
}

impl<T: ?Sized> Clone for Weak<T> {
    fn clone(&self) -> Self {
        Weak { link: self.link.clone() }
    }

    fn clone_from(&mut self, source: &Self) {
        self.link.clone_from(&source.link);
    }
}

impl<T: ?Sized> Default for Weak<T> {
    fn default() -> Self {
        Weak::new()
    }
}

impl<T: ?Sized> From<&Shared<T>> for Weak<T> {
    fn from(shared: &Shared<T>) -> Self {
        Shared::downgrade(shared)
    }
}

impl<T: ?Sized> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(Weak)")
    }
}
