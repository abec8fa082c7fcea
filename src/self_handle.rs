//! Objects that can hand out [`Shared`] handles to themselves.
//!
//! An object embeds a [`SelfHandle`] and implements [`SharedFromSelf`]. When it is put under
//! shared ownership through one of the `*_linked` constructors, the new [`Shared`] stores a
//! [`Weak`] to its own block in the `SelfHandle`. From then on, code holding only `&T` can get a
//! co-owning `Shared<T>` instead of creating a second, conflicting control block.
//!
//! ```
//! use counted_ptr::{SelfHandle, Shared, SharedFromSelf};
//!
//! struct Node {
//!     id: u32,
//!     this: SelfHandle<Node>,
//! }
//!
//! impl SharedFromSelf for Node {
//!     fn self_handle(&self) -> &SelfHandle<Node> {
//!         &self.this
//!     }
//! }
//!
//! let node = Shared::new_linked(Node { id: 7, this: SelfHandle::new() });
//! let again = node.shared_from_self();
//! assert_eq!(again.id, 7);
//! assert_eq!(Shared::use_count(&node), 2);
//! ```

use alloc::boxed::Box;
use core::cell::OnceCell;
use core::fmt;

use crate::deleter::Deleter;
use crate::shared::Shared;
use crate::weak::Weak;

/// The embedded back-reference of a [`SharedFromSelf`] object.
///
/// It stays unlinked until the first [`Shared`] over the object is created, and is linked at
/// most once.
pub struct SelfHandle<T: ?Sized> {
    weak: OnceCell<Weak<T>>,
}

impl<T: ?Sized> SelfHandle<T> {
    pub const fn new() -> Self {
        SelfHandle { weak: OnceCell::new() }
    }

    /// Whether a [`Shared`] has been created over the owning object yet.
    pub fn is_linked(&self) -> bool {
        self.weak.get().is_some()
    }

    /// A [`Shared`] co-owning the object, or an empty one while unlinked.
    pub fn shared(&self) -> Shared<T> {
        match self.weak.get() {
            Some(weak) => weak.lock(),
            None => Shared::empty(),
        }
    }

    fn link(&self, owner: &Shared<T>) {
        // Only the block that first owned the object is recorded.
        let _ = self.weak.set(Shared::downgrade(owner));
    }
}

impl<T: ?Sized> Default for SelfHandle<T> {
    fn default() -> Self {
        SelfHandle::new()
    }
}

impl<T: ?Sized> fmt::Debug for SelfHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfHandle").field("linked", &self.is_linked()).finish()
    }
}

/// An object that embeds a [`SelfHandle`] to itself.
///
/// Implementing this trait links nothing by itself. Put the object under shared ownership with
/// [`Shared::new_linked`], [`Shared::from_box_linked`], [`Shared::from_raw_linked`] or
/// `Shared::from_unique_linked`; the plain constructors such as [`Shared::new`] leave the
/// handle unlinked.
///
/// ```
/// use counted_ptr::{SelfHandle, Shared, SharedFromSelf};
///
/// struct Job {
///     this: SelfHandle<Job>,
/// }
///
/// impl SharedFromSelf for Job {
///     fn self_handle(&self) -> &SelfHandle<Job> {
///         &self.this
///     }
/// }
///
/// let plain = Shared::new(Job { this: SelfHandle::new() });
/// assert!(Shared::is_empty(&plain.shared_from_self()));
///
/// let linked = Shared::new_linked(Job { this: SelfHandle::new() });
/// assert!(Shared::ptr_eq(&linked, &linked.shared_from_self()));
/// ```
pub trait SharedFromSelf {
    fn self_handle(&self) -> &SelfHandle<Self>;

    /// A new [`Shared`] co-owning `self`.
    ///
    /// Returns an empty handle if `self` was never put under shared ownership through a
    /// `*_linked` constructor, or if `self` is already being dropped.
    fn shared_from_self(&self) -> Shared<Self> {
        self.self_handle().shared()
    }
}

impl<T: ?Sized + SharedFromSelf> Shared<T> {
    fn link_self_handle(this: Self) -> Self {
        if let Some(value) = Shared::get(&this) {
            value.self_handle().link(&this);
        }
        this
    }
}

impl<T: SharedFromSelf> Shared<T> {
    /// [`Shared::new`], linking the object's [`SelfHandle`] to the new block.
    pub fn new_linked(value: T) -> Self {
        Shared::link_self_handle(Shared::new(value))
    }
}

impl<T: ?Sized + SharedFromSelf> Shared<T> {
    /// [`Shared::from_box`], linking the object's [`SelfHandle`] to the new block.
    pub fn from_box_linked(value: Box<T>) -> Self {
        Shared::link_self_handle(Shared::from_box(value))
    }

    /// [`Shared::from_raw_with`], linking the object's [`SelfHandle`] to the new block.
    ///
    /// # Safety
    ///
    /// As for [`Shared::from_raw_with`].
    pub unsafe fn from_raw_linked<D>(ptr: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + 'static,
    {
        Shared::link_self_handle(unsafe { Shared::from_raw_with(ptr, deleter) })
    }

    /// [`Shared::from_unique`], linking the object's [`SelfHandle`] to the new block.
    #[cfg(feature = "unique")]
    pub fn from_unique_linked<D>(unique: crate::unique::Unique<T, D>) -> Self
    where
        D: Deleter<T> + Clone + 'static,
    {
        Shared::link_self_handle(Shared::from_unique(unique))
    }
}
