#![no_std]
//! Shared and weak reference-counted handles built on an explicit control block.
//!
//! A [`Shared`] co-owns a heap object, a [`Weak`] observes it without keeping it alive, and
//! [`SelfHandle`] lets an object hand out a [`Shared`] to itself. All counting is
//! single-threaded: none of the handles are `Send` or `Sync`.
//!
//! ```
//! use counted_ptr::Shared;
//!
//! let a = Shared::new(5);
//! let w = Shared::downgrade(&a);
//! assert_eq!(Shared::use_count(&a), 1);
//!
//! drop(a);
//! assert!(w.expired());
//! assert!(Shared::is_empty(&w.lock()));
//! ```

extern crate alloc;
#[cfg(test)]
extern crate std;

use core::ops::Deref;

mod block;
mod link;

pub mod deleter;
pub mod error;

mod shared;
pub use shared::*;

mod weak;
pub use weak::*;

#[cfg(feature = "self-handle")]
mod self_handle;
#[cfg(feature = "self-handle")]
pub use self_handle::*;

#[cfg(feature = "unique")]
mod unique;
#[cfg(feature = "unique")]
pub use unique::*;

pub use deleter::{DefaultDelete, Deleter};
pub use error::{Error, Result};

/// A smart pointer that keeps track of how many pointers refer to the same allocation and
/// exposes this information in its API.
pub trait ReferenceCounted<T: ?Sized>: Deref<Target = T> + Clone {
    /// Get the number of owning pointers referring to the same allocation.
    ///
    /// Implementations must report `0` for a pointer that owns nothing.
    fn reference_count(this: &Self) -> usize;
}
