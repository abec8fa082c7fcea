//! The counting logic shared by strong and weak handles.

use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use crate::block::{self, Claim, ControlBlock};

/// Which count a [`Link`] holds a claim on.
pub(crate) trait ClaimKind {
    const CLAIM: Claim;
}

pub(crate) enum StrongClaim {}

pub(crate) enum WeakClaim {}

impl ClaimKind for StrongClaim {
    const CLAIM: Claim = Claim::Strong;
}

impl ClaimKind for WeakClaim {
    const CLAIM: Claim = Claim::Weak;
}

/// One counted claim of kind `K` on a control block.
///
/// A link always refers to some block; an empty link refers to the sentinel.
pub(crate) struct Link<T: ?Sized, K: ClaimKind> {
    block: NonNull<dyn ControlBlock<T>>,
    kind: PhantomData<K>,
    phantom: PhantomData<T>,
}

impl<T: ?Sized, K: ClaimKind> Link<T, K> {
    pub(crate) fn sentinel() -> Self {
        // The sentinel ignores check-ins, so there is nothing to count.
        Link { block: block::sentinel(), kind: PhantomData, phantom: PhantomData }
    }

    /// Take a new claim on `block`.
    ///
    /// # Safety
    ///
    /// `block` must be the sentinel or a live block from [`block::allocate`].
    pub(crate) unsafe fn bind(block: NonNull<dyn ControlBlock<T>>) -> Self {
        let link = Link { block, kind: PhantomData, phantom: PhantomData };
        link.block().check_in(K::CLAIM);
        link
    }

    #[inline]
    pub(crate) fn block(&self) -> &dyn ControlBlock<T> {
        // This is ok because the claim this link holds keeps the block allocated.
        unsafe { self.block.as_ref() }
    }

    pub(crate) fn raw(&self) -> NonNull<dyn ControlBlock<T>> {
        self.block
    }

    /// A claim of another kind on the same block.
    pub(crate) fn relink<K2: ClaimKind>(&self) -> Link<T, K2> {
        unsafe { Link::bind(self.block) }
    }

    pub(crate) fn same_block(&self, other: NonNull<dyn ControlBlock<T>>) -> bool {
        self.block.cast::<u8>() == other.cast::<u8>()
    }

    /// Move this claim onto `block`, releasing the old one.
    ///
    /// The new claim is taken before the old one is released, so rebinding to the block already
    /// held never lets its count touch zero.
    ///
    /// # Safety
    ///
    /// As for [`Link::bind`].
    pub(crate) unsafe fn rebind(&mut self, block: NonNull<dyn ControlBlock<T>>) {
        let old = mem::replace(&mut self.block, block);
        self.block().check_in(K::CLAIM);
        unsafe { Self::release(old) };
    }

    pub(crate) fn reset(&mut self) {
        unsafe { self.rebind(block::sentinel()) }
    }

    pub(crate) fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.block, &mut other.block);
    }

    pub(crate) fn use_count(&self) -> usize {
        self.block().strong_count()
    }

    pub(crate) fn weak_count(&self) -> usize {
        self.block().weak_count()
    }

    pub(crate) fn get(&self) -> Option<NonNull<T>> {
        self.block().get()
    }

    /// Release one claim on `block`, freeing the block if that was the last claim of any kind.
    ///
    /// # Safety
    ///
    /// The caller owned a claim of kind `K` on `block` and gives it up here.
    unsafe fn release(block: NonNull<dyn ControlBlock<T>>) {
        let must_free = unsafe { block.as_ref() }.check_out(K::CLAIM);
        if must_free {
            unsafe { block::free(block) };
        }
    }
}

impl<T: ?Sized, K: ClaimKind> Clone for Link<T, K> {
    fn clone(&self) -> Self {
        unsafe { Link::bind(self.block) }
    }

    fn clone_from(&mut self, source: &Self) {
        if !self.same_block(source.block) {
            unsafe { self.rebind(source.block) }
        }
    }
}

impl<T: ?Sized, K: ClaimKind> Drop for Link<T, K> {
    fn drop(&mut self) {
        unsafe { Self::release(self.block) }
    }
}
