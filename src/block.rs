//! Control blocks: the heap records that own a pointee and count the handles referring to it.

use alloc::boxed::Box;
use core::cell::{Cell, UnsafeCell};
use core::mem::{self, MaybeUninit};
use core::ptr::{self, NonNull};

use log::trace;

use crate::deleter::Deleter;

/// Which count a handle holds a claim on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    Strong,
    Weak,
}

pub(crate) struct Counts {
    strong: Cell<usize>,
    weak: Cell<usize>,
    /// Set while the pointee's destructor runs.
    destroying: Cell<bool>,
}

impl Counts {
    fn new() -> Self {
        Counts { strong: Cell::new(0), weak: Cell::new(0), destroying: Cell::new(false) }
    }

    fn cell(&self, claim: Claim) -> &Cell<usize> {
        match claim {
            Claim::Strong => &self.strong,
            Claim::Weak => &self.weak,
        }
    }
}

/// A type-erased control block.
///
/// # Safety
///
/// `get` must keep returning the pointer that `destroy` tears down, and `destroy` must leave the
/// block in a state where dropping it frees nothing the pointee owned. Blocks that report counts
/// must have been produced by [`allocate`].
pub(crate) unsafe trait ControlBlock<T: ?Sized> {
    /// The counts of this block, `None` for the sentinel.
    fn counts(&self) -> Option<&Counts>;

    /// The pointee, `None` for the sentinel.
    fn get(&self) -> Option<NonNull<T>>;

    /// Destroy the pointee.
    ///
    /// # Safety
    ///
    /// Called at most once, by the release of the last strong claim.
    unsafe fn destroy(&self);

    fn kind(&self) -> &'static str;

    fn strong_count(&self) -> usize {
        self.counts().map_or(0, |counts| counts.strong.get())
    }

    fn weak_count(&self) -> usize {
        self.counts().map_or(0, |counts| counts.weak.get())
    }

    /// Whether the pointee is gone or being torn down. The sentinel never expires.
    fn expired(&self) -> bool {
        self.counts().is_some_and(|counts| counts.strong.get() == 0 || counts.destroying.get())
    }

    fn check_in(&self, claim: Claim) {
        let Some(counts) = self.counts() else { return };
        let cell = counts.cell(claim);
        let count = cell.get();

        // A strong claim is only ever taken next to an existing one or on a fresh block, so a
        // zero here while weak claims exist means a handle was promoted after expiry.
        if count == usize::MAX || (claim == Claim::Strong && count == 0 && counts.weak.get() > 0) {
            panic!("control block count corrupted on check-in");
        }
        cell.set(count + 1);
    }

    /// Release one claim. Returns whether the block itself must now be freed.
    ///
    /// The last strong release destroys the pointee while the strong count still reads 1, so
    /// anything the pointee's destructor releases on this same block observes a live block.
    /// The block reports itself expired for the duration, so nothing can be promoted from it
    /// while its pointee is half torn down.
    fn check_out(&self, claim: Claim) -> bool {
        let Some(counts) = self.counts() else { return false };
        let cell = counts.cell(claim);
        debug_assert!(cell.get() > 0, "released a claim that was never taken");

        if claim == Claim::Strong && cell.get() == 1 {
            trace!("destroying pointee of {} block", self.kind());
            counts.destroying.set(true);
            unsafe { self.destroy() };
            counts.destroying.set(false);
        }
        // Re-read: the destructor may have released claims of its own on this block.
        cell.set(cell.get() - 1);

        counts.strong.get() == 0 && counts.weak.get() == 0
    }
}

/// Owns a separately allocated pointee together with the strategy that destroys it.
pub(crate) struct DeleterBlock<T: ?Sized, D> {
    counts: Counts,
    ptr: NonNull<T>,
    deleter: Cell<Option<D>>,
}

impl<T: ?Sized, D: Deleter<T>> DeleterBlock<T, D> {
    pub(crate) fn new(ptr: NonNull<T>, deleter: D) -> Self {
        DeleterBlock { counts: Counts::new(), ptr, deleter: Cell::new(Some(deleter)) }
    }
}

unsafe impl<T: ?Sized, D: Deleter<T>> ControlBlock<T> for DeleterBlock<T, D> {
    fn counts(&self) -> Option<&Counts> {
        Some(&self.counts)
    }

    fn get(&self) -> Option<NonNull<T>> {
        Some(self.ptr)
    }

    unsafe fn destroy(&self) {
        if let Some(mut deleter) = self.deleter.take() {
            unsafe { deleter.delete(self.ptr) };
        }
    }

    fn kind(&self) -> &'static str {
        "deleter"
    }
}

/// Stores the pointee inline, so block and pointee share one allocation.
pub(crate) struct InPlaceBlock<T> {
    counts: Counts,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> InPlaceBlock<T> {
    pub(crate) fn new(value: T) -> Self {
        InPlaceBlock { counts: Counts::new(), value: UnsafeCell::new(MaybeUninit::new(value)) }
    }
}

unsafe impl<T> ControlBlock<T> for InPlaceBlock<T> {
    fn counts(&self) -> Option<&Counts> {
        Some(&self.counts)
    }

    fn get(&self) -> Option<NonNull<T>> {
        NonNull::new(self.value.get().cast::<T>())
    }

    unsafe fn destroy(&self) {
        // `MaybeUninit` never drops its contents, so freeing the block afterwards is fine.
        unsafe { ptr::drop_in_place(self.value.get().cast::<T>()) };
    }

    fn kind(&self) -> &'static str {
        "in-place"
    }
}

/// The block every empty handle points at. It has no counts, so it is never freed.
pub(crate) struct Sentinel;

static SENTINEL: Sentinel = Sentinel;

unsafe impl<T: ?Sized> ControlBlock<T> for Sentinel {
    fn counts(&self) -> Option<&Counts> {
        None
    }

    fn get(&self) -> Option<NonNull<T>> {
        None
    }

    unsafe fn destroy(&self) {}

    fn kind(&self) -> &'static str {
        "sentinel"
    }
}

/// The process-wide sentinel, viewed as a block for `T`.
pub(crate) fn sentinel<T: ?Sized>() -> NonNull<dyn ControlBlock<T>> {
    let block: NonNull<Sentinel> = NonNull::from(&SENTINEL);
    block
}

/// Move a fresh block to the heap. Its counts start at zero; the first handle checks in.
///
/// The returned pointer carries a `'static` object bound whatever `B` borrows. Every handle to
/// the block is typed by `T`, so borrows reachable through `T` cannot outlive the handles.
///
/// # Safety
///
/// Apart from borrows through `T`, `block` must not borrow anything shorter than `'static`.
pub(crate) unsafe fn allocate<'a, T, B>(block: B) -> NonNull<dyn ControlBlock<T>>
where
    T: ?Sized + 'a,
    B: ControlBlock<T> + 'a,
{
    trace!("allocating {} block", block.kind());
    let block: Box<dyn ControlBlock<T> + 'a> = Box::new(block);
    let block: *mut (dyn ControlBlock<T> + 'a) = Box::into_raw(block);
    unsafe {
        let block = mem::transmute::<*mut (dyn ControlBlock<T> + 'a), *mut dyn ControlBlock<T>>(block);
        NonNull::new_unchecked(block)
    }
}

/// Free a block whose counts both reached zero.
///
/// # Safety
///
/// `block` came from [`allocate`], and no handle refers to it any more.
pub(crate) unsafe fn free<T: ?Sized>(block: NonNull<dyn ControlBlock<T>>) {
    let block = unsafe { Box::from_raw(block.as_ptr()) };
    trace!("freeing {} block", block.kind());
    drop(block);
}
