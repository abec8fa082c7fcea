mod common;

use std::cell::Cell;
use std::collections::HashSet;
use std::ptr::NonNull;
use std::rc::Rc;

use common::{counter, init_logging, Tracked};
use counted_ptr::{ReferenceCounted, Shared};

#[test]
fn empty_handles_do_not_allocate_or_own() {
    init_logging();
    let a: Shared<i32> = Shared::empty();
    let b: Shared<i32> = Shared::default();
    let c: Shared<i32> = unsafe { Shared::from_raw(std::ptr::null_mut()) };

    for handle in [&a, &b, &c] {
        assert!(Shared::is_empty(handle));
        assert!(Shared::get(handle).is_none());
        assert_eq!(Shared::use_count(handle), 0);
    }
    assert!(Shared::ptr_eq(&a, &c));
    assert_eq!(a, b);
}

#[test]
fn in_place_allocation_and_take() {
    init_logging();
    let drops = counter();

    {
        let mut sp = Shared::new(Tracked::new(&drops, 2));
        assert_eq!(sp.var, 2);
        assert_eq!(Shared::use_count(&sp), 1);

        let sp1 = Shared::take(&mut sp);
        assert_eq!(Shared::use_count(&sp1), 1);
        assert!(Shared::is_empty(&sp));
        assert_eq!(sp1.var, 2);
    }

    assert_eq!(drops.get(), 1);
}

#[test]
fn from_box_gives_field_access() {
    let drops = counter();

    {
        let sp = Shared::from_box(Box::new(Tracked::new(&drops, 3)));
        assert_eq!(Shared::use_count(&sp), 1);
        assert_eq!(Shared::get(&sp).map(|t| t.var), Some(3));

        sp.field.set(7);
        assert_eq!((*sp).field.get(), 7);
    }

    assert_eq!(drops.get(), 1);
}

#[test]
fn swap_then_copy_assign() {
    let drops = counter();

    {
        let mut sp = Shared::new(Tracked::new(&drops, 3));
        let mut sp1 = Shared::new(Tracked::new(&drops, 2));

        Shared::swap(&mut sp, &mut sp1);
        assert_eq!(sp1.var, 3);

        sp = sp1.clone();
        assert_eq!(drops.get(), 1);
        assert_eq!(Shared::use_count(&sp), 2);
    }

    assert_eq!(drops.get(), 2);
}

#[test]
fn reset_and_address_ordering() {
    let drops = counter();

    let mut sp = Shared::new(Tracked::new(&drops, 3));
    let mut sp1 = Shared::new(Tracked::new(&drops, 2));

    Shared::reset(&mut sp);
    assert_eq!(drops.get(), 1);

    assert!(!(sp >= sp1));
    assert!(sp <= sp1);
    assert!(sp < sp1);
    assert!(!(sp > sp1));
    assert!(sp != sp1);

    let sp2 = sp1.clone();
    assert_eq!(Shared::use_count(&sp2), 2);
    assert_eq!(sp2, sp1);

    Shared::reset(&mut sp1);
    assert_eq!(Shared::use_count(&sp2), 1);
    assert_eq!(drops.get(), 1);
    assert!(Shared::is_empty(&sp1) && Shared::is_empty(&sp));
}

#[test]
fn reset_with_raw_pointer() {
    let drops = counter();

    {
        let mut sp = Shared::new(Tracked::new(&drops, 4));
        let mut sp2 = Shared::take(&mut sp);
        assert_eq!(Shared::use_count(&sp2), 1);
        assert!(Shared::as_ptr(&sp).is_none());

        let raw = Box::into_raw(Box::new(Tracked::new(&drops, 228)));
        unsafe { Shared::reset_with(&mut sp2, raw, counted_ptr::DefaultDelete) };
        assert_eq!(drops.get(), 1);
        assert_eq!(sp2.var, 228);

        Shared::reset(&mut sp2);
        assert_eq!(drops.get(), 2);
    }

    assert_eq!(drops.get(), 2);
}

#[test]
fn custom_deleter_runs_exactly_once() {
    let drops = counter();
    let deletions = Rc::new(Cell::new(0));
    let seen = deletions.clone();

    let raw = Box::into_raw(Box::new(Tracked::new(&drops, 1)));
    let sp = unsafe {
        Shared::from_raw_with(raw, move |ptr: NonNull<Tracked>| {
            seen.set(seen.get() + 1);
            drop(Box::from_raw(ptr.as_ptr()));
        })
    };
    let sp1 = sp.clone();
    let weak = Shared::downgrade(&sp);

    drop(sp);
    assert_eq!(deletions.get(), 0);
    drop(sp1);
    assert_eq!(deletions.get(), 1);
    assert_eq!(drops.get(), 1);

    drop(weak);
    assert_eq!(deletions.get(), 1);
}

#[test]
fn self_assignment_keeps_the_pointee() {
    let drops = counter();
    let mut sp = Shared::new(Tracked::new(&drops, 9));

    let same = sp.clone();
    sp.clone_from(&same);
    drop(same);
    assert_eq!(Shared::use_count(&sp), 1);

    sp = sp.clone();
    assert_eq!(Shared::use_count(&sp), 1);
    assert_eq!(drops.get(), 0);
}

#[test]
fn clone_from_releases_the_previous_pointee() {
    let drops = counter();
    let mut a = Shared::new(Tracked::new(&drops, 1));
    let b = Shared::new(Tracked::new(&drops, 2));

    a.clone_from(&b);
    assert_eq!(drops.get(), 1);
    assert_eq!(a.var, 2);
    assert_eq!(Shared::use_count(&b), 2);
}

#[test]
fn get_mut_requires_sole_ownership() {
    let mut sp = Shared::new(5);
    *Shared::get_mut(&mut sp).unwrap() += 1;
    assert_eq!(*sp, 6);

    let other = sp.clone();
    assert!(Shared::get_mut(&mut sp).is_none());
    drop(other);

    let weak = Shared::downgrade(&sp);
    assert!(Shared::get_mut(&mut sp).is_none());
    drop(weak);
    assert!(Shared::get_mut(&mut sp).is_some());
}

#[test]
fn equality_is_address_identity() {
    let a = Shared::new(1);
    let b = Shared::new(1);
    let a2 = a.clone();

    assert_ne!(a, b);
    assert_eq!(a, a2);

    let set: HashSet<Shared<i32>> = [a.clone(), a2, b.clone()].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn unsized_pointees_through_boxes() {
    let sp: Shared<str> = Shared::from_box(Box::from("unsized"));
    let sp1 = sp.clone();
    assert_eq!(&*sp1, "unsized");
    assert_eq!(format!("{}", sp), "unsized");

    let slice: Shared<[u8]> = Shared::from(vec![1u8, 2, 3].into_boxed_slice());
    assert_eq!(slice.len(), 3);
}

#[test]
fn formatting_empty_and_full() {
    let empty: Shared<i32> = Shared::empty();
    assert_eq!(format!("{:?}", empty), "(empty)");
    assert_eq!(format!("{}", Shared::new(4)), "4");
    assert_eq!(format!("{:?}", Shared::<String>::from(String::from("x"))), "\"x\"");
}

#[test]
#[should_panic(expected = "dereferenced an empty `Shared`")]
fn deref_of_empty_panics() {
    let empty: Shared<i32> = Shared::empty();
    let _value: i32 = *empty;
}

fn count_via_trait<P: ReferenceCounted<i32>>(pointer: &P) -> usize {
    P::reference_count(pointer)
}

#[test]
fn reference_counted_trait_reports_use_count() {
    let sp = Shared::new(3);
    let _sp1 = sp.clone();
    assert_eq!(count_via_trait(&sp), 2);
    assert_eq!(count_via_trait(&Shared::<i32>::empty()), 0);
}

#[test]
fn vector_of_handles() {
    let drops = counter();

    {
        let a: Vec<Shared<Tracked>> =
            (0..10).map(|i| Shared::new(Tracked::new(&drops, i))).collect();
        let b = a.clone();
        assert!(a.iter().all(|sp| Shared::use_count(sp) == 2));
        drop(a);
        assert_eq!(drops.get(), 0);
        assert!(b.iter().all(|sp| Shared::use_count(sp) == 1));
    }

    assert_eq!(drops.get(), 10);
}

#[test]
fn pointees_may_borrow_from_the_stack() {
    let drops = counter();
    let local = Tracked::new(&drops, 11);

    {
        let sp = Shared::new(&local);
        let sp1 = sp.clone();
        assert_eq!(sp1.var, 11);

        let boxed: Shared<&Tracked> = Shared::from_box(Box::new(&local));
        let weak = Shared::downgrade(&boxed);
        assert_eq!(weak.lock().var, 11);
        assert_eq!(Shared::use_count(&sp), 2);
    }

    assert_eq!(drops.get(), 0);
    drop(local);
    assert_eq!(drops.get(), 1);
}
