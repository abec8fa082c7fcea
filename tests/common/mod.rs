#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Counts its own destructions.
#[derive(Debug)]
pub struct Tracked {
    drops: Rc<Cell<usize>>,
    pub var: i32,
    pub field: Cell<i32>,
}

impl Tracked {
    pub fn new(drops: &Rc<Cell<usize>>, var: i32) -> Self {
        Tracked { drops: drops.clone(), var, field: Cell::new(0) }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

pub fn counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}
