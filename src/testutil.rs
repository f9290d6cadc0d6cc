//! Shared helpers for the unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::fabric::{Connector, Listener};

/// Connector that stores everything published through it.
pub struct CaptureConnector<V> {
    seen: Rc<RefCell<Vec<V>>>,
}

impl<V> CaptureConnector<V> {
    pub fn new() -> (Self, Rc<RefCell<Vec<V>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                seen: Rc::clone(&seen),
            },
            seen,
        )
    }
}

impl<V: Clone> Connector<V> for CaptureConnector<V> {
    fn publish(&mut self, data: &V) -> anyhow::Result<()> {
        self.seen.borrow_mut().push(data.clone());
        Ok(())
    }
}

/// Listener that stores everything it is notified with.
pub struct CaptureListener<V> {
    seen: Rc<RefCell<Vec<V>>>,
}

impl<V> CaptureListener<V> {
    pub fn new() -> (Rc<RefCell<Self>>, Rc<RefCell<Vec<V>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        (
            Rc::new(RefCell::new(Self {
                seen: Rc::clone(&seen),
            })),
            seen,
        )
    }
}

impl<V: Clone> Listener<V> for CaptureListener<V> {
    fn on_add(&mut self, data: &V) {
        self.seen.borrow_mut().push(data.clone());
    }
}
