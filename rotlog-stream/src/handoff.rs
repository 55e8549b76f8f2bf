//! Single-slot blocking handoff between one producer and one consumer.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct Slot<T> {
    item: Option<T>,
    closed: bool,
}

/// Holds at most one item in flight.
///
/// Closing the handoff wakes both sides. A producer waiting for space gets
/// its item back as abandoned; an item already in the slot is still
/// delivered to the consumer before `take` starts returning `None`.
#[derive(Debug)]
pub struct Handoff<T> {
    slot: Mutex<Slot<T>>,
    changed: Condvar,
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                item: None,
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place an item once the slot is free.
    ///
    /// Returns `false` if the handoff closed first; the item is dropped.
    pub fn put(&self, item: T) -> bool {
        let mut slot = self.lock();
        while slot.item.is_some() && !slot.closed {
            slot = self
                .changed
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if slot.closed {
            return false;
        }
        slot.item = Some(item);
        self.changed.notify_all();
        true
    }

    /// Wait for the next item, or `None` once closed and drained.
    pub fn take(&self) -> Option<T> {
        let mut slot = self.lock();
        loop {
            if let Some(item) = slot.item.take() {
                self.changed.notify_all();
                return Some(item);
            }
            if slot.closed {
                return None;
            }
            slot = self
                .changed
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Disable further puts and wake every waiter.
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
