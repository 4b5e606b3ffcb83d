//! Write-once, read-once signal between two threads.
//!
//! Used for the stream header and for results of pool tasks. A sender
//! dropped without sending resolves the receiver with [`Disconnected`],
//! so a receiver never waits on a value that cannot arrive.

use std::mem;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// The sender went away without a value, or the value was already taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("sender dropped without sending a value")]
pub struct Disconnected;

enum Slot<T> {
    Empty,
    Full(T),
    Closed,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

#[must_use]
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Empty),
        ready: Condvar::new(),
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

impl<T> Sender<T> {
    /// Deliver the value. Consumes the sender, so a second send cannot
    /// be expressed.
    pub fn send(self, value: T) {
        *self.shared.slot.lock() = Slot::Full(value);
        self.shared.ready.notify_all();
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        if matches!(*slot, Slot::Empty) {
            *slot = Slot::Closed;
            drop(slot);
            self.shared.ready.notify_all();
        }
    }
}

impl<T> Receiver<T> {
    /// Block until the value arrives.
    ///
    /// # Errors
    ///
    /// [`Disconnected`] if the sender was dropped without sending.
    pub fn wait(self) -> Result<T, Disconnected> {
        let mut slot = self.shared.slot.lock();
        loop {
            match mem::replace(&mut *slot, Slot::Closed) {
                Slot::Full(value) => return Ok(value),
                Slot::Closed => return Err(Disconnected),
                Slot::Empty => {
                    *slot = Slot::Empty;
                    self.shared.ready.wait(&mut slot);
                }
            }
        }
    }

    /// Take the value if it has arrived.
    ///
    /// # Errors
    ///
    /// [`Disconnected`] if the sender was dropped without sending, or the
    /// value was already taken by an earlier call.
    pub fn try_wait(&mut self) -> Result<Option<T>, Disconnected> {
        let mut slot = self.shared.slot.lock();
        match mem::replace(&mut *slot, Slot::Closed) {
            Slot::Full(value) => Ok(Some(value)),
            Slot::Closed => Err(Disconnected),
            Slot::Empty => {
                *slot = Slot::Empty;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn value_crosses_threads() {
        let (tx, rx) = channel();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            tx.send(42);
        });
        assert_eq!(rx.wait(), Ok(42));
        handle.join().unwrap();
    }

    #[test]
    fn dropped_sender_disconnects() {
        let (tx, rx) = channel::<u8>();
        drop(tx);
        assert_eq!(rx.wait(), Err(Disconnected));
    }

    #[test]
    fn try_wait_states() {
        let (tx, mut rx) = channel();
        assert_eq!(rx.try_wait(), Ok(None));
        tx.send("header");
        assert_eq!(rx.try_wait(), Ok(Some("header")));
        assert_eq!(rx.try_wait(), Err(Disconnected));
    }
}
