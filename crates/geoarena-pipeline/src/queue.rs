use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded blocking FIFO shared between one producer and its consumers.
///
/// `push` parks the caller while the queue holds `max_len` items and
/// wakes as soon as a `pop` makes room; `pop` parks until an item is
/// available or the queue is closed and drained. Both sides sleep on a
/// condition variable, nothing polls.
///
/// Closing is idempotent and wakes every waiter. After `close`, pushes
/// are rejected but the remaining items can still be popped.
pub struct Queue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    max_len: usize,
}

impl<T> Queue<T> {
    /// Create a queue holding at most `max_len` items (at least one).
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            max_len: max_len.max(1),
        }
    }

    /// Append `item`, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Hands `item` back if the queue is closed, including when it gets
    /// closed while this call is waiting.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        while !state.closed && state.items.len() >= self.max_len {
            self.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the oldest item, blocking until one arrives. `None` once the
    /// queue is closed and empty.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Take the oldest item if there is one.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.state.lock().items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Mark the end of data. Returns `true` for the call that actually
    /// closed the queue.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        let first = !state.closed;
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        first
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}
