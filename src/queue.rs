//! Keyed single-slot mailbox used to correlate responses with requests.
//!
//! One writer (the receive path) deposits payloads; any number of callers
//! block on their own key until a payload arrives or the deadline passes.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct MessageQueue<K> {
    slots: Mutex<HashMap<K, Vec<u8>>>,
    arrived: Condvar,
}

impl<K: Eq + Hash> Default for MessageQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> MessageQueue<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            arrived: Condvar::new(),
        }
    }

    /// Store `value` under `key`, replacing anything not yet collected, and
    /// wake all waiters.
    pub fn enqueue(&self, key: K, value: Vec<u8>) {
        self.slots.lock().insert(key, value);
        self.arrived.notify_all();
    }

    /// Block until a value for `key` is present or `timeout` elapses.
    ///
    /// The value is removed from the queue; a second wait on the same key
    /// will not see it again. A timeout too large to form a deadline waits
    /// without one.
    pub fn wait_for(&self, key: K, timeout: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut slots = self.slots.lock();
        loop {
            if let Some(value) = slots.remove(&key) {
                return Some(value);
            }
            match deadline {
                Some(deadline) => {
                    if self.arrived.wait_until(&mut slots, deadline).timed_out() {
                        return slots.remove(&key);
                    }
                }
                None => self.arrived.wait(&mut slots),
            }
        }
    }

    /// Drop all uncollected values.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
