//! In-memory FIFO of names waiting for verification

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Unbounded, thread-safe FIFO with blocking and non-blocking dequeue
#[derive(Debug, Default)]
pub struct NameQueue {
    names: Mutex<VecDeque<String>>,
    available: Notify,
}

impl NameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn names(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A panic while holding the lock cannot leave the deque half-updated
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a name, waking one blocked `dequeue`
    pub fn enqueue(&self, name: impl Into<String>) -> usize {
        let depth = {
            let mut names = self.names();
            names.push_back(name.into());
            names.len()
        };
        self.available.notify_one();
        depth
    }

    /// Pop the oldest name if there is one
    pub fn try_dequeue(&self) -> Option<String> {
        self.names().pop_front()
    }

    /// Wait until a name is available and pop it
    pub async fn dequeue(&self) -> String {
        loop {
            if let Some(name) = self.try_dequeue() {
                return name;
            }
            self.available.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }
}
