use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

/// One simulated invocation waiting to be polled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationItem {
    pub request_id: String,
    pub payload: Bytes,
}

impl InvocationItem {
    pub fn new(request_id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            request_id: request_id.into(),
            payload: payload.into(),
        }
    }
}

/// FIFO of pending invocations shared by the test driver and pollers.
#[derive(Default)]
pub struct InvocationQueue {
    items: Mutex<VecDeque<InvocationItem>>,
    available: Notify,
}

impl InvocationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one item and wake one waiting dequeuer.
    /// Allocation: amortized O(1). Complexity: O(1).
    pub fn enqueue(&self, item: InvocationItem) {
        self.lock_items().push_back(item);
        self.available.notify_one();
    }

    /// Pop the oldest item, waiting up to `wait` for one to arrive.
    /// Cancel-safe: an item is only removed on the synchronous pop path.
    pub async fn dequeue_timeout(&self, wait: Duration) -> Option<InvocationItem> {
        let deadline = Instant::now() + wait;
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_dequeue() {
                return Some(item);
            }
            if timeout_at(deadline, notified).await.is_err() {
                // A wakeup racing the deadline may have been consumed by us.
                return self.try_dequeue();
            }
        }
    }

    /// Put an item back at the head so it is the next one dequeued.
    /// Allocation: amortized O(1). Complexity: O(1).
    pub fn requeue_front(&self, item: InvocationItem) {
        self.lock_items().push_front(item);
        self.available.notify_one();
    }

    pub fn try_dequeue(&self) -> Option<InvocationItem> {
        let mut items = self.lock_items();
        let item = items.pop_front();
        if item.is_some() && !items.is_empty() {
            drop(items);
            self.available.notify_one();
        }
        item
    }

    pub fn len(&self) -> usize {
        self.lock_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_items().is_empty()
    }

    /// Remove every queued item in FIFO order.
    pub fn drain(&self) -> Vec<InvocationItem> {
        self.lock_items().drain(..).collect()
    }

    fn lock_items(&self) -> MutexGuard<'_, VecDeque<InvocationItem>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
