use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::timeout;

/// Set once the function under test has polled or reported an init error.
#[derive(Default)]
pub struct StartupSignal {
    started: AtomicBool,
    notify: Notify,
}

impl StartupSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_started(&self) {
        if !self.started.swap(true, Ordering::AcqRel) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Wait until started; returns false when `limit` elapses first.
    pub async fn wait_started(&self, limit: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.is_started() {
                    return;
                }
                notified.await;
            }
        };
        timeout(limit, wait).await.is_ok()
    }
}
