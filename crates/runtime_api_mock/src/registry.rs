use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use runtime_api_contract::ErrorInfo;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::errors::{InvocationError, RegistryError};

pub type InvocationOutcome = Result<Bytes, InvocationError>;

enum SlotState {
    Pending(oneshot::Sender<InvocationOutcome>),
    Resolved,
}

struct Slot {
    token: u64,
    state: SlotState,
}

#[derive(Default)]
struct RegistryState {
    slots: HashMap<String, Slot>,
    startup_failure: Option<ErrorInfo>,
}

/// One-shot result slots keyed by request id.
///
/// Slots live until the `PendingInvocation` that owns them is consumed or
/// dropped. A stored startup failure fails every later registration.
#[derive(Default)]
pub struct PendingRegistry {
    state: Mutex<RegistryState>,
    next_token: AtomicU64,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh unresolved slot for `request_id`.
    /// Fails when the id already has an unresolved slot.
    pub fn register(
        self: &Arc<Self>,
        request_id: impl Into<String>,
    ) -> Result<PendingInvocation, RegistryError> {
        let request_id = request_id.into();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        let mut state = self.lock_state();
        if let Some(Slot {
            state: SlotState::Pending(_),
            ..
        }) = state.slots.get(&request_id)
        {
            return Err(RegistryError::DuplicateRequest(request_id));
        }

        let failed_at_registration = match state.startup_failure.clone() {
            Some(info) => {
                let _ = tx.send(Err(InvocationError::StartupFailure(info)));
                state.slots.insert(
                    request_id.clone(),
                    Slot {
                        token,
                        state: SlotState::Resolved,
                    },
                );
                true
            }
            None => {
                state.slots.insert(
                    request_id.clone(),
                    Slot {
                        token,
                        state: SlotState::Pending(tx),
                    },
                );
                false
            }
        };
        drop(state);

        Ok(PendingInvocation {
            request_id,
            token,
            rx: Some(rx),
            registry: Arc::clone(self),
            failed_at_registration,
        })
    }

    pub fn resolve_success(&self, request_id: &str, body: Bytes) -> Result<(), RegistryError> {
        self.resolve(request_id, Ok(body))
    }

    pub fn resolve_failure(&self, request_id: &str, info: ErrorInfo) -> Result<(), RegistryError> {
        self.resolve(request_id, Err(InvocationError::FunctionError(info)))
    }

    /// Store `info` as the startup failure and fail every unresolved slot with it.
    /// Returns how many slots were resolved. The stored failure is last-write-wins.
    /// Complexity: O(n), n = live slot count.
    pub fn broadcast_failure(&self, info: ErrorInfo) -> usize {
        let mut state = self.lock_state();
        state.startup_failure = Some(info.clone());
        let mut resolved = 0;
        for slot in state.slots.values_mut() {
            if let SlotState::Pending(tx) = std::mem::replace(&mut slot.state, SlotState::Resolved)
            {
                if tx
                    .send(Err(InvocationError::StartupFailure(info.clone())))
                    .is_ok()
                {
                    resolved += 1;
                }
            }
        }
        resolved
    }

    /// Fail every unresolved slot with `err`; used when the runtime stops.
    pub fn fail_all_pending(&self, err: InvocationError) -> usize {
        let mut state = self.lock_state();
        let mut resolved = 0;
        for slot in state.slots.values_mut() {
            if let SlotState::Pending(tx) = std::mem::replace(&mut slot.state, SlotState::Resolved)
            {
                if tx.send(Err(err.clone())).is_ok() {
                    resolved += 1;
                }
            }
        }
        resolved
    }

    pub fn startup_failure(&self) -> Option<ErrorInfo> {
        self.lock_state().startup_failure.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.lock_state()
            .slots
            .values()
            .filter(|slot| matches!(slot.state, SlotState::Pending(_)))
            .count()
    }

    fn resolve(&self, request_id: &str, outcome: InvocationOutcome) -> Result<(), RegistryError> {
        let mut state = self.lock_state();
        let Some(slot) = state.slots.get_mut(request_id) else {
            return Err(RegistryError::UnknownRequest(request_id.to_owned()));
        };
        match std::mem::replace(&mut slot.state, SlotState::Resolved) {
            SlotState::Pending(tx) => tx
                .send(outcome)
                .map_err(|_| RegistryError::UnknownRequest(request_id.to_owned())),
            SlotState::Resolved => Err(RegistryError::AlreadyResolved(request_id.to_owned())),
        }
    }

    fn remove_slot(&self, request_id: &str, token: u64) {
        let mut state = self.lock_state();
        if state
            .slots
            .get(request_id)
            .is_some_and(|slot| slot.token == token)
        {
            state.slots.remove(request_id);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Handle to one registered slot. Dropping it removes the slot.
pub struct PendingInvocation {
    request_id: String,
    token: u64,
    rx: Option<oneshot::Receiver<InvocationOutcome>>,
    registry: Arc<PendingRegistry>,
    failed_at_registration: bool,
}

impl std::fmt::Debug for PendingInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingInvocation")
            .field("request_id", &self.request_id)
            .field("failed_at_registration", &self.failed_at_registration)
            .finish()
    }
}

impl PendingInvocation {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// True when a stored startup failure resolved the slot on registration.
    pub fn failed_at_registration(&self) -> bool {
        self.failed_at_registration
    }

    /// Wait for the slot to resolve.
    pub async fn wait(mut self) -> InvocationOutcome {
        let Some(rx) = self.rx.take() else {
            return Err(InvocationError::RuntimeStopped);
        };
        rx.await.unwrap_or(Err(InvocationError::RuntimeStopped))
    }

    /// Wait for the slot to resolve, giving up after `limit`.
    pub async fn wait_timeout(self, limit: Duration) -> InvocationOutcome {
        match timeout(limit, self.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(InvocationError::Timeout),
        }
    }
}

impl Drop for PendingInvocation {
    fn drop(&mut self) {
        self.registry.remove_slot(&self.request_id, self.token);
    }
}

#[cfg(test)]
mod tests;
