use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use runtime_api_contract::ErrorInfo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{InvocationError, RegistryError};
use crate::queue::InvocationItem;
use crate::registry::PendingInvocation;
use crate::server::MockRuntimeInner;

/// Test-driver side of the mock runtime: queue invocations, await results.
#[derive(Clone)]
pub struct RuntimeClient {
    inner: Arc<MockRuntimeInner>,
}

impl RuntimeClient {
    pub(crate) fn new(inner: Arc<MockRuntimeInner>) -> Self {
        Self { inner }
    }

    /// Register a result slot for `request_id` and queue its payload.
    ///
    /// After a startup failure the returned handle is already failed and
    /// nothing is queued, since no poller will ever pick the item up.
    pub fn enqueue(
        &self,
        request_id: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<PendingInvocation, RegistryError> {
        let request_id = request_id.into();
        validate_request_id(&request_id)?;

        let pending = self.inner.registry.register(request_id.clone())?;
        if pending.failed_at_registration() {
            debug!(request_id = %request_id, "startup failure stored; not queueing invocation");
            return Ok(pending);
        }

        self.inner.metrics.record_enqueued();
        self.inner
            .queue
            .enqueue(InvocationItem::new(request_id, payload));
        Ok(pending)
    }

    /// Queue `payload` under a fresh request id and wait for its result.
    pub async fn invoke(&self, payload: impl Into<Bytes>) -> Result<Bytes, InvocationError> {
        let request_id = Uuid::new_v4().to_string();
        self.enqueue(request_id, payload)?.wait().await
    }

    /// JSON form of [`RuntimeClient::invoke`].
    pub async fn invoke_json<P, R>(&self, payload: &P) -> Result<R, InvocationError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(payload).map_err(|err| {
            InvocationError::InvalidPayload(format!("failed to serialize invocation payload: {err}"))
        })?;
        let result = self.invoke(body).await?;
        serde_json::from_slice(&result).map_err(|err| {
            InvocationError::InvalidPayload(format!("failed to deserialize invocation result: {err}"))
        })
    }

    /// True once the function has polled or reported an init error.
    pub fn is_started(&self) -> bool {
        self.inner.startup.is_started()
    }

    pub async fn wait_started(&self, limit: Duration) -> bool {
        self.inner.startup.wait_started(limit).await
    }

    pub fn startup_failure(&self) -> Option<ErrorInfo> {
        self.inner.registry.startup_failure()
    }

    pub fn queued_len(&self) -> usize {
        self.inner.queue.len()
    }
}

/// Request ids travel in a URL path segment and a header value.
fn validate_request_id(request_id: &str) -> Result<(), RegistryError> {
    let valid = !request_id.is_empty()
        && request_id
            .bytes()
            .all(|b| b.is_ascii_graphic() && !matches!(b, b'/' | b'?' | b'#' | b'%'));
    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidRequestId(request_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_must_be_path_and_header_safe() {
        for ok in ["r1", "8f14e45f-ceea-467f-a0b8-4d1b3c7e6f21", "a.b_c~d"] {
            assert!(validate_request_id(ok).is_ok(), "{ok} should be accepted");
        }
        for bad in ["", "a/b", "with space", "q?x", "frag#", "pct%20", "tab\t"] {
            assert_eq!(
                validate_request_id(bad),
                Err(RegistryError::InvalidRequestId(bad.to_owned()))
            );
        }
    }
}
