use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use runtime_api_contract::ErrorInfo;
use tracing::{debug, error, warn};

use crate::errors::HandlerError;

use super::MockRuntimeInner;

impl MockRuntimeInner {
    /// Resolve `request_id` with a success body. Unknown or already resolved ids
    /// are logged and counted, never escalated.
    pub(crate) fn complete_response(&self, request_id: &str, body: Bytes) {
        match self.registry.resolve_success(request_id, body) {
            Ok(()) => {
                self.metrics.record_response_resolved();
                debug!(request_id = %request_id, "invocation response received");
            }
            Err(err) => {
                self.metrics.record_unmatched_completion();
                warn!(request_id = %request_id, error = %err, "ignoring unmatched invocation response");
            }
        }
    }

    /// Resolve `request_id` with a function error parsed from `body`.
    pub(crate) fn complete_error(&self, request_id: &str, body: &[u8]) -> Result<(), HandlerError> {
        let info = parse_error_info(Some(request_id), body)?;
        match self.registry.resolve_failure(request_id, info) {
            Ok(()) => {
                self.metrics.record_function_error_resolved();
                debug!(request_id = %request_id, "invocation error received");
            }
            Err(err) => {
                self.metrics.record_unmatched_completion();
                warn!(request_id = %request_id, error = %err, "ignoring unmatched invocation error");
            }
        }
        Ok(())
    }

    /// Record a startup failure, mark the runtime started and fail every
    /// pending slot with it. Queued items are discarded: their outcome is
    /// already decided, so no poller should run them.
    pub(crate) fn complete_init_error(&self, body: &[u8]) -> Result<usize, HandlerError> {
        let info = parse_error_info(None, body)?;
        self.metrics.record_init_error();
        self.startup.mark_started();
        let discarded = self.queue.drain();
        let failed = self.registry.broadcast_failure(info.clone());
        if !discarded.is_empty() {
            self.metrics
                .record_discarded_after_init_error(discarded.len() as u64);
        }
        warn!(
            error_type = %info.error_type,
            error_message = %info.error_message,
            failed,
            discarded = discarded.len(),
            "function reported init error"
        );
        Ok(failed)
    }
}

fn parse_error_info(request_id: Option<&str>, body: &[u8]) -> Result<ErrorInfo, HandlerError> {
    ErrorInfo::from_json_slice(body).map_err(|err| {
        error!(request_id = ?request_id, error = %err, "malformed error payload");
        HandlerError::MalformedErrorPayload {
            request_id: request_id.map(ToOwned::to_owned),
            message: err.to_string(),
        }
    })
}

pub(super) async fn invocation_response(
    State(inner): State<Arc<MockRuntimeInner>>,
    Path(request_id): Path<String>,
    body: Bytes,
) -> StatusCode {
    inner.complete_response(&request_id, body);
    StatusCode::OK
}

pub(super) async fn invocation_error(
    State(inner): State<Arc<MockRuntimeInner>>,
    Path(request_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    inner.complete_error(&request_id, &body)?;
    Ok(StatusCode::OK)
}

pub(super) async fn init_error(
    State(inner): State<Arc<MockRuntimeInner>>,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    inner.complete_init_error(&body)?;
    Ok(StatusCode::OK)
}
