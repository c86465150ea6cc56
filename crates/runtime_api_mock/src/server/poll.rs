use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use runtime_api_contract::{DEADLINE_MS_HEADER, FUNCTION_ARN_HEADER, REQUEST_ID_HEADER};
use tracing::{debug, error};

use crate::queue::InvocationItem;

use super::{now_millis, MockRuntimeInner};

/// Counts one blocked poller for the lifetime of the guard.
/// Dropping the handler future (client disconnect) also releases the count.
struct ActivePollGuard<'a> {
    active: &'a AtomicUsize,
}

impl<'a> ActivePollGuard<'a> {
    fn enter(active: &'a AtomicUsize) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ActivePollGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `GET .../invocation/next`: block until an invocation is queued or the
/// runtime leaves `Running`, rechecking state every `poll_interval`.
pub(super) async fn next_invocation(State(inner): State<Arc<MockRuntimeInner>>) -> Response {
    let _guard = ActivePollGuard::enter(&inner.active_polls);
    inner.startup.mark_started();

    loop {
        if !inner.is_running() {
            inner.metrics.record_unavailable();
            debug!(state = ?inner.state(), "releasing poller: runtime not running");
            return unavailable();
        }
        if let Some(item) = inner.queue.dequeue_timeout(inner.config.poll_interval).await {
            // Drain may have begun while we waited; the item stays undelivered.
            if !inner.is_running() {
                debug!(request_id = %item.request_id, "returning invocation to queue: runtime draining");
                inner.queue.requeue_front(item);
                inner.metrics.record_unavailable();
                return unavailable();
            }
            inner.metrics.record_delivered();
            debug!(request_id = %item.request_id, "delivering invocation");
            return invocation(&inner, item);
        }
    }
}

fn invocation(inner: &MockRuntimeInner, item: InvocationItem) -> Response {
    let deadline_ms = now_millis().saturating_add(
        i64::try_from(inner.config.invocation_deadline.as_millis()).unwrap_or(i64::MAX),
    );
    let built = Response::builder()
        .status(StatusCode::OK)
        .header(REQUEST_ID_HEADER, item.request_id.as_str())
        .header(DEADLINE_MS_HEADER, deadline_ms.to_string())
        .header(FUNCTION_ARN_HEADER, inner.config.function_arn.as_str())
        .body(Body::from(item.payload));
    match built {
        Ok(response) => response,
        Err(err) => {
            error!(request_id = %item.request_id, error = %err, "failed to build invocation response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONNECTION, "close")],
    )
        .into_response()
}
