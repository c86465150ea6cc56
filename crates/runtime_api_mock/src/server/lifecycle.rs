use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use runtime_api_contract::RUNTIME_API_CONFIG_KEY;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::errors::{InvocationError, MockRuntimeError};

use super::{router, LifecycleState, MockRuntimeInner, ServerHandle, StopReport};

pub(super) async fn start_server(
    inner: &Arc<MockRuntimeInner>,
) -> Result<HashMap<String, String>, MockRuntimeError> {
    let mut server = inner.server.lock().await;
    if server.is_some() {
        return Err(MockRuntimeError::AlreadyRunning);
    }
    inner.config.validate()?;

    let bind_addr = SocketAddr::new(inner.config.host, inner.config.port);
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|err| MockRuntimeError::Bind {
            addr: bind_addr.to_string(),
            message: err.to_string(),
        })?;
    let local_addr = listener.local_addr().map_err(|err| {
        MockRuntimeError::Internal(format!("failed to read bound address: {err}"))
    })?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = router(Arc::clone(inner));
    inner.set_state(LifecycleState::Running);
    let serve_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    inner.local_addr.store(Some(Arc::new(local_addr)));
    server.replace(ServerHandle {
        local_addr,
        shutdown_tx,
        serve_task,
    });
    info!(%local_addr, "mock runtime api listening");

    Ok(HashMap::from([(
        RUNTIME_API_CONFIG_KEY.to_owned(),
        local_addr.to_string(),
    )]))
}

pub(super) async fn stop_server(inner: &Arc<MockRuntimeInner>) -> Result<StopReport, MockRuntimeError> {
    let mut server = inner.server.lock().await;
    let Some(handle) = server.take() else {
        return Ok(StopReport::default());
    };

    inner.set_state(LifecycleState::Draining);
    info!(
        local_addr = %handle.local_addr,
        active_polls = inner.active_polls(),
        "draining mock runtime api"
    );
    // Pollers recheck state every poll_interval; the listener stays up until
    // each of them has written its response.
    while inner.active_polls() > 0 {
        sleep(inner.config.drain_interval).await;
    }

    let _ = handle.shutdown_tx.send(());
    let serve_result = handle.serve_task.await;
    inner.local_addr.store(None);
    inner.set_state(LifecycleState::Stopped);

    let undelivered_request_ids: Vec<String> = inner
        .queue
        .drain()
        .into_iter()
        .map(|item| item.request_id)
        .collect();
    if !undelivered_request_ids.is_empty() {
        inner
            .metrics
            .record_undelivered(undelivered_request_ids.len() as u64);
        warn!(
            count = undelivered_request_ids.len(),
            request_ids = ?undelivered_request_ids,
            "invocations still queued at stop"
        );
    }
    let abandoned_invocations = inner
        .registry
        .fail_all_pending(InvocationError::RuntimeStopped);
    if abandoned_invocations > 0 {
        warn!(count = abandoned_invocations, "pending invocations failed at stop");
    }

    match serve_result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "mock runtime api server exited with error"),
        Err(err) => {
            return Err(MockRuntimeError::Internal(format!(
                "server task failed: {err}"
            )))
        }
    }
    info!(local_addr = %handle.local_addr, "mock runtime api stopped");

    Ok(StopReport {
        undelivered_request_ids,
        abandoned_invocations,
    })
}
