use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use runtime_api_contract::RuntimeApiPaths;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::client::RuntimeClient;
use crate::config::MockRuntimeConfig;
use crate::errors::MockRuntimeError;
use crate::metrics::{MockRuntimeMetrics, MockRuntimeMetricsSnapshot};
use crate::queue::InvocationQueue;
use crate::registry::PendingRegistry;
use crate::startup::StartupSignal;

mod completion;
mod lifecycle;
mod poll;

use lifecycle::{start_server, stop_server};

/// Largest request body accepted on the completion endpoints.
pub const MAX_PAYLOAD_BYTES: usize = 6 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Running,
    Draining,
}

impl LifecycleState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Running => 1,
            Self::Draining => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// What `stop()` found left over once the listener was released.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Items still queued when the runtime reached `Stopped`.
    pub undelivered_request_ids: Vec<String>,
    /// Unresolved slots failed with `InvocationError::RuntimeStopped`.
    pub abandoned_invocations: usize,
}

impl StopReport {
    pub fn is_clean(&self) -> bool {
        self.undelivered_request_ids.is_empty() && self.abandoned_invocations == 0
    }
}

struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    serve_task: JoinHandle<std::io::Result<()>>,
}

pub(crate) struct MockRuntimeInner {
    pub(crate) config: MockRuntimeConfig,
    pub(crate) paths: RuntimeApiPaths,
    pub(crate) queue: InvocationQueue,
    pub(crate) registry: Arc<PendingRegistry>,
    pub(crate) startup: StartupSignal,
    pub(crate) metrics: MockRuntimeMetrics,
    lifecycle: AtomicU8,
    active_polls: AtomicUsize,
    local_addr: ArcSwapOption<SocketAddr>,
    server: Mutex<Option<ServerHandle>>,
}

impl MockRuntimeInner {
    pub(crate) fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.lifecycle.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: LifecycleState) {
        self.lifecycle.store(state.as_u8(), Ordering::SeqCst);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    pub(crate) fn active_polls(&self) -> usize {
        self.active_polls.load(Ordering::SeqCst)
    }
}

/// In-process Lambda runtime API.
///
/// Test code queues invocations through [`RuntimeClient`]; the function under
/// test long-polls `GET .../invocation/next` and posts results back. `stop()`
/// releases blocked pollers with 503 and returns only once none remain.
#[derive(Clone)]
pub struct MockRuntime {
    inner: Arc<MockRuntimeInner>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new(MockRuntimeConfig::default())
    }
}

impl MockRuntime {
    pub fn new(config: MockRuntimeConfig) -> Self {
        let paths = RuntimeApiPaths::new(&config.api_version);
        Self {
            inner: Arc::new(MockRuntimeInner {
                config,
                paths,
                queue: InvocationQueue::new(),
                registry: Arc::new(PendingRegistry::new()),
                startup: StartupSignal::new(),
                metrics: MockRuntimeMetrics::new(),
                lifecycle: AtomicU8::new(LifecycleState::Stopped.as_u8()),
                active_polls: AtomicUsize::new(0),
                local_addr: ArcSwapOption::new(None),
                server: Mutex::new(None),
            }),
        }
    }

    /// Bind the listener and begin serving.
    /// Returns the `AWS_LAMBDA_RUNTIME_API` key mapped to the bound `host:port`.
    pub async fn start(&self) -> Result<HashMap<String, String>, MockRuntimeError> {
        start_server(&self.inner).await
    }

    /// Drain pollers, release the listener and fail leftover work.
    /// Calling this on a stopped runtime is a no-op.
    pub async fn stop(&self) -> Result<StopReport, MockRuntimeError> {
        stop_server(&self.inner).await
    }

    pub fn client(&self) -> RuntimeClient {
        RuntimeClient::new(Arc::clone(&self.inner))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr.load_full().map(|addr| *addr)
    }

    /// Base URL of the bound listener, e.g. `http://127.0.0.1:5387`.
    pub fn base_url(&self) -> Option<String> {
        self.local_addr().map(|addr| format!("http://{addr}"))
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state()
    }

    pub fn active_polls(&self) -> usize {
        self.inner.active_polls()
    }

    pub fn config(&self) -> &MockRuntimeConfig {
        &self.inner.config
    }

    pub fn paths(&self) -> &RuntimeApiPaths {
        &self.inner.paths
    }

    pub fn metrics_snapshot(&self) -> MockRuntimeMetricsSnapshot {
        self.inner
            .metrics
            .snapshot(self.inner.active_polls() as u64)
    }
}

/// Routing table for the four runtime API endpoints.
fn router(inner: Arc<MockRuntimeInner>) -> Router {
    let paths = &inner.paths;
    Router::new()
        .route(&paths.next(), get(poll::next_invocation))
        .route(
            &paths.response_template("request_id"),
            post(completion::invocation_response),
        )
        .route(
            &paths.error_template("request_id"),
            post(completion::invocation_error),
        )
        .route(&paths.init_error(), post(completion::init_error))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .with_state(Arc::clone(&inner))
}

fn now_millis() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}
