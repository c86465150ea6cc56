pub mod client;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod queue;
pub mod registry;
pub mod server;
pub mod startup;

pub use client::RuntimeClient;
pub use config::{MockRuntimeConfig, DEFAULT_FUNCTION_ARN, PORT_ENV};
pub use errors::{HandlerError, InvocationError, MockRuntimeError, RegistryError};
pub use metrics::MockRuntimeMetricsSnapshot;
pub use queue::{InvocationItem, InvocationQueue};
pub use registry::{InvocationOutcome, PendingInvocation, PendingRegistry};
pub use runtime_api_contract::{
    ErrorInfo, RuntimeApiPaths, DEADLINE_MS_HEADER, DEFAULT_API_VERSION, DEFAULT_PORT,
    FUNCTION_ARN_HEADER, REQUEST_ID_HEADER, RUNTIME_API_CONFIG_KEY,
};
pub use server::{LifecycleState, MockRuntime, StopReport, MAX_PAYLOAD_BYTES};
pub use startup::StartupSignal;
