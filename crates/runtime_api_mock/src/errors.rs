use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use runtime_api_contract::ErrorInfo;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MockRuntimeError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("mock runtime is already running")]
    AlreadyRunning,
    #[error("failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RegistryError {
    #[error("request id already pending: {0}")]
    DuplicateRequest(String),
    #[error("unknown request id: {0}")]
    UnknownRequest(String),
    #[error("request id already resolved: {0}")]
    AlreadyResolved(String),
    #[error("invalid request id: {0:?}")]
    InvalidRequestId(String),
}

#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InvocationError {
    #[error("function error: {0}")]
    FunctionError(ErrorInfo),
    #[error("function failed to start: {0}")]
    StartupFailure(ErrorInfo),
    #[error("mock runtime stopped before the invocation completed")]
    RuntimeStopped,
    #[error("invocation timed out")]
    Timeout,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("registration failed: {0}")]
    Registration(RegistryError),
}

impl InvocationError {
    /// Reported error type and message, verbatim from the function.
    pub fn error_info(&self) -> Option<&ErrorInfo> {
        match self {
            Self::FunctionError(info) | Self::StartupFailure(info) => Some(info),
            _ => None,
        }
    }
}

impl From<RegistryError> for InvocationError {
    fn from(err: RegistryError) -> Self {
        Self::Registration(err)
    }
}

/// Escalated failure of a completion handler.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("malformed error payload{}: {message}", request_suffix(.request_id))]
    MalformedErrorPayload {
        request_id: Option<String>,
        message: String,
    },
}

fn request_suffix(request_id: &Option<String>) -> String {
    match request_id {
        Some(id) => format!(" for request {id}"),
        None => String::new(),
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
