use std::fmt;

use serde::{Deserialize, Serialize};

pub const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
pub const DEADLINE_MS_HEADER: &str = "Lambda-Runtime-Deadline-Ms";
pub const FUNCTION_ARN_HEADER: &str = "Lambda-Runtime-Invoked-Function-Arn";

pub const DEFAULT_API_VERSION: &str = "2018-06-01";
pub const DEFAULT_PORT: u16 = 5387;

/// Key under which a started runtime publishes its `host:port`.
pub const RUNTIME_API_CONFIG_KEY: &str = "AWS_LAMBDA_RUNTIME_API";

/// Failure reported by a function, either for one invocation or for startup.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub error_type: String,
    pub error_message: String,
}

impl ErrorInfo {
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }

    /// Parse an error body as posted to the error endpoints.
    /// Unknown fields such as `stackTrace` are ignored.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.error_message)
    }
}

/// Runtime API paths for one API version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeApiPaths {
    base: String,
}

impl Default for RuntimeApiPaths {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSION)
    }
}

impl RuntimeApiPaths {
    pub fn new(api_version: &str) -> Self {
        Self {
            base: format!("/{api_version}/runtime"),
        }
    }

    pub fn next(&self) -> String {
        format!("{}/invocation/next", self.base)
    }

    pub fn response(&self, request_id: &str) -> String {
        format!("{}/invocation/{request_id}/response", self.base)
    }

    pub fn error(&self, request_id: &str) -> String {
        format!("{}/invocation/{request_id}/error", self.base)
    }

    pub fn init_error(&self) -> String {
        format!("{}/init/error", self.base)
    }

    /// Router template for the response path; `param` names the id capture.
    pub fn response_template(&self, param: &str) -> String {
        self.response(&format!(":{param}"))
    }

    /// Router template for the per-invocation error path.
    pub fn error_template(&self, param: &str) -> String {
        self.error(&format!(":{param}"))
    }
}

#[cfg(test)]
mod tests;
