use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use runtime_api_contract::{DEFAULT_API_VERSION, DEFAULT_PORT};

use crate::errors::MockRuntimeError;

pub const PORT_ENV: &str = "LAMBDA_MOCK_RUNTIME_PORT";
pub const DEFAULT_FUNCTION_ARN: &str = "arn:aws:lambda:us-east-1:000000000000:function:mock";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockRuntimeConfig {
    pub host: IpAddr,
    pub port: u16,
    pub api_version: String,
    /// Bounded wait of one dequeue attempt inside the long-poll loop.
    pub poll_interval: Duration,
    /// Recheck interval while `stop()` waits for pollers to leave.
    pub drain_interval: Duration,
    pub invocation_deadline: Duration,
    pub function_arn: String,
}

impl Default for MockRuntimeConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            api_version: DEFAULT_API_VERSION.to_owned(),
            poll_interval: Duration::from_millis(100),
            drain_interval: Duration::from_millis(10),
            invocation_deadline: Duration::from_secs(900),
            function_arn: DEFAULT_FUNCTION_ARN.to_owned(),
        }
    }
}

impl MockRuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with the port taken from `LAMBDA_MOCK_RUNTIME_PORT` when set.
    pub fn from_env() -> Result<Self, MockRuntimeError> {
        let cfg = Self::default();
        match std::env::var(PORT_ENV) {
            Ok(raw) => Ok(cfg.with_port(parse_port(&raw)?)),
            Err(_) => Ok(cfg),
        }
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Port 0 binds an ephemeral port; read it back via `MockRuntime::local_addr`.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_drain_interval(mut self, drain_interval: Duration) -> Self {
        self.drain_interval = drain_interval;
        self
    }

    pub fn with_invocation_deadline(mut self, deadline: Duration) -> Self {
        self.invocation_deadline = deadline;
        self
    }

    pub fn with_function_arn(mut self, function_arn: impl Into<String>) -> Self {
        self.function_arn = function_arn.into();
        self
    }

    /// Reject configs that would expose the endpoint off-host or spin.
    /// Allocation: error string only. Complexity: O(api_version length).
    pub fn validate(&self) -> Result<(), MockRuntimeError> {
        if !self.host.is_loopback() {
            return Err(MockRuntimeError::InvalidConfig(format!(
                "host must be a loopback address, got {}",
                self.host
            )));
        }
        if self.api_version.is_empty() || self.api_version.contains('/') {
            return Err(MockRuntimeError::InvalidConfig(format!(
                "api version must be a single non-empty path segment, got {:?}",
                self.api_version
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(MockRuntimeError::InvalidConfig(
                "poll_interval must be > 0".to_owned(),
            ));
        }
        if self.drain_interval.is_zero() {
            return Err(MockRuntimeError::InvalidConfig(
                "drain_interval must be > 0".to_owned(),
            ));
        }
        if self.invocation_deadline.is_zero() {
            return Err(MockRuntimeError::InvalidConfig(
                "invocation_deadline must be > 0".to_owned(),
            ));
        }
        Ok(())
    }
}

fn parse_port(raw: &str) -> Result<u16, MockRuntimeError> {
    raw.trim().parse::<u16>().map_err(|err| {
        MockRuntimeError::InvalidConfig(format!("{PORT_ENV} must be a port number: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_are_loopback_on_standard_port() {
        let cfg = MockRuntimeConfig::default();
        assert_eq!(cfg.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(cfg.port, 5387);
        assert_eq!(cfg.api_version, "2018-06-01");
        assert_eq!(cfg.poll_interval, Duration::from_millis(100));
        assert_eq!(cfg.drain_interval, Duration::from_millis(10));
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn validate_rejects_off_host_bind() {
        let cfg = MockRuntimeConfig::new().with_host(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert!(matches!(
            cfg.validate(),
            Err(MockRuntimeError::InvalidConfig(_))
        ));

        let cfg = MockRuntimeConfig::new().with_host(IpAddr::V6(Ipv6Addr::LOCALHOST));
        cfg.validate().expect("ipv6 loopback is allowed");
    }

    #[test]
    fn validate_rejects_zero_intervals_and_bad_versions() {
        let cases = [
            MockRuntimeConfig::new().with_poll_interval(Duration::ZERO),
            MockRuntimeConfig::new().with_drain_interval(Duration::ZERO),
            MockRuntimeConfig::new().with_invocation_deadline(Duration::ZERO),
            MockRuntimeConfig::new().with_api_version(""),
            MockRuntimeConfig::new().with_api_version("a/b"),
        ];
        for cfg in cases {
            assert!(
                matches!(cfg.validate(), Err(MockRuntimeError::InvalidConfig(_))),
                "expected rejection for {cfg:?}"
            );
        }
    }

    #[test]
    fn parse_port_trims_and_reports_garbage() {
        assert_eq!(parse_port(" 6001 ").expect("port"), 6001);
        assert!(matches!(
            parse_port("seventy"),
            Err(MockRuntimeError::InvalidConfig(_))
        ));
        assert!(parse_port("70000").is_err());
    }
}
