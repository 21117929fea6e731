use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::task::{JoinError, spawn_blocking};
use toolchat_core::tool::{
    Error as ToolError, NoParameters, Tool, ToolOutput,
};

use crate::tools::CommandRunner;

/// Where the public address is looked up by default.
pub const DEFAULT_PUBLIC_IP_ENDPOINT: &str =
    "https://api64.ipify.org?format=text";

const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(10);

/// A tool for finding the address of this machine on the local network.
#[derive(Default)]
pub struct LocalIpTool;

impl LocalIpTool {
    /// Creates a new local IP tool.
    #[inline]
    pub fn new() -> Self {
        LocalIpTool
    }
}

impl Tool for LocalIpTool {
    type Input = NoParameters;

    fn name(&self) -> &str {
        "get_local_ip"
    }

    fn description(&self) -> &str {
        "Get the local IP address of the machine, e.g. 192.168.1.100."
    }

    fn parameter_schema(&self) -> Option<&Value> {
        None
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: NoParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        async move {
            let ip = spawn_blocking(local_ip_address::local_ip)
                .await
                .map_err(join_error)?
                .map_err(lookup_error)?;
            Ok(Value::String(ip.to_string()))
        }
    }
}

/// A tool for listing the IPv4 address of every network interface.
#[derive(Default)]
pub struct NetworkInterfacesTool;

impl NetworkInterfacesTool {
    /// Creates a new network interfaces tool.
    #[inline]
    pub fn new() -> Self {
        NetworkInterfacesTool
    }
}

impl Tool for NetworkInterfacesTool {
    type Input = NoParameters;

    fn name(&self) -> &str {
        "get_network_interfaces"
    }

    fn description(&self) -> &str {
        r#"
Get the network interfaces of the machine and their IPv4 addresses.
Returns a mapping of interface names to addresses."#
    }

    fn parameter_schema(&self) -> Option<&Value> {
        None
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: NoParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        async move {
            let interfaces = spawn_blocking(local_ip_address::list_afinet_netifas)
                .await
                .map_err(join_error)?
                .map_err(lookup_error)?;
            Ok(Value::Object(ipv4_by_interface(interfaces)))
        }
    }
}

/// Keeps the IPv4 addresses only. An interface with several of them is
/// reported with the last one.
fn ipv4_by_interface(
    interfaces: impl IntoIterator<Item = (String, IpAddr)>,
) -> Map<String, Value> {
    let mut result = Map::new();
    for (name, addr) in interfaces {
        if addr.is_ipv4() {
            result.insert(name, Value::String(addr.to_string()));
        }
    }
    result
}

#[derive(Deserialize, JsonSchema)]
pub struct PingToolParameters {
    #[schemars(description = "The IP address or hostname to ping.")]
    host: String,
}

/// A tool for checking whether a device answers a ping.
pub struct PingTool {
    parameter_schema: Value,
    runner: Arc<dyn CommandRunner>,
}

impl PingTool {
    /// Creates a new ping tool that starts processes with `runner`.
    #[inline]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        PingTool {
            parameter_schema: schema_for!(PingToolParameters).to_value(),
            runner,
        }
    }
}

impl Tool for PingTool {
    type Input = PingToolParameters;

    fn name(&self) -> &str {
        "ping_device"
    }

    fn description(&self) -> &str {
        r#"
Ping a device to check if it's reachable.
Returns true if the device responds, false otherwise."#
    }

    fn parameter_schema(&self) -> Option<&Value> {
        Some(&self.parameter_schema)
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: PingToolParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let runner = Arc::clone(&self.runner);
        async move {
            let host = input.host.trim();
            // A host starting with `-` would be read as an option.
            if host.is_empty()
                || host.starts_with('-')
                || host.contains(char::is_whitespace)
            {
                return Err(ToolError::invalid_input()
                    .with_reason(format!("'{host}' is not a valid host.")));
            }

            let count_flag = if cfg!(windows) { "-n" } else { "-c" };
            let argv = [
                "ping".to_owned(),
                count_flag.to_owned(),
                "1".to_owned(),
                host.to_owned(),
            ];
            let output = runner.run(&argv).await.map_err(io_error)?;
            Ok(Value::Bool(output.success))
        }
    }
}

/// A tool for finding the address this machine has on the internet.
pub struct PublicIpTool {
    client: reqwest::Client,
    endpoint: String,
}

impl PublicIpTool {
    /// Creates a new public IP tool using the default lookup service.
    #[inline]
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_PUBLIC_IP_ENDPOINT)
    }

    /// Creates a public IP tool that asks `endpoint`, which must answer
    /// with the address as plain text.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Self {
        PublicIpTool {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for PublicIpTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for PublicIpTool {
    type Input = NoParameters;

    fn name(&self) -> &str {
        "get_public_ip"
    }

    fn description(&self) -> &str {
        "Get the public IP address of the machine, e.g. 203.0.113.45."
    }

    fn parameter_schema(&self) -> Option<&Value> {
        None
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: NoParameters,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let request = self
            .client
            .get(&self.endpoint)
            .timeout(PUBLIC_IP_TIMEOUT);
        async move {
            let text = request
                .send()
                .await
                .and_then(|resp| resp.error_for_status())
                .map_err(http_error)?
                .text()
                .await
                .map_err(http_error)?;
            Ok(Value::String(text.trim().to_owned()))
        }
    }
}

#[inline]
fn io_error(err: std::io::Error) -> ToolError {
    ToolError::execution_error().with_reason(format!("{err}"))
}

#[inline]
fn lookup_error(err: local_ip_address::Error) -> ToolError {
    ToolError::execution_error().with_reason(format!("{err}"))
}

#[inline]
fn join_error(err: JoinError) -> ToolError {
    ToolError::execution_error().with_reason(format!("{err}"))
}

#[inline]
fn http_error(err: reqwest::Error) -> ToolError {
    ToolError::execution_error().with_reason(format!("{err}"))
}

#[cfg(test)]
mod tests {
    use toolchat_core::tool::ErrorKind;

    use super::*;
    use crate::tools::runner::testing::RecordingRunner;

    async fn ping(runner: &RecordingRunner, host: &str) -> ToolOutput {
        let tool = PingTool::new(Arc::new(runner.clone()));
        tool.execute(PingToolParameters {
            host: host.to_owned(),
        })
        .await
    }

    #[test]
    fn test_interfaces_keep_ipv4_only() {
        let interfaces = vec![
            ("lo".to_owned(), IpAddr::from([127, 0, 0, 1])),
            ("eth0".to_owned(), IpAddr::from([0xfe80, 0, 0, 0, 0, 0, 0, 1])),
            ("eth0".to_owned(), IpAddr::from([192, 168, 1, 100])),
            ("wg0".to_owned(), IpAddr::from([0xfd00, 0, 0, 0, 0, 0, 0, 2])),
        ];

        let result = ipv4_by_interface(interfaces);

        assert_eq!(
            Value::Object(result),
            serde_json::json!({ "lo": "127.0.0.1", "eth0": "192.168.1.100" })
        );
    }

    #[tokio::test]
    async fn test_ping_reports_reachability() {
        let runner = RecordingRunner::replying(true, "1 packets received");
        assert_eq!(ping(&runner, "192.168.1.1").await, Ok(Value::Bool(true)));

        let calls = runner.calls();
        let argv = &calls[0];
        assert_eq!(argv[0], "ping");
        assert_eq!(argv[2], "1");
        assert_eq!(argv[3], "192.168.1.1");

        let runner = RecordingRunner::replying(false, "");
        assert_eq!(ping(&runner, "10.0.0.99").await, Ok(Value::Bool(false)));
    }

    #[tokio::test]
    async fn test_ping_rejects_option_like_hosts() {
        let runner = RecordingRunner::default();

        for host in ["-f", "", "example.com -c 1000"] {
            let err = ping(&runner, host).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{host}");
        }
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_public_ip_failure_becomes_tool_error() {
        // Nothing listens on the discard port.
        let tool = PublicIpTool::with_endpoint("http://127.0.0.1:9/");

        let err = tool.execute(NoParameters {}).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExecutionError);
    }
}
