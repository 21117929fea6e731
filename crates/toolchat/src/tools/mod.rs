//! A set of built-in tools that models can use.

mod network;
mod run_command;
mod runner;
mod system;

pub use network::{
    DEFAULT_PUBLIC_IP_ENDPOINT, LocalIpTool, NetworkInterfacesTool, PingTool,
    PublicIpTool,
};
pub use run_command::RunCommandTool;
pub use runner::{
    CommandOutput, CommandRunner, DEFAULT_COMMAND_TIMEOUT, ProcessRunner,
};
pub use system::{DateTimeTool, ReverseStringTool, SystemInfoTool};
