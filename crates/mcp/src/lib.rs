// Tool-invocation protocol server (JSON-RPC 2.0 over stdio)
// Hosts a frozen registry of schema-described tools for agent clients.

pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod tools;
pub mod transport;

pub use error::{DispatchError, RegistryError, ValidationError};
pub use server::{ExitReason, McpServer, SessionState};
pub use tools::{Tool, ToolOutput, ToolRegistry};
