pub mod peer;
pub mod server;
pub mod tools;
pub mod types;

pub use peer::{HostLogSink, McpPeer, PeerError};
pub use server::{
    build_server_logger, build_workflow_engine, serve, serve_stdio, McpServer, ServerError,
    PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
};
pub use tools::{call_tool, list_tools, ToolCallError, ITER_VF_TOOL_NAME};
